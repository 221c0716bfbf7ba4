//! Database scenarios. Run with `DATABASE_URL=... cargo test -- --ignored`.
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use sqlx::PgPool;
use uuid::Uuid;

use skill_vault::{
    config::Config,
    db::{
        db::DBClient, escrowdb::EscrowExt, ledgerdb::LedgerExt, orderdb::OrderExt, projectdb::ProjectExt,
        subscriptiondb::SubscriptionExt, userdb::UserExt, workdb::WorkExt,
    },
    models::{
        escrowmodels::EscrowStatus,
        ledgermodels::{LedgerEntry, TransactionKind, TransactionStatus},
        projectmodels::{ActiveProject, JobStatus, ProjectStatus},
        subscriptionmodels::{OrderStatus, SubscriptionStatus},
        usermodel::{User, UserRole},
        withdrawalmodels::{WithdrawalDecision, WithdrawalStatus},
        workmodels::{ReviewOutcome, SubmissionStatus, WorkSubmission},
    },
    service::{
        error::ServiceError,
        ledger_service::LedgerService,
        payment_gateway::{sign_payment, verify_payment_signature, GatewayOrder, PaymentGateway},
        subscription_service::PaymentProof,
        work_service::{FileAccess, ReviewRequest, WorkUpload},
    },
    AppState,
};

const GATEWAY_SECRET: &str = "fake_gateway_secret";

#[derive(Debug)]
struct FakeGateway;

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(&self, amount_minor: i64, currency: &str, receipt: &str) -> Result<GatewayOrder, ServiceError> {
        Ok(GatewayOrder {
            id: format!("order_{}", Uuid::new_v4().simple()),
            amount: amount_minor,
            currency: currency.to_string(),
            receipt: Some(receipt.to_string()),
        })
    }

    fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_payment_signature(GATEWAY_SECRET, order_id, payment_id, signature)
    }

    fn key_id(&self) -> &str {
        "fake_key"
    }
}

fn state_with(pool: PgPool, configure: impl FnOnce(&mut Config)) -> AppState {
    let mut config = Config::local("postgres://unused");
    configure(&mut config);
    AppState::with_gateway(DBClient::new(pool), config, Arc::new(FakeGateway))
}

fn state(pool: PgPool) -> AppState {
    state_with(pool, |_| {})
}

async fn user(state: &AppState, name: &str, role: UserRole) -> User {
    state
        .db_client
        .save_user(name.to_string(), format!("{}-{}@example.com", name, Uuid::new_v4()), role)
        .await
        .unwrap()
}

async fn seed_credits(state: &AppState, user_id: Uuid, amount: i64) {
    let mut conn = state.db_client.pool.acquire().await.unwrap();
    LedgerService::credit(
        &mut conn,
        &LedgerEntry::new(user_id, amount, TransactionKind::Purchase, "Seed credits"),
    )
    .await
    .unwrap();
}

async fn balance(state: &AppState, user_id: Uuid) -> i64 {
    state.ledger_service.balance(user_id).await.unwrap()
}

async fn start_project(state: &AppState, company: &User, freelancer: &User, rate: i64, fund: bool) -> ActiveProject {
    let job = state
        .project_service
        .create_job(company, "Brand identity".to_string(), "Logo and palette for a bakery".to_string(), rate)
        .await
        .unwrap();
    let application = state
        .project_service
        .apply(job.id, freelancer, rate, "I have shipped a dozen brand kits".to_string())
        .await
        .unwrap();
    state
        .project_service
        .accept_application(application.id, company.id, fund)
        .await
        .unwrap()
        .project
}

fn upload(name: &str) -> WorkUpload {
    WorkUpload {
        file_name: name.to_string(),
        mime_type: "image/png".to_string(),
        bytes: vec![0x89, 0x50, 0x4e, 0x47, 1, 2, 3],
    }
}

async fn submit(state: &AppState, project: &ActiveProject) -> WorkSubmission {
    state
        .work_service
        .submit(project.id, project.freelancer_id, upload("logo.png"), Some("First pass".to_string()))
        .await
        .unwrap()
}

fn review(project: &ActiveProject, submission: &WorkSubmission, outcome: ReviewOutcome, notes: Option<&str>) -> ReviewRequest {
    ReviewRequest {
        project_id: project.id,
        submission_id: submission.id,
        company_id: project.company_id,
        outcome,
        revision_notes: notes.map(str::to_string),
        rating: None,
    }
}

async fn assert_consistent(state: &AppState, user_id: Uuid) {
    let audit = state.ledger_service.audit(user_id).await.unwrap();
    assert!(audit.consistent, "ledger drifted: {:?}", audit);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn revision_then_approval_settles_the_project(pool: PgPool) {
    let state = state(pool);
    let company = user(&state, "acme", UserRole::Company).await;
    let freelancer = user(&state, "ada", UserRole::Freelancer).await;
    seed_credits(&state, company.id, 800).await;

    let project = start_project(&state, &company, &freelancer, 500, true).await;
    assert_eq!(balance(&state, company.id).await, 300);

    let first = submit(&state, &project).await;
    assert_eq!(first.submission_number, 1);

    let revision = state
        .work_service
        .review(review(&project, &first, ReviewOutcome::NeedsRevision, Some("fix colors")))
        .await
        .unwrap();
    assert!(revision.settlement.is_none());
    assert_eq!(revision.submission.status, SubmissionStatus::NeedsRevision);
    let project_now = state.db_client.get_project(project.id).await.unwrap().unwrap();
    assert_eq!(project_now.status, ProjectStatus::InProgress);

    let second = submit(&state, &project).await;
    assert_eq!(second.submission_number, 2);

    let approval = state
        .work_service
        .review(ReviewRequest {
            rating: Some(5),
            ..review(&project, &second, ReviewOutcome::Approved, None)
        })
        .await
        .unwrap();

    let settlement = approval.settlement.unwrap();
    assert_eq!(settlement.escrow.status, EscrowStatus::Released);
    assert_eq!(settlement.payment.amount, 500);
    assert_eq!(settlement.past_project.submission_count, 2);
    assert_eq!(settlement.past_project.revision_count, 1);
    assert_eq!(settlement.past_project.freelancer_rating, Some(5));

    assert_eq!(balance(&state, freelancer.id).await, 500);
    assert_eq!(balance(&state, company.id).await, 300);

    let project_now = state.db_client.get_project(project.id).await.unwrap().unwrap();
    assert_eq!(project_now.status, ProjectStatus::Completed);
    assert_eq!(project_now.progress, 100);

    let past = state.db_client.get_past_project_by_project(project.id).await.unwrap().unwrap();
    assert_eq!(past.final_amount, 500);

    let notes = state.db_client.get_submission_review(first.id).await.unwrap().unwrap();
    assert_eq!(notes.revision_notes.as_deref(), Some("fix colors"));

    assert_consistent(&state, company.id).await;
    assert_consistent(&state, freelancer.id).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn rejected_withdrawal_restores_the_balance(pool: PgPool) {
    let state = state(pool);
    let freelancer = user(&state, "grace", UserRole::Freelancer).await;
    let admin = user(&state, "root", UserRole::Admin).await;
    seed_credits(&state, freelancer.id, 100).await;

    let withdrawal = state
        .withdrawal_service
        .request(freelancer.id, 20, Some(serde_json::json!({ "upi": "grace@bank" })))
        .await
        .unwrap();
    assert_eq!(withdrawal.status, WithdrawalStatus::Pending);
    assert_eq!(withdrawal.gross_amount, 180);
    assert_eq!(withdrawal.fee_amount, 4);
    assert_eq!(withdrawal.net_amount, 176);
    assert_eq!(balance(&state, freelancer.id).await, 80);

    let pending = state
        .db_client
        .get_ledger_transaction(withdrawal.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(pending.status, TransactionStatus::Pending);
    assert_eq!(pending.amount, -20);
    assert_eq!(pending.metadata.as_ref().unwrap()["net_amount"], 176);
    assert_consistent(&state, freelancer.id).await;

    let rejected = state
        .withdrawal_service
        .process(withdrawal.id, admin.id, WithdrawalDecision::Rejected, Some("Bank details invalid".to_string()))
        .await
        .unwrap();
    assert_eq!(rejected.status, WithdrawalStatus::Rejected);
    assert_eq!(balance(&state, freelancer.id).await, 100);

    let refunded = state
        .db_client
        .get_ledger_transaction(withdrawal.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refunded.status, TransactionStatus::Refunded);
    assert_consistent(&state, freelancer.id).await;

    let err = state
        .withdrawal_service
        .process(withdrawal.id, admin.id, WithdrawalDecision::Completed, None)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::CONFLICT);
    assert_eq!(balance(&state, freelancer.id).await, 100);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn completed_withdrawal_keeps_the_debit(pool: PgPool) {
    let state = state(pool);
    let freelancer = user(&state, "linus", UserRole::Freelancer).await;
    let admin = user(&state, "root", UserRole::Admin).await;
    seed_credits(&state, freelancer.id, 50).await;

    let withdrawal = state.withdrawal_service.request(freelancer.id, 50, None).await.unwrap();
    assert_eq!(state.withdrawal_service.pending_queue().await.unwrap().len(), 1);

    state
        .withdrawal_service
        .process(withdrawal.id, admin.id, WithdrawalDecision::Completed, None)
        .await
        .unwrap();

    assert_eq!(balance(&state, freelancer.id).await, 0);
    let entry = state
        .db_client
        .get_ledger_transaction(withdrawal.transaction_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, TransactionStatus::Completed);
    assert!(state.withdrawal_service.pending_queue().await.unwrap().is_empty());
    assert_consistent(&state, freelancer.id).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn withdrawal_below_minimum_writes_nothing(pool: PgPool) {
    let state = state(pool);
    let freelancer = user(&state, "alan", UserRole::Freelancer).await;
    seed_credits(&state, freelancer.id, 100).await;

    let err = state.withdrawal_service.request(freelancer.id, 9, None).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    assert_eq!(balance(&state, freelancer.id).await, 100);
    assert_eq!(state.ledger_service.transactions(freelancer.id, 50, 0).await.unwrap().len(), 1);
    assert!(state.withdrawal_service.list_own(freelancer.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn withdrawal_over_balance_is_rejected(pool: PgPool) {
    let state = state(pool);
    let freelancer = user(&state, "barbara", UserRole::Freelancer).await;
    seed_credits(&state, freelancer.id, 15).await;

    let err = state.withdrawal_service.request(freelancer.id, 20, None).await.unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientFunds { required: 20, available: 15 }));
    assert_eq!(balance(&state, freelancer.id).await, 15);
    assert!(state.withdrawal_service.list_own(freelancer.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn escrow_settles_only_once(pool: PgPool) {
    let state = state(pool);
    let company = user(&state, "initech", UserRole::Company).await;
    let freelancer = user(&state, "peter", UserRole::Freelancer).await;
    seed_credits(&state, company.id, 1000).await;

    let project = start_project(&state, &company, &freelancer, 300, false).await;
    let escrow = state
        .escrow_service
        .fund(project.id, company.id, freelancer.id, 300)
        .await
        .unwrap();
    assert_eq!(escrow.status, EscrowStatus::Held);

    let second_hold = state
        .escrow_service
        .fund(project.id, company.id, freelancer.id, 100)
        .await
        .unwrap_err();
    assert_eq!(second_hold.status_code(), StatusCode::CONFLICT);
    assert_eq!(balance(&state, company.id).await, 700);

    state.escrow_service.release(escrow.id).await.unwrap();
    let again = state.escrow_service.release(escrow.id).await.unwrap_err();
    assert_eq!(again.status_code(), StatusCode::CONFLICT);
    let refund = state.escrow_service.refund(escrow.id).await.unwrap_err();
    assert_eq!(refund.status_code(), StatusCode::CONFLICT);

    assert_eq!(balance(&state, freelancer.id).await, 300);
    assert_eq!(balance(&state, company.id).await, 700);

    let earned = state
        .ledger_service
        .transactions(freelancer.id, 50, 0)
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.kind == TransactionKind::Earned)
        .count();
    assert_eq!(earned, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn funding_beyond_balance_changes_nothing(pool: PgPool) {
    let state = state(pool);
    let company = user(&state, "hooli", UserRole::Company).await;
    let freelancer = user(&state, "richard", UserRole::Freelancer).await;
    seed_credits(&state, company.id, 100).await;

    let project = start_project(&state, &company, &freelancer, 500, false).await;
    let err = state
        .escrow_service
        .fund(project.id, company.id, freelancer.id, 500)
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::InsufficientFunds { required: 500, available: 100 }));
    assert_eq!(balance(&state, company.id).await, 100);
    assert!(state.db_client.get_project_escrows(project.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn accepting_without_funds_rolls_back_the_hire(pool: PgPool) {
    let state = state(pool);
    let company = user(&state, "umbrella", UserRole::Company).await;
    let freelancer = user(&state, "jill", UserRole::Freelancer).await;

    let job = state
        .project_service
        .create_job(&company, "Landing page".to_string(), "One page marketing site".to_string(), 400)
        .await
        .unwrap();
    let application = state
        .project_service
        .apply(job.id, &freelancer, 400, "Fast turnaround guaranteed".to_string())
        .await
        .unwrap();

    let err = state
        .project_service
        .accept_application(application.id, company.id, true)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientFunds { .. }));

    let job = state.project_service.get_job(job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Open);
    assert!(state.project_service.projects_for(company.id).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicate_applications_conflict(pool: PgPool) {
    let state = state(pool);
    let company = user(&state, "stark", UserRole::Company).await;
    let freelancer = user(&state, "pepper", UserRole::Freelancer).await;

    let job = state
        .project_service
        .create_job(&company, "Pitch deck".to_string(), "Ten slides for a seed round".to_string(), 200)
        .await
        .unwrap();
    state
        .project_service
        .apply(job.id, &freelancer, 200, "Deck designer for five years".to_string())
        .await
        .unwrap();
    let err = state
        .project_service
        .apply(job.id, &freelancer, 180, "Applying again at a discount".to_string())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "You have already applied to this job");
    assert_eq!(err.status_code(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn submission_numbers_never_repeat(pool: PgPool) {
    let state = state(pool);
    let company = user(&state, "wayne", UserRole::Company).await;
    let freelancer = user(&state, "lucius", UserRole::Freelancer).await;
    seed_credits(&state, company.id, 500).await;
    let project = start_project(&state, &company, &freelancer, 200, true).await;

    let mut numbers = Vec::new();
    for round in 0..3 {
        let submission = submit(&state, &project).await;
        numbers.push(submission.submission_number);
        if round < 2 {
            state
                .work_service
                .review(review(&project, &submission, ReviewOutcome::NeedsRevision, Some("Another pass please")))
                .await
                .unwrap();
        }
    }
    assert_eq!(numbers, vec![1, 2, 3]);

    let listed = state
        .work_service
        .submissions_for_project(project.id, freelancer.id)
        .await
        .unwrap();
    assert_eq!(listed.len(), 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn concurrent_approvals_settle_once(pool: PgPool) {
    let state = state(pool);
    let company = user(&state, "tyrell", UserRole::Company).await;
    let freelancer = user(&state, "rachael", UserRole::Freelancer).await;
    seed_credits(&state, company.id, 1000).await;
    let project = start_project(&state, &company, &freelancer, 400, true).await;
    let submission = submit(&state, &project).await;

    let (a, b) = tokio::join!(
        state.work_service.review(review(&project, &submission, ReviewOutcome::Approved, None)),
        state.work_service.review(review(&project, &submission, ReviewOutcome::Approved, None)),
    );

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let loser = a.err().or(b.err()).unwrap();
    assert_eq!(loser.status_code(), StatusCode::CONFLICT);

    assert_eq!(balance(&state, freelancer.id).await, 400);
    assert!(state.db_client.get_past_project_by_project(project.id).await.unwrap().is_some());

    let escrows = state.db_client.get_project_escrows(project.id).await.unwrap();
    assert_eq!(escrows.len(), 1);
    assert_eq!(escrows[0].status, EscrowStatus::Released);
    assert_consistent(&state, freelancer.id).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn revision_needs_notes_and_completed_projects_refuse_work(pool: PgPool) {
    let state = state(pool);
    let company = user(&state, "cyberdyne", UserRole::Company).await;
    let freelancer = user(&state, "miles", UserRole::Freelancer).await;
    seed_credits(&state, company.id, 300).await;
    let project = start_project(&state, &company, &freelancer, 300, true).await;
    let submission = submit(&state, &project).await;

    let err = state
        .work_service
        .review(review(&project, &submission, ReviewOutcome::NeedsRevision, Some("   ")))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));
    let untouched = state.db_client.get_submission(submission.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, SubmissionStatus::Pending);

    state
        .work_service
        .review(review(&project, &submission, ReviewOutcome::Approved, None))
        .await
        .unwrap();

    let late = state
        .work_service
        .submit(project.id, freelancer.id, upload("late.png"), None)
        .await
        .unwrap_err();
    assert_eq!(late.status_code(), StatusCode::CONFLICT);

    let stranger = user(&state, "intruder", UserRole::Freelancer).await;
    let err = state
        .work_service
        .submissions_for_project(project.id, stranger.id)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn viewing_opens_review_and_download_waits_for_release(pool: PgPool) {
    let state = state(pool);
    let company = user(&state, "aperture", UserRole::Company).await;
    let freelancer = user(&state, "chell", UserRole::Freelancer).await;
    seed_credits(&state, company.id, 300).await;
    let project = start_project(&state, &company, &freelancer, 250, true).await;
    let submission = submit(&state, &project).await;

    let (viewed, bytes) = state
        .work_service
        .open_file(submission.id, company.id, FileAccess::View)
        .await
        .unwrap();
    assert_eq!(viewed.status, SubmissionStatus::UnderReview);
    assert_eq!(bytes.len(), 7);

    let locked = state
        .work_service
        .open_file(submission.id, company.id, FileAccess::Download)
        .await
        .unwrap_err();
    assert_eq!(locked.status_code(), StatusCode::CONFLICT);

    state
        .work_service
        .review(review(&project, &viewed, ReviewOutcome::Approved, None))
        .await
        .unwrap();

    let (downloaded, _) = state
        .work_service
        .open_file(submission.id, company.id, FileAccess::Download)
        .await
        .unwrap();
    assert_eq!(downloaded.status, SubmissionStatus::Approved);

    let err = state
        .work_service
        .open_file(submission.id, freelancer.id, FileAccess::View)
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn unfunded_project_is_funded_at_approval(pool: PgPool) {
    let state = state(pool);
    let company = user(&state, "soylent", UserRole::Company).await;
    let freelancer = user(&state, "thorn", UserRole::Freelancer).await;
    seed_credits(&state, company.id, 600).await;
    let project = start_project(&state, &company, &freelancer, 450, false).await;
    let submission = submit(&state, &project).await;

    let result = state
        .work_service
        .review(review(&project, &submission, ReviewOutcome::Approved, None))
        .await
        .unwrap();

    assert_eq!(result.settlement.unwrap().escrow.amount, 450);
    assert_eq!(balance(&state, company.id).await, 150);
    assert_eq!(balance(&state, freelancer.id).await, 450);

    let kinds: Vec<TransactionKind> = state
        .ledger_service
        .transactions(company.id, 50, 0)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.kind)
        .collect();
    assert!(kinds.contains(&TransactionKind::ProjectPayment));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn approval_without_escrow_rolls_back_when_fallback_disabled(pool: PgPool) {
    let state = state_with(pool, |config| config.allow_fund_on_approval = false);
    let company = user(&state, "massive", UserRole::Company).await;
    let freelancer = user(&state, "neo", UserRole::Freelancer).await;
    seed_credits(&state, company.id, 600).await;
    let project = start_project(&state, &company, &freelancer, 450, false).await;
    let submission = submit(&state, &project).await;

    let err = state
        .work_service
        .review(review(&project, &submission, ReviewOutcome::Approved, None))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::CONFLICT);

    let still_pending = state.db_client.get_submission(submission.id).await.unwrap().unwrap();
    assert_eq!(still_pending.status, SubmissionStatus::Pending);
    assert!(state.db_client.get_submission_review(submission.id).await.unwrap().is_none());
    assert!(state.db_client.get_past_project_by_project(project.id).await.unwrap().is_none());
    assert_eq!(balance(&state, company.id).await, 600);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn approval_after_forced_release_does_not_pay_twice(pool: PgPool) {
    let state = state(pool);
    let company = user(&state, "weyland", UserRole::Company).await;
    let freelancer = user(&state, "ripley", UserRole::Freelancer).await;
    seed_credits(&state, company.id, 1000).await;
    let project = start_project(&state, &company, &freelancer, 500, true).await;

    let escrow = state.escrow_service.for_project(project.id).await.unwrap().remove(0);
    state.escrow_service.release(escrow.id).await.unwrap();
    assert_eq!(balance(&state, company.id).await, 500);
    assert_eq!(balance(&state, freelancer.id).await, 500);

    let submission = submit(&state, &project).await;
    let err = state
        .work_service
        .review(review(&project, &submission, ReviewOutcome::Approved, None))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), StatusCode::CONFLICT);
    assert_eq!(err.to_string(), "Escrow for this project has already been released");

    assert_eq!(balance(&state, company.id).await, 500);
    assert_eq!(balance(&state, freelancer.id).await, 500);
    assert_eq!(state.db_client.get_project_escrows(project.id).await.unwrap().len(), 1);
    let untouched = state.db_client.get_submission(submission.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, SubmissionStatus::Pending);
    assert!(state.db_client.get_past_project_by_project(project.id).await.unwrap().is_none());
    assert_consistent(&state, company.id).await;
    assert_consistent(&state, freelancer.id).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn transfer_during_funded_approval_completes_both(pool: PgPool) {
    let state = state(pool);
    let company = user(&state, "nakatomi", UserRole::Company).await;
    let freelancer = user(&state, "holly", UserRole::Freelancer).await;
    seed_credits(&state, company.id, 600).await;
    seed_credits(&state, freelancer.id, 50).await;
    let project = start_project(&state, &company, &freelancer, 400, false).await;
    let submission = submit(&state, &project).await;

    let (approval, transfer) = tokio::join!(
        state.work_service.review(review(&project, &submission, ReviewOutcome::Approved, None)),
        state.ledger_service.transfer(freelancer.id, company.id, 30, Some("Refund of deposit".to_string())),
    );
    approval.unwrap();
    transfer.unwrap();

    assert_eq!(balance(&state, company.id).await, 600 - 400 + 30);
    assert_eq!(balance(&state, freelancer.id).await, 50 + 400 - 30);
    assert_consistent(&state, company.id).await;
    assert_consistent(&state, freelancer.id).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn cancelling_refunds_held_escrow(pool: PgPool) {
    let state = state(pool);
    let company = user(&state, "oscorp", UserRole::Company).await;
    let freelancer = user(&state, "otto", UserRole::Freelancer).await;
    seed_credits(&state, company.id, 500).await;
    let project = start_project(&state, &company, &freelancer, 350, true).await;
    assert_eq!(balance(&state, company.id).await, 150);

    let cancellation = state.project_service.cancel_project(project.id, company.id).await.unwrap();
    assert_eq!(cancellation.project.status, ProjectStatus::Cancelled);
    assert_eq!(cancellation.refunded_escrow.unwrap().status, EscrowStatus::Refunded);
    assert_eq!(balance(&state, company.id).await, 500);

    let again = state.project_service.cancel_project(project.id, company.id).await.unwrap_err();
    assert_eq!(again.status_code(), StatusCode::CONFLICT);
    assert_consistent(&state, company.id).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn tampered_signature_creates_no_subscription(pool: PgPool) {
    let state = state(pool);
    let member = user(&state, "mallory", UserRole::Freelancer).await;
    let plan = state
        .db_client
        .create_plan("Premium", 499, 30, None)
        .await
        .unwrap();

    let checkout = state.subscription_service.create_order(plan.id, member.id).await.unwrap();
    assert_eq!(checkout.order.amount, 49_900);
    assert_eq!(checkout.key_id, "fake_key");

    let mut signature = sign_payment(GATEWAY_SECRET, &checkout.order.gateway_order_id, "pay_1").unwrap();
    signature.replace_range(0..2, if signature.starts_with("00") { "11" } else { "00" });

    let err = state
        .subscription_service
        .verify_payment(
            member.id,
            plan.id,
            PaymentProof {
                order_id: checkout.order.gateway_order_id.clone(),
                payment_id: "pay_1".to_string(),
                signature,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    assert!(state.subscription_service.current(member.id).await.unwrap().is_none());
    let order = state
        .db_client
        .get_payment_order(&checkout.order.gateway_order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Created);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn verified_payment_activates_subscription_once(pool: PgPool) {
    let state = state(pool);
    let member = user(&state, "trent", UserRole::Company).await;
    let plan = state
        .db_client
        .create_plan("Pro", 999, 90, Some(serde_json::json!(["priority listing"])))
        .await
        .unwrap();

    let checkout = state.subscription_service.create_order(plan.id, member.id).await.unwrap();
    let proof = PaymentProof {
        order_id: checkout.order.gateway_order_id.clone(),
        payment_id: "pay_ok".to_string(),
        signature: sign_payment(GATEWAY_SECRET, &checkout.order.gateway_order_id, "pay_ok").unwrap(),
    };

    let activated = state
        .subscription_service
        .verify_payment(member.id, plan.id, proof.clone())
        .await
        .unwrap();
    assert_eq!(activated.subscription.status, SubscriptionStatus::Active);
    assert_eq!(activated.order.status, OrderStatus::Paid);
    assert_eq!(activated.transaction.amount, 0);
    assert_eq!(activated.transaction.kind, TransactionKind::Purchase);
    assert_eq!(
        (activated.subscription.end_date - activated.subscription.start_date).num_days(),
        90
    );
    assert_eq!(balance(&state, member.id).await, 0);

    let replay = state
        .subscription_service
        .verify_payment(member.id, plan.id, proof)
        .await
        .unwrap_err();
    assert_eq!(replay.status_code(), StatusCode::CONFLICT);

    let current = state.subscription_service.current(member.id).await.unwrap().unwrap();
    assert_eq!(current.id, activated.subscription.id);

    let cancelled = state
        .subscription_service
        .cancel(current.id, member.id)
        .await
        .unwrap();
    assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
    assert!(!cancelled.auto_renew);
    assert!(state.subscription_service.current(member.id).await.unwrap().is_none());
    assert_consistent(&state, member.id).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn lapsed_subscriptions_expire(pool: PgPool) {
    let state = state(pool.clone());
    let member = user(&state, "walter", UserRole::Freelancer).await;
    let plan = state.db_client.create_plan("Monthly", 199, 30, None).await.unwrap();

    let checkout = state.subscription_service.create_order(plan.id, member.id).await.unwrap();
    let order_id = checkout.order.gateway_order_id.clone();
    let activated = state
        .subscription_service
        .verify_payment(
            member.id,
            plan.id,
            PaymentProof {
                signature: sign_payment(GATEWAY_SECRET, &order_id, "pay_monthly").unwrap(),
                order_id,
                payment_id: "pay_monthly".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(state.subscription_service.expire_due().await.unwrap(), 0);

    sqlx::query("UPDATE user_subscriptions SET end_date = NOW() - INTERVAL '1 day' WHERE id = $1")
        .bind(activated.subscription.id)
        .execute(&pool)
        .await
        .unwrap();

    assert_eq!(state.subscription_service.expire_due().await.unwrap(), 1);
    assert!(state.db_client.get_current_subscription(member.id).await.unwrap().is_none());
    let expired = state.db_client.get_subscription(activated.subscription.id).await.unwrap().unwrap();
    assert_eq!(expired.status, SubscriptionStatus::Expired);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn credit_purchase_and_transfer(pool: PgPool) {
    let state = state(pool);
    let company = user(&state, "globex", UserRole::Company).await;
    let freelancer = user(&state, "hank", UserRole::Freelancer).await;

    let refused = state.purchase_service.create_credit_order(&freelancer, 50).await.unwrap_err();
    assert_eq!(refused.status_code(), StatusCode::FORBIDDEN);

    let checkout = state.purchase_service.create_credit_order(&company, 50).await.unwrap();
    assert_eq!(checkout.order.amount, 50 * 10 * 100);

    let order_id = checkout.order.gateway_order_id.clone();
    let purchase = state
        .purchase_service
        .verify_credit_payment(
            company.id,
            PaymentProof {
                signature: sign_payment(GATEWAY_SECRET, &order_id, "pay_credits").unwrap(),
                order_id,
                payment_id: "pay_credits".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(purchase.transaction.amount, 50);
    assert_eq!(balance(&state, company.id).await, 50);

    let (sent, received) = state
        .ledger_service
        .transfer(company.id, freelancer.id, 20, Some("Bonus".to_string()))
        .await
        .unwrap();
    assert_eq!(sent.amount, -20);
    assert_eq!(received.amount, 20);
    assert_eq!(balance(&state, company.id).await, 30);
    assert_eq!(balance(&state, freelancer.id).await, 20);

    let err = state
        .ledger_service
        .transfer(freelancer.id, freelancer.id, 5, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    assert_eq!(state.notification_service.unread_count(freelancer.id).await.unwrap(), 1);
    assert_consistent(&state, company.id).await;
    assert_consistent(&state, freelancer.id).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn notifications_follow_the_project(pool: PgPool) {
    let state = state(pool);
    let company = user(&state, "vandelay", UserRole::Company).await;
    let freelancer = user(&state, "kramer", UserRole::Freelancer).await;
    seed_credits(&state, company.id, 200).await;
    let project = start_project(&state, &company, &freelancer, 200, true).await;
    let submission = submit(&state, &project).await;
    state
        .work_service
        .review(review(&project, &submission, ReviewOutcome::Approved, None))
        .await
        .unwrap();

    let kinds: Vec<String> = state
        .notification_service
        .list(freelancer.id, 50, 0)
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.kind)
        .collect();
    assert!(kinds.iter().any(|k| k == "application_accepted"));
    assert!(kinds.iter().any(|k| k == "escrow_funded"));
    assert!(kinds.iter().any(|k| k == "payment_received"));

    let company_notes = state.notification_service.list(company.id, 50, 0).await.unwrap();
    let first = company_notes.first().unwrap();
    let read = state.notification_service.mark_read(first.id, company.id).await.unwrap();
    assert!(read.is_read);

    let stolen = state.notification_service.mark_read(first.id, freelancer.id).await.unwrap_err();
    assert_eq!(stolen.status_code(), StatusCode::NOT_FOUND);

    state.notification_service.mark_all_read(company.id).await.unwrap();
    assert_eq!(state.notification_service.unread_count(company.id).await.unwrap(), 0);
}
