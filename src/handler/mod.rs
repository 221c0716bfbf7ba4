pub mod admin;
pub mod escrow;
pub mod notifications;
pub mod projects;
pub mod subscriptions;
pub mod users;
pub mod wallet;
pub mod work;
