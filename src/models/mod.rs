pub mod usermodel;
pub mod ledgermodels;
pub mod projectmodels;
pub mod escrowmodels;
pub mod workmodels;
pub mod withdrawalmodels;
pub mod subscriptionmodels;
pub mod notificationmodels;

use std::fmt::Debug;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Cannot move {entity} from {from} to {to}")]
pub struct InvalidTransition {
    pub entity: &'static str,
    pub from: String,
    pub to: String,
}

/// Status columns backed by an explicit transition table.
pub trait StatusMachine: Copy + PartialEq + Debug {
    const ENTITY: &'static str;

    fn can_transition_to(&self, next: Self) -> bool;

    fn is_terminal(&self) -> bool;

    fn transition(self, next: Self) -> Result<Self, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition {
                entity: Self::ENTITY,
                from: format!("{:?}", self),
                to: format!("{:?}", next),
            })
        }
    }
}
