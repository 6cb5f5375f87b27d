use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Events published by the account service that the messaging store reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AccountEvent {
    /// The account is gone; its messages and derived records must follow.
    Deleted { user_id: Uuid },
}

impl AccountEvent {
    pub fn user_id(&self) -> Uuid {
        match self {
            Self::Deleted { user_id } => *user_id,
        }
    }
}
