use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Bearer token claims. Tokens are issued by the account service; Parley only verifies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    /// Optional on the wire so a missing receiver is reported as invalid input.
    #[serde(default)]
    pub receiver_id: Option<Uuid>,
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditMessageRequest {
    pub content: String,
}

// -- Notifications --

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkedRead {
    pub marked: usize,
}

// -- Account --

#[derive(Debug, Serialize)]
pub struct AccountDeletionAccepted {
    pub user_id: Uuid,
}
