use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A direct message from one user to another, optionally replying to another message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub edited: bool,
    /// `None` marks a thread root.
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Created for the receiver whenever a message is sent. Never created directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub message_id: Uuid,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of a message's content taken right before an edit replaced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub message_id: Uuid,
    pub old_content: String,
    pub editor_id: Option<Uuid>,
    pub edited_at: DateTime<Utc>,
}

/// A message and its replies, oldest reply first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadNode {
    pub message: Message,
    pub replies: Vec<ThreadNode>,
}

impl ThreadNode {
    pub fn leaf(message: Message) -> Self {
        Self {
            message,
            replies: Vec::new(),
        }
    }

    /// Number of levels, counting this node as level 1.
    pub fn depth(&self) -> usize {
        1 + self.replies.iter().map(ThreadNode::depth).max().unwrap_or(0)
    }

    /// Total number of messages in this subtree.
    pub fn len(&self) -> usize {
        1 + self.replies.iter().map(ThreadNode::len).sum::<usize>()
    }
}

/// Row counts removed by each step of an account cleanup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionReport {
    pub notifications: usize,
    pub history_entries: usize,
    pub messages: usize,
}

impl DeletionReport {
    pub fn is_empty(&self) -> bool {
        self.notifications == 0 && self.history_entries == 0 && self.messages == 0
    }
}
