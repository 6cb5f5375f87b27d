//! Database row types. These map directly to SQLite rows.
//! Distinct from parley-types models to keep the DB layer independent.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Message,
    Notification,
    HistoryEntry,
}

impl RecordKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::Message => "messages",
            Self::Notification => "notifications",
            Self::HistoryEntry => "message_history",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub edited: bool,
    pub parent_id: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub message_id: String,
    pub read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRow {
    pub id: String,
    pub message_id: String,
    pub old_content: String,
    pub editor_id: Option<String>,
    pub edited_at: String,
}

/// Predicates accepted by the message queries.
#[derive(Debug, Clone, Copy)]
pub enum MessageFilter<'a> {
    Id(&'a str),
    /// Messages without a parent, newest first.
    Roots,
    /// Direct replies to any of the given messages, oldest first.
    ParentIn(&'a [String]),
    /// Messages the user sent or received, newest first.
    Involving(&'a str),
    /// Messages received by the user that still have an unread notification for them.
    UnreadFor(&'a str),
}

#[derive(Debug, Clone, Copy)]
pub enum NotificationFilter<'a> {
    User(&'a str),
    UnreadForUser(&'a str),
    UserAndMessage { user_id: &'a str, message_id: &'a str },
    Message(&'a str),
}

#[derive(Debug, Clone, Copy)]
pub enum HistoryFilter<'a> {
    Message(&'a str),
    Editor(&'a str),
}

/// A rendered `WHERE` clause plus its positional parameters.
pub(crate) struct Clause<'a> {
    pub sql: String,
    pub params: Vec<&'a str>,
    pub order: &'static str,
}

impl<'a> MessageFilter<'a> {
    pub(crate) fn clause(&self) -> Clause<'a> {
        match *self {
            Self::Id(id) => Clause {
                sql: "id = ?1".into(),
                params: vec![id],
                order: "",
            },
            Self::Roots => Clause {
                sql: "parent_id IS NULL".into(),
                params: vec![],
                order: "ORDER BY created_at DESC, rowid DESC",
            },
            Self::ParentIn(ids) => Clause {
                sql: format!("parent_id IN ({})", placeholders(ids.len())),
                params: ids.iter().map(String::as_str).collect(),
                order: "ORDER BY created_at ASC, rowid ASC",
            },
            Self::Involving(user_id) => Clause {
                sql: "sender_id = ?1 OR receiver_id = ?1".into(),
                params: vec![user_id],
                order: "ORDER BY created_at DESC, rowid DESC",
            },
            Self::UnreadFor(user_id) => Clause {
                sql: "receiver_id = ?1 AND EXISTS (
                        SELECT 1 FROM notifications n
                        WHERE n.message_id = messages.id AND n.user_id = ?1 AND n.read = 0
                     )"
                .into(),
                params: vec![user_id],
                order: "ORDER BY created_at DESC, rowid DESC",
            },
        }
    }
}

impl<'a> NotificationFilter<'a> {
    pub(crate) fn clause(&self) -> Clause<'a> {
        let order = "ORDER BY created_at DESC, rowid DESC";
        match *self {
            Self::User(user_id) => Clause {
                sql: "user_id = ?1".into(),
                params: vec![user_id],
                order,
            },
            Self::UnreadForUser(user_id) => Clause {
                sql: "user_id = ?1 AND read = 0".into(),
                params: vec![user_id],
                order,
            },
            Self::UserAndMessage { user_id, message_id } => Clause {
                sql: "user_id = ?1 AND message_id = ?2".into(),
                params: vec![user_id, message_id],
                order,
            },
            Self::Message(message_id) => Clause {
                sql: "message_id = ?1".into(),
                params: vec![message_id],
                order,
            },
        }
    }
}

impl<'a> HistoryFilter<'a> {
    pub(crate) fn clause(&self) -> Clause<'a> {
        let order = "ORDER BY edited_at DESC, rowid DESC";
        match *self {
            Self::Message(message_id) => Clause {
                sql: "message_id = ?1".into(),
                params: vec![message_id],
                order,
            },
            Self::Editor(editor_id) => Clause {
                sql: "editor_id = ?1".into(),
                params: vec![editor_id],
                order,
            },
        }
    }
}

fn placeholders(n: usize) -> String {
    (1..=n).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}
