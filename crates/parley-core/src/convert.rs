use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use tracing::warn;
use uuid::Uuid;

use parley_db::models::{HistoryRow, MessageRow, NotificationRow};
use parley_types::models::{HistoryEntry, Message, Notification};

/// Current time at the precision the store keeps, so a returned record equals its reload.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 in UTC; sorts lexicographically in time order.
pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str, field: &str, owner: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            warn!("Corrupt {} '{}' on record '{}': {}", field, raw, owner, e);
            DateTime::default()
        })
}

fn parse_id(raw: &str, field: &str, owner: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on record '{}': {}", field, raw, owner, e);
        Uuid::default()
    })
}

pub(crate) fn message_to_row(message: &Message) -> MessageRow {
    MessageRow {
        id: message.id.to_string(),
        sender_id: message.sender_id.to_string(),
        receiver_id: message.receiver_id.to_string(),
        content: message.content.clone(),
        edited: message.edited,
        parent_id: message.parent_id.map(|id| id.to_string()),
        created_at: timestamp(message.created_at),
    }
}

pub(crate) fn message_from_row(row: MessageRow) -> Message {
    Message {
        id: parse_id(&row.id, "id", &row.id),
        sender_id: parse_id(&row.sender_id, "sender_id", &row.id),
        receiver_id: parse_id(&row.receiver_id, "receiver_id", &row.id),
        parent_id: row
            .parent_id
            .as_deref()
            .map(|parent| parse_id(parent, "parent_id", &row.id)),
        created_at: parse_timestamp(&row.created_at, "created_at", &row.id),
        content: row.content,
        edited: row.edited,
    }
}

pub(crate) fn notification_from_row(row: NotificationRow) -> Notification {
    Notification {
        id: parse_id(&row.id, "id", &row.id),
        user_id: parse_id(&row.user_id, "user_id", &row.id),
        message_id: parse_id(&row.message_id, "message_id", &row.id),
        read: row.read,
        created_at: parse_timestamp(&row.created_at, "created_at", &row.id),
    }
}

pub(crate) fn history_from_row(row: HistoryRow) -> HistoryEntry {
    HistoryEntry {
        id: parse_id(&row.id, "id", &row.id),
        message_id: parse_id(&row.message_id, "message_id", &row.id),
        editor_id: row
            .editor_id
            .as_deref()
            .map(|editor| parse_id(editor, "editor_id", &row.id)),
        edited_at: parse_timestamp(&row.edited_at, "edited_at", &row.id),
        old_content: row.old_content,
    }
}
