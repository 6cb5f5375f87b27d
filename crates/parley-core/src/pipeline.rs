use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use parley_db::Database;
use parley_db::models::{HistoryFilter, HistoryRow, MessageFilter, NotificationFilter, NotificationRow};
use parley_types::models::{DeletionReport, HistoryEntry, Message};

use crate::convert;
use crate::error::{Error, Result};

/// The only write path for messages. Each mutation and everything derived from it
/// (notification, history entry, account cleanup) commits as one transaction.
pub struct MutationPipeline {
    db: Arc<Database>,
}

impl MutationPipeline {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Send a message and notify its receiver.
    pub fn send(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: &str,
        parent_id: Option<Uuid>,
    ) -> Result<Message> {
        require_user(sender_id, "sender")?;
        require_user(receiver_id, "receiver")?;
        require_content(content)?;

        let message = Message {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            content: content.to_string(),
            edited: false,
            parent_id,
            created_at: convert::now(),
        };
        let notification = NotificationRow {
            id: Uuid::new_v4().to_string(),
            user_id: receiver_id.to_string(),
            message_id: message.id.to_string(),
            read: false,
            created_at: convert::timestamp(message.created_at),
        };

        self.db.transaction(|r| {
            if let Some(parent_id) = parent_id {
                if r.get_message(&parent_id.to_string())?.is_none() {
                    return Err(Error::NotFound(format!("parent message {}", parent_id)).into());
                }
            }
            r.insert_message(&convert::message_to_row(&message))?;
            r.insert_notification(&notification)?;
            Ok(())
        })?;

        debug!(
            message_id = %message.id,
            parent_id = ?message.parent_id,
            "Message sent from {} to {}",
            sender_id,
            receiver_id
        );
        Ok(message)
    }

    /// Replace a message's content. A changed edit records the previous content and marks
    /// the message edited; an identical edit writes nothing.
    pub fn edit(&self, message_id: Uuid, new_content: &str, editor_id: Option<Uuid>) -> Result<Message> {
        require_content(new_content)?;

        let id = message_id.to_string();
        let edited_at = convert::now();

        // The comparison reads under the write lock taken by the immediate transaction.
        let (row, changed) = self.db.transaction(|r| {
            let mut current = r
                .get_message(&id)?
                .ok_or_else(|| Error::NotFound(format!("message {}", message_id)))?;

            if current.content == new_content {
                return Ok((current, false));
            }

            r.insert_history(&HistoryRow {
                id: Uuid::new_v4().to_string(),
                message_id: id.clone(),
                old_content: current.content.clone(),
                editor_id: editor_id.map(|editor| editor.to_string()),
                edited_at: convert::timestamp(edited_at),
            })?;
            r.update_message_content(&id, new_content, true)?;

            current.content = new_content.to_string();
            current.edited = true;
            Ok((current, true))
        })?;

        if changed {
            debug!(%message_id, editor_id = ?editor_id, "Message edited");
        } else {
            debug!(%message_id, "Edit left content unchanged");
        }
        Ok(convert::message_from_row(row))
    }

    /// Remove everything tied to a deleted account: the user's notifications, the history
    /// entries they authored, then every message they sent or received (with those
    /// messages' replies and derived rows). Safe to re-run.
    pub fn delete_account(&self, user_id: Uuid) -> Result<DeletionReport> {
        require_user(user_id, "user")?;
        let uid = user_id.to_string();

        let report = self.db.transaction(|r| {
            let notifications = r.delete_notifications(&NotificationFilter::User(&uid))?;
            let history_entries = r.delete_history(&HistoryFilter::Editor(&uid))?;
            // Counted up front: a cascade from one matched message can remove another
            // matched reply before the delete statement reaches it.
            let messages = r.count_messages(&MessageFilter::Involving(&uid))?;
            r.delete_messages(&MessageFilter::Involving(&uid))?;
            Ok(DeletionReport {
                notifications,
                history_entries,
                messages,
            })
        })?;

        info!(
            %user_id,
            notifications = report.notifications,
            history_entries = report.history_entries,
            messages = report.messages,
            "Account data removed"
        );
        Ok(report)
    }

    /// Edit history of a message, newest first.
    pub fn history(&self, message_id: Uuid) -> Result<Vec<HistoryEntry>> {
        let id = message_id.to_string();
        let rows = self.db.with_conn(|r| {
            if r.get_message(&id)?.is_none() {
                return Err(Error::NotFound(format!("message {}", message_id)).into());
            }
            r.query_history(&HistoryFilter::Message(&id))
        })?;
        Ok(rows.into_iter().map(convert::history_from_row).collect())
    }
}

fn require_user(id: Uuid, role: &str) -> Result<()> {
    if id.is_nil() {
        return Err(Error::Validation(format!("{} is required", role)));
    }
    Ok(())
}

fn require_content(content: &str) -> Result<()> {
    if content.trim().is_empty() {
        return Err(Error::Validation("content must not be empty".into()));
    }
    Ok(())
}
