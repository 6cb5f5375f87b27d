use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use parley_db::Database;
use parley_db::models::{MessageFilter, NotificationFilter};
use parley_types::models::{Message, Notification};

use crate::convert;
use crate::error::{Error, Result};

/// Read/unread view of a user's received messages. Read state lives on the
/// notification only; messages carry none.
pub struct Inbox {
    db: Arc<Database>,
}

impl Inbox {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Received messages whose notification is still unread, newest first.
    pub fn unread_for_user(&self, user_id: Uuid) -> Result<Vec<Message>> {
        let uid = user_id.to_string();
        let rows = self
            .db
            .with_conn(|r| r.query_messages(&MessageFilter::UnreadFor(&uid)))?;
        Ok(rows.into_iter().map(convert::message_from_row).collect())
    }

    pub fn notifications_for_user(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>> {
        let uid = user_id.to_string();
        let filter = if unread_only {
            NotificationFilter::UnreadForUser(&uid)
        } else {
            NotificationFilter::User(&uid)
        };
        let rows = self.db.with_conn(|r| r.query_notifications(&filter))?;
        Ok(rows.into_iter().map(convert::notification_from_row).collect())
    }

    /// Mark the user's notification for `message_id` as read. Marking twice is fine.
    pub fn mark_read(&self, user_id: Uuid, message_id: Uuid) -> Result<()> {
        let (uid, mid) = (user_id.to_string(), message_id.to_string());
        let filter = NotificationFilter::UserAndMessage {
            user_id: &uid,
            message_id: &mid,
        };

        self.db.transaction(|r| {
            if r.query_notifications(&filter)?.is_empty() {
                return Err(Error::NotFound(format!(
                    "notification for message {} and user {}",
                    message_id, user_id
                ))
                .into());
            }
            r.set_notifications_read(&filter)
        })?;

        debug!(%user_id, %message_id, "Notification marked read");
        Ok(())
    }

    /// Returns how many notifications flipped from unread to read.
    pub fn mark_all_read(&self, user_id: Uuid) -> Result<usize> {
        let uid = user_id.to_string();
        let flipped = self
            .db
            .transaction(|r| r.set_notifications_read(&NotificationFilter::User(&uid)))?;
        debug!(%user_id, flipped, "All notifications marked read");
        Ok(flipped)
    }
}
