use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use rusqlite::{Connection, Row, params_from_iter};
use tracing::debug;

use crate::models::{
    Clause, HistoryFilter, HistoryRow, MessageFilter, MessageRow, NotificationFilter,
    NotificationRow, RecordKind,
};

const MESSAGE_COLUMNS: &str = "id, sender_id, receiver_id, content, edited, parent_id, created_at";
const NOTIFICATION_COLUMNS: &str = "id, user_id, message_id, read, created_at";
const HISTORY_COLUMNS: &str = "id, message_id, old_content, editor_id, edited_at";

/// CRUD and filtered queries over one connection, scoped by [`crate::Database::with_conn`]
/// or [`crate::Database::transaction`]. Every statement is logged and counted.
pub struct Records<'c> {
    conn: &'c Connection,
    statements: &'c AtomicU64,
}

impl<'c> Records<'c> {
    pub(crate) fn new(conn: &'c Connection, statements: &'c AtomicU64) -> Self {
        Self { conn, statements }
    }

    // -- Messages --

    pub fn insert_message(&self, row: &MessageRow) -> Result<()> {
        self.execute(
            &format!("INSERT INTO messages ({MESSAGE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            rusqlite::params![
                row.id,
                row.sender_id,
                row.receiver_id,
                row.content,
                row.edited,
                row.parent_id,
                row.created_at
            ],
        )?;
        Ok(())
    }

    pub fn get_message(&self, id: &str) -> Result<Option<MessageRow>> {
        Ok(self.query_messages(&MessageFilter::Id(id))?.into_iter().next())
    }

    pub fn query_messages(&self, filter: &MessageFilter<'_>) -> Result<Vec<MessageRow>> {
        if let MessageFilter::ParentIn(ids) = filter {
            if ids.is_empty() {
                return Ok(vec![]);
            }
        }
        self.select(RecordKind::Message, MESSAGE_COLUMNS, filter.clause(), message_from_row)
    }

    /// Overwrites content and the edited flag. Returns the number of rows changed.
    pub fn update_message_content(&self, id: &str, content: &str, edited: bool) -> Result<usize> {
        self.execute(
            "UPDATE messages SET content = ?1, edited = ?2 WHERE id = ?3",
            rusqlite::params![content, edited, id],
        )
    }

    pub fn count_messages(&self, filter: &MessageFilter<'_>) -> Result<usize> {
        let clause = filter.clause();
        let sql = format!("SELECT COUNT(*) FROM messages WHERE {}", clause.sql);
        self.log(&sql);

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let count: i64 = stmt.query_row(params_from_iter(clause.params.iter()), |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Replies, notifications and history of each removed message go with it (FK cascade).
    /// The returned count excludes cascaded rows, and may miss matched rows that a
    /// cascade removed first; use [`Records::count_messages`] beforehand for an exact figure.
    pub fn delete_messages(&self, filter: &MessageFilter<'_>) -> Result<usize> {
        self.delete(RecordKind::Message, filter.clause())
    }

    // -- Notifications --

    pub fn insert_notification(&self, row: &NotificationRow) -> Result<()> {
        self.execute(
            &format!("INSERT INTO notifications ({NOTIFICATION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
            rusqlite::params![row.id, row.user_id, row.message_id, row.read, row.created_at],
        )?;
        Ok(())
    }

    pub fn query_notifications(&self, filter: &NotificationFilter<'_>) -> Result<Vec<NotificationRow>> {
        self.select(
            RecordKind::Notification,
            NOTIFICATION_COLUMNS,
            filter.clause(),
            notification_from_row,
        )
    }

    pub fn set_notifications_read(&self, filter: &NotificationFilter<'_>) -> Result<usize> {
        let clause = filter.clause();
        self.execute(
            &format!("UPDATE notifications SET read = 1 WHERE read = 0 AND ({})", clause.sql),
            params_from_iter(clause.params.iter()),
        )
    }

    pub fn delete_notifications(&self, filter: &NotificationFilter<'_>) -> Result<usize> {
        self.delete(RecordKind::Notification, filter.clause())
    }

    // -- History --

    pub fn insert_history(&self, row: &HistoryRow) -> Result<()> {
        self.execute(
            &format!("INSERT INTO message_history ({HISTORY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
            rusqlite::params![row.id, row.message_id, row.old_content, row.editor_id, row.edited_at],
        )?;
        Ok(())
    }

    pub fn query_history(&self, filter: &HistoryFilter<'_>) -> Result<Vec<HistoryRow>> {
        self.select(RecordKind::HistoryEntry, HISTORY_COLUMNS, filter.clause(), history_from_row)
    }

    pub fn delete_history(&self, filter: &HistoryFilter<'_>) -> Result<usize> {
        self.delete(RecordKind::HistoryEntry, filter.clause())
    }

    // -- Plumbing --

    fn select<T, F>(&self, kind: RecordKind, columns: &str, clause: Clause<'_>, map: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} {}",
            columns,
            kind.table(),
            clause.sql,
            clause.order
        );
        self.log(&sql);

        let mut stmt = self.conn.prepare_cached(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(clause.params.iter()), map)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn delete(&self, kind: RecordKind, clause: Clause<'_>) -> Result<usize> {
        let removed = self.execute(
            &format!("DELETE FROM {} WHERE {}", kind.table(), clause.sql),
            params_from_iter(clause.params.iter()),
        )?;
        debug!(%kind, removed, "Deleted records");
        Ok(removed)
    }

    fn execute<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<usize> {
        self.log(sql);
        let mut stmt = self.conn.prepare_cached(sql)?;
        Ok(stmt.execute(params)?)
    }

    fn log(&self, sql: &str) {
        self.statements.fetch_add(1, Ordering::Relaxed);
        debug!(target: "parley_db::sql", "Executing query: {}", sql);
    }
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        content: row.get(3)?,
        edited: row.get(4)?,
        parent_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn notification_from_row(row: &Row<'_>) -> rusqlite::Result<NotificationRow> {
    Ok(NotificationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        message_id: row.get(2)?,
        read: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn history_from_row(row: &Row<'_>) -> rusqlite::Result<HistoryRow> {
    Ok(HistoryRow {
        id: row.get(0)?,
        message_id: row.get(1)?,
        old_content: row.get(2)?,
        editor_id: row.get(3)?,
        edited_at: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn message(id: &str, parent_id: Option<&str>, created_at: &str) -> MessageRow {
        MessageRow {
            id: id.into(),
            sender_id: "alice".into(),
            receiver_id: "bob".into(),
            content: format!("content of {id}"),
            edited: false,
            parent_id: parent_id.map(Into::into),
            created_at: created_at.into(),
        }
    }

    fn notification(id: &str, user_id: &str, message_id: &str) -> NotificationRow {
        NotificationRow {
            id: id.into(),
            user_id: user_id.into(),
            message_id: message_id.into(),
            read: false,
            created_at: "2026-01-01T00:00:00.000000Z".into(),
        }
    }

    #[test]
    fn parent_in_returns_replies_oldest_first() {
        let db = Database::open_in_memory().unwrap();
        db.transaction(|r| {
            r.insert_message(&message("root", None, "2026-01-01T00:00:00.000000Z"))?;
            r.insert_message(&message("late", Some("root"), "2026-01-01T00:00:03.000000Z"))?;
            r.insert_message(&message("early", Some("root"), "2026-01-01T00:00:01.000000Z"))?;
            r.insert_message(&message("other", None, "2026-01-01T00:00:02.000000Z"))?;
            Ok(())
        })
        .unwrap();

        let parents = vec!["root".to_string()];
        let replies = db
            .with_conn(|r| r.query_messages(&MessageFilter::ParentIn(&parents)))
            .unwrap();
        let ids: Vec<_> = replies.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["early", "late"]);

        let roots = db.with_conn(|r| r.query_messages(&MessageFilter::Roots)).unwrap();
        let ids: Vec<_> = roots.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["other", "root"]);
    }

    #[test]
    fn empty_frontier_skips_the_store() {
        let db = Database::open_in_memory().unwrap();
        let before = db.statements_executed();
        let rows = db.with_conn(|r| r.query_messages(&MessageFilter::ParentIn(&[]))).unwrap();
        assert!(rows.is_empty());
        assert_eq!(db.statements_executed(), before);
    }

    #[test]
    fn deleting_a_message_cascades_to_derived_rows_and_replies() {
        let db = Database::open_in_memory().unwrap();
        db.transaction(|r| {
            r.insert_message(&message("root", None, "2026-01-01T00:00:00.000000Z"))?;
            r.insert_message(&message("reply", Some("root"), "2026-01-01T00:00:01.000000Z"))?;
            r.insert_notification(&notification("n1", "bob", "root"))?;
            r.insert_notification(&notification("n2", "bob", "reply"))?;
            r.insert_history(&HistoryRow {
                id: "h1".into(),
                message_id: "root".into(),
                old_content: "before".into(),
                editor_id: Some("alice".into()),
                edited_at: "2026-01-01T00:00:02.000000Z".into(),
            })?;
            Ok(())
        })
        .unwrap();

        let removed = db.transaction(|r| r.delete_messages(&MessageFilter::Id("root"))).unwrap();
        assert_eq!(removed, 1);

        db.with_conn(|r| {
            assert!(r.get_message("reply")?.is_none());
            assert!(r.query_notifications(&NotificationFilter::User("bob"))?.is_empty());
            assert!(r.query_history(&HistoryFilter::Message("root"))?.is_empty());
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn unread_filter_follows_notification_state() {
        let db = Database::open_in_memory().unwrap();
        db.transaction(|r| {
            r.insert_message(&message("m1", None, "2026-01-01T00:00:00.000000Z"))?;
            r.insert_message(&message("m2", None, "2026-01-01T00:00:01.000000Z"))?;
            r.insert_notification(&notification("n1", "bob", "m1"))?;
            r.insert_notification(&notification("n2", "bob", "m2"))?;
            Ok(())
        })
        .unwrap();

        let flipped = db
            .transaction(|r| {
                r.set_notifications_read(&NotificationFilter::UserAndMessage {
                    user_id: "bob",
                    message_id: "m1",
                })
            })
            .unwrap();
        assert_eq!(flipped, 1);

        let unread = db.with_conn(|r| r.query_messages(&MessageFilter::UnreadFor("bob"))).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, "m2");

        // already read: nothing left to flip
        let flipped = db
            .transaction(|r| {
                r.set_notifications_read(&NotificationFilter::UserAndMessage {
                    user_id: "bob",
                    message_id: "m1",
                })
            })
            .unwrap();
        assert_eq!(flipped, 0);
    }
}
