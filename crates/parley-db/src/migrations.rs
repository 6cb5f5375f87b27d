use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Latest schema version this build knows how to create.
pub const SCHEMA_VERSION: i64 = 1;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (messages, notifications, history)");
        // User ids are owned by the account service, so they carry no foreign key.
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                sender_id       TEXT NOT NULL,
                receiver_id     TEXT NOT NULL,
                content         TEXT NOT NULL,
                edited          INTEGER NOT NULL DEFAULT 0,
                parent_id       TEXT REFERENCES messages(id) ON DELETE CASCADE,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_messages_parent ON messages(parent_id, created_at);
            CREATE INDEX idx_messages_sender ON messages(sender_id);
            CREATE INDEX idx_messages_receiver ON messages(receiver_id, created_at);

            CREATE TABLE notifications (
                id          TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL,
                message_id  TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                read        INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL,
                UNIQUE(user_id, message_id)
            );

            CREATE INDEX idx_notifications_user ON notifications(user_id, read);
            CREATE INDEX idx_notifications_message ON notifications(message_id);

            CREATE TABLE message_history (
                id           TEXT PRIMARY KEY,
                message_id   TEXT NOT NULL REFERENCES messages(id) ON DELETE CASCADE,
                old_content  TEXT NOT NULL,
                editor_id    TEXT,
                edited_at    TEXT NOT NULL
            );

            CREATE INDEX idx_history_message ON message_history(message_id, edited_at);
            CREATE INDEX idx_history_editor ON message_history(editor_id);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete (schema v{})", SCHEMA_VERSION);
    Ok(())
}
