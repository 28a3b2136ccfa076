use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        -- outcome holds the resolved dice command as JSON, NULL for plain chat.
        -- created_at is RFC 3339 UTC with fixed precision so it sorts as text.
        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            content     TEXT NOT NULL,
            author_id   TEXT NOT NULL REFERENCES users(id),
            outcome     TEXT,
            created_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_created
            ON messages(created_at);

        CREATE INDEX IF NOT EXISTS idx_messages_author
            ON messages(author_id);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
