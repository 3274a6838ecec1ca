use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            role        TEXT NOT NULL DEFAULT 'USER',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- At most one row may carry the ADMIN role. The bootstrap endpoint's
        -- read-then-check cannot survive a race on its own; this index can.
        CREATE UNIQUE INDEX IF NOT EXISTS idx_users_single_admin
            ON users(role) WHERE role = 'ADMIN';

        CREATE TABLE IF NOT EXISTS chats (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            message     TEXT NOT NULL,
            response    TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_chats_user
            ON chats(user_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
