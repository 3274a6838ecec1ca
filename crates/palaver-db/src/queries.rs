use crate::Database;
use crate::models::{ChatRow, ChatWithUserRow, UserRow, UserWithCountRow};
use anyhow::Result;
use rusqlite::Connection;

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: &str,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, password, role) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, username, email, password_hash, role),
            )?;
            Ok(())
        })
    }

    /// Looks the user up by username OR email — login accepts either.
    pub fn get_user_by_identifier(&self, identifier: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_identifier(conn, identifier))
    }

    pub fn user_exists(&self, username: &str, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1 OR email = ?2)",
                (username, email),
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    pub fn admin_exists(&self) -> Result<bool> {
        self.with_conn(|conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE role = 'ADMIN')",
                [],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
    }

    /// All users with derived chat counts, newest account first.
    pub fn list_users(&self) -> Result<Vec<UserWithCountRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.email, u.role, u.created_at, COUNT(c.id)
                 FROM users u
                 LEFT JOIN chats c ON c.user_id = u.id
                 GROUP BY u.id
                 ORDER BY u.created_at DESC, u.rowid DESC",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(UserWithCountRow {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                        role: row.get(3)?,
                        created_at: row.get(4)?,
                        chat_count: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Returns false when the id is unknown. Owned chats go with the user
    /// (ON DELETE CASCADE).
    pub fn delete_user(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    // -- Chats --

    pub fn insert_chat(&self, id: &str, user_id: &str, message: &str, response: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chats (id, user_id, message, response) VALUES (?1, ?2, ?3, ?4)",
                (id, user_id, message, response),
            )?;
            Ok(())
        })
    }

    pub fn get_chats_by_user(&self, user_id: &str) -> Result<Vec<ChatRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, message, response, created_at
                 FROM chats
                 WHERE user_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;

            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ChatRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        message: row.get(2)?,
                        response: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// All chats with the owning username joined in, newest first (admin view).
    pub fn list_chats(&self) -> Result<Vec<ChatWithUserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.user_id, u.username, c.message, c.response, c.created_at
                 FROM chats c
                 LEFT JOIN users u ON c.user_id = u.id
                 ORDER BY c.created_at DESC, c.rowid DESC",
            )?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(ChatWithUserRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        username: row
                            .get::<_, Option<String>>(2)?
                            .unwrap_or_else(|| "unknown".to_string()),
                        message: row.get(3)?,
                        response: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn delete_chat(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM chats WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn query_user_by_identifier(conn: &Connection, identifier: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, email, password, role, created_at
         FROM users
         WHERE username = ?1 OR email = ?1",
    )?;

    let row = stmt
        .query_row([identifier], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                role: row.get(4)?,
                created_at: row.get(5)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
