/// Database row types — these map directly to SQLite rows.
/// Distinct from palaver-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub created_at: String,
}

pub struct ChatRow {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub response: String,
    pub created_at: String,
}

pub struct ChatWithUserRow {
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub message: String,
    pub response: String,
    pub created_at: String,
}

pub struct UserWithCountRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
    pub chat_count: i64,
}
