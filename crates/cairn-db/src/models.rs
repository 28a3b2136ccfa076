//! Database row types. These map directly to SQLite rows.
//! Distinct from cairn-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub author_username: String,
    pub outcome: Option<String>,
    pub created_at: String,
}

/// Values for a new message row. The caller assigns id and timestamp.
pub struct NewMessage<'a> {
    pub id: &'a str,
    pub content: &'a str,
    pub author_id: &'a str,
    pub outcome: Option<&'a str>,
    pub created_at: &'a str,
}
