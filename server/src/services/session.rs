//! Session management.
//!
//! ARCHITECTURE
//! ============
//! Sign-in itself is delegated to an external identity page. This service
//! only issues and validates the opaque session tokens that page (or the dev
//! bypass) hands back, and resolves them to the user who owns them.

use std::fmt::Write;

use rand::Rng;
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Fixed id of the user created by the dev auth bypass.
pub const DEV_USER_ID: Uuid = Uuid::from_u128(0xd3_7e57);

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// User row returned from session validation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub name: String,
    /// Profile page, if any.
    pub url: Option<String>,
    pub avatar_url: Option<String>,
}

impl SessionUser {
    #[must_use]
    pub fn actor(&self) -> wire::Actor {
        wire::Actor { id: self.id, name: self.name.clone(), url: self.url.clone(), avatar: self.avatar_url.clone() }
    }
}

/// Create a session for the given user, returning the token.
pub async fn create_session(pool: &PgPool, user_id: Uuid) -> Result<String, sqlx::Error> {
    let token = generate_token();
    sqlx::query("INSERT INTO sessions (token, user_id) VALUES ($1, $2)")
        .bind(&token)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(token)
}

/// Validate a session token and return the associated user.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<SessionUser>, sqlx::Error> {
    let row = sqlx::query(
        r"SELECT u.id, u.name, u.url, u.avatar_url
          FROM sessions s
          JOIN users u ON u.id = s.user_id
          WHERE s.token = $1 AND s.expires_at > now()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| SessionUser {
        id: r.get("id"),
        name: r.get("name"),
        url: r.get("url"),
        avatar_url: r.get("avatar_url"),
    }))
}

/// Delete a session by token.
pub async fn delete_session(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(pool)
        .await?;
    Ok(())
}

/// Insert or refresh the dev bypass user.
pub async fn upsert_dev_user(pool: &PgPool) -> Result<Uuid, sqlx::Error> {
    sqlx::query(
        "INSERT INTO users (id, name) VALUES ($1, $2)
         ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name",
    )
    .bind(DEV_USER_ID)
    .bind("Dev User")
    .execute(pool)
    .await?;
    Ok(DEV_USER_ID)
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
