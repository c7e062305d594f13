use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Account row. The email is stored lower-cased.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: OffsetDateTime,
}
