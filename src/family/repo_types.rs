use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct FamilyMemberRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub birth_date: Date,
    pub is_guest: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, FromRow)]
pub struct DietaryPreferenceRow {
    pub id: Uuid,
    pub name: String,
    pub pref_type: String, // ALLERGY | DIET | SUPPLEMENTATION
    pub description: Option<String>,
}

/// A member's link to a catalog preference, joined with the catalog row.
#[derive(Debug, Clone, FromRow)]
pub struct MemberPreferenceRow {
    pub member_id: Uuid,
    pub preference_id: Uuid,
    pub name: String,
    pub pref_type: String,
    pub notes: Option<String>,
}
