use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use super::repo_types::{DietaryPreferenceRow, MemberPreferenceRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreferenceType {
    Allergy,
    Diet,
    Supplementation,
}

impl PreferenceType {
    pub fn as_str(self) -> &'static str {
        match self {
            PreferenceType::Allergy => "ALLERGY",
            PreferenceType::Diet => "DIET",
            PreferenceType::Supplementation => "SUPPLEMENTATION",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "ALLERGY" => Ok(PreferenceType::Allergy),
            "DIET" => Ok(PreferenceType::Diet),
            "SUPPLEMENTATION" => Ok(PreferenceType::Supplementation),
            other => anyhow::bail!("unknown dietary preference type {other}"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DietaryPreference {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub pref_type: PreferenceType,
    pub description: Option<String>,
}

impl TryFrom<DietaryPreferenceRow> for DietaryPreference {
    type Error = anyhow::Error;

    fn try_from(r: DietaryPreferenceRow) -> anyhow::Result<Self> {
        Ok(Self {
            id: r.id,
            name: r.name,
            pref_type: PreferenceType::parse(&r.pref_type)?,
            description: r.description,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePreferenceRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub pref_type: PreferenceType,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPreference {
    pub preference_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub pref_type: PreferenceType,
    pub notes: Option<String>,
}

impl TryFrom<MemberPreferenceRow> for MemberPreference {
    type Error = anyhow::Error;

    fn try_from(r: MemberPreferenceRow) -> anyhow::Result<Self> {
        Ok(Self {
            preference_id: r.preference_id,
            name: r.name,
            pref_type: PreferenceType::parse(&r.pref_type)?,
            notes: r.notes,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    pub id: Uuid,
    pub name: String,
    pub birth_date: Date,
    pub is_guest: bool,
    pub dietary_preferences: Vec<MemberPreference>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceLink {
    pub preference_id: Uuid,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of `POST /family-members` and `PUT /family-members/:id`. On update,
/// `dietaryPreferences` replaces the member's set only when present.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequest {
    pub name: String,
    pub birth_date: Date,
    #[serde(default)]
    pub is_guest: bool,
    #[serde(default)]
    pub dietary_preferences: Option<Vec<PreferenceLink>>,
}
