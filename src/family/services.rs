use std::collections::{HashMap, HashSet};

use sqlx::PgPool;
use time::Date;
use uuid::Uuid;

use super::dto::{FamilyMember, MemberPreference, MemberRequest, PreferenceLink};
use super::repo;
use super::repo_types::{FamilyMemberRow, MemberPreferenceRow};
use crate::error::{ensure_owner, AppError, AppResult};

pub const MAX_NAME_CHARS: usize = 100;

/// Trims and checks a member payload against `today`.
pub fn validate_member(mut req: MemberRequest, today: Date) -> AppResult<MemberRequest> {
    let mut errors = Vec::new();
    req.name = req.name.trim().to_string();
    if req.name.is_empty() {
        errors.push("name is required".to_string());
    } else if req.name.chars().count() > MAX_NAME_CHARS {
        errors.push(format!("name must be at most {MAX_NAME_CHARS} characters"));
    }
    if req.birth_date > today {
        errors.push("birthDate must not be in the future".to_string());
    }
    if let Some(links) = &req.dietary_preferences {
        let distinct: HashSet<Uuid> = links.iter().map(|l| l.preference_id).collect();
        if distinct.len() != links.len() {
            errors.push("dietaryPreferences must not repeat a preference".to_string());
        }
    }
    if errors.is_empty() {
        Ok(req)
    } else {
        Err(AppError::Validation(errors))
    }
}

pub fn assemble(
    rows: Vec<FamilyMemberRow>,
    prefs: Vec<MemberPreferenceRow>,
) -> anyhow::Result<Vec<FamilyMember>> {
    let mut by_member: HashMap<Uuid, Vec<MemberPreference>> = HashMap::new();
    for p in prefs {
        let member_id = p.member_id;
        by_member
            .entry(member_id)
            .or_default()
            .push(MemberPreference::try_from(p)?);
    }
    Ok(rows
        .into_iter()
        .map(|r| FamilyMember {
            dietary_preferences: by_member.remove(&r.id).unwrap_or_default(),
            id: r.id,
            name: r.name,
            birth_date: r.birth_date,
            is_guest: r.is_guest,
        })
        .collect())
}

pub async fn load_owned(db: &PgPool, user_id: Uuid, member_id: Uuid) -> AppResult<FamilyMemberRow> {
    let row = repo::find_member(db, member_id).await?;
    ensure_owner("family member", row.as_ref().map(|r| r.user_id), user_id)?;
    row.ok_or(AppError::NotFound("family member"))
}

pub async fn load_full(db: &PgPool, row: FamilyMemberRow) -> AppResult<FamilyMember> {
    let prefs = repo::member_preferences(db, &[row.id]).await?;
    let mut members = assemble(vec![row], prefs)?;
    members.pop().ok_or(AppError::NotFound("family member"))
}

/// Every linked preference must exist in the catalog.
pub async fn check_links(db: &PgPool, links: &[PreferenceLink]) -> AppResult<()> {
    if links.is_empty() {
        return Ok(());
    }
    let ids: Vec<Uuid> = links.iter().map(|l| l.preference_id).collect();
    if repo::count_catalog(db, &ids).await? != ids.len() as i64 {
        return Err(AppError::validation("unknown dietary preference"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{macros::date, OffsetDateTime};

    fn req(name: &str, birth: Date) -> MemberRequest {
        MemberRequest {
            name: name.into(),
            birth_date: birth,
            is_guest: false,
            dietary_preferences: None,
        }
    }

    #[test]
    fn trims_and_accepts_a_member() {
        let ok = validate_member(req("  Ada ", date!(2015 - 04 - 01)), date!(2024 - 06 - 03)).unwrap();
        assert_eq!(ok.name, "Ada");
    }

    #[test]
    fn collects_every_problem() {
        let err = validate_member(req(" ", date!(2030 - 01 - 01)), date!(2024 - 06 - 03)).unwrap_err();
        match err {
            AppError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn repeated_preferences_are_rejected() {
        let pref = Uuid::new_v4();
        let mut r = req("Bo", date!(2010 - 01 - 01));
        r.dietary_preferences = Some(vec![
            PreferenceLink { preference_id: pref, notes: None },
            PreferenceLink { preference_id: pref, notes: Some("mild".into()) },
        ]);
        assert!(validate_member(r, date!(2024 - 06 - 03)).is_err());
    }

    #[test]
    fn preferences_attach_to_their_member() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let row = |id, name: &str| FamilyMemberRow {
            id,
            user_id: Uuid::nil(),
            name: name.into(),
            birth_date: date!(2000 - 01 - 01),
            is_guest: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let members = assemble(
            vec![row(a, "A"), row(b, "B")],
            vec![MemberPreferenceRow {
                member_id: b,
                preference_id: Uuid::new_v4(),
                name: "peanuts".into(),
                pref_type: "ALLERGY".into(),
                notes: None,
            }],
        )
        .unwrap();
        assert!(members[0].dietary_preferences.is_empty());
        assert_eq!(members[1].dietary_preferences[0].name, "peanuts");
    }
}
