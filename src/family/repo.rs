use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use time::Date;
use uuid::Uuid;

use super::dto::{PreferenceLink, PreferenceType};
use super::repo_types::{DietaryPreferenceRow, FamilyMemberRow, MemberPreferenceRow};

// ---- members ----

pub async fn list_members(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<FamilyMemberRow>> {
    let rows = sqlx::query_as::<_, FamilyMemberRow>(
        r#"
        SELECT id, user_id, name, birth_date, is_guest, created_at
          FROM family_members
         WHERE user_id = $1
         ORDER BY created_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list family members")?;
    Ok(rows)
}

pub async fn find_member(db: &PgPool, member_id: Uuid) -> anyhow::Result<Option<FamilyMemberRow>> {
    let row = sqlx::query_as::<_, FamilyMemberRow>(
        r#"
        SELECT id, user_id, name, birth_date, is_guest, created_at
          FROM family_members
         WHERE id = $1
        "#,
    )
    .bind(member_id)
    .fetch_optional(db)
    .await
    .context("find family member")?;
    Ok(row)
}

/// How many of `ids` belong to `user_id`.
pub async fn count_owned(db: &PgPool, user_id: Uuid, ids: &[Uuid]) -> anyhow::Result<i64> {
    let n = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM family_members WHERE user_id = $1 AND id = ANY($2)",
    )
    .bind(user_id)
    .bind(ids)
    .fetch_one(db)
    .await
    .context("count owned members")?;
    Ok(n)
}

async fn replace_links_tx(
    tx: &mut Transaction<'_, Postgres>,
    member_id: Uuid,
    links: &[PreferenceLink],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM family_member_preferences WHERE member_id = $1")
        .bind(member_id)
        .execute(&mut **tx)
        .await
        .context("clear member preferences")?;
    for link in links {
        sqlx::query(
            r#"
            INSERT INTO family_member_preferences (member_id, preference_id, notes)
            VALUES ($1, $2, $3)
            ON CONFLICT (member_id, preference_id) DO UPDATE SET notes = EXCLUDED.notes
            "#,
        )
        .bind(member_id)
        .bind(link.preference_id)
        .bind(&link.notes)
        .execute(&mut **tx)
        .await
        .context("link member preference")?;
    }
    Ok(())
}

pub async fn create_member(
    db: &PgPool,
    user_id: Uuid,
    name: &str,
    birth_date: Date,
    is_guest: bool,
    links: &[PreferenceLink],
) -> anyhow::Result<Uuid> {
    let mut tx = db.begin().await.context("begin tx")?;
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO family_members (user_id, name, birth_date, is_guest)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(name)
    .bind(birth_date)
    .bind(is_guest)
    .fetch_one(&mut *tx)
    .await
    .context("insert family member")?;
    replace_links_tx(&mut tx, id, links).await?;
    tx.commit().await.context("commit tx")?;
    Ok(id)
}

pub async fn update_member(
    db: &PgPool,
    member_id: Uuid,
    name: &str,
    birth_date: Date,
    is_guest: bool,
    links: Option<&[PreferenceLink]>,
) -> anyhow::Result<()> {
    let mut tx = db.begin().await.context("begin tx")?;
    sqlx::query(
        "UPDATE family_members SET name = $2, birth_date = $3, is_guest = $4 WHERE id = $1",
    )
    .bind(member_id)
    .bind(name)
    .bind(birth_date)
    .bind(is_guest)
    .execute(&mut *tx)
    .await
    .context("update family member")?;
    if let Some(links) = links {
        replace_links_tx(&mut tx, member_id, links).await?;
    }
    tx.commit().await.context("commit tx")?;
    Ok(())
}

pub async fn delete_member(db: &PgPool, member_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM family_members WHERE id = $1")
        .bind(member_id)
        .execute(db)
        .await
        .context("delete family member")?;
    Ok(())
}

// ---- preferences ----

pub async fn member_preferences(
    db: &PgPool,
    member_ids: &[Uuid],
) -> anyhow::Result<Vec<MemberPreferenceRow>> {
    let rows = sqlx::query_as::<_, MemberPreferenceRow>(
        r#"
        SELECT fmp.member_id, fmp.preference_id, dp.name, dp.pref_type, fmp.notes
          FROM family_member_preferences fmp
          JOIN dietary_preferences dp ON dp.id = fmp.preference_id
         WHERE fmp.member_id = ANY($1)
         ORDER BY dp.name ASC
        "#,
    )
    .bind(member_ids)
    .fetch_all(db)
    .await
    .context("list member preferences")?;
    Ok(rows)
}

pub async fn link_preference(
    db: &PgPool,
    member_id: Uuid,
    preference_id: Uuid,
    notes: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO family_member_preferences (member_id, preference_id, notes)
        VALUES ($1, $2, $3)
        ON CONFLICT (member_id, preference_id) DO UPDATE SET notes = EXCLUDED.notes
        "#,
    )
    .bind(member_id)
    .bind(preference_id)
    .bind(notes)
    .execute(db)
    .await
    .context("link member preference")?;
    Ok(())
}

/// Returns whether a link was removed.
pub async fn unlink_preference(
    db: &PgPool,
    member_id: Uuid,
    preference_id: Uuid,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        "DELETE FROM family_member_preferences WHERE member_id = $1 AND preference_id = $2",
    )
    .bind(member_id)
    .bind(preference_id)
    .execute(db)
    .await
    .context("unlink member preference")?;
    Ok(res.rows_affected() > 0)
}

pub async fn list_catalog(db: &PgPool) -> anyhow::Result<Vec<DietaryPreferenceRow>> {
    let rows = sqlx::query_as::<_, DietaryPreferenceRow>(
        r#"
        SELECT id, name, pref_type, description
          FROM dietary_preferences
         ORDER BY pref_type ASC, name ASC
        "#,
    )
    .fetch_all(db)
    .await
    .context("list dietary preferences")?;
    Ok(rows)
}

pub async fn count_catalog(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<i64> {
    let n = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM dietary_preferences WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_one(db)
    .await
    .context("count dietary preferences")?;
    Ok(n)
}

/// `None` when a preference with this name already exists.
pub async fn create_catalog_entry(
    db: &PgPool,
    name: &str,
    pref_type: PreferenceType,
    description: Option<&str>,
) -> anyhow::Result<Option<DietaryPreferenceRow>> {
    let row = sqlx::query_as::<_, DietaryPreferenceRow>(
        r#"
        INSERT INTO dietary_preferences (name, pref_type, description)
        VALUES ($1, $2, $3)
        ON CONFLICT (name) DO NOTHING
        RETURNING id, name, pref_type, description
        "#,
    )
    .bind(name)
    .bind(pref_type.as_str())
    .bind(description)
    .fetch_optional(db)
    .await
    .context("insert dietary preference")?;
    Ok(row)
}
