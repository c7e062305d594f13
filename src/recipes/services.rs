use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use super::dto::{Recipe, RecipeIngredient};
use super::repo;
use super::repo_types::{RecipeLineRow, RecipeRow};
use crate::error::{ensure_owner, AppError, AppResult};
use crate::storage::{StorageClient, IMAGE_URL_TTL_SECS};

pub fn assemble(row: RecipeRow, lines: Vec<RecipeLineRow>) -> Recipe {
    Recipe {
        id: row.id,
        title: row.title,
        description: row.description,
        ingredients: lines
            .into_iter()
            .map(|l| RecipeIngredient {
                ingredient_id: l.ingredient_id,
                name: l.name,
                quantity: l.quantity,
                unit: l.unit,
                notes: l.notes,
            })
            .collect(),
        instructions: row.instructions,
        prep_time: row.prep_time,
        cook_time: row.cook_time,
        servings: row.servings,
        image: row.image,
        sources: row.sources,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

/// Pairs each row with its own lines, keeping row order.
pub async fn assemble_many(
    storage: &dyn StorageClient,
    rows: Vec<RecipeRow>,
    lines: Vec<RecipeLineRow>,
) -> AppResult<Vec<Recipe>> {
    let mut by_recipe: HashMap<Uuid, Vec<RecipeLineRow>> = HashMap::new();
    for line in lines {
        by_recipe.entry(line.recipe_id).or_default().push(line);
    }
    let mut recipes = Vec::with_capacity(rows.len());
    for mut row in rows {
        presign_image(storage, &mut row).await?;
        let lines = by_recipe.remove(&row.id).unwrap_or_default();
        recipes.push(assemble(row, lines));
    }
    Ok(recipes)
}

/// A stored image key takes precedence over a plain `image` URL.
pub async fn presign_image(storage: &dyn StorageClient, row: &mut RecipeRow) -> AppResult<()> {
    if let Some(key) = &row.image_key {
        row.image = Some(storage.presign_get(key, IMAGE_URL_TTL_SECS).await?);
    }
    Ok(())
}

/// Removes an image object that is no longer referenced. A failed delete
/// is only logged.
pub async fn discard_image(storage: &dyn StorageClient, key: Option<&str>) {
    let Some(key) = key else { return };
    if let Err(e) = storage.delete_object(key).await {
        warn!(error = %e, key, "failed to delete recipe image");
    }
}

/// Loads a recipe the caller owns.
pub async fn load_owned(db: &PgPool, user_id: Uuid, recipe_id: Uuid) -> AppResult<RecipeRow> {
    let row = repo::find(db, recipe_id).await?;
    ensure_owner("recipe", row.as_ref().map(|r| r.user_id), user_id)?;
    row.ok_or(AppError::NotFound("recipe"))
}

pub async fn load_full(
    db: &PgPool,
    storage: &dyn StorageClient,
    mut row: RecipeRow,
) -> AppResult<Recipe> {
    presign_image(storage, &mut row).await?;
    let lines = repo::lines_for(db, &[row.id]).await?;
    Ok(assemble(row, lines))
}

pub fn check_image_url(image: Option<&str>) -> AppResult<Option<String>> {
    let Some(url) = image.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match reqwest::Url::parse(url) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => Ok(Some(url.to_string())),
        _ => Err(AppError::validation("image must be an http(s) URL")),
    }
}

/// Accepts raw base64 or a `data:<type>;base64,` URL.
pub fn decode_image(encoded: &str) -> AppResult<Bytes> {
    let payload = match encoded.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => encoded,
    };
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(cleaned)
        .map(Bytes::from)
        .map_err(|_| AppError::validation("image is not valid base64"))
}

pub fn image_prompt(recipe: &RecipeRow) -> String {
    match &recipe.description {
        Some(d) => format!(
            "A realistic overhead food photograph of {}: {}. Natural light, plated, no text.",
            recipe.title, d
        ),
        None => format!(
            "A realistic overhead food photograph of {}. Natural light, plated, no text.",
            recipe.title
        ),
    }
}
