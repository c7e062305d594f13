use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::dto::{
    AnalyzeImageRequest, CaptureRequest, GenerateRequest, GeneratedImageResponse, ListQuery,
    Recipe, RecipeRequest,
};
use super::{repo, services};
use crate::{
    acquisition::{acquire, RecipePreview, RecipeSource},
    auth::AuthUser,
    error::{AppError, AppResult},
    state::AppState,
    storage::{recipe_image_key, IMAGE_URL_TTL_SECS},
    usage::{consume, ApiEndpoint},
};

pub fn recipe_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes).post(create_recipe))
        .route("/recipes/generate", post(generate_recipe))
        .route(
            "/recipes/analyze-image",
            post(analyze_image).layer(DefaultBodyLimit::max(20 * 1024 * 1024)),
        )
        .route("/recipes/capture", post(capture_recipe))
        .route(
            "/recipes/:id",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route("/recipes/:id/generate-image", post(generate_image))
}

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Vec<Recipe>>> {
    let rows = repo::list_by_user(
        &state.db,
        user_id,
        q.q.as_deref(),
        q.limit.clamp(1, 100),
        q.offset.max(0),
    )
    .await?;
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let lines = repo::lines_for(&state.db, &ids).await?;
    let recipes = services::assemble_many(state.storage.as_ref(), rows, lines).await?;
    Ok(Json(recipes))
}

#[instrument(skip(state, body))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<RecipeRequest>,
) -> AppResult<(StatusCode, Json<Recipe>)> {
    let recipe = body.recipe.validate().map_err(AppError::Validation)?;
    let image = services::check_image_url(body.image.as_deref())?;
    save_new(&state, user_id, recipe, image).await
}

async fn save_new(
    state: &AppState,
    user_id: Uuid,
    recipe: RecipePreview,
    image: Option<String>,
) -> AppResult<(StatusCode, Json<Recipe>)> {
    let id = repo::create(&state.db, user_id, &recipe, image.as_deref()).await?;
    info!(%user_id, recipe_id = %id, "recipe created");

    let row = repo::find(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("recipe"))?;
    let recipe = services::load_full(&state.db, state.storage.as_ref(), row).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Recipe>> {
    let row = services::load_owned(&state.db, user_id, id).await?;
    Ok(Json(services::load_full(&state.db, state.storage.as_ref(), row).await?))
}

#[instrument(skip(state, body))]
pub async fn update_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RecipeRequest>,
) -> AppResult<Json<Recipe>> {
    let recipe = body.recipe.validate().map_err(AppError::Validation)?;
    let image = services::check_image_url(body.image.as_deref())?;
    services::load_owned(&state.db, user_id, id).await?;

    repo::update(&state.db, id, &recipe, image.as_deref()).await?;
    info!(%user_id, recipe_id = %id, "recipe updated");

    let row = services::load_owned(&state.db, user_id, id).await?;
    Ok(Json(services::load_full(&state.db, state.storage.as_ref(), row).await?))
}

#[instrument(skip(state))]
pub async fn delete_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let row = services::load_owned(&state.db, user_id, id).await?;
    repo::delete(&state.db, id).await?;
    services::discard_image(state.storage.as_ref(), row.image_key.as_deref()).await;
    info!(%user_id, recipe_id = %id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Prompt-to-recipe preview; nothing is saved.
#[instrument(skip(state, body))]
pub async fn generate_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<GenerateRequest>,
) -> AppResult<Json<RecipePreview>> {
    if body.prompt.trim().is_empty() {
        return Err(AppError::validation("prompt is required"));
    }
    consume(&state, ApiEndpoint::GenerateRecipe).await?;
    let preview = acquire(
        state.models.as_ref(),
        &state.config.models,
        RecipeSource::Prompt(body.prompt),
    )
    .await?;
    info!(%user_id, title = %preview.title, "recipe generated");
    Ok(Json(preview))
}

/// Image-to-recipe preview; nothing is saved.
#[instrument(skip(state, body), fields(media_type = %body.media_type))]
pub async fn analyze_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<AnalyzeImageRequest>,
) -> AppResult<Json<RecipePreview>> {
    let bytes = services::decode_image(&body.image)?;
    crate::acquisition::image::check_image(&bytes, &body.media_type)?;
    consume(&state, ApiEndpoint::AnalyzeImage).await?;

    let preview = acquire(
        state.models.as_ref(),
        &state.config.models,
        RecipeSource::Image { bytes, media_type: body.media_type },
    )
    .await?;
    info!(%user_id, title = %preview.title, "recipe read from image");
    Ok(Json(preview))
}

/// Browser-extension ingestion: normalizes the captured markup and saves it.
#[instrument(skip(state, body), fields(url = %body.url))]
pub async fn capture_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<CaptureRequest>,
) -> AppResult<(StatusCode, Json<Recipe>)> {
    let recipe = acquire(
        state.models.as_ref(),
        &state.config.models,
        RecipeSource::Capture { url: body.url, raw: body.data },
    )
    .await?;
    save_new(&state, user_id, recipe, None).await
}

#[instrument(skip(state))]
pub async fn generate_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<GeneratedImageResponse>> {
    let recipe = services::load_owned(&state.db, user_id, id).await?;
    consume(&state, ApiEndpoint::GenerateImage).await?;

    let image = state.images.generate(&services::image_prompt(&recipe)).await?;
    let key = recipe_image_key(user_id, id, &image.content_type);
    state
        .storage
        .put_object(&key, image.body, &image.content_type)
        .await?;
    if let Err(e) = repo::set_image_key(&state.db, id, &key).await {
        services::discard_image(state.storage.as_ref(), Some(&key)).await;
        return Err(e.into());
    }
    services::discard_image(state.storage.as_ref(), recipe.image_key.as_deref()).await;
    let image_url = state.storage.presign_get(&key, IMAGE_URL_TTL_SECS).await?;

    info!(%user_id, recipe_id = %id, key = %key, "recipe image generated");
    Ok(Json(GeneratedImageResponse { image_url }))
}
