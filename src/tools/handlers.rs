use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{ExtractRequest, FormatRequest, PageInput};
use super::page;
use crate::{
    acquisition::{
        image::{self, MAX_IMAGE_BYTES},
        prompt::format_text,
        RecipePreview,
    },
    error::{AppError, AppResult},
    state::AppState,
    usage::{consume, ApiEndpoint},
};

/// Model-backed formatting tools. Public; guarded only by the daily ceiling.
pub fn tool_routes() -> Router<AppState> {
    Router::new()
        .route("/tools/format-recipe", post(format_recipe))
        .route("/tools/extract-recipe", post(extract_recipe))
        .route(
            "/tools/format-recipe/upload",
            post(format_upload).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES + 64 * 1024)),
        )
}

#[instrument(skip(state, body))]
pub async fn format_recipe(
    State(state): State<AppState>,
    Json(body): Json<FormatRequest>,
) -> AppResult<Json<RecipePreview>> {
    if body.text.trim().is_empty() {
        return Err(AppError::validation("text is required"));
    }
    let count = consume(&state, ApiEndpoint::FormatRecipe).await?;
    info!(count, "formatting recipe text");
    let preview = format_text(state.models.as_ref(), &state.config.models, &body.text).await?;
    Ok(Json(preview))
}

#[instrument(skip(state, body))]
pub async fn extract_recipe(
    State(state): State<AppState>,
    Json(body): Json<ExtractRequest>,
) -> AppResult<Json<RecipePreview>> {
    let input = body.validate()?;
    let count = consume(&state, ApiEndpoint::ExtractRecipe).await?;
    info!(count, "extracting recipe from page");

    let (url, html) = match input {
        PageInput::Html { url, html } => (url, html),
        PageInput::Fetch(url) => {
            let html = page::fetch(&url).await?;
            (Some(url.to_string()), html)
        }
    };
    let preview = page::extract(state.models.as_ref(), &state.config.models, url.as_deref(), &html).await?;
    Ok(Json(preview))
}

/// Multipart `file`: images go to the vision model, anything else is read as
/// UTF-8 recipe text.
#[instrument(skip(state, mp))]
pub async fn format_upload(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> AppResult<Json<RecipePreview>> {
    let mut upload = None;
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::validation(format!("file could not be read: {e}")))?;
            upload = Some((content_type, data));
            break;
        }
    }
    let (content_type, data) = upload.ok_or_else(|| AppError::validation("file is required"))?;

    let preview = if content_type.starts_with("image/") {
        image::check_image(&data, &content_type)?;
        consume(&state, ApiEndpoint::FormatRecipeUpload).await?;
        info!(%content_type, size = data.len(), "analyzing uploaded image");
        image::analyze(state.models.as_ref(), &state.config.models, &data, &content_type).await?
    } else {
        let text = std::str::from_utf8(&data)
            .map_err(|_| AppError::validation("file must be an image or UTF-8 text"))?;
        if text.trim().is_empty() {
            return Err(AppError::validation("file is empty"));
        }
        consume(&state, ApiEndpoint::FormatRecipeUpload).await?;
        info!(%content_type, size = data.len(), "formatting uploaded text");
        format_text(state.models.as_ref(), &state.config.models, text).await?
    };
    Ok(Json(preview))
}
