use tracing::{info, instrument};

use super::{parse_model_preview, RecipePreview, RECIPE_JSON_INSTRUCTIONS};
use crate::config::ModelConfig;
use crate::error::AppError;
use crate::llm::{LanguageModel, ModelRequest};

pub const MAX_PROMPT_CHARS: usize = 2_000;
pub const MAX_FORMAT_INPUT_CHARS: usize = 20_000;

const CHEF_SYSTEM_PROMPT: &str = "You are an experienced home cook. Write one complete recipe \
for the request: a title, a short description, the ingredient list with amounts, numbered \
steps, prep and cook times and the number of servings.";

const FORMATTER_SYSTEM_PROMPT: &str =
    "You convert recipe text into structured data. Keep every ingredient and step from the input.";

/// Prompt-to-recipe: a free-form generation call whose prose is then
/// re-submitted to the formatting model.
#[instrument(skip(models, cfg, prompt))]
pub async fn generate(
    models: &dyn LanguageModel,
    cfg: &ModelConfig,
    prompt: &str,
) -> Result<RecipePreview, AppError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AppError::validation("prompt is required"));
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return Err(AppError::validation(format!(
            "prompt must be at most {MAX_PROMPT_CHARS} characters"
        )));
    }

    let prose = models
        .complete(ModelRequest {
            model: cfg.generation_model.clone(),
            system: CHEF_SYSTEM_PROMPT.to_string(),
            user: prompt.to_string(),
            image: None,
            max_tokens: 2048,
        })
        .await?;
    info!(chars = prose.len(), "recipe prose generated");

    format_text(models, cfg, &prose).await
}

/// Formats arbitrary recipe text into a validated preview.
#[instrument(skip(models, cfg, text))]
pub async fn format_text(
    models: &dyn LanguageModel,
    cfg: &ModelConfig,
    text: &str,
) -> Result<RecipePreview, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::validation("recipe text is required"));
    }
    if text.chars().count() > MAX_FORMAT_INPUT_CHARS {
        return Err(AppError::validation(format!(
            "recipe text must be at most {MAX_FORMAT_INPUT_CHARS} characters"
        )));
    }

    let raw = models
        .complete(ModelRequest {
            model: cfg.formatting_model.clone(),
            system: format!("{FORMATTER_SYSTEM_PROMPT}\n\n{RECIPE_JSON_INSTRUCTIONS}"),
            user: text.to_string(),
            image: None,
            max_tokens: 2048,
        })
        .await?;

    Ok(parse_model_preview(&raw, false)?)
}
