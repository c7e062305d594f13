//! Recipe acquisition: prompt, image and page capture all produce a validated
//! [`RecipePreview`].

pub mod capture;
pub mod image;
pub mod prompt;
mod preview;

use bytes::Bytes;
use serde_json::Value;

pub use preview::{PreviewIngredient, RecipePreview};
#[cfg(test)]
pub(crate) use preview::sample_preview;

use crate::config::ModelConfig;
use crate::error::AppError;
use crate::llm::{strip_code_fences, LanguageModel, ModelError};

/// Where a recipe comes from.
#[derive(Debug, Clone)]
pub enum RecipeSource {
    Prompt(String),
    Image { bytes: Bytes, media_type: String },
    Capture { url: String, raw: Value },
}

/// Dispatches a source to its adapter.
pub async fn acquire(
    models: &dyn LanguageModel,
    cfg: &ModelConfig,
    source: RecipeSource,
) -> Result<RecipePreview, AppError> {
    match source {
        RecipeSource::Prompt(text) => prompt::generate(models, cfg, &text).await,
        RecipeSource::Image { bytes, media_type } => {
            image::analyze(models, cfg, &bytes, &media_type).await
        }
        RecipeSource::Capture { url, raw } => capture::from_capture(&url, raw),
    }
}

/// Shared output contract given to every formatting model call.
pub(crate) const RECIPE_JSON_INSTRUCTIONS: &str = r#"Respond with a single JSON object and nothing else: no prose, no markdown fences.
The object must have exactly these fields:
- "title": string
- "description": string or null
- "ingredients": array of objects {"name": string, "quantity": number or null, "unit": string or null, "notes": string or null}
- "instructions": array of strings, one step each, in order
- "prepTime": integer minutes or null
- "cookTime": integer minutes or null
- "servings": integer or null
Quantities must be plain numbers (use 0.5, not "1/2"). Put preparation details such as "chopped" in notes."#;

/// Parses model output into a validated preview.
///
/// With `loose_ingredients`, ingredient entries given as bare strings are
/// accepted and turned into name-only lines before schema checks.
pub(crate) fn parse_model_preview(
    raw: &str,
    loose_ingredients: bool,
) -> Result<RecipePreview, ModelError> {
    let formatting = |message: String| ModelError::Formatting {
        message,
        raw: raw.to_string(),
    };

    let body = strip_code_fences(raw);
    let mut value: Value = serde_json::from_str(body)
        .map_err(|e| formatting(format!("response is not JSON: {e}")))?;

    if loose_ingredients {
        normalize_string_ingredients(&mut value);
    }

    let preview: RecipePreview = serde_json::from_value(value)
        .map_err(|e| formatting(format!("response does not match the recipe schema: {e}")))?;
    preview
        .validate()
        .map_err(|errors| formatting(format!("recipe is incomplete: {}", errors.join("; "))))
}

fn normalize_string_ingredients(value: &mut Value) {
    if let Some(Value::Array(items)) = value.get_mut("ingredients") {
        for item in items.iter_mut() {
            if let Value::String(name) = item {
                *item = serde_json::json!({
                    "name": name.clone(),
                    "quantity": null,
                    "unit": null,
                    "notes": null,
                });
            }
        }
    }
}
