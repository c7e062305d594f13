use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::instrument;

use super::{parse_model_preview, RecipePreview, RECIPE_JSON_INSTRUCTIONS};
use crate::config::ModelConfig;
use crate::error::AppError;
use crate::llm::{InlineImage, LanguageModel, ModelRequest};

pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const SUPPORTED_MEDIA_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/gif", "image/webp"];

const VISION_SYSTEM_PROMPT: &str = "You read photos of recipes (cookbook pages, cards, \
screenshots) and transcribe the recipe they show.";

pub fn check_image(bytes: &[u8], media_type: &str) -> Result<(), AppError> {
    if !SUPPORTED_MEDIA_TYPES.contains(&media_type) {
        return Err(AppError::validation(format!(
            "unsupported media type {media_type}; expected one of {}",
            SUPPORTED_MEDIA_TYPES.join(", ")
        )));
    }
    if bytes.is_empty() {
        return Err(AppError::validation("image is empty"));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(AppError::validation("image is larger than 10 MB"));
    }
    Ok(())
}

/// Image-to-recipe through a vision-capable model.
#[instrument(skip(models, cfg, bytes), fields(size = bytes.len()))]
pub async fn analyze(
    models: &dyn LanguageModel,
    cfg: &ModelConfig,
    bytes: &[u8],
    media_type: &str,
) -> Result<RecipePreview, AppError> {
    check_image(bytes, media_type)?;

    let raw = models
        .complete(ModelRequest {
            model: cfg.vision_model.clone(),
            system: format!("{VISION_SYSTEM_PROMPT}\n\n{RECIPE_JSON_INSTRUCTIONS}"),
            user: "Extract the recipe shown in this image.".to_string(),
            image: Some(InlineImage {
                media_type: media_type.to_string(),
                base64: STANDARD.encode(bytes),
            }),
            max_tokens: 2048,
        })
        .await?;

    // vision models often list ingredients as plain strings
    Ok(parse_model_preview(&raw, true)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fakes::{test_config, ScriptedModel};

    #[tokio::test]
    async fn sends_base64_and_accepts_string_ingredients() {
        let model = ScriptedModel::new(vec![Ok(
            r#"{"title":"Salad","ingredients":["lettuce","2 tomatoes"],"instructions":["Toss."]}"#.into(),
        )]);
        let cfg = test_config(10).models;
        let preview = analyze(&model, &cfg, b"fake-jpeg", "image/jpeg").await.unwrap();
        assert_eq!(preview.ingredients.len(), 2);
        assert_eq!(preview.ingredients[1].name, "2 tomatoes");
        assert_eq!(preview.ingredients[1].quantity, None);

        let seen = model.seen.lock().unwrap();
        let image = seen[0].image.as_ref().unwrap();
        assert_eq!(image.media_type, "image/jpeg");
        assert_eq!(image.base64, STANDARD.encode(b"fake-jpeg"));
        assert_eq!(seen[0].model, "vision");
    }

    #[test]
    fn rejects_unsupported_media_type() {
        assert!(matches!(
            check_image(b"x", "application/pdf"),
            Err(AppError::Validation(_))
        ));
        assert!(check_image(b"", "image/png").is_err());
        assert!(check_image(b"x", "image/webp").is_ok());
    }
}
