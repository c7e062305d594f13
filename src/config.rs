use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

/// Chat-completions provider settings; one model name per task.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub api_key: String,
    pub base_url: String,
    pub generation_model: String,
    pub formatting_model: String,
    pub vision_model: String,
    pub image_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub models: ModelConfig,
    pub api_daily_limit: i32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = required("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "mealplanner".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "mealplanner-users".into()),
            ttl_minutes: parsed_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: parsed_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let storage = StorageConfig {
            endpoint: required("MINIO_ENDPOINT")?,
            bucket: required("MINIO_BUCKET")?,
            access_key: required("MINIO_ACCESS_KEY")?,
            secret_key: required("MINIO_SECRET_KEY")?,
        };
        let models = ModelConfig {
            api_key: required("MODEL_API_KEY")?,
            base_url: std::env::var("MODEL_BASE_URL")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".into()),
            generation_model: std::env::var("MODEL_GENERATION")
                .unwrap_or_else(|_| "anthropic/claude-3.5-sonnet".into()),
            formatting_model: std::env::var("MODEL_FORMATTING")
                .unwrap_or_else(|_| "anthropic/claude-3-haiku".into()),
            vision_model: std::env::var("MODEL_VISION")
                .unwrap_or_else(|_| "anthropic/claude-3.5-sonnet".into()),
            image_model: std::env::var("MODEL_IMAGE").unwrap_or_else(|_| "dall-e-3".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            storage,
            models,
            api_daily_limit: parsed_or("API_DAILY_LIMIT", 100),
        })
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("missing environment variable {name}"))
}

fn parsed_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_or_falls_back_on_garbage() {
        std::env::set_var("MEALPLANNER_TEST_LIMIT", "not-a-number");
        assert_eq!(parsed_or("MEALPLANNER_TEST_LIMIT", 100), 100);
        std::env::set_var("MEALPLANNER_TEST_LIMIT", "7");
        assert_eq!(parsed_or("MEALPLANNER_TEST_LIMIT", 100), 7);
        std::env::remove_var("MEALPLANNER_TEST_LIMIT");
    }

    #[test]
    fn required_names_the_missing_variable() {
        let err = required("MEALPLANNER_DEFINITELY_UNSET").unwrap_err();
        assert!(err.to_string().contains("MEALPLANNER_DEFINITELY_UNSET"));
    }
}
