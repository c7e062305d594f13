//! Daily call ceilings for model-backed endpoints.
//!
//! The ceiling is process-wide and shared by every caller: it exists to cap
//! provider spend, not to apportion quota between users.

pub mod handlers;
mod repo;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::Date;
use tracing::warn;

pub use repo::PgUsageCounter;

use crate::dates::today;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Logical endpoints that consume model quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiEndpoint {
    #[serde(rename = "recipes/generate")]
    GenerateRecipe,
    #[serde(rename = "recipes/analyze-image")]
    AnalyzeImage,
    #[serde(rename = "recipes/generate-image")]
    GenerateImage,
    #[serde(rename = "tools/format-recipe")]
    FormatRecipe,
    #[serde(rename = "tools/extract-recipe")]
    ExtractRecipe,
    #[serde(rename = "tools/format-recipe/upload")]
    FormatRecipeUpload,
}

impl ApiEndpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiEndpoint::GenerateRecipe => "recipes/generate",
            ApiEndpoint::AnalyzeImage => "recipes/analyze-image",
            ApiEndpoint::GenerateImage => "recipes/generate-image",
            ApiEndpoint::FormatRecipe => "tools/format-recipe",
            ApiEndpoint::ExtractRecipe => "tools/extract-recipe",
            ApiEndpoint::FormatRecipeUpload => "tools/format-recipe/upload",
        }
    }
}

#[async_trait]
pub trait UsageCounter: Send + Sync {
    /// Atomically counts one call against `endpoint` for `day`.
    /// Returns the new count, or `None` once `limit` calls were already made.
    async fn try_increment(
        &self,
        endpoint: ApiEndpoint,
        limit: i32,
        day: Date,
    ) -> anyhow::Result<Option<i32>>;

    /// Calls made so far on `day`.
    async fn count(&self, endpoint: ApiEndpoint, day: Date) -> anyhow::Result<i32>;
}

/// Charges one call to `endpoint`, failing with 429 once the ceiling is hit.
pub async fn consume(state: &AppState, endpoint: ApiEndpoint) -> AppResult<i32> {
    let limit = state.config.api_daily_limit;
    match state.usage.try_increment(endpoint, limit, today()).await? {
        Some(count) => Ok(count),
        None => {
            warn!(endpoint = endpoint.as_str(), limit, "rate limit exceeded");
            Err(AppError::RateLimited {
                endpoint: endpoint.as_str().to_string(),
                limit,
            })
        }
    }
}
