use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use time::Date;

use super::{ApiEndpoint, UsageCounter};

/// Counter backed by the `api_usage` table.
#[derive(Clone)]
pub struct PgUsageCounter {
    db: PgPool,
}

impl PgUsageCounter {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UsageCounter for PgUsageCounter {
    async fn try_increment(
        &self,
        endpoint: ApiEndpoint,
        limit: i32,
        day: Date,
    ) -> anyhow::Result<Option<i32>> {
        if limit <= 0 {
            return Ok(None);
        }
        // The WHERE on the conflict branch makes check-and-increment a single
        // statement: no row comes back once the ceiling is reached.
        let count = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO api_usage (endpoint, count, window_date, updated_at)
            VALUES ($1, 1, $2, now())
            ON CONFLICT (endpoint) DO UPDATE
               SET count = CASE
                       WHEN api_usage.window_date < EXCLUDED.window_date THEN 1
                       ELSE api_usage.count + 1
                   END,
                   window_date = EXCLUDED.window_date,
                   updated_at = now()
             WHERE api_usage.window_date < EXCLUDED.window_date
                OR api_usage.count < $3
            RETURNING count
            "#,
        )
        .bind(endpoint.as_str())
        .bind(day)
        .bind(limit)
        .fetch_optional(&self.db)
        .await
        .context("increment api usage")?;
        Ok(count)
    }

    async fn count(&self, endpoint: ApiEndpoint, day: Date) -> anyhow::Result<i32> {
        let row = sqlx::query_as::<_, (i32, Date)>(
            r#"SELECT count, window_date FROM api_usage WHERE endpoint = $1"#,
        )
        .bind(endpoint.as_str())
        .fetch_optional(&self.db)
        .await
        .context("read api usage")?;
        Ok(match row {
            Some((count, window)) if window >= day => count,
            _ => 0,
        })
    }
}
