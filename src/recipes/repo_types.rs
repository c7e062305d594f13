use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct RecipeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub instructions: Vec<String>,
    pub prep_time: Option<i32>, // minutes
    pub cook_time: Option<i32>, // minutes
    pub servings: Option<i32>,
    pub image: Option<String>,
    /// Object key of a generated image; presigned into `image` on read.
    pub image_key: Option<String>,
    pub sources: Vec<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// One ingredient line joined with its catalog name.
#[derive(Debug, Clone, FromRow)]
pub struct RecipeLineRow {
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
    pub position: i32,
}
