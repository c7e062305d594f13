use serde::{Deserialize, Serialize};

/// One ingredient line of a recipe preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewIngredient {
    pub name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PreviewIngredient {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: None,
            unit: None,
            notes: None,
        }
    }
}

/// Normalized recipe payload every acquisition path converges on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipePreview {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub ingredients: Vec<PreviewIngredient>,
    pub instructions: Vec<String>,
    /// Minutes.
    #[serde(default)]
    pub prep_time: Option<i32>,
    /// Minutes.
    #[serde(default)]
    pub cook_time: Option<i32>,
    #[serde(default)]
    pub servings: Option<i32>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
}

fn clean(opt: Option<String>) -> Option<String> {
    opt.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl RecipePreview {
    /// Trims every text field and checks the shared schema. Any problem rejects
    /// the whole preview; the error lists all of them.
    pub fn validate(self) -> Result<RecipePreview, Vec<String>> {
        let mut errors = Vec::new();

        let title = self.title.trim().to_string();
        if title.is_empty() {
            errors.push("title is required".to_string());
        } else if title.chars().count() > 200 {
            errors.push("title must be at most 200 characters".to_string());
        }

        if self.ingredients.is_empty() {
            errors.push("at least one ingredient is required".to_string());
        }
        let mut ingredients = Vec::with_capacity(self.ingredients.len());
        for (i, ing) in self.ingredients.into_iter().enumerate() {
            let name = ing.name.trim().to_string();
            if name.is_empty() {
                errors.push(format!("ingredients[{i}].name is required"));
            }
            if let Some(q) = ing.quantity {
                if !q.is_finite() || q <= 0.0 {
                    errors.push(format!("ingredients[{i}].quantity must be positive"));
                }
            }
            ingredients.push(PreviewIngredient {
                name,
                quantity: ing.quantity,
                unit: clean(ing.unit),
                notes: clean(ing.notes),
            });
        }

        let instructions: Vec<String> = self
            .instructions
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if instructions.is_empty() {
            errors.push("at least one instruction is required".to_string());
        }

        for (field, value) in [("prepTime", self.prep_time), ("cookTime", self.cook_time)] {
            if matches!(value, Some(v) if v < 0) {
                errors.push(format!("{field} must not be negative"));
            }
        }
        if matches!(self.servings, Some(v) if v <= 0) {
            errors.push("servings must be positive".to_string());
        }

        let sources = self.sources.map(|list| {
            list.into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        });
        for src in sources.iter().flatten() {
            match reqwest::Url::parse(src) {
                Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
                _ => errors.push(format!("source {src} is not an http(s) URL")),
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(RecipePreview {
            title,
            description: clean(self.description),
            ingredients,
            instructions,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            servings: self.servings,
            sources: sources.filter(|s| !s.is_empty()),
        })
    }
}

#[cfg(test)]
pub(crate) fn sample_preview() -> RecipePreview {
    RecipePreview {
        title: "Pancakes".into(),
        description: None,
        ingredients: vec![PreviewIngredient {
            name: "flour".into(),
            quantity: Some(2.0),
            unit: Some("cups".into()),
            notes: None,
        }],
        instructions: vec!["Mix.".into(), "Fry.".into()],
        prep_time: Some(5),
        cook_time: Some(10),
        servings: Some(4),
        sources: None,
    }
}
