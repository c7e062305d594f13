//! Page capture: schema.org `Recipe` markup (posted by the browser extension
//! or read from fetched HTML) normalized into a preview.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use super::{PreviewIngredient, RecipePreview};
use crate::error::AppError;

lazy_static! {
    static ref JSON_LD_RE: Regex = Regex::new(
        r#"(?is)<script[^>]*type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#
    )
    .unwrap();
    static ref STRIP_BLOCKS_RE: Regex =
        Regex::new(r"(?is)<(script|style|noscript)[^>]*>.*?</(script|style|noscript)>").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"(?s)<[^>]+>").unwrap();
    static ref DURATION_RE: Regex =
        Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$").unwrap();
    static ref QUANTITY_RE: Regex =
        Regex::new(r"^(\d+(?:[.,]\d+)?)?([½⅓⅔¼¾⅛⅜⅝⅞⅕])?([A-Za-z]*)$").unwrap();
    static ref FRACTION_RE: Regex = Regex::new(r"^(\d+)/(\d+)$").unwrap();
    static ref RANGE_RE: Regex = Regex::new(r"^(\d+(?:\.\d+)?)[-–](\d+(?:\.\d+)?)$").unwrap();
    static ref FIRST_INT_RE: Regex = Regex::new(r"\d+").unwrap();
}

const UNITS: &[&str] = &[
    "cup", "cups", "tbsp", "tbsps", "tbs", "tablespoon", "tablespoons", "tsp", "tsps",
    "teaspoon", "teaspoons", "g", "gram", "grams", "kg", "kilogram", "kilograms", "mg", "ml",
    "milliliter", "milliliters", "millilitre", "millilitres", "l", "liter", "liters", "litre",
    "litres", "dl", "cl", "oz", "ounce", "ounces", "lb", "lbs", "pound", "pounds", "pinch",
    "pinches", "dash", "dashes", "clove", "cloves", "can", "cans", "slice", "slices", "piece",
    "pieces", "bunch", "bunches", "stick", "sticks", "package", "packages", "pkg", "sprig",
    "sprigs", "handful", "handfuls", "quart", "quarts", "qt", "pint", "pints", "pt", "gallon",
    "gallons",
];

fn is_unit(token: &str) -> bool {
    let t = token.trim_end_matches('.').to_lowercase();
    UNITS.contains(&t.as_str())
}

fn vulgar_fraction(c: &str) -> f64 {
    match c {
        "½" => 0.5,
        "⅓" => 1.0 / 3.0,
        "⅔" => 2.0 / 3.0,
        "¼" => 0.25,
        "¾" => 0.75,
        "⅛" => 0.125,
        "⅜" => 0.375,
        "⅝" => 0.625,
        "⅞" => 0.875,
        "⅕" => 0.2,
        _ => 0.0,
    }
}

/// Reads a leading quantity token; returns the value and any unit glued to it
/// (`"200g"` → `(200, "g")`).
fn parse_quantity_token(token: &str) -> Option<(f64, &str)> {
    if let Some(c) = FRACTION_RE.captures(token) {
        let num: f64 = c[1].parse().ok()?;
        let den: f64 = c[2].parse().ok()?;
        return (den != 0.0).then_some((num / den, ""));
    }
    if let Some(c) = RANGE_RE.captures(token) {
        return c[1].parse().ok().map(|v| (v, ""));
    }
    let c = QUANTITY_RE.captures(token)?;
    let whole = c.get(1).map(|m| m.as_str().replace(',', "."));
    let frac = c.get(2).map(|m| vulgar_fraction(m.as_str()));
    if whole.is_none() && frac.is_none() {
        return None;
    }
    let glued = c.get(3).map_or("", |m| m.as_str());
    if !glued.is_empty() && !is_unit(glued) {
        return None;
    }
    let value = whole.and_then(|w| w.parse::<f64>().ok()).unwrap_or(0.0) + frac.unwrap_or(0.0);
    (value > 0.0).then_some((value, glued))
}

/// Splits `"1 1/2 cups flour, sifted"` into quantity, unit, name and notes.
/// Lines that do not start with an amount become name-only entries.
pub fn parse_ingredient_line(line: &str) -> PreviewIngredient {
    let line = decode_entities(line.trim());
    let (main, notes) = match line.find(", ") {
        Some(i) => (&line[..i], Some(line[i + 2..].trim().to_string())),
        None => (line.as_str(), None),
    };
    let notes = notes.filter(|n| !n.is_empty());

    let tokens: Vec<&str> = main.split_whitespace().collect();
    let mut idx = 0;
    let mut quantity = None;
    let mut unit = None;

    if let Some((q, glued)) = tokens.first().and_then(|t| parse_quantity_token(t)) {
        let mut q = q;
        idx = 1;
        if !glued.is_empty() {
            unit = Some(glued.to_string());
        } else if let Some((extra, "")) = tokens.get(1).and_then(|t| parse_quantity_token(t)) {
            // "1 1/2" or "1 ½"
            if extra < 1.0 {
                q += extra;
                idx = 2;
            }
        }
        quantity = Some(q);
    }
    if quantity.is_some() && unit.is_none() {
        if let Some(t) = tokens.get(idx).filter(|t| is_unit(t)) {
            unit = Some(t.trim_end_matches('.').to_string());
            idx += 1;
        }
    }
    if quantity.is_some() && tokens.get(idx).is_some_and(|t| t.eq_ignore_ascii_case("of")) {
        idx += 1;
    }

    let name = tokens.get(idx..).unwrap_or_default().join(" ");
    if name.is_empty() {
        return PreviewIngredient { notes, ..PreviewIngredient::named(main.trim()) };
    }
    PreviewIngredient { name, quantity, unit, notes }
}

/// ISO-8601 duration (`PT1H30M`) in whole minutes.
pub fn parse_iso_duration(s: &str) -> Option<i32> {
    let c = DURATION_RE.captures(s.trim())?;
    let part = |i: usize| -> f64 {
        c.get(i).and_then(|m| m.as_str().parse::<f64>().ok()).unwrap_or(0.0)
    };
    let minutes = part(1) * 24.0 * 60.0 + part(2) * 60.0 + part(3) + part(4) / 60.0;
    Some(minutes.round() as i32)
}

fn parse_yield(v: &Value) -> Option<i32> {
    match v {
        Value::Number(n) => n.as_f64().map(|f| f as i32).filter(|n| *n > 0),
        Value::String(s) => FIRST_INT_RE
            .find(s)
            .and_then(|m| m.as_str().parse().ok())
            .filter(|n: &i32| *n > 0),
        Value::Array(items) => items.iter().find_map(parse_yield),
        _ => None,
    }
}

fn collect_instructions(v: &Value, out: &mut Vec<String>) {
    match v {
        Value::String(s) => out.extend(
            decode_entities(&TAG_RE.replace_all(s, "\n"))
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from),
        ),
        Value::Array(items) => items.iter().for_each(|i| collect_instructions(i, out)),
        Value::Object(obj) => {
            if let Some(list) = obj.get("itemListElement") {
                collect_instructions(list, out);
            } else if let Some(text) = obj.get("text").or_else(|| obj.get("name")) {
                collect_instructions(text, out);
            }
        }
        _ => {}
    }
}

fn has_recipe_type(obj: &serde_json::Map<String, Value>) -> bool {
    match obj.get("@type") {
        Some(Value::String(t)) => t == "Recipe",
        Some(Value::Array(ts)) => ts.iter().any(|t| t == "Recipe"),
        _ => false,
    }
}

/// Finds the first schema.org `Recipe` node, looking through arrays,
/// `@graph` and `mainEntity`.
pub fn find_schema_recipe(v: &Value) -> Option<&Value> {
    match v {
        Value::Object(obj) if has_recipe_type(obj) => Some(v),
        Value::Object(obj) => ["@graph", "mainEntity"]
            .iter()
            .filter_map(|k| obj.get(*k))
            .find_map(find_schema_recipe),
        Value::Array(items) => items.iter().find_map(find_schema_recipe),
        _ => None,
    }
}

fn text_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(|s| decode_entities(s.trim()))
        .filter(|s| !s.is_empty())
}

fn schema_to_preview(recipe: &Value) -> RecipePreview {
    let ingredients = recipe
        .get("recipeIngredient")
        .or_else(|| recipe.get("ingredients"))
        .and_then(Value::as_array)
        .map(|lines| {
            lines
                .iter()
                .filter_map(Value::as_str)
                .filter(|l| !l.trim().is_empty())
                .map(parse_ingredient_line)
                .collect()
        })
        .unwrap_or_default();

    let mut instructions = Vec::new();
    if let Some(v) = recipe.get("recipeInstructions") {
        collect_instructions(v, &mut instructions);
    }

    let minutes = |key: &str| recipe.get(key).and_then(Value::as_str).and_then(parse_iso_duration);

    RecipePreview {
        title: text_field(recipe, "name").unwrap_or_default(),
        description: text_field(recipe, "description"),
        ingredients,
        instructions,
        prep_time: minutes("prepTime"),
        cook_time: minutes("cookTime"),
        servings: recipe.get("recipeYield").and_then(parse_yield),
        sources: None,
    }
}

/// Accepts either schema.org markup or the already-normalized shape.
fn normalized_to_preview(mut raw: Value) -> Result<RecipePreview, AppError> {
    if let Some(Value::Array(items)) = raw.get_mut("ingredients") {
        for item in items.iter_mut() {
            if let Value::String(line) = item {
                *item = serde_json::to_value(parse_ingredient_line(line))
                    .map_err(|e| AppError::Internal(e.into()))?;
            }
        }
    }
    serde_json::from_value(raw).map_err(|e| AppError::validation(format!("invalid recipe: {e}")))
}

/// Browser-capture entry point. The page URL is recorded as a source.
pub fn from_capture(url: &str, raw: Value) -> Result<RecipePreview, AppError> {
    let mut preview = match find_schema_recipe(&raw) {
        Some(recipe) => schema_to_preview(recipe),
        None if raw.get("title").is_some() => normalized_to_preview(raw)?,
        None => return Err(AppError::validation("no schema.org Recipe found in capture")),
    };

    let url = url.trim();
    if !url.is_empty() {
        let sources = preview.sources.get_or_insert_with(Vec::new);
        if !sources.iter().any(|s| s == url) {
            sources.insert(0, url.to_string());
        }
    }
    preview.validate().map_err(AppError::Validation)
}

/// Parsed contents of every `application/ld+json` block in a page.
pub fn json_ld_blocks(html: &str) -> Vec<Value> {
    JSON_LD_RE
        .captures_iter(html)
        .filter_map(|c| serde_json::from_str(c[1].trim()).ok())
        .collect()
}

/// Visible page text for the model fallback, capped at `max_chars`.
pub fn page_text(html: &str, max_chars: usize) -> String {
    let without_blocks = STRIP_BLOCKS_RE.replace_all(html, " ");
    let text = TAG_RE.replace_all(&without_blocks, "\n");
    decode_entities(&text)
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
        .chars()
        .take(max_chars)
        .collect()
}

fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#039;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_quantity_unit_name_and_notes() {
        let i = parse_ingredient_line("2 cups all-purpose flour, sifted");
        assert_eq!(i.quantity, Some(2.0));
        assert_eq!(i.unit.as_deref(), Some("cups"));
        assert_eq!(i.name, "all-purpose flour");
        assert_eq!(i.notes.as_deref(), Some("sifted"));
    }

    #[test]
    fn parses_mixed_and_unicode_fractions() {
        assert_eq!(parse_ingredient_line("1 1/2 tsp salt").quantity, Some(1.5));
        assert_eq!(parse_ingredient_line("½ cup sugar").quantity, Some(0.5));
        assert_eq!(parse_ingredient_line("1½ cups milk").quantity, Some(1.5));
        assert_eq!(parse_ingredient_line("1 ¼ l stock").quantity, Some(1.25));
    }

    #[test]
    fn glued_units_and_unitless_counts() {
        let butter = parse_ingredient_line("200g butter");
        assert_eq!((butter.quantity, butter.unit.as_deref()), (Some(200.0), Some("g")));
        let eggs = parse_ingredient_line("3 large eggs");
        assert_eq!((eggs.quantity, eggs.unit), (Some(3.0), None));
        assert_eq!(eggs.name, "large eggs");
    }

    #[test]
    fn lines_without_amounts_are_name_only() {
        assert_eq!(parse_ingredient_line("salt to taste"), PreviewIngredient::named("salt to taste"));
        assert_eq!(parse_ingredient_line("7up").quantity, None);
    }

    #[test]
    fn drops_connecting_of() {
        assert_eq!(parse_ingredient_line("1 pinch of nutmeg").name, "nutmeg");
    }

    #[test]
    fn durations_become_minutes() {
        assert_eq!(parse_iso_duration("PT1H30M"), Some(90));
        assert_eq!(parse_iso_duration("PT45M"), Some(45));
        assert_eq!(parse_iso_duration("P0DT0H20M"), Some(20));
        assert_eq!(parse_iso_duration("20 minutes"), None);
    }

    #[test]
    fn finds_recipe_inside_graph() {
        let page = json!({ "@context": "https://schema.org", "@graph": [
            { "@type": "WebPage" },
            { "@type": ["Recipe", "Thing"], "name": "Bread" }
        ]});
        assert_eq!(find_schema_recipe(&page).unwrap()["name"], "Bread");
    }

    #[test]
    fn capture_maps_schema_org_fields() {
        let raw = json!({
            "@type": "Recipe",
            "name": "Mac &amp; Cheese",
            "recipeYield": ["4", "4 servings"],
            "prepTime": "PT10M",
            "cookTime": "PT25M",
            "recipeIngredient": ["250 g macaroni", "2 cups cheddar, grated"],
            "recipeInstructions": [
                { "@type": "HowToSection", "name": "Pasta", "itemListElement": [
                    { "@type": "HowToStep", "text": "Boil pasta." }
                ]},
                { "@type": "HowToStep", "text": "Stir in cheese." }
            ]
        });
        let p = from_capture("https://example.com/mac", raw).unwrap();
        assert_eq!(p.title, "Mac & Cheese");
        assert_eq!(p.servings, Some(4));
        assert_eq!((p.prep_time, p.cook_time), (Some(10), Some(25)));
        assert_eq!(p.instructions, vec!["Boil pasta.", "Stir in cheese."]);
        assert_eq!(p.sources, Some(vec!["https://example.com/mac".to_string()]));
        assert_eq!(p.ingredients[1].notes.as_deref(), Some("grated"));
    }

    #[test]
    fn capture_accepts_normalized_shape() {
        let raw = json!({
            "title": "Tea",
            "ingredients": ["1 tea bag", { "name": "water", "quantity": 250, "unit": "ml" }],
            "instructions": ["Steep."]
        });
        let p = from_capture("https://example.com/tea", raw).unwrap();
        assert_eq!(p.ingredients[0].name, "tea bag");
        assert_eq!(p.ingredients[1].quantity, Some(250.0));
    }

    #[test]
    fn capture_without_instructions_is_rejected_whole() {
        let raw = json!({ "@type": "Recipe", "name": "Air", "recipeIngredient": ["1 cup air"] });
        assert!(matches!(
            from_capture("https://example.com", raw),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn reads_json_ld_and_visible_text() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"@type":"Recipe","name":"Pie"}</script>
            <style>p { color: red }</style></head>
            <body><h1>Pie</h1><p>Bake   it.</p></body></html>"#;
        let blocks = json_ld_blocks(html);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["name"], "Pie");
        let text = page_text(html, 1000);
        assert_eq!(text, "Pie\nBake it.");
    }
}
