//! Product record mapping
//!
//! Maps a raw API payload to the fixed set of output columns, applying the
//! same normalization to free-text fields (name, description) on every run
//! so the output dataset stays consistent across resumes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

/// Output column order. The TSV writer and the record must always agree on
/// this; the header row is derived from it.
pub const FIELDS: [&str; 7] = [
    "id",
    "name",
    "url_key",
    "price",
    "description",
    "image_url",
    "missing_fields",
];

/// Errors that can occur while mapping a payload to a record
#[derive(Debug, Error)]
pub enum MapError {
    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// One fully mapped product, ready to append as a single output row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub url_key: String,
    pub price: String,
    pub description: String,
    pub image_url: String,
    /// Comma-joined names of the optional fields that came back empty
    pub missing_fields: String,
}

impl ProductRecord {
    /// Returns the field values in output column order
    pub fn field_values(&self) -> [&str; 7] {
        [
            &self.id,
            &self.name,
            &self.url_key,
            &self.price,
            &self.description,
            &self.image_url,
            &self.missing_fields,
        ]
    }
}

/// Maps an API payload to a ProductRecord
///
/// Missing or empty fields are tolerated (tracked in `missing_fields`);
/// only a payload that is not a JSON object at all is malformed.
pub fn map_product(identifier: &str, payload: &Value) -> Result<ProductRecord, MapError> {
    let obj = payload.as_object().ok_or(MapError::NotAnObject)?;

    let name = clean_text(obj.get("name").and_then(Value::as_str).unwrap_or(""));
    let url_key = obj
        .get("url_key")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();
    let price = match obj.get("price") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    let description = clean_text(obj.get("description").and_then(Value::as_str).unwrap_or(""));
    let image_url = obj
        .get("images")
        .and_then(Value::as_array)
        .and_then(|images| images.first())
        .and_then(|image| image.get("base_url"))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    let missing: Vec<&str> = [
        ("name", name.as_str()),
        ("url_key", url_key.as_str()),
        ("price", price.as_str()),
        ("description", description.as_str()),
        ("image_url", image_url.as_str()),
    ]
    .iter()
    .filter(|(_, value)| value.is_empty())
    .map(|(field, _)| *field)
    .collect();

    Ok(ProductRecord {
        id: identifier.to_string(),
        name,
        url_key,
        price,
        description,
        image_url,
        missing_fields: missing.join(","),
    })
}

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());
static MARKUP_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\b(p|img|id|style|src)\b").unwrap());
static DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^a-zA-Z0-9À-ỹà-ỹ\s.,!?():;"'-]"#).unwrap());

/// Normalizes a free-text field for the output dataset
///
/// Strips HTML tags and stray markup tokens, drops characters outside the
/// catalog's alphabet and basic punctuation, lowercases, and collapses
/// whitespace.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = TAG_RE.replace_all(text, " ");
    let text = MARKUP_TOKEN_RE.replace_all(&text, " ");
    let text = DISALLOWED_RE.replace_all(&text, " ");
    let text = text.to_lowercase();
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_text_strips_tags() {
        assert_eq!(
            clean_text("<p>Solid <b>oak</b> table</p>"),
            "solid oak table"
        );
    }

    #[test]
    fn test_clean_text_collapses_whitespace_and_lowercases() {
        assert_eq!(clean_text("  Many   SPACES\n\there "), "many spaces here");
    }

    #[test]
    fn test_clean_text_drops_stray_markup_tokens() {
        assert_eq!(clean_text("img src style oak"), "oak");
    }

    #[test]
    fn test_clean_text_empty() {
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_map_full_payload() {
        let payload = json!({
            "name": "Oak Table",
            "url_key": "oak-table",
            "price": 129.5,
            "description": "<p>A sturdy table</p>",
            "images": [{"base_url": "https://cdn.example.com/oak.jpg"}]
        });

        let record = map_product("42", &payload).unwrap();
        assert_eq!(record.id, "42");
        assert_eq!(record.name, "oak table");
        assert_eq!(record.url_key, "oak-table");
        assert_eq!(record.price, "129.5");
        assert_eq!(record.description, "a sturdy table");
        assert_eq!(record.image_url, "https://cdn.example.com/oak.jpg");
        assert_eq!(record.missing_fields, "");
    }

    #[test]
    fn test_map_tracks_missing_fields() {
        let payload = json!({
            "name": "Oak Table",
            "price": 10
        });

        let record = map_product("42", &payload).unwrap();
        assert_eq!(record.url_key, "");
        assert_eq!(record.image_url, "");
        assert_eq!(record.missing_fields, "url_key,description,image_url");
    }

    #[test]
    fn test_map_price_as_string() {
        let payload = json!({"name": "Oak", "price": "99"});
        let record = map_product("1", &payload).unwrap();
        assert_eq!(record.price, "99");
    }

    #[test]
    fn test_map_rejects_non_object_payload() {
        assert!(matches!(
            map_product("1", &json!([1, 2, 3])),
            Err(MapError::NotAnObject)
        ));
        assert!(matches!(
            map_product("1", &json!("just a string")),
            Err(MapError::NotAnObject)
        ));
    }

    #[test]
    fn test_field_values_order_matches_fields() {
        let record = ProductRecord {
            id: "1".into(),
            name: "n".into(),
            url_key: "u".into(),
            price: "p".into(),
            description: "d".into(),
            image_url: "i".into(),
            missing_fields: "m".into(),
        };
        assert_eq!(record.field_values(), ["1", "n", "u", "p", "d", "i", "m"]);
        assert_eq!(FIELDS.len(), record.field_values().len());
    }
}
