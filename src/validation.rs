//! Schema validation for source API payloads
//!
//! Raw JSON is decoded into a permissive wire shape and then normalized into
//! an [`Item`]. Failures are returned as [`ValidationError`] values so the
//! source client can decide what an invalid payload means for the run.

use crate::error::ValidationError;
use crate::types::{Item, ItemId};
use serde::Deserialize;
use serde_json::Value;

/// Wire shape of `/item/{id}.json`; unknown fields are ignored
#[derive(Debug, Deserialize)]
struct RawItem {
    id: Option<i64>,
    title: Option<String>,
    url: Option<String>,
    text: Option<String>,
    score: Option<i64>,
    by: Option<String>,
    time: Option<i64>,
    descendants: Option<i64>,
    #[serde(rename = "type")]
    item_type: Option<String>,
    dead: Option<bool>,
    deleted: Option<bool>,
}

/// Validate and normalize an item payload
///
/// `id` is required and must be positive. `score` and `descendants` default
/// to 0 and must not be negative; `time` defaults to 0; `dead`/`deleted`
/// default to false. `url`, when present, must be an absolute URL. Optional
/// strings stay `None` when absent.
pub fn parse_item(raw: &Value) -> Result<Item, ValidationError> {
    if !raw.is_object() {
        return Err(ValidationError::Malformed(format!(
            "expected item object, got {}",
            json_kind(raw)
        )));
    }

    let wire = RawItem::deserialize(raw).map_err(|e| ValidationError::Malformed(e.to_string()))?;

    let id = wire.id.ok_or(ValidationError::MissingField("id"))?;
    if id <= 0 {
        return Err(ValidationError::InvalidField {
            field: "id",
            reason: format!("must be positive, got {id}"),
        });
    }

    let score = non_negative("score", wire.score)?;
    let descendants = non_negative("descendants", wire.descendants)?;

    if let Some(link) = &wire.url {
        url::Url::parse(link).map_err(|e| ValidationError::InvalidField {
            field: "url",
            reason: e.to_string(),
        })?;
    }

    Ok(Item {
        id: ItemId(id),
        title: wire.title,
        url: wire.url,
        text: wire.text,
        score,
        author: wire.by,
        created_at_epoch: wire.time.unwrap_or(0),
        descendants,
        item_type: wire.item_type,
        dead: wire.dead.unwrap_or(false),
        deleted: wire.deleted.unwrap_or(false),
    })
}

/// Validate an id list payload
///
/// The whole list is rejected if any entry is not a positive integer; order
/// is preserved.
pub fn parse_id_list(raw: &Value) -> Result<Vec<ItemId>, ValidationError> {
    let entries = raw.as_array().ok_or_else(|| {
        ValidationError::Malformed(format!("expected id array, got {}", json_kind(raw)))
    })?;

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| match entry.as_i64() {
            Some(id) if id > 0 => Ok(ItemId(id)),
            _ => Err(ValidationError::InvalidIdList {
                index,
                reason: format!("expected positive integer, got {entry}"),
            }),
        })
        .collect()
}

fn non_negative(field: &'static str, value: Option<i64>) -> Result<i64, ValidationError> {
    match value {
        None => Ok(0),
        Some(v) if v >= 0 => Ok(v),
        Some(v) => Err(ValidationError::InvalidField {
            field,
            reason: format!("must not be negative, got {v}"),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
