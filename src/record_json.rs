//! Purpose: JSON envelopes for `--format jsonl` stdout records.
//! Exports: `catalog_json` and `notification_json`.
//! Role: Keep stdout record shapes in one place.
//! Invariants: Stable key names; catalog keys mirror `sqlite_master` column names.

use notedump::api::{AppId, CatalogEntry, DecodedNotification, to_json};
use serde_json::{Map, Value, json};

/// Serialized field names follow `sqlite_master`, so `kind` becomes `type`.
pub(crate) fn catalog_json(entries: &[CatalogEntry]) -> Value {
    json!({ "catalog": entries })
}

pub(crate) fn notification_json(note: &DecodedNotification) -> Value {
    let mut map = Map::new();
    map.insert("note_id".to_string(), json!(note.note_id));
    map.insert("app_id".to_string(), app_id_json(&note.app_id));
    map.insert("title".to_string(), to_json(&note.title));
    map.insert("message".to_string(), to_json(&note.message));
    if let Some(version) = note.archive_version {
        map.insert("archive_version".to_string(), json!(version));
    }
    Value::Object(map)
}

fn app_id_json(app_id: &AppId) -> Value {
    match app_id {
        AppId::Integer(value) => json!(value),
        AppId::Text(value) => json!(value),
        AppId::Null => Value::Null,
    }
}
