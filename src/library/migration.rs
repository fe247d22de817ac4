//! Versioned schema migration for persisted records.
//!
//! Every record written by this crate carries a top-level `version`. Older
//! records are upgraded one step at a time on the untyped JSON value, then
//! deserialized into the current types.
//!
//! | version | shape                                                        |
//! |---------|--------------------------------------------------------------|
//! | 0       | unversioned; frames may lack `duration`, `textAnnotations`   |
//! | 1       | frames complete except `shapes`; plays lack category/tags    |
//! | 2       | drafts and saved plays lack `courtType`                      |
//! | 3       | current                                                      |

use serde_json::{json, Map, Value};

use crate::error::{StoreError, StoreResult};
use crate::play::model::{generate_id, DEFAULT_FRAME_DURATION_MS};

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: u64 = 3;

/// Category given to saved plays that never had one.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

fn schema_error(msg: &str) -> StoreError {
    StoreError::Json(<serde_json::Error as serde::de::Error>::custom(msg))
}

/// Reads the record's schema version. Missing means 0.
pub fn record_version(value: &Value) -> StoreResult<u64> {
    match value.get("version") {
        None | Some(Value::Null) => Ok(0),
        Some(v) => v
            .as_u64()
            .ok_or_else(|| schema_error("'version' is not a non-negative integer")),
    }
}

/// Upgrades a record to `CURRENT_SCHEMA_VERSION`.
pub fn migrate(mut value: Value) -> StoreResult<Value> {
    let mut version = record_version(&value)?;
    if version > CURRENT_SCHEMA_VERSION {
        return Err(StoreError::unsupported_version(version, CURRENT_SCHEMA_VERSION));
    }

    let record = value
        .as_object_mut()
        .ok_or_else(|| schema_error("record is not a JSON object"))?;

    while version < CURRENT_SCHEMA_VERSION {
        match version {
            0 => migrate_v0_to_v1(record)?,
            1 => migrate_v1_to_v2(record)?,
            2 => migrate_v2_to_v3(record),
            _ => return Err(StoreError::unsupported_version(version, CURRENT_SCHEMA_VERSION)),
        }
        version += 1;
        log::debug!("migrated record to schema version {}", version);
    }
    record.insert("version".to_string(), json!(CURRENT_SCHEMA_VERSION));
    Ok(value)
}

fn frames_mut(record: &mut Map<String, Value>) -> StoreResult<&mut Vec<Value>> {
    record
        .get_mut("frames")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| schema_error("record has no 'frames' array"))
}

fn fill(obj: &mut Map<String, Value>, key: &str, default: Value) {
    let missing = matches!(obj.get(key), None | Some(Value::Null));
    if missing {
        obj.insert(key.to_string(), default);
    }
}

/// v0 -> v1: complete every frame and token.
fn migrate_v0_to_v1(record: &mut Map<String, Value>) -> StoreResult<()> {
    for frame in frames_mut(record)? {
        let frame = frame
            .as_object_mut()
            .ok_or_else(|| schema_error("frame is not a JSON object"))?;

        fill(frame, "id", json!(generate_id()));
        fill(frame, "objects", json!({}));
        fill(frame, "annotations", json!([]));
        fill(frame, "textAnnotations", json!([]));
        fill(frame, "duration", json!(DEFAULT_FRAME_DURATION_MS));

        if let Some(objects) = frame.get_mut("objects").and_then(Value::as_object_mut) {
            for (key, object) in objects.iter_mut() {
                if let Some(object) = object.as_object_mut() {
                    fill(object, "id", json!(key));
                    fill(object, "rotation", json!(0));
                }
            }
        }
    }
    Ok(())
}

/// v1 -> v2: shapes per frame; category and tags on saved plays.
fn migrate_v1_to_v2(record: &mut Map<String, Value>) -> StoreResult<()> {
    for frame in frames_mut(record)? {
        if let Some(frame) = frame.as_object_mut() {
            fill(frame, "shapes", json!([]));
        }
    }
    // Only saved plays carry timestamps.
    if record.contains_key("createdAt") {
        fill(record, "category", json!(DEFAULT_CATEGORY));
        fill(record, "tags", json!([]));
    }
    Ok(())
}

/// v2 -> v3: drafts and saved plays record the court they were drawn on.
fn migrate_v2_to_v3(record: &mut Map<String, Value>) {
    let saved_or_draft =
        record.contains_key("createdAt") || record.contains_key("currentFrameIndex");
    if saved_or_draft {
        fill(record, "courtType", json!("full"));
    }
}
