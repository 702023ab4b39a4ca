//! Lock file schema migration.
//!
//! Each step is a pure function from a document at one version to a document
//! at a strictly higher version. [`migrate`] applies steps until the document
//! reaches [`CURRENT_LOCK_VERSION`]. Documents from a newer schema are passed
//! through untouched so an older client never rewrites records it cannot read.

use {
    serde_json::{Map, Value, json},
    tracing::{info, warn},
};

use crate::{
    error::{Error, Result},
    types::{CURRENT_LOCK_VERSION, LockState},
};

type Step = fn(Value) -> Value;

/// Version this step upgrades from, and the step itself.
const STEPS: &[(u32, Step)] = &[
    (0, discard as Step),
    (1, discard as Step),
    (2, v2_to_v3 as Step),
];

/// Upgrade a raw lock document to the current schema and deserialize it.
pub fn migrate(doc: Value) -> Result<LockState> {
    LockState::from_value(upgrade(doc)?)
}

/// Apply the step chain to a raw document.
pub fn upgrade(mut doc: Value) -> Result<Value> {
    let mut version = read_version(&doc)?;
    let original = version;

    while version < CURRENT_LOCK_VERSION {
        let step = STEPS
            .iter()
            .find(|(from, _)| *from == version)
            .map(|(_, step)| *step)
            .ok_or_else(|| Error::invalid_schema(format!("no migration from version {version}")))?;

        doc = step(doc);
        let next = read_version(&doc)?;
        if next <= version {
            return Err(Error::invalid_schema(format!(
                "migration from version {version} did not advance"
            )));
        }
        version = next;
    }

    if original != version {
        info!(from = original, to = version, "migrated lock file schema");
    } else if version > CURRENT_LOCK_VERSION {
        warn!(
            version,
            current = CURRENT_LOCK_VERSION,
            "lock file written by a newer version, leaving it as-is"
        );
    }
    Ok(doc)
}

fn read_version(doc: &Value) -> Result<u32> {
    let raw = doc
        .get("version")
        .ok_or_else(|| Error::invalid_schema("missing version field"))?;
    raw.as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| Error::invalid_schema(format!("version must be an integer, got {raw}")))
}

/// v0/v1 documents lack the fields needed to rebuild records. Start over;
/// users re-add skills to repopulate the lock.
fn discard(doc: Value) -> Value {
    let dropped = doc
        .get("skills")
        .and_then(Value::as_object)
        .map_or(0, Map::len);
    warn!(
        dropped,
        "lock file uses an unrecoverable schema, starting fresh; reinstall skills to track them"
    );
    json!({ "version": CURRENT_LOCK_VERSION, "skills": {} })
}

/// v2 → v3 adds `skillFolderHash`. Existing records stay as they are and pick
/// up a folder hash on their next update.
fn v2_to_v3(mut doc: Value) -> Value {
    if let Some(skills) = doc.get_mut("skills").and_then(Value::as_object_mut) {
        for record in skills.values_mut().filter_map(Value::as_object_mut) {
            record.remove("skillFolderHash");
        }
    }
    if let Some(obj) = doc.as_object_mut() {
        obj.insert("version".into(), json!(3));
    }
    doc
}
