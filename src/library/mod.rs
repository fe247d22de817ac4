//! Saved-plays library and document persistence.
//!
//! Provides:
//! - `store`: the `KeyValueStore` gateway trait with memory and directory backends
//! - `migration`: versioned upgrade of stored records
//! - `export`: the standalone play file format (`{name, frames, version, exportedAt}`)
//! - `roster`: team rosters and workspace preferences
//! - `PlayLibrary`: typed access to the in-progress draft and the saved plays

pub mod export;
pub mod migration;
pub mod roster;
pub mod store;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::play::model::{CourtType, Frame, Play};
use migration::{migrate, CURRENT_SCHEMA_VERSION, DEFAULT_CATEGORY};

pub use export::PlayFile;
pub use roster::{Roster, RosterPlayer, Workspace};
#[cfg(not(target_arch = "wasm32"))]
pub use store::DirStore;
pub use store::{KeyValueStore, MemoryStore};

/// Key of the in-progress document.
pub const CURRENT_KEY: &str = "playchalk/current";

/// Key prefix of saved plays; the play id follows.
pub const PLAYS_PREFIX: &str = "playchalk/plays/";

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

// =============================================================================
// RECORDS
// =============================================================================

/// A named, timestamped snapshot of a play in the library.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavedPlay {
    pub id: String,
    pub name: String,
    pub frames: Vec<Arc<Frame>>,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub court_type: CourtType,

    pub created_at: i64,
    pub updated_at: i64,
}

impl SavedPlay {
    /// The saved frames as a live document with the cursor on frame 0.
    pub fn to_play(&self) -> Play {
        Play {
            name: self.name.clone(),
            frames: self.frames.clone(),
            current_frame_index: 0,
        }
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

/// The in-progress document plus its link to the library, autosaved under
/// `CURRENT_KEY`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub name: String,
    pub frames: Vec<Arc<Frame>>,

    #[serde(default)]
    pub current_frame_index: usize,

    /// Saved play this draft was loaded from or last saved as.
    #[serde(default)]
    pub current_play_id: Option<String>,

    #[serde(default = "default_category")]
    pub category: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub court_type: CourtType,
}

/// Serializes a record with the current schema version stamped on it.
pub fn encode_record<T: Serialize>(record: &T) -> StoreResult<String> {
    let mut value = serde_json::to_value(record)?;
    if let Value::Object(map) = &mut value {
        map.insert("version".to_string(), Value::from(CURRENT_SCHEMA_VERSION));
    }
    Ok(serde_json::to_string(&value)?)
}

/// Parses a stored record of any supported version.
pub fn decode_record<T: DeserializeOwned>(raw: &str) -> StoreResult<T> {
    let value: Value = serde_json::from_str(raw)?;
    let value = migrate(value)?;
    Ok(serde_json::from_value(value)?)
}

// =============================================================================
// PLAY LIBRARY
// =============================================================================

/// Typed access to stored plays over any `KeyValueStore`.
pub struct PlayLibrary<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> PlayLibrary<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn play_key(id: &str) -> StoreResult<String> {
        if id.is_empty() || id.contains('/') {
            return Err(StoreError::invalid_key(id));
        }
        Ok(format!("{PLAYS_PREFIX}{id}"))
    }

    /// Writes the in-progress document.
    pub fn save_draft(&mut self, draft: &Draft) -> StoreResult<()> {
        let raw = encode_record(draft)?;
        self.store.set(CURRENT_KEY, &raw)
    }

    /// Reads the in-progress document, upgrading older records.
    pub fn load_draft(&self) -> StoreResult<Option<Draft>> {
        self.store
            .get(CURRENT_KEY)?
            .map(|raw| decode_record(&raw))
            .transpose()
    }

    /// Inserts or replaces a saved play.
    pub fn put_play(&mut self, play: &SavedPlay) -> StoreResult<()> {
        let key = Self::play_key(&play.id)?;
        let raw = encode_record(play)?;
        self.store.set(&key, &raw)?;
        log::debug!("saved play '{}' ({} frames)", play.name, play.frames.len());
        Ok(())
    }

    /// Gets a saved play by id.
    pub fn get_play(&self, id: &str) -> StoreResult<Option<SavedPlay>> {
        let key = Self::play_key(id)?;
        self.store
            .get(&key)?
            .map(|raw| decode_record(&raw))
            .transpose()
    }

    /// Removes a saved play. Returns whether it existed.
    pub fn delete_play(&mut self, id: &str) -> StoreResult<bool> {
        let key = Self::play_key(id)?;
        let existed = self.store.get(&key)?.is_some();
        self.store.remove(&key)?;
        Ok(existed)
    }

    /// Every saved play, most recently updated first.
    ///
    /// Records that fail to decode are skipped with a warning rather than
    /// hiding the rest of the library.
    pub fn list_plays(&self) -> StoreResult<Vec<SavedPlay>> {
        let mut plays = Vec::new();
        for key in self.store.keys_with_prefix(PLAYS_PREFIX)? {
            let Some(raw) = self.store.get(&key)? else {
                continue;
            };
            match decode_record::<SavedPlay>(&raw) {
                Ok(play) => plays.push(play),
                Err(e) => log::warn!("skipping unreadable saved play {}: {}", key, e),
            }
        }
        plays.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(plays)
    }

    /// Saved plays in one category.
    pub fn plays_in_category(&self, category: &str) -> StoreResult<Vec<SavedPlay>> {
        Ok(self
            .list_plays()?
            .into_iter()
            .filter(|p| p.category == category)
            .collect())
    }

    /// Union of every saved play's tags, sorted.
    pub fn all_tags(&self) -> StoreResult<Vec<String>> {
        let mut tags: Vec<String> = self
            .list_plays()?
            .into_iter()
            .flat_map(|p| p.tags)
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    /// Changes a saved play's category and tags without touching its frames.
    /// Returns false if no such play exists.
    pub fn update_metadata(
        &mut self,
        id: &str,
        category: &str,
        tags: &[String],
    ) -> StoreResult<bool> {
        let Some(mut play) = self.get_play(id)? else {
            return Ok(false);
        };
        play.category = category.to_string();
        play.tags = tags.to_vec();
        play.updated_at = now_millis();
        self.put_play(&play)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::play::model::{ObjectKind, PlayObject};

    fn saved(id: &str, updated_at: i64, tags: &[&str]) -> SavedPlay {
        let mut frame = Frame::new();
        frame.objects.insert(
            "p1".into(),
            PlayObject::new("p1", ObjectKind::OffensePlayer, 10.0, 20.0),
        );
        SavedPlay {
            id: id.to_string(),
            name: format!("Play {id}"),
            frames: vec![Arc::new(frame)],
            category: "Offense".to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            court_type: CourtType::Full,
            created_at: 1,
            updated_at,
        }
    }

    #[test]
    fn test_put_get_round_trip() {
        let mut lib = PlayLibrary::new(MemoryStore::new());
        let play = saved("a", 10, &[]);
        lib.put_play(&play).unwrap();
        assert_eq!(lib.get_play("a").unwrap(), Some(play));
        assert_eq!(lib.get_play("missing").unwrap(), None);
    }

    #[test]
    fn test_records_are_versioned() {
        let mut lib = PlayLibrary::new(MemoryStore::new());
        lib.put_play(&saved("a", 10, &[])).unwrap();
        let raw = lib.store().get("playchalk/plays/a").unwrap().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_list_is_newest_first_and_skips_garbage() {
        let mut store = MemoryStore::new();
        store.set("playchalk/plays/bad", "{not json").unwrap();
        let mut lib = PlayLibrary::new(store);
        lib.put_play(&saved("old", 1, &[])).unwrap();
        lib.put_play(&saved("new", 5, &[])).unwrap();

        let ids: Vec<_> = lib.list_plays().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["new".to_string(), "old".to_string()]);
    }

    #[test]
    fn test_delete_reports_existence() {
        let mut lib = PlayLibrary::new(MemoryStore::new());
        lib.put_play(&saved("a", 1, &[])).unwrap();
        assert!(lib.delete_play("a").unwrap());
        assert!(!lib.delete_play("a").unwrap());
    }

    #[test]
    fn test_tags_and_metadata() {
        let mut lib = PlayLibrary::new(MemoryStore::new());
        lib.put_play(&saved("a", 1, &["press", "zone"])).unwrap();
        lib.put_play(&saved("b", 2, &["zone"])).unwrap();
        assert_eq!(lib.all_tags().unwrap(), vec!["press".to_string(), "zone".to_string()]);

        assert!(lib
            .update_metadata("b", "Defense", &["man".to_string()])
            .unwrap());
        assert!(!lib.update_metadata("zzz", "Defense", &[]).unwrap());
        let b = lib.get_play("b").unwrap().unwrap();
        assert_eq!(b.category, "Defense");
        assert_eq!(b.tags, vec!["man".to_string()]);
        assert_eq!(lib.plays_in_category("Defense").unwrap().len(), 1);
    }

    #[test]
    fn test_legacy_saved_play_is_upgraded() {
        let mut store = MemoryStore::new();
        store
            .set(
                "playchalk/plays/old",
                r#"{"id":"old","name":"Legacy","createdAt":1,"updatedAt":2,
                    "frames":[{"id":"f","objects":{},"annotations":[]}]}"#,
            )
            .unwrap();
        let lib = PlayLibrary::new(store);
        let play = lib.get_play("old").unwrap().unwrap();
        assert_eq!(play.category, "Uncategorized");
        assert_eq!(play.court_type, CourtType::Full);
        assert_eq!(play.frames[0].duration, 500);
    }

    #[test]
    fn test_draft_round_trip() {
        let mut lib = PlayLibrary::new(MemoryStore::new());
        assert_eq!(lib.load_draft().unwrap(), None);

        let play = saved("a", 1, &[]).to_play();
        let draft = Draft {
            name: play.name.clone(),
            frames: play.frames.clone(),
            current_frame_index: 0,
            current_play_id: Some("a".into()),
            category: "Offense".into(),
            tags: vec![],
            court_type: CourtType::Half,
        };
        lib.save_draft(&draft).unwrap();
        assert_eq!(lib.load_draft().unwrap(), Some(draft));
    }

    #[test]
    fn test_ids_with_slashes_are_rejected() {
        let lib = PlayLibrary::new(MemoryStore::new());
        assert!(lib.get_play("a/b").is_err());
    }
}
