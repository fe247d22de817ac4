//! Team rosters and workspace preferences.
//!
//! Both live in one versioned record under `WORKSPACE_KEY`, separate from
//! play documents. Roster players become ordinary tokens when placed on the
//! court; the roster itself is never part of a play.

use serde::{Deserialize, Serialize};

use super::{decode_record, encode_record, KeyValueStore, PlayLibrary};
use crate::error::StoreResult;
use crate::play::model::{ObjectKind, PlayObject};

/// Key of the workspace record.
pub const WORKSPACE_KEY: &str = "playchalk/workspace";

/// Color given to a roster created without one.
pub const DEFAULT_ROSTER_COLOR: &str = "#ef4444";

fn default_roster_color() -> String {
    DEFAULT_ROSTER_COLOR.to_string()
}

fn default_true() -> bool {
    true
}

/// One player on a team roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RosterPlayer {
    pub id: String,
    pub name: String,
    /// Jersey number, drawn as the token label.
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
}

impl RosterPlayer {
    pub fn new(id: impl Into<String>, name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            number: number.into(),
            position: None,
        }
    }

    /// Builder: Set position.
    pub fn with_position(mut self, position: impl Into<String>) -> Self {
        self.position = Some(position.into());
        self
    }
}

/// A named team whose players share a token color.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    pub id: String,
    pub name: String,
    #[serde(default = "default_roster_color")]
    pub color: String,
    #[serde(default)]
    pub players: Vec<RosterPlayer>,
}

impl Roster {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: default_roster_color(),
            players: Vec::new(),
        }
    }

    /// Builder: Set color.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Builder: Add a player.
    pub fn with_player(mut self, player: RosterPlayer) -> Self {
        self.players.push(player);
        self
    }

    pub fn player(&self, id: &str) -> Option<&RosterPlayer> {
        self.players.iter().find(|p| p.id == id)
    }

    /// An offense token for one of this roster's players, labeled with the
    /// jersey number and drawn in the roster color. The token gets a fresh id.
    pub fn token_for(&self, player_id: &str, x: f64, y: f64) -> Option<PlayObject> {
        let player = self.player(player_id)?;
        Some(
            PlayObject::spawn(ObjectKind::OffensePlayer, x, y)
                .with_label(player.number.clone())
                .with_color(self.color.clone()),
        )
    }
}

/// Library-wide settings that are not part of any play.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    #[serde(default)]
    pub rosters: Vec<Roster>,

    /// Whether the host should autosave the in-progress document.
    #[serde(default = "default_true")]
    pub auto_save_enabled: bool,
}

impl Default for Workspace {
    fn default() -> Self {
        Self {
            rosters: Vec::new(),
            auto_save_enabled: true,
        }
    }
}

impl<S: KeyValueStore> PlayLibrary<S> {
    /// Reads the workspace record, or the defaults if none was written.
    pub fn load_workspace(&self) -> StoreResult<Workspace> {
        match self.store.get(WORKSPACE_KEY)? {
            Some(raw) => decode_record(&raw),
            None => Ok(Workspace::default()),
        }
    }

    pub fn save_workspace(&mut self, workspace: &Workspace) -> StoreResult<()> {
        let raw = encode_record(workspace)?;
        self.store.set(WORKSPACE_KEY, &raw)
    }

    fn update_workspace<F>(&mut self, f: F) -> StoreResult<bool>
    where
        F: FnOnce(&mut Workspace) -> bool,
    {
        let mut workspace = self.load_workspace()?;
        let changed = f(&mut workspace);
        if changed {
            self.save_workspace(&workspace)?;
        }
        Ok(changed)
    }

    pub fn list_rosters(&self) -> StoreResult<Vec<Roster>> {
        Ok(self.load_workspace()?.rosters)
    }

    pub fn get_roster(&self, id: &str) -> StoreResult<Option<Roster>> {
        Ok(self.list_rosters()?.into_iter().find(|r| r.id == id))
    }

    /// Adds a roster, replacing any roster with the same id in place.
    pub fn add_roster(&mut self, roster: Roster) -> StoreResult<()> {
        log::debug!("storing roster '{}' ({} players)", roster.name, roster.players.len());
        self.update_workspace(|ws| {
            match ws.rosters.iter_mut().find(|r| r.id == roster.id) {
                Some(existing) => *existing = roster,
                None => ws.rosters.push(roster),
            }
            true
        })?;
        Ok(())
    }

    /// Removes a roster. Returns whether it existed.
    pub fn delete_roster(&mut self, id: &str) -> StoreResult<bool> {
        self.update_workspace(|ws| {
            let before = ws.rosters.len();
            ws.rosters.retain(|r| r.id != id);
            ws.rosters.len() != before
        })
    }

    /// Appends a player to a roster. Returns false if the roster is missing
    /// or already has a player with that id.
    pub fn add_player_to_roster(
        &mut self,
        roster_id: &str,
        player: RosterPlayer,
    ) -> StoreResult<bool> {
        self.update_workspace(|ws| {
            let Some(roster) = ws.rosters.iter_mut().find(|r| r.id == roster_id) else {
                return false;
            };
            if roster.player(&player.id).is_some() {
                log::warn!("roster '{}' already has player {}", roster.name, player.id);
                return false;
            }
            roster.players.push(player);
            true
        })
    }

    /// Removes a player from a roster. Returns whether anything was removed.
    pub fn remove_player_from_roster(
        &mut self,
        roster_id: &str,
        player_id: &str,
    ) -> StoreResult<bool> {
        self.update_workspace(|ws| {
            let Some(roster) = ws.rosters.iter_mut().find(|r| r.id == roster_id) else {
                return false;
            };
            let before = roster.players.len();
            roster.players.retain(|p| p.id != player_id);
            roster.players.len() != before
        })
    }

    pub fn set_auto_save_enabled(&mut self, enabled: bool) -> StoreResult<()> {
        self.update_workspace(|ws| {
            let changed = ws.auto_save_enabled != enabled;
            ws.auto_save_enabled = enabled;
            changed
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::MemoryStore;

    fn starting_five() -> Roster {
        (1..=5).fold(Roster::new("home", "Team 1"), |roster, n| {
            let player = RosterPlayer::new(format!("p{n}"), format!("Player {n}"), n.to_string());
            roster.with_player(player)
        })
    }

    #[test]
    fn test_empty_workspace_defaults() {
        let lib = PlayLibrary::new(MemoryStore::new());
        let workspace = lib.load_workspace().unwrap();
        assert!(workspace.rosters.is_empty());
        assert!(workspace.auto_save_enabled);
    }

    #[test]
    fn test_roster_crud() {
        let mut lib = PlayLibrary::new(MemoryStore::new());
        lib.add_roster(starting_five()).unwrap();
        lib.add_roster(Roster::new("away", "Team 2").with_color("#2563eb")).unwrap();
        assert_eq!(lib.list_rosters().unwrap().len(), 2);

        assert!(lib
            .add_player_to_roster("away", RosterPlayer::new("g", "Guard", "3").with_position("G"))
            .unwrap());
        assert!(!lib.add_player_to_roster("away", RosterPlayer::new("g", "Dup", "4")).unwrap());
        assert!(!lib.add_player_to_roster("nobody", RosterPlayer::new("x", "X", "9")).unwrap());
        assert_eq!(lib.get_roster("away").unwrap().unwrap().players.len(), 1);

        assert!(lib.remove_player_from_roster("home", "p2").unwrap());
        assert!(!lib.remove_player_from_roster("home", "p2").unwrap());
        assert_eq!(lib.get_roster("home").unwrap().unwrap().players.len(), 4);

        assert!(lib.delete_roster("home").unwrap());
        assert!(!lib.delete_roster("home").unwrap());
        let ids: Vec<_> = lib.list_rosters().unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["away".to_string()]);
    }

    #[test]
    fn test_add_roster_replaces_same_id() {
        let mut lib = PlayLibrary::new(MemoryStore::new());
        lib.add_roster(starting_five()).unwrap();
        lib.add_roster(Roster::new("home", "Renamed")).unwrap();
        let rosters = lib.list_rosters().unwrap();
        assert_eq!(rosters.len(), 1);
        assert_eq!(rosters[0].name, "Renamed");
    }

    #[test]
    fn test_auto_save_preference_persists() {
        let mut lib = PlayLibrary::new(MemoryStore::new());
        lib.add_roster(starting_five()).unwrap();
        lib.set_auto_save_enabled(false).unwrap();

        let lib = PlayLibrary::new(lib.into_inner());
        let workspace = lib.load_workspace().unwrap();
        assert!(!workspace.auto_save_enabled);
        assert_eq!(workspace.rosters.len(), 1);
    }

    #[test]
    fn test_roster_token() {
        let roster = starting_five().with_color("#16a34a");
        let token = roster.token_for("p4", 120.0, 80.0).unwrap();
        assert_eq!(token.kind, ObjectKind::OffensePlayer);
        assert_eq!(token.label.as_deref(), Some("4"));
        assert_eq!(token.effective_color(), "#16a34a");
        assert_eq!((token.x, token.y), (120.0, 80.0));
        assert!(roster.token_for("ghost", 0.0, 0.0).is_none());
    }

    #[test]
    fn test_workspace_record_missing_fields() {
        let mut store = MemoryStore::new();
        store
            .set(
                WORKSPACE_KEY,
                r#"{"version":3,"rosters":[{"id":"r","name":"Bench","players":[]}]}"#,
            )
            .unwrap();
        let workspace = PlayLibrary::new(store).load_workspace().unwrap();
        assert!(workspace.auto_save_enabled);
        assert_eq!(workspace.rosters[0].color, DEFAULT_ROSTER_COLOR);
    }
}
