use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::{LocalStore, ACTIVE_PROFILE_KEY, PROFILES_KEY};

/// Avatar used when the form leaves the glyph blank.
pub const DEFAULT_AVATAR: &str = "🙂";

/// One user identity on the box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub avatar: String,
    pub color: String,
    #[serde(rename = "isAdmin", default, skip_serializing_if = "is_false")]
    pub is_admin: bool,
    #[serde(rename = "isAdd", default, skip_serializing_if = "is_false")]
    pub is_add: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Profile {
    fn new(id: impl Into<String>, name: impl Into<String>, avatar: &str, color: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: avatar.to_string(),
            color: color.to_string(),
            is_admin: false,
            is_add: false,
        }
    }

    /// A profile can be picked for login unless it is the add tile.
    pub fn selectable(&self) -> bool {
        !self.is_add
    }
}

/// Built-in set used when no list has ever been persisted.
pub fn default_profiles() -> Vec<Profile> {
    vec![
        Profile {
            is_admin: true,
            ..Profile::new("kul", "Kul", "😎", "#4b8bff")
        },
        Profile::new("guest", "Guest", "🙂", "#ff6b6b"),
        Profile::new("kids", "Kids", "🐸", "#00c9a7"),
        Profile {
            is_add: true,
            ..Profile::new("add", "Add Profile", "+", "#888")
        },
    ]
}

/// Derive a stable slug from a display name: trimmed, lowercased,
/// whitespace runs collapsed to single hyphens.
pub fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("name required")]
    EmptyName,
    #[error("cannot delete the admin profile")]
    Protected,
    #[error("the add tile has no profile to {0}")]
    SentinelTile(&'static str),
    #[error("no profile with id `{0}`")]
    UnknownProfile(String),
    #[error("stored profile list is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// What picking a tile means for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionIntent {
    /// The add tile was picked; open the create form instead of logging in.
    EnterCreateFlow,
    /// A real profile was picked; mark it active and move on.
    Activate(String),
}

/// Owns the ordered profile list and mediates all reads and writes
/// to the backing key-value store.
pub struct ProfileStore {
    backend: LocalStore,
    profiles: Vec<Profile>,
}

impl ProfileStore {
    /// Load the list from storage, seeding the built-in defaults when no
    /// list was ever persisted. The defaults are not written back until the
    /// first mutation.
    pub fn open(backend: LocalStore) -> Result<Self, StoreError> {
        let profiles = match backend.get(PROFILES_KEY) {
            Some(raw) => {
                let mut list: Vec<Profile> =
                    serde_json::from_str(raw).map_err(StoreError::Corrupt)?;
                repair_sentinel(&mut list);
                list
            }
            None => default_profiles(),
        };
        Ok(Self { backend, profiles })
    }

    /// Fallback path for a corrupt stored list: hand back a defaults-backed
    /// store together with the decode error, so the caller can surface it
    /// and keep going. Nothing is persisted until the next mutation.
    pub fn open_or_default(backend: LocalStore) -> (Self, Option<StoreError>) {
        match backend.get(PROFILES_KEY) {
            Some(raw) => match serde_json::from_str::<Vec<Profile>>(raw) {
                Ok(mut list) => {
                    repair_sentinel(&mut list);
                    (Self { backend, profiles: list }, None)
                }
                Err(err) => (
                    Self {
                        backend,
                        profiles: default_profiles(),
                    },
                    Some(StoreError::Corrupt(err)),
                ),
            },
            None => (Self { backend, profiles: default_profiles() }, None),
        }
    }

    pub fn profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn get(&self, id: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Persist the current list verbatim, overwriting any prior value.
    pub fn save(&mut self) -> Result<(), StoreError> {
        let raw = serde_json::to_string(&self.profiles).map_err(StoreError::Corrupt)?;
        self.backend.set(PROFILES_KEY, raw)?;
        Ok(())
    }

    /// Create a profile from form input and insert it immediately before
    /// the add tile. Returns the id of the new profile.
    pub fn create(
        &mut self,
        name: &str,
        avatar: &str,
        color: &str,
    ) -> Result<String, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }

        let avatar = if avatar.trim().is_empty() {
            DEFAULT_AVATAR
        } else {
            avatar.trim()
        };

        let profile = Profile::new(slugify(name), name, avatar, color);
        let id = profile.id.clone();

        // The sentinel stays last; everything new goes in front of it.
        let at = self
            .profiles
            .iter()
            .position(|p| p.is_add)
            .unwrap_or(self.profiles.len());
        self.profiles.insert(at, profile);

        self.save()?;
        Ok(id)
    }

    /// Update name, avatar, and color of an existing profile. The id and the
    /// admin/add flags are immutable after creation.
    pub fn edit(
        &mut self,
        id: &str,
        name: &str,
        avatar: &str,
        color: &str,
    ) -> Result<(), StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }

        let profile = self
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| StoreError::UnknownProfile(id.to_string()))?;
        if profile.is_add {
            return Err(StoreError::SentinelTile("edit"));
        }

        profile.name = name.to_string();
        profile.avatar = if avatar.trim().is_empty() {
            DEFAULT_AVATAR.to_string()
        } else {
            avatar.trim().to_string()
        };
        profile.color = color.to_string();

        self.save()
    }

    /// Remove a profile. The admin profile and the add tile are refused;
    /// the list is left untouched on any failure.
    pub fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        let at = self
            .profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| StoreError::UnknownProfile(id.to_string()))?;
        if self.profiles[at].is_add {
            return Err(StoreError::SentinelTile("delete"));
        }
        if self.profiles[at].is_admin {
            return Err(StoreError::Protected);
        }

        self.profiles.remove(at);
        self.save()
    }

    /// Classify what picking this tile means.
    pub fn selection_intent(&self, id: &str) -> Result<SelectionIntent, StoreError> {
        let profile = self
            .get(id)
            .ok_or_else(|| StoreError::UnknownProfile(id.to_string()))?;
        if profile.is_add {
            Ok(SelectionIntent::EnterCreateFlow)
        } else {
            Ok(SelectionIntent::Activate(profile.id.clone()))
        }
    }

    /// Record a profile as the active session identity.
    pub fn activate(&mut self, id: &str) -> Result<(), StoreError> {
        let profile = self
            .get(id)
            .ok_or_else(|| StoreError::UnknownProfile(id.to_string()))?;
        if profile.is_add {
            return Err(StoreError::SentinelTile("activate"));
        }
        let id = profile.id.clone();
        self.backend.set(ACTIVE_PROFILE_KEY, id)?;
        Ok(())
    }

    /// The id written by the last activation, if any.
    pub fn active(&self) -> Option<&str> {
        self.backend.get(ACTIVE_PROFILE_KEY)
    }

    /// Clear both storage keys; the next open reseeds the defaults.
    pub fn reset(&mut self) -> Result<(), StoreError> {
        self.backend.remove(PROFILES_KEY)?;
        self.backend.remove(ACTIVE_PROFILE_KEY)?;
        self.profiles = default_profiles();
        Ok(())
    }
}

/// Enforce "exactly one add tile, always last" on a loaded list.
/// Works on the in-memory copy only; callers persist via `save`.
fn repair_sentinel(profiles: &mut Vec<Profile>) {
    let mut sentinel = None;
    let mut at = 0;
    while at < profiles.len() {
        if profiles[at].is_add {
            let tile = profiles.remove(at);
            // Keep the first one found; drop duplicates.
            sentinel.get_or_insert(tile);
        } else {
            at += 1;
        }
    }
    profiles.push(sentinel.unwrap_or_else(|| {
        default_profiles()
            .pop()
            .expect("default set ends with the add tile")
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ProfileStore {
        let backend = LocalStore::open_in(dir.path()).unwrap();
        ProfileStore::open(backend).unwrap()
    }

    fn stored_raw(dir: &TempDir) -> Option<String> {
        let backend = LocalStore::open_in(dir.path()).unwrap();
        backend.get(PROFILES_KEY).map(str::to_string)
    }

    fn seed(dir: &TempDir, profiles: &[Profile]) {
        let mut backend = LocalStore::open_in(dir.path()).unwrap();
        backend
            .set(PROFILES_KEY, serde_json::to_string(profiles).unwrap())
            .unwrap();
    }

    #[test]
    fn test_default_seeding() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let profiles = store.profiles();

        assert_eq!(profiles.len(), 4);
        assert!(profiles[0].is_admin);
        assert_eq!(profiles[0].id, "kul");
        assert!(profiles[3].is_add);
        // Seeding alone persists nothing
        assert_eq!(stored_raw(&dir), None);
    }

    #[test]
    fn test_missing_sentinel_is_restored() {
        let dir = TempDir::new().unwrap();
        let list: Vec<Profile> = default_profiles()
            .into_iter()
            .filter(|p| !p.is_add)
            .collect();
        seed(&dir, &list);

        let store = store_in(&dir);
        let adds: Vec<_> = store.profiles().iter().filter(|p| p.is_add).collect();
        assert_eq!(adds.len(), 1);
        assert!(store.profiles().last().unwrap().is_add);
    }

    #[test]
    fn test_misplaced_sentinel_is_moved_last() {
        let dir = TempDir::new().unwrap();
        let mut list = default_profiles();
        let sentinel = list.pop().unwrap();
        list.insert(0, sentinel);
        seed(&dir, &list);

        let store = store_in(&dir);
        assert_eq!(store.profiles().len(), 4);
        assert!(store.profiles().last().unwrap().is_add);
        assert!(!store.profiles()[0].is_add);
    }

    #[test]
    fn test_duplicate_sentinels_collapse_to_one() {
        let dir = TempDir::new().unwrap();
        let mut list = default_profiles();
        let extra = list.last().unwrap().clone();
        list.insert(1, extra);
        seed(&dir, &list);

        let store = store_in(&dir);
        assert_eq!(
            store.profiles().iter().filter(|p| p.is_add).count(),
            1
        );
        assert!(store.profiles().last().unwrap().is_add);
    }

    #[test]
    fn test_create_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let id = store.create("Teen", "", "#123456").unwrap();
        assert_eq!(id, "teen");

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.profiles().len(), 5);
        let teen = reloaded.get("teen").unwrap();
        assert_eq!(teen.avatar, DEFAULT_AVATAR);
        assert_eq!(teen.color, "#123456");
        // Inserted immediately before the add tile
        let at = reloaded.profiles().iter().position(|p| p.id == "teen").unwrap();
        assert!(reloaded.profiles()[at + 1].is_add);
    }

    #[test]
    fn test_slug_derivation() {
        assert_eq!(slugify("New Kid"), "new-kid");
        assert_eq!(slugify("  Movie   Night  "), "movie-night");
        assert_eq!(slugify("Guest"), "guest");
    }

    #[test]
    fn test_create_empty_name_leaves_storage_untouched() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save().unwrap();
        let before = stored_raw(&dir).unwrap();

        assert!(matches!(
            store.create("   ", "🦊", "#fff"),
            Err(StoreError::EmptyName)
        ));
        assert_eq!(stored_raw(&dir).unwrap(), before);
    }

    #[test]
    fn test_edit_empty_name_leaves_storage_untouched() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save().unwrap();
        let before = stored_raw(&dir).unwrap();

        assert!(matches!(
            store.edit("guest", "   ", "🦊", "#fff"),
            Err(StoreError::EmptyName)
        ));
        assert_eq!(stored_raw(&dir).unwrap(), before);
    }

    #[test]
    fn test_edit_changes_only_mutable_fields() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.edit("guest", "Visitor", "👻", "#abcdef").unwrap();

        let reloaded = store_in(&dir);
        let guest = reloaded.get("guest").unwrap();
        assert_eq!(guest.name, "Visitor");
        assert_eq!(guest.avatar, "👻");
        assert_eq!(guest.color, "#abcdef");
        assert!(!guest.is_admin);
    }

    #[test]
    fn test_protected_delete() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        assert!(matches!(store.delete("kul"), Err(StoreError::Protected)));
        assert_eq!(store.profiles().len(), 4);
    }

    #[test]
    fn test_delete_guest() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.delete("guest").unwrap();

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.profiles().len(), 3);
        assert!(reloaded.get("guest").is_none());
        assert!(reloaded.profiles().last().unwrap().is_add);
    }

    #[test]
    fn test_sentinel_is_not_editable_or_deletable() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        assert!(matches!(
            store.delete("add"),
            Err(StoreError::SentinelTile(_))
        ));
        assert!(matches!(
            store.edit("add", "Plus", "+", "#888"),
            Err(StoreError::SentinelTile(_))
        ));
    }

    #[test]
    fn test_unknown_id_is_a_defined_error() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        assert!(matches!(
            store.delete("nobody"),
            Err(StoreError::UnknownProfile(_))
        ));
        assert!(matches!(
            store.selection_intent("nobody"),
            Err(StoreError::UnknownProfile(_))
        ));
    }

    #[test]
    fn test_selection_intent() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        assert_eq!(
            store.selection_intent("add").unwrap(),
            SelectionIntent::EnterCreateFlow
        );
        match store.selection_intent("guest").unwrap() {
            SelectionIntent::Activate(id) => {
                store.activate(&id).unwrap();
                assert_eq!(store.active(), Some("guest"));
            }
            other => panic!("expected Activate, got {:?}", other),
        }
    }

    #[test]
    fn test_save_then_load_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.create("Teen", "🎧", "#123456").unwrap();
        let saved = store.profiles().to_vec();

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.profiles(), saved.as_slice());
    }

    #[test]
    fn test_corrupt_list_propagates() {
        let dir = TempDir::new().unwrap();
        let mut backend = LocalStore::open_in(dir.path()).unwrap();
        backend.set(PROFILES_KEY, "][ definitely not json").unwrap();

        let backend = LocalStore::open_in(dir.path()).unwrap();
        assert!(matches!(
            ProfileStore::open(backend),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_corrupt_list_fallback_keeps_defaults_unpersisted() {
        let dir = TempDir::new().unwrap();
        let mut backend = LocalStore::open_in(dir.path()).unwrap();
        backend.set(PROFILES_KEY, "{\"oops\": true}").unwrap();

        let backend = LocalStore::open_in(dir.path()).unwrap();
        let (store, warning) = ProfileStore::open_or_default(backend);
        assert!(warning.is_some());
        assert_eq!(store.profiles().len(), 4);
        // The corrupt payload is still on disk until the next mutation
        assert_eq!(stored_raw(&dir).unwrap(), "{\"oops\": true}");
    }

    #[test]
    fn test_wire_format_omits_false_flags() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.save().unwrap();

        let raw = stored_raw(&dir).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let guest = &value.as_array().unwrap()[1];
        assert_eq!(guest["id"], "guest");
        assert!(guest.get("isAdmin").is_none());
        assert!(guest.get("isAdd").is_none());
        assert_eq!(value.as_array().unwrap()[0]["isAdmin"], true);
    }

    #[test]
    fn test_reset_clears_both_keys() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.create("Teen", "", "#123456").unwrap();
        store.activate("teen").unwrap();
        store.reset().unwrap();

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.profiles().len(), 4);
        assert_eq!(reloaded.active(), None);
        // Reset removes the file contents entirely, not just the list
        let raw = fs::read_to_string(reloaded.backend.path()).unwrap();
        assert!(!raw.contains(PROFILES_KEY));
    }
}
