//! Best-effort save/load of the player snapshot.
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::GameStorage;
use crate::state::PlayerState;

/// Snapshot persistence as seen by the engine. Failures are reported, never raised.
pub trait PersistenceGateway {
    /// Store the snapshot. Returns `false` when it could not be written.
    fn save(&self, state: &PlayerState) -> bool;

    /// Restore the last snapshot; `None` when there is none or it is unreadable.
    fn load(&self) -> Option<PlayerState>;
}

/// Named slot on a [`GameStorage`] backend.
#[derive(Debug, Clone)]
pub struct SaveSlot<S> {
    storage: S,
    name: String,
}

impl<S: GameStorage> SaveSlot<S> {
    pub fn new(storage: S, name: impl Into<String>) -> Self {
        Self {
            storage,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: GameStorage> PersistenceGateway for SaveSlot<S> {
    fn save(&self, state: &PlayerState) -> bool {
        match self.storage.save_game(&self.name, state) {
            Ok(()) => {
                log::debug!("saved slot '{}' at game time {}", self.name, state.game_time);
                true
            }
            Err(err) => {
                log::error!("could not save slot '{}': {err}", self.name);
                false
            }
        }
    }

    fn load(&self) -> Option<PlayerState> {
        match self.storage.load_game(&self.name) {
            Ok(Some(state)) => {
                log::info!("restored slot '{}'", self.name);
                Some(state)
            }
            Ok(None) => None,
            Err(err) => {
                log::error!("could not load slot '{}': {err}", self.name);
                None
            }
        }
    }
}

/// Gateway that keeps nothing. Every save succeeds and loads find nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl PersistenceGateway for Discard {
    fn save(&self, _state: &PlayerState) -> bool {
        true
    }

    fn load(&self) -> Option<PlayerState> {
        None
    }
}

/// In-memory storage holding serialized JSON, shared between clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    saves: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw JSON stored under `save_name`.
    #[must_use]
    pub fn raw(&self, save_name: &str) -> Option<String> {
        self.saves.borrow().get(save_name).cloned()
    }

    /// Overwrite a slot with arbitrary text.
    pub fn put_raw(&self, save_name: &str, json: &str) {
        self.saves
            .borrow_mut()
            .insert(save_name.to_string(), json.to_string());
    }
}

impl GameStorage for MemoryStorage {
    type Error = serde_json::Error;

    fn save_game(&self, save_name: &str, game_state: &PlayerState) -> Result<(), Self::Error> {
        let json = serde_json::to_string(game_state)?;
        self.saves.borrow_mut().insert(save_name.to_string(), json);
        Ok(())
    }

    fn load_game(&self, save_name: &str) -> Result<Option<PlayerState>, Self::Error> {
        self.saves
            .borrow()
            .get(save_name)
            .map(|json| serde_json::from_str(json))
            .transpose()
    }

    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error> {
        self.saves.borrow_mut().remove(save_name);
        Ok(())
    }
}
