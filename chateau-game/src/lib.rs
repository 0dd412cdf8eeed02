//! Château de Dracula Game Engine
//!
//! Platform-agnostic game-state engine for the Château de Dracula text adventure:
//! content catalog, player state, dice, navigation, timed effects and combat.
//! Rendering and storage are reached only through the [`Presenter`] and
//! [`GameStorage`] traits.

pub mod combat;
pub mod context;
pub mod creation;
pub mod data;
pub mod dice;
pub mod effects;
pub mod error;
pub mod items;
pub mod loader;
pub mod navigation;
pub mod persistence;
pub mod powers;
pub mod presentation;
pub mod rules;
pub mod session;
pub mod state;

use std::sync::Arc;

// Re-export commonly used types
pub use combat::{CombatOutcome, CombatPower, Exchange, Strike};
pub use context::EngineContext;
pub use creation::{CharacterSheet, CreationGate};
pub use data::{
    Action, ActionName, Catalog, Choice, EnemyKind, EnemyTemplate, ItemDef, ItemKind, Location,
    Narrative,
};
pub use dice::{DiceRoller, Randomness, ScriptedDice, TwoDice};
pub use effects::{ActiveEffect, EffectKind, EffectLedger, Polarity};
pub use error::GameError;
pub use items::ItemUse;
pub use loader::{EmbeddedData, LoadError};
pub use navigation::{Arrival, ChoiceOutcome, SearchOutcome};
pub use persistence::{Discard, MemoryStorage, PersistenceGateway, SaveSlot};
pub use powers::{Creature, ExplorationPower, PowerOutcome};
pub use presentation::{ChoiceView, CombatFrame, Presenter, RecordingPresenter, Severity};
pub use rules::{RulesConfig, RulesConfigError};
pub use session::GameSession;
pub use state::{
    Character, CombatPhase, CombatState, EnemyInstance, Inventory, InventoryItem, PlayerState,
    StatKind, Stats,
};

/// Trait for abstracting data loading operations
/// Platform-specific implementations should provide this
pub trait DataLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the content catalog from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be loaded.
    fn load_catalog(&self) -> Result<Catalog, Self::Error>;

    /// Load configuration data for a specific system
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be loaded or parsed.
    fn load_config<T>(&self, config_name: &str) -> Result<T, Self::Error>
    where
        T: serde::de::DeserializeOwned;
}

/// Trait for abstracting save/load operations
/// Platform-specific implementations should provide this
pub trait GameStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save player state
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be saved.
    fn save_game(&self, save_name: &str, game_state: &PlayerState) -> Result<(), Self::Error>;

    /// Load player state
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded.
    fn load_game(&self, save_name: &str) -> Result<Option<PlayerState>, Self::Error>;

    /// Delete saved game
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    fn delete_save(&self, save_name: &str) -> Result<(), Self::Error>;
}

/// Main game engine for managing game instances
pub struct GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    data_loader: L,
    storage: S,
}

impl<L, S> GameEngine<L, S>
where
    L: DataLoader,
    S: GameStorage,
{
    /// Create a new game engine with the provided data loader and storage
    pub const fn new(data_loader: L, storage: S) -> Self {
        Self {
            data_loader,
            storage,
        }
    }

    /// Load the catalog and the rule set.
    ///
    /// # Errors
    ///
    /// Returns an error if either cannot be loaded.
    pub fn load_content(&self) -> Result<(Catalog, RulesConfig), L::Error> {
        let catalog = self.data_loader.load_catalog()?;
        let rules: RulesConfig = self.data_loader.load_config("rules")?;
        if let Err(err) = rules.validate() {
            log::warn!("rule set is inconsistent: {err}");
        }
        Ok((catalog, rules))
    }

    /// Build the starting state for a character whose creation rolls are done.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules cannot be loaded or the rolls are incomplete.
    pub fn create_game(
        &self,
        gate: &CreationGate,
        character: Character,
    ) -> Result<PlayerState, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
    {
        let rules: RulesConfig = self
            .data_loader
            .load_config("rules")
            .map_err(Into::<anyhow::Error>::into)?;
        Ok(gate.finish(character, &rules)?)
    }

    /// Construct a session for a freshly created character, autosaving to `save_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if content cannot be loaded or the rolls are incomplete.
    pub fn create_session<P: Presenter>(
        &self,
        gate: &CreationGate,
        character: Character,
        seed: u64,
        presenter: P,
        save_name: &str,
    ) -> Result<GameSession<P>, anyhow::Error>
    where
        S: Clone + 'static,
        L::Error: Into<anyhow::Error>,
    {
        let (catalog, rules) = self
            .load_content()
            .map_err(Into::<anyhow::Error>::into)?;
        let state = gate.finish(character, &rules)?;
        log::info!("new {character} session in slot '{save_name}' (seed {seed})");
        Ok(GameSession::new(
            Arc::new(catalog),
            rules,
            state,
            DiceRoller::seeded(seed),
            presenter,
            Box::new(SaveSlot::new(self.storage.clone(), save_name)),
        ))
    }

    /// Resume the session stored in `save_name`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NoCharacter`] when the slot is empty, or an error
    /// if content or the snapshot cannot be loaded.
    pub fn resume_session<P: Presenter>(
        &self,
        save_name: &str,
        seed: u64,
        presenter: P,
    ) -> Result<GameSession<P>, anyhow::Error>
    where
        S: Clone + 'static,
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let state = self.load_game(save_name)?.ok_or(GameError::NoCharacter)?;
        let (catalog, rules) = self
            .load_content()
            .map_err(Into::<anyhow::Error>::into)?;
        Ok(GameSession::new(
            Arc::new(catalog),
            rules,
            state,
            DiceRoller::seeded(seed),
            presenter,
            Box::new(SaveSlot::new(self.storage.clone(), save_name)),
        ))
    }

    /// Save a player state
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be saved.
    pub fn save_game(&self, save_name: &str, game_state: &PlayerState) -> Result<(), S::Error> {
        self.storage.save_game(save_name, game_state)
    }

    /// Load a player state
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be loaded.
    pub fn load_game(&self, save_name: &str) -> Result<Option<PlayerState>, anyhow::Error>
    where
        S::Error: Into<anyhow::Error>,
    {
        let Some(mut game_state) = self
            .storage
            .load_game(save_name)
            .map_err(Into::<anyhow::Error>::into)?
        else {
            return Ok(None);
        };
        for problem in game_state.rehydrate() {
            log::warn!("slot '{save_name}': {problem}");
        }
        Ok(Some(game_state))
    }

    /// Delete a saved game
    ///
    /// # Errors
    ///
    /// Returns an error if the save cannot be deleted.
    pub fn delete_game(&self, save_name: &str) -> Result<(), S::Error> {
        self.storage.delete_save(save_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::ScriptedDice;
    use serde::de::DeserializeOwned;
    use std::convert::Infallible;

    #[derive(Clone, Copy, Default)]
    struct FixtureLoader;

    impl DataLoader for FixtureLoader {
        type Error = Infallible;

        fn load_catalog(&self) -> Result<Catalog, Self::Error> {
            Ok(Catalog::load_from_static())
        }

        fn load_config<T>(&self, _config_name: &str) -> Result<T, Self::Error>
        where
            T: DeserializeOwned,
        {
            let parsed = serde_json::from_str("{}").unwrap();
            Ok(parsed)
        }
    }

    fn finished_gate(character: Character) -> CreationGate {
        let mut gate = CreationGate::new();
        let mut dice = ScriptedDice::with_faces(&[4, 4, 5, 3, 2, 6, 6]);
        for stat in StatKind::ALL {
            gate.roll_stat(character, stat, &mut dice).unwrap();
        }
        gate.roll_fortune_for(character, &mut dice).unwrap();
        gate
    }

    #[test]
    fn engine_creates_and_roundtrips_state() {
        let engine = GameEngine::new(FixtureLoader, MemoryStorage::new());
        let mut state = engine
            .create_game(&finished_gate(Character::Dracula), Character::Dracula)
            .unwrap();
        state.stats.money = 250;
        state.move_to("crypte-dracula");
        engine.save_game("slot-one", &state).unwrap();

        let loaded = engine.load_game("slot-one").unwrap().expect("save exists");
        assert_eq!(loaded, state);
        assert!(engine.load_game("missing-slot").unwrap().is_none());
        engine.delete_game("slot-one").unwrap();
        assert!(engine.load_game("slot-one").unwrap().is_none());
    }

    #[test]
    fn incomplete_creation_is_refused() {
        let engine = GameEngine::new(FixtureLoader, MemoryStorage::new());
        let err = engine
            .create_game(&CreationGate::new(), Character::Jonathan)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GameError>(),
            Some(GameError::StatsIncomplete { missing: 5, .. })
        ));
    }

    #[test]
    fn sessions_autosave_into_the_named_slot() {
        let storage = MemoryStorage::new();
        let engine = GameEngine::new(EmbeddedData, storage.clone());
        let mut session = engine
            .create_session(
                &finished_gate(Character::Jonathan),
                Character::Jonathan,
                7,
                RecordingPresenter::new(),
                "autosave",
            )
            .unwrap();
        session.begin().unwrap();
        assert_eq!(session.state().stats.health, 100);

        let resumed = engine
            .resume_session("autosave", 7, RecordingPresenter::new())
            .unwrap();
        assert_eq!(resumed.state(), session.state());
        assert!(
            engine
                .resume_session("empty", 7, RecordingPresenter::new())
                .is_err()
        );
    }

    #[test]
    fn load_game_repairs_stray_enemy() {
        let storage = MemoryStorage::new();
        let engine = GameEngine::new(FixtureLoader, storage.clone());
        let mut state = engine
            .create_game(&finished_gate(Character::Jonathan), Character::Jonathan)
            .unwrap();
        let catalog = Catalog::load_from_static();
        state.combat.enemy = catalog.enemy("loup").ok().map(EnemyTemplate::instantiate);
        engine.save_game("broken", &state).unwrap();

        let loaded = engine.load_game("broken").unwrap().unwrap();
        assert!(loaded.combat.enemy.is_none());
        assert!(loaded.invariant_violations().is_empty());
    }

    #[test]
    fn load_game_ends_a_fight_that_lost_its_enemy() {
        let storage = MemoryStorage::new();
        let engine = GameEngine::new(FixtureLoader, storage.clone());
        let mut state = engine
            .create_game(&finished_gate(Character::Jonathan), Character::Jonathan)
            .unwrap();
        state.move_to("allee");
        let mut snapshot = serde_json::to_value(&state).unwrap();
        snapshot["combat"] = serde_json::json!({ "inCombat": true });
        storage.put_raw("broken", &snapshot.to_string());

        let loaded = engine.load_game("broken").unwrap().unwrap();
        assert!(!loaded.combat.in_combat);
        assert_eq!(loaded.combat.phase, CombatPhase::Idle);
        assert!(loaded.invariant_violations().is_empty());
    }
}
