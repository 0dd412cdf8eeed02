use std::sync::Arc;

use crate::combat::{self, CombatPower, Exchange};
use crate::context::EngineContext;
use crate::data::{Catalog, Choice};
use crate::dice::{DiceRoller, Randomness};
use crate::error::GameError;
use crate::items::{self, ItemUse};
use crate::navigation::{self, Arrival, ChoiceOutcome, SearchOutcome};
use crate::persistence::PersistenceGateway;
use crate::powers::{self, PowerOutcome};
use crate::presentation::{ChoiceView, Presenter};
use crate::rules::RulesConfig;
use crate::state::PlayerState;

/// One player's game: owned state plus the collaborators every action needs.
pub struct GameSession<P, R = DiceRoller> {
    catalog: Arc<Catalog>,
    rules: RulesConfig,
    state: PlayerState,
    dice: R,
    presenter: P,
    persistence: Box<dyn PersistenceGateway>,
}

impl<P: Presenter, R: Randomness> GameSession<P, R> {
    #[must_use]
    pub fn new(
        catalog: Arc<Catalog>,
        rules: RulesConfig,
        state: PlayerState,
        dice: R,
        presenter: P,
        persistence: Box<dyn PersistenceGateway>,
    ) -> Self {
        Self {
            catalog,
            rules,
            state,
            dice,
            presenter,
            persistence,
        }
    }

    /// Resume from the gateway's last snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NoCharacter`] when there is nothing to resume; the
    /// caller should send the player to character creation.
    pub fn resume(
        catalog: Arc<Catalog>,
        rules: RulesConfig,
        dice: R,
        presenter: P,
        persistence: Box<dyn PersistenceGateway>,
    ) -> Result<Self, GameError> {
        let mut state = persistence.load().ok_or(GameError::NoCharacter)?;
        log_repairs(&mut state);
        Ok(Self::new(catalog, rules, state, dice, presenter, persistence))
    }

    fn ctx(&mut self) -> EngineContext<'_> {
        EngineContext {
            catalog: &self.catalog,
            rules: &self.rules,
            state: &mut self.state,
            dice: &mut self.dice,
            presenter: &mut self.presenter,
            persistence: self.persistence.as_ref(),
        }
    }

    /// Place a fresh character at its start location, or redraw the current scene.
    ///
    /// # Errors
    ///
    /// Returns a catalog miss when neither the start location nor the saved
    /// location exists.
    pub fn begin(&mut self) -> Result<Option<Arrival>, GameError> {
        if !self.state.is_placed() {
            let start = self.catalog.start_location(self.state.character);
            log::info!("{} begins at '{start}'", self.state.character);
            return navigation::enter(&mut self.ctx(), &start).map(Some);
        }
        self.refresh()?;
        Ok(None)
    }

    /// Render the current scene again without advancing anything.
    ///
    /// # Errors
    ///
    /// Returns a catalog miss when the state points at an unknown scene.
    pub fn refresh(&mut self) -> Result<(), GameError> {
        let catalog = Arc::clone(&self.catalog);
        let views = self.choices()?;
        match &self.state.current_narrative {
            Some(id) => self.presenter.render_narrative(catalog.narrative(id)?),
            None => self
                .presenter
                .render_location(catalog.location(&self.state.current_location)?),
        }
        self.presenter.render_choices(&views);
        if let Some(frame) = combat::frame(&self.state) {
            self.presenter.render_combat_frame(&frame);
        }
        Ok(())
    }

    /// Choices on screen with their enabled flags.
    ///
    /// # Errors
    ///
    /// Returns a catalog miss when the state points at an unknown scene.
    pub fn choices(&self) -> Result<Vec<ChoiceView>, GameError> {
        let choices = navigation::current_choices(&self.catalog, &self.state)?;
        Ok(navigation::choice_views(&self.state, choices))
    }

    /// # Errors
    ///
    /// See [`navigation::choose`].
    pub fn choose(&mut self, index: usize) -> Result<ChoiceOutcome, GameError> {
        navigation::choose(&mut self.ctx(), index)
    }

    /// # Errors
    ///
    /// See [`navigation::resolve_choice`].
    pub fn resolve_choice(&mut self, choice: &Choice) -> Result<ChoiceOutcome, GameError> {
        navigation::resolve_choice(&mut self.ctx(), choice)
    }

    /// # Errors
    ///
    /// See [`navigation::enter`].
    pub fn enter(&mut self, location_id: &str) -> Result<Arrival, GameError> {
        navigation::enter(&mut self.ctx(), location_id)
    }

    /// # Errors
    ///
    /// See [`navigation::search_secret`].
    pub fn search_secret(&mut self) -> Result<SearchOutcome, GameError> {
        navigation::search_secret(&mut self.ctx())
    }

    /// # Errors
    ///
    /// See [`powers::use_psi_power`].
    pub fn use_psi_power(&mut self, preselected: Option<&str>) -> Result<PowerOutcome, GameError> {
        powers::use_psi_power(&mut self.ctx(), preselected)
    }

    /// # Errors
    ///
    /// See [`items::use_item`].
    pub fn use_item(&mut self, key: &str) -> Result<ItemUse, GameError> {
        items::use_item(&mut self.ctx(), key)
    }

    /// # Errors
    ///
    /// See [`combat::start`].
    pub fn start_combat(&mut self, enemy_id: &str) -> Result<(), GameError> {
        combat::start(&mut self.ctx(), enemy_id)
    }

    /// # Errors
    ///
    /// See [`combat::attack`].
    pub fn attack(&mut self) -> Result<Exchange, GameError> {
        combat::attack(&mut self.ctx())
    }

    /// # Errors
    ///
    /// See [`combat::flee`].
    pub fn flee(&mut self) -> Result<Exchange, GameError> {
        combat::flee(&mut self.ctx())
    }

    /// # Errors
    ///
    /// See [`combat::use_psi_power`].
    pub fn combat_psi_power(&mut self) -> Result<Option<Exchange>, GameError> {
        combat::use_psi_power(&mut self.ctx())
    }

    /// # Errors
    ///
    /// See [`combat::confirm_psi_power`].
    pub fn confirm_combat_power(&mut self, power: CombatPower) -> Result<Exchange, GameError> {
        combat::confirm_psi_power(&mut self.ctx(), power)
    }

    /// Explicit save point. Returns `false` when the gateway failed.
    pub fn save(&mut self) -> bool {
        self.ctx().persist()
    }

    /// Replace the in-memory state with the last snapshot, if there is one.
    pub fn reload(&mut self) -> bool {
        match self.persistence.load() {
            Some(mut state) => {
                log_repairs(&mut state);
                self.state = state;
                true
            }
            None => {
                log::warn!("reload requested but no snapshot is available");
                false
            }
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    #[must_use]
    pub const fn state(&self) -> &PlayerState {
        &self.state
    }

    pub const fn state_mut(&mut self) -> &mut PlayerState {
        &mut self.state
    }

    pub fn with_state_mut<T>(&mut self, f: impl FnOnce(&mut PlayerState) -> T) -> T {
        f(&mut self.state)
    }

    #[must_use]
    pub const fn presenter(&self) -> &P {
        &self.presenter
    }

    pub const fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub const fn dice_mut(&mut self) -> &mut R {
        &mut self.dice
    }

    #[must_use]
    pub fn into_state(self) -> PlayerState {
        self.state
    }
}

fn log_repairs(state: &mut PlayerState) {
    for problem in state.rehydrate() {
        log::warn!("snapshot repaired: {problem}");
    }
}
