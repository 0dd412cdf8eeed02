//! Borrowed view of everything a core operation may touch.
use crate::data::Catalog;
use crate::dice::Randomness;
use crate::error::GameError;
use crate::persistence::PersistenceGateway;
use crate::presentation::{Presenter, Severity};
use crate::rules::RulesConfig;
use crate::state::PlayerState;

/// Collaborators threaded through navigation, combat and item handling.
pub struct EngineContext<'a> {
    pub catalog: &'a Catalog,
    pub rules: &'a RulesConfig,
    pub state: &'a mut PlayerState,
    pub dice: &'a mut dyn Randomness,
    pub presenter: &'a mut dyn Presenter,
    pub persistence: &'a dyn PersistenceGateway,
}

impl EngineContext<'_> {
    pub fn notify(&mut self, text: &str, severity: Severity) {
        self.presenter
            .show_message(text, severity, self.rules.message_duration_ms);
    }

    /// Log a refused operation, tell the player, and hand the error back.
    pub fn reject(&mut self, err: GameError) -> GameError {
        if err.is_catalog_miss() || matches!(err, GameError::UnregisteredAction(_)) {
            log::error!("{err}");
        } else {
            log::warn!("rejected: {err}");
        }
        self.notify(&err.user_message(), Severity::Warning);
        err
    }

    /// Best-effort save point.
    pub fn persist(&mut self) -> bool {
        let saved = self.persistence.save(self.state);
        if !saved {
            self.notify(
                "La sauvegarde a échoué, la partie continue en mémoire.",
                Severity::Error,
            );
        }
        saved
    }
}
