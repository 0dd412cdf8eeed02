use thiserror::Error;

use crate::state::{Character, StatKind};

/// Errors raised by engine operations.
///
/// None of these are fatal: every variant is raised before the player state
/// is mutated, so callers can surface the message and keep playing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("unknown location '{0}'")]
    UnknownLocation(String),
    #[error("unknown enemy '{0}'")]
    UnknownEnemy(String),
    #[error("unknown item '{0}'")]
    UnknownItem(String),
    #[error("unknown narrative '{0}'")]
    UnknownNarrative(String),
    #[error("action '{0}' has no registered handler")]
    UnregisteredAction(String),
    #[error("only {required} may do this")]
    CharacterRequired { required: Character },
    #[error("not enough PSI (need {needed}, have {available})")]
    InsufficientPsi { needed: i32, available: i32 },
    #[error("{character} has already rolled {stat}")]
    StatAlreadyRolled { character: Character, stat: StatKind },
    #[error("{character} must roll every stat before the fortune ({missing} left)")]
    StatsIncomplete { character: Character, missing: usize },
    #[error("{character} has already rolled the fortune")]
    FortuneAlreadyRolled { character: Character },
    #[error("no combat in progress")]
    NotInCombat,
    #[error("a combat is already in progress")]
    AlreadyInCombat,
    #[error("it is not the player's turn")]
    NotPlayerTurn,
    #[error("item '{0}' is not in the inventory")]
    ItemNotHeld(String),
    #[error("item '{0}' cannot be used")]
    ItemHasNoUse(String),
    #[error("a weapon is required")]
    NoWeapon,
    #[error("choice '{0}' is not available")]
    ChoiceDisabled(String),
    #[error("choice index {index} is out of range ({available} choices)")]
    NoSuchChoice { index: usize, available: usize },
    #[error("no character has been created")]
    NoCharacter,
}

impl GameError {
    /// Whether the error comes from a missing catalog entry.
    #[must_use]
    pub const fn is_catalog_miss(&self) -> bool {
        matches!(
            self,
            Self::UnknownLocation(_)
                | Self::UnknownEnemy(_)
                | Self::UnknownItem(_)
                | Self::UnknownNarrative(_)
        )
    }

    /// Text shown to the player when the operation is refused.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::UnknownLocation(_) | Self::UnknownNarrative(_) => {
                "Ce lieu n'est pas encore disponible.".to_string()
            }
            Self::UnknownEnemy(_) | Self::UnknownItem(_) => {
                "Cet élément n'est pas encore disponible.".to_string()
            }
            Self::UnregisteredAction(_) => "Cette action n'est pas disponible.".to_string(),
            Self::CharacterRequired { required } => {
                format!("Seul {} peut faire cela.", required.display_name())
            }
            Self::InsufficientPsi { needed, .. } => {
                format!("Vous n'avez pas assez de points PSI ({needed} requis).")
            }
            Self::StatAlreadyRolled { stat, .. } => format!("Le dé {stat} a déjà été lancé."),
            Self::StatsIncomplete { .. } => {
                "Lancez d'abord toutes vos caractéristiques.".to_string()
            }
            Self::FortuneAlreadyRolled { .. } => "La fortune a déjà été lancée.".to_string(),
            Self::NotInCombat => "Aucun combat en cours.".to_string(),
            Self::AlreadyInCombat => "Vous êtes déjà en plein combat !".to_string(),
            Self::NotPlayerTurn => "Ce n'est pas votre tour.".to_string(),
            Self::ItemNotHeld(_) => "Vous ne possédez pas cet objet.".to_string(),
            Self::ItemHasNoUse(_) => "Cet objet ne peut pas être utilisé ainsi.".to_string(),
            Self::NoWeapon => "Vous avez besoin d'une arme pour cela.".to_string(),
            Self::ChoiceDisabled(_) | Self::NoSuchChoice { .. } => {
                "Ce choix n'est pas disponible.".to_string()
            }
            Self::NoCharacter => "Choisissez d'abord un personnage.".to_string(),
        }
    }
}
