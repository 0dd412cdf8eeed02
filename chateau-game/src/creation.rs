//! Character creation: each stat and the fortune are rolled exactly once.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::dice::Randomness;
use crate::error::GameError;
use crate::rules::RulesConfig;
use crate::state::{Character, PlayerState, StatKind, Stats};

/// Rolls recorded so far for one character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CharacterSheet {
    rolled: BTreeMap<StatKind, i32>,
    money: Option<i32>,
}

impl CharacterSheet {
    #[must_use]
    pub fn stat(&self, kind: StatKind) -> Option<i32> {
        self.rolled.get(&kind).copied()
    }

    #[must_use]
    pub const fn money(&self) -> Option<i32> {
        self.money
    }

    #[must_use]
    pub fn missing_stats(&self) -> usize {
        StatKind::ALL
            .iter()
            .filter(|kind| !self.rolled.contains_key(kind))
            .count()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_stats() == 0 && self.money.is_some()
    }
}

/// Gate keyed by (character, stat) so duplicate clicks never re-roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CreationGate {
    sheets: BTreeMap<Character, CharacterSheet>,
}

impl CreationGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sheet(&self, character: Character) -> Option<&CharacterSheet> {
        self.sheets.get(&character)
    }

    /// Roll one die for `stat`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::StatAlreadyRolled`] and leaves the sheet untouched
    /// when the stat already has a value.
    pub fn roll_stat(
        &mut self,
        character: Character,
        stat: StatKind,
        dice: &mut dyn Randomness,
    ) -> Result<i32, GameError> {
        let sheet = self.sheets.entry(character).or_default();
        if sheet.rolled.contains_key(&stat) {
            log::warn!("ignored duplicate {stat} roll for {character}");
            return Err(GameError::StatAlreadyRolled { character, stat });
        }
        let value = i32::from(dice.roll_die());
        sheet.rolled.insert(stat, value);
        log::debug!("{character} rolled {stat} = {value}");
        Ok(value)
    }

    /// Roll the starting fortune once every stat is known.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::StatsIncomplete`] while stats are missing and
    /// [`GameError::FortuneAlreadyRolled`] on a repeated call.
    pub fn roll_fortune_for(
        &mut self,
        character: Character,
        dice: &mut dyn Randomness,
    ) -> Result<i32, GameError> {
        let sheet = self.sheets.entry(character).or_default();
        if sheet.money.is_some() {
            log::warn!("ignored duplicate fortune roll for {character}");
            return Err(GameError::FortuneAlreadyRolled { character });
        }
        let missing = sheet.missing_stats();
        if missing > 0 {
            return Err(GameError::StatsIncomplete { character, missing });
        }
        let money = dice.roll_fortune();
        sheet.money = Some(money);
        log::debug!("{character} rolled a fortune of {money}");
        Ok(money)
    }

    /// Whether the start transition is unlocked for `character`.
    #[must_use]
    pub fn can_start(&self, character: Character) -> bool {
        self.sheets
            .get(&character)
            .is_some_and(CharacterSheet::is_complete)
    }

    /// Build the starting state from a complete sheet.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::StatsIncomplete`] while any roll is missing.
    pub fn finish(&self, character: Character, rules: &RulesConfig) -> Result<PlayerState, GameError> {
        let sheet = self.sheets.get(&character);
        let (Some(sheet), true) = (sheet, self.can_start(character)) else {
            return Err(GameError::StatsIncomplete {
                character,
                missing: sheet.map_or(StatKind::ALL.len(), CharacterSheet::missing_stats),
            });
        };
        let value = |kind| sheet.stat(kind).unwrap_or(0);
        let psi = value(StatKind::Psi);
        let stats = Stats {
            rapidite: value(StatKind::Rapidite),
            courage: value(StatKind::Courage),
            force: value(StatKind::Force),
            habilete: value(StatKind::Habilete),
            psi,
            psi_max: psi,
            health: rules.starting_health,
            max_health: rules.starting_health,
            money: sheet.money.unwrap_or(0),
        };
        Ok(PlayerState::new(character, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::{DiceRoller, ScriptedDice};

    fn roll_all(gate: &mut CreationGate, character: Character, dice: &mut dyn Randomness) {
        for stat in StatKind::ALL {
            gate.roll_stat(character, stat, dice).unwrap();
        }
    }

    #[test]
    fn duplicate_stat_roll_is_rejected_without_change() {
        let mut gate = CreationGate::new();
        let mut dice = ScriptedDice::with_faces(&[4, 6]);
        assert_eq!(
            gate.roll_stat(Character::Jonathan, StatKind::Force, &mut dice),
            Ok(4)
        );
        assert_eq!(
            gate.roll_stat(Character::Jonathan, StatKind::Force, &mut dice),
            Err(GameError::StatAlreadyRolled {
                character: Character::Jonathan,
                stat: StatKind::Force,
            })
        );
        assert_eq!(
            gate.sheet(Character::Jonathan)
                .and_then(|s| s.stat(StatKind::Force)),
            Some(4)
        );
        assert_eq!(dice.remaining_faces(), 1);
    }

    #[test]
    fn fortune_requires_every_stat() {
        let mut gate = CreationGate::new();
        let mut dice = DiceRoller::seeded(11);
        gate.roll_stat(Character::Dracula, StatKind::Force, &mut dice)
            .unwrap();
        assert_eq!(
            gate.roll_fortune_for(Character::Dracula, &mut dice),
            Err(GameError::StatsIncomplete {
                character: Character::Dracula,
                missing: 4,
            })
        );
        assert!(!gate.can_start(Character::Dracula));
    }

    #[test]
    fn fortune_is_rolled_once_and_in_range() {
        let mut gate = CreationGate::new();
        let mut dice = DiceRoller::seeded(99);
        roll_all(&mut gate, Character::Jonathan, &mut dice);
        let money = gate
            .roll_fortune_for(Character::Jonathan, &mut dice)
            .unwrap();
        assert!((8..=48).contains(&money));
        assert_eq!(
            gate.roll_fortune_for(Character::Jonathan, &mut dice),
            Err(GameError::FortuneAlreadyRolled {
                character: Character::Jonathan
            })
        );
        assert_eq!(
            gate.sheet(Character::Jonathan).and_then(CharacterSheet::money),
            Some(money)
        );
        assert!(gate.can_start(Character::Jonathan));
        assert!(!gate.can_start(Character::Dracula));
    }

    #[test]
    fn finish_builds_a_full_health_state() {
        let mut gate = CreationGate::new();
        let mut dice = ScriptedDice::with_faces(&[3, 5, 4, 2, 6, 6, 6]);
        roll_all(&mut gate, Character::Dracula, &mut dice);
        assert!(gate.finish(Character::Dracula, &RulesConfig::default()).is_err());
        assert_eq!(gate.roll_fortune_for(Character::Dracula, &mut dice), Ok(48));

        let state = gate
            .finish(Character::Dracula, &RulesConfig::default())
            .unwrap();
        assert_eq!(state.stats.rapidite, 3);
        assert_eq!(state.stats.psi, 6);
        assert_eq!(state.stats.psi_max, 6);
        assert_eq!(state.stats.health, 100);
        assert_eq!(state.stats.max_health, 100);
        assert_eq!(state.stats.money, 48);
        assert!(!state.is_placed());
    }
}
