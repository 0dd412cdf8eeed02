//! Tunable rule numbers for exploration, combat and PSI powers.
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) const DEFAULT_RULES_DATA: &str = include_str!("../assets/data/rules.json");

/// Rule set consulted by navigation and combat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RulesConfig {
    #[serde(default = "RulesConfig::default_starting_health")]
    pub starting_health: i32,
    #[serde(default = "RulesConfig::default_critical_roll")]
    pub critical_roll: u8,
    #[serde(default = "RulesConfig::default_high_roll")]
    pub high_roll: u8,
    #[serde(default = "RulesConfig::default_high_roll_bonus")]
    pub high_roll_bonus: i32,
    #[serde(default = "RulesConfig::default_minimum_enemy_damage")]
    pub minimum_enemy_damage: i32,
    #[serde(default = "RulesConfig::default_psi_effect_duration")]
    pub psi_effect_duration: u32,
    #[serde(default = "RulesConfig::default_psi_buff_value")]
    pub psi_buff_value: i32,
    #[serde(default = "RulesConfig::default_aura_value")]
    pub aura_value: i32,
    #[serde(default = "RulesConfig::default_instakill_rolls")]
    pub instakill_rolls: Vec<u8>,
    #[serde(default = "RulesConfig::default_summon_damage_min")]
    pub summon_damage_min: i32,
    #[serde(default = "RulesConfig::default_summon_damage_max")]
    pub summon_damage_max: i32,
    #[serde(default = "RulesConfig::default_life_steal")]
    pub life_steal: i32,
    #[serde(default = "RulesConfig::default_search")]
    pub search: SearchRules,
    #[serde(default = "RulesConfig::default_daylight")]
    pub daylight: DaylightRules,
    #[serde(default = "RulesConfig::default_companion_duration")]
    pub companion_duration: u32,
    #[serde(default = "RulesConfig::default_companion_bonus")]
    pub companion_bonus: i32,
    #[serde(default = "RulesConfig::default_message_duration_ms")]
    pub message_duration_ms: u32,
    #[serde(default = "RulesConfig::default_defeat_message_duration_ms")]
    pub defeat_message_duration_ms: u32,
}

/// Secret-passage discovery odds: `min(cap, base + step * habilete)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRules {
    pub base: f64,
    pub step: f64,
    pub cap: f64,
}

impl SearchRules {
    #[must_use]
    pub fn chance(&self, habilete: i32) -> f64 {
        (self.base + self.step * f64::from(habilete)).min(self.cap)
    }
}

/// Daylight exposure for the vampire. One game turn covers `hours_per_turn` hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaylightRules {
    pub hours_per_turn: u32,
    pub dawn: u32,
    pub dusk: u32,
    pub damage: i32,
}

impl DaylightRules {
    #[must_use]
    pub const fn hour_of_day(&self, game_time: u32) -> u32 {
        (game_time.wrapping_mul(self.hours_per_turn)) % 24
    }

    #[must_use]
    pub const fn is_daytime(&self, game_time: u32) -> bool {
        let hour = self.hour_of_day(game_time);
        hour >= self.dawn && hour < self.dusk
    }
}

/// Errors raised when a rule set is internally inconsistent.
#[derive(Debug, Error, PartialEq)]
pub enum RulesConfigError {
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("summon damage range invalid (min {min} > max {max})")]
    SummonRange { min: i32, max: i32 },
    #[error("{field} must be positive")]
    NotPositive { field: &'static str },
    #[error("roll {roll} in {field} is outside 2..=12")]
    RollOutOfRange { field: &'static str, roll: u8 },
}

impl RulesConfig {
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_RULES_DATA).unwrap_or_default()
    }

    #[must_use]
    pub fn default_config() -> Self {
        Self::load_from_static()
    }

    /// Parse a rule set, filling absent fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check the rule set for values that would break the engine's invariants.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<(), RulesConfigError> {
        for (field, value) in [
            ("search.base", self.search.base),
            ("search.step", self.search.step),
            ("search.cap", self.search.cap),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(RulesConfigError::RangeViolation {
                    field,
                    min: 0.0,
                    max: 1.0,
                    value,
                });
            }
        }
        if self.summon_damage_min > self.summon_damage_max {
            return Err(RulesConfigError::SummonRange {
                min: self.summon_damage_min,
                max: self.summon_damage_max,
            });
        }
        if self.psi_effect_duration == 0 {
            return Err(RulesConfigError::NotPositive {
                field: "psi_effect_duration",
            });
        }
        if self.companion_duration == 0 {
            return Err(RulesConfigError::NotPositive {
                field: "companion_duration",
            });
        }
        if self.starting_health <= 0 {
            return Err(RulesConfigError::NotPositive {
                field: "starting_health",
            });
        }
        for (field, roll) in [
            ("critical_roll", self.critical_roll),
            ("high_roll", self.high_roll),
        ]
        .into_iter()
        .chain(self.instakill_rolls.iter().map(|&r| ("instakill_rolls", r)))
        {
            if !(2..=12).contains(&roll) {
                return Err(RulesConfigError::RollOutOfRange { field, roll });
            }
        }
        Ok(())
    }

    const fn default_starting_health() -> i32 {
        100
    }

    const fn default_critical_roll() -> u8 {
        12
    }

    const fn default_high_roll() -> u8 {
        10
    }

    const fn default_high_roll_bonus() -> i32 {
        2
    }

    const fn default_minimum_enemy_damage() -> i32 {
        1
    }

    const fn default_psi_effect_duration() -> u32 {
        3
    }

    const fn default_psi_buff_value() -> i32 {
        5
    }

    const fn default_aura_value() -> i32 {
        3
    }

    fn default_instakill_rolls() -> Vec<u8> {
        vec![6, 12]
    }

    const fn default_summon_damage_min() -> i32 {
        5
    }

    const fn default_summon_damage_max() -> i32 {
        10
    }

    const fn default_life_steal() -> i32 {
        10
    }

    const fn default_search() -> SearchRules {
        SearchRules {
            base: 0.3,
            step: 0.1,
            cap: 0.9,
        }
    }

    const fn default_daylight() -> DaylightRules {
        DaylightRules {
            hours_per_turn: 4,
            dawn: 6,
            dusk: 18,
            damage: 2,
        }
    }

    const fn default_companion_duration() -> u32 {
        5
    }

    const fn default_companion_bonus() -> i32 {
        2
    }

    const fn default_message_duration_ms() -> u32 {
        3_000
    }

    const fn default_defeat_message_duration_ms() -> u32 {
        5_000
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            starting_health: Self::default_starting_health(),
            critical_roll: Self::default_critical_roll(),
            high_roll: Self::default_high_roll(),
            high_roll_bonus: Self::default_high_roll_bonus(),
            minimum_enemy_damage: Self::default_minimum_enemy_damage(),
            psi_effect_duration: Self::default_psi_effect_duration(),
            psi_buff_value: Self::default_psi_buff_value(),
            aura_value: Self::default_aura_value(),
            instakill_rolls: Self::default_instakill_rolls(),
            summon_damage_min: Self::default_summon_damage_min(),
            summon_damage_max: Self::default_summon_damage_max(),
            life_steal: Self::default_life_steal(),
            search: Self::default_search(),
            daylight: Self::default_daylight(),
            companion_duration: Self::default_companion_duration(),
            companion_bonus: Self::default_companion_bonus(),
            message_duration_ms: Self::default_message_duration_ms(),
            defeat_message_duration_ms: Self::default_defeat_message_duration_ms(),
        }
    }
}
