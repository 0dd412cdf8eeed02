//! Timed buffs and debuffs.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    #[default]
    Buff,
    Debuff,
}

/// What an entry contributes to combat arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    DamageMod,
    DefenseMod,
    FleeMod,
    Instakill,
    #[default]
    Marker,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub value: Option<i32>,
    pub duration: u32,
    #[serde(rename = "type", default)]
    pub polarity: Polarity,
    #[serde(default)]
    pub kind: EffectKind,
}

impl ActiveEffect {
    #[must_use]
    pub fn buff(name: &str, description: &str, kind: EffectKind, duration: u32) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            value: None,
            duration,
            polarity: Polarity::Buff,
            kind,
        }
    }

    #[must_use]
    pub fn debuff(name: &str, description: &str, kind: EffectKind, duration: u32) -> Self {
        Self {
            polarity: Polarity::Debuff,
            ..Self::buff(name, description, kind, duration)
        }
    }

    #[must_use]
    pub const fn with_value(mut self, value: i32) -> Self {
        self.value = Some(value);
        self
    }
}

/// Keyed set of active effects. An entry never survives with a zero duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct EffectLedger {
    entries: BTreeMap<String, ActiveEffect>,
}

impl EffectLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry under `key`. Same-key effects do not stack.
    ///
    /// Returns `false` when the effect has no duration and was dropped.
    pub fn apply(&mut self, key: &str, effect: ActiveEffect) -> bool {
        if effect.duration == 0 {
            self.entries.remove(key);
            return false;
        }
        self.entries.insert(key.to_string(), effect);
        true
    }

    /// Advance one game-time step and return the keys that expired.
    pub fn tick(&mut self) -> Vec<String> {
        let mut expired = Vec::new();
        self.entries.retain(|key, effect| {
            effect.duration = effect.duration.saturating_sub(1);
            if effect.duration == 0 {
                expired.push(key.clone());
                false
            } else {
                true
            }
        });
        expired
    }

    /// Net value of every entry of `kind`; zero when none is active.
    #[must_use]
    pub fn modifier(&self, kind: EffectKind) -> i32 {
        self.entries
            .values()
            .filter(|effect| effect.kind == kind)
            .map(|effect| {
                let value = effect.value.unwrap_or(0);
                match effect.polarity {
                    Polarity::Buff => value,
                    Polarity::Debuff => -value.abs(),
                }
            })
            .sum()
    }

    #[must_use]
    pub fn has_kind(&self, kind: EffectKind) -> bool {
        self.entries.values().any(|effect| effect.kind == kind)
    }

    #[must_use]
    pub fn is_active(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ActiveEffect> {
        self.entries.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ActiveEffect> {
        self.entries.remove(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ActiveEffect)> {
        self.entries.iter().map(|(key, effect)| (key.as_str(), effect))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
