//! Static content catalog: locations, narratives, items, enemies and events.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::GameError;
use crate::state::{Character, EnemyInstance, EnemyStats, InventoryItem, StatKind};

pub(crate) const DEFAULT_CATALOG_DATA: &str = include_str!("../assets/data/catalog.json");

/// Complete game content, keyed the way the JSON document is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub characters: BTreeMap<Character, CharacterDef>,
    pub locations: BTreeMap<String, Location>,
    #[serde(default)]
    pub narratives: BTreeMap<String, Narrative>,
    #[serde(default)]
    pub enemies: BTreeMap<String, EnemyTemplate>,
    #[serde(default)]
    pub items: BTreeMap<String, ItemDef>,
    #[serde(default)]
    pub random_events: Vec<RandomEvent>,
    #[serde(default)]
    pub time_events: Vec<TimeEvent>,
    #[serde(default)]
    pub secret_passages: BTreeMap<String, String>,
    #[serde(default)]
    pub numbered_keys: BTreeMap<u32, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterDef {
    pub name: String,
    pub start_location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(skip)]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub is_exterior: bool,
    #[serde(default)]
    pub encounter_chance: Option<f64>,
    #[serde(default)]
    pub possible_encounters: Vec<String>,
    #[serde(default)]
    pub visit_effects: Vec<VisitEffect>,
}

/// Text-only scene layered over the current location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    #[serde(skip)]
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub item_gained: Option<ItemDef>,
    #[serde(default)]
    pub required_character: Option<Character>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enemy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_character: Option<Character>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_stat: Option<StatRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_text: Option<String>,
}

impl Choice {
    #[must_use]
    pub fn to(text: &str, destination: &str) -> Self {
        Self {
            text: text.to_string(),
            destination: Some(destination.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_action(text: &str, action: Action) -> Self {
        Self {
            text: text.to_string(),
            action: Some(ActionName::Known(action)),
            ..Self::default()
        }
    }

    /// Whether exactly one of destination and action is declared.
    #[must_use]
    pub const fn is_well_formed(&self) -> bool {
        self.destination.is_some() != self.action.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatRequirement {
    pub stat: StatKind,
    pub min_value: i32,
}

/// Actions a choice may trigger instead of moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    SearchSecret,
    UsePsiPower,
    StartCombat,
}

impl Action {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SearchSecret => "searchSecret",
            Self::UsePsiPower => "usePsiPower",
            Self::StartCombat => "startCombat",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "searchSecret" => Ok(Self::SearchSecret),
            "usePsiPower" => Ok(Self::UsePsiPower),
            "startCombat" => Ok(Self::StartCombat),
            _ => Err(()),
        }
    }
}

/// Action name as written in the catalog; names without a handler are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionName {
    Known(Action),
    Unregistered(String),
}

impl From<String> for ActionName {
    fn from(value: String) -> Self {
        value
            .parse::<Action>()
            .map_or(Self::Unregistered(value), Self::Known)
    }
}

impl From<ActionName> for String {
    fn from(value: ActionName) -> Self {
        match value {
            ActionName::Known(action) => action.as_str().to_string(),
            ActionName::Unregistered(name) => name,
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(action) => f.write_str(action.as_str()),
            Self::Unregistered(name) => f.write_str(name),
        }
    }
}

/// Change applied when the player enters a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitEffect {
    #[serde(flatten)]
    pub change: VisitChange,
    #[serde(default)]
    pub condition: Option<VisitCondition>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VisitChange {
    Health {
        value: i32,
    },
    Psi {
        value: i32,
    },
    Item {
        #[serde(rename = "itemId")]
        item_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitCondition {
    Character(Character),
    Item(String),
    Stat(StatRequirement),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Weapon,
    Protection,
    Potion,
    Key,
}

/// Item definition, used both in the catalog and for materialized inventory entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<ItemEffect>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub single_use: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub valid_targets: Vec<EnemyKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
}

impl ItemDef {
    /// Whether `key` names this item by id or by display name.
    #[must_use]
    pub fn answers_to(&self, key: &str) -> bool {
        self.id.as_deref() == Some(key) || self.name == key
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemEffect {
    #[serde(rename = "type")]
    pub kind: ItemEffectKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Magnitude>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub against_type: Option<EnemyKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemEffectKind {
    Health,
    Psi,
    ReduceDamage,
    Repel,
    RepelUndead,
}

/// Numeric amount, or a keyword resolved against the player's pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Magnitude {
    Amount(i32),
    Keyword(MagnitudeKeyword),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MagnitudeKeyword {
    /// Whatever is missing from the maximum.
    Full,
    /// Half of the current value, rounded down.
    Half,
}

impl Magnitude {
    #[must_use]
    pub fn resolve(self, current: i32, max: i32) -> i32 {
        match self {
            Self::Amount(value) => value,
            Self::Keyword(MagnitudeKeyword::Full) => (max - current).max(0),
            Self::Keyword(MagnitudeKeyword::Half) => current.max(0) / 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnemyKind {
    Undead,
    Vampire,
    #[default]
    Beast,
    Human,
}

impl EnemyKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Undead => "undead",
            Self::Vampire => "vampire",
            Self::Beast => "beast",
            Self::Human => "human",
        }
    }
}

impl fmt::Display for EnemyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyTemplate {
    #[serde(skip)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: EnemyKind,
    pub health: i32,
    pub max_health: i32,
    pub stats: EnemyStats,
    #[serde(default)]
    pub special_effects: Vec<SpecialEffect>,
    #[serde(default)]
    pub rewards: Vec<InventoryItem>,
}

impl EnemyTemplate {
    /// Independent copy for one fight; the template itself is never mutated.
    #[must_use]
    pub fn instantiate(&self) -> EnemyInstance {
        EnemyInstance {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
            health: self.health,
            max_health: self.max_health,
            stats: self.stats,
            special_effects: self.special_effects.clone(),
            rewards: self.rewards.clone(),
        }
    }
}

/// Enemy ability. Roll triggers fire on the enemy's attack roll; PSI
/// triggers are descriptive only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "trigger", rename_all = "lowercase")]
pub enum SpecialEffect {
    Roll {
        value: Vec<u8>,
        effect: String,
        damage: Magnitude,
    },
    Psi {
        effect: String,
        #[serde(default)]
        damage: Option<i32>,
        #[serde(default)]
        heal: bool,
        #[serde(default, rename = "skipTurn")]
        skip_turn: bool,
        #[serde(default)]
        condition: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomEvent {
    pub name: String,
    pub description: String,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEvent {
    pub trigger: u32,
    #[serde(flatten)]
    pub effect: TimeEffect,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "kebab-case")]
pub enum TimeEffect {
    SpawnEnemy {
        #[serde(rename = "enemyId")]
        enemy_id: String,
    },
    AddItem {
        #[serde(rename = "itemId")]
        item_id: String,
    },
    ChangeLocation {
        #[serde(rename = "locationId")]
        location_id: String,
    },
}

/// Reference from one catalog entry to another that does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    pub owner: String,
    pub field: &'static str,
    pub target: String,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} '{}'", self.owner, self.field, self.target)
    }
}

impl Catalog {
    /// Parse a catalog document and stamp every entry with its key.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed into a catalog.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut catalog: Self = serde_json::from_str(json)?;
        catalog.assign_ids();
        Ok(catalog)
    }

    /// Load the catalog shipped with the game.
    #[must_use]
    pub fn load_from_static() -> Self {
        Self::from_json(DEFAULT_CATALOG_DATA).unwrap_or_else(|err| {
            log::error!("embedded catalog failed to parse: {err}");
            Self::default()
        })
    }

    fn assign_ids(&mut self) {
        for (id, location) in &mut self.locations {
            location.id.clone_from(id);
        }
        for (id, narrative) in &mut self.narratives {
            narrative.id.clone_from(id);
        }
        for (id, enemy) in &mut self.enemies {
            enemy.id.clone_from(id);
        }
        for (id, item) in &mut self.items {
            item.id = Some(id.clone());
        }
    }

    /// # Errors
    ///
    /// Returns [`GameError::UnknownLocation`] when no location has this id.
    pub fn location(&self, id: &str) -> Result<&Location, GameError> {
        self.locations
            .get(id)
            .ok_or_else(|| GameError::UnknownLocation(id.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`GameError::UnknownNarrative`] when no narrative has this id.
    pub fn narrative(&self, id: &str) -> Result<&Narrative, GameError> {
        self.narratives
            .get(id)
            .ok_or_else(|| GameError::UnknownNarrative(id.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`GameError::UnknownEnemy`] when no enemy has this id.
    pub fn enemy(&self, id: &str) -> Result<&EnemyTemplate, GameError> {
        self.enemies
            .get(id)
            .ok_or_else(|| GameError::UnknownEnemy(id.to_string()))
    }

    #[must_use]
    pub fn item(&self, id: &str) -> Option<&ItemDef> {
        self.items.get(id)
    }

    #[must_use]
    pub fn secret_passage(&self, location_id: &str) -> Option<&str> {
        self.secret_passages.get(location_id).map(String::as_str)
    }

    /// Room opened by the numbered key.
    #[must_use]
    pub fn room_for_key(&self, number: u32) -> Option<&str> {
        self.numbered_keys.get(&number).map(String::as_str)
    }

    /// Whether `id` names a location or a narrative.
    #[must_use]
    pub fn has_destination(&self, id: &str) -> bool {
        self.locations.contains_key(id) || self.narratives.contains_key(id)
    }

    /// Where a new adventure begins for `character`.
    ///
    /// Falls back to the character's canonical start when the declared one is
    /// missing from the location table.
    #[must_use]
    pub fn start_location(&self, character: Character) -> String {
        let fallback = character.canonical_start();
        match self.characters.get(&character) {
            Some(def) if self.locations.contains_key(&def.start_location) => {
                def.start_location.clone()
            }
            Some(def) => {
                log::warn!(
                    "start location '{}' for {character} is not a location, using '{fallback}'",
                    def.start_location
                );
                fallback.to_string()
            }
            None => fallback.to_string(),
        }
    }

    /// Every reference that points at a missing entry.
    #[must_use]
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut problems = Vec::new();
        let mut check = |owner: &str, field: &'static str, target: &str, exists: bool| {
            if !exists {
                problems.push(DanglingReference {
                    owner: owner.to_string(),
                    field,
                    target: target.to_string(),
                });
            }
        };

        let scenes = self
            .locations
            .iter()
            .map(|(id, location)| (id, &location.choices))
            .chain(
                self.narratives
                    .iter()
                    .map(|(id, narrative)| (id, &narrative.choices)),
            );
        for (owner, choices) in scenes {
            for choice in choices {
                if let Some(destination) = &choice.destination {
                    check(
                        owner,
                        "destination",
                        destination,
                        self.has_destination(destination),
                    );
                }
                if let Some(enemy) = &choice.enemy {
                    check(owner, "enemy", enemy, self.enemies.contains_key(enemy));
                }
                if let Some(item) = &choice.required_item {
                    let held_somewhere = self.items.contains_key(item) || self.names_item(item);
                    check(owner, "requiredItem", item, held_somewhere);
                }
            }
        }
        for (owner, location) in &self.locations {
            for enemy in &location.possible_encounters {
                check(owner, "encounter", enemy, self.enemies.contains_key(enemy));
            }
            for effect in &location.visit_effects {
                if let VisitChange::Item { item_id } = &effect.change {
                    check(owner, "visitItem", item_id, self.items.contains_key(item_id));
                }
            }
        }
        for (owner, target) in &self.secret_passages {
            check(owner, "secretPassage", target, self.has_destination(target));
        }
        for (owner, enemy) in &self.enemies {
            for reward in &enemy.rewards {
                if let InventoryItem::Id(id) = reward {
                    check(owner, "reward", id, self.items.contains_key(id));
                }
            }
        }
        for (character, def) in &self.characters {
            check(
                character.as_str(),
                "startLocation",
                &def.start_location,
                self.locations.contains_key(&def.start_location),
            );
        }
        for event in &self.time_events {
            let owner = format!("timeEvent@{}", event.trigger);
            match &event.effect {
                TimeEffect::SpawnEnemy { enemy_id } => {
                    check(&owner, "enemy", enemy_id, self.enemies.contains_key(enemy_id));
                }
                TimeEffect::AddItem { item_id } => {
                    check(&owner, "item", item_id, self.items.contains_key(item_id));
                }
                TimeEffect::ChangeLocation { location_id } => check(
                    &owner,
                    "location",
                    location_id,
                    self.locations.contains_key(location_id),
                ),
            }
        }
        problems
    }

    /// Choices declaring both or neither of destination and action.
    #[must_use]
    pub fn malformed_choices(&self) -> Vec<(String, usize)> {
        let location_choices = self
            .locations
            .iter()
            .map(|(id, location)| (id, &location.choices));
        let narrative_choices = self
            .narratives
            .iter()
            .map(|(id, narrative)| (id, &narrative.choices));
        location_choices
            .chain(narrative_choices)
            .flat_map(|(owner, choices)| {
                choices
                    .iter()
                    .enumerate()
                    .filter(|(_, choice)| !choice.is_well_formed())
                    .map(move |(index, _)| (owner.clone(), index))
            })
            .collect()
    }

    fn names_item(&self, name: &str) -> bool {
        self.items.values().any(|item| item.name == name)
            || self
                .narratives
                .values()
                .filter_map(|narrative| narrative.item_gained.as_ref())
                .any(|item| item.answers_to(name))
    }
}
