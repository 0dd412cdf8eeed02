use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::data::{Catalog, EnemyKind, ItemDef, ItemKind, SpecialEffect};
use crate::effects::EffectLedger;
use crate::error::GameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Character {
    Jonathan,
    Dracula,
}

impl Character {
    pub const ALL: [Self; 2] = [Self::Jonathan, Self::Dracula];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jonathan => "jonathan",
            Self::Dracula => "dracula",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Jonathan => "Jonathan Harker",
            Self::Dracula => "Dracula",
        }
    }

    /// Start location used when the catalog does not declare a valid one.
    #[must_use]
    pub const fn canonical_start(self) -> &'static str {
        match self {
            Self::Jonathan => "allee",
            Self::Dracula => "crypte-dracula",
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Character {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jonathan" => Ok(Self::Jonathan),
            "dracula" => Ok(Self::Dracula),
            _ => Err(()),
        }
    }
}

/// The five rolled attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatKind {
    Rapidite,
    Courage,
    Force,
    Habilete,
    Psi,
}

impl StatKind {
    pub const ALL: [Self; 5] = [
        Self::Rapidite,
        Self::Courage,
        Self::Force,
        Self::Habilete,
        Self::Psi,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rapidite => "rapidite",
            Self::Courage => "courage",
            Self::Force => "force",
            Self::Habilete => "habilete",
            Self::Psi => "psi",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Rapidite => "Rapidité",
            Self::Courage => "Courage",
            Self::Force => "Force",
            Self::Habilete => "Habileté",
            Self::Psi => "PSI",
        }
    }
}

impl fmt::Display for StatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rapidite" => Ok(Self::Rapidite),
            "courage" => Ok(Self::Courage),
            "force" => Ok(Self::Force),
            "habilete" => Ok(Self::Habilete),
            "psi" => Ok(Self::Psi),
            _ => Err(()),
        }
    }
}

/// Player statistics. Every pool is clamped to `0..=max` after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub rapidite: i32,
    pub courage: i32,
    pub force: i32,
    pub habilete: i32,
    pub psi: i32,
    pub psi_max: i32,
    pub health: i32,
    pub max_health: i32,
    pub money: i32,
}

impl Stats {
    pub fn clamp(&mut self) {
        self.rapidite = self.rapidite.max(0);
        self.courage = self.courage.max(0);
        self.force = self.force.max(0);
        self.habilete = self.habilete.max(0);
        self.money = self.money.max(0);
        self.psi_max = self.psi_max.max(0);
        self.psi = self.psi.clamp(0, self.psi_max);
        self.max_health = self.max_health.max(0);
        self.health = self.health.clamp(0, self.max_health);
    }

    #[must_use]
    pub const fn get(&self, kind: StatKind) -> i32 {
        match kind {
            StatKind::Rapidite => self.rapidite,
            StatKind::Courage => self.courage,
            StatKind::Force => self.force,
            StatKind::Habilete => self.habilete,
            StatKind::Psi => self.psi,
        }
    }

    /// Apply a health change and return the amount actually applied.
    pub fn adjust_health(&mut self, delta: i32) -> i32 {
        let before = self.health;
        self.health = self.health.saturating_add(delta);
        self.clamp();
        self.health - before
    }

    /// Apply a PSI change and return the amount actually applied.
    pub fn adjust_psi(&mut self, delta: i32) -> i32 {
        let before = self.psi;
        self.psi = self.psi.saturating_add(delta);
        self.clamp();
        self.psi - before
    }

    /// Deduct `cost` PSI points.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InsufficientPsi`] without deducting anything when
    /// the pool is too small.
    pub fn spend_psi(&mut self, cost: i32) -> Result<(), GameError> {
        if self.psi < cost {
            return Err(GameError::InsufficientPsi {
                needed: cost,
                available: self.psi,
            });
        }
        self.adjust_psi(-cost);
        Ok(())
    }

    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.health > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EnemyStats {
    pub rapidite: i32,
    pub courage: i32,
    pub force: i32,
    pub habilete: i32,
    pub psi: i32,
}

/// Inventory entry: a catalog id or a materialized item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InventoryItem {
    Id(String),
    Item(ItemDef),
}

impl InventoryItem {
    /// Whether `key` names this entry by id or by display name.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Self::Id(id) => id == key,
            Self::Item(item) => item.answers_to(key),
        }
    }

    /// Full definition, looked up in the catalog for id entries.
    #[must_use]
    pub fn resolve<'a>(&'a self, catalog: &'a Catalog) -> Option<&'a ItemDef> {
        match self {
            Self::Id(id) => catalog.item(id),
            Self::Item(item) => Some(item),
        }
    }

    #[must_use]
    pub fn label<'a>(&'a self, catalog: &'a Catalog) -> &'a str {
        match self.resolve(catalog) {
            Some(item) => &item.name,
            None => match self {
                Self::Id(id) => id,
                Self::Item(item) => &item.name,
            },
        }
    }
}

impl From<&str> for InventoryItem {
    fn from(value: &str) -> Self {
        Self::Id(value.to_string())
    }
}

impl From<ItemDef> for InventoryItem {
    fn from(value: ItemDef) -> Self {
        Self::Item(value)
    }
}

/// Ordered inventory; duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Inventory {
    items: Vec<InventoryItem>,
}

impl Inventory {
    pub fn add(&mut self, item: impl Into<InventoryItem>) {
        self.items.push(item.into());
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.items.iter().any(|item| item.matches(key))
    }

    #[must_use]
    pub fn position(&self, key: &str) -> Option<usize> {
        self.items.iter().position(|item| item.matches(key))
    }

    /// Remove every entry answering to `key` and return how many went.
    pub fn remove(&mut self, key: &str) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !item.matches(key));
        before - self.items.len()
    }

    pub fn remove_at(&mut self, index: usize) -> Option<InventoryItem> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    #[must_use]
    pub fn has_weapon(&self, catalog: &Catalog) -> bool {
        self.items.iter().any(|entry| {
            entry
                .resolve(catalog)
                .is_some_and(|item| item.kind == ItemKind::Weapon)
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InventoryItem> {
        self.items.iter()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&InventoryItem> {
        self.items.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a> IntoIterator for &'a Inventory {
    type Item = &'a InventoryItem;
    type IntoIter = std::slice::Iter<'a, InventoryItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Enemy copied out of the catalog for the duration of one fight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyInstance {
    pub id: String,
    pub name: String,
    pub kind: EnemyKind,
    pub health: i32,
    pub max_health: i32,
    pub stats: EnemyStats,
    #[serde(default)]
    pub special_effects: Vec<SpecialEffect>,
    #[serde(default)]
    pub rewards: Vec<InventoryItem>,
}

impl EnemyInstance {
    /// Apply damage, flooring health at zero. Returns the damage dealt.
    pub fn take_damage(&mut self, amount: i32) -> i32 {
        let before = self.health;
        self.health = (self.health - amount.max(0)).max(0);
        before - self.health
    }

    #[must_use]
    pub const fn is_defeated(&self) -> bool {
        self.health <= 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CombatPhase {
    #[default]
    Idle,
    PlayerTurn,
    ResolvingPlayerAction,
    EnemyTurn,
    ResolvingEnemyAction,
    Victory,
    Defeat,
    Fled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Player,
    Enemy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CombatState {
    pub in_combat: bool,
    #[serde(default)]
    pub enemy: Option<EnemyInstance>,
    #[serde(default)]
    pub phase: CombatPhase,
    #[serde(default)]
    pub round: u32,
    #[serde(default)]
    pub log: Vec<String>,
}

impl CombatState {
    /// Whose turn it is, when a fight is running.
    #[must_use]
    pub const fn turn(&self) -> Option<Side> {
        match self.phase {
            CombatPhase::PlayerTurn | CombatPhase::ResolvingPlayerAction => Some(Side::Player),
            CombatPhase::EnemyTurn | CombatPhase::ResolvingEnemyAction => Some(Side::Enemy),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.in_combat = false;
        self.enemy = None;
        self.round = 0;
    }
}

/// Complete record of one player, persisted wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub character: Character,
    pub stats: Stats,
    #[serde(default)]
    pub inventory: Inventory,
    #[serde(default)]
    pub active_effects: EffectLedger,
    #[serde(default)]
    pub current_location: String,
    #[serde(default)]
    pub previous_location: Option<String>,
    #[serde(default)]
    pub visited_locations: Vec<String>,
    #[serde(default)]
    pub current_narrative: Option<String>,
    #[serde(default)]
    pub combat: CombatState,
    #[serde(default)]
    pub game_time: u32,
    #[serde(default)]
    pub defeated_enemies: BTreeSet<String>,
    #[serde(default)]
    pub granted_narratives: BTreeSet<String>,
}

impl PlayerState {
    /// Fresh state that has not entered any location yet.
    #[must_use]
    pub fn new(character: Character, mut stats: Stats) -> Self {
        stats.clamp();
        Self {
            character,
            stats,
            inventory: Inventory::default(),
            active_effects: EffectLedger::default(),
            current_location: String::new(),
            previous_location: None,
            visited_locations: Vec::new(),
            current_narrative: None,
            combat: CombatState::default(),
            game_time: 0,
            defeated_enemies: BTreeSet::new(),
            granted_narratives: BTreeSet::new(),
        }
    }

    /// Record a move. Returns `true` when the location is visited for the first time.
    pub fn move_to(&mut self, location_id: &str) -> bool {
        let previous = std::mem::replace(&mut self.current_location, location_id.to_string());
        self.previous_location = (!previous.is_empty()).then_some(previous);
        self.current_narrative = None;
        if self.visited_locations.iter().any(|v| v == location_id) {
            false
        } else {
            self.visited_locations.push(location_id.to_string());
            true
        }
    }

    #[must_use]
    pub fn has_visited(&self, location_id: &str) -> bool {
        self.visited_locations.iter().any(|v| v == location_id)
    }

    #[must_use]
    pub const fn is_placed(&self) -> bool {
        !self.current_location.is_empty()
    }

    /// Describe every broken invariant; empty when the state is consistent.
    #[must_use]
    pub fn invariant_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let stats = &self.stats;
        if stats.health < 0 || stats.health > stats.max_health {
            problems.push(format!(
                "health {} outside 0..={}",
                stats.health, stats.max_health
            ));
        }
        if stats.psi < 0 || stats.psi > stats.psi_max {
            problems.push(format!("psi {} outside 0..={}", stats.psi, stats.psi_max));
        }
        for kind in StatKind::ALL {
            if stats.get(kind) < 0 {
                problems.push(format!("{kind} is negative"));
            }
        }
        if stats.money < 0 {
            problems.push("money is negative".to_string());
        }
        for (key, effect) in self.active_effects.iter() {
            if effect.duration == 0 {
                problems.push(format!("effect '{key}' survived with zero duration"));
            }
        }
        if !self.combat.in_combat && self.combat.enemy.is_some() {
            problems.push("enemy present outside combat".to_string());
        }
        if self.combat.in_combat && self.combat.enemy.is_none() {
            problems.push("combat without an enemy".to_string());
        }
        if self.combat.in_combat && self.combat.phase != CombatPhase::PlayerTurn {
            problems.push(format!("combat stored in phase {:?}", self.combat.phase));
        }
        let unique: BTreeSet<&String> = self.visited_locations.iter().collect();
        if unique.len() != self.visited_locations.len() {
            problems.push("visited locations contain duplicates".to_string());
        }
        problems
    }

    /// Bring a loaded snapshot back to a playable shape.
    ///
    /// Stats are clamped. Combat is dropped when it has no enemy, and a fight
    /// stored mid-resolution resumes on the player's turn. Returns the
    /// problems found before the repair.
    pub fn rehydrate(&mut self) -> Vec<String> {
        let problems = self.invariant_violations();
        self.stats.clamp();
        let combat = &mut self.combat;
        if !combat.in_combat {
            combat.clear();
        } else if combat.enemy.is_none() {
            combat.clear();
            combat.phase = CombatPhase::Idle;
        } else if combat.phase != CombatPhase::PlayerTurn {
            combat.phase = CombatPhase::PlayerTurn;
            combat.round = combat.round.max(1);
        }
        problems
    }
}
