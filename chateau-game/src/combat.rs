//! Turn-based fight against one enemy instance.
//!
//! Every player action resolves synchronously: the player's move, then the
//! enemy's answer, then the phase returns to [`CombatPhase::PlayerTurn`] or
//! the fight ends. Actions submitted outside the player's turn are refused.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::context::EngineContext;
use crate::data::{EnemyKind, SpecialEffect};
use crate::dice::TwoDice;
use crate::effects::{ActiveEffect, EffectKind};
use crate::error::GameError;
use crate::items;
use crate::presentation::{CombatFrame, Severity};
use crate::rules::RulesConfig;
use crate::state::{Character, CombatPhase, CombatState, EnemyInstance, PlayerState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatOutcome {
    Victory,
    Defeat,
    Fled,
}

impl CombatOutcome {
    #[must_use]
    pub const fn phase(self) -> CombatPhase {
        match self {
            Self::Victory => CombatPhase::Victory,
            Self::Defeat => CombatPhase::Defeat,
            Self::Fled => CombatPhase::Fled,
        }
    }
}

/// One attack roll and what it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strike {
    pub roll: TwoDice,
    pub hit: bool,
    pub damage: i32,
    /// Name of the special effect or instakill that fired, if any.
    pub special: Option<String>,
}

/// Everything resolved by one player action.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Exchange {
    pub player: Option<Strike>,
    pub power: Option<CombatPower>,
    pub enemy: Option<Strike>,
    pub outcome: Option<CombatOutcome>,
}

/// PSI powers usable during a fight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CombatPower {
    Beatification,
    Sanctification,
    Empalement,
    Domination,
    Brume,
    SoifDeSang,
}

impl CombatPower {
    pub const JONATHAN: [Self; 3] = [Self::Beatification, Self::Sanctification, Self::Empalement];
    pub const DRACULA: [Self; 3] = [Self::Domination, Self::Brume, Self::SoifDeSang];

    #[must_use]
    pub const fn menu(character: Character) -> &'static [Self] {
        match character {
            Character::Jonathan => &Self::JONATHAN,
            Character::Dracula => &Self::DRACULA,
        }
    }

    #[must_use]
    pub const fn character(self) -> Character {
        match self {
            Self::Beatification | Self::Sanctification | Self::Empalement => Character::Jonathan,
            Self::Domination | Self::Brume | Self::SoifDeSang => Character::Dracula,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beatification => "beatification",
            Self::Sanctification => "sanctification",
            Self::Empalement => "empalement",
            Self::Domination => "domination",
            Self::Brume => "brume",
            Self::SoifDeSang => "soif-de-sang",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Beatification => "Béatification",
            Self::Sanctification => "Sanctification",
            Self::Empalement => "Empalement",
            Self::Domination => "Domination",
            Self::Brume => "Brume",
            Self::SoifDeSang => "Soif de sang",
        }
    }

    #[must_use]
    pub const fn cost(self) -> i32 {
        match self {
            Self::Empalement | Self::SoifDeSang => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for CombatPower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CombatPower {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beatification" => Ok(Self::Beatification),
            "sanctification" => Ok(Self::Sanctification),
            "empalement" => Ok(Self::Empalement),
            "domination" => Ok(Self::Domination),
            "brume" => Ok(Self::Brume),
            "soif-de-sang" => Ok(Self::SoifDeSang),
            _ => Err(()),
        }
    }
}

/// Player damage before effect modifiers: high-roll bonus first, then the
/// critical doubling.
#[must_use]
pub fn damage_for_roll(force: i32, roll: u8, rules: &RulesConfig) -> i32 {
    let mut damage = force;
    if roll >= rules.high_roll {
        damage += rules.high_roll_bonus;
    }
    if roll == rules.critical_roll {
        damage *= 2;
    }
    damage
}

/// Enemy damage on a hit, special effects excluded.
#[must_use]
pub fn enemy_damage_for_roll(force: i32, roll: u8, defense: i32, rules: &RulesConfig) -> i32 {
    let mut damage = force;
    if roll >= rules.high_roll {
        damage += rules.high_roll_bonus;
    }
    (damage - defense).max(rules.minimum_enemy_damage)
}

/// Snapshot of the running fight, if any.
#[must_use]
pub fn frame(state: &PlayerState) -> Option<CombatFrame> {
    CombatFrame::capture(state)
}

/// Refuse the action unless a fight is waiting on the player.
///
/// # Errors
///
/// Returns [`GameError::NotInCombat`] outside a fight and
/// [`GameError::NotPlayerTurn`] while a previous action is still resolving.
pub fn ensure_player_turn(state: &PlayerState) -> Result<(), GameError> {
    if !state.combat.in_combat || state.combat.enemy.is_none() {
        return Err(GameError::NotInCombat);
    }
    if state.combat.phase != CombatPhase::PlayerTurn {
        return Err(GameError::NotPlayerTurn);
    }
    Ok(())
}

/// Put a fresh copy of `enemy_id` in front of the player without rendering.
///
/// # Errors
///
/// Returns [`GameError::AlreadyInCombat`] during a fight and
/// [`GameError::UnknownEnemy`] when the template is missing.
pub fn begin(ctx: &mut EngineContext<'_>, enemy_id: &str) -> Result<(), GameError> {
    if ctx.state.combat.in_combat {
        return Err(GameError::AlreadyInCombat);
    }
    let enemy = ctx.catalog.enemy(enemy_id)?.instantiate();
    log::info!("combat begins against {} ({})", enemy.name, enemy.id);
    let opening = format!("{} surgit devant vous !", enemy.name);
    ctx.state.combat = CombatState {
        in_combat: true,
        enemy: Some(enemy),
        phase: CombatPhase::PlayerTurn,
        round: 1,
        log: vec![opening],
    };
    Ok(())
}

/// Start a fight and show it.
///
/// # Errors
///
/// Same as [`begin`]; the refusal is reported to the player.
pub fn start(ctx: &mut EngineContext<'_>, enemy_id: &str) -> Result<(), GameError> {
    begin(ctx, enemy_id).map_err(|err| ctx.reject(err))?;
    if let Some(name) = ctx.state.combat.enemy.as_ref().map(|enemy| enemy.name.clone()) {
        ctx.notify(&format!("Combat contre {name} !"), Severity::Warning);
    }
    render(ctx);
    ctx.persist();
    Ok(())
}

/// Roll two dice against the enemy's rapidité.
///
/// # Errors
///
/// Refused outside the player's turn.
pub fn attack(ctx: &mut EngineContext<'_>) -> Result<Exchange, GameError> {
    ensure_player_turn(ctx.state).map_err(|err| ctx.reject(err))?;
    ctx.state.combat.phase = CombatPhase::ResolvingPlayerAction;
    let roll = ctx.dice.roll_two_dice();
    let strike = player_strike(ctx.state, ctx.rules, roll)?;
    ctx.state
        .combat
        .log
        .push(describe_player_strike(&strike, ctx.rules));
    log::debug!(
        "player rolls {} ({}), damage {}",
        roll.total(),
        if strike.hit { "hit" } else { "miss" },
        strike.damage
    );
    let mut exchange = Exchange {
        player: Some(strike),
        ..Exchange::default()
    };
    follow_up(ctx, &mut exchange);
    Ok(exchange)
}

/// Try to escape: two dice plus flee modifiers against the enemy's courage.
///
/// # Errors
///
/// Refused outside the player's turn.
pub fn flee(ctx: &mut EngineContext<'_>) -> Result<Exchange, GameError> {
    ensure_player_turn(ctx.state).map_err(|err| ctx.reject(err))?;
    ctx.state.combat.phase = CombatPhase::ResolvingPlayerAction;
    let roll = ctx.dice.roll_two_dice();
    let bonus = ctx.state.active_effects.modifier(EffectKind::FleeMod);
    let courage = ctx
        .state
        .combat
        .enemy
        .as_ref()
        .map_or(0, |enemy| enemy.stats.courage);
    let score = i32::from(roll.total()) + bonus;
    log::debug!("flee roll {score} against courage {courage}");

    let mut exchange = Exchange::default();
    if score > courage {
        ctx.state
            .combat
            .log
            .push(format!("Vous lancez {score} : vous prenez la fuite !"));
        exchange.outcome = Some(end(ctx, CombatOutcome::Fled));
        return Ok(exchange);
    }
    ctx.state
        .combat
        .log
        .push(format!("Vous lancez {score} : la fuite échoue."));
    exchange.enemy = Some(enemy_turn(ctx));
    exchange.outcome = settle(ctx);
    render(ctx);
    Ok(exchange)
}

/// Open the PSI menu for the current character. A canceled menu changes nothing.
///
/// # Errors
///
/// Refused outside the player's turn or with an empty PSI pool.
pub fn use_psi_power(ctx: &mut EngineContext<'_>) -> Result<Option<Exchange>, GameError> {
    ensure_player_turn(ctx.state).map_err(|err| ctx.reject(err))?;
    if ctx.state.stats.psi <= 0 {
        let err = GameError::InsufficientPsi {
            needed: 1,
            available: ctx.state.stats.psi,
        };
        return Err(ctx.reject(err));
    }
    let menu = CombatPower::menu(ctx.state.character);
    let options: Vec<String> = menu
        .iter()
        .map(|power| format!("{} (coût {})", power.label(), power.cost()))
        .collect();
    let Some(index) = ctx
        .presenter
        .prompt_selection("Quel pouvoir utiliser ?", &options)
    else {
        log::debug!("combat power menu canceled");
        return Ok(None);
    };
    let Some(power) = menu.get(index).copied() else {
        return Ok(None);
    };
    confirm_psi_power(ctx, power).map(Some)
}

/// Pay for and resolve `power`, then let the enemy answer.
///
/// # Errors
///
/// Refused outside the player's turn, for the other character's powers, or
/// when the PSI pool cannot cover the cost. Nothing is charged on refusal.
pub fn confirm_psi_power(
    ctx: &mut EngineContext<'_>,
    power: CombatPower,
) -> Result<Exchange, GameError> {
    ensure_player_turn(ctx.state).map_err(|err| ctx.reject(err))?;
    if power.character() != ctx.state.character {
        let err = GameError::CharacterRequired {
            required: power.character(),
        };
        return Err(ctx.reject(err));
    }
    ctx.state
        .stats
        .spend_psi(power.cost())
        .map_err(|err| ctx.reject(err))?;
    ctx.state.combat.phase = CombatPhase::ResolvingPlayerAction;

    let rules = ctx.rules;
    let entry = match power {
        CombatPower::Beatification => {
            let effect = power_buff(power, "Vos coups sont bénis.", EffectKind::DamageMod, rules)
                .with_value(rules.psi_buff_value);
            ctx.state.active_effects.apply(power.as_str(), effect);
            format!("{} : vos dégâts augmentent.", power.label())
        }
        CombatPower::Sanctification => {
            let effect = power_buff(power, "Une aura sacrée vous protège.", EffectKind::DefenseMod, rules)
                .with_value(rules.psi_buff_value);
            ctx.state.active_effects.apply(power.as_str(), effect);
            format!("{} : une aura vous protège.", power.label())
        }
        CombatPower::Empalement => {
            let effect = power_buff(
                power,
                "Un coup parfait peut détruire un vampire.",
                EffectKind::Instakill,
                rules,
            );
            ctx.state.active_effects.apply(power.as_str(), effect);
            format!("{} : votre pieu cherche le cœur.", power.label())
        }
        CombatPower::Brume => {
            let effect = power_buff(power, "Votre corps devient brume.", EffectKind::DefenseMod, rules)
                .with_value(rules.psi_buff_value);
            ctx.state.active_effects.apply(power.as_str(), effect);
            format!("{} : vous vous dissolvez en brume.", power.label())
        }
        CombatPower::Domination => {
            let damage = ctx
                .dice
                .roll_between(rules.summon_damage_min, rules.summon_damage_max);
            let dealt = damage_enemy(ctx.state, damage);
            format!("{} : les créatures de la nuit infligent {dealt} dégâts.", power.label())
        }
        CombatPower::SoifDeSang => {
            let remaining = ctx
                .state
                .combat
                .enemy
                .as_ref()
                .map_or(0, |enemy| enemy.health);
            let stolen = damage_enemy(ctx.state, rules.life_steal.min(remaining));
            let healed = ctx.state.stats.adjust_health(stolen);
            format!("{} : vous drainez {stolen} PV et en récupérez {healed}.", power.label())
        }
    };
    log::debug!("combat power {power} resolved");
    ctx.state.combat.log.push(entry);

    let mut exchange = Exchange {
        power: Some(power),
        ..Exchange::default()
    };
    follow_up(ctx, &mut exchange);
    Ok(exchange)
}

/// Close the fight with `outcome` and return control to exploration.
pub fn end(ctx: &mut EngineContext<'_>, outcome: CombatOutcome) -> CombatOutcome {
    ctx.state.combat.phase = outcome.phase();
    let enemy = ctx.state.combat.enemy.clone();
    let name = enemy.as_ref().map_or_else(String::new, |enemy| enemy.name.clone());
    let closing = match outcome {
        CombatOutcome::Victory => format!("{name} est vaincu !"),
        CombatOutcome::Defeat => "Vous êtes vaincu...".to_string(),
        CombatOutcome::Fled => format!("Vous échappez à {name}."),
    };
    ctx.state.combat.log.push(closing.clone());
    render(ctx);
    log::info!("combat against {name} ends in {outcome:?}");

    match outcome {
        CombatOutcome::Victory => {
            ctx.notify(&closing, Severity::Success);
            if let Some(enemy) = enemy {
                ctx.state.defeated_enemies.insert(enemy.id.clone());
                grant_loot(ctx, &enemy);
            }
        }
        CombatOutcome::Defeat => {
            let stats = &mut ctx.state.stats;
            stats.health = (stats.max_health + 1) / 2;
            stats.clamp();
            ctx.presenter.show_message(
                "Vous perdez connaissance... puis vous reprenez vos esprits.",
                Severity::Error,
                ctx.rules.defeat_message_duration_ms,
            );
        }
        CombatOutcome::Fled => ctx.notify(&closing, Severity::Info),
    }
    ctx.state.combat.clear();
    ctx.persist();
    outcome
}

fn power_buff(
    power: CombatPower,
    description: &str,
    kind: EffectKind,
    rules: &RulesConfig,
) -> ActiveEffect {
    ActiveEffect::buff(power.label(), description, kind, rules.psi_effect_duration)
}

fn grant_loot(ctx: &mut EngineContext<'_>, enemy: &EnemyInstance) {
    if enemy.rewards.is_empty() {
        return;
    }
    let index = ctx.dice.pick(enemy.rewards.len());
    if let Some(reward) = enemy.rewards.get(index) {
        items::grant(ctx, reward.clone());
    }
}

/// After the player's move: victory, or the enemy answers.
fn follow_up(ctx: &mut EngineContext<'_>, exchange: &mut Exchange) {
    if let Some(outcome) = settle(ctx) {
        exchange.outcome = Some(outcome);
        return;
    }
    exchange.enemy = Some(enemy_turn(ctx));
    exchange.outcome = settle(ctx);
    if exchange.outcome.is_none() {
        render(ctx);
    }
}

/// End the fight when either side is down.
fn settle(ctx: &mut EngineContext<'_>) -> Option<CombatOutcome> {
    let enemy_down = ctx
        .state
        .combat
        .enemy
        .as_ref()
        .is_none_or(EnemyInstance::is_defeated);
    if enemy_down {
        return Some(end(ctx, CombatOutcome::Victory));
    }
    if !ctx.state.stats.is_alive() {
        return Some(end(ctx, CombatOutcome::Defeat));
    }
    None
}

fn player_strike(
    state: &mut PlayerState,
    rules: &RulesConfig,
    roll: TwoDice,
) -> Result<Strike, GameError> {
    let PlayerState {
        stats,
        active_effects,
        combat,
        ..
    } = state;
    let enemy = combat.enemy.as_mut().ok_or(GameError::NotInCombat)?;
    let total = roll.total();
    if i32::from(total) <= enemy.stats.rapidite {
        return Ok(Strike {
            roll,
            hit: false,
            damage: 0,
            special: None,
        });
    }
    let instakill = active_effects.has_kind(EffectKind::Instakill)
        && enemy.kind == EnemyKind::Vampire
        && rules.instakill_rolls.contains(&total);
    if instakill {
        let damage = enemy.take_damage(enemy.health);
        return Ok(Strike {
            roll,
            hit: true,
            damage,
            special: Some("empalement".to_string()),
        });
    }
    let raw = damage_for_roll(stats.force, total, rules)
        + active_effects.modifier(EffectKind::DamageMod);
    let damage = enemy.take_damage(raw.max(0));
    Ok(Strike {
        roll,
        hit: true,
        damage,
        special: None,
    })
}

fn describe_player_strike(strike: &Strike, rules: &RulesConfig) -> String {
    let total = strike.roll.total();
    match (strike.hit, strike.special.as_deref()) {
        (false, _) => format!("Vous lancez {total} : raté."),
        (true, Some(_)) => format!("Vous lancez {total} : coup fatal !"),
        (true, None) if total == rules.critical_roll => {
            format!("Vous lancez {total} : coup critique, {} dégâts !", strike.damage)
        }
        (true, None) => format!("Vous lancez {total} : touché, {} dégâts.", strike.damage),
    }
}

fn damage_enemy(state: &mut PlayerState, amount: i32) -> i32 {
    state
        .combat
        .enemy
        .as_mut()
        .map_or(0, |enemy| enemy.take_damage(amount))
}

/// Enemy answers: two dice against the player's rapidité.
fn enemy_turn(ctx: &mut EngineContext<'_>) -> Strike {
    ctx.state.combat.phase = CombatPhase::EnemyTurn;
    let roll = ctx.dice.roll_two_dice();
    ctx.state.combat.phase = CombatPhase::ResolvingEnemyAction;
    let total = roll.total();

    let state = &mut *ctx.state;
    let Some(enemy) = state.combat.enemy.as_ref() else {
        return Strike {
            roll,
            hit: false,
            damage: 0,
            special: None,
        };
    };
    let name = enemy.name.clone();
    if i32::from(total) <= state.stats.rapidite {
        state
            .combat
            .log
            .push(format!("{name} lance {total} : il vous manque."));
        finish_enemy_turn(state);
        return Strike {
            roll,
            hit: false,
            damage: 0,
            special: None,
        };
    }

    let defense = state.active_effects.modifier(EffectKind::DefenseMod);
    let mut damage = enemy_damage_for_roll(enemy.stats.force, total, defense, ctx.rules);
    let mut special = None;
    for special_effect in &enemy.special_effects {
        if let SpecialEffect::Roll {
            value,
            effect,
            damage: extra,
        } = special_effect
            && value.contains(&total)
        {
            damage += extra.resolve(state.stats.health, state.stats.max_health);
            special = Some(effect.clone());
        }
    }
    let dealt = -state.stats.adjust_health(-damage);
    let entry = match &special {
        Some(effect) => format!("{name} lance {total} : {effect} ! Vous perdez {dealt} PV."),
        None => format!("{name} lance {total} : vous perdez {dealt} PV."),
    };
    state.combat.log.push(entry);
    log::debug!("enemy rolls {total}, deals {dealt}");
    finish_enemy_turn(state);
    Strike {
        roll,
        hit: true,
        damage: dealt,
        special,
    }
}

fn finish_enemy_turn(state: &mut PlayerState) {
    if state.stats.is_alive() {
        state.combat.phase = CombatPhase::PlayerTurn;
        state.combat.round += 1;
    }
}

fn render(ctx: &mut EngineContext<'_>) {
    if let Some(frame) = frame(ctx.state) {
        ctx.presenter.render_combat_frame(&frame);
    }
}
