//! PSI powers used while exploring.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::context::EngineContext;
use crate::effects::{ActiveEffect, EffectKind};
use crate::error::GameError;
use crate::navigation::{self, Arrival};
use crate::presentation::Severity;
use crate::state::Character;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExplorationPower {
    Beatify,
    Sanctify,
    Vision,
    Teleport,
    BatForm,
    SummonCreatures,
}

impl ExplorationPower {
    pub const JONATHAN: [Self; 3] = [Self::Beatify, Self::Sanctify, Self::Vision];
    pub const DRACULA: [Self; 3] = [Self::Teleport, Self::BatForm, Self::SummonCreatures];

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
            Self::Beatify | Self::Sanctify | Self::Vision => Character::Jonathan,
            Self::Teleport | Self::BatForm | Self::SummonCreatures => Character::Dracula,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beatify => "beatify",
            Self::Sanctify => "sanctify",
            Self::Vision => "vision",
            Self::Teleport => "teleport",
            Self::BatForm => "batForm",
            Self::SummonCreatures => "summonCreatures",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Beatify => "Béatification",
            Self::Sanctify => "Sanctification",
            Self::Vision => "Vision",
            Self::Teleport => "Téléportation",
            Self::BatForm => "Chauve-souris",
            Self::SummonCreatures => "Appel des créatures",
        }
    }

    #[must_use]
    pub const fn cost(self) -> i32 {
        match self {
            Self::SummonCreatures => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for ExplorationPower {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExplorationPower {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beatify" => Ok(Self::Beatify),
            "sanctify" => Ok(Self::Sanctify),
            "vision" => Ok(Self::Vision),
            "teleport" => Ok(Self::Teleport),
            "batForm" => Ok(Self::BatForm),
            "summonCreatures" => Ok(Self::SummonCreatures),
            _ => Err(()),
        }
    }
}

/// Creatures answering Dracula's call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Creature {
    Bats,
    Wolves,
    Rats,
}

impl Creature {
    pub const ALL: [Self; 3] = [Self::Bats, Self::Wolves, Self::Rats];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bats => "Chauves-souris (éclaireuses)",
            Self::Wolves => "Loups (protection)",
            Self::Rats => "Rats (diversion)",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerOutcome {
    /// A prompt was dismissed; nothing was charged.
    Canceled,
    Activated(ExplorationPower),
    Summoned(Creature),
    Teleported(Arrival),
}

/// Teleport targets: the crypt, then every visited location except the current one.
#[must_use]
pub fn teleport_destinations(ctx: &EngineContext<'_>) -> Vec<String> {
    let home = Character::Dracula.canonical_start();
    std::iter::once(home)
        .chain(ctx.state.visited_locations.iter().map(String::as_str))
        .filter(|id| *id != ctx.state.current_location)
        .filter(|id| ctx.catalog.locations.contains_key(*id))
        .fold(Vec::new(), |mut targets: Vec<String>, id| {
            if !targets.iter().any(|t| t == id) {
                targets.push(id.to_string());
            }
            targets
        })
}

/// Use an exploration power, prompting for it unless `preselected` names one.
///
/// PSI is only charged once every prompt has been answered.
///
/// # Errors
///
/// Refused during a fight, with an empty PSI pool, for an unknown power name,
/// for the other character's powers, or when Béatification finds no weapon.
pub fn use_psi_power(
    ctx: &mut EngineContext<'_>,
    preselected: Option<&str>,
) -> Result<PowerOutcome, GameError> {
    if ctx.state.combat.in_combat {
        return Err(ctx.reject(GameError::AlreadyInCombat));
    }
    if ctx.state.stats.psi < 1 {
        let err = GameError::InsufficientPsi {
            needed: 1,
            available: ctx.state.stats.psi,
        };
        return Err(ctx.reject(err));
    }

    let menu = ExplorationPower::menu(ctx.state.character);
    let power = match preselected {
        Some(key) => match key.parse::<ExplorationPower>() {
            Ok(power) => power,
            Err(()) => return Err(ctx.reject(GameError::UnregisteredAction(key.to_string()))),
        },
        None => {
            let options: Vec<String> = menu
                .iter()
                .map(|power| format!("{} (coût {})", power.label(), power.cost()))
                .collect();
            let picked = ctx
                .presenter
                .prompt_selection("Quel pouvoir utiliser ?", &options)
                .and_then(|index| menu.get(index).copied());
            let Some(power) = picked else {
                return Ok(PowerOutcome::Canceled);
            };
            power
        }
    };
    if power.character() != ctx.state.character {
        let err = GameError::CharacterRequired {
            required: power.character(),
        };
        return Err(ctx.reject(err));
    }
    if ctx.state.stats.psi < power.cost() {
        let err = GameError::InsufficientPsi {
            needed: power.cost(),
            available: ctx.state.stats.psi,
        };
        return Err(ctx.reject(err));
    }

    let outcome = match power {
        ExplorationPower::Beatify => {
            if !ctx.state.inventory.has_weapon(ctx.catalog) {
                return Err(ctx.reject(GameError::NoWeapon));
            }
            charge(ctx, power)?;
            let effect = buff(ctx, power, "Votre arme est bénie.", EffectKind::DamageMod)
                .with_value(ctx.rules.psi_buff_value);
            ctx.state.active_effects.apply("beatifiedWeapon", effect);
            PowerOutcome::Activated(power)
        }
        ExplorationPower::Sanctify => {
            charge(ctx, power)?;
            let effect = buff(ctx, power, "Une aura sacrée vous entoure.", EffectKind::DefenseMod)
                .with_value(ctx.rules.aura_value);
            ctx.state.active_effects.apply("sanctification", effect);
            PowerOutcome::Activated(power)
        }
        ExplorationPower::Vision => {
            charge(ctx, power)?;
            let effect = buff(ctx, power, "Vos sens percent les ténèbres.", EffectKind::Marker);
            ctx.state.active_effects.apply("vision", effect);
            let hint = if ctx
                .catalog
                .secret_passage(&ctx.state.current_location)
                .is_some()
            {
                "Une vision vous révèle un passage dissimulé ici."
            } else {
                "Votre vision ne révèle rien de caché ici."
            };
            ctx.notify(hint, Severity::Info);
            PowerOutcome::Activated(power)
        }
        ExplorationPower::BatForm => {
            charge(ctx, power)?;
            let effect = buff(ctx, power, "Vous volez sous forme de chauve-souris.", EffectKind::Marker);
            ctx.state.active_effects.apply("batForm", effect);
            PowerOutcome::Activated(power)
        }
        ExplorationPower::Teleport => {
            let targets = teleport_destinations(ctx);
            let catalog = ctx.catalog;
            let options: Vec<String> = targets
                .iter()
                .map(|id| {
                    catalog
                        .location(id)
                        .map_or_else(|_| id.clone(), |location| location.title.clone())
                })
                .collect();
            let picked = ctx
                .presenter
                .prompt_selection("Où souhaitez-vous vous téléporter ?", &options)
                .and_then(|index| targets.get(index));
            let Some(target) = picked else {
                return Ok(PowerOutcome::Canceled);
            };
            charge(ctx, power)?;
            log::debug!("teleporting to '{target}'");
            PowerOutcome::Teleported(navigation::enter(ctx, target)?)
        }
        ExplorationPower::SummonCreatures => {
            let options: Vec<String> = Creature::ALL
                .iter()
                .map(|creature| creature.label().to_string())
                .collect();
            let picked = ctx
                .presenter
                .prompt_selection("Quelles créatures appeler ?", &options)
                .and_then(|index| Creature::ALL.get(index).copied());
            let Some(creature) = picked else {
                return Ok(PowerOutcome::Canceled);
            };
            charge(ctx, power)?;
            summon(ctx, creature);
            PowerOutcome::Summoned(creature)
        }
    };
    if !matches!(outcome, PowerOutcome::Teleported(_)) {
        ctx.notify(&format!("{} activé.", power.label()), Severity::Success);
        ctx.persist();
    }
    Ok(outcome)
}

fn charge(ctx: &mut EngineContext<'_>, power: ExplorationPower) -> Result<(), GameError> {
    ctx.state
        .stats
        .spend_psi(power.cost())
        .map_err(|err| ctx.reject(err))?;
    log::debug!("{power} used, {} PSI left", ctx.state.stats.psi);
    Ok(())
}

fn buff(
    ctx: &EngineContext<'_>,
    power: ExplorationPower,
    description: &str,
    kind: EffectKind,
) -> ActiveEffect {
    ActiveEffect::buff(power.label(), description, kind, ctx.rules.psi_effect_duration)
}

fn summon(ctx: &mut EngineContext<'_>, creature: Creature) {
    let rules = ctx.rules;
    let (key, effect) = match creature {
        Creature::Bats => (
            "batScouts",
            ActiveEffect::buff(
                "Éclaireuses",
                "Des chauves-souris explorent les environs.",
                EffectKind::Marker,
                rules.companion_duration,
            ),
        ),
        Creature::Wolves => (
            "wolfProtection",
            ActiveEffect::buff(
                "Protection des loups",
                "Une meute veille sur vous.",
                EffectKind::DefenseMod,
                rules.companion_duration,
            )
            .with_value(rules.companion_bonus),
        ),
        Creature::Rats => (
            "ratDistraction",
            ActiveEffect::buff(
                "Diversion des rats",
                "Une nuée de rats couvre votre fuite.",
                EffectKind::FleeMod,
                rules.companion_duration,
            )
            .with_value(rules.companion_bonus),
        ),
    };
    ctx.state.active_effects.apply(key, effect);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Catalog;
    use crate::dice::ScriptedDice;
    use crate::persistence::Discard;
    use crate::presentation::RecordingPresenter;
    use crate::rules::RulesConfig;
    use crate::state::{PlayerState, Stats};

    struct Fixture {
        catalog: Catalog,
        rules: RulesConfig,
        state: PlayerState,
        dice: ScriptedDice,
        presenter: RecordingPresenter,
    }

    impl Fixture {
        fn new(character: Character, answers: &[Option<usize>]) -> Self {
            let stats = Stats {
                rapidite: 3,
                courage: 3,
                force: 3,
                habilete: 3,
                psi: 3,
                psi_max: 3,
                health: 100,
                max_health: 100,
                money: 12,
            };
            let mut state = PlayerState::new(character, stats);
            state.move_to(character.canonical_start());
            Self {
                catalog: Catalog::load_from_static(),
                rules: RulesConfig::default(),
                state,
                dice: ScriptedDice::new(),
                presenter: RecordingPresenter::with_answers(answers),
            }
        }

        fn ctx(&mut self) -> EngineContext<'_> {
            EngineContext {
                catalog: &self.catalog,
                rules: &self.rules,
                state: &mut self.state,
                dice: &mut self.dice,
                presenter: &mut self.presenter,
                persistence: &Discard,
            }
        }
    }

    #[test]
    fn beatify_needs_a_weapon_before_charging() {
        let mut fx = Fixture::new(Character::Jonathan, &[Some(0)]);
        let mut ctx = fx.ctx();
        assert_eq!(use_psi_power(&mut ctx, None), Err(GameError::NoWeapon));
        assert_eq!(fx.state.stats.psi, 3);

        fx.state.inventory.add("pieu");
        let mut ctx = fx.ctx();
        assert_eq!(
            use_psi_power(&mut ctx, Some("beatify")),
            Ok(PowerOutcome::Activated(ExplorationPower::Beatify))
        );
        assert_eq!(fx.state.stats.psi, 2);
        assert_eq!(fx.state.active_effects.modifier(EffectKind::DamageMod), 5);
    }

    #[test]
    fn exploration_aura_is_weaker_than_the_combat_one() {
        let mut fx = Fixture::new(Character::Jonathan, &[]);
        let mut ctx = fx.ctx();
        assert_eq!(
            use_psi_power(&mut ctx, Some("sanctify")),
            Ok(PowerOutcome::Activated(ExplorationPower::Sanctify))
        );
        assert_eq!(fx.state.active_effects.modifier(EffectKind::DefenseMod), 3);
        assert_eq!(fx.state.active_effects.get("sanctification").unwrap().duration, 3);
    }

    #[test]
    fn canceled_menu_is_free() {
        let mut fx = Fixture::new(Character::Jonathan, &[None]);
        let mut ctx = fx.ctx();
        assert_eq!(use_psi_power(&mut ctx, None), Ok(PowerOutcome::Canceled));
        assert_eq!(fx.state.stats.psi, 3);
        assert!(fx.state.active_effects.is_empty());
    }

    #[test]
    fn other_characters_power_is_refused() {
        let mut fx = Fixture::new(Character::Jonathan, &[]);
        let mut ctx = fx.ctx();
        assert_eq!(
            use_psi_power(&mut ctx, Some("teleport")),
            Err(GameError::CharacterRequired {
                required: Character::Dracula
            })
        );
        assert_eq!(fx.state.stats.psi, 3);
    }

    #[test]
    fn empty_pool_is_refused_before_prompting() {
        let mut fx = Fixture::new(Character::Dracula, &[Some(0)]);
        fx.state.stats.psi = 0;
        let mut ctx = fx.ctx();
        assert!(matches!(
            use_psi_power(&mut ctx, None),
            Err(GameError::InsufficientPsi { .. })
        ));
        assert_eq!(fx.presenter.prompts(), 0);
    }

    #[test]
    fn teleport_offers_crypt_and_visited_places() {
        let mut fx = Fixture::new(Character::Dracula, &[]);
        fx.state.move_to("vestibule");
        fx.state.move_to("fumoir");
        let ctx = fx.ctx();
        assert_eq!(
            teleport_destinations(&ctx),
            vec!["crypte-dracula".to_string(), "vestibule".to_string()]
        );
    }

    #[test]
    fn teleport_cancel_charges_nothing_and_confirm_moves() {
        let mut fx = Fixture::new(Character::Dracula, &[None]);
        fx.state.move_to("vestibule");
        let mut ctx = fx.ctx();
        assert_eq!(
            use_psi_power(&mut ctx, Some("teleport")),
            Ok(PowerOutcome::Canceled)
        );
        assert_eq!(fx.state.stats.psi, 3);

        fx.presenter.queue_answer(Some(0));
        let mut ctx = fx.ctx();
        let outcome = use_psi_power(&mut ctx, Some("teleport")).unwrap();
        assert!(matches!(
            outcome,
            PowerOutcome::Teleported(ref arrival) if arrival.location == "crypte-dracula"
        ));
        assert_eq!(fx.state.current_location, "crypte-dracula");
        assert_eq!(fx.state.stats.psi, 2);
    }

    #[test]
    fn wolves_protect_for_longer() {
        let mut fx = Fixture::new(Character::Dracula, &[Some(2), Some(1)]);
        let mut ctx = fx.ctx();
        assert_eq!(
            use_psi_power(&mut ctx, None),
            Ok(PowerOutcome::Summoned(Creature::Wolves))
        );
        assert_eq!(fx.state.stats.psi, 1);
        let wolves = fx.state.active_effects.get("wolfProtection").unwrap();
        assert_eq!(wolves.duration, 5);
        assert_eq!(fx.state.active_effects.modifier(EffectKind::DefenseMod), 2);
    }

    #[test]
    fn unknown_power_name_is_unregistered() {
        let mut fx = Fixture::new(Character::Dracula, &[]);
        let mut ctx = fx.ctx();
        assert_eq!(
            use_psi_power(&mut ctx, Some("hypnose")),
            Err(GameError::UnregisteredAction("hypnose".to_string()))
        );
    }
}
