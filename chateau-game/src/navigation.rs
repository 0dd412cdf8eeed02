//! Location graph traversal.
//!
//! Entering a location runs a fixed pipeline: move, visit effects, random
//! encounter, ambient event, game-time advance, render, save. Choices are
//! either a destination (location or narrative) or one of the registered
//! [`Action`]s.
use crate::combat;
use crate::context::EngineContext;
use crate::data::{
    Action, ActionName, Catalog, Choice, Location, TimeEffect, VisitChange, VisitCondition,
    VisitEffect,
};
use crate::error::GameError;
use crate::items;
use crate::powers::{self, PowerOutcome};
use crate::presentation::{ChoiceView, Severity};
use crate::state::{InventoryItem, PlayerState};

/// What happened on entering a location.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Arrival {
    pub location: String,
    pub first_visit: bool,
    /// Enemy id of a random or timed encounter.
    pub encounter: Option<String>,
    pub ambient_event: Option<String>,
    pub expired_effects: Vec<String>,
    pub daylight_damage: i32,
    /// Location reached through a timed relocation.
    pub relocated_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The location has no secret passage; no roll is made.
    NothingHere,
    NotFound,
    Declined,
    Taken(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceOutcome {
    Moved(Arrival),
    Narrative(String),
    Search(SearchOutcome),
    Power(PowerOutcome),
    Combat(String),
}

/// Game-time bookkeeping done on each location entry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct TimeReport {
    expired: Vec<String>,
    daylight_damage: i32,
    spawned: Option<String>,
    relocation: Option<String>,
}

/// Whether every gate declared on `choice` holds.
#[must_use]
pub fn is_enabled(state: &PlayerState, choice: &Choice) -> bool {
    let character_ok = choice
        .required_character
        .is_none_or(|required| required == state.character);
    let stat_ok = choice
        .required_stat
        .is_none_or(|req| state.stats.get(req.stat) >= req.min_value);
    let item_ok = choice
        .required_item
        .as_deref()
        .is_none_or(|item| state.inventory.contains(item));
    character_ok && stat_ok && item_ok
}

#[must_use]
pub fn choice_view(state: &PlayerState, choice: &Choice) -> ChoiceView {
    let enabled = is_enabled(state, choice);
    let text = match (&choice.conditional_text, enabled) {
        (Some(alternate), false) => alternate.clone(),
        _ => choice.text.clone(),
    };
    ChoiceView { text, enabled }
}

#[must_use]
pub fn choice_views(state: &PlayerState, choices: &[Choice]) -> Vec<ChoiceView> {
    choices
        .iter()
        .map(|choice| choice_view(state, choice))
        .collect()
}

/// Choices on screen: the open narrative's, or the current location's.
///
/// # Errors
///
/// Returns a catalog miss when the state points at an unknown scene.
pub fn current_choices<'c>(
    catalog: &'c Catalog,
    state: &PlayerState,
) -> Result<&'c [Choice], GameError> {
    match &state.current_narrative {
        Some(id) => Ok(&catalog.narrative(id)?.choices),
        None => Ok(&catalog.location(&state.current_location)?.choices),
    }
}

/// Move into `location_id` and run the entry pipeline.
///
/// # Errors
///
/// Refused during a fight or for an unknown location; nothing changes then.
pub fn enter(ctx: &mut EngineContext<'_>, location_id: &str) -> Result<Arrival, GameError> {
    if ctx.state.combat.in_combat {
        return Err(ctx.reject(GameError::AlreadyInCombat));
    }
    let catalog = ctx.catalog;
    let location = catalog
        .location(location_id)
        .map_err(|err| ctx.reject(err))?;

    let first_visit = ctx.state.move_to(location_id);
    log::debug!(
        "entered '{location_id}' (first visit: {first_visit}, from {:?})",
        ctx.state.previous_location
    );
    for effect in &location.visit_effects {
        apply_visit_effect(ctx, effect);
    }
    let encounter = roll_encounter(ctx, location);
    let ambient_event = roll_ambient_event(ctx);
    let time = advance_time(ctx, location);

    ctx.persist();
    ctx.presenter.render_location(location);
    let views = choice_views(ctx.state, &location.choices);
    ctx.presenter.render_choices(&views);
    if let Some(frame) = combat::frame(ctx.state) {
        ctx.presenter.render_combat_frame(&frame);
    }

    let mut arrival = Arrival {
        location: location_id.to_string(),
        first_visit,
        encounter: encounter.or(time.spawned),
        ambient_event,
        expired_effects: time.expired,
        daylight_damage: time.daylight_damage,
        relocated_to: None,
    };
    if let Some(target) = time.relocation {
        if ctx.state.combat.in_combat {
            log::debug!("relocation to '{target}' skipped during combat");
        } else if enter(ctx, &target).is_ok() {
            arrival.relocated_to = Some(target);
        }
    }
    Ok(arrival)
}

/// Open the narrative `narrative_id` over the current location.
///
/// # Errors
///
/// Refused for an unknown narrative, during a fight, or when the narrative
/// belongs to the other character.
pub fn show_narrative(ctx: &mut EngineContext<'_>, narrative_id: &str) -> Result<(), GameError> {
    if ctx.state.combat.in_combat {
        return Err(ctx.reject(GameError::AlreadyInCombat));
    }
    let catalog = ctx.catalog;
    let narrative = catalog
        .narrative(narrative_id)
        .map_err(|err| ctx.reject(err))?;
    if let Some(required) = narrative.required_character
        && required != ctx.state.character
    {
        return Err(ctx.reject(GameError::CharacterRequired { required }));
    }

    ctx.state.current_narrative = Some(narrative_id.to_string());
    log::debug!("narrative '{narrative_id}' opened over '{}'", ctx.state.current_location);
    if let Some(item) = &narrative.item_gained
        && ctx.state.granted_narratives.insert(narrative_id.to_string())
    {
        items::grant(ctx, InventoryItem::Item(item.clone()));
    }
    ctx.presenter.render_narrative(narrative);
    let views = choice_views(ctx.state, &narrative.choices);
    ctx.presenter.render_choices(&views);
    ctx.persist();
    Ok(())
}

/// Follow a destination id, which may name a location or a narrative.
///
/// # Errors
///
/// Returns [`GameError::UnknownLocation`] when the id names neither.
pub fn go_to(ctx: &mut EngineContext<'_>, destination: &str) -> Result<ChoiceOutcome, GameError> {
    let catalog = ctx.catalog;
    if catalog.locations.contains_key(destination) {
        enter(ctx, destination).map(ChoiceOutcome::Moved)
    } else if catalog.narratives.contains_key(destination) {
        show_narrative(ctx, destination)?;
        Ok(ChoiceOutcome::Narrative(destination.to_string()))
    } else {
        Err(ctx.reject(GameError::UnknownLocation(destination.to_string())))
    }
}

/// Pick the choice at `index` among those on screen.
///
/// # Errors
///
/// Refused for an out-of-range index, a disabled choice, or whatever the
/// resolved choice refuses.
pub fn choose(ctx: &mut EngineContext<'_>, index: usize) -> Result<ChoiceOutcome, GameError> {
    let catalog = ctx.catalog;
    let choices = current_choices(catalog, ctx.state).map_err(|err| ctx.reject(err))?;
    let Some(choice) = choices.get(index) else {
        let err = GameError::NoSuchChoice {
            index,
            available: choices.len(),
        };
        return Err(ctx.reject(err));
    };
    resolve_choice(ctx, choice)
}

/// Carry out one choice.
///
/// # Errors
///
/// Refused when the choice is gated off, names an unregistered action, or
/// when the underlying transition refuses.
pub fn resolve_choice(
    ctx: &mut EngineContext<'_>,
    choice: &Choice,
) -> Result<ChoiceOutcome, GameError> {
    if !is_enabled(ctx.state, choice) {
        return Err(ctx.reject(GameError::ChoiceDisabled(choice.text.clone())));
    }
    if let Some(destination) = &choice.destination {
        return go_to(ctx, destination);
    }
    match &choice.action {
        Some(ActionName::Known(Action::SearchSecret)) => {
            search_secret(ctx).map(ChoiceOutcome::Search)
        }
        Some(ActionName::Known(Action::UsePsiPower)) => {
            powers::use_psi_power(ctx, choice.power.as_deref()).map(ChoiceOutcome::Power)
        }
        Some(ActionName::Known(Action::StartCombat)) => {
            let enemy = choice.enemy.clone().unwrap_or_default();
            combat::start(ctx, &enemy)?;
            Ok(ChoiceOutcome::Combat(enemy))
        }
        Some(ActionName::Unregistered(name)) => {
            Err(ctx.reject(GameError::UnregisteredAction(name.clone())))
        }
        None => Err(ctx.reject(GameError::UnregisteredAction(choice.text.clone()))),
    }
}

/// Look for the current location's secret passage.
///
/// # Errors
///
/// Refused during a fight or when the passage leads nowhere known.
pub fn search_secret(ctx: &mut EngineContext<'_>) -> Result<SearchOutcome, GameError> {
    if ctx.state.combat.in_combat {
        return Err(ctx.reject(GameError::AlreadyInCombat));
    }
    let catalog = ctx.catalog;
    let Some(target) = catalog.secret_passage(&ctx.state.current_location) else {
        ctx.notify("Vous ne trouvez rien de particulier.", Severity::Info);
        return Ok(SearchOutcome::NothingHere);
    };
    let chance = ctx.rules.search.chance(ctx.state.stats.habilete);
    if !ctx.dice.chance(chance) {
        log::debug!("secret search failed at {:.0}%", chance * 100.0);
        ctx.notify("Vos recherches restent vaines.", Severity::Info);
        return Ok(SearchOutcome::NotFound);
    }
    let options = ["Oui".to_string(), "Non".to_string()];
    let answer = ctx
        .presenter
        .prompt_selection("Vous découvrez un passage secret ! L'emprunter ?", &options);
    if answer != Some(0) {
        return Ok(SearchOutcome::Declined);
    }
    go_to(ctx, target)?;
    Ok(SearchOutcome::Taken(target.to_string()))
}

fn condition_holds(state: &PlayerState, condition: Option<&VisitCondition>) -> bool {
    match condition {
        None => true,
        Some(VisitCondition::Character(character)) => state.character == *character,
        Some(VisitCondition::Item(item)) => state.inventory.contains(item),
        Some(VisitCondition::Stat(req)) => state.stats.get(req.stat) >= req.min_value,
    }
}

fn apply_visit_effect(ctx: &mut EngineContext<'_>, effect: &VisitEffect) {
    if !condition_holds(ctx.state, effect.condition.as_ref()) {
        return;
    }
    match &effect.change {
        VisitChange::Health { value } if *value < 0 => {
            wound(ctx.state, -value);
        }
        VisitChange::Health { value } => {
            ctx.state.stats.adjust_health(*value);
        }
        VisitChange::Psi { value } => {
            ctx.state.stats.adjust_psi(*value);
        }
        VisitChange::Item { item_id } => {
            if ctx.state.inventory.contains(item_id) {
                return;
            }
            if ctx.catalog.item(item_id).is_none() {
                ctx.reject(GameError::UnknownItem(item_id.clone()));
                return;
            }
            items::grant(ctx, InventoryItem::Id(item_id.clone()));
        }
    }
    if let Some(message) = &effect.message {
        ctx.notify(message, Severity::Info);
    }
}

/// Exploration damage never knocks the player out.
fn wound(state: &mut PlayerState, amount: i32) -> i32 {
    let bearable = amount.min(state.stats.health - 1).max(0);
    -state.stats.adjust_health(-bearable)
}

fn roll_encounter(ctx: &mut EngineContext<'_>, location: &Location) -> Option<String> {
    let chance = location.encounter_chance?;
    if location.possible_encounters.is_empty() || !ctx.dice.chance(chance) {
        return None;
    }
    let index = ctx.dice.pick(location.possible_encounters.len());
    let enemy_id = location.possible_encounters.get(index)?;
    match combat::begin(ctx, enemy_id) {
        Ok(()) => {
            if let Some(enemy) = &ctx.state.combat.enemy {
                let text = format!("{} vous attaque !", enemy.name);
                ctx.notify(&text, Severity::Warning);
            }
            Some(enemy_id.clone())
        }
        Err(err) => {
            ctx.reject(err);
            None
        }
    }
}

/// At most one ambient event per entry; the first one that fires wins.
fn roll_ambient_event(ctx: &mut EngineContext<'_>) -> Option<String> {
    let catalog = ctx.catalog;
    let event = catalog
        .random_events
        .iter()
        .find(|event| ctx.dice.chance(event.probability))?;
    ctx.notify(&event.description, Severity::Info);
    Some(event.name.clone())
}

/// One tick of game time: ledger decay, daylight, then timed events.
fn advance_time(ctx: &mut EngineContext<'_>, location: &Location) -> TimeReport {
    let mut report = TimeReport::default();
    ctx.state.game_time += 1;
    let now = ctx.state.game_time;
    report.expired = ctx.state.active_effects.tick();
    for key in &report.expired {
        log::debug!("effect '{key}' expired at game time {now}");
    }

    let daylight = ctx.rules.daylight;
    if ctx.state.character == crate::state::Character::Dracula
        && location.is_exterior
        && daylight.is_daytime(now)
    {
        report.daylight_damage = wound(ctx.state, daylight.damage);
        if report.daylight_damage > 0 {
            ctx.notify(
                &format!("Le soleil vous brûle ! (-{} PV)", report.daylight_damage),
                Severity::Warning,
            );
        }
    }

    let catalog = ctx.catalog;
    for event in catalog.time_events.iter().filter(|event| event.trigger == now) {
        match &event.effect {
            TimeEffect::SpawnEnemy { enemy_id } => {
                if ctx.state.combat.in_combat {
                    log::debug!("timed spawn of '{enemy_id}' skipped during combat");
                    continue;
                }
                match combat::begin(ctx, enemy_id) {
                    Ok(()) => report.spawned = Some(enemy_id.clone()),
                    Err(err) => {
                        ctx.reject(err);
                        continue;
                    }
                }
            }
            TimeEffect::AddItem { item_id } => {
                if catalog.item(item_id).is_none() {
                    ctx.reject(GameError::UnknownItem(item_id.clone()));
                    continue;
                }
                ctx.state.inventory.add(item_id.as_str());
            }
            TimeEffect::ChangeLocation { location_id } => {
                report.relocation = Some(location_id.clone());
            }
        }
        if let Some(message) = &event.message {
            ctx.notify(message, Severity::Warning);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Narrative, StatRequirement, TimeEvent};
    use crate::dice::ScriptedDice;
    use crate::persistence::{Discard, MemoryStorage, SaveSlot};
    use crate::presentation::{CombatFrame, Presenter, RecordingPresenter};
    use crate::rules::RulesConfig;
    use crate::state::{Character, StatKind, Stats};

    struct Fixture {
        catalog: Catalog,
        rules: RulesConfig,
        state: PlayerState,
        dice: ScriptedDice,
        presenter: RecordingPresenter,
    }

    impl Fixture {
        fn new(character: Character) -> Self {
            let stats = Stats {
                rapidite: 3,
                courage: 3,
                force: 4,
                habilete: 2,
                psi: 3,
                psi_max: 3,
                health: 100,
                max_health: 100,
                money: 16,
            };
            Self {
                catalog: Catalog::load_from_static(),
                rules: RulesConfig::default(),
                state: PlayerState::new(character, stats),
                dice: ScriptedDice::new(),
                presenter: RecordingPresenter::new(),
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
    fn enter_updates_history_in_order() {
        let mut fx = Fixture::new(Character::Jonathan);
        let mut ctx = fx.ctx();
        let first = enter(&mut ctx, "allee").unwrap();
        assert!(first.first_visit);
        enter(&mut ctx, "portail").unwrap();
        let back = enter(&mut ctx, "allee").unwrap();
        assert!(!back.first_visit);

        assert_eq!(fx.state.current_location, "allee");
        assert_eq!(fx.state.previous_location.as_deref(), Some("portail"));
        assert_eq!(fx.state.visited_locations, vec!["allee", "portail"]);
        assert_eq!(fx.state.game_time, 3);
        assert!(fx.presenter.last_choices().is_some());
    }

    /// Notes whether the slot already held the new location when the scene was drawn.
    struct SlotWatcher {
        storage: MemoryStorage,
        saved_before_render: Vec<bool>,
    }

    impl Presenter for SlotWatcher {
        fn render_location(&mut self, location: &Location) {
            let marker = format!("\"currentLocation\":\"{}\"", location.id);
            let saved = self
                .storage
                .raw("autosave")
                .is_some_and(|json| json.contains(&marker));
            self.saved_before_render.push(saved);
        }

        fn render_narrative(&mut self, _narrative: &Narrative) {}

        fn render_choices(&mut self, _choices: &[ChoiceView]) {}

        fn render_combat_frame(&mut self, _frame: &CombatFrame) {}

        fn show_message(&mut self, _text: &str, _severity: Severity, _duration_ms: u32) {}

        fn prompt_selection(&mut self, _prompt: &str, _options: &[String]) -> Option<usize> {
            None
        }
    }

    #[test]
    fn arrival_is_saved_before_it_is_drawn() {
        let mut fx = Fixture::new(Character::Jonathan);
        let storage = MemoryStorage::new();
        let slot = SaveSlot::new(storage.clone(), "autosave");
        let mut watcher = SlotWatcher {
            storage,
            saved_before_render: Vec::new(),
        };
        let mut ctx = EngineContext {
            catalog: &fx.catalog,
            rules: &fx.rules,
            state: &mut fx.state,
            dice: &mut fx.dice,
            presenter: &mut watcher,
            persistence: &slot,
        };
        enter(&mut ctx, "allee").unwrap();
        enter(&mut ctx, "portail").unwrap();
        assert_eq!(watcher.saved_before_render, vec![true, true]);
    }

    #[test]
    fn unknown_location_changes_nothing() {
        let mut fx = Fixture::new(Character::Jonathan);
        fx.state.move_to("cour-ecuries");
        let before = fx.state.clone();
        let mut ctx = fx.ctx();
        assert_eq!(
            enter(&mut ctx, "verger"),
            Err(GameError::UnknownLocation("verger".to_string()))
        );
        assert_eq!(fx.state, before);
        assert!(fx.presenter.has_message("pas encore disponible"));
    }

    #[test]
    fn stat_gate_flips_at_threshold() {
        let choice = Choice {
            required_stat: Some(StatRequirement {
                stat: StatKind::Force,
                min_value: 5,
            }),
            conditional_text: Some("La porte résiste.".to_string()),
            ..Choice::to("Enfoncer la porte", "vestibule")
        };
        let mut fx = Fixture::new(Character::Jonathan);
        fx.state.stats.force = 4;
        assert!(!is_enabled(&fx.state, &choice));
        assert_eq!(choice_view(&fx.state, &choice).text, "La porte résiste.");
        fx.state.stats.force = 5;
        assert!(is_enabled(&fx.state, &choice));
        assert_eq!(choice_view(&fx.state, &choice).text, "Enfoncer la porte");
    }

    #[test]
    fn item_and_character_gates() {
        let mut fx = Fixture::new(Character::Jonathan);
        let buffet = Choice {
            required_item: Some("cle-cuivre".to_string()),
            ..Choice::to("Ouvrir le buffet", "buffet-verrouille")
        };
        assert!(!is_enabled(&fx.state, &buffet));
        fx.state.inventory.add("cle-cuivre");
        assert!(is_enabled(&fx.state, &buffet));

        let teleport = Choice {
            required_character: Some(Character::Dracula),
            ..Choice::with_action("Se téléporter", Action::UsePsiPower)
        };
        assert!(!is_enabled(&fx.state, &teleport));
        let mut ctx = fx.ctx();
        assert_eq!(
            resolve_choice(&mut ctx, &teleport),
            Err(GameError::ChoiceDisabled("Se téléporter".to_string()))
        );
    }

    #[test]
    fn unregistered_action_is_a_reported_no_op() {
        let mut fx = Fixture::new(Character::Jonathan);
        fx.state.move_to("allee");
        let before = fx.state.clone();
        let mut ctx = fx.ctx();
        let index = current_choices(ctx.catalog, ctx.state)
            .unwrap()
            .iter()
            .position(|choice| {
                matches!(choice.action, Some(ActionName::Unregistered(_)))
            })
            .unwrap();
        assert_eq!(
            choose(&mut ctx, index),
            Err(GameError::UnregisteredAction("bibliotheque".to_string()))
        );
        assert_eq!(fx.state, before);
    }

    #[test]
    fn choose_rejects_out_of_range_index() {
        let mut fx = Fixture::new(Character::Jonathan);
        fx.state.move_to("portail");
        let mut ctx = fx.ctx();
        assert!(matches!(
            choose(&mut ctx, 99),
            Err(GameError::NoSuchChoice { index: 99, .. })
        ));
    }

    #[test]
    fn visit_effects_respect_conditions() {
        let mut fx = Fixture::new(Character::Jonathan);
        fx.state.stats.psi = 1;
        fx.state.stats.health = 90;
        let mut ctx = fx.ctx();
        enter(&mut ctx, "chapelle-chateau").unwrap();
        assert_eq!(fx.state.stats.psi, 2);
        assert_eq!(fx.state.stats.health, 90);

        let mut fx = Fixture::new(Character::Dracula);
        fx.state.stats.health = 3;
        let mut ctx = fx.ctx();
        enter(&mut ctx, "chapelle-chateau").unwrap();
        assert_eq!(fx.state.stats.health, 1);
    }

    #[test]
    fn encounter_starts_a_fight_without_leaving() {
        let mut fx = Fixture::new(Character::Jonathan);
        fx.dice = ScriptedDice::new().chances(&[true]).picks(&[1]);
        let mut ctx = fx.ctx();
        let arrival = enter(&mut ctx, "cimetiere").unwrap();
        assert_eq!(arrival.encounter.as_deref(), Some("chauve-souris-vampire"));
        assert!(fx.state.combat.in_combat);
        assert_eq!(fx.state.current_location, "cimetiere");

        let mut ctx = fx.ctx();
        assert_eq!(enter(&mut ctx, "allee"), Err(GameError::AlreadyInCombat));
    }

    #[test]
    fn only_the_first_ambient_event_fires() {
        let mut fx = Fixture::new(Character::Jonathan);
        // allee has no encounter roll: the chances go to the ambient events.
        fx.dice = ScriptedDice::new().chances(&[false, true, true]);
        let mut ctx = fx.ctx();
        let arrival = enter(&mut ctx, "allee").unwrap();
        assert_eq!(arrival.ambient_event.as_deref(), Some("Grincement"));
        assert!(!fx.presenter.has_message("chauve-souris traverse"));
    }

    #[test]
    fn effects_tick_once_per_entry() {
        let mut fx = Fixture::new(Character::Jonathan);
        fx.state.active_effects.apply(
            "vision",
            crate::effects::ActiveEffect::buff("Vision", "", crate::effects::EffectKind::Marker, 2),
        );
        let mut ctx = fx.ctx();
        let first = enter(&mut ctx, "allee").unwrap();
        assert!(first.expired_effects.is_empty());
        let second = enter(&mut ctx, "portail").unwrap();
        assert_eq!(second.expired_effects, vec!["vision".to_string()]);
        assert!(!fx.state.active_effects.is_active("vision"));
    }

    #[test]
    fn dracula_burns_outside_by_day() {
        let mut fx = Fixture::new(Character::Dracula);
        // game time 2 after entry: hour 8
        fx.state.game_time = 1;
        let mut ctx = fx.ctx();
        let arrival = enter(&mut ctx, "allee").unwrap();
        assert_eq!(arrival.daylight_damage, 2);
        assert_eq!(fx.state.stats.health, 98);

        let mut ctx = fx.ctx();
        let inside = enter(&mut ctx, "vestibule").unwrap();
        assert_eq!(inside.daylight_damage, 0);
    }

    #[test]
    fn time_events_fire_on_their_tick() {
        let mut fx = Fixture::new(Character::Jonathan);
        fx.state.game_time = 11;
        let mut ctx = fx.ctx();
        let arrival = enter(&mut ctx, "allee").unwrap();
        assert_eq!(arrival.encounter.as_deref(), Some("loup"));
        assert!(fx.state.combat.in_combat);

        let mut fx = Fixture::new(Character::Jonathan);
        fx.state.game_time = 19;
        let mut ctx = fx.ctx();
        enter(&mut ctx, "allee").unwrap();
        assert!(fx.state.inventory.contains("elixir-nostradamus"));

        let mut fx = Fixture::new(Character::Jonathan);
        fx.catalog.time_events = vec![TimeEvent {
            trigger: 1,
            effect: TimeEffect::ChangeLocation {
                location_id: "vestibule".to_string(),
            },
            message: Some("Vous êtes emporté ailleurs.".to_string()),
        }];
        let mut ctx = fx.ctx();
        let arrival = enter(&mut ctx, "allee").unwrap();
        assert_eq!(arrival.relocated_to.as_deref(), Some("vestibule"));
        assert_eq!(fx.state.current_location, "vestibule");
        assert_eq!(fx.state.previous_location.as_deref(), Some("allee"));
        assert_eq!(fx.state.game_time, 2);
    }

    #[test]
    fn narrative_overlays_and_grants_once() {
        let mut fx = Fixture::new(Character::Jonathan);
        fx.state.inventory.add("cle-cuivre");
        let mut ctx = fx.ctx();
        enter(&mut ctx, "salle-manger").unwrap();
        show_narrative(&mut ctx, "buffet-verrouille").unwrap();
        enter(&mut ctx, "salle-manger").unwrap();
        show_narrative(&mut ctx, "buffet-verrouille").unwrap();

        assert_eq!(fx.state.current_location, "salle-manger");
        assert_eq!(
            fx.state.current_narrative.as_deref(),
            Some("buffet-verrouille")
        );
        assert_eq!(fx.state.inventory.len(), 2);
        let current = current_choices(&fx.catalog, &fx.state).unwrap();
        assert_eq!(
            current,
            fx.catalog
                .narrative("buffet-verrouille")
                .unwrap()
                .choices
                .as_slice()
        );
    }

    #[test]
    fn search_without_passage_never_rolls() {
        let mut fx = Fixture::new(Character::Jonathan);
        fx.state.move_to("cuisine");
        fx.dice = ScriptedDice::new().chances(&[true]);
        let mut ctx = fx.ctx();
        assert_eq!(search_secret(&mut ctx), Ok(SearchOutcome::NothingHere));
        assert_eq!(fx.presenter.prompts(), 0);
    }

    #[test]
    fn found_passage_can_be_declined_or_taken() {
        let mut fx = Fixture::new(Character::Jonathan);
        fx.state.move_to("allee");
        fx.dice = ScriptedDice::new().chances(&[true]);
        fx.presenter = RecordingPresenter::with_answers(&[Some(1)]);
        let before = fx.state.clone();
        let mut ctx = fx.ctx();
        assert_eq!(search_secret(&mut ctx), Ok(SearchOutcome::Declined));
        assert_eq!(fx.state, before);

        fx.dice = ScriptedDice::new().chances(&[true]);
        fx.presenter = RecordingPresenter::with_answers(&[Some(0)]);
        let mut ctx = fx.ctx();
        assert_eq!(
            search_secret(&mut ctx),
            Ok(SearchOutcome::Taken("cimetiere".to_string()))
        );
        assert_eq!(fx.state.current_location, "cimetiere");
    }

    #[test]
    fn failed_search_reports_not_found() {
        let mut fx = Fixture::new(Character::Jonathan);
        fx.state.move_to("allee");
        let mut ctx = fx.ctx();
        assert_eq!(search_secret(&mut ctx), Ok(SearchOutcome::NotFound));
        assert_eq!(fx.state.current_location, "allee");
    }
}
