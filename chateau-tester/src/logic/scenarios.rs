use std::sync::Arc;

use anyhow::{Context, Result, bail, ensure};
use chateau_game::{
    Catalog, Character, CombatOutcome, CreationGate, DiceRoller, Discard, EmbeddedData,
    GameEngine, GameError, GameSession, GameStorage, MemoryStorage, PlayerState, Presenter,
    Randomness, RecordingPresenter, RulesConfig, ScriptedDice, SearchOutcome, StatKind,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::common::{ConsolePresenter, JsonFileStorage};
use crate::logic::checks::ensure_consistent;

const WANDER_STEPS: usize = 60;
const MAX_EXCHANGES: usize = 500;

/// Shared inputs for every scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioEnv {
    pub catalog: Arc<Catalog>,
    pub rules: RulesConfig,
    pub save_dir: Option<JsonFileStorage>,
    pub verbose: bool,
}

impl ScenarioEnv {
    pub fn new(save_dir: Option<JsonFileStorage>, verbose: bool) -> Result<Self> {
        let engine = GameEngine::new(EmbeddedData, MemoryStorage::new());
        let (catalog, rules) = engine.load_content().context("loading embedded content")?;
        Ok(Self {
            catalog: Arc::new(catalog),
            rules,
            save_dir,
            verbose,
        })
    }
}

/// What a single iteration did, for verbose output.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub steps: usize,
    pub fights: usize,
    pub refusals: usize,
    pub final_location: String,
}

type ScenarioFn = fn(&ScenarioEnv, u64) -> Result<RunSummary>;

#[derive(Clone)]
pub struct TestScenario {
    pub name: &'static str,
    pub description: &'static str,
    run: ScenarioFn,
}

impl TestScenario {
    /// Run one iteration with `seed`.
    ///
    /// # Errors
    ///
    /// Returns the first broken expectation.
    pub fn run(&self, env: &ScenarioEnv, seed: u64) -> Result<RunSummary> {
        (self.run)(env, seed)
    }
}

static SCENARIOS: &[TestScenario] = &[
    TestScenario {
        name: "smoke",
        description: "Create a character and wander the castle, checking invariants every step",
        run: smoke,
    },
    TestScenario {
        name: "combat-gauntlet",
        description: "Fight every enemy in the catalog to a conclusion",
        run: combat_gauntlet,
    },
    TestScenario {
        name: "persistence",
        description: "Autosave mid-game, then reload and resume from storage",
        run: persistence,
    },
    TestScenario {
        name: "secret-search",
        description: "Find and take every secret passage",
        run: secret_search,
    },
    TestScenario {
        name: "creation-gate",
        description: "Roll both characters and verify the creation gate",
        run: creation_gate,
    },
];

pub fn list_scenarios() -> impl Iterator<Item = (&'static str, &'static str)> {
    SCENARIOS.iter().map(|s| (s.name, s.description))
}

pub fn get_scenario(name: &str) -> Option<&'static TestScenario> {
    SCENARIOS.iter().find(|s| s.name == name)
}

pub fn all_scenario_names() -> Vec<String> {
    SCENARIOS.iter().map(|s| s.name.to_string()).collect()
}

fn character_for(seed: u64) -> Character {
    if seed % 2 == 0 {
        Character::Jonathan
    } else {
        Character::Dracula
    }
}

fn rolled_gate(character: Character, dice: &mut dyn Randomness) -> Result<CreationGate> {
    let mut gate = CreationGate::new();
    for stat in StatKind::ALL {
        gate.roll_stat(character, stat, dice)?;
    }
    gate.roll_fortune_for(character, dice)?;
    Ok(gate)
}

fn new_session(
    env: &ScenarioEnv,
    character: Character,
    seed: u64,
) -> Result<GameSession<ConsolePresenter>> {
    let gate = rolled_gate(character, &mut DiceRoller::seeded(seed))?;
    let state = gate.finish(character, &env.rules)?;
    Ok(GameSession::new(
        Arc::clone(&env.catalog),
        env.rules.clone(),
        state,
        DiceRoller::seeded(seed),
        ConsolePresenter::new(seed, env.verbose),
        Box::new(Discard),
    ))
}

/// Attack until the running fight ends. Returns the outcome, if a fight was running.
fn fight<P: Presenter, R: Randomness>(
    session: &mut GameSession<P, R>,
) -> Result<Option<CombatOutcome>> {
    if !session.state().combat.in_combat {
        return Ok(None);
    }
    for _ in 0..MAX_EXCHANGES {
        let exchange = session.attack()?;
        ensure_consistent(session.state(), session.catalog())?;
        if let Some(outcome) = exchange.outcome {
            return Ok(Some(outcome));
        }
    }
    bail!("fight still running after {MAX_EXCHANGES} exchanges")
}

/// Random walk over enabled choices, fighting whatever shows up.
fn wander<P: Presenter, R: Randomness>(
    session: &mut GameSession<P, R>,
    rng: &mut ChaCha20Rng,
    steps: usize,
) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    for step in 0..steps {
        if fight(session)?.is_some() {
            summary.fights += 1;
        }
        let views = session.choices()?;
        let enabled: Vec<usize> = views
            .iter()
            .enumerate()
            .filter(|(_, view)| view.enabled)
            .map(|(index, _)| index)
            .collect();
        if enabled.is_empty() {
            let start = session.catalog().start_location(session.state().character);
            log::debug!("dead end at '{}', back to '{start}'", session.state().current_location);
            session.enter(&start)?;
            continue;
        }
        let index = enabled[rng.gen_range(0..enabled.len())];
        if let Err(err) = session.choose(index) {
            log::debug!("step {step}: choice {index} refused: {err}");
            summary.refusals += 1;
        }
        ensure_consistent(session.state(), session.catalog())
            .with_context(|| format!("after step {step} (choice {index})"))?;
        summary.steps += 1;
    }
    summary.final_location = session.state().current_location.clone();
    Ok(summary)
}

fn smoke(env: &ScenarioEnv, seed: u64) -> Result<RunSummary> {
    let mut total = RunSummary::default();
    for character in Character::ALL {
        let mut session = new_session(env, character, seed)?;
        session.begin()?;
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let summary = wander(&mut session, &mut rng, WANDER_STEPS)
            .with_context(|| format!("{character} walk"))?;
        let state = session.state();
        ensure!(state.game_time > 0, "game time never advanced for {character}");
        ensure!(
            state.visited_locations.len() > 1,
            "{character} never left '{}'",
            state.current_location
        );
        total.steps += summary.steps;
        total.fights += summary.fights;
        total.refusals += summary.refusals;
        total.final_location = summary.final_location;
    }
    Ok(total)
}

fn combat_gauntlet(env: &ScenarioEnv, seed: u64) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    for enemy_id in env.catalog.enemies.keys() {
        let mut session = new_session(env, Character::Jonathan, seed)?;
        session.begin()?;
        fight(&mut session)?;

        session.start_combat(enemy_id)?;
        let outcome = fight(&mut session)?
            .with_context(|| format!("fight against '{enemy_id}' never started"))?;
        summary.fights += 1;
        let state = session.state();
        ensure!(!state.combat.in_combat, "'{enemy_id}' fight left combat open");
        match outcome {
            CombatOutcome::Victory => ensure!(
                state.defeated_enemies.contains(enemy_id),
                "victory over '{enemy_id}' was not recorded"
            ),
            CombatOutcome::Defeat => ensure!(
                state.stats.health == (state.stats.max_health + 1) / 2,
                "defeat by '{enemy_id}' left {} PV",
                state.stats.health
            ),
            CombatOutcome::Fled => bail!("attacking never flees"),
        }
        if env.verbose {
            println!("    {enemy_id}: {outcome:?}");
        }
        summary.final_location = state.current_location.clone();
    }
    Ok(summary)
}

fn persistence(env: &ScenarioEnv, seed: u64) -> Result<RunSummary> {
    match &env.save_dir {
        Some(storage) => persistence_with(env, seed, storage.clone()),
        None => persistence_with(env, seed, MemoryStorage::new()),
    }
}

fn persistence_with<S>(env: &ScenarioEnv, seed: u64, storage: S) -> Result<RunSummary>
where
    S: GameStorage + Clone + 'static,
    S::Error: Into<anyhow::Error>,
{
    let slot = format!("persistence-{seed}");
    let engine = GameEngine::new(EmbeddedData, storage);
    let character = character_for(seed);
    let gate = rolled_gate(character, &mut DiceRoller::seeded(seed))?;
    let mut session = engine.create_session(
        &gate,
        character,
        seed,
        ConsolePresenter::new(seed, env.verbose),
        &slot,
    )?;
    session.begin()?;
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let summary = wander(&mut session, &mut rng, WANDER_STEPS / 2)?;
    ensure!(session.save(), "explicit save failed");

    let stored = engine
        .load_game(&slot)?
        .context("autosave slot is empty")?;
    ensure!(&stored == session.state(), "stored snapshot differs from the live state");

    let resumed = engine.resume_session(&slot, seed, RecordingPresenter::new())?;
    ensure!(resumed.state() == session.state(), "resumed state differs");

    engine
        .delete_game(&slot)
        .map_err(Into::<anyhow::Error>::into)?;
    ensure!(engine.load_game(&slot)?.is_none(), "slot survived deletion");
    Ok(summary)
}

fn secret_search(env: &ScenarioEnv, seed: u64) -> Result<RunSummary> {
    let mut summary = RunSummary::default();
    let gate = rolled_gate(Character::Jonathan, &mut DiceRoller::seeded(seed))?;
    let base = gate.finish(Character::Jonathan, &env.rules)?;
    for (from, to) in &env.catalog.secret_passages {
        if !env.catalog.locations.contains_key(from) {
            continue;
        }
        let mut state: PlayerState = base.clone();
        state.move_to(from);
        let mut session = GameSession::new(
            Arc::clone(&env.catalog),
            env.rules.clone(),
            state,
            ScriptedDice::new().chances(&[true]),
            RecordingPresenter::with_answers(&[Some(0)]),
            Box::new(Discard),
        );
        let result = session.search_secret();
        if env.catalog.has_destination(to) {
            let outcome = result.with_context(|| format!("search at '{from}'"))?;
            ensure!(
                outcome == SearchOutcome::Taken(to.clone()),
                "search at '{from}' gave {outcome:?}"
            );
            if env.catalog.locations.contains_key(to) {
                ensure!(
                    session.state().current_location == *to,
                    "passage from '{from}' did not lead to '{to}'"
                );
            }
            summary.steps += 1;
        } else {
            ensure!(
                matches!(result, Err(GameError::UnknownLocation(_))),
                "dangling passage from '{from}' was not refused"
            );
            ensure!(
                session.state().current_location == *from,
                "dangling passage from '{from}' moved the player"
            );
        }
        ensure_consistent(session.state(), session.catalog())?;
    }
    Ok(summary)
}

fn creation_gate(env: &ScenarioEnv, seed: u64) -> Result<RunSummary> {
    let mut dice = DiceRoller::seeded(seed);
    for character in Character::ALL {
        let mut gate = CreationGate::new();
        ensure!(
            gate.roll_fortune_for(character, &mut dice).is_err(),
            "fortune rolled before stats for {character}"
        );
        for stat in StatKind::ALL {
            let value = gate.roll_stat(character, stat, &mut dice)?;
            ensure!((1..=6).contains(&value), "{stat} rolled {value}");
            let repeat = gate.roll_stat(character, stat, &mut dice);
            ensure!(repeat.is_err(), "{stat} could be rolled twice");
            let kept = gate.sheet(character).and_then(|sheet| sheet.stat(stat));
            ensure!(kept == Some(value), "{stat} changed on a duplicate roll");
        }
        ensure!(!gate.can_start(character), "start unlocked before the fortune");
        let money = gate.roll_fortune_for(character, &mut dice)?;
        ensure!(
            (8..=48).contains(&money) && money % 4 == 0,
            "fortune {money} outside the dice range"
        );
        ensure!(gate.can_start(character), "start still locked");
        let state = gate.finish(character, &env.rules)?;
        ensure!(state.stats.health == env.rules.starting_health, "wrong starting health");
        ensure!(state.stats.psi == state.stats.psi_max, "psi pool not full");
        ensure_consistent(&state, &env.catalog)?;
    }
    Ok(RunSummary::default())
}
