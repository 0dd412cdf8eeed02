use std::sync::Arc;

use chateau_game::{
    Catalog, Character, DiceRoller, Discard, GameSession, PlayerState, RecordingPresenter,
    RulesConfig, Stats,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const STEPS: usize = 400;

fn random_stats(rng: &mut ChaCha20Rng) -> Stats {
    let psi = rng.gen_range(1..=6);
    Stats {
        rapidite: rng.gen_range(1..=6),
        courage: rng.gen_range(1..=6),
        force: rng.gen_range(1..=6),
        habilete: rng.gen_range(1..=6),
        psi,
        psi_max: psi,
        health: 100,
        max_health: 100,
        money: rng.gen_range(2..=12) * 4,
    }
}

fn random_walk(seed: u64, character: Character) -> PlayerState {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let stats = random_stats(&mut rng);
    let mut session = GameSession::new(
        Arc::new(Catalog::load_from_static()),
        RulesConfig::default(),
        PlayerState::new(character, stats),
        DiceRoller::seeded(seed),
        RecordingPresenter::new(),
        Box::new(Discard),
    );
    session.begin().unwrap();

    for step in 0..STEPS {
        if session.state().combat.in_combat {
            let _ = if rng.gen_bool(0.8) {
                session.attack()
            } else {
                session.flee()
            };
        } else {
            let enabled: Vec<usize> = session
                .choices()
                .unwrap()
                .iter()
                .enumerate()
                .filter(|(_, view)| view.enabled)
                .map(|(index, _)| index)
                .collect();
            if enabled.is_empty() {
                let start = session.catalog().start_location(character);
                session.enter(&start).unwrap();
                continue;
            }
            let index = enabled[rng.gen_range(0..enabled.len())];
            let answer = rng.gen_range(0..3);
            session.presenter_mut().queue_answer(Some(answer));
            let _ = session.choose(index);
        }

        let problems = session.state().invariant_violations();
        assert!(
            problems.is_empty(),
            "seed {seed}, step {step}: {problems:?}"
        );
        session.presenter_mut().clear();
    }
    session.into_state()
}

#[test]
fn random_walks_never_break_state_invariants() {
    for seed in 0..6_u64 {
        let character = if seed % 2 == 0 {
            Character::Jonathan
        } else {
            Character::Dracula
        };
        let state = random_walk(seed, character);
        assert!(state.game_time > 0);
        assert!(state.visited_locations.len() > 1);
    }
}

#[test]
fn identical_seeds_replay_identically() {
    let left = random_walk(0xC4A7, Character::Jonathan);
    let right = random_walk(0xC4A7, Character::Jonathan);
    assert_eq!(left, right);
}
