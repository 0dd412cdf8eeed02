use std::sync::Arc;

use chateau_game::navigation::SearchOutcome;
use chateau_game::{
    ActiveEffect, Catalog, Character, ChoiceOutcome, CombatOutcome, CreationGate, EffectKind,
    EmbeddedData, GameEngine, GameError, GameSession, GameStorage, InventoryItem, MemoryStorage,
    PersistenceGateway, PlayerState, RecordingPresenter, RulesConfig, SaveSlot, ScriptedDice,
    StatKind, Stats,
};

const SLOT: &str = "autosave";

fn stats(force: i32, habilete: i32) -> Stats {
    Stats {
        rapidite: 0,
        courage: 3,
        force,
        habilete,
        psi: 3,
        psi_max: 3,
        health: 100,
        max_health: 100,
        money: 24,
    }
}

fn session_at(
    location: &str,
    character: Character,
    stats: Stats,
    dice: ScriptedDice,
    presenter: RecordingPresenter,
) -> (GameSession<RecordingPresenter, ScriptedDice>, MemoryStorage) {
    let storage = MemoryStorage::new();
    let mut state = PlayerState::new(character, stats);
    state.move_to(location);
    let session = GameSession::new(
        Arc::new(Catalog::load_from_static()),
        RulesConfig::default(),
        state,
        dice,
        presenter,
        Box::new(SaveSlot::new(storage.clone(), SLOT)),
    );
    (session, storage)
}

#[test]
fn zombie_fight_is_reproducible_and_saved_mid_combat() {
    let (mut session, storage) = session_at(
        "cimetiere",
        Character::Jonathan,
        stats(4, 3),
        ScriptedDice::with_totals(&[12, 7]),
        RecordingPresenter::new(),
    );
    session.start_combat("zombie").unwrap();
    let saved = storage.load_game(SLOT).unwrap().expect("combat start is saved");
    assert!(saved.combat.in_combat);
    assert_eq!(saved.combat.round, 1);

    let exchange = session.attack().unwrap();
    assert_eq!(exchange.player.map(|s| s.damage), Some(12));
    assert_eq!(exchange.enemy.map(|s| s.damage), Some(3));
    let state = session.state();
    assert_eq!(state.combat.enemy.as_ref().map(|e| e.health), Some(13));
    assert_eq!(state.stats.health, 97);
    assert_eq!(state.combat.round, 2);
    assert_eq!(session.catalog().enemy("zombie").unwrap().health, 25);
}

#[test]
fn victory_records_the_enemy_and_hands_out_loot() {
    let (mut session, _storage) = session_at(
        "jardin-contrebas",
        Character::Jonathan,
        stats(30, 3),
        ScriptedDice::with_totals(&[8]),
        RecordingPresenter::new(),
    );
    session.start_combat("loup").unwrap();
    let exchange = session.attack().unwrap();

    assert_eq!(exchange.outcome, Some(CombatOutcome::Victory));
    assert!(exchange.enemy.is_none());
    let state = session.state();
    assert!(!state.combat.in_combat);
    assert!(state.combat.enemy.is_none());
    assert!(state.defeated_enemies.contains("loup"));
    assert!(state.inventory.contains("ail"));
    assert!(session.presenter().has_message("Vous obtenez"));
    assert!(state.invariant_violations().is_empty());
}

#[test]
fn defeat_restores_half_health_rounded_up() {
    let mut weak = stats(1, 3);
    weak.health = 3;
    weak.max_health = 101;
    let (mut session, storage) = session_at(
        "cimetiere",
        Character::Jonathan,
        weak,
        ScriptedDice::with_totals(&[2, 7]),
        RecordingPresenter::new(),
    );
    session.start_combat("zombie").unwrap();
    let exchange = session.attack().unwrap();

    assert_eq!(exchange.outcome, Some(CombatOutcome::Defeat));
    assert_eq!(session.state().stats.health, 51);
    assert!(!session.state().combat.in_combat);
    assert!(!session.state().defeated_enemies.contains("zombie"));
    let saved = storage.load_game(SLOT).unwrap().unwrap();
    assert_eq!(saved.stats.health, 51);
    assert!(!saved.combat.in_combat);
}

#[test]
fn snapshot_round_trips_every_part_of_the_state() {
    let (mut session, storage) = session_at(
        "cimetiere",
        Character::Dracula,
        stats(4, 3),
        ScriptedDice::new(),
        RecordingPresenter::new(),
    );
    let panacea = session
        .catalog()
        .narrative("buffet-verrouille")
        .unwrap()
        .item_gained
        .clone()
        .unwrap();
    session.with_state_mut(|state| {
        state.inventory.add(InventoryItem::Id("pieu".to_string()));
        state.inventory.add(InventoryItem::Item(panacea));
        state.active_effects.apply(
            "batForm",
            ActiveEffect::buff("Forme de chauve-souris", "", EffectKind::Marker, 3),
        );
        state.game_time = 9;
    });
    session.start_combat("chauve-souris-vampire").unwrap();

    let slot = SaveSlot::new(storage.clone(), SLOT);
    let restored = slot.load().expect("snapshot exists");
    assert_eq!(&restored, session.state());
    assert_eq!(restored.inventory.len(), 2);
    assert_eq!(
        restored.inventory.get(1).map(|item| item.label(session.catalog())),
        Some("Panacée de Nostradamus")
    );

    let engine = GameEngine::new(EmbeddedData, storage);
    let rehydrated = engine.load_game(SLOT).unwrap().unwrap();
    assert!(rehydrated.combat.in_combat);
    assert_eq!(rehydrated, restored);
}

#[test]
fn force_gate_on_the_castle_door() {
    let (mut weak, _) = session_at(
        "porte-chateau",
        Character::Jonathan,
        stats(4, 3),
        ScriptedDice::new(),
        RecordingPresenter::new(),
    );
    let views = weak.choices().unwrap();
    assert!(!views[2].enabled);
    assert!(views[2].text.contains("Force 5 requise"));
    let before = weak.state().clone();
    assert!(matches!(
        weak.choose(2),
        Err(GameError::ChoiceDisabled(_))
    ));
    assert_eq!(weak.state(), &before);
    assert!(weak.presenter().has_message("Ce choix n'est pas disponible."));

    let (mut strong, _) = session_at(
        "porte-chateau",
        Character::Jonathan,
        stats(5, 3),
        ScriptedDice::new(),
        RecordingPresenter::new(),
    );
    assert!(strong.choices().unwrap()[2].enabled);
    let outcome = strong.choose(2).unwrap();
    assert!(matches!(outcome, ChoiceOutcome::Moved(ref arrival) if arrival.location == "vestibule"));
    assert_eq!(
        strong.state().previous_location.as_deref(),
        Some("porte-chateau")
    );
}

#[test]
fn start_stays_locked_until_the_fortune_is_rolled() {
    let mut gate = CreationGate::new();
    let mut dice = ScriptedDice::with_faces(&[3, 5, 4, 6, 2, 3, 4]);
    assert!(matches!(
        gate.roll_fortune_for(Character::Jonathan, &mut dice),
        Err(GameError::StatsIncomplete { missing: 5, .. })
    ));
    for stat in StatKind::ALL {
        gate.roll_stat(Character::Jonathan, stat, &mut dice).unwrap();
    }
    assert!(!gate.can_start(Character::Jonathan));
    assert!(gate.finish(Character::Jonathan, &RulesConfig::default()).is_err());

    assert_eq!(gate.roll_fortune_for(Character::Jonathan, &mut dice), Ok(28));
    assert!(gate.can_start(Character::Jonathan));
    assert!(!gate.can_start(Character::Dracula));
    let state = gate
        .finish(Character::Jonathan, &RulesConfig::default())
        .unwrap();
    assert_eq!(state.stats.money, 28);
    assert_eq!(state.stats.rapidite, 3);
    assert_eq!(state.stats.psi_max, state.stats.psi);
    assert!(!state.is_placed());
}

#[test]
fn effects_expire_after_their_duration_in_moves() {
    let (mut session, _) = session_at(
        "allee",
        Character::Jonathan,
        stats(4, 3),
        ScriptedDice::new(),
        RecordingPresenter::new(),
    );
    session.with_state_mut(|state| {
        state.active_effects.apply(
            "sanctification",
            ActiveEffect::buff("Sanctification", "", EffectKind::DefenseMod, 2).with_value(2),
        );
    });

    let first = session.enter("portail").unwrap();
    assert!(first.expired_effects.is_empty());
    assert_eq!(
        session.state().active_effects.modifier(EffectKind::DefenseMod),
        2
    );
    let second = session.enter("allee").unwrap();
    assert_eq!(second.expired_effects, vec!["sanctification".to_string()]);
    assert!(session.state().active_effects.is_empty());
    assert_eq!(session.state().game_time, 2);
}

#[test]
fn secret_passage_is_found_and_taken() {
    let (mut session, _) = session_at(
        "portail",
        Character::Jonathan,
        stats(4, 6),
        ScriptedDice::new().chances(&[true]),
        RecordingPresenter::with_answers(&[Some(0)]),
    );
    let outcome = session.choose(2).unwrap();
    assert_eq!(
        outcome,
        ChoiceOutcome::Search(SearchOutcome::Taken("cour-honneur".to_string()))
    );
    assert_eq!(session.state().current_location, "cour-honneur");
    assert_eq!(session.presenter().prompts(), 1);
}

#[test]
fn locked_buffet_grants_its_potion_once() {
    let (mut session, _) = session_at(
        "salle-manger",
        Character::Jonathan,
        stats(4, 3),
        ScriptedDice::new(),
        RecordingPresenter::new(),
    );
    assert!(!session.choices().unwrap()[1].enabled);
    session.with_state_mut(|state| state.inventory.add(InventoryItem::Id("cle-cuivre".into())));

    let opened = session.choose(1).unwrap();
    assert_eq!(opened, ChoiceOutcome::Narrative("buffet-verrouille".to_string()));
    session.choose(0).unwrap();
    session.choose(1).unwrap();

    let potions = session
        .state()
        .inventory
        .iter()
        .filter(|item| item.matches("elixir-nostradamus"))
        .count();
    assert_eq!(potions, 1);

    session.with_state_mut(|state| state.stats.health = 40);
    let used = session.use_item("elixir-nostradamus").unwrap();
    assert!(used.consumed);
    assert_eq!(session.state().stats.health, 100);
    assert!(!session.state().inventory.contains("elixir-nostradamus"));
}

#[test]
fn unregistered_action_is_refused_without_side_effects() {
    let (mut session, storage) = session_at(
        "allee",
        Character::Jonathan,
        stats(4, 3),
        ScriptedDice::new(),
        RecordingPresenter::new(),
    );
    let before = session.state().clone();
    assert_eq!(
        session.choose(4),
        Err(GameError::UnregisteredAction("bibliotheque".to_string()))
    );
    assert_eq!(session.state(), &before);
    assert!(storage.raw(SLOT).is_none());
    assert!(session.presenter().has_message("Cette action n'est pas disponible."));
}
