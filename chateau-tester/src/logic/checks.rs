use anyhow::{Result, ensure};
use chateau_game::{Catalog, PlayerState};

/// Fail with every broken invariant of `state`, plus catalog consistency.
pub fn ensure_consistent(state: &PlayerState, catalog: &Catalog) -> Result<()> {
    let problems = state.invariant_violations();
    ensure!(problems.is_empty(), "state invariants broken: {}", problems.join("; "));
    if state.is_placed() {
        ensure!(
            catalog.locations.contains_key(&state.current_location),
            "current location '{}' is not in the catalog",
            state.current_location
        );
    }
    if let Some(narrative) = &state.current_narrative {
        ensure!(
            catalog.narratives.contains_key(narrative),
            "open narrative '{narrative}' is not in the catalog"
        );
    }
    if state.combat.in_combat {
        ensure!(state.combat.enemy.is_some(), "combat flagged without an enemy");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chateau_game::{Character, Stats};

    #[test]
    fn unknown_location_is_flagged() {
        let catalog = Catalog::load_from_static();
        let mut state = PlayerState::new(Character::Jonathan, Stats::default());
        assert!(ensure_consistent(&state, &catalog).is_ok());
        state.move_to("verger");
        let err = ensure_consistent(&state, &catalog).unwrap_err();
        assert!(err.to_string().contains("verger"));
    }

    #[test]
    fn combat_without_enemy_is_flagged() {
        let catalog = Catalog::load_from_static();
        let mut state = PlayerState::new(Character::Dracula, Stats::default());
        state.combat.in_combat = true;
        assert!(ensure_consistent(&state, &catalog).is_err());
    }
}
