//! Inventory changes that the player sees: loot, gifts and consumables.
use crate::context::EngineContext;
use crate::data::{ItemEffectKind, Magnitude, MagnitudeKeyword};
use crate::error::GameError;
use crate::presentation::Severity;
use crate::state::InventoryItem;

/// Result of using an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUse {
    pub name: String,
    pub health: i32,
    pub psi: i32,
    pub consumed: bool,
}

/// Put `item` in the inventory and announce it.
pub fn grant(ctx: &mut EngineContext<'_>, item: InventoryItem) {
    let label = item.label(ctx.catalog).to_string();
    ctx.state.inventory.add(item);
    log::debug!("inventory gained '{label}'");
    ctx.notify(&format!("Vous obtenez : {label}"), Severity::Success);
}

/// Drink or apply the first held item answering to `key`.
///
/// # Errors
///
/// Returns [`GameError::ItemNotHeld`] when nothing matches,
/// [`GameError::UnknownItem`] for an id the catalog does not know and
/// [`GameError::ItemHasNoUse`] for items without a health or PSI effect.
pub fn use_item(ctx: &mut EngineContext<'_>, key: &str) -> Result<ItemUse, GameError> {
    let catalog = ctx.catalog;
    let Some(index) = ctx.state.inventory.position(key) else {
        return Err(ctx.reject(GameError::ItemNotHeld(key.to_string())));
    };
    let resolved = ctx
        .state
        .inventory
        .get(index)
        .and_then(|entry| entry.resolve(catalog))
        .cloned();
    let Some(item) = resolved else {
        return Err(ctx.reject(GameError::UnknownItem(key.to_string())));
    };
    let Some(effect) = item.effect.as_ref() else {
        return Err(ctx.reject(GameError::ItemHasNoUse(item.name)));
    };
    let magnitude = effect
        .value
        .unwrap_or(Magnitude::Keyword(MagnitudeKeyword::Full));

    let stats = &mut ctx.state.stats;
    let (health, psi) = match effect.kind {
        ItemEffectKind::Health => {
            let amount = magnitude.resolve(stats.health, stats.max_health);
            (stats.adjust_health(amount), 0)
        }
        ItemEffectKind::Psi => {
            let amount = magnitude.resolve(stats.psi, stats.psi_max);
            (0, stats.adjust_psi(amount))
        }
        ItemEffectKind::ReduceDamage | ItemEffectKind::Repel | ItemEffectKind::RepelUndead => {
            return Err(ctx.reject(GameError::ItemHasNoUse(item.name)));
        }
    };

    let consumed = item.single_use && ctx.state.inventory.remove_at(index).is_some();
    log::debug!("used '{}': health {health:+}, psi {psi:+}", item.name);
    let text = match (health, psi) {
        (0, 0) => format!("{} n'a aucun effet.", item.name),
        (h, 0) => format!("{} : vous récupérez {h} PV.", item.name),
        (_, p) => format!("{} : vous récupérez {p} PSI.", item.name),
    };
    ctx.notify(&text, Severity::Success);
    ctx.persist();
    Ok(ItemUse {
        name: item.name,
        health,
        psi,
        consumed,
    })
}
