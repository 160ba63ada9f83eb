//! Deterministic order resolution.
//!
//! Tiers are tried strictly in order and the first tier with candidates decides:
//!
//! 1. items whose name contains the wish, within budget when one is given: highest price
//! 2. items within budget: highest price
//! 3. whole catalog: lowest price
//!
//! Equal prices resolve to the item that comes first in catalog order.

use serde::{Deserialize, Serialize};

use crate::domain::catalog::CatalogItem;
use crate::domain::order::OrderStatus;

pub const NO_MATCH_REASON: &str = "no catalog item matches the requested wish and budget";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    WishWithinBudget,
    BestWithinBudget,
    Cheapest,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Confirmed { item: CatalogItem, tier: ResolutionTier },
    NoMatch { reason: String },
    Error { reason: String },
}

impl ResolutionOutcome {
    pub fn status(&self) -> OrderStatus {
        match self {
            Self::Confirmed { .. } => OrderStatus::Confirmed,
            Self::NoMatch { .. } => OrderStatus::NoMatch,
            Self::Error { .. } => OrderStatus::Error,
        }
    }

    pub fn chosen_item(&self) -> Option<&CatalogItem> {
        match self {
            Self::Confirmed { item, .. } => Some(item),
            _ => None,
        }
    }
}

pub fn resolve(
    catalog: &[CatalogItem],
    wish: Option<&str>,
    budget: Option<u64>,
) -> ResolutionOutcome {
    let affordable = |item: &&CatalogItem| budget.map_or(true, |limit| item.price <= limit);

    if let Some(wish) = wish.filter(|wish| !wish.is_empty()) {
        let wished = catalog.iter().filter(|item| item.name.contains(wish)).filter(affordable);
        if let Some(item) = highest_priced(wished) {
            return confirmed(item, ResolutionTier::WishWithinBudget);
        }
    }

    if budget.is_some() {
        if let Some(item) = highest_priced(catalog.iter().filter(affordable)) {
            return confirmed(item, ResolutionTier::BestWithinBudget);
        }
    }

    match lowest_priced(catalog.iter()) {
        Some(item) => confirmed(item, ResolutionTier::Cheapest),
        None => ResolutionOutcome::NoMatch { reason: NO_MATCH_REASON.to_string() },
    }
}

fn confirmed(item: &CatalogItem, tier: ResolutionTier) -> ResolutionOutcome {
    ResolutionOutcome::Confirmed { item: item.clone(), tier }
}

// Iterator::max_by_key keeps the last maximum; ties must go to the first.
fn highest_priced<'a>(items: impl Iterator<Item = &'a CatalogItem>) -> Option<&'a CatalogItem> {
    items.fold(None, |best, item| match best {
        Some(best) if best.price >= item.price => Some(best),
        _ => Some(item),
    })
}

fn lowest_priced<'a>(items: impl Iterator<Item = &'a CatalogItem>) -> Option<&'a CatalogItem> {
    items.min_by_key(|item| item.price)
}
