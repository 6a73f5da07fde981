// src/cart.rs

use crate::{
    constants::{keys, pricing},
    error::AppResult,
    models::{CartItem, Offering},
    storage::{self, SharedStore},
};
use chrono::Utc;
use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartTotals {
    pub subtotal: u64,
    pub discount: u64,
    pub total: u64,
    pub count: u32,
}

/// Pure pricing over a list of line items.
///
/// The bundle discount is flat and all-or-nothing: it applies in full only when both the
/// trigger and the pack offerings are present, whatever else the cart holds.
pub fn compute_totals(items: &[CartItem]) -> CartTotals {
    let subtotal = items
        .iter()
        .map(CartItem::line_total)
        .fold(0u64, u64::saturating_add);
    let has_trigger = items.iter().any(|i| i.id() == pricing::BUNDLE_TRIGGER_ID);
    let has_pack = items.iter().any(|i| i.id() == pricing::BUNDLE_PACK_ID);
    let discount = if has_trigger && has_pack {
        pricing::BUNDLE_DISCOUNT
    } else {
        0
    };
    CartTotals {
        subtotal,
        discount,
        total: subtotal.saturating_sub(discount),
        count: items.iter().map(|i| i.quantity).sum(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    Incremented(u32),
    AlreadyPresent,
}

/// Line items plus the drawer's open/closed state. Every mutation is written through
/// to durable storage under the cart key.
pub struct CartEngine {
    items: Vec<CartItem>,
    is_open: bool,
    store: SharedStore,
}

impl CartEngine {
    /// Seeds the cart from storage; a missing or corrupt value yields an empty cart.
    pub fn load(store: SharedStore) -> Self {
        let items: Vec<CartItem> = storage::load_json(store.as_ref(), keys::CART).unwrap_or_default();
        debug!("Panier initialisé avec {} article(s)", items.len());
        Self {
            items,
            is_open: false,
            store,
        }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn contains(&self, offering_id: &str) -> bool {
        self.items.iter().any(|i| i.id() == offering_id)
    }

    pub fn totals(&self) -> CartTotals {
        compute_totals(&self.items)
    }

    pub fn add_item(&mut self, offering: &Offering) -> AppResult<AddOutcome> {
        self.add_item_at(offering, Utc::now().timestamp_millis())
    }

    pub fn add_item_at(&mut self, offering: &Offering, now_ms: i64) -> AppResult<AddOutcome> {
        self.is_open = true;
        let outcome = match self.items.iter_mut().find(|i| i.id() == offering.id) {
            Some(existing) if offering.id == pricing::KIT_OFFERING_ID => {
                existing.quantity += 1;
                AddOutcome::Incremented(existing.quantity)
            }
            Some(_) => AddOutcome::AlreadyPresent,
            None => {
                self.items.push(CartItem {
                    offering: offering.clone(),
                    quantity: 1,
                    added_at: now_ms,
                });
                AddOutcome::Added
            }
        };
        if outcome != AddOutcome::AlreadyPresent {
            info!("Panier: '{}' -> {:?}", offering.id, outcome);
            self.persist()?;
        }
        Ok(outcome)
    }

    /// Removing an id that is not in the cart is a silent no-op.
    pub fn remove_item(&mut self, offering_id: &str) -> AppResult<bool> {
        let before = self.items.len();
        self.items.retain(|i| i.id() != offering_id);
        if self.items.len() == before {
            return Ok(false);
        }
        info!("Panier: '{}' retiré", offering_id);
        self.persist()?;
        Ok(true)
    }

    /// Empties the cart and closes the drawer. Safe to call repeatedly.
    pub fn clear(&mut self) -> AppResult<()> {
        self.is_open = false;
        if self.items.is_empty() {
            return Ok(());
        }
        self.items.clear();
        info!("Panier vidé");
        self.persist()
    }

    pub fn open(&mut self) {
        self.is_open = true;
    }

    pub fn toggle(&mut self) {
        self.is_open = !self.is_open;
    }

    fn persist(&self) -> AppResult<()> {
        storage::save_json(self.store.as_ref(), keys::CART, &self.items).inspect_err(|e| {
            warn!("Sauvegarde du panier impossible: {}", e);
        })
    }
}
