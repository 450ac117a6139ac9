//! Durable cart storage.
//!
//! The cart persists to a string key-value area shaped like web storage. Four
//! keys are kept mutually consistent; a reader finding only a subset
//! reconstructs the missing fields from the cart invariants instead of
//! treating partial state as corrupt.

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, PoisonError},
};

use rust_decimal::Decimal;
use tracing::warn;

use crate::pricing;

use super::{CartLineItem, CartState, FLAT_SHIPPING};

/// Storage key holding the JSON array of line items.
pub const ITEMS_KEY: &str = "cartItems";

/// Storage key holding the applied coupon code.
pub const COUPON_KEY: &str = "couponCode";

/// Storage key holding the stringified discount rate.
pub const DISCOUNT_KEY: &str = "discount";

/// Storage key holding the stringified shipping charge.
pub const SHIPPING_KEY: &str = "shipping";

/// A durable string key-value area.
///
/// Implementations back onto whatever the host application has: browser local
/// storage, a settings file, or [`MemoryStorage`] in tests.
pub trait KeyValueStorage: Send + fmt::Debug {
    /// Reads the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str);

    /// Removes the value stored under `key`, if any.
    fn remove(&mut self, key: &str);
}

/// In-memory storage.
///
/// Clones share the backing map, so a clone behaves like a second handle onto
/// the same storage area.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries().insert(key.to_owned(), value.to_owned());
    }

    fn remove(&mut self, key: &str) {
        self.entries().remove(key);
    }
}

/// Persists the full cart state under the four storage keys.
///
/// Serialization failures are logged and skipped; the in-memory cart remains
/// authoritative either way.
pub(crate) fn write_state(storage: &mut dyn KeyValueStorage, state: &CartState) {
    match serde_json::to_string(state.items()) {
        Ok(json) => storage.set(ITEMS_KEY, &json),
        Err(error) => warn!(%error, "failed to serialise cart items; skipping persist"),
    }

    match state.coupon_code() {
        Some(code) => storage.set(COUPON_KEY, code),
        None => storage.remove(COUPON_KEY),
    }

    storage.set(DISCOUNT_KEY, &state.discount_rate().to_string());
    storage.set(SHIPPING_KEY, &state.shipping().to_string());
}

/// Hydrates a cart state from storage.
///
/// The discount rate and shipping charge are re-derived from the invariants
/// rather than trusted from their stored copies, so a partial or stale write
/// can never produce an inconsistent cart.
pub(crate) fn read_state(storage: &dyn KeyValueStorage) -> CartState {
    let items: Vec<CartLineItem> = match storage.get(ITEMS_KEY) {
        Some(json) => serde_json::from_str(&json).unwrap_or_else(|error| {
            warn!(%error, "stored cart items are unreadable; starting empty");
            Vec::new()
        }),
        None => Vec::new(),
    };

    // Empty carts carry no coupon or shipping; otherwise the coupon is
    // honoured only if still recognised, and the rate comes from the coupon
    // rule, never from the stored copy.
    let coupon_code = if items.is_empty() {
        None
    } else {
        storage
            .get(COUPON_KEY)
            .filter(|code| pricing::coupon_rate(code).is_some())
    };

    let discount_rate = coupon_code
        .as_deref()
        .and_then(pricing::coupon_rate)
        .unwrap_or(Decimal::ZERO);

    let shipping = if items.is_empty() {
        Decimal::ZERO
    } else {
        FLAT_SHIPPING
    };

    CartState {
        items,
        coupon_code,
        discount_rate,
        shipping,
    }
}
