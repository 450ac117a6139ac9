//! Cart
//!
//! The authoritative in-memory cart with durable local persistence. Every
//! mutating operation re-derives the shipping invariant, persists the full
//! state synchronously before returning, and publishes the new state on a
//! watch channel for interested observers (notably the remote synchroniser).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::pricing::{self, PriceBreakdown};

pub mod storage;

use storage::KeyValueStorage;

/// Flat shipping rate charged on any non-empty cart.
pub const FLAT_SHIPPING: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// Errors caught at the edge of the cart, before state is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A line item must carry at least one unit.
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    /// Requested more units than the product has in stock.
    #[error("quantity {quantity} exceeds available stock {stock}")]
    ExceedsStock {
        /// The requested quantity.
        quantity: u32,
        /// The stock captured on the line item.
        stock: u32,
    },

    /// Unit prices are never negative.
    #[error("unit price cannot be negative")]
    NegativePrice,

    /// Checkout was attempted on an empty cart.
    #[error("cannot check out an empty cart")]
    EmptyCart,
}

/// One product entry in the cart, with its captured price and stock snapshot.
///
/// Uniqueness key is `product_id`: the cart holds at most one line per product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    /// Identifier of the product this line refers to.
    pub product_id: String,
    /// Display name captured when the item was added.
    pub name: String,
    /// Product image path captured when the item was added.
    pub image: String,
    /// Price per unit, non-negative.
    pub unit_price: Decimal,
    /// Stock level captured when the item was added.
    pub stock: u32,
    /// Units in the cart, `1..=stock`.
    pub quantity: u32,
}

/// A validated line item ready for insertion into the cart.
///
/// Construction is the single point where line item bounds are enforced; the
/// store itself trusts validated input.
#[derive(Debug, Clone)]
pub struct NewLineItem {
    line: CartLineItem,
}

impl NewLineItem {
    /// Validates and builds a line item.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::NegativePrice`] if `unit_price < 0`.
    /// - [`ValidationError::ZeroQuantity`] if `quantity == 0`.
    /// - [`ValidationError::ExceedsStock`] if `quantity > stock`.
    pub fn new(
        product_id: impl Into<String>,
        name: impl Into<String>,
        image: impl Into<String>,
        unit_price: Decimal,
        stock: u32,
        quantity: u32,
    ) -> Result<Self, ValidationError> {
        if unit_price.is_sign_negative() && !unit_price.is_zero() {
            return Err(ValidationError::NegativePrice);
        }

        if quantity == 0 {
            return Err(ValidationError::ZeroQuantity);
        }

        if quantity > stock {
            return Err(ValidationError::ExceedsStock { quantity, stock });
        }

        Ok(Self {
            line: CartLineItem {
                product_id: product_id.into(),
                name: name.into(),
                image: image.into(),
                unit_price,
                stock,
                quantity,
            },
        })
    }
}

/// The full cart state: line items plus coupon and shipping.
///
/// Invariants, maintained by [`CartStore`]:
///
/// - `shipping == 0` iff the cart is empty, otherwise [`FLAT_SHIPPING`];
/// - `discount_rate` is nonzero only while a recognised coupon is applied;
/// - emptying the cart resets the coupon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    items: Vec<CartLineItem>,
    coupon_code: Option<String>,
    discount_rate: Decimal,
    shipping: Decimal,
}

impl CartState {
    /// The line items currently in the cart.
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// The applied coupon code, if any.
    pub fn coupon_code(&self) -> Option<&str> {
        self.coupon_code.as_deref()
    }

    /// The current discount rate, in `[0, 1]`.
    pub fn discount_rate(&self) -> Decimal {
        self.discount_rate
    }

    /// The current shipping charge.
    pub fn shipping(&self) -> Decimal {
        self.shipping
    }

    /// Whether the cart holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// The authoritative cart.
///
/// Constructed once per application session with an injected storage backend
/// and passed by reference to consumers; cart state is never reached through
/// ambient globals.
#[derive(Debug)]
pub struct CartStore {
    state: CartState,
    storage: Box<dyn KeyValueStorage>,
    changes: watch::Sender<CartState>,
}

impl CartStore {
    /// Builds a store hydrated from `storage`, or empty when nothing durable
    /// exists yet.
    pub fn new(storage: Box<dyn KeyValueStorage>) -> Self {
        let state = storage::read_state(storage.as_ref());
        let (changes, _) = watch::channel(state.clone());

        Self {
            state,
            storage,
            changes,
        }
    }

    /// The current cart state.
    pub fn state(&self) -> &CartState {
        &self.state
    }

    /// Subscribes to cart changes.
    ///
    /// The receiver always observes the latest state at read time, which is
    /// what lets push payloads be read at send time rather than queued.
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.changes.subscribe()
    }

    /// The derived price breakdown for the current state.
    pub fn breakdown(&self) -> PriceBreakdown {
        pricing::compute_breakdown(&self.state)
    }

    /// Adds a line item to the cart.
    ///
    /// If the product is already present the line is replaced wholesale, so
    /// adding quantity N sets the quantity to N rather than incrementing.
    pub fn add_item(&mut self, item: NewLineItem) {
        let line = item.line;

        match self
            .state
            .items
            .iter_mut()
            .find(|existing| existing.product_id == line.product_id)
        {
            Some(existing) => *existing = line,
            None => self.state.items.push(line),
        }

        self.after_mutation();
    }

    /// Removes a line item. Removing an absent product is a no-op.
    pub fn remove_item(&mut self, product_id: &str) {
        let before = self.state.items.len();
        self.state.items.retain(|item| item.product_id != product_id);

        if self.state.items.len() != before {
            self.after_mutation();
        }
    }

    /// Updates a line's quantity in place. A no-op when the product is absent.
    ///
    /// Callers clamp `quantity` to `1..=stock` before calling; quantity bounds
    /// are a concern of the call site, enforced there via [`NewLineItem`]-style
    /// validation.
    pub fn set_quantity(&mut self, product_id: &str, quantity: u32) {
        let Some(item) = self
            .state
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
        else {
            return;
        };

        item.quantity = quantity;
        self.after_mutation();
    }

    /// Applies a coupon code, returning whether it was recognised.
    ///
    /// Unrecognised codes leave the cart untouched so callers can report an
    /// invalid coupon without clearing one that is already applied.
    pub fn apply_coupon(&mut self, code: &str) -> bool {
        let Some(rate) = pricing::coupon_rate(code) else {
            return false;
        };

        self.state.coupon_code = Some(code.to_owned());
        self.state.discount_rate = rate;
        self.after_mutation();

        true
    }

    /// Removes any applied coupon, resetting the discount rate synchronously.
    pub fn clear_coupon(&mut self) {
        self.state.coupon_code = None;
        self.state.discount_rate = Decimal::ZERO;
        self.after_mutation();
    }

    /// Empties the cart, resetting coupon and shipping.
    pub fn clear(&mut self) {
        self.state.items.clear();
        self.after_mutation();
    }

    /// Replaces the whole set of line items, e.g. with a remote cart during a
    /// session-start pull. Last-write-wins at whole-cart granularity.
    pub fn replace_items(&mut self, items: Vec<CartLineItem>) {
        self.state.items = items;
        self.after_mutation();
    }

    /// The line items to submit at checkout.
    ///
    /// # Errors
    ///
    /// [`ValidationError::EmptyCart`] when the cart is empty; the rejection
    /// happens locally, before any network call could be made. On a successful
    /// checkout the caller follows up with [`CartStore::clear`].
    pub fn checkout_items(&self) -> Result<&[CartLineItem], ValidationError> {
        if self.state.items.is_empty() {
            return Err(ValidationError::EmptyCart);
        }

        Ok(&self.state.items)
    }

    /// Re-derives invariants, persists durably, and notifies observers.
    ///
    /// Persistence happens before returning so that a crash immediately after
    /// any operation loses at most the in-flight remote sync.
    fn after_mutation(&mut self) {
        if self.state.items.is_empty() {
            self.state.coupon_code = None;
            self.state.discount_rate = Decimal::ZERO;
            self.state.shipping = Decimal::ZERO;
        } else {
            self.state.shipping = FLAT_SHIPPING;
        }

        storage::write_state(self.storage.as_mut(), &self.state);
        self.changes.send_replace(self.state.clone());
    }
}
