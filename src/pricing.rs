//! Pricing
//!
//! Derived price breakdowns for a cart. Everything here is a total function of a
//! [`CartState`]: malformed line items are rejected when they enter the cart, so
//! no pricing calculation can fail.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::cart::CartState;

/// Tax rate applied to the discounted subtotal (8%).
pub const TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

/// The one coupon code the storefront currently recognises.
pub const COUPON_DISCOUNT50: &str = "discount50";

/// Discount rate granted by [`COUPON_DISCOUNT50`] (50%).
const DISCOUNT50_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// The derived prices for a cart.
///
/// Values keep full precision; call [`PriceBreakdown::rounded`] when rendering.
/// A breakdown is recomputed from the cart on demand, never cached across
/// mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceBreakdown {
    /// Sum of `unit_price * quantity` over all line items.
    pub subtotal: Decimal,
    /// `subtotal * discount_rate`.
    pub discount_amount: Decimal,
    /// Flat shipping charge carried on the cart state.
    pub shipping: Decimal,
    /// `(subtotal - discount_amount) * TAX_RATE`.
    pub tax: Decimal,
    /// `subtotal - discount_amount + shipping + tax`.
    pub total: Decimal,
}

impl PriceBreakdown {
    /// A copy of this breakdown with every value rounded to 2 decimal places,
    /// for presentation only.
    pub fn rounded(&self) -> Self {
        let round = |value: Decimal| {
            value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        };

        PriceBreakdown {
            subtotal: round(self.subtotal),
            discount_amount: round(self.discount_amount),
            shipping: round(self.shipping),
            tax: round(self.tax),
            total: round(self.total),
        }
    }
}

/// Calculates the full price breakdown for a cart.
///
/// No intermediate rounding is performed; the identity
/// `total == subtotal - discount_amount + shipping + tax` holds exactly.
pub fn compute_breakdown(cart: &CartState) -> PriceBreakdown {
    let subtotal: Decimal = cart
        .items()
        .iter()
        .map(|item| item.unit_price * Decimal::from(item.quantity))
        .sum();

    let discount_amount = subtotal * cart.discount_rate();
    let tax = (subtotal - discount_amount) * TAX_RATE;
    let total = subtotal - discount_amount + cart.shipping() + tax;

    PriceBreakdown {
        subtotal,
        discount_amount,
        shipping: cart.shipping(),
        tax,
        total,
    }
}

/// Looks up the discount rate for a coupon code.
///
/// Returns `None` for unrecognised codes so callers can surface an "invalid
/// coupon" signal distinct from "no coupon applied".
pub fn coupon_rate(code: &str) -> Option<Decimal> {
    match code {
        COUPON_DISCOUNT50 => Some(DISCOUNT50_RATE),
        _ => None,
    }
}
