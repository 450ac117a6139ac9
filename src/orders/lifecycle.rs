//! Order lifecycle.
//!
//! The status transition relation and the guard predicates the UI consults
//! before offering an action. Guards are advisory: the server is the final
//! authority and can still reject a transition the client believed valid, so
//! a guard failure reaching a user indicates a stale cache, not normal
//! operation.
//!
//! ```text
//! pending -> processing -> shipped -> delivered
//! pending -> canceled
//! processing -> canceled    (only if not yet paid)
//! delivered -> refunded     (via explicit refund request)
//! ```

use std::collections::HashMap;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::models::{Order, OrderStatus};

impl OrderStatus {
    /// Whether no further transition is possible from this status.
    ///
    /// `Delivered` is not terminal: a refund request can still move it.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Canceled | OrderStatus::Refunded)
    }

    /// Whether the lifecycle permits moving from this status to `next`.
    ///
    /// Payment constraints are layered on top by the guard predicates; this
    /// is the structural relation only.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::{Canceled, Delivered, Pending, Processing, Refunded, Shipped};

        matches!(
            (self, next),
            (Pending, Processing)
                | (Processing, Shipped)
                | (Shipped, Delivered)
                | (Pending | Processing, Canceled)
                | (Delivered, Refunded)
        )
    }
}

impl Order {
    /// Whether the order can be canceled outright.
    ///
    /// Paid orders are never directly cancelable; they go through the refund
    /// flow instead.
    pub fn is_cancelable(&self) -> bool {
        !self.is_paid
            && matches!(self.status, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Whether a refund can be requested.
    ///
    /// Covers both paid in-flight orders (shipped or delivered) and the
    /// "cancel a paid-but-undelivered order" path; the two differ only in the
    /// reason taxonomy offered to the user, not in code path.
    pub fn is_refund_requestable(&self) -> bool {
        if !self.is_paid || self.status.is_terminal() {
            return false;
        }

        matches!(self.status, OrderStatus::Shipped | OrderStatus::Delivered)
            || !self.is_delivered
    }

    /// Whether the order can be deleted by a client action.
    ///
    /// Orders past processing are retained for history.
    pub fn is_deletable(&self) -> bool {
        matches!(self.status, OrderStatus::Pending | OrderStatus::Processing)
    }
}

/// A client-local record that a cancellation (refund) has been requested for
/// an order the server has not yet transitioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationRequest {
    /// The order the request concerns.
    pub order_id: String,
    /// Reason chosen from the offered taxonomy.
    pub reason: String,
    /// Free-text notes from the user.
    pub notes: String,
    /// When the request was made.
    pub requested_at: Timestamp,
}

/// Client-local ledger of pending cancellation requests, keyed by order id.
///
/// Entries are removed only by explicit clearing; there is no expiry and no
/// server reconciliation, so a marker can outlive an order the server has
/// already transitioned.
#[derive(Debug, Default)]
pub struct CancellationLog {
    requests: HashMap<String, CancellationRequest>,
}

impl CancellationLog {
    /// Records a request, replacing any previous one for the same order.
    pub fn record(&mut self, request: CancellationRequest) {
        self.requests.insert(request.order_id.clone(), request);
    }

    /// The pending request for an order, if any.
    pub fn pending_for(&self, order_id: &str) -> Option<&CancellationRequest> {
        self.requests.get(order_id)
    }

    /// Whether a cancellation is pending for an order.
    pub fn is_pending(&self, order_id: &str) -> bool {
        self.requests.contains_key(order_id)
    }

    /// Explicitly clears the pending marker for an order.
    pub fn clear(&mut self, order_id: &str) {
        self.requests.remove(order_id);
    }
}
