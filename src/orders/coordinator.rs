//! Order action coordination.
//!
//! Orchestrates cancel/refund/delete requests: validates against the local
//! lifecycle guards, deduplicates concurrent identical requests per order,
//! dispatches to the remote gateway, and applies the optimistic-update rule:
//! on success the cached order is replaced with the server's representation,
//! on failure the cache is left untouched. Nothing is retried automatically.

use std::{
    collections::HashMap,
    fmt,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::future::{BoxFuture, FutureExt, Shared};
use jiff::{SignedDuration, Timestamp};
use thiserror::Error;
use tracing::debug;

use crate::gateway::GatewayError;

use super::{
    gateway::OrderGateway,
    lifecycle::{CancellationLog, CancellationRequest},
    models::{Order, PaymentDetails},
};

/// Status the order service uses to reject cancellation of a paid order.
const PAID_CANCEL_STATUS: u16 = 409;

/// The kind of order action being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Cancel an unpaid order outright.
    Cancel,
    /// Request a refund for a paid order.
    Refund,
    /// Delete an order from the user's history.
    Delete,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionKind::Cancel => "cancel",
            ActionKind::Refund => "refund",
            ActionKind::Delete => "delete",
        })
    }
}

/// Errors surfaced by order actions.
///
/// Clone so that deduplicated callers can all observe the one in-flight
/// result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    /// The order is not in the local cache.
    #[error("order {order_id} is not known locally")]
    UnknownOrder {
        /// The requested order id.
        order_id: String,
    },

    /// The local lifecycle guard forbids the action; no network call was
    /// made.
    #[error("{kind} is not permitted for order {order_id} in its current state")]
    Guard {
        /// The requested order id.
        order_id: String,
        /// The action that was refused.
        kind: ActionKind,
    },

    /// The server refused to cancel a paid order. Not a dead end: callers
    /// re-route to the refund flow.
    #[error("order is already paid; request a refund instead")]
    PaidOrderCancelRejected,

    /// The server rejected the action; `message` is the server's own text.
    #[error("order action rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code of the rejection.
        status: u16,
        /// The server's message.
        message: String,
    },

    /// Transport-level failure reaching the order service.
    #[error("order gateway unreachable: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
    },
}

impl From<GatewayError> for ActionError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Rejected { status, message } => Self::Rejected { status, message },
            GatewayError::Transport(error) => Self::Transport {
                message: error.to_string(),
            },
        }
    }
}

/// A dispatched order-updating call, carrying its per-kind payload.
enum UpdateCall {
    Cancel { request_refund: bool },
    Refund { reason: String, notes: String },
}

impl UpdateCall {
    fn kind(&self) -> ActionKind {
        match self {
            UpdateCall::Cancel { .. } => ActionKind::Cancel,
            UpdateCall::Refund { .. } => ActionKind::Refund,
        }
    }
}

type InFlight<T> = Shared<BoxFuture<'static, Result<T, ActionError>>>;

/// Joins the in-flight entry under `key`, or inserts a freshly dispatched
/// one. Returns the shared future and whether this call owns it.
///
/// `peek()` is `Some` once a shared future has completed; a finished entry
/// must not serve a later request, so it is replaced rather than joined.
fn claim<K, T>(
    map: &Mutex<HashMap<K, InFlight<T>>>,
    key: &K,
    dispatch: impl FnOnce() -> InFlight<T>,
) -> (InFlight<T>, bool)
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    let mut in_flight = map.lock().unwrap_or_else(PoisonError::into_inner);

    match in_flight.get(key) {
        Some(existing) if existing.peek().is_none() => (existing.clone(), false),
        _ => {
            let action = dispatch();
            in_flight.insert(key.clone(), action.clone());
            (action, true)
        }
    }
}

/// Removes `entry` from the in-flight map, but only if it is still the one
/// stored under `key`. A successor may have already replaced a completed
/// entry before its owner resumed; that successor's entry must survive.
fn release<K, T>(map: &Mutex<HashMap<K, InFlight<T>>>, key: &K, entry: &InFlight<T>)
where
    K: Eq + Hash,
    T: Clone,
{
    let mut in_flight = map.lock().unwrap_or_else(PoisonError::into_inner);

    if in_flight.get(key).is_some_and(|current| current.ptr_eq(entry)) {
        in_flight.remove(key);
    }
}

#[derive(Debug, Default)]
struct OrderCache {
    orders: HashMap<String, Order>,
    refreshed_at: Option<Timestamp>,
}

/// Coordinates order actions against the remote gateway.
///
/// Holds its gateway dependency from construction (no runtime lookups), a
/// read-mostly cache of the user's orders, the in-flight maps used for
/// per-`(order, kind)` deduplication, and the client-local cancellation
/// ledger.
pub struct OrderActionCoordinator {
    gateway: Arc<dyn OrderGateway>,
    cache: Mutex<OrderCache>,
    updates_in_flight: Mutex<HashMap<(String, ActionKind), InFlight<Order>>>,
    deletions_in_flight: Mutex<HashMap<String, InFlight<()>>>,
    cancellations: Mutex<CancellationLog>,
}

impl fmt::Debug for OrderActionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderActionCoordinator")
            .finish_non_exhaustive()
    }
}

impl OrderActionCoordinator {
    /// Builds a coordinator over the given gateway with an empty cache.
    pub fn new(gateway: Arc<dyn OrderGateway>) -> Self {
        Self {
            gateway,
            cache: Mutex::new(OrderCache::default()),
            updates_in_flight: Mutex::new(HashMap::new()),
            deletions_in_flight: Mutex::new(HashMap::new()),
            cancellations: Mutex::new(CancellationLog::default()),
        }
    }

    /// Seeds or updates the cached copy of an order.
    pub fn record(&self, order: Order) {
        self.cache_guard().orders.insert(order.id.clone(), order);
    }

    /// The cached copy of an order, if known.
    pub fn cached(&self, order_id: &str) -> Option<Order> {
        self.cache_guard().orders.get(order_id).cloned()
    }

    /// All cached orders, in no particular order.
    pub fn orders(&self) -> Vec<Order> {
        self.cache_guard().orders.values().cloned().collect()
    }

    /// Replaces the cache with a fresh listing from the server.
    ///
    /// # Errors
    ///
    /// Returns an [`ActionError`] on gateway failure; the cache is left
    /// untouched in that case.
    pub async fn refresh(&self, include_all: bool) -> Result<(), ActionError> {
        let orders = self.gateway.list_mine(include_all).await?;

        let mut cache = self.cache_guard();
        cache.orders = orders
            .into_iter()
            .map(|order| (order.id.clone(), order))
            .collect();
        cache.refreshed_at = Some(Timestamp::now());

        Ok(())
    }

    /// Refreshes the cache only when it is older than `max_age`.
    ///
    /// This is the single revalidation policy for order freshness; screens
    /// consult the cache rather than polling the server themselves. Returns
    /// whether a refresh was performed.
    ///
    /// # Errors
    ///
    /// Returns an [`ActionError`] when a refresh was due and failed.
    pub async fn refresh_if_stale(
        &self,
        max_age: SignedDuration,
        include_all: bool,
    ) -> Result<bool, ActionError> {
        let stale = self
            .cache_guard()
            .refreshed_at
            .is_none_or(|at| Timestamp::now().duration_since(at) >= max_age);

        if !stale {
            debug!("order cache still fresh; skipping refresh");
            return Ok(false);
        }

        self.refresh(include_all).await?;

        Ok(true)
    }

    /// Requests cancellation of an order.
    ///
    /// # Errors
    ///
    /// - [`ActionError::UnknownOrder`] / [`ActionError::Guard`] before any
    ///   network call.
    /// - [`ActionError::PaidOrderCancelRejected`] when the server detects a
    ///   paid order; callers re-route to [`Self::request_refund`].
    /// - [`ActionError::Rejected`] / [`ActionError::Transport`] otherwise.
    pub async fn request_cancel(&self, order_id: &str) -> Result<Order, ActionError> {
        let order = self.cached_or_unknown(order_id)?;

        if !order.is_cancelable() {
            return Err(ActionError::Guard {
                order_id: order_id.to_owned(),
                kind: ActionKind::Cancel,
            });
        }

        self.run_update(
            order_id,
            UpdateCall::Cancel {
                request_refund: false,
            },
        )
        .await
    }

    /// Requests a refund for an order and records the client-local
    /// cancellation-pending marker.
    ///
    /// # Errors
    ///
    /// As [`Self::request_cancel`], minus the paid-order re-route.
    pub async fn request_refund(
        &self,
        order_id: &str,
        reason: &str,
        notes: &str,
    ) -> Result<Order, ActionError> {
        let order = self.cached_or_unknown(order_id)?;

        if !order.is_refund_requestable() {
            return Err(ActionError::Guard {
                order_id: order_id.to_owned(),
                kind: ActionKind::Refund,
            });
        }

        let order = self
            .run_update(
                order_id,
                UpdateCall::Refund {
                    reason: reason.to_owned(),
                    notes: notes.to_owned(),
                },
            )
            .await?;

        self.cancellations_guard().record(CancellationRequest {
            order_id: order_id.to_owned(),
            reason: reason.to_owned(),
            notes: notes.to_owned(),
            requested_at: Timestamp::now(),
        });

        Ok(order)
    }

    /// Requests deletion of an order; on success the cached copy is dropped.
    ///
    /// # Errors
    ///
    /// As [`Self::request_cancel`], minus the paid-order re-route.
    pub async fn request_delete(&self, order_id: &str) -> Result<(), ActionError> {
        let order = self.cached_or_unknown(order_id)?;

        if !order.is_deletable() {
            return Err(ActionError::Guard {
                order_id: order_id.to_owned(),
                kind: ActionKind::Delete,
            });
        }

        self.run_delete(order_id).await
    }

    /// Forwards payment confirmation; the server decides validity, so no
    /// local guard applies.
    ///
    /// # Errors
    ///
    /// Returns an [`ActionError`] on gateway failure.
    pub async fn pay(
        &self,
        order_id: &str,
        details: PaymentDetails,
    ) -> Result<Order, ActionError> {
        let order = self.gateway.pay(order_id, details).await?;

        self.record(order.clone());

        Ok(order)
    }

    /// The pending cancellation marker for an order, if any.
    pub fn cancellation_pending(&self, order_id: &str) -> Option<CancellationRequest> {
        self.cancellations_guard().pending_for(order_id).cloned()
    }

    /// Explicitly clears the pending cancellation marker for an order.
    pub fn clear_cancellation(&self, order_id: &str) {
        self.cancellations_guard().clear(order_id);
    }

    fn cached_or_unknown(&self, order_id: &str) -> Result<Order, ActionError> {
        self.cached(order_id).ok_or_else(|| ActionError::UnknownOrder {
            order_id: order_id.to_owned(),
        })
    }

    /// Runs an order-updating action with per-`(order, kind)` deduplication.
    ///
    /// A second identical request joins the first's shared future rather than
    /// spawning a duplicate network call. The entry is cleared on completion;
    /// only the call that created it updates the cache, and only on success.
    async fn run_update(&self, order_id: &str, call: UpdateCall) -> Result<Order, ActionError> {
        let key = (order_id.to_owned(), call.kind());

        let (action, owner) = claim(&self.updates_in_flight, &key, || {
            Self::dispatch_update(Arc::clone(&self.gateway), order_id.to_owned(), call)
                .boxed()
                .shared()
        });

        if !owner {
            debug!(order_id, kind = %key.1, "joining in-flight order action");
        }

        let result = action.clone().await;

        if owner {
            release(&self.updates_in_flight, &key, &action);

            if let Ok(order) = &result {
                self.cache_guard()
                    .orders
                    .insert(order.id.clone(), order.clone());
            }
        }

        result
    }

    /// Runs a deletion with per-order deduplication, mirroring
    /// [`Self::run_update`] but dropping the cached copy on success.
    async fn run_delete(&self, order_id: &str) -> Result<(), ActionError> {
        let key = order_id.to_owned();

        let (action, owner) = claim(&self.deletions_in_flight, &key, || {
            let gateway = Arc::clone(&self.gateway);
            let order_id = key.clone();

            async move {
                gateway.delete(&order_id).await?;

                Ok(())
            }
            .boxed()
            .shared()
        });

        if !owner {
            debug!(order_id, kind = %ActionKind::Delete, "joining in-flight order action");
        }

        let result = action.clone().await;

        if owner {
            release(&self.deletions_in_flight, &key, &action);

            if result.is_ok() {
                self.cache_guard().orders.remove(&key);
            }
        }

        result
    }

    async fn dispatch_update(
        gateway: Arc<dyn OrderGateway>,
        order_id: String,
        call: UpdateCall,
    ) -> Result<Order, ActionError> {
        match call {
            UpdateCall::Cancel { request_refund } => {
                match gateway.cancel(&order_id, request_refund).await {
                    Ok(order) => Ok(order),
                    Err(GatewayError::Rejected { status, .. }) if status == PAID_CANCEL_STATUS => {
                        Err(ActionError::PaidOrderCancelRejected)
                    }
                    Err(error) => Err(error.into()),
                }
            }
            UpdateCall::Refund { reason, notes } => {
                Ok(gateway.refund(&order_id, &reason, &notes).await?)
            }
        }
    }

    fn cache_guard(&self) -> MutexGuard<'_, OrderCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cancellations_guard(&self) -> MutexGuard<'_, CancellationLog> {
        self.cancellations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
