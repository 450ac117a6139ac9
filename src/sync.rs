//! Remote cart synchronisation.
//!
//! Reconciles the local [`CartStore`] with a remote cart service. The local
//! cart is always authoritative: pushes are fire-and-forget and their
//! failures self-heal on the next successful push, while the one pull at
//! session start either overwrites local state wholesale (remote non-empty)
//! or seeds the remote store with it (remote empty). No field-level merge is
//! performed.
//!
//! A synchroniser is constructed per authenticated session; anonymous
//! sessions have none, so they never push.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{
    cart::{CartLineItem, CartState, CartStore},
    gateway::GatewayError,
};

pub mod http;

/// Errors surfaced by cart synchronisation.
///
/// Only pulls surface these to callers; push failures are logged and
/// swallowed so transient sync trouble never blocks or rolls back the UI.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote cart gateway failed.
    #[error("cart gateway request failed")]
    Gateway(#[from] GatewayError),
}

/// The remote cart service.
#[automock]
#[async_trait]
pub trait CartGateway: Send + Sync {
    /// Fetches the remote cart's line items.
    async fn fetch(&self) -> Result<Vec<CartLineItem>, GatewayError>;

    /// Replaces the remote cart with `items`, returning the stored result.
    async fn store(&self, items: Vec<CartLineItem>) -> Result<Vec<CartLineItem>, GatewayError>;

    /// Empties the remote cart.
    async fn clear(&self) -> Result<(), GatewayError>;
}

/// Keeps a local cart and a remote cart service in agreement.
pub struct CartSynchronizer {
    gateway: Arc<dyn CartGateway>,
    changes: watch::Receiver<CartState>,
}

impl fmt::Debug for CartSynchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CartSynchronizer").finish_non_exhaustive()
    }
}

impl CartSynchronizer {
    /// Builds a synchroniser over a gateway and a cart change subscription
    /// (see [`CartStore::subscribe`]).
    pub fn new(gateway: Arc<dyn CartGateway>, changes: watch::Receiver<CartState>) -> Self {
        Self { gateway, changes }
    }

    /// Pushes the current cart to the remote store.
    ///
    /// The payload is read from the change subscription at send time, never
    /// captured earlier, so a stale completion cannot carry stale state.
    /// Failures are logged and swallowed: the local cart remains
    /// authoritative and the next push carries the latest state anyway.
    pub async fn push(&self) {
        let items = self.changes.borrow().items().to_vec();

        match self.gateway.store(items).await {
            Ok(_) => debug!("cart pushed"),
            Err(error) => warn!(%error, "cart push failed; local cart remains authoritative"),
        }
    }

    /// Pulls the remote cart once at session start.
    ///
    /// A non-empty remote cart overwrites the local one wholesale
    /// (last-write-wins). An empty remote cart preserves local state, for
    /// example items added while logged out, and immediately pushes it to
    /// seed the remote store.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] on gateway failure; unlike pushes this is
    /// surfaced, since a failed pull can leave the user looking at a stale
    /// cart and the UI may want to block checkout.
    pub async fn pull_into(&self, store: &mut CartStore) -> Result<(), SyncError> {
        let remote = self.gateway.fetch().await?;

        if remote.is_empty() {
            let local = store.state().items().to_vec();

            if !local.is_empty() {
                self.gateway.store(local).await?;
            }

            return Ok(());
        }

        store.replace_items(remote);

        Ok(())
    }

    /// Empties the remote cart, e.g. after a successful checkout.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`] on gateway failure.
    pub async fn clear_remote(&self) -> Result<(), SyncError> {
        self.gateway.clear().await?;

        Ok(())
    }
}
