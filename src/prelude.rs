//! Trolley prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{
        CartLineItem, CartState, CartStore, NewLineItem, ValidationError,
        storage::{KeyValueStorage, MemoryStorage},
    },
    gateway::GatewayError,
    orders::{
        Order, OrderItem, OrderStatus, PaymentDetails,
        coordinator::{ActionError, ActionKind, OrderActionCoordinator},
        gateway::{HttpOrderGateway, OrderGateway},
        lifecycle::{CancellationLog, CancellationRequest},
    },
    pricing::{PriceBreakdown, compute_breakdown, coupon_rate},
    sync::{CartGateway, CartSynchronizer, SyncError, http::HttpCartGateway},
};
