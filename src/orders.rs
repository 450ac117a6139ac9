//! Orders
//!
//! Server-owned orders as the client sees them: a read-mostly cached copy, a
//! status lifecycle with guard predicates, and a coordinator that validates,
//! deduplicates, and dispatches order actions.

pub mod coordinator;
pub mod gateway;
pub mod lifecycle;
pub mod models;

pub use coordinator::{ActionError, ActionKind, OrderActionCoordinator};
pub use gateway::{HttpOrderGateway, OrderGateway};
pub use lifecycle::{CancellationLog, CancellationRequest};
pub use models::{Order, OrderItem, OrderStatus, PaymentDetails};
