//! Trolley
//!
//! Trolley is the client-side core of a storefront: authoritative cart state with
//! exact pricing, durable local persistence, last-write-wins synchronisation with a
//! remote cart service, and guarded, deduplicated order lifecycle actions.

pub mod cart;
pub mod gateway;
pub mod orders;
pub mod prelude;
pub mod pricing;
pub mod sync;
