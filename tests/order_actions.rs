//! Order action scenarios: concurrent-request deduplication and the
//! paid-order cancel-to-refund re-route.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use rust_decimal::Decimal;
use testresult::TestResult;
use tokio::sync::Notify;

use trolley::{
    gateway::GatewayError,
    orders::{
        Order, OrderStatus, PaymentDetails,
        coordinator::{ActionError, OrderActionCoordinator},
        gateway::{MockOrderGateway, OrderGateway},
    },
};

fn order(id: &str, status: OrderStatus, is_paid: bool) -> Order {
    Order {
        id: id.to_owned(),
        status,
        is_paid,
        is_delivered: matches!(status, OrderStatus::Delivered),
        items: Vec::new(),
        total_price: Decimal::from(100),
    }
}

/// A gateway whose cancel call counts invocations and blocks until released,
/// so a test can hold requests in flight deterministically.
#[derive(Debug)]
struct BlockingCancelGateway {
    cancel_calls: AtomicUsize,
    release: Notify,
    respond_with: OrderStatus,
}

impl BlockingCancelGateway {
    fn responding(status: OrderStatus) -> Self {
        Self {
            cancel_calls: AtomicUsize::new(0),
            release: Notify::new(),
            respond_with: status,
        }
    }
}

#[async_trait]
impl OrderGateway for BlockingCancelGateway {
    async fn fetch(&self, _order_id: &str) -> Result<Order, GatewayError> {
        panic!("unexpected fetch call");
    }

    async fn list_mine(&self, _all: bool) -> Result<Vec<Order>, GatewayError> {
        panic!("unexpected list_mine call");
    }

    async fn cancel(&self, order_id: &str, _request_refund: bool) -> Result<Order, GatewayError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;

        Ok(order(order_id, self.respond_with, false))
    }

    async fn refund(
        &self,
        _order_id: &str,
        _reason: &str,
        _notes: &str,
    ) -> Result<Order, GatewayError> {
        panic!("unexpected refund call");
    }

    async fn delete(&self, _order_id: &str) -> Result<(), GatewayError> {
        panic!("unexpected delete call");
    }

    async fn pay(&self, _order_id: &str, _details: PaymentDetails) -> Result<Order, GatewayError> {
        panic!("unexpected pay call");
    }
}

#[tokio::test]
async fn concurrent_identical_cancels_share_one_remote_call() -> TestResult {
    let gateway = Arc::new(BlockingCancelGateway::responding(OrderStatus::Canceled));
    let coordinator = OrderActionCoordinator::new(Arc::clone(&gateway) as Arc<dyn OrderGateway>);
    coordinator.record(order("o-1", OrderStatus::Pending, false));

    let first = coordinator.request_cancel("o-1");
    let second = coordinator.request_cancel("o-1");

    // Poll order: both requests start (the second joining the first's
    // in-flight future), then the gateway is released.
    let (first, second, ()) = tokio::join!(first, second, async {
        gateway.release.notify_waiters();
    });

    assert_eq!(
        gateway.cancel_calls.load(Ordering::SeqCst),
        1,
        "two concurrent identical requests must produce exactly one remote call"
    );

    let first = first?;
    let second = second?;
    assert_eq!(first.status, OrderStatus::Canceled);
    assert_eq!(second, first, "joined callers observe the same result");

    // The dedup entry is cleared on completion: a later cancel attempt is a
    // fresh request, and is now refused by the guard on the canceled order.
    let after = coordinator.request_cancel("o-1").await;
    assert!(
        matches!(after, Err(ActionError::Guard { .. })),
        "expected a guard refusal on the canceled order, got {after:?}"
    );

    Ok(())
}

#[tokio::test]
async fn resumed_owner_does_not_evict_a_successor_entry() -> TestResult {
    // The server keeps reporting the order cancelable, so every round passes
    // the guard and the dedup map alone decides whether a call dispatches.
    let gateway = Arc::new(BlockingCancelGateway::responding(OrderStatus::Pending));
    let coordinator = OrderActionCoordinator::new(Arc::clone(&gateway) as Arc<dyn OrderGateway>);
    coordinator.record(order("o-1", OrderStatus::Pending, false));

    // The first owner dispatches and parks inside the gateway.
    let first = coordinator.request_cancel("o-1");
    tokio::pin!(first);
    assert!(futures::poll!(first.as_mut()).is_pending(), "first call should park in the gateway");
    assert_eq!(gateway.cancel_calls.load(Ordering::SeqCst), 1);

    // A joiner drives the shared future to completion while the first owner
    // stays parked, its cleanup not yet run.
    let second = coordinator.request_cancel("o-1");
    tokio::pin!(second);
    assert!(futures::poll!(second.as_mut()).is_pending(), "joiner should share the parked call");
    gateway.release.notify_waiters();
    second.await?;
    assert_eq!(
        gateway.cancel_calls.load(Ordering::SeqCst),
        1,
        "the joiner must not dispatch its own call"
    );

    // The completed entry must not serve a fresh request: a successor
    // replaces it under the same key and parks in the gateway.
    let third = coordinator.request_cancel("o-1");
    tokio::pin!(third);
    assert!(futures::poll!(third.as_mut()).is_pending(), "successor should park in the gateway");
    assert_eq!(gateway.cancel_calls.load(Ordering::SeqCst), 2);

    // Resuming the first owner runs its cleanup. It must remove only its own
    // completed entry, never the successor's live one.
    first.await?;

    let fourth = coordinator.request_cancel("o-1");
    tokio::pin!(fourth);
    assert!(futures::poll!(fourth.as_mut()).is_pending(), "late request should join the successor");
    assert_eq!(
        gateway.cancel_calls.load(Ordering::SeqCst),
        2,
        "a request arriving after the first owner resumed must join the in-flight successor"
    );

    let (third, fourth, ()) = tokio::join!(third, fourth, async {
        gateway.release.notify_waiters();
    });
    assert_eq!(third?, fourth?, "joined callers observe the successor's result");

    Ok(())
}

#[tokio::test]
async fn paid_cancel_is_rerouted_to_the_refund_flow() -> TestResult {
    let mut gateway = MockOrderGateway::new();
    gateway.expect_cancel().times(1).returning(|_, _| {
        Err(GatewayError::Rejected {
            status: 409,
            message: "Order is paid; request a refund".to_owned(),
        })
    });
    gateway
        .expect_refund()
        .times(1)
        .returning(|id, _, _| Ok(order(id, OrderStatus::Refunded, true)));

    let coordinator = OrderActionCoordinator::new(Arc::new(gateway));

    // The cached copy is stale: locally the order still looks unpaid and
    // cancelable, but the server has since recorded payment.
    let mut stale = order("o-1", OrderStatus::Processing, false);
    stale.is_paid = false;
    coordinator.record(stale);

    let rejection = coordinator.request_cancel("o-1").await;
    assert_eq!(rejection, Err(ActionError::PaidOrderCancelRejected));

    // The rejection is a signal, not a dead end: refresh the local view and
    // follow the refund flow.
    coordinator.record(order("o-1", OrderStatus::Processing, true));

    let refunded = coordinator
        .request_refund("o-1", "no longer needed", "")
        .await?;

    assert_eq!(refunded.status, OrderStatus::Refunded);
    assert!(
        coordinator.cancellation_pending("o-1").is_some(),
        "a refund request records the client-local pending marker"
    );

    Ok(())
}
