//! Integration tests for the HTTP gateways using wiremock.

use reqwest::Client;
use testresult::TestResult;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use trolley::{
    gateway::GatewayError,
    orders::gateway::{HttpOrderGateway, OrderGateway},
    sync::{CartGateway, http::HttpCartGateway},
};

#[tokio::test]
async fn cart_fetch_returns_parsed_items() -> TestResult {
    let server = MockServer::start().await;

    let body = serde_json::json!([
        {
            "productId": "p-shoes",
            "name": "Shoes",
            "image": "/images/shoes.jpg",
            "unitPrice": 100,
            "stock": 12,
            "quantity": 2
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let gateway = HttpCartGateway::new(server.uri(), Client::new());
    let items = gateway.fetch().await?;

    assert_eq!(items.len(), 1);

    let item = items.first().expect("one item");
    assert_eq!(item.product_id, "p-shoes");
    assert_eq!(item.quantity, 2);
    assert_eq!(item.unit_price, rust_decimal::Decimal::from(100));

    Ok(())
}

#[tokio::test]
async fn cart_store_posts_and_returns_stored_items() -> TestResult {
    let server = MockServer::start().await;

    let body = serde_json::json!([
        {
            "productId": "p-socks",
            "name": "Socks",
            "image": "/images/socks.jpg",
            "unitPrice": 5,
            "stock": 40,
            "quantity": 3
        }
    ]);

    Mock::given(method("POST"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpCartGateway::new(server.uri(), Client::new());
    let stored = gateway.store(Vec::new()).await?;

    assert_eq!(stored.len(), 1);

    Ok(())
}

#[tokio::test]
async fn cart_clear_hits_the_delete_endpoint() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/cart"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpCartGateway::new(server.uri(), Client::new());
    gateway.clear().await?;

    Ok(())
}

#[tokio::test]
async fn cart_fetch_surfaces_server_rejection_with_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cart"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({ "message": "Not authorized" })),
        )
        .mount(&server)
        .await;

    let gateway = HttpCartGateway::new(server.uri(), Client::new());
    let result = gateway.fetch().await;

    match result {
        Err(GatewayError::Rejected { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "Not authorized");
        }
        other => panic!("expected Rejected error, got {other:?}"),
    }
}

#[tokio::test]
async fn order_cancel_puts_to_the_cancel_endpoint() -> TestResult {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "id": "o-1",
        "status": "canceled",
        "isPaid": false,
        "isDelivered": false,
        "items": [],
        "totalPrice": 118
    });

    Mock::given(method("PUT"))
        .and(path("/orders/o-1/cancel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpOrderGateway::new(server.uri(), Client::new());
    let order = gateway.cancel("o-1", false).await?;

    assert_eq!(order.id, "o-1");
    assert!(!order.is_paid);

    Ok(())
}

#[tokio::test]
async fn order_cancel_rejection_carries_status_and_message() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/orders/o-2/cancel"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(serde_json::json!({ "message": "Order is already paid" })),
        )
        .mount(&server)
        .await;

    let gateway = HttpOrderGateway::new(server.uri(), Client::new());
    let result = gateway.cancel("o-2", false).await;

    match result {
        Err(GatewayError::Rejected { status, message }) => {
            assert_eq!(status, 409);
            assert_eq!(message, "Order is already paid");
        }
        other => panic!("expected Rejected error, got {other:?}"),
    }
}

#[tokio::test]
async fn order_delete_accepts_the_message_envelope() -> TestResult {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/orders/o-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "message": "Order removed" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpOrderGateway::new(server.uri(), Client::new());
    gateway.delete("o-1").await?;

    Ok(())
}

#[tokio::test]
async fn order_listing_passes_the_all_flag() -> TestResult {
    let server = MockServer::start().await;

    let body = serde_json::json!([
        {
            "id": "o-1",
            "status": "pending",
            "isPaid": false,
            "isDelivered": false,
            "items": [],
            "totalPrice": 50
        },
        {
            "id": "o-2",
            "status": "delivered",
            "isPaid": true,
            "isDelivered": true,
            "items": [],
            "totalPrice": 75
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/orders/myorders"))
        .and(query_param("all", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpOrderGateway::new(server.uri(), Client::new());
    let orders = gateway.list_mine(true).await?;

    assert_eq!(orders.len(), 2);

    Ok(())
}

#[tokio::test]
async fn order_refund_puts_reason_and_notes() -> TestResult {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "id": "o-3",
        "status": "refunded",
        "isPaid": true,
        "isDelivered": true,
        "items": [],
        "totalPrice": 118
    });

    Mock::given(method("PUT"))
        .and(path("/orders/o-3/refund"))
        .and(wiremock::matchers::body_json(
            serde_json::json!({ "reason": "damaged", "notes": "box crushed" }),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .expect(1)
        .mount(&server)
        .await;

    let gateway = HttpOrderGateway::new(server.uri(), Client::new());
    let order = gateway.refund("o-3", "damaged", "box crushed").await?;

    assert_eq!(order.id, "o-3");

    Ok(())
}
