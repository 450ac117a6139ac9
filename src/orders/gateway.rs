//! Remote order gateway.

use async_trait::async_trait;
use mockall::automock;
use reqwest::Client;
use serde::Serialize;

use crate::gateway::{GatewayError, ServerMessage};

use super::models::{Order, PaymentDetails};

/// The remote order service.
///
/// Every call returns the full updated order representation except
/// [`OrderGateway::delete`]; the client never synthesises order state.
#[automock]
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Fetches a single order.
    async fn fetch(&self, order_id: &str) -> Result<Order, GatewayError>;

    /// Lists the session user's orders; `all` includes completed ones.
    async fn list_mine(&self, all: bool) -> Result<Vec<Order>, GatewayError>;

    /// Cancels an order. `request_refund` routes a paid order's cancellation
    /// into the refund flow server-side.
    async fn cancel(&self, order_id: &str, request_refund: bool) -> Result<Order, GatewayError>;

    /// Requests a refund for an order.
    async fn refund(
        &self,
        order_id: &str,
        reason: &str,
        notes: &str,
    ) -> Result<Order, GatewayError>;

    /// Deletes an order.
    async fn delete(&self, order_id: &str) -> Result<(), GatewayError>;

    /// Records payment confirmation for an order.
    async fn pay(&self, order_id: &str, details: PaymentDetails) -> Result<Order, GatewayError>;
}

/// HTTP client for the remote order endpoints.
#[derive(Debug, Clone)]
pub struct HttpOrderGateway {
    base_url: String,
    http: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CancelBody {
    request_refund: bool,
}

#[derive(Debug, Serialize)]
struct RefundBody<'a> {
    reason: &'a str,
    notes: &'a str,
}

impl HttpOrderGateway {
    /// Builds a gateway for the service at `base_url` using the given client.
    pub fn new(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/orders/{path}", self.base_url)
    }

    async fn order_from(response: reqwest::Response) -> Result<Order, GatewayError> {
        if !response.status().is_success() {
            return Err(GatewayError::from_response(response).await);
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl OrderGateway for HttpOrderGateway {
    async fn fetch(&self, order_id: &str) -> Result<Order, GatewayError> {
        let response = self.http.get(self.url(order_id)).send().await?;

        Self::order_from(response).await
    }

    async fn list_mine(&self, all: bool) -> Result<Vec<Order>, GatewayError> {
        let response = self
            .http
            .get(self.url("myorders"))
            .query(&[("all", all)])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::from_response(response).await);
        }

        Ok(response.json().await?)
    }

    async fn cancel(&self, order_id: &str, request_refund: bool) -> Result<Order, GatewayError> {
        let response = self
            .http
            .put(self.url(&format!("{order_id}/cancel")))
            .json(&CancelBody { request_refund })
            .send()
            .await?;

        Self::order_from(response).await
    }

    async fn refund(
        &self,
        order_id: &str,
        reason: &str,
        notes: &str,
    ) -> Result<Order, GatewayError> {
        let response = self
            .http
            .put(self.url(&format!("{order_id}/refund")))
            .json(&RefundBody { reason, notes })
            .send()
            .await?;

        Self::order_from(response).await
    }

    async fn delete(&self, order_id: &str) -> Result<(), GatewayError> {
        let response = self.http.delete(self.url(order_id)).send().await?;

        if !response.status().is_success() {
            return Err(GatewayError::from_response(response).await);
        }

        // The delete endpoint answers with a message envelope, not an order.
        let _envelope: ServerMessage = response.json().await?;

        Ok(())
    }

    async fn pay(&self, order_id: &str, details: PaymentDetails) -> Result<Order, GatewayError> {
        let response = self
            .http
            .put(self.url(&format!("{order_id}/pay")))
            .json(&details)
            .send()
            .await?;

        Self::order_from(response).await
    }
}
