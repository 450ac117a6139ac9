//! HTTP cart gateway.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::{cart::CartLineItem, gateway::GatewayError};

use super::CartGateway;

/// HTTP client for the remote cart endpoints.
///
/// The injected [`Client`] carries session authentication; without a session
/// the embedding application simply never constructs one of these.
#[derive(Debug, Clone)]
pub struct HttpCartGateway {
    base_url: String,
    http: Client,
}

#[derive(Debug, Serialize)]
struct StoreCartBody {
    items: Vec<CartLineItem>,
}

impl HttpCartGateway {
    /// Builds a gateway for the service at `base_url` using the given client.
    pub fn new(base_url: impl Into<String>, http: Client) -> Self {
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    fn url(&self) -> String {
        format!("{}/cart", self.base_url)
    }
}

#[async_trait]
impl CartGateway for HttpCartGateway {
    async fn fetch(&self) -> Result<Vec<CartLineItem>, GatewayError> {
        let response = self.http.get(self.url()).send().await?;

        if !response.status().is_success() {
            return Err(GatewayError::from_response(response).await);
        }

        Ok(response.json().await?)
    }

    async fn store(&self, items: Vec<CartLineItem>) -> Result<Vec<CartLineItem>, GatewayError> {
        let response = self
            .http
            .post(self.url())
            .json(&StoreCartBody { items })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GatewayError::from_response(response).await);
        }

        Ok(response.json().await?)
    }

    async fn clear(&self) -> Result<(), GatewayError> {
        let response = self.http.delete(self.url()).send().await?;

        if !response.status().is_success() {
            return Err(GatewayError::from_response(response).await);
        }

        Ok(())
    }
}
