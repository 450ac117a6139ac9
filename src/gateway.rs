//! Shared remote gateway plumbing.
//!
//! Both the cart and order gateways speak JSON over HTTP; this module holds
//! the error type and response handling they have in common. Authentication
//! is carried by the transport layer the embedding application configures on
//! the [`reqwest::Client`] it injects.

use reqwest::Response;
use serde::Deserialize;
use thiserror::Error;

/// Errors surfaced by a remote gateway call.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure: connection, timeout, or an unreadable body.
    #[error("transport failure")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code of the rejection.
        status: u16,
        /// The server's message, when one was provided.
        message: String,
    },
}

/// The `{ "message": ... }` envelope the storefront API uses for errors and
/// for bodyless successes such as order deletion.
#[derive(Debug, Deserialize)]
pub(crate) struct ServerMessage {
    /// Human-readable message from the server.
    pub message: String,
}

impl GatewayError {
    /// Builds a [`GatewayError::Rejected`] from a non-success response,
    /// extracting the server's message envelope when present.
    pub(crate) async fn from_response(response: Response) -> Self {
        let status = response.status().as_u16();
        let text = response.text().await.unwrap_or_default();

        let message = serde_json::from_str::<ServerMessage>(&text)
            .map(|envelope| envelope.message)
            .unwrap_or(text);

        Self::Rejected { status, message }
    }
}
