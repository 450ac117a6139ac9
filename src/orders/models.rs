//! Order models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an order, as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed but not yet picked up for processing.
    Pending,
    /// Being prepared for shipment.
    Processing,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer.
    Delivered,
    /// Canceled before completion. Terminal.
    Canceled,
    /// Paid amount returned. Terminal.
    Refunded,
}

/// One product entry on an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    /// Identifier of the ordered product.
    pub product_id: String,
    /// Product name at order time.
    pub name: String,
    /// Units ordered.
    pub quantity: u32,
    /// Price per unit at order time.
    pub unit_price: Decimal,
}

/// An order as returned by the server.
///
/// The server owns this data; the client holds a read-mostly cached copy and
/// never synthesises status changes locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Server-assigned order identifier.
    pub id: String,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Whether payment has completed.
    pub is_paid: bool,
    /// Whether delivery has completed.
    pub is_delivered: bool,
    /// The ordered items.
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Total charged for the order.
    pub total_price: Decimal,
}

/// Payment confirmation details forwarded to the pay endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    /// Payment provider's transaction identifier.
    pub payment_id: String,
    /// Provider-reported payment status.
    pub status: String,
    /// Payer email address.
    pub email_address: String,
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    #[test]
    fn order_status_uses_lowercase_wire_names() -> TestResult {
        assert_eq!(serde_json::to_string(&OrderStatus::Pending)?, r#""pending""#);
        assert_eq!(
            serde_json::from_str::<OrderStatus>(r#""canceled""#)?,
            OrderStatus::Canceled
        );

        Ok(())
    }

    #[test]
    fn order_round_trips_camel_case_fields() -> TestResult {
        let json = r#"{
            "id": "o-1",
            "status": "shipped",
            "isPaid": true,
            "isDelivered": false,
            "items": [
                { "productId": "p1", "name": "Product", "quantity": 2, "unitPrice": 9.99 }
            ],
            "totalPrice": 29.98
        }"#;

        let order: Order = serde_json::from_str(json)?;

        assert_eq!(order.status, OrderStatus::Shipped);
        assert!(order.is_paid);
        assert_eq!(order.items.len(), 1);

        Ok(())
    }

    #[test]
    fn order_items_default_to_empty_when_omitted() -> TestResult {
        let json = r#"{
            "id": "o-2",
            "status": "pending",
            "isPaid": false,
            "isDelivered": false,
            "totalPrice": 0
        }"#;

        let order: Order = serde_json::from_str(json)?;

        assert!(order.items.is_empty());

        Ok(())
    }
}
