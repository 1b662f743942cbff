//! Order models, status lifecycle and payment payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Order lifecycle status
///
/// pending -> paid | failed | cancelled, then fulfilment moves paid orders
/// through processing -> shipped -> delivered. Transitions are driven by the
/// payment gateway webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
    Failed,
    Cancelled,
    Processing,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Failed => "failed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
        }
    }

    /// Parse a status name; unknown values yield `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "failed" => Some(OrderStatus::Failed),
            "cancelled" => Some(OrderStatus::Cancelled),
            "processing" => Some(OrderStatus::Processing),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }
}

/// Order entity
///
/// The gateway_* columns hold raw values from payment notifications and are
/// only written by the webhook path.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    /// Public order reference, e.g. ORDER-1712000000000-a1b2c3d4
    pub order_id: String,
    pub user_id: Uuid,
    pub total_amount: i64,
    pub status: OrderStatus,
    /// Raw gateway transaction status as last reported
    pub transaction_status: Option<String>,
    pub payment_method: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub gateway_status_code: Option<String>,
    pub gateway_gross_amount: Option<String>,
    pub gateway_payment_type: Option<String>,
    pub gateway_transaction_time: Option<String>,
    pub gateway_settlement_time: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Captured order line; survives product deletion
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Option<Uuid>,
    pub name: String,
    pub price: i64,
    pub quantity: i32,
}

/// New order row, inserted as pending
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: String,
    pub user_id: Uuid,
    pub total_amount: i64,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub notes: Option<String>,
}

/// Captured line for a new order
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub price: i64,
    pub quantity: i32,
}

// Request types

/// Order history filters
#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

/// Payment creation payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub order_id: Option<String>,
    #[serde(default)]
    pub items: Vec<TransactionItemRequest>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub customer_address: Option<String>,
    pub notes: Option<String>,
}

/// One requested order line
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

/// Gateway webhook notification; field names follow the gateway's
/// snake_case wire format and every field is optional
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentNotification {
    pub order_id: Option<String>,
    pub transaction_status: Option<String>,
    pub fraud_status: Option<String>,
    pub payment_type: Option<String>,
    pub transaction_id: Option<String>,
    pub status_code: Option<String>,
    pub gross_amount: Option<String>,
    pub transaction_time: Option<String>,
    pub settlement_time: Option<String>,
}

// Response types

/// Order plus its captured lines
#[derive(Debug, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// Paginated order history
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListResponse {
    pub success: bool,
    pub count: usize,
    pub total: i64,
    pub page: u32,
    pub total_pages: i64,
    pub data: Vec<OrderWithItems>,
}

/// Payment transaction handle returned by the gateway
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    pub order_id: String,
    pub token: String,
    pub redirect_url: String,
    pub total_amount: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_round_trip() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Failed,
            OrderStatus::Cancelled,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("settlement"), None);
        assert_eq!(OrderStatus::parse(""), None);
    }

    #[test]
    fn test_notification_deserializes_partial_payload() {
        let json = r#"{
            "order_id": "ORDER-1712000000000-a1b2c3d4",
            "transaction_status": "settlement",
            "status_code": "200",
            "gross_amount": "90000.00",
            "signature_key": "ignored-unknown-field"
        }"#;

        let notification: PaymentNotification = serde_json::from_str(json).unwrap();
        assert_eq!(
            notification.order_id.as_deref(),
            Some("ORDER-1712000000000-a1b2c3d4")
        );
        assert_eq!(notification.transaction_status.as_deref(), Some("settlement"));
        assert!(notification.fraud_status.is_none());
        assert!(notification.settlement_time.is_none());
    }

    #[test]
    fn test_order_with_items_flattens() {
        let order = Order {
            id: Uuid::new_v4(),
            order_id: "ORDER-1-abc".to_string(),
            user_id: Uuid::new_v4(),
            total_amount: 90000,
            status: OrderStatus::Pending,
            transaction_status: None,
            payment_method: None,
            customer_name: None,
            customer_email: None,
            customer_phone: None,
            customer_address: None,
            gateway_transaction_id: None,
            gateway_status_code: None,
            gateway_gross_amount: None,
            gateway_payment_type: None,
            gateway_transaction_time: None,
            gateway_settlement_time: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(OrderWithItems {
            order,
            items: vec![],
        })
        .unwrap();

        assert_eq!(json["orderId"], "ORDER-1-abc");
        assert_eq!(json["status"], "pending");
        assert!(json["items"].is_array());
    }
}
