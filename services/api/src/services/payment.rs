//! Payment gateway adapter (Midtrans Snap)
//!
//! Creates Snap transactions over the gateway's HTTP API and maps
//! notification statuses onto the order lifecycle. The mapping is a pure
//! function so the webhook path stays trivially testable.

use anyhow::Result;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::config::PaymentConfig;
use crate::models::{NewOrderItem, OrderStatus};

/// Snap transaction handle returned by the gateway
#[derive(Debug, Clone)]
pub struct SnapTransaction {
    pub token: String,
    pub redirect_url: String,
}

/// Customer block forwarded to the gateway
#[derive(Debug, Clone, Default)]
pub struct CustomerDetails {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Payment gateway client
#[derive(Clone)]
pub struct PaymentClient {
    client: reqwest::Client,
    base_url: String,
    server_key: Option<String>,
}

impl PaymentClient {
    /// Create a new payment client from configuration
    pub fn new(config: &PaymentConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            server_key: config.server_key.clone(),
        })
    }

    /// Create a Snap transaction for an order
    pub async fn create_transaction(
        &self,
        order_id: &str,
        gross_amount: i64,
        customer: &CustomerDetails,
        items: &[NewOrderItem],
    ) -> Result<SnapTransaction> {
        let server_key = self
            .server_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("MIDTRANS_SERVER_KEY is not configured"))?;

        let item_details: Vec<serde_json::Value> = items
            .iter()
            .map(|item| {
                json!({
                    "id": item.product_id.to_string(),
                    "price": item.price,
                    "quantity": item.quantity,
                    "name": item.name,
                })
            })
            .collect();

        let request_body = json!({
            "transaction_details": {
                "order_id": order_id,
                "gross_amount": gross_amount,
            },
            "customer_details": {
                "first_name": customer.name,
                "email": customer.email,
                "phone": customer.phone,
                "shipping_address": {
                    "address": customer.address,
                },
            },
            "item_details": item_details,
        });

        let response = self
            .client
            .post(format!("{}/snap/v1/transactions", self.base_url))
            .basic_auth(server_key, Some(""))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Payment gateway request failed: {}", e))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse payment gateway response: {}", e))?;

        if !status.is_success() {
            let message = body
                .get("error_messages")
                .and_then(|v| v.as_array())
                .and_then(|msgs| msgs.first())
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown gateway error");
            return Err(anyhow::anyhow!(
                "Payment gateway rejected the transaction: {}",
                message
            ));
        }

        let token = body
            .get("token")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Gateway response missing token"))?;

        let redirect_url = body
            .get("redirect_url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("Gateway response missing redirect_url"))?;

        Ok(SnapTransaction {
            token: token.to_string(),
            redirect_url: redirect_url.to_string(),
        })
    }
}

/// Map a gateway notification onto the order lifecycle
///
/// `capture` consults the fraud status; an absent fraud status counts as
/// accepted. Unknown statuses map to `None`, leaving the order unchanged
/// while its gateway metadata is still recorded.
pub fn map_notification_status(
    transaction_status: &str,
    fraud_status: Option<&str>,
) -> Option<OrderStatus> {
    match transaction_status {
        "capture" => match fraud_status {
            Some("challenge") => Some(OrderStatus::Pending),
            Some("deny") => Some(OrderStatus::Failed),
            _ => Some(OrderStatus::Paid),
        },
        "settlement" => Some(OrderStatus::Paid),
        "pending" => Some(OrderStatus::Pending),
        "deny" => Some(OrderStatus::Failed),
        "cancel" => Some(OrderStatus::Cancelled),
        "expire" => Some(OrderStatus::Failed),
        _ => None,
    }
}

/// Generate a public order reference: ORDER-{millis}-{short uuid}
pub fn generate_order_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let suffix = Uuid::new_v4().simple().to_string();
    format!("ORDER-{}-{}", millis, &suffix[..8])
}
