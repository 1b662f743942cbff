//! Transactional email adapter (SES)
//!
//! Sends a payment confirmation once an order flips to paid. Sending is
//! best-effort: a missing sender address or recipient disables it quietly,
//! and webhook processing never fails on email errors.

use anyhow::Result;
use aws_sdk_sesv2::Client as SesClient;
use tracing::{debug, info};

use crate::config::EmailConfig;
use crate::models::{Order, OrderItem};

#[derive(Clone)]
pub struct EmailService {
    client: SesClient,
    sender: Option<String>,
}

impl EmailService {
    pub fn new(client: SesClient, config: &EmailConfig) -> Self {
        Self {
            client,
            sender: config.sender.clone(),
        }
    }

    /// Send a payment confirmation for a paid order
    ///
    /// No-op when EMAIL_SENDER is unset or the order has no customer email.
    pub async fn send_payment_confirmation(
        &self,
        order: &Order,
        items: &[OrderItem],
    ) -> Result<()> {
        let Some(sender) = self.sender.as_deref() else {
            debug!("EMAIL_SENDER not configured, skipping payment confirmation");
            return Ok(());
        };
        let Some(recipient) = order.customer_email.as_deref() else {
            debug!(
                "Order {} has no customer email, skipping payment confirmation",
                order.order_id
            );
            return Ok(());
        };

        let html = render_confirmation_html(order, items);

        let destination = aws_sdk_sesv2::types::Destination::builder()
            .to_addresses(recipient)
            .build();

        let subject = aws_sdk_sesv2::types::Content::builder()
            .data(format!("Payment Confirmed - {}", order.order_id))
            .charset("UTF-8")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build email subject: {}", e))?;

        let html_body = aws_sdk_sesv2::types::Content::builder()
            .data(html)
            .charset("UTF-8")
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build email body: {}", e))?;

        let body = aws_sdk_sesv2::types::Body::builder().html(html_body).build();

        let message = aws_sdk_sesv2::types::Message::builder()
            .subject(subject)
            .body(body)
            .build();

        let content = aws_sdk_sesv2::types::EmailContent::builder()
            .simple(message)
            .build();

        self.client
            .send_email()
            .from_email_address(sender)
            .destination(destination)
            .content(content)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send payment confirmation: {}", e))?;

        info!(
            "Sent payment confirmation for order {} to {}",
            order.order_id, recipient
        );
        Ok(())
    }
}

fn render_confirmation_html(order: &Order, items: &[OrderItem]) -> String {
    let greeting = order
        .customer_name
        .as_deref()
        .unwrap_or("Customer");

    let mut lines = String::new();
    for item in items {
        lines.push_str(&format!(
            "<li>{} x{} @ Rp {}</li>",
            item.name, item.quantity, item.price
        ));
    }

    format!(
        "<html><body>\
         <h2>Payment Confirmed</h2>\
         <p>Hi {greeting}, we have received your payment for order <b>{order_id}</b>.</p>\
         <ul>{lines}</ul>\
         <p>Total: <b>Rp {total}</b></p>\
         <p>We will process your order shortly.</p>\
         </body></html>",
        greeting = greeting,
        order_id = order.order_id,
        lines = lines,
        total = order.total_amount,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::models::OrderStatus;

    fn sample_order() -> Order {
        Order {
            id: Uuid::new_v4(),
            order_id: "ORDER-1712000000000-a1b2c3d4".to_string(),
            user_id: Uuid::new_v4(),
            total_amount: 125000,
            status: OrderStatus::Paid,
            transaction_status: Some("settlement".to_string()),
            payment_method: Some("qris".to_string()),
            customer_name: Some("Budi".to_string()),
            customer_email: Some("budi@example.com".to_string()),
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
        }
    }

    #[test]
    fn test_confirmation_html_lists_items_and_total() {
        let order = sample_order();
        let items = vec![
            OrderItem {
                product_id: Some(Uuid::new_v4()),
                name: "Vitamin C 500mg".to_string(),
                price: 50000,
                quantity: 2,
            },
            OrderItem {
                product_id: None,
                name: "Paracetamol".to_string(),
                price: 25000,
                quantity: 1,
            },
        ];

        let html = render_confirmation_html(&order, &items);

        assert!(html.contains("ORDER-1712000000000-a1b2c3d4"));
        assert!(html.contains("Hi Budi"));
        assert!(html.contains("Vitamin C 500mg x2 @ Rp 50000"));
        assert!(html.contains("Paracetamol x1 @ Rp 25000"));
        assert!(html.contains("Rp 125000"));
    }

    #[test]
    fn test_confirmation_html_without_customer_name() {
        let mut order = sample_order();
        order.customer_name = None;

        let html = render_confirmation_html(&order, &[]);
        assert!(html.contains("Hi Customer"));
    }
}
