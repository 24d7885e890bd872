//! Notification dispatch (consumer side).
//!
//! The actual delivery transports (push, e-mail) are external collaborators
//! behind [`NotificationTransport`]. Delivery is best-effort: failures are
//! logged and never surfaced to the code that triggered the notification.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::entities::order::OrderStatus;

/// Where a notification is addressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Recipient {
    /// A single user, addressed by contact info (e-mail).
    User(String),
    /// Everyone subscribed to a topic (e.g. "coupons").
    Topic(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundNotification {
    pub recipient: Recipient,
    pub title: String,
    pub body: String,
}

/// Abstraction over the delivery transport (FCM, SMTP, ...).
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn deliver(&self, notification: OutboundNotification) -> Result<(), String>;
}

/// Transport that only logs. Used in development and tests; deployments
/// plug in a real push/e-mail transport.
pub struct LogTransport;

#[async_trait]
impl NotificationTransport for LogTransport {
    async fn deliver(&self, notification: OutboundNotification) -> Result<(), String> {
        info!(
            recipient = ?notification.recipient,
            title = %notification.title,
            body = %notification.body,
            "Delivering notification"
        );
        Ok(())
    }
}

/// Formats and dispatches user-facing messages for lifecycle events.
#[derive(Clone)]
pub struct NotificationService {
    transport: Arc<dyn NotificationTransport>,
}

impl NotificationService {
    pub fn new(transport: Arc<dyn NotificationTransport>) -> Self {
        Self { transport }
    }

    pub async fn send_order_confirmation(&self, email: &str, token_number: i32, total_amount: i64) {
        self.dispatch(OutboundNotification {
            recipient: Recipient::User(email.to_string()),
            title: "Order placed".to_string(),
            body: format!(
                "Your order #{} has been placed. Total: {}",
                token_number, total_amount
            ),
        })
        .await;
    }

    pub async fn send_order_update(&self, email: &str, status: OrderStatus, token_number: i32) {
        self.dispatch(OutboundNotification {
            recipient: Recipient::User(email.to_string()),
            title: "Order update".to_string(),
            body: format!("Your order #{} is now {}", token_number, status),
        })
        .await;
    }

    pub async fn send_pickup_code(&self, email: &str, token_number: i32, otp_code: &str) {
        self.dispatch(OutboundNotification {
            recipient: Recipient::User(email.to_string()),
            title: "Order ready for pickup".to_string(),
            body: format!(
                "Your order #{} is ready. Show code {} at the counter within 5 minutes.",
                token_number, otp_code
            ),
        })
        .await;
    }

    pub async fn send_coupon_broadcast(&self, code: &str, discount_percentage: i32) {
        self.dispatch(OutboundNotification {
            recipient: Recipient::Topic("coupons".to_string()),
            title: "New offer!".to_string(),
            body: format!("Get {}% off with code {}", discount_percentage, code),
        })
        .await;
    }

    async fn dispatch(&self, notification: OutboundNotification) {
        if let Err(e) = self.transport.deliver(notification).await {
            warn!("Notification delivery failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingTransport {
        sent: Mutex<Vec<OutboundNotification>>,
        fail: bool,
    }

    #[async_trait]
    impl NotificationTransport for RecordingTransport {
        async fn deliver(&self, notification: OutboundNotification) -> Result<(), String> {
            self.sent.lock().unwrap().push(notification);
            if self.fail {
                Err("transport down".to_string())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn pickup_code_goes_to_the_owner() {
        let transport = Arc::new(RecordingTransport {
            sent: Mutex::new(Vec::new()),
            fail: false,
        });
        let service = NotificationService::new(transport.clone());

        service.send_pickup_code("user@example.com", 412, "0734").await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(matches!(&sent[0].recipient, Recipient::User(email) if email == "user@example.com"));
        assert!(sent[0].body.contains("0734"));
        assert!(sent[0].body.contains("412"));
    }

    #[tokio::test]
    async fn coupon_broadcast_targets_the_topic() {
        let transport = Arc::new(RecordingTransport {
            sent: Mutex::new(Vec::new()),
            fail: false,
        });
        let service = NotificationService::new(transport.clone());

        service.send_coupon_broadcast("SAVE10", 10).await;

        let sent = transport.sent.lock().unwrap();
        assert!(matches!(&sent[0].recipient, Recipient::Topic(topic) if topic == "coupons"));
        assert!(sent[0].body.contains("SAVE10"));
    }

    #[tokio::test]
    async fn delivery_failure_is_swallowed() {
        let transport = Arc::new(RecordingTransport {
            sent: Mutex::new(Vec::new()),
            fail: true,
        });
        let service = NotificationService::new(transport);

        // Must not panic or propagate.
        service
            .send_order_update("user@example.com", OrderStatus::Preparing, 101)
            .await;
    }
}
