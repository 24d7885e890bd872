//! Domain events emitted by the order lifecycle.
//!
//! Events are fire-and-forget: emission failures are logged by the producer
//! and never roll back or fail the transition that produced them. The
//! processing loop fans events out to the notification dispatcher.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::order::OrderStatus;
use crate::notifications::NotificationService;

/// Events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated {
        order_id: Uuid,
        token_number: i32,
        total_amount: i64,
        customer_email: String,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
        token_number: i32,
        customer_email: String,
    },
    /// Emitted when an order enters READY. This is the only path the pickup
    /// code travels on; it is never returned in an admin response body.
    PickupCodeIssued {
        order_id: Uuid,
        token_number: i32,
        otp_code: String,
        customer_email: String,
    },
    CouponPublished {
        code: String,
        discount_percentage: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Process incoming events and distribute them to the notification dispatcher.
/// Runs until the sending side is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, notifications: Arc<NotificationService>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::OrderCreated {
                order_id,
                token_number,
                total_amount,
                customer_email,
            } => {
                info!(%order_id, token_number, "Processing order created event");
                notifications
                    .send_order_confirmation(&customer_email, token_number, total_amount)
                    .await;
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
                token_number,
                customer_email,
            } => {
                info!(%order_id, %old_status, %new_status, "Processing order status change event");
                notifications
                    .send_order_update(&customer_email, new_status, token_number)
                    .await;
            }
            Event::PickupCodeIssued {
                order_id,
                token_number,
                otp_code,
                customer_email,
            } => {
                info!(%order_id, token_number, "Processing pickup code event");
                notifications
                    .send_pickup_code(&customer_email, token_number, &otp_code)
                    .await;
            }
            Event::CouponPublished {
                code,
                discount_percentage,
            } => {
                info!(%code, "Processing coupon published event");
                notifications
                    .send_coupon_broadcast(&code, discount_percentage)
                    .await;
            }
        }
    }

    warn!("Event processing loop has ended");
}
