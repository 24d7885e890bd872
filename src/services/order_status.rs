use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveEnum, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity, Model as OrderModel, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// How long a minted pickup code stays valid.
pub const OTP_TTL_MINUTES: i64 = 5;

/// The legal status edges. Everything not listed here is rejected, so adding
/// a state means adding rows, not new conditionals.
pub const TRANSITIONS: &[(OrderStatus, OrderStatus)] = &[
    (OrderStatus::Ordered, OrderStatus::Preparing),
    (OrderStatus::Preparing, OrderStatus::Ready),
    (OrderStatus::Ready, OrderStatus::Completed),
    (OrderStatus::Ordered, OrderStatus::Cancelled),
];

pub fn is_legal_transition(from: OrderStatus, to: OrderStatus) -> bool {
    TRANSITIONS.iter().any(|&(f, t)| f == from && t == to)
}

fn generate_otp() -> String {
    format!("{:04}", rand::thread_rng().gen_range(0..10_000))
}

/// What a validated transition should write.
struct TransitionPlan {
    new_status: OrderStatus,
    mint_otp: Option<(String, DateTime<Utc>)>,
    completed_at: Option<DateTime<Utc>>,
}

/// Enforces the order status state machine.
///
/// Per-order serialization uses the `version` column: the UPDATE is filtered
/// on the version that was read, so of two racing transitions exactly one
/// wins and the loser gets `Conflict`.
#[derive(Clone)]
pub struct OrderStatusService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderStatusService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Move an order to the next stage (kitchen/admin operation).
    ///
    /// Entering READY mints the pickup code and hands it to the notification
    /// path; it is not part of the returned order's public representation.
    /// READY -> COMPLETED through here bypasses the OTP check and exists for
    /// administrative correction; the customer-facing pickup flow is
    /// [`Self::complete_with_otp`].
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn advance_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<OrderModel, ServiceError> {
        let now = Utc::now();
        self.apply_transition(order_id, |order| {
            if !is_legal_transition(order.status, new_status) {
                return Err(ServiceError::InvalidTransition(format!(
                    "Cannot transition from status '{}' to '{}'",
                    order.status, new_status
                )));
            }

            let mint_otp = (new_status == OrderStatus::Ready)
                .then(|| (generate_otp(), now + Duration::minutes(OTP_TTL_MINUTES)));
            let completed_at = (new_status == OrderStatus::Completed).then_some(now);

            Ok(TransitionPlan {
                new_status,
                mint_otp,
                completed_at,
            })
        })
        .await
    }

    /// Complete a READY order by validating the customer's pickup code.
    /// This is the fraud-resistant completion path.
    #[instrument(skip(self, submitted_otp), fields(order_id = %order_id))]
    pub async fn complete_with_otp(
        &self,
        order_id: Uuid,
        submitted_otp: &str,
    ) -> Result<OrderModel, ServiceError> {
        let now = Utc::now();
        self.apply_transition(order_id, |order| {
            if order.status != OrderStatus::Ready {
                return Err(ServiceError::InvalidTransition(format!(
                    "Order is '{}', pickup requires READY",
                    order.status
                )));
            }

            let stored = order
                .otp_code
                .as_deref()
                .ok_or(ServiceError::InvalidOtp)?;
            if stored != submitted_otp.trim() {
                return Err(ServiceError::InvalidOtp);
            }

            let expires_at = order.otp_expires_at.ok_or(ServiceError::InvalidOtp)?;
            if now > expires_at {
                return Err(ServiceError::OtpExpired);
            }

            Ok(TransitionPlan {
                new_status: OrderStatus::Completed,
                mint_otp: None,
                completed_at: Some(now),
            })
        })
        .await
    }

    /// Cancel an order. Only the owner may cancel, and only while the kitchen
    /// has not started (status ORDERED).
    #[instrument(skip(self), fields(order_id = %order_id, requesting_user_id = %requesting_user_id))]
    pub async fn cancel(
        &self,
        order_id: Uuid,
        requesting_user_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        self.apply_transition(order_id, |order| {
            if order.customer_id != requesting_user_id {
                return Err(ServiceError::Forbidden(
                    "Only the order owner may cancel it".to_string(),
                ));
            }
            if !is_legal_transition(order.status, OrderStatus::Cancelled) {
                return Err(ServiceError::InvalidTransition(format!(
                    "Cannot cancel an order in status '{}'",
                    order.status
                )));
            }

            Ok(TransitionPlan {
                new_status: OrderStatus::Cancelled,
                mint_otp: None,
                completed_at: None,
            })
        })
        .await
    }

    /// Read the order, validate the transition, and write it back guarded by
    /// the version that was read. Zero rows affected means another transition
    /// won the race.
    async fn apply_transition<F>(
        &self,
        order_id: Uuid,
        decide: F,
    ) -> Result<OrderModel, ServiceError>
    where
        F: FnOnce(&OrderModel) -> Result<TransitionPlan, ServiceError>,
    {
        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to start transition transaction");
            ServiceError::DatabaseError(e)
        })?;

        let current = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = current.status;
        let plan = decide(&current)?;
        let leaving_ready = old_status == OrderStatus::Ready;

        let mut update = OrderEntity::update_many()
            .col_expr(order::Column::Status, Expr::value(plan.new_status.to_value()))
            .col_expr(order::Column::Version, Expr::value(current.version + 1));

        // OTP fields exist only while the order sits in READY.
        if let Some((otp_code, expires_at)) = &plan.mint_otp {
            update = update
                .col_expr(order::Column::OtpCode, Expr::value(Some(otp_code.clone())))
                .col_expr(order::Column::OtpExpiresAt, Expr::value(Some(*expires_at)));
        } else if leaving_ready {
            update = update
                .col_expr(order::Column::OtpCode, Expr::value(Option::<String>::None))
                .col_expr(
                    order::Column::OtpExpiresAt,
                    Expr::value(Option::<DateTime<Utc>>::None),
                );
        }

        if let Some(completed_at) = plan.completed_at {
            update = update.col_expr(order::Column::CompletedAt, Expr::value(Some(completed_at)));
        }

        let result = update
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Version.eq(current.version))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            warn!(order_id = %order_id, "Concurrent transition detected, rejecting");
            return Err(ServiceError::Conflict(format!(
                "Order {} was modified concurrently",
                order_id
            )));
        }

        let updated = OrderEntity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!("Order {} vanished mid-transition", order_id))
            })?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit transition transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id = %order_id,
            old_status = %old_status,
            new_status = %updated.status,
            "Order status updated"
        );

        self.emit(Event::OrderStatusChanged {
            order_id,
            old_status,
            new_status: updated.status,
            token_number: updated.token_number,
            customer_email: updated.customer_email.clone(),
        })
        .await;

        if let Some((otp_code, _)) = plan.mint_otp {
            self.emit(Event::PickupCodeIssued {
                order_id,
                token_number: updated.token_number,
                otp_code,
                customer_email: updated.customer_email.clone(),
            })
            .await;
        }

        Ok(updated)
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!("Failed to send order status event: {}", e);
            }
        }
    }
}
