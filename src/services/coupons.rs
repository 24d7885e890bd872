use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::coupon::{
        self, ActiveModel as CouponActiveModel, Entity as CouponEntity, Model as CouponModel,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Discount owed on a subtotal, in minor currency units.
///
/// Integer floor division: a 10% coupon on 255 yields 25. The legacy system
/// did this math on floats; minor-unit integers avoid the rounding drift.
pub fn discount_for(subtotal: i64, discount_percentage: i32) -> i64 {
    subtotal * i64::from(discount_percentage) / 100
}

/// Outcome of validating a coupon code at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ResolvedCoupon {
    pub code: String,
    pub discount_percentage: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 32, message = "Code must be between 1 and 32 characters"))]
    pub code: String,
    #[validate(range(min = 0, max = 100, message = "Discount must be between 0 and 100 percent"))]
    pub discount_percentage: i32,
    pub expiry_date: Option<NaiveDate>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCouponRequest {
    #[validate(range(min = 0, max = 100, message = "Discount must be between 0 and 100 percent"))]
    pub discount_percentage: Option<i32>,
    pub expiry_date: Option<NaiveDate>,
    pub active: Option<bool>,
}

/// Validates coupon codes against activity/expiry and manages the coupon
/// catalog. Codes are case-insensitive: stored and compared upper-cased.
#[derive(Clone)]
pub struct CouponService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CouponService {
    pub fn new(db: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self { db, event_sender }
    }

    /// Resolve a code to its discount, checking activity and expiry as of
    /// `at_date`. Expiry is strict: a coupon expiring yesterday is dead today,
    /// one expiring today still works.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn resolve(
        &self,
        code: &str,
        at_date: NaiveDate,
    ) -> Result<ResolvedCoupon, ServiceError> {
        let normalized = code.trim().to_uppercase();

        let coupon = CouponEntity::find()
            .filter(coupon::Column::Code.eq(normalized.clone()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                warn!(code = %normalized, "Unknown coupon code");
                ServiceError::NotFound(format!("Coupon {} not found", normalized))
            })?;

        if !coupon.active {
            return Err(ServiceError::CouponInactive(normalized));
        }

        if let Some(expiry) = coupon.expiry_date {
            if expiry < at_date {
                return Err(ServiceError::CouponExpired(normalized));
            }
        }

        Ok(ResolvedCoupon {
            code: coupon.code,
            discount_percentage: coupon.discount_percentage,
        })
    }

    pub async fn list_coupons(&self) -> Result<Vec<CouponModel>, ServiceError> {
        let coupons = CouponEntity::find()
            .order_by_asc(coupon::Column::Code)
            .all(&*self.db)
            .await?;
        Ok(coupons)
    }

    #[instrument(skip(self, request), fields(code = %request.code))]
    pub async fn create_coupon(
        &self,
        request: CreateCouponRequest,
    ) -> Result<CouponModel, ServiceError> {
        request.validate()?;

        let normalized = request.code.trim().to_uppercase();

        let existing = CouponEntity::find()
            .filter(coupon::Column::Code.eq(normalized.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Coupon code {} already exists",
                normalized
            )));
        }

        let model = CouponActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(normalized.clone()),
            discount_percentage: Set(request.discount_percentage),
            expiry_date: Set(request.expiry_date),
            active: Set(request.active),
            created_at: Set(Utc::now()),
        };

        let coupon = model.insert(&*self.db).await?;
        info!(code = %coupon.code, "Coupon created");

        if coupon.active {
            self.emit(Event::CouponPublished {
                code: coupon.code.clone(),
                discount_percentage: coupon.discount_percentage,
            })
            .await;
        }

        Ok(coupon)
    }

    #[instrument(skip(self, request), fields(coupon_id = %id))]
    pub async fn update_coupon(
        &self,
        id: Uuid,
        request: UpdateCouponRequest,
    ) -> Result<CouponModel, ServiceError> {
        request.validate()?;

        let coupon = CouponEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", id)))?;

        let mut active: CouponActiveModel = coupon.into();
        if let Some(discount_percentage) = request.discount_percentage {
            active.discount_percentage = Set(discount_percentage);
        }
        if let Some(expiry_date) = request.expiry_date {
            active.expiry_date = Set(Some(expiry_date));
        }
        if let Some(is_active) = request.active {
            active.active = Set(is_active);
        }

        let updated = active.update(&*self.db).await?;
        info!(code = %updated.code, "Coupon updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(coupon_id = %id))]
    pub async fn delete_coupon(&self, id: Uuid) -> Result<(), ServiceError> {
        let coupon = CouponEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Coupon {} not found", id)))?;

        let active: CouponActiveModel = coupon.into();
        active.delete(&*self.db).await?;
        info!(coupon_id = %id, "Coupon deleted");
        Ok(())
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!("Failed to send coupon event: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_uses_integer_floor() {
        assert_eq!(discount_for(250, 10), 25);
        assert_eq!(discount_for(255, 10), 25);
        assert_eq!(discount_for(99, 10), 9);
        assert_eq!(discount_for(0, 50), 0);
    }

    #[test]
    fn full_discount_never_exceeds_subtotal() {
        // With percentages capped at 100 the discount can zero a total but
        // never push it negative; the clamp in order creation is a backstop.
        assert_eq!(discount_for(250, 100), 250);
        assert!(discount_for(250, 100) <= 250);
    }

    #[test]
    fn spec_scenario_ten_percent_on_250() {
        let subtotal = 100 * 2 + 50;
        let discount = discount_for(subtotal, 10);
        assert_eq!(subtotal, 250);
        assert_eq!(discount, 25);
        assert_eq!(subtotal - discount, 225);
    }
}
