use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle state of an order. Stored as its upper-case string form.
///
/// Legal transitions are table data in [`crate::services::order_status`];
/// adding a state means adding table rows, not new branches.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[sea_orm(string_value = "ORDERED")]
    Ordered,
    #[sea_orm(string_value = "PREPARING")]
    Preparing,
    #[sea_orm(string_value = "READY")]
    Ready,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ordered => "ORDERED",
            Self::Preparing => "PREPARING",
            Self::Ready => "READY",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Orders the kitchen still has in flight.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Ordered | Self::Preparing | Self::Ready)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Short pickup number called at the counter. A display aid, not a key;
    /// collisions across concurrently active orders are acceptable.
    pub token_number: i32,

    pub status: OrderStatus,

    /// Amount due in minor currency units, fixed at creation time.
    pub total_amount: i64,

    pub coupon_code: Option<String>,
    pub discount_amount: Option<i64>,

    /// One-time pickup code; present only while status is READY.
    pub otp_code: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,

    pub customer_id: Uuid,
    pub customer_email: String,

    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Optimistic-locking counter; every status transition bumps it.
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItem,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItem.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_statuses() {
        assert!(OrderStatus::Ordered.is_active());
        assert!(OrderStatus::Preparing.is_active());
        assert!(OrderStatus::Ready.is_active());
        assert!(!OrderStatus::Completed.is_active());
        assert!(!OrderStatus::Cancelled.is_active());
    }

    #[test]
    fn status_round_trips_through_db_value() {
        use sea_orm::ActiveEnum;
        for status in [
            OrderStatus::Ordered,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            let value = status.to_value();
            assert_eq!(OrderStatus::try_from_value(&value).unwrap(), status);
            assert_eq!(value, status.as_str());
        }
    }
}
