use chrono::Utc;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    db::DbPool,
    entities::order::{self, Entity as OrderEntity, Model as OrderModel, OrderStatus},
    entities::order_item::{self, Entity as OrderItemEntity, Model as OrderItemModel},
    errors::ServiceError,
    events::{Event, EventSender},
    services::coupons::{discount_for, CouponService},
    services::menu::MenuService,
};

/// Pickup token range. Three digits reads well on the counter display;
/// collisions among concurrently active orders are tolerated since the
/// token is a display aid, not a key.
const TOKEN_MIN: i32 = 100;
const TOKEN_MAX: i32 = 999;

fn generate_token_number() -> i32 {
    rand::thread_rng().gen_range(TOKEN_MIN..=TOKEN_MAX)
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<CreateOrderItem>,
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderItem {
    pub menu_item_id: Uuid,
    pub quantity: i32,
}

/// An order together with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    pub order: OrderModel,
    pub items: Vec<OrderItemModel>,
}

/// Assembles orders from cart payloads: prices every line against the menu,
/// applies an optional coupon, and persists order + items atomically.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    menu: Arc<MenuService>,
    coupons: Arc<CouponService>,
    event_sender: Option<Arc<EventSender>>,
}

impl OrderService {
    pub fn new(
        db: Arc<DbPool>,
        menu: Arc<MenuService>,
        coupons: Arc<CouponService>,
        event_sender: Option<Arc<EventSender>>,
    ) -> Self {
        Self {
            db,
            menu,
            coupons,
            event_sender,
        }
    }

    /// Create an order for the authenticated customer.
    ///
    /// Prices are copied from the menu at this moment and never recomputed.
    /// The insert of order and items is all-or-nothing.
    #[instrument(skip(self, customer, request), fields(customer_id = %customer.user_id))]
    pub async fn create_order(
        &self,
        customer: &AuthUser,
        request: CreateOrderRequest,
    ) -> Result<OrderWithItems, ServiceError> {
        request.validate()?;

        let order_id = Uuid::new_v4();
        let now = Utc::now();

        let mut subtotal: i64 = 0;
        let mut items: Vec<OrderItemModel> = Vec::with_capacity(request.items.len());
        for line in &request.items {
            if line.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity for menu item {} must be at least 1",
                    line.menu_item_id
                )));
            }

            let priced = self.menu.price_of(line.menu_item_id).await?;
            subtotal += priced.unit_price * i64::from(line.quantity);
            items.push(OrderItemModel {
                id: Uuid::new_v4(),
                order_id,
                menu_item_id: line.menu_item_id,
                name: priced.name,
                quantity: line.quantity,
                unit_price: priced.unit_price,
            });
        }

        let coupon = match request.coupon_code.as_deref() {
            Some(code) if !code.trim().is_empty() => {
                Some(self.coupons.resolve(code, now.date_naive()).await?)
            }
            _ => None,
        };
        let coupon_code = coupon.as_ref().map(|c| c.code.clone());
        let discount_amount = coupon
            .as_ref()
            .map(|c| discount_for(subtotal, c.discount_percentage));

        // Percentages are capped at 100, so the clamp only guards against
        // future discount kinds; a total is never negative.
        let total_amount = (subtotal - discount_amount.unwrap_or(0)).max(0);

        let order_model = OrderModel {
            id: order_id,
            token_number: generate_token_number(),
            status: OrderStatus::Ordered,
            total_amount,
            coupon_code,
            discount_amount,
            otp_code: None,
            otp_expires_at: None,
            customer_id: customer.user_id,
            customer_email: customer.email.clone(),
            created_at: now,
            completed_at: None,
            version: 1,
        };

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let order = order_model.clone().into_active_model().insert(&txn).await?;
        OrderItemEntity::insert_many(
            items
                .iter()
                .cloned()
                .map(IntoActiveModel::into_active_model),
        )
        .exec(&txn)
        .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit order creation transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id = %order.id,
            token_number = order.token_number,
            total_amount = order.total_amount,
            "Order created"
        );

        self.emit(Event::OrderCreated {
            order_id: order.id,
            token_number: order.token_number,
            total_amount: order.total_amount,
            customer_email: order.customer_email.clone(),
        })
        .await;

        Ok(OrderWithItems { order, items })
    }

    /// Fetch a single order with its items.
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderWithItems, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;

        Ok(OrderWithItems { order, items })
    }

    /// All orders of one customer, newest first.
    pub async fn list_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<OrderWithItems>, ServiceError> {
        let orders = OrderEntity::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        self.attach_items(orders).await
    }

    /// The customer's in-flight orders (ORDERED/PREPARING/READY), newest first.
    pub async fn active_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<OrderWithItems>, ServiceError> {
        let orders = OrderEntity::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .filter(order::Column::Status.is_in([
                OrderStatus::Ordered,
                OrderStatus::Preparing,
                OrderStatus::Ready,
            ]))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        self.attach_items(orders).await
    }

    /// Every order in the system, newest first (kitchen/admin view).
    pub async fn list_all(&self) -> Result<Vec<OrderWithItems>, ServiceError> {
        let orders = OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        self.attach_items(orders).await
    }

    async fn attach_items(
        &self,
        orders: Vec<OrderModel>,
    ) -> Result<Vec<OrderWithItems>, ServiceError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let items = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .all(&*self.db)
            .await?;

        let mut by_order: HashMap<Uuid, Vec<OrderItemModel>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                OrderWithItems { order, items }
            })
            .collect())
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!("Failed to send order event: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_numbers_stay_in_display_range() {
        for _ in 0..1000 {
            let token = generate_token_number();
            assert!((TOKEN_MIN..=TOKEN_MAX).contains(&token));
        }
    }
}
