use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::menu_item::{
        self, ActiveModel as MenuItemActiveModel, Entity as MenuItemEntity, Model as MenuItemModel,
    },
    errors::ServiceError,
};

/// Snapshot of a menu item taken at order time. Orders copy these values so
/// later menu edits never change what was charged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedItem {
    pub name: String,
    pub unit_price: i64,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateMenuItemRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Price must not be negative"))]
    pub price: i64,
    pub category: Option<String>,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub stock_quantity: i32,
    pub preparation_time_minutes: Option<i32>,
    pub image_url: Option<String>,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateMenuItemRequest {
    #[validate(length(min = 1, max = 120, message = "Name must be between 1 and 120 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Price must not be negative"))]
    pub price: Option<i64>,
    pub category: Option<String>,
    pub available: Option<bool>,
    pub stock_quantity: Option<i32>,
    pub preparation_time_minutes: Option<i32>,
    pub image_url: Option<String>,
}

/// Read side of the catalog for order pricing, plus the admin menu management
/// the counter staff uses. Orders only ever consume the priced snapshot.
#[derive(Clone)]
pub struct MenuService {
    db: Arc<DbPool>,
}

impl MenuService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Price a single catalog item for an order being assembled.
    #[instrument(skip(self), fields(menu_item_id = %menu_item_id))]
    pub async fn price_of(&self, menu_item_id: Uuid) -> Result<PricedItem, ServiceError> {
        let item = MenuItemEntity::find_by_id(menu_item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                warn!(%menu_item_id, "Menu item not found while pricing order");
                ServiceError::NotFound(format!("Menu item {} not found", menu_item_id))
            })?;

        Ok(PricedItem {
            name: item.name,
            unit_price: item.price,
        })
    }

    pub async fn list_items(&self) -> Result<Vec<MenuItemModel>, ServiceError> {
        let items = MenuItemEntity::find()
            .order_by_asc(menu_item::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(items)
    }

    pub async fn get_item(&self, id: Uuid) -> Result<MenuItemModel, ServiceError> {
        MenuItemEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Menu item {} not found", id)))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_item(
        &self,
        request: CreateMenuItemRequest,
    ) -> Result<MenuItemModel, ServiceError> {
        request.validate()?;

        let duplicate = MenuItemEntity::find()
            .filter(menu_item::Column::Name.eq(request.name.clone()))
            .one(&*self.db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Menu item '{}' already exists",
                request.name
            )));
        }

        let now = Utc::now();
        let model = MenuItemActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            description: Set(request.description),
            price: Set(request.price),
            category: Set(request.category),
            available: Set(request.available),
            stock_quantity: Set(request.stock_quantity),
            preparation_time_minutes: Set(request.preparation_time_minutes),
            image_url: Set(request.image_url),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let item = model.insert(&*self.db).await?;
        info!(menu_item_id = %item.id, "Menu item created");
        Ok(item)
    }

    #[instrument(skip(self, request), fields(menu_item_id = %id))]
    pub async fn update_item(
        &self,
        id: Uuid,
        request: UpdateMenuItemRequest,
    ) -> Result<MenuItemModel, ServiceError> {
        request.validate()?;

        let item = self.get_item(id).await?;
        let mut active: MenuItemActiveModel = item.into();

        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(category) = request.category {
            active.category = Set(Some(category));
        }
        if let Some(available) = request.available {
            active.available = Set(available);
        }
        if let Some(stock_quantity) = request.stock_quantity {
            active.stock_quantity = Set(stock_quantity);
        }
        if let Some(preparation_time_minutes) = request.preparation_time_minutes {
            active.preparation_time_minutes = Set(Some(preparation_time_minutes));
        }
        if let Some(image_url) = request.image_url {
            active.image_url = Set(Some(image_url));
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&*self.db).await?;
        info!(menu_item_id = %id, "Menu item updated");
        Ok(updated)
    }

    /// Delete a catalog entry. Existing orders are unaffected: order items
    /// carry their own name/price snapshot and reference the menu only weakly.
    #[instrument(skip(self), fields(menu_item_id = %id))]
    pub async fn delete_item(&self, id: Uuid) -> Result<(), ServiceError> {
        let item = self.get_item(id).await?;
        let active: MenuItemActiveModel = item.into();
        active.delete(&*self.db).await?;
        info!(menu_item_id = %id, "Menu item deleted");
        Ok(())
    }
}
