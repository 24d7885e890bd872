use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::menu_item::Model as MenuItemModel,
    errors::ServiceError,
    services::menu::{CreateMenuItemRequest, UpdateMenuItemRequest},
    ApiResponse, AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MenuItemResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub category: Option<String>,
    pub available: bool,
    pub stock_quantity: i32,
    pub preparation_time_minutes: Option<i32>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

fn map_menu_item(model: MenuItemModel) -> MenuItemResponse {
    MenuItemResponse {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        category: model.category,
        available: model.available,
        stock_quantity: model.stock_quantity,
        preparation_time_minutes: model.preparation_time_minutes,
        image_url: model.image_url,
        created_at: model.created_at,
    }
}

/// List the menu (public).
#[utoipa::path(
    get,
    path = "/api/v1/menu",
    responses(
        (status = 200, description = "Menu retrieved successfully", body = ApiResponse<Vec<MenuItemResponse>>)
    ),
    tag = "Menu"
)]
pub async fn list_menu(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<MenuItemResponse>>>, ServiceError> {
    let items = state.services.menu.list_items().await?;
    Ok(Json(ApiResponse::success(
        items.into_iter().map(map_menu_item).collect(),
    )))
}

/// Get one menu item (public).
#[utoipa::path(
    get,
    path = "/api/v1/menu/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Menu item retrieved successfully", body = ApiResponse<MenuItemResponse>),
        (status = 404, description = "Menu item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Menu"
)]
pub async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MenuItemResponse>>, ServiceError> {
    let item = state.services.menu.get_item(id).await?;
    Ok(Json(ApiResponse::success(map_menu_item(item))))
}

/// Add a menu item (admin).
#[utoipa::path(
    post,
    path = "/api/v1/admin/menu",
    request_body = CreateMenuItemRequest,
    responses(
        (status = 201, description = "Menu item created", body = ApiResponse<MenuItemResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate menu item", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Menu"
)]
pub async fn create_menu_item(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateMenuItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MenuItemResponse>>), ServiceError> {
    if !auth_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "Only staff may manage the menu".to_string(),
        ));
    }

    let item = state.services.menu.create_item(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(map_menu_item(item))),
    ))
}

/// Update a menu item (admin).
#[utoipa::path(
    put,
    path = "/api/v1/admin/menu/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    request_body = UpdateMenuItemRequest,
    responses(
        (status = 200, description = "Menu item updated", body = ApiResponse<MenuItemResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Menu item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Menu"
)]
pub async fn update_menu_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateMenuItemRequest>,
) -> Result<Json<ApiResponse<MenuItemResponse>>, ServiceError> {
    if !auth_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "Only staff may manage the menu".to_string(),
        ));
    }

    let item = state.services.menu.update_item(id, request).await?;
    Ok(Json(ApiResponse::success(map_menu_item(item))))
}

/// Remove a menu item (admin). Existing orders keep their snapshots.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/menu/{id}",
    params(("id" = Uuid, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Menu item deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Menu item not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Menu"
)]
pub async fn delete_menu_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    if !auth_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "Only staff may manage the menu".to_string(),
        ));
    }

    state.services.menu.delete_item(id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}
