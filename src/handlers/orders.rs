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
    entities::order::OrderStatus,
    errors::ServiceError,
    services::orders::{CreateOrderRequest, OrderWithItems},
    ApiResponse, AppState,
};

/// Public representation of an order.
///
/// The OTP never appears here: the pickup code reaches the owner through the
/// notification path only.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub token_number: i32,
    pub status: OrderStatus,
    pub total_amount: i64,
    pub coupon_code: Option<String>,
    pub discount_amount: Option<i64>,
    pub customer_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItemResponse {
    pub menu_item_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_total: i64,
}

pub(crate) fn map_order(order: OrderWithItems) -> OrderResponse {
    let OrderWithItems { order, items } = order;
    OrderResponse {
        id: order.id,
        token_number: order.token_number,
        status: order.status,
        total_amount: order.total_amount,
        coupon_code: order.coupon_code,
        discount_amount: order.discount_amount,
        customer_id: order.customer_id,
        created_at: order.created_at,
        completed_at: order.completed_at,
        items: items
            .into_iter()
            .map(|item| OrderItemResponse {
                menu_item_id: item.menu_item_id,
                name: item.name,
                quantity: item.quantity,
                line_total: item.unit_price * i64::from(item.quantity),
                unit_price: item.unit_price,
            })
            .collect(),
    }
}

/// Place an order from a cart payload.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    summary = "Create order",
    description = "Create a new order. Prices and names are copied from the menu at this moment; an optional coupon code is resolved and applied to the total.",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created successfully", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Empty item list or unusable coupon", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown menu item or coupon", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OrderResponse>>), ServiceError> {
    let created = state
        .services
        .orders
        .create_order(&auth_user, request)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(map_order(created))),
    ))
}

/// List the caller's own orders, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    responses(
        (status = 200, description = "Orders retrieved successfully", body = ApiResponse<Vec<OrderResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ServiceError> {
    let orders = state
        .services
        .orders
        .list_for_customer(auth_user.user_id)
        .await?;
    Ok(Json(ApiResponse::success(
        orders.into_iter().map(map_order).collect(),
    )))
}

/// Get one order. Customers see their own orders; staff see any.
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order retrieved successfully", body = ApiResponse<OrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the order owner", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.get_order(id).await?;
    if order.order.customer_id != auth_user.user_id && !auth_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "You may only view your own orders".to_string(),
        ));
    }
    Ok(Json(ApiResponse::success(map_order(order))))
}

/// Cancel an order. Only legal while the kitchen has not started (ORDERED).
#[utoipa::path(
    put,
    path = "/api/v1/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order cancelled", body = ApiResponse<OrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Not the order owner", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order already in preparation", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    state
        .services
        .order_status
        .cancel(id, auth_user.user_id)
        .await?;
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(map_order(order))))
}
