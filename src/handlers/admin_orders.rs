use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    entities::order::OrderStatus,
    errors::ServiceError,
    handlers::orders::{map_order, OrderResponse},
    ApiResponse, AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CompleteOrderRequest {
    #[validate(length(min = 1, message = "Pickup code is required"))]
    pub otp: String,
}

/// List every order in the system, newest first (kitchen view).
#[utoipa::path(
    get,
    path = "/api/v1/admin/orders",
    responses(
        (status = 200, description = "Orders retrieved successfully", body = ApiResponse<Vec<OrderResponse>>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, ServiceError> {
    if !auth_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "Only staff may list all orders".to_string(),
        ));
    }

    let orders = state.services.orders.list_all().await?;
    Ok(Json(ApiResponse::success(
        orders.into_iter().map(map_order).collect(),
    )))
}

/// Advance an order to the next stage.
///
/// Entering READY mints the pickup code, which travels to the owner via the
/// notification path; it is never part of this response. Direct
/// READY -> COMPLETED through this endpoint bypasses the OTP check and is the
/// administrative escape hatch; the regular pickup flow is the complete
/// endpoint below.
#[utoipa::path(
    put,
    path = "/api/v1/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = ApiResponse<OrderResponse>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Illegal transition or concurrent update", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    if !auth_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "Only staff may update order status".to_string(),
        ));
    }

    state
        .services
        .order_status
        .advance_status(id, request.status)
        .await?;
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(map_order(order))))
}

/// Complete a READY order by validating the customer's pickup code. This is
/// the fraud-resistant completion path.
#[utoipa::path(
    post,
    path = "/api/v1/admin/orders/{id}/complete",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = CompleteOrderRequest,
    responses(
        (status = 200, description = "Order completed", body = ApiResponse<OrderResponse>),
        (status = 400, description = "Invalid or expired pickup code", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is not READY", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Admin"
)]
pub async fn complete_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<CompleteOrderRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    if !auth_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "Only staff may complete orders".to_string(),
        ));
    }
    request.validate()?;

    state
        .services
        .order_status
        .complete_with_otp(id, &request.otp)
        .await?;
    let order = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(map_order(order))))
}
