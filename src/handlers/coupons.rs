use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    entities::coupon::Model as CouponModel,
    errors::ServiceError,
    services::coupons::{CreateCouponRequest, ResolvedCoupon, UpdateCouponRequest},
    ApiResponse, AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CouponResponse {
    pub id: Uuid,
    pub code: String,
    pub discount_percentage: i32,
    pub expiry_date: Option<NaiveDate>,
    pub active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateCouponRequest {
    pub code: String,
}

fn map_coupon(model: CouponModel) -> CouponResponse {
    CouponResponse {
        id: model.id,
        code: model.code,
        discount_percentage: model.discount_percentage,
        expiry_date: model.expiry_date,
        active: model.active,
    }
}

/// Pre-check a coupon code before checkout.
#[utoipa::path(
    post,
    path = "/api/v1/coupons/validate",
    request_body = ValidateCouponRequest,
    responses(
        (status = 200, description = "Coupon is valid", body = ApiResponse<ResolvedCoupon>),
        (status = 400, description = "Coupon inactive or expired", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown coupon code", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Coupons"
)]
pub async fn validate_coupon(
    State(state): State<AppState>,
    _auth_user: AuthUser,
    Json(request): Json<ValidateCouponRequest>,
) -> Result<Json<ApiResponse<ResolvedCoupon>>, ServiceError> {
    let resolved = state
        .services
        .coupons
        .resolve(&request.code, Utc::now().date_naive())
        .await?;
    Ok(Json(ApiResponse::success(resolved)))
}

/// List all coupons (admin).
#[utoipa::path(
    get,
    path = "/api/v1/admin/coupons",
    responses(
        (status = 200, description = "Coupons retrieved successfully", body = ApiResponse<Vec<CouponResponse>>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Coupons"
)]
pub async fn list_coupons(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<Vec<CouponResponse>>>, ServiceError> {
    if !auth_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "Only staff may manage coupons".to_string(),
        ));
    }

    let coupons = state.services.coupons.list_coupons().await?;
    Ok(Json(ApiResponse::success(
        coupons.into_iter().map(map_coupon).collect(),
    )))
}

/// Create a coupon (admin). An active coupon is broadcast to the "coupons"
/// notification topic.
#[utoipa::path(
    post,
    path = "/api/v1/admin/coupons",
    request_body = CreateCouponRequest,
    responses(
        (status = 201, description = "Coupon created", body = ApiResponse<CouponResponse>),
        (status = 400, description = "Invalid request data", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 409, description = "Coupon code already exists", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Coupons"
)]
pub async fn create_coupon(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(request): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CouponResponse>>), ServiceError> {
    if !auth_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "Only staff may manage coupons".to_string(),
        ));
    }

    let coupon = state.services.coupons.create_coupon(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(map_coupon(coupon))),
    ))
}

/// Update a coupon (admin).
#[utoipa::path(
    put,
    path = "/api/v1/admin/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon ID")),
    request_body = UpdateCouponRequest,
    responses(
        (status = 200, description = "Coupon updated", body = ApiResponse<CouponResponse>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Coupons"
)]
pub async fn update_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
    Json(request): Json<UpdateCouponRequest>,
) -> Result<Json<ApiResponse<CouponResponse>>, ServiceError> {
    if !auth_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "Only staff may manage coupons".to_string(),
        ));
    }

    let coupon = state.services.coupons.update_coupon(id, request).await?;
    Ok(Json(ApiResponse::success(map_coupon(coupon))))
}

/// Delete a coupon (admin).
#[utoipa::path(
    delete,
    path = "/api/v1/admin/coupons/{id}",
    params(("id" = Uuid, Path, description = "Coupon ID")),
    responses(
        (status = 200, description = "Coupon deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Coupons"
)]
pub async fn delete_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<serde_json::Value>>, ServiceError> {
    if !auth_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "Only staff may manage coupons".to_string(),
        ));
    }

    state.services.coupons.delete_coupon(id).await?;
    Ok(Json(ApiResponse::success(
        serde_json::json!({ "deleted": id }),
    )))
}
