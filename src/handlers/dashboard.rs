use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::AuthUser,
    errors::ServiceError,
    handlers::orders::{map_order, OrderResponse},
    services::analytics::{DashboardMetrics, TrendBucketing},
    ApiResponse, AppState,
};

/// Query parameters for the admin dashboard
#[derive(Debug, Deserialize, IntoParams)]
pub struct DashboardQuery {
    /// Trend grouping: "daily", "weekly" or "monthly" (default: weekly)
    pub range: Option<String>,
    /// Anchor date (YYYY-MM-DD) the metrics are computed relative to;
    /// defaults to today
    pub date: Option<NaiveDate>,
}

/// What a logged-in customer sees on their home screen.
#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerDashboard {
    pub active_orders: Vec<OrderResponse>,
    pub order_history: Vec<OrderResponse>,
}

fn parse_range(range: Option<&str>) -> TrendBucketing {
    match range.unwrap_or("weekly").to_ascii_lowercase().as_str() {
        "monthly" => TrendBucketing::DailyMonth,
        "weekly" => TrendBucketing::DailyWeek,
        _ => TrendBucketing::Hourly,
    }
}

/// Customer dashboard: in-flight orders plus full history.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses(
        (status = 200, description = "Dashboard retrieved successfully", body = ApiResponse<CustomerDashboard>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Dashboard"
)]
pub async fn customer_dashboard(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<CustomerDashboard>>, ServiceError> {
    let active = state
        .services
        .orders
        .active_for_customer(auth_user.user_id)
        .await?;
    let history = state
        .services
        .orders
        .list_for_customer(auth_user.user_id)
        .await?;

    Ok(Json(ApiResponse::success(CustomerDashboard {
        active_orders: active.into_iter().map(map_order).collect(),
        order_history: history.into_iter().map(map_order).collect(),
    })))
}

/// Admin dashboard: aggregated metrics per the requested range and anchor date.
#[utoipa::path(
    get,
    path = "/api/v1/admin/dashboard",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Dashboard metrics retrieved successfully", body = ApiResponse<DashboardMetrics>),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse)
    ),
    security(("Bearer" = [])),
    tag = "Dashboard"
)]
pub async fn admin_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
    auth_user: AuthUser,
) -> Result<Json<ApiResponse<DashboardMetrics>>, ServiceError> {
    if !auth_user.is_admin() {
        return Err(ServiceError::Forbidden(
            "Only staff may view the dashboard".to_string(),
        ));
    }

    let today = Utc::now().date_naive();
    let anchor = query.date.unwrap_or(today);
    let bucketing = parse_range(query.range.as_deref());

    let metrics = state
        .services
        .analytics
        .admin_dashboard(anchor, bucketing, today)
        .await?;
    Ok(Json(ApiResponse::success(metrics)))
}
