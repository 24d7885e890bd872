//! Canteen API Library
//!
//! This crate provides the core functionality for the canteen ordering API:
//! the order lifecycle (creation, kitchen status flow, OTP-gated pickup),
//! coupon-adjusted pricing, and the dashboard analytics derived from order
//! history.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod notifications;
pub mod openapi;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrapper
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Build the full `/api/v1` surface.
pub fn api_v1_routes() -> Router<AppState> {
    // Customer-facing routes; authentication happens in each handler's
    // AuthUser extractor. Menu reads are public.
    let customer = Router::new()
        .route(
            "/orders",
            axum::routing::post(handlers::orders::create_order).get(handlers::orders::list_my_orders),
        )
        .route("/orders/:id", get(handlers::orders::get_order))
        .route(
            "/orders/:id/cancel",
            axum::routing::put(handlers::orders::cancel_order),
        )
        .route("/dashboard", get(handlers::dashboard::customer_dashboard))
        .route("/menu", get(handlers::menu::list_menu))
        .route("/menu/:id", get(handlers::menu::get_menu_item))
        .route(
            "/coupons/validate",
            axum::routing::post(handlers::coupons::validate_coupon),
        );

    // Staff routes; each handler checks the admin role.
    let admin = Router::new()
        .route("/admin/orders", get(handlers::admin_orders::list_orders))
        .route(
            "/admin/orders/:id/status",
            axum::routing::put(handlers::admin_orders::update_order_status),
        )
        .route(
            "/admin/orders/:id/complete",
            axum::routing::post(handlers::admin_orders::complete_order),
        )
        .route("/admin/dashboard", get(handlers::dashboard::admin_dashboard))
        .route(
            "/admin/menu",
            axum::routing::post(handlers::menu::create_menu_item),
        )
        .route(
            "/admin/menu/:id",
            axum::routing::put(handlers::menu::update_menu_item)
                .delete(handlers::menu::delete_menu_item),
        )
        .route(
            "/admin/coupons",
            get(handlers::coupons::list_coupons).post(handlers::coupons::create_coupon),
        )
        .route(
            "/admin/coupons/:id",
            axum::routing::put(handlers::coupons::update_coupon)
                .delete(handlers::coupons::delete_coupon),
        );

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(customer)
        .merge(admin)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "service": "canteen-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
