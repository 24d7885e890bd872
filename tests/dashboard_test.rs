//! Integration tests for the dashboard surfaces: the admin metrics
//! aggregation over seeded order history and the customer dashboard split.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use common::{response_json, TestApp};
use sea_orm::{ActiveModelTrait, IntoActiveModel};
use serde_json::json;
use uuid::Uuid;

use canteen_api::entities::{order, order_item};
use canteen_api::entities::order::OrderStatus;
use canteen_api::services::menu::CreateMenuItemRequest;

fn anchor_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    date.and_hms_opt(hour, minute, 0).unwrap().and_utc()
}

async fn insert_order(
    app: &TestApp,
    status: OrderStatus,
    total_amount: i64,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
) -> Uuid {
    let id = Uuid::new_v4();
    let model = order::Model {
        id,
        token_number: 500,
        status,
        total_amount,
        coupon_code: None,
        discount_amount: None,
        otp_code: None,
        otp_expires_at: None,
        customer_id: Uuid::new_v4(),
        customer_email: "seed@campus.test".to_string(),
        created_at,
        completed_at,
        version: 1,
    };
    model
        .into_active_model()
        .insert(&*app.state.db)
        .await
        .expect("seed order");
    id
}

async fn insert_item(app: &TestApp, order_id: Uuid, menu_item_id: Uuid, name: &str, quantity: i32) {
    let model = order_item::Model {
        id: Uuid::new_v4(),
        order_id,
        menu_item_id,
        name: name.to_string(),
        quantity,
        unit_price: 100,
    };
    model
        .into_active_model()
        .insert(&*app.state.db)
        .await
        .expect("seed order item");
}

#[tokio::test]
async fn empty_history_yields_zero_metrics_and_full_buckets() {
    let app = TestApp::new().await;
    let admin = app.admin_token();

    let response = app
        .request(
            Method::GET,
            "/api/v1/admin/dashboard?range=daily",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let data = &body["data"];

    assert_eq!(data["active_orders"], 0);
    assert_eq!(data["total_orders"], 0);
    assert_eq!(data["revenue_today"], 0);
    assert_eq!(data["revenue_weekly"], 0);
    assert_eq!(data["revenue_monthly"], 0);
    assert_eq!(data["avg_wait_minutes"], 0.0);
    assert!(data["peak_hour"].is_null());
    assert_eq!(data["demand_analysis"].as_array().unwrap().len(), 0);
    // Buckets are always dense: 24 hourly points, 13 service-hour slots.
    assert_eq!(data["sales_trend"].as_array().unwrap().len(), 24);
    assert_eq!(data["hourly_pattern"].as_array().unwrap().len(), 13);
}

#[tokio::test]
async fn trend_bucket_counts_follow_the_range() {
    let app = TestApp::new().await;
    let admin = app.admin_token();

    for (range, buckets) in [("weekly", 7), ("monthly", 30), ("daily", 24)] {
        let response = app
            .request(
                Method::GET,
                &format!("/api/v1/admin/dashboard?range={range}"),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(
            body["data"]["sales_trend"].as_array().unwrap().len(),
            buckets,
            "range {range}"
        );
    }
}

#[tokio::test]
async fn anchor_day_metrics_aggregate_the_seeded_history() {
    let app = TestApp::new().await;
    let admin = app.admin_token();
    let day = anchor_date();

    // Two completed orders on the anchor day: waits of 10 and 30 minutes.
    let done_a = insert_order(
        &app,
        OrderStatus::Completed,
        300,
        at(day, 11, 0),
        Some(at(day, 11, 10)),
    )
    .await;
    let done_b = insert_order(
        &app,
        OrderStatus::Completed,
        200,
        at(day, 13, 0),
        Some(at(day, 13, 30)),
    )
    .await;
    // A second creation at 13:xx makes 13 the peak hour.
    insert_order(&app, OrderStatus::Preparing, 150, at(day, 13, 45), None).await;
    // Cancelled orders influence nothing but total counts.
    insert_order(&app, OrderStatus::Cancelled, 999, at(day, 12, 0), None).await;
    // Completed the day before: outside the anchor day, inside the week.
    insert_order(
        &app,
        OrderStatus::Completed,
        400,
        at(day - ChronoDuration::days(1), 10, 0),
        Some(at(day - ChronoDuration::days(1), 10, 20)),
    )
    .await;

    let burger = Uuid::new_v4();
    let tea = Uuid::new_v4();
    insert_item(&app, done_a, burger, "Burger", 2).await;
    insert_item(&app, done_b, burger, "Burger", 1).await;
    insert_item(&app, done_b, tea, "Tea", 1).await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/admin/dashboard?range=weekly&date={day}"),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let data = &body["data"];

    assert_eq!(data["total_orders"], 5);
    assert_eq!(data["active_orders"], 1);
    assert_eq!(data["completed_today"], 2);
    assert_eq!(data["revenue_today"], 500);
    // Trailing week ending on the anchor also catches the 400 from yesterday.
    assert_eq!(data["revenue_weekly"], 900);
    assert_eq!(data["revenue_monthly"], 900);
    assert_eq!(data["peak_hour"], "13:00");
    assert_eq!(data["avg_wait_minutes"], 20.0);

    // Demand: 3 burgers (top seller, high), 1 tea (33% of max, low).
    let demand = data["demand_analysis"].as_array().unwrap();
    assert_eq!(demand.len(), 2);
    assert_eq!(demand[0]["name"], "Burger");
    assert_eq!(demand[0]["units_sold"], 3);
    assert_eq!(demand[0]["demand"], "high");
    assert_eq!(demand[1]["name"], "Tea");
    assert_eq!(demand[1]["demand"], "low");

    // The 13:00 slot of the anchor-day activity pattern saw two creations.
    let pattern = data["hourly_pattern"].as_array().unwrap();
    let one_pm = pattern
        .iter()
        .find(|p| p["hour"] == "13:00")
        .expect("13:00 slot");
    assert_eq!(one_pm["orders"], 2);
}

#[tokio::test]
async fn dashboard_requires_staff_role() {
    let app = TestApp::new().await;
    let customer = app.customer_token(Uuid::new_v4(), "alice@campus.test");

    let response = app
        .request(Method::GET, "/api/v1/admin/dashboard", Some(&customer), None)
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .request(Method::GET, "/api/v1/admin/dashboard", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn customer_dashboard_splits_active_orders_from_history() {
    let app = TestApp::new().await;
    let customer = Uuid::new_v4();
    let token = app.customer_token(customer, "alice@campus.test");

    let item_id = app
        .state
        .services
        .menu
        .create_item(CreateMenuItemRequest {
            name: "Burger".to_string(),
            description: None,
            price: 100,
            category: None,
            available: true,
            stock_quantity: 10,
            preparation_time_minutes: None,
            image_url: None,
        })
        .await
        .unwrap()
        .id;

    for _ in 0..2 {
        let response = app
            .request(
                Method::POST,
                "/api/v1/orders",
                Some(&token),
                Some(json!({ "items": [{ "menu_item_id": item_id, "quantity": 1 }] })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    // Cancel one of them; it must drop out of the active list but stay in history.
    let orders = app
        .state
        .services
        .orders
        .list_for_customer(customer)
        .await
        .unwrap();
    let cancelled_id = orders[0].order.id;
    app.state
        .services
        .order_status
        .cancel(cancelled_id, customer)
        .await
        .unwrap();

    let response = app
        .request(Method::GET, "/api/v1/dashboard", Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;

    assert_eq!(body["data"]["active_orders"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["order_history"].as_array().unwrap().len(), 2);

    // Another customer sees none of it.
    let other = app.customer_token(Uuid::new_v4(), "bob@campus.test");
    let response = app
        .request(Method::GET, "/api/v1/dashboard", Some(&other), None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["order_history"].as_array().unwrap().len(), 0);
}
