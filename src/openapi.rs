use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Canteen API",
        version = "0.1.0",
        description = r#"
# Canteen Ordering API

Backend for a campus canteen: customers place orders, the kitchen advances
them through preparation stages, and pickup is gated by a one-time code sent
to the order owner.

## Authentication

Endpoints require a bearer token issued by the identity provider:

```
Authorization: Bearer <token>
```

Staff endpoints additionally require the `admin` role. Menu reads are public.

## Error Handling

Errors use a consistent JSON shape with a stable `code` field so clients can
distinguish, for example, an illegal status transition (`invalid_transition`)
from a lost concurrent update (`conflict`).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Order creation and customer order management"),
        (name = "Admin", description = "Kitchen and staff order operations"),
        (name = "Menu", description = "Menu browsing and management"),
        (name = "Coupons", description = "Coupon validation and management"),
        (name = "Dashboard", description = "Customer and admin dashboards")
    ),
    paths(
        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_my_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::cancel_order,

        // Admin order flow
        crate::handlers::admin_orders::list_orders,
        crate::handlers::admin_orders::update_order_status,
        crate::handlers::admin_orders::complete_order,

        // Menu
        crate::handlers::menu::list_menu,
        crate::handlers::menu::get_menu_item,
        crate::handlers::menu::create_menu_item,
        crate::handlers::menu::update_menu_item,
        crate::handlers::menu::delete_menu_item,

        // Coupons
        crate::handlers::coupons::validate_coupon,
        crate::handlers::coupons::list_coupons,
        crate::handlers::coupons::create_coupon,
        crate::handlers::coupons::update_coupon,
        crate::handlers::coupons::delete_coupon,

        // Dashboards
        crate::handlers::dashboard::customer_dashboard,
        crate::handlers::dashboard::admin_dashboard,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,

            // Order types
            crate::handlers::orders::OrderResponse,
            crate::handlers::orders::OrderItemResponse,
            crate::handlers::admin_orders::UpdateOrderStatusRequest,
            crate::handlers::admin_orders::CompleteOrderRequest,
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::CreateOrderItem,
            crate::entities::order::OrderStatus,

            // Menu types
            crate::handlers::menu::MenuItemResponse,
            crate::services::menu::CreateMenuItemRequest,
            crate::services::menu::UpdateMenuItemRequest,

            // Coupon types
            crate::handlers::coupons::CouponResponse,
            crate::handlers::coupons::ValidateCouponRequest,
            crate::services::coupons::CreateCouponRequest,
            crate::services::coupons::UpdateCouponRequest,
            crate::services::coupons::ResolvedCoupon,

            // Dashboard types
            crate::handlers::dashboard::CustomerDashboard,
            crate::services::analytics::DashboardMetrics,
            crate::services::analytics::DemandEntry,
            crate::services::analytics::DemandTier,
            crate::services::analytics::TrendPoint,
            crate::services::analytics::HourlyActivity,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
