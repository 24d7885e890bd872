pub mod admin_orders;
pub mod coupons;
pub mod dashboard;
pub mod menu;
pub mod orders;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    analytics::AnalyticsService, coupons::CouponService, menu::MenuService,
    order_status::OrderStatusService, orders::OrderService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub menu: Arc<MenuService>,
    pub coupons: Arc<CouponService>,
    pub orders: Arc<OrderService>,
    pub order_status: Arc<OrderStatusService>,
    pub analytics: Arc<AnalyticsService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let menu = Arc::new(MenuService::new(db.clone()));
        let coupons = Arc::new(CouponService::new(db.clone(), Some(event_sender.clone())));
        let orders = Arc::new(OrderService::new(
            db.clone(),
            menu.clone(),
            coupons.clone(),
            Some(event_sender.clone()),
        ));
        let order_status = Arc::new(OrderStatusService::new(db.clone(), Some(event_sender)));
        let analytics = Arc::new(AnalyticsService::new(db));

        Self {
            menu,
            coupons,
            orders,
            order_status,
            analytics,
        }
    }
}
