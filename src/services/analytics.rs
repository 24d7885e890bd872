use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity, Model as OrderModel, OrderStatus},
    entities::order_item::{self, Entity as OrderItemEntity, Model as OrderItemModel},
    errors::ServiceError,
};

/// Half-open time window `[start, end)`. All analytics are computed against
/// one consistent clock (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The single calendar day `date`.
    pub fn day(date: NaiveDate) -> Self {
        let start = date.and_hms_opt(0, 0, 0).expect("midnight exists").and_utc();
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    /// The `days` calendar days ending on (and including) `end_day`.
    pub fn trailing_days(end_day: NaiveDate, days: i64) -> Self {
        let end = end_day
            .and_hms_opt(0, 0, 0)
            .expect("midnight exists")
            .and_utc()
            + Duration::days(1);
        Self {
            start: end - Duration::days(days),
            end,
        }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Supported trend groupings, each with a fixed bucket count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendBucketing {
    /// 24 hourly buckets within one day.
    Hourly,
    /// 7 daily buckets within a week.
    DailyWeek,
    /// 30 daily buckets within a month.
    DailyMonth,
}

impl TrendBucketing {
    pub fn bucket_count(&self) -> usize {
        match self {
            Self::Hourly => 24,
            Self::DailyWeek => 7,
            Self::DailyMonth => 30,
        }
    }

    /// The window the buckets cover, ending on `anchor`.
    pub fn window(&self, anchor: NaiveDate) -> Window {
        match self {
            Self::Hourly => Window::day(anchor),
            Self::DailyWeek => Window::trailing_days(anchor, 7),
            Self::DailyMonth => Window::trailing_days(anchor, 30),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrendPoint {
    pub label: String,
    pub revenue: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DemandTier {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DemandEntry {
    pub menu_item_id: Uuid,
    pub name: String,
    pub units_sold: i64,
    pub demand: DemandTier,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HourlyActivity {
    pub hour: String,
    pub orders: u64,
}

/// Everything the admin dashboard renders in one response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardMetrics {
    pub active_orders: u64,
    pub completed_today: u64,
    pub total_orders: u64,
    pub revenue_today: i64,
    pub revenue_weekly: i64,
    pub revenue_monthly: i64,
    /// "HH:00" of the busiest creation hour on the anchor day; null when the
    /// day saw no orders.
    pub peak_hour: Option<String>,
    pub avg_wait_minutes: f64,
    pub demand_analysis: Vec<DemandEntry>,
    pub sales_trend: Vec<TrendPoint>,
    pub hourly_pattern: Vec<HourlyActivity>,
}

/// Pure aggregation logic over in-memory order history. Kept free of I/O so
/// the windowing and tie-break rules are directly testable.
pub(crate) mod compute {
    use super::*;

    /// Sum of totals over COMPLETED orders whose completion fell in the window.
    pub fn revenue(orders: &[OrderModel], window: &Window) -> i64 {
        orders
            .iter()
            .filter(|o| o.status == OrderStatus::Completed)
            .filter(|o| o.completed_at.is_some_and(|t| window.contains(t)))
            .map(|o| o.total_amount)
            .sum()
    }

    /// Live gauge: orders the kitchen still has in flight, regardless of window.
    pub fn active_count(orders: &[OrderModel]) -> u64 {
        orders.iter().filter(|o| o.status.is_active()).count() as u64
    }

    /// Hour of day (0-23) with the most order creations in the window.
    /// Ties go to the lowest hour; an empty window yields `None`.
    pub fn peak_hour(orders: &[OrderModel], window: &Window) -> Option<u32> {
        let mut counts = [0u64; 24];
        for order in orders.iter().filter(|o| window.contains(o.created_at)) {
            counts[order.created_at.hour() as usize] += 1;
        }

        let mut best: Option<u32> = None;
        let mut best_count = 0u64;
        for (hour, &count) in counts.iter().enumerate() {
            if count > best_count {
                best_count = count;
                best = Some(hour as u32);
            }
        }
        best
    }

    /// Mean minutes from creation to completion over orders completed in the
    /// window; 0.0 when none qualify.
    pub fn average_wait_minutes(orders: &[OrderModel], window: &Window) -> f64 {
        let waits: Vec<i64> = orders
            .iter()
            .filter(|o| o.status == OrderStatus::Completed)
            .filter_map(|o| o.completed_at.filter(|t| window.contains(*t)).map(|t| (t, o)))
            .map(|(completed, o)| (completed - o.created_at).num_minutes())
            .collect();

        if waits.is_empty() {
            return 0.0;
        }
        waits.iter().sum::<i64>() as f64 / waits.len() as f64
    }

    /// Rank menu items by units sold and classify relative to the top seller:
    /// high >= 80% of the maximum, medium >= 40%, else low. The caller scopes
    /// `items` to the window; ties keep first-seen order (stable sort).
    pub fn demand_tiers(items: &[OrderItemModel], top_n: usize) -> Vec<DemandEntry> {
        let mut order_of_appearance: Vec<(Uuid, String, i64)> = Vec::new();
        for item in items {
            match order_of_appearance
                .iter_mut()
                .find(|(id, _, _)| *id == item.menu_item_id)
            {
                Some((_, _, sold)) => *sold += i64::from(item.quantity),
                None => order_of_appearance.push((
                    item.menu_item_id,
                    item.name.clone(),
                    i64::from(item.quantity),
                )),
            }
        }

        order_of_appearance.sort_by(|a, b| b.2.cmp(&a.2));
        order_of_appearance.truncate(top_n);

        let max_sold = match order_of_appearance.first() {
            Some((_, _, sold)) => *sold,
            None => return Vec::new(),
        };

        order_of_appearance
            .into_iter()
            .map(|(menu_item_id, name, units_sold)| {
                let demand = if units_sold as f64 >= max_sold as f64 * 0.8 {
                    DemandTier::High
                } else if units_sold as f64 >= max_sold as f64 * 0.4 {
                    DemandTier::Medium
                } else {
                    DemandTier::Low
                };
                DemandEntry {
                    menu_item_id,
                    name,
                    units_sold,
                    demand,
                }
            })
            .collect()
    }

    /// Revenue per bucket over every non-cancelled order created in the
    /// bucketing's window. Always returns the full fixed bucket count,
    /// zero-filled, in chronological order.
    pub fn trend_series(
        orders: &[OrderModel],
        bucketing: TrendBucketing,
        anchor: NaiveDate,
    ) -> Vec<TrendPoint> {
        let window = bucketing.window(anchor);
        let mut buckets = vec![0i64; bucketing.bucket_count()];

        for order in orders
            .iter()
            .filter(|o| o.status != OrderStatus::Cancelled)
            .filter(|o| window.contains(o.created_at))
        {
            let index = match bucketing {
                TrendBucketing::Hourly => order.created_at.hour() as usize,
                TrendBucketing::DailyWeek | TrendBucketing::DailyMonth => {
                    (order.created_at.date_naive() - window.start.date_naive()).num_days() as usize
                }
            };
            if let Some(bucket) = buckets.get_mut(index) {
                *bucket += order.total_amount;
            }
        }

        buckets
            .into_iter()
            .enumerate()
            .map(|(index, revenue)| {
                let label = match bucketing {
                    TrendBucketing::Hourly => format!("{:02}:00", index),
                    TrendBucketing::DailyWeek => {
                        (window.start.date_naive() + Duration::days(index as i64))
                            .format("%a")
                            .to_string()
                    }
                    TrendBucketing::DailyMonth => {
                        (window.start.date_naive() + Duration::days(index as i64))
                            .format("%d %b")
                            .to_string()
                    }
                };
                TrendPoint { label, revenue }
            })
            .collect()
    }

    /// Creation counts for the service hours (09:00-21:00) of the window's day.
    pub fn hourly_activity(orders: &[OrderModel], window: &Window) -> Vec<HourlyActivity> {
        let mut counts = [0u64; 24];
        for order in orders.iter().filter(|o| window.contains(o.created_at)) {
            counts[order.created_at.hour() as usize] += 1;
        }

        (9..=21)
            .map(|hour| HourlyActivity {
                hour: format!("{:02}:00", hour),
                orders: counts[hour as usize],
            })
            .collect()
    }
}

/// Read-side metrics over the immutable order history. Never writes; safe to
/// run concurrently with state-machine transitions (a racing read simply sees
/// an order before or after its transition).
#[derive(Clone)]
pub struct AnalyticsService {
    db: Arc<DbPool>,
}

impl AnalyticsService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn revenue(&self, window: Window) -> Result<i64, ServiceError> {
        let orders = self.completed_in(window).await?;
        Ok(compute::revenue(&orders, &window))
    }

    pub async fn active_count(&self) -> Result<u64, ServiceError> {
        let count = OrderEntity::find()
            .filter(order::Column::Status.is_in([
                OrderStatus::Ordered,
                OrderStatus::Preparing,
                OrderStatus::Ready,
            ]))
            .count(&*self.db)
            .await?;
        Ok(count)
    }

    pub async fn peak_hour(&self, window: Window) -> Result<Option<u32>, ServiceError> {
        let orders = self.created_in(window).await?;
        Ok(compute::peak_hour(&orders, &window))
    }

    pub async fn average_wait_minutes(&self, window: Window) -> Result<f64, ServiceError> {
        let orders = self.completed_in(window).await?;
        Ok(compute::average_wait_minutes(&orders, &window))
    }

    /// Top-selling items, scoped to orders created in `window` (or all time).
    pub async fn demand_tiers(
        &self,
        window: Option<Window>,
        top_n: usize,
    ) -> Result<Vec<DemandEntry>, ServiceError> {
        let items: Vec<OrderItemModel> = match window {
            Some(window) => {
                let order_ids: Vec<Uuid> = self
                    .created_in(window)
                    .await?
                    .into_iter()
                    .map(|o| o.id)
                    .collect();
                if order_ids.is_empty() {
                    return Ok(Vec::new());
                }
                OrderItemEntity::find()
                    .filter(order_item::Column::OrderId.is_in(order_ids))
                    .all(&*self.db)
                    .await?
            }
            None => OrderItemEntity::find().all(&*self.db).await?,
        };

        Ok(compute::demand_tiers(&items, top_n))
    }

    pub async fn trend_series(
        &self,
        bucketing: TrendBucketing,
        anchor: NaiveDate,
    ) -> Result<Vec<TrendPoint>, ServiceError> {
        let window = bucketing.window(anchor);
        let orders = OrderEntity::find()
            .filter(order::Column::Status.ne(OrderStatus::Cancelled))
            .filter(order::Column::CreatedAt.gte(window.start))
            .filter(order::Column::CreatedAt.lt(window.end))
            .all(&*self.db)
            .await?;
        Ok(compute::trend_series(&orders, bucketing, anchor))
    }

    /// Assemble the admin dashboard. Point-in-time stats (revenue, peak hour,
    /// wait, demand) are relative to the anchor date; the sales trend is
    /// anchored to today so the graph always shows the current business curve.
    #[instrument(skip(self))]
    pub async fn admin_dashboard(
        &self,
        anchor: NaiveDate,
        bucketing: TrendBucketing,
        today: NaiveDate,
    ) -> Result<DashboardMetrics, ServiceError> {
        info!(%anchor, "Generating admin dashboard metrics");

        let anchor_day = Window::day(anchor);
        let anchor_week = Window::trailing_days(anchor, 7);
        let anchor_month = Window::trailing_days(anchor, 30);

        let active_orders = self.active_count().await?;
        let total_orders = OrderEntity::find().count(&*self.db).await?;

        let completed_month = self.completed_in(anchor_month).await?;
        let completed_today = completed_month
            .iter()
            .filter(|o| o.completed_at.is_some_and(|t| anchor_day.contains(t)))
            .count() as u64;
        let revenue_today = compute::revenue(&completed_month, &anchor_day);
        let revenue_weekly = compute::revenue(&completed_month, &anchor_week);
        let revenue_monthly = compute::revenue(&completed_month, &anchor_month);
        let avg_wait_minutes = compute::average_wait_minutes(&completed_month, &anchor_day);

        let day_orders = self.created_in(anchor_day).await?;
        let peak_hour =
            compute::peak_hour(&day_orders, &anchor_day).map(|h| format!("{:02}:00", h));
        let hourly_pattern = compute::hourly_activity(&day_orders, &anchor_day);

        let demand_analysis = self.demand_tiers(Some(anchor_day), 6).await?;
        let sales_trend = self.trend_series(bucketing, today).await?;

        Ok(DashboardMetrics {
            active_orders,
            completed_today,
            total_orders,
            revenue_today,
            revenue_weekly,
            revenue_monthly,
            peak_hour,
            avg_wait_minutes,
            demand_analysis,
            sales_trend,
            hourly_pattern,
        })
    }

    async fn created_in(&self, window: Window) -> Result<Vec<OrderModel>, ServiceError> {
        let orders = OrderEntity::find()
            .filter(order::Column::CreatedAt.gte(window.start))
            .filter(order::Column::CreatedAt.lt(window.end))
            .all(&*self.db)
            .await?;
        Ok(orders)
    }

    async fn completed_in(&self, window: Window) -> Result<Vec<OrderModel>, ServiceError> {
        let orders = OrderEntity::find()
            .filter(order::Column::Status.eq(OrderStatus::Completed))
            .filter(order::Column::CompletedAt.gte(window.start))
            .filter(order::Column::CompletedAt.lt(window.end))
            .all(&*self.db)
            .await?;
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::compute;
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(day: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
        day.and_hms_opt(hour, minute, 0).unwrap().and_utc()
    }

    fn order(
        status: OrderStatus,
        total: i64,
        created_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> OrderModel {
        OrderModel {
            id: Uuid::new_v4(),
            token_number: 123,
            status,
            total_amount: total,
            coupon_code: None,
            discount_amount: None,
            otp_code: None,
            otp_expires_at: None,
            customer_id: Uuid::new_v4(),
            customer_email: "user@example.com".to_string(),
            created_at,
            completed_at,
            version: 1,
        }
    }

    fn item(menu_item_id: Uuid, name: &str, quantity: i32) -> OrderItemModel {
        OrderItemModel {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            menu_item_id,
            name: name.to_string(),
            quantity,
            unit_price: 100,
        }
    }

    #[test]
    fn empty_window_yields_zero_metrics() {
        let window = Window::day(date(2025, 6, 2));
        assert_eq!(compute::revenue(&[], &window), 0);
        assert_eq!(compute::average_wait_minutes(&[], &window), 0.0);
        assert_eq!(compute::peak_hour(&[], &window), None);
    }

    #[test]
    fn revenue_counts_only_completions_inside_the_window() {
        let day = date(2025, 6, 2);
        let window = Window::day(day);
        let orders = vec![
            // Completed inside the window.
            order(
                OrderStatus::Completed,
                500,
                at(day, 9, 0),
                Some(at(day, 9, 30)),
            ),
            // Completed the day after: outside.
            order(
                OrderStatus::Completed,
                900,
                at(day, 22, 0),
                Some(at(day + Duration::days(1), 0, 0)),
            ),
            // Still in flight: no completion.
            order(OrderStatus::Ready, 700, at(day, 10, 0), None),
            // Cancelled orders never count.
            order(OrderStatus::Cancelled, 300, at(day, 11, 0), None),
        ];

        assert_eq!(compute::revenue(&orders, &window), 500);
    }

    #[test]
    fn window_is_half_open() {
        let day = date(2025, 6, 2);
        let window = Window::day(day);
        assert!(window.contains(at(day, 0, 0)));
        assert!(!window.contains(at(day + Duration::days(1), 0, 0)));
    }

    #[test]
    fn active_count_is_window_independent() {
        let day = date(2025, 6, 2);
        let orders = vec![
            order(OrderStatus::Ordered, 100, at(day, 9, 0), None),
            order(OrderStatus::Preparing, 100, at(day, 9, 0), None),
            order(OrderStatus::Ready, 100, at(day, 9, 0), None),
            order(
                OrderStatus::Completed,
                100,
                at(day, 9, 0),
                Some(at(day, 9, 20)),
            ),
            order(OrderStatus::Cancelled, 100, at(day, 9, 0), None),
        ];
        assert_eq!(compute::active_count(&orders), 3);
    }

    #[test]
    fn peak_hour_tie_breaks_to_the_lowest_hour() {
        let day = date(2025, 6, 2);
        let window = Window::day(day);
        let orders = vec![
            order(OrderStatus::Ordered, 100, at(day, 13, 0), None),
            order(OrderStatus::Ordered, 100, at(day, 13, 30), None),
            order(OrderStatus::Ordered, 100, at(day, 11, 0), None),
            order(OrderStatus::Ordered, 100, at(day, 11, 45), None),
            order(OrderStatus::Ordered, 100, at(day, 16, 0), None),
        ];
        assert_eq!(compute::peak_hour(&orders, &window), Some(11));
    }

    #[test]
    fn average_wait_is_the_mean_of_completion_minutes() {
        let day = date(2025, 6, 2);
        let window = Window::day(day);
        let orders = vec![
            order(
                OrderStatus::Completed,
                100,
                at(day, 9, 0),
                Some(at(day, 9, 10)),
            ),
            order(
                OrderStatus::Completed,
                100,
                at(day, 10, 0),
                Some(at(day, 10, 30)),
            ),
        ];
        assert_eq!(compute::average_wait_minutes(&orders, &window), 20.0);
    }

    #[test]
    fn demand_tiers_classify_relative_to_the_top_seller() {
        let burger = Uuid::new_v4();
        let fries = Uuid::new_v4();
        let tea = Uuid::new_v4();
        let items = vec![
            item(burger, "Burger", 6),
            item(fries, "Fries", 3),
            item(tea, "Tea", 1),
            item(burger, "Burger", 4),
        ];

        let tiers = compute::demand_tiers(&items, 6);
        assert_eq!(tiers.len(), 3);
        assert_eq!(tiers[0].name, "Burger");
        assert_eq!(tiers[0].units_sold, 10);
        assert_eq!(tiers[0].demand, DemandTier::High);
        // 3 of 10 is below 40%: low. 1 of 10: low.
        assert_eq!(tiers[1].demand, DemandTier::Low);
        assert_eq!(tiers[2].demand, DemandTier::Low);
    }

    #[test]
    fn demand_tier_boundaries() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let items = vec![
            item(a, "A", 10),
            item(b, "B", 8), // exactly 80% -> high
            item(c, "C", 4), // exactly 40% -> medium
        ];

        let tiers = compute::demand_tiers(&items, 6);
        assert_eq!(tiers[0].demand, DemandTier::High);
        assert_eq!(tiers[1].demand, DemandTier::High);
        assert_eq!(tiers[2].demand, DemandTier::Medium);
    }

    #[test]
    fn demand_ties_keep_first_seen_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let items = vec![item(a, "First", 5), item(b, "Second", 5)];

        let tiers = compute::demand_tiers(&items, 6);
        assert_eq!(tiers[0].name, "First");
        assert_eq!(tiers[1].name, "Second");
    }

    #[test]
    fn trend_series_always_has_the_full_bucket_count() {
        let anchor = date(2025, 6, 2);
        assert_eq!(
            compute::trend_series(&[], TrendBucketing::Hourly, anchor).len(),
            24
        );
        assert_eq!(
            compute::trend_series(&[], TrendBucketing::DailyWeek, anchor).len(),
            7
        );
        assert_eq!(
            compute::trend_series(&[], TrendBucketing::DailyMonth, anchor).len(),
            30
        );
    }

    #[test]
    fn hourly_trend_buckets_by_creation_hour_and_skips_cancelled() {
        let day = date(2025, 6, 2);
        let orders = vec![
            order(OrderStatus::Ordered, 150, at(day, 9, 15), None),
            order(OrderStatus::Preparing, 100, at(day, 9, 45), None),
            order(
                OrderStatus::Completed,
                200,
                at(day, 12, 0),
                Some(at(day, 12, 30)),
            ),
            order(OrderStatus::Cancelled, 999, at(day, 9, 30), None),
        ];

        let series = compute::trend_series(&orders, TrendBucketing::Hourly, day);
        assert_eq!(series[9].label, "09:00");
        assert_eq!(series[9].revenue, 250);
        assert_eq!(series[12].revenue, 200);
        assert_eq!(series[0].revenue, 0);
    }

    #[test]
    fn weekly_trend_ends_on_the_anchor_day() {
        let anchor = date(2025, 6, 8);
        let orders = vec![
            order(OrderStatus::Ordered, 300, at(anchor, 10, 0), None),
            order(
                OrderStatus::Ordered,
                400,
                at(anchor - Duration::days(6), 10, 0),
                None,
            ),
            // A week earlier: outside the 7-day window.
            order(
                OrderStatus::Ordered,
                500,
                at(anchor - Duration::days(7), 10, 0),
                None,
            ),
        ];

        let series = compute::trend_series(&orders, TrendBucketing::DailyWeek, anchor);
        assert_eq!(series.len(), 7);
        assert_eq!(series[0].revenue, 400);
        assert_eq!(series[6].revenue, 300);
        assert_eq!(series.iter().map(|p| p.revenue).sum::<i64>(), 700);
    }

    #[test]
    fn hourly_activity_covers_service_hours_only() {
        let day = date(2025, 6, 2);
        let window = Window::day(day);
        let orders = vec![
            order(OrderStatus::Ordered, 100, at(day, 9, 0), None),
            order(OrderStatus::Ordered, 100, at(day, 21, 59), None),
            // Before opening: counted nowhere in the 9-21 pattern.
            order(OrderStatus::Ordered, 100, at(day, 7, 0), None),
        ];

        let pattern = compute::hourly_activity(&orders, &window);
        assert_eq!(pattern.len(), 13);
        assert_eq!(pattern[0].hour, "09:00");
        assert_eq!(pattern[0].orders, 1);
        assert_eq!(pattern[12].hour, "21:00");
        assert_eq!(pattern[12].orders, 1);
        assert_eq!(pattern.iter().map(|p| p.orders).sum::<u64>(), 2);
    }
}
