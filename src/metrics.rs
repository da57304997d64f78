//! Business metrics for the storefront engine.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `storefront_orders_total{status}` - Orders by outcome (created, cancelled, deleted)
//! - `storefront_order_revenue_cents_total` - Committed order value in cents
//! - `storefront_order_rejections_total{reason}` - Failed order attempts by reason
//! - `storefront_tickets_issued_total` - Ticket units minted
//! - `storefront_tickets_redeemed_total` - One-time redemptions performed

use metrics::{counter, describe_counter};

/// Initialize and register all business metric descriptions.
///
/// Call once at process startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "storefront_orders_total",
        "Total number of orders by outcome (created, cancelled, deleted)"
    );
    describe_counter!(
        "storefront_order_revenue_cents_total",
        "Total committed order value in cents"
    );
    describe_counter!(
        "storefront_order_rejections_total",
        "Total failed order attempts by reason (out_of_stock, insufficient_funds, other)"
    );
    describe_counter!(
        "storefront_tickets_issued_total",
        "Total number of ticket units minted"
    );
    describe_counter!(
        "storefront_tickets_redeemed_total",
        "Total number of one-time ticket redemptions"
    );

    tracing::info!("Business metrics registered");
}

/// Record a committed order.
pub fn record_order_created(total_cents: i64, tickets_issued: usize) {
    counter!("storefront_orders_total", "status" => "created").increment(1);
    counter!("storefront_order_revenue_cents_total")
        .increment(u64::try_from(total_cents).unwrap_or(0));
    counter!("storefront_tickets_issued_total").increment(tickets_issued as u64);
}

/// Record a rejected order attempt.
pub fn record_order_rejected(reason: &'static str) {
    counter!("storefront_order_rejections_total", "reason" => reason).increment(1);
}

/// Record an order cancellation.
pub fn record_order_cancelled() {
    counter!("storefront_orders_total", "status" => "cancelled").increment(1);
}

/// Record an order deletion.
pub fn record_order_deleted() {
    counter!("storefront_orders_total", "status" => "deleted").increment(1);
}

/// Record a successful ticket redemption.
pub fn record_ticket_redeemed() {
    counter!("storefront_tickets_redeemed_total").increment(1);
}
