//! Error types for the order fulfillment and ticket lifecycle engine.

use crate::types::{OrderStatus, ProductId, Souls};
use thiserror::Error;

/// Result type alias for storefront operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error taxonomy for order creation, lifecycle transitions, and ticket
/// redemption.
///
/// Every variant names a distinct condition so callers can tell "out of
/// stock" from "insufficient balance" from "already redeemed". Any error
/// raised during order creation means the whole transaction was rolled back:
/// no partial order, no leaked stock reservation, no partial debit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    // ═══════════════════════════════════════════════════════════
    // Order Creation
    // ═══════════════════════════════════════════════════════════

    /// The requested product does not exist or is inactive.
    #[error("Product not found")]
    ProductNotFound,

    /// Not enough stock to cover the requested quantity.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product that could not be reserved
        product_id: ProductId,
        /// Units requested
        requested: u32,
        /// Units actually available
        available: u32,
    },

    /// The account balance cannot cover the order total.
    #[error("Insufficient funds: required {required} souls, available {available}")]
    InsufficientFunds {
        /// Whole-soul amount the order requires
        required: Souls,
        /// Whole-soul balance actually available
        available: Souls,
    },

    /// The cart contained no purchasable lines.
    #[error("Order must contain at least one item")]
    EmptyOrder,

    /// A unique order number or ticket code could not be issued even after
    /// the single controlled retry.
    #[error("Failed to issue a unique code")]
    CodeIssuanceFailed,

    // ═══════════════════════════════════════════════════════════
    // Ticket Redemption
    // ═══════════════════════════════════════════════════════════

    /// No ticket exists with the presented code.
    #[error("Ticket not found")]
    TicketNotFound,

    /// The ticket is no longer redeemable: already used, or voided by
    /// expiry/cancellation. Redemption is strictly one-time and terminal
    /// states never cycle back to `valid`.
    #[error("Ticket {code} is not redeemable (already used, expired, or cancelled)")]
    TicketAlreadyUsed {
        /// The presented code
        code: String,
    },

    // ═══════════════════════════════════════════════════════════
    // Order Lifecycle
    // ═══════════════════════════════════════════════════════════

    /// No order exists with the given identifier.
    #[error("Order not found")]
    OrderNotFound,

    /// The requested status change is not a legal transition.
    #[error("Illegal order status transition: {from} -> {to}")]
    IllegalStatusTransition {
        /// Current status
        from: OrderStatus,
        /// Requested status
        to: OrderStatus,
    },

    // ═══════════════════════════════════════════════════════════
    // Persistence
    // ═══════════════════════════════════════════════════════════

    /// A persisted uniqueness constraint rejected an order number or ticket
    /// code. Internal signal: the orchestrator retries issuance once and
    /// surfaces [`StoreError::CodeIssuanceFailed`]; this variant never
    /// escapes the service layer.
    #[error("Duplicate code rejected by the store")]
    DuplicateCode,

    /// The persistence layer failed.
    #[error("Database error: {0}")]
    Database(String),
}
