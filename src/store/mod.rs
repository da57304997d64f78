//! Persistence boundary for the storefront engine.
//!
//! [`StorefrontStore`] is the one seam between the transactional core and
//! storage. Every mutating operation on a shared counter (a product's
//! stock, an account's balance, a ticket's status) is an atomic
//! read-modify-write on the store side: a plain read-then-write at this
//! boundary is a correctness bug (lost updates, overselling, double-spend).
//!
//! Two implementations ship with the crate: [`MemoryStore`] for tests and
//! standalone use, and [`PostgresStore`] backed by `sqlx`.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::error::Result;
use crate::types::{
    Account, AccountId, Order, OrderId, OrderStatus, Product, ProductId, ProductSnapshot, Souls,
    TicketCode,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A ticket located by its door code, with enough context to answer a
/// validation scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketRecord {
    /// Order the ticket belongs to
    pub order_id: OrderId,
    /// The ticket's door code
    pub code: TicketCode,
    /// Current redemption status
    pub status: crate::types::TicketStatus,
    /// When the ticket was redeemed, if it has been
    pub redeemed_at: Option<DateTime<Utc>>,
    /// Who scanned the ticket, if it has been redeemed
    pub redeemed_by: Option<AccountId>,
    /// Product name snapshot (what the code admits to)
    pub product_name: String,
}

/// Storage contract for products, accounts, orders, and tickets.
///
/// Mutating operations are atomic per key. Multi-row order persistence is
/// all-or-nothing within one call.
#[async_trait]
pub trait StorefrontStore: Send + Sync {
    // ────────────────────────────────────────────────────────────
    // Catalog / inventory ledger
    // ────────────────────────────────────────────────────────────

    /// Insert a catalog product.
    ///
    /// # Errors
    ///
    /// Returns an error if the persistence layer fails.
    async fn insert_product(&self, product: &Product) -> Result<()>;

    /// Look up a product by id, whether or not it is active.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ProductNotFound`](crate::StoreError::ProductNotFound)
    /// if no such product exists.
    async fn product(&self, id: ProductId) -> Result<Product>;

    /// Atomically decrement a product's stock by `quantity` and return the
    /// pricing snapshot captured in the same operation.
    ///
    /// # Errors
    ///
    /// - [`ProductNotFound`](crate::StoreError::ProductNotFound) if the
    ///   product is missing or inactive
    /// - [`InsufficientStock`](crate::StoreError::InsufficientStock) if
    ///   `quantity` exceeds current stock (stock is left unchanged)
    async fn reserve_stock(&self, id: ProductId, quantity: u32) -> Result<ProductSnapshot>;

    /// Atomically increment a product's stock by `quantity` (rollback and
    /// cancellation compensation). A missing product is a silent no-op:
    /// cancelling a historical order whose product was deleted must succeed.
    ///
    /// # Errors
    ///
    /// Returns an error if the persistence layer fails.
    async fn release_stock(&self, id: ProductId, quantity: u32) -> Result<()>;

    // ────────────────────────────────────────────────────────────
    // Accounts / balance ledger
    // ────────────────────────────────────────────────────────────

    /// Insert an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the persistence layer fails.
    async fn insert_account(&self, account: &Account) -> Result<()>;

    /// Look up an account by id.
    ///
    /// # Errors
    ///
    /// Returns [`Database`](crate::StoreError::Database) if the account is
    /// missing (accounts are managed by the auth collaborator; a dangling
    /// reference here is a system fault, not a user condition).
    async fn account(&self, id: AccountId) -> Result<Account>;

    /// Atomically debit an account and return the new balance.
    ///
    /// Serialized per account: two concurrent debits can never both observe
    /// the same prior balance.
    ///
    /// # Errors
    ///
    /// Returns [`InsufficientFunds`](crate::StoreError::InsufficientFunds)
    /// if `amount` exceeds the current balance (balance is left unchanged).
    async fn debit(&self, id: AccountId, amount: Souls) -> Result<Souls>;

    /// Atomically credit an account and return the new balance. Driven by
    /// the game-scoring collaborator and by compensation paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is missing or the persistence layer
    /// fails.
    async fn credit(&self, id: AccountId, amount: Souls) -> Result<Souls>;

    // ────────────────────────────────────────────────────────────
    // Orders
    // ────────────────────────────────────────────────────────────

    /// Persist an order and all of its items, all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns [`DuplicateCode`](crate::StoreError::DuplicateCode) if the
    /// order number or any ticket code collides with persisted state; in
    /// that case nothing was written and the caller may retry with fresh
    /// codes.
    async fn insert_order(&self, order: &Order) -> Result<()>;

    /// Load an order with its items.
    ///
    /// # Errors
    ///
    /// Returns [`OrderNotFound`](crate::StoreError::OrderNotFound) if no
    /// such order exists.
    async fn order(&self, id: OrderId) -> Result<Order>;

    /// Load all orders for an account, optionally filtered by status,
    /// newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the persistence layer fails.
    async fn orders_for_account(
        &self,
        account_id: AccountId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>>;

    /// Set an order's lifecycle status (and cancellation timestamp when
    /// moving to `Cancelled`). Legality of the transition is the service's
    /// responsibility.
    ///
    /// # Errors
    ///
    /// Returns [`OrderNotFound`](crate::StoreError::OrderNotFound) if no
    /// such order exists.
    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        cancelled_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Mark all still-redeemable tickets of an order `Cancelled`.
    ///
    /// # Errors
    ///
    /// Returns an error if the persistence layer fails.
    async fn cancel_order_tickets(&self, order_id: OrderId) -> Result<()>;

    /// Delete an order and (procedurally cascading) its items.
    ///
    /// # Errors
    ///
    /// Returns [`OrderNotFound`](crate::StoreError::OrderNotFound) if no
    /// such order exists.
    async fn delete_order(&self, id: OrderId) -> Result<()>;

    // ────────────────────────────────────────────────────────────
    // Tickets
    // ────────────────────────────────────────────────────────────

    /// Look up a ticket by its door code.
    ///
    /// # Errors
    ///
    /// Returns [`TicketNotFound`](crate::StoreError::TicketNotFound) if no
    /// ticket carries the code.
    async fn ticket(&self, code: &TicketCode) -> Result<TicketRecord>;

    /// One-time redemption: atomically compare-and-set
    /// `(code, Valid) -> Used`, recording the redemption time and redeemer.
    /// Never a blind write — under concurrent scans exactly one caller wins.
    ///
    /// # Errors
    ///
    /// - [`TicketNotFound`](crate::StoreError::TicketNotFound) if no ticket
    ///   carries the code
    /// - [`TicketAlreadyUsed`](crate::StoreError::TicketAlreadyUsed) if the
    ///   ticket is no longer `Valid`
    async fn redeem_ticket(
        &self,
        code: &TicketCode,
        redeemed_by: AccountId,
        redeemed_at: DateTime<Utc>,
    ) -> Result<TicketRecord>;
}
