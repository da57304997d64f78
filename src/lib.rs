//! Order fulfillment and ticket lifecycle engine for an event storefront.
//!
//! Accounts accumulate an in-game currency ("souls") through a collaborator
//! and spend it here: a cart of product references becomes committed
//! inventory changes, priced order lines, and uniquely-coded tickets
//! redeemable at the event door — as one all-or-nothing operation.
//!
//! # Architecture
//!
//! - [`OrderService`] — the transaction orchestrator: validates lines,
//!   reserves stock, expands ticket lines into per-unit codes, persists the
//!   order, debits the balance, and compensates fully on any failure. Also
//!   owns the order lifecycle (cancel / delete / status transitions).
//! - [`TicketService`] — the redemption state machine: `valid -> used`,
//!   exactly once, via an atomic compare-and-set.
//! - [`StorefrontStore`] — the persistence boundary. [`MemoryStore`] backs
//!   tests and standalone use; [`PostgresStore`] is the production store.
//! - [`TicketNotifier`] — post-commit, fire-and-forget delivery of issued
//!   codes; its failure never affects an order's outcome.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use storefront_core::{
//!     Account, AccountId, MemoryStore, NoopNotifier, OrderService, Product, ProductId,
//!     ProductKind, Price, RequestedLine, Souls, StorefrontStore, TicketService,
//! };
//!
//! # async fn example() -> storefront_core::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let orders = OrderService::new(store.clone(), Arc::new(NoopNotifier));
//! let tickets = TicketService::new(store.clone());
//!
//! let account = Account {
//!     id: AccountId::new(),
//!     display_name: "Morgan".into(),
//!     email: "morgan@example.com".into(),
//!     balance: Souls::new(20),
//! };
//! store.insert_account(&account).await?;
//!
//! let pass = Product {
//!     id: ProductId::new(),
//!     name: "Event Pass".into(),
//!     unit_price: Price::from_cents(666),
//!     kind: ProductKind::Ticket,
//!     stock: 3,
//!     active: true,
//! };
//! store.insert_product(&pass).await?;
//!
//! let order = orders
//!     .create_order(account.id, &[RequestedLine { product_id: pass.id, quantity: 2 }])
//!     .await?;
//!
//! // Two single-unit ticket lines, each with its own TKT- code.
//! assert_eq!(order.items.len(), 2);
//! let code = &order.ticket_codes()[0];
//! tickets.redeem_ticket(code, account.id).await?;
//! # Ok(())
//! # }
//! ```

pub mod codes;
pub mod config;
pub mod error;
pub mod metrics;
pub mod orders;
pub mod pricing;
pub mod providers;
pub mod store;
pub mod tickets;
pub mod types;

pub use config::Config;
pub use error::{Result, StoreError};
pub use orders::OrderService;
pub use providers::{ConsoleNotifier, NoopNotifier, TicketNotifier};
pub use store::{MemoryStore, PostgresStore, StorefrontStore, TicketRecord};
pub use tickets::TicketService;
pub use types::{
    Account, AccountId, Order, OrderId, OrderItem, OrderNumber, OrderStatus, PaymentStatus, Price,
    Product, ProductId, ProductKind, ProductSnapshot, RequestedLine, Souls, TicketCode,
    TicketStatus, TicketStub,
};
