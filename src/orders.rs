//! Order transaction orchestrator and order lifecycle.
//!
//! [`OrderService::create_order`] turns a cart of product references into
//! committed inventory changes, priced line records, and uniquely-coded
//! tickets as one all-or-nothing operation. Any failure at any step undoes
//! every effect made so far: reservations are released, a persisted order
//! shell is deleted, and the error is surfaced verbatim.
//!
//! Post-creation, the lifecycle operations (`cancel_order`, `delete_order`,
//! `set_order_status`) govern legal status transitions and run the same
//! stock compensation when an order leaves the confirmed path.

use crate::codes::{issue_order_number, issue_ticket_code};
use crate::error::{Result, StoreError};
use crate::metrics;
use crate::pricing::{expand, price_line, LineDescriptor};
use crate::providers::TicketNotifier;
use crate::store::StorefrontStore;
use crate::types::{
    Account, AccountId, Order, OrderId, OrderItem, OrderStatus, PaymentStatus, Price,
    RequestedLine, TicketStub,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Coordinates inventory, pricing, ticket issuance, and the balance ledger
/// into atomic order operations.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn StorefrontStore>,
    notifier: Arc<dyn TicketNotifier>,
}

impl OrderService {
    /// Create a service over the given store and notifier.
    #[must_use]
    pub fn new(store: Arc<dyn StorefrontStore>, notifier: Arc<dyn TicketNotifier>) -> Self {
        Self { store, notifier }
    }

    /// Create an order from a cart of requested lines, all-or-nothing.
    ///
    /// Validates every line, pre-checks the balance, reserves stock in input
    /// order, fans ticket lines out into individually-coded units, persists
    /// the order (`Confirmed`/`Paid`, settlement is instant), and debits the
    /// integer floor of the total. On success a post-commit notification
    /// task is spawned; its outcome never affects the order.
    ///
    /// # Errors
    ///
    /// - [`StoreError::EmptyOrder`] for an empty cart or a zero-quantity line
    /// - [`StoreError::ProductNotFound`] if any product is missing/inactive
    /// - [`StoreError::InsufficientFunds`] if the balance cannot cover the total
    /// - [`StoreError::InsufficientStock`] if any reservation fails
    /// - [`StoreError::CodeIssuanceFailed`] if unique codes could not be
    ///   issued even after the single controlled retry
    ///
    /// Every failure leaves stock, balance, and the order tables exactly as
    /// they were before the call.
    #[instrument(skip(self, lines), fields(account_id = %account_id, lines = lines.len()))]
    pub async fn create_order(
        &self,
        account_id: AccountId,
        lines: &[RequestedLine],
    ) -> Result<Order> {
        if lines.is_empty() || lines.iter().any(|line| line.quantity == 0) {
            metrics::record_order_rejected("empty");
            return Err(StoreError::EmptyOrder);
        }

        // Pre-checks: every product must exist and the balance must cover
        // the prospective total before any mutation happens.
        let account = self.store.account(account_id).await?;
        let estimate = self.estimate_total(lines).await?;
        let required = estimate.in_souls();
        if required > account.balance {
            metrics::record_order_rejected("insufficient_funds");
            return Err(StoreError::InsufficientFunds {
                required,
                available: account.balance,
            });
        }

        // Reserve stock in input order; on any failure release what was
        // already reserved and propagate the offending line's error.
        let mut reserved: Vec<(RequestedLine, crate::types::ProductSnapshot)> = Vec::new();
        for line in lines {
            match self.store.reserve_stock(line.product_id, line.quantity).await {
                Ok(snapshot) => reserved.push((*line, snapshot)),
                Err(error) => {
                    self.release_reserved(&reserved).await;
                    metrics::record_order_rejected(rejection_reason(&error));
                    return Err(error);
                }
            }
        }

        // Expand reserved lines into per-unit descriptors.
        let descriptors: Vec<LineDescriptor> = reserved
            .iter()
            .flat_map(|(line, snapshot)| expand(snapshot.clone(), line.quantity))
            .collect();

        // Persist, with one controlled retry on a code collision.
        let order = match self.persist_order(account_id, &descriptors).await {
            Ok(order) => order,
            Err(error) => {
                self.release_reserved(&reserved).await;
                metrics::record_order_rejected(rejection_reason(&error));
                return Err(error);
            }
        };

        // Debit the integer total. The pre-check makes failure here a
        // concurrent-spend race; compensate fully and surface it.
        if let Err(error) = self.store.debit(account_id, order.total.in_souls()).await {
            if let Err(cleanup) = self.store.delete_order(order.id).await {
                warn!(%cleanup, order_id = %order.id, "failed to discard order during rollback");
            }
            self.release_reserved(&reserved).await;
            metrics::record_order_rejected(rejection_reason(&error));
            return Err(error);
        }

        info!(
            order_id = %order.id,
            number = %order.number,
            total = %order.total,
            items = order.items.len(),
            "order committed"
        );
        metrics::record_order_created(order.total.cents(), order.ticket_codes().len());

        self.spawn_ticket_notification(&account, &order);
        Ok(order)
    }

    /// Cancel an order, restoring stock for every line whose product still
    /// exists and voiding its unredeemed tickets.
    ///
    /// Cancelling an already-cancelled order is an idempotent no-op that
    /// returns the order unchanged.
    ///
    /// # Errors
    ///
    /// - [`StoreError::OrderNotFound`] if no such order exists
    /// - [`StoreError::IllegalStatusTransition`] if the order is `Completed`
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order> {
        let order = self.store.order(order_id).await?;

        if order.status == OrderStatus::Cancelled {
            return Ok(order);
        }
        if !order.status.can_transition_to(OrderStatus::Cancelled) {
            return Err(StoreError::IllegalStatusTransition {
                from: order.status,
                to: OrderStatus::Cancelled,
            });
        }

        self.restore_stock(&order).await;
        self.store.cancel_order_tickets(order_id).await?;
        self.store
            .set_order_status(order_id, OrderStatus::Cancelled, Some(Utc::now()))
            .await?;

        info!(order_id = %order_id, number = %order.number, "order cancelled");
        metrics::record_order_cancelled();

        self.store.order(order_id).await
    }

    /// Delete an order and its items. An order that is not already
    /// `Cancelled` gets the same stock compensation as cancellation first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OrderNotFound`] if no such order exists.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn delete_order(&self, order_id: OrderId) -> Result<()> {
        let order = self.store.order(order_id).await?;

        if order.status != OrderStatus::Cancelled {
            self.restore_stock(&order).await;
        }
        self.store.delete_order(order_id).await?;

        info!(order_id = %order_id, number = %order.number, "order deleted");
        metrics::record_order_deleted();
        Ok(())
    }

    /// Administrative status update, guarded by the order state machine.
    ///
    /// Setting the current status again is a no-op; transitioning into
    /// `Cancelled` runs the full cancellation compensation.
    ///
    /// # Errors
    ///
    /// - [`StoreError::OrderNotFound`] if no such order exists
    /// - [`StoreError::IllegalStatusTransition`] for any transition the
    ///   state machine forbids
    #[instrument(skip(self), fields(order_id = %order_id, status = %status))]
    pub async fn set_order_status(&self, order_id: OrderId, status: OrderStatus) -> Result<Order> {
        let order = self.store.order(order_id).await?;

        if order.status == status {
            return Ok(order);
        }
        if !order.status.can_transition_to(status) {
            return Err(StoreError::IllegalStatusTransition {
                from: order.status,
                to: status,
            });
        }
        if status == OrderStatus::Cancelled {
            return self.cancel_order(order_id).await;
        }

        self.store.set_order_status(order_id, status, None).await?;
        self.store.order(order_id).await
    }

    /// Load an order with its items.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::OrderNotFound`] if no such order exists.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.store.order(order_id).await
    }

    /// Load an account's orders, newest first, optionally filtered by
    /// status.
    ///
    /// # Errors
    ///
    /// Returns an error if the persistence layer fails.
    pub async fn orders_for_account(
        &self,
        account_id: AccountId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        self.store.orders_for_account(account_id, status).await
    }

    /// Admin restock: put `quantity` units of a product back on the shelf.
    ///
    /// # Errors
    ///
    /// Returns an error if the persistence layer fails.
    pub async fn restock(&self, product_id: crate::types::ProductId, quantity: u32) -> Result<()> {
        self.store.release_stock(product_id, quantity).await
    }

    // ────────────────────────────────────────────────────────────
    // Internals
    // ────────────────────────────────────────────────────────────

    /// Prospective total across all lines from current catalog prices.
    /// Read-only: nothing is mutated yet.
    async fn estimate_total(&self, lines: &[RequestedLine]) -> Result<Price> {
        let mut total = Price::ZERO;
        for line in lines {
            let product = self.store.product(line.product_id).await?;
            if !product.active {
                return Err(StoreError::ProductNotFound);
            }
            let (_, subtotal) = price_line(&product.snapshot(), line.quantity);
            total = total.plus(subtotal);
        }
        Ok(total)
    }

    /// Mint items from the descriptors and persist the order shell plus all
    /// items. One whole-persist retry with fresh codes on a uniqueness
    /// collision, then `CodeIssuanceFailed`.
    async fn persist_order(
        &self,
        account_id: AccountId,
        descriptors: &[LineDescriptor],
    ) -> Result<Order> {
        for attempt in 0..2 {
            let order = build_order(account_id, descriptors);
            match self.store.insert_order(&order).await {
                Ok(()) => return Ok(order),
                Err(StoreError::DuplicateCode) => {
                    warn!(attempt, "code collision during order persist, reissuing");
                }
                Err(error) => return Err(error),
            }
        }
        Err(StoreError::CodeIssuanceFailed)
    }

    /// Release every reservation made so far for this order. Compensation
    /// runs through all lines even if one release fails.
    async fn release_reserved(
        &self,
        reserved: &[(RequestedLine, crate::types::ProductSnapshot)],
    ) {
        for (line, _) in reserved {
            if let Err(error) = self
                .store
                .release_stock(line.product_id, line.quantity)
                .await
            {
                warn!(%error, product_id = %line.product_id, "failed to release reservation");
            }
        }
    }

    /// Restore stock for each item of a persisted order whose product still
    /// exists (the product reference is weak).
    async fn restore_stock(&self, order: &Order) {
        for item in &order.items {
            let Some(product_id) = item.product_id else {
                continue;
            };
            if let Err(error) = self.store.release_stock(product_id, item.quantity).await {
                warn!(%error, product_id = %product_id, "failed to restore stock");
            }
        }
    }

    /// Queue the post-commit ticket notification. Detached and
    /// fire-and-forget: delivery failure is logged, never surfaced.
    fn spawn_ticket_notification(&self, account: &Account, order: &Order) {
        let codes = order.ticket_codes();
        if codes.is_empty() {
            return;
        }
        let notifier = Arc::clone(&self.notifier);
        let recipient = account.email.clone();
        let display_name = account.display_name.clone();
        tokio::spawn(async move {
            if let Err(error) = notifier
                .notify_tickets_issued(&recipient, &display_name, &codes)
                .await
            {
                warn!(%error, to = %recipient, "ticket notification failed");
            }
        });
    }
}

/// Metric label for a failed order attempt. Each user-facing creation
/// failure gets its own reason; persistence faults fall under `other`.
const fn rejection_reason(error: &StoreError) -> &'static str {
    match error {
        StoreError::EmptyOrder => "empty",
        StoreError::ProductNotFound => "product_not_found",
        StoreError::InsufficientStock { .. } => "out_of_stock",
        StoreError::InsufficientFunds { .. } => "insufficient_funds",
        StoreError::CodeIssuanceFailed => "code_issuance",
        _ => "other",
    }
}

/// Assemble an order with a fresh number and freshly-coded tickets from the
/// expanded descriptors, accumulating the true total from line subtotals.
fn build_order(account_id: AccountId, descriptors: &[LineDescriptor]) -> Order {
    let order_id = OrderId::new();
    let mut subtotal = Price::ZERO;

    let items: Vec<OrderItem> = descriptors
        .iter()
        .map(|descriptor| {
            subtotal = subtotal.plus(descriptor.subtotal);
            OrderItem {
                order_id,
                product_id: Some(descriptor.snapshot.product_id),
                product_name: descriptor.snapshot.name.clone(),
                product_kind: descriptor.snapshot.kind,
                unit_price: descriptor.snapshot.unit_price,
                quantity: descriptor.quantity,
                subtotal: descriptor.subtotal,
                ticket: descriptor
                    .needs_ticket
                    .then(|| TicketStub::issued(issue_ticket_code())),
            }
        })
        .collect();

    Order {
        id: order_id,
        account_id,
        number: issue_order_number(),
        subtotal,
        total: subtotal,
        status: OrderStatus::Confirmed,
        payment_status: PaymentStatus::Paid,
        created_at: Utc::now(),
        cancelled_at: None,
        items,
    }
}
