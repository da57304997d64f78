//! Order lifecycle and ticket state machine tests.
//!
//! Covers cancellation reversibility and idempotency, deletion with stock
//! compensation, guarded admin status transitions, and ticket
//! validation/redemption outcomes.
//!
//! Run with: `cargo test --test lifecycle_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use storefront_core::{
    Account, AccountId, MemoryStore, NoopNotifier, OrderService, OrderStatus, Price, Product,
    ProductId, ProductKind, RequestedLine, Souls, StoreError, StorefrontStore, TicketCode,
    TicketService, TicketStatus,
};

fn product(kind: ProductKind, cents: i64, stock: u32) -> Product {
    Product {
        id: ProductId::new(),
        name: "Event Pass".to_owned(),
        unit_price: Price::from_cents(cents),
        kind,
        stock,
        active: true,
    }
}

fn account_with(balance: i64) -> Account {
    Account {
        id: AccountId::new(),
        display_name: "Morgan".to_owned(),
        email: "morgan@example.com".to_owned(),
        balance: Souls::new(balance),
    }
}

async fn setup() -> (Arc<MemoryStore>, OrderService, TicketService) {
    let store = Arc::new(MemoryStore::new());
    let orders = OrderService::new(store.clone(), Arc::new(NoopNotifier));
    let tickets = TicketService::new(store.clone());
    (store, orders, tickets)
}

/// Cancelling restores each product's stock by exactly the reserved
/// quantity; cancelling again is a no-op that does not double-restore.
#[tokio::test]
async fn cancellation_restores_stock_exactly_once() {
    let (store, orders, _) = setup().await;
    let account = account_with(100);
    let pass = product(ProductKind::Ticket, 500, 10);
    let brew = product(ProductKind::Good, 200, 10);
    store.insert_account(&account).await.unwrap();
    store.insert_product(&pass).await.unwrap();
    store.insert_product(&brew).await.unwrap();

    let order = orders
        .create_order(
            account.id,
            &[
                RequestedLine {
                    product_id: pass.id,
                    quantity: 2,
                },
                RequestedLine {
                    product_id: brew.id,
                    quantity: 3,
                },
            ],
        )
        .await
        .unwrap();
    assert_eq!(store.product(pass.id).await.unwrap().stock, 8);
    assert_eq!(store.product(brew.id).await.unwrap().stock, 7);

    let cancelled = orders.cancel_order(order.id).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
    assert_eq!(store.product(pass.id).await.unwrap().stock, 10);
    assert_eq!(store.product(brew.id).await.unwrap().stock, 10);

    // Idempotent second cancel: unchanged order, no double restore.
    let again = orders.cancel_order(order.id).await.unwrap();
    assert_eq!(again.status, OrderStatus::Cancelled);
    assert_eq!(again.cancelled_at, cancelled.cancelled_at);
    assert_eq!(store.product(pass.id).await.unwrap().stock, 10);
    assert_eq!(store.product(brew.id).await.unwrap().stock, 10);
}

/// Cancellation voids the order's unredeemed tickets so their codes cannot
/// be used at the door.
#[tokio::test]
async fn cancellation_voids_unredeemed_tickets() {
    let (store, orders, tickets) = setup().await;
    let account = account_with(100);
    let pass = product(ProductKind::Ticket, 500, 5);
    store.insert_account(&account).await.unwrap();
    store.insert_product(&pass).await.unwrap();

    let order = orders
        .create_order(
            account.id,
            &[RequestedLine {
                product_id: pass.id,
                quantity: 2,
            }],
        )
        .await
        .unwrap();
    let code = order.ticket_codes()[0].clone();

    orders.cancel_order(order.id).await.unwrap();

    let record = tickets.validate_ticket(&code).await.unwrap();
    assert_eq!(record.status, TicketStatus::Cancelled);
    let err = tickets.redeem_ticket(&code, account.id).await.unwrap_err();
    assert!(matches!(err, StoreError::TicketAlreadyUsed { .. }));
    // The message must not claim the ticket was used; this one was voided.
    assert_eq!(
        err.to_string(),
        format!(
            "Ticket {} is not redeemable (already used, expired, or cancelled)",
            code.as_str()
        )
    );
}

#[tokio::test]
async fn cancelling_a_completed_or_unknown_order_fails() {
    let (store, orders, _) = setup().await;
    let account = account_with(100);
    let brew = product(ProductKind::Good, 100, 5);
    store.insert_account(&account).await.unwrap();
    store.insert_product(&brew).await.unwrap();

    let order = orders
        .create_order(
            account.id,
            &[RequestedLine {
                product_id: brew.id,
                quantity: 1,
            }],
        )
        .await
        .unwrap();
    orders
        .set_order_status(order.id, OrderStatus::Completed)
        .await
        .unwrap();

    assert_eq!(
        orders.cancel_order(order.id).await.unwrap_err(),
        StoreError::IllegalStatusTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::Cancelled,
        }
    );
    assert_eq!(
        orders
            .cancel_order(storefront_core::OrderId::new())
            .await
            .unwrap_err(),
        StoreError::OrderNotFound
    );
}

/// Deleting a non-cancelled order performs the same stock compensation
/// before removal; deleting a cancelled order must not restore twice.
#[tokio::test]
async fn deletion_compensates_stock_unless_already_cancelled() {
    let (store, orders, _) = setup().await;
    let account = account_with(100);
    let brew = product(ProductKind::Good, 100, 10);
    store.insert_account(&account).await.unwrap();
    store.insert_product(&brew).await.unwrap();

    // Delete while confirmed: stock comes back.
    let order = orders
        .create_order(
            account.id,
            &[RequestedLine {
                product_id: brew.id,
                quantity: 4,
            }],
        )
        .await
        .unwrap();
    orders.delete_order(order.id).await.unwrap();
    assert_eq!(store.product(brew.id).await.unwrap().stock, 10);
    assert_eq!(
        orders.get_order(order.id).await.unwrap_err(),
        StoreError::OrderNotFound
    );

    // Delete after cancel: compensation already happened once.
    let order = orders
        .create_order(
            account.id,
            &[RequestedLine {
                product_id: brew.id,
                quantity: 4,
            }],
        )
        .await
        .unwrap();
    orders.cancel_order(order.id).await.unwrap();
    orders.delete_order(order.id).await.unwrap();
    assert_eq!(store.product(brew.id).await.unwrap().stock, 10);
}

#[tokio::test]
async fn admin_status_updates_are_guarded_by_the_state_machine() {
    let (store, orders, _) = setup().await;
    let account = account_with(100);
    let brew = product(ProductKind::Good, 100, 5);
    store.insert_account(&account).await.unwrap();
    store.insert_product(&brew).await.unwrap();

    let order = orders
        .create_order(
            account.id,
            &[RequestedLine {
                product_id: brew.id,
                quantity: 1,
            }],
        )
        .await
        .unwrap();

    // Same-status update is a no-op.
    let unchanged = orders
        .set_order_status(order.id, OrderStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(unchanged.status, OrderStatus::Confirmed);

    // Confirmed -> Completed is legal; Completed -> Confirmed is not.
    let completed = orders
        .set_order_status(order.id, OrderStatus::Completed)
        .await
        .unwrap();
    assert_eq!(completed.status, OrderStatus::Completed);
    assert_eq!(
        orders
            .set_order_status(order.id, OrderStatus::Confirmed)
            .await
            .unwrap_err(),
        StoreError::IllegalStatusTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::Confirmed,
        }
    );

    // Admin cancellation path runs the full compensation.
    let order2 = orders
        .create_order(
            account.id,
            &[RequestedLine {
                product_id: brew.id,
                quantity: 2,
            }],
        )
        .await
        .unwrap();
    let before = store.product(brew.id).await.unwrap().stock;
    let cancelled = orders
        .set_order_status(order2.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(store.product(brew.id).await.unwrap().stock, before + 2);
}

#[tokio::test]
async fn orders_for_account_filters_by_status() {
    let (store, orders, _) = setup().await;
    let account = account_with(100);
    let brew = product(ProductKind::Good, 100, 10);
    store.insert_account(&account).await.unwrap();
    store.insert_product(&brew).await.unwrap();

    let keep = orders
        .create_order(
            account.id,
            &[RequestedLine {
                product_id: brew.id,
                quantity: 1,
            }],
        )
        .await
        .unwrap();
    let gone = orders
        .create_order(
            account.id,
            &[RequestedLine {
                product_id: brew.id,
                quantity: 1,
            }],
        )
        .await
        .unwrap();
    orders.cancel_order(gone.id).await.unwrap();

    let confirmed = orders
        .orders_for_account(account.id, Some(OrderStatus::Confirmed))
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].id, keep.id);

    let all = orders.orders_for_account(account.id, None).await.unwrap();
    assert_eq!(all.len(), 2);
}

/// Redemption is one-time: the second sequential attempt on the same code
/// fails with `TicketAlreadyUsed` and the ticket stays `used`.
#[tokio::test]
async fn redemption_is_strictly_one_time() {
    let (store, orders, tickets) = setup().await;
    let buyer = account_with(100);
    let scanner = account_with(0);
    let pass = product(ProductKind::Ticket, 500, 5);
    store.insert_account(&buyer).await.unwrap();
    store.insert_account(&scanner).await.unwrap();
    store.insert_product(&pass).await.unwrap();

    let order = orders
        .create_order(
            buyer.id,
            &[RequestedLine {
                product_id: pass.id,
                quantity: 1,
            }],
        )
        .await
        .unwrap();
    let code = order.ticket_codes()[0].clone();

    assert!(tickets.is_redeemable(&code).await.unwrap());

    let record = tickets.redeem_ticket(&code, scanner.id).await.unwrap();
    assert_eq!(record.status, TicketStatus::Used);
    assert_eq!(record.redeemed_by, Some(scanner.id));
    assert!(record.redeemed_at.is_some());

    let err = tickets.redeem_ticket(&code, scanner.id).await.unwrap_err();
    assert_eq!(
        err,
        StoreError::TicketAlreadyUsed {
            code: code.as_str().to_owned(),
        }
    );
    // Still used, never cycling back to valid.
    assert_eq!(
        tickets.validate_ticket(&code).await.unwrap().status,
        TicketStatus::Used
    );
}

#[tokio::test]
async fn unknown_ticket_codes_are_rejected() {
    let (_, _, tickets) = setup().await;
    let junk = TicketCode::from_string("TKT-NOSUCH00".to_owned());

    assert_eq!(
        tickets.validate_ticket(&junk).await.unwrap_err(),
        StoreError::TicketNotFound
    );
    assert_eq!(
        tickets
            .redeem_ticket(&junk, AccountId::new())
            .await
            .unwrap_err(),
        StoreError::TicketNotFound
    );
}
