//! Order creation flow tests.
//!
//! Verifies the all-or-nothing order transaction: pricing, ticket fan-out,
//! balance debit with floor truncation, and total rollback on every failure
//! path.
//!
//! Run with: `cargo test --test order_flow_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use storefront_core::{
    Account, AccountId, MemoryStore, NoopNotifier, OrderService, OrderStatus, PaymentStatus,
    Price, Product, ProductId, ProductKind, RequestedLine, Souls, StoreError, StorefrontStore,
};

fn ticket_product(cents: i64, stock: u32) -> Product {
    Product {
        id: ProductId::new(),
        name: "Night of Terror Pass".to_owned(),
        unit_price: Price::from_cents(cents),
        kind: ProductKind::Ticket,
        stock,
        active: true,
    }
}

fn good_product(cents: i64, stock: u32) -> Product {
    Product {
        id: ProductId::new(),
        name: "Pumpkin Brew".to_owned(),
        unit_price: Price::from_cents(cents),
        kind: ProductKind::Good,
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

async fn setup() -> (Arc<MemoryStore>, OrderService) {
    let store = Arc::new(MemoryStore::new());
    let service = OrderService::new(store.clone(), Arc::new(NoopNotifier));
    (store, service)
}

/// The worked example: price 6.66, stock 3, balance 20. Buying 2 tickets
/// yields two single-unit coded lines, stock 1, and a floor debit of 13.
#[tokio::test]
async fn two_tickets_fan_out_and_debit_the_floored_total() {
    let (store, service) = setup().await;
    let account = account_with(20);
    let pass = ticket_product(666, 3);
    store.insert_account(&account).await.unwrap();
    store.insert_product(&pass).await.unwrap();

    let order = service
        .create_order(
            account.id,
            &[RequestedLine {
                product_id: pass.id,
                quantity: 2,
            }],
        )
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert!(order.number.as_str().starts_with("ORD-"));
    assert_eq!(order.total, Price::from_cents(1332));

    assert_eq!(order.items.len(), 2);
    for item in &order.items {
        assert_eq!(item.quantity, 1);
        assert_eq!(item.unit_price, Price::from_cents(666));
        assert_eq!(item.subtotal, Price::from_cents(666));
        let ticket = item.ticket.as_ref().expect("ticket line without stub");
        assert!(ticket.code.as_str().starts_with("TKT-"));
    }
    let codes = order.ticket_codes();
    assert_ne!(codes[0], codes[1]);

    assert_eq!(store.product(pass.id).await.unwrap().stock, 1);
    // 20 - floor(13.32) = 7
    assert_eq!(store.account(account.id).await.unwrap().balance, Souls::new(7));

    // A second attempt at 2 tickets fails: only 1 left, nothing changes.
    let err = service
        .create_order(
            account.id,
            &[RequestedLine {
                product_id: pass.id,
                quantity: 2,
            }],
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::InsufficientStock {
            product_id: pass.id,
            requested: 2,
            available: 1,
        }
    );
    assert_eq!(store.product(pass.id).await.unwrap().stock, 1);
    assert_eq!(store.account(account.id).await.unwrap().balance, Souls::new(7));
}

/// Goods stay aggregated: one line with the requested quantity and no
/// ticket stub.
#[tokio::test]
async fn goods_stay_as_one_aggregated_line() {
    let (store, service) = setup().await;
    let account = account_with(100);
    let brew = good_product(450, 10);
    store.insert_account(&account).await.unwrap();
    store.insert_product(&brew).await.unwrap();

    let order = service
        .create_order(
            account.id,
            &[RequestedLine {
                product_id: brew.id,
                quantity: 4,
            }],
        )
        .await
        .unwrap();

    assert_eq!(order.items.len(), 1);
    assert_eq!(order.items[0].quantity, 4);
    assert_eq!(order.items[0].subtotal, Price::from_cents(1800));
    assert!(order.items[0].ticket.is_none());
    assert_eq!(store.product(brew.id).await.unwrap().stock, 6);
    // 100 - 18
    assert_eq!(
        store.account(account.id).await.unwrap().balance,
        Souls::new(82)
    );
}

#[tokio::test]
async fn mixed_cart_expands_only_the_ticket_lines() {
    let (store, service) = setup().await;
    let account = account_with(100);
    let pass = ticket_product(1000, 5);
    let brew = good_product(500, 5);
    store.insert_account(&account).await.unwrap();
    store.insert_product(&pass).await.unwrap();
    store.insert_product(&brew).await.unwrap();

    let order = service
        .create_order(
            account.id,
            &[
                RequestedLine {
                    product_id: pass.id,
                    quantity: 3,
                },
                RequestedLine {
                    product_id: brew.id,
                    quantity: 2,
                },
            ],
        )
        .await
        .unwrap();

    // 3 ticket units + 1 aggregated goods line.
    assert_eq!(order.items.len(), 4);
    assert_eq!(order.ticket_codes().len(), 3);
    assert_eq!(order.total, Price::from_cents(4000));
    assert_eq!(
        store.account(account.id).await.unwrap().balance,
        Souls::new(60)
    );
}

#[tokio::test]
async fn empty_and_zero_quantity_carts_are_rejected() {
    let (store, service) = setup().await;
    let account = account_with(50);
    let pass = ticket_product(100, 5);
    store.insert_account(&account).await.unwrap();
    store.insert_product(&pass).await.unwrap();

    assert_eq!(
        service.create_order(account.id, &[]).await.unwrap_err(),
        StoreError::EmptyOrder
    );
    assert_eq!(
        service
            .create_order(
                account.id,
                &[RequestedLine {
                    product_id: pass.id,
                    quantity: 0,
                }],
            )
            .await
            .unwrap_err(),
        StoreError::EmptyOrder
    );
    assert_eq!(store.product(pass.id).await.unwrap().stock, 5);
}

#[tokio::test]
async fn missing_or_inactive_products_abort_before_any_effect() {
    let (store, service) = setup().await;
    let account = account_with(50);
    let pass = ticket_product(100, 5);
    let mut retired = good_product(200, 5);
    retired.active = false;
    store.insert_account(&account).await.unwrap();
    store.insert_product(&pass).await.unwrap();
    store.insert_product(&retired).await.unwrap();

    // Unknown product.
    let err = service
        .create_order(
            account.id,
            &[
                RequestedLine {
                    product_id: pass.id,
                    quantity: 1,
                },
                RequestedLine {
                    product_id: ProductId::new(),
                    quantity: 1,
                },
            ],
        )
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::ProductNotFound);

    // Inactive product.
    let err = service
        .create_order(
            account.id,
            &[RequestedLine {
                product_id: retired.id,
                quantity: 1,
            }],
        )
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::ProductNotFound);

    // No partial effects committed.
    assert_eq!(store.product(pass.id).await.unwrap().stock, 5);
    assert_eq!(
        store.account(account.id).await.unwrap().balance,
        Souls::new(50)
    );
    assert!(service
        .orders_for_account(account.id, None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn insufficient_funds_aborts_before_touching_inventory() {
    let (store, service) = setup().await;
    let account = account_with(5);
    let pass = ticket_product(666, 3);
    store.insert_account(&account).await.unwrap();
    store.insert_product(&pass).await.unwrap();

    let err = service
        .create_order(
            account.id,
            &[RequestedLine {
                product_id: pass.id,
                quantity: 2,
            }],
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        StoreError::InsufficientFunds {
            required: Souls::new(13),
            available: Souls::new(5),
        }
    );
    assert_eq!(store.product(pass.id).await.unwrap().stock, 3);
    assert_eq!(store.account(account.id).await.unwrap().balance, Souls::new(5));
}

/// A later line failing its reservation releases every earlier reservation:
/// rollback is total.
#[tokio::test]
async fn failed_reservation_releases_earlier_reservations() {
    let (store, service) = setup().await;
    let account = account_with(1000);
    let pass = ticket_product(100, 10);
    let scarce = good_product(100, 1);
    store.insert_account(&account).await.unwrap();
    store.insert_product(&pass).await.unwrap();
    store.insert_product(&scarce).await.unwrap();

    let err = service
        .create_order(
            account.id,
            &[
                RequestedLine {
                    product_id: pass.id,
                    quantity: 5,
                },
                RequestedLine {
                    product_id: scarce.id,
                    quantity: 3,
                },
            ],
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        StoreError::InsufficientStock {
            product_id: scarce.id,
            requested: 3,
            available: 1,
        }
    );
    // Both counters and the ledger are bit-for-bit back to the pre-attempt state.
    assert_eq!(store.product(pass.id).await.unwrap().stock, 10);
    assert_eq!(store.product(scarce.id).await.unwrap().stock, 1);
    assert_eq!(
        store.account(account.id).await.unwrap().balance,
        Souls::new(1000)
    );
    assert!(service
        .orders_for_account(account.id, None)
        .await
        .unwrap()
        .is_empty());
}

/// The persisted unit price is the price at reservation time, stable
/// against later catalog changes.
#[tokio::test]
async fn order_prices_are_stable_against_catalog_changes() {
    let (store, service) = setup().await;
    let account = account_with(100);
    let mut pass = ticket_product(666, 5);
    store.insert_account(&account).await.unwrap();
    store.insert_product(&pass).await.unwrap();

    let order = service
        .create_order(
            account.id,
            &[RequestedLine {
                product_id: pass.id,
                quantity: 1,
            }],
        )
        .await
        .unwrap();

    // The catalog price doubles after the order committed.
    pass.unit_price = Price::from_cents(1332);
    pass.stock = 4;
    store.insert_product(&pass).await.unwrap();

    let reloaded = service.get_order(order.id).await.unwrap();
    assert_eq!(reloaded.items[0].unit_price, Price::from_cents(666));
    assert_eq!(reloaded.total, Price::from_cents(666));
}

/// Order numbers are unique across committed orders.
#[tokio::test]
async fn order_numbers_do_not_repeat() {
    let (store, service) = setup().await;
    let account = account_with(1000);
    let brew = good_product(100, 100);
    store.insert_account(&account).await.unwrap();
    store.insert_product(&brew).await.unwrap();

    let mut numbers = std::collections::HashSet::new();
    for _ in 0..20 {
        let order = service
            .create_order(
                account.id,
                &[RequestedLine {
                    product_id: brew.id,
                    quantity: 1,
                }],
            )
            .await
            .unwrap();
        assert!(numbers.insert(order.number.as_str().to_owned()));
    }
}
