//! In-memory storefront store.
//!
//! Backs tests and standalone use. All state lives behind a single mutex;
//! critical sections are short and never await, which gives every operation
//! the serialized read-modify-write semantics the boundary requires.

use crate::error::{Result, StoreError};
use crate::store::{StorefrontStore, TicketRecord};
use crate::types::{
    Account, AccountId, Order, OrderId, OrderStatus, Product, ProductId, ProductSnapshot, Souls,
    TicketCode, TicketStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Inner {
    products: HashMap<ProductId, Product>,
    accounts: HashMap<AccountId, Account>,
    orders: HashMap<OrderId, Order>,
    /// Ticket code -> owning order, for O(1) redemption lookups
    ticket_index: HashMap<String, OrderId>,
    /// All issued order numbers (persisted-state uniqueness)
    order_numbers: HashSet<String>,
}

/// In-memory implementation of [`StorefrontStore`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means another test panicked; the data is
        // still structurally sound.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl StorefrontStore for MemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        self.lock().products.insert(product.id, product.clone());
        Ok(())
    }

    async fn product(&self, id: ProductId) -> Result<Product> {
        self.lock()
            .products
            .get(&id)
            .cloned()
            .ok_or(StoreError::ProductNotFound)
    }

    async fn reserve_stock(&self, id: ProductId, quantity: u32) -> Result<ProductSnapshot> {
        let mut inner = self.lock();
        let product = inner
            .products
            .get_mut(&id)
            .filter(|p| p.active)
            .ok_or(StoreError::ProductNotFound)?;

        if quantity > product.stock {
            return Err(StoreError::InsufficientStock {
                product_id: id,
                requested: quantity,
                available: product.stock,
            });
        }

        product.stock -= quantity;
        Ok(product.snapshot())
    }

    async fn release_stock(&self, id: ProductId, quantity: u32) -> Result<()> {
        if let Some(product) = self.lock().products.get_mut(&id) {
            product.stock += quantity;
        }
        Ok(())
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        self.lock().accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn account(&self, id: AccountId) -> Result<Account> {
        self.lock()
            .accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::Database(format!("account {id} not found")))
    }

    async fn debit(&self, id: AccountId, amount: Souls) -> Result<Souls> {
        let mut inner = self.lock();
        let account = inner
            .accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::Database(format!("account {id} not found")))?;

        if amount > account.balance {
            return Err(StoreError::InsufficientFunds {
                required: amount,
                available: account.balance,
            });
        }

        account.balance = Souls::new(account.balance.amount() - amount.amount());
        Ok(account.balance)
    }

    async fn credit(&self, id: AccountId, amount: Souls) -> Result<Souls> {
        let mut inner = self.lock();
        let account = inner
            .accounts
            .get_mut(&id)
            .ok_or_else(|| StoreError::Database(format!("account {id} not found")))?;

        account.balance = Souls::new(account.balance.amount() + amount.amount());
        Ok(account.balance)
    }

    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut inner = self.lock();

        if inner.order_numbers.contains(order.number.as_str()) {
            return Err(StoreError::DuplicateCode);
        }
        let mut fresh_codes = HashSet::new();
        for item in &order.items {
            if let Some(ticket) = &item.ticket {
                let code = ticket.code.as_str();
                if inner.ticket_index.contains_key(code) || !fresh_codes.insert(code.to_owned()) {
                    return Err(StoreError::DuplicateCode);
                }
            }
        }

        inner.order_numbers.insert(order.number.as_str().to_owned());
        for code in fresh_codes {
            inner.ticket_index.insert(code, order.id);
        }
        inner.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn order(&self, id: OrderId) -> Result<Order> {
        self.lock()
            .orders
            .get(&id)
            .cloned()
            .ok_or(StoreError::OrderNotFound)
    }

    async fn orders_for_account(
        &self,
        account_id: AccountId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .lock()
            .orders
            .values()
            .filter(|o| o.account_id == account_id)
            .filter(|o| status.is_none_or(|s| o.status == s))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        cancelled_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut inner = self.lock();
        let order = inner.orders.get_mut(&id).ok_or(StoreError::OrderNotFound)?;
        order.status = status;
        if cancelled_at.is_some() {
            order.cancelled_at = cancelled_at;
        }
        Ok(())
    }

    async fn cancel_order_tickets(&self, order_id: OrderId) -> Result<()> {
        let mut inner = self.lock();
        if let Some(order) = inner.orders.get_mut(&order_id) {
            for item in &mut order.items {
                if let Some(ticket) = &mut item.ticket {
                    if ticket.status.is_redeemable() {
                        ticket.status = TicketStatus::Cancelled;
                    }
                }
            }
        }
        Ok(())
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        let mut inner = self.lock();
        let order = inner.orders.remove(&id).ok_or(StoreError::OrderNotFound)?;
        inner.order_numbers.remove(order.number.as_str());
        for item in &order.items {
            if let Some(ticket) = &item.ticket {
                inner.ticket_index.remove(ticket.code.as_str());
            }
        }
        Ok(())
    }

    async fn ticket(&self, code: &TicketCode) -> Result<TicketRecord> {
        let inner = self.lock();
        let order_id = inner
            .ticket_index
            .get(code.as_str())
            .ok_or(StoreError::TicketNotFound)?;
        let order = inner
            .orders
            .get(order_id)
            .ok_or(StoreError::TicketNotFound)?;

        order
            .items
            .iter()
            .find_map(|item| {
                let ticket = item.ticket.as_ref()?;
                (ticket.code == *code).then(|| TicketRecord {
                    order_id: order.id,
                    code: ticket.code.clone(),
                    status: ticket.status,
                    redeemed_at: ticket.redeemed_at,
                    redeemed_by: ticket.redeemed_by,
                    product_name: item.product_name.clone(),
                })
            })
            .ok_or(StoreError::TicketNotFound)
    }

    async fn redeem_ticket(
        &self,
        code: &TicketCode,
        redeemed_by: AccountId,
        redeemed_at: DateTime<Utc>,
    ) -> Result<TicketRecord> {
        let mut inner = self.lock();
        let order_id = *inner
            .ticket_index
            .get(code.as_str())
            .ok_or(StoreError::TicketNotFound)?;
        let order = inner
            .orders
            .get_mut(&order_id)
            .ok_or(StoreError::TicketNotFound)?;

        for item in &mut order.items {
            let Some(ticket) = &mut item.ticket else {
                continue;
            };
            if ticket.code != *code {
                continue;
            }
            // Compare-and-set under the store lock: exactly one concurrent
            // scan can observe Valid.
            if !ticket.status.is_redeemable() {
                return Err(StoreError::TicketAlreadyUsed {
                    code: code.as_str().to_owned(),
                });
            }
            ticket.status = TicketStatus::Used;
            ticket.redeemed_at = Some(redeemed_at);
            ticket.redeemed_by = Some(redeemed_by);
            return Ok(TicketRecord {
                order_id,
                code: ticket.code.clone(),
                status: ticket.status,
                redeemed_at: ticket.redeemed_at,
                redeemed_by: ticket.redeemed_by,
                product_name: item.product_name.clone(),
            });
        }

        Err(StoreError::TicketNotFound)
    }
}
