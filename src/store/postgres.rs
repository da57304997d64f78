//! PostgreSQL storefront store.
//!
//! Every shared-counter mutation is one conditional `UPDATE ... RETURNING`,
//! so stock decrements, balance debits, and ticket redemption are atomic
//! compare-and-set operations at the database, serialized by the row lock.
//! Order persistence runs inside a single transaction.

use crate::config::PostgresConfig;
use crate::error::{Result, StoreError};
use crate::store::{StorefrontStore, TicketRecord};
use crate::types::{
    Account, AccountId, Order, OrderId, OrderItem, OrderNumber, OrderStatus, PaymentStatus, Price,
    Product, ProductId, ProductKind, ProductSnapshot, Souls, TicketCode, TicketStatus, TicketStub,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use uuid::Uuid;

/// PostgreSQL implementation of [`StorefrontStore`].
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be established.
    pub async fn connect(config: &PostgresConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect(&config.url)
            .await
            .map_err(db_err)?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    async fn load_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>> {
        let rows = sqlx::query(
            r"
            SELECT order_id, product_id, product_name, product_kind,
                   unit_price_cents, quantity, subtotal_cents,
                   ticket_code, ticket_status, redeemed_at, redeemed_by
            FROM order_items
            WHERE order_id = $1
            ORDER BY line_no
            ",
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(item_from_row).collect()
    }

    async fn load_order_shells(
        &self,
        account_id: AccountId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r"
            SELECT id, account_id, order_number, subtotal_cents, total_cents,
                   status, payment_status, created_at, cancelled_at
            FROM orders
            WHERE account_id = $1 AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at DESC
            ",
        )
        .bind(account_id.as_uuid())
        .bind(status.map(OrderStatus::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(order_from_row).collect()
    }
}

#[async_trait]
impl StorefrontStore for PostgresStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO products (id, name, unit_price_cents, kind, stock, active)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(product.unit_price.cents())
        .bind(product.kind.as_str())
        .bind(i64::from(product.stock))
        .bind(product.active)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn product(&self, id: ProductId) -> Result<Product> {
        let row = sqlx::query(
            r"
            SELECT id, name, unit_price_cents, kind, stock, active
            FROM products
            WHERE id = $1
            ",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StoreError::ProductNotFound)?;

        product_from_row(&row)
    }

    async fn reserve_stock(&self, id: ProductId, quantity: u32) -> Result<ProductSnapshot> {
        let reserved = sqlx::query(
            r"
            UPDATE products
            SET stock = stock - $2
            WHERE id = $1 AND active AND stock >= $2
            RETURNING name, unit_price_cents, kind
            ",
        )
        .bind(id.as_uuid())
        .bind(i64::from(quantity))
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        if let Some(row) = reserved {
            return Ok(ProductSnapshot {
                product_id: id,
                name: row.try_get("name").map_err(db_err)?,
                unit_price: Price::from_cents(row.try_get("unit_price_cents").map_err(db_err)?),
                kind: parse_kind(&row.try_get::<String, _>("kind").map_err(db_err)?)?,
            });
        }

        // The conditional update matched nothing: tell the caller whether
        // the product is gone or just short on stock.
        let current = sqlx::query(r"SELECT stock, active FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match current {
            Some(row) if row.try_get::<bool, _>("active").map_err(db_err)? => {
                Err(StoreError::InsufficientStock {
                    product_id: id,
                    requested: quantity,
                    available: to_u32(row.try_get("stock").map_err(db_err)?)?,
                })
            }
            _ => Err(StoreError::ProductNotFound),
        }
    }

    async fn release_stock(&self, id: ProductId, quantity: u32) -> Result<()> {
        // Missing product: silent no-op, the reference is weak.
        sqlx::query(r"UPDATE products SET stock = stock + $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(i64::from(quantity))
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn insert_account(&self, account: &Account) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO accounts (id, display_name, email, balance)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(account.id.as_uuid())
        .bind(&account.display_name)
        .bind(&account.email)
        .bind(account.balance.amount())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn account(&self, id: AccountId) -> Result<Account> {
        let row = sqlx::query(
            r"SELECT id, display_name, email, balance FROM accounts WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| StoreError::Database(format!("account {id} not found")))?;

        Ok(Account {
            id,
            display_name: row.try_get("display_name").map_err(db_err)?,
            email: row.try_get("email").map_err(db_err)?,
            balance: Souls::new(row.try_get("balance").map_err(db_err)?),
        })
    }

    async fn debit(&self, id: AccountId, amount: Souls) -> Result<Souls> {
        let debited = sqlx::query(
            r"
            UPDATE accounts
            SET balance = balance - $2
            WHERE id = $1 AND balance >= $2
            RETURNING balance
            ",
        )
        .bind(id.as_uuid())
        .bind(amount.amount())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        if let Some(row) = debited {
            return Ok(Souls::new(row.try_get("balance").map_err(db_err)?));
        }

        let available = sqlx::query(r"SELECT balance FROM accounts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
            .ok_or_else(|| StoreError::Database(format!("account {id} not found")))?;

        Err(StoreError::InsufficientFunds {
            required: amount,
            available: Souls::new(available.try_get("balance").map_err(db_err)?),
        })
    }

    async fn credit(&self, id: AccountId, amount: Souls) -> Result<Souls> {
        let row = sqlx::query(
            r"UPDATE accounts SET balance = balance + $2 WHERE id = $1 RETURNING balance",
        )
        .bind(id.as_uuid())
        .bind(amount.amount())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or_else(|| StoreError::Database(format!("account {id} not found")))?;

        Ok(Souls::new(row.try_get("balance").map_err(db_err)?))
    }

    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(
            r"
            INSERT INTO orders
                (id, account_id, order_number, subtotal_cents, total_cents,
                 status, payment_status, created_at, cancelled_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(order.id.as_uuid())
        .bind(order.account_id.as_uuid())
        .bind(order.number.as_str())
        .bind(order.subtotal.cents())
        .bind(order.total.cents())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.created_at)
        .bind(order.cancelled_at)
        .execute(&mut *tx)
        .await
        .map_err(unique_or_db_err)?;

        for (line_no, item) in order.items.iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO order_items
                    (order_id, line_no, product_id, product_name, product_kind,
                     unit_price_cents, quantity, subtotal_cents,
                     ticket_code, ticket_status, redeemed_at, redeemed_by)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ",
            )
            .bind(order.id.as_uuid())
            .bind(line_no as i64)
            .bind(item.product_id.map(|p| *p.as_uuid()))
            .bind(&item.product_name)
            .bind(item.product_kind.as_str())
            .bind(item.unit_price.cents())
            .bind(i64::from(item.quantity))
            .bind(item.subtotal.cents())
            .bind(item.ticket.as_ref().map(|t| t.code.as_str().to_owned()))
            .bind(item.ticket.as_ref().map(|t| t.status.as_str()))
            .bind(item.ticket.as_ref().and_then(|t| t.redeemed_at))
            .bind(
                item.ticket
                    .as_ref()
                    .and_then(|t| t.redeemed_by.map(|a| *a.as_uuid())),
            )
            .execute(&mut *tx)
            .await
            .map_err(unique_or_db_err)?;
        }

        tx.commit().await.map_err(db_err)
    }

    async fn order(&self, id: OrderId) -> Result<Order> {
        let row = sqlx::query(
            r"
            SELECT id, account_id, order_number, subtotal_cents, total_cents,
                   status, payment_status, created_at, cancelled_at
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StoreError::OrderNotFound)?;

        let mut order = order_from_row(&row)?;
        order.items = self.load_items(id).await?;
        Ok(order)
    }

    async fn orders_for_account(
        &self,
        account_id: AccountId,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>> {
        let mut orders = self.load_order_shells(account_id, status).await?;
        for order in &mut orders {
            order.items = self.load_items(order.id).await?;
        }
        Ok(orders)
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        cancelled_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET status = $2, cancelled_at = COALESCE($3, cancelled_at)
            WHERE id = $1
            ",
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(cancelled_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound);
        }
        Ok(())
    }

    async fn cancel_order_tickets(&self, order_id: OrderId) -> Result<()> {
        sqlx::query(
            r"
            UPDATE order_items
            SET ticket_status = 'cancelled'
            WHERE order_id = $1 AND ticket_status = 'valid'
            ",
        )
        .bind(order_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn delete_order(&self, id: OrderId) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query(r"DELETE FROM order_items WHERE order_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        let result = sqlx::query(r"DELETE FROM orders WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound);
        }
        tx.commit().await.map_err(db_err)
    }

    async fn ticket(&self, code: &TicketCode) -> Result<TicketRecord> {
        let row = sqlx::query(
            r"
            SELECT order_id, product_name, ticket_status, redeemed_at, redeemed_by
            FROM order_items
            WHERE ticket_code = $1
            ",
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(StoreError::TicketNotFound)?;

        ticket_record_from_row(&row, code.clone())
    }

    async fn redeem_ticket(
        &self,
        code: &TicketCode,
        redeemed_by: AccountId,
        redeemed_at: DateTime<Utc>,
    ) -> Result<TicketRecord> {
        // Compare-and-set on (code, valid): under concurrent scans the row
        // lock guarantees exactly one update succeeds.
        let redeemed = sqlx::query(
            r"
            UPDATE order_items
            SET ticket_status = 'used', redeemed_at = $2, redeemed_by = $3
            WHERE ticket_code = $1 AND ticket_status = 'valid'
            RETURNING order_id, product_name, ticket_status, redeemed_at, redeemed_by
            ",
        )
        .bind(code.as_str())
        .bind(redeemed_at)
        .bind(redeemed_by.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        if let Some(row) = redeemed {
            return ticket_record_from_row(&row, code.clone());
        }

        let exists = sqlx::query(r"SELECT 1 AS one FROM order_items WHERE ticket_code = $1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        if exists.is_some() {
            Err(StoreError::TicketAlreadyUsed {
                code: code.as_str().to_owned(),
            })
        } else {
            Err(StoreError::TicketNotFound)
        }
    }
}

// ────────────────────────────────────────────────────────────────
// Row mapping
// ────────────────────────────────────────────────────────────────

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

fn unique_or_db_err(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return StoreError::DuplicateCode;
        }
    }
    db_err(e)
}

fn to_u32(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::Database(format!("count out of range: {value}")))
}

fn parse_kind(value: &str) -> Result<ProductKind> {
    ProductKind::parse(value)
        .ok_or_else(|| StoreError::Database(format!("unknown product kind: {value}")))
}

fn product_from_row(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get("id").map_err(db_err)?),
        name: row.try_get("name").map_err(db_err)?,
        unit_price: Price::from_cents(row.try_get("unit_price_cents").map_err(db_err)?),
        kind: parse_kind(&row.try_get::<String, _>("kind").map_err(db_err)?)?,
        stock: to_u32(row.try_get("stock").map_err(db_err)?)?,
        active: row.try_get("active").map_err(db_err)?,
    })
}

fn order_from_row(row: &PgRow) -> Result<Order> {
    let status_raw: String = row.try_get("status").map_err(db_err)?;
    let payment_raw: String = row.try_get("payment_status").map_err(db_err)?;

    Ok(Order {
        id: OrderId::from_uuid(row.try_get("id").map_err(db_err)?),
        account_id: AccountId::from_uuid(row.try_get("account_id").map_err(db_err)?),
        number: OrderNumber::from_string(row.try_get("order_number").map_err(db_err)?),
        subtotal: Price::from_cents(row.try_get("subtotal_cents").map_err(db_err)?),
        total: Price::from_cents(row.try_get("total_cents").map_err(db_err)?),
        status: OrderStatus::parse(&status_raw)
            .ok_or_else(|| StoreError::Database(format!("unknown order status: {status_raw}")))?,
        payment_status: PaymentStatus::parse(&payment_raw).ok_or_else(|| {
            StoreError::Database(format!("unknown payment status: {payment_raw}"))
        })?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        cancelled_at: row.try_get("cancelled_at").map_err(db_err)?,
        items: Vec::new(),
    })
}

fn item_from_row(row: &PgRow) -> Result<OrderItem> {
    let ticket = match row
        .try_get::<Option<String>, _>("ticket_code")
        .map_err(db_err)?
    {
        Some(code) => {
            let status_raw: Option<String> = row.try_get("ticket_status").map_err(db_err)?;
            let status = status_raw
                .as_deref()
                .and_then(TicketStatus::parse)
                .ok_or_else(|| {
                    StoreError::Database(format!("ticket {code} has no valid status"))
                })?;
            Some(TicketStub {
                code: TicketCode::from_string(code),
                status,
                redeemed_at: row.try_get("redeemed_at").map_err(db_err)?,
                redeemed_by: row
                    .try_get::<Option<Uuid>, _>("redeemed_by")
                    .map_err(db_err)?
                    .map(AccountId::from_uuid),
            })
        }
        None => None,
    };

    Ok(OrderItem {
        order_id: OrderId::from_uuid(row.try_get("order_id").map_err(db_err)?),
        product_id: row
            .try_get::<Option<Uuid>, _>("product_id")
            .map_err(db_err)?
            .map(ProductId::from_uuid),
        product_name: row.try_get("product_name").map_err(db_err)?,
        product_kind: parse_kind(&row.try_get::<String, _>("product_kind").map_err(db_err)?)?,
        unit_price: Price::from_cents(row.try_get("unit_price_cents").map_err(db_err)?),
        quantity: to_u32(row.try_get("quantity").map_err(db_err)?)?,
        subtotal: Price::from_cents(row.try_get("subtotal_cents").map_err(db_err)?),
        ticket,
    })
}

fn ticket_record_from_row(row: &PgRow, code: TicketCode) -> Result<TicketRecord> {
    let status_raw: Option<String> = row.try_get("ticket_status").map_err(db_err)?;
    let status = status_raw
        .as_deref()
        .and_then(TicketStatus::parse)
        .ok_or_else(|| StoreError::Database(format!("ticket {code} has no valid status")))?;

    Ok(TicketRecord {
        order_id: OrderId::from_uuid(row.try_get("order_id").map_err(db_err)?),
        code,
        status,
        redeemed_at: row.try_get("redeemed_at").map_err(db_err)?,
        redeemed_by: row
            .try_get::<Option<Uuid>, _>("redeemed_by")
            .map_err(db_err)?
            .map(AccountId::from_uuid),
        product_name: row.try_get("product_name").map_err(db_err)?,
    })
}
