//! Domain types for the storefront order engine.
//!
//! Value objects, entities, and state machines for products, orders, and
//! tickets. Currency is fixed-point: catalog prices are cents (`Price`),
//! spendable balances are whole souls (`Souls`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an account
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Creates a new random `AccountId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `AccountId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a catalog product
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductId(Uuid);

impl ProductId {
    /// Creates a new random `ProductId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ProductId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ProductId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an order (internal; distinct from the public
/// [`OrderNumber`])
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new random `OrderId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `OrderId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Currency
// ============================================================================

/// Fixed-point catalog price in cents.
///
/// Catalog prices may be fractional currency (6.66 is 666 cents); arithmetic
/// stays in integer cents so line subtotals are exact.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Price(i64);

impl Price {
    /// Zero price
    pub const ZERO: Self = Self(0);

    /// Create a price from an amount in cents
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Amount in cents
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Price of `quantity` units at this unit price
    #[must_use]
    pub const fn times(self, quantity: u32) -> Self {
        Self(self.0 * quantity as i64)
    }

    /// Sum of two prices
    #[must_use]
    pub const fn plus(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }

    /// Whole-soul equivalent of this price.
    ///
    /// Balances are whole-unit integers while prices may be fractional, so
    /// the fractional part is truncated toward zero (13.32 debits 13 souls).
    #[must_use]
    pub const fn in_souls(self) -> Souls {
        Souls(self.0 / 100)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

/// Spendable account balance in whole souls
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Souls(i64);

impl Souls {
    /// Zero balance
    pub const ZERO: Self = Self(0);

    /// Create a balance from a whole-soul amount
    #[must_use]
    pub const fn new(amount: i64) -> Self {
        Self(amount)
    }

    /// Amount in whole souls
    #[must_use]
    pub const fn amount(self) -> i64 {
        self.0
    }
}

impl fmt::Display for Souls {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Public codes
// ============================================================================

/// Public, human-shareable order number (`ORD-` + 8 uppercase alphanumerics).
///
/// Unique across all persisted orders; distinct from the internal [`OrderId`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Wrap an already-issued order number (store loads)
    #[must_use]
    pub const fn from_string(value: String) -> Self {
        Self(value)
    }

    /// The order number as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-unit ticket code presented at the event door (`TKT-` + 8 uppercase
/// alphanumerics). Globally unique across all orders.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketCode(String);

impl TicketCode {
    /// Wrap an already-issued ticket code (store loads, redemption lookups)
    #[must_use]
    pub const fn from_string(value: String) -> Self {
        Self(value)
    }

    /// The ticket code as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Kind of sellable product
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// Event ticket — fanned out into individually-coded units at order time
    Ticket,
    /// Any non-ticket good (merchandise, drinks, ...)
    Good,
}

impl ProductKind {
    /// Whether this kind requires per-unit ticket codes
    #[must_use]
    pub const fn is_ticket(self) -> bool {
        matches!(self, Self::Ticket)
    }

    /// Stable string form used at the persistence boundary
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ticket => "ticket",
            Self::Good => "good",
        }
    }

    /// Parse the persisted string form
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ticket" => Some(Self::Ticket),
            "good" => Some(Self::Good),
            _ => None,
        }
    }
}

/// Sellable catalog entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product identifier
    pub id: ProductId,
    /// Display name
    pub name: String,
    /// Unit price in cents
    pub unit_price: Price,
    /// Ticket or non-ticket good
    pub kind: ProductKind,
    /// Units currently in stock (never negative)
    pub stock: u32,
    /// Whether the product is currently purchasable
    pub active: bool,
}

impl Product {
    /// Snapshot of the pricing-relevant fields, captured at reservation time
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            product_id: self.id,
            name: self.name.clone(),
            unit_price: self.unit_price,
            kind: self.kind,
        }
    }
}

/// Denormalized product fields captured when stock is reserved.
///
/// Pricing and line expansion work from this snapshot, never from a live
/// catalog re-read, so an order's prices are stable even if the catalog
/// changes mid-transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Product identifier
    pub product_id: ProductId,
    /// Display name at reservation time
    pub name: String,
    /// Unit price at reservation time
    pub unit_price: Price,
    /// Product kind
    pub kind: ProductKind,
}

// ============================================================================
// Accounts
// ============================================================================

/// Account view the core needs: identity plus spendable balance.
///
/// Registration, login, and balance credits (game-score rewards) belong to
/// collaborators; this core only debits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier
    pub id: AccountId,
    /// Display name (used in ticket notifications)
    pub display_name: String,
    /// Notification address
    pub email: String,
    /// Spendable balance in whole souls (never negative after a debit)
    pub balance: Souls,
}

// ============================================================================
// Order lifecycle
// ============================================================================

/// Lifecycle status of an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created but not yet settled (not produced by this core, which settles
    /// instantly; recognized for externally-created orders)
    Pending,
    /// Settled against the account balance
    Confirmed,
    /// Fulfilled by an external collaborator; terminal
    Completed,
    /// Cancelled with stock restored; terminal
    Cancelled,
}

impl OrderStatus {
    /// Whether no further transitions are legal from this status
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether a transition to `next` is legal.
    ///
    /// `Cancelled` is reachable from any non-terminal status; `Completed`
    /// only from `Confirmed`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::Confirmed)
            | (Self::Confirmed, Self::Completed)
            | (Self::Pending | Self::Confirmed, Self::Cancelled) => true,
            _ => false,
        }
    }

    /// Stable string form used at the persistence boundary
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the persisted string form
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement status of an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Awaiting settlement (not produced by this core)
    Pending,
    /// Settled against the account balance at creation
    Paid,
}

impl PaymentStatus {
    /// Stable string form used at the persistence boundary
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
        }
    }

    /// Parse the persisted string form
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }
}

// ============================================================================
// Ticket redemption
// ============================================================================

/// Redemption status of a single ticket unit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    /// Issued and redeemable at the door
    Valid,
    /// Redeemed exactly once; terminal
    Used,
    /// Expired by event action; terminal
    Expired,
    /// Cancelled administratively or with its order; terminal
    Cancelled,
}

impl TicketStatus {
    /// Whether the ticket can still be redeemed
    #[must_use]
    pub const fn is_redeemable(self) -> bool {
        matches!(self, Self::Valid)
    }

    /// Stable string form used at the persistence boundary
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Used => "used",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse the persisted string form
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "valid" => Some(Self::Valid),
            "used" => Some(Self::Used),
            "expired" => Some(Self::Expired),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket sub-record carried only by ticket-kind order items.
///
/// One tagged variant instead of an item-type hierarchy: an order keeps a
/// single uniform item collection, with the ticket fields populated only
/// when the line was fanned out from a ticket-kind product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketStub {
    /// Globally-unique door code
    pub code: TicketCode,
    /// Redemption status
    pub status: TicketStatus,
    /// When the ticket was redeemed, if it has been
    pub redeemed_at: Option<DateTime<Utc>>,
    /// Who scanned the ticket, if it has been redeemed
    pub redeemed_by: Option<AccountId>,
}

impl TicketStub {
    /// A freshly issued, redeemable ticket
    #[must_use]
    pub const fn issued(code: TicketCode) -> Self {
        Self {
            code,
            status: TicketStatus::Valid,
            redeemed_at: None,
            redeemed_by: None,
        }
    }
}

// ============================================================================
// Orders
// ============================================================================

/// One priced line within an order.
///
/// Either an aggregated non-ticket purchase (`quantity >= 1`, no ticket
/// stub) or exactly one ticket unit (`quantity == 1`, ticket stub present).
/// The product reference is weak: if the product is later deleted the line
/// keeps its denormalized name/kind/price so historical orders stay
/// readable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Owning order (mandatory back-reference; items are only ever touched
    /// through their order)
    pub order_id: OrderId,
    /// Product reference; `None` once the product has been deleted
    pub product_id: Option<ProductId>,
    /// Product name at purchase time
    pub product_name: String,
    /// Product kind at purchase time
    pub product_kind: ProductKind,
    /// Unit price at purchase time
    pub unit_price: Price,
    /// Units on this line (always 1 for ticket lines)
    pub quantity: u32,
    /// `unit_price * quantity`
    pub subtotal: Price,
    /// Ticket sub-record, present only for ticket-kind lines
    pub ticket: Option<TicketStub>,
}

/// One purchase transaction by one account.
///
/// Exclusively owns its items: cancellation and deletion are the only paths
/// that touch them. Totals and line composition are immutable after
/// creation except through lifecycle transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Internal identifier
    pub id: OrderId,
    /// Purchasing account
    pub account_id: AccountId,
    /// Public, human-shareable order number
    pub number: OrderNumber,
    /// Sum of line subtotals
    pub subtotal: Price,
    /// Order total (equals `subtotal`; kept separate at the persistence
    /// boundary for forward compatibility with fees/discounts)
    pub total: Price,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Settlement status
    pub payment_status: PaymentStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Cancellation time, if the order has been cancelled
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Priced lines (exclusive ownership)
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Codes of all tickets on this order, in line order
    #[must_use]
    pub fn ticket_codes(&self) -> Vec<TicketCode> {
        self.items
            .iter()
            .filter_map(|item| item.ticket.as_ref().map(|t| t.code.clone()))
            .collect()
    }
}

/// One requested line of a client cart: a product and how many units
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedLine {
    /// Requested product
    pub product_id: ProductId,
    /// Requested units
    pub quantity: u32,
}
