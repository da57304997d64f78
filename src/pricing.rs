//! Pricing and line-item expansion.
//!
//! Works exclusively from the [`ProductSnapshot`] captured when stock was
//! reserved, never from a live catalog re-read, so an order's prices are
//! stable even if the catalog changes mid-transaction.

use crate::types::{Price, ProductSnapshot};

/// One per-unit (or aggregated) line produced by [`expand`], ready to be
/// minted into an order item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineDescriptor {
    /// Snapshot the line was priced from
    pub snapshot: ProductSnapshot,
    /// Units on this line (1 for every ticket descriptor)
    pub quantity: u32,
    /// `unit_price * quantity`
    pub subtotal: Price,
    /// Whether this descriptor needs its own ticket code
    pub needs_ticket: bool,
}

/// Compute `(unit_price, subtotal)` for a requested quantity of a product,
/// using the snapshot's captured unit price.
#[must_use]
pub fn price_line(snapshot: &ProductSnapshot, quantity: u32) -> (Price, Price) {
    (snapshot.unit_price, snapshot.unit_price.times(quantity))
}

/// Expand a reserved line into its order-item descriptors.
///
/// Ticket-kind products fan out into `quantity` single-unit descriptors so
/// each unit gets its own scannable code; goods stay as one aggregated
/// descriptor with the original quantity. The sequence is lazy and finite.
pub fn expand(snapshot: ProductSnapshot, quantity: u32) -> impl Iterator<Item = LineDescriptor> {
    let needs_ticket = snapshot.kind.is_ticket();
    let (units, per_unit_quantity) = if needs_ticket {
        (quantity, 1)
    } else {
        (1, quantity)
    };

    (0..units).map(move |_| LineDescriptor {
        snapshot: snapshot.clone(),
        quantity: per_unit_quantity,
        subtotal: snapshot.unit_price.times(per_unit_quantity),
        needs_ticket,
    })
}
