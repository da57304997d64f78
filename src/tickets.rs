//! Ticket validation and one-time redemption.
//!
//! Redemption is a strict state machine: `valid -> used`, exactly once,
//! enforced as an atomic compare-and-set at the store so concurrent door
//! scans can never both succeed. `expired` and `cancelled` are terminal
//! states reached through event or administrative action; this service only
//! recognizes them.

use crate::error::Result;
use crate::metrics;
use crate::store::{StorefrontStore, TicketRecord};
use crate::types::{AccountId, TicketCode, TicketStatus};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};

/// Looks up and redeems tickets by their door code.
#[derive(Clone)]
pub struct TicketService {
    store: Arc<dyn StorefrontStore>,
}

impl TicketService {
    /// Create a service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn StorefrontStore>) -> Self {
        Self { store }
    }

    /// Read-only validation scan: report the ticket's current state without
    /// changing it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TicketNotFound`](crate::StoreError::TicketNotFound) if no ticket carries the code.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn validate_ticket(&self, code: &TicketCode) -> Result<TicketRecord> {
        self.store.ticket(code).await
    }

    /// Redeem a ticket at the door: one-time transition `valid -> used`,
    /// recording when and by whom.
    ///
    /// Never retried automatically — a second attempt on the same code is a
    /// real `TicketAlreadyUsed`, not a transient fault.
    ///
    /// # Errors
    ///
    /// - [`StoreError::TicketNotFound`](crate::StoreError::TicketNotFound) if no ticket carries the code
    /// - [`StoreError::TicketAlreadyUsed`](crate::StoreError::TicketAlreadyUsed) if the ticket is no longer
    ///   `valid` — under concurrent scans exactly one caller succeeds
    #[instrument(skip(self), fields(code = %code, redeemed_by = %redeemed_by))]
    pub async fn redeem_ticket(
        &self,
        code: &TicketCode,
        redeemed_by: AccountId,
    ) -> Result<TicketRecord> {
        let record = self
            .store
            .redeem_ticket(code, redeemed_by, Utc::now())
            .await?;

        debug_assert_eq!(record.status, TicketStatus::Used);
        info!(code = %code, order_id = %record.order_id, "ticket redeemed");
        metrics::record_ticket_redeemed();
        Ok(record)
    }

    /// Whether a code is currently redeemable (`valid`), without redeeming.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TicketNotFound`](crate::StoreError::TicketNotFound) if no ticket carries the code.
    pub async fn is_redeemable(&self, code: &TicketCode) -> Result<bool> {
        Ok(self.validate_ticket(code).await?.status.is_redeemable())
    }
}
