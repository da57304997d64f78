//! Collaborator contracts consumed by the transactional core.
//!
//! The core settles orders synchronously and only afterwards hands side
//! effects to collaborators. The notifier is the one contract the core
//! drives directly: it runs strictly post-commit, fire-and-forget, and its
//! failure must never affect an order's outcome.

mod console_notifier;

pub use console_notifier::ConsoleNotifier;

use crate::error::Result;
use crate::types::TicketCode;
use async_trait::async_trait;

/// Post-commit ticket notification contract.
///
/// Implementations deliver freshly-issued ticket codes to the purchaser
/// (email in production). The orchestrator invokes this from a detached
/// task after the order has committed; implementations may fail, but that
/// failure is logged and dropped, never propagated into the order result.
#[async_trait]
pub trait TicketNotifier: Send + Sync {
    /// Deliver the given ticket codes to the purchaser.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails; callers log and ignore it.
    async fn notify_tickets_issued(
        &self,
        recipient: &str,
        display_name: &str,
        codes: &[TicketCode],
    ) -> Result<()>;
}

/// Notifier that silently drops every notification. Useful in tests that
/// don't assert on delivery.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl TicketNotifier for NoopNotifier {
    async fn notify_tickets_issued(
        &self,
        _recipient: &str,
        _display_name: &str,
        _codes: &[TicketCode],
    ) -> Result<()> {
        Ok(())
    }
}
