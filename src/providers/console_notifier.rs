//! Console ticket notifier for development and testing.

use crate::error::Result;
use crate::providers::TicketNotifier;
use crate::types::TicketCode;
use async_trait::async_trait;
use tracing::info;

/// Ticket notifier that logs to the console instead of sending email.
///
/// Useful for development and testing where you don't want to send real
/// notifications.
#[derive(Clone, Debug, Default)]
pub struct ConsoleNotifier;

impl ConsoleNotifier {
    /// Create a new console notifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TicketNotifier for ConsoleNotifier {
    async fn notify_tickets_issued(
        &self,
        recipient: &str,
        display_name: &str,
        codes: &[TicketCode],
    ) -> Result<()> {
        info!(
            to = %recipient,
            tickets = codes.len(),
            "🎟️ Ticket Email (Development Mode)"
        );
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    TICKETS ISSUED                            ║");
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!("║ To: {recipient:<57}║");
        println!("║ Hello {display_name}, your codes for the door:{:<18}║", "");
        for code in codes {
            println!("║   🎟️ {:<55}║", code.as_str());
        }
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        Ok(())
    }
}
