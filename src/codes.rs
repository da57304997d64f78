//! Issuance of public order numbers and per-unit ticket codes.
//!
//! Both formats are a fixed prefix plus 8 uppercase alphanumeric characters
//! derived from a v4 UUID, so collision probability is negligible. The
//! persistence layer still enforces uniqueness; on a reported violation the
//! orchestrator retries issuance once before failing with
//! `CodeIssuanceFailed`.

use crate::types::{OrderNumber, TicketCode};
use uuid::Uuid;

/// Prefix for public order numbers
pub const ORDER_NUMBER_PREFIX: &str = "ORD";

/// Prefix for ticket door codes
pub const TICKET_CODE_PREFIX: &str = "TKT";

/// Number of random characters after the prefix
const CODE_LEN: usize = 8;

fn short_code(prefix: &str) -> String {
    let entropy = Uuid::new_v4().simple().to_string().to_uppercase();
    // Simple-format UUIDs are 32 hex chars, always enough for the slice.
    format!("{prefix}-{}", &entropy[..CODE_LEN])
}

/// Issue a fresh public order number (`ORD-XXXXXXXX`)
#[must_use]
pub fn issue_order_number() -> OrderNumber {
    OrderNumber::from_string(short_code(ORDER_NUMBER_PREFIX))
}

/// Issue a fresh ticket door code (`TKT-XXXXXXXX`)
#[must_use]
pub fn issue_ticket_code() -> TicketCode {
    TicketCode::from_string(short_code(TICKET_CODE_PREFIX))
}
