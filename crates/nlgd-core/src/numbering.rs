//! Human-readable document numbers.
//!
//! Generation has no side effect: callers peek a number when a form opens
//! and consume the counter only when the document is actually saved.

use chrono::{Datelike, Utc};

pub const CONTRACT_PREFIX: &str = "NL-C";

fn current_year() -> i32 {
    Utc::now().year()
}

pub fn generate_number_for_year(prefix: &str, year: i32, seq: u32) -> String {
    format!("{prefix}-{year}-{seq:03}")
}

/// `{prefix}-{year}-{seq:03}` for the current year.
pub fn generate_number(prefix: &str, seq: u32) -> String {
    generate_number_for_year(prefix, current_year(), seq)
}

pub fn generate_invoice_number(prefix: &str, seq: u32) -> String {
    generate_number_for_year(&format!("{prefix}-INV"), current_year(), seq)
}

/// Contracts are numbered from the live count, not a stored counter, so a
/// delete followed by a create can repeat an earlier number.
pub fn generate_contract_number(existing_contracts: usize) -> String {
    generate_contract_number_for_year(existing_contracts, current_year())
}

pub fn generate_contract_number_for_year(existing_contracts: usize, year: i32) -> String {
    let seq = u32::try_from(existing_contracts).unwrap_or(u32::MAX - 1) + 1;
    generate_number_for_year(CONTRACT_PREFIX, year, seq)
}
