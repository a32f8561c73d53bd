//! Forge Quota - admission control for generation calls
//!
//! Two pieces:
//! - [`QuotaLedger`]: per-tenant monthly token and daily request counters
//! - [`QuotaGate`]: decides whether a tenant may make another generation call
//!
//! Usage is recorded only after a successful call, so a failed call never
//! debits the tenant.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod gate;
pub mod ledger;

pub use gate::{Admission, QuotaGate};
pub use ledger::{LedgerError, MemoryLedger, QuotaLedger, UsageSnapshot};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
