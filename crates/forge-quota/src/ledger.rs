//! Usage ledger
//!
//! Counters roll over on calendar boundaries (UTC): tokens per month,
//! requests per day.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use dashmap::DashMap;
use forge_core::TenantId;

/// Ledger errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("usage ledger unavailable: {0}")]
    Unavailable(String),
}

/// Per-tenant usage counters consumed by admission control
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuotaLedger: Send + Sync {
    /// Tokens consumed in the current calendar month
    async fn monthly_token_usage(&self, tenant: &TenantId) -> Result<u64, LedgerError>;

    /// Generation calls made today
    async fn daily_request_count(&self, tenant: &TenantId) -> Result<u64, LedgerError>;

    /// Add `tokens` to the month and one request to the day
    ///
    /// Called only after a successful generation call.
    async fn record_usage(&self, tenant: &TenantId, tokens: u64) -> Result<(), LedgerError>;
}

/// Point-in-time view of one tenant's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UsageSnapshot {
    pub monthly_tokens: u64,
    pub monthly_requests: u64,
    pub daily_requests: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    fn of(now: DateTime<Utc>) -> Self {
        Self {
            year: now.year(),
            month: now.month(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Counters {
    month: MonthKey,
    monthly_tokens: u64,
    monthly_requests: u64,
    day: NaiveDate,
    daily_requests: u64,
}

impl Counters {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            month: MonthKey::of(now),
            monthly_tokens: 0,
            monthly_requests: 0,
            day: now.date_naive(),
            daily_requests: 0,
        }
    }

    /// Reset any counter whose period has ended
    fn roll(&mut self, now: DateTime<Utc>) {
        let month = MonthKey::of(now);
        if self.month != month {
            self.month = month;
            self.monthly_tokens = 0;
            self.monthly_requests = 0;
        }
        let day = now.date_naive();
        if self.day != day {
            self.day = day;
            self.daily_requests = 0;
        }
    }

    fn snapshot(mut self, now: DateTime<Utc>) -> UsageSnapshot {
        self.roll(now);
        UsageSnapshot {
            monthly_tokens: self.monthly_tokens,
            monthly_requests: self.monthly_requests,
            daily_requests: self.daily_requests,
        }
    }
}

/// In-process ledger
///
/// Each tenant's counters sit behind one map shard lock, so concurrent
/// `record_usage` calls never lose an increment.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    tenants: DashMap<TenantId, Counters>,
}

impl MemoryLedger {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a tenant with existing usage in the current periods
    pub fn preload(&self, tenant: &TenantId, monthly_tokens: u64, daily_requests: u64) {
        let now = Utc::now();
        let mut counters = Counters::fresh(now);
        counters.monthly_tokens = monthly_tokens;
        counters.monthly_requests = daily_requests;
        counters.daily_requests = daily_requests;
        self.tenants.insert(tenant.clone(), counters);
    }

    #[must_use]
    pub fn snapshot(&self, tenant: &TenantId) -> UsageSnapshot {
        self.snapshot_at(tenant, Utc::now())
    }

    #[must_use]
    pub fn snapshot_at(&self, tenant: &TenantId, now: DateTime<Utc>) -> UsageSnapshot {
        self.tenants
            .get(tenant)
            .map(|counters| counters.snapshot(now))
            .unwrap_or_default()
    }

    /// Record one call at an explicit instant
    pub fn record_at(&self, tenant: &TenantId, tokens: u64, now: DateTime<Utc>) {
        let mut counters = self
            .tenants
            .entry(tenant.clone())
            .or_insert_with(|| Counters::fresh(now));
        counters.roll(now);
        counters.monthly_tokens = counters.monthly_tokens.saturating_add(tokens);
        counters.monthly_requests += 1;
        counters.daily_requests += 1;
    }
}

#[async_trait]
impl QuotaLedger for MemoryLedger {
    async fn monthly_token_usage(&self, tenant: &TenantId) -> Result<u64, LedgerError> {
        Ok(self.snapshot(tenant).monthly_tokens)
    }

    async fn daily_request_count(&self, tenant: &TenantId) -> Result<u64, LedgerError> {
        Ok(self.snapshot(tenant).daily_requests)
    }

    async fn record_usage(&self, tenant: &TenantId, tokens: u64) -> Result<(), LedgerError> {
        self.record_at(tenant, tokens, Utc::now());
        tracing::trace!(tenant = %tenant, tokens, "usage recorded");
        Ok(())
    }
}
