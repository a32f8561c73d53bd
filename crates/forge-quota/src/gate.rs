//! Admission control
//!
//! Two checks, monthly tokens first and then today's requests. Each passes
//! when usage is strictly below the tier's budget; an unlimited budget always
//! passes and its counter is not read.

use crate::ledger::{LedgerError, QuotaLedger};
use forge_core::{Budget, PipelineError, TenantId, TierLimits};
use std::sync::Arc;

/// Result of an admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Granted,
    Denied(String),
}

impl Admission {
    #[inline]
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    /// # Errors
    /// - `PipelineError::AdmissionDenied` carrying the denial reason
    pub fn into_result(self) -> Result<(), PipelineError> {
        match self {
            Self::Granted => Ok(()),
            Self::Denied(reason) => Err(PipelineError::AdmissionDenied { reason }),
        }
    }
}

/// Decides whether a tenant may invoke the generation capability
#[derive(Clone)]
pub struct QuotaGate {
    ledger: Arc<dyn QuotaLedger>,
}

impl QuotaGate {
    #[must_use]
    pub fn new(ledger: Arc<dyn QuotaLedger>) -> Self {
        Self { ledger }
    }

    #[must_use]
    pub fn ledger(&self) -> &Arc<dyn QuotaLedger> {
        &self.ledger
    }

    /// Check both budgets; the daily counter is not read if the monthly check
    /// already denies
    ///
    /// # Errors
    /// - `LedgerError` if a counter could not be read
    pub async fn admit(
        &self,
        tenant: &TenantId,
        limits: &TierLimits,
    ) -> Result<Admission, LedgerError> {
        if let Budget::Limited(max) = limits.monthly_token_quota {
            let used = self.ledger.monthly_token_usage(tenant).await?;
            if !limits.monthly_token_quota.permits(used) {
                tracing::info!(tenant = %tenant, used, max, "monthly token quota exhausted");
                return Ok(Admission::Denied(format!(
                    "Monthly token quota exceeded. You have used {used} of {max} tokens. Please upgrade your plan."
                )));
            }
        }

        if let Budget::Limited(max) = limits.daily_generation_limit {
            let used = self.ledger.daily_request_count(tenant).await?;
            if !limits.daily_generation_limit.permits(used) {
                tracing::info!(tenant = %tenant, used, max, "daily generation limit reached");
                return Ok(Admission::Denied(format!(
                    "Daily AI request limit reached. You have used {used} of {max} daily requests. Try again tomorrow or upgrade your plan."
                )));
            }
        }

        Ok(Admission::Granted)
    }

    /// [`Self::admit`] folded into the pipeline error taxonomy
    ///
    /// # Errors
    /// - `PipelineError::AdmissionDenied` on denial
    /// - `PipelineError::PersistenceFailure` if the ledger is unreachable
    pub async fn require(
        &self,
        tenant: &TenantId,
        limits: &TierLimits,
    ) -> Result<(), PipelineError> {
        self.admit(tenant, limits)
            .await
            .map_err(|e| {
                PipelineError::PersistenceFailure(forge_core::StoreError::Unavailable(
                    e.to_string(),
                ))
            })?
            .into_result()
    }
}

impl std::fmt::Debug for QuotaGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaGate").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MockQuotaLedger;
    use mockall::predicate::eq;

    fn limits(monthly: Budget, daily: Budget) -> TierLimits {
        TierLimits::new(monthly, daily, Budget::Limited(3))
    }

    #[tokio::test]
    async fn monthly_denial_skips_daily_counter() {
        let mut ledger = MockQuotaLedger::new();
        ledger
            .expect_monthly_token_usage()
            .with(eq(TenantId::new("tenant-a")))
            .times(1)
            .returning(|_| Ok(50_000));
        ledger.expect_daily_request_count().times(0);

        let gate = QuotaGate::new(Arc::new(ledger));
        let admission = gate
            .admit(
                &TenantId::new("tenant-a"),
                &limits(Budget::Limited(50_000), Budget::Limited(10)),
            )
            .await
            .unwrap();

        match admission {
            Admission::Denied(reason) => {
                assert!(reason.starts_with("Monthly token quota exceeded"));
                assert!(reason.contains("50000 of 50000"));
            }
            Admission::Granted => panic!("expected denial"),
        }
    }

    #[tokio::test]
    async fn daily_limit_is_exclusive() {
        let mut ledger = MockQuotaLedger::new();
        ledger.expect_monthly_token_usage().returning(|_| Ok(0));
        ledger.expect_daily_request_count().returning(|_| Ok(10));

        let gate = QuotaGate::new(Arc::new(ledger));
        let admission = gate
            .admit(
                &TenantId::new("tenant-a"),
                &limits(Budget::Limited(50_000), Budget::Limited(10)),
            )
            .await
            .unwrap();
        assert!(matches!(
            admission,
            Admission::Denied(reason) if reason.starts_with("Daily AI request limit reached")
        ));
    }

    #[tokio::test]
    async fn unlimited_tier_reads_nothing() {
        let mut ledger = MockQuotaLedger::new();
        ledger.expect_monthly_token_usage().times(0);
        ledger.expect_daily_request_count().times(0);

        let gate = QuotaGate::new(Arc::new(ledger));
        let admission = gate
            .admit(&TenantId::new("big-co"), &TierLimits::unlimited())
            .await
            .unwrap();
        assert_eq!(admission, Admission::Granted);
    }

    #[tokio::test]
    async fn ledger_failure_propagates() {
        let mut ledger = MockQuotaLedger::new();
        ledger
            .expect_monthly_token_usage()
            .returning(|_| Err(LedgerError::Unavailable("down".into())));

        let gate = QuotaGate::new(Arc::new(ledger));
        let tenant = TenantId::new("tenant-a");
        let bounded = limits(Budget::Limited(1), Budget::Limited(1));

        assert!(gate.admit(&tenant, &bounded).await.is_err());
        assert!(matches!(
            gate.require(&tenant, &bounded).await,
            Err(PipelineError::PersistenceFailure(_))
        ));
    }

    #[test]
    fn denied_admission_maps_to_pipeline_error() {
        let err = Admission::Denied("nope".into()).into_result().unwrap_err();
        assert!(matches!(err, PipelineError::AdmissionDenied { ref reason } if reason == "nope"));
        assert!(err.is_synchronous());
    }
}
