//! Spawned runs and their error boundary
//!
//! A run executes on its own task. Whatever happens inside it, an error or a
//! panic, ends in the run's recovery step; nothing propagates back to the
//! trigger.

use forge_core::{PipelineError, ProjectId};
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;

/// Which orchestrator a run belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunKind {
    Analysis,
    Wireframe,
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analysis => f.write_str("analysis"),
            Self::Wireframe => f.write_str("wireframe"),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed { category: &'static str },
}

impl RunOutcome {
    #[inline]
    #[must_use]
    pub fn is_completed(self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Handle to a spawned run; dropping it detaches the run
#[derive(Debug)]
pub struct RunHandle {
    kind: RunKind,
    project_id: ProjectId,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    #[inline]
    #[must_use]
    pub fn kind(&self) -> RunKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end
    pub async fn wait(self) -> RunOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    project_id = %self.project_id,
                    kind = %self.kind,
                    error = %e,
                    "run task aborted"
                );
                RunOutcome::Failed { category: "panicked" }
            }
        }
    }
}

/// Spawn `work`; on error or panic hand the error to `recover`
pub(crate) fn spawn_run<W, R, RF>(
    kind: RunKind,
    project_id: ProjectId,
    work: W,
    recover: R,
) -> RunHandle
where
    W: Future<Output = Result<(), PipelineError>> + Send + 'static,
    R: FnOnce(PipelineError) -> RF + Send + 'static,
    RF: Future<Output = ()> + Send + 'static,
{
    let task = tokio::spawn(async move {
        let result = AssertUnwindSafe(work)
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(PipelineError::Panicked(panic_message(panic.as_ref()))));

        match result {
            Ok(()) => RunOutcome::Completed,
            Err(error) => {
                let category = error.category();
                if AssertUnwindSafe(recover(error)).catch_unwind().await.is_err() {
                    tracing::error!(project_id = %project_id, %kind, "run recovery panicked");
                }
                RunOutcome::Failed { category }
            }
        }
    });

    RunHandle {
        kind,
        project_id,
        task,
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn completed_run_skips_recovery() {
        let recovered = Arc::new(AtomicUsize::new(0));
        let counter = recovered.clone();
        let handle = spawn_run(
            RunKind::Analysis,
            ProjectId::new(),
            async { Ok(()) },
            move |_| async move {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );

        assert_eq!(handle.wait().await, RunOutcome::Completed);
        assert_eq!(recovered.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn error_reaches_recovery_with_category() {
        let handle = spawn_run(
            RunKind::Wireframe,
            ProjectId::new(),
            async { Err(PipelineError::TransportFailure("down".into())) },
            |error| async move {
                assert!(matches!(error, PipelineError::TransportFailure(_)));
            },
        );

        assert_eq!(
            handle.wait().await,
            RunOutcome::Failed {
                category: "transport_failure"
            }
        );
    }

    fn explode() -> Result<(), PipelineError> {
        panic!("gateway exploded")
    }

    #[tokio::test]
    async fn panic_is_caught_and_recovered() {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let handle = spawn_run(
            RunKind::Analysis,
            ProjectId::new(),
            async { explode() },
            move |error| async move {
                let _ = tx.send(error.to_string());
            },
        );

        assert_eq!(handle.wait().await, RunOutcome::Failed { category: "panicked" });
        assert!(rx.await.unwrap().contains("gateway exploded"));
    }
}
