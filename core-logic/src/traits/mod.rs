use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    pub success: u64,
    pub failed: u64,
}

/// A long-lived unit of work driven by the [`WorkerRunner`].
///
/// Workers run until the cancellation token fires; cancellation is
/// cooperative and must be observed at every suspension point.
///
/// [`WorkerRunner`]: crate::WorkerRunner
#[async_trait]
pub trait Worker: Send + Sync {
    /// Short identifier used for the worker's tracing span.
    fn name(&self) -> String;

    /// Drive the worker until cancelled, returning accumulated stats.
    async fn run(
        &self,
        cancellation_token: tokio_util::sync::CancellationToken,
    ) -> Result<WorkerStats>;
}
