use crate::traits::Worker;
use anyhow::Result;
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};

pub struct WorkerRunner;

impl WorkerRunner {
    /// Spawns the workers as concurrent tasks and waits for all of them.
    ///
    /// A Ctrl+C listener cancels the shared token; workers observe it
    /// cooperatively and return their stats, which are aggregated here.
    pub async fn run_workers(workers: Vec<Box<dyn Worker>>) -> Result<()> {
        let mut set = JoinSet::new();

        let token = CancellationToken::new();
        let cloned_token = token.clone();

        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C. Initiating graceful shutdown...");
                    cloned_token.cancel();
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        });

        let start_time = std::time::Instant::now();
        info!("Starting {} workers...", workers.len());

        for (i, worker) in workers.into_iter().enumerate() {
            let id = i + 1;
            let span = tracing::info_span!(
                "worker",
                worker_id = format!("{:03}", id),
                name = worker.name()
            );
            let child_token = token.clone();

            set.spawn(
                async move {
                    match worker.run(child_token).await {
                        Ok(stats) => Ok(stats),
                        Err(e) => {
                            error!("Worker {} failed: {:?}", id, e);
                            Err(e)
                        }
                    }
                }
                .instrument(span),
            );
        }

        let mut total_success = 0;
        let mut total_failed = 0;

        while let Some(res) = set.join_next().await {
            match res {
                Ok(Ok(stats)) => {
                    total_success += stats.success;
                    total_failed += stats.failed;
                }
                Ok(Err(_)) => {
                    // Already logged inside the task
                }
                Err(e) => {
                    error!("A worker task panicked or failed to join: {:?}", e);
                }
            }
        }

        let total_duration = start_time.elapsed();
        let total = total_success + total_failed;
        let rate = if total > 0 {
            (total_success as f64 / total as f64) * 100.0
        } else {
            0.0
        };

        info!("Shutdown complete.");
        info!(
            "Total Time: {:.1}s | Total Success: {} | Total Fail: {} | Success Rate: {:.2}%",
            total_duration.as_secs_f64(),
            total_success,
            total_failed,
            rate
        );

        Ok(())
    }
}
