use crate::ledger::PointsLedger;
use anyhow::Result;
use async_trait::async_trait;
use colored::Colorize;
use core_logic::{mask_hex, Worker, WorkerStats};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SUMMARY_INTERVAL: Duration = Duration::from_secs(120);

/// Read-only consumer of the ledger: prints a sorted per-account
/// balance table with a running total every two minutes.
pub struct PointsReporter {
    ledger: PointsLedger,
}

impl PointsReporter {
    pub fn new(ledger: PointsLedger) -> Self {
        Self { ledger }
    }

    async fn render(&self) {
        let snapshot = self.ledger.snapshot().await;

        println!("\n{}", "═".repeat(60));
        println!("{}", "Points Summary".bold().cyan());
        println!("{}", "═".repeat(60));

        let mut total_points: u64 = 0;
        for (address, points) in &snapshot {
            println!(
                "{}: {} points",
                mask_hex(address).cyan(),
                points.to_string().yellow()
            );
            total_points += points;
        }

        println!("{}", "═".repeat(60));
        println!("{}", format!("Total Points: {}", total_points).bold().green());
        println!("{}\n", "═".repeat(60));
    }
}

#[async_trait]
impl Worker for PointsReporter {
    fn name(&self) -> String {
        "points-summary".to_string()
    }

    async fn run(&self, cancellation_token: CancellationToken) -> Result<WorkerStats> {
        loop {
            if cancellation_token.is_cancelled() {
                break;
            }

            self.render().await;

            tokio::select! {
                _ = cancellation_token.cancelled() => break,
                _ = tokio::time::sleep(SUMMARY_INTERVAL) => {}
            }
        }

        Ok(WorkerStats::default())
    }
}
