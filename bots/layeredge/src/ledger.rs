use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-wide record of each account's last observed point balance.
///
/// Writers are partitioned by key: an account's own tasks are the only
/// ones that ever write its entry, so entries never race. The reporter
/// reads snapshots without mutating.
#[derive(Clone, Default)]
pub struct PointsLedger {
    inner: Arc<RwLock<HashMap<String, u64>>>,
}

impl PointsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a fresh observation and returns the signed delta against
    /// the previous value, or `None` when this is the first one.
    pub async fn record(&self, address: &str, points: u64) -> Option<i64> {
        let mut map = self.inner.write().await;
        let previous = map.insert(address.to_string(), points);
        previous.map(|old| points as i64 - old as i64)
    }

    pub async fn get(&self, address: &str) -> Option<u64> {
        self.inner.read().await.get(address).copied()
    }

    /// Address-sorted balances for summary rendering.
    pub async fn snapshot(&self) -> Vec<(String, u64)> {
        let map = self.inner.read().await;
        let mut entries: Vec<(String, u64)> = map.iter().map(|(k, v)| (k.clone(), *v)).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_observation_has_no_delta() {
        let ledger = PointsLedger::new();
        assert_eq!(ledger.record("0xaa", 100).await, None);
        assert_eq!(ledger.get("0xaa").await, Some(100));
    }

    #[tokio::test]
    async fn delta_is_signed() {
        let ledger = PointsLedger::new();
        ledger.record("0xaa", 100).await;
        assert_eq!(ledger.record("0xaa", 150).await, Some(50));
        assert_eq!(ledger.record("0xaa", 120).await, Some(-30));
        assert_eq!(ledger.record("0xaa", 120).await, Some(0));
        assert_eq!(ledger.get("0xaa").await, Some(120));
    }

    #[tokio::test]
    async fn snapshot_is_sorted_by_address() {
        let ledger = PointsLedger::new();
        ledger.record("0xcc", 3).await;
        ledger.record("0xaa", 1).await;
        ledger.record("0xbb", 2).await;

        let snapshot = ledger.snapshot().await;
        let addresses: Vec<&str> = snapshot.iter().map(|(a, _)| a.as_str()).collect();
        assert_eq!(addresses, vec!["0xaa", "0xbb", "0xcc"]);

        let total: u64 = snapshot.iter().map(|(_, p)| p).sum();
        assert_eq!(total, 6);
    }

    #[tokio::test]
    async fn entries_are_independent_per_account() {
        let ledger = PointsLedger::new();
        ledger.record("0xaa", 100).await;
        ledger.record("0xbb", 200).await;

        ledger.record("0xaa", 175).await;
        assert_eq!(ledger.get("0xbb").await, Some(200));
    }
}
