//! Metrics registry for plinthdb
//!
//! - Counters only
//! - Monotonic increase
//! - Thread-safe but lock-free

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Planner counters
///
/// All counters use Relaxed ordering; each is independent.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Naive plans built
    naive_plans: AtomicU64,
    /// Cost-based plans built
    optimal_plans: AtomicU64,
    /// Planning attempts that ended in an error
    plans_rejected: AtomicU64,
    /// Optimal plans answered by the index fast path
    index_fast_path: AtomicU64,
    /// Join-order passes run
    join_passes: AtomicU64,
    /// Join operators costed across all passes
    join_candidates: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_naive_plans(&self) {
        self.naive_plans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_optimal_plans(&self) {
        self.optimal_plans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_plans_rejected(&self) {
        self.plans_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_index_fast_path(&self) {
        self.index_fast_path.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_join_passes(&self) {
        self.join_passes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_join_candidates(&self, count: u64) {
        self.join_candidates.fetch_add(count, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            naive_plans: self.naive_plans.load(Ordering::Relaxed),
            optimal_plans: self.optimal_plans.load(Ordering::Relaxed),
            plans_rejected: self.plans_rejected.load(Ordering::Relaxed),
            index_fast_path: self.index_fast_path.load(Ordering::Relaxed),
            join_passes: self.join_passes.load(Ordering::Relaxed),
            join_candidates: self.join_candidates.load(Ordering::Relaxed),
        }
    }

    /// Current snapshot as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub naive_plans: u64,
    pub optimal_plans: u64,
    pub plans_rejected: u64,
    pub index_fast_path: u64,
    pub join_passes: u64,
    pub join_candidates: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        let snapshot = MetricsRegistry::new().snapshot();
        assert_eq!(snapshot.optimal_plans, 0);
        assert_eq!(snapshot.join_candidates, 0);
    }

    #[test]
    fn test_increment_counters() {
        let registry = MetricsRegistry::new();
        registry.increment_naive_plans();
        registry.increment_optimal_plans();
        registry.increment_optimal_plans();
        registry.increment_plans_rejected();
        registry.increment_index_fast_path();
        registry.increment_join_passes();
        registry.add_join_candidates(3);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.naive_plans, 1);
        assert_eq!(snapshot.optimal_plans, 2);
        assert_eq!(snapshot.plans_rejected, 1);
        assert_eq!(snapshot.index_fast_path, 1);
        assert_eq!(snapshot.join_passes, 1);
        assert_eq!(snapshot.join_candidates, 3);
    }

    #[test]
    fn test_to_json() {
        let registry = MetricsRegistry::new();
        registry.add_join_candidates(6);

        let parsed: serde_json::Value = serde_json::from_str(&registry.to_json()).unwrap();
        assert_eq!(parsed["join_candidates"], 6);
        assert_eq!(parsed["naive_plans"], 0);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(MetricsRegistry::new());
        let mut handles = vec![];

        for _ in 0..8 {
            let reg = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    reg.increment_optimal_plans();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.snapshot().optimal_plans, 800);
    }
}
