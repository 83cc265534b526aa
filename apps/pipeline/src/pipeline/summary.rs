//! Run Summary Aggregator — lock-free counters shared by concurrent postings.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::result::ProcessingStatus;

/// Snapshot of a run's counters. `total_scraped - total_filtered - total_processed`
/// is the number of not-relevant and failed postings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub total_scraped: u64,
    pub total_filtered: u64,
    pub total_processed: u64,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    scraped: AtomicU64,
    filtered: AtomicU64,
    processed: AtomicU64,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_scraped(&self, count: u64) {
        self.scraped.fetch_add(count, Ordering::Relaxed);
    }

    /// Increments at most one counter per terminal outcome.
    pub fn record(&self, status: ProcessingStatus) {
        match status {
            ProcessingStatus::Filtered => {
                self.filtered.fetch_add(1, Ordering::Relaxed);
            }
            ProcessingStatus::Accepted => {
                self.processed.fetch_add(1, Ordering::Relaxed);
            }
            ProcessingStatus::NotRelevant | ProcessingStatus::Failed => {}
        }
    }

    pub fn snapshot(&self) -> PipelineSummary {
        PipelineSummary {
            total_scraped: self.scraped.load(Ordering::Relaxed),
            total_filtered: self.filtered.load(Ordering::Relaxed),
            total_processed: self.processed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_not_relevant_and_failed_count_nowhere() {
        let summary = RunSummary::new();
        summary.add_scraped(4);
        summary.record(ProcessingStatus::Filtered);
        summary.record(ProcessingStatus::Accepted);
        summary.record(ProcessingStatus::NotRelevant);
        summary.record(ProcessingStatus::Failed);

        assert_eq!(
            summary.snapshot(),
            PipelineSummary {
                total_scraped: 4,
                total_filtered: 1,
                total_processed: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_records_are_not_lost() {
        let summary = Arc::new(RunSummary::new());
        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let summary = summary.clone();
                tokio::spawn(async move {
                    summary.add_scraped(1);
                    let status = if i % 2 == 0 {
                        ProcessingStatus::Accepted
                    } else {
                        ProcessingStatus::Filtered
                    };
                    summary.record(status);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let snapshot = summary.snapshot();
        assert_eq!(snapshot.total_scraped, 50);
        assert_eq!(snapshot.total_filtered, 25);
        assert_eq!(snapshot.total_processed, 25);
    }

    #[test]
    fn test_snapshot_mid_run_is_a_copy() {
        let summary = RunSummary::new();
        summary.add_scraped(1);
        let before = summary.snapshot();
        summary.add_scraped(2);
        assert_eq!(before.total_scraped, 1);
        assert_eq!(summary.snapshot().total_scraped, 3);
    }
}
