//! Batch Scheduler
//!
//! Runs the expander over root records in fixed-size batches. Records within
//! a batch expand concurrently; the whole batch settles before its results
//! are appended (in input order) and the next batch starts after a pause.
//! Batches never overlap.

use crate::config::ExpandConfig;
use crate::expander::{Expander, Expansion};
use futures::future::join_all;
use gcat_common::DatasetRecord;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;

pub struct BatchScheduler {
    concurrency: usize,
    batch_delay: Duration,
}

impl BatchScheduler {
    pub fn new(config: &ExpandConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1),
            batch_delay: config.batch_delay,
        }
    }

    /// Expand every record, returning `(record id, expansion)` in input order
    pub async fn run(
        &self,
        expander: &Expander,
        records: &[DatasetRecord],
    ) -> Vec<(String, Expansion)> {
        let mut results = Vec::with_capacity(records.len());
        let total_batches = records.len().div_ceil(self.concurrency);

        for (index, batch) in records.chunks(self.concurrency).enumerate() {
            if index > 0 {
                sleep(self.batch_delay).await;
            }

            info!(
                batch = index + 1,
                total_batches,
                size = batch.len(),
                "Expanding batch"
            );

            let expansions = join_all(batch.iter().map(|record| expander.expand(record))).await;
            results.extend(
                batch
                    .iter()
                    .map(|record| record.id().to_string())
                    .zip(expansions),
            );
        }

        results
    }
}
