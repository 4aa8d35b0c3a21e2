//! Run pipeline: partition → schedule → reconcile → summarize

use crate::expander::{Expander, ExpansionOutcome};
use crate::reconciler::{is_root_record, reconcile};
use crate::scheduler::BatchScheduler;
use crate::types::Warning;
use gcat_common::DatasetRecord;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Counts describing one run, computed from id sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Records before the run
    pub before: usize,
    /// Records after the run
    pub after: usize,
    /// Root records handed to the expander
    pub roots_processed: usize,
    /// Roots replaced by derived children
    pub expanded: usize,
    /// Roots pinned to their single layer
    pub pinned: usize,
    /// Roots left as they were
    pub unchanged: usize,
    /// Ids present after but not before, in output order
    pub added_ids: Vec<String>,
    /// Ids present before but not after, in input order
    pub removed_ids: Vec<String>,
    /// Records dropped as duplicate ids
    pub duplicates: usize,
}

impl Summary {
    pub fn log(&self) {
        info!(
            before = self.before,
            after = self.after,
            roots = self.roots_processed,
            expanded = self.expanded,
            pinned = self.pinned,
            unchanged = self.unchanged,
            added = self.added_ids.len(),
            removed = self.removed_ids.len(),
            duplicates = self.duplicates,
            "Run summary"
        );
    }
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub records: Vec<DatasetRecord>,
    /// Expansion warnings followed by duplicate-id warnings
    pub warnings: Vec<Warning>,
    pub summary: Summary,
}

impl RunReport {
    /// Log the outcome of the run
    ///
    /// Individual warnings were logged when raised and are only counted here.
    pub fn log(&self) {
        if !self.warnings.is_empty() {
            warn!(count = self.warnings.len(), "Run finished with warnings");
        }
        self.summary.log();
        for id in &self.summary.added_ids {
            info!(dataset_id = %id, "Added");
        }
        for id in &self.summary.removed_ids {
            info!(dataset_id = %id, "Removed");
        }
    }
}

/// Expand every root record of `records` and reconcile the result
pub async fn run(
    records: &[DatasetRecord],
    expander: &Expander,
    scheduler: &BatchScheduler,
) -> RunReport {
    let roots: Vec<DatasetRecord> = records
        .iter()
        .filter(|record| is_root_record(record))
        .cloned()
        .collect();

    info!(
        total = records.len(),
        roots = roots.len(),
        passthrough = records.len() - roots.len(),
        "Partitioned catalog"
    );

    let results = scheduler.run(expander, &roots).await;

    let mut summary = Summary {
        before: records.len(),
        roots_processed: roots.len(),
        ..Default::default()
    };
    let mut warnings = Vec::new();
    let mut expansions: HashMap<String, Vec<DatasetRecord>> = HashMap::with_capacity(results.len());

    for (parent_id, expansion) in results {
        match expansion.outcome {
            ExpansionOutcome::Expanded => summary.expanded += 1,
            ExpansionOutcome::Pinned => summary.pinned += 1,
            ExpansionOutcome::Unchanged => summary.unchanged += 1,
        }
        warnings.extend(expansion.warnings);
        expansions.entry(parent_id).or_insert(expansion.records);
    }

    let reconciliation = reconcile(records, &expansions);
    summary.duplicates = reconciliation.duplicates.len();
    warnings.extend(reconciliation.duplicates);

    let final_records = reconciliation.records;
    let before_ids: HashSet<&str> = records.iter().map(|r| r.id()).collect();
    let after_ids: HashSet<&str> = final_records.iter().map(|r| r.id()).collect();

    summary.after = final_records.len();
    summary.added_ids = final_records
        .iter()
        .filter(|r| !before_ids.contains(r.id()))
        .map(|r| r.id().to_string())
        .collect();

    let mut removed_seen = HashSet::new();
    summary.removed_ids = records
        .iter()
        .map(|r| r.id())
        .filter(|id| !after_ids.contains(id) && removed_seen.insert(*id))
        .map(str::to_string)
        .collect();

    RunReport {
        records: final_records,
        warnings,
        summary,
    }
}
