//! Merge/Dedup Reconciler
//!
//! Walks the original record sequence once. A root record with a recorded
//! expansion is replaced in place by that expansion's records; every other
//! record is kept as-is. The spliced sequence is then deduplicated by id,
//! first occurrence wins.

use crate::classifier::classify;
use crate::types::{Warning, WarningKind};
use gcat_common::DatasetRecord;
use std::collections::{HashMap, HashSet};

/// Final record sequence plus the collisions dropped on the way
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub records: Vec<DatasetRecord>,
    pub duplicates: Vec<Warning>,
}

/// True when the record's service URL points at a root service
pub fn is_root_record(record: &DatasetRecord) -> bool {
    record
        .public_web_service()
        .is_some_and(|url| classify(url).is_root())
}

/// Splice expansions into the original order, then drop duplicate ids
pub fn reconcile(
    original: &[DatasetRecord],
    expansions: &HashMap<String, Vec<DatasetRecord>>,
) -> Reconciliation {
    let spliced = original.iter().flat_map(|record| {
        match expansions.get(record.id()) {
            Some(expanded) if is_root_record(record) => expanded.clone(),
            _ => vec![record.clone()],
        }
    });

    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut records = Vec::with_capacity(original.len());
    let mut duplicates = Vec::new();

    for record in spliced {
        if seen_ids.insert(record.id().to_string()) {
            records.push(record);
        } else {
            duplicates.push(Warning::emit(
                record.id(),
                record.layer_id(),
                WarningKind::DuplicateId,
                "duplicate id; keeping first occurrence",
            ));
        }
    }

    Reconciliation {
        records,
        duplicates,
    }
}
