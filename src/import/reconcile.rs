use std::collections::HashMap;

use serde::Serialize;

use crate::error::ReconcileError;
use crate::model::{Candidate, ReferenceItem};

/// Classification of one batch of candidates against the persisted rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportPartition {
    pub to_insert: Vec<Candidate>,
    pub to_update: Vec<Candidate>,
    pub duplicates: Vec<Candidate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionCounts {
    pub duplicates: usize,
    pub to_update: usize,
    pub to_insert: usize,
}

impl ImportPartition {
    pub fn counts(&self) -> PartitionCounts {
        PartitionCounts {
            duplicates: self.duplicates.len(),
            to_update: self.to_update.len(),
            to_insert: self.to_insert.len(),
        }
    }

    /// True when applying would not write anything.
    pub fn has_no_changes(&self) -> bool {
        self.to_insert.is_empty() && self.to_update.is_empty()
    }
}

/// Splits candidates into inserts (unknown code), duplicates (same code and
/// same name) and updates (same code, different name; the candidate takes
/// the persisted row's id). Bucket order follows candidate order.
///
/// Codes must be unique within the table. A code carried by more than one
/// persisted row, or by more than one candidate of the batch, is reported
/// instead of being matched arbitrarily or inserted twice.
pub fn reconcile(
    candidates: Vec<Candidate>,
    persisted: &[ReferenceItem],
) -> Result<ImportPartition, ReconcileError> {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for candidate in &candidates {
        if let Some(&first_line) = first_seen.get(candidate.code.as_str()) {
            return Err(ReconcileError::RepeatedBatchCode {
                reference_id: candidate.reference_id,
                code: candidate.code.clone(),
                first_line,
                line: candidate.line,
            });
        }
        first_seen.insert(candidate.code.as_str(), candidate.line);
    }

    let mut by_code: HashMap<&str, Vec<&ReferenceItem>> = HashMap::new();
    for item in persisted {
        by_code.entry(item.code.as_str()).or_default().push(item);
    }

    let mut partition = ImportPartition::default();
    for mut candidate in candidates {
        let matched = match by_code.get(candidate.code.as_str()) {
            None => None,
            Some(rows) if rows.len() == 1 => Some(rows[0]),
            Some(rows) => {
                return Err(ReconcileError::DuplicatePersistedCode {
                    reference_id: rows[0].reference_id,
                    code: candidate.code.clone(),
                    count: rows.len(),
                })
            }
        };

        match matched {
            None => partition.to_insert.push(candidate),
            Some(row) if row.name == candidate.name => partition.duplicates.push(candidate),
            Some(row) => {
                candidate.id = Some(row.id);
                partition.to_update.push(candidate);
            }
        }
    }
    Ok(partition)
}
