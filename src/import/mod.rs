//! Bulk import of `code;name` files into a reference table.
//!
//! A run goes `received -> validated -> (rejected | reconciled) -> reported
//! -> (applied | refused)`. [`check`] covers everything up to the report; the
//! caller keeps the returned partition until the approver confirms and then
//! hands it to [`apply::apply`] together with the authorization decision.

pub mod apply;
pub mod parse;
pub mod reconcile;
pub mod summary;

use crate::error::ImportError;
use crate::store::ReferenceItemStore;

use parse::{ErrorReport, Validation};
use reconcile::ImportPartition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Wrong extension or file too small; nothing was parsed.
    FileRejected,
    /// At least one line is malformed or repeats a name.
    Invalid(ErrorReport),
    /// The file holds no candidate at all.
    Empty,
    /// Every candidate already exists unchanged.
    NoChanges(ImportPartition),
    Reconciled(ImportPartition),
}

pub fn check<S>(
    file_name: &str,
    raw: &[u8],
    reference_id: i64,
    store: &S,
) -> Result<CheckOutcome, ImportError>
where
    S: ReferenceItemStore + ?Sized,
{
    if !parse::is_importable_csv_file(file_name, raw.len() as u64) {
        tracing::warn!(file_name, size = raw.len(), "import file rejected");
        return Ok(CheckOutcome::FileRejected);
    }

    let candidates = match parse::parse_and_validate(raw, reference_id) {
        Validation::Accepted(c) => c,
        Validation::Rejected(report) => {
            tracing::warn!(
                file_name,
                errors = report.errors.len(),
                first_line = report.errors.first().map(|e| e.line()),
                "import file failed validation"
            );
            return Ok(CheckOutcome::Invalid(report));
        }
    };
    if candidates.is_empty() {
        return Ok(CheckOutcome::Empty);
    }

    let persisted = store.list_items(reference_id)?;
    let partition = reconcile::reconcile(candidates, &persisted)?;
    let counts = partition.counts();
    tracing::info!(
        reference_id,
        duplicates = counts.duplicates,
        to_update = counts.to_update,
        to_insert = counts.to_insert,
        "import reconciled"
    );
    if partition.has_no_changes() {
        return Ok(CheckOutcome::NoChanges(partition));
    }
    Ok(CheckOutcome::Reconciled(partition))
}
