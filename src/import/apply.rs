use serde::Serialize;

use super::reconcile::ImportPartition;
use crate::error::StoreError;
use crate::events::{ItemAction, ItemEvent, ItemListener};
use crate::model::ReferenceItem;
use crate::store::ReferenceItemStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    pub inserted_ids: Vec<i64>,
    pub updated_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied(ApplyReport),
    Refused,
}

/// Writes inserts then updates, one row at a time; duplicates are skipped.
///
/// Rows are not wrapped in a batch transaction: when a write fails the error
/// is returned and rows written before it stay committed.
pub fn apply<S, L>(
    partition: &ImportPartition,
    authorization_granted: bool,
    store: &mut S,
    listener: &mut L,
) -> Result<ApplyOutcome, StoreError>
where
    S: ReferenceItemStore + ?Sized,
    L: ItemListener + ?Sized,
{
    if !authorization_granted {
        return Ok(ApplyOutcome::Refused);
    }

    let mut report = ApplyReport::default();
    for candidate in &partition.to_insert {
        let id = store.insert_item(candidate)?;
        tracing::debug!(id, code = %candidate.code, "inserted reference item");
        report.inserted_ids.push(id);
        listener.notify(ItemEvent {
            action: ItemAction::Create,
            item: ReferenceItem {
                id,
                reference_id: candidate.reference_id,
                code: candidate.code.clone(),
                name: candidate.name.clone(),
            },
        });
    }

    for candidate in &partition.to_update {
        let Some(id) = candidate.id else {
            return Err(StoreError::Invalid(format!(
                "update candidate on line {} has no target id",
                candidate.line
            )));
        };
        let item = ReferenceItem {
            id,
            reference_id: candidate.reference_id,
            code: candidate.code.clone(),
            name: candidate.name.clone(),
        };
        store.update_item(&item)?;
        tracing::debug!(id, code = %item.code, "updated reference item");
        report.updated_ids.push(id);
        listener.notify(ItemEvent {
            action: ItemAction::Update,
            item,
        });
    }

    Ok(ApplyOutcome::Applied(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use crate::import::reconcile::reconcile;
    use crate::model::Candidate;
    use crate::store::StoreResult;

    /// In-memory store that can be told to fail on the n-th write.
    #[derive(Default)]
    struct MemoryStore {
        rows: Vec<ReferenceItem>,
        next_id: i64,
        writes: usize,
        fail_on_write: Option<usize>,
    }

    impl MemoryStore {
        fn with_rows(rows: Vec<ReferenceItem>) -> Self {
            let next_id = rows.iter().map(|r| r.id).max().unwrap_or(0) + 1;
            Self {
                rows,
                next_id,
                ..Self::default()
            }
        }

        fn count_write(&mut self) -> StoreResult<()> {
            self.writes += 1;
            if self.fail_on_write == Some(self.writes) {
                return Err(StoreError::Db(rusqlite::Error::InvalidQuery));
            }
            Ok(())
        }
    }

    impl ReferenceItemStore for MemoryStore {
        fn list_items(&self, reference_id: i64) -> StoreResult<Vec<ReferenceItem>> {
            Ok(self
                .rows
                .iter()
                .filter(|r| r.reference_id == reference_id)
                .cloned()
                .collect())
        }

        fn insert_item(&mut self, candidate: &Candidate) -> StoreResult<i64> {
            self.count_write()?;
            let id = self.next_id;
            self.next_id += 1;
            self.rows.push(ReferenceItem {
                id,
                reference_id: candidate.reference_id,
                code: candidate.code.clone(),
                name: candidate.name.clone(),
            });
            Ok(id)
        }

        fn update_item(&mut self, item: &ReferenceItem) -> StoreResult<()> {
            self.count_write()?;
            let row = self
                .rows
                .iter_mut()
                .find(|r| r.id == item.id)
                .ok_or_else(|| StoreError::not_found("item", item.id))?;
            *row = item.clone();
            Ok(())
        }
    }

    fn france() -> ReferenceItem {
        ReferenceItem {
            id: 10,
            reference_id: 1,
            code: "fr".into(),
            name: "France".into(),
        }
    }

    #[test]
    fn refused_without_authorization_writes_nothing() {
        let mut store = MemoryStore::with_rows(vec![france()]);
        let partition = reconcile(
            vec![Candidate::new(1, 1, "be", "Belgique")],
            &store.rows,
        )
        .expect("reconcile");
        let mut log = EventLog::new();
        let outcome = apply(&partition, false, &mut store, &mut log).expect("apply");
        assert_eq!(outcome, ApplyOutcome::Refused);
        assert_eq!(store.rows.len(), 1);
        assert!(log.events().is_empty());
    }

    #[test]
    fn update_overwrites_matched_row() {
        let mut store = MemoryStore::with_rows(vec![france()]);
        let partition = reconcile(vec![Candidate::new(1, 1, "fr", "FRANCE")], &store.rows)
            .expect("reconcile");
        let mut log = EventLog::new();
        let outcome = apply(&partition, true, &mut store, &mut log).expect("apply");
        assert_eq!(
            outcome,
            ApplyOutcome::Applied(ApplyReport {
                inserted_ids: vec![],
                updated_ids: vec![10],
            })
        );
        assert_eq!(store.rows, vec![ReferenceItem { name: "FRANCE".into(), ..france() }]);
        assert_eq!(log.events()[0].action, ItemAction::Update);
    }

    #[test]
    fn duplicates_are_never_written() {
        let mut store = MemoryStore::with_rows(vec![france()]);
        let partition = reconcile(
            vec![
                Candidate::new(1, 1, "fr", "France"),
                Candidate::new(1, 2, "de", "Allemagne"),
            ],
            &store.rows,
        )
        .expect("reconcile");
        let mut log = EventLog::new();
        apply(&partition, true, &mut store, &mut log).expect("apply");
        assert_eq!(store.writes, 1);
        assert_eq!(store.rows.len(), 2);
        assert_eq!(log.events().len(), 1);
        assert_eq!(log.events()[0].action, ItemAction::Create);
    }

    #[test]
    fn failure_midway_keeps_earlier_writes() {
        let mut store = MemoryStore::with_rows(vec![]);
        store.fail_on_write = Some(2);
        let partition = reconcile(
            vec![
                Candidate::new(1, 1, "a", "A"),
                Candidate::new(1, 2, "b", "B"),
                Candidate::new(1, 3, "c", "C"),
            ],
            &store.rows,
        )
        .expect("reconcile");
        let mut log = EventLog::new();
        let err = apply(&partition, true, &mut store, &mut log).expect_err("second write fails");
        assert!(matches!(err, StoreError::Db(_)));
        assert_eq!(store.rows.len(), 1);
        assert_eq!(store.rows[0].code, "a");
        assert_eq!(log.events().len(), 1);
    }

    #[test]
    fn reconcile_after_apply_reports_only_duplicates() {
        let mut store = MemoryStore::with_rows(vec![france()]);
        let batch = vec![
            Candidate::new(1, 1, "fr", "FRANCE"),
            Candidate::new(1, 2, "it", "Italie"),
        ];
        let partition = reconcile(batch.clone(), &store.rows).expect("reconcile");
        apply(&partition, true, &mut store, &mut EventLog::new()).expect("apply");

        let again = reconcile(batch, &store.list_items(1).expect("list")).expect("reconcile");
        assert!(again.has_no_changes());
        assert_eq!(again.duplicates.len(), 2);
    }
}
