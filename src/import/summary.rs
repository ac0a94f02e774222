use super::reconcile::ImportPartition;

/// Phrases that follow each bucket count in the confirmation summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryPhrases {
    pub duplicate_in_table: String,
    pub to_update: String,
    pub to_insert: String,
}

impl Default for SummaryPhrases {
    fn default() -> Self {
        Self {
            duplicate_in_table: "item(s) already present in the table".into(),
            to_update: "item(s) to update".into(),
            to_insert: "item(s) to insert".into(),
        }
    }
}

pub const LINE_BREAK: &str = "\n";

/// One `<count> <phrase>` clause per non-empty bucket: duplicates, then
/// updates, then inserts.
pub fn summarize(partition: &ImportPartition, phrases: &SummaryPhrases) -> String {
    let counts = partition.counts();
    let clauses = [
        (counts.duplicates, &phrases.duplicate_in_table),
        (counts.to_update, &phrases.to_update),
        (counts.to_insert, &phrases.to_insert),
    ];
    clauses
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, phrase)| format!("{} {}", n, phrase))
        .collect::<Vec<_>>()
        .join(LINE_BREAK)
}
