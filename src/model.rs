use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub id: i64,
    pub name: String,
    pub description: String,
}

/// A persisted code/name entry of a reference table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceItem {
    pub id: i64,
    pub reference_id: i64,
    pub code: String,
    pub name: String,
}

/// An item parsed from an import file that is not persisted yet.
///
/// `id` stays `None` until reconciliation matches it against an existing row,
/// in which case it carries the id of the row it will overwrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: Option<i64>,
    pub reference_id: i64,
    pub code: String,
    pub name: String,
    /// 1-based line in the source file.
    pub line: usize,
}

impl Candidate {
    pub fn new(reference_id: i64, line: usize, code: &str, name: &str) -> Self {
        Self {
            id: None,
            reference_id,
            code: code.to_string(),
            name: name.to_string(),
            line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationItem {
    pub id: i64,
    pub item_id: i64,
    /// Default name of the owning item, joined in for display.
    pub item_name: String,
    pub lang: String,
    pub translation: String,
}
