use thiserror::Error;

/// Failures raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Invalid(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// IPC error code for this failure, given the code used for raw db errors.
    pub fn code(&self, db_code: &'static str) -> &'static str {
        match self {
            Self::Db(_) => db_code,
            Self::NotFound { .. } => "not_found",
            Self::Conflict(_) => "conflict",
            Self::Invalid(_) => "bad_params",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("code {code:?} is shared by {count} persisted items of reference {reference_id}")]
    DuplicatePersistedCode {
        reference_id: i64,
        code: String,
        count: usize,
    },

    #[error("code {code:?} of reference {reference_id} appears on lines {first_line} and {line}")]
    RepeatedBatchCode {
        reference_id: i64,
        code: String,
        first_line: usize,
        line: usize,
    },
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Integrity(#[from] ReconcileError),
}
