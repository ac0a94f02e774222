use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::import::reconcile::ImportPartition;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// A reconciled import waiting for the approver's confirmation.
#[derive(Debug, Clone)]
pub struct PendingImport {
    pub token: String,
    pub reference_id: i64,
    pub file_name: String,
    pub file_sha256: String,
    pub partition: ImportPartition,
    pub message: String,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    /// Acting user for authorization checks; none until `session.login`.
    pub user: Option<String>,
    pub pending_import: Option<PendingImport>,
}
