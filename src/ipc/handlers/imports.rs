use std::path::Path;

use crate::error::{ImportError, ReconcileError};
use crate::events::EventLog;
use crate::import::apply::{apply, ApplyOutcome};
use crate::import::summary::{summarize, LINE_BREAK};
use crate::import::{check, CheckOutcome};
use crate::ipc::handlers::setup::{load_import_messages, ImportMessages};
use crate::ipc::helpers::{get_optional_str, get_required_i64, get_required_str, require_db, HandlerErr};
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, PendingImport, Request};
use crate::rbac::{Authorizer, GrantTable, PERMISSION_CREATE, RESOURCE_TYPE_REFERENCE};
use crate::store::SqliteStore;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

fn messages(conn: &rusqlite::Connection) -> Result<ImportMessages, HandlerErr> {
    load_import_messages(conn).map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))
}

fn pending_json(p: &PendingImport) -> Value {
    json!({
        "token": p.token,
        "referenceId": p.reference_id,
        "fileName": p.file_name,
        "fileSha256": p.file_sha256,
        "counts": p.partition.counts(),
        "message": p.message,
    })
}

fn import_error(e: ImportError) -> HandlerErr {
    match e {
        ImportError::Store(e) => HandlerErr::store(e, "db_query_failed"),
        ImportError::Integrity(e) => {
            let details = match &e {
                ReconcileError::DuplicatePersistedCode {
                    reference_id,
                    code,
                    count,
                } => {
                    tracing::error!(error = %e, "persisted items violate code uniqueness");
                    json!({ "referenceId": reference_id, "code": code, "count": count })
                }
                ReconcileError::RepeatedBatchCode {
                    reference_id,
                    code,
                    first_line,
                    line,
                } => {
                    tracing::warn!(error = %e, "import file repeats a code");
                    json!({ "referenceId": reference_id, "code": code, "lines": [first_line, line] })
                }
            };
            HandlerErr::new("data_integrity", e.to_string()).with_details(details)
        }
    }
}

fn handle_imports_check(state: &mut AppState, req: &Request) -> Value {
    // Any new check supersedes what the approver saw before.
    state.pending_import = None;

    let conn = match require_db(state) {
        Ok(c) => c,
        Err(e) => return e.response(&req.id),
    };
    let reference_id = match get_required_i64(&req.params, "referenceId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let in_path = match get_required_str(&req.params, "inPath") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let file_name = match get_optional_str(&req.params, "fileName") {
        Ok(Some(name)) => name.to_string(),
        Ok(None) => Path::new(&in_path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        Err(e) => return e.response(&req.id),
    };

    let store = SqliteStore::new(conn);
    if let Err(e) = store.get_reference(reference_id) {
        return HandlerErr::store(e, "db_query_failed").response(&req.id);
    }
    let msgs = match messages(conn) {
        Ok(m) => m,
        Err(e) => return e.response(&req.id),
    };
    let bytes = match std::fs::read(&in_path) {
        Ok(b) => b,
        Err(e) => {
            return HandlerErr::new("io_failed", e.to_string())
                .with_details(json!({ "path": in_path }))
                .response(&req.id)
        }
    };
    let file_sha256 = hex::encode(Sha256::digest(&bytes));

    let outcome = match check(&file_name, &bytes, reference_id, &store) {
        Ok(o) => o,
        Err(e) => return import_error(e).response(&req.id),
    };
    let partition = match outcome {
        CheckOutcome::FileRejected => {
            return HandlerErr::new("file_rejected", msgs.file_error)
                .with_details(json!({ "fileName": file_name, "size": bytes.len() }))
                .response(&req.id)
        }
        CheckOutcome::Invalid(report) => {
            let message = format!("{} invalid line(s) in {}", report.errors.len(), file_name);
            return HandlerErr::new("import_invalid", message)
                .with_details(json!({
                    "errorReport": report.render(),
                    "errorReportBase64": report.to_base64(),
                    "errors": report.errors,
                    "acceptedLines": report.accepted_lines,
                }))
                .response(&req.id);
        }
        CheckOutcome::Empty => {
            return HandlerErr::new("nothing_to_import", msgs.import_empty).response(&req.id)
        }
        CheckOutcome::NoChanges(partition) => {
            let message = format!(
                "{}{}{}",
                msgs.not_imported,
                LINE_BREAK,
                summarize(&partition, &msgs.summary)
            );
            return HandlerErr::new("nothing_to_import", message)
                .with_details(json!({ "counts": partition.counts() }))
                .response(&req.id);
        }
        CheckOutcome::Reconciled(partition) => partition,
    };

    let pending = PendingImport {
        token: Uuid::new_v4().to_string(),
        reference_id,
        file_name,
        file_sha256,
        message: summarize(&partition, &msgs.summary),
        partition,
    };
    let mut result = pending_json(&pending);
    result["status"] = json!("reconciled");
    state.pending_import = Some(pending);
    ok(&req.id, result)
}

fn handle_imports_pending(state: &mut AppState, req: &Request) -> Value {
    ok(
        &req.id,
        json!({ "pending": state.pending_import.as_ref().map(pending_json) }),
    )
}

fn handle_imports_cancel(state: &mut AppState, req: &Request) -> Value {
    let cancelled = state.pending_import.take().is_some();
    ok(&req.id, json!({ "cancelled": cancelled }))
}

fn is_import_allowed(
    authorizer: &dyn Authorizer,
    reference_id: i64,
    user: Option<&str>,
) -> Result<bool, HandlerErr> {
    authorizer
        .is_authorized(
            RESOURCE_TYPE_REFERENCE,
            &reference_id.to_string(),
            PERMISSION_CREATE,
            user,
        )
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))
}

fn handle_imports_apply(state: &mut AppState, req: &Request) -> Value {
    let token = match get_required_str(&req.params, "token") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if state.db.is_none() {
        return HandlerErr::new("no_workspace", "select a workspace first").response(&req.id);
    }
    let pending = match state.pending_import.take() {
        Some(p) if p.token == token => p,
        other => {
            state.pending_import = other;
            return HandlerErr::new("no_pending_import", "no pending import matches this token")
                .response(&req.id);
        }
    };
    let conn = match require_db(state) {
        Ok(c) => c,
        Err(e) => return e.response(&req.id),
    };
    let msgs = match messages(conn) {
        Ok(m) => m,
        Err(e) => return e.response(&req.id),
    };
    let user = state.user.as_deref();
    let granted = match is_import_allowed(&GrantTable::new(conn), pending.reference_id, user) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let mut store = SqliteStore::new(conn);
    let mut log = EventLog::new();
    match apply(&pending.partition, granted, &mut store, &mut log) {
        Ok(ApplyOutcome::Refused) => {
            tracing::warn!(
                reference_id = pending.reference_id,
                user = user.unwrap_or("-"),
                "import refused"
            );
            HandlerErr::new("import_refused", msgs.import_refused)
                .with_details(json!({ "referenceId": pending.reference_id, "user": user }))
                .response(&req.id)
        }
        Ok(ApplyOutcome::Applied(report)) => {
            tracing::info!(
                reference_id = pending.reference_id,
                file_sha256 = %pending.file_sha256,
                inserted = report.inserted_ids.len(),
                updated = report.updated_ids.len(),
                "import applied"
            );
            ok(
                &req.id,
                json!({
                    "inserted": report.inserted_ids.len(),
                    "updated": report.updated_ids.len(),
                    "insertedIds": report.inserted_ids,
                    "updatedIds": report.updated_ids,
                    "events": log.into_events(),
                    "message": msgs.imported,
                }),
            )
        }
        Err(e) => {
            // Rows written before the failure stay committed.
            tracing::error!(
                reference_id = pending.reference_id,
                error = %e,
                written = log.events().len(),
                "import stopped on a failed write"
            );
            HandlerErr::store(e, "db_insert_failed")
                .with_details(json!({ "events": log.into_events() }))
                .response(&req.id)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "imports.check" => Some(handle_imports_check(state, req)),
        "imports.pending" => Some(handle_imports_pending(state, req)),
        "imports.apply" => Some(handle_imports_apply(state, req)),
        "imports.cancel" => Some(handle_imports_cancel(state, req)),
        _ => None,
    }
}
