use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_optional_str, get_required_i64, get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{ReferenceItemStore, SqliteStore};
use serde_json::json;

fn handle_references_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "references": [] }));
    };
    match SqliteStore::new(conn).list_references() {
        Ok(references) => ok(&req.id, json!({ "references": references })),
        Err(e) => HandlerErr::store(e, "db_query_failed").response(&req.id),
    }
}

fn handle_references_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match get_required_i64(&req.params, "referenceId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let store = SqliteStore::new(conn);
    let reference = match store.get_reference(id) {
        Ok(r) => r,
        Err(e) => return HandlerErr::store(e, "db_query_failed").response(&req.id),
    };
    let item_count = match store.list_items(id) {
        Ok(items) => items.len(),
        Err(e) => return HandlerErr::store(e, "db_query_failed").response(&req.id),
    };
    ok(
        &req.id,
        json!({ "reference": reference, "itemCount": item_count }),
    )
}

fn handle_references_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let name = match get_required_str(&req.params, "name") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let description = match get_optional_str(&req.params, "description") {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => return e.response(&req.id),
    };
    match SqliteStore::new(conn).create_reference(&name, description) {
        Ok(reference) => {
            tracing::info!(id = reference.id, name = %reference.name, "reference created");
            ok(&req.id, json!({ "reference": reference }))
        }
        Err(e) => HandlerErr::store(e, "db_insert_failed").response(&req.id),
    }
}

fn handle_references_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match get_required_i64(&req.params, "referenceId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let name = match get_optional_str(&req.params, "name") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let description = match get_optional_str(&req.params, "description") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match SqliteStore::new(conn).update_reference(id, name, description) {
        Ok(reference) => ok(&req.id, json!({ "reference": reference })),
        Err(e) => HandlerErr::store(e, "db_update_failed").response(&req.id),
    }
}

fn handle_references_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match get_required_i64(&req.params, "referenceId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let removed = match SqliteStore::new(conn).delete_reference(id) {
        Ok(n) => n,
        Err(e) => return HandlerErr::store(e, "db_delete_failed").response(&req.id),
    };
    if state
        .pending_import
        .as_ref()
        .is_some_and(|p| p.reference_id == id)
    {
        state.pending_import = None;
    }
    tracing::info!(id, removed_items = removed, "reference deleted");
    ok(&req.id, json!({ "ok": true, "removedItems": removed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "references.list" => Some(handle_references_list(state, req)),
        "references.get" => Some(handle_references_get(state, req)),
        "references.create" => Some(handle_references_create(state, req)),
        "references.update" => Some(handle_references_update(state, req)),
        "references.delete" => Some(handle_references_delete(state, req)),
        _ => None,
    }
}
