use crate::events::{EventLog, ItemAction, ItemEvent, ItemListener};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_optional_str, get_raw_str, get_required_i64, get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{ReferenceItemStore, SqliteStore};
use serde_json::json;

fn handle_items_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let reference_id = match get_required_i64(&req.params, "referenceId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let store = SqliteStore::new(conn);
    if let Err(e) = store.get_reference(reference_id) {
        return HandlerErr::store(e, "db_query_failed").response(&req.id);
    }
    match store.list_items(reference_id) {
        Ok(items) => ok(&req.id, json!({ "items": items })),
        Err(e) => HandlerErr::store(e, "db_query_failed").response(&req.id),
    }
}

fn handle_items_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match get_required_i64(&req.params, "itemId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    match SqliteStore::new(conn).get_item(id) {
        Ok(item) => ok(&req.id, json!({ "item": item })),
        Err(e) => HandlerErr::store(e, "db_query_failed").response(&req.id),
    }
}

fn handle_items_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let reference_id = match get_required_i64(&req.params, "referenceId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let code = match get_required_str(&req.params, "code") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let name = match get_raw_str(&req.params, "name") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let item = match SqliteStore::new(conn).create_item(reference_id, &code, &name) {
        Ok(v) => v,
        Err(e) => return HandlerErr::store(e, "db_insert_failed").response(&req.id),
    };
    let mut log = EventLog::new();
    log.notify(ItemEvent {
        action: ItemAction::Create,
        item: item.clone(),
    });
    ok(
        &req.id,
        json!({ "item": item, "events": log.into_events() }),
    )
}

fn handle_items_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match get_required_i64(&req.params, "itemId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let code = match get_optional_str(&req.params, "code") {
        Ok(v) => v.map(str::trim),
        Err(e) => return e.response(&req.id),
    };
    let name = match get_optional_str(&req.params, "name") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let item = match SqliteStore::new(conn).modify_item(id, code, name) {
        Ok(v) => v,
        Err(e) => return HandlerErr::store(e, "db_update_failed").response(&req.id),
    };
    let mut log = EventLog::new();
    log.notify(ItemEvent {
        action: ItemAction::Update,
        item: item.clone(),
    });
    ok(
        &req.id,
        json!({ "item": item, "events": log.into_events() }),
    )
}

fn handle_items_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let id = match get_required_i64(&req.params, "itemId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let item = match SqliteStore::new(conn).delete_item(id) {
        Ok(v) => v,
        Err(e) => return HandlerErr::store(e, "db_delete_failed").response(&req.id),
    };
    let mut log = EventLog::new();
    log.notify(ItemEvent {
        action: ItemAction::Remove,
        item,
    });
    ok(&req.id, json!({ "ok": true, "events": log.into_events() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "items.list" => Some(handle_items_list(state, req)),
        "items.get" => Some(handle_items_get(state, req)),
        "items.create" => Some(handle_items_create(state, req)),
        "items.update" => Some(handle_items_update(state, req)),
        "items.delete" => Some(handle_items_delete(state, req)),
        _ => None,
    }
}
