use crate::ipc::helpers::{get_optional_str, get_required_str, require_db, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::rbac::{
    is_known_permission, resource_types, Grant, GrantTable, RESOURCE_TYPE_REFERENCE, WILDCARD,
};
use crate::store::SqliteStore;
use serde_json::{json, Value};

fn resource_types_list(_state: &AppState, _req: &Request) -> Result<Value, HandlerErr> {
    Ok(json!({ "resourceTypes": resource_types() }))
}

fn resources_list(state: &AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let references = SqliteStore::new(conn)
        .list_references()
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let resources = references
        .into_iter()
        .map(|r| json!({ "id": r.id.to_string(), "title": r.name }))
        .collect::<Vec<_>>();
    Ok(json!({ "resourceType": RESOURCE_TYPE_REFERENCE, "resources": resources }))
}

/// `referenceId` is a number or `"*"`; `permission` defaults to `"*"`.
fn parse_grant(state: &AppState, req: &Request) -> Result<Grant, HandlerErr> {
    let conn = require_db(state)?;
    let user = get_required_str(&req.params, "user")?;
    let resource_id = match req.params.get("referenceId") {
        Some(Value::String(s)) if s == WILDCARD => WILDCARD.to_string(),
        Some(v) => {
            let id = v
                .as_i64()
                .ok_or_else(|| HandlerErr::bad_params("referenceId must be an integer or \"*\""))?;
            SqliteStore::new(conn)
                .get_reference(id)
                .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
            id.to_string()
        }
        None => return Err(HandlerErr::bad_params("missing referenceId")),
    };
    let permission = get_optional_str(&req.params, "permission")?
        .map(|p| p.trim().to_ascii_uppercase())
        .unwrap_or_else(|| WILDCARD.to_string());
    if !is_known_permission(RESOURCE_TYPE_REFERENCE, &permission) {
        return Err(HandlerErr::bad_params(format!(
            "unknown permission: {}",
            permission
        )));
    }
    Ok(Grant {
        user,
        resource_type: RESOURCE_TYPE_REFERENCE.to_string(),
        resource_id,
        permission,
    })
}

fn grant(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let g = parse_grant(state, req)?;
    let conn = require_db(state)?;
    let created = GrantTable::new(conn)
        .grant(&g)
        .map_err(|e| HandlerErr::store(e, "db_insert_failed"))?;
    tracing::info!(user = %g.user, resource_id = %g.resource_id, permission = %g.permission, "rbac grant");
    Ok(json!({ "grant": g, "created": created }))
}

fn revoke(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let g = parse_grant(state, req)?;
    let conn = require_db(state)?;
    let removed = GrantTable::new(conn)
        .revoke(&g)
        .map_err(|e| HandlerErr::store(e, "db_delete_failed"))?;
    tracing::info!(user = %g.user, resource_id = %g.resource_id, permission = %g.permission, "rbac revoke");
    Ok(json!({ "grant": g, "removed": removed }))
}

fn grants_list(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let user = get_optional_str(&req.params, "user")?;
    let grants = GrantTable::new(conn)
        .list(user)
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    Ok(json!({ "grants": grants }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "rbac.resourceTypes" => resource_types_list(state, req),
        "rbac.resources" => resources_list(state, req),
        "rbac.grant" => grant(state, req),
        "rbac.revoke" => revoke(state, req),
        "rbac.grants" => grants_list(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
