use crate::ipc::helpers::{get_optional_i64, get_optional_str, require_db, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::lists::{reference_list, reference_options, ReferenceKey};
use crate::store::SqliteStore;
use serde_json::{json, Value};

fn lists_references(state: &AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let Some(conn) = state.db.as_ref() else {
        return Ok(json!({ "references": [] }));
    };
    let options = reference_options(&SqliteStore::new(conn))
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    Ok(json!({ "references": options }))
}

fn lists_get(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let key = match (
        get_optional_i64(&req.params, "referenceId")?,
        get_optional_str(&req.params, "referenceName")?,
    ) {
        (Some(id), _) => ReferenceKey::Id(id),
        (None, Some(name)) => ReferenceKey::Name(name),
        (None, None) => {
            return Err(HandlerErr::bad_params(
                "missing referenceId or referenceName",
            ))
        }
    };
    let lang = get_optional_str(&req.params, "lang")?
        .map(|l| l.trim().to_ascii_lowercase())
        .filter(|l| !l.is_empty());
    let options = reference_list(&SqliteStore::new(conn), key, lang.as_deref())
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    Ok(json!({ "items": options }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "lists.references" => lists_references(state, req),
        "lists.get" => lists_get(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
