use crate::ipc::handlers::setup::load_languages;
use crate::ipc::helpers::{
    get_optional_i64, get_optional_str, get_raw_str, get_required_i64, get_required_str, require_db,
    respond, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::store::SqliteStore;
use rusqlite::Connection;
use serde_json::{json, Value};

/// Normalizes `lang` and checks it against the configured languages.
fn allowed_lang(conn: &Connection, lang: &str) -> Result<String, HandlerErr> {
    let lang = lang.trim().to_ascii_lowercase();
    let languages =
        load_languages(conn).map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    if !languages.contains(&lang) {
        return Err(HandlerErr::bad_params(format!("language {:?} is not allowed", lang))
            .with_details(json!({ "allowed": languages })));
    }
    Ok(lang)
}

fn translations_list(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let reference_id = get_required_i64(&req.params, "referenceId")?;
    let store = SqliteStore::new(conn);
    store
        .get_reference(reference_id)
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    let translations = store
        .list_translations(reference_id)
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    Ok(json!({ "translations": translations }))
}

fn translations_get(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let id = get_required_i64(&req.params, "translationId")?;
    let translation = SqliteStore::new(conn)
        .get_translation(id)
        .map_err(|e| HandlerErr::store(e, "db_query_failed"))?;
    Ok(json!({ "translation": translation }))
}

fn translations_create(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let item_id = get_required_i64(&req.params, "itemId")?;
    let lang = allowed_lang(conn, &get_required_str(&req.params, "lang")?)?;
    let text = get_raw_str(&req.params, "translation")?;
    let translation = SqliteStore::new(conn)
        .create_translation(item_id, &lang, &text)
        .map_err(|e| HandlerErr::store(e, "db_insert_failed"))?;
    Ok(json!({ "translation": translation }))
}

fn translations_update(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let id = get_required_i64(&req.params, "translationId")?;
    let item_id = get_optional_i64(&req.params, "itemId")?;
    let lang = match get_optional_str(&req.params, "lang")? {
        Some(l) => Some(allowed_lang(conn, l)?),
        None => None,
    };
    let text = get_optional_str(&req.params, "translation")?;
    let translation = SqliteStore::new(conn)
        .update_translation(id, item_id, lang.as_deref(), text)
        .map_err(|e| HandlerErr::store(e, "db_update_failed"))?;
    Ok(json!({ "translation": translation }))
}

fn translations_delete(state: &AppState, req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let id = get_required_i64(&req.params, "translationId")?;
    SqliteStore::new(conn)
        .delete_translation(id)
        .map_err(|e| HandlerErr::store(e, "db_delete_failed"))?;
    Ok(json!({ "ok": true }))
}

fn handle_languages(state: &AppState, _req: &Request) -> Result<Value, HandlerErr> {
    let conn = require_db(state)?;
    let languages =
        load_languages(conn).map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    Ok(json!({ "languages": languages }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "translations.languages" => handle_languages(state, req),
        "translations.list" => translations_list(state, req),
        "translations.get" => translations_get(state, req),
        "translations.create" => translations_create(state, req),
        "translations.update" => translations_update(state, req),
        "translations.delete" => translations_delete(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
