use crate::db;
use crate::import::summary::SummaryPhrases;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum SetupSection {
    Messages,
    Translations,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "messages" => Some(Self::Messages),
            "translations" => Some(Self::Translations),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Messages => "setup.messages",
            Self::Translations => "setup.translations",
        }
    }
}

const MESSAGE_MAX_CHARS: usize = 200;
const MESSAGE_FIELDS: [&str; 8] = [
    "duplicateInTable",
    "toUpdate",
    "toInsert",
    "notImported",
    "importEmpty",
    "importRefused",
    "imported",
    "fileError",
];

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Messages => json!({
            "duplicateInTable": "item(s) already present in the table",
            "toUpdate": "item(s) to update",
            "toInsert": "item(s) to insert",
            "notImported": "Nothing was imported:",
            "importEmpty": "The file does not contain any item to import.",
            "importRefused": "You are not allowed to import items into this reference table.",
            "imported": "The items have been imported.",
            "fileError": "The file must be a .csv file of more than 6 bytes."
        }),
        SetupSection::Translations => json!({
            "languages": ["fr", "en"]
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.chars().count() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

fn parse_languages(v: &Value, key: &str) -> Result<Vec<String>, String> {
    let arr = v
        .as_array()
        .ok_or_else(|| format!("{} must be an array", key))?;
    if arr.is_empty() || arr.len() > 32 {
        return Err(format!("{} must hold 1..=32 entries", key));
    }
    let mut out: Vec<String> = Vec::with_capacity(arr.len());
    for item in arr {
        let lang = parse_string_max(item, key, 8)?.to_ascii_lowercase();
        if lang.chars().count() < 2 {
            return Err(format!("{} entries must be 2..=8 chars", key));
        }
        if !out.contains(&lang) {
            out.push(lang);
        }
    }
    Ok(out)
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Messages => {
                if !MESSAGE_FIELDS.contains(&k.as_str()) {
                    return Err(format!("unknown messages field: {}", k));
                }
                let s = parse_string_max(v, k, MESSAGE_MAX_CHARS)?;
                if s.is_empty() {
                    return Err(format!("{} must not be empty", k));
                }
                obj.insert(k.clone(), Value::String(s));
            }
            SetupSection::Translations => match k.as_str() {
                "languages" => {
                    obj.insert(k.clone(), json!(parse_languages(v, k)?));
                }
                _ => return Err(format!("unknown translations field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Best-effort apply: a malformed saved value falls back to defaults.
            if let Err(e) = merge_section_patch(section, &mut current, saved_obj) {
                tracing::warn!(section = section.key(), error = %e, "ignoring saved setup");
                current = default_section(section);
            }
        }
    }
    Ok(current)
}

/// Phrases and status messages used by the import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportMessages {
    pub summary: SummaryPhrases,
    pub not_imported: String,
    pub import_empty: String,
    pub import_refused: String,
    pub imported: String,
    pub file_error: String,
}

pub fn load_import_messages(conn: &rusqlite::Connection) -> anyhow::Result<ImportMessages> {
    let v = load_section(conn, SetupSection::Messages)?;
    let field = |k: &str| v.get(k).and_then(|s| s.as_str()).unwrap_or_default().to_string();
    Ok(ImportMessages {
        summary: SummaryPhrases {
            duplicate_in_table: field("duplicateInTable"),
            to_update: field("toUpdate"),
            to_insert: field("toInsert"),
        },
        not_imported: field("notImported"),
        import_empty: field("importEmpty"),
        import_refused: field("importRefused"),
        imported: field("imported"),
        file_error: field("fileError"),
    })
}

pub fn load_languages(conn: &rusqlite::Connection) -> anyhow::Result<Vec<String>> {
    let v = load_section(conn, SetupSection::Translations)?;
    Ok(v.get("languages")
        .and_then(|l| l.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|x| x.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default())
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let messages = match load_section(conn, SetupSection::Messages) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let translations = match load_section(conn, SetupSection::Translations) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "messages": messages,
            "translations": translations
        }),
    )
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(section) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut current = match load_section(conn, section) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = merge_section_patch(section, &mut current, patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = db::settings_set_json(conn, section.key(), &current) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    tracing::info!(section = section.key(), "setup updated");
    ok(&req.id, json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
