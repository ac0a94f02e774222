use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "reflist.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)?;
    init_schema(&conn)?;
    tracing::info!(path = %db_path.display(), "workspace database opened");
    Ok(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS reference_tables(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT ''
        )",
        [],
    )?;

    // Code uniqueness per table is checked by the manual create/update paths,
    // not by a constraint: older data may already hold duplicates.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS reference_items(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            reference_id INTEGER NOT NULL,
            code TEXT NOT NULL,
            name TEXT NOT NULL,
            FOREIGN KEY(reference_id) REFERENCES reference_tables(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_reference_items_reference ON reference_items(reference_id)",
        [],
    )?;
    ensure_reference_items_updated_at(conn)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS translation_items(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_id INTEGER NOT NULL,
            lang TEXT NOT NULL,
            translation TEXT NOT NULL,
            FOREIGN KEY(item_id) REFERENCES reference_items(id),
            UNIQUE(item_id, lang)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_translation_items_item ON translation_items(item_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS rbac_grants(
            user_login TEXT NOT NULL,
            resource_type TEXT NOT NULL,
            resource_id TEXT NOT NULL,
            permission TEXT NOT NULL,
            PRIMARY KEY(user_login, resource_type, resource_id, permission)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

fn ensure_reference_items_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "reference_items", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE reference_items ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_roundtrip_overwrites_previous_value() {
        let conn = open_in_memory().expect("open db");
        assert!(settings_get_json(&conn, "setup.messages")
            .expect("get")
            .is_none());
        settings_set_json(&conn, "setup.messages", &json!({ "toInsert": "a" })).expect("set");
        settings_set_json(&conn, "setup.messages", &json!({ "toInsert": "b" })).expect("set");
        let v = settings_get_json(&conn, "setup.messages")
            .expect("get")
            .expect("value");
        assert_eq!(v["toInsert"], "b");
    }

    #[test]
    fn legacy_items_table_gets_updated_at_column() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute(
            "CREATE TABLE reference_items(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                reference_id INTEGER NOT NULL,
                code TEXT NOT NULL,
                name TEXT NOT NULL
            )",
            [],
        )
        .expect("create legacy table");
        init_schema(&conn).expect("migrate");
        assert!(table_has_column(&conn, "reference_items", "updated_at").expect("pragma"));
    }
}
