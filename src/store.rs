use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::StoreError;
use crate::model::{Candidate, Reference, ReferenceItem, TranslationItem};

pub type StoreResult<T> = Result<T, StoreError>;

/// The slice of persistence the import engine needs.
pub trait ReferenceItemStore {
    fn list_items(&self, reference_id: i64) -> StoreResult<Vec<ReferenceItem>>;

    /// Persists a new row and returns its generated id.
    fn insert_item(&mut self, candidate: &Candidate) -> StoreResult<i64>;

    /// Overwrites code and name of the row identified by `item.id`.
    fn update_item(&mut self, item: &ReferenceItem) -> StoreResult<()>;
}

pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn reference_from_row(r: &Row<'_>) -> rusqlite::Result<Reference> {
    Ok(Reference {
        id: r.get(0)?,
        name: r.get(1)?,
        description: r.get(2)?,
    })
}

fn item_from_row(r: &Row<'_>) -> rusqlite::Result<ReferenceItem> {
    Ok(ReferenceItem {
        id: r.get(0)?,
        reference_id: r.get(1)?,
        code: r.get(2)?,
        name: r.get(3)?,
    })
}

fn translation_from_row(r: &Row<'_>) -> rusqlite::Result<TranslationItem> {
    Ok(TranslationItem {
        id: r.get(0)?,
        item_id: r.get(1)?,
        item_name: r.get(2)?,
        lang: r.get(3)?,
        translation: r.get(4)?,
    })
}

const TRANSLATION_SELECT: &str = "SELECT t.id, t.item_id, i.name, t.lang, t.translation
     FROM translation_items t
     JOIN reference_items i ON i.id = t.item_id";

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    // ---- reference tables ----

    pub fn create_reference(&self, name: &str, description: &str) -> StoreResult<Reference> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Invalid("name must not be empty".into()));
        }
        if self.find_reference_id_by_name(name)?.is_some() {
            return Err(StoreError::Conflict(format!(
                "a reference named {:?} already exists",
                name
            )));
        }
        self.conn.execute(
            "INSERT INTO reference_tables(name, description) VALUES(?, ?)",
            (name, description),
        )?;
        Ok(Reference {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            description: description.to_string(),
        })
    }

    pub fn get_reference(&self, id: i64) -> StoreResult<Reference> {
        self.conn
            .query_row(
                "SELECT id, name, description FROM reference_tables WHERE id = ?",
                [id],
                reference_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("reference", id))
    }

    pub fn find_reference_id_by_name(&self, name: &str) -> StoreResult<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM reference_tables WHERE name = ?",
                [name],
                |r| r.get(0),
            )
            .optional()?)
    }

    pub fn list_references(&self) -> StoreResult<Vec<Reference>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description FROM reference_tables ORDER BY name")?;
        let rows = stmt
            .query_map([], reference_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn update_reference(
        &self,
        id: i64,
        name: Option<&str>,
        description: Option<&str>,
    ) -> StoreResult<Reference> {
        let mut current = self.get_reference(id)?;
        if let Some(name) = name {
            let name = name.trim();
            if name.is_empty() {
                return Err(StoreError::Invalid("name must not be empty".into()));
            }
            if let Some(other) = self.find_reference_id_by_name(name)? {
                if other != id {
                    return Err(StoreError::Conflict(format!(
                        "a reference named {:?} already exists",
                        name
                    )));
                }
            }
            current.name = name.to_string();
        }
        if let Some(description) = description {
            current.description = description.to_string();
        }
        self.conn.execute(
            "UPDATE reference_tables SET name = ?, description = ? WHERE id = ?",
            (&current.name, &current.description, id),
        )?;
        Ok(current)
    }

    /// Removes a reference table together with its items, their translations
    /// and the grants naming it.
    /// Returns the number of items removed.
    pub fn delete_reference(&self, id: i64) -> StoreResult<usize> {
        self.get_reference(id)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM translation_items
             WHERE item_id IN (SELECT id FROM reference_items WHERE reference_id = ?)",
            [id],
        )?;
        let removed = tx.execute("DELETE FROM reference_items WHERE reference_id = ?", [id])?;
        tx.execute("DELETE FROM reference_tables WHERE id = ?", [id])?;
        tx.execute(
            "DELETE FROM rbac_grants WHERE resource_type = ? AND resource_id = ?",
            (crate::rbac::RESOURCE_TYPE_REFERENCE, id.to_string()),
        )?;
        tx.commit()?;
        Ok(removed)
    }

    // ---- reference items ----

    pub fn get_item(&self, id: i64) -> StoreResult<ReferenceItem> {
        self.conn
            .query_row(
                "SELECT id, reference_id, code, name FROM reference_items WHERE id = ?",
                [id],
                item_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("item", id))
    }

    fn code_taken(&self, reference_id: i64, code: &str, except_id: Option<i64>) -> StoreResult<bool> {
        let hit: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM reference_items
                 WHERE reference_id = ? AND code = ? AND id != ?
                 LIMIT 1",
                (reference_id, code, except_id.unwrap_or(-1)),
                |r| r.get(0),
            )
            .optional()?;
        Ok(hit.is_some())
    }

    /// Manual creation path: refuses a code already used in the same table.
    pub fn create_item(&self, reference_id: i64, code: &str, name: &str) -> StoreResult<ReferenceItem> {
        self.get_reference(reference_id)?;
        if code.is_empty() {
            return Err(StoreError::Invalid("code must not be empty".into()));
        }
        if self.code_taken(reference_id, code, None)? {
            return Err(StoreError::Conflict(format!(
                "code {:?} already exists in reference {}",
                code, reference_id
            )));
        }
        self.conn.execute(
            "INSERT INTO reference_items(reference_id, code, name, updated_at) VALUES(?, ?, ?, ?)",
            (reference_id, code, name, now_timestamp()),
        )?;
        Ok(ReferenceItem {
            id: self.conn.last_insert_rowid(),
            reference_id,
            code: code.to_string(),
            name: name.to_string(),
        })
    }

    pub fn modify_item(
        &self,
        id: i64,
        code: Option<&str>,
        name: Option<&str>,
    ) -> StoreResult<ReferenceItem> {
        let mut item = self.get_item(id)?;
        if let Some(code) = code {
            if code.is_empty() {
                return Err(StoreError::Invalid("code must not be empty".into()));
            }
            if self.code_taken(item.reference_id, code, Some(id))? {
                return Err(StoreError::Conflict(format!(
                    "code {:?} already exists in reference {}",
                    code, item.reference_id
                )));
            }
            item.code = code.to_string();
        }
        if let Some(name) = name {
            item.name = name.to_string();
        }
        self.write_item(&item)?;
        Ok(item)
    }

    fn write_item(&self, item: &ReferenceItem) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE reference_items SET code = ?, name = ?, updated_at = ? WHERE id = ?",
            (&item.code, &item.name, now_timestamp(), item.id),
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("item", item.id));
        }
        Ok(())
    }

    /// Removes an item and its translations; returns the removed row.
    pub fn delete_item(&self, id: i64) -> StoreResult<ReferenceItem> {
        let item = self.get_item(id)?;
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM translation_items WHERE item_id = ?", [id])?;
        tx.execute("DELETE FROM reference_items WHERE id = ?", [id])?;
        tx.commit()?;
        Ok(item)
    }

    /// Items of a reference with `name` replaced by the `lang` translation when
    /// one exists and is non-empty.
    pub fn list_items_translated(
        &self,
        reference_id: i64,
        lang: &str,
    ) -> StoreResult<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT i.code, i.name, t.translation
             FROM reference_items i
             LEFT JOIN translation_items t ON t.item_id = i.id AND t.lang = ?
             WHERE i.reference_id = ?
             ORDER BY i.id",
        )?;
        let rows = stmt
            .query_map((lang, reference_id), |r| {
                let code: String = r.get(0)?;
                let name: String = r.get(1)?;
                let translation: Option<String> = r.get(2)?;
                let shown = match translation {
                    Some(t) if !t.is_empty() => t,
                    _ => name,
                };
                Ok((code, shown))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ---- translations ----

    pub fn list_translations(&self, reference_id: i64) -> StoreResult<Vec<TranslationItem>> {
        let sql = format!(
            "{} WHERE i.reference_id = ? ORDER BY t.lang, i.name",
            TRANSLATION_SELECT
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map([reference_id], translation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn get_translation(&self, id: i64) -> StoreResult<TranslationItem> {
        let sql = format!("{} WHERE t.id = ?", TRANSLATION_SELECT);
        self.conn
            .query_row(&sql, [id], translation_from_row)
            .optional()?
            .ok_or_else(|| StoreError::not_found("translation", id))
    }

    fn lang_taken(&self, item_id: i64, lang: &str, except_id: Option<i64>) -> StoreResult<bool> {
        let hit: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM translation_items WHERE item_id = ? AND lang = ? AND id != ?",
                (item_id, lang, except_id.unwrap_or(-1)),
                |r| r.get(0),
            )
            .optional()?;
        Ok(hit.is_some())
    }

    pub fn create_translation(
        &self,
        item_id: i64,
        lang: &str,
        translation: &str,
    ) -> StoreResult<TranslationItem> {
        self.get_item(item_id)?;
        if self.lang_taken(item_id, lang, None)? {
            return Err(StoreError::Conflict(format!(
                "item {} already has a {:?} translation",
                item_id, lang
            )));
        }
        self.conn.execute(
            "INSERT INTO translation_items(item_id, lang, translation) VALUES(?, ?, ?)",
            (item_id, lang, translation),
        )?;
        self.get_translation(self.conn.last_insert_rowid())
    }

    pub fn update_translation(
        &self,
        id: i64,
        item_id: Option<i64>,
        lang: Option<&str>,
        translation: Option<&str>,
    ) -> StoreResult<TranslationItem> {
        let current = self.get_translation(id)?;
        let item_id = item_id.unwrap_or(current.item_id);
        let lang = lang.unwrap_or(current.lang.as_str()).to_string();
        let translation = translation
            .unwrap_or(current.translation.as_str())
            .to_string();
        self.get_item(item_id)?;
        if self.lang_taken(item_id, &lang, Some(id))? {
            return Err(StoreError::Conflict(format!(
                "item {} already has a {:?} translation",
                item_id, lang
            )));
        }
        self.conn.execute(
            "UPDATE translation_items SET item_id = ?, lang = ?, translation = ? WHERE id = ?",
            (item_id, &lang, &translation, id),
        )?;
        self.get_translation(id)
    }

    pub fn delete_translation(&self, id: i64) -> StoreResult<()> {
        let removed = self
            .conn
            .execute("DELETE FROM translation_items WHERE id = ?", [id])?;
        if removed == 0 {
            return Err(StoreError::not_found("translation", id));
        }
        Ok(())
    }
}

impl ReferenceItemStore for SqliteStore<'_> {
    fn list_items(&self, reference_id: i64) -> StoreResult<Vec<ReferenceItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, reference_id, code, name FROM reference_items
             WHERE reference_id = ?
             ORDER BY id",
        )?;
        let rows = stmt
            .query_map([reference_id], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn insert_item(&mut self, candidate: &Candidate) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO reference_items(reference_id, code, name, updated_at) VALUES(?, ?, ?, ?)",
            (
                candidate.reference_id,
                &candidate.code,
                &candidate.name,
                now_timestamp(),
            ),
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_item(&mut self, item: &ReferenceItem) -> StoreResult<()> {
        self.write_item(item)
    }
}
