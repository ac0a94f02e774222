//! Code/name option lists served to forms.

use serde::Serialize;

use crate::error::StoreError;
use crate::store::{ReferenceItemStore, SqliteStore, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListOption {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceOption {
    pub id: i64,
    pub name: String,
}

pub enum ReferenceKey<'a> {
    Id(i64),
    Name(&'a str),
}

pub fn reference_options(store: &SqliteStore<'_>) -> StoreResult<Vec<ReferenceOption>> {
    Ok(store
        .list_references()?
        .into_iter()
        .map(|r| ReferenceOption {
            id: r.id,
            name: r.name,
        })
        .collect())
}

/// Items of one reference in insertion order. With `lang`, names are taken
/// from that language's translation when it exists and is not empty.
pub fn reference_list(
    store: &SqliteStore<'_>,
    key: ReferenceKey<'_>,
    lang: Option<&str>,
) -> StoreResult<Vec<ListOption>> {
    let reference_id = match key {
        ReferenceKey::Id(id) => store.get_reference(id)?.id,
        ReferenceKey::Name(name) => store
            .find_reference_id_by_name(name)?
            .ok_or_else(|| StoreError::not_found("reference", name))?,
    };
    let options = match lang {
        Some(lang) => store
            .list_items_translated(reference_id, lang)?
            .into_iter()
            .map(|(code, name)| ListOption { code, name })
            .collect(),
        None => store
            .list_items(reference_id)?
            .into_iter()
            .map(|i| ListOption {
                code: i.code,
                name: i.name,
            })
            .collect(),
    };
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn list_by_name_with_and_without_language() {
        let conn = db::open_in_memory().expect("db");
        let store = SqliteStore::new(&conn);
        let r = store.create_reference("civilities", "").expect("reference");
        let mr = store.create_item(r.id, "mr", "Monsieur").expect("item");
        store.create_item(r.id, "mme", "Madame").expect("item");
        store.create_translation(mr.id, "en", "Mister").expect("translation");

        let plain = reference_list(&store, ReferenceKey::Name("civilities"), None).expect("list");
        assert_eq!(
            plain.iter().map(|o| o.name.as_str()).collect::<Vec<_>>(),
            vec!["Monsieur", "Madame"]
        );
        let en = reference_list(&store, ReferenceKey::Id(r.id), Some("en")).expect("list");
        assert_eq!(
            en.iter().map(|o| o.name.as_str()).collect::<Vec<_>>(),
            vec!["Mister", "Madame"]
        );
        assert_eq!(en[0].code, "mr");
    }

    #[test]
    fn unknown_reference_is_not_found() {
        let conn = db::open_in_memory().expect("db");
        let store = SqliteStore::new(&conn);
        let err = reference_list(&store, ReferenceKey::Name("nope"), None).expect_err("missing");
        assert_eq!(err.code("db_query_failed"), "not_found");
        let err = reference_list(&store, ReferenceKey::Id(9), None).expect_err("missing");
        assert_eq!(err.code("db_query_failed"), "not_found");
    }

    #[test]
    fn reference_options_are_sorted_by_name() {
        let conn = db::open_in_memory().expect("db");
        let store = SqliteStore::new(&conn);
        store.create_reference("zones", "").expect("reference");
        store.create_reference("civilities", "").expect("reference");
        let names = reference_options(&store)
            .expect("options")
            .into_iter()
            .map(|o| o.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["civilities", "zones"]);
    }
}
