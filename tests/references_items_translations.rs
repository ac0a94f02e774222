mod test_support;

use serde_json::json;
use test_support::{error_code, request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn reference_and_item_lifecycle_with_cascade() {
    let workspace = temp_dir("reflist-crud");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    // Nothing works before a workspace is selected.
    let e = request_err(
        &mut stdin,
        &mut reader,
        "0",
        "references.create",
        json!({ "name": "civilities" }),
    );
    assert_eq!(error_code(&e), "no_workspace");

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "references.create",
        json!({ "name": " civilities ", "description": "titles" }),
    );
    assert_eq!(
        created.pointer("/reference/name").and_then(|v| v.as_str()),
        Some("civilities")
    );
    let reference_id = created
        .pointer("/reference/id")
        .and_then(|v| v.as_i64())
        .expect("reference id");

    let e = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "references.create",
        json!({ "name": "civilities" }),
    );
    assert_eq!(error_code(&e), "conflict");

    let mr = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "items.create",
        json!({ "referenceId": reference_id, "code": "mr", "name": "Monsieur" }),
    );
    assert_eq!(
        mr.pointer("/events/0/action").and_then(|v| v.as_str()),
        Some("create")
    );
    let mr_id = mr.pointer("/item/id").and_then(|v| v.as_i64()).expect("item id");
    request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "items.create",
        json!({ "referenceId": reference_id, "code": "mme", "name": "Madame" }),
    );
    let e = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "items.create",
        json!({ "referenceId": reference_id, "code": "mr", "name": "Mister" }),
    );
    assert_eq!(error_code(&e), "conflict");

    let updated = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "items.update",
        json!({ "itemId": mr_id, "name": "M." }),
    );
    assert_eq!(updated.pointer("/item/name").and_then(|v| v.as_str()), Some("M."));
    assert_eq!(updated.pointer("/item/code").and_then(|v| v.as_str()), Some("mr"));

    let translation = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "translations.create",
        json!({ "itemId": mr_id, "lang": "EN", "translation": "Mr" }),
    );
    assert_eq!(
        translation.pointer("/translation/lang").and_then(|v| v.as_str()),
        Some("en")
    );
    let e = request_err(
        &mut stdin,
        &mut reader,
        "9",
        "translations.create",
        json!({ "itemId": mr_id, "lang": "de", "translation": "Herr" }),
    );
    assert_eq!(error_code(&e), "bad_params");
    let e = request_err(
        &mut stdin,
        &mut reader,
        "10",
        "translations.create",
        json!({ "itemId": mr_id, "lang": "en", "translation": "Mister" }),
    );
    assert_eq!(error_code(&e), "conflict");

    let listed = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "translations.list",
        json!({ "referenceId": reference_id }),
    );
    assert_eq!(
        listed.pointer("/translations/0/itemName").and_then(|v| v.as_str()),
        Some("M.")
    );

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "references.delete",
        json!({ "referenceId": reference_id }),
    );
    assert_eq!(deleted.get("removedItems").and_then(|v| v.as_u64()), Some(2));

    let e = request_err(
        &mut stdin,
        &mut reader,
        "13",
        "items.get",
        json!({ "itemId": mr_id }),
    );
    assert_eq!(error_code(&e), "not_found");

    let conn = rusqlite::Connection::open(workspace.join("reflist.sqlite3")).expect("open db");
    let translations: i64 = conn
        .query_row("SELECT COUNT(*) FROM translation_items", [], |r| r.get(0))
        .expect("count");
    assert_eq!(translations, 0);
}

#[test]
fn item_delete_reports_remove_event() {
    let workspace = temp_dir("reflist-item-delete");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "references.create",
        json!({ "name": "zones" }),
    );
    let reference_id = created
        .pointer("/reference/id")
        .and_then(|v| v.as_i64())
        .expect("reference id");
    let item = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "items.create",
        json!({ "referenceId": reference_id, "code": "n", "name": "Nord" }),
    );
    let item_id = item.pointer("/item/id").and_then(|v| v.as_i64()).expect("item id");

    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "items.delete",
        json!({ "itemId": item_id }),
    );
    assert_eq!(
        removed.pointer("/events/0/action").and_then(|v| v.as_str()),
        Some("remove")
    );
    assert_eq!(
        removed.pointer("/events/0/item/code").and_then(|v| v.as_str()),
        Some("n")
    );
    let e = request_err(
        &mut stdin,
        &mut reader,
        "5",
        "items.delete",
        json!({ "itemId": item_id }),
    );
    assert_eq!(error_code(&e), "not_found");
}
