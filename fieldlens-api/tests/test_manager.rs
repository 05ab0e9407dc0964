//! AvManager behavior against an in-memory transport.

mod common;

use common::{MockTransport, field_list};
use fieldlens::error::LensError;
use fieldlens::fields::FieldType;
use fieldlens::manager::{AvManager, CellUpdate};
use fieldlens::values::{CellValue, KeyedCellValue};
use serde_json::json;
use test_log::test;

const AV: &str = "20240101120000-avtest1";

#[test(tokio::test)]
async fn test_field_cache_serves_repeat_lookups() {
    let transport = MockTransport::new();
    transport.respond(
        "getAttributeViewKeysByAvID",
        field_list(&[("Notes", "text"), ("Done", "checkbox")]),
    );
    let manager = AvManager::new(transport.clone());

    let first = manager.fields(AV).await.unwrap();
    let second = manager.fields(AV).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert_eq!(transport.call_count("getAttributeViewKeysByAvID"), 1);
}

#[test(tokio::test)]
async fn test_force_refresh_always_fetches() {
    let transport = MockTransport::new();
    transport.respond("getAttributeViewKeysByAvID", field_list(&[("Notes", "text")]));
    let manager = AvManager::new(transport.clone());

    manager.fields(AV).await.unwrap();
    manager.fields_with(AV, true).await.unwrap();
    assert_eq!(transport.call_count("getAttributeViewKeysByAvID"), 2);
}

#[test(tokio::test)]
async fn test_field_mutation_invalidates_cache() {
    let transport = MockTransport::new();
    transport.respond("getAttributeViewKeysByAvID", field_list(&[("Notes", "text")]));
    transport.respond("addAttributeViewKey", json!(null));
    transport.respond("removeAttributeViewKey", json!(null));
    let manager = AvManager::new(transport.clone());

    manager.fields(AV).await.unwrap();
    assert_eq!(transport.call_count("getAttributeViewKeysByAvID"), 1);

    manager
        .add_field(AV)
        .name("Status")
        .field_type(FieldType::Select)
        .execute()
        .await
        .unwrap();
    manager.fields(AV).await.unwrap();
    assert_eq!(transport.call_count("getAttributeViewKeysByAvID"), 2);

    manager.remove_field(AV, "key-0", false).await.unwrap();
    manager.fields(AV).await.unwrap();
    assert_eq!(transport.call_count("getAttributeViewKeysByAvID"), 3);
}

#[test(tokio::test)]
async fn test_empty_id_mapping_short_circuits() {
    let transport = MockTransport::new();
    let manager = AvManager::new(transport.clone());

    let bound = manager.bound_block_ids(AV, &[]).await.unwrap();
    assert!(bound.is_empty());
    let items = manager.item_ids_for_blocks(AV, &[]).await.unwrap();
    assert!(items.is_empty());
    assert_eq!(transport.total_calls(), 0);
}

#[test(tokio::test)]
async fn test_missing_av_id_is_rejected_before_network() {
    let transport = MockTransport::new();
    let manager = AvManager::new(transport.clone());

    let err = manager.attribute_view("").await.unwrap_err();
    assert!(matches!(err, LensError::InvalidArgument { .. }));
    let err = manager.render("").execute().await.unwrap_err();
    assert!(matches!(err, LensError::InvalidArgument { .. }));
    assert_eq!(transport.total_calls(), 0);
}

#[test(tokio::test)]
async fn test_set_cell_resolves_field_name_and_row() {
    let transport = MockTransport::new();
    transport.respond("getAttributeViewKeysByAvID", field_list(&[("Done", "checkbox")]));
    transport.respond(
        "getAttributeViewItemIDsByBoundIDs",
        json!({"block-1": "item-1"}),
    );
    transport.respond("setAttributeViewBlockAttr", json!({"value": {}}));
    let manager = AvManager::new(transport.clone());

    manager
        .set_cell(AV, "Done", None, Some("block-1"), CellValue::checkbox(true))
        .await
        .unwrap();

    let payload = transport.last_payload("setAttributeViewBlockAttr").unwrap();
    assert_eq!(payload["keyID"], "key-0");
    assert_eq!(payload["itemID"], "item-1");
    assert_eq!(payload["value"], json!({"checkbox": {"checked": true}}));
}

#[test(tokio::test)]
async fn test_set_cell_unknown_field_aborts() {
    let transport = MockTransport::new();
    transport.respond("getAttributeViewKeysByAvID", field_list(&[("Done", "checkbox")]));
    let manager = AvManager::new(transport.clone());

    let err = manager
        .set_cell(AV, "Missing", Some("item-1"), None, CellValue::checkbox(true))
        .await
        .unwrap_err();
    assert!(matches!(err, LensError::NotFound { .. }));
    assert_eq!(transport.call_count("setAttributeViewBlockAttr"), 0);
}

#[test(tokio::test)]
async fn test_ambiguous_field_name_is_an_error() {
    let transport = MockTransport::new();
    transport.respond(
        "getAttributeViewKeysByAvID",
        field_list(&[("Status", "select"), ("Status", "text")]),
    );
    let manager = AvManager::new(transport.clone());

    let err = manager.find_field(AV, "Status").await.unwrap_err();
    match err {
        LensError::InvalidArgument { message } => {
            assert!(message.contains("ambiguous"), "got: {message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test(tokio::test)]
async fn test_remove_by_name_skips_when_unresolved() {
    let transport = MockTransport::new();
    transport.respond("getAttributeViewKeysByAvID", field_list(&[("Notes", "text")]));
    let manager = AvManager::new(transport.clone());

    // not found -> user warning + skip, not a hard failure
    manager.remove_field_by_name(AV, "Gone", false).await.unwrap();
    assert_eq!(transport.call_count("removeAttributeViewKey"), 0);
}

#[test(tokio::test)]
async fn test_batch_set_cells_single_round_trip() {
    let transport = MockTransport::new();
    transport.respond(
        "getAttributeViewKeysByAvID",
        field_list(&[("Notes", "text"), ("Done", "checkbox")]),
    );
    transport.respond(
        "getAttributeViewItemIDsByBoundIDs",
        json!({"block-1": "item-1"}),
    );
    transport.respond("batchSetAttributeViewBlockAttrs", json!(null));
    let manager = AvManager::new(transport.clone());

    manager
        .batch_set_cells(
            AV,
            vec![
                CellUpdate::for_item("Notes", "item-2", CellValue::text("hi")),
                CellUpdate::for_block("Done", "block-1", CellValue::checkbox(true)),
            ],
        )
        .await
        .unwrap();

    assert_eq!(transport.call_count("batchSetAttributeViewBlockAttrs"), 1);
    assert_eq!(transport.call_count("getAttributeViewItemIDsByBoundIDs"), 1);
    let payload = transport
        .last_payload("batchSetAttributeViewBlockAttrs")
        .unwrap();
    let values = payload["values"].as_array().unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values[1]["itemID"], "item-1");
}

#[test(tokio::test)]
async fn test_batch_empty_updates_no_network() {
    let transport = MockTransport::new();
    let manager = AvManager::new(transport.clone());
    manager.batch_set_cells(AV, Vec::new()).await.unwrap();
    assert_eq!(transport.total_calls(), 0);
}

#[test(tokio::test)]
async fn test_legacy_batch_aggregates_failures() {
    let transport = MockTransport::new();
    transport.respond(
        "getAttributeViewKeysByAvID",
        field_list(&[("Notes", "text")]),
    );
    transport.respond("setAttributeViewBlockAttr", json!({"value": {}}));
    let manager = AvManager::new(transport.clone());

    let outcomes = manager
        .batch_set_cells_one_by_one(
            AV,
            vec![
                CellUpdate::for_item("Notes", "item-1", CellValue::text("ok")),
                // unknown field: this item fails, the batch does not
                CellUpdate::for_item("Missing", "item-1", CellValue::text("no")),
                CellUpdate::for_item("Notes", "item-2", CellValue::text("ok")),
            ],
        )
        .await
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].success);
    assert!(!outcomes[1].success);
    assert!(outcomes[1].error.is_some());
    assert!(outcomes[2].success);
    assert_eq!(transport.call_count("setAttributeViewBlockAttr"), 2);
}

#[test(tokio::test)]
async fn test_append_detached_rows_resolves_key_names() {
    let transport = MockTransport::new();
    transport.respond(
        "getAttributeViewKeysByAvID",
        field_list(&[("Notes", "text")]),
    );
    transport.respond("appendAttributeViewDetachedBlocksWithValues", json!(null));
    let manager = AvManager::new(transport.clone());

    manager
        .append_detached_rows(
            AV,
            vec![vec![KeyedCellValue {
                key_id: None,
                key_name: Some("Notes".into()),
                value: CellValue::text("row one"),
            }]],
        )
        .await
        .unwrap();

    let payload = transport
        .last_payload("appendAttributeViewDetachedBlocksWithValues")
        .unwrap();
    assert_eq!(payload["blocksValues"][0][0]["keyID"], "key-0");
    assert_eq!(
        payload["blocksValues"][0][0]["text"],
        json!({"content": "row one"})
    );
}

#[test(tokio::test)]
async fn test_render_builder_payload() {
    let transport = MockTransport::new();
    transport.respond(
        "renderAttributeView",
        json!({"id": AV, "name": "Tasks", "viewType": "table", "viewID": "v1",
               "views": [], "view": {}, "isMirror": false}),
    );
    let manager = AvManager::new(transport.clone());

    let rendered = manager
        .render(AV)
        .view("v1")
        .page(2)
        .page_size(50)
        .query("hello")
        .execute()
        .await
        .unwrap();
    assert_eq!(rendered.view_id, "v1");

    let payload = transport.last_payload("renderAttributeView").unwrap();
    assert_eq!(payload["page"], 2);
    assert_eq!(payload["pageSize"], 50);
    assert_eq!(payload["viewID"], "v1");
    assert_eq!(payload["query"], "hello");
}

#[test(tokio::test)]
async fn test_primary_rename_routes_to_dedicated_operation() {
    let transport = MockTransport::new();
    transport.respond(
        "getAttributeViewKeysByAvID",
        json!([
            {"id": "key-main", "name": "Title", "type": "block", "icon": ""},
            {"id": "key-1", "name": "Notes", "type": "text", "icon": ""}
        ]),
    );
    transport.respond("updateAttrViewName", json!(null));
    let manager = AvManager::new(transport.clone());

    // the generic add-field path redirects block-typed "creation" to a rename
    manager
        .add_field(AV)
        .name("Renamed Title")
        .field_type(FieldType::Block)
        .execute()
        .await
        .unwrap();

    assert_eq!(transport.call_count("addAttributeViewKey"), 0);
    let payload = transport.last_payload("updateAttrViewName").unwrap();
    assert_eq!(payload["keyID"], "key-main");
    assert_eq!(payload["name"], "Renamed Title");
}

#[test(tokio::test)]
async fn test_batch_replace_requires_mappings() {
    let transport = MockTransport::new();
    transport.respond("batchReplaceAttributeViewBlocks", json!(null));
    let manager = AvManager::new(transport.clone());

    let err = manager.batch_replace_rows(AV, &[], false).await.unwrap_err();
    assert!(matches!(err, LensError::InvalidArgument { .. }));

    manager
        .batch_replace_rows(AV, &[("old-1".into(), "new-1".into())], false)
        .await
        .unwrap();
    let payload = transport
        .last_payload("batchReplaceAttributeViewBlocks")
        .unwrap();
    assert_eq!(payload["oldNew"], json!([{"old-1": "new-1"}]));
    assert_eq!(payload["isDetached"], false);
}
