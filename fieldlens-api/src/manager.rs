//! # Attribute view manager
//!
//! The façade over the backend's attribute-view operations: view metadata and
//! rendering, field (key) mutation with cached lookup, row and cell mutation,
//! id mapping between bound blocks and internal row items, and the read-only
//! helpers (filter/sort, mirrors, history, images).
//!
//! Every operation validates its required identifiers synchronously and
//! propagates backend errors unmodified — nothing here retries. Field-name
//! resolution failures are surfaced to the user through the configured
//! [`Notifier`] and logged; whether the calling operation aborts or proceeds
//! with an empty fallback depends on whether the name was mandatory.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use snafu::ensure;
use tracing::{debug, error, warn};

use crate::{
    Result,
    cache::KeyCache,
    config::{DEFAULT_FIELD_NAME, DEFAULT_PAGE_SIZE},
    error::{InvalidArgumentSnafu, LensError},
    fields::{AttributeView, Field, FieldType, LayoutType, ViewGroup},
    host::{Notifier, NullNotifier},
    http::{RemoteClient, Transport},
    values::{
        AvKeyValues, CellValue, FilterSort, KeyedCellValue, MirrorRefs, PrimaryValues, RenderedView,
        RowSource,
    },
};

/// Result of duplicating an attribute view block.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct DuplicatedBlock {
    #[serde(rename = "avID")]
    pub av_id: String,
    #[serde(rename = "blockID")]
    pub block_id: String,
}

/// One cell mutation addressed by field name and row (item id, or a bound
/// block id to be mapped).
#[derive(Debug, Clone)]
pub struct CellUpdate {
    pub field_name: String,
    pub item_id: Option<String>,
    pub block_id: Option<String>,
    pub value: CellValue,
}

impl CellUpdate {
    pub fn for_item(
        field_name: impl Into<String>,
        item_id: impl Into<String>,
        value: CellValue,
    ) -> Self {
        CellUpdate {
            field_name: field_name.into(),
            item_id: Some(item_id.into()),
            block_id: None,
            value,
        }
    }

    pub fn for_block(
        field_name: impl Into<String>,
        block_id: impl Into<String>,
        value: CellValue,
    ) -> Self {
        CellUpdate {
            field_name: field_name.into(),
            item_id: None,
            block_id: Some(block_id.into()),
            value,
        }
    }
}

/// Outcome of one item in the legacy one-by-one batch path.
#[derive(Debug)]
pub struct CellOutcome {
    pub success: bool,
    pub error: Option<String>,
}

/// Generates a host-convention identifier:
/// a `YYYYMMDDHHMMSS` timestamp and a 7-letter random suffix.
pub fn generate_id() -> String {
    use rand::RngExt;
    let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let mut rng = rand::rng();
    let suffix: String = (0..7)
        .map(|_| char::from(b'a' + rng.random_range(0..26u8)))
        .collect();
    format!("{timestamp}-{suffix}")
}

/// The attribute-view operations façade.
pub struct AvManager {
    transport: Arc<dyn Transport>,
    cache: KeyCache,
    notifier: Arc<dyn Notifier>,
}

impl AvManager {
    /// Creates a manager over an HTTP backend at `base_url`.
    pub fn connect(base_url: impl Into<String>) -> Self {
        Self::new(Arc::new(RemoteClient::new(base_url)))
    }

    /// Creates a manager over any transport (tests use an in-memory one).
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        AvManager {
            transport,
            cache: KeyCache::default(),
            notifier: Arc::new(NullNotifier),
        }
    }

    /// Routes user-facing resolution warnings to the host.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Drops the cached field list for one attribute view, or all of them.
    pub fn clear_key_cache(&self, av_id: Option<&str>) {
        self.cache.invalidate(av_id);
    }

    async fn request<T: DeserializeOwned>(&self, endpoint: &str, payload: Value) -> Result<T> {
        let data = self.transport.call(endpoint, payload).await?;
        decode(data)
    }

    // ========================================================================
    // View-level operations
    // ========================================================================

    /// Fetches attribute view metadata.
    pub async fn attribute_view(&self, av_id: &str) -> Result<AttributeView> {
        require(av_id, "avID")?;
        #[derive(serde::Deserialize)]
        struct Response {
            av: AttributeView,
        }
        let response: Response = self
            .request("getAttributeView", json!({"id": av_id}))
            .await?;
        Ok(response.av)
    }

    /// Builder for rendering a view (paged, queryable).
    pub fn render<'a>(&'a self, av_id: &'a str) -> RenderRequest<'a> {
        RenderRequest {
            manager: self,
            av_id,
            view_id: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            query: None,
        }
    }

    /// Searches attribute views by keyword.
    pub async fn search_views(
        &self,
        keyword: &str,
        excludes: &[String],
    ) -> Result<Vec<AttributeView>> {
        require(keyword, "keyword")?;
        #[derive(serde::Deserialize)]
        struct Response {
            #[serde(default)]
            results: Vec<AttributeView>,
        }
        let response: Response = self
            .request(
                "searchAttributeView",
                json!({"keyword": keyword, "excludes": excludes}),
            )
            .await?;
        Ok(response.results)
    }

    /// Duplicates an attribute view block.
    pub async fn duplicate(&self, av_id: &str) -> Result<DuplicatedBlock> {
        require(av_id, "avID")?;
        self.request("duplicateAttributeViewBlock", json!({"avID": av_id}))
            .await
    }

    /// Changes the layout of a database block's current view.
    pub async fn change_layout(
        &self,
        av_id: &str,
        block_id: &str,
        layout: LayoutType,
    ) -> Result<RenderedView> {
        require(av_id, "avID")?;
        require(block_id, "blockID")?;
        self.request(
            "changeAttrViewLayout",
            json!({"avID": av_id, "blockID": block_id, "layoutType": layout}),
        )
        .await
    }

    /// Sets the grouping configuration of a view.
    pub async fn set_view_group(
        &self,
        av_id: &str,
        block_id: &str,
        group: &ViewGroup,
    ) -> Result<()> {
        require(av_id, "avID")?;
        require(block_id, "blockID")?;
        let _: Value = self
            .request(
                "setAttrViewGroup",
                json!({"avID": av_id, "blockID": block_id, "group": group}),
            )
            .await?;
        Ok(())
    }

    /// Switches which view a database block displays.
    pub async fn set_block_view(&self, block_id: &str, av_id: &str, view_id: &str) -> Result<()> {
        require(block_id, "blockID")?;
        require(av_id, "avID")?;
        require(view_id, "viewID")?;
        let _: Value = self
            .request(
                "setDatabaseBlockView",
                json!({"id": block_id, "avID": av_id, "viewID": view_id}),
            )
            .await?;
        Ok(())
    }

    // ========================================================================
    // Field-level operations
    // ========================================================================

    /// Fetches attribute-view data for a document or block: the raw payload
    /// the extraction pipeline consumes.
    pub async fn fields_for_block(&self, block_id: &str) -> Result<Vec<AvKeyValues>> {
        require(block_id, "blockID")?;
        self.request("getAttributeViewKeys", json!({"id": block_id}))
            .await
    }

    /// Lists the fields of an attribute view, served from cache when fresh.
    pub async fn fields(&self, av_id: &str) -> Result<Vec<Field>> {
        self.fields_with(av_id, false).await
    }

    /// Lists fields, optionally bypassing the cache. The replacement entry is
    /// stamped with the fetch time.
    pub async fn fields_with(&self, av_id: &str, force_refresh: bool) -> Result<Vec<Field>> {
        require(av_id, "avID")?;
        if !force_refresh
            && let Some(fields) = self.cache.get(av_id)
        {
            return Ok(fields);
        }
        let fields: Vec<Field> = self
            .request("getAttributeViewKeysByAvID", json!({"avID": av_id}))
            .await?;
        self.cache.insert(av_id, fields.clone());
        Ok(fields)
    }

    /// Resolves a field by name through the cached field list.
    ///
    /// Zero matches is a recoverable `NotFound` (notified and logged);
    /// more than one match is an explicit ambiguity error rather than
    /// first-match-wins.
    pub async fn find_field(&self, av_id: &str, name: &str) -> Result<Field> {
        let fields = self.fields(av_id).await?;
        let mut matches = fields.into_iter().filter(|field| field.name == name);
        match (matches.next(), matches.next()) {
            (Some(field), None) => Ok(field),
            (None, _) => {
                let message = format!("field {name:?} not found");
                self.notifier.error(&message);
                error!(av_id, "{message}");
                Err(LensError::NotFound {
                    obj_type: "field".into(),
                    key: name.to_string(),
                })
            }
            (Some(first), Some(second)) => {
                let message = format!(
                    "field name {name:?} is ambiguous (ids {} and {})",
                    first.id, second.id
                );
                self.notifier.error(&message);
                error!(av_id, "{message}");
                Err(LensError::InvalidArgument { message })
            }
        }
    }

    /// Resolves the primary (`block`-typed) field. Exactly one exists per
    /// attribute view.
    pub async fn primary_field(&self, av_id: &str) -> Result<Field> {
        let fields = self.fields(av_id).await?;
        match fields
            .into_iter()
            .find(|field| field.field_type == FieldType::Block)
        {
            Some(field) => Ok(field),
            None => {
                let message = "primary field not found".to_string();
                self.notifier.error(&message);
                error!(av_id, "{message}");
                Err(LensError::NotFound {
                    obj_type: "field".into(),
                    key: "block".into(),
                })
            }
        }
    }

    /// Builder for adding a field.
    pub fn add_field<'a>(&'a self, av_id: &'a str) -> AddFieldRequest<'a> {
        AddFieldRequest {
            manager: self,
            av_id,
            key_id: None,
            name: None,
            field_type: FieldType::Text,
            icon: String::new(),
            previous_id: None,
            previous_name: None,
        }
    }

    /// Adds a field of the given type after `previous_name` (or at the end).
    /// The parameterized replacement for one-constructor-per-type helpers.
    pub async fn create_field(
        &self,
        av_id: &str,
        name: &str,
        field_type: FieldType,
        previous_name: Option<&str>,
    ) -> Result<()> {
        let mut request = self.add_field(av_id).name(name).field_type(field_type);
        if let Some(previous) = previous_name {
            request = request.previous_name(previous);
        }
        request.execute().await
    }

    /// Renames the primary field. This is a distinct backend operation; the
    /// generic add/update path never touches `block`-typed fields.
    pub async fn rename_primary_field(&self, av_id: &str, name: &str) -> Result<()> {
        require(av_id, "avID")?;
        require(name, "name")?;
        let primary = self.primary_field(av_id).await?;
        let _: Value = self
            .request(
                "updateAttrViewName",
                json!({"avID": av_id, "keyID": primary.id, "name": name}),
            )
            .await?;
        self.cache.invalidate(Some(av_id));
        Ok(())
    }

    /// Removes a field by id.
    pub async fn remove_field(
        &self,
        av_id: &str,
        key_id: &str,
        remove_relation_dest: bool,
    ) -> Result<()> {
        require(av_id, "avID")?;
        require(key_id, "keyID")?;
        let _: Value = self
            .request(
                "removeAttributeViewKey",
                json!({
                    "avID": av_id,
                    "keyID": key_id,
                    "removeRelationDest": remove_relation_dest,
                }),
            )
            .await?;
        self.cache.invalidate(Some(av_id));
        Ok(())
    }

    /// Removes a field by name. An unresolvable name is reported to the user
    /// as a warning and the removal is skipped, not failed.
    pub async fn remove_field_by_name(
        &self,
        av_id: &str,
        name: &str,
        remove_relation_dest: bool,
    ) -> Result<()> {
        require(av_id, "avID")?;
        require(name, "keyName")?;
        match self.find_field(av_id, name).await {
            Ok(field) => {
                self.remove_field(av_id, &field.id, remove_relation_dest)
                    .await
            }
            Err(err) if err.is_not_found() => {
                warn!(av_id, name, "removal skipped: field not found");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Reorders a field within the attribute view.
    pub async fn sort_field(&self, av_id: &str, name: &str, previous_name: &str) -> Result<()> {
        require(av_id, "avID")?;
        require(name, "keyName")?;
        let field = self.find_field(av_id, name).await?;
        let previous_id = self.optional_field_id(av_id, previous_name).await?;
        let _: Value = self
            .request(
                "sortAttributeViewKey",
                json!({"avID": av_id, "keyID": field.id, "previousKeyID": previous_id}),
            )
            .await?;
        Ok(())
    }

    /// Reorders a field within one view of the attribute view.
    pub async fn sort_view_field(
        &self,
        av_id: &str,
        name: &str,
        previous_name: &str,
        view_id: &str,
    ) -> Result<()> {
        require(av_id, "avID")?;
        require(name, "keyName")?;
        let field = self.find_field(av_id, name).await?;
        let previous_id = self.optional_field_id(av_id, previous_name).await?;
        let _: Value = self
            .request(
                "sortAttributeViewViewKey",
                json!({
                    "avID": av_id,
                    "viewID": view_id,
                    "keyID": field.id,
                    "previousKeyID": previous_id,
                }),
            )
            .await?;
        Ok(())
    }

    /// Searches non-relation fields by keyword.
    pub async fn search_plain_fields(&self, av_id: &str, keyword: &str) -> Result<Vec<Field>> {
        require(av_id, "avID")?;
        require(keyword, "keyword")?;
        #[derive(serde::Deserialize)]
        struct Response {
            #[serde(default)]
            keys: Vec<Field>,
        }
        let response: Response = self
            .request(
                "searchAttributeViewNonRelationKey",
                json!({"avID": av_id, "keyword": keyword}),
            )
            .await?;
        Ok(response.keys)
    }

    /// Searches relation fields by keyword.
    pub async fn search_relation_fields(&self, av_id: &str, keyword: &str) -> Result<Vec<Field>> {
        require(av_id, "avID")?;
        require(keyword, "keyword")?;
        #[derive(serde::Deserialize)]
        struct Response {
            #[serde(default)]
            keys: Vec<Field>,
        }
        let response: Response = self
            .request(
                "searchAttributeViewRelationKey",
                json!({"avID": av_id, "keyword": keyword}),
            )
            .await?;
        Ok(response.keys)
    }

    /// Resolves an optional ordering hint. Resolution failure degrades to an
    /// empty hint (warned), it never aborts the caller.
    async fn optional_field_id(&self, av_id: &str, name: &str) -> Result<String> {
        if name.is_empty() {
            return Ok(String::new());
        }
        match self.find_field(av_id, name).await {
            Ok(field) => Ok(field.id),
            Err(err) if err.is_not_found() => {
                warn!(av_id, name, "ordering hint dropped: field not found");
                Ok(String::new())
            }
            Err(err) => Err(err),
        }
    }

    // ========================================================================
    // Row-level operations
    // ========================================================================

    /// Builder for adding rows from typed sources.
    pub fn add_rows<'a>(&'a self, av_id: &'a str) -> AddRowsRequest<'a> {
        AddRowsRequest {
            manager: self,
            av_id,
            sources: Vec::new(),
            block_id: None,
            previous_id: None,
            ignore_fill_filter: true,
        }
    }

    /// Removes rows by source id.
    pub async fn remove_rows(&self, av_id: &str, src_ids: &[String]) -> Result<()> {
        require(av_id, "avID")?;
        let _: Value = self
            .request(
                "removeAttributeViewBlocks",
                json!({"avID": av_id, "srcIDs": src_ids}),
            )
            .await?;
        Ok(())
    }

    /// Appends detached rows with cell values, resolving `key_name` to
    /// `key_id` through the cached field list where the id is absent.
    pub async fn append_detached_rows(
        &self,
        av_id: &str,
        rows: Vec<Vec<KeyedCellValue>>,
    ) -> Result<()> {
        require(av_id, "avID")?;
        let mut resolved_rows = Vec::with_capacity(rows.len());
        for row in rows {
            let mut resolved = Vec::with_capacity(row.len());
            for mut cell in row {
                if cell.key_id.is_none() {
                    let Some(name) = cell.key_name.clone() else {
                        return InvalidArgumentSnafu {
                            message: "each value needs a keyID or keyName",
                        }
                        .fail();
                    };
                    let field = self.find_field(av_id, &name).await?;
                    cell.key_id = Some(field.id);
                }
                resolved.push(cell);
            }
            resolved_rows.push(resolved);
        }
        let _: Value = self
            .request(
                "appendAttributeViewDetachedBlocksWithValues",
                json!({"avID": av_id, "blocksValues": resolved_rows}),
            )
            .await?;
        Ok(())
    }

    /// Builder for fetching primary-key values (paged, keyword-filterable).
    pub fn primary_values<'a>(&'a self, av_id: &'a str) -> PrimaryValuesRequest<'a> {
        PrimaryValuesRequest {
            manager: self,
            av_id,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            keyword: None,
        }
    }

    /// Maps row item ids to their bound block ids (empty string = detached).
    /// An empty input short-circuits to an empty mapping with no network call.
    pub async fn bound_block_ids(
        &self,
        av_id: &str,
        item_ids: &[String],
    ) -> Result<HashMap<String, String>> {
        require(av_id, "avID")?;
        if item_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.request(
            "getAttributeViewBoundBlockIDsByItemIDs",
            json!({"avID": av_id, "itemIDs": item_ids}),
        )
        .await
    }

    /// Maps bound block ids to their row item ids.
    /// An empty input short-circuits to an empty mapping with no network call.
    pub async fn item_ids_for_blocks(
        &self,
        av_id: &str,
        block_ids: &[String],
    ) -> Result<HashMap<String, String>> {
        require(av_id, "avID")?;
        if block_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.request(
            "getAttributeViewItemIDsByBoundIDs",
            json!({"avID": av_id, "blockIDs": block_ids}),
        )
        .await
    }

    /// Replaces old bound block ids with new ones in one batch.
    pub async fn batch_replace_rows(
        &self,
        av_id: &str,
        mappings: &[(String, String)],
        is_detached: bool,
    ) -> Result<()> {
        require(av_id, "avID")?;
        ensure!(
            !mappings.is_empty(),
            InvalidArgumentSnafu {
                message: "mappings must not be empty"
            }
        );
        let old_new: Vec<Value> = mappings
            .iter()
            .map(|(old, new)| json!({old.as_str(): new}))
            .collect();
        let _: Value = self
            .request(
                "batchReplaceAttributeViewBlocks",
                json!({"avID": av_id, "isDetached": is_detached, "oldNew": old_new}),
            )
            .await?;
        Ok(())
    }

    // ========================================================================
    // Cell-level operations
    // ========================================================================

    /// Sets one cell, addressing the field by name and the row by item id or
    /// bound block id.
    pub async fn set_cell(
        &self,
        av_id: &str,
        field_name: &str,
        item_id: Option<&str>,
        block_id: Option<&str>,
        value: CellValue,
    ) -> Result<Value> {
        require(av_id, "avID")?;
        require(field_name, "keyName")?;
        let item_id = match item_id {
            Some(item_id) => item_id.to_string(),
            None => {
                let Some(block_id) = block_id else {
                    return InvalidArgumentSnafu {
                        message: "set_cell needs an itemID or a blockID",
                    }
                    .fail();
                };
                let wanted = vec![block_id.to_string()];
                let map = self.item_ids_for_blocks(av_id, &wanted).await?;
                match map.get(block_id) {
                    Some(item_id) if !item_id.is_empty() => item_id.clone(),
                    _ => {
                        return InvalidArgumentSnafu {
                            message: format!("no row is bound to block {block_id}"),
                        }
                        .fail();
                    }
                }
            }
        };
        let field = self.find_field(av_id, field_name).await?;
        debug!(av_id, key = %field.id, item = %item_id, "set cell");
        self.request(
            "setAttributeViewBlockAttr",
            json!({
                "avID": av_id,
                "keyID": field.id,
                "itemID": item_id,
                "value": value,
            }),
        )
        .await
    }

    /// Applies many cell updates in a single round trip (preferred path).
    pub async fn batch_set_cells(&self, av_id: &str, updates: Vec<CellUpdate>) -> Result<()> {
        require(av_id, "avID")?;
        if updates.is_empty() {
            return Ok(());
        }
        let block_to_item = self.map_missing_items(av_id, &updates).await?;
        let mut values = Vec::with_capacity(updates.len());
        for update in &updates {
            let item_id = resolve_item_id(update, &block_to_item)?;
            let field = self.find_field(av_id, &update.field_name).await?;
            values.push(json!({
                "keyID": field.id,
                "itemID": item_id,
                "value": update.value,
            }));
        }
        let _: Value = self
            .request(
                "batchSetAttributeViewBlockAttrs",
                json!({"avID": av_id, "values": values}),
            )
            .await?;
        Ok(())
    }

    /// Applies cell updates one request at a time, aggregating per-item
    /// outcomes instead of failing the whole batch. Retained for hosts that
    /// predate the batch endpoint.
    pub async fn batch_set_cells_one_by_one(
        &self,
        av_id: &str,
        updates: Vec<CellUpdate>,
    ) -> Result<Vec<CellOutcome>> {
        require(av_id, "avID")?;
        let block_to_item = self.map_missing_items(av_id, &updates).await?;
        let mut outcomes = Vec::with_capacity(updates.len());
        for update in updates {
            let item_id = match resolve_item_id(&update, &block_to_item) {
                Ok(item_id) => item_id,
                Err(err) => {
                    outcomes.push(CellOutcome {
                        success: false,
                        error: Some(err.to_string()),
                    });
                    continue;
                }
            };
            let result = self
                .set_cell(
                    av_id,
                    &update.field_name,
                    Some(&item_id),
                    None,
                    update.value,
                )
                .await;
            outcomes.push(match result {
                Ok(_) => CellOutcome {
                    success: true,
                    error: None,
                },
                Err(err) => CellOutcome {
                    success: false,
                    error: Some(err.to_string()),
                },
            });
        }
        Ok(outcomes)
    }

    /// Resolves block ids for updates lacking an item id, deduplicated into
    /// one mapping call.
    async fn map_missing_items(
        &self,
        av_id: &str,
        updates: &[CellUpdate],
    ) -> Result<HashMap<String, String>> {
        let mut need: Vec<String> = updates
            .iter()
            .filter(|update| update.item_id.is_none())
            .filter_map(|update| update.block_id.clone())
            .collect();
        need.sort();
        need.dedup();
        self.item_ids_for_blocks(av_id, &need).await
    }

    // ========================================================================
    // Read-only helpers
    // ========================================================================

    /// Filter/sort configuration of a database block.
    pub async fn filter_sort(&self, av_id: &str, block_id: &str) -> Result<FilterSort> {
        require(av_id, "avID")?;
        require(block_id, "blockID")?;
        self.request(
            "getAttributeViewFilterSort",
            json!({"id": av_id, "blockID": block_id}),
        )
        .await
    }

    /// Blocks mirroring this attribute view.
    pub async fn mirror_blocks(&self, av_id: &str) -> Result<MirrorRefs> {
        require(av_id, "avID")?;
        self.request("getMirrorDatabaseBlocks", json!({"avID": av_id}))
            .await
    }

    /// Renders a historical snapshot selected by creation time.
    pub async fn render_history(&self, av_id: &str, created: &str) -> Result<RenderedView> {
        require(av_id, "avID")?;
        require(created, "created")?;
        self.request(
            "renderHistoryAttributeView",
            json!({"id": av_id, "created": created}),
        )
        .await
    }

    /// Renders an explicit snapshot.
    pub async fn render_snapshot(&self, av_id: &str, snapshot: &str) -> Result<RenderedView> {
        require(av_id, "avID")?;
        require(snapshot, "snapshot")?;
        self.request(
            "renderSnapshotAttributeView",
            json!({"id": av_id, "snapshot": snapshot}),
        )
        .await
    }

    /// Lists image assets currently visible in a view.
    pub async fn current_images(
        &self,
        av_id: &str,
        view_id: Option<&str>,
        query: Option<&str>,
    ) -> Result<Vec<String>> {
        require(av_id, "avID")?;
        let mut payload = json!({"id": av_id});
        if let Some(view_id) = view_id {
            payload["viewID"] = json!(view_id);
        }
        if let Some(query) = query {
            payload["query"] = json!(query);
        }
        self.request("getCurrentAttrViewImages", payload).await
    }

    /// Binds this manager to one attribute view for chained operations.
    pub fn handle<'a>(&'a self, av_id: impl Into<String>) -> AvHandle<'a> {
        AvHandle {
            manager: self,
            av_id: av_id.into(),
        }
    }
}

fn require(value: &str, what: &str) -> Result<()> {
    ensure!(
        !value.trim().is_empty(),
        InvalidArgumentSnafu {
            message: format!("{what} must not be empty")
        }
    );
    Ok(())
}

fn resolve_item_id(update: &CellUpdate, block_to_item: &HashMap<String, String>) -> Result<String> {
    if let Some(item_id) = &update.item_id {
        return Ok(item_id.clone());
    }
    if let Some(block_id) = &update.block_id
        && let Some(item_id) = block_to_item.get(block_id)
        && !item_id.is_empty()
    {
        return Ok(item_id.clone());
    }
    InvalidArgumentSnafu {
        message: format!(
            "update for field {:?} needs an itemID or a mapped blockID",
            update.field_name
        ),
    }
    .fail()
}

// deserialize with 'serde_path_to_error' so shape mismatches report the
// offending json path
fn decode<T: DeserializeOwned>(data: Value) -> Result<T> {
    match serde_path_to_error::deserialize(data) {
        Ok(value) => Ok(value),
        Err(err) => {
            error!("deserialization failed at {}: {}", err.path(), err.inner());
            Err(LensError::Deserialization {
                source: err.into_inner(),
            })
        }
    }
}

// ============================================================================
// Request builders
// ============================================================================

/// Builder for rendering a view. Obtained via [`AvManager::render`].
pub struct RenderRequest<'a> {
    manager: &'a AvManager,
    av_id: &'a str,
    view_id: Option<String>,
    page: u64,
    page_size: u64,
    query: Option<String>,
}

impl RenderRequest<'_> {
    pub fn view(mut self, view_id: impl Into<String>) -> Self {
        self.view_id = Some(view_id.into());
        self
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub async fn execute(self) -> Result<RenderedView> {
        require(self.av_id, "avID")?;
        let mut payload = json!({
            "id": self.av_id,
            "page": self.page,
            "pageSize": self.page_size,
        });
        if let Some(view_id) = self.view_id {
            payload["viewID"] = json!(view_id);
        }
        if let Some(query) = self.query {
            payload["query"] = json!(query);
        }
        self.manager.request("renderAttributeView", payload).await
    }
}

/// Builder for adding a field. Obtained via [`AvManager::add_field`].
pub struct AddFieldRequest<'a> {
    manager: &'a AvManager,
    av_id: &'a str,
    key_id: Option<String>,
    name: Option<String>,
    field_type: FieldType,
    icon: String,
    previous_id: Option<String>,
    previous_name: Option<String>,
}

impl AddFieldRequest<'_> {
    pub fn key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn field_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// Places the new field after this field id.
    pub fn previous_id(mut self, previous_id: impl Into<String>) -> Self {
        self.previous_id = Some(previous_id.into());
        self
    }

    /// Places the new field after this field, resolved by name. Takes
    /// precedence over [`previous_id`](Self::previous_id). A name that fails
    /// to resolve degrades to no ordering hint.
    pub fn previous_name(mut self, previous_name: impl Into<String>) -> Self {
        self.previous_name = Some(previous_name.into());
        self
    }

    pub async fn execute(self) -> Result<()> {
        require(self.av_id, "avID")?;

        // Renaming the primary field is a different backend operation; the
        // generic path must not create a second block-typed field.
        if self.field_type == FieldType::Block {
            let Some(name) = self.name else {
                return InvalidArgumentSnafu {
                    message: "renaming the primary field requires a name",
                }
                .fail();
            };
            return self.manager.rename_primary_field(self.av_id, &name).await;
        }

        ensure!(
            self.field_type.is_creatable(),
            InvalidArgumentSnafu {
                message: format!("invalid field type: {}", self.field_type)
            }
        );

        let previous_id = match &self.previous_name {
            Some(previous_name) => {
                self.manager
                    .optional_field_id(self.av_id, previous_name)
                    .await?
            }
            None => self.previous_id.unwrap_or_default(),
        };

        let payload = json!({
            "avID": self.av_id,
            "keyID": self.key_id.unwrap_or_else(generate_id),
            "keyName": self.name.unwrap_or_else(|| DEFAULT_FIELD_NAME.to_string()),
            "keyType": self.field_type,
            "keyIcon": self.icon,
            "previousKeyID": previous_id,
        });
        let _: Value = self.manager.request("addAttributeViewKey", payload).await?;
        self.manager.cache.invalidate(Some(self.av_id));
        Ok(())
    }
}

/// Builder for adding rows. Obtained via [`AvManager::add_rows`].
pub struct AddRowsRequest<'a> {
    manager: &'a AvManager,
    av_id: &'a str,
    sources: Vec<RowSource>,
    block_id: Option<String>,
    previous_id: Option<String>,
    ignore_fill_filter: bool,
}

impl AddRowsRequest<'_> {
    /// Adds a fully specified source row.
    pub fn source(mut self, source: RowSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Adds a detached row with inline content and generated ids.
    pub fn detached_row(mut self, content: impl Into<String>) -> Self {
        self.sources.push(RowSource {
            id: generate_id(),
            is_detached: true,
            content: content.into(),
            item_id: generate_id(),
        });
        self
    }

    /// Adds a row bound to an existing block.
    pub fn bound_row(mut self, block_id: impl Into<String>) -> Self {
        self.sources.push(RowSource {
            id: block_id.into(),
            is_detached: false,
            content: String::new(),
            item_id: generate_id(),
        });
        self
    }

    /// Anchors insertion to a database block.
    pub fn block_id(mut self, block_id: impl Into<String>) -> Self {
        self.block_id = Some(block_id.into());
        self
    }

    /// Inserts after this row id.
    pub fn previous_id(mut self, previous_id: impl Into<String>) -> Self {
        self.previous_id = Some(previous_id.into());
        self
    }

    /// Whether view filters are ignored when filling the new rows.
    pub fn ignore_fill_filter(mut self, ignore: bool) -> Self {
        self.ignore_fill_filter = ignore;
        self
    }

    pub async fn execute(self) -> Result<()> {
        require(self.av_id, "avID")?;
        let mut payload = json!({
            "avID": self.av_id,
            "srcs": self.sources,
            "ignoreFillFilter": self.ignore_fill_filter,
        });
        if let Some(block_id) = self.block_id {
            payload["blockID"] = json!(block_id);
        }
        if let Some(previous_id) = self.previous_id {
            payload["previousID"] = json!(previous_id);
        }
        let _: Value = self
            .manager
            .request("addAttributeViewBlocks", payload)
            .await?;
        Ok(())
    }
}

/// Builder for primary-key values. Obtained via [`AvManager::primary_values`].
pub struct PrimaryValuesRequest<'a> {
    manager: &'a AvManager,
    av_id: &'a str,
    page: u64,
    page_size: u64,
    keyword: Option<String>,
}

impl PrimaryValuesRequest<'_> {
    pub fn page(mut self, page: u64) -> Self {
        self.page = page;
        self
    }

    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub async fn execute(self) -> Result<PrimaryValues> {
        require(self.av_id, "avID")?;
        let mut payload = json!({
            "id": self.av_id,
            "page": self.page,
            "pageSize": self.page_size,
        });
        if let Some(keyword) = self.keyword {
            payload["keyword"] = json!(keyword);
        }
        self.manager
            .request("getAttributeViewPrimaryKeyValues", payload)
            .await
    }
}

// ============================================================================
// Av-scoped handle
// ============================================================================

/// A manager bound to one attribute view, for chained operations without
/// repeating the id.
pub struct AvHandle<'a> {
    manager: &'a AvManager,
    av_id: String,
}

impl<'a> AvHandle<'a> {
    pub fn av_id(&self) -> &str {
        &self.av_id
    }

    pub fn render(&'a self) -> RenderRequest<'a> {
        self.manager.render(&self.av_id)
    }

    pub fn add_field(&'a self) -> AddFieldRequest<'a> {
        self.manager.add_field(&self.av_id)
    }

    pub async fn fields(&self) -> Result<Vec<Field>> {
        self.manager.fields(&self.av_id).await
    }

    pub async fn remove_field_by_name(&self, name: &str, remove_relation_dest: bool) -> Result<()> {
        self.manager
            .remove_field_by_name(&self.av_id, name, remove_relation_dest)
            .await
    }

    pub fn add_rows(&'a self) -> AddRowsRequest<'a> {
        self.manager.add_rows(&self.av_id)
    }

    pub async fn remove_rows(&self, src_ids: &[String]) -> Result<()> {
        self.manager.remove_rows(&self.av_id, src_ids).await
    }

    pub async fn append_detached_rows(&self, rows: Vec<Vec<KeyedCellValue>>) -> Result<()> {
        self.manager.append_detached_rows(&self.av_id, rows).await
    }

    pub fn primary_values(&'a self) -> PrimaryValuesRequest<'a> {
        self.manager.primary_values(&self.av_id)
    }

    pub async fn set_cell(
        &self,
        field_name: &str,
        item_id: Option<&str>,
        block_id: Option<&str>,
        value: CellValue,
    ) -> Result<Value> {
        self.manager
            .set_cell(&self.av_id, field_name, item_id, block_id, value)
            .await
    }

    pub async fn set_cells(&self, updates: Vec<CellUpdate>) -> Result<()> {
        self.manager.batch_set_cells(&self.av_id, updates).await
    }

    pub async fn bound_block_ids(&self, item_ids: &[String]) -> Result<HashMap<String, String>> {
        self.manager.bound_block_ids(&self.av_id, item_ids).await
    }

    pub async fn item_ids_for_blocks(
        &self,
        block_ids: &[String],
    ) -> Result<HashMap<String, String>> {
        self.manager.item_ids_for_blocks(&self.av_id, block_ids).await
    }

    pub async fn replace_rows(
        &self,
        mappings: &[(String, String)],
        is_detached: bool,
    ) -> Result<()> {
        self.manager
            .batch_replace_rows(&self.av_id, mappings, is_detached)
            .await
    }

    pub async fn duplicate(&self) -> Result<DuplicatedBlock> {
        self.manager.duplicate(&self.av_id).await
    }

    pub async fn filter_sort(&self, block_id: &str) -> Result<FilterSort> {
        self.manager.filter_sort(&self.av_id, block_id).await
    }

    pub async fn mirror_blocks(&self) -> Result<MirrorRefs> {
        self.manager.mirror_blocks(&self.av_id).await
    }

    pub async fn current_images(
        &self,
        view_id: Option<&str>,
        query: Option<&str>,
    ) -> Result<Vec<String>> {
        self.manager
            .current_images(&self.av_id, view_id, query)
            .await
    }
}
