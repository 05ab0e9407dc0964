//! # Attribute view values and payloads
//!
//! Two value representations exist on purpose:
//!
//! - [`CellValue`] is the write side: an externally-tagged sum type where
//!   exactly one variant is populated, producing the `{"text":{"content":..}}`
//!   wire shape the backend expects for cell mutations.
//! - [`ItemValue`] is the read side: render payloads deliver values with every
//!   variant optional. Zero populated variants and multiple populated variants
//!   are both valid "empty" states — the extraction pipeline decides presence
//!   per field type, it is not an error here.

use serde::{Deserialize, Serialize};

use crate::fields::Field;

// ============================================================================
// Read-side content shapes
// ============================================================================

/// `{content: string}` shape shared by text/url/email/phone/template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(default)]
    pub content: Option<String>,
}

/// Numeric cell content. `content` may be absent for an empty cell;
/// zero counts as present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberContent {
    #[serde(default)]
    pub content: Option<f64>,
    #[serde(
        default,
        rename = "isNotEmpty",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_not_empty: Option<bool>,
}

/// Date cell content: epoch milliseconds, optional range end, and a per-value
/// flag suppressing time-of-day display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateContent {
    #[serde(default)]
    pub content: Option<i64>,
    #[serde(default, rename = "hasEndDate")]
    pub has_end_date: bool,
    #[serde(default, rename = "isNotTime")]
    pub is_not_time: bool,
    #[serde(default)]
    pub content2: Option<i64>,
}

/// Checkbox cell content. Presence of the object itself is what the
/// extraction predicate tests; `checked` only selects the glyph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckboxContent {
    #[serde(default)]
    pub checked: bool,
}

/// One chosen option of a select/multi-select cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub content: String,
    #[serde(default)]
    pub color: String,
}

/// One attached asset of an asset cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetContent {
    #[serde(default, rename = "type")]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
}

/// One linked row of a relation cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationContent {
    #[serde(default, rename = "blockID")]
    pub block_id: String,
    #[serde(default)]
    pub content: String,
}

/// Created/updated timestamp content (epoch milliseconds).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimestampContent {
    #[serde(default)]
    pub content: Option<i64>,
}

/// Primary-key (block) cell content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockContent {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "blockID", skip_serializing_if = "Option::is_none")]
    pub block_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, rename = "isDetached")]
    pub is_detached: bool,
}

/// A raw cell value as delivered inside render payloads.
///
/// All variants are optional; see the module docs for why this is not an enum.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemValue {
    #[serde(default, rename = "keyID", skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<NumberContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkbox: Option<CheckboxContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<TextContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<TextContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<TextContent>,
    #[serde(default, rename = "mSelect", skip_serializing_if = "Option::is_none")]
    pub m_select: Option<Vec<SelectedOption>>,
    #[serde(default, rename = "mAsset", skip_serializing_if = "Option::is_none")]
    pub m_asset: Option<Vec<AssetContent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<Vec<RelationContent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TextContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<TimestampContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<TimestampContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<SelectedOption>,
}

// ============================================================================
// Write-side cell values
// ============================================================================

/// A cell value for mutation requests.
///
/// Externally tagged so each variant serializes to the single-key wrapper
/// object the backend expects; the type system enforces the "exactly one
/// populated variant" invariant that the read side can only observe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    #[serde(rename = "text")]
    Text { content: String },
    #[serde(rename = "number")]
    Number {
        content: f64,
        #[serde(
            default,
            rename = "isNotEmpty",
            skip_serializing_if = "Option::is_none"
        )]
        is_not_empty: Option<bool>,
    },
    #[serde(rename = "date")]
    Date {
        content: Option<i64>,
        #[serde(default, rename = "isNotTime")]
        is_not_time: bool,
        #[serde(default, rename = "hasEndDate")]
        has_end_date: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content2: Option<i64>,
    },
    #[serde(rename = "select")]
    Select {
        content: String,
        #[serde(default)]
        color: String,
    },
    #[serde(rename = "mSelect")]
    MSelect(Vec<SelectedOption>),
    #[serde(rename = "checkbox")]
    Checkbox { checked: bool },
    #[serde(rename = "url")]
    Url { content: String },
    #[serde(rename = "email")]
    Email { content: String },
    #[serde(rename = "phone")]
    Phone { content: String },
    #[serde(rename = "mAsset")]
    MAsset(Vec<AssetContent>),
    #[serde(rename = "relation")]
    Relation {
        #[serde(rename = "blockIDs")]
        block_ids: Vec<String>,
    },
    #[serde(rename = "block")]
    Block {
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        created: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updated: Option<i64>,
    },
}

impl CellValue {
    pub fn text(content: impl Into<String>) -> Self {
        CellValue::Text {
            content: content.into(),
        }
    }

    pub fn number(content: f64) -> Self {
        CellValue::Number {
            content,
            is_not_empty: None,
        }
    }

    /// A date value without time-of-day or range end.
    pub fn date(content: Option<i64>) -> Self {
        CellValue::Date {
            content,
            is_not_time: false,
            has_end_date: false,
            content2: None,
        }
    }

    pub fn checkbox(checked: bool) -> Self {
        CellValue::Checkbox { checked }
    }

    pub fn url(content: impl Into<String>) -> Self {
        CellValue::Url {
            content: content.into(),
        }
    }

    pub fn email(content: impl Into<String>) -> Self {
        CellValue::Email {
            content: content.into(),
        }
    }

    pub fn phone(content: impl Into<String>) -> Self {
        CellValue::Phone {
            content: content.into(),
        }
    }

    /// Multi-select from plain option names (colors left to the backend).
    pub fn multi_select<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CellValue::MSelect(
            values
                .into_iter()
                .map(|value| SelectedOption {
                    content: value.into(),
                    color: String::new(),
                })
                .collect(),
        )
    }
}

/// A cell mutation value addressed by field name or id. Used by the
/// detached-row append operation, which resolves `key_name` to `key_id`
/// through the cached field list when the id is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyedCellValue {
    #[serde(default, rename = "keyID", skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(default, rename = "keyName", skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,
    #[serde(flatten)]
    pub value: CellValue,
}

// ============================================================================
// Payload and response shapes
// ============================================================================

/// One field with its values for one row-like item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValues {
    pub key: Field,
    #[serde(default)]
    pub values: Vec<ItemValue>,
}

/// Attribute-view data for one document/block: the unit the extraction
/// pipeline consumes. One document may be bound to several attribute views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvKeyValues {
    #[serde(default, rename = "avID")]
    pub av_id: String,
    #[serde(default, rename = "avName")]
    pub av_name: String,
    #[serde(default, rename = "blockIDs")]
    pub block_ids: Vec<String>,
    #[serde(default, rename = "keyValues")]
    pub key_values: Vec<KeyValues>,
}

/// A row addressed by its internal item identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    #[serde(default)]
    pub values: Vec<ItemValue>,
}

/// Primary-key values page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryValues {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "blockIDs")]
    pub block_ids: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

/// A filter rule of a view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRule {
    #[serde(rename = "keyID")]
    pub key_id: String,
    pub operator: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// A sort rule of a view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortRule {
    #[serde(rename = "keyID")]
    pub key_id: String,
    pub order: String,
}

/// Filter and sort configuration for a database block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterSort {
    #[serde(default)]
    pub filters: Vec<FilterRule>,
    #[serde(default)]
    pub sorts: Vec<SortRule>,
}

/// Mirror reference: one referencing block and the definitions it mirrors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefDefs {
    #[serde(rename = "refID")]
    pub ref_id: String,
    #[serde(default, rename = "defIDs")]
    pub def_ids: Vec<String>,
}

/// Mirror-block reference list for an attribute view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorRefs {
    #[serde(default, rename = "refDefs")]
    pub ref_defs: Vec<RefDefs>,
}

/// Result of rendering a view (current, historical, or snapshot).
/// The row payload under `view` is layout-dependent and left untyped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedView {
    #[serde(default)]
    pub name: String,
    pub id: String,
    #[serde(default, rename = "viewType")]
    pub view_type: String,
    #[serde(default, rename = "viewID")]
    pub view_id: String,
    #[serde(default)]
    pub views: Vec<crate::fields::View>,
    #[serde(default)]
    pub view: serde_json::Value,
    #[serde(default, rename = "isMirror")]
    pub is_mirror: bool,
}

/// A source row for the add-rows operation: either bound to an existing
/// block or detached with inline content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowSource {
    pub id: String,
    #[serde(rename = "isDetached")]
    pub is_detached: bool,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "itemID")]
    pub item_id: String,
}

impl ItemValue {
    /// True if no variant carries renderable content. Multiple populated
    /// variants are left to the per-condition predicates.
    pub fn is_vacant(&self) -> bool {
        self.block.is_none()
            && self.text.is_none()
            && self.number.is_none()
            && self.date.is_none()
            && self.checkbox.is_none()
            && self.url.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.m_select.is_none()
            && self.m_asset.is_none()
            && self.relation.is_none()
            && self.template.is_none()
            && self.created.is_none()
            && self.updated.is_none()
            && self.select.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_value_wire_shape() {
        let value = CellValue::text("Hello");
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            serde_json::json!({"text": {"content": "Hello"}})
        );

        let value = CellValue::checkbox(true);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            serde_json::json!({"checkbox": {"checked": true}})
        );

        let value = CellValue::multi_select(["A", "B"]);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            serde_json::json!({"mSelect": [
                {"content": "A", "color": ""},
                {"content": "B", "color": ""}
            ]})
        );
    }

    #[test]
    fn test_keyed_cell_value_flattens() {
        let keyed = KeyedCellValue {
            key_id: Some("key-1".into()),
            key_name: None,
            value: CellValue::number(3.5),
        };
        assert_eq!(
            serde_json::to_value(&keyed).unwrap(),
            serde_json::json!({"keyID": "key-1", "number": {"content": 3.5}})
        );
    }

    #[test]
    fn test_item_value_partial_deserialization() {
        let raw: ItemValue = serde_json::from_str(
            r#"{"keyID": "k1", "date": {"content": 1700000000000, "hasEndDate": false}}"#,
        )
        .unwrap();
        assert_eq!(raw.date.as_ref().unwrap().content, Some(1_700_000_000_000));
        assert!(!raw.date.unwrap().has_end_date);
        assert!(raw.text.is_none());
    }

    #[test]
    fn test_item_value_vacant() {
        let raw: ItemValue = serde_json::from_str(r#"{"keyID": "k1"}"#).unwrap();
        assert!(raw.is_vacant());
        let raw: ItemValue = serde_json::from_str(r#"{"checkbox": {}}"#).unwrap();
        assert!(!raw.is_vacant());
    }
}
