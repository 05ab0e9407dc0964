//! # Attribute view fields
//!
//! Schema-side types: field (column) definitions, select options, view
//! descriptors, and layout/grouping tokens. Values live in [`crate::values`].

use serde::{Deserialize, Serialize};

/// The closed set of field types.
///
/// The wire format uses camelCase tokens (notably `mSelect`). Exactly one
/// field per attribute view has type [`FieldType::Block`] — the primary key
/// that anchors each row to its display text.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum FieldType {
    /// Plain text
    #[default]
    Text,
    /// Numeric value
    Number,
    /// Date, optionally a range with an end timestamp
    Date,
    /// Single selection from configured options
    Select,
    /// Multiple selections from configured options
    MSelect,
    /// References to other rows
    Relation,
    /// Boolean checkbox
    Checkbox,
    /// URL/web address
    Url,
    /// Email address
    Email,
    /// Phone number
    Phone,
    /// Attached assets (files/images). Delivered in payloads but not
    /// creatable through the generic add-field path.
    MAsset,
    /// Computed template text
    Template,
    /// Row creation timestamp
    Created,
    /// Row update timestamp
    Updated,
    /// The primary key binding a row to its block
    Block,
}

impl FieldType {
    /// Field types accepted by the generic add-field operation.
    /// `Block` is excluded (the primary field always exists; renames go
    /// through a dedicated operation), as is `MAsset` (asset columns are
    /// created by the host's upload flow).
    pub const CREATABLE: [FieldType; 13] = [
        FieldType::Text,
        FieldType::Number,
        FieldType::Date,
        FieldType::Select,
        FieldType::MSelect,
        FieldType::Relation,
        FieldType::Checkbox,
        FieldType::Url,
        FieldType::Email,
        FieldType::Phone,
        FieldType::Template,
        FieldType::Created,
        FieldType::Updated,
    ];

    /// True if this type may be passed to the generic add-field operation.
    pub fn is_creatable(self) -> bool {
        Self::CREATABLE.contains(&self)
    }
}

/// A configured option of a select/multi-select field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
}

/// A typed column definition within an attribute view.
///
/// Names are used for lookups but the backend does not enforce uniqueness;
/// see [`crate::manager::AvManager::fields`] for how collisions are handled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub icon: String,
    /// Present for select/multi-select fields only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
}

/// Available view layouts.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LayoutType {
    #[default]
    Table,
    Board,
    Calendar,
    Gallery,
}

/// Grouping configuration for a view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewGroup {
    #[serde(rename = "keyID")]
    pub key_id: String,
    pub sort: String,
    pub dir: String,
}

/// A view within an attribute view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    pub id: String,
    #[serde(default)]
    pub icon: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(default, rename = "hideAttrViewName")]
    pub hide_attr_view_name: bool,
    #[serde(rename = "type")]
    pub layout: LayoutType,
    #[serde(default, rename = "pageSize", skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
}

/// Attribute view metadata: identity, display name, views, mirror flag.
/// Created and owned entirely by the backend; this crate only reads it and
/// requests mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeView {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub views: Vec<View>,
    #[serde(default, rename = "isMirror")]
    pub is_mirror: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&FieldType::MSelect).unwrap(),
            "\"mSelect\""
        );
        assert_eq!(serde_json::to_string(&FieldType::Text).unwrap(), "\"text\"");
        assert_eq!(
            serde_json::from_str::<FieldType>("\"mSelect\"").unwrap(),
            FieldType::MSelect
        );
    }

    #[test]
    fn test_field_type_display() {
        assert_eq!(FieldType::MSelect.to_string(), "mSelect");
        assert_eq!(FieldType::Checkbox.to_string(), "checkbox");
        use std::str::FromStr;
        assert_eq!(FieldType::from_str("mSelect").unwrap(), FieldType::MSelect);
    }

    #[test]
    fn test_block_not_creatable() {
        assert!(!FieldType::Block.is_creatable());
        assert!(FieldType::Template.is_creatable());
    }

    #[test]
    fn test_field_deserialization() {
        let json = r#"{
            "id": "20240101120000-abcdefg",
            "name": "Status",
            "type": "select",
            "icon": "",
            "options": [{"id": "opt1", "name": "Open", "color": "1"}]
        }"#;
        let field: Field = serde_json::from_str(json).unwrap();
        assert_eq!(field.field_type, FieldType::Select);
        assert_eq!(field.options.unwrap()[0].name, "Open");
    }

    #[test]
    fn test_layout_type_tokens() {
        assert_eq!(LayoutType::Board.to_string(), "board");
        assert_eq!(
            serde_json::from_str::<LayoutType>("\"gallery\"").unwrap(),
            LayoutType::Gallery
        );
    }
}
