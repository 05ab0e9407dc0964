//! # Color resolution
//!
//! Resolves per-type and per-value color/background overrides from
//! user-supplied JSON maps. Configuration errors are never fatal: a malformed
//! map or a malformed entry degrades to "no custom styling".

use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

use crate::fields::FieldType;

/// Inline style resolved for one display record. Empty fields mean the
/// caller's default styling stands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Style {
    pub color: Option<String>,
    pub background: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ValueOverride {
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    bg: Option<String>,
}

/// User-configured color maps with a defined precedence:
///
/// 1. an exact literal-value match — its color/bg win and the type maps are
///    not consulted at all;
/// 2. the field type's entry in the text-color map;
/// 3. the field type's entry in the background-color map.
#[derive(Debug, Default)]
pub struct ColorResolver {
    type_colors: HashMap<String, String>,
    type_backgrounds: HashMap<String, String>,
    value_overrides: HashMap<String, ValueOverride>,
}

impl ColorResolver {
    /// Builds a resolver from the three configuration blobs. Each blob is an
    /// independent JSON object; a blob that fails to parse is logged and
    /// treated as empty.
    pub fn from_json(type_colors: &str, type_backgrounds: &str, value_overrides: &str) -> Self {
        ColorResolver {
            type_colors: parse_map(type_colors, "type color map"),
            type_backgrounds: parse_map(type_backgrounds, "type background map"),
            value_overrides: parse_map(value_overrides, "value color map"),
        }
    }

    /// Resolves the style for a record by field type and display text.
    pub fn resolve(&self, field_type: FieldType, text: &str) -> Style {
        if let Some(over) = self.value_overrides.get(text) {
            return Style {
                color: over.color.clone().filter(|color| is_valid_color(color)),
                background: over.bg.clone().filter(|color| is_valid_color(color)),
            };
        }
        let token = field_type.to_string();
        Style {
            color: self
                .type_colors
                .get(&token)
                .filter(|color| is_valid_color(color))
                .cloned(),
            background: self
                .type_backgrounds
                .get(&token)
                .filter(|color| is_valid_color(color))
                .cloned(),
        }
    }
}

fn parse_map<T: serde::de::DeserializeOwned + Default>(raw: &str, what: &str) -> T {
    if raw.trim().is_empty() {
        return T::default();
    }
    match serde_json::from_str(raw) {
        Ok(map) => map,
        Err(err) => {
            warn!(%err, "ignoring malformed {what}");
            T::default()
        }
    }
}

/// Accepts `#rgb`/`#rrggbb`, `rgb(...)`, and `var(--x)` color syntax.
pub fn is_valid_color(value: &str) -> bool {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return matches!(hex.len(), 3 | 6) && hex.bytes().all(|b| b.is_ascii_hexdigit());
    }
    if let Some(rest) = value.strip_prefix("rgb(") {
        return rest.ends_with(')') && rest.len() > 1;
    }
    if let Some(rest) = value.strip_prefix("var(--") {
        return rest.ends_with(')') && rest.len() > 1;
    }
    false
}
