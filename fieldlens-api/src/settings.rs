//! # Typed configuration
//!
//! The host persists configuration as a string-keyed store. This module
//! loads that store once into a [`DisplaySettings`] value with explicit
//! per-field types and validated ranges; the rest of the crate consumes the
//! snapshot by value and never re-queries keys.
//!
//! Loading never fails: out-of-range values are clamped, malformed entries
//! fall back to defaults, and every adjustment is reported as a warning for
//! the caller to surface.

use std::collections::HashMap;
use std::str::FromStr;

use tracing::warn;

use crate::config::{
    MAX_DISPLAY_LEN_CEILING, MAX_DISPLAY_LEN_DEFAULT, MAX_DISPLAY_LEN_FLOOR, MAX_FIELD_NAME_LEN,
    POLL_INTERVAL_MIN_SECS,
};
use crate::extract::{CheckboxOptions, CheckboxStyle, Condition, DateOptions};

/// Read access to the host's persisted settings.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;
}

impl SettingsStore for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Setting keys in the host's store.
pub mod keys {
    /// Comma-separated condition tokens shown at document scope.
    pub const DOC_FIELDS: &str = "docDisplayFields";
    /// Comma-separated condition tokens shown at block scope.
    pub const BLOCK_FIELDS: &str = "blockDisplayFields";
    /// Comma-separated field names never displayed.
    pub const HIDDEN_FIELDS: &str = "hiddenFields";
    /// Comma-separated field names shown even when empty.
    pub const FORCE_SHOW_FIELDS: &str = "forceShowFields";
    pub const DATE_FORMAT: &str = "dateFormat";
    pub const DATE_INCLUDE_TIME: &str = "dateIncludeTime";
    /// One of `emoji`, `symbol`, `text`.
    pub const CHECKBOX_STYLE: &str = "checkboxStyle";
    /// Show created/updated timestamp fields.
    pub const SHOW_TIMESTAMPS: &str = "showTimestamps";
    /// Display label truncation length (10-200).
    pub const MAX_DISPLAY_LENGTH: &str = "maxDisplayLength";
    /// JSON object: field-type token -> text color.
    pub const TYPE_COLORS: &str = "typeColors";
    /// JSON object: field-type token -> background color.
    pub const TYPE_BACKGROUNDS: &str = "typeBackgrounds";
    /// JSON object: literal value -> {color, bg}.
    pub const VALUE_COLORS: &str = "valueColors";
    /// Auto-refresh interval in seconds; 0 disables polling.
    pub const POLL_INTERVAL: &str = "pollInterval";
    /// Observe the host for newly appeared attribute-view widgets.
    pub const OBSERVE_WIDGETS: &str = "observeWidgets";
}

/// Typed snapshot of the persisted configuration.
#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub doc_conditions: Vec<Condition>,
    pub block_conditions: Vec<Condition>,
    pub hidden_fields: Vec<String>,
    pub force_show_fields: Vec<String>,
    pub date_options: DateOptions,
    pub checkbox_options: CheckboxOptions,
    pub show_timestamps: bool,
    pub max_display_length: usize,
    pub type_colors_json: String,
    pub type_backgrounds_json: String,
    pub value_colors_json: String,
    pub poll_interval_secs: u64,
    pub observe_widgets: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            doc_conditions: Condition::DEFAULT.to_vec(),
            block_conditions: Condition::DEFAULT.to_vec(),
            hidden_fields: Vec::new(),
            force_show_fields: Vec::new(),
            date_options: DateOptions::default(),
            checkbox_options: CheckboxOptions::default(),
            show_timestamps: false,
            max_display_length: MAX_DISPLAY_LEN_DEFAULT,
            type_colors_json: String::new(),
            type_backgrounds_json: String::new(),
            value_colors_json: String::new(),
            poll_interval_secs: 0,
            observe_widgets: true,
        }
    }
}

impl DisplaySettings {
    /// Loads a settings snapshot. Returns the snapshot plus the list of
    /// adjustments made (clamps, rejected entries) for the caller to report.
    pub fn load(store: &dyn SettingsStore) -> (Self, Vec<String>) {
        let mut warnings = Vec::new();
        let mut settings = DisplaySettings::default();

        if let Some(raw) = store.get(keys::DOC_FIELDS) {
            settings.doc_conditions = parse_conditions(&raw, &mut warnings);
        }
        if let Some(raw) = store.get(keys::BLOCK_FIELDS) {
            settings.block_conditions = parse_conditions(&raw, &mut warnings);
        }
        if let Some(raw) = store.get(keys::HIDDEN_FIELDS) {
            let (fields, errors) = parse_field_names(&raw);
            settings.hidden_fields = fields;
            warnings.extend(errors);
        }
        if let Some(raw) = store.get(keys::FORCE_SHOW_FIELDS) {
            let (fields, errors) = parse_field_names(&raw);
            settings.force_show_fields = fields;
            warnings.extend(errors);
        }
        if let Some(raw) = store.get(keys::DATE_FORMAT)
            && !raw.trim().is_empty()
        {
            settings.date_options.format = raw.trim().to_string();
        }
        if let Some(raw) = store.get(keys::DATE_INCLUDE_TIME) {
            settings.date_options.include_time = parse_bool(&raw);
        }
        if let Some(raw) = store.get(keys::CHECKBOX_STYLE) {
            match CheckboxStyle::from_str(raw.trim()) {
                Ok(style) => settings.checkbox_options.style = style,
                Err(_) => warnings.push(format!("unknown checkbox style {raw:?}, using default")),
            }
        }
        if let Some(raw) = store.get(keys::SHOW_TIMESTAMPS) {
            settings.show_timestamps = parse_bool(&raw);
        }
        if let Some(raw) = store.get(keys::MAX_DISPLAY_LENGTH) {
            settings.max_display_length = parse_max_display_length(&raw, &mut warnings);
        }
        if let Some(raw) = store.get(keys::TYPE_COLORS) {
            settings.type_colors_json = raw;
        }
        if let Some(raw) = store.get(keys::TYPE_BACKGROUNDS) {
            settings.type_backgrounds_json = raw;
        }
        if let Some(raw) = store.get(keys::VALUE_COLORS) {
            settings.value_colors_json = raw;
        }
        if let Some(raw) = store.get(keys::POLL_INTERVAL) {
            settings.poll_interval_secs = parse_poll_interval(&raw, &mut warnings);
        }
        if let Some(raw) = store.get(keys::OBSERVE_WIDGETS) {
            settings.observe_widgets = parse_bool(&raw);
        }

        // The timestamp toggle extends both scopes rather than being a
        // separate allowlist entry.
        if settings.show_timestamps {
            for condition in [Condition::Created, Condition::Updated] {
                if !settings.doc_conditions.contains(&condition) {
                    settings.doc_conditions.push(condition);
                }
                if !settings.block_conditions.contains(&condition) {
                    settings.block_conditions.push(condition);
                }
            }
        }

        for warning in &warnings {
            warn!("settings: {warning}");
        }
        (settings, warnings)
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim(), "true" | "1" | "on" | "yes")
}

fn parse_conditions(raw: &str, warnings: &mut Vec<String>) -> Vec<Condition> {
    let mut conditions = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match Condition::from_str(token) {
            Ok(condition) => {
                if !conditions.contains(&condition) {
                    conditions.push(condition);
                }
            }
            Err(_) => warnings.push(format!("unknown display condition {token:?}")),
        }
    }
    conditions
}

/// Splits and validates a comma-separated field-name list.
/// Invalid entries (empty, over-long, duplicate) are reported and dropped;
/// valid entries are kept.
pub fn parse_field_names(raw: &str) -> (Vec<String>, Vec<String>) {
    let mut fields: Vec<String> = Vec::new();
    let mut errors = Vec::new();
    if raw.trim().is_empty() {
        return (fields, errors);
    }
    for entry in raw.split(',') {
        let name = entry.trim();
        if name.is_empty() {
            errors.push("empty field name".to_string());
            continue;
        }
        if name.chars().count() > MAX_FIELD_NAME_LEN {
            let head: String = name.chars().take(20).collect();
            errors.push(format!("field name too long: {head:?}…"));
            continue;
        }
        if fields.iter().any(|existing| existing == name) {
            errors.push(format!("duplicate field name: {name:?}"));
            continue;
        }
        fields.push(name.to_string());
    }
    (fields, errors)
}

fn parse_max_display_length(raw: &str, warnings: &mut Vec<String>) -> usize {
    let Ok(value) = raw.trim().parse::<i64>() else {
        warnings.push(format!("max display length {raw:?} is not a number, using default"));
        return MAX_DISPLAY_LEN_DEFAULT;
    };
    let clamped = value.clamp(MAX_DISPLAY_LEN_FLOOR as i64, MAX_DISPLAY_LEN_CEILING as i64);
    if clamped != value {
        warnings.push(format!(
            "max display length {value} out of range, clamped to {clamped}"
        ));
    }
    clamped as usize
}

fn parse_poll_interval(raw: &str, warnings: &mut Vec<String>) -> u64 {
    let Ok(value) = raw.trim().parse::<u64>() else {
        warnings.push(format!("poll interval {raw:?} is not a number, polling disabled"));
        return 0;
    };
    if value == 0 {
        return 0;
    }
    if value < POLL_INTERVAL_MIN_SECS {
        warnings.push(format!(
            "poll interval {value}s below minimum, clamped to {POLL_INTERVAL_MIN_SECS}s"
        ));
        return POLL_INTERVAL_MIN_SECS;
    }
    value
}
