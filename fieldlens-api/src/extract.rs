//! # Value extraction pipeline
//!
//! Pure functions turning a raw attribute-view payload into an ordered list
//! of [`DisplayRecord`]s: filtered by enabled conditions and hidden fields,
//! formatted per type, and carrying enough metadata for the edit layer to
//! round-trip a value back to the backend.
//!
//! Everything here is deterministic in its inputs — running the same payload
//! through twice yields identical record lists.

use serde::{Deserialize, Serialize};

use crate::fields::{FieldType, SelectOption};
use crate::values::{AvKeyValues, DateContent, ItemValue};

/// A field-type tag used to filter which values are considered.
///
/// A value only produces records if its type's condition is enabled. Types
/// without a condition (block, template, relation) never match; that is
/// intentional filtering, not an error.
#[derive(
    Debug,
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
pub enum Condition {
    MSelect,
    Number,
    Date,
    Text,
    MAsset,
    Checkbox,
    Phone,
    Url,
    Email,
    Created,
    Updated,
}

impl Condition {
    /// The default condition set: everything except the timestamp pair,
    /// which has its own visibility toggle.
    pub const DEFAULT: [Condition; 9] = [
        Condition::MSelect,
        Condition::Number,
        Condition::Date,
        Condition::Text,
        Condition::MAsset,
        Condition::Checkbox,
        Condition::Phone,
        Condition::Url,
        Condition::Email,
    ];
}

impl FieldType {
    /// The condition this field type's values match, if any.
    ///
    /// Single-select values arrive in `mSelect` shape, so both select types
    /// map to [`Condition::MSelect`].
    pub fn condition(self) -> Option<Condition> {
        match self {
            FieldType::Text => Some(Condition::Text),
            FieldType::Number => Some(Condition::Number),
            FieldType::Date => Some(Condition::Date),
            FieldType::Select | FieldType::MSelect => Some(Condition::MSelect),
            FieldType::Checkbox => Some(Condition::Checkbox),
            FieldType::Url => Some(Condition::Url),
            FieldType::Email => Some(Condition::Email),
            FieldType::Phone => Some(Condition::Phone),
            FieldType::MAsset => Some(Condition::MAsset),
            FieldType::Created => Some(Condition::Created),
            FieldType::Updated => Some(Condition::Updated),
            FieldType::Relation | FieldType::Template | FieldType::Block => None,
        }
    }
}

/// Date rendering policy.
#[derive(Debug, Clone)]
pub struct DateOptions {
    /// chrono format string for the date part.
    pub format: String,
    /// Append time-of-day. Suppressed per value when its `isNotTime` is set.
    pub include_time: bool,
}

impl Default for DateOptions {
    fn default() -> Self {
        DateOptions {
            format: "%Y-%m-%d".to_string(),
            include_time: false,
        }
    }
}

/// How checkbox state is rendered.
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
pub enum CheckboxStyle {
    #[default]
    Emoji,
    Symbol,
    Text,
}

impl CheckboxStyle {
    pub fn glyph(self, checked: bool) -> &'static str {
        match (self, checked) {
            (CheckboxStyle::Emoji, true) => "✅",
            (CheckboxStyle::Emoji, false) => "⬜",
            (CheckboxStyle::Symbol, true) => "☑",
            (CheckboxStyle::Symbol, false) => "☐",
            (CheckboxStyle::Text, true) => "yes",
            (CheckboxStyle::Text, false) => "no",
        }
    }
}

/// Checkbox rendering policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckboxOptions {
    pub style: CheckboxStyle,
}

/// The original typed value behind a record, kept for the edit round-trip.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number(f64),
    Date(DateContent),
    Url(String),
    Email(String),
    Phone(String),
    Checkbox(bool),
    MultiSelect(Vec<String>),
    Assets(Vec<String>),
    Timestamp(Option<i64>),
}

/// One display fragment: a formatted value plus the metadata needed to edit
/// it. Created fresh on every extraction pass, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRecord {
    /// The condition this value matched.
    pub condition: Condition,
    /// Formatted display text, never empty.
    pub text: String,
    /// Owning attribute-view id.
    pub av_id: String,
    pub key_id: String,
    pub key_name: String,
    pub key_type: FieldType,
    /// Original value for the edit round-trip; `None` marks a force-show
    /// placeholder, which the edit layer treats as an empty cell.
    pub raw: Option<RawValue>,
    /// Snapshot of the field's configured options, select/multi-select only.
    pub select_options: Option<Vec<SelectOption>>,
}

impl DisplayRecord {
    /// True for a force-show placeholder standing in for an empty field.
    pub fn is_placeholder(&self) -> bool {
        self.raw.is_none()
    }
}

/// Extracts display records from a raw payload.
///
/// Ordering follows the payload: items, then fields, then values, then the
/// caller's condition order. Hidden fields are skipped entirely (no
/// placeholder); force-shown fields that produced nothing real emit exactly
/// one placeholder whose text is the field name.
pub fn extract(
    payload: &[AvKeyValues],
    conditions: &[Condition],
    hidden_fields: &[String],
    date_options: &DateOptions,
    checkbox_options: &CheckboxOptions,
    force_show_fields: &[String],
) -> Vec<DisplayRecord> {
    let mut records = Vec::new();

    for item in payload {
        for key_values in &item.key_values {
            let field = &key_values.key;
            if hidden_fields.iter().any(|name| name == &field.name) {
                tracing::debug!(field = %field.name, "hidden field skipped");
                continue;
            }

            let select_options = match field.field_type {
                FieldType::Select | FieldType::MSelect => {
                    Some(field.options.clone().unwrap_or_default())
                }
                _ => None,
            };

            let produced_before = records.len();
            for value in &key_values.values {
                for condition in conditions {
                    if !matches_condition(value, *condition) {
                        continue;
                    }
                    let raw = raw_value(value, *condition);
                    for text in condition_texts(value, *condition, date_options, checkbox_options)
                    {
                        if text.is_empty() {
                            continue;
                        }
                        records.push(DisplayRecord {
                            condition: *condition,
                            text,
                            av_id: item.av_id.clone(),
                            key_id: field.id.clone(),
                            key_name: field.name.clone(),
                            key_type: field.field_type,
                            raw: Some(raw.clone()),
                            select_options: select_options.clone(),
                        });
                    }
                }
            }

            let produced_any = records.len() > produced_before;
            if !produced_any && force_show_fields.iter().any(|name| name == &field.name) {
                records.push(DisplayRecord {
                    condition: field.field_type.condition().unwrap_or(Condition::Text),
                    text: field.name.clone(),
                    av_id: item.av_id.clone(),
                    key_id: field.id.clone(),
                    key_name: field.name.clone(),
                    key_type: field.field_type,
                    raw: None,
                    select_options: select_options.clone(),
                });
            }
        }
    }

    records
}

/// Per-type presence predicate.
///
/// Notably: a number is present when its content is defined, including zero;
/// a checkbox is present when the checkbox object exists regardless of
/// checked state; a date is present only when its primary timestamp is a
/// non-zero value.
pub fn matches_condition(value: &ItemValue, condition: Condition) -> bool {
    match condition {
        Condition::MSelect => value.m_select.as_ref().is_some_and(|opts| !opts.is_empty()),
        Condition::Number => value
            .number
            .as_ref()
            .is_some_and(|number| number.content.is_some()),
        Condition::Date => value
            .date
            .as_ref()
            .is_some_and(|date| date.content.unwrap_or(0) != 0),
        Condition::Text => has_content(&value.text),
        Condition::MAsset => value.m_asset.as_ref().is_some_and(|assets| !assets.is_empty()),
        Condition::Checkbox => value.checkbox.is_some(),
        Condition::Phone => has_content(&value.phone),
        Condition::Url => has_content(&value.url),
        Condition::Email => has_content(&value.email),
        Condition::Created => value
            .created
            .as_ref()
            .is_some_and(|ts| ts.content.unwrap_or(0) != 0),
        Condition::Updated => value
            .updated
            .as_ref()
            .is_some_and(|ts| ts.content.unwrap_or(0) != 0),
    }
}

fn has_content(slot: &Option<crate::values::TextContent>) -> bool {
    slot.as_ref()
        .and_then(|text| text.content.as_deref())
        .is_some_and(|content| !content.is_empty())
}

/// Renders the display strings for a matching value. Multi-select and asset
/// values yield one string per option/asset; scalar values yield at most one.
pub fn condition_texts(
    value: &ItemValue,
    condition: Condition,
    date_options: &DateOptions,
    checkbox_options: &CheckboxOptions,
) -> Vec<String> {
    match condition {
        Condition::MSelect => value
            .m_select
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|option| option.content.clone())
            .collect(),
        Condition::MAsset => value
            .m_asset
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|asset| asset.name.clone())
            .collect(),
        Condition::Number => value
            .number
            .as_ref()
            .and_then(|number| number.content)
            .map(fmt_number)
            .into_iter()
            .collect(),
        Condition::Date => value
            .date
            .as_ref()
            .map(|date| fmt_date_value(date, date_options))
            .into_iter()
            .collect(),
        Condition::Checkbox => value
            .checkbox
            .as_ref()
            .map(|checkbox| checkbox_options.style.glyph(checkbox.checked).to_string())
            .into_iter()
            .collect(),
        Condition::Text => text_of(&value.text),
        Condition::Phone => text_of(&value.phone),
        Condition::Url => text_of(&value.url),
        Condition::Email => text_of(&value.email),
        Condition::Created => timestamp_text(&value.created, date_options),
        Condition::Updated => timestamp_text(&value.updated, date_options),
    }
}

fn text_of(slot: &Option<crate::values::TextContent>) -> Vec<String> {
    slot.as_ref()
        .and_then(|text| text.content.clone())
        .into_iter()
        .collect()
}

fn timestamp_text(
    slot: &Option<crate::values::TimestampContent>,
    date_options: &DateOptions,
) -> Vec<String> {
    slot.as_ref()
        .and_then(|ts| ts.content)
        .map(|millis| fmt_timestamp(millis, date_options, false))
        .into_iter()
        .collect()
}

/// Extracts the original typed value for the edit round-trip.
fn raw_value(value: &ItemValue, condition: Condition) -> RawValue {
    match condition {
        Condition::Text => RawValue::Text(content_or_default(&value.text)),
        Condition::Number => RawValue::Number(
            value
                .number
                .as_ref()
                .and_then(|number| number.content)
                .unwrap_or(0.0),
        ),
        Condition::Date => RawValue::Date(value.date.clone().unwrap_or_default()),
        Condition::Url => RawValue::Url(content_or_default(&value.url)),
        Condition::Email => RawValue::Email(content_or_default(&value.email)),
        Condition::Phone => RawValue::Phone(content_or_default(&value.phone)),
        Condition::Checkbox => RawValue::Checkbox(
            value
                .checkbox
                .as_ref()
                .map(|checkbox| checkbox.checked)
                .unwrap_or_default(),
        ),
        Condition::MSelect => RawValue::MultiSelect(
            value
                .m_select
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|option| option.content.clone())
                .collect(),
        ),
        Condition::MAsset => RawValue::Assets(
            value
                .m_asset
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(|asset| asset.name.clone())
                .collect(),
        ),
        Condition::Created => {
            RawValue::Timestamp(value.created.as_ref().and_then(|ts| ts.content))
        }
        Condition::Updated => {
            RawValue::Timestamp(value.updated.as_ref().and_then(|ts| ts.content))
        }
    }
}

fn content_or_default(slot: &Option<crate::values::TextContent>) -> String {
    slot.as_ref()
        .and_then(|text| text.content.clone())
        .unwrap_or_default()
}

/// Formats a date value, rendering `"start ~ end"` when the value carries an
/// end timestamp.
fn fmt_date_value(date: &DateContent, options: &DateOptions) -> String {
    let Some(start) = date.content else {
        return String::new();
    };
    let start_text = fmt_timestamp(start, options, date.is_not_time);
    if date.has_end_date {
        if let Some(end) = date.content2 {
            let end_text = fmt_timestamp(end, options, date.is_not_time);
            return format!("{start_text} ~ {end_text}");
        }
    }
    start_text
}

/// Epoch milliseconds to display text. Timestamps are rendered in UTC so the
/// output is host-independent; time-of-day is appended only when the global
/// option asks for it and the value itself doesn't opt out.
fn fmt_timestamp(millis: i64, options: &DateOptions, is_not_time: bool) -> String {
    use chrono::TimeZone;
    let Some(moment) = chrono::Utc.timestamp_millis_opt(millis).single() else {
        return String::new();
    };
    let with_time = options.include_time && !is_not_time;
    if with_time {
        moment
            .format(&format!("{} %H:%M", options.format))
            .to_string()
    } else {
        moment.format(&options.format).to_string()
    }
}

/// Integral numbers render without a trailing `.0`.
fn fmt_number(content: f64) -> String {
    if content.fract() == 0.0 && content.abs() < 1e15 {
        format!("{}", content as i64)
    } else {
        format!("{content}")
    }
}

/// Truncates display text to `max` characters, appending an ellipsis marker.
/// The untruncated text stays available on the record.
pub fn clip(text: &str, max: usize) -> String {
    let mut out: String = text.chars().take(max).collect();
    if text.chars().nth(max).is_some() {
        out.push('…');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::{CheckboxContent, NumberContent, TextContent};

    fn value_with_number(content: Option<f64>) -> ItemValue {
        ItemValue {
            number: Some(NumberContent {
                content,
                is_not_empty: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_number_zero_is_present() {
        assert!(matches_condition(
            &value_with_number(Some(0.0)),
            Condition::Number
        ));
        assert!(!matches_condition(
            &value_with_number(None),
            Condition::Number
        ));
    }

    #[test]
    fn test_checkbox_present_regardless_of_state() {
        let unchecked = ItemValue {
            checkbox: Some(CheckboxContent { checked: false }),
            ..Default::default()
        };
        assert!(matches_condition(&unchecked, Condition::Checkbox));
        assert!(!matches_condition(&ItemValue::default(), Condition::Checkbox));
    }

    #[test]
    fn test_empty_text_is_absent() {
        let empty = ItemValue {
            text: Some(TextContent {
                content: Some(String::new()),
            }),
            ..Default::default()
        };
        assert!(!matches_condition(&empty, Condition::Text));
    }

    #[test]
    fn test_date_zero_is_absent() {
        let zeroed = ItemValue {
            date: Some(DateContent {
                content: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(!matches_condition(&zeroed, Condition::Date));
    }

    #[test]
    fn test_fmt_number_trims_integers() {
        assert_eq!(fmt_number(42.0), "42");
        assert_eq!(fmt_number(3.5), "3.5");
        assert_eq!(fmt_number(0.0), "0");
    }

    #[test]
    fn test_date_range_rendering() {
        let options = DateOptions::default();
        // 2023-11-14 / 2023-11-15 UTC
        let range = DateContent {
            content: Some(1_699_971_200_000),
            has_end_date: true,
            is_not_time: false,
            content2: Some(1_700_057_600_000),
        };
        assert_eq!(fmt_date_value(&range, &options), "2023-11-14 ~ 2023-11-15");

        let single = DateContent {
            content: Some(1_699_971_200_000),
            ..Default::default()
        };
        assert_eq!(fmt_date_value(&single, &options), "2023-11-14");
    }

    #[test]
    fn test_is_not_time_overrides_include_time() {
        let options = DateOptions {
            format: "%Y-%m-%d".to_string(),
            include_time: true,
        };
        let timed = fmt_timestamp(1_699_971_200_000, &options, false);
        assert_eq!(timed, "2023-11-14 14:13");
        let date_only = fmt_timestamp(1_699_971_200_000, &options, true);
        assert_eq!(date_only, "2023-11-14");
    }

    #[test]
    fn test_checkbox_glyphs() {
        assert_eq!(CheckboxStyle::Symbol.glyph(true), "☑");
        assert_eq!(CheckboxStyle::Symbol.glyph(false), "☐");
        assert_eq!(CheckboxStyle::Emoji.glyph(true), "✅");
        assert_eq!(CheckboxStyle::Text.glyph(false), "no");
    }

    #[test]
    fn test_clip() {
        assert_eq!(clip("HelloWorld", 5), "Hello…");
        assert_eq!(clip("Hi", 5), "Hi");
        assert_eq!(clip("日本語テスト", 3), "日本語…");
    }
}
