//! # Inline editing
//!
//! Maps a display record plus a user interaction to a typed micro-editor and
//! commits the result through [`AvManager`]. The UI itself (dropdown, date
//! input, popup) belongs to the host; this module owns the dispatch rules,
//! the single-session state machine, the value conversion, and the commit
//! path.
//!
//! Dispatch rules: checkboxes toggle-and-save with no intermediate UI;
//! selects commit per click; multi-selects and dates require an explicit
//! save; everything else edits in a typed popup. Created/updated fields are
//! never editable. Url fields navigate on primary activation and edit only
//! on a secondary trigger, so clicking a link never silently opens an editor.

use tracing::{debug, warn};

use crate::{
    Result,
    error::LensError,
    extract::{DisplayRecord, RawValue},
    fields::FieldType,
    host::Notifier,
    manager::AvManager,
    values::CellValue,
};

/// The micro-editor kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Checkbox,
    Select,
    MultiSelect,
    Date,
    Popup,
}

/// How the user activated a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Plain click.
    Primary,
    /// Alternate activation (modifier click, context entry, ...).
    Secondary,
}

/// What an activation should do.
#[derive(Debug, Clone, PartialEq)]
pub enum EditAction {
    /// Follow the link instead of editing.
    Navigate(String),
    /// Open this editor kind.
    Open(EditKind),
    /// The field cannot be edited inline.
    NotEditable,
}

/// The editor kind for a field type, or `None` when the field is not
/// editable inline.
pub fn edit_kind(field_type: FieldType) -> Option<EditKind> {
    match field_type {
        FieldType::Checkbox => Some(EditKind::Checkbox),
        FieldType::Select => Some(EditKind::Select),
        FieldType::MSelect => Some(EditKind::MultiSelect),
        FieldType::Date => Some(EditKind::Date),
        FieldType::Text
        | FieldType::Number
        | FieldType::Url
        | FieldType::Email
        | FieldType::Phone
        | FieldType::Relation
        | FieldType::Template => Some(EditKind::Popup),
        FieldType::Created | FieldType::Updated | FieldType::Block | FieldType::MAsset => None,
    }
}

/// Resolves an activation against a record. Url fields split primary
/// (navigate) from secondary (edit); everything else edits on primary.
pub fn activation_action(record: &DisplayRecord, activation: Activation) -> EditAction {
    if record.key_type == FieldType::Url
        && activation == Activation::Primary
        && let Some(RawValue::Url(url)) = &record.raw
        && !url.is_empty()
    {
        return EditAction::Navigate(url.clone());
    }
    match edit_kind(record.key_type) {
        Some(kind) => EditAction::Open(kind),
        None => EditAction::NotEditable,
    }
}

/// The value produced by a micro-editor.
#[derive(Debug, Clone, PartialEq)]
pub enum EditInput {
    /// Flip the current checkbox state.
    Toggle,
    Text(String),
    Number(f64),
    /// Epoch milliseconds; `None` clears the date.
    Date(Option<i64>),
    /// The chosen option, or `None` to clear.
    Select(Option<String>),
    MultiSelect(Vec<String>),
}

/// Converts an editor result to the tagged cell value the backend expects.
///
/// Single-select commits as a single-element multi-select array — the host
/// stores both select flavors in `mSelect` shape.
pub fn convert_input(
    field_type: FieldType,
    input: EditInput,
    current: Option<&RawValue>,
) -> Result<CellValue> {
    match input {
        EditInput::Toggle => {
            let checked = matches!(current, Some(RawValue::Checkbox(true)));
            Ok(CellValue::checkbox(!checked))
        }
        EditInput::Number(content) => Ok(CellValue::number(content)),
        EditInput::Date(content) => Ok(CellValue::date(content)),
        EditInput::Select(choice) => Ok(CellValue::multi_select(choice.into_iter())),
        EditInput::MultiSelect(values) => Ok(CellValue::multi_select(
            values.into_iter().filter(|value| !value.is_empty()),
        )),
        EditInput::Text(content) => Ok(match field_type {
            FieldType::Url => CellValue::url(content),
            FieldType::Email => CellValue::email(content),
            FieldType::Phone => CellValue::phone(content),
            FieldType::Number => {
                let parsed = content.trim().parse::<f64>().unwrap_or(0.0);
                CellValue::number(parsed)
            }
            _ => CellValue::text(content),
        }),
    }
}

/// Lifecycle of one edit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    Open,
    Committing,
}

/// One open micro-editor.
#[derive(Debug)]
pub struct EditSession {
    pub kind: EditKind,
    pub record: DisplayRecord,
    /// The nearest block-identifier ancestor of the activated element;
    /// resolved to a row item id at commit time.
    pub block_id: String,
    phase: EditPhase,
}

impl EditSession {
    pub fn phase(&self) -> EditPhase {
        self.phase
    }
}

/// At most one edit session is open at a time; opening a new one forcibly
/// closes the previous session (no queueing).
#[derive(Debug, Default)]
pub struct EditController {
    session: Option<EditSession>,
}

impl EditController {
    pub fn new() -> Self {
        EditController::default()
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    /// Opens an editor for the record. Fails for fields that are never
    /// editable; force-closes any previous session first.
    pub fn open(&mut self, record: DisplayRecord, block_id: impl Into<String>) -> Result<EditKind> {
        let Some(kind) = edit_kind(record.key_type) else {
            return Err(LensError::InvalidArgument {
                message: format!("{} fields are not editable", record.key_type),
            });
        };
        if let Some(previous) = self.session.take() {
            debug!(field = %previous.record.key_name, "closing previous edit session");
        }
        self.session = Some(EditSession {
            kind,
            record,
            block_id: block_id.into(),
            phase: EditPhase::Open,
        });
        Ok(kind)
    }

    /// Cancels the open session, if any.
    pub fn cancel(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(field = %session.record.key_name, "edit cancelled");
        }
    }

    /// Commits the open session.
    ///
    /// Resolves the row item id from the session's block id (a resolution
    /// failure is a hard stop reported to the user, never retried), converts
    /// the input, and writes the cell. On failure the session stays open so
    /// the user can retry or cancel; on success it closes and the caller is
    /// expected to refresh the display and ping the scheduler.
    pub async fn commit(
        &mut self,
        manager: &AvManager,
        notifier: &dyn Notifier,
        input: EditInput,
    ) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Err(LensError::EditCommit {
                message: "no edit session is open".into(),
            });
        };
        session.phase = EditPhase::Committing;
        let record = session.record.clone();
        let block_id = session.block_id.clone();

        let result = commit_value(manager, &record, &block_id, input).await;
        match result {
            Ok(()) => {
                notifier.info("saved");
                self.session = None;
                Ok(())
            }
            Err(err) => {
                warn!(field = %record.key_name, %err, "edit commit failed");
                notifier.error(&format!("save failed: {err}"));
                if let Some(session) = self.session.as_mut() {
                    session.phase = EditPhase::Open;
                }
                Err(err)
            }
        }
    }

    /// The checkbox path: toggle-and-save on click, no intermediate UI.
    pub async fn toggle_checkbox(
        &mut self,
        manager: &AvManager,
        notifier: &dyn Notifier,
        record: DisplayRecord,
        block_id: impl Into<String>,
    ) -> Result<()> {
        self.open(record, block_id)?;
        self.commit(manager, notifier, EditInput::Toggle).await
    }
}

async fn commit_value(
    manager: &AvManager,
    record: &DisplayRecord,
    block_id: &str,
    input: EditInput,
) -> Result<()> {
    let wanted = vec![block_id.to_string()];
    let mapping = manager
        .item_ids_for_blocks(&record.av_id, &wanted)
        .await
        .map_err(|err| LensError::EditCommit {
            message: format!("row lookup failed: {err}"),
        })?;
    let item_id = match mapping.get(block_id) {
        Some(item_id) if !item_id.is_empty() => item_id.clone(),
        _ => {
            return Err(LensError::EditCommit {
                message: format!("no row is bound to block {block_id}"),
            });
        }
    };

    let value = convert_input(record.key_type, input, record.raw.as_ref())?;
    manager
        .set_cell(&record.av_id, &record.key_name, Some(&item_id), None, value)
        .await
        .map_err(|err| LensError::EditCommit {
            message: err.to_string(),
        })?;
    Ok(())
}
