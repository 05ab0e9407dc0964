//! # Host integration seams
//!
//! The embedding host (editor plugin shell, test harness, terminal tool)
//! talks to the core through three narrow seams:
//!
//! - [`HostEvent`] — inbound notifications: editor lifecycle, transaction
//!   feed, widget appearance. The original DOM-mutation observer is just one
//!   producer of [`HostEvent::WidgetAppeared`].
//! - [`DecorationSink`] — receives the computed record set for a scope on
//!   every redraw. The set is always a full replacement, never a patch.
//! - [`Notifier`] — transient user-facing messages.

use serde_json::Value;

use crate::color::Style;
use crate::extract::DisplayRecord;

/// A redraw scope: the document title area or a single embedded block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Document(String),
    Block(String),
}

impl Scope {
    pub fn id(&self) -> &str {
        match self {
            Scope::Document(id) | Scope::Block(id) => id,
        }
    }
}

/// One renderable fragment handed to the sink: the clipped label, the full
/// text (for tooltips/accessibility), the resolved style, and the record the
/// edit layer needs to commit a change back.
#[derive(Debug, Clone)]
pub struct Decoration {
    pub label: String,
    pub full_text: String,
    pub style: Style,
    pub record: DisplayRecord,
}

/// Receives decorations for rendering. Implementations must treat each call
/// as a full replacement of the scope's previous set so stale records never
/// leak across redraws.
pub trait DecorationSink: Send + Sync {
    fn replace(&self, scope: &Scope, decorations: &[Decoration]);
}

/// Transient user-facing notifications.
pub trait Notifier: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// A notifier that drops everything. Useful in tests and headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn info(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Inbound notifications from the host.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// The user navigated to another document.
    DocumentSwitched { doc_id: String },
    /// The host finished (re)loading editor content.
    ContentLoaded,
    /// A transaction batch arrived on the host's feed. Only batches touching
    /// attribute-view cells are significant; see [`transactions_touch_cells`].
    Transactions(Value),
    /// An attribute-view widget appeared without our decoration (the
    /// abstracted DOM-observation signal).
    WidgetAppeared,
    /// An inline edit committed successfully.
    EditCommitted,
}

impl HostEvent {
    /// True if this event should wake the scheduler from sleep / reset its
    /// run counter.
    pub fn is_external_trigger(&self) -> bool {
        match self {
            HostEvent::ContentLoaded | HostEvent::EditCommitted => true,
            HostEvent::Transactions(batch) => transactions_touch_cells(batch),
            HostEvent::DocumentSwitched { .. } | HostEvent::WidgetAppeared => false,
        }
    }
}

/// Scans a transaction batch for `updateAttrViewCell` operations. All other
/// operations on the feed are ignored.
pub fn transactions_touch_cells(batch: &Value) -> bool {
    fn operations(transaction: &Value) -> impl Iterator<Item = &Value> {
        transaction
            .get("doOperations")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
    }

    let transactions = match batch.get("data") {
        Some(data) => data.as_array().map(Vec::as_slice).unwrap_or_default(),
        None => std::slice::from_ref(batch),
    };
    transactions.iter().flat_map(operations).any(|operation| {
        operation.get("action").and_then(Value::as_str) == Some("updateAttrViewCell")
    })
}

/// Process-wide session state shared between the scheduler, extraction
/// passes, and edit commits. Owned by the controller and passed by
/// reference — deliberately not a module global.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub current_doc_id: Option<String>,
    pub current_block_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transactions_touch_cells() {
        let batch = json!({
            "cmd": "transactions",
            "data": [
                {"doOperations": [{"action": "update"}]},
                {"doOperations": [{"action": "updateAttrViewCell", "id": "x"}]}
            ]
        });
        assert!(transactions_touch_cells(&batch));

        let unrelated = json!({
            "cmd": "transactions",
            "data": [{"doOperations": [{"action": "insert"}]}]
        });
        assert!(!transactions_touch_cells(&unrelated));
    }

    #[test]
    fn test_bare_transaction_object() {
        let bare = json!({"doOperations": [{"action": "updateAttrViewCell"}]});
        assert!(transactions_touch_cells(&bare));
    }

    #[test]
    fn test_external_trigger_classification() {
        assert!(HostEvent::ContentLoaded.is_external_trigger());
        assert!(HostEvent::EditCommitted.is_external_trigger());
        assert!(
            !HostEvent::DocumentSwitched {
                doc_id: "doc".into()
            }
            .is_external_trigger()
        );
        let noise = HostEvent::Transactions(json!({"data": []}));
        assert!(!noise.is_external_trigger());
    }
}
