//! # Display controller
//!
//! Ties the pieces together: on every refresh trigger, fetch the raw
//! attribute-view payload for the current document (and block), run the
//! extraction pipeline, resolve colors, and hand the finished decoration set
//! to the host's sink. One controller instance owns the session state that
//! the original kept in module globals.
//!
//! A failed refresh for one scope is logged and swallowed — the previous
//! display simply stays until the next trigger; the redraw loop never dies.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{
    Result,
    color::ColorResolver,
    edit::{Activation, EditAction, EditController, EditInput},
    extract::{self, Condition, DisplayRecord},
    host::{Decoration, DecorationSink, HostEvent, Notifier, Scope, SessionState},
    manager::AvManager,
    schedule::RefreshCause,
    settings::{DisplaySettings, SettingsStore},
};

/// The redraw/extract/edit controller.
pub struct FieldLens {
    manager: AvManager,
    settings: DisplaySettings,
    colors: ColorResolver,
    session: SessionState,
    sink: Arc<dyn DecorationSink>,
    notifier: Arc<dyn Notifier>,
    edit: EditController,
    scheduler_tx: Option<mpsc::UnboundedSender<HostEvent>>,
}

impl FieldLens {
    pub fn new(
        manager: AvManager,
        settings: DisplaySettings,
        sink: Arc<dyn DecorationSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let colors = ColorResolver::from_json(
            &settings.type_colors_json,
            &settings.type_backgrounds_json,
            &settings.value_colors_json,
        );
        FieldLens {
            manager,
            settings,
            colors,
            session: SessionState::default(),
            sink,
            notifier,
            edit: EditController::new(),
            scheduler_tx: None,
        }
    }

    /// Loads settings from the host store, reporting every adjustment the
    /// loader made (clamped ranges, rejected names) as a notification.
    pub fn with_settings_store(
        manager: AvManager,
        store: &dyn SettingsStore,
        sink: Arc<dyn DecorationSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (settings, warnings) = DisplaySettings::load(store);
        for warning in &warnings {
            notifier.info(warning);
        }
        Self::new(manager, settings, sink, notifier)
    }

    pub fn manager(&self) -> &AvManager {
        &self.manager
    }

    pub fn settings(&self) -> &DisplaySettings {
        &self.settings
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Replaces the settings snapshot (and the derived color maps).
    pub fn reload_settings(&mut self, settings: DisplaySettings) {
        self.colors = ColorResolver::from_json(
            &settings.type_colors_json,
            &settings.type_backgrounds_json,
            &settings.value_colors_json,
        );
        self.settings = settings;
    }

    /// Wires successful edit commits into the scheduler as external triggers.
    pub fn attach_scheduler(&mut self, sender: mpsc::UnboundedSender<HostEvent>) {
        self.scheduler_tx = Some(sender);
    }

    pub fn set_current_doc(&mut self, doc_id: impl Into<String>) {
        self.session.current_doc_id = Some(doc_id.into());
    }

    pub fn set_current_block(&mut self, block_id: impl Into<String>) {
        self.session.current_block_id = Some(block_id.into());
    }

    /// Routes an inbound host event: updates session state where the event
    /// carries it. Scheduling decisions stay in the scheduler.
    pub fn on_host_event(&mut self, event: &HostEvent) {
        if let HostEvent::DocumentSwitched { doc_id } = event {
            self.session.current_doc_id = Some(doc_id.clone());
        }
    }

    /// Handles one refresh cause from the scheduler, then redraws.
    pub async fn handle_refresh(&mut self, cause: RefreshCause) {
        if let RefreshCause::DocumentSwitch(doc_id) = &cause {
            self.session.current_doc_id = Some(doc_id.clone());
        }
        self.redraw().await;
    }

    /// Recomputes and replaces the decoration sets: the document scope
    /// first, then the block scope, strictly sequentially. Failures are
    /// swallowed per scope so one bad document never stops later redraws.
    pub async fn redraw(&self) {
        if let Some(doc_id) = self.session.current_doc_id.clone() {
            let scope = Scope::Document(doc_id);
            if let Err(err) = self
                .refresh_scope(&scope, &self.settings.doc_conditions)
                .await
            {
                warn!(id = scope.id(), %err, "document refresh failed; display left stale");
            }
        }
        if let Some(block_id) = self.session.current_block_id.clone() {
            let scope = Scope::Block(block_id);
            if let Err(err) = self
                .refresh_scope(&scope, &self.settings.block_conditions)
                .await
            {
                warn!(id = scope.id(), %err, "block refresh failed; display left stale");
            }
        }
    }

    /// Fetches, extracts, colorizes, and fully replaces one scope's
    /// decoration set.
    pub async fn refresh_scope(&self, scope: &Scope, conditions: &[Condition]) -> Result<()> {
        let payload = self.manager.fields_for_block(scope.id()).await?;
        let records = extract::extract(
            &payload,
            conditions,
            &self.settings.hidden_fields,
            &self.settings.date_options,
            &self.settings.checkbox_options,
            &self.settings.force_show_fields,
        );
        let decorations: Vec<Decoration> = records
            .into_iter()
            .map(|record| self.decorate(record))
            .collect();
        debug!(id = scope.id(), count = decorations.len(), "redraw");
        self.sink.replace(scope, &decorations);
        Ok(())
    }

    fn decorate(&self, record: DisplayRecord) -> Decoration {
        Decoration {
            label: extract::clip(&record.text, self.settings.max_display_length),
            full_text: record.text.clone(),
            style: self.colors.resolve(record.key_type, &record.text),
            record,
        }
    }

    // ========================================================================
    // Inline editing
    // ========================================================================

    /// Resolves a user activation on a record. Checkbox activations commit
    /// immediately; `Open` results mean the host should present the matching
    /// micro-editor and later call [`commit_edit`](Self::commit_edit) or
    /// [`cancel_edit`](Self::cancel_edit).
    pub async fn activate(
        &mut self,
        record: DisplayRecord,
        block_id: &str,
        activation: Activation,
    ) -> Result<EditAction> {
        let action = crate::edit::activation_action(&record, activation);
        match &action {
            EditAction::Open(crate::edit::EditKind::Checkbox) => {
                self.edit
                    .toggle_checkbox(&self.manager, self.notifier.as_ref(), record, block_id)
                    .await?;
                self.after_commit().await;
            }
            EditAction::Open(_) => {
                self.edit.open(record, block_id)?;
            }
            EditAction::Navigate(_) | EditAction::NotEditable => {}
        }
        Ok(action)
    }

    /// Commits the open edit session. On success the display refreshes and
    /// the scheduler sees an external trigger; on failure the session stays
    /// open for retry and the error is surfaced to the user.
    pub async fn commit_edit(&mut self, input: EditInput) -> Result<()> {
        self.edit
            .commit(&self.manager, self.notifier.as_ref(), input)
            .await?;
        self.after_commit().await;
        Ok(())
    }

    /// Cancels the open edit session, if any.
    pub fn cancel_edit(&mut self) {
        self.edit.cancel();
    }

    pub fn edit_session(&self) -> Option<&crate::edit::EditSession> {
        self.edit.session()
    }

    async fn after_commit(&self) {
        match &self.scheduler_tx {
            // the scheduler redraws (EditCommitted is both an external
            // trigger and a direct redraw cause)
            Some(sender) => {
                let _ = sender.send(HostEvent::EditCommitted);
            }
            None => self.redraw().await,
        }
    }
}
