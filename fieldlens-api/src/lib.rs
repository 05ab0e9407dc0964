/*
 * Fieldlens attribute-view display engine
 *
 * SPDX-License-Identifier: Apache-2.0
 */
//! # Fieldlens
//!
//! Live attribute-view (database) field summaries for note-taking hosts:
//! fetch the fields linked to the visible document, extract and format the
//! interesting values, colorize them, and keep the result fresh as the user
//! edits — with click-to-edit write-back through the host's REST API.
//!
//! ## Features
//!
//! - typed client over the host's `/api/av/` JSON endpoint surface
//! - field metadata caching with TTL and mutation invalidation
//! - pure extraction/formatting pipeline (conditions, hidden fields,
//!   force-show placeholders, date ranges, checkbox glyphs, truncation)
//! - per-type and per-value color resolution from user config
//! - refresh scheduling with poll/sleep throttling and debounced
//!   widget-appearance observation
//! - typed inline-edit commit path
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use fieldlens::prelude::*;
//!
//! # async fn example(sink: Arc<dyn DecorationSink>) -> Result<(), LensError> {
//! let manager = AvManager::connect("http://127.0.0.1:6806");
//!
//! // Inspect an attribute view
//! let fields = manager.fields("20240101120000-avvvvvv").await?;
//! for field in &fields {
//!     println!("{} ({})", field.name, field.field_type);
//! }
//!
//! // Drive the display controller directly
//! let mut lens = FieldLens::new(
//!     manager,
//!     DisplaySettings::default(),
//!     sink,
//!     Arc::new(NullNotifier),
//! );
//! lens.set_current_doc("20240101120000-docdddd");
//! lens.redraw().await;
//! # Ok(())
//! # }
//! ```
//!
//! The host-facing seams ([`host::DecorationSink`], [`host::Notifier`],
//! [`host::HostEvent`]) replace the browser plugin surface this engine grew
//! out of: rendering and event capture stay with the embedder, everything
//! between stays here.

#![warn(clippy::default_trait_access)]
#![warn(clippy::doc_markdown)]
#![warn(clippy::explicit_iter_loop)]
#![warn(clippy::implicit_clone)]
#![warn(clippy::match_same_arms)]
#![warn(clippy::redundant_clone)]
#![warn(clippy::redundant_closure)]
#![warn(clippy::uninlined_format_args)]

pub mod cache;
pub mod color;
pub mod edit;
pub mod error;
pub mod extract;
pub mod fields;
pub mod host;
pub mod http;
pub mod lens;
pub mod manager;
pub mod schedule;
pub mod settings;
pub mod values;

/// Result type alias using `LensError` as the default error.
pub type Result<T, E = crate::error::LensError> = std::result::Result<T, E>;

/// Prelude module - import (nearly) all the things with `use fieldlens::prelude::*;`
pub mod prelude {
    pub use crate::error::LensError;
    pub use crate::{
        // Field cache
        cache::KeyCache,
        // Color resolution
        color::{ColorResolver, Style},
        // Inline editing
        edit::{Activation, EditAction, EditController, EditInput, EditKind},
        // Extraction pipeline
        extract::{
            CheckboxOptions, CheckboxStyle, Condition, DateOptions, DisplayRecord, RawValue,
            clip, extract,
        },
        // Schema types
        fields::{AttributeView, Field, FieldType, LayoutType, SelectOption, View, ViewGroup},
        // Host seams
        host::{
            Decoration, DecorationSink, HostEvent, Notifier, NullNotifier, Scope, SessionState,
        },
        // Transport
        http::{RemoteClient, RemoteOptions, Transport},
        // Display controller
        lens::FieldLens,
        // Attribute view operations
        manager::{AvHandle, AvManager, CellOutcome, CellUpdate, DuplicatedBlock, generate_id},
        // Refresh scheduling
        schedule::{PollPolicy, PollState, RefreshCause, RefreshScheduler},
        // Configuration
        settings::{DisplaySettings, SettingsStore},
        // Value types
        values::{AvKeyValues, CellValue, ItemValue, KeyValues, KeyedCellValue, RowSource},
    };
}

/// Tunables and wire constants.
pub mod config {
    /// Path prefix of the attribute-view endpoint namespace.
    pub const AV_API_PREFIX: &str = "/api/av/";

    /// Bound on each backend round trip.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// Max characters of a malformed body kept for diagnostics.
    pub const BODY_PREVIEW_MAX_CHARS: usize = 200;

    /// Field cache lifetime.
    pub const KEY_CACHE_TTL_SECS: u64 = 60;

    /// Page size used when the caller doesn't page explicitly.
    pub const DEFAULT_PAGE_SIZE: u64 = 99999;

    /// Name given to fields created without one.
    pub const DEFAULT_FIELD_NAME: &str = "New Field";

    /// Minimum poll interval; configured values 1-4 are raised to this.
    pub const POLL_INTERVAL_MIN_SECS: u64 = 5;

    /// Consecutive externally-untriggered poll ticks before sleeping.
    pub const POLL_SLEEP_AFTER_RUNS: u32 = 10;

    /// Coalescing window for widget-appearance observations.
    pub const WIDGET_DEBOUNCE_MS: u64 = 50;

    /// Display label truncation limits.
    pub const MAX_DISPLAY_LEN_FLOOR: usize = 10;
    pub const MAX_DISPLAY_LEN_CEILING: usize = 200;
    pub const MAX_DISPLAY_LEN_DEFAULT: usize = 30;

    /// Longest accepted field name in hidden/force-show lists.
    pub const MAX_FIELD_NAME_LEN: usize = 50;
}
