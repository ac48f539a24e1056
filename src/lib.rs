//! # vaso-trace: diameter trace engine for VasoAnalyzer
//!
//! Data model behind the trace plot and the manual point editor. A recording
//! is a time axis plus an inner diameter series and, optionally, an outer
//! one. Each channel keeps its raw series untouched and a clean series
//! derived from it by replaying an audit log of manual edits.
//!
//! ## Architecture
//!
//! - **Trace**: [`TraceModel`] sorts and stores the series, builds a
//!   min/max/mean level-of-detail pyramid and serves cached windows of it
//! - **Audit**: [`EditAction`] records one edit and round-trips through the
//!   JSON form stored in project files
//! - **Session**: [`PointEditorSession`] stages undoable edits of one channel
//!   before they are committed to the model
//! - **Sidecar**: [`save_lod`] / [`load_lod`] persist a built pyramid next to
//!   the trace file so large recordings open without a rebuild
//!
//! Deleted samples are stored as NaN. Use [`is_valid`] to test for a present
//! sample.
//!
//! ## Configuration
//!
//! Engine settings live in `config.toml` under the platform data directory,
//! in `org.vasoanalyzer.vaso-trace/`:
//!
//! - **Linux**: `~/.local/share/org.vasoanalyzer.vaso-trace/`
//! - **macOS**: `~/Library/Application Support/org.vasoanalyzer.vaso-trace/`
//! - **Windows**: `%APPDATA%\org.vasoanalyzer.vaso-trace\`
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and never installs a subscriber; the
//! host application decides where they go.
//!
//! ## Example
//!
//! ```
//! use vaso_trace::{Channel, EditorSettings, PointEditorSession, SelectionMode, TraceModel};
//!
//! let time: Vec<f64> = (0..1000).map(|i| i as f64 * 0.01).collect();
//! let inner: Vec<f64> = time.iter().map(|t| 100.0 + t.sin()).collect();
//! let mut model = TraceModel::new(time, inner, None)?;
//!
//! // Pick the pyramid level for a 400 px wide plot of the first 5 s
//! let level = model.best_level_for_window(0.0, 5.0, 400);
//! let window = model.window(level, 0.0, 5.0);
//! assert!(!window.is_empty());
//!
//! // Blank a spike and bridge it
//! let mut session =
//!     PointEditorSession::new(&model, Channel::Inner, (1.0, 2.0), &EditorSettings::default())?;
//! session.set_selection([150, 151, 152], SelectionMode::Replace);
//! session.delete_selection();
//! session.connect_selection(None);
//! session.commit_into(&mut model)?;
//! assert_eq!(model.edit_log().len(), 2);
//! # Ok::<(), vaso_trace::TraceError>(())
//! ```

pub mod audit;
pub mod config;
pub mod error;
pub mod session;
pub mod trace;
pub mod types;

// Re-export commonly used types
pub use audit::{deserialize_edit_log, serialize_edit_log, EditAction, EditParams, Fallback};
pub use config::{EditorSettings, EngineConfig, LodSettings};
pub use error::{Result, ResultExt, TraceError};
pub use session::{PointEditorSession, SelectionMode, SessionEvent, SessionSummary, SessionWarning};
pub use trace::{
    load_lod, lod_sidecar_path, save_lod, LodLevel, TraceModel, TraceModelBuilder, TraceTable,
    TraceWindow,
};
pub use types::{is_valid, Channel, ConnectMethod, EditOp};
