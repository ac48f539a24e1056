//! Point editor sessions
//!
//! A session stages manual edits of one channel inside a time window. It
//! keeps its own undo and redo stacks and reports progress through
//! [`SessionEvent`]s on a crossbeam channel. Committed actions are handed
//! back to the caller, or applied straight to a
//! [`TraceModel`](crate::trace::TraceModel) with
//! [`PointEditorSession::commit_into`].

pub mod editor;
pub mod types;

pub use editor::PointEditorSession;
pub use types::{SelectionMode, SessionEvent, SessionState, SessionSummary, SessionWarning};
