//! Point editor session types

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Channel;

/// Whether a session holds uncommitted edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No pending actions
    #[default]
    Idle,
    /// At least one pending action
    Dirty,
}

impl SessionState {
    pub fn is_dirty(&self) -> bool {
        matches!(self, SessionState::Dirty)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Dirty => "Unsaved edits",
        }
    }
}

/// How a new pick combines with the current selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Replace the selection (plain click)
    #[default]
    Replace,
    /// Add to the selection (shift)
    Additive,
    /// Flip membership of each picked index (ctrl)
    Toggle,
}

/// Non-fatal condition raised while editing
#[derive(Debug, Clone, PartialEq)]
pub enum SessionWarning {
    /// The edited span is longer than the configured limit
    LongSpan { seconds: f64 },
    /// A single deletion removes more than the configured share of the trace
    LargeDeletion { fraction: f64 },
    /// A connect edit touched the trace edge and was blanked instead
    ConnectFallback,
}

impl fmt::Display for SessionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionWarning::LongSpan { seconds } => write!(
                f,
                "You are editing a segment of {:.1} s. Consider leaving a gap.",
                seconds
            ),
            SessionWarning::LargeDeletion { fraction } => write!(
                f,
                "Large deletion: {:.1}% of the trace is selected.",
                fraction * 100.0
            ),
            SessionWarning::ConnectFallback => {
                write!(f, "Connect fallback: segment touches trace edge.")
            }
        }
    }
}

/// Notification sent to whoever renders the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The working series changed
    DataChanged,
    SelectionChanged,
    UndoRedoChanged { can_undo: bool, can_redo: bool },
    Warning(SessionWarning),
}

/// Totals over the pending actions of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub channel: Channel,
    /// Points touched by pending actions (overlaps count twice)
    pub point_count: usize,
    /// `point_count` over the trace length, as a fraction
    pub percent_of_trace: f64,
    pub action_count: usize,
    /// Earliest and latest edited time, or the session window when idle
    pub time_bounds: (f64, f64),
}
