//! Undoable point editing over one channel and time window
//!
//! A [`PointEditorSession`] copies one channel out of a [`TraceModel`] and
//! stages edits against that copy. Nothing reaches the model until the
//! pending actions are committed. Undo always rebuilds the working series
//! from the committed base by replaying the surviving actions; redo applies
//! the restored action on top.

use std::collections::BTreeSet;

use crossbeam_channel::{bounded, Receiver, Sender};

use super::types::{SelectionMode, SessionEvent, SessionState, SessionSummary, SessionWarning};
use crate::audit::{EditAction, EditParams, Fallback};
use crate::config::EditorSettings;
use crate::error::Result;
use crate::trace::bridge::find_neighbor;
use crate::trace::edit::{apply_edit, blank, EditOutcome};
use crate::trace::TraceModel;
use crate::types::{Channel, ConnectMethod, EditOp};

/// Queued notifications kept before new ones are dropped
const EVENT_QUEUE_CAPACITY: usize = 256;

/// Staging area for manual edits of one channel
#[derive(Debug)]
pub struct PointEditorSession {
    channel: Channel,
    settings: EditorSettings,
    connect_method: ConnectMethod,
    time_window: (f64, f64),

    time: Vec<f64>,
    raw: Vec<f64>,
    base_clean: Vec<f64>,
    working_clean: Vec<f64>,
    visible: Vec<usize>,

    selection: BTreeSet<usize>,
    pending: Vec<EditAction>,
    redo_stack: Vec<EditAction>,

    event_tx: Sender<SessionEvent>,
    event_rx: Receiver<SessionEvent>,
    dropped_events: usize,
}

impl PointEditorSession {
    /// Open a session on `channel` of `model`, showing `time_window`.
    ///
    /// The window bounds may be given in either order. When no sample falls
    /// inside the window every sample is visible.
    pub fn new(
        model: &TraceModel,
        channel: Channel,
        time_window: (f64, f64),
        settings: &EditorSettings,
    ) -> Result<Self> {
        let raw = model.raw(channel)?.to_vec();
        let base_clean = model.clean(channel)?.to_vec();
        let time = model.time_full().to_vec();

        let (lo, hi) = if time_window.0 <= time_window.1 {
            time_window
        } else {
            (time_window.1, time_window.0)
        };
        let mut visible: Vec<usize> = (0..time.len())
            .filter(|&i| time[i] >= lo && time[i] <= hi)
            .collect();
        if visible.is_empty() {
            visible = (0..time.len()).collect();
        }

        tracing::debug!(
            "Opened {} editor over [{}, {}] with {} visible samples",
            channel,
            lo,
            hi,
            visible.len()
        );

        let (event_tx, event_rx) = bounded(EVENT_QUEUE_CAPACITY);
        Ok(Self {
            channel,
            connect_method: settings.connect_method,
            settings: settings.clone(),
            time_window: (lo, hi),
            time,
            raw,
            working_clean: base_clean.clone(),
            base_clean,
            visible,
            selection: BTreeSet::new(),
            pending: Vec::new(),
            redo_stack: Vec::new(),
            event_tx,
            event_rx,
            dropped_events: 0,
        })
    }

    // ==================== Accessors ====================

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Short label, `ID` or `OD`
    pub fn channel_label(&self) -> &'static str {
        self.channel.label()
    }

    pub fn time_window(&self) -> (f64, f64) {
        self.time_window
    }

    pub fn connect_method(&self) -> ConnectMethod {
        self.connect_method
    }

    /// Method used by [`connect_selection`](Self::connect_selection) when
    /// the call does not name one
    pub fn set_connect_method(&mut self, method: ConnectMethod) {
        self.connect_method = method;
    }

    pub fn state(&self) -> SessionState {
        if self.pending.is_empty() {
            SessionState::Idle
        } else {
            SessionState::Dirty
        }
    }

    pub fn action_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_actions(&self) -> &[EditAction] {
        &self.pending
    }

    pub fn can_undo(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn visible_indices(&self) -> &[usize] {
        &self.visible
    }

    pub fn visible_times(&self) -> Vec<f64> {
        self.visible.iter().map(|&i| self.time[i]).collect()
    }

    pub fn visible_raw(&self) -> Vec<f64> {
        self.visible.iter().map(|&i| self.raw[i]).collect()
    }

    pub fn visible_clean(&self) -> Vec<f64> {
        self.visible.iter().map(|&i| self.working_clean[i]).collect()
    }

    /// Full-length preview with the pending actions applied
    pub fn working_clean(&self) -> &[f64] {
        &self.working_clean
    }

    /// Receiver for session notifications. Every clone shares one queue.
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.event_rx.clone()
    }

    /// Notifications discarded because the queue was full
    pub fn dropped_events(&self) -> usize {
        self.dropped_events
    }

    // ==================== Selection ====================

    /// Selected sample indices in ascending order
    pub fn selection(&self) -> Vec<usize> {
        self.selection.iter().copied().collect()
    }

    pub fn has_selection(&self) -> bool {
        !self.selection.is_empty()
    }

    /// Time of the first and last selected sample
    pub fn selection_bounds(&self) -> Option<(f64, f64)> {
        let first = *self.selection.first()?;
        let last = *self.selection.last()?;
        Some((self.time[first], self.time[last]))
    }

    pub fn clear_selection(&mut self) {
        if self.selection.is_empty() {
            return;
        }
        self.selection.clear();
        self.emit(SessionEvent::SelectionChanged);
    }

    /// Combine `indices` with the selection.
    ///
    /// Indices past the end of the trace are ignored. An empty pick leaves
    /// the selection unchanged, even in [`SelectionMode::Replace`].
    pub fn set_selection(&mut self, indices: impl IntoIterator<Item = usize>, mode: SelectionMode) {
        let len = self.time.len();
        let picked: BTreeSet<usize> = indices.into_iter().filter(|&i| i < len).collect();
        if picked.is_empty() {
            return;
        }
        match mode {
            SelectionMode::Replace => self.selection = picked,
            SelectionMode::Additive => self.selection.extend(picked),
            SelectionMode::Toggle => {
                for index in picked {
                    if !self.selection.remove(&index) {
                        self.selection.insert(index);
                    }
                }
            }
        }
        self.emit(SessionEvent::SelectionChanged);
    }

    /// Pick the visible sample closest to time `x`
    pub fn select_nearest(&mut self, x: f64, mode: SelectionMode) -> Option<usize> {
        let nearest = self
            .visible
            .iter()
            .copied()
            .min_by(|&a, &b| (self.time[a] - x).abs().total_cmp(&(self.time[b] - x).abs()))?;
        self.set_selection([nearest], mode);
        Some(nearest)
    }

    /// Pick the visible samples whose raw value lies inside the box.
    ///
    /// Corners may be given in any order. Returns the number of samples
    /// picked.
    pub fn select_box(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, mode: SelectionMode) -> usize {
        let (xmin, xmax) = (x0.min(x1), x0.max(x1));
        let (ymin, ymax) = (y0.min(y1), y0.max(y1));
        let picked: Vec<usize> = self
            .visible
            .iter()
            .copied()
            .filter(|&i| {
                let (t, v) = (self.time[i], self.raw[i]);
                t >= xmin && t <= xmax && v >= ymin && v <= ymax
            })
            .collect();
        let count = picked.len();
        self.set_selection(picked, mode);
        count
    }

    // ==================== Operations ====================

    /// Blank the selected samples
    pub fn delete_selection(&mut self) -> Option<EditAction> {
        self.apply_operation(EditOp::DeletePoints, None)
    }

    /// Copy raw values back over the selected samples
    pub fn restore_selection(&mut self) -> Option<EditAction> {
        self.apply_operation(EditOp::RestorePoints, None)
    }

    /// Bridge the selected samples between their nearest valid neighbors
    pub fn connect_selection(&mut self, method: Option<ConnectMethod>) -> Option<EditAction> {
        let method = method.unwrap_or(self.connect_method);
        self.apply_operation(EditOp::ConnectAcross, Some(method))
    }

    fn apply_operation(&mut self, op: EditOp, method: Option<ConnectMethod>) -> Option<EditAction> {
        let indices = self.selection();
        let (&first, &last) = (indices.first()?, indices.last()?);

        let span = self.time[last] - self.time[first];
        if span > self.settings.long_span_seconds {
            self.warn(SessionWarning::LongSpan { seconds: span });
        }
        let fraction = indices.len() as f64 / self.time.len().max(1) as f64;
        if op == EditOp::DeletePoints && fraction > self.settings.large_delete_fraction {
            self.warn(SessionWarning::LargeDeletion { fraction });
        }

        let mut params = EditParams::default();
        if op == EditOp::ConnectAcross {
            params = EditParams::connect(method.unwrap_or_default());
            let left = find_neighbor(&self.working_clean, first as isize - 1, -1, &indices);
            let right = find_neighbor(&self.working_clean, last as isize + 1, 1, &indices);
            if left.is_none() || right.is_none() {
                params = params.with_fallback(Fallback::Nan);
                self.warn(SessionWarning::ConnectFallback);
            }
        }

        let action = EditAction::new(
            self.channel,
            op,
            indices,
            (self.time[first], self.time[last]),
        )
        .with_params(params);

        self.apply_to_working(&action);
        self.pending.push(action.clone());
        self.redo_stack.clear();
        self.emit(SessionEvent::DataChanged);
        self.emit_undo_redo();
        Some(action)
    }

    fn apply_to_working(&mut self, action: &EditAction) {
        if action.op() == EditOp::ConnectAcross && action.params().fallback.is_some() {
            blank(&mut self.working_clean, action);
            return;
        }
        let outcome = apply_edit(&self.time, &self.raw, &mut self.working_clean, action);
        if outcome == EditOutcome::NanFallback {
            self.warn(SessionWarning::ConnectFallback);
        }
    }

    // ==================== Undo / redo ====================

    pub fn undo(&mut self) -> Option<EditAction> {
        let action = self.pending.pop()?;
        self.redo_stack.push(action.clone());
        self.rebuild_working();
        self.emit(SessionEvent::DataChanged);
        self.emit_undo_redo();
        Some(action)
    }

    pub fn redo(&mut self) -> Option<EditAction> {
        let action = self.redo_stack.pop()?;
        self.apply_to_working(&action);
        self.pending.push(action.clone());
        self.emit(SessionEvent::DataChanged);
        self.emit_undo_redo();
        Some(action)
    }

    fn rebuild_working(&mut self) {
        self.working_clean.clone_from(&self.base_clean);
        let pending = std::mem::take(&mut self.pending);
        for action in &pending {
            self.apply_to_working(action);
        }
        self.pending = pending;
    }

    // ==================== Lifecycle ====================

    /// Discard all pending edits
    pub fn reset(&mut self) {
        self.pending.clear();
        self.redo_stack.clear();
        self.working_clean.clone_from(&self.base_clean);
        self.emit(SessionEvent::DataChanged);
        self.emit_undo_redo();
    }

    /// Fold the pending edits into the session base and hand them over
    pub fn commit(&mut self) -> Vec<EditAction> {
        let actions = std::mem::take(&mut self.pending);
        if !actions.is_empty() {
            self.base_clean.clone_from(&self.working_clean);
            tracing::info!(
                "Committed {} edit actions on {}",
                actions.len(),
                self.channel
            );
        }
        self.redo_stack.clear();
        self.emit_undo_redo();
        actions
    }

    /// Apply the pending edits to `model`, then commit.
    ///
    /// If the model rejects the batch the session is left unchanged.
    pub fn commit_into(&mut self, model: &mut TraceModel) -> Result<Vec<EditAction>> {
        model.apply_actions(&self.pending, true)?;
        Ok(self.commit())
    }

    /// Totals over the pending actions
    pub fn summary(&self) -> SessionSummary {
        let point_count: usize = self.pending.iter().map(EditAction::count).sum();
        let time_bounds = if self.pending.is_empty() {
            self.time_window
        } else {
            self.pending.iter().fold(
                (f64::INFINITY, f64::NEG_INFINITY),
                |(lo, hi), action| {
                    let (t0, t1) = action.t_bounds();
                    (lo.min(t0), hi.max(t1))
                },
            )
        };
        SessionSummary {
            channel: self.channel,
            point_count,
            percent_of_trace: point_count as f64 / self.time.len().max(1) as f64,
            action_count: self.pending.len(),
            time_bounds,
        }
    }

    // ==================== Notifications ====================

    fn emit(&mut self, event: SessionEvent) {
        if self.event_tx.try_send(event).is_err() {
            self.dropped_events += 1;
        }
    }

    fn emit_undo_redo(&mut self) {
        self.emit(SessionEvent::UndoRedoChanged {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        });
    }

    fn warn(&mut self, warning: SessionWarning) {
        tracing::warn!("{} editor: {}", self.channel, warning);
        self.emit(SessionEvent::Warning(warning));
    }
}
