//! Trace model: raw and clean series, LOD pyramid and edit history
//!
//! The model is the single source of truth for one recording. The raw
//! arrays never change after construction; the clean arrays are the raw
//! arrays with the edit log replayed on top. Every mutation clears the
//! window cache, and a rebuild regenerates the whole pyramid from the clean
//! arrays so the next window query reflects the edit.

use std::cmp::Ordering;
use std::sync::Arc;

use super::cache::{WindowCache, WindowKey};
use super::edit::{apply_edit, check_bounds, EditOutcome};
use super::lod::{build_pyramid, LodLevel};
use super::window::TraceWindow;
use crate::audit::EditAction;
use crate::config::LodSettings;
use crate::error::{Result, TraceError};
use crate::types::Channel;

/// Extra points sliced on each side of a window for line continuity
const WINDOW_MARGIN: usize = 1;

/// Raw and clean arrays for one channel
#[derive(Debug, Clone)]
struct ChannelSeries {
    raw: Vec<f64>,
    clean: Vec<f64>,
}

impl ChannelSeries {
    fn reset(&mut self) {
        self.clean.clone_from(&self.raw);
    }
}

/// Builder for [`TraceModel`]
#[derive(Debug, Clone)]
pub struct TraceModelBuilder {
    time: Vec<f64>,
    inner: Vec<f64>,
    outer: Option<Vec<f64>>,
    inner_raw: Option<Vec<f64>>,
    outer_raw: Option<Vec<f64>>,
    settings: LodSettings,
    edit_actions: Vec<EditAction>,
    cached_levels: Option<Vec<LodLevel>>,
}

impl TraceModelBuilder {
    /// Start from a time axis and the clean inner diameter
    pub fn new(time: Vec<f64>, inner: Vec<f64>) -> Self {
        Self {
            time,
            inner,
            outer: None,
            inner_raw: None,
            outer_raw: None,
            settings: LodSettings::default(),
            edit_actions: Vec::new(),
            cached_levels: None,
        }
    }

    /// Clean outer diameter
    pub fn outer(mut self, outer: Vec<f64>) -> Self {
        self.outer = Some(outer);
        self
    }

    /// Raw inner diameter; defaults to the clean values
    pub fn inner_raw(mut self, raw: Vec<f64>) -> Self {
        self.inner_raw = Some(raw);
        self
    }

    /// Raw outer diameter; defaults to the clean values
    pub fn outer_raw(mut self, raw: Vec<f64>) -> Self {
        self.outer_raw = Some(raw);
        self
    }

    pub fn base_factor(mut self, base_factor: usize) -> Self {
        self.settings.base_factor = base_factor;
        self
    }

    pub fn max_points_per_level(mut self, max_points: usize) -> Self {
        self.settings.max_points_per_level = max_points;
        self
    }

    pub fn lod_settings(mut self, settings: LodSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Edit log to replay over the raw series
    pub fn edit_actions(mut self, actions: Vec<EditAction>) -> Self {
        self.edit_actions = actions;
        self
    }

    /// Previously built levels (e.g. from a sidecar file).
    ///
    /// Used only when no edit actions are replayed and the levels match the
    /// series; otherwise the pyramid is rebuilt.
    pub fn cached_levels(mut self, levels: Vec<LodLevel>) -> Self {
        self.cached_levels = Some(levels);
        self
    }

    /// Validate, sort by time and build the pyramid
    pub fn build(self) -> Result<TraceModel> {
        let TraceModelBuilder {
            time,
            inner,
            outer,
            inner_raw,
            outer_raw,
            settings,
            edit_actions,
            cached_levels,
        } = self;

        let n = time.len();
        if inner.len() != n {
            return Err(TraceError::Validation(format!(
                "time and inner arrays must have the same length ({} vs {})",
                n,
                inner.len()
            )));
        }
        check_len("outer", outer.as_deref(), n)?;
        check_len("inner_raw", inner_raw.as_deref(), n)?;
        check_len("outer_raw", outer_raw.as_deref(), n)?;

        let order = sort_order(&time);
        let order = order.as_deref();

        let inner_clean = permute(inner, order);
        let inner = ChannelSeries {
            raw: inner_raw
                .map(|raw| permute(raw, order))
                .unwrap_or_else(|| inner_clean.clone()),
            clean: inner_clean,
        };

        let outer = match (outer, outer_raw) {
            (Some(clean), raw) => {
                let clean = permute(clean, order);
                Some(ChannelSeries {
                    raw: raw
                        .map(|raw| permute(raw, order))
                        .unwrap_or_else(|| clean.clone()),
                    clean,
                })
            }
            // Raw outer without a clean channel becomes the clean baseline
            (None, Some(raw)) => {
                let raw = permute(raw, order);
                Some(ChannelSeries {
                    clean: raw.clone(),
                    raw,
                })
            }
            (None, None) => None,
        };

        let settings = settings.sanitized();
        let mut model = TraceModel {
            time: permute(time, order),
            inner,
            outer,
            cache: WindowCache::new(settings.window_cache_limit),
            settings,
            levels: Vec::new(),
            edit_log: Vec::new(),
        };

        if !edit_actions.is_empty() {
            model.replay_actions(&edit_actions, true)?;
        } else if let Some(levels) = cached_levels.filter(|levels| model.accepts_levels(levels)) {
            tracing::debug!("Using {} cached LOD levels", levels.len());
            model.levels = levels;
        } else {
            model.rebuild_levels();
        }

        Ok(model)
    }
}

fn check_len(name: &str, values: Option<&[f64]>, expected: usize) -> Result<()> {
    match values {
        Some(values) if values.len() != expected => Err(TraceError::Validation(format!(
            "{} array must match the time axis ({} vs {})",
            name,
            values.len(),
            expected
        ))),
        _ => Ok(()),
    }
}

/// Stable ascending permutation of `time`, or `None` if already sorted
fn sort_order(time: &[f64]) -> Option<Vec<usize>> {
    let sorted = time
        .windows(2)
        .all(|pair| pair[0].total_cmp(&pair[1]) != Ordering::Greater);
    if sorted {
        return None;
    }
    let mut order: Vec<usize> = (0..time.len()).collect();
    order.sort_by(|&a, &b| time[a].total_cmp(&time[b]));
    Some(order)
}

fn permute(values: Vec<f64>, order: Option<&[usize]>) -> Vec<f64> {
    match order {
        Some(order) => order.iter().map(|&i| values[i]).collect(),
        None => values,
    }
}

/// Trace data with level-of-detail windowing and edit replay
#[derive(Debug)]
pub struct TraceModel {
    time: Vec<f64>,
    inner: ChannelSeries,
    outer: Option<ChannelSeries>,
    settings: LodSettings,
    levels: Vec<LodLevel>,
    cache: WindowCache,
    edit_log: Vec<EditAction>,
}

impl TraceModel {
    /// Build a model with default pyramid settings
    pub fn new(time: Vec<f64>, inner: Vec<f64>, outer: Option<Vec<f64>>) -> Result<Self> {
        let builder = TraceModelBuilder::new(time, inner);
        match outer {
            Some(outer) => builder.outer(outer).build(),
            None => builder.build(),
        }
    }

    pub fn builder(time: Vec<f64>, inner: Vec<f64>) -> TraceModelBuilder {
        TraceModelBuilder::new(time, inner)
    }

    // ==================== Accessors ====================

    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    /// Sorted time axis
    pub fn time_full(&self) -> &[f64] {
        &self.time
    }

    /// Clean inner diameter
    pub fn inner_full(&self) -> &[f64] {
        &self.inner.clean
    }

    pub fn inner_raw(&self) -> &[f64] {
        &self.inner.raw
    }

    /// Clean outer diameter, if present
    pub fn outer_full(&self) -> Option<&[f64]> {
        self.outer.as_ref().map(|s| s.clean.as_slice())
    }

    pub fn outer_raw(&self) -> Option<&[f64]> {
        self.outer.as_ref().map(|s| s.raw.as_slice())
    }

    pub fn has_outer(&self) -> bool {
        self.outer.is_some()
    }

    /// Clean series of a channel
    pub fn clean(&self, channel: Channel) -> Result<&[f64]> {
        Ok(&self.series(channel)?.clean)
    }

    /// Raw series of a channel
    pub fn raw(&self, channel: Channel) -> Result<&[f64]> {
        Ok(&self.series(channel)?.raw)
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// First and last sample time
    pub fn full_range(&self) -> Option<(f64, f64)> {
        Some((*self.time.first()?, *self.time.last()?))
    }

    pub fn settings(&self) -> &LodSettings {
        &self.settings
    }

    pub fn edit_log(&self) -> &[EditAction] {
        &self.edit_log
    }

    /// Total samples touched by the edit log (overlaps count twice)
    pub fn edited_point_count(&self) -> usize {
        self.edit_log.iter().map(EditAction::count).sum()
    }

    /// Edited points as a fraction of the trace length
    pub fn edited_fraction(&self) -> f64 {
        self.edited_point_count() as f64 / self.len().max(1) as f64
    }

    // ==================== LOD ====================

    /// Regenerate every level from the clean arrays
    pub fn rebuild_levels(&mut self) {
        self.levels = build_pyramid(
            &self.time,
            &self.inner.clean,
            self.outer.as_ref().map(|s| s.clean.as_slice()),
            self.settings.base_factor,
            self.settings.max_points_per_level,
        );
        self.clear_cache();
        tracing::debug!(
            "Rebuilt LOD pyramid: {} levels over {} samples",
            self.levels.len(),
            self.time.len()
        );
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cached_window_count(&self) -> usize {
        self.cache.len()
    }

    /// Whether `(level, x0, x1)` has a cached window
    pub fn is_window_cached(&self, level_index: usize, x0: f64, x1: f64) -> bool {
        self.cache.contains(&WindowKey::new(level_index, x0, x1))
    }

    /// Finest level that draws at most about two points per pixel over
    /// `[x0, x1]`.
    ///
    /// The budget is `max(2 * pixel_width, min_points_per_window)`. A
    /// non-positive width selects level 0.
    pub fn best_level_for_window(&self, x0: f64, x1: f64, pixel_width: i32) -> usize {
        if pixel_width <= 0 {
            return 0;
        }
        let desired = (pixel_width as usize * 2).max(self.settings.min_points_per_window);
        self.levels
            .iter()
            .position(|level| level.count_in_range(x0, x1) <= desired)
            .unwrap_or_else(|| self.levels.len().saturating_sub(1))
    }

    /// Slice of `level_index` covering `[x0, x1]`, served from the cache
    /// when this exact request was made before
    pub fn window(&mut self, level_index: usize, x0: f64, x1: f64) -> Arc<TraceWindow> {
        let key = WindowKey::new(level_index, x0, x1);
        if let Some(window) = self.cache.get(&key) {
            return window;
        }

        let level_index = level_index.min(self.levels.len().saturating_sub(1));
        let window = Arc::new(
            self.levels
                .get(level_index)
                .map(|level| level.window(x0, x1, WINDOW_MARGIN))
                .unwrap_or_default(),
        );
        self.cache.insert(key, Arc::clone(&window));
        window
    }

    // ==================== Editing ====================

    /// Apply new actions on top of the current clean arrays and append them
    /// to the log.
    ///
    /// All actions are validated before any is applied. With
    /// `rebuild = false` only the window cache is cleared; call
    /// [`rebuild_levels`](Self::rebuild_levels) after the last batch.
    pub fn apply_actions(&mut self, actions: &[EditAction], rebuild: bool) -> Result<()> {
        if actions.is_empty() {
            return Ok(());
        }
        for action in actions {
            self.validate_action(action)?;
        }
        for action in actions {
            self.apply_validated(action);
            self.edit_log.push(action.clone());
        }
        tracing::info!(
            "Applied {} edit actions ({} in log)",
            actions.len(),
            self.edit_log.len()
        );
        self.finish_edit(rebuild);
        Ok(())
    }

    /// Reset the clean arrays to raw and replay `actions`, replacing the log
    pub fn replay_actions(&mut self, actions: &[EditAction], rebuild: bool) -> Result<()> {
        for action in actions {
            self.validate_action(action)?;
        }
        self.replay_validated(actions.to_vec());
        tracing::info!("Replayed edit log of {} actions", self.edit_log.len());
        self.finish_edit(rebuild);
        Ok(())
    }

    /// Drop the whole log and restore the raw data
    pub fn clear_actions(&mut self, rebuild: bool) {
        self.replay_validated(Vec::new());
        self.finish_edit(rebuild);
    }

    /// Remove the last `count` actions by replaying the rest; returns the
    /// removed actions in log order
    pub fn pop_actions(&mut self, count: usize, rebuild: bool) -> Vec<EditAction> {
        if count == 0 || self.edit_log.is_empty() {
            return Vec::new();
        }
        let keep = self.edit_log.len() - count.min(self.edit_log.len());
        let mut remaining = std::mem::take(&mut self.edit_log);
        let removed = remaining.split_off(keep);
        self.replay_validated(remaining);
        self.finish_edit(rebuild);
        removed
    }

    fn finish_edit(&mut self, rebuild: bool) {
        if rebuild {
            self.rebuild_levels();
        } else {
            self.clear_cache();
        }
    }

    fn validate_action(&self, action: &EditAction) -> Result<()> {
        let series = self.series(action.channel())?;
        check_bounds(action, series.clean.len())
    }

    fn replay_validated(&mut self, actions: Vec<EditAction>) {
        self.inner.reset();
        if let Some(outer) = self.outer.as_mut() {
            outer.reset();
        }
        for action in &actions {
            self.apply_validated(action);
        }
        self.edit_log = actions;
    }

    fn apply_validated(&mut self, action: &EditAction) {
        let series = match action.channel() {
            Channel::Inner => &mut self.inner,
            Channel::Outer => match self.outer.as_mut() {
                Some(series) => series,
                None => return,
            },
        };
        let outcome = apply_edit(&self.time, &series.raw, &mut series.clean, action);
        if outcome == EditOutcome::NanFallback {
            tracing::debug!(
                "Connect across {} points on {} touches the trace edge, blanked instead",
                action.count(),
                action.channel()
            );
        }
        self.cache.clear();
    }

    fn series(&self, channel: Channel) -> Result<&ChannelSeries> {
        match channel {
            Channel::Inner => Ok(&self.inner),
            Channel::Outer => self
                .outer
                .as_ref()
                .ok_or(TraceError::ChannelUnavailable(Channel::Outer)),
        }
    }

    fn accepts_levels(&self, levels: &[LodLevel]) -> bool {
        levels.first().is_some_and(|base| {
            base.len() == self.time.len() && base.outer.is_some() == self.outer.is_some()
        }) && levels.iter().all(LodLevel::is_consistent)
    }
}
