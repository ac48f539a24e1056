//! Tunable settings for the LOD engine and the point editor
//!
//! # Main Types
//!
//! - [`LodSettings`] - Pyramid shape and window cache size
//! - [`EditorSettings`] - Point editor defaults and warning thresholds

use serde::{Deserialize, Serialize};

use crate::types::ConnectMethod;

/// Default downsampling multiplier between pyramid levels
pub const DEFAULT_BASE_FACTOR: usize = 4;

/// Default point budget a level must fit under to end the pyramid
pub const DEFAULT_MAX_POINTS_PER_LEVEL: usize = 4096;

/// Default number of windows kept by the model cache
pub const DEFAULT_WINDOW_CACHE_LIMIT: usize = 8;

/// Lower bound on the per-window point budget, regardless of pixel width
pub const DEFAULT_MIN_POINTS_PER_WINDOW: usize = 64;

/// Smallest accepted base factor
pub const MIN_BASE_FACTOR: usize = 2;

/// Smallest accepted per-level point budget
pub const MIN_POINTS_PER_LEVEL: usize = 64;

/// Level-of-detail pyramid settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodSettings {
    /// Bucket size multiplier from one level to the next
    pub base_factor: usize,

    /// Stop adding levels once a level has at most this many points
    pub max_points_per_level: usize,

    /// Number of windows the model keeps before evicting
    pub window_cache_limit: usize,

    /// Point budget floor used when picking a level for a window
    pub min_points_per_window: usize,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            base_factor: DEFAULT_BASE_FACTOR,
            max_points_per_level: DEFAULT_MAX_POINTS_PER_LEVEL,
            window_cache_limit: DEFAULT_WINDOW_CACHE_LIMIT,
            min_points_per_window: DEFAULT_MIN_POINTS_PER_WINDOW,
        }
    }
}

impl LodSettings {
    /// Clamp every field into its accepted range
    pub fn sanitized(&self) -> Self {
        Self {
            base_factor: self.base_factor.max(MIN_BASE_FACTOR),
            max_points_per_level: self.max_points_per_level.max(MIN_POINTS_PER_LEVEL),
            window_cache_limit: self.window_cache_limit.max(1),
            min_points_per_window: self.min_points_per_window.max(1),
        }
    }
}

/// Point editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Bridging method used when an operation does not name one
    pub connect_method: ConnectMethod,

    /// Warn when a single edit spans more than this many seconds
    pub long_span_seconds: f64,

    /// Warn when one deletion covers more than this fraction of the trace
    pub large_delete_fraction: f64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            connect_method: ConnectMethod::Linear,
            long_span_seconds: 5.0,
            large_delete_fraction: 0.01,
        }
    }
}
