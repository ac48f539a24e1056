//! Windowed views over aggregated trace data

/// Mean/min/max aggregates for one channel, index-aligned with a time axis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregates {
    pub mean: Vec<f64>,
    pub min: Vec<f64>,
    pub max: Vec<f64>,
}

impl Aggregates {
    /// Aggregates of unaggregated samples: mean, min and max are the value
    pub fn verbatim(values: &[f64]) -> Self {
        Self {
            mean: values.to_vec(),
            min: values.to_vec(),
            max: values.to_vec(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            mean: Vec::with_capacity(capacity),
            min: Vec::with_capacity(capacity),
            max: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Whether all three arrays have `len` entries
    pub fn has_len(&self, len: usize) -> bool {
        self.mean.len() == len && self.min.len() == len && self.max.len() == len
    }

    /// Copy out the `[lo, hi)` slice
    pub fn slice(&self, lo: usize, hi: usize) -> Self {
        Self {
            mean: self.mean[lo..hi].to_vec(),
            min: self.min[lo..hi].to_vec(),
            max: self.max[lo..hi].to_vec(),
        }
    }
}

/// Read-only slice of one pyramid level covering a requested time range
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceWindow {
    /// Bucket centers (seconds)
    pub time: Vec<f64>,
    /// Inner diameter aggregates
    pub inner: Aggregates,
    /// Outer diameter aggregates, when the trace has an outer channel
    pub outer: Option<Aggregates>,
}

impl TraceWindow {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Time span covered by this window
    pub fn time_range(&self) -> Option<(f64, f64)> {
        Some((*self.time.first()?, *self.time.last()?))
    }
}
