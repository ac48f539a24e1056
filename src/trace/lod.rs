//! Level-of-detail pyramid
//!
//! Level 0 is a verbatim copy of the series. Each following level groups
//! `bucket_size` consecutive samples into one point holding the bucket's
//! mean, min and max, with the bucket size growing by `base_factor` per
//! level. Buckets are left-aligned and non-overlapping; the last one may be
//! shorter. A NaN anywhere in a bucket makes all three aggregates NaN, so
//! deleted samples show up as gaps at every zoom level.

use super::window::{Aggregates, TraceWindow};

/// One level of the pyramid
#[derive(Debug, Clone, PartialEq)]
pub struct LodLevel {
    /// Downsampling multiplier relative to level 0
    pub factor: usize,
    /// Number of level-0 samples per output point
    pub bucket_size: usize,
    /// Bucket centers: midpoint of first and last sample time
    pub time_centers: Vec<f64>,
    pub inner: Aggregates,
    pub outer: Option<Aggregates>,
}

impl LodLevel {
    /// Aggregate a sorted series into buckets of `bucket_size` samples
    pub fn build(
        time: &[f64],
        inner: &[f64],
        outer: Option<&[f64]>,
        bucket_size: usize,
        factor: usize,
    ) -> Self {
        if bucket_size <= 1 {
            return Self {
                factor,
                bucket_size: 1,
                time_centers: time.to_vec(),
                inner: Aggregates::verbatim(inner),
                outer: outer.map(Aggregates::verbatim),
            };
        }

        let time_centers = time
            .chunks(bucket_size)
            .map(|bucket| (bucket[0] + bucket[bucket.len() - 1]) * 0.5)
            .collect();

        Self {
            factor,
            bucket_size,
            time_centers,
            inner: reduce_buckets(inner, bucket_size),
            outer: outer.map(|values| reduce_buckets(values, bucket_size)),
        }
    }

    /// Number of points in this level
    pub fn len(&self) -> usize {
        self.time_centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_centers.is_empty()
    }

    /// Slice covering `[x0, x1]` plus `margin` extra points on each side
    pub fn window(&self, x0: f64, x1: f64, margin: usize) -> TraceWindow {
        let (lo, hi) = self.search_range(x0, x1);
        let lo = lo.saturating_sub(margin);
        let hi = (hi + margin).min(self.len());
        // An inverted range (x1 < x0) can put hi below lo
        let hi = hi.max(lo);

        TraceWindow {
            time: self.time_centers[lo..hi].to_vec(),
            inner: self.inner.slice(lo, hi),
            outer: self.outer.as_ref().map(|agg| agg.slice(lo, hi)),
        }
    }

    /// Points whose center lies in `[x0, x1]`, never less than one
    pub fn count_in_range(&self, x0: f64, x1: f64) -> usize {
        let (lo, hi) = self.search_range(x0, x1);
        hi.saturating_sub(lo).max(1)
    }

    /// Whether the per-channel arrays agree with the time axis
    pub fn is_consistent(&self) -> bool {
        let n = self.len();
        self.inner.has_len(n) && self.outer.as_ref().map_or(true, |agg| agg.has_len(n))
    }

    fn search_range(&self, x0: f64, x1: f64) -> (usize, usize) {
        let lo = self.time_centers.partition_point(|&t| t < x0);
        let hi = self.time_centers.partition_point(|&t| t <= x1);
        (lo, hi)
    }
}

/// Build the full pyramid for a sorted series.
///
/// Levels are added until one has at most `max_points_per_level` points or
/// a single bucket spans the whole series.
pub fn build_pyramid(
    time: &[f64],
    inner: &[f64],
    outer: Option<&[f64]>,
    base_factor: usize,
    max_points_per_level: usize,
) -> Vec<LodLevel> {
    let total = time.len();
    let base_factor = base_factor.max(2);
    let mut levels = Vec::new();
    let mut bucket_size = 1;
    let mut factor = 1;

    loop {
        let level = LodLevel::build(time, inner, outer, bucket_size, factor);
        let done = level.len() <= max_points_per_level || bucket_size >= total;
        levels.push(level);
        if done {
            break;
        }
        bucket_size = (bucket_size * base_factor).min(total);
        factor *= base_factor;
    }

    levels
}

fn reduce_buckets(values: &[f64], bucket_size: usize) -> Aggregates {
    let mut out = Aggregates::with_capacity(values.len().div_ceil(bucket_size));
    for bucket in values.chunks(bucket_size) {
        let first = bucket[0];
        let (sum, lo, hi) = bucket[1..]
            .iter()
            .fold((first, first, first), |(sum, lo, hi), &v| {
                (sum + v, nan_min(lo, v), nan_max(hi, v))
            });
        out.mean.push(sum / bucket.len() as f64);
        out.min.push(lo);
        out.max.push(hi);
    }
    out
}

// f64::min/max skip NaN; the pyramid must propagate it
fn nan_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ramp(n: usize) -> (Vec<f64>, Vec<f64>) {
        let time = (0..n).map(|i| i as f64).collect();
        let values = (0..n).map(|i| (i % 7) as f64).collect();
        (time, values)
    }

    #[test]
    fn test_level_zero_is_verbatim() {
        let (time, values) = ramp(10);
        let level = LodLevel::build(&time, &values, None, 1, 1);
        assert_eq!(level.bucket_size, 1);
        assert_eq!(level.time_centers, time);
        assert_eq!(level.inner.mean, values);
        assert_eq!(level.inner.min, values);
        assert_eq!(level.inner.max, values);
    }

    #[test]
    fn test_bucket_aggregates() {
        let time = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        let values = vec![1.0, 5.0, 3.0, 2.0, 8.0];
        let level = LodLevel::build(&time, &values, Some(values.as_slice()), 2, 2);

        assert_eq!(level.time_centers, vec![0.5, 2.5, 4.0]);
        assert_eq!(level.inner.mean, vec![3.0, 2.5, 8.0]);
        assert_eq!(level.inner.min, vec![1.0, 2.0, 8.0]);
        assert_eq!(level.inner.max, vec![5.0, 3.0, 8.0]);
        assert_eq!(level.outer.as_ref(), Some(&level.inner));
    }

    #[test]
    fn test_nan_propagates_into_bucket() {
        let time = vec![0.0, 1.0, 2.0, 3.0];
        let values = vec![1.0, f64::NAN, 3.0, 4.0];
        let level = LodLevel::build(&time, &values, None, 2, 2);
        assert!(level.inner.mean[0].is_nan());
        assert!(level.inner.min[0].is_nan());
        assert!(level.inner.max[0].is_nan());
        assert_eq!(level.inner.mean[1], 3.5);
    }

    #[test]
    fn test_pyramid_stops_under_budget() {
        let (time, values) = ramp(10_000);
        let levels = build_pyramid(&time, &values, None, 4, 64);
        let sizes: Vec<usize> = levels.iter().map(|l| l.bucket_size).collect();
        assert_eq!(sizes, vec![1, 4, 16, 64, 256]);
        assert!(levels.last().unwrap().len() <= 64);
        assert_eq!(levels[3].factor, 64);
    }

    #[test]
    fn test_small_series_single_level() {
        let (time, values) = ramp(50);
        let levels = build_pyramid(&time, &values, None, 4, 64);
        assert_eq!(levels.len(), 1);
    }

    #[test]
    fn test_empty_series() {
        let levels = build_pyramid(&[], &[], None, 4, 64);
        assert_eq!(levels.len(), 1);
        assert!(levels[0].is_empty());
        assert_eq!(levels[0].count_in_range(0.0, 1.0), 1);
        assert!(levels[0].window(0.0, 1.0, 1).is_empty());
    }

    #[test]
    fn test_window_margin() {
        let (time, values) = ramp(20);
        let level = LodLevel::build(&time, &values, None, 1, 1);

        let window = level.window(5.0, 8.0, 1);
        assert_eq!(window.time, vec![4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);

        let edge = level.window(0.0, 2.0, 1);
        assert_eq!(edge.time, vec![0.0, 1.0, 2.0, 3.0]);

        assert_eq!(level.count_in_range(5.0, 8.0), 4);
        assert_eq!(level.count_in_range(100.0, 200.0), 1);
    }

    #[test]
    fn test_inverted_window_is_empty() {
        let (time, values) = ramp(20);
        let level = LodLevel::build(&time, &values, None, 1, 1);
        let window = level.window(8.0, 5.0, 0);
        assert!(window.is_empty());
    }

    proptest! {
        #[test]
        fn test_buckets_cover_series(
            n in 1usize..3000,
            base_factor in 2usize..6,
            max_points in 64usize..300,
        ) {
            let (time, values) = ramp(n);
            let levels = build_pyramid(&time, &values, None, base_factor, max_points);
            for level in &levels {
                // Every bucket but the last is full
                let full = level.len() - 1;
                let last = n - full * level.bucket_size;
                prop_assert!(last >= 1 && last <= level.bucket_size);
                prop_assert!(level.is_consistent());
            }
            let last = levels.last().unwrap();
            prop_assert!(last.len() <= max_points || last.bucket_size >= n);
        }
    }
}
