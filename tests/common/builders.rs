//! Synthetic trace builders

use vaso_trace::{EditAction, TraceModel};

/// Builder for sampled diameter traces
pub struct TraceBuilder {
    samples: usize,
    dt: f64,
    start: f64,
    with_outer: bool,
    reversed: bool,
    base_factor: usize,
    max_points_per_level: usize,
    actions: Vec<EditAction>,
}

impl TraceBuilder {
    pub fn new(samples: usize) -> Self {
        Self {
            samples,
            dt: 0.1,
            start: 0.0,
            with_outer: false,
            reversed: false,
            base_factor: 4,
            max_points_per_level: 4096,
            actions: Vec::new(),
        }
    }

    pub fn dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn start(mut self, start: f64) -> Self {
        self.start = start;
        self
    }

    pub fn with_outer(mut self) -> Self {
        self.with_outer = true;
        self
    }

    /// Feed the samples in descending time order
    pub fn reversed(mut self) -> Self {
        self.reversed = true;
        self
    }

    pub fn pyramid(mut self, base_factor: usize, max_points_per_level: usize) -> Self {
        self.base_factor = base_factor;
        self.max_points_per_level = max_points_per_level;
        self
    }

    pub fn actions(mut self, actions: Vec<EditAction>) -> Self {
        self.actions = actions;
        self
    }

    /// Inner diameter at sample `i`: a slow oscillation around 100 um
    pub fn inner_at(i: usize) -> f64 {
        100.0 + 10.0 * (i as f64 * 0.05).sin()
    }

    /// Outer diameter at sample `i`
    pub fn outer_at(i: usize) -> f64 {
        150.0 + 5.0 * (i as f64 * 0.03).cos()
    }

    pub fn arrays(&self) -> (Vec<f64>, Vec<f64>, Option<Vec<f64>>) {
        let mut order: Vec<usize> = (0..self.samples).collect();
        if self.reversed {
            order.reverse();
        }
        let time = order
            .iter()
            .map(|&i| self.start + i as f64 * self.dt)
            .collect();
        let inner = order.iter().map(|&i| Self::inner_at(i)).collect();
        let outer = self
            .with_outer
            .then(|| order.iter().map(|&i| Self::outer_at(i)).collect());
        (time, inner, outer)
    }

    pub fn build(self) -> TraceModel {
        let (time, inner, outer) = self.arrays();
        let mut builder = TraceModel::builder(time, inner)
            .base_factor(self.base_factor)
            .max_points_per_level(self.max_points_per_level)
            .edit_actions(self.actions);
        if let Some(outer) = outer {
            builder = builder.outer(outer);
        }
        builder.build().expect("synthetic trace is valid")
    }
}
