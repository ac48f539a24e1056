//! Trace storage, level-of-detail pyramid and edit replay
//!
//! [`TraceModel`] owns the time axis and the raw and clean diameter series.
//! It keeps a pyramid of [`LodLevel`]s built from the clean series so that a
//! plot can fetch a bounded number of points for any visible range, and it
//! replays [`EditAction`](crate::audit::EditAction)s to derive the clean
//! series from the raw one.

pub mod bridge;
pub mod cache;
pub mod edit;
pub mod lod;
pub mod model;
pub mod sidecar;
pub mod table;
pub mod window;

pub use bridge::{bridge_segment, cubic_hermite_bridge, find_neighbor, linear_bridge};
pub use edit::EditOutcome;
pub use lod::{build_pyramid, LodLevel};
pub use model::{TraceModel, TraceModelBuilder};
pub use sidecar::{load_lod, lod_sidecar_path, save_lod};
pub use table::TraceTable;
pub use window::{Aggregates, TraceWindow};
