//! Audit log for manual trace editing
//!
//! Every manual edit is recorded as an [`EditAction`]. The ordered list of
//! actions is the durable artifact: the external project layer stores it as
//! a JSON array and the trace model replays it over the raw series.
//!
//! # Wire format
//!
//! ```json
//! {
//!   "channel": "ID",
//!   "op": "connect_across",
//!   "indices": [[120, 134], [140, 141]],
//!   "t_bounds": [12.0, 14.1],
//!   "params": {"method": "cubic"},
//!   "timestamp": "2024-03-01T12:30:05Z",
//!   "user": "alice"
//! }
//! ```

pub mod action;
pub mod ranges;

pub use action::{default_user, EditAction, EditParams, Fallback};
pub use ranges::{compress_indices, expand_ranges};

/// Serialize a log to its JSON form
pub fn serialize_edit_log(actions: &[EditAction]) -> Vec<serde_json::Value> {
    actions.iter().map(EditAction::to_dict).collect()
}

/// Parse a stored log, skipping entries that cannot be read
pub fn deserialize_edit_log<'a>(
    payload: impl IntoIterator<Item = &'a serde_json::Value>,
) -> Vec<EditAction> {
    payload
        .into_iter()
        .enumerate()
        .filter_map(|(pos, entry)| match EditAction::from_dict(entry) {
            Ok(action) => Some(action),
            Err(e) => {
                tracing::warn!("Skipping unreadable edit log entry {}: {}", pos, e);
                None
            }
        })
        .collect()
}
