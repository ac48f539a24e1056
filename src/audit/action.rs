//! Edit actions: immutable, serializable deltas over a clean series

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::ranges::{compress_indices, expand_ranges, ranges_from_wire, ranges_to_wire};
use crate::error::TraceError;
use crate::types::{Channel, ConnectMethod, EditOp};

/// Why a connect edit did not interpolate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fallback {
    /// No valid neighbor on one side; the span was blanked instead
    Nan,
}

impl Fallback {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Fallback::Nan => "nan",
        }
    }
}

impl Serialize for Fallback {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Parameters attached to an edit.
///
/// `method` and `fallback` are typed. Any other keys found in a stored log
/// are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditParams {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_method"
    )]
    pub method: Option<ConnectMethod>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_fallback"
    )]
    pub fallback: Option<Fallback>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl EditParams {
    /// Parameters for a connect edit
    pub fn connect(method: ConnectMethod) -> Self {
        Self {
            method: Some(method),
            ..Default::default()
        }
    }

    /// Mark the edit as having fallen back to NaN
    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Method to bridge with, linear unless cubic was requested
    pub fn connect_method(&self) -> ConnectMethod {
        self.method.unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.method.is_none() && self.fallback.is_none() && self.extra.is_empty()
    }
}

fn lenient_method<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<ConnectMethod>, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(ConnectMethod::parse_lenient(&s)),
        _ => Some(ConnectMethod::Linear),
    })
}

fn lenient_fallback<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Fallback>, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) if s.trim().eq_ignore_ascii_case("nan") => {
            Some(Fallback::Nan)
        }
        _ => None,
    })
}

/// OS login name, or "unknown"
pub fn default_user() -> String {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .filter_map(|key| std::env::var(key).ok())
        .find(|name| !name.trim().is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

/// One manual edit to a channel's clean series.
///
/// Actions are deltas: replaying a log in order over the raw series
/// reproduces the clean series. Indices are sorted and unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "EditActionRecord", try_from = "EditActionRecord")]
pub struct EditAction {
    channel: Channel,
    op: EditOp,
    indices: Vec<usize>,
    t_bounds: (f64, f64),
    params: EditParams,
    timestamp: DateTime<Utc>,
    user: String,
}

impl EditAction {
    /// Create an action stamped with the current time and login name
    pub fn new(
        channel: Channel,
        op: EditOp,
        indices: impl IntoIterator<Item = usize>,
        t_bounds: (f64, f64),
    ) -> Self {
        let mut indices: Vec<usize> = indices.into_iter().collect();
        indices.sort_unstable();
        indices.dedup();
        Self {
            channel,
            op,
            indices,
            t_bounds,
            params: EditParams::default(),
            timestamp: Utc::now(),
            user: default_user(),
        }
    }

    pub fn with_params(mut self, params: EditParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn op(&self) -> EditOp {
        self.op
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn t_bounds(&self) -> (f64, f64) {
        self.t_bounds
    }

    pub fn params(&self) -> &EditParams {
        &self.params
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Number of samples touched
    pub fn count(&self) -> usize {
        self.indices.len()
    }

    pub fn first_index(&self) -> Option<usize> {
        self.indices.first().copied()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.indices.last().copied()
    }

    /// One-line description for audit display
    pub fn summary(&self) -> String {
        let mut text = format!(
            "{} UTC | {} | {} | {} pts | {:.3}-{:.3} s",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.channel.label(),
            self.op.display_name(),
            self.count(),
            self.t_bounds.0,
            self.t_bounds.1,
        );
        if let Some(method) = self.params.method {
            text.push_str(&format!(" | method={}", method));
        }
        if let Some(fallback) = self.params.fallback {
            text.push_str(&format!(" | fallback={}", fallback.as_str()));
        }
        text
    }

    /// Canonical JSON form
    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::Value::from(EditActionRecord::from(self.clone()))
    }

    /// Parse the JSON form.
    ///
    /// Missing or unparseable timestamps become "now" and a missing user
    /// becomes the current login name.
    pub fn from_dict(payload: &serde_json::Value) -> crate::Result<Self> {
        let record = EditActionRecord::deserialize(payload)?;
        EditAction::try_from(record)
    }
}

impl fmt::Display for EditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// Serialized shape of an [`EditAction`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EditActionRecord {
    #[serde(default = "default_channel_label")]
    channel: String,
    #[serde(default)]
    op: String,
    #[serde(default)]
    indices: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    t_bounds: Option<Vec<f64>>,
    #[serde(default)]
    params: Option<EditParams>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    user: Option<String>,
}

fn default_channel_label() -> String {
    Channel::Inner.label().to_string()
}

impl From<EditActionRecord> for serde_json::Value {
    fn from(record: EditActionRecord) -> Self {
        serde_json::json!({
            "channel": record.channel,
            "op": record.op,
            "indices": record.indices,
            "t_bounds": record.t_bounds.unwrap_or_default(),
            "params": record.params.unwrap_or_default(),
            "timestamp": record.timestamp,
            "user": record.user,
        })
    }
}

impl From<EditAction> for EditActionRecord {
    fn from(action: EditAction) -> Self {
        Self {
            channel: action.channel.label().to_string(),
            op: action.op.as_str().to_string(),
            indices: ranges_to_wire(&compress_indices(&action.indices)),
            t_bounds: Some(vec![action.t_bounds.0, action.t_bounds.1]),
            params: Some(action.params),
            timestamp: Some(
                action
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            user: Some(action.user),
        }
    }
}

impl TryFrom<EditActionRecord> for EditAction {
    type Error = TraceError;

    fn try_from(record: EditActionRecord) -> Result<Self, Self::Error> {
        let channel: Channel = record.channel.parse()?;
        let op: EditOp = record.op.parse()?;
        let indices = expand_ranges(&ranges_from_wire(&record.indices)?);
        let t_bounds = match record.t_bounds.as_deref() {
            None | Some([]) => (0.0, 0.0),
            Some([t0, t1, ..]) => (*t0, *t1),
            Some(other) => {
                return Err(TraceError::Serialization(format!(
                    "t_bounds needs two values, got {}",
                    other.len()
                )))
            }
        };
        let timestamp = record
            .timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);
        let user = record
            .user
            .filter(|u| !u.is_empty())
            .unwrap_or_else(default_user);

        Ok(EditAction::new(channel, op, indices, t_bounds)
            .with_params(record.params.unwrap_or_default())
            .with_timestamp(timestamp)
            .with_user(user))
    }
}

/// Parse an ISO-8601 timestamp; naive values are taken as UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample_action() -> EditAction {
        EditAction::new(Channel::Outer, EditOp::ConnectAcross, [7, 3, 4, 5, 3], (0.3, 0.7))
            .with_params(EditParams::connect(ConnectMethod::Cubic))
            .with_timestamp(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap())
            .with_user("alice")
    }

    #[test]
    fn test_indices_sorted_and_unique() {
        let action = sample_action();
        assert_eq!(action.indices(), &[3, 4, 5, 7]);
        assert_eq!(action.count(), 4);
        assert_eq!(action.first_index(), Some(3));
        assert_eq!(action.last_index(), Some(7));
    }

    #[test]
    fn test_to_dict_schema() {
        let dict = sample_action().to_dict();
        assert_eq!(dict["channel"], "OD");
        assert_eq!(dict["op"], "connect_across");
        assert_eq!(dict["indices"], json!([[3, 5], [7, 7]]));
        assert_eq!(dict["t_bounds"], json!([0.3, 0.7]));
        assert_eq!(dict["params"], json!({"method": "cubic"}));
        assert_eq!(dict["timestamp"], "2024-03-01T12:30:05Z");
        assert_eq!(dict["user"], "alice");
    }

    #[test]
    fn test_dict_roundtrip() {
        let action = sample_action();
        let back = EditAction::from_dict(&action.to_dict()).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn test_from_dict_defaults() {
        let action = EditAction::from_dict(&json!({
            "op": "delete_points",
            "indices": [[2, 2]],
            "timestamp": "not a time",
        }))
        .unwrap();
        assert_eq!(action.channel(), Channel::Inner);
        assert_eq!(action.t_bounds(), (0.0, 0.0));
        assert!(action.params().is_empty());
        assert!(!action.user().is_empty());
        // Unparseable timestamp falls back to now
        assert!((Utc::now() - action.timestamp()).num_seconds().abs() < 60);
    }

    #[test]
    fn test_from_dict_naive_timestamp_is_utc() {
        let action = EditAction::from_dict(&json!({
            "channel": "inner",
            "op": "restore_points",
            "indices": [[0, 1]],
            "timestamp": "2023-11-05T08:00:00",
        }))
        .unwrap();
        assert_eq!(
            action.timestamp(),
            Utc.with_ymd_and_hms(2023, 11, 5, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_from_dict_rejects_unknown_op_and_channel() {
        let err = EditAction::from_dict(&json!({"op": "smooth", "indices": [[0, 1]]}))
            .unwrap_err();
        assert!(matches!(err, TraceError::UnsupportedOperation(_)));

        let err = EditAction::from_dict(&json!({
            "channel": "wall",
            "op": "delete_points",
            "indices": [[0, 1]],
        }))
        .unwrap_err();
        assert!(matches!(err, TraceError::UnknownChannel(_)));
    }

    #[test]
    fn test_from_dict_float_indices() {
        let action = EditAction::from_dict(&json!({
            "channel": "ID",
            "op": "delete_points",
            "indices": [[1.0, 3.0], [6.0]],
        }))
        .unwrap();
        assert_eq!(action.indices(), &[1, 2, 3, 6]);
        assert_eq!(action.to_dict()["indices"], json!([[1, 3], [6, 6]]));
    }

    #[test]
    fn test_params_keep_unknown_keys() {
        let action = EditAction::from_dict(&json!({
            "channel": "ID",
            "op": "connect_across",
            "indices": [[4, 6]],
            "params": {"method": "linear", "fallback": "NaN", "tension": 0.5},
        }))
        .unwrap();
        let params = action.params();
        assert_eq!(params.method, Some(ConnectMethod::Linear));
        assert_eq!(params.fallback, Some(Fallback::Nan));
        assert_eq!(params.extra["tension"], json!(0.5));

        let dict = action.to_dict();
        assert_eq!(
            dict["params"],
            json!({"method": "linear", "fallback": "nan", "tension": 0.5})
        );
    }

    #[test]
    fn test_summary_mentions_params() {
        let summary = sample_action()
            .with_params(EditParams::connect(ConnectMethod::Linear).with_fallback(Fallback::Nan))
            .summary();
        assert!(summary.starts_with("2024-03-01 12:30:05 UTC"));
        assert!(summary.contains("OD"));
        assert!(summary.contains("Connect"));
        assert!(summary.contains("4 pts"));
        assert!(summary.contains("0.300-0.700 s"));
        assert!(summary.contains("method=linear"));
        assert!(summary.contains("fallback=nan"));
    }
}
