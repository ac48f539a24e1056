//! Core data types shared across the crate
//!
//! Channels, edit operations and bridging methods are small closed sets,
//! so they are enums here and strings only at the serialization boundary.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::TraceError;

/// Diameter channel of a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Channel {
    /// Inner diameter (always present)
    #[default]
    Inner,
    /// Outer diameter (optional)
    Outer,
}

impl Channel {
    /// Canonical lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Inner => "inner",
            Channel::Outer => "outer",
        }
    }

    /// Short label used in the edit log and audit display
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Inner => "ID",
            Channel::Outer => "OD",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Channel {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inner" | "id" | "diam_inner" | "inner_diameter" => Ok(Channel::Inner),
            "outer" | "od" | "diam_outer" | "outer_diameter" => Ok(Channel::Outer),
            _ => Err(TraceError::UnknownChannel(s.to_string())),
        }
    }
}

impl Serialize for Channel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Channel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Kind of manual edit applied to a clean series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditOp {
    /// Blank the selected samples (set to NaN)
    DeletePoints,
    /// Copy raw values back over the selection
    RestorePoints,
    /// Interpolate across the selection from its valid neighbors
    ConnectAcross,
}

impl EditOp {
    /// Wire name used in serialized edit logs
    pub fn as_str(&self) -> &'static str {
        match self {
            EditOp::DeletePoints => "delete_points",
            EditOp::RestorePoints => "restore_points",
            EditOp::ConnectAcross => "connect_across",
        }
    }

    /// Display name for audit summaries
    pub fn display_name(&self) -> &'static str {
        match self {
            EditOp::DeletePoints => "Delete",
            EditOp::RestorePoints => "Restore",
            EditOp::ConnectAcross => "Connect",
        }
    }
}

impl fmt::Display for EditOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EditOp {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "delete_points" => Ok(EditOp::DeletePoints),
            "restore_points" => Ok(EditOp::RestorePoints),
            "connect_across" => Ok(EditOp::ConnectAcross),
            other => Err(TraceError::UnsupportedOperation(other.to_string())),
        }
    }
}

/// Interpolation used when connecting across a gap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectMethod {
    /// Straight line between the two neighbors
    #[default]
    Linear,
    /// Slope-preserving cubic Hermite curve
    Cubic,
}

impl ConnectMethod {
    /// Parse a method name; anything unrecognized bridges linearly
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("cubic") {
            ConnectMethod::Cubic
        } else {
            ConnectMethod::Linear
        }
    }

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectMethod::Linear => "linear",
            ConnectMethod::Cubic => "cubic",
        }
    }

    /// Display name
    pub fn display_name(&self) -> &'static str {
        match self {
            ConnectMethod::Linear => "Linear",
            ConnectMethod::Cubic => "Cubic",
        }
    }
}

impl fmt::Display for ConnectMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ConnectMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ConnectMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ConnectMethod::parse_lenient(&raw))
    }
}

/// Whether a sample holds data.
///
/// Deleted or missing samples are stored as NaN; infinities are treated the
/// same way.
#[inline]
pub fn is_valid(value: f64) -> bool {
    value.is_finite()
}
