//! Protocol version parsing and negotiation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Request header carrying the lowest protocol version the client speaks.
pub const MIN_VERSION_HEADER: &str = "x-protocol-min-version";
/// Request header carrying the highest protocol version the client speaks.
pub const MAX_VERSION_HEADER: &str = "x-protocol-max-version";

/// Lowest version this server speaks.
pub const SUPPORTED_MIN: ProtocolVersion = ProtocolVersion::new(2, 4);
/// Highest version this server speaks.
pub const SUPPORTED_MAX: ProtocolVersion = ProtocolVersion::new(2, 5);

/// A `major.minor` protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion {
    pub major: u32,
    pub minor: u32,
}

impl ProtocolVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Pick the highest version both sides support.
    ///
    /// Returns `None` when the client range `[min, max]` does not overlap
    /// with the server range, or when the client range is empty.
    pub fn negotiate(min: ProtocolVersion, max: ProtocolVersion) -> Option<ProtocolVersion> {
        if min > max || max < SUPPORTED_MIN || min > SUPPORTED_MAX {
            return None;
        }
        Some(max.min(SUPPORTED_MAX))
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Error parsing a protocol version string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid protocol version: {0:?}")]
pub struct ParseVersionError(pub String);

impl FromStr for ProtocolVersion {
    type Err = ParseVersionError;

    /// Accepts `2.5` as well as the JSON string form `"2.5"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unquoted = trimmed
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(trimmed);

        let (major, minor) = unquoted
            .split_once('.')
            .ok_or_else(|| ParseVersionError(s.to_string()))?;
        let major = major.parse().map_err(|_| ParseVersionError(s.to_string()))?;
        let minor = minor.parse().map_err(|_| ParseVersionError(s.to_string()))?;
        Ok(Self { major, minor })
    }
}

impl Serialize for ProtocolVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ProtocolVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
