//! Log Sequence Numbers
//!
//! Textual `X/Y` positions in the write-ahead log stream, with a total
//! numeric ordering so the engine can enforce forward-only advancement:
//! - An update is only issued when the target position is strictly ahead
//! - "Not yet positioned" is modelled as `Option<Lsn>`, never as `0/0`

use std::fmt;
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A position in the write-ahead log stream.
///
/// Stored as the 64-bit value PostgreSQL encodes as `X/Y`, where `X` is the
/// high 32 bits and `Y` the low 32 bits, both hexadecimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lsn(u64);

impl Lsn {
    /// Build an LSN from its raw 64-bit value.
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// The raw 64-bit value.
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// True when `self` is strictly behind `other`.
    pub fn is_behind(&self, other: &Lsn) -> bool {
        self.0 < other.0
    }
}

/// Error raised when a textual LSN cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid LSN {text:?}: {reason}")]
pub struct ParseLsnError {
    /// The offending input
    pub text: String,
    /// Why it was rejected
    pub reason: &'static str,
}

impl ParseLsnError {
    fn new(text: &str, reason: &'static str) -> Self {
        Self {
            text: text.to_string(),
            reason,
        }
    }
}

impl FromStr for Lsn {
    type Err = ParseLsnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (high, low) = s
            .split_once('/')
            .ok_or_else(|| ParseLsnError::new(s, "expected X/Y format"))?;
        let high = u32::from_str_radix(high, 16)
            .map_err(|_| ParseLsnError::new(s, "high half is not 32-bit hex"))?;
        let low = u32::from_str_radix(low, 16)
            .map_err(|_| ParseLsnError::new(s, "low half is not 32-bit hex"))?;
        Ok(Self(((high as u64) << 32) | low as u64))
    }
}

impl fmt::Display for Lsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X}/{:X}", self.0 >> 32, self.0 & 0xFFFF_FFFF)
    }
}

impl Serialize for Lsn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Lsn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(DeError::custom)
    }
}

/// Parse the textual form the slot listing query produces, where the empty
/// string means the slot has no position yet.
pub fn parse_optional_lsn(text: &str) -> Result<Option<Lsn>, ParseLsnError> {
    if text.is_empty() {
        return Ok(None);
    }
    text.parse().map(Some)
}
