//! MARC record leader access.
//!
//! The MARC leader is a 24-byte fixed-length field at the start of every MARC record.
//! Source data in the wild is not always well formed, so [`Leader`] keeps the raw
//! text and answers positional lookups with `Option` instead of rejecting the
//! record up front.
//!
//! # Structure
//!
//! - Positions 0-4: Record length (5 digits)
//! - Position 5: Record status
//! - Position 6: Record type (a = language material, c = music, etc.)
//! - Position 7: Bibliographic level (m = monograph, s = serial, etc.)
//! - Position 8: Control record type
//! - Position 9: Character coding (space = MARC-8, a = UTF-8)
//! - Positions 10-11: Indicator and subfield code counts (usually 2)
//! - Positions 12-16: Base address of data (5 digits)
//! - Positions 17-19: Encoding level, cataloging form, multipart level
//! - Positions 20-23: Reserved (usually "4500")

use crate::error::{MarcError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of a well-formed leader.
pub const LEADER_LENGTH: usize = 24;

/// Position of the record status code.
pub const RECORD_STATUS_POSITION: usize = 5;

/// Position of the bibliographic level code.
pub const BIBLIOGRAPHIC_LEVEL_POSITION: usize = 7;

/// MARC Leader, kept as the raw text it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Leader(String);

impl Leader {
    /// Wrap leader text without checking its length.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Leader(raw.into())
    }

    /// Get the raw leader text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Character at a fixed position, or `None` if the leader is too short.
    #[must_use]
    pub fn position(&self, position: usize) -> Option<char> {
        self.0.chars().nth(position)
    }

    /// Record status (position 5).
    #[must_use]
    pub fn record_status(&self) -> Option<char> {
        self.position(RECORD_STATUS_POSITION)
    }

    /// Bibliographic level (position 7).
    #[must_use]
    pub fn bibliographic_level(&self) -> Option<char> {
        self.position(BIBLIOGRAPHIC_LEVEL_POSITION)
    }

    /// Parse a leader from the first 24 bytes of a binary record.
    ///
    /// Binary decoding needs the record length and base address, so unlike
    /// [`Leader::new`] this rejects short or non-numeric leaders.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are too short or the length fields are not digits.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < LEADER_LENGTH {
            return Err(MarcError::InvalidLeader(format!(
                "Leader must be at least 24 bytes, got {}",
                bytes.len()
            )));
        }
        let leader = Leader(String::from_utf8_lossy(&bytes[..LEADER_LENGTH]).to_string());
        leader.record_length()?;
        leader.data_base_address()?;
        Ok(leader)
    }

    /// Record length (positions 0-4).
    ///
    /// # Errors
    ///
    /// Returns an error if the positions are missing or not digits.
    pub fn record_length(&self) -> Result<usize> {
        self.digits(0..5)
    }

    /// Base address of data (positions 12-16).
    ///
    /// # Errors
    ///
    /// Returns an error if the positions are missing or not digits.
    pub fn data_base_address(&self) -> Result<usize> {
        self.digits(12..17)
    }

    /// Validate that the leader is suitable for binary record reading.
    ///
    /// # Errors
    ///
    /// Returns an error if record length or base address is less than 24.
    pub fn validate_for_reading(&self) -> Result<()> {
        let record_length = self.record_length()?;
        if record_length < LEADER_LENGTH {
            return Err(MarcError::InvalidLeader(format!(
                "Record length must be at least 24, got {record_length}"
            )));
        }
        let base_address = self.data_base_address()?;
        if base_address < LEADER_LENGTH {
            return Err(MarcError::InvalidLeader(format!(
                "Base address of data must be at least 24, got {base_address}"
            )));
        }
        Ok(())
    }

    fn digits(&self, range: std::ops::Range<usize>) -> Result<usize> {
        let slice = self
            .0
            .get(range.clone())
            .ok_or_else(|| MarcError::InvalidLeader(format!("Leader has no positions {range:?}")))?;
        slice
            .parse::<usize>()
            .map_err(|_| MarcError::InvalidLeader(format!("Invalid numeric field: '{slice}'")))
    }
}

impl Default for Leader {
    fn default() -> Self {
        Leader("00000nam a2200000 a 4500".to_string())
    }
}

impl fmt::Display for Leader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
