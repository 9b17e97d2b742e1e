// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised while framing or deframing raw L2 bytes (§4.1 edge-case policy).

use std::fmt;

/// Framing error for the ethernet/AVTPDU common-header layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// `control_data_length` claims more bytes than the datagram actually carries.
    Truncated { needed: usize, available: usize },
    /// The datagram is shorter than the fixed part of its subtype.
    TooShort { needed: usize, available: usize },
    /// Unrecognized EtherType, AVTPDU subtype, or version.
    Unknown { field: &'static str, value: u32 },
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireError::Truncated { needed, available } => write!(
                f,
                "truncated frame: control_data_length requires {needed} bytes, {available} available"
            ),
            WireError::TooShort { needed, available } => write!(
                f,
                "frame too short: needed at least {needed} bytes, got {available}"
            ),
            WireError::Unknown { field, value } => {
                write!(f, "unrecognized {field}: {value:#x}")
            }
        }
    }
}

impl std::error::Error for WireError {}

pub type WireResult<T> = std::result::Result<T, WireError>;
