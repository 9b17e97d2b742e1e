// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised while decoding command-specific payload bytes (§4.2, §7).

use std::fmt;

use crate::types::DescriptorType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Payload shorter than the declared minimum for this command/response.
    IncorrectSize { expected: usize, actual: usize },
    /// A response's status is `NOT_IMPLEMENTED` and its length matches the
    /// *command's* expected length, per the §4.2 special-size rule.
    NotImplemented,
    /// A polymorphic command family saw a `descriptor_type` it does not serve.
    InvalidDescriptorType(DescriptorType),
    /// A field carried a value outside its declared domain.
    UnsupportedValue { field: &'static str, value: u64 },
    /// No dispatch-table entry exists for this `command_type`.
    UnknownCommandType(u16),
    /// An AECP VENDOR_UNIQUE frame whose protocol identifier is not Milan's.
    UnknownVendorUnique { protocol_id: [u8; 6] },
    /// `tolerate_partial_on_nonsuccess` demotion: a descriptor decoder saw a
    /// too-short payload on a non-success response.
    PartialOnNonSuccess { status: u8 },
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::IncorrectSize { expected, actual } => write!(
                f,
                "incorrect payload size: expected at least {expected}, got {actual}"
            ),
            PayloadError::NotImplemented => write!(f, "response status is NOT_IMPLEMENTED"),
            PayloadError::InvalidDescriptorType(dt) => {
                write!(f, "invalid descriptor type for this command family: {dt:?}")
            }
            PayloadError::UnsupportedValue { field, value } => {
                write!(f, "unsupported value {value} for field {field}")
            }
            PayloadError::UnknownCommandType(ct) => {
                write!(f, "unknown command_type {ct:#06x}")
            }
            PayloadError::UnknownVendorUnique { protocol_id } => {
                write!(f, "unknown vendor-unique protocol identifier {protocol_id:02x?}")
            }
            PayloadError::PartialOnNonSuccess { status } => write!(
                f,
                "partial payload tolerated on non-success response (status {status})"
            ),
        }
    }
}

impl std::error::Error for PayloadError {}

pub type PayloadResult<T> = std::result::Result<T, PayloadError>;

/// Confirms `actual` meets `expected`, producing [`PayloadError::IncorrectSize`]
/// otherwise. Overlong payloads are accepted per §4.2 ("compatibility requires
/// tolerance here"); trailing bytes are simply never read.
pub fn require_min_size(expected: usize, actual: usize) -> PayloadResult<()> {
    if actual < expected {
        Err(PayloadError::IncorrectSize { expected, actual })
    } else {
        Ok(())
    }
}
