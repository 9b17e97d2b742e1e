// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command-specific payload codecs (§3.2, §4.2): the layer above
//! [`crate::wire`] that gives meaning to an AECP command's variable tail.

pub mod aa;
pub mod aem_types;
pub mod descriptors_codec;
pub mod error;
pub mod families;
pub mod mvu;

pub use aa::{AaMode, AaPayload, AaTlv, aa_payload_wire_len, decode_aa_payload, encode_aa_payload};
pub use aem_types::AemCommandType;
pub use descriptors_codec::{ReadDescriptorPrefix, decode_descriptor};
pub use error::{PayloadError, PayloadResult, require_min_size};
pub use mvu::MvuCommandType;

/// Applies the §4.2 NOT_IMPLEMENTED special-size rule generically: when
/// `status` reports `NOT_IMPLEMENTED` and the response tail's length matches
/// the command's own expected minimum rather than the response's, the tail
/// carries no command-specific fields at all and decoding must not be
/// attempted — callers get [`PayloadError::NotImplemented`] instead of a
/// (likely spurious) `IncorrectSize`.
///
/// `AECP_STATUS_NOT_IMPLEMENTED` is status code `0x0B` (§6.3).
pub const AECP_STATUS_NOT_IMPLEMENTED: u8 = 0x0B;

/// Checks whether `tail` should be treated as a NOT_IMPLEMENTED echo of the
/// command payload rather than a real response payload, given the command
/// and response size floors for this `command_type`.
#[must_use]
pub fn is_not_implemented_echo(status: u8, tail_len: usize, command_min: usize, response_min: usize) -> bool {
    status == AECP_STATUS_NOT_IMPLEMENTED && tail_len < response_min && tail_len >= command_min
}

/// Wraps a response decode with the NOT_IMPLEMENTED special-size rule: if
/// the response status is NOT_IMPLEMENTED and `tail` matches the command's
/// size rather than the response's, short-circuits to
/// [`PayloadError::NotImplemented`] without invoking `decode`.
pub fn decode_response_with_not_implemented_rule<T>(
    status: u8,
    tail: &[u8],
    command_min: usize,
    response_min: usize,
    decode: impl FnOnce(&[u8]) -> PayloadResult<T>,
) -> PayloadResult<T> {
    if is_not_implemented_echo(status, tail.len(), command_min, response_min) {
        return Err(PayloadError::NotImplemented);
    }
    decode(tail)
}
