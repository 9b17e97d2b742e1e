// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The fixed 64-byte string field used throughout descriptor names and
//! SET_NAME/GET_NAME payloads.

use std::fmt;

/// A fixed 64-byte, zero-padded string field.
///
/// Not required to be NUL-terminated: a full 64-byte name with no trailing
/// zero is valid. [`Self::as_str`] trims at the first NUL *or* the end of the
/// buffer, whichever comes first.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AvdeccFixedString(pub [u8; Self::LEN]);

impl AvdeccFixedString {
    pub const LEN: usize = 64;

    #[must_use]
    pub fn empty() -> Self {
        Self([0u8; Self::LEN])
    }

    /// Build from a UTF-8 string, truncating at 64 bytes and zero-padding the rest.
    #[must_use]
    pub fn from_str_truncated(s: &str) -> Self {
        let mut bytes = [0u8; Self::LEN];
        let src = s.as_bytes();
        let n = src.len().min(Self::LEN);
        bytes[..n].copy_from_slice(&src[..n]);
        Self(bytes)
    }

    /// Decode as UTF-8 up to the first NUL byte (or the full 64 bytes if none).
    /// Invalid UTF-8 is replaced lossily, matching firmware that pads with
    /// non-ASCII garbage beyond the intended name.
    #[must_use]
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(Self::LEN);
        String::from_utf8_lossy(&self.0[..end])
    }
}

impl Default for AvdeccFixedString {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for AvdeccFixedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AvdeccFixedString({:?})", self.as_str())
    }
}

impl fmt::Display for AvdeccFixedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for AvdeccFixedString {
    fn from(s: &str) -> Self {
        Self::from_str_truncated(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_string_round_trips() {
        let s = AvdeccFixedString::from_str_truncated("Studio A");
        assert_eq!(s.as_str(), "Studio A");
        assert_eq!(s.0[8], 0);
    }

    #[test]
    fn full_length_string_without_nul_round_trips() {
        let long = "x".repeat(AvdeccFixedString::LEN);
        let s = AvdeccFixedString::from_str_truncated(&long);
        assert_eq!(s.as_str(), long);
    }

    #[test]
    fn overlong_string_is_truncated() {
        let long = "x".repeat(AvdeccFixedString::LEN + 10);
        let s = AvdeccFixedString::from_str_truncated(&long);
        assert_eq!(s.as_str().len(), AvdeccFixedString::LEN);
    }

    #[test]
    fn empty_string_is_all_zero() {
        let s = AvdeccFixedString::empty();
        assert_eq!(s.as_str(), "");
        assert_eq!(s.0, [0u8; 64]);
    }
}
