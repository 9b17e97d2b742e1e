// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Crate-wide error type for conditions that never reach an AECP/ACMP completion.
//!
//! Device- and protocol-level outcomes (timeouts, `NOT_IMPLEMENTED`, protocol
//! violations, ...) are reported through the typed status enums in
//! [`crate::payload::status`] and delivered via a command's completion, exactly
//! as designed in spec §6.3/§7. [`Error`] covers everything that happens before
//! (or entirely outside) a command reaches the wire: bad local configuration, a
//! role that was never registered on the facade, a transport send failure, or a
//! call into a torn-down [`crate::facade::LocalEntity`].

use std::fmt;

/// Errors raised by local preconditions rather than by a remote entity.
#[derive(Debug)]
pub enum Error {
    /// A configuration value is out of range (e.g. a zero timeout).
    InvalidConfig(String),
    /// The caller invoked a capability role (controller/talker/listener) that
    /// was not enabled on this [`crate::facade::LocalEntity`].
    RoleNotEnabled(&'static str),
    /// The transport reported a send failure for an outgoing frame.
    SendFailed(String),
    /// The target entity is not known to the discovery tracker.
    UnknownEntity(crate::types::EntityID),
    /// The facade has been torn down; no further commands can be issued.
    FacadeClosed,
    /// A byte buffer was too short or too long for the operation attempted.
    BufferSize { expected: usize, actual: usize },
    /// Wire-level encode/decode failure surfaced as a local error (see
    /// [`crate::wire::WireError`] and [`crate::payload::PayloadError`] for the
    /// typed variants this wraps).
    Codec(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(msg) => write!(f, "invalid configuration: {msg}"),
            Error::RoleNotEnabled(role) => write!(f, "role not enabled on this entity: {role}"),
            Error::SendFailed(msg) => write!(f, "transport send failed: {msg}"),
            Error::UnknownEntity(id) => write!(f, "unknown entity: {id}"),
            Error::FacadeClosed => write!(f, "local entity facade has been torn down"),
            Error::BufferSize { expected, actual } => {
                write!(f, "buffer size mismatch: expected {expected}, got {actual}")
            }
            Error::Codec(msg) => write!(f, "codec error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// Convenience alias for results using the crate-wide [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
