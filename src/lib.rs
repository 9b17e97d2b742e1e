// SPDX-License-Identifier: Apache-2.0 OR MIT

//! # avdecc-engine
//!
//! A local entity protocol engine for the IEEE 1722.1 AVDECC family of protocols
//! (ADP discovery, AECP enumeration/control, ACMP connection management) plus the
//! Milan Vendor-Unique (MVU) extension.
//!
//! This crate speaks raw Ethernet (EtherType `0x22F0`) to audio/video endpoints on
//! a local L2 segment: it serializes/deserializes every AVTPDU variant, drives the
//! ADP discovery state machine, correlates AECP/ACMP commands with their responses
//! under a retry/timeout policy, and dispatches typed notifications to a consumer.
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                    Local-entity facade (controller/talker/listener) |
//! +---------------------------------------------------------------------+
//! |  Dispatcher (command_type match, protocol-violation detection)      |
//! +---------------------------------------------------------------------+
//! |  Inflight registry (retry/timeout)  |  Discovery tracker (ADP FSM)   |
//! +---------------------------------------------------------------------+
//! |  Payload codec (AEM/AA/MVU/ACMP)                                    |
//! +---------------------------------------------------------------------+
//! |  Wire codec (Ethernet + AVTPDU common header)                       |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Out of scope
//!
//! The raw L2 transport, the higher-level enumeration/caching controller library,
//! and CLI/binding layers are external collaborators — see [`transport`] for the
//! contract this crate expects from them.

// Clippy: no blanket suppressions. Fix issues properly or use inline #[allow] with justification.

/// Crate-wide error type and `Result` alias for conditions that never reach the wire.
pub mod error;
/// Device-reported and synthesized status taxonomies (§6.3).
pub mod status;
/// Engine-wide tunables: AECP/ACMP timeouts, retry counts, discovery validity multiplier.
pub mod config;
/// Entity, descriptor, and small value identifiers (C3.1 of the data model).
pub mod types;
/// Bit-exact Ethernet + AVTPDU wire codec (C1).
pub mod wire;
/// Per-command payload codecs for AEM, AA, MVU, and ACMP (C2).
pub mod payload;
/// Outstanding-command tracking with retry/timeout policy (C3).
pub mod inflight;
/// ADP discovery state machine (C4).
pub mod discovery;
/// Response dispatch: command_type matching, protocol-violation detection (C5).
pub mod engine;
/// Public capability surface: controller / talker / listener roles (C6).
pub mod facade;
/// Per-entity statistics counters (C7).
pub mod stats;
/// The transport contract this crate consumes (external collaborator, §6.1).
pub mod transport;

pub use error::{Error, Result};
pub use facade::{LocalEntity, LocalEntityBuilder};
pub use types::EntityID;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
