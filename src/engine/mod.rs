// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Response dispatch: `command_type` matching, protocol-violation detection,
//! unsolicited-vs-solicited routing (C5, spec §4.5).
//!
//! The dispatcher is stateless with respect to the protocol interface lock:
//! it is handed the already-matched [`InflightEntry`] (or `None`, for an
//! unsolicited frame) and returns the typed event the facade should deliver
//! to a consumer callback. It never touches [`crate::inflight::InflightRegistry`]
//! or [`crate::discovery::DiscoveryTracker`] directly — [`crate::facade`]
//! owns composing those under the single lock (spec §5).

use crate::inflight::{InflightEntry, InflightOutcome};
use crate::payload::{self, aem_types::AemCommandType, mvu::MvuCommandType};
use crate::types::{CommandKind, DescriptorType, EntityID};
use crate::wire::{AecpCommon, AecpMessageType, AemSubHeader, MvuSubHeader};

/// A response deserialized by the dispatch table, still tagged with the
/// `command_type`/`descriptor_type` that selected its decoder — the facade
/// uses this to pick the right typed consumer callback.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchedAem {
    AcquireOrLock {
        command_type: AemCommandType,
        response: payload::families::AcquireOrLockResponse,
    },
    ReadDescriptor {
        prefix: payload::ReadDescriptorPrefix,
        descriptor: crate::types::Descriptor,
    },
    Name {
        command_type: AemCommandType,
        payload: payload::families::NamePayload,
    },
    StreamFormat {
        command_type: AemCommandType,
        payload: payload::families::StreamFormatPayload,
    },
    SamplingRate {
        command_type: AemCommandType,
        payload: payload::families::SamplingRatePayload,
    },
    StreamingControl {
        command_type: AemCommandType,
        payload: payload::families::StreamingControlPayload,
    },
    /// Any recognized command_type this table does not decode structurally
    /// (e.g. EntityAvailable, Reboot): the raw tail is carried through.
    Opaque {
        command_type: AemCommandType,
        tail: Vec<u8>,
    },
}

/// One event the dispatcher hands back to the facade for delivery to a
/// consumer callback.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A solicited response completed an inflight command.
    Completed {
        target: EntityID,
        status: u8,
        aem: Option<DispatchedAem>,
    },
    /// The command_type on the response didn't match the command's
    /// (spec §4.5's protocol-violation guard).
    ProtocolViolation { target: EntityID },
    /// `PayloadError::NotImplemented` per the §4.2 special-size rule.
    NotImplemented { target: EntityID },
    /// A decode failure on an otherwise-matched response.
    DecodeFailed { target: EntityID, reason: String },
    /// An unsolicited AEM response (the `u` bit set, no matching inflight).
    Unsolicited {
        source: EntityID,
        aem: DispatchedAem,
    },
    /// A response whose `(target, sequence_id)` matched no inflight entry
    /// and was not flagged unsolicited (spec §4.3: counted, then dropped).
    UnexpectedResponse { source: EntityID },
    /// An AECP VU frame whose protocol identifier is not Milan's.
    UnknownVendorUnique { source: EntityID },
}

/// Dispatches one matched AEM response against the inflight entry it
/// retired (or `None` for an unsolicited frame), decoding its payload and
/// checking the protocol-violation invariant.
///
/// `inflight` is consumed: on every path exactly one of its completion is
/// invoked (or none, if `inflight` was `None`), matching spec §3.5's
/// "retired exactly once" invariant.
pub fn dispatch_aem_response(
    common: &AecpCommon,
    sub_header: &AemSubHeader,
    tail: &[u8],
    inflight: Option<InflightEntry>,
) -> DispatchOutcome {
    let response_command_type = AemCommandType::from_u16(sub_header.command_type);

    if let Some(entry) = inflight {
        if entry.command_type != sub_header.command_type {
            entry.finish(InflightOutcome::ProtocolViolation);
            return DispatchOutcome::ProtocolViolation {
                target: common.target_entity_id,
            };
        }

        let sizes = payload::aem_types::size_expectation(response_command_type);
        let (command_min, response_min) = sizes
            .map(|s| (s.command_min, s.response_min))
            .unwrap_or((0, 0));

        if payload::is_not_implemented_echo(common.status, tail.len(), command_min, response_min) {
            entry.finish(InflightOutcome::NotImplemented);
            return DispatchOutcome::NotImplemented {
                target: common.target_entity_id,
            };
        }

        match decode_aem_tail(response_command_type, tail) {
            Ok(aem) => {
                let target = common.target_entity_id;
                let status = common.status;
                entry.finish(InflightOutcome::Response {
                    status,
                    tail: tail.to_vec(),
                });
                DispatchOutcome::Completed {
                    target,
                    status,
                    aem: Some(aem),
                }
            }
            Err(DecodeErr::InvalidDescriptorType) => {
                entry.finish(InflightOutcome::ProtocolViolation);
                DispatchOutcome::ProtocolViolation {
                    target: common.target_entity_id,
                }
            }
            Err(DecodeErr::Other(reason)) => {
                let target = common.target_entity_id;
                entry.finish(InflightOutcome::Response {
                    status: common.status,
                    tail: tail.to_vec(),
                });
                DispatchOutcome::DecodeFailed { target, reason }
            }
        }
    } else if sub_header.unsolicited {
        match decode_aem_tail(response_command_type, tail) {
            Ok(aem) => DispatchOutcome::Unsolicited {
                source: common.target_entity_id,
                aem,
            },
            Err(DecodeErr::InvalidDescriptorType) => DispatchOutcome::ProtocolViolation {
                target: common.target_entity_id,
            },
            Err(DecodeErr::Other(reason)) => DispatchOutcome::DecodeFailed {
                target: common.target_entity_id,
                reason,
            },
        }
    } else {
        DispatchOutcome::UnexpectedResponse {
            source: common.target_entity_id,
        }
    }
}

/// `decode_aem_tail`'s failure shape: a descriptor-type mismatch on a
/// polymorphic family is kept distinct from every other decode failure so
/// [`dispatch_aem_response`] can retire it as `InvalidDescriptorType` →
/// `ProtocolViolation` instead of the generic `DecodeFailed` (spec §4.5).
enum DecodeErr {
    InvalidDescriptorType,
    Other(String),
}

fn decode_aem_tail(command_type: AemCommandType, tail: &[u8]) -> Result<DispatchedAem, DecodeErr> {
    use AemCommandType::*;
    match command_type {
        AcquireEntity | LockEntity => payload::families::decode_acquire_or_lock_response(tail)
            .map(|response| DispatchedAem::AcquireOrLock {
                command_type,
                response,
            })
            .map_err(|e| DecodeErr::Other(e.to_string())),
        ReadDescriptor => {
            let mut cursor = crate::wire::Cursor::new(tail);
            let prefix = payload::ReadDescriptorPrefix::parse(&mut cursor)
                .map_err(|e| DecodeErr::Other(e.to_string()))?;
            let descriptor_tail = &tail[payload::ReadDescriptorPrefix::LEN..];
            payload::decode_descriptor(&prefix, 0, descriptor_tail)
                .map(|descriptor| DispatchedAem::ReadDescriptor { prefix, descriptor })
                .map_err(|e| DecodeErr::Other(e.to_string()))
        }
        SetName | GetName => {
            let payload =
                payload::families::decode_name(tail).map_err(|e| DecodeErr::Other(e.to_string()))?;
            if !validate_descriptor_family(payload.descriptor_type, NAME_FAMILY) {
                return Err(DecodeErr::InvalidDescriptorType);
            }
            if !validate_name_index(payload.descriptor_type, payload.name_index) {
                return Err(DecodeErr::Other(format!(
                    "name_index {} is not valid for descriptor_type {:?}",
                    payload.name_index, payload.descriptor_type
                )));
            }
            Ok(DispatchedAem::Name {
                command_type,
                payload,
            })
        }
        SetStreamFormat | GetStreamFormat => {
            let payload = payload::families::decode_stream_format(tail)
                .map_err(|e| DecodeErr::Other(e.to_string()))?;
            if !validate_descriptor_family(payload.descriptor_type, STREAM_FORMAT_FAMILY) {
                return Err(DecodeErr::InvalidDescriptorType);
            }
            Ok(DispatchedAem::StreamFormat {
                command_type,
                payload,
            })
        }
        SetSamplingRate | GetSamplingRate => {
            let payload = payload::families::decode_sampling_rate(tail)
                .map_err(|e| DecodeErr::Other(e.to_string()))?;
            if !validate_descriptor_family(payload.descriptor_type, SAMPLING_RATE_FAMILY) {
                return Err(DecodeErr::InvalidDescriptorType);
            }
            Ok(DispatchedAem::SamplingRate {
                command_type,
                payload,
            })
        }
        StartStreaming | StopStreaming => {
            let payload = payload::families::decode_streaming_control(tail)
                .map_err(|e| DecodeErr::Other(e.to_string()))?;
            if !validate_descriptor_family(payload.descriptor_type, STREAMING_CONTROL_FAMILY) {
                return Err(DecodeErr::InvalidDescriptorType);
            }
            Ok(DispatchedAem::StreamingControl {
                command_type,
                payload,
            })
        }
        Unknown(code) => Err(DecodeErr::Other(format!(
            "no dispatch-table entry for command_type {code:#06x}"
        ))),
        other => Ok(DispatchedAem::Opaque {
            command_type: other,
            tail: tail.to_vec(),
        }),
    }
}

/// Dispatches one matched MVU response, the same shape as
/// [`dispatch_aem_response`] but against the MVU command_type catalog.
pub fn dispatch_mvu_response(
    common: &AecpCommon,
    sub_header: &MvuSubHeader,
    tail: &[u8],
    inflight: Option<InflightEntry>,
) -> DispatchOutcome {
    if !sub_header.is_milan() {
        if let Some(entry) = inflight {
            entry.finish(InflightOutcome::ProtocolViolation);
        }
        return DispatchOutcome::UnknownVendorUnique {
            source: common.target_entity_id,
        };
    }

    let response_command_type = MvuCommandType::from_u16(sub_header.command_type);
    let Some(entry) = inflight else {
        return DispatchOutcome::UnexpectedResponse {
            source: common.target_entity_id,
        };
    };

    if entry.command_type != sub_header.command_type {
        entry.finish(InflightOutcome::ProtocolViolation);
        return DispatchOutcome::ProtocolViolation {
            target: common.target_entity_id,
        };
    }

    let (command_min, response_min) = payload::mvu::size_expectation(response_command_type)
        .unwrap_or((0, 0));
    if payload::is_not_implemented_echo(common.status, tail.len(), command_min, response_min) {
        entry.finish(InflightOutcome::NotImplemented);
        return DispatchOutcome::NotImplemented {
            target: common.target_entity_id,
        };
    }

    let target = common.target_entity_id;
    let status = common.status;
    entry.finish(InflightOutcome::Response {
        status,
        tail: tail.to_vec(),
    });
    DispatchOutcome::Completed {
        target,
        status,
        aem: None,
    }
}

/// Descriptor types SET_NAME / GET_NAME may target (1722.1 the "nameable"
/// descriptors: every descriptor with an `object_name`/`group_name` field).
pub(crate) const NAME_FAMILY: &[DescriptorType] = &[
    DescriptorType::Entity,
    DescriptorType::Configuration,
    DescriptorType::AudioUnit,
    DescriptorType::VideoUnit,
    DescriptorType::SensorUnit,
    DescriptorType::StreamInput,
    DescriptorType::StreamOutput,
    DescriptorType::JackInput,
    DescriptorType::JackOutput,
    DescriptorType::AvbInterface,
    DescriptorType::ClockSource,
    DescriptorType::MemoryObject,
    DescriptorType::AudioCluster,
    DescriptorType::Control,
    DescriptorType::ClockDomain,
];

/// Descriptor types SET_STREAM_FORMAT / GET_STREAM_FORMAT may target.
pub(crate) const STREAM_FORMAT_FAMILY: &[DescriptorType] =
    &[DescriptorType::StreamInput, DescriptorType::StreamOutput];

/// Descriptor types SET_SAMPLING_RATE / GET_SAMPLING_RATE may target.
pub(crate) const SAMPLING_RATE_FAMILY: &[DescriptorType] = &[
    DescriptorType::AudioUnit,
    DescriptorType::VideoCluster,
    DescriptorType::SensorCluster,
];

/// Descriptor types START_STREAMING / STOP_STREAMING may target.
pub(crate) const STREAMING_CONTROL_FAMILY: &[DescriptorType] =
    &[DescriptorType::StreamInput, DescriptorType::StreamOutput];

/// Confirms a `descriptor_type` is one of the families a polymorphic AEM
/// command serves (spec §4.5); callers retire the inflight as
/// `InvalidDescriptorType` → `ProtocolError` on mismatch.
#[must_use]
pub fn validate_descriptor_family(descriptor_type: DescriptorType, allowed: &[DescriptorType]) -> bool {
    allowed.contains(&descriptor_type)
}

/// SET_NAME / GET_NAME additionally switch on `name_index`: every nameable
/// descriptor has an `object_name` at index 0, but only `Entity` also carries
/// a `group_name` at index 1 (spec §4.5).
#[must_use]
pub(crate) fn validate_name_index(descriptor_type: DescriptorType, name_index: u16) -> bool {
    match name_index {
        0 => true,
        1 => descriptor_type == DescriptorType::Entity,
        _ => false,
    }
}

/// Helper to locate which `CommandKind` an AECP message type implies, so the
/// facade can look up the right inflight sub-table.
#[must_use]
pub fn command_kind_for(message_type: AecpMessageType) -> Option<CommandKind> {
    match message_type {
        AecpMessageType::AemCommand | AecpMessageType::AemResponse => Some(CommandKind::Aem),
        AecpMessageType::AddressAccessCommand | AecpMessageType::AddressAccessResponse => {
            Some(CommandKind::Aa)
        }
        AecpMessageType::VendorUniqueCommand | AecpMessageType::VendorUniqueResponse => {
            Some(CommandKind::Mvu)
        }
        AecpMessageType::Unknown(_) => None,
    }
}
