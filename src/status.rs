// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public status taxonomies (§6.3): one enum per AECP sub-protocol, plus the
//! ACMP status family. Codes below `0x1F` are the on-wire 5-bit status field
//! as reported by a device; codes at or above `0x1F` are synthesized locally
//! (timeout, protocol violation, aborted, ...) and never appear on the wire.

use std::fmt;

macro_rules! define_status {
    ($name:ident { $($variant:ident = $value:expr),+ $(,)? } synth { $($synth_variant:ident),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[non_exhaustive]
        pub enum $name {
            $($variant,)+
            $($synth_variant,)+
            Reserved(u8),
        }

        impl $name {
            /// Decodes the on-wire 5-bit status field. Values above `0x1F` are
            /// never carried on the wire; this only covers device-reported codes.
            #[must_use]
            pub fn from_wire(value: u8) -> Self {
                match value {
                    $($value => $name::$variant,)+
                    other => $name::Reserved(other),
                }
            }

            /// Encodes a device-reportable status back to its wire value.
            /// Synthesized (local-only) variants have no wire representation.
            #[must_use]
            pub fn to_wire(self) -> Option<u8> {
                match self {
                    $($name::$variant => Some($value),)+
                    $name::Reserved(v) => Some(v),
                    $($name::$synth_variant => None,)+
                }
            }

            #[must_use]
            pub fn is_success(self) -> bool {
                matches!(self, $name::Success)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{self:?}")
            }
        }
    };
}

define_status!(AemCommandStatus {
    Success = 0x00,
    NotImplemented = 0x01,
    NoSuchDescriptor = 0x02,
    EntityLocked = 0x03,
    EntityAcquired = 0x04,
    NotAuthenticated = 0x05,
    AuthenticationDisabled = 0x06,
    BadArguments = 0x07,
    NoResources = 0x08,
    InProgress = 0x09,
    EntityMisbehaving = 0x0A,
    NotSupported = 0x0B,
    StreamIsRunning = 0x0C,
} synth {
    ProtocolError,
    BaseProtocolViolation,
    PartialImplementation,
    InternalError,
    Aborted,
    UnknownEntity,
    NetworkError,
    TimedOut
});

define_status!(AaCommandStatus {
    Success = 0x00,
    NotImplemented = 0x01,
    AddressTooLow = 0x02,
    AddressTooHigh = 0x03,
    AddressInvalid = 0x04,
    TlvInvalid = 0x05,
    DataInvalid = 0x06,
    Unsupported = 0x07,
} synth {
    ProtocolError,
    BaseProtocolViolation,
    InternalError,
    Aborted,
    UnknownEntity,
    NetworkError,
    TimedOut
});

define_status!(MvuCommandStatus {
    Success = 0x00,
    NotImplemented = 0x01,
} synth {
    ProtocolError,
    BaseProtocolViolation,
    InternalError,
    Aborted,
    UnknownEntity,
    NetworkError,
    TimedOut
});

define_status!(ControlStatus {
    Success = 0x00,
    NotImplemented = 0x01,
    BadArguments = 0x02,
} synth {
    ProtocolError,
    InternalError,
    Aborted,
    TimedOut
});

/// ACMP's own 8-bit status field (not the 5-bit AECP one); shares the same
/// device-vs-synthesized split.
define_status!(AcmpStatus {
    Success = 0x00,
    ListenerUnknownId = 0x01,
    TalkerUnknownId = 0x02,
    TalkerDestMacFail = 0x03,
    TalkerNoStreamIndex = 0x04,
    TalkerNoBandwidth = 0x05,
    TalkerExclusive = 0x06,
    ListenerTalkerTimeout = 0x07,
    ListenerExclusive = 0x08,
    StateUnavailable = 0x09,
    NotConnected = 0x0A,
    NoSuchConnection = 0x0B,
    CouldNotSendMessage = 0x0C,
    TalkerMisbehaving = 0x0D,
    ListenerMisbehaving = 0x0E,
    ControllerNotAuthorized = 0x10,
    IncompatibleRequest = 0x11,
    NotSupported = 0x1F,
} synth {
    Aborted,
    UnknownEntity,
    NetworkError,
    TimedOut
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aem_status_round_trips_device_reported_codes() {
        for status in [
            AemCommandStatus::Success,
            AemCommandStatus::NoSuchDescriptor,
            AemCommandStatus::StreamIsRunning,
        ] {
            let wire = status.to_wire().unwrap();
            assert_eq!(AemCommandStatus::from_wire(wire), status);
        }
    }

    #[test]
    fn synthesized_status_has_no_wire_encoding() {
        assert_eq!(AemCommandStatus::TimedOut.to_wire(), None);
        assert_eq!(AemCommandStatus::BaseProtocolViolation.to_wire(), None);
    }

    #[test]
    fn unknown_wire_value_preserved_as_reserved() {
        assert_eq!(AemCommandStatus::from_wire(0x1E), AemCommandStatus::Reserved(0x1E));
    }

    #[test]
    fn is_success_only_true_for_success_variant() {
        assert!(AemCommandStatus::Success.is_success());
        assert!(!AemCommandStatus::NotImplemented.is_success());
    }

    #[test]
    fn acmp_status_round_trips() {
        assert_eq!(
            AcmpStatus::from_wire(AcmpStatus::ListenerExclusive.to_wire().unwrap()),
            AcmpStatus::ListenerExclusive
        );
    }
}
