// SPDX-License-Identifier: Apache-2.0 OR MIT

//! ADP capability and ACMP flag bitmasks.
//!
//! Hand-rolled rather than pulled from the `bitflags` crate: each is a thin
//! newtype over the wire-sized integer with named associated constants, which
//! keeps the wire codec's `from_bits`/`bits` pair trivial and dependency-free.

use std::ops::{BitAnd, BitOr};

/// Generates a bitmask newtype with `contains`/`bits`/`from_bits` and
/// `BitOr`/`BitAnd` operators.
macro_rules! define_bitmask {
    ($name:ident, $repr:ty, { $($const_name:ident = $value:expr),* $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub $repr);

        impl $name {
            pub const NONE: Self = Self(0);
            $(pub const $const_name: Self = Self($value);)*

            #[must_use]
            pub fn bits(self) -> $repr {
                self.0
            }

            #[must_use]
            pub fn from_bits(bits: $repr) -> Self {
                Self(bits)
            }

            #[must_use]
            pub fn contains(self, other: Self) -> bool {
                (self.0 & other.0) == other.0
            }
        }

        impl BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }
    };
}

define_bitmask!(EntityCapabilities, u32, {
    EFU_MODE = 1 << 0,
    ADDRESS_ACCESS_SUPPORTED = 1 << 1,
    GATEWAY_ENTITY = 1 << 2,
    AEM_SUPPORTED = 1 << 3,
    LEGACY_AVC = 1 << 4,
    ASSOCIATION_ID_SUPPORTED = 1 << 5,
    ASSOCIATION_ID_VALID = 1 << 6,
    VENDOR_UNIQUE_SUPPORTED = 1 << 7,
    CLASS_A_SUPPORTED = 1 << 8,
    CLASS_B_SUPPORTED = 1 << 9,
    GPTP_SUPPORTED = 1 << 10,
    AEM_AUTHENTICATION_SUPPORTED = 1 << 11,
    AEM_AUTHENTICATION_REQUIRED = 1 << 12,
    AEM_PERSISTENT_ACQUIRE_SUPPORTED = 1 << 13,
    AEM_IDENTIFY_CONTROL_INDEX_VALID = 1 << 14,
    AEM_INTERFACE_INDEX_VALID = 1 << 15,
    GENERAL_CONTROLLER_IGNORE = 1 << 16,
    ENTITY_NOT_READY = 1 << 17,
});

define_bitmask!(TalkerCapabilities, u16, {
    IMPLEMENTED = 1 << 0,
    OTHER_SOURCE = 1 << 9,
    CONTROL_SOURCE = 1 << 10,
    MEDIA_CLOCK_SOURCE = 1 << 11,
    SMPTE_SOURCE = 1 << 12,
    MIDI_SOURCE = 1 << 13,
    AUDIO_SOURCE = 1 << 14,
    VIDEO_SOURCE = 1 << 15,
});

define_bitmask!(ListenerCapabilities, u16, {
    IMPLEMENTED = 1 << 0,
    OTHER_SINK = 1 << 9,
    CONTROL_SINK = 1 << 10,
    MEDIA_CLOCK_SINK = 1 << 11,
    SMPTE_SINK = 1 << 12,
    MIDI_SINK = 1 << 13,
    AUDIO_SINK = 1 << 14,
    VIDEO_SINK = 1 << 15,
});

define_bitmask!(ControllerCapabilities, u32, {
    IMPLEMENTED = 1 << 0,
});

define_bitmask!(ConnectionFlags, u16, {
    CLASS_B = 1 << 0,
    FAST_CONNECT = 1 << 1,
    SAVED_STATE = 1 << 2,
    STREAMING_WAIT = 1 << 3,
    SUPPORTS_ENCRYPTED = 1 << 4,
    ENCRYPTED_PDU = 1 << 5,
    TALKER_FAILED = 1 << 6,
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_capabilities_contains_checks_all_requested_bits() {
        let caps = EntityCapabilities::AEM_SUPPORTED | EntityCapabilities::GPTP_SUPPORTED;
        assert!(caps.contains(EntityCapabilities::AEM_SUPPORTED));
        assert!(!caps.contains(EntityCapabilities::CLASS_A_SUPPORTED));
        assert!(caps.contains(
            EntityCapabilities::AEM_SUPPORTED | EntityCapabilities::GPTP_SUPPORTED
        ));
    }

    #[test]
    fn bitmask_round_trips_through_bits() {
        let caps = TalkerCapabilities::IMPLEMENTED | TalkerCapabilities::AUDIO_SOURCE;
        assert_eq!(TalkerCapabilities::from_bits(caps.bits()), caps);
    }
}
