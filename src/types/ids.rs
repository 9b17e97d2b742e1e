// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identifiers and small values (data model §3.1).

use std::fmt;

/// Generates a 64-bit opaque identifier newtype with an all-ones "null" sentinel.
///
/// Mirrors the wire codec's cursor macros: a single macro eliminates the
/// boilerplate that would otherwise be repeated for `EntityID`, `EntityModelID`,
/// and `AssociationID`.
macro_rules! define_eui64 {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            /// The all-ones sentinel meaning "absent" on the wire.
            pub const NULL: Self = Self(u64::MAX);

            #[must_use]
            pub fn is_null(self) -> bool {
                self == Self::NULL
            }

            #[must_use]
            pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
                Self(u64::from_be_bytes(bytes))
            }

            #[must_use]
            pub fn to_be_bytes(self) -> [u8; 8] {
                self.0.to_be_bytes()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::NULL
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:016X}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

define_eui64!(EntityID);
define_eui64!(EntityModelID);
define_eui64!(AssociationID);

/// 6-octet L2 address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub const BROADCAST: Self = Self([0xFF; 6]);
    pub const ZERO: Self = Self([0; 6]);

    #[must_use]
    pub fn is_multicast(self) -> bool {
        self.0[0] & 0x01 != 0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Raw descriptor index as carried on the wire; its family is determined by the
/// accompanying `DescriptorType`, not by this type alone. Use the family-specific
/// newtypes below at facade call sites to prevent cross-type mixing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct DescriptorIndex(pub u16);

/// Generates a distinct numeric newtype for one descriptor-index family
/// (`StreamIndex`, `AudioUnitIndex`, ...), convertible to/from the raw
/// [`DescriptorIndex`] carried on the wire.
macro_rules! define_descriptor_index {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(pub u16);

        impl From<$name> for DescriptorIndex {
            fn from(value: $name) -> Self {
                DescriptorIndex(value.0)
            }
        }

        impl From<DescriptorIndex> for $name {
            fn from(value: DescriptorIndex) -> Self {
                $name(value.0)
            }
        }
    };
}

define_descriptor_index!(AudioUnitIndex);
define_descriptor_index!(StreamIndex);
define_descriptor_index!(JackIndex);
define_descriptor_index!(AvbInterfaceIndex);
define_descriptor_index!(ClockSourceIndex);
define_descriptor_index!(MemoryObjectIndex);
define_descriptor_index!(LocaleIndex);
define_descriptor_index!(StringsIndex);
define_descriptor_index!(StreamPortIndex);
define_descriptor_index!(ExternalPortIndex);
define_descriptor_index!(InternalPortIndex);
define_descriptor_index!(AudioClusterIndex);
define_descriptor_index!(AudioMapIndex);
define_descriptor_index!(ControlIndex);
define_descriptor_index!(ClockDomainIndex);
define_descriptor_index!(TimingIndex);
define_descriptor_index!(PtpInstanceIndex);
define_descriptor_index!(PtpPortIndex);
define_descriptor_index!(VideoClusterIndex);
define_descriptor_index!(SensorClusterIndex);

/// 16-bit configuration scope index; all descriptors except `Entity` and
/// `Configuration` itself are scoped by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ConfigurationIndex(pub u16);

/// 16-bit wrapping sequence counter, unique per (issuer, target) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SequenceID(pub u16);

impl SequenceID {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Opaque 64-bit stream format; the core declares but does not parse its
/// internal layout (IIDC/IEC 61883-6, AAF, CRF, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StreamFormat(pub u64);

/// 32-bit sampling rate (pull-bit + rate). `0` means unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplingRate(pub u32);

impl SamplingRate {
    pub const UNSET: Self = Self(0);

    #[must_use]
    pub fn is_unset(self) -> bool {
        self.0 == 0
    }
}

/// 16-bit tagged descriptor-type enum (data model §3.1).
///
/// Unknown values round-trip through [`DescriptorType::Unknown`] rather than
/// failing to parse — a READ_DESCRIPTOR response naming a descriptor type this
/// crate does not catalog yet should still frame correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum DescriptorType {
    Entity,
    Configuration,
    AudioUnit,
    VideoUnit,
    SensorUnit,
    StreamInput,
    StreamOutput,
    JackInput,
    JackOutput,
    AvbInterface,
    ClockSource,
    MemoryObject,
    Locale,
    Strings,
    StreamPortInput,
    StreamPortOutput,
    ExternalPortInput,
    ExternalPortOutput,
    InternalPortInput,
    InternalPortOutput,
    AudioCluster,
    VideoCluster,
    SensorCluster,
    AudioMap,
    VideoMap,
    SensorMap,
    Control,
    SignalSelector,
    Mixer,
    Matrix,
    MatrixSignal,
    SignalSplitter,
    SignalCombiner,
    SignalDemultiplexer,
    SignalMultiplexer,
    SignalTranscoder,
    ClockDomain,
    ControlBlock,
    Timing,
    PtpInstance,
    PtpPort,
    Unknown(u16),
}

impl DescriptorType {
    #[must_use]
    pub fn from_u16(value: u16) -> Self {
        use DescriptorType::*;
        match value {
            0x0000 => Entity,
            0x0001 => Configuration,
            0x0002 => AudioUnit,
            0x0003 => VideoUnit,
            0x0004 => SensorUnit,
            0x0005 => StreamInput,
            0x0006 => StreamOutput,
            0x0007 => JackInput,
            0x0008 => JackOutput,
            0x0009 => AvbInterface,
            0x000A => ClockSource,
            0x000B => MemoryObject,
            0x000C => Locale,
            0x000D => Strings,
            0x000E => StreamPortInput,
            0x000F => StreamPortOutput,
            0x0010 => ExternalPortInput,
            0x0011 => ExternalPortOutput,
            0x0012 => InternalPortInput,
            0x0013 => InternalPortOutput,
            0x0014 => AudioCluster,
            0x0015 => VideoCluster,
            0x0016 => SensorCluster,
            0x0017 => AudioMap,
            0x0018 => VideoMap,
            0x0019 => SensorMap,
            0x001A => Control,
            0x001B => SignalSelector,
            0x001C => Mixer,
            0x001D => Matrix,
            0x001E => MatrixSignal,
            0x001F => SignalSplitter,
            0x0020 => SignalCombiner,
            0x0021 => SignalDemultiplexer,
            0x0022 => SignalMultiplexer,
            0x0023 => SignalTranscoder,
            0x0024 => ClockDomain,
            0x0025 => ControlBlock,
            0x0026 => Timing,
            0x0027 => PtpInstance,
            0x0028 => PtpPort,
            other => Unknown(other),
        }
    }

    #[must_use]
    pub fn to_u16(self) -> u16 {
        use DescriptorType::*;
        match self {
            Entity => 0x0000,
            Configuration => 0x0001,
            AudioUnit => 0x0002,
            VideoUnit => 0x0003,
            SensorUnit => 0x0004,
            StreamInput => 0x0005,
            StreamOutput => 0x0006,
            JackInput => 0x0007,
            JackOutput => 0x0008,
            AvbInterface => 0x0009,
            ClockSource => 0x000A,
            MemoryObject => 0x000B,
            Locale => 0x000C,
            Strings => 0x000D,
            StreamPortInput => 0x000E,
            StreamPortOutput => 0x000F,
            ExternalPortInput => 0x0010,
            ExternalPortOutput => 0x0011,
            InternalPortInput => 0x0012,
            InternalPortOutput => 0x0013,
            AudioCluster => 0x0014,
            VideoCluster => 0x0015,
            SensorCluster => 0x0016,
            AudioMap => 0x0017,
            VideoMap => 0x0018,
            SensorMap => 0x0019,
            Control => 0x001A,
            SignalSelector => 0x001B,
            Mixer => 0x001C,
            Matrix => 0x001D,
            MatrixSignal => 0x001E,
            SignalSplitter => 0x001F,
            SignalCombiner => 0x0020,
            SignalDemultiplexer => 0x0021,
            SignalMultiplexer => 0x0022,
            SignalTranscoder => 0x0023,
            ClockDomain => 0x0024,
            ControlBlock => 0x0025,
            Timing => 0x0026,
            PtpInstance => 0x0027,
            PtpPort => 0x0028,
            Unknown(value) => value,
        }
    }
}

/// Which AECP sub-protocol an inflight or dispatch entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AecpKind {
    Aem,
    Aa,
    Mvu,
}

/// The four command families the inflight registry and dispatcher key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Aem,
    Aa,
    Mvu,
    Acmp,
}

impl From<AecpKind> for CommandKind {
    fn from(kind: AecpKind) -> Self {
        match kind {
            AecpKind::Aem => CommandKind::Aem,
            AecpKind::Aa => CommandKind::Aa,
            AecpKind::Mvu => CommandKind::Mvu,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_null_is_all_ones() {
        assert!(EntityID::NULL.is_null());
        assert_eq!(EntityID::NULL.0, u64::MAX);
        assert!(!EntityID(0x0000_1122_3344_5566).is_null());
    }

    #[test]
    fn entity_id_round_trips_through_be_bytes() {
        let id = EntityID(0x0011_2233_4455_6677);
        assert_eq!(EntityID::from_be_bytes(id.to_be_bytes()), id);
    }

    #[test]
    fn mac_address_displays_lowercase_colon_separated() {
        let mac = MacAddress([0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(mac.to_string(), "00:11:22:33:44:55");
    }

    #[test]
    fn mac_address_detects_multicast_bit() {
        assert!(MacAddress([0x01, 0, 0, 0, 0, 0]).is_multicast());
        assert!(!MacAddress([0x00, 0, 0, 0, 0, 0]).is_multicast());
    }

    #[test]
    fn sequence_id_wraps_at_u16_max() {
        assert_eq!(SequenceID(0xFFFF).next(), SequenceID(0));
    }

    #[test]
    fn descriptor_type_round_trips_known_values() {
        for dt in [
            DescriptorType::Entity,
            DescriptorType::StreamInput,
            DescriptorType::ClockDomain,
            DescriptorType::PtpPort,
        ] {
            assert_eq!(DescriptorType::from_u16(dt.to_u16()), dt);
        }
    }

    #[test]
    fn descriptor_type_preserves_unknown_values() {
        assert_eq!(
            DescriptorType::from_u16(0xBEEF),
            DescriptorType::Unknown(0xBEEF)
        );
    }

    #[test]
    fn descriptor_index_families_are_distinct_types() {
        let stream = StreamIndex(3);
        let raw: DescriptorIndex = stream.into();
        assert_eq!(raw, DescriptorIndex(3));
        let back: StreamIndex = raw.into();
        assert_eq!(back, stream);
    }
}
