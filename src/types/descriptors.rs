// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The AEM descriptor catalog (data model §3.3).
//!
//! Every descriptor carries a fixed common prefix (type, index, name where
//! applicable) plus type-specific fields. [`Descriptor`] is the enum a
//! READ_DESCRIPTOR response decodes into; exactly one variant is ever
//! populated per response, selected by the descriptor type carried in the
//! response's common prefix (payload §4.2).

use super::ids::{
    AssociationID, AudioClusterIndex, AudioMapIndex, AvbInterfaceIndex, ClockDomainIndex,
    ClockSourceIndex, ConfigurationIndex, ControlIndex, DescriptorType, EntityID, EntityModelID,
    JackIndex, LocaleIndex, MacAddress, MemoryObjectIndex, PtpInstanceIndex, PtpPortIndex,
    SamplingRate, StreamIndex, StringsIndex, TimingIndex,
};
use super::{
    ControllerCapabilities, EntityCapabilities, ListenerCapabilities, StreamFormat,
    TalkerCapabilities,
};
use crate::types::AvdeccFixedString;

/// Reference into a Strings descriptor's localized string table (index 0-6
/// within the chosen locale).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LocalizedStringReference(pub u16);

/// `EntityDescriptor` — clause 7.2.1. The single root descriptor of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    pub entity_id: EntityID,
    pub entity_model_id: EntityModelID,
    pub entity_capabilities: EntityCapabilities,
    pub talker_stream_sources: u16,
    pub talker_capabilities: TalkerCapabilities,
    pub listener_stream_sinks: u16,
    pub listener_capabilities: ListenerCapabilities,
    pub controller_capabilities: ControllerCapabilities,
    pub available_index: u32,
    pub association_id: AssociationID,
    pub entity_name: AvdeccFixedString,
    pub vendor_name_string: LocalizedStringReference,
    pub model_name_string: LocalizedStringReference,
    pub firmware_version: AvdeccFixedString,
    pub group_name: AvdeccFixedString,
    pub serial_number: AvdeccFixedString,
    pub configurations_count: u16,
    pub current_configuration: ConfigurationIndex,
}

/// One entry in a `ConfigurationDescriptor`'s descriptor-count table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorCount {
    pub descriptor_type: DescriptorType,
    pub count: u16,
}

/// `ConfigurationDescriptor` — clause 7.2.2.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationDescriptor {
    pub object_name: AvdeccFixedString,
    pub localized_description: LocalizedStringReference,
    pub descriptor_counts: Vec<DescriptorCount>,
}

/// `AudioUnitDescriptor` — clause 7.2.3 (port-count block omitted; callers
/// that need exact port indexing read the individual port descriptors).
#[derive(Debug, Clone, PartialEq)]
pub struct AudioUnitDescriptor {
    pub object_name: AvdeccFixedString,
    pub localized_description: LocalizedStringReference,
    pub clock_domain_index: ClockDomainIndex,
    pub current_sampling_rate: SamplingRate,
    pub sampling_rates: Vec<SamplingRate>,
}

/// `StreamInputDescriptor` / `StreamOutputDescriptor` — clauses 7.2.6/7.2.7.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamDescriptor {
    pub object_name: AvdeccFixedString,
    pub localized_description: LocalizedStringReference,
    pub clock_domain_index: ClockDomainIndex,
    pub stream_flags: u16,
    pub current_format: StreamFormat,
    pub formats: Vec<StreamFormat>,
    pub backup_talker_entity_id_0: EntityID,
    pub backup_talker_unique_id_0: u16,
}

/// `JackInputDescriptor` / `JackOutputDescriptor` — clause 7.2.8/7.2.9.
#[derive(Debug, Clone, PartialEq)]
pub struct JackDescriptor {
    pub object_name: AvdeccFixedString,
    pub localized_description: LocalizedStringReference,
    pub jack_flags: u16,
    pub jack_type: u16,
    pub number_of_controls: u16,
    pub base_control: ControlIndex,
}

/// `AvbInterfaceDescriptor` — clause 7.2.10.
#[derive(Debug, Clone, PartialEq)]
pub struct AvbInterfaceDescriptor {
    pub object_name: AvdeccFixedString,
    pub localized_description: LocalizedStringReference,
    pub mac_address: MacAddress,
    pub interface_flags: u16,
    pub clock_identity: EntityID,
    pub priority1: u8,
    pub clock_class: u8,
    pub offset_scaled_log_variance: u16,
    pub clock_accuracy: u8,
    pub priority2: u8,
    pub domain_number: u8,
    pub log_sync_interval: i8,
    pub log_announce_interval: i8,
    pub log_pdelay_interval: i8,
    pub port_number: u16,
}

/// `ClockSourceDescriptor` — clause 7.2.11.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockSourceDescriptor {
    pub object_name: AvdeccFixedString,
    pub localized_description: LocalizedStringReference,
    pub clock_source_flags: u16,
    pub clock_source_type: u16,
    pub clock_source_identifier: EntityID,
    pub clock_source_location_type: DescriptorType,
    pub clock_source_location_index: u16,
}

/// `MemoryObjectDescriptor` — clause 7.2.12.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryObjectDescriptor {
    pub object_name: AvdeccFixedString,
    pub localized_description: LocalizedStringReference,
    pub memory_object_type: u16,
    pub target_descriptor_type: DescriptorType,
    pub target_descriptor_index: u16,
    pub start_address: u64,
    pub maximum_length: u64,
    pub length: u64,
}

/// `LocaleDescriptor` — clause 7.2.13.
#[derive(Debug, Clone, PartialEq)]
pub struct LocaleDescriptor {
    pub locale_identifier: AvdeccFixedString,
    pub number_of_strings: u16,
    pub base_strings: StringsIndex,
}

/// `StringsDescriptor` — clause 7.2.14. Seven localized strings per descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct StringsDescriptor {
    pub strings: [AvdeccFixedString; 7],
}

/// `StreamPortInputDescriptor` / `StreamPortOutputDescriptor` — clause 7.2.15/7.2.16.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamPortDescriptor {
    pub clock_domain_index: ClockDomainIndex,
    pub port_flags: u16,
    pub number_of_controls: u16,
    pub base_control: ControlIndex,
    pub number_of_clusters: u16,
    pub base_cluster: AudioClusterIndex,
    pub number_of_maps: u16,
    pub base_map: AudioMapIndex,
}

/// `ExternalPortInputDescriptor` / `...Output` / `InternalPortInputDescriptor` / `...Output`
/// — clauses 7.2.17-7.2.20. All four share this layout.
#[derive(Debug, Clone, PartialEq)]
pub struct PortDescriptor {
    pub clock_domain_index: ClockDomainIndex,
    pub port_flags: u16,
    pub number_of_controls: u16,
    pub base_control: ControlIndex,
    pub signal_type: DescriptorType,
    pub signal_index: u16,
    pub signal_output: u16,
}

/// `AudioClusterDescriptor` — clause 7.2.21.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClusterDescriptor {
    pub object_name: AvdeccFixedString,
    pub localized_description: LocalizedStringReference,
    pub signal_type: DescriptorType,
    pub signal_index: u16,
    pub signal_output: u16,
    pub path_latency: u32,
    pub block_latency: u32,
    pub channel_count: u16,
    pub format: u8,
}

/// One mapping quad of a `GET_AUDIO_MAP` page or an `AudioMapDescriptor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioMapping {
    pub stream_index: u16,
    pub stream_channel: u16,
    pub cluster_offset: u16,
    pub cluster_channel: u16,
}

/// `AudioMapDescriptor` — clause 7.2.22.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioMapDescriptor {
    pub mappings: Vec<AudioMapping>,
}

/// `ControlDescriptor` — clause 7.2.23. `values` is transported as an opaque
/// blob; its interpretation depends on `control_value_type`.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlDescriptor {
    pub object_name: AvdeccFixedString,
    pub localized_description: LocalizedStringReference,
    pub block_latency: u32,
    pub control_latency: u32,
    pub control_domain: u16,
    pub control_value_type: u16,
    pub control_type: EntityID,
    pub reset_time: u32,
    pub signal_type: DescriptorType,
    pub signal_index: u16,
    pub signal_output: u16,
    pub number_of_values: u16,
    pub values: Vec<u8>,
}

/// `ClockDomainDescriptor` — clause 7.2.32.
#[derive(Debug, Clone, PartialEq)]
pub struct ClockDomainDescriptor {
    pub object_name: AvdeccFixedString,
    pub localized_description: LocalizedStringReference,
    pub clock_source_index: ClockSourceIndex,
    pub clock_sources: Vec<ClockSourceIndex>,
}

/// `TimingDescriptor` — Milan clause 7.2.33.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingDescriptor {
    pub object_name: AvdeccFixedString,
    pub localized_description: LocalizedStringReference,
    pub algorithm: u16,
    pub ptp_instances: Vec<PtpInstanceIndex>,
}

/// `PtpInstanceDescriptor` — Milan clause 7.2.34.
#[derive(Debug, Clone, PartialEq)]
pub struct PtpInstanceDescriptor {
    pub object_name: AvdeccFixedString,
    pub localized_description: LocalizedStringReference,
    pub clock_identity: EntityID,
    pub flags: u16,
    pub number_of_controls: u16,
    pub base_control: ControlIndex,
    pub number_of_ptp_ports: u16,
    pub base_ptp_port: PtpPortIndex,
}

/// `PtpPortDescriptor` — Milan clause 7.2.35.
#[derive(Debug, Clone, PartialEq)]
pub struct PtpPortDescriptor {
    pub object_name: AvdeccFixedString,
    pub localized_description: LocalizedStringReference,
    pub port_number: u16,
    pub port_type: u16,
    pub flags: u16,
    pub avb_interface_index: AvbInterfaceIndex,
}

/// `VideoClusterDescriptor` — same shape as [`AudioClusterDescriptor`], distinct
/// type tag.
pub type VideoClusterDescriptor = AudioClusterDescriptor;

/// `SensorClusterDescriptor` — same shape as [`AudioClusterDescriptor`], distinct
/// type tag.
pub type SensorClusterDescriptor = AudioClusterDescriptor;

/// The decoded payload of a READ_DESCRIPTOR response: exactly one populated
/// variant, selected by the descriptor type in the common 8-octet prefix.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Descriptor {
    Entity(EntityDescriptor),
    Configuration(ConfigurationDescriptor),
    AudioUnit(AudioUnitDescriptor),
    StreamInput(StreamDescriptor),
    StreamOutput(StreamDescriptor),
    JackInput(JackDescriptor),
    JackOutput(JackDescriptor),
    AvbInterface(AvbInterfaceDescriptor),
    ClockSource(ClockSourceDescriptor),
    MemoryObject(MemoryObjectDescriptor),
    Locale(LocaleDescriptor),
    Strings(StringsDescriptor),
    StreamPortInput(StreamPortDescriptor),
    StreamPortOutput(StreamPortDescriptor),
    ExternalPortInput(PortDescriptor),
    ExternalPortOutput(PortDescriptor),
    InternalPortInput(PortDescriptor),
    InternalPortOutput(PortDescriptor),
    AudioCluster(AudioClusterDescriptor),
    VideoCluster(VideoClusterDescriptor),
    SensorCluster(SensorClusterDescriptor),
    AudioMap(AudioMapDescriptor),
    Control(ControlDescriptor),
    ClockDomain(ClockDomainDescriptor),
    Timing(TimingDescriptor),
    PtpInstance(PtpInstanceDescriptor),
    PtpPort(PtpPortDescriptor),
}

impl Descriptor {
    /// The [`DescriptorType`] tag for the populated variant.
    #[must_use]
    pub fn descriptor_type(&self) -> DescriptorType {
        match self {
            Descriptor::Entity(_) => DescriptorType::Entity,
            Descriptor::Configuration(_) => DescriptorType::Configuration,
            Descriptor::AudioUnit(_) => DescriptorType::AudioUnit,
            Descriptor::StreamInput(_) => DescriptorType::StreamInput,
            Descriptor::StreamOutput(_) => DescriptorType::StreamOutput,
            Descriptor::JackInput(_) => DescriptorType::JackInput,
            Descriptor::JackOutput(_) => DescriptorType::JackOutput,
            Descriptor::AvbInterface(_) => DescriptorType::AvbInterface,
            Descriptor::ClockSource(_) => DescriptorType::ClockSource,
            Descriptor::MemoryObject(_) => DescriptorType::MemoryObject,
            Descriptor::Locale(_) => DescriptorType::Locale,
            Descriptor::Strings(_) => DescriptorType::Strings,
            Descriptor::StreamPortInput(_) => DescriptorType::StreamPortInput,
            Descriptor::StreamPortOutput(_) => DescriptorType::StreamPortOutput,
            Descriptor::ExternalPortInput(_) => DescriptorType::ExternalPortInput,
            Descriptor::ExternalPortOutput(_) => DescriptorType::ExternalPortOutput,
            Descriptor::InternalPortInput(_) => DescriptorType::InternalPortInput,
            Descriptor::InternalPortOutput(_) => DescriptorType::InternalPortOutput,
            Descriptor::AudioCluster(_) => DescriptorType::AudioCluster,
            Descriptor::VideoCluster(_) => DescriptorType::VideoCluster,
            Descriptor::SensorCluster(_) => DescriptorType::SensorCluster,
            Descriptor::AudioMap(_) => DescriptorType::AudioMap,
            Descriptor::Control(_) => DescriptorType::Control,
            Descriptor::ClockDomain(_) => DescriptorType::ClockDomain,
            Descriptor::Timing(_) => DescriptorType::Timing,
            Descriptor::PtpInstance(_) => DescriptorType::PtpInstance,
            Descriptor::PtpPort(_) => DescriptorType::PtpPort,
        }
    }
}
