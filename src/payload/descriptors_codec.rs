// SPDX-License-Identifier: Apache-2.0 OR MIT

//! READ_DESCRIPTOR response decoding, selected by descriptor type (§4.2).

use super::error::{require_min_size, PayloadError, PayloadResult};
use crate::types::*;
use crate::wire::{Cursor, CursorMut, WireError};

/// The 8-byte common prefix of a READ_DESCRIPTOR response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadDescriptorPrefix {
    pub configuration_index: ConfigurationIndex,
    pub descriptor_type: DescriptorType,
    pub descriptor_index: DescriptorIndex,
}

impl ReadDescriptorPrefix {
    pub const LEN: usize = 8;

    pub fn parse(cursor: &mut Cursor<'_>) -> Result<Self, WireError> {
        let configuration_index = ConfigurationIndex(cursor.read_u16()?);
        let _reserved = cursor.read_u16()?;
        let descriptor_type = DescriptorType::from_u16(cursor.read_u16()?);
        let descriptor_index = DescriptorIndex(cursor.read_u16()?);
        Ok(Self {
            configuration_index,
            descriptor_type,
            descriptor_index,
        })
    }

    pub fn serialize(&self, cursor: &mut CursorMut<'_>) -> Result<(), WireError> {
        cursor.write_u16(self.configuration_index.0)?;
        cursor.write_u16(0)?;
        cursor.write_u16(self.descriptor_type.to_u16())?;
        cursor.write_u16(self.descriptor_index.0)
    }
}

fn read_fixed_string(cursor: &mut Cursor<'_>) -> Result<AvdeccFixedString, WireError> {
    Ok(AvdeccFixedString(cursor.read_array::<64>()?))
}

fn write_fixed_string(cursor: &mut CursorMut<'_>, s: &AvdeccFixedString) -> Result<(), WireError> {
    cursor.write_bytes(&s.0)
}

/// Decodes the descriptor-specific tail following [`ReadDescriptorPrefix`],
/// dispatching on `prefix.descriptor_type`, tolerating trailing bytes (§4.2).
///
/// Under the `tolerate_partial_on_nonsuccess` feature, a tail shorter than
/// the descriptor's fixed part on a non-success response is demoted from
/// [`PayloadError::IncorrectSize`] to [`PayloadError::PartialOnNonSuccess`].
pub fn decode_descriptor(
    prefix: &ReadDescriptorPrefix,
    status: u8,
    tail: &[u8],
) -> PayloadResult<Descriptor> {
    let mut cursor = Cursor::new(tail);
    match decode_descriptor_inner(prefix, &mut cursor) {
        Ok(d) => Ok(d),
        Err(PayloadError::IncorrectSize { expected, actual }) => {
            #[cfg(feature = "tolerate_partial_on_nonsuccess")]
            if status != 0 {
                return Err(PayloadError::PartialOnNonSuccess { status });
            }
            #[cfg(not(feature = "tolerate_partial_on_nonsuccess"))]
            let _ = status;
            Err(PayloadError::IncorrectSize { expected, actual })
        }
        Err(other) => Err(other),
    }
}

fn need(cursor: &Cursor<'_>, expected: usize) -> PayloadResult<()> {
    require_min_size(expected, cursor.remaining())
}

fn decode_descriptor_inner(
    prefix: &ReadDescriptorPrefix,
    cursor: &mut Cursor<'_>,
) -> PayloadResult<Descriptor> {
    macro_rules! rd {
        ($e:expr) => {
            $e.map_err(|_: WireError| PayloadError::IncorrectSize {
                expected: 0,
                actual: cursor.remaining(),
            })?
        };
    }

    match prefix.descriptor_type {
        DescriptorType::Entity => {
            need(cursor, 8 + 8 + 4 + 2 + 2 + 2 + 2 + 4 + 4 + 8 + 64 + 2 + 2 + 64 + 64 + 64 + 2 + 2)?;
            Ok(Descriptor::Entity(EntityDescriptor {
                entity_id: EntityID(rd!(cursor.read_u64())),
                entity_model_id: EntityModelID(rd!(cursor.read_u64())),
                entity_capabilities: EntityCapabilities::from_bits(rd!(cursor.read_u32())),
                talker_stream_sources: rd!(cursor.read_u16()),
                talker_capabilities: TalkerCapabilities::from_bits(rd!(cursor.read_u16())),
                listener_stream_sinks: rd!(cursor.read_u16()),
                listener_capabilities: ListenerCapabilities::from_bits(rd!(cursor.read_u16())),
                controller_capabilities: ControllerCapabilities::from_bits(rd!(cursor.read_u32())),
                available_index: rd!(cursor.read_u32()),
                association_id: AssociationID(rd!(cursor.read_u64())),
                entity_name: rd!(read_fixed_string(cursor)),
                vendor_name_string: LocalizedStringReference(rd!(cursor.read_u16())),
                model_name_string: LocalizedStringReference(rd!(cursor.read_u16())),
                firmware_version: rd!(read_fixed_string(cursor)),
                group_name: rd!(read_fixed_string(cursor)),
                serial_number: rd!(read_fixed_string(cursor)),
                configurations_count: rd!(cursor.read_u16()),
                current_configuration: ConfigurationIndex(rd!(cursor.read_u16())),
            }))
        }
        DescriptorType::Configuration => {
            need(cursor, 64 + 2 + 2 + 2)?;
            let object_name = rd!(read_fixed_string(cursor));
            let localized_description = LocalizedStringReference(rd!(cursor.read_u16()));
            let descriptor_counts_count = rd!(cursor.read_u16());
            let _descriptor_counts_offset = rd!(cursor.read_u16());
            let mut descriptor_counts = Vec::with_capacity(descriptor_counts_count as usize);
            for _ in 0..descriptor_counts_count {
                need(cursor, 4)?;
                descriptor_counts.push(DescriptorCount {
                    descriptor_type: DescriptorType::from_u16(rd!(cursor.read_u16())),
                    count: rd!(cursor.read_u16()),
                });
            }
            Ok(Descriptor::Configuration(ConfigurationDescriptor {
                object_name,
                localized_description,
                descriptor_counts,
            }))
        }
        DescriptorType::AudioUnit => {
            need(cursor, 64 + 2 + 2 + 4 + 4 + 4)?;
            let object_name = rd!(read_fixed_string(cursor));
            let localized_description = LocalizedStringReference(rd!(cursor.read_u16()));
            let clock_domain_index = ClockDomainIndex(rd!(cursor.read_u16()));
            let sampling_rates_count = rd!(cursor.read_u32());
            let current_sampling_rate = SamplingRate(rd!(cursor.read_u32()));
            let mut sampling_rates = Vec::with_capacity(sampling_rates_count as usize);
            for _ in 0..sampling_rates_count {
                need(cursor, 4)?;
                sampling_rates.push(SamplingRate(rd!(cursor.read_u32())));
            }
            Ok(Descriptor::AudioUnit(AudioUnitDescriptor {
                object_name,
                localized_description,
                clock_domain_index,
                current_sampling_rate,
                sampling_rates,
            }))
        }
        dt @ (DescriptorType::StreamInput | DescriptorType::StreamOutput) => {
            need(cursor, 64 + 2 + 2 + 2 + 8 + 4 + 2)?;
            let object_name = rd!(read_fixed_string(cursor));
            let localized_description = LocalizedStringReference(rd!(cursor.read_u16()));
            let clock_domain_index = ClockDomainIndex(rd!(cursor.read_u16()));
            let stream_flags = rd!(cursor.read_u16());
            let current_format = StreamFormat(rd!(cursor.read_u64()));
            let formats_count = rd!(cursor.read_u16());
            let backup_talker_entity_id_0 = EntityID(rd!(cursor.read_u64()));
            let backup_talker_unique_id_0 = rd!(cursor.read_u16());
            let mut formats = Vec::with_capacity(formats_count as usize);
            for _ in 0..formats_count {
                need(cursor, 8)?;
                formats.push(StreamFormat(rd!(cursor.read_u64())));
            }
            let desc = StreamDescriptor {
                object_name,
                localized_description,
                clock_domain_index,
                stream_flags,
                current_format,
                formats,
                backup_talker_entity_id_0,
                backup_talker_unique_id_0,
            };
            Ok(if dt == DescriptorType::StreamInput {
                Descriptor::StreamInput(desc)
            } else {
                Descriptor::StreamOutput(desc)
            })
        }
        dt @ (DescriptorType::JackInput | DescriptorType::JackOutput) => {
            need(cursor, 64 + 2 + 2 + 2 + 2 + 2)?;
            let desc = JackDescriptor {
                object_name: rd!(read_fixed_string(cursor)),
                localized_description: LocalizedStringReference(rd!(cursor.read_u16())),
                jack_flags: rd!(cursor.read_u16()),
                jack_type: rd!(cursor.read_u16()),
                number_of_controls: rd!(cursor.read_u16()),
                base_control: ControlIndex(rd!(cursor.read_u16())),
            };
            Ok(if dt == DescriptorType::JackInput {
                Descriptor::JackInput(desc)
            } else {
                Descriptor::JackOutput(desc)
            })
        }
        DescriptorType::AvbInterface => {
            need(cursor, 64 + 2 + 6 + 2 + 8 + 1 + 1 + 2 + 1 + 1 + 1 + 1 + 1 + 1 + 2)?;
            Ok(Descriptor::AvbInterface(AvbInterfaceDescriptor {
                object_name: rd!(read_fixed_string(cursor)),
                localized_description: LocalizedStringReference(rd!(cursor.read_u16())),
                mac_address: MacAddress(rd!(cursor.read_array::<6>())),
                interface_flags: rd!(cursor.read_u16()),
                clock_identity: EntityID(rd!(cursor.read_u64())),
                priority1: rd!(cursor.read_u8()),
                clock_class: rd!(cursor.read_u8()),
                offset_scaled_log_variance: rd!(cursor.read_u16()),
                clock_accuracy: rd!(cursor.read_u8()),
                priority2: rd!(cursor.read_u8()),
                domain_number: rd!(cursor.read_u8()),
                log_sync_interval: rd!(cursor.read_i8()),
                log_announce_interval: rd!(cursor.read_i8()),
                log_pdelay_interval: rd!(cursor.read_i8()),
                port_number: rd!(cursor.read_u16()),
            }))
        }
        DescriptorType::ClockSource => {
            need(cursor, 64 + 2 + 2 + 2 + 8 + 2 + 2)?;
            Ok(Descriptor::ClockSource(ClockSourceDescriptor {
                object_name: rd!(read_fixed_string(cursor)),
                localized_description: LocalizedStringReference(rd!(cursor.read_u16())),
                clock_source_flags: rd!(cursor.read_u16()),
                clock_source_type: rd!(cursor.read_u16()),
                clock_source_identifier: EntityID(rd!(cursor.read_u64())),
                clock_source_location_type: DescriptorType::from_u16(rd!(cursor.read_u16())),
                clock_source_location_index: rd!(cursor.read_u16()),
            }))
        }
        DescriptorType::MemoryObject => {
            need(cursor, 64 + 2 + 2 + 2 + 2 + 8 + 8 + 8)?;
            Ok(Descriptor::MemoryObject(MemoryObjectDescriptor {
                object_name: rd!(read_fixed_string(cursor)),
                localized_description: LocalizedStringReference(rd!(cursor.read_u16())),
                memory_object_type: rd!(cursor.read_u16()),
                target_descriptor_type: DescriptorType::from_u16(rd!(cursor.read_u16())),
                target_descriptor_index: rd!(cursor.read_u16()),
                start_address: rd!(cursor.read_u64()),
                maximum_length: rd!(cursor.read_u64()),
                length: rd!(cursor.read_u64()),
            }))
        }
        DescriptorType::Locale => {
            need(cursor, 64 + 2 + 2)?;
            Ok(Descriptor::Locale(LocaleDescriptor {
                locale_identifier: rd!(read_fixed_string(cursor)),
                number_of_strings: rd!(cursor.read_u16()),
                base_strings: StringsIndex(rd!(cursor.read_u16())),
            }))
        }
        DescriptorType::Strings => {
            need(cursor, 64 * 7)?;
            let mut strings = [AvdeccFixedString::empty(); 7];
            for slot in &mut strings {
                *slot = rd!(read_fixed_string(cursor));
            }
            Ok(Descriptor::Strings(StringsDescriptor { strings }))
        }
        dt @ (DescriptorType::StreamPortInput | DescriptorType::StreamPortOutput) => {
            need(cursor, 2 + 2 + 2 + 2 + 2 + 2 + 2 + 2)?;
            let desc = StreamPortDescriptor {
                clock_domain_index: ClockDomainIndex(rd!(cursor.read_u16())),
                port_flags: rd!(cursor.read_u16()),
                number_of_controls: rd!(cursor.read_u16()),
                base_control: ControlIndex(rd!(cursor.read_u16())),
                number_of_clusters: rd!(cursor.read_u16()),
                base_cluster: AudioClusterIndex(rd!(cursor.read_u16())),
                number_of_maps: rd!(cursor.read_u16()),
                base_map: AudioMapIndex(rd!(cursor.read_u16())),
            };
            Ok(if dt == DescriptorType::StreamPortInput {
                Descriptor::StreamPortInput(desc)
            } else {
                Descriptor::StreamPortOutput(desc)
            })
        }
        dt @ (DescriptorType::ExternalPortInput
        | DescriptorType::ExternalPortOutput
        | DescriptorType::InternalPortInput
        | DescriptorType::InternalPortOutput) => {
            need(cursor, 2 + 2 + 2 + 2 + 2 + 2 + 2)?;
            let desc = PortDescriptor {
                clock_domain_index: ClockDomainIndex(rd!(cursor.read_u16())),
                port_flags: rd!(cursor.read_u16()),
                number_of_controls: rd!(cursor.read_u16()),
                base_control: ControlIndex(rd!(cursor.read_u16())),
                signal_type: DescriptorType::from_u16(rd!(cursor.read_u16())),
                signal_index: rd!(cursor.read_u16()),
                signal_output: rd!(cursor.read_u16()),
            };
            Ok(match dt {
                DescriptorType::ExternalPortInput => Descriptor::ExternalPortInput(desc),
                DescriptorType::ExternalPortOutput => Descriptor::ExternalPortOutput(desc),
                DescriptorType::InternalPortInput => Descriptor::InternalPortInput(desc),
                _ => Descriptor::InternalPortOutput(desc),
            })
        }
        dt @ (DescriptorType::AudioCluster
        | DescriptorType::VideoCluster
        | DescriptorType::SensorCluster) => {
            need(cursor, 64 + 2 + 2 + 2 + 2 + 4 + 4 + 2 + 1)?;
            let desc = AudioClusterDescriptor {
                object_name: rd!(read_fixed_string(cursor)),
                localized_description: LocalizedStringReference(rd!(cursor.read_u16())),
                signal_type: DescriptorType::from_u16(rd!(cursor.read_u16())),
                signal_index: rd!(cursor.read_u16()),
                signal_output: rd!(cursor.read_u16()),
                path_latency: rd!(cursor.read_u32()),
                block_latency: rd!(cursor.read_u32()),
                channel_count: rd!(cursor.read_u16()),
                format: rd!(cursor.read_u8()),
            };
            Ok(match dt {
                DescriptorType::AudioCluster => Descriptor::AudioCluster(desc),
                DescriptorType::VideoCluster => Descriptor::VideoCluster(desc),
                _ => Descriptor::SensorCluster(desc),
            })
        }
        DescriptorType::AudioMap => {
            need(cursor, 2 + 2 + 4)?;
            let mapping_count = rd!(cursor.read_u16());
            let _reserved = rd!(cursor.read_u16());
            let mut mappings = Vec::with_capacity(mapping_count as usize);
            for _ in 0..mapping_count {
                need(cursor, 8)?;
                mappings.push(AudioMapping {
                    stream_index: rd!(cursor.read_u16()),
                    stream_channel: rd!(cursor.read_u16()),
                    cluster_offset: rd!(cursor.read_u16()),
                    cluster_channel: rd!(cursor.read_u16()),
                });
            }
            Ok(Descriptor::AudioMap(AudioMapDescriptor { mappings }))
        }
        DescriptorType::Control => {
            need(
                cursor,
                64 + 2 + 4 + 4 + 2 + 2 + 8 + 4 + 2 + 2 + 2 + 2,
            )?;
            let object_name = rd!(read_fixed_string(cursor));
            let localized_description = LocalizedStringReference(rd!(cursor.read_u16()));
            let block_latency = rd!(cursor.read_u32());
            let control_latency = rd!(cursor.read_u32());
            let control_domain = rd!(cursor.read_u16());
            let control_value_type = rd!(cursor.read_u16());
            let control_type = EntityID(rd!(cursor.read_u64()));
            let reset_time = rd!(cursor.read_u32());
            let signal_type = DescriptorType::from_u16(rd!(cursor.read_u16()));
            let signal_index = rd!(cursor.read_u16());
            let signal_output = rd!(cursor.read_u16());
            let number_of_values = rd!(cursor.read_u16());
            need(cursor, number_of_values as usize)?;
            let values = rd!(cursor.read_bytes(number_of_values as usize)).to_vec();
            Ok(Descriptor::Control(ControlDescriptor {
                object_name,
                localized_description,
                block_latency,
                control_latency,
                control_domain,
                control_value_type,
                control_type,
                reset_time,
                signal_type,
                signal_index,
                signal_output,
                number_of_values,
                values,
            }))
        }
        DescriptorType::ClockDomain => {
            need(cursor, 64 + 2 + 2 + 2)?;
            let object_name = rd!(read_fixed_string(cursor));
            let localized_description = LocalizedStringReference(rd!(cursor.read_u16()));
            let clock_source_index = ClockSourceIndex(rd!(cursor.read_u16()));
            let count = rd!(cursor.read_u16());
            let mut clock_sources = Vec::with_capacity(count as usize);
            for _ in 0..count {
                need(cursor, 2)?;
                clock_sources.push(ClockSourceIndex(rd!(cursor.read_u16())));
            }
            Ok(Descriptor::ClockDomain(ClockDomainDescriptor {
                object_name,
                localized_description,
                clock_source_index,
                clock_sources,
            }))
        }
        DescriptorType::Timing => {
            need(cursor, 64 + 2 + 2 + 2)?;
            let object_name = rd!(read_fixed_string(cursor));
            let localized_description = LocalizedStringReference(rd!(cursor.read_u16()));
            let algorithm = rd!(cursor.read_u16());
            let count = rd!(cursor.read_u16());
            let mut ptp_instances = Vec::with_capacity(count as usize);
            for _ in 0..count {
                need(cursor, 2)?;
                ptp_instances.push(PtpInstanceIndex(rd!(cursor.read_u16())));
            }
            Ok(Descriptor::Timing(TimingDescriptor {
                object_name,
                localized_description,
                algorithm,
                ptp_instances,
            }))
        }
        DescriptorType::PtpInstance => {
            need(cursor, 64 + 2 + 8 + 2 + 2 + 2 + 2 + 2)?;
            Ok(Descriptor::PtpInstance(PtpInstanceDescriptor {
                object_name: rd!(read_fixed_string(cursor)),
                localized_description: LocalizedStringReference(rd!(cursor.read_u16())),
                clock_identity: EntityID(rd!(cursor.read_u64())),
                flags: rd!(cursor.read_u16()),
                number_of_controls: rd!(cursor.read_u16()),
                base_control: ControlIndex(rd!(cursor.read_u16())),
                number_of_ptp_ports: rd!(cursor.read_u16()),
                base_ptp_port: PtpPortIndex(rd!(cursor.read_u16())),
            }))
        }
        DescriptorType::PtpPort => {
            need(cursor, 64 + 2 + 2 + 2 + 2 + 2)?;
            Ok(Descriptor::PtpPort(PtpPortDescriptor {
                object_name: rd!(read_fixed_string(cursor)),
                localized_description: LocalizedStringReference(rd!(cursor.read_u16())),
                port_number: rd!(cursor.read_u16()),
                port_type: rd!(cursor.read_u16()),
                flags: rd!(cursor.read_u16()),
                avb_interface_index: AvbInterfaceIndex(rd!(cursor.read_u16())),
            }))
        }
        other => Err(PayloadError::InvalidDescriptorType(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_descriptor_prefix_round_trips() {
        let prefix = ReadDescriptorPrefix {
            configuration_index: ConfigurationIndex(0),
            descriptor_type: DescriptorType::StreamInput,
            descriptor_index: DescriptorIndex(3),
        };
        let mut buf = [0u8; ReadDescriptorPrefix::LEN];
        prefix.serialize(&mut CursorMut::new(&mut buf)).unwrap();
        let parsed = ReadDescriptorPrefix::parse(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(parsed, prefix);
    }

    #[test]
    fn locale_descriptor_round_trips() {
        let mut buf = [0u8; 64 + 2 + 2];
        {
            let mut w = CursorMut::new(&mut buf);
            write_fixed_string(&mut w, &AvdeccFixedString::from_str_truncated("en-US")).unwrap();
            w.write_u16(7).unwrap();
            w.write_u16(0).unwrap();
        }
        let prefix = ReadDescriptorPrefix {
            configuration_index: ConfigurationIndex(0),
            descriptor_type: DescriptorType::Locale,
            descriptor_index: DescriptorIndex(0),
        };
        let decoded = decode_descriptor(&prefix, 0, &buf).unwrap();
        match decoded {
            Descriptor::Locale(l) => {
                assert_eq!(l.locale_identifier.as_str(), "en-US");
                assert_eq!(l.number_of_strings, 7);
            }
            other => panic!("expected Locale, got {other:?}"),
        }
    }

    #[test]
    fn audio_map_decodes_variable_mapping_quads() {
        let mut buf = vec![0u8; 4 + 8 * 2];
        {
            let mut w = CursorMut::new(&mut buf);
            w.write_u16(2).unwrap();
            w.write_u16(0).unwrap();
            w.write_u16(1).unwrap();
            w.write_u16(0).unwrap();
            w.write_u16(0).unwrap();
            w.write_u16(0).unwrap();
            w.write_u16(2).unwrap();
            w.write_u16(1).unwrap();
            w.write_u16(1).unwrap();
            w.write_u16(1).unwrap();
        }
        let prefix = ReadDescriptorPrefix {
            configuration_index: ConfigurationIndex(0),
            descriptor_type: DescriptorType::AudioMap,
            descriptor_index: DescriptorIndex(0),
        };
        let decoded = decode_descriptor(&prefix, 0, &buf).unwrap();
        match decoded {
            Descriptor::AudioMap(m) => assert_eq!(m.mappings.len(), 2),
            other => panic!("expected AudioMap, got {other:?}"),
        }
    }

    #[test]
    fn unknown_descriptor_type_is_invalid() {
        let prefix = ReadDescriptorPrefix {
            configuration_index: ConfigurationIndex(0),
            descriptor_type: DescriptorType::Unknown(0xFFFF),
            descriptor_index: DescriptorIndex(0),
        };
        let err = decode_descriptor(&prefix, 0, &[]).unwrap_err();
        assert_eq!(
            err,
            PayloadError::InvalidDescriptorType(DescriptorType::Unknown(0xFFFF))
        );
    }

    #[test]
    fn short_payload_on_success_is_incorrect_size() {
        let prefix = ReadDescriptorPrefix {
            configuration_index: ConfigurationIndex(0),
            descriptor_type: DescriptorType::ClockDomain,
            descriptor_index: DescriptorIndex(0),
        };
        let err = decode_descriptor(&prefix, 0, &[0u8; 4]).unwrap_err();
        assert!(matches!(err, PayloadError::IncorrectSize { .. }));
    }
}
