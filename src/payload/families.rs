// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed codecs for the AEM command families named in §4.5, beyond
//! READ_DESCRIPTOR (which lives in [`super::descriptors_codec`]).

use super::error::{require_min_size, PayloadError, PayloadResult};
use crate::types::{
    AssociationID, ConfigurationIndex, DescriptorIndex, DescriptorType, SamplingRate,
    StreamFormat,
};
use crate::wire::{Cursor, CursorMut, WireError};

fn map_wire(cursor_remaining: usize) -> impl Fn(WireError) -> PayloadError {
    move |_| PayloadError::IncorrectSize {
        expected: 0,
        actual: cursor_remaining,
    }
}

/// ACQUIRE_ENTITY / LOCK_ENTITY command payload — shared shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireOrLockCommand {
    pub flags: u32,
    pub descriptor_type: DescriptorType,
    pub descriptor_index: DescriptorIndex,
}

/// ACQUIRE_ENTITY / LOCK_ENTITY response payload — shared shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireOrLockResponse {
    pub flags: u32,
    pub owner_entity_id: crate::types::EntityID,
    pub descriptor_type: DescriptorType,
    pub descriptor_index: DescriptorIndex,
}

pub fn decode_acquire_or_lock_command(bytes: &[u8]) -> PayloadResult<AcquireOrLockCommand> {
    require_min_size(8, bytes.len())?;
    let mut c = Cursor::new(bytes);
    let map = map_wire(c.remaining());
    Ok(AcquireOrLockCommand {
        flags: c.read_u32().map_err(&map)?,
        descriptor_type: DescriptorType::from_u16(c.read_u16().map_err(&map)?),
        descriptor_index: DescriptorIndex(c.read_u16().map_err(&map)?),
    })
}

pub fn encode_acquire_or_lock_command(
    cmd: &AcquireOrLockCommand,
    cursor: &mut CursorMut<'_>,
) -> Result<(), WireError> {
    cursor.write_u32(cmd.flags)?;
    cursor.write_u16(cmd.descriptor_type.to_u16())?;
    cursor.write_u16(cmd.descriptor_index.0)
}

pub fn decode_acquire_or_lock_response(bytes: &[u8]) -> PayloadResult<AcquireOrLockResponse> {
    require_min_size(16, bytes.len())?;
    let mut c = Cursor::new(bytes);
    let map = map_wire(c.remaining());
    Ok(AcquireOrLockResponse {
        flags: c.read_u32().map_err(&map)?,
        owner_entity_id: crate::types::EntityID(c.read_u64().map_err(&map)?),
        descriptor_type: DescriptorType::from_u16(c.read_u16().map_err(&map)?),
        descriptor_index: DescriptorIndex(c.read_u16().map_err(&map)?),
    })
}

pub fn encode_acquire_or_lock_response(
    rsp: &AcquireOrLockResponse,
    cursor: &mut CursorMut<'_>,
) -> Result<(), WireError> {
    cursor.write_u32(rsp.flags)?;
    cursor.write_u64(rsp.owner_entity_id.0)?;
    cursor.write_u16(rsp.descriptor_type.to_u16())?;
    cursor.write_u16(rsp.descriptor_index.0)
}

/// SET_NAME / GET_NAME payload (§4.2: "the codec does not validate [indices]
/// semantically, it only extracts them").
#[derive(Debug, Clone, PartialEq)]
pub struct NamePayload {
    pub descriptor_type: DescriptorType,
    pub descriptor_index: DescriptorIndex,
    pub name_index: u16,
    pub configuration_index: ConfigurationIndex,
    pub name: crate::types::AvdeccFixedString,
}

pub fn decode_name(bytes: &[u8]) -> PayloadResult<NamePayload> {
    require_min_size(72, bytes.len())?;
    let mut c = Cursor::new(bytes);
    let map = map_wire(c.remaining());
    Ok(NamePayload {
        descriptor_type: DescriptorType::from_u16(c.read_u16().map_err(&map)?),
        descriptor_index: DescriptorIndex(c.read_u16().map_err(&map)?),
        name_index: c.read_u16().map_err(&map)?,
        configuration_index: ConfigurationIndex(c.read_u16().map_err(&map)?),
        name: crate::types::AvdeccFixedString(c.read_array::<64>().map_err(&map)?),
    })
}

pub fn encode_name(payload: &NamePayload, cursor: &mut CursorMut<'_>) -> Result<(), WireError> {
    cursor.write_u16(payload.descriptor_type.to_u16())?;
    cursor.write_u16(payload.descriptor_index.0)?;
    cursor.write_u16(payload.name_index)?;
    cursor.write_u16(payload.configuration_index.0)?;
    cursor.write_bytes(&payload.name.0)
}

/// SET_STREAM_FORMAT / GET_STREAM_FORMAT payload — shared command/response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormatPayload {
    pub descriptor_type: DescriptorType,
    pub descriptor_index: DescriptorIndex,
    pub stream_format: StreamFormat,
}

pub fn decode_stream_format(bytes: &[u8]) -> PayloadResult<StreamFormatPayload> {
    require_min_size(12, bytes.len())?;
    let mut c = Cursor::new(bytes);
    let map = map_wire(c.remaining());
    Ok(StreamFormatPayload {
        descriptor_type: DescriptorType::from_u16(c.read_u16().map_err(&map)?),
        descriptor_index: DescriptorIndex(c.read_u16().map_err(&map)?),
        stream_format: StreamFormat(c.read_u64().map_err(&map)?),
    })
}

pub fn encode_stream_format(
    payload: &StreamFormatPayload,
    cursor: &mut CursorMut<'_>,
) -> Result<(), WireError> {
    cursor.write_u16(payload.descriptor_type.to_u16())?;
    cursor.write_u16(payload.descriptor_index.0)?;
    cursor.write_u64(payload.stream_format.0)
}

/// SET_SAMPLING_RATE / GET_SAMPLING_RATE response shape (command omits the rate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingRatePayload {
    pub descriptor_type: DescriptorType,
    pub descriptor_index: DescriptorIndex,
    pub sampling_rate: SamplingRate,
}

pub fn decode_sampling_rate(bytes: &[u8]) -> PayloadResult<SamplingRatePayload> {
    require_min_size(8, bytes.len())?;
    let mut c = Cursor::new(bytes);
    let map = map_wire(c.remaining());
    Ok(SamplingRatePayload {
        descriptor_type: DescriptorType::from_u16(c.read_u16().map_err(&map)?),
        descriptor_index: DescriptorIndex(c.read_u16().map_err(&map)?),
        sampling_rate: SamplingRate(c.read_u32().map_err(&map)?),
    })
}

pub fn encode_sampling_rate(
    payload: &SamplingRatePayload,
    cursor: &mut CursorMut<'_>,
) -> Result<(), WireError> {
    cursor.write_u16(payload.descriptor_type.to_u16())?;
    cursor.write_u16(payload.descriptor_index.0)?;
    cursor.write_u32(payload.sampling_rate.0)
}

/// START_STREAMING / STOP_STREAMING payload — just names the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamingControlPayload {
    pub descriptor_type: DescriptorType,
    pub descriptor_index: DescriptorIndex,
}

pub fn decode_streaming_control(bytes: &[u8]) -> PayloadResult<StreamingControlPayload> {
    require_min_size(4, bytes.len())?;
    let mut c = Cursor::new(bytes);
    let map = map_wire(c.remaining());
    Ok(StreamingControlPayload {
        descriptor_type: DescriptorType::from_u16(c.read_u16().map_err(&map)?),
        descriptor_index: DescriptorIndex(c.read_u16().map_err(&map)?),
    })
}

pub fn encode_streaming_control(
    payload: &StreamingControlPayload,
    cursor: &mut CursorMut<'_>,
) -> Result<(), WireError> {
    cursor.write_u16(payload.descriptor_type.to_u16())?;
    cursor.write_u16(payload.descriptor_index.0)
}

/// SET_CONTROL / GET_CONTROL payload — the value blob is opaque (§4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlValuesPayload {
    pub descriptor_type: DescriptorType,
    pub descriptor_index: DescriptorIndex,
    pub values: Vec<u8>,
}

pub fn decode_control_values(bytes: &[u8]) -> PayloadResult<ControlValuesPayload> {
    require_min_size(4, bytes.len())?;
    let mut c = Cursor::new(bytes);
    let map = map_wire(c.remaining());
    let descriptor_type = DescriptorType::from_u16(c.read_u16().map_err(&map)?);
    let descriptor_index = DescriptorIndex(c.read_u16().map_err(&map)?);
    let values = c.read_bytes(c.remaining()).map_err(&map)?.to_vec();
    Ok(ControlValuesPayload {
        descriptor_type,
        descriptor_index,
        values,
    })
}

pub fn encode_control_values(
    payload: &ControlValuesPayload,
    cursor: &mut CursorMut<'_>,
) -> Result<(), WireError> {
    cursor.write_u16(payload.descriptor_type.to_u16())?;
    cursor.write_u16(payload.descriptor_index.0)?;
    cursor.write_bytes(&payload.values)
}

/// SET_ASSOCIATION_ID / GET_ASSOCIATION_ID payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssociationIdPayload {
    pub association_id: AssociationID,
}

pub fn decode_association_id(bytes: &[u8]) -> PayloadResult<AssociationIdPayload> {
    require_min_size(8, bytes.len())?;
    let mut c = Cursor::new(bytes);
    let map = map_wire(c.remaining());
    Ok(AssociationIdPayload {
        association_id: AssociationID(c.read_u64().map_err(&map)?),
    })
}

pub fn encode_association_id(
    payload: &AssociationIdPayload,
    cursor: &mut CursorMut<'_>,
) -> Result<(), WireError> {
    cursor.write_u64(payload.association_id.0)
}

/// One GET_AUDIO_MAP response page, or an ADD/REMOVE_AUDIO_MAPPINGS command (§4.2).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioMapPage {
    pub descriptor_type: DescriptorType,
    pub descriptor_index: DescriptorIndex,
    pub map_index: u16,
    pub number_of_maps: u16,
    pub mappings: Vec<crate::types::AudioMapping>,
}

pub fn decode_audio_map_page(bytes: &[u8]) -> PayloadResult<AudioMapPage> {
    require_min_size(12, bytes.len())?;
    let mut c = Cursor::new(bytes);
    let map = map_wire(c.remaining());
    let descriptor_type = DescriptorType::from_u16(c.read_u16().map_err(&map)?);
    let descriptor_index = DescriptorIndex(c.read_u16().map_err(&map)?);
    let map_index = c.read_u16().map_err(&map)?;
    let number_of_maps = c.read_u16().map_err(&map)?;
    let number_of_mappings = c.read_u16().map_err(&map)?;
    let _reserved = c.read_u16().map_err(&map)?;
    let mut mappings = Vec::with_capacity(number_of_mappings as usize);
    for _ in 0..number_of_mappings {
        require_min_size(8, c.remaining())?;
        mappings.push(crate::types::AudioMapping {
            stream_index: c.read_u16().map_err(&map)?,
            stream_channel: c.read_u16().map_err(&map)?,
            cluster_offset: c.read_u16().map_err(&map)?,
            cluster_channel: c.read_u16().map_err(&map)?,
        });
    }
    Ok(AudioMapPage {
        descriptor_type,
        descriptor_index,
        map_index,
        number_of_maps,
        mappings,
    })
}

pub fn encode_audio_map_page(page: &AudioMapPage, cursor: &mut CursorMut<'_>) -> Result<(), WireError> {
    cursor.write_u16(page.descriptor_type.to_u16())?;
    cursor.write_u16(page.descriptor_index.0)?;
    cursor.write_u16(page.map_index)?;
    cursor.write_u16(page.number_of_maps)?;
    cursor.write_u16(page.mappings.len() as u16)?;
    cursor.write_u16(0)?;
    for m in &page.mappings {
        cursor.write_u16(m.stream_index)?;
        cursor.write_u16(m.stream_channel)?;
        cursor.write_u16(m.cluster_offset)?;
        cursor.write_u16(m.cluster_channel)?;
    }
    Ok(())
}

/// `map_index == number_of_maps - 1` marks the final page of a multi-page
/// GET_AUDIO_MAP sequence (§4.2). Callers must keep issuing GET_AUDIO_MAP
/// commands with increasing `map_index` until this returns `true`.
#[must_use]
pub fn is_last_audio_map_page(page: &AudioMapPage) -> bool {
    page.number_of_maps == 0 || page.map_index + 1 == page.number_of_maps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AvdeccFixedString;

    #[test]
    fn name_payload_round_trips() {
        let payload = NamePayload {
            descriptor_type: DescriptorType::StreamInput,
            descriptor_index: DescriptorIndex(2),
            name_index: 0,
            configuration_index: ConfigurationIndex(0),
            name: AvdeccFixedString::from_str_truncated("Input 1"),
        };
        let mut buf = [0u8; 72];
        encode_name(&payload, &mut CursorMut::new(&mut buf)).unwrap();
        let decoded = decode_name(&buf).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn audio_map_page_last_page_detection() {
        let mut page = AudioMapPage {
            descriptor_type: DescriptorType::StreamPortInput,
            descriptor_index: DescriptorIndex(0),
            map_index: 0,
            number_of_maps: 1,
            mappings: vec![],
        };
        assert!(is_last_audio_map_page(&page));
        page.number_of_maps = 3;
        page.map_index = 0;
        assert!(!is_last_audio_map_page(&page));
        page.map_index = 2;
        assert!(is_last_audio_map_page(&page));
    }

    #[test]
    fn control_values_rejects_too_short_payload() {
        let err = decode_control_values(&[0u8; 2]).unwrap_err();
        assert!(matches!(err, PayloadError::IncorrectSize { .. }));
    }

    #[test]
    fn acquire_or_lock_round_trips() {
        let cmd = AcquireOrLockCommand {
            flags: 0,
            descriptor_type: DescriptorType::Entity,
            descriptor_index: DescriptorIndex(0),
        };
        let mut buf = [0u8; 8];
        encode_acquire_or_lock_command(&cmd, &mut CursorMut::new(&mut buf)).unwrap();
        assert_eq!(decode_acquire_or_lock_command(&buf).unwrap(), cmd);
    }
}
