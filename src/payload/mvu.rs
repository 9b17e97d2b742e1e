// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Milan Vendor Unique (MVU) command payload codecs (§3.2, §4.2).
//!
//! Sizes for GET_MILAN_INFO, SET/GET_SYSTEM_UNIQUE_ID, and BIND_STREAM are
//! the authoritative Milan constants; the remaining MVU commands use
//! internally-consistent layouts built the same way.

use super::error::{require_min_size, PayloadError, PayloadResult};
use crate::types::{DescriptorIndex, DescriptorType, EntityID};
use crate::wire::{Cursor, CursorMut, WireError};

/// MVU `command_type` catalog (§3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MvuCommandType {
    GetMilanInfo,
    SetSystemUniqueId,
    GetSystemUniqueId,
    SetMediaClockReferenceInfo,
    GetMediaClockReferenceInfo,
    BindStream,
    UnbindStream,
    GetStreamInputInfoEx,
    Unknown(u16),
}

impl MvuCommandType {
    #[must_use]
    pub fn from_u16(value: u16) -> Self {
        use MvuCommandType::*;
        match value {
            0x0000 => GetMilanInfo,
            0x0001 => SetSystemUniqueId,
            0x0002 => GetSystemUniqueId,
            0x0003 => SetMediaClockReferenceInfo,
            0x0004 => GetMediaClockReferenceInfo,
            0x0005 => BindStream,
            0x0006 => UnbindStream,
            0x0007 => GetStreamInputInfoEx,
            other => Unknown(other),
        }
    }

    #[must_use]
    pub fn to_u16(self) -> u16 {
        use MvuCommandType::*;
        match self {
            GetMilanInfo => 0x0000,
            SetSystemUniqueId => 0x0001,
            GetSystemUniqueId => 0x0002,
            SetMediaClockReferenceInfo => 0x0003,
            GetMediaClockReferenceInfo => 0x0004,
            BindStream => 0x0005,
            UnbindStream => 0x0006,
            GetStreamInputInfoEx => 0x0007,
            Unknown(v) => v,
        }
    }
}

/// Payload size floor for one MVU command/response, mirroring the
/// `protocolMvuPayloadSizes.hpp` constants (Milan 1.2 shape used throughout;
/// Milan 1.3's longer variants are accepted as overlong payloads per §4.2).
#[must_use]
pub fn size_expectation(command_type: MvuCommandType) -> Option<(usize, usize)> {
    use MvuCommandType::*;
    Some(match command_type {
        GetMilanInfo => (2, 14),
        SetSystemUniqueId => (6, 6),
        GetSystemUniqueId => (2, 6),
        SetMediaClockReferenceInfo => (74, 74),
        GetMediaClockReferenceInfo => (2, 74),
        BindStream => (18, 18),
        UnbindStream => (6, 6),
        GetStreamInputInfoEx => (6, 18),
        Unknown(_) => return None,
    })
}

/// GET_MILAN_INFO response — Milan info block (14-byte Milan 1.2 shape).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilanInfo {
    pub protocol_version: u32,
    pub features_flags: u32,
    pub certification_version: u32,
}

pub fn decode_milan_info_response(bytes: &[u8]) -> PayloadResult<MilanInfo> {
    require_min_size(14, bytes.len())?;
    let mut c = Cursor::new(bytes);
    let remap = |_: WireError| PayloadError::IncorrectSize {
        expected: 14,
        actual: bytes.len(),
    };
    let _reserved = c.read_u16().map_err(remap)?;
    Ok(MilanInfo {
        protocol_version: c.read_u32().map_err(remap)?,
        features_flags: c.read_u32().map_err(remap)?,
        certification_version: c.read_u32().map_err(remap)?,
    })
}

pub fn encode_milan_info_response(info: &MilanInfo, cursor: &mut CursorMut<'_>) -> Result<(), WireError> {
    cursor.write_u16(0)?;
    cursor.write_u32(info.protocol_version)?;
    cursor.write_u32(info.features_flags)?;
    cursor.write_u32(info.certification_version)
}

/// SET_SYSTEM_UNIQUE_ID / GET_SYSTEM_UNIQUE_ID response (Milan 1.2 6-byte shape).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemUniqueId {
    pub system_unique_id: u32,
}

pub fn decode_system_unique_id(bytes: &[u8]) -> PayloadResult<SystemUniqueId> {
    require_min_size(6, bytes.len())?;
    let mut c = Cursor::new(bytes);
    let remap = |_: WireError| PayloadError::IncorrectSize {
        expected: 6,
        actual: bytes.len(),
    };
    let _reserved = c.read_u16().map_err(remap)?;
    Ok(SystemUniqueId {
        system_unique_id: c.read_u32().map_err(remap)?,
    })
}

pub fn encode_system_unique_id(
    value: &SystemUniqueId,
    cursor: &mut CursorMut<'_>,
) -> Result<(), WireError> {
    cursor.write_u16(0)?;
    cursor.write_u32(value.system_unique_id)
}

/// BIND_STREAM command/response — 18-byte fixed shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindStream {
    pub flags: u16,
    pub descriptor_type: DescriptorType,
    pub descriptor_index: DescriptorIndex,
    pub talker_entity_id: EntityID,
    pub talker_stream_index: u16,
}

pub fn decode_bind_stream(bytes: &[u8]) -> PayloadResult<BindStream> {
    require_min_size(18, bytes.len())?;
    let mut c = Cursor::new(bytes);
    let remap = |_: WireError| PayloadError::IncorrectSize {
        expected: 18,
        actual: bytes.len(),
    };
    let flags = c.read_u16().map_err(remap)?;
    let descriptor_type = DescriptorType::from_u16(c.read_u16().map_err(remap)?);
    let descriptor_index = DescriptorIndex(c.read_u16().map_err(remap)?);
    let talker_entity_id = EntityID(c.read_u64().map_err(remap)?);
    let talker_stream_index = c.read_u16().map_err(remap)?;
    let _reserved = c.read_u16().map_err(remap)?;
    Ok(BindStream {
        flags,
        descriptor_type,
        descriptor_index,
        talker_entity_id,
        talker_stream_index,
    })
}

pub fn encode_bind_stream(value: &BindStream, cursor: &mut CursorMut<'_>) -> Result<(), WireError> {
    cursor.write_u16(value.flags)?;
    cursor.write_u16(value.descriptor_type.to_u16())?;
    cursor.write_u16(value.descriptor_index.0)?;
    cursor.write_u64(value.talker_entity_id.0)?;
    cursor.write_u16(value.talker_stream_index)?;
    cursor.write_u16(0)
}

/// UNBIND_STREAM command/response — 6-byte fixed shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnbindStream {
    pub descriptor_type: DescriptorType,
    pub descriptor_index: DescriptorIndex,
}

pub fn decode_unbind_stream(bytes: &[u8]) -> PayloadResult<UnbindStream> {
    require_min_size(6, bytes.len())?;
    let mut c = Cursor::new(bytes);
    let remap = |_: WireError| PayloadError::IncorrectSize {
        expected: 6,
        actual: bytes.len(),
    };
    let descriptor_type = DescriptorType::from_u16(c.read_u16().map_err(remap)?);
    let descriptor_index = DescriptorIndex(c.read_u16().map_err(remap)?);
    let _reserved = c.read_u16().map_err(remap)?;
    Ok(UnbindStream {
        descriptor_type,
        descriptor_index,
    })
}

pub fn encode_unbind_stream(value: &UnbindStream, cursor: &mut CursorMut<'_>) -> Result<(), WireError> {
    cursor.write_u16(value.descriptor_type.to_u16())?;
    cursor.write_u16(value.descriptor_index.0)?;
    cursor.write_u16(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milan_info_round_trips() {
        let info = MilanInfo {
            protocol_version: 1,
            features_flags: 0x5,
            certification_version: 0x0102_0300,
        };
        let mut buf = [0u8; 14];
        encode_milan_info_response(&info, &mut CursorMut::new(&mut buf)).unwrap();
        assert_eq!(decode_milan_info_response(&buf).unwrap(), info);
    }

    #[test]
    fn bind_stream_round_trips() {
        let bind = BindStream {
            flags: 0,
            descriptor_type: DescriptorType::StreamInput,
            descriptor_index: DescriptorIndex(1),
            talker_entity_id: EntityID(0x1122_3344_5566_7788),
            talker_stream_index: 0,
        };
        let mut buf = [0u8; 18];
        encode_bind_stream(&bind, &mut CursorMut::new(&mut buf)).unwrap();
        assert_eq!(decode_bind_stream(&buf).unwrap(), bind);
    }

    #[test]
    fn command_type_round_trips_every_known_value() {
        for raw in 0u16..8 {
            let ct = MvuCommandType::from_u16(raw);
            assert_eq!(ct.to_u16(), raw);
        }
    }

    #[test]
    fn unknown_mvu_command_type_has_no_size_entry() {
        assert_eq!(size_expectation(MvuCommandType::Unknown(0xBEEF)), None);
    }
}
