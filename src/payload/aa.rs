// SPDX-License-Identifier: Apache-2.0 OR MIT

//! AA (Address Access) payload codec (§3.2): a list of TLV read/write/execute
//! descriptors against a 64-bit memory address space.

use super::error::{require_min_size, PayloadError, PayloadResult};
use crate::wire::{Cursor, CursorMut, WireError};

/// The AA TLV `mode` field (top 4 bits of the mode/length word).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AaMode {
    Read,
    Write,
    Execute,
    Unknown(u8),
}

impl AaMode {
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => AaMode::Read,
            1 => AaMode::Write,
            2 => AaMode::Execute,
            other => AaMode::Unknown(other),
        }
    }

    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            AaMode::Read => 0,
            AaMode::Write => 1,
            AaMode::Execute => 2,
            AaMode::Unknown(v) => v,
        }
    }
}

/// One Address Access TLV entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AaTlv {
    pub mode: AaMode,
    pub address: u64,
    pub data: Vec<u8>,
}

impl AaTlv {
    const HEADER_LEN: usize = 2 + 8 + 2;

    fn parse(cursor: &mut Cursor<'_>) -> Result<Self, WireError> {
        let mode_length = cursor.read_u16()?;
        let mode = AaMode::from_u8((mode_length >> 12) as u8);
        let length = mode_length & 0x0FFF;
        let address = cursor.read_u64()?;
        let _reserved = cursor.read_u16()?;
        let data = cursor.read_bytes(length as usize)?.to_vec();
        Ok(Self {
            mode,
            address,
            data,
        })
    }

    fn serialize(&self, cursor: &mut CursorMut<'_>) -> Result<(), WireError> {
        let mode_length = ((self.mode.to_u8() as u16) << 12) | (self.data.len() as u16 & 0x0FFF);
        cursor.write_u16(mode_length)?;
        cursor.write_u64(self.address)?;
        cursor.write_u16(0)?;
        cursor.write_bytes(&self.data)
    }

    #[must_use]
    fn wire_len(&self) -> usize {
        Self::HEADER_LEN + self.data.len()
    }
}

/// The full AA command/response payload: an ordered list of TLVs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AaPayload {
    pub tlvs: Vec<AaTlv>,
}

pub fn decode_aa_payload(bytes: &[u8]) -> PayloadResult<AaPayload> {
    let mut cursor = Cursor::new(bytes);
    let mut tlvs = Vec::new();
    while cursor.remaining() > 0 {
        require_min_size(AaTlv::HEADER_LEN, cursor.remaining())?;
        let tlv = AaTlv::parse(&mut cursor).map_err(|_| PayloadError::IncorrectSize {
            expected: AaTlv::HEADER_LEN,
            actual: cursor.remaining(),
        })?;
        tlvs.push(tlv);
    }
    Ok(AaPayload { tlvs })
}

pub fn encode_aa_payload(payload: &AaPayload, cursor: &mut CursorMut<'_>) -> Result<(), WireError> {
    for tlv in &payload.tlvs {
        tlv.serialize(cursor)?;
    }
    Ok(())
}

#[must_use]
pub fn aa_payload_wire_len(payload: &AaPayload) -> usize {
    payload.tlvs.iter().map(AaTlv::wire_len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_read_and_write_tlvs() {
        let payload = AaPayload {
            tlvs: vec![
                AaTlv {
                    mode: AaMode::Read,
                    address: 0x1000,
                    data: vec![0; 4],
                },
                AaTlv {
                    mode: AaMode::Write,
                    address: 0x2000,
                    data: vec![0xAA, 0xBB],
                },
            ],
        };
        let mut buf = vec![0u8; aa_payload_wire_len(&payload)];
        encode_aa_payload(&payload, &mut CursorMut::new(&mut buf)).unwrap();
        let decoded = decode_aa_payload(&buf).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn empty_payload_decodes_to_no_tlvs() {
        let decoded = decode_aa_payload(&[]).unwrap();
        assert!(decoded.tlvs.is_empty());
    }
}
