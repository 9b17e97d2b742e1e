// SPDX-License-Identifier: Apache-2.0 OR MIT

//! AECP (AVDECC Enumeration and Control Protocol) common framing (§6.2).
//!
//! This module frames the part shared by AEM, AA, and MVU: the AECP common
//! header (target/controller entity IDs, sequence ID) plus the AEM/MVU
//! sub-header that precedes command-specific bytes. Command-specific payload
//! decoding belongs to the payload codec.

use super::cursor::{Cursor, CursorMut};
use super::error::WireError;
use super::header::{CommonHeader, Subtype};
use crate::types::EntityID;

/// AECP message type, carried in the common header's `control_data` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AecpMessageType {
    AemCommand,
    AemResponse,
    AddressAccessCommand,
    AddressAccessResponse,
    VendorUniqueCommand,
    VendorUniqueResponse,
    Unknown(u8),
}

impl AecpMessageType {
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x0 => AecpMessageType::AemCommand,
            0x1 => AecpMessageType::AemResponse,
            0x4 => AecpMessageType::AddressAccessCommand,
            0x5 => AecpMessageType::AddressAccessResponse,
            0x6 => AecpMessageType::VendorUniqueCommand,
            0x7 => AecpMessageType::VendorUniqueResponse,
            other => AecpMessageType::Unknown(other),
        }
    }

    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            AecpMessageType::AemCommand => 0x0,
            AecpMessageType::AemResponse => 0x1,
            AecpMessageType::AddressAccessCommand => 0x4,
            AecpMessageType::AddressAccessResponse => 0x5,
            AecpMessageType::VendorUniqueCommand => 0x6,
            AecpMessageType::VendorUniqueResponse => 0x7,
            AecpMessageType::Unknown(v) => v,
        }
    }

    #[must_use]
    pub fn is_response(self) -> bool {
        matches!(
            self,
            AecpMessageType::AemResponse
                | AecpMessageType::AddressAccessResponse
                | AecpMessageType::VendorUniqueResponse
        )
    }
}

/// Fields common to every AECP sub-protocol, following the AVTPDU common header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AecpCommon {
    pub message_type: AecpMessageType,
    /// `status` field: `0` (SUCCESS) on commands; device-reported status on responses.
    pub status: u8,
    pub target_entity_id: EntityID,
    pub controller_entity_id: EntityID,
    pub sequence_id: u16,
}

impl AecpCommon {
    /// Bytes of the AECP common sub-header: target_entity_id(8) + controller_entity_id(8) + sequence_id(2).
    pub const LEN: usize = 18;

    pub fn parse(cursor: &mut Cursor<'_>, common: &CommonHeader) -> Result<Self, WireError> {
        if common.subtype != Subtype::Aecp {
            return Err(WireError::Unknown {
                field: "subtype",
                value: common.subtype.to_u8() as u32,
            });
        }
        if cursor.remaining() < Self::LEN {
            return Err(WireError::TooShort {
                needed: Self::LEN,
                available: cursor.remaining(),
            });
        }
        let target_entity_id = EntityID(cursor.read_u64()?);
        let controller_entity_id = EntityID(cursor.read_u64()?);
        let sequence_id = cursor.read_u16()?;
        Ok(Self {
            message_type: AecpMessageType::from_u8(common.control_data),
            status: common.status,
            target_entity_id,
            controller_entity_id,
            sequence_id,
        })
    }

    pub fn serialize(&self, cursor: &mut CursorMut<'_>) -> Result<(), WireError> {
        cursor.write_u64(self.target_entity_id.0)?;
        cursor.write_u64(self.controller_entity_id.0)?;
        cursor.write_u16(self.sequence_id)
    }

    #[must_use]
    pub fn common_header(&self, payload_len: u16) -> CommonHeader {
        CommonHeader {
            subtype: Subtype::Aecp,
            control_data: self.message_type.to_u8(),
            status: self.status,
            control_data_length: Self::LEN as u16 + payload_len,
            stream_id: self.target_entity_id.0,
        }
    }
}

/// The AEM sub-header: `u(1) | command_type(15)`, immediately after [`AecpCommon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AemSubHeader {
    pub unsolicited: bool,
    pub command_type: u16,
}

impl AemSubHeader {
    pub const LEN: usize = 2;

    pub fn parse(cursor: &mut Cursor<'_>) -> Result<Self, WireError> {
        let raw = cursor.read_u16()?;
        Ok(Self {
            unsolicited: (raw & 0x8000) != 0,
            command_type: raw & 0x7FFF,
        })
    }

    pub fn serialize(&self, cursor: &mut CursorMut<'_>) -> Result<(), WireError> {
        let raw = (u16::from(self.unsolicited) << 15) | (self.command_type & 0x7FFF);
        cursor.write_u16(raw)
    }
}

/// Milan protocol identifier (`00:1B:C5:0A:C1:00`), checked on ingress and
/// stamped on egress by the MVU sub-header.
pub const MILAN_PROTOCOL_ID: [u8; 6] = [0x00, 0x1B, 0xC5, 0x0A, 0xC1, 0x00];

/// The MVU sub-header: `protocol_identifier(6) | r(1) | u(1) | command_type(15)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MvuSubHeader {
    pub protocol_id: [u8; 6],
    pub unsolicited: bool,
    pub command_type: u16,
}

impl MvuSubHeader {
    pub const LEN: usize = 8;

    pub fn parse(cursor: &mut Cursor<'_>) -> Result<Self, WireError> {
        let protocol_id = cursor.read_array::<6>()?;
        let raw = cursor.read_u16()?;
        Ok(Self {
            protocol_id,
            unsolicited: (raw & 0x8000) != 0,
            command_type: raw & 0x7FFF,
        })
    }

    pub fn serialize(&self, cursor: &mut CursorMut<'_>) -> Result<(), WireError> {
        cursor.write_bytes(&self.protocol_id)?;
        let raw = (u16::from(self.unsolicited) << 15) | (self.command_type & 0x7FFF);
        cursor.write_u16(raw)
    }

    #[must_use]
    pub fn is_milan(&self) -> bool {
        self.protocol_id == MILAN_PROTOCOL_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aecp_common_round_trips() {
        let aecp = AecpCommon {
            message_type: AecpMessageType::AemCommand,
            status: 0,
            target_entity_id: EntityID(1),
            controller_entity_id: EntityID(2),
            sequence_id: 99,
        };
        let mut buf = [0u8; AecpCommon::LEN];
        aecp.serialize(&mut CursorMut::new(&mut buf)).unwrap();
        let common = aecp.common_header(0);
        let parsed = AecpCommon::parse(&mut Cursor::new(&buf), &common).unwrap();
        assert_eq!(parsed, aecp);
    }

    #[test]
    fn aem_subheader_round_trips_unsolicited_bit() {
        let hdr = AemSubHeader {
            unsolicited: true,
            command_type: 0x0004,
        };
        let mut buf = [0u8; AemSubHeader::LEN];
        hdr.serialize(&mut CursorMut::new(&mut buf)).unwrap();
        let parsed = AemSubHeader::parse(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(parsed, hdr);
    }

    #[test]
    fn mvu_subheader_detects_milan_protocol_id() {
        let hdr = MvuSubHeader {
            protocol_id: MILAN_PROTOCOL_ID,
            unsolicited: false,
            command_type: 0,
        };
        assert!(hdr.is_milan());

        let other = MvuSubHeader {
            protocol_id: [0u8; 6],
            ..hdr
        };
        assert!(!other.is_milan());
    }

    #[test]
    fn aecp_common_rejects_non_aecp_subtype() {
        let buf = [0u8; AecpCommon::LEN];
        let common = CommonHeader {
            subtype: Subtype::Adp,
            control_data: 0,
            status: 0,
            control_data_length: 0,
            stream_id: 0,
        };
        let err = AecpCommon::parse(&mut Cursor::new(&buf), &common).unwrap_err();
        assert!(matches!(err, WireError::Unknown { field: "subtype", .. }));
    }
}
