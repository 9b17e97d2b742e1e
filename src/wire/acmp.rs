// SPDX-License-Identifier: Apache-2.0 OR MIT

//! ACMP (AVDECC Connection Management Protocol) datagram framing (§6.2).
//!
//! ACMP commands and responses share one fixed 44-byte layout, keyed by
//! message type; there is no variable command-specific tail the way AEM/MVU
//! have one.

use super::cursor::{Cursor, CursorMut};
use super::error::WireError;
use super::header::{CommonHeader, Subtype};
use crate::types::{ConnectionFlags, EntityID, MacAddress};

/// ACMP message type, carried in the common header's `control_data` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcmpMessageType {
    ConnectTxCommand,
    ConnectTxResponse,
    DisconnectTxCommand,
    DisconnectTxResponse,
    GetTxStateCommand,
    GetTxStateResponse,
    ConnectRxCommand,
    ConnectRxResponse,
    DisconnectRxCommand,
    DisconnectRxResponse,
    GetRxStateCommand,
    GetRxStateResponse,
    GetTxConnectionCommand,
    GetTxConnectionResponse,
    Unknown(u8),
}

impl AcmpMessageType {
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        use AcmpMessageType::*;
        match value {
            0 => ConnectTxCommand,
            1 => ConnectTxResponse,
            2 => DisconnectTxCommand,
            3 => DisconnectTxResponse,
            4 => GetTxStateCommand,
            5 => GetTxStateResponse,
            6 => ConnectRxCommand,
            7 => ConnectRxResponse,
            8 => DisconnectRxCommand,
            9 => DisconnectRxResponse,
            10 => GetRxStateCommand,
            11 => GetRxStateResponse,
            12 => GetTxConnectionCommand,
            13 => GetTxConnectionResponse,
            other => Unknown(other),
        }
    }

    #[must_use]
    pub fn to_u8(self) -> u8 {
        use AcmpMessageType::*;
        match self {
            ConnectTxCommand => 0,
            ConnectTxResponse => 1,
            DisconnectTxCommand => 2,
            DisconnectTxResponse => 3,
            GetTxStateCommand => 4,
            GetTxStateResponse => 5,
            ConnectRxCommand => 6,
            ConnectRxResponse => 7,
            DisconnectRxCommand => 8,
            DisconnectRxResponse => 9,
            GetRxStateCommand => 10,
            GetRxStateResponse => 11,
            GetTxConnectionCommand => 12,
            GetTxConnectionResponse => 13,
            Unknown(v) => v,
        }
    }

    #[must_use]
    pub fn is_response(self) -> bool {
        matches!(
            self,
            AcmpMessageType::ConnectTxResponse
                | AcmpMessageType::DisconnectTxResponse
                | AcmpMessageType::GetTxStateResponse
                | AcmpMessageType::ConnectRxResponse
                | AcmpMessageType::DisconnectRxResponse
                | AcmpMessageType::GetRxStateResponse
                | AcmpMessageType::GetTxConnectionResponse
        )
    }

    /// The response variant a command answers with, or `None` if `self` is
    /// already a response (or unknown).
    #[must_use]
    pub fn to_response(self) -> Option<Self> {
        use AcmpMessageType::*;
        match self {
            ConnectTxCommand => Some(ConnectTxResponse),
            DisconnectTxCommand => Some(DisconnectTxResponse),
            GetTxStateCommand => Some(GetTxStateResponse),
            ConnectRxCommand => Some(ConnectRxResponse),
            DisconnectRxCommand => Some(DisconnectRxResponse),
            GetRxStateCommand => Some(GetRxStateResponse),
            GetTxConnectionCommand => Some(GetTxConnectionResponse),
            _ => None,
        }
    }
}

/// The 44-byte ACMP body following the AVTPDU common header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcmpDu {
    pub message_type: AcmpMessageType,
    /// `status` field: device/controller-reported `ACMP_STATUS` code.
    pub status: u8,
    pub controller_entity_id: EntityID,
    pub talker_entity_id: EntityID,
    pub listener_entity_id: EntityID,
    pub talker_unique_id: u16,
    pub listener_unique_id: u16,
    pub stream_dest_address: MacAddress,
    pub connection_count: u16,
    pub sequence_id: u16,
    pub flags: ConnectionFlags,
    pub stream_vlan_id: u16,
}

impl AcmpDu {
    pub const BODY_LEN: usize = 44;

    pub fn parse(cursor: &mut Cursor<'_>, common: &CommonHeader) -> Result<Self, WireError> {
        if common.subtype != Subtype::Acmp {
            return Err(WireError::Unknown {
                field: "subtype",
                value: common.subtype.to_u8() as u32,
            });
        }
        if cursor.remaining() < Self::BODY_LEN {
            return Err(WireError::TooShort {
                needed: Self::BODY_LEN,
                available: cursor.remaining(),
            });
        }
        let controller_entity_id = EntityID(cursor.read_u64()?);
        let talker_entity_id = EntityID(cursor.read_u64()?);
        let listener_entity_id = EntityID(cursor.read_u64()?);
        let talker_unique_id = cursor.read_u16()?;
        let listener_unique_id = cursor.read_u16()?;
        let stream_dest_address = MacAddress(cursor.read_array::<6>()?);
        let connection_count = cursor.read_u16()?;
        let sequence_id = cursor.read_u16()?;
        let flags = ConnectionFlags::from_bits(cursor.read_u16()?);
        let stream_vlan_id = cursor.read_u16()?;
        let _reserved = cursor.read_u16()?;

        Ok(Self {
            message_type: AcmpMessageType::from_u8(common.control_data),
            status: common.status,
            controller_entity_id,
            talker_entity_id,
            listener_entity_id,
            talker_unique_id,
            listener_unique_id,
            stream_dest_address,
            connection_count,
            sequence_id,
            flags,
            stream_vlan_id,
        })
    }

    pub fn serialize_body(&self, cursor: &mut CursorMut<'_>) -> Result<(), WireError> {
        cursor.write_u64(self.controller_entity_id.0)?;
        cursor.write_u64(self.talker_entity_id.0)?;
        cursor.write_u64(self.listener_entity_id.0)?;
        cursor.write_u16(self.talker_unique_id)?;
        cursor.write_u16(self.listener_unique_id)?;
        cursor.write_bytes(&self.stream_dest_address.0)?;
        cursor.write_u16(self.connection_count)?;
        cursor.write_u16(self.sequence_id)?;
        cursor.write_u16(self.flags.bits())?;
        cursor.write_u16(self.stream_vlan_id)?;
        cursor.write_u16(0)
    }

    #[must_use]
    pub fn common_header(&self) -> CommonHeader {
        CommonHeader {
            subtype: Subtype::Acmp,
            control_data: self.message_type.to_u8(),
            status: self.status,
            control_data_length: Self::BODY_LEN as u16,
            stream_id: 0,
        }
    }
}
