// SPDX-License-Identifier: Apache-2.0 OR MIT

//! ADP (AVDECC Discovery Protocol) datagram framing (§6.2).

use super::cursor::{Cursor, CursorMut};
use super::error::WireError;
use super::header::{CommonHeader, EthernetHeader, Subtype};
use crate::types::{
    AssociationID, ControllerCapabilities, EntityCapabilities, EntityID, EntityModelID,
    ListenerCapabilities, TalkerCapabilities,
};

/// ADP message type, carried in the common header's `control_data` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdpMessageType {
    EntityAvailable,
    EntityDeparting,
    EntityDiscover,
    Unknown(u8),
}

impl AdpMessageType {
    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x0 => AdpMessageType::EntityAvailable,
            0x1 => AdpMessageType::EntityDeparting,
            0x2 => AdpMessageType::EntityDiscover,
            other => AdpMessageType::Unknown(other),
        }
    }

    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            AdpMessageType::EntityAvailable => 0x0,
            AdpMessageType::EntityDeparting => 0x1,
            AdpMessageType::EntityDiscover => 0x2,
            AdpMessageType::Unknown(v) => v,
        }
    }
}

/// The 44-byte ADP body following the AVTPDU common header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdpDu {
    pub message_type: AdpMessageType,
    /// `status` field reinterpreted as valid-time in 2-second units for ADP.
    pub valid_time_units: u8,
    pub entity_id: EntityID,
    pub entity_model_id: EntityModelID,
    pub entity_capabilities: EntityCapabilities,
    pub talker_stream_sources: u16,
    pub talker_capabilities: TalkerCapabilities,
    pub listener_stream_sinks: u16,
    pub listener_capabilities: ListenerCapabilities,
    pub controller_capabilities: ControllerCapabilities,
    pub available_index: u32,
    pub gptp_grandmaster_id: EntityID,
    pub gptp_domain_number: u8,
    pub identify_control_index: u16,
    pub interface_index: u16,
    pub association_id: AssociationID,
}

impl AdpDu {
    /// Body length after the 12-byte common header.
    pub const BODY_LEN: usize = 44;
    /// Full on-wire frame length before ethernet-minimum padding.
    pub const FRAME_LEN: usize = EthernetHeader::LEN + CommonHeader::LEN + Self::BODY_LEN;

    pub fn parse(cursor: &mut Cursor<'_>) -> Result<Self, WireError> {
        if cursor.remaining() < Self::BODY_LEN {
            return Err(WireError::TooShort {
                needed: Self::BODY_LEN,
                available: cursor.remaining(),
            });
        }
        let entity_model_id = EntityModelID(cursor.read_u64()?);
        let entity_capabilities = EntityCapabilities::from_bits(cursor.read_u32()?);
        let talker_stream_sources = cursor.read_u16()?;
        let talker_capabilities = TalkerCapabilities::from_bits(cursor.read_u16()?);
        let listener_stream_sinks = cursor.read_u16()?;
        let listener_capabilities = ListenerCapabilities::from_bits(cursor.read_u16()?);
        let controller_capabilities = ControllerCapabilities::from_bits(cursor.read_u32()?);
        let available_index = cursor.read_u32()?;
        let gptp_grandmaster_id = EntityID(cursor.read_u64()?);
        let gptp_domain_number = cursor.read_u8()?;
        let _reserved = cursor.read_bytes(3)?;
        let identify_control_index = cursor.read_u16()?;
        let interface_index = cursor.read_u16()?;
        let association_id = AssociationID(cursor.read_u64()?);
        let _reserved = cursor.read_bytes(4)?;

        Ok(Self {
            message_type: AdpMessageType::EntityAvailable,
            valid_time_units: 0,
            entity_id: EntityID::NULL,
            entity_model_id,
            entity_capabilities,
            talker_stream_sources,
            talker_capabilities,
            listener_stream_sinks,
            listener_capabilities,
            controller_capabilities,
            available_index,
            gptp_grandmaster_id,
            gptp_domain_number,
            identify_control_index,
            interface_index,
            association_id,
        })
    }

    /// Parses a full ADP frame, combining the common header's `entity_id`
    /// (carried in `stream_id`), `message_type`, and `valid_time_units` with
    /// the body fields.
    pub fn parse_full(cursor: &mut Cursor<'_>, common: &CommonHeader) -> Result<Self, WireError> {
        if common.subtype != Subtype::Adp {
            return Err(WireError::Unknown {
                field: "subtype",
                value: common.subtype.to_u8() as u32,
            });
        }
        let mut body = Self::parse(cursor)?;
        body.message_type = AdpMessageType::from_u8(common.control_data);
        body.valid_time_units = common.status;
        body.entity_id = common.entity_id();
        Ok(body)
    }

    pub fn serialize_body(&self, cursor: &mut CursorMut<'_>) -> Result<(), WireError> {
        cursor.write_u64(self.entity_model_id.0)?;
        cursor.write_u32(self.entity_capabilities.bits())?;
        cursor.write_u16(self.talker_stream_sources)?;
        cursor.write_u16(self.talker_capabilities.bits())?;
        cursor.write_u16(self.listener_stream_sinks)?;
        cursor.write_u16(self.listener_capabilities.bits())?;
        cursor.write_u32(self.controller_capabilities.bits())?;
        cursor.write_u32(self.available_index)?;
        cursor.write_u64(self.gptp_grandmaster_id.0)?;
        cursor.write_u8(self.gptp_domain_number)?;
        cursor.write_bytes(&[0u8; 3])?;
        cursor.write_u16(self.identify_control_index)?;
        cursor.write_u16(self.interface_index)?;
        cursor.write_u64(self.association_id.0)?;
        cursor.write_bytes(&[0u8; 4])
    }

    #[must_use]
    pub fn common_header(&self) -> CommonHeader {
        CommonHeader {
            subtype: Subtype::Adp,
            control_data: self.message_type.to_u8(),
            status: self.valid_time_units,
            control_data_length: Self::BODY_LEN as u16,
            stream_id: self.entity_id.0,
        }
    }

    /// Seconds of validity implied by the 5-bit valid-time-units field (×2, per §4.4).
    #[must_use]
    pub fn valid_time_seconds(&self) -> u32 {
        self.valid_time_units as u32 * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AdpDu {
        AdpDu {
            message_type: AdpMessageType::EntityAvailable,
            valid_time_units: 10,
            entity_id: EntityID(0x0011_2233_4455_6677),
            entity_model_id: EntityModelID(0xAABB_CCDD_EEFF_0011),
            entity_capabilities: EntityCapabilities::AEM_SUPPORTED,
            talker_stream_sources: 2,
            talker_capabilities: TalkerCapabilities::IMPLEMENTED | TalkerCapabilities::AUDIO_SOURCE,
            listener_stream_sinks: 1,
            listener_capabilities: ListenerCapabilities::IMPLEMENTED,
            controller_capabilities: ControllerCapabilities::NONE,
            available_index: 42,
            gptp_grandmaster_id: EntityID(0x1234_5678_9ABC_DEF0),
            gptp_domain_number: 0,
            identify_control_index: 0,
            interface_index: 0,
            association_id: AssociationID::NULL,
        }
    }

    #[test]
    fn body_round_trips() {
        let adp = sample();
        let mut buf = [0u8; AdpDu::BODY_LEN];
        adp.serialize_body(&mut CursorMut::new(&mut buf)).unwrap();
        let common = adp.common_header();
        let mut cursor = Cursor::new(&buf);
        let parsed = AdpDu::parse_full(&mut cursor, &common).unwrap();
        assert_eq!(parsed, adp);
    }

    #[test]
    fn valid_time_is_units_times_two_seconds() {
        let adp = sample();
        assert_eq!(adp.valid_time_seconds(), 20);
    }

    #[test]
    fn parse_full_rejects_non_adp_subtype() {
        let adp = sample();
        let mut buf = [0u8; AdpDu::BODY_LEN];
        adp.serialize_body(&mut CursorMut::new(&mut buf)).unwrap();
        let mut common = adp.common_header();
        common.subtype = Subtype::Acmp;
        let err = AdpDu::parse_full(&mut Cursor::new(&buf), &common).unwrap_err();
        assert!(matches!(err, WireError::Unknown { field: "subtype", .. }));
    }
}
