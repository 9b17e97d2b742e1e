// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bit-exact wire codec (C1): ethernet L2 framing, the AVTPDU control common
//! header, and the fixed envelopes of all three PDU families (§4.1, §6.2).
//!
//! Command-specific payload bytes are left untouched here; the payload codec
//! (`crate::payload`) owns their contents.

pub mod acmp;
pub mod adp;
pub mod aecp;
pub mod cursor;
pub mod error;
pub mod header;

pub use acmp::{AcmpDu, AcmpMessageType};
pub use adp::{AdpDu, AdpMessageType};
pub use aecp::{AecpCommon, AecpMessageType, AemSubHeader, MvuSubHeader, MILAN_PROTOCOL_ID};
pub use cursor::{Cursor, CursorMut};
pub use error::{WireError, WireResult};
pub use header::{CommonHeader, EthernetHeader, Subtype, AVDECC_ETHERTYPE};

/// Ethernet-payload minimum enforced on egress and tolerated on ingress (§4.1).
pub const ETHERNET_MIN_FRAME: usize = EthernetHeader::LEN + 46;

/// A deframed datagram, demultiplexed by AVTPDU subtype. AECP carries its
/// envelope plus the unparsed command-specific tail; callers pass that tail
/// to the payload codec together with the envelope's message type.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame<'a> {
    Adp(AdpDu),
    Aecp { common: AecpCommon, tail: &'a [u8] },
    Acmp(AcmpDu),
}

/// Deframes one received L2 datagram: ethernet header, AVTPDU common header,
/// and subtype-specific envelope. Returns the frame and the byte length the
/// fixed portion occupied (ethernet + common header + subtype body, not
/// counting any AECP command-specific tail, which is `tail.len()`).
pub fn parse_frame(bytes: &[u8]) -> WireResult<Frame<'_>> {
    let mut cursor = Cursor::new(bytes);
    EthernetHeader::parse(&mut cursor)?;
    let common = CommonHeader::parse(&mut cursor)?;

    let declared = common.control_data_length as usize;
    if declared > cursor.remaining() {
        return Err(WireError::Truncated {
            needed: declared,
            available: cursor.remaining(),
        });
    }
    // Bytes beyond the declared control_data_length are ethernet padding; the
    // subtype parsers below only ever consume up to `declared`.
    let body = Cursor::new(&cursor.read_bytes(declared)?[..]);

    match common.subtype {
        Subtype::Adp => {
            let mut body = body;
            Ok(Frame::Adp(AdpDu::parse_full(&mut body, &common)?))
        }
        Subtype::Acmp => {
            let mut body = body;
            Ok(Frame::Acmp(AcmpDu::parse(&mut body, &common)?))
        }
        Subtype::Aecp => {
            let mut body = body;
            let aecp_common = AecpCommon::parse(&mut body, &common)?;
            let tail = &bytes[cursor.offset() - declared + AecpCommon::LEN..cursor.offset()];
            Ok(Frame::Aecp {
                common: aecp_common,
                tail,
            })
        }
        Subtype::Unknown(value) => Err(WireError::Unknown {
            field: "subtype",
            value: value as u32,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AssociationID, ControllerCapabilities, EntityCapabilities, EntityID, EntityModelID,
        ListenerCapabilities, TalkerCapabilities,
    };

    fn sample_adp() -> AdpDu {
        AdpDu {
            message_type: AdpMessageType::EntityAvailable,
            valid_time_units: 15,
            entity_id: EntityID(0xAABB_CCDD_EEFF_0011),
            entity_model_id: EntityModelID(0x1122_3344_5566_7788),
            entity_capabilities: EntityCapabilities::AEM_SUPPORTED,
            talker_stream_sources: 0,
            talker_capabilities: TalkerCapabilities::NONE,
            listener_stream_sinks: 0,
            listener_capabilities: ListenerCapabilities::NONE,
            controller_capabilities: ControllerCapabilities::IMPLEMENTED,
            available_index: 1,
            gptp_grandmaster_id: EntityID::NULL,
            gptp_domain_number: 0,
            identify_control_index: 0,
            interface_index: 0,
            association_id: AssociationID::NULL,
        }
    }

    fn frame_bytes_for(adp: &AdpDu) -> Vec<u8> {
        let mut frame = vec![0u8; AdpDu::FRAME_LEN];
        let mut cursor = CursorMut::new(&mut frame);
        EthernetHeader {
            destination: crate::types::MacAddress::BROADCAST,
            source: crate::types::MacAddress([0, 1, 2, 3, 4, 5]),
            ethertype: AVDECC_ETHERTYPE,
        }
        .serialize(&mut cursor)
        .unwrap();
        adp.common_header().serialize(&mut cursor).unwrap();
        adp.serialize_body(&mut cursor).unwrap();
        frame
    }

    #[test]
    fn parses_full_adp_frame() {
        let adp = sample_adp();
        let bytes = frame_bytes_for(&adp);
        match parse_frame(&bytes).unwrap() {
            Frame::Adp(parsed) => assert_eq!(parsed, adp),
            other => panic!("expected Adp, got {other:?}"),
        }
    }

    #[test]
    fn rejects_truncated_control_data_length() {
        let adp = sample_adp();
        let mut bytes = frame_bytes_for(&adp);
        bytes.truncate(EthernetHeader::LEN + CommonHeader::LEN + 10);
        let err = parse_frame(&bytes).unwrap_err();
        assert!(matches!(err, WireError::Truncated { .. }));
    }

    #[test]
    fn tolerates_padding_to_ethernet_minimum() {
        let adp = sample_adp();
        let mut bytes = frame_bytes_for(&adp);
        bytes.resize(ETHERNET_MIN_FRAME, 0);
        match parse_frame(&bytes).unwrap() {
            Frame::Adp(parsed) => assert_eq!(parsed, adp),
            other => panic!("expected Adp, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_subtype() {
        let adp = sample_adp();
        let mut bytes = frame_bytes_for(&adp);
        // Force an unrecognized subtype into byte 0 (low 7 bits) of the common header.
        bytes[EthernetHeader::LEN] = 0x80 | 0x01;
        let err = parse_frame(&bytes).unwrap_err();
        assert!(matches!(err, WireError::Unknown { field: "subtype", .. }));
    }
}
