// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The ethernet L2 header and the AVTPDU control common header shared by
//! ADP, AECP, and ACMP (§6.2).

use super::cursor::{Cursor, CursorMut};
use super::error::WireError;
use crate::types::{EntityID, MacAddress};

/// EtherType carried by every AVTP/AVDECC frame.
pub const AVDECC_ETHERTYPE: u16 = 0x22F0;

const ETHERNET_HEADER_LEN: usize = 14;
const COMMON_HEADER_LEN: usize = 12;

/// AVTPDU subtype values (control_data_length's sibling field, bits 1-7 of byte 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subtype {
    Adp,
    Aecp,
    Acmp,
    Unknown(u8),
}

impl Subtype {
    const ADP: u8 = 0x7A;
    const AECP: u8 = 0x7B;
    const ACMP: u8 = 0x7C;

    #[must_use]
    pub fn from_u8(value: u8) -> Self {
        match value {
            Self::ADP => Subtype::Adp,
            Self::AECP => Subtype::Aecp,
            Self::ACMP => Subtype::Acmp,
            other => Subtype::Unknown(other),
        }
    }

    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            Subtype::Adp => Self::ADP,
            Subtype::Aecp => Self::AECP,
            Subtype::Acmp => Self::ACMP,
            Subtype::Unknown(v) => v,
        }
    }
}

/// The 14-byte ethernet header: destination MAC, source MAC, EtherType.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub destination: MacAddress,
    pub source: MacAddress,
    pub ethertype: u16,
}

impl EthernetHeader {
    pub const LEN: usize = ETHERNET_HEADER_LEN;

    pub fn parse(cursor: &mut Cursor<'_>) -> Result<Self, WireError> {
        if cursor.remaining() < Self::LEN {
            return Err(WireError::TooShort {
                needed: Self::LEN,
                available: cursor.remaining(),
            });
        }
        let destination = MacAddress(cursor.read_array::<6>()?);
        let source = MacAddress(cursor.read_array::<6>()?);
        let ethertype = cursor.read_u16()?;
        if ethertype != AVDECC_ETHERTYPE {
            return Err(WireError::Unknown {
                field: "ethertype",
                value: ethertype as u32,
            });
        }
        Ok(Self {
            destination,
            source,
            ethertype,
        })
    }

    pub fn serialize(&self, cursor: &mut CursorMut<'_>) -> Result<(), WireError> {
        cursor.write_bytes(&self.destination.0)?;
        cursor.write_bytes(&self.source.0)?;
        cursor.write_u16(self.ethertype)
    }
}

/// The 12-byte AVTPDU control common header, before subtype-specific framing.
///
/// `stream_id` is reinterpreted per subtype: an [`crate::types::EntityID`] for
/// ADP and AECP, an opaque 8 bytes for ACMP (ACMP does not use it, but the
/// field occupies the same wire position).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommonHeader {
    pub subtype: Subtype,
    /// Reinterpreted per subtype: ADP message type, AECP message type, ACMP message type.
    pub control_data: u8,
    /// Reinterpreted per subtype: response status, or ADP valid-time (in 2-second units).
    pub status: u8,
    pub control_data_length: u16,
    pub stream_id: u64,
}

impl CommonHeader {
    pub const LEN: usize = COMMON_HEADER_LEN;

    pub fn parse(cursor: &mut Cursor<'_>) -> Result<Self, WireError> {
        if cursor.remaining() < Self::LEN {
            return Err(WireError::TooShort {
                needed: Self::LEN,
                available: cursor.remaining(),
            });
        }
        let byte0 = cursor.read_u8()?;
        let cd = (byte0 >> 7) & 0x1;
        if cd != 1 {
            return Err(WireError::Unknown {
                field: "cd",
                value: cd as u32,
            });
        }
        let subtype = Subtype::from_u8(byte0 & 0x7F);

        let byte1 = cursor.read_u8()?;
        let version = (byte1 >> 4) & 0x7;
        if version != 0 {
            return Err(WireError::Unknown {
                field: "version",
                value: version as u32,
            });
        }
        let control_data = byte1 & 0x0F;

        let bytes23 = cursor.read_u16()?;
        let status = ((bytes23 >> 11) & 0x1F) as u8;
        let control_data_length = bytes23 & 0x07FF;

        let stream_id = cursor.read_u64()?;

        Ok(Self {
            subtype,
            control_data,
            status,
            control_data_length,
            stream_id,
        })
    }

    pub fn serialize(&self, cursor: &mut CursorMut<'_>) -> Result<(), WireError> {
        let byte0 = 0x80 | (self.subtype.to_u8() & 0x7F);
        cursor.write_u8(byte0)?;

        let byte1 = self.control_data & 0x0F;
        cursor.write_u8(byte1)?;

        let bytes23 = ((self.status as u16 & 0x1F) << 11) | (self.control_data_length & 0x07FF);
        cursor.write_u16(bytes23)?;

        cursor.write_u64(self.stream_id)
    }

    #[must_use]
    pub fn entity_id(&self) -> EntityID {
        EntityID(self.stream_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ethernet_header_round_trips() {
        let hdr = EthernetHeader {
            destination: MacAddress::BROADCAST,
            source: MacAddress([1, 2, 3, 4, 5, 6]),
            ethertype: AVDECC_ETHERTYPE,
        };
        let mut buf = [0u8; EthernetHeader::LEN];
        hdr.serialize(&mut CursorMut::new(&mut buf)).unwrap();
        let parsed = EthernetHeader::parse(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(parsed, hdr);
    }

    #[test]
    fn ethernet_header_rejects_unknown_ethertype() {
        let mut buf = [0u8; EthernetHeader::LEN];
        buf[12] = 0x08;
        buf[13] = 0x00;
        let err = EthernetHeader::parse(&mut Cursor::new(&buf)).unwrap_err();
        assert_eq!(
            err,
            WireError::Unknown {
                field: "ethertype",
                value: 0x0800
            }
        );
    }

    #[test]
    fn common_header_round_trips_adp() {
        let hdr = CommonHeader {
            subtype: Subtype::Adp,
            control_data: 0x0,
            status: 31,
            control_data_length: 56,
            stream_id: 0x0011_2233_4455_6677,
        };
        let mut buf = [0u8; CommonHeader::LEN];
        hdr.serialize(&mut CursorMut::new(&mut buf)).unwrap();
        let parsed = CommonHeader::parse(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(parsed, hdr);
        assert_eq!(parsed.entity_id(), EntityID(0x0011_2233_4455_6677));
    }

    #[test]
    fn common_header_rejects_cd_zero() {
        let mut buf = [0u8; CommonHeader::LEN];
        buf[0] = 0x7A;
        let err = CommonHeader::parse(&mut Cursor::new(&buf)).unwrap_err();
        assert_eq!(
            err,
            WireError::Unknown {
                field: "cd",
                value: 0
            }
        );
    }

    #[test]
    fn common_header_rejects_nonzero_version() {
        let mut buf = [0u8; CommonHeader::LEN];
        buf[0] = 0x80 | Subtype::Adp.to_u8();
        buf[1] = 0x10;
        let err = CommonHeader::parse(&mut Cursor::new(&buf)).unwrap_err();
        assert_eq!(
            err,
            WireError::Unknown {
                field: "version",
                value: 1
            }
        );
    }

    #[test]
    fn subtype_round_trips_known_values() {
        for s in [Subtype::Adp, Subtype::Aecp, Subtype::Acmp] {
            assert_eq!(Subtype::from_u8(s.to_u8()), s);
        }
        assert_eq!(Subtype::from_u8(0x00), Subtype::Unknown(0x00));
    }
}
