// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounds-checked big-endian read/write cursors over a byte buffer.
//!
//! All AVDECC integers are network byte order, unlike the little-endian CDR
//! wire this cursor shape was adapted from; only the byte-order conversion
//! differs.

use super::error::WireError;

macro_rules! impl_write_be {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self, value: $type) -> Result<(), WireError> {
            if self.offset + $size > self.buffer.len() {
                return Err(WireError::TooShort {
                    needed: self.offset + $size,
                    available: self.buffer.len(),
                });
            }
            let bytes = value.to_be_bytes();
            self.buffer[self.offset..self.offset + $size].copy_from_slice(&bytes);
            self.offset += $size;
            Ok(())
        }
    };
}

macro_rules! impl_read_be {
    ($name:ident, $type:ty, $size:expr) => {
        pub fn $name(&mut self) -> Result<$type, WireError> {
            if self.offset + $size > self.buffer.len() {
                return Err(WireError::TooShort {
                    needed: self.offset + $size,
                    available: self.buffer.len(),
                });
            }
            let mut bytes = [0u8; $size];
            bytes.copy_from_slice(&self.buffer[self.offset..self.offset + $size]);
            self.offset += $size;
            Ok(<$type>::from_be_bytes(bytes))
        }
    };
}

/// Mutable cursor for serializing PDUs into a caller-supplied buffer.
pub struct CursorMut<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> CursorMut<'a> {
    #[must_use]
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_write_be!(write_u8, u8, 1);
    impl_write_be!(write_u16, u16, 2);
    impl_write_be!(write_u32, u32, 4);
    impl_write_be!(write_u64, u64, 8);

    pub fn write_i8(&mut self, value: i8) -> Result<(), WireError> {
        self.write_u8(value as u8)
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), WireError> {
        if self.offset + data.len() > self.buffer.len() {
            return Err(WireError::TooShort {
                needed: self.offset + data.len(),
                available: self.buffer.len(),
            });
        }
        self.buffer[self.offset..self.offset + data.len()].copy_from_slice(data);
        self.offset += data.len();
        Ok(())
    }

    /// Writes zero bytes up to the ethernet-payload minimum (46 octets total).
    pub fn pad_to(&mut self, total_len: usize) -> Result<(), WireError> {
        if self.offset >= total_len {
            return Ok(());
        }
        let pad = total_len - self.offset;
        if self.offset + pad > self.buffer.len() {
            return Err(WireError::TooShort {
                needed: total_len,
                available: self.buffer.len(),
            });
        }
        self.buffer[self.offset..self.offset + pad].fill(0);
        self.offset += pad;
        Ok(())
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Read-only cursor for deserializing received frames.
pub struct Cursor<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    #[must_use]
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    impl_read_be!(read_u8, u8, 1);
    impl_read_be!(read_u16, u16, 2);
    impl_read_be!(read_u32, u32, 4);
    impl_read_be!(read_u64, u64, 8);

    pub fn read_i8(&mut self) -> Result<i8, WireError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if self.offset + len > self.buffer.len() {
            return Err(WireError::TooShort {
                needed: self.offset + len,
                available: self.buffer.len(),
            });
        }
        let slice = &self.buffer[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_across_numeric_widths() {
        let mut buf = [0u8; 16];
        let mut w = CursorMut::new(&mut buf);
        w.write_u8(0xAB).unwrap();
        w.write_u16(0xCDEF).unwrap();
        w.write_u32(0x1122_3344).unwrap();
        w.write_i8(-5).unwrap();

        let mut r = Cursor::new(&buf);
        assert_eq!(r.read_u8().unwrap(), 0xAB);
        assert_eq!(r.read_u16().unwrap(), 0xCDEF);
        assert_eq!(r.read_u32().unwrap(), 0x1122_3344);
        assert_eq!(r.read_i8().unwrap(), -5);
    }

    #[test]
    fn write_overflow_reports_too_short() {
        let mut buf = [0u8; 1];
        let mut w = CursorMut::new(&mut buf);
        let err = w.write_u16(1).unwrap_err();
        assert_eq!(
            err,
            WireError::TooShort {
                needed: 2,
                available: 1
            }
        );
    }

    #[test]
    fn read_overflow_reports_too_short() {
        let buf = [0u8; 1];
        let mut r = Cursor::new(&buf);
        let err = r.read_u16().unwrap_err();
        assert_eq!(
            err,
            WireError::TooShort {
                needed: 2,
                available: 1
            }
        );
    }

    #[test]
    fn pad_to_zero_fills_remaining_bytes() {
        let mut buf = [0xFFu8; 8];
        let mut w = CursorMut::new(&mut buf);
        w.write_u16(0xAAAA).unwrap();
        w.pad_to(8).unwrap();
        assert_eq!(&buf[2..], &[0u8; 6]);
    }

    #[test]
    fn uses_network_byte_order() {
        let mut buf = [0u8; 4];
        let mut w = CursorMut::new(&mut buf);
        w.write_u32(0x0102_0304).unwrap();
        assert_eq!(buf, [0x01, 0x02, 0x03, 0x04]);
    }
}
