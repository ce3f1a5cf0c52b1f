//! MSB-first bit cursor over a byte buffer.
//!
//! Bit 0 is the high bit of the first byte. Successive fields share one
//! cursor, so bitfields pack contiguously across byte boundaries. Byte runs
//! may only be read or written while the cursor sits on a byte boundary.

use crate::error::BitError;
use byteorder::{BigEndian, ByteOrder};

/// Widest bitfield the reader and writer accept.
pub const MAX_WIDTH: u32 = 32;

fn check_width(width: u32) -> Result<(), BitError> {
    if width == 0 || width > MAX_WIDTH {
        return Err(BitError::InvalidWidth(width));
    }
    Ok(())
}

/// Largest value representable in `width` bits, saturating at 64.
pub fn max_value(width: u32) -> u64 {
    match width {
        0 => 0,
        1..=63 => (1u64 << width) - 1,
        _ => u64::MAX,
    }
}

/// Reads bitfields and byte runs from a borrowed buffer.
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    pub fn bit_position(&self) -> usize {
        self.bit_pos
    }

    /// Number of bytes touched so far, counting a partial byte.
    pub fn bytes_consumed(&self) -> usize {
        self.bit_pos.div_ceil(8)
    }

    pub fn is_aligned(&self) -> bool {
        self.bit_pos % 8 == 0
    }

    pub fn remaining_bits(&self) -> usize {
        self.data.len() * 8 - self.bit_pos
    }

    fn read_bit(&mut self) -> u8 {
        let bit = (self.data[self.bit_pos / 8] >> (7 - self.bit_pos % 8)) & 1;
        self.bit_pos += 1;
        bit
    }

    /// Consume `width` bits and return them zero-extended.
    ///
    /// The cursor does not move when the read fails.
    pub fn read_bits(&mut self, width: u32) -> Result<u64, BitError> {
        check_width(width)?;

        let needed = width as usize;
        let available = self.remaining_bits();
        if needed > available {
            return Err(BitError::UnexpectedEndOfInput { needed, available });
        }

        if self.is_aligned() {
            let start = self.bit_pos / 8;
            let fast = match width {
                8 => Some(self.data[start] as u64),
                16 => Some(BigEndian::read_u16(&self.data[start..]) as u64),
                32 => Some(BigEndian::read_u32(&self.data[start..]) as u64),
                _ => None,
            };
            if let Some(v) = fast {
                self.bit_pos += needed;
                return Ok(v);
            }
        }

        let mut value = 0u64;
        for _ in 0..width {
            value = (value << 1) | self.read_bit() as u64;
        }
        Ok(value)
    }

    /// Fail with `MisalignedAccess` unless the cursor is on a byte boundary.
    pub fn align_to_byte(&self) -> Result<(), BitError> {
        if !self.is_aligned() {
            return Err(BitError::MisalignedAccess {
                bit_pos: self.bit_pos,
            });
        }
        Ok(())
    }

    /// Borrow the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], BitError> {
        self.align_to_byte()?;

        let start = self.bit_pos / 8;
        let available = self.data.len() - start;
        if n > available {
            return Err(BitError::UnexpectedEndOfInput {
                needed: n * 8,
                available: available * 8,
            });
        }

        self.bit_pos += n * 8;
        Ok(&self.data[start..start + n])
    }

    /// Borrow every byte left in the buffer.
    pub fn read_remainder(&mut self) -> Result<&'a [u8], BitError> {
        self.align_to_byte()?;
        let start = self.bit_pos / 8;
        self.bit_pos = self.data.len() * 8;
        Ok(&self.data[start..])
    }
}

/// Accumulates bitfields and byte runs into an owned buffer.
#[derive(Debug, Default)]
pub struct BitWriter {
    buf: Vec<u8>,
    bit_pos: usize,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            buf: Vec::with_capacity(bytes),
            bit_pos: 0,
        }
    }

    pub fn bit_position(&self) -> usize {
        self.bit_pos
    }

    pub fn is_aligned(&self) -> bool {
        self.bit_pos % 8 == 0
    }

    fn push_bit(&mut self, bit: u8) {
        if self.is_aligned() {
            self.buf.push(0);
        }
        if bit != 0 {
            self.buf[self.bit_pos / 8] |= 1 << (7 - self.bit_pos % 8);
        }
        self.bit_pos += 1;
    }

    /// Append the low `width` bits of `value`, most significant first.
    ///
    /// Values that need more than `width` bits are rejected, never truncated.
    pub fn write_bits(&mut self, value: u64, width: u32) -> Result<(), BitError> {
        check_width(width)?;
        if value > max_value(width) {
            return Err(BitError::OutOfRange { value, width });
        }

        if self.is_aligned() {
            let mut tmp = [0u8; 4];
            let fast = match width {
                8 => {
                    tmp[0] = value as u8;
                    Some(1)
                }
                16 => {
                    BigEndian::write_u16(&mut tmp, value as u16);
                    Some(2)
                }
                32 => {
                    BigEndian::write_u32(&mut tmp, value as u32);
                    Some(4)
                }
                _ => None,
            };
            if let Some(n) = fast {
                self.buf.extend_from_slice(&tmp[..n]);
                self.bit_pos += width as usize;
                return Ok(());
            }
        }

        for shift in (0..width).rev() {
            self.push_bit(((value >> shift) & 1) as u8);
        }
        Ok(())
    }

    /// Fail with `MisalignedAccess` unless the cursor is on a byte boundary.
    pub fn align_to_byte(&self) -> Result<(), BitError> {
        if !self.is_aligned() {
            return Err(BitError::MisalignedAccess {
                bit_pos: self.bit_pos,
            });
        }
        Ok(())
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BitError> {
        self.align_to_byte()?;
        self.buf.extend_from_slice(bytes);
        self.bit_pos += bytes.len() * 8;
        Ok(())
    }

    /// Return the written bytes. A pending partial byte is an error.
    pub fn finish(self) -> Result<Vec<u8>, BitError> {
        self.align_to_byte()?;
        Ok(self.buf)
    }
}
