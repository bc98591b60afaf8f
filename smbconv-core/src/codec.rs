use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::{ConvertError, Result};

/// The two games whose files we convert between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Game {
    /// Console family A, big-endian.
    Smb2,
    /// Console family B, little-endian.
    Smbd,
}

impl Game {
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            Game::Smb2 => BigEndian::read_u32(bytes),
            Game::Smbd => LittleEndian::read_u32(bytes),
        }
    }

    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            Game::Smb2 => BigEndian::read_u16(bytes),
            Game::Smbd => LittleEndian::read_u16(bytes),
        }
    }

    pub fn write_u32(self, buf: &mut [u8], value: u32) {
        match self {
            Game::Smb2 => BigEndian::write_u32(buf, value),
            Game::Smbd => LittleEndian::write_u32(buf, value),
        }
    }

    pub fn write_u16(self, buf: &mut [u8], value: u16) {
        match self {
            Game::Smb2 => BigEndian::write_u16(buf, value),
            Game::Smbd => LittleEndian::write_u16(buf, value),
        }
    }
}

/// Conversion direction, fixed once per file from the detected source game.
///
/// Every scalar read goes through the source game's byte order. Swapped
/// fields are written in the target order, marker fields are written back in
/// the source order so their bit pattern survives the conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Smb2ToSmbd,
    SmbdToSmb2,
}

impl Direction {
    pub fn from_source(source: Game) -> Self {
        match source {
            Game::Smb2 => Direction::Smb2ToSmbd,
            Game::Smbd => Direction::SmbdToSmb2,
        }
    }

    pub fn source(self) -> Game {
        match self {
            Direction::Smb2ToSmbd => Game::Smb2,
            Direction::SmbdToSmb2 => Game::Smbd,
        }
    }

    pub fn target(self) -> Game {
        match self {
            Direction::Smb2ToSmbd => Game::Smbd,
            Direction::SmbdToSmb2 => Game::Smb2,
        }
    }

    #[cfg(test)]
    pub fn reversed(self) -> Self {
        Direction::from_source(self.target())
    }

    /// Suffix appended to the input file name for the converted output.
    pub fn output_suffix(self) -> &'static str {
        match self.target() {
            Game::Smb2 => ".smb2",
            Game::Smbd => ".smbd",
        }
    }

    pub fn read_u32_at(self, data: &[u8], offset: usize) -> Result<u32> {
        Ok(self.source().read_u32(slice_at(data, offset, 4)?))
    }

    pub fn read_u16_at(self, data: &[u8], offset: usize) -> Result<u16> {
        Ok(self.source().read_u16(slice_at(data, offset, 2)?))
    }

    pub fn write_u32(self, buf: &mut [u8], value: u32) {
        self.target().write_u32(buf, value);
    }

    pub fn write_u16(self, buf: &mut [u8], value: u16) {
        self.target().write_u16(buf, value);
    }

    pub fn write_normal_u32(self, buf: &mut [u8], value: u32) {
        self.source().write_u32(buf, value);
    }

    pub fn write_normal_u16(self, buf: &mut [u8], value: u16) {
        self.source().write_u16(buf, value);
    }

    /// Appends `value` to `out` in the target byte order.
    pub(crate) fn put_u32(self, out: &mut Vec<u8>, value: u32) {
        let mut bytes = [0u8; 4];
        self.write_u32(&mut bytes, value);
        out.extend_from_slice(&bytes);
    }

    pub(crate) fn put_u16(self, out: &mut Vec<u8>, value: u16) {
        let mut bytes = [0u8; 2];
        self.write_u16(&mut bytes, value);
        out.extend_from_slice(&bytes);
    }

    pub(crate) fn put_normal_u32(self, out: &mut Vec<u8>, value: u32) {
        let mut bytes = [0u8; 4];
        self.write_normal_u32(&mut bytes, value);
        out.extend_from_slice(&bytes);
    }
}

/// Bounds-checked view of `len` bytes at `offset`.
pub(crate) fn slice_at(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .map(|end| &data[offset..end])
        .ok_or(ConvertError::TruncatedInput {
            offset,
            len,
            file_len: data.len(),
        })
}
