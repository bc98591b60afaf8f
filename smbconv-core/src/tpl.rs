//! TPL texture atlas converter.
//!
//! Unlike stage files the two layouts differ in shape: the little-endian
//! atlas starts with an `XTPL` tag and puts a 0x20-byte sub-header in front
//! of every payload. The output is therefore rebuilt rather than patched in
//! place, and payload offsets change.

use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::codec::{slice_at, Direction, Game};
use crate::{Conversion, ConvertError, Result};

pub const SMBD_MAGIC: &[u8; 4] = b"XTPL";

/// Encoding, offset, width, height, level count, marker.
const TEXTURE_HEADER_SIZE: usize = 0x10;
const SUB_HEADER_SIZE: usize = 0x20;
const PAYLOAD_LENGTH_OFFSET: usize = 0x14;
const SMB2_PAYLOAD_ALIGNMENT: usize = 0x20;

pub const CMPR: u32 = 14;
pub const I8: u32 = 1;

/// Sub-header tag for the encodings the little-endian game can load.
fn sub_header_tag(encoding: u32) -> Option<u32> {
    match encoding {
        CMPR => Some(0x0C00_0000),
        I8 => Some(0x1A00_0000),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TextureHeader {
    encoding: u32,
    offset: u32,
    width: u16,
    height: u16,
    levels: u16,
    /// Always 0x1234 in known files; kept in its source byte order.
    marker: [u8; 2],
}

impl TextureHeader {
    fn read(data: &[u8], direction: Direction, at: usize) -> Result<Self> {
        let raw = slice_at(data, at, TEXTURE_HEADER_SIZE)?;
        let source = direction.source();
        Ok(TextureHeader {
            encoding: source.read_u32(&raw[0x0..]),
            offset: source.read_u32(&raw[0x4..]),
            width: source.read_u16(&raw[0x8..]),
            height: source.read_u16(&raw[0xA..]),
            levels: source.read_u16(&raw[0xC..]),
            marker: [raw[0xE], raw[0xF]],
        })
    }

    fn write(&self, out: &mut Vec<u8>, direction: Direction, offset: u32) {
        direction.put_u32(out, self.encoding);
        direction.put_u32(out, offset);
        direction.put_u16(out, self.width);
        direction.put_u16(out, self.height);
        direction.put_u16(out, self.levels);
        out.extend_from_slice(&self.marker);
    }
}

pub fn detect_direction(data: &[u8]) -> Direction {
    if data.starts_with(SMBD_MAGIC) {
        Direction::from_source(Game::Smbd)
    } else {
        Direction::from_source(Game::Smb2)
    }
}

fn read_headers(data: &[u8], direction: Direction, count_at: usize) -> Result<Vec<TextureHeader>> {
    let count = direction.read_u32_at(data, count_at)? as usize;
    let table = count_at + 4;
    let len = count
        .checked_mul(TEXTURE_HEADER_SIZE)
        .ok_or(ConvertError::TruncatedInput {
            offset: table,
            len: usize::MAX,
            file_len: data.len(),
        })?;
    slice_at(data, table, len)?;
    (0..count)
        .map(|i| TextureHeader::read(data, direction, table + i * TEXTURE_HEADER_SIZE))
        .collect()
}

pub fn convert(data: &[u8]) -> Result<Conversion> {
    let direction = detect_direction(data);
    info!("texture atlas: {direction:?}");
    match direction {
        Direction::Smb2ToSmbd => to_smbd(data),
        Direction::SmbdToSmb2 => to_smb2(data),
    }
}

fn to_smbd(data: &[u8]) -> Result<Conversion> {
    let direction = Direction::Smb2ToSmbd;
    let headers = read_headers(data, direction, 0)?;
    let table_end = SMBD_MAGIC.len() + 4 + headers.len() * TEXTURE_HEADER_SIZE;
    let payload_start = headers
        .first()
        .map_or(table_end, |first| table_end.max(first.offset as usize));

    let mut kept = Vec::new();
    let mut body = Vec::new();
    let mut visited = 4 + headers.len() * TEXTURE_HEADER_SIZE;
    for (i, texture) in headers.iter().enumerate() {
        let Some(tag) = sub_header_tag(texture.encoding) else {
            warn!(
                "texture {i}: encoding {} has no little-endian equivalent, dropping it",
                texture.encoding
            );
            continue;
        };
        let end = headers
            .get(i + 1)
            .map_or(data.len(), |next| next.offset as usize);
        let len = end
            .checked_sub(texture.offset as usize)
            .ok_or_else(|| ConvertError::UnsupportedFormatVariant {
                detail: format!(
                    "texture {i} at {:#X} lies after the next texture at {end:#X}",
                    texture.offset
                ),
            })?;
        let payload = slice_at(data, texture.offset as usize, len)?;
        debug!("texture {i}: {len:#X} byte(s) at {:#X}", texture.offset);

        kept.push((texture, (payload_start + body.len()) as u32));
        direction.put_normal_u32(&mut body, tag);
        direction.put_u16(&mut body, texture.width);
        direction.put_u16(&mut body, 0);
        direction.put_u16(&mut body, texture.height);
        direction.put_u16(&mut body, 0);
        direction.put_u32(&mut body, 5);
        direction.put_u32(&mut body, 0);
        direction.put_u32(&mut body, len as u32);
        direction.put_u32(&mut body, 0);
        direction.put_u32(&mut body, 0);
        body.extend_from_slice(payload);
        visited += len;
    }

    let mut out = Vec::with_capacity(payload_start + body.len());
    out.extend_from_slice(SMBD_MAGIC);
    direction.put_u32(&mut out, kept.len() as u32);
    for (texture, offset) in &kept {
        texture.write(&mut out, direction, *offset);
    }
    out.resize(payload_start, 0);
    out.extend_from_slice(&body);

    Ok(finish(direction, out, headers.len(), kept.len(), visited, data.len()))
}

fn to_smb2(data: &[u8]) -> Result<Conversion> {
    let direction = Direction::SmbdToSmb2;
    let headers = read_headers(data, direction, SMBD_MAGIC.len())?;
    let table_end = 4 + headers.len() * TEXTURE_HEADER_SIZE;
    let payload_start = table_end.next_multiple_of(SMB2_PAYLOAD_ALIGNMENT);

    let mut offsets = Vec::with_capacity(headers.len());
    let mut body = Vec::new();
    let mut visited = SMBD_MAGIC.len() + 4 + headers.len() * TEXTURE_HEADER_SIZE;
    for (i, texture) in headers.iter().enumerate() {
        let expected = sub_header_tag(texture.encoding).ok_or_else(|| {
            ConvertError::UnsupportedFormatVariant {
                detail: format!(
                    "texture {i} uses encoding {}, only CMPR and I8 are supported",
                    texture.encoding
                ),
            }
        })?;
        let at = texture.offset as usize;
        let sub_header = slice_at(data, at, SUB_HEADER_SIZE)?;
        let tag = u32::from(sub_header[0]);
        if tag != expected >> 24 {
            return Err(ConvertError::UnexpectedTag { tag, offset: at });
        }
        let len = direction.read_u32_at(data, at + PAYLOAD_LENGTH_OFFSET)? as usize;
        let payload = slice_at(data, at + SUB_HEADER_SIZE, len)?;
        debug!("texture {i}: {len:#X} byte(s) at {:#X}", at + SUB_HEADER_SIZE);

        offsets.push((payload_start + body.len()) as u32);
        body.extend_from_slice(payload);
        visited += SUB_HEADER_SIZE + len;
    }

    let mut out = Vec::with_capacity(payload_start + body.len());
    direction.put_u32(&mut out, headers.len() as u32);
    for (texture, offset) in headers.iter().zip(&offsets) {
        texture.write(&mut out, direction, *offset);
    }
    out.resize(payload_start, 0);
    out.extend_from_slice(&body);

    Ok(finish(direction, out, headers.len(), headers.len(), visited, data.len()))
}

fn finish(
    direction: Direction,
    bytes: Vec<u8>,
    total: usize,
    kept: usize,
    visited: usize,
    file_len: usize,
) -> Conversion {
    let mut tables = BTreeMap::new();
    tables.insert("textures", kept as u64);
    if total > kept {
        tables.insert("dropped textures", (total - kept) as u64);
    }
    let bytes_visited = visited.min(file_len);
    Conversion {
        direction,
        bytes,
        tables,
        bytes_visited,
        bytes_untouched: file_len - bytes_visited,
    }
}
