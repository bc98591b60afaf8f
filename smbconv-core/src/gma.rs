//! GMA model archive header transcoder.
//!
//! Only the archive header, the model entry table and the name table are
//! converted. Model bodies start at the model base offset and pass through
//! unchanged.

use log::{debug, info};

use crate::codec::{Direction, Game};
use crate::cursor::Transcoder;
use crate::{Conversion, ConvertError, Result};

/// Model count and model base offset.
const HEADER_SIZE: usize = 8;
/// Model offset and name offset.
const ENTRY_SIZE: usize = 8;

/// A non-zero high half of the model count, read big-endian, means the count
/// was stored little-endian.
pub fn detect_direction(data: &[u8]) -> Result<Direction> {
    let high = Direction::Smb2ToSmbd.read_u16_at(data, 0)?;
    Ok(if high != 0 {
        Direction::from_source(Game::Smbd)
    } else {
        Direction::from_source(Game::Smb2)
    })
}

pub fn convert(data: &[u8]) -> Result<Conversion> {
    let direction = detect_direction(data)?;
    info!("model archive: {direction:?}");

    let mut t = Transcoder::new(data, direction);
    let count = t.word()?;
    let base = t.word()?;
    t.ensure_records(HEADER_SIZE as u32, count, ENTRY_SIZE)?;
    debug!("{count} model(s), bodies from {base:#X}");
    t.tally("models", u64::from(count));

    let mut names = Vec::with_capacity(count as usize);
    for _ in 0..count {
        t.word()?; // model offset from base
        names.push(t.word()?);
    }

    // Names are laid out in offset order, directly after the entry table.
    let names_start = t.position();
    names.sort_unstable();
    names.dedup();
    for name in names {
        let offset = (names_start as u32)
            .checked_add(name)
            .ok_or(ConvertError::TruncatedInput {
                offset: names_start,
                len: name as usize,
                file_len: data.len(),
            })?;
        t.copy_ascii(offset, 1)?;
        t.tally("model names", 1);
    }

    Ok(t.finish())
}
