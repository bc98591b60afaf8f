use log::debug;

use crate::cursor::{Item, Transcoder};
use crate::stagedef::animation::{copy_animation, AnimationLayout};
use crate::Result;

/// One field of a fixed-layout record and the way it is copied.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Field {
    /// 4-byte scalar (integer or float bits), swapped.
    Word,
    Words(usize),
    /// 2-byte scalar, swapped.
    Half,
    Halves(usize),
    /// 4-byte tag whose bytes must not change between games.
    MarkerWord,
    MarkerHalf,
    /// Padding or unknown bytes, copied as-is.
    Raw(usize),
    /// Leading word of a wormhole: swapped on even records, kept on odd ones.
    AlternatingWord,
    /// Swapped offset to a 4-byte aligned model name.
    Name,
    /// Swapped offset to an animation header.
    Animation(&'static AnimationLayout),
    /// Swapped offset to a single record.
    Block(&'static Schema),
    /// Count and offset of a nested table.
    Table(&'static Schema),
}

impl Field {
    #[cfg(test)]
    pub(crate) const fn width(&self) -> usize {
        match *self {
            Field::Word | Field::MarkerWord | Field::AlternatingWord => 4,
            Field::Half | Field::MarkerHalf => 2,
            Field::Words(n) => 4 * n,
            Field::Halves(n) => 2 * n,
            Field::Raw(n) => n,
            Field::Name | Field::Animation(_) | Field::Block(_) => 4,
            Field::Table(_) => 8,
        }
    }
}

/// Declarative layout of one record kind.
#[derive(Debug)]
pub(crate) struct Schema {
    pub name: &'static str,
    pub size: usize,
    pub fields: &'static [Field],
}

impl Schema {
    /// Sum of the field widths; equal to `size` for every well-formed schema.
    #[cfg(test)]
    pub(crate) fn field_width(&self) -> usize {
        self.fields.iter().map(Field::width).sum()
    }
}

/// Copies the record at the current position. `index` is the record's
/// position inside its table.
pub(crate) fn copy_record(t: &mut Transcoder<'_>, schema: &Schema, index: usize) -> Result<()> {
    for field in schema.fields {
        match *field {
            Field::Word => {
                t.word()?;
            }
            Field::Words(n) => t.words(n)?,
            Field::Half => {
                t.half()?;
            }
            Field::Halves(n) => t.halves(n)?,
            Field::MarkerWord => {
                t.marker_word()?;
            }
            Field::MarkerHalf => {
                t.marker_half()?;
            }
            Field::Raw(n) => t.raw(n)?,
            Field::AlternatingWord => {
                if index % 2 == 0 {
                    t.word()?;
                } else {
                    t.marker_word()?;
                }
            }
            Field::Name => {
                let offset = t.word()?;
                t.copy_ascii(offset, 4)?;
            }
            Field::Animation(layout) => {
                let offset = t.word()?;
                copy_animation(t, offset, layout)?;
            }
            Field::Block(inner) => {
                let offset = t.word()?;
                copy_block(t, offset, inner)?;
            }
            Field::Table(inner) => {
                let item = t.item()?;
                copy_table(t, item, inner)?;
            }
        }
    }
    Ok(())
}

/// Copies `item.count` records of `schema` at `item.offset`.
pub(crate) fn copy_table(t: &mut Transcoder<'_>, item: Item, schema: &Schema) -> Result<()> {
    if item.is_absent() {
        return Ok(());
    }
    t.ensure_records(item.offset, item.count, schema.size)?;
    debug!(
        "{}: {} record(s) at {:#X}",
        schema.name, item.count, item.offset
    );
    t.tally(schema.name, u64::from(item.count));
    t.at(item.offset, |t| {
        for index in 0..item.count as usize {
            copy_record(t, schema, index)?;
        }
        Ok(())
    })
}

/// Copies the single record at `offset`, if there is one.
pub(crate) fn copy_block(t: &mut Transcoder<'_>, offset: u32, schema: &Schema) -> Result<()> {
    copy_table(t, Item::new(1, offset), schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Direction;

    static PAIR: Schema = Schema {
        name: "pair",
        size: 8,
        fields: &[Field::Half, Field::MarkerHalf, Field::Word],
    };

    static LINKS: Schema = Schema {
        name: "links",
        size: 4,
        fields: &[Field::AlternatingWord],
    };

    #[test]
    fn absent_table_copies_nothing_and_keeps_position() {
        let src = vec![0x5Au8; 0x20];
        let mut t = Transcoder::new(&src, Direction::Smb2ToSmbd);
        t.word().unwrap();

        copy_table(&mut t, Item::new(3, 0), &PAIR).unwrap();
        assert_eq!(t.position(), 4);
        assert_eq!(t.bytes_visited(), 4);
    }

    #[test]
    fn table_fields_follow_their_swap_policy() {
        let mut src = vec![0u8; 0x18];
        src[0x08..0x10].copy_from_slice(&[0x00, 0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03]);
        src[0x10..0x18].copy_from_slice(&[0x00, 0x04, 0x00, 0x05, 0x00, 0x00, 0x00, 0x06]);
        let mut t = Transcoder::new(&src, Direction::Smb2ToSmbd);

        copy_table(&mut t, Item::new(2, 0x08), &PAIR).unwrap();
        assert_eq!(t.position(), 0);
        let out = t.finish();
        assert_eq!(&out.bytes[0x08..0x10], &[0x01, 0x00, 0x00, 0x02, 0x03, 0x00, 0x00, 0x00]);
        assert_eq!(&out.bytes[0x10..0x18], &[0x04, 0x00, 0x00, 0x05, 0x06, 0x00, 0x00, 0x00]);
        assert_eq!(out.tables.get("pair"), Some(&2));
    }

    #[test]
    fn alternating_word_swaps_even_records_only() {
        let mut src = vec![0u8; 0x14];
        for i in 0..4 {
            src[4 + i * 4 + 3] = 1;
        }
        let mut t = Transcoder::new(&src, Direction::Smb2ToSmbd);
        copy_table(&mut t, Item::new(4, 4), &LINKS).unwrap();
        let out = t.finish().bytes;

        assert_eq!(&out[0x04..0x08], &[1, 0, 0, 0]);
        assert_eq!(&out[0x08..0x0C], &[0, 0, 0, 1]);
        assert_eq!(&out[0x0C..0x10], &[1, 0, 0, 0]);
        assert_eq!(&out[0x10..0x14], &[0, 0, 0, 1]);
    }

    #[test]
    fn table_running_off_the_file_is_truncation() {
        let src = vec![0u8; 0x10];
        let mut t = Transcoder::new(&src, Direction::SmbdToSmb2);
        let err = copy_table(&mut t, Item::new(2, 0x08), &PAIR).unwrap_err();
        assert!(matches!(err, crate::ConvertError::TruncatedInput { .. }));
        assert_eq!(t.bytes_visited(), 0);
    }
}
