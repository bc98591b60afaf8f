use std::collections::BTreeMap;
use std::ops::Range;

use log::debug;

use crate::codec::{slice_at, Direction};
use crate::{Conversion, ConvertError, Result};

/// A (count, offset) table descriptor as stored in headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Item {
    pub count: u32,
    pub offset: u32,
}

impl Item {
    pub(crate) fn new(count: u32, offset: u32) -> Self {
        Item { count, offset }
    }

    /// Tables with a zero offset do not exist in the file.
    pub(crate) fn is_absent(&self) -> bool {
        self.offset == 0
    }
}

/// Paired source/destination buffers sharing one position.
///
/// Converted files keep every offset of the source, so a single position
/// addresses both buffers. The destination starts as a copy of the source:
/// bytes the walk never visits pass through untouched, every visited field is
/// rewritten according to its swap policy.
pub(crate) struct Transcoder<'a> {
    src: &'a [u8],
    dst: Vec<u8>,
    pos: usize,
    direction: Direction,
    visited: Vec<bool>,
    tables: BTreeMap<&'static str, u64>,
}

impl<'a> Transcoder<'a> {
    pub(crate) fn new(src: &'a [u8], direction: Direction) -> Self {
        Transcoder {
            src,
            dst: src.to_vec(),
            pos: 0,
            direction,
            visited: vec![false; src.len()],
            tables: BTreeMap::new(),
        }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    /// Fails unless `len` bytes starting at `offset` lie inside the file.
    pub(crate) fn ensure(&self, offset: usize, len: usize) -> Result<()> {
        slice_at(self.src, offset, len).map(|_| ())
    }

    /// Fails unless `count` records of `size` bytes fit at `offset`.
    pub(crate) fn ensure_records(&self, offset: u32, count: u32, size: usize) -> Result<()> {
        let len = (count as usize)
            .checked_mul(size)
            .ok_or(ConvertError::TruncatedInput {
                offset: offset as usize,
                len: usize::MAX,
                file_len: self.src.len(),
            })?;
        self.ensure(offset as usize, len)
    }

    fn take(&mut self, len: usize) -> Result<Range<usize>> {
        slice_at(self.src, self.pos, len)?;
        let range = self.pos..self.pos + len;
        self.visited[range.clone()].fill(true);
        self.pos += len;
        Ok(range)
    }

    /// Copies a 4-byte scalar, swapping it into the target order.
    pub(crate) fn word(&mut self) -> Result<u32> {
        let range = self.take(4)?;
        let value = self.direction.source().read_u32(&self.src[range.clone()]);
        self.direction.write_u32(&mut self.dst[range], value);
        Ok(value)
    }

    /// Copies a 2-byte scalar, swapping it into the target order.
    pub(crate) fn half(&mut self) -> Result<u16> {
        let range = self.take(2)?;
        let value = self.direction.source().read_u16(&self.src[range.clone()]);
        self.direction.write_u16(&mut self.dst[range], value);
        Ok(value)
    }

    /// Copies a 4-byte marker in the source order.
    pub(crate) fn marker_word(&mut self) -> Result<u32> {
        let range = self.take(4)?;
        let value = self.direction.source().read_u32(&self.src[range.clone()]);
        self.direction.write_normal_u32(&mut self.dst[range], value);
        Ok(value)
    }

    /// Copies a 2-byte marker in the source order.
    pub(crate) fn marker_half(&mut self) -> Result<u16> {
        let range = self.take(2)?;
        let value = self.direction.source().read_u16(&self.src[range.clone()]);
        self.direction.write_normal_u16(&mut self.dst[range], value);
        Ok(value)
    }

    pub(crate) fn words(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.word()?;
        }
        Ok(())
    }

    pub(crate) fn halves(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.half()?;
        }
        Ok(())
    }

    /// Copies `len` bytes verbatim.
    pub(crate) fn raw(&mut self, len: usize) -> Result<()> {
        let range = self.take(len)?;
        self.dst[range.clone()].copy_from_slice(&self.src[range]);
        Ok(())
    }

    /// Copies a count word then an offset word, both swapped.
    pub(crate) fn item(&mut self) -> Result<Item> {
        let count = self.word()?;
        let offset = self.word()?;
        Ok(Item { count, offset })
    }

    /// Runs `f` with the position moved to `offset`, restoring the caller's
    /// position afterwards whether `f` succeeds or not.
    pub(crate) fn at<T>(
        &mut self,
        offset: u32,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = self.pos;
        self.pos = offset as usize;
        let result = f(self);
        self.pos = saved;
        result
    }

    /// Copies a NUL-terminated string at `offset` as an excursion.
    ///
    /// Copying stops once a zero byte has been copied and the position after
    /// it is a multiple of `alignment`, or at end of file. Returns the number
    /// of bytes copied. Offset 0 means no string; any other offset must lie
    /// inside the file.
    pub(crate) fn copy_ascii(&mut self, offset: u32, alignment: usize) -> Result<usize> {
        if offset == 0 {
            return Ok(0);
        }
        self.ensure(offset as usize, 1)?;
        self.at(offset, |t| {
            let start = t.pos;
            while t.pos < t.src.len() {
                let byte = t.src[t.pos];
                t.raw(1)?;
                if byte == 0 && t.pos % alignment == 0 {
                    break;
                }
            }
            Ok(t.pos.saturating_sub(start))
        })
    }

    /// Records that `count` records of `table` were copied.
    pub(crate) fn tally(&mut self, table: &'static str, count: u64) {
        *self.tables.entry(table).or_insert(0) += count;
    }

    pub(crate) fn bytes_visited(&self) -> usize {
        self.visited.iter().filter(|&&v| v).count()
    }

    pub(crate) fn finish(self) -> Conversion {
        let bytes_visited = self.bytes_visited();
        let bytes_untouched = self.src.len() - bytes_visited;
        if bytes_untouched > 0 {
            debug!("{bytes_untouched} byte(s) were not visited and pass through verbatim");
        }
        Conversion {
            direction: self.direction,
            bytes: self.dst,
            tables: self.tables,
            bytes_visited,
            bytes_untouched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_name_copies_padding_to_the_next_boundary() {
        let mut src = vec![0xEEu8; 0x20];
        src[0x10..0x18].copy_from_slice(b"Goal\0\0\0\0");
        let mut t = Transcoder::new(&src, Direction::Smb2ToSmbd);
        t.pos = 4;

        let copied = t.copy_ascii(0x10, 4).unwrap();
        assert_eq!(copied, 8);
        assert_eq!(t.position(), 4);
        assert_eq!(t.bytes_visited(), 8);
    }

    #[test]
    fn name_ending_on_a_boundary_stops_at_its_terminator() {
        let mut src = vec![0xEEu8; 0x20];
        src[0x10..0x14].copy_from_slice(b"BG_\0");
        let mut t = Transcoder::new(&src, Direction::Smb2ToSmbd);
        assert_eq!(t.copy_ascii(0x10, 4).unwrap(), 4);
    }

    #[test]
    fn unterminated_name_stops_at_end_of_file() {
        let src = b"xxxxNAME".to_vec();
        let mut t = Transcoder::new(&src, Direction::SmbdToSmb2);
        assert_eq!(t.copy_ascii(4, 4).unwrap(), 4);
    }

    #[test]
    fn zero_name_offset_is_a_no_op() {
        let src = vec![0u8; 8];
        let mut t = Transcoder::new(&src, Direction::Smb2ToSmbd);
        assert_eq!(t.copy_ascii(0, 4).unwrap(), 0);
        assert_eq!(t.bytes_visited(), 0);
    }

    #[test]
    fn name_offset_past_the_end_is_truncation() {
        let src = vec![0u8; 0x10];
        let mut t = Transcoder::new(&src, Direction::Smb2ToSmbd);
        let err = t.copy_ascii(0x100, 4).unwrap_err();
        assert!(matches!(err, ConvertError::TruncatedInput { offset: 0x100, .. }));
        assert_eq!(t.bytes_visited(), 0);
    }

    #[test]
    fn excursion_restores_position_after_an_error() {
        let src = vec![0u8; 0x10];
        let mut t = Transcoder::new(&src, Direction::Smb2ToSmbd);
        t.word().unwrap();

        let err = t.at(0x0E, |t| t.word()).unwrap_err();
        assert!(matches!(err, ConvertError::TruncatedInput { offset: 0x0E, .. }));
        assert_eq!(t.position(), 4);
    }

    #[test]
    fn marker_and_swapped_words_differ_for_asymmetric_input() {
        let src = vec![0, 0, 0, 1, 0, 0, 0, 1];
        let mut t = Transcoder::new(&src, Direction::Smb2ToSmbd);
        assert_eq!(t.word().unwrap(), 1);
        assert_eq!(t.marker_word().unwrap(), 1);
        let out = t.finish().bytes;
        assert_eq!(&out[0..4], &[1, 0, 0, 0]);
        assert_eq!(&out[4..8], &[0, 0, 0, 1]);
    }

    #[test]
    fn item_reads_count_then_offset() {
        let src = vec![0, 0, 0, 3, 0, 0, 0x08, 0xA0];
        let mut t = Transcoder::new(&src, Direction::Smb2ToSmbd);
        assert_eq!(t.item().unwrap(), Item::new(3, 0x8A0));
        let out = t.finish().bytes;
        assert_eq!(out, vec![3, 0, 0, 0, 0xA0, 0x08, 0, 0]);
    }

    #[test]
    fn oversized_record_span_is_rejected() {
        let src = vec![0u8; 0x40];
        let t = Transcoder::new(&src, Direction::Smb2ToSmbd);
        assert!(t.ensure_records(0x20, 2, 0x10).is_ok());
        assert!(t.ensure_records(0x20, 3, 0x10).is_err());
        assert!(t.ensure_records(0x20, u32::MAX, 0x49C).is_err());
    }
}
