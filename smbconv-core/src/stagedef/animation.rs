use crate::cursor::Transcoder;
use crate::schema::{copy_table, Field, Schema};
use crate::Result;

/// Shape of an animation header: an optional prolog, `channels` keyframe
/// channel headers, and reserved bytes out to `size`.
#[derive(Debug)]
pub(crate) struct AnimationLayout {
    pub name: &'static str,
    /// Prolog words (unknown word, loop point) ahead of the channels.
    pub prolog_words: usize,
    pub channels: usize,
    pub size: usize,
}

impl AnimationLayout {
    fn reserved(&self) -> usize {
        self.size - self.prolog_words * 4 - self.channels * 8
    }
}

/// Rotation X/Y/Z and translation X/Y/Z, packed with no trailing padding.
pub(crate) static COLLISION_FIELD_ANIMATION: AnimationLayout = AnimationLayout {
    name: "collision field animations",
    prolog_words: 0,
    channels: 6,
    size: 0x30,
};

/// Start/end distance, colour and one unknown channel.
pub(crate) static FOG_ANIMATION: AnimationLayout = AnimationLayout {
    name: "fog animations",
    prolog_words: 0,
    channels: 6,
    size: 0x40,
};

pub(crate) static BACKGROUND_ANIMATION: AnimationLayout = AnimationLayout {
    name: "background animations",
    prolog_words: 2,
    channels: 8,
    size: 0x50,
};

/// Adds visibility and scale channels to the background layout.
pub(crate) static BACKGROUND_ANIMATION_EXTENDED: AnimationLayout = AnimationLayout {
    name: "extended background animations",
    prolog_words: 2,
    channels: 11,
    size: 0x60,
};

/// Easing, time, value and two reserved words.
pub(crate) static KEYFRAME: Schema = Schema {
    name: "keyframes",
    size: 0x14,
    fields: &[Field::Words(5)],
};

/// Copies the animation header at `offset` and every keyframe it points at.
pub(crate) fn copy_animation(
    t: &mut Transcoder<'_>,
    offset: u32,
    layout: &AnimationLayout,
) -> Result<()> {
    if offset == 0 {
        return Ok(());
    }
    t.ensure(offset as usize, layout.size)?;
    t.tally(layout.name, 1);
    t.at(offset, |t| {
        t.words(layout.prolog_words)?;
        let mut channels = Vec::with_capacity(layout.channels);
        for _ in 0..layout.channels {
            channels.push(t.item()?);
        }
        t.raw(layout.reserved())?;

        for channel in channels {
            if channel.count == 0 || channel.offset == 0 {
                continue;
            }
            copy_table(t, channel, &KEYFRAME)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Direction;

    fn put_be(buf: &mut [u8], offset: usize, value: u32) {
        buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    #[test]
    fn layouts_fit_their_headers() {
        for layout in [
            &COLLISION_FIELD_ANIMATION,
            &FOG_ANIMATION,
            &BACKGROUND_ANIMATION,
            &BACKGROUND_ANIMATION_EXTENDED,
        ] {
            assert!(layout.prolog_words * 4 + layout.channels * 8 <= layout.size);
        }
        assert_eq!(COLLISION_FIELD_ANIMATION.reserved(), 0);
        assert_eq!(FOG_ANIMATION.reserved(), 0x10);
    }

    #[test]
    fn copies_only_populated_channels() {
        let mut src = vec![0u8; 0x100];
        // Channel 1: two keyframes at 0x60. Channel 4: a count but no offset.
        put_be(&mut src, 0x18, 2);
        put_be(&mut src, 0x1C, 0x60);
        put_be(&mut src, 0x30, 5);
        for i in 0..10 {
            put_be(&mut src, 0x60 + i * 4, 0x3F80_0000 + i as u32);
        }

        let mut t = Transcoder::new(&src, Direction::Smb2ToSmbd);
        copy_animation(&mut t, 0x10, &COLLISION_FIELD_ANIMATION).unwrap();
        assert_eq!(t.position(), 0);
        let out = t.finish();

        assert_eq!(out.tables.get("keyframes"), Some(&2));
        assert_eq!(out.bytes_visited, 0x30 + 2 * 0x14);
        assert_eq!(&out.bytes[0x60..0x64], &[0x00, 0x00, 0x80, 0x3F]);
        assert_eq!(&out.bytes[0x1C..0x20], &[0x60, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn zero_offset_animation_is_skipped() {
        let src = vec![0u8; 0x40];
        let mut t = Transcoder::new(&src, Direction::SmbdToSmb2);
        copy_animation(&mut t, 0, &FOG_ANIMATION).unwrap();
        assert_eq!(t.bytes_visited(), 0);
    }

    #[test]
    fn background_prolog_precedes_channels() {
        let mut src = vec![0u8; 0x100];
        put_be(&mut src, 0x10, 0xAAAA_0001);
        put_be(&mut src, 0x14, 0x4270_0000);
        // First channel sits right after the prolog.
        put_be(&mut src, 0x18, 1);
        put_be(&mut src, 0x1C, 0xC0);

        let mut t = Transcoder::new(&src, Direction::Smb2ToSmbd);
        copy_animation(&mut t, 0x10, &BACKGROUND_ANIMATION).unwrap();
        let out = t.finish();

        assert_eq!(&out.bytes[0x10..0x14], &[0x01, 0x00, 0xAA, 0xAA]);
        assert_eq!(out.tables.get("keyframes"), Some(&1));
        assert_eq!(out.bytes_visited, 0x50 + 0x14);
    }
}
