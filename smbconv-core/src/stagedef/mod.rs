//! RawLZ stage definition transcoder.
//!
//! A stage file is a fixed 0x89C-byte header of table descriptors followed by
//! the tables themselves, each found by absolute offset. The converted file
//! keeps every offset, so the walk visits the same positions in both buffers.

pub(crate) mod animation;
pub(crate) mod collision;
pub(crate) mod records;

use log::{debug, info};

use crate::codec::{Direction, Game};
use crate::cursor::{Item, Transcoder};
use crate::schema::{copy_block, copy_table, Schema};
use crate::{Conversion, ConvertError, Result};

use animation::{copy_animation, FOG_ANIMATION};
use collision::copy_collision_fields;
use records::*;

pub const HEADER_SIZE: usize = 0x89C;

/// Everything the file header points at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct StageHeader {
    pub collision_fields: Item,
    pub start_positions: u32,
    pub fallout_y: u32,
    pub goals: Item,
    pub bumpers: Item,
    pub jamabars: Item,
    pub bananas: Item,
    pub cone_collisions: Item,
    pub sphere_collisions: Item,
    pub cylinder_collisions: Item,
    pub fallout_volumes: Item,
    pub background_models: Item,
    pub foreground_models: Item,
    pub reflective_models: Item,
    pub model_duplicates: Item,
    pub level_models_a: Item,
    pub level_models_b: Item,
    pub switches: Item,
    pub fog_animation: u32,
    pub wormholes: Item,
    pub fog: u32,
    pub mystery_three: u32,
}

impl StageHeader {
    /// Copies the header at the start of the file and returns its contents.
    pub(crate) fn copy(t: &mut Transcoder<'_>) -> Result<Self> {
        t.words(2)?; // magic
        let collision_fields = t.item()?;
        let start_positions = t.word()?;
        let fallout_y = t.word()?;
        let goals = t.item()?;
        let bumpers = t.item()?;
        let jamabars = t.item()?;
        let bananas = t.item()?;
        let cone_collisions = t.item()?;
        let sphere_collisions = t.item()?;
        let cylinder_collisions = t.item()?;
        let fallout_volumes = t.item()?;
        let background_models = t.item()?;
        let foreground_models = t.item()?;
        t.words(2)?; // mystery eight
        let reflective_models = t.item()?;
        t.raw(0x0C)?;
        let model_duplicates = t.item()?;
        let level_models_a = t.item()?;
        let level_models_b = t.item()?;
        t.raw(0x0C)?;
        let switches = t.item()?;
        let fog_animation = t.word()?;
        let wormholes = t.item()?;
        let fog = t.word()?;
        t.raw(0x14)?;
        let mystery_three = t.word()?;
        t.raw(HEADER_SIZE - t.position())?;

        Ok(StageHeader {
            collision_fields,
            start_positions,
            fallout_y,
            goals,
            bumpers,
            jamabars,
            bananas,
            cone_collisions,
            sphere_collisions,
            cylinder_collisions,
            fallout_volumes,
            background_models,
            foreground_models,
            reflective_models,
            model_duplicates,
            level_models_a,
            level_models_b,
            switches,
            fog_animation,
            wormholes,
            fog,
            mystery_three,
        })
    }

    /// Start positions are not counted in the header; they fill the space up
    /// to the fallout Y value.
    pub(crate) fn start_position_count(&self) -> u32 {
        start_position_count(self.start_positions, self.fallout_y)
    }

    fn tables(&self) -> [(Item, &'static Schema); 17] {
        [
            (
                Item::new(self.start_position_count(), self.start_positions),
                &START_POSITION,
            ),
            (Item::new(1, self.fallout_y), &FALLOUT_Y),
            (self.goals, &GOAL),
            (self.bumpers, &BUMPER),
            (self.jamabars, &JAMABAR),
            (self.bananas, &BANANA),
            (self.cone_collisions, &CONE_COLLISION),
            (self.sphere_collisions, &SPHERE_COLLISION),
            (self.cylinder_collisions, &CYLINDER_COLLISION),
            (self.fallout_volumes, &FALLOUT_VOLUME),
            (self.background_models, &BACKGROUND_MODEL),
            (self.foreground_models, &FOREGROUND_MODEL),
            (self.reflective_models, &REFLECTIVE_MODEL),
            (self.model_duplicates, &MODEL_DUPLICATE),
            (self.level_models_a, &LEVEL_MODEL_A),
            (self.level_models_b, &LEVEL_MODEL_B),
            (self.switches, &SWITCH),
        ]
    }
}

pub(crate) fn start_position_count(start_positions: u32, fallout_y: u32) -> u32 {
    fallout_y.saturating_sub(start_positions) / START_POSITION.size as u32
}

/// Identifies the source game from the magic float at 0x04 (1000.0).
///
/// Big-endian files carry its high byte at 0x04 and a zero at 0x07;
/// little-endian files the reverse.
pub fn detect_direction(data: &[u8]) -> Result<Direction> {
    if data.len() < 8 {
        return Err(ConvertError::TruncatedInput {
            offset: 0,
            len: 8,
            file_len: data.len(),
        });
    }
    match (data[4], data[7]) {
        (first, 0) if first != 0 => Ok(Direction::from_source(Game::Smb2)),
        (0, last) if last != 0 => Ok(Direction::from_source(Game::Smbd)),
        (first, last) => Err(ConvertError::UnsupportedFormatVariant {
            detail: format!(
                "stage magic bytes {first:#04X} at 0x04 and {last:#04X} at 0x07 match neither game"
            ),
        }),
    }
}

/// Converts a whole stage definition to the other game's byte order.
pub fn convert(data: &[u8]) -> Result<Conversion> {
    let direction = detect_direction(data)?;
    info!("stage definition: {direction:?}");

    let mut t = Transcoder::new(data, direction);
    let header = StageHeader::copy(&mut t)?;
    debug!(
        "{} start position(s) inferred between {:#X} and {:#X}",
        header.start_position_count(),
        header.start_positions,
        header.fallout_y
    );

    for (item, schema) in header.tables() {
        copy_table(&mut t, item, schema)?;
    }
    copy_table(&mut t, header.wormholes, &WORMHOLE)?;
    copy_animation(&mut t, header.fog_animation, &FOG_ANIMATION)?;
    copy_block(&mut t, header.fog, &FOG)?;
    copy_block(&mut t, header.mystery_three, &MYSTERY_THREE)?;
    copy_collision_fields(&mut t, header.collision_fields)?;

    Ok(t.finish())
}


#[cfg(test)]
mod tests {
    use super::fixture::*;
    use super::*;

    fn swapped(bytes: &[u8]) -> Vec<u8> {
        bytes.iter().rev().copied().collect()
    }

    #[test]
    fn start_position_count_is_inferred_from_fallout_offset() {
        assert_eq!(start_position_count(0x8A0, 0x940), 8);
        assert_eq!(start_position_count(0x940, 0x8A0), 0);
    }

    #[test]
    fn detects_both_games_and_rejects_neither() {
        let stage = stage().bytes;
        assert_eq!(detect_direction(&stage).unwrap(), Direction::Smb2ToSmbd);

        let converted = convert(&stage).unwrap().bytes;
        assert_eq!(detect_direction(&converted).unwrap(), Direction::SmbdToSmb2);

        let blank = vec![0u8; HEADER_SIZE];
        assert!(matches!(
            detect_direction(&blank),
            Err(ConvertError::UnsupportedFormatVariant { .. })
        ));
        assert!(matches!(
            detect_direction(&[0, 0, 0]),
            Err(ConvertError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn round_trip_restores_the_original() {
        let original = stage().bytes;
        let forward = convert(&original).unwrap();
        assert_eq!(forward.direction, Direction::Smb2ToSmbd);
        assert_ne!(forward.bytes, original);

        let back = convert(&forward.bytes).unwrap();
        assert_eq!(back.direction, Direction::SmbdToSmb2);
        assert_eq!(back.bytes, original);
        assert_eq!(back.tables, forward.tables);
    }

    #[test]
    fn every_table_is_visited() {
        let out = convert(&stage().bytes).unwrap();
        let count = |name: &str| out.tables.get(name).copied().unwrap_or(0);

        assert_eq!(count("start positions"), 8);
        assert_eq!(count("goals"), 3);
        assert_eq!(count("bananas"), 2);
        assert_eq!(count("background models"), 1);
        assert_eq!(count("background animations"), 1);
        assert_eq!(count("extended background animations"), 0);
        assert_eq!(count("keyframes"), 2 + 1 + 1);
        assert_eq!(count("type one effects"), 1);
        assert_eq!(count("texture scrolls"), 2);
        assert_eq!(count("wormholes"), 6);
        assert_eq!(count("collision fields"), 1);
        assert_eq!(count("collision triangles"), 8);
        assert_eq!(count("mystery five"), 1);
        assert_eq!(count("foreground models"), 0);
    }

    #[test]
    fn scalars_are_swapped_and_markers_kept() {
        let original = stage().bytes;
        let out = convert(&original).unwrap().bytes;

        // Last inferred start position.
        let last = START_POSITIONS + 7 * 0x14;
        assert_eq!(out[last..last + 4], swapped(&original[last..last + 4])[..]);
        assert_eq!(out[FALLOUT..FALLOUT + 4], swapped(&original[FALLOUT..FALLOUT + 4])[..]);

        // Goal type and banana type keep their bytes.
        assert_eq!(out[GOALS + 0x12..GOALS + 0x14], [0x01, 0x02]);
        assert_eq!(out[GOALS..GOALS + 4], swapped(&original[GOALS..GOALS + 4])[..]);
        assert_eq!(out[BANANAS + 0x0C..BANANAS + 0x10], [0, 0, 0, 3]);
        assert_eq!(out[FOG_BLOCK..FOG_BLOCK + 4], [0, 0, 0, 4]);

        // Header offsets are swapped.
        assert_eq!(out[0x10..0x14], [0xA0, 0x08, 0, 0]);
        assert_eq!(out[0x04..0x08], [0, 0, 0x7A, 0x44]);
    }

    #[test]
    fn wormhole_links_alternate_between_swapped_and_kept() {
        let out = convert(&stage().bytes).unwrap().bytes;
        let link = |base: usize, i: usize| &out[base + i * 0x1C..base + i * 0x1C + 4];

        assert_eq!(link(WORMHOLES, 0), [1, 0, 0, 0]);
        assert_eq!(link(WORMHOLES, 1), [0, 0, 0, 1]);
        assert_eq!(link(WORMHOLES, 2), [1, 0, 0, 0]);
        assert_eq!(link(WORMHOLES, 3), [0, 0, 0, 1]);
        assert_eq!(link(FIELD_WORMHOLES, 0), [1, 0, 0, 0]);
        assert_eq!(link(FIELD_WORMHOLES, 1), [0, 0, 0, 1]);
    }

    #[test]
    fn names_are_copied_verbatim() {
        let original = stage().bytes;
        let out = convert(&original).unwrap().bytes;
        assert_eq!(&out[BACKGROUND_NAME..BACKGROUND_NAME + 8], b"BG_SKY\0\0");
        assert_eq!(&out[REFLECTIVE_NAME..REFLECTIVE_NAME + 8], b"Goal\0\0\0\0");
        assert_eq!(
            out[BACKGROUND + 4..BACKGROUND + 8],
            swapped(&original[BACKGROUND + 4..BACKGROUND + 8])[..]
        );
    }

    #[test]
    fn grid_bounds_the_triangle_table() {
        let original = stage().bytes;
        let out = convert(&original).unwrap().bytes;
        let last = TRIANGLES + 7 * 0x40;
        assert_eq!(out[last..last + 4], swapped(&original[last..last + 4])[..]);
        assert_eq!(out[0x14B0..0x14B6], [3, 0, 7, 0, 0xFF, 0xFF]);
    }

    #[test]
    fn truncated_stage_is_rejected() {
        let mut stage = stage().bytes;
        stage.truncate(0x400);
        assert!(matches!(
            convert(&stage),
            Err(ConvertError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn corrupt_collision_field_count_is_rejected() {
        let mut s = stage();
        s.bytes[0x08..0x0C].copy_from_slice(&0x00FF_FFFFu32.to_be_bytes());
        assert!(matches!(
            convert(&s.bytes),
            Err(ConvertError::TruncatedInput { .. })
        ));
    }
}
