//! Fixed record layouts for every stage object category.
//!
//! Positions, scales and other floats are copied as swapped words. Rotations
//! are three swapped halves followed by a swapped padding half.

use crate::schema::{Field, Schema};
use crate::stagedef::animation::{BACKGROUND_ANIMATION, BACKGROUND_ANIMATION_EXTENDED};

use Field::*;

pub(crate) static START_POSITION: Schema = Schema {
    name: "start positions",
    size: 0x14,
    fields: &[Words(3), Halves(4)],
};

pub(crate) static FALLOUT_Y: Schema = Schema {
    name: "fallout y",
    size: 0x04,
    fields: &[Word],
};

pub(crate) static GOAL: Schema = Schema {
    name: "goals",
    size: 0x14,
    // The goal type keeps its byte order in both games.
    fields: &[Words(3), Halves(3), MarkerHalf],
};

pub(crate) static BUMPER: Schema = Schema {
    name: "bumpers",
    size: 0x20,
    fields: &[Words(3), Halves(4), Words(3)],
};

pub(crate) static JAMABAR: Schema = Schema {
    name: "jamabars",
    size: 0x20,
    fields: &[Words(3), Halves(4), Words(3)],
};

pub(crate) static BANANA: Schema = Schema {
    name: "bananas",
    size: 0x10,
    fields: &[Words(3), MarkerWord],
};

/// Position, rotation, radius, height and one unknown word.
pub(crate) static CONE_COLLISION: Schema = Schema {
    name: "cone collisions",
    size: 0x20,
    fields: &[Words(3), Halves(4), Words(3)],
};

pub(crate) static SPHERE_COLLISION: Schema = Schema {
    name: "sphere collisions",
    size: 0x14,
    fields: &[Words(3), Word, Word],
};

pub(crate) static CYLINDER_COLLISION: Schema = Schema {
    name: "cylinder collisions",
    size: 0x1C,
    fields: &[Words(3), Word, Word, Halves(4)],
};

pub(crate) static FALLOUT_VOLUME: Schema = Schema {
    name: "fallout volumes",
    size: 0x20,
    fields: &[Words(3), Words(3), Halves(4)],
};

pub(crate) static TEXTURE_SCROLL: Schema = Schema {
    name: "texture scrolls",
    size: 0x08,
    fields: &[Words(2)],
};

pub(crate) static EFFECT_ONE: Schema = Schema {
    name: "type one effects",
    size: 0x14,
    fields: &[Words(5)],
};

pub(crate) static EFFECT_TWO: Schema = Schema {
    name: "type two effects",
    size: 0x10,
    fields: &[Words(4)],
};

pub(crate) static EFFECTS: Schema = Schema {
    name: "effect headers",
    size: 0x30,
    fields: &[
        Table(&EFFECT_ONE),
        Table(&EFFECT_TWO),
        Block(&TEXTURE_SCROLL),
        Raw(0x1C),
    ],
};

static SCENERY_MODEL_FIELDS: [Field; 9] = [
    Word, // marker, swapped like any other scalar
    Name,
    Word,
    Words(3),
    Halves(4),
    Words(3),
    Animation(&BACKGROUND_ANIMATION),
    Animation(&BACKGROUND_ANIMATION_EXTENDED),
    Block(&EFFECTS),
];

pub(crate) static BACKGROUND_MODEL: Schema = Schema {
    name: "background models",
    size: 0x38,
    fields: &SCENERY_MODEL_FIELDS,
};

pub(crate) static FOREGROUND_MODEL: Schema = Schema {
    name: "foreground models",
    size: 0x38,
    fields: &SCENERY_MODEL_FIELDS,
};

pub(crate) static REFLECTIVE_MODEL: Schema = Schema {
    name: "reflective models",
    size: 0x0C,
    fields: &[Name, Word, Word],
};

/// An instance of a level model A record placed elsewhere in the stage.
pub(crate) static MODEL_DUPLICATE: Schema = Schema {
    name: "model duplicates",
    size: 0x24,
    fields: &[Word, Words(3), Halves(4), Words(3)],
};

pub(crate) static LEVEL_MODEL_A: Schema = Schema {
    name: "level models a",
    size: 0x0C,
    fields: &[Word, Name, Word],
};

/// Offset back to the paired level model A record.
pub(crate) static LEVEL_MODEL_B: Schema = Schema {
    name: "level models b",
    size: 0x04,
    fields: &[Word],
};

pub(crate) static SWITCH: Schema = Schema {
    name: "switches",
    size: 0x18,
    fields: &[Words(3), Halves(3), Half, Half, Half],
};

pub(crate) static WORMHOLE: Schema = Schema {
    name: "wormholes",
    size: 0x1C,
    fields: &[AlternatingWord, Words(3), Halves(4), Word],
};

pub(crate) static FOG: Schema = Schema {
    name: "fog",
    size: 0x24,
    fields: &[MarkerWord, Word, Word, Words(3), Raw(0x0C)],
};

pub(crate) static MYSTERY_THREE: Schema = Schema {
    name: "mystery three",
    size: 0x24,
    fields: &[Words(9)],
};

pub(crate) static MYSTERY_FIVE: Schema = Schema {
    name: "mystery five",
    size: 0x14,
    fields: &[Words(5)],
};

/// Vertex, normal, rotation and eight derived edge/tangent floats.
pub(crate) static COLLISION_TRIANGLE: Schema = Schema {
    name: "collision triangles",
    size: 0x40,
    fields: &[Words(3), Words(3), Halves(4), Words(8)],
};

#[cfg(test)]
pub(crate) static ALL: &[&Schema] = &[
    &START_POSITION,
    &FALLOUT_Y,
    &GOAL,
    &BUMPER,
    &JAMABAR,
    &BANANA,
    &CONE_COLLISION,
    &SPHERE_COLLISION,
    &CYLINDER_COLLISION,
    &FALLOUT_VOLUME,
    &TEXTURE_SCROLL,
    &EFFECT_ONE,
    &EFFECT_TWO,
    &EFFECTS,
    &BACKGROUND_MODEL,
    &FOREGROUND_MODEL,
    &REFLECTIVE_MODEL,
    &MODEL_DUPLICATE,
    &LEVEL_MODEL_A,
    &LEVEL_MODEL_B,
    &SWITCH,
    &WORMHOLE,
    &FOG,
    &MYSTERY_THREE,
    &MYSTERY_FIVE,
    &COLLISION_TRIANGLE,
];
