use log::{debug, trace};

use crate::cursor::{Item, Transcoder};
use crate::schema::{copy_block, copy_table, Schema};
use crate::stagedef::animation::{copy_animation, COLLISION_FIELD_ANIMATION};
use crate::stagedef::records::{
    BANANA, BUMPER, COLLISION_TRIANGLE, CONE_COLLISION, CYLINDER_COLLISION, FALLOUT_VOLUME, GOAL,
    JAMABAR, LEVEL_MODEL_B, MODEL_DUPLICATE, MYSTERY_FIVE, REFLECTIVE_MODEL, SPHERE_COLLISION,
    SWITCH, TEXTURE_SCROLL, WORMHOLE,
};
use crate::Result;

pub(crate) const COLLISION_FIELD_SIZE: usize = 0x49C;

/// Ends the triangle index list of one grid cell.
pub(crate) const GRID_SENTINEL: u16 = 0xFFFF;

/// Walks the `x_steps * z_steps` grid at `offset` and every cell's index list.
///
/// Returns the highest triangle index referenced by any cell, 0 when no cell
/// references a triangle.
pub(crate) fn copy_collision_grid(
    t: &mut Transcoder<'_>,
    offset: u32,
    x_steps: u32,
    z_steps: u32,
) -> Result<u16> {
    if offset == 0 {
        return Ok(0);
    }
    let cells = x_steps.checked_mul(z_steps).unwrap_or(u32::MAX);
    t.ensure_records(offset, cells, 4)?;
    debug!("collision grid: {x_steps}x{z_steps} cell(s) at {offset:#X}");

    t.at(offset, |t| {
        let mut max_index = 0;
        for cell in 0..cells {
            let list = t.word()?;
            if list == 0 {
                continue;
            }
            let cell_max = t.at(list, copy_index_list)?;
            trace!("grid cell {cell}: list at {list:#X}, max index {cell_max}");
            max_index = max_index.max(cell_max);
        }
        Ok(max_index)
    })
}

fn copy_index_list(t: &mut Transcoder<'_>) -> Result<u16> {
    let mut max_index = 0;
    loop {
        let index = t.half()?;
        if index == GRID_SENTINEL {
            return Ok(max_index);
        }
        max_index = max_index.max(index);
    }
}

/// Copies the triangles `0..=max_index` at `offset`. Triangle 0 is copied
/// even when no grid cell references it.
pub(crate) fn copy_collision_triangles(
    t: &mut Transcoder<'_>,
    offset: u32,
    max_index: u16,
) -> Result<()> {
    copy_table(
        t,
        Item::new(u32::from(max_index) + 1, offset),
        &COLLISION_TRIANGLE,
    )
}

pub(crate) fn copy_collision_fields(t: &mut Transcoder<'_>, fields: Item) -> Result<()> {
    if fields.is_absent() {
        return Ok(());
    }
    t.ensure_records(fields.offset, fields.count, COLLISION_FIELD_SIZE)?;
    debug!(
        "collision fields: {} record(s) at {:#X}",
        fields.count, fields.offset
    );
    t.tally("collision fields", u64::from(fields.count));
    t.at(fields.offset, |t| {
        for _ in 0..fields.count {
            copy_collision_field(t)?;
        }
        Ok(())
    })
}

/// Copies one collision field and everything it points at, leaving the
/// position directly after the fixed-size record.
fn copy_collision_field(t: &mut Transcoder<'_>) -> Result<()> {
    let start = t.position();

    t.words(3)?; // centre of rotation
    t.halves(3)?; // initial rotation
    t.half()?; // animation loop type
    let animation = t.word()?;
    t.words(3)?; // conveyor speed
    let triangles = t.word()?;
    let grid = t.word()?;
    t.words(4)?; // grid start x/z, step size x/z
    let x_steps = t.word()?;
    let z_steps = t.word()?;

    let goals = t.item()?;
    let bumpers = t.item()?;
    let jamabars = t.item()?;
    let bananas = t.item()?;
    let cones = t.item()?;
    let spheres = t.item()?;
    let cylinders = t.item()?;
    let fallout_volumes = t.item()?;
    let reflective_models = t.item()?;
    let model_duplicates = t.item()?;
    let level_models_b = t.item()?;
    t.words(2)?; // mystery eleven
    t.halves(2)?; // animation group id, padding
    let switches = t.item()?;
    t.raw(4)?;
    let mystery_five = t.word()?;
    t.words(3)?; // seesaw sensitivity, friction, spring
    let wormholes = t.item()?;
    t.word()?; // initial animation state
    t.word()?;
    t.word()?; // animation loop point
    let texture_scroll = t.word()?;
    t.raw(COLLISION_FIELD_SIZE - (t.position() - start))?;

    copy_animation(t, animation, &COLLISION_FIELD_ANIMATION)?;
    let max_index = copy_collision_grid(t, grid, x_steps, z_steps)?;
    copy_collision_triangles(t, triangles, max_index)?;

    let tables: [(Item, &Schema); 13] = [
        (goals, &GOAL),
        (bumpers, &BUMPER),
        (jamabars, &JAMABAR),
        (bananas, &BANANA),
        (cones, &CONE_COLLISION),
        (spheres, &SPHERE_COLLISION),
        (cylinders, &CYLINDER_COLLISION),
        (fallout_volumes, &FALLOUT_VOLUME),
        (reflective_models, &REFLECTIVE_MODEL),
        (model_duplicates, &MODEL_DUPLICATE),
        (level_models_b, &LEVEL_MODEL_B),
        (switches, &SWITCH),
        (wormholes, &WORMHOLE),
    ];
    for (item, schema) in tables {
        copy_table(t, item, schema)?;
    }
    copy_block(t, mystery_five, &MYSTERY_FIVE)?;
    copy_block(t, texture_scroll, &TEXTURE_SCROLL)?;

    debug_assert_eq!(t.position() - start, COLLISION_FIELD_SIZE);
    Ok(())
}
