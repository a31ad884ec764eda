//! Sparse tiled resistance maps and the provider seam to outside
//! terrain data.

use glam::IVec2;
use util::HashMap;

use crate::SenseChannel;

/// One scalar resistance channel over a z-level.
///
/// Sparse tiled storage; cells in missing tiles read as 0, fully
/// passable.
#[derive(Clone, Debug)]
pub struct ResistanceField {
    tile: i32,
    tiles: HashMap<IVec2, Box<[f32]>>,
}

impl ResistanceField {
    pub fn new(tile: i32) -> Self {
        assert!(tile > 0, "zero size resistance tile");
        ResistanceField {
            tile,
            tiles: Default::default(),
        }
    }

    fn split(&self, pos: IVec2) -> (IVec2, usize) {
        let tile_pos =
            IVec2::new(pos.x.div_euclid(self.tile), pos.y.div_euclid(self.tile));
        let local = IVec2::new(
            pos.x.rem_euclid(self.tile),
            pos.y.rem_euclid(self.tile),
        );
        (tile_pos, (local.y * self.tile + local.x) as usize)
    }

    pub fn get(&self, pos: IVec2) -> f32 {
        let (tile_pos, idx) = self.split(pos);
        self.tiles.get(&tile_pos).map_or(0.0, |t| t[idx])
    }

    pub fn set(&mut self, pos: IVec2, value: f32) {
        let (tile_pos, idx) = self.split(pos);
        let len = (self.tile * self.tile) as usize;
        let tile = self
            .tiles
            .entry(tile_pos)
            .or_insert_with(|| vec![0.0; len].into_boxed_slice());
        tile[idx] = value.clamp(0.0, 1.0);
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
}

impl field::ResistanceReader for ResistanceField {
    fn resistance(&self, pos: IVec2) -> f32 {
        self.get(pos)
    }
}

/// All resistance channels of one z-level: movement plus one field per
/// sense.
#[derive(Clone, Debug)]
pub struct ResistanceLevel {
    movement: ResistanceField,
    senses: [ResistanceField; SenseChannel::ALL.len()],
}

impl ResistanceLevel {
    pub fn new(tile: i32) -> Self {
        ResistanceLevel {
            movement: ResistanceField::new(tile),
            senses: std::array::from_fn(|_| ResistanceField::new(tile)),
        }
    }

    pub fn movement(&self) -> &ResistanceField {
        &self.movement
    }

    pub fn movement_mut(&mut self) -> &mut ResistanceField {
        &mut self.movement
    }

    pub fn sense(&self, channel: SenseChannel) -> &ResistanceField {
        &self.senses[channel.index()]
    }

    pub fn sense_mut(&mut self, channel: SenseChannel) -> &mut ResistanceField {
        &mut self.senses[channel.index()]
    }

    /// Write the same resistance into movement and every sense channel,
    /// the common case for solid terrain.
    pub fn set_all(&mut self, pos: IVec2, value: f32) {
        self.movement.set(pos, value);
        for f in &mut self.senses {
            f.set(pos, value);
        }
    }
}

/// Terrain-side collaborator supplying resistance data per z-level.
pub trait ResistanceProvider {
    fn try_get(&self, z: i32) -> Option<&ResistanceLevel>;
}

/// Simple owned provider backed by an in-memory map, used by tests and
/// small embedders. Larger games implement [`ResistanceProvider`] over
/// their own terrain store instead.
#[derive(Default)]
pub struct MapResistance {
    tile: i32,
    levels: HashMap<i32, ResistanceLevel>,
}

impl MapResistance {
    pub fn new(tile: i32) -> Self {
        MapResistance {
            tile,
            levels: Default::default(),
        }
    }

    pub fn level_mut(&mut self, z: i32) -> &mut ResistanceLevel {
        let tile = if self.tile > 0 { self.tile } else { 16 };
        self.levels
            .entry(z)
            .or_insert_with(|| ResistanceLevel::new(tile))
    }
}

impl ResistanceProvider for MapResistance {
    fn try_get(&self, z: i32) -> Option<&ResistanceLevel> {
        self.levels.get(&z)
    }
}
