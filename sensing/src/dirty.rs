//! Multi-resolution invalidation tracking.
//!
//! This cache is the sole authority on whether a sense source gets
//! recomputed and whether a region gets re-blitted; it is what keeps a
//! tick incremental instead of O(world size).

use glam::IVec2;
use util::HashMap;

use crate::SenseChannel;

/// Invalidation channel. Terrain edits that affect everything go on
/// `Global`; sense-specific edits go on their own channel so unrelated
/// sources stay clean.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum DirtyChannel {
    Global,
    Movement,
    Sense(SenseChannel),
}

impl DirtyChannel {
    pub const ALL: [DirtyChannel; 8] = [
        DirtyChannel::Global,
        DirtyChannel::Movement,
        DirtyChannel::Sense(SenseChannel::Light),
        DirtyChannel::Sense(SenseChannel::Vision),
        DirtyChannel::Sense(SenseChannel::Touch),
        DirtyChannel::Sense(SenseChannel::Heat),
        DirtyChannel::Sense(SenseChannel::Sound),
        DirtyChannel::Sense(SenseChannel::Smell),
    ];
}

/// One channel's sparse boolean grid at its own downsampling
/// resolution.
struct ChannelGrid {
    /// World cells per cache cell along one axis.
    resolution: i32,
    /// Cache cells per tile along one axis.
    tile: i32,
    offset: IVec2,
    tiles: HashMap<(i32, IVec2), Box<[bool]>>,
}

impl ChannelGrid {
    fn new(resolution: i32, tile: i32, offset: IVec2) -> Self {
        assert!(resolution > 0 && tile > 0, "degenerate dirty cache shape");
        ChannelGrid {
            resolution,
            tile,
            offset,
            tiles: Default::default(),
        }
    }

    fn downsample(&self, pos: IVec2) -> IVec2 {
        let p = pos - self.offset;
        IVec2::new(
            p.x.div_euclid(self.resolution),
            p.y.div_euclid(self.resolution),
        )
    }

    fn split(&self, cell: IVec2) -> (IVec2, usize) {
        let tile_pos =
            IVec2::new(cell.x.div_euclid(self.tile), cell.y.div_euclid(self.tile));
        let local = IVec2::new(
            cell.x.rem_euclid(self.tile),
            cell.y.rem_euclid(self.tile),
        );
        (tile_pos, (local.y * self.tile + local.x) as usize)
    }

    fn mark(&mut self, z: i32, pos: IVec2) {
        let (tile_pos, idx) = self.split(self.downsample(pos));
        let len = (self.tile * self.tile) as usize;
        self.tiles
            .entry((z, tile_pos))
            .or_insert_with(|| vec![false; len].into_boxed_slice())[idx] = true;
    }

    fn is_set(&self, z: i32, cell: IVec2) -> bool {
        let (tile_pos, idx) = self.split(cell);
        self.tiles.get(&(z, tile_pos)).map_or(false, |t| t[idx])
    }

    /// Any set cell in the inclusive world-space rectangle. Iterates
    /// downsampled cells and short-circuits on the first hit.
    fn any_set(&self, z: i32, min: IVec2, max: IVec2) -> bool {
        let lo = self.downsample(min);
        let hi = self.downsample(max);
        for cy in lo.y..=hi.y {
            for cx in lo.x..=hi.x {
                if self.is_set(z, IVec2::new(cx, cy)) {
                    return true;
                }
            }
        }
        false
    }

    fn clear(&mut self) {
        self.tiles.clear();
    }
}

/// Sparse dirty-region tracker over all invalidation channels.
pub struct DirtyCache {
    channels: HashMap<DirtyChannel, ChannelGrid>,
    globally_dirty: bool,
}

impl DirtyCache {
    /// `resolution` is the default world-cells-per-cache-cell factor;
    /// `overrides` adjusts single channels.
    pub fn new(
        resolution: i32,
        tile: i32,
        offset: IVec2,
        overrides: &HashMap<DirtyChannel, i32>,
    ) -> Self {
        let channels = DirtyChannel::ALL
            .into_iter()
            .map(|c| {
                let r = overrides.get(&c).copied().unwrap_or(resolution);
                (c, ChannelGrid::new(r, tile, offset))
            })
            .collect();
        DirtyCache {
            channels,
            globally_dirty: false,
        }
    }

    pub fn mark_dirty(&mut self, z: i32, channel: DirtyChannel, pos: IVec2) {
        if let Some(grid) = self.channels.get_mut(&channel) {
            grid.mark(z, pos);
        }
    }

    /// Make every query report dirty until the next [`mark_clean`].
    ///
    /// [`mark_clean`]: DirtyCache::mark_clean
    pub fn mark_globally_dirty(&mut self) {
        self.globally_dirty = true;
    }

    /// Clears the global flag and every per-tile flag of every channel
    /// together.
    pub fn mark_clean(&mut self) {
        self.globally_dirty = false;
        for grid in self.channels.values_mut() {
            grid.clear();
        }
    }

    pub fn is_globally_dirty(&self) -> bool {
        self.globally_dirty
    }

    pub fn is_dirty(&self, z: i32, channel: DirtyChannel, pos: IVec2) -> bool {
        self.is_dirty_rect(z, channel, pos, pos)
    }

    /// Any dirt within the inclusive rectangle on the channel itself or
    /// on the global channel.
    pub fn is_dirty_rect(
        &self,
        z: i32,
        channel: DirtyChannel,
        min: IVec2,
        max: IVec2,
    ) -> bool {
        if self.globally_dirty {
            return true;
        }
        if self.channels[&channel].any_set(z, min, max) {
            return true;
        }
        channel != DirtyChannel::Global
            && self.channels[&DirtyChannel::Global].any_set(z, min, max)
    }

    pub fn is_dirty_around(
        &self,
        z: i32,
        channel: DirtyChannel,
        pos: IVec2,
        radius: i32,
    ) -> bool {
        let r = IVec2::splat(radius.max(0));
        self.is_dirty_rect(z, channel, pos - r, pos + r)
    }
}
