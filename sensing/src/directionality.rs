//! Per-cell traversal directionality derived from obstruction maps.

use field::ResistanceReader;
use glam::{ivec2, IVec2};
use util::{Dir8, DirMask, HashMap, HashSet};

use crate::ResistanceField;

/// Adjacency bitmask for one cell of a resistance grid.
///
/// A cardinal bit is set iff that neighbor is passable (resistance
/// below 1). A diagonal bit additionally requires at least one of the
/// flanking cardinals to be passable, so paths never cut a corner
/// between two solid walls. Movement planning and sense propagation
/// share this exact rule.
pub fn directionality_mask(field: &impl ResistanceReader, pos: IVec2) -> DirMask {
    let mut mask = DirMask::empty();
    for d in Dir8::CARDINALS {
        if field.resistance(pos + d.to_vec()) < 1.0 {
            mask |= d.into();
        }
    }
    for d in Dir8::DIAGONALS {
        if field.diagonal_passable(pos, d) {
            mask |= d.into();
        }
    }
    mask
}

/// Derived tiled 3D grid of adjacency masks.
///
/// Tiles are recomputed only when an underlying resistance cell in
/// their span changed since the last rebuild, and a rebuild pass fans
/// dirty tiles out over a fork-join span scheduler.
pub struct DirectionalityMap {
    tile: i32,
    tiles: HashMap<(i32, IVec2), Box<[DirMask]>>,
    stale: HashSet<(i32, IVec2)>,
}

impl DirectionalityMap {
    pub fn new(tile: i32) -> Self {
        assert!(tile > 0, "zero size directionality tile");
        DirectionalityMap {
            tile,
            tiles: Default::default(),
            stale: Default::default(),
        }
    }

    fn tile_of(&self, pos: IVec2) -> IVec2 {
        ivec2(pos.x.div_euclid(self.tile), pos.y.div_euclid(self.tile))
    }

    /// Note a resistance edit. Masks of the eight neighbors change too,
    /// so every tile touching the cell's 3x3 neighborhood goes stale.
    pub fn note_change(&mut self, z: i32, pos: IVec2) {
        let lo = self.tile_of(pos - IVec2::ONE);
        let hi = self.tile_of(pos + IVec2::ONE);
        for ty in lo.y..=hi.y {
            for tx in lo.x..=hi.x {
                self.stale.insert((z, ivec2(tx, ty)));
            }
        }
    }

    /// Z-levels that currently have stale tiles.
    pub fn stale_levels(&self) -> Vec<i32> {
        let mut zs: Vec<i32> =
            self.stale.iter().map(|&(z, _)| z).collect();
        zs.sort_unstable();
        zs.dedup();
        zs
    }

    /// Recompute every stale tile of one z-level against the given
    /// resistance field.
    ///
    /// Dirty tiles are partitioned into spans and one task runs per
    /// span; the call blocks until all spans have joined. Tiles are
    /// disjoint write targets so the pass needs no locks; only this
    /// bookkeeping around it is sequential.
    pub fn rebuild(&mut self, z: i32, field: &ResistanceField, workers: usize) {
        let mut work: Vec<IVec2> = self
            .stale
            .iter()
            .filter(|&&(tz, _)| tz == z)
            .map(|&(_, t)| t)
            .collect();
        if work.is_empty() {
            return;
        }
        work.sort_unstable_by_key(|t| (t.y, t.x));

        let tile = self.tile;
        let spans = util::partition_spans(
            work.len(),
            4,
            workers,
        );
        log::debug!(
            "directionality z{z}: {} stale tiles over {} spans",
            work.len(),
            spans.len()
        );

        let computed: Vec<Vec<(IVec2, Box<[DirMask]>)>> =
            util::process_spans(&spans, |span| {
                work[span.start..span.end]
                    .iter()
                    .map(|&t| (t, compute_tile(field, t, tile)))
                    .collect()
            });

        for (t, masks) in computed.into_iter().flatten() {
            self.tiles.insert((z, t), masks);
            self.stale.remove(&(z, t));
        }
    }

    /// Mask at a world cell; tiles never built read as no adjacency.
    pub fn mask_at(&self, z: i32, pos: IVec2) -> DirMask {
        let t = self.tile_of(pos);
        let Some(masks) = self.tiles.get(&(z, t)) else {
            return DirMask::empty();
        };
        let local = ivec2(
            pos.x.rem_euclid(self.tile),
            pos.y.rem_euclid(self.tile),
        );
        masks[(local.y * self.tile + local.x) as usize]
    }

    /// Read view over one z-level, `None` when no tiles exist there.
    pub fn try_view(&self, z: i32) -> Option<DirectionalityView<'_>> {
        self.tiles
            .keys()
            .any(|&(tz, _)| tz == z)
            .then_some(DirectionalityView { map: self, z })
    }
}

fn compute_tile(
    field: &ResistanceField,
    tile_pos: IVec2,
    tile: i32,
) -> Box<[DirMask]> {
    let base = tile_pos * tile;
    let mut masks = vec![DirMask::empty(); (tile * tile) as usize];
    for y in 0..tile {
        for x in 0..tile {
            masks[(y * tile + x) as usize] =
                directionality_mask(field, base + ivec2(x, y));
        }
    }
    masks.into_boxed_slice()
}

/// Borrowed single-level view handed to movement planning.
pub struct DirectionalityView<'a> {
    map: &'a DirectionalityMap,
    z: i32,
}

impl DirectionalityView<'_> {
    pub fn mask_at(&self, pos: IVec2) -> DirMask {
        self.map.mask_at(self.z, pos)
    }
}
