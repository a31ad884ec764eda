//! Composition of local source fields into shared sense maps.

use field::SenseSourceData;
use glam::IVec2;
use util::{DirMask, HashMap};

/// Composed per-level intensity field.
///
/// Cells hold the strongest contribution seen so far plus the union of
/// arrival directions. Composition is always max, never summation: two
/// overlapping sources of strength 5 and 8 read as 8.
#[derive(Clone, Debug, Default)]
pub struct SenseMap {
    cells: HashMap<IVec2, (f32, DirMask)>,
}

impl SenseMap {
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn intensity_at(&self, pos: IVec2) -> f32 {
        self.cells.get(&pos).map_or(0.0, |c| c.0)
    }

    pub fn arrival_at(&self, pos: IVec2) -> DirMask {
        self.cells.get(&pos).map_or(DirMask::empty(), |c| c.1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (IVec2, f32, DirMask)> + '_ {
        self.cells.iter().map(|(&p, &(i, m))| (p, i, m))
    }

    fn compose(&mut self, pos: IVec2, intensity: f32, arrival: DirMask) {
        let cell = self.cells.entry(pos).or_default();
        cell.0 = cell.0.max(intensity);
        cell.1 |= arrival;
    }

    /// Overlay every cell of a source field, max on intensity, OR on
    /// direction bits. Used for ambient per-level fields.
    pub fn blit(&mut self, source: &SenseSourceData) {
        for (pos, intensity, arrival) in source.iter() {
            self.compose(pos, intensity, arrival);
        }
    }

    /// Walk the arrival-direction trail of a source starting at a
    /// receptor position, writing only where the source strictly
    /// improves the existing value. Used for per-receptor perception
    /// views.
    pub fn follow_trail(&mut self, source: &SenseSourceData, from: IVec2) {
        let mut pos = from;
        // Trail length is bounded by the field diameter; guards against
        // degenerate arrival loops.
        let mut budget = 4 * (source.radius() + 1);
        while budget > 0 {
            budget -= 1;
            let Some((intensity, arrival)) = source.signal_at(pos) else {
                break;
            };
            if intensity > self.intensity_at(pos) {
                self.compose(pos, intensity, arrival);
            }
            let Some(dir) = arrival.dirs().next() else {
                break;
            };
            pos += dir.to_vec();
        }
    }
}
