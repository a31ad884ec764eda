//! Propagation of sense signals from point sources across resistance
//! maps.
//!
//! Both propagation algorithms write the same [`SenseSourceData`] buffer
//! so downstream consumers never need to know which one produced a
//! field.

mod data;
pub use data::{SenseSourceData, SenseSourceDataBuilder};

mod floodfill;
pub use floodfill::flood_fill;

mod physics;
pub use physics::{
    AdjacencyRule, DistanceMeasurement, ExponentialDecay, FullStrength,
    LinearDecay, SensePhysics,
};

mod shadowcast;
pub use shadowcast::shadow_cast;

use glam::IVec2;

/// Read access to one channel of a resistance map.
///
/// Values are in `[0, 1]`; 0 is fully passable, 1 and above fully
/// blocking. Cells outside the map read as passable.
pub trait ResistanceReader {
    fn resistance(&self, pos: IVec2) -> f32;

    /// Whether a diagonal step from `from` is traversable.
    ///
    /// The diagonal target must be passable and at least one of the two
    /// flanking cardinal cells must be passable, so signal and movement
    /// never cut a corner between two solid walls.
    fn diagonal_passable(&self, from: IVec2, dir: util::Dir8) -> bool {
        debug_assert!(dir.is_diagonal());
        if self.resistance(from + dir.to_vec()) >= 1.0 {
            return false;
        }
        let (a, b) = dir.flanking();
        self.resistance(from + a.to_vec()) < 1.0
            || self.resistance(from + b.to_vec()) < 1.0
    }
}

impl<F: Fn(IVec2) -> f32> ResistanceReader for F {
    fn resistance(&self, pos: IVec2) -> f32 {
        self(pos)
    }
}
