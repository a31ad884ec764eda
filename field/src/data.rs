use glam::IVec2;
use util::{DirMask, VecExt};

#[derive(Copy, Clone, Debug, Default, PartialEq)]
struct Cell {
    intensity: f32,
    arrival: DirMask,
    written: bool,
}

/// Mutable origin-centered field buffer under construction.
///
/// Owned exclusively by the propagation call that created it; [`seal`]
/// freezes the contents into a shareable [`SenseSourceData`].
///
/// [`seal`]: SenseSourceDataBuilder::seal
pub struct SenseSourceDataBuilder {
    origin: IVec2,
    radius: i32,
    cells: Vec<Cell>,
}

impl SenseSourceDataBuilder {
    pub fn new(origin: IVec2, radius: i32) -> Self {
        let radius = radius.max(0);
        let side = (2 * radius + 1) as usize;
        SenseSourceDataBuilder {
            origin,
            radius,
            cells: vec![Cell::default(); side * side],
        }
    }

    fn idx(&self, pos: IVec2) -> Option<usize> {
        let rel = pos - self.origin;
        if rel.cheb_len() > self.radius {
            return None;
        }
        let side = 2 * self.radius + 1;
        Some(((rel.y + self.radius) * side + (rel.x + self.radius)) as usize)
    }

    /// Record signal at a world position.
    ///
    /// Overlapping writes keep the strongest intensity and merge arrival
    /// directions. Writes outside the buffer bounds are dropped.
    pub fn write(&mut self, pos: IVec2, intensity: f32, arrival: DirMask) {
        let Some(i) = self.idx(pos) else { return };
        let cell = &mut self.cells[i];
        if !cell.written || intensity > cell.intensity {
            cell.intensity = intensity;
        }
        cell.arrival |= arrival;
        cell.written = true;
    }

    pub fn is_written(&self, pos: IVec2) -> bool {
        self.idx(pos).map_or(false, |i| self.cells[i].written)
    }

    /// Freeze the buffer. No mutation is possible afterwards.
    pub fn seal(self) -> SenseSourceData {
        SenseSourceData {
            origin: self.origin,
            radius: self.radius,
            cells: self.cells.into_boxed_slice(),
        }
    }
}

/// Immutable local sense field around one source.
///
/// A square of side `2r + 1` centered on the source origin. Queries
/// outside the bounds or on cells the propagation never reached return
/// no signal. Safe to read from any thread.
#[derive(Clone, Debug)]
pub struct SenseSourceData {
    origin: IVec2,
    radius: i32,
    cells: Box<[Cell]>,
}

impl SenseSourceData {
    /// A sealed field with no signal anywhere, used for sources that
    /// failed preconditions.
    pub fn empty(origin: IVec2) -> Self {
        SenseSourceDataBuilder::new(origin, 0).seal()
    }

    pub fn origin(&self) -> IVec2 {
        self.origin
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Inclusive world-space bounds as `(min, max)` corners.
    pub fn bounds(&self) -> (IVec2, IVec2) {
        (
            self.origin - IVec2::splat(self.radius),
            self.origin + IVec2::splat(self.radius),
        )
    }

    fn cell(&self, pos: IVec2) -> Option<&Cell> {
        let rel = pos - self.origin;
        if rel.cheb_len() > self.radius {
            return None;
        }
        let side = 2 * self.radius + 1;
        let cell =
            &self.cells[((rel.y + self.radius) * side + (rel.x + self.radius)) as usize];
        cell.written.then_some(cell)
    }

    /// Intensity and arrival directions at a world position, `None` when
    /// there is no signal.
    pub fn signal_at(&self, pos: IVec2) -> Option<(f32, DirMask)> {
        self.cell(pos).map(|c| (c.intensity, c.arrival))
    }

    pub fn intensity_at(&self, pos: IVec2) -> f32 {
        self.cell(pos).map_or(0.0, |c| c.intensity)
    }

    pub fn arrival_at(&self, pos: IVec2) -> DirMask {
        self.cell(pos).map_or(DirMask::empty(), |c| c.arrival)
    }

    /// Iterate all cells carrying signal as world position, intensity
    /// and arrival directions.
    pub fn iter(&self) -> impl Iterator<Item = (IVec2, f32, DirMask)> + '_ {
        let side = 2 * self.radius + 1;
        self.cells.iter().enumerate().filter_map(move |(i, c)| {
            c.written.then(|| {
                let rel = IVec2::new(i as i32 % side, i as i32 / side)
                    - IVec2::splat(self.radius);
                (self.origin + rel, c.intensity, c.arrival)
            })
        })
    }
}
