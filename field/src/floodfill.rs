//! Resistance-weighted flood fill for senses that travel around
//! corners.

use std::{cell::RefCell, cmp::Ordering, collections::BinaryHeap};

use glam::IVec2;
use ordered_float::OrderedFloat;
use util::DirMask;

use crate::{
    AdjacencyRule, DistanceMeasurement, ResistanceReader, SensePhysics,
    SenseSourceData, SenseSourceDataBuilder,
};

struct Node {
    cost: OrderedFloat<f32>,
    /// 0 for cardinal arrivals, 1 for diagonal; breaks cost ties so
    /// straight-line cells record straight arrival trails instead of
    /// whichever equal-cost diagonal the heap surfaces first.
    bend: u8,
    pos: IVec2,
    arrival: DirMask,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.bend == other.bend
    }
}

impl Eq for Node {}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    // Reversed so the binary heap pops the cheapest node first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .cmp(&self.cost)
            .then_with(|| other.bend.cmp(&self.bend))
    }
}

#[derive(Default)]
struct Scratch {
    frontier: BinaryHeap<Node>,
}

thread_local! {
    static POOL: RefCell<Vec<Scratch>> = RefCell::new(Vec::new());
}

/// Scoped lease of a pooled frontier, returned to the thread's pool on
/// drop.
struct Lease(Option<Scratch>);

impl Lease {
    fn acquire() -> Lease {
        Lease(Some(POOL.with(|p| p.borrow_mut().pop().unwrap_or_default())))
    }

    fn frontier(&mut self) -> &mut BinaryHeap<Node> {
        &mut self.0.as_mut().expect("lease already released").frontier
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Some(mut s) = self.0.take() {
            s.frontier.clear();
            POOL.with(|p| p.borrow_mut().push(s));
        }
    }
}

/// Propagate a non-line-of-sight sense from `origin` across the
/// resistance map.
///
/// Cost-ordered frontier expansion over the neighbor graph. Each step
/// accumulates `step * (1 + resistance)`; a cell is finalized the first
/// time it is popped, recording both the intensity at the accumulated
/// cost and the discrete direction the signal arrived from. Cells of
/// resistance 1 or more are never entered.
pub fn flood_fill(
    origin: IVec2,
    intensity: f32,
    physics: &dyn SensePhysics,
    measurement: DistanceMeasurement,
    adjacency: AdjacencyRule,
    reader: &impl ResistanceReader,
) -> SenseSourceData {
    let max_radius = physics.signal_radius(intensity);
    if intensity <= 0.0 || max_radius <= 0.0 {
        return SenseSourceData::empty(origin);
    }
    let r = max_radius.floor() as i32;

    let mut out = SenseSourceDataBuilder::new(origin, r);
    let mut lease = Lease::acquire();
    let frontier = lease.frontier();

    frontier.push(Node {
        cost: OrderedFloat(0.0),
        bend: 0,
        pos: origin,
        arrival: DirMask::empty(),
    });

    while let Some(node) = frontier.pop() {
        if out.is_written(node.pos) {
            continue;
        }

        let signal =
            intensity * physics.signal_strength(node.cost.0, max_radius);
        if signal <= 0.0 {
            continue;
        }
        out.write(node.pos, signal, node.arrival);

        for &dir in adjacency.dirs() {
            let next = node.pos + dir.to_vec();
            if out.is_written(next) {
                continue;
            }
            if dir.is_diagonal() {
                if !reader.diagonal_passable(node.pos, dir) {
                    continue;
                }
            } else if reader.resistance(next) >= 1.0 {
                continue;
            }

            let step = measurement.step_cost(dir)
                * (1.0 + reader.resistance(next));
            let cost = node.cost.0 + step;
            if cost > max_radius {
                continue;
            }
            frontier.push(Node {
                cost: OrderedFloat(cost),
                bend: dir.is_diagonal() as u8,
                pos: next,
                arrival: dir.opposite().into(),
            });
        }
    }

    out.seal()
}
