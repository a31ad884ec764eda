//! Recursive shadowcasting for line-of-sight senses.

use glam::{ivec2, IVec2};
use util::{Dir8, DirMask};

use crate::{
    DistanceMeasurement, ResistanceReader, SensePhysics, SenseSourceData,
    SenseSourceDataBuilder,
};

/// Octant mirror multipliers `(xx, xy, yx, yy)`.
const OCTANTS: [(i32, i32, i32, i32); 8] = [
    (1, 0, 0, 1),
    (0, 1, 1, 0),
    (0, -1, 1, 0),
    (-1, 0, 0, 1),
    (-1, 0, 0, -1),
    (0, -1, -1, 0),
    (0, 1, -1, 0),
    (1, 0, 0, -1),
];

/// Pending octant scan rows, replaces call-stack recursion so large
/// radii cannot overflow the stack.
#[derive(Copy, Clone)]
struct Frame {
    row: i32,
    start: f32,
    end: f32,
}

/// Propagate a line-of-sight sense from `origin` across the resistance
/// map.
///
/// Scans eight symmetric octants keeping a `(start, end)` slope window
/// per row. A fully blocking cell (resistance 1 or more) narrows the
/// window for the rows behind it; partial resistance leaves the window
/// alone but attenuates the signal by the resistance accumulated along
/// the traced path.
pub fn shadow_cast(
    origin: IVec2,
    intensity: f32,
    physics: &dyn SensePhysics,
    measurement: DistanceMeasurement,
    reader: &impl ResistanceReader,
) -> SenseSourceData {
    let max_radius = physics.signal_radius(intensity);
    if intensity <= 0.0 || max_radius <= 0.0 {
        return SenseSourceData::empty(origin);
    }
    let r = max_radius.floor() as i32;

    let mut out = SenseSourceDataBuilder::new(origin, r);
    out.write(origin, intensity, DirMask::empty());

    // Accumulated path resistance per cell, shared by all octants so
    // seam cells keep their cheapest path.
    let side = (2 * r + 1) as usize;
    let mut path_res = vec![f32::NAN; side * side];
    let att_idx = |rel: IVec2| ((rel.y + r) * (2 * r + 1) + (rel.x + r)) as usize;
    path_res[att_idx(IVec2::ZERO)] = 0.0;

    let mut stack: Vec<Frame> = Vec::with_capacity(r as usize);

    for &(xx, xy, yx, yy) in &OCTANTS {
        let project =
            |dx: i32, dy: i32| ivec2(dx * xx + dy * xy, dx * yx + dy * yy);

        stack.push(Frame {
            row: 1,
            start: 1.0,
            end: 0.0,
        });

        while let Some(frame) = stack.pop() {
            let mut start = frame.start;
            if start < frame.end {
                continue;
            }

            'rows: for j in frame.row..=r {
                let mut blocked = false;
                let mut new_start = start;

                for dx in -j..=0 {
                    let dy = -j;
                    let l_slope = (dx as f32 - 0.5) / (dy as f32 + 0.5);
                    let r_slope = (dx as f32 + 0.5) / (dy as f32 - 0.5);

                    if start < r_slope {
                        continue;
                    }
                    if frame.end > l_slope {
                        break;
                    }

                    let rel = project(dx, dy);
                    let pos = origin + rel;
                    let res = reader.resistance(pos);
                    let blocks = res >= 1.0;

                    // Resistance integrated along the ray up to but not
                    // including this cell.
                    let pdx =
                        (dx as f32 * (j - 1) as f32 / j as f32).round() as i32;
                    let parent = project(pdx, -(j - 1));
                    let upstream = {
                        let v = path_res[att_idx(parent)];
                        if v.is_nan() {
                            0.0
                        } else {
                            v
                        }
                    };
                    let here = att_idx(rel);
                    if path_res[here].is_nan() || upstream + res < path_res[here] {
                        path_res[here] = upstream + res;
                    }

                    let d = measurement.measure(rel);
                    if d <= max_radius {
                        let strength = physics.signal_strength(d, max_radius)
                            * (1.0 - upstream).clamp(0.0, 1.0);
                        let signal = intensity * strength;
                        if signal > 0.0 {
                            let arrival = Dir8::towards(-rel)
                                .map_or(DirMask::empty(), DirMask::from);
                            out.write(pos, signal, arrival);
                        }
                    }

                    if blocked {
                        if blocks {
                            new_start = r_slope;
                        } else {
                            blocked = false;
                            start = new_start;
                        }
                    } else if blocks && j < r {
                        blocked = true;
                        stack.push(Frame {
                            row: j + 1,
                            start,
                            end: l_slope,
                        });
                        new_start = r_slope;
                    }
                }

                if blocked {
                    break 'rows;
                }
            }
        }
    }

    out.seal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LinearDecay;
    use util::VecExt;

    fn walls(cells: &[IVec2]) -> impl ResistanceReader + '_ {
        move |pos: IVec2| {
            if cells.contains(&pos) {
                1.0
            } else {
                0.0
            }
        }
    }

    #[test]
    fn open_room_linear_falloff() {
        let data = shadow_cast(
            IVec2::ZERO,
            10.0,
            &LinearDecay,
            DistanceMeasurement::Chebyshev,
            &walls(&[]),
        );

        for y in -4..=4 {
            for x in -4..=4 {
                let pos = ivec2(x, y);
                let d = pos.cheb_len();
                let got = data.intensity_at(pos);
                assert!(
                    (got - (10 - d) as f32).abs() < 1e-4,
                    "intensity at {pos}: {got}"
                );
            }
        }
    }

    #[test]
    fn zero_intensity_is_empty() {
        let data = shadow_cast(
            IVec2::ZERO,
            0.0,
            &LinearDecay,
            DistanceMeasurement::Chebyshev,
            &walls(&[]),
        );
        assert_eq!(data.iter().count(), 0);
        assert_eq!(data.signal_at(IVec2::ZERO), None);
    }

    #[test]
    fn wall_casts_shadow() {
        // Wall two cells east, cells directly behind it stay dark.
        let wall = [ivec2(2, 0)];
        let data = shadow_cast(
            IVec2::ZERO,
            10.0,
            &LinearDecay,
            DistanceMeasurement::Chebyshev,
            &walls(&wall),
        );

        // The wall itself is lit.
        assert!(data.intensity_at(ivec2(2, 0)) > 0.0);
        // Straight behind the wall is shadowed.
        for x in 3..=8 {
            assert_eq!(
                data.signal_at(ivec2(x, 0)),
                None,
                "cell ({x}, 0) should be shadowed"
            );
        }
        // Off-axis light is unaffected.
        assert!(data.intensity_at(ivec2(3, 3)) > 0.0);
    }

    #[test]
    fn partial_resistance_attenuates() {
        // A pane of 0.5 resistance east of the source.
        let reader = |pos: IVec2| {
            if pos == ivec2(1, 0) {
                0.5
            } else {
                0.0
            }
        };
        let data = shadow_cast(
            IVec2::ZERO,
            10.0,
            &LinearDecay,
            DistanceMeasurement::Chebyshev,
            &reader,
        );

        // The pane is at full local strength, cells behind lose half.
        assert!((data.intensity_at(ivec2(1, 0)) - 9.0).abs() < 1e-4);
        assert!((data.intensity_at(ivec2(2, 0)) - 4.0).abs() < 1e-4);
        // An untouched ray keeps full strength.
        assert!((data.intensity_at(ivec2(0, 2)) - 8.0).abs() < 1e-4);
    }

    #[test]
    fn arrival_points_back_at_source() {
        let data = shadow_cast(
            IVec2::ZERO,
            5.0,
            &LinearDecay,
            DistanceMeasurement::Chebyshev,
            &walls(&[]),
        );
        let mut seen = 0;
        for (pos, _, arrival) in data.iter() {
            if pos == IVec2::ZERO {
                continue;
            }
            for d in arrival.dirs() {
                seen += 1;
                // A step along any arrival direction gets closer to the
                // source.
                assert!(
                    (pos + d.to_vec()).cheb_len() <= pos.cheb_len(),
                    "arrival at {pos} walks away from source"
                );
            }
        }
        assert!(seen > 0);
    }
}
