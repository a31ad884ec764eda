use bitflags::bitflags;
use glam::{ivec2, IVec2};
use serde::{Deserialize, Serialize};

/// 8 directions, clock face order.
pub const DIR_8: [IVec2; 8] = [
    IVec2::from_array([0, -1]),
    IVec2::from_array([1, -1]),
    IVec2::from_array([1, 0]),
    IVec2::from_array([1, 1]),
    IVec2::from_array([0, 1]),
    IVec2::from_array([-1, 1]),
    IVec2::from_array([-1, 0]),
    IVec2::from_array([-1, -1]),
];

/// 4 directions, clock face order.
pub const DIR_4: [IVec2; 4] = [
    IVec2::from_array([0, -1]),
    IVec2::from_array([1, 0]),
    IVec2::from_array([0, 1]),
    IVec2::from_array([-1, 0]),
];

/// Compass direction between adjacent cells.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Dir8 {
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
}

use Dir8::*;

impl Dir8 {
    pub const ALL: [Dir8; 8] = [
        North, Northeast, East, Southeast, South, Southwest, West, Northwest,
    ];

    pub const CARDINALS: [Dir8; 4] = [North, East, South, West];

    pub const DIAGONALS: [Dir8; 4] = [Northeast, Southeast, Southwest, Northwest];

    pub fn to_vec(self) -> IVec2 {
        DIR_8[self as usize]
    }

    /// Direction of the given vector, rounded to the nearest compass point.
    ///
    /// Returns `None` for the zero vector.
    pub fn towards(v: IVec2) -> Option<Dir8> {
        if v == IVec2::ZERO {
            return None;
        }
        let (ax, ay) = (v.x.abs(), v.y.abs());
        let x = if 2 * ax > ay { v.x.signum() } else { 0 };
        let y = if 2 * ay > ax { v.y.signum() } else { 0 };
        Dir8::ALL
            .into_iter()
            .find(|d| d.to_vec() == ivec2(x, y))
    }

    pub fn opposite(self) -> Dir8 {
        Dir8::ALL[(self as usize + 4) % 8]
    }

    pub fn is_diagonal(self) -> bool {
        self as usize % 2 == 1
    }

    /// The two cardinal directions flanking a diagonal.
    ///
    /// Panics if called on a cardinal direction.
    pub fn flanking(self) -> (Dir8, Dir8) {
        assert!(self.is_diagonal());
        (
            Dir8::ALL[(self as usize + 7) % 8],
            Dir8::ALL[(self as usize + 1) % 8],
        )
    }
}

impl From<Dir8> for DirMask {
    fn from(d: Dir8) -> Self {
        DirMask::from_bits_truncate(1 << d as u8)
    }
}

bitflags! {
    /// Bitmask of compass directions, bit order matching [`Dir8`].
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct DirMask: u8 {
        const NORTH = 1 << 0;
        const NORTHEAST = 1 << 1;
        const EAST = 1 << 2;
        const SOUTHEAST = 1 << 3;
        const SOUTH = 1 << 4;
        const SOUTHWEST = 1 << 5;
        const WEST = 1 << 6;
        const NORTHWEST = 1 << 7;
    }
}

impl DirMask {
    pub fn has(self, dir: Dir8) -> bool {
        self.contains(dir.into())
    }

    /// Iterate the directions present in the mask in clock face order.
    pub fn dirs(self) -> impl Iterator<Item = Dir8> {
        Dir8::ALL.into_iter().filter(move |&d| self.has(d))
    }
}

pub trait VecExt: Sized {
    /// Absolute size of vector in taxicab metric.
    fn taxi_len(&self) -> i32;

    /// Absolute size of vector in king move metric.
    fn cheb_len(&self) -> i32;
}

impl VecExt for IVec2 {
    fn taxi_len(&self) -> i32 {
        self.x.abs() + self.y.abs()
    }

    fn cheb_len(&self) -> i32 {
        self.x.abs().max(self.y.abs())
    }
}
