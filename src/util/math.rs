//! Math type re-exports and tree-specific geometry types.
//!
//! Real values decoded from the fixed-point wire format are exact in `f64`,
//! so geometry is carried in double precision.

pub use glam::{DVec2, DVec3};

use serde::{Deserialize, Serialize};
use std::fmt;

/// World axis a node splits along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Convert a wire axis index (0, 1, 2).
    #[inline]
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::X),
            1 => Some(Self::Y),
            2 => Some(Self::Z),
            _ => None,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        })
    }
}

/// Axis-aligned box stored as location (minimum corner) plus size,
/// matching the tree file layout.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
    pub location: DVec3,
    pub size: DVec3,
}

impl Aabb {
    #[inline]
    pub const fn new(location: DVec3, size: DVec3) -> Self {
        Self { location, size }
    }

    #[inline]
    pub fn min(&self) -> DVec3 {
        self.location
    }

    #[inline]
    pub fn max(&self) -> DVec3 {
        self.location + self.size
    }

    /// Clamp a coordinate on `axis` into the box's extent.
    #[inline]
    pub fn clamp_on_axis(&self, axis: Axis, value: f64) -> f64 {
        let a = axis.index();
        let (lo, hi) = (self.min()[a], self.max()[a]);
        value.clamp(lo.min(hi), hi.max(lo))
    }

    /// Split along `axis` at world coordinate `position`.
    ///
    /// The left box covers `[min, position)` and the right box
    /// `[position, max)` on that axis. The position is clamped into the box
    /// so neither half gets a negative size.
    pub fn split(&self, axis: Axis, position: f64) -> (Aabb, Aabb) {
        let a = axis.index();
        let lo = self.min()[a];
        let hi = self.max()[a];
        let cut = self.clamp_on_axis(axis, position);

        let mut left = *self;
        left.size[a] = cut - lo;

        let mut right = *self;
        right.location[a] = cut;
        right.size[a] = hi - cut;

        (left, right)
    }

    /// The eight corners; bit 0 of the index selects max x, bit 1 max y,
    /// bit 2 max z.
    pub fn corners(&self) -> [DVec3; 8] {
        let lo = self.min();
        let hi = self.max();
        std::array::from_fn(|i| {
            DVec3::new(
                if i & 1 != 0 { hi.x } else { lo.x },
                if i & 2 != 0 { hi.y } else { lo.y },
                if i & 4 != 0 { hi.z } else { lo.z },
            )
        })
    }

    /// The twelve edges as line segments.
    pub fn edges(&self) -> [[DVec3; 2]; 12] {
        let c = self.corners();
        // Corner pairs differing in exactly one bit
        const PAIRS: [(usize, usize); 12] = [
            (0, 1), (2, 3), (4, 5), (6, 7),
            (0, 2), (1, 3), (4, 6), (5, 7),
            (0, 4), (1, 5), (2, 6), (3, 7),
        ];
        PAIRS.map(|(a, b)| [c[a], c[b]])
    }

    /// Rectangle where the plane `axis = position` cuts this box,
    /// as four corners in winding order.
    pub fn split_plane(&self, axis: Axis, position: f64) -> [DVec3; 4] {
        let a = axis.index();
        let (u, v) = ((a + 1) % 3, (a + 2) % 3);
        let lo = self.min();
        let hi = self.max();
        let corner = |su: f64, sv: f64| {
            let mut p = DVec3::ZERO;
            p[a] = position;
            p[u] = su;
            p[v] = sv;
            p
        };
        [
            corner(lo[u], lo[v]),
            corner(hi[u], lo[v]),
            corner(hi[u], hi[v]),
            corner(lo[u], hi[v]),
        ]
    }
}
