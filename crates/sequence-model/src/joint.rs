//! Joint positions and per-sample status flags.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A 3D position in the sequence's distance unit (usually meters).
///
/// Serialized as a `[x, y, z]` array.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// One of the three coordinate axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

impl Position {
    pub const ORIGIN: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another position.
    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }

    /// Linear interpolation. `t` is not clamped.
    pub fn lerp(a: &Position, b: &Position, t: f64) -> Position {
        Position {
            x: a.x + (b.x - a.x) * t,
            y: a.y + (b.y - a.y) * t,
            z: a.z + (b.z - a.z) * t,
        }
    }

    /// Value along one axis.
    pub fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Set the value along one axis.
    pub fn set_axis(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
    }

    /// True if all three coordinates are exactly zero.
    ///
    /// Several tracking systems report a lost joint as the origin.
    pub fn is_origin(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<[f64; 3]> for Position {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<Position> for [f64; 3] {
    fn from(p: Position) -> Self {
        [p.x, p.y, p.z]
    }
}

impl Add for Position {
    type Output = Position;
    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Position {
    type Output = Position;
    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Position {
    type Output = Position;
    fn mul(self, rhs: f64) -> Position {
        Position::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Status flags attached to one joint sample.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct JointStatus(u8);

impl JointStatus {
    /// A jump or twitch correction rewrote this sample. Never overwritten afterwards.
    pub const CORRECTED: JointStatus = JointStatus(1);
    /// The sample was filled in by zero correction.
    pub const INTERPOLATED: JointStatus = JointStatus(1 << 1);
    /// The tracker reported this sample as the origin.
    pub const ZERO: JointStatus = JointStatus(1 << 2);
    /// Coordinates were recomputed relative to a reference joint.
    pub const RE_REFERENCED: JointStatus = JointStatus(1 << 3);
    /// The velocity towards the next sample crossed the jitter threshold.
    pub const OVER_THRESHOLD: JointStatus = JointStatus(1 << 4);

    const NAMES: [(JointStatus, &'static str); 5] = [
        (Self::CORRECTED, "CORRECTED"),
        (Self::INTERPOLATED, "INTERPOLATED"),
        (Self::ZERO, "ZERO"),
        (Self::RE_REFERENCED, "RE_REFERENCED"),
        (Self::OVER_THRESHOLD, "OVER_THRESHOLD"),
    ];

    pub const fn empty() -> Self {
        JointStatus(0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: JointStatus) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: JointStatus) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: JointStatus) {
        self.0 &= !other.0;
    }

    pub const fn union(self, other: JointStatus) -> Self {
        JointStatus(self.0 | other.0)
    }
}

impl fmt::Debug for JointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "JointStatus({})", names.join(" | "))
    }
}

/// One joint sample: a position and its status.
///
/// The joint label is the key under which the joint is stored in its
/// [`Pose`](crate::pose::Pose).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Joint {
    pub position: Position,
    pub status: JointStatus,
}

impl Joint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self::from_position(Position::new(x, y, z))
    }

    pub fn from_position(position: Position) -> Self {
        Self {
            position,
            status: JointStatus::empty(),
        }
    }

    pub fn x(&self) -> f64 {
        self.position.x
    }

    pub fn y(&self) -> f64 {
        self.position.y
    }

    pub fn z(&self) -> f64 {
        self.position.z
    }

    pub fn is_corrected(&self) -> bool {
        self.status.contains(JointStatus::CORRECTED)
    }

    pub fn is_interpolated(&self) -> bool {
        self.status.contains(JointStatus::INTERPOLATED)
    }

    pub fn is_zero(&self) -> bool {
        self.status.contains(JointStatus::ZERO)
    }

    pub fn is_re_referenced(&self) -> bool {
        self.status.contains(JointStatus::RE_REFERENCED)
    }

    /// Copy of this joint moved to `position`, with `flag` added to its status.
    pub fn moved_to(&self, position: Position, flag: JointStatus) -> Joint {
        Joint {
            position,
            status: self.status.union(flag),
        }
    }
}
