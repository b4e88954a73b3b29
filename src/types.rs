//! Common types and traits for 3D geometry.
//!
//! This module defines the vector, bounding box and orientation types shared by
//! the item, bin and packer layers.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Represents a 3D vector or point in space.
///
/// Used for positions, pivots and effective dimensions.
///
/// # Examples
/// ```
/// use binpack3d::types::Vec3;
///
/// let position = Vec3::new(1.0, 2.0, 3.0);
/// let dimensions = Vec3::new(10.0, 20.0, 30.0);
/// let center = position + dimensions * 0.5;
/// assert_eq!(center, Vec3::new(6.0, 12.0, 18.0));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Creates a new 3D vector.
    ///
    /// # Parameters
    /// * `x` - X component (width axis)
    /// * `y` - Y component (height axis)
    /// * `z` - Z component (depth axis)
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Converts to tuple format for API compatibility.
    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    /// Creates from tuple format.
    #[inline]
    pub const fn from_tuple(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }

    /// Returns the component along `axis`.
    #[inline]
    pub const fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Width => self.x,
            Axis::Height => self.y,
            Axis::Depth => self.z,
        }
    }

    /// Returns a copy with the component along `axis` shifted by `delta`.
    #[inline]
    pub fn offset_along(&self, axis: Axis, delta: f64) -> Self {
        match axis {
            Axis::Width => Self::new(self.x + delta, self.y, self.z),
            Axis::Height => Self::new(self.x, self.y + delta, self.z),
            Axis::Depth => Self::new(self.x, self.y, self.z + delta),
        }
    }

    /// Applies `f` to every component.
    #[inline]
    pub fn map(self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(f(self.x), f(self.y), f(self.z))
    }

    /// Calculates the volume (product of all components).
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Checks if the vector fits within another vector (component-wise <=).
    #[inline]
    pub fn fits_within(&self, container: &Self) -> bool {
        Axis::ALL
            .iter()
            .all(|&axis| self.get(axis) <= container.get(axis))
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl From<(f64, f64, f64)> for Vec3 {
    #[inline]
    fn from(tuple: (f64, f64, f64)) -> Self {
        Self::from_tuple(tuple)
    }
}

impl From<Vec3> for (f64, f64, f64) {
    #[inline]
    fn from(vec: Vec3) -> Self {
        vec.as_tuple()
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.z)
    }
}

/// Spatial axis, in the order candidate pivots are grown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    Width,
    Height,
    Depth,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Width, Axis::Height, Axis::Depth];
}

/// One of the six axis-aligned orientations of an item.
///
/// Each variant names which intrinsic dimension lands on the x, y and z axis,
/// e.g. `Hdw` puts the height along x, the depth along y and the width along z.
/// [`RotationType::ALL`] is the canonical order in which placements try them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RotationType {
    #[default]
    Whd,
    Hwd,
    Hdw,
    Dhw,
    Dwh,
    Wdh,
}

impl RotationType {
    pub const ALL: [RotationType; 6] = [
        RotationType::Whd,
        RotationType::Hwd,
        RotationType::Hdw,
        RotationType::Dhw,
        RotationType::Dwh,
        RotationType::Wdh,
    ];

    /// Numeric code of the rotation (its index in [`RotationType::ALL`]).
    pub const fn code(self) -> u8 {
        match self {
            RotationType::Whd => 0,
            RotationType::Hwd => 1,
            RotationType::Hdw => 2,
            RotationType::Dhw => 3,
            RotationType::Dwh => 4,
            RotationType::Wdh => 5,
        }
    }

    /// Permutes intrinsic `(width, height, depth)` onto the `(x, y, z)` axes.
    #[inline]
    pub const fn apply(self, width: f64, height: f64, depth: f64) -> Vec3 {
        match self {
            RotationType::Whd => Vec3::new(width, height, depth),
            RotationType::Hwd => Vec3::new(height, width, depth),
            RotationType::Hdw => Vec3::new(height, depth, width),
            RotationType::Dhw => Vec3::new(depth, height, width),
            RotationType::Dwh => Vec3::new(depth, width, height),
            RotationType::Wdh => Vec3::new(width, depth, height),
        }
    }
}

impl fmt::Display for RotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RotationType::Whd => "WHD",
            RotationType::Hwd => "HWD",
            RotationType::Hdw => "HDW",
            RotationType::Dhw => "DHW",
            RotationType::Dwh => "DWH",
            RotationType::Wdh => "WDH",
        })
    }
}

/// Trait for objects with 3D dimensions.
pub trait Dimensional {
    /// Returns the dimensions of the object as laid out on the axes.
    fn dimensions(&self) -> Vec3;
}

/// Trait for objects with a position in 3D space.
pub trait Positioned {
    /// Returns the position (minimum corner).
    fn position(&self) -> Vec3;
}

/// Trait for objects with weight.
pub trait Weighted {
    /// Returns the weight.
    fn weight(&self) -> f64;
}

/// Represents an Axis-Aligned Bounding Box (AABB).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner (position)
    pub min: Vec3,
    /// Maximum corner (position + dimensions)
    pub max: Vec3,
}

impl BoundingBox {
    /// Creates a new bounding box.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates a bounding box from position and dimensions.
    #[inline]
    pub fn from_position_and_dims(position: Vec3, dims: Vec3) -> Self {
        Self {
            min: position,
            max: position + dims,
        }
    }

    /// Bounding box of anything that has both a position and dimensions.
    #[inline]
    pub fn of<T: Positioned + Dimensional>(value: &T) -> Self {
        Self::from_position_and_dims(value.position(), value.dimensions())
    }

    /// The eight corners, bottom face first, each face counter-clockwise.
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
        ]
    }

    /// Returns the center point.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the dimensions (width, height, depth).
    #[inline]
    pub fn dimensions(&self) -> Vec3 {
        self.max - self.min
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_vec3_operations() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(4.0, 5.0, 6.0);

        assert_eq!(a + b, Vec3::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Vec3::new(3.0, 3.0, 3.0));
        assert_eq!(a * 2.0, Vec3::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn test_vec3_axis_access() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(v.get(Axis::Width), 1.0);
        assert_eq!(v.get(Axis::Height), 2.0);
        assert_eq!(v.get(Axis::Depth), 3.0);
        assert_eq!(v.offset_along(Axis::Height, 5.0), Vec3::new(1.0, 7.0, 3.0));
    }

    #[test]
    fn test_vec3_fits_within() {
        let small = Vec3::new(5.0, 5.0, 5.0);
        let large = Vec3::new(10.0, 10.0, 10.0);

        assert!(small.fits_within(&large));
        assert!(large.fits_within(&large));
        assert!(!large.fits_within(&small));
    }

    #[test]
    fn rotations_are_a_complete_set_of_permutations() {
        let seen: HashSet<(u64, u64, u64)> = RotationType::ALL
            .iter()
            .map(|rt| {
                let v = rt.apply(1.0, 2.0, 3.0);
                (v.x as u64, v.y as u64, v.z as u64)
            })
            .collect();
        assert_eq!(seen.len(), 6);
        for (i, rt) in RotationType::ALL.iter().enumerate() {
            assert_eq!(rt.code() as usize, i);
        }
    }

    #[test]
    fn canonical_rotation_order() {
        let order: Vec<String> = RotationType::ALL.iter().map(|r| r.to_string()).collect();
        assert_eq!(order, ["WHD", "HWD", "HDW", "DHW", "DWH", "WDH"]);
        assert_eq!(RotationType::Hdw.apply(1.0, 2.0, 3.0), Vec3::new(2.0, 3.0, 1.0));
    }

    #[test]
    fn test_bounding_box_corners_and_center() {
        let bb = BoundingBox::from_position_and_dims(
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(2.0, 4.0, 6.0),
        );
        let corners = bb.corners();
        assert_eq!(corners[0], Vec3::new(1.0, 1.0, 1.0));
        assert_eq!(corners[6], Vec3::new(3.0, 5.0, 7.0));
        assert_eq!(bb.center(), Vec3::new(2.0, 3.0, 4.0));
        assert_eq!(bb.dimensions(), Vec3::new(2.0, 4.0, 6.0));
    }
}
