//! Data models for the bin packing engine.
//!
//! This module defines the fundamental data structures:
//! - `Item`: a rotatable rectangular prism with weight
//! - `Bin`: a fixed-size container holding placed items
//!
//! Both implement the traits from the `types` module.

use std::fmt;

use thiserror::Error;

use crate::geometry::{intersects, round_to};
use crate::types::{BoundingBox, Dimensional, Positioned, RotationType, Vec3, Weighted};

/// Number of decimals used when no precision has been assigned yet.
pub const DEFAULT_PRECISION: u32 = 3;

/// Largest accepted precision; beyond this `f64` has no digits left to round.
pub const MAX_PRECISION: u32 = 12;

/// Validation error for item, bin and run parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid precision: {0}")]
    InvalidPrecision(String),
}

fn validate_dimension(value: f64, name: &str) -> Result<(), ValidationError> {
    if value <= 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidDimension(format!(
            "{} must be positive and finite, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_weight(value: f64, name: &str) -> Result<(), ValidationError> {
    if value < 0.0 || !value.is_finite() {
        return Err(ValidationError::InvalidWeight(format!(
            "{} must be non-negative and finite, got: {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_dims(dims: (f64, f64, f64), prefix: &str) -> Result<(), ValidationError> {
    validate_dimension(dims.0, &format!("{prefix} width"))?;
    validate_dimension(dims.1, &format!("{prefix} height"))?;
    validate_dimension(dims.2, &format!("{prefix} depth"))?;
    Ok(())
}

/// Checks that `precision` is a usable number of decimals.
pub fn validate_precision(precision: u32) -> Result<(), ValidationError> {
    if precision > MAX_PRECISION {
        return Err(ValidationError::InvalidPrecision(format!(
            "precision must be between 0 and {}, got: {}",
            MAX_PRECISION, precision
        )));
    }
    Ok(())
}

/// Represents one object to be packed.
///
/// The intrinsic `width`, `height` and `depth` never change; `rotation` and
/// `position` describe how the item lies once a bin has accepted it. Items held
/// by a caller keep the default orientation at the origin.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    pub name: String,
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    pub weight: f64,
    pub rotation: RotationType,
    pub position: Vec3,
    pub precision: u32,
}

impl Item {
    /// Creates a new item with validation.
    ///
    /// # Examples
    /// ```
    /// use binpack3d::model::Item;
    ///
    /// assert!(Item::new("crate", 10.0, 20.0, 30.0, 5.0).is_ok());
    /// assert!(Item::new("broken", -10.0, 20.0, 30.0, 5.0).is_err());
    /// ```
    pub fn new(
        name: impl Into<String>,
        width: f64,
        height: f64,
        depth: f64,
        weight: f64,
    ) -> Result<Self, ValidationError> {
        validate_dims((width, height, depth), "Item")?;
        validate_weight(weight, "Item weight")?;
        Ok(Self {
            name: name.into(),
            width,
            height,
            depth,
            weight,
            rotation: RotationType::default(),
            position: Vec3::zero(),
            precision: DEFAULT_PRECISION,
        })
    }

    /// Rounds the stored dimensions and weight to `precision` decimals.
    pub fn normalize_precision(&mut self, precision: u32) {
        self.width = round_to(self.width, precision);
        self.height = round_to(self.height, precision);
        self.depth = round_to(self.depth, precision);
        self.weight = round_to(self.weight, precision);
        self.precision = precision;
    }

    /// Volume from the intrinsic dimensions, independent of rotation.
    pub fn volume(&self) -> f64 {
        round_to(self.width * self.height * self.depth, self.precision)
    }

    /// Intrinsic dimensions laid out on (x, y, z) by the current rotation.
    #[inline]
    pub fn effective_dimensions(&self) -> Vec3 {
        self.rotation.apply(self.width, self.height, self.depth)
    }

    /// Bounding box at the current position, with the far corner rounded to
    /// the item's precision.
    pub fn bounding_box(&self) -> BoundingBox {
        let max = self.position + self.effective_dimensions();
        BoundingBox::new(self.position, max.map(|v| round_to(v, self.precision)))
    }

    /// The eight corners of the item's box, for rendering.
    pub fn bounding_box_corners(&self) -> [Vec3; 8] {
        self.bounding_box().corners()
    }

    /// Center point of the item's box.
    pub fn center(&self) -> Vec3 {
        self.bounding_box().center()
    }
}

impl Dimensional for Item {
    fn dimensions(&self) -> Vec3 {
        self.effective_dimensions()
    }
}

impl Positioned for Item {
    fn position(&self) -> Vec3 {
        self.position
    }
}

impl Weighted for Item {
    fn weight(&self) -> f64 {
        self.weight
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}x{}x{}, weight: {}) pos({}) rt({}) vol({})",
            self.name,
            self.width,
            self.height,
            self.depth,
            self.weight,
            self.position,
            self.rotation,
            self.volume()
        )
    }
}

/// Why a bin turned down a placement attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PutRejection {
    /// No rotation keeps the item inside the bin at this pivot.
    #[error("item extends past the bin boundary in every rotation")]
    OutOfBounds,
    /// The first rotation that fits the boundary overlaps a placed item.
    #[error("item collides with a placed item in rotation {rotation}")]
    Collision { rotation: RotationType },
    /// The item fits geometrically but would exceed the bin's weight limit.
    #[error("item would exceed the bin's maximum weight in rotation {rotation}")]
    Overweight { rotation: RotationType },
}

impl PutRejection {
    pub fn code(&self) -> &'static str {
        match self {
            PutRejection::OutOfBounds => "out_of_bounds",
            PutRejection::Collision { .. } => "collision",
            PutRejection::Overweight { .. } => "overweight",
        }
    }
}

/// Represents one container with a weight capacity.
///
/// # Fields
/// * `items` - Placed items, in placement order
/// * `unfitted_items` - Items this bin could not take, untouched
#[derive(Clone, Debug)]
pub struct Bin {
    pub name: String,
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    pub max_weight: f64,
    pub items: Vec<Item>,
    pub unfitted_items: Vec<Item>,
    pub precision: u32,
    offset: Option<Vec3>,
}

impl Bin {
    /// Creates a new empty bin with validation.
    pub fn new(
        name: impl Into<String>,
        width: f64,
        height: f64,
        depth: f64,
        max_weight: f64,
    ) -> Result<Self, ValidationError> {
        validate_dims((width, height, depth), "Bin")?;
        validate_weight(max_weight, "Bin max_weight")?;
        Ok(Self {
            name: name.into(),
            width,
            height,
            depth,
            max_weight,
            items: Vec::new(),
            unfitted_items: Vec::new(),
            precision: DEFAULT_PRECISION,
            offset: None,
        })
    }

    /// Rounds the stored dimensions and weight limit to `precision` decimals.
    pub fn normalize_precision(&mut self, precision: u32) {
        self.width = round_to(self.width, precision);
        self.height = round_to(self.height, precision);
        self.depth = round_to(self.depth, precision);
        self.max_weight = round_to(self.max_weight, precision);
        self.precision = precision;
    }

    pub fn volume(&self) -> f64 {
        round_to(self.width * self.height * self.depth, self.precision)
    }

    /// Sum of the weights of all placed items.
    pub fn total_weight(&self) -> f64 {
        round_to(self.items.iter().map(|i| i.weight).sum(), self.precision)
    }

    /// Translation used when reporting the bin in a shared scene.
    pub fn set_offset(&mut self, x: f64, y: f64, z: f64) {
        self.offset = Some(Vec3::new(x, y, z));
    }

    pub fn offset(&self) -> Vec3 {
        self.offset.unwrap_or_default()
    }

    /// The eight corners of the bin, translated by its offset.
    pub fn bounding_box_corners(&self) -> [Vec3; 8] {
        BoundingBox::of(self).corners()
    }

    pub fn center(&self) -> Vec3 {
        BoundingBox::of(self).center()
    }

    /// Evaluates placing `item` with its minimum corner at `pivot`.
    ///
    /// Rotations are tried in [`RotationType::ALL`] order. The first rotation
    /// that stays inside the bin decides the outcome: it is rejected on
    /// collision or weight overflow, otherwise the returned copy of `item`
    /// carries that rotation and the pivot. `item` itself is never modified.
    ///
    /// The copy is rounded to the bin's precision first, so the stored extents
    /// are exactly the ones that were checked.
    pub fn try_put(&self, item: &Item, pivot: Vec3) -> Result<Item, PutRejection> {
        let bounds = self.dimensions();
        let mut candidate = item.clone();
        candidate.normalize_precision(self.precision);
        candidate.position = pivot;

        for rotation in RotationType::ALL {
            candidate.rotation = rotation;
            if !candidate.bounding_box().max.fits_within(&bounds) {
                continue;
            }

            if self.items.iter().any(|placed| intersects(placed, &candidate)) {
                return Err(PutRejection::Collision { rotation });
            }

            let total = self.items.iter().map(|i| i.weight).sum::<f64>() + candidate.weight;
            if round_to(total, self.precision) > self.max_weight {
                return Err(PutRejection::Overweight { rotation });
            }

            return Ok(candidate);
        }

        Err(PutRejection::OutOfBounds)
    }

    /// Places `item` at `pivot`, keeping the rejection reason on failure.
    pub fn place(&mut self, item: &Item, pivot: Vec3) -> Result<(), PutRejection> {
        let placed = self.try_put(item, pivot)?;
        self.items.push(placed);
        Ok(())
    }

    /// Places `item` at `pivot` if possible.
    ///
    /// On success the bin stores a copy of the item with its committed rotation
    /// and position and `true` is returned.
    pub fn put(&mut self, item: &Item, pivot: Vec3) -> bool {
        self.place(item, pivot).is_ok()
    }
}

impl Dimensional for Bin {
    fn dimensions(&self) -> Vec3 {
        Vec3::new(self.width, self.height, self.depth)
    }
}

impl Positioned for Bin {
    fn position(&self) -> Vec3 {
        self.offset()
    }
}

impl Weighted for Bin {
    fn weight(&self) -> f64 {
        self.total_weight()
    }
}

impl fmt::Display for Bin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}x{}x{}, max_weight: {}) vol({})",
            self.name,
            self.width,
            self.height,
            self.depth,
            self.max_weight,
            self.volume()
        )
    }
}
