//! Greedy 3D bin packing engine.
//!
//! Items are placed one by one into bins, each at the first candidate pivot and
//! rotation that respects the bin boundary, the already placed items and the
//! bin's weight limit. Once placed, an item never moves.

pub mod api;
pub mod config;
pub mod geometry;
pub mod model;
pub mod packer;
pub mod types;

pub use model::{Bin, Item, PutRejection, ValidationError};
pub use packer::{PackEvent, PackOptions, PackSummary, Packer};
pub use types::{RotationType, Vec3};
