//! Utility types shared by the loader and the analyses.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - [`Aabb`], [`Axis`] - Geometry types over glam
//! - [`LoadOptions`] - Capacities, tree revision and loader switches

mod error;
mod math;
mod options;

pub use error::*;
pub use math::*;
pub use options::*;
