//! # Tree Analyser
//!
//! Reader, writer and analyser for the binary files of a fixed-point ray
//! tracer: the BSP tree file, the scene (geometry database) file and the TGA
//! textures the scene refers to.
//!
//! All on-disk reals are Q16.16 fixed-point words; see the [`fixed16`] crate.
//!
//! ## Modules
//!
//! - [`util`] - Errors, geometry types, load options
//! - [`tree`] - In-memory BSP tree and leaf lists
//! - [`db`] - Triangle, material and texture tables
//! - [`format`] - Tree, scene and texture file codecs
//! - [`analysis`] - Depth histogram, primitive counts, bounding-box walk
//!
//! ## Example
//!
//! ```ignore
//! use tree_analyser::prelude::*;
//!
//! let options = LoadOptions::default();
//! let tree = load_tree("scene.tree", &options)?;
//! let view = TreeView::new(&tree);
//!
//! println!("{:?}", view.depth_histogram()?.counts());
//! for split in view.splits() {
//!     let split = split?;
//!     println!("node {} splits {} at {}", split.node, split.axis, split.position);
//! }
//! ```

pub mod util;
pub mod tree;
pub mod db;
pub mod format;
pub mod analysis;

pub use fixed16;
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::analysis::{
        splits, DepthHistogram, PrimitiveCounts, SplitGeometry, TreeConsumer, TreeStatistics, TreeSummary,
        TreeView, WireframeBuilder,
    };
    pub use crate::db::{GeometryDatabase, Material, Texture, Triangle};
    pub use crate::format::{load_scene, load_tree, write_tree, SceneSummary};
    pub use crate::tree::{NodeKind, TreeStore};
    pub use crate::util::{Aabb, Axis, Capacities, Error, LoadOptions, Result, TreeLayout};
    pub use fixed16::Fixed;
}
