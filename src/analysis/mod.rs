//! Analyses over a loaded tree: per-depth histogram, primitive counts,
//! shape summary and the bounding-box walk.

mod consumer;
mod stats;
mod walker;

pub use consumer::{TreeConsumer, TreeView};
pub use stats::{DepthHistogram, PrimitiveCounts, TreeStatistics, TreeSummary};
pub use walker::{splits, LineVertex, SplitGeometry, SplitIter, WireframeBuilder};
