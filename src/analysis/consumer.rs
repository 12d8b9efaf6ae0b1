//! Consumer interface for tree analyses.
//!
//! A viewer or report implements [`TreeConsumer`] and overrides only the
//! callbacks it cares about; [`TreeView::feed`] drives all of them.

use tracing::debug;

use super::stats::{DepthHistogram, PrimitiveCounts, TreeStatistics, TreeSummary};
use super::walker::{SplitGeometry, SplitIter};
use crate::tree::TreeStore;
use crate::util::{Aabb, LoadOptions, Result, DEFAULT_MAX_DEPTH};

/// Receiver of analysis results. Every method defaults to doing nothing.
pub trait TreeConsumer {
    fn bounds(&mut self, _bounds: &Aabb) {}
    fn depth_histogram(&mut self, _histogram: &DepthHistogram) {}
    fn primitive_counts(&mut self, _counts: &PrimitiveCounts) {}
    fn summary(&mut self, _summary: &TreeSummary) {}
    fn split(&mut self, _split: &SplitGeometry) {}
}

/// Read-only analysis handle over a loaded tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeView<'a> {
    tree: &'a TreeStore,
    max_depth: usize,
}

impl<'a> TreeView<'a> {
    pub fn new(tree: &'a TreeStore) -> Self {
        Self { tree, max_depth: DEFAULT_MAX_DEPTH }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// View using the depth ceiling from load options.
    pub fn with_options(tree: &'a TreeStore, options: &LoadOptions) -> Self {
        Self::new(tree).with_max_depth(options.max_depth)
    }

    #[inline]
    pub fn tree(&self) -> &'a TreeStore {
        self.tree
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.tree.bounds()
    }

    fn stats(&self) -> TreeStatistics<'a> {
        TreeStatistics::new(self.tree).with_max_depth(self.max_depth)
    }

    pub fn depth_histogram(&self) -> Result<DepthHistogram> {
        self.stats().depth_histogram()
    }

    pub fn primitive_counts(&self) -> Result<PrimitiveCounts> {
        self.stats().primitive_counts()
    }

    pub fn summary(&self) -> Result<TreeSummary> {
        self.stats().summary()
    }

    pub fn splits(&self) -> SplitIter<'a> {
        SplitIter::new(self.tree).with_max_depth(self.max_depth)
    }

    /// Run every analysis and hand the results to `consumer`.
    ///
    /// Stops at the first failure; callbacks already made are not undone.
    #[tracing::instrument(skip_all, fields(nodes = self.tree.num_nodes()))]
    pub fn feed(&self, consumer: &mut dyn TreeConsumer) -> Result<()> {
        consumer.bounds(&self.bounds());
        consumer.depth_histogram(&self.depth_histogram()?);
        consumer.primitive_counts(&self.primitive_counts()?);
        consumer.summary(&self.summary()?);

        let mut n = 0usize;
        for split in self.splits() {
            consumer.split(&split?);
            n += 1;
        }
        debug!("fed {} splits", n);
        Ok(())
    }
}
