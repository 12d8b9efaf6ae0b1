//! Load options.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{Error, Result};

/// Default triangle ceiling of the ray tracer database.
pub const MAX_TRIANGLES: usize = 2_000_000;
/// Default material ceiling.
pub const MAX_MATERIALS: usize = 500;
/// Default texture ceiling.
pub const MAX_TEXTURES: usize = 100;
/// Bounding boxes the tree builder can allocate.
pub const MAX_BOUNDING_BOXES: usize = 2 * MAX_TRIANGLES;
/// Default ceiling for recursive tree walks.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Table ceilings for the geometry database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capacities {
    pub triangles: usize,
    pub materials: usize,
    pub textures: usize,
}

impl Default for Capacities {
    fn default() -> Self {
        Self {
            triangles: MAX_TRIANGLES,
            materials: MAX_MATERIALS,
            textures: MAX_TEXTURES,
        }
    }
}

/// How the secondary arrays of a tree file are sized.
///
/// Two revisions of the tree writer exist. The loader reads whichever one it
/// is told to and never guesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TreeLayout {
    /// Tree-list, split-list and node-list rows are sized by the header counts.
    #[default]
    Counted,
    /// Rows are written at fixed capacities; header counts give the used prefix.
    FixedCapacity {
        tree_list: usize,
        split_list: usize,
        node_list: usize,
    },
}

impl TreeLayout {
    /// Fixed-capacity layout with the ray tracer's compiled-in sizes.
    pub fn fixed_default() -> Self {
        Self::FixedCapacity {
            tree_list: MAX_BOUNDING_BOXES,
            split_list: MAX_BOUNDING_BOXES,
            node_list: MAX_BOUNDING_BOXES,
        }
    }
}

/// Options controlling tree and scene loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub capacities: Capacities,
    pub tree_layout: TreeLayout,
    /// Directory texture paths are resolved against. Defaults to the
    /// directory holding the scene file.
    pub texture_root: Option<PathBuf>,
    /// Memory-map input files (needs the `mmap` feature).
    pub use_mmap: bool,
    /// Roll the database back if a scene load fails part way through.
    pub atomic_scene: bool,
    /// Depth ceiling for recursive tree walks, applied through
    /// [`TreeView::with_options`](crate::analysis::TreeView::with_options).
    pub max_depth: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            capacities: Capacities::default(),
            tree_layout: TreeLayout::default(),
            texture_root: None,
            use_mmap: true,
            atomic_scene: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl LoadOptions {
    /// Read options from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        serde_json::from_str(&text)
            .map_err(|e| Error::invalid(format!("{}: {}", path.display(), e)))
    }

    pub fn with_capacities(mut self, capacities: Capacities) -> Self {
        self.capacities = capacities;
        self
    }

    pub fn with_tree_layout(mut self, layout: TreeLayout) -> Self {
        self.tree_layout = layout;
        self
    }

    pub fn with_texture_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.texture_root = Some(root.into());
        self
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn with_atomic_scene(mut self, atomic: bool) -> Self {
        self.atomic_scene = atomic;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = LoadOptions::default();
        assert_eq!(opts.capacities.triangles, 2_000_000);
        assert_eq!(opts.capacities.materials, 500);
        assert_eq!(opts.capacities.textures, 100);
        assert_eq!(opts.tree_layout, TreeLayout::Counted);
        assert!(!opts.atomic_scene);
    }

    #[test]
    fn test_partial_json() {
        let opts: LoadOptions =
            serde_json::from_str(r#"{ "capacities": { "textures": 8 }, "atomic_scene": true }"#)
                .unwrap();
        assert_eq!(opts.capacities.textures, 8);
        assert_eq!(opts.capacities.materials, 500);
        assert!(opts.atomic_scene);
        assert_eq!(opts.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn test_layout_json() {
        let layout: TreeLayout = serde_json::from_str(
            r#"{ "FixedCapacity": { "tree_list": 4, "split_list": 4, "node_list": 8 } }"#,
        )
        .unwrap();
        assert_eq!(
            layout,
            TreeLayout::FixedCapacity { tree_list: 4, split_list: 4, node_list: 8 }
        );
    }
}
