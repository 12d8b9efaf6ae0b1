//! Error types for the tree analyser.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which table a capacity check guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityKind {
    Triangles,
    Materials,
    Textures,
}

impl fmt::Display for CapacityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Triangles => "triangles",
            Self::Materials => "materials",
            Self::Textures => "textures",
        })
    }
}

/// Section of a tree or scene file being processed when a load failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Open,
    BoundingBox,
    TreeHeader,
    TreeMatrix,
    TreeList,
    SplitList,
    NodeList,
    Validate,
    SceneHeader,
    Textures,
    TextureSentinel,
    Materials,
    MaterialSentinel,
    /// Triangle batch with its zero-based ordinal in the file.
    TriangleBatch(usize),
    BatchSentinel(usize),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => f.write_str("opening file"),
            Self::BoundingBox => f.write_str("scene bounding box"),
            Self::TreeHeader => f.write_str("tree header"),
            Self::TreeMatrix => f.write_str("tree matrix"),
            Self::TreeList => f.write_str("tree list"),
            Self::SplitList => f.write_str("split list"),
            Self::NodeList => f.write_str("node list"),
            Self::Validate => f.write_str("tree validation"),
            Self::SceneHeader => f.write_str("scene header"),
            Self::Textures => f.write_str("texture block"),
            Self::TextureSentinel => f.write_str("texture block terminator"),
            Self::Materials => f.write_str("material block"),
            Self::MaterialSentinel => f.write_str("material block terminator"),
            Self::TriangleBatch(n) => write!(f, "triangle batch {n}"),
            Self::BatchSentinel(n) => write!(f, "triangle batch {n} terminator"),
        }
    }
}

/// Main error type for loading and analysing trees.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Input ended in the middle of a record
    #[error("Unexpected end of input at byte {0}")]
    UnexpectedEof(u64),

    /// Invalid data structure in file
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// Adding a block would exceed a table ceiling
    #[error("Too many {kind}: {requested} requested, limit {limit}")]
    CapacityExceeded {
        kind: CapacityKind,
        requested: usize,
        limit: usize,
    },

    /// A structural zero-check did not hold
    #[error("Sentinel mismatch: expected {expected}, found {actual}")]
    SentinelMismatch { expected: i32, actual: i32 },

    /// Tree node references a child outside the tree matrix
    #[error("Node {node} references child {child} (node count: {count})")]
    ChildOutOfBounds { node: usize, child: i64, count: usize },

    /// Tree node uses an axis other than x, y or z
    #[error("Node {node} has invalid split axis {axis}")]
    InvalidAxis { node: usize, axis: i32 },

    /// Node reached more than once from the root
    #[error("Node {0} is reachable from more than one parent")]
    SharedNode(usize),

    /// Leaf list index outside the node list
    #[error("Leaf list index {index} out of bounds (count: {count})")]
    LeafIndexOutOfBounds { index: i64, count: usize },

    /// Leaf list does not terminate
    #[error("Leaf list starting at {0} does not terminate")]
    CyclicLeafList(usize),

    /// Recursive walk went deeper than the configured ceiling
    #[error("Tree depth exceeds limit of {0}")]
    DepthExceeded(usize),

    /// Failure wrapped with the file and load stage it happened in
    #[error("{}: {stage}: {source}", path.display())]
    Stage {
        path: PathBuf,
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Attach file and stage context. Already-wrapped errors are left as is.
    pub fn at(self, path: impl Into<PathBuf>, stage: Stage) -> Self {
        match self {
            Self::Stage { .. } => self,
            other => Self::Stage {
                path: path.into(),
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The underlying cause with any stage context removed.
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Stage the error was raised in, if known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Errors from decoding a texture file.
///
/// These never abort a scene load: the loader logs them and leaves the
/// texture slot empty.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("Texture not found: {0}")]
    NotFound(PathBuf),

    #[error("Texture header truncated ({0} bytes)")]
    TruncatedHeader(usize),

    #[error("Unsupported texture image type {0} (expected uncompressed true colour)")]
    UnsupportedImageType(u8),

    #[error("Unsupported texture depth of {0} bits per pixel")]
    UnsupportedDepth(u8),

    #[error("Texture has zero size ({width}x{height})")]
    Empty { width: u16, height: u16 },

    #[error("Texture pixel data truncated: expected {expected} bytes, found {actual}")]
    TruncatedPixels { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for tree analyser operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::CapacityExceeded {
            kind: CapacityKind::Textures,
            requested: 110,
            limit: 100,
        };
        assert_eq!(e.to_string(), "Too many textures: 110 requested, limit 100");

        let e = Error::SentinelMismatch { expected: 0, actual: 5 };
        assert!(e.to_string().contains("expected 0"));
        assert!(e.to_string().contains("found 5"));
    }

    #[test]
    fn test_stage_context() {
        let e = Error::SentinelMismatch { expected: 0, actual: 5 }
            .at("scene.bin", Stage::BatchSentinel(2));
        let msg = e.to_string();
        assert!(msg.contains("scene.bin"));
        assert!(msg.contains("triangle batch 2 terminator"));
        assert!(msg.contains("found 5"));
        assert_eq!(e.stage(), Some(Stage::BatchSentinel(2)));
        assert!(matches!(e.root_cause(), Error::SentinelMismatch { actual: 5, .. }));

        // Re-wrapping keeps the innermost stage
        let e = e.at("other.bin", Stage::Open);
        assert_eq!(e.stage(), Some(Stage::BatchSentinel(2)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
