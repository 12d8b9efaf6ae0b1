//! Wire layout constants for tree, scene and texture files.
//!
//! All files are sequences of little-endian 32-bit words. Real values are
//! Q16.16 fixed point (see the `fixed16` crate).

/// Size of one wire word in bytes.
pub const WORD_SIZE: usize = 4;

/// Canonical tree file revision: secondary arrays sized by header counts.
///
/// Revision 1 wrote the tree-list, split-list and node-list arrays at fixed
/// capacities; it is only read when requested through
/// [`TreeLayout::FixedCapacity`](crate::util::TreeLayout::FixedCapacity).
pub const TREE_FORMAT_VERSION: u32 = 2;

// ============================================================================
// Tree file
// ============================================================================

/// Bounding box words: location xyz, size xyz.
pub const BOX_WORDS: usize = 6;

/// Header words: split-list top, split-list count, tree-list count,
/// tree-matrix count, node-list count.
pub const TREE_HEADER_WORDS: usize = 5;

// Tree matrix row
pub const TREE_MATRIX_SPLIT_POSITION: usize = 0;
pub const TREE_MATRIX_AXIS_INDEX: usize = 1;
pub const TREE_MATRIX_LEFT_NODE: usize = 2;
pub const TREE_MATRIX_RIGHT_NODE: usize = 3;
pub const TREE_MATRIX_LEAF_NODE: usize = 4;
pub const TREE_MATRIX_SIZE: usize = 5;

// Tree list row
pub const TREE_LIST_NEXT_INDEX: usize = 0;
pub const TREE_LIST_EXTEND_LEFT: usize = 1;
pub const TREE_LIST_EXTEND_RIGHT: usize = 2;
pub const TREE_LIST_SPLIT_POSITION: usize = 3;
pub const TREE_LIST_SIZE: usize = 4;

// Split list row
pub const SPLIT_LIST_SPLIT_POSITION: usize = 0;
pub const SPLIT_LIST_NEXT_INDEX: usize = 1;
pub const SPLIT_LIST_LEFT_COUNT: usize = 2;
pub const SPLIT_LIST_RIGHT_COUNT: usize = 3;
pub const SPLIT_LIST_SIZE: usize = 4;

// Node list row
pub const NODE_LIST_PRIMITIVE_INDEX: usize = 0;
pub const NODE_LIST_NEXT_INDEX: usize = 1;
pub const NODE_LIST_SIZE: usize = 2;

// ============================================================================
// Scene file
// ============================================================================

/// Value every section terminator must hold.
pub const SENTINEL: i32 = 0;

/// Triangle count that explicitly ends the batch stream.
pub const END_OF_STREAM: i32 = -1;

/// Longest texture filename accepted.
pub const MAX_TEXTURE_NAME_LEN: usize = 4096;

/// Texture name passed through untouched.
pub const TERRAIN_TEXTURE: &str = "terrain.tga";

/// Length of names that get a directory separator inserted.
pub const SHORT_TEXTURE_NAME_LEN: usize = 25;

/// Byte offset the separator is inserted at.
pub const SHORT_TEXTURE_SEPARATOR_OFFSET: usize = 8;

/// Start of the relative path inside any other (exporter-prefixed) name.
pub const TEXTURE_PATH_OFFSET: usize = 12;

/// Length of the relative path inside an exporter-prefixed name.
pub const TEXTURE_PATH_LEN: usize = 36;

/// Words per vertex: position xyz, uv.
pub const VERTEX_WORDS: usize = 5;

/// Precomputed words in a triangle record that are not kept.
pub const TRIANGLE_RESERVED_WORDS: usize = 9;

/// Words of the cross-product derived vector.
pub const TRIANGLE_NORMAL_WORDS: usize = 3;

/// Words of the intersection coefficients.
pub const TRIANGLE_COEFFICIENT_WORDS: usize = 7;

/// Total words per triangle record.
pub const TRIANGLE_WORDS: usize = 3 * VERTEX_WORDS
    + 1
    + TRIANGLE_RESERVED_WORDS
    + TRIANGLE_NORMAL_WORDS
    + TRIANGLE_COEFFICIENT_WORDS;

// ============================================================================
// Texture file
// ============================================================================

pub const TGA_HEADER_SIZE: usize = 18;
pub const TGA_ID_LENGTH_OFFSET: usize = 0;
pub const TGA_IMAGE_TYPE_OFFSET: usize = 2;
pub const TGA_WIDTH_OFFSET: usize = 12;
pub const TGA_HEIGHT_OFFSET: usize = 14;
pub const TGA_DEPTH_OFFSET: usize = 16;

/// Uncompressed true-colour image type.
pub const TGA_TRUE_COLOUR: u8 = 2;
