//! Binary file formats of the fixed-point ray tracer.
//!
//! - [`tree_file`] - BSP tree produced by the tree builder
//! - [`scene_file`] - Textures, materials and triangle batches
//! - [`texture`] - Uncompressed TGA textures
//!
//! Loading is one-shot: read the tree, then optionally one or more scenes into
//! the same [`GeometryDatabase`](crate::db::GeometryDatabase). Nothing here is
//! reentrant against a shared database; callers serialize loads.

pub mod layout;
pub mod scene_file;
pub mod stream;
pub mod texture;
pub mod tree_file;

pub use scene_file::{load_scene, read_scene, SceneFile, SceneSummary, SceneWriter, TriangleBatch};
pub use texture::{decode_texture, encode_texture, read_texture};
pub use tree_file::{load_tree, read_tree, write_tree, write_tree_to};
