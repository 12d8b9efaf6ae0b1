//! Tree file reader and writer.
//!
//! Layout (all words little-endian `i32`):
//!
//! ```text
//! box          6 words   location xyz, size xyz (fixed point)
//! header       5 words   split-list top, split-list count, tree-list count,
//!                        tree-matrix count, node-list count
//! tree matrix  5 words × tree-matrix count
//! tree list    4 words × rows
//! split list   4 words × rows
//! node list    2 words × rows
//! ```
//!
//! With [`TreeLayout::Counted`] the last three arrays hold exactly the header
//! count of rows. With [`TreeLayout::FixedCapacity`] they are padded to a fixed
//! capacity and the header count gives the used prefix.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use fixed16::Fixed;
use tracing::{debug, info};

use super::layout::*;
use super::stream::{Source, WordReader, WordWriter};
use crate::tree::{
    BoxRecord, MatrixRow, NodeListRow, SplitListRow, TreeHeader, TreeListRow, TreeStore,
};
use crate::util::{Error, LoadOptions, Result, Stage, TreeLayout};

/// Rows preallocated before trusting a header count.
const MAX_PREALLOC_ROWS: usize = 1 << 16;

/// Load a tree file.
pub fn load_tree(path: impl AsRef<Path>, options: &LoadOptions) -> Result<TreeStore> {
    load_tree_impl(path.as_ref(), options)
}

#[tracing::instrument(skip_all, fields(path = %path.display()))]
fn load_tree_impl(path: &Path, options: &LoadOptions) -> Result<TreeStore> {
    let source = Source::open(path, options.use_mmap).map_err(|e| e.at(path, Stage::Open))?;
    let tree = read_tree(source, path, options.tree_layout)?;
    info!(
        nodes = tree.num_nodes(),
        leaf_entries = tree.node_list().len(),
        "loaded tree {}",
        path.display()
    );
    Ok(tree)
}

/// Read a tree from any byte stream. `name` labels errors.
pub fn read_tree<R: Read>(input: R, name: &Path, layout: TreeLayout) -> Result<TreeStore> {
    let mut r = WordReader::new(input);

    let bounds = read_box(&mut r).map_err(|e| e.at(name, Stage::BoundingBox))?;
    let header = read_header(&mut r).map_err(|e| e.at(name, Stage::TreeHeader))?;
    debug!(?header, "tree header");

    let counts = RowCounts::from_header(&header).map_err(|e| e.at(name, Stage::TreeHeader))?;
    let (tree_cap, split_cap, node_cap) = match layout {
        TreeLayout::Counted => (counts.tree_list, counts.split_list, counts.node_list),
        TreeLayout::FixedCapacity { tree_list, split_list, node_list } => {
            (tree_list, split_list, node_list)
        }
    };

    let matrix = read_rows(&mut r, counts.matrix, counts.matrix, |w: [i32; TREE_MATRIX_SIZE]| MatrixRow {
        split_position: Fixed::from_raw(w[TREE_MATRIX_SPLIT_POSITION]),
        axis: w[TREE_MATRIX_AXIS_INDEX],
        left: w[TREE_MATRIX_LEFT_NODE],
        right: w[TREE_MATRIX_RIGHT_NODE],
        leaf: w[TREE_MATRIX_LEAF_NODE],
    })
    .map_err(|e| e.at(name, Stage::TreeMatrix))?;

    let tree_list = read_rows(&mut r, counts.tree_list, tree_cap, |w: [i32; TREE_LIST_SIZE]| TreeListRow {
        next: w[TREE_LIST_NEXT_INDEX],
        extend_left: w[TREE_LIST_EXTEND_LEFT],
        extend_right: w[TREE_LIST_EXTEND_RIGHT],
        split_position: Fixed::from_raw(w[TREE_LIST_SPLIT_POSITION]),
    })
    .map_err(|e| e.at(name, Stage::TreeList))?;

    let split_list = read_rows(&mut r, counts.split_list, split_cap, |w: [i32; SPLIT_LIST_SIZE]| SplitListRow {
        split_position: Fixed::from_raw(w[SPLIT_LIST_SPLIT_POSITION]),
        next: w[SPLIT_LIST_NEXT_INDEX],
        left_count: w[SPLIT_LIST_LEFT_COUNT],
        right_count: w[SPLIT_LIST_RIGHT_COUNT],
    })
    .map_err(|e| e.at(name, Stage::SplitList))?;

    let node_list = read_rows(&mut r, counts.node_list, node_cap, |w: [i32; NODE_LIST_SIZE]| NodeListRow {
        primitive: w[NODE_LIST_PRIMITIVE_INDEX],
        next: w[NODE_LIST_NEXT_INDEX],
    })
    .map_err(|e| e.at(name, Stage::NodeList))?;

    let tree = TreeStore { bounds, header, matrix, tree_list, split_list, node_list };
    tree.validate().map_err(|e| e.at(name, Stage::Validate))?;
    Ok(tree)
}

fn read_box<R: Read>(r: &mut WordReader<R>) -> Result<BoxRecord> {
    let words: [i32; BOX_WORDS] = r.read_words()?;
    Ok(BoxRecord(words.map(Fixed::from_raw)))
}

fn read_header<R: Read>(r: &mut WordReader<R>) -> Result<TreeHeader> {
    let [split_list_top, split_list_count, tree_list_count, tree_matrix_count, node_list_count] =
        r.read_words::<TREE_HEADER_WORDS>()?;
    Ok(TreeHeader {
        split_list_top,
        split_list_count,
        tree_list_count,
        tree_matrix_count,
        node_list_count,
    })
}

struct RowCounts {
    matrix: usize,
    tree_list: usize,
    split_list: usize,
    node_list: usize,
}

impl RowCounts {
    fn from_header(h: &TreeHeader) -> Result<Self> {
        let count = |what: &str, v: i32| {
            usize::try_from(v).map_err(|_| Error::invalid(format!("negative {what} count {v}")))
        };
        Ok(Self {
            matrix: count("tree matrix", h.tree_matrix_count)?,
            tree_list: count("tree list", h.tree_list_count)?,
            split_list: count("split list", h.split_list_count)?,
            node_list: count("node list", h.node_list_count)?,
        })
    }
}

/// Read `stored` rows of `N` words, keeping the first `used`.
fn read_rows<R: Read, T, const N: usize>(
    r: &mut WordReader<R>,
    used: usize,
    stored: usize,
    make: impl Fn([i32; N]) -> T,
) -> Result<Vec<T>> {
    if used > stored {
        return Err(Error::invalid(format!(
            "header count {used} exceeds fixed capacity {stored}"
        )));
    }
    let mut rows = Vec::with_capacity(used.min(MAX_PREALLOC_ROWS));
    for _ in 0..used {
        rows.push(make(r.read_words::<N>()?));
    }
    let padding = (stored - used)
        .checked_mul(N)
        .ok_or_else(|| Error::invalid(format!("fixed capacity {stored} is too large")))?;
    r.skip_words(padding)?;
    Ok(rows)
}

// ============================================================================
// Writer
// ============================================================================

/// Write a tree file in the canonical (counted) layout.
pub fn write_tree(path: impl AsRef<Path>, tree: &TreeStore) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut out = BufWriter::new(file);
    write_tree_to(&mut out, tree, TreeLayout::Counted)?;
    out.flush()?;
    Ok(())
}

/// Write a tree to any byte sink in the given layout.
///
/// Fixed-capacity layouts pad with zero rows and fail if an array does not fit.
pub fn write_tree_to<W: Write>(out: W, tree: &TreeStore, layout: TreeLayout) -> Result<()> {
    let mut w = WordWriter::new(out);

    for v in tree.bounds.0 {
        w.write_fixed(v)?;
    }

    let h = &tree.header;
    w.write_words(&[
        h.split_list_top,
        h.split_list_count,
        h.tree_list_count,
        h.tree_matrix_count,
        h.node_list_count,
    ])?;

    let (tree_cap, split_cap, node_cap) = match layout {
        TreeLayout::Counted => (tree.tree_list.len(), tree.split_list.len(), tree.node_list.len()),
        TreeLayout::FixedCapacity { tree_list, split_list, node_list } => {
            (tree_list, split_list, node_list)
        }
    };

    for row in &tree.matrix {
        let mut words = [0i32; TREE_MATRIX_SIZE];
        words[TREE_MATRIX_SPLIT_POSITION] = row.split_position.raw();
        words[TREE_MATRIX_AXIS_INDEX] = row.axis;
        words[TREE_MATRIX_LEFT_NODE] = row.left;
        words[TREE_MATRIX_RIGHT_NODE] = row.right;
        words[TREE_MATRIX_LEAF_NODE] = row.leaf;
        w.write_words(&words)?;
    }

    write_rows(&mut w, &tree.tree_list, tree_cap, |row| {
        let mut words = [0i32; TREE_LIST_SIZE];
        words[TREE_LIST_NEXT_INDEX] = row.next;
        words[TREE_LIST_EXTEND_LEFT] = row.extend_left;
        words[TREE_LIST_EXTEND_RIGHT] = row.extend_right;
        words[TREE_LIST_SPLIT_POSITION] = row.split_position.raw();
        words
    })?;

    write_rows(&mut w, &tree.split_list, split_cap, |row| {
        let mut words = [0i32; SPLIT_LIST_SIZE];
        words[SPLIT_LIST_SPLIT_POSITION] = row.split_position.raw();
        words[SPLIT_LIST_NEXT_INDEX] = row.next;
        words[SPLIT_LIST_LEFT_COUNT] = row.left_count;
        words[SPLIT_LIST_RIGHT_COUNT] = row.right_count;
        words
    })?;

    write_rows(&mut w, &tree.node_list, node_cap, |row| {
        let mut words = [0i32; NODE_LIST_SIZE];
        words[NODE_LIST_PRIMITIVE_INDEX] = row.primitive;
        words[NODE_LIST_NEXT_INDEX] = row.next;
        words
    })?;

    w.flush()
}

fn write_rows<W: Write, T, const N: usize>(
    w: &mut WordWriter<W>,
    rows: &[T],
    stored: usize,
    words: impl Fn(&T) -> [i32; N],
) -> Result<()> {
    if rows.len() > stored {
        return Err(Error::invalid(format!(
            "{} rows do not fit fixed capacity {stored}",
            rows.len()
        )));
    }
    for row in rows {
        w.write_words(&words(row))?;
    }
    for _ in rows.len()..stored {
        w.write_words(&[0; N])?;
    }
    Ok(())
}
