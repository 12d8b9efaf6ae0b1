//! Scene file reader and writer.
//!
//! Layout (all words little-endian `i32`, reals in fixed point):
//!
//! ```text
//! header      material count, texture count
//! textures    per texture: name length, name bytes
//!             0
//! materials   per material: material index, texture index (negative = none)
//!             0
//! batches     triangle count            (-1 or end of input ends the stream)
//!             triangle records × count  (35 words each)
//!             material index
//!             0
//! ```
//!
//! A triangle record is three vertices of (x, y, z, u, v), the dominant axis
//! (plain integer 0..3), nine reserved words that are skipped, the
//! cross-product vector (3 words) and seven intersection coefficients.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::layout::*;
use super::stream::{Source, WordReader, WordWriter};
use super::texture::read_texture;
use crate::db::{GeometryDatabase, IntersectCoefficients, Material, Texture, Triangle, Vertex};
use crate::util::{Axis, CapacityKind, DVec2, DVec3, Error, LoadOptions, Result, Stage};

/// Triangles preallocated per batch before trusting the count.
const MAX_PREALLOC_TRIANGLES: usize = 1 << 14;

/// What a scene load added to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SceneSummary {
    /// Texture slots added, including ones that failed to load.
    pub texture_slots: usize,
    pub textures_loaded: usize,
    pub materials: usize,
    pub triangles: usize,
    pub batches: usize,
    /// The stream ended with the explicit end marker rather than end of input.
    pub explicit_end: bool,
}

/// Load a scene file, appending to `db`.
///
/// Loads append: calling this twice adds both scenes. On failure the tables
/// keep whatever earlier sections committed, unless
/// [`LoadOptions::atomic_scene`] is set, in which case the database is
/// restored to its state before the call.
pub fn load_scene(
    path: impl AsRef<Path>,
    db: &mut GeometryDatabase,
    options: &LoadOptions,
) -> Result<SceneSummary> {
    load_scene_impl(path.as_ref(), db, options)
}

#[tracing::instrument(skip_all, fields(path = %path.display()))]
fn load_scene_impl(path: &Path, db: &mut GeometryDatabase, options: &LoadOptions) -> Result<SceneSummary> {
    let source = Source::open(path, options.use_mmap).map_err(|e| e.at(path, Stage::Open))?;
    let root = match &options.texture_root {
        Some(root) => root.clone(),
        None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    let summary = read_scene(source, path, db, &root, options.atomic_scene)?;
    info!(
        textures = summary.texture_slots,
        materials = summary.materials,
        triangles = summary.triangles,
        batches = summary.batches,
        "loaded scene {}",
        path.display()
    );
    Ok(summary)
}

/// Read a scene from any byte stream. `name` labels errors and texture
/// paths are resolved against `texture_root`.
pub fn read_scene<R: Read>(
    input: R,
    name: &Path,
    db: &mut GeometryDatabase,
    texture_root: &Path,
    atomic: bool,
) -> Result<SceneSummary> {
    let checkpoint = db.checkpoint();
    let mut loader = SceneLoader {
        r: WordReader::new(input),
        name,
        texture_root,
        summary: SceneSummary::default(),
    };
    let result = loader.run(db);
    if result.is_err() && atomic {
        warn!("rolling back partial scene load of {}", name.display());
        db.rollback(checkpoint);
    }
    result.map(|()| loader.summary)
}

struct SceneLoader<'a, R> {
    r: WordReader<R>,
    name: &'a Path,
    texture_root: &'a Path,
    summary: SceneSummary,
}

impl<'a, R: Read> SceneLoader<'a, R> {
    fn at(&self, stage: Stage) -> impl FnOnce(Error) -> Error + 'a {
        let name = self.name;
        move |e| e.at(name, stage)
    }

    fn run(&mut self, db: &mut GeometryDatabase) -> Result<()> {
        let (materials, textures) = self.read_header(db).map_err(self.at(Stage::SceneHeader))?;

        self.read_textures(db, textures).map_err(self.at(Stage::Textures))?;
        self.r.expect_sentinel().map_err(self.at(Stage::TextureSentinel))?;

        self.read_materials(db, materials).map_err(self.at(Stage::Materials))?;
        self.r.expect_sentinel().map_err(self.at(Stage::MaterialSentinel))?;

        let mut batch = 0;
        while self.read_batch(db, batch).map_err(self.at(Stage::TriangleBatch(batch)))? {
            self.r.expect_sentinel().map_err(self.at(Stage::BatchSentinel(batch)))?;
            batch += 1;
        }
        Ok(())
    }

    /// Read the counts and check both tables have room before touching them.
    fn read_header(&mut self, db: &GeometryDatabase) -> Result<(usize, usize)> {
        let materials = self.r.read_count("material")?;
        let textures = self.r.read_count("texture")?;
        db.check_capacity(CapacityKind::Textures, textures)?;
        db.check_capacity(CapacityKind::Materials, materials)?;
        debug!(materials, textures, "scene header");
        Ok((materials, textures))
    }

    fn read_textures(&mut self, db: &mut GeometryDatabase, count: usize) -> Result<()> {
        for _ in 0..count {
            let len = self.r.read_count("texture name length")?;
            if len > MAX_TEXTURE_NAME_LEN {
                return Err(Error::invalid(format!("texture name of {len} bytes")));
            }
            let raw = self.r.read_bytes(len)?;
            let texture = match normalize_texture_name(&raw) {
                Ok(relative) => self.load_texture(db, &relative),
                Err(e) => {
                    warn!("texture slot {} left empty: {}", db.num_textures(), e);
                    None
                }
            };
            db.push_texture(texture)?;
            self.summary.texture_slots += 1;
        }
        Ok(())
    }

    fn load_texture(&mut self, db: &GeometryDatabase, relative: &str) -> Option<Texture> {
        let path = self.texture_root.join(relative);
        match read_texture(&path, db.next_texture_offset()) {
            Ok(t) => {
                debug!(path = %path.display(), width = t.width, height = t.height, "texture");
                self.summary.textures_loaded += 1;
                Some(t)
            }
            Err(e) => {
                warn!("texture {} not loaded: {}", path.display(), e);
                None
            }
        }
    }

    fn read_materials(&mut self, db: &mut GeometryDatabase, count: usize) -> Result<()> {
        for _ in 0..count {
            let [declared, texture] = self.r.read_words::<2>()?;
            let texture = usize::try_from(texture).ok();
            if let Some(t) = texture {
                if t >= db.num_textures() {
                    warn!(material = declared, texture = t, "material references a texture slot that does not exist");
                }
            }
            let slot = db.push_material(Material::with_texture(declared, texture))?;
            if declared as i64 != slot as i64 {
                warn!(declared, slot, "material index differs from its table slot");
            }
            self.summary.materials += 1;
        }
        Ok(())
    }

    /// Read one batch up to (not including) its terminator.
    ///
    /// Returns `false` when the stream has ended.
    fn read_batch(&mut self, db: &mut GeometryDatabase, batch: usize) -> Result<bool> {
        let count = match self.r.try_read_word()? {
            None => return Ok(false),
            Some(END_OF_STREAM) => {
                self.summary.explicit_end = true;
                return Ok(false);
            }
            Some(n) if n < 0 => {
                return Err(Error::invalid(format!("negative triangle count {n}")));
            }
            Some(n) => n as usize,
        };
        db.check_capacity(CapacityKind::Triangles, count)?;

        let mut triangles = Vec::with_capacity(count.min(MAX_PREALLOC_TRIANGLES));
        for _ in 0..count {
            triangles.push(read_triangle(&mut self.r)?);
        }

        let material = self.r.read_word()?;
        let material = usize::try_from(material)
            .map_err(|_| Error::invalid(format!("negative batch material index {material}")))?;
        if material >= db.num_materials() {
            warn!(batch, material, "batch material index past the material table");
        }

        let range = db.push_triangles(triangles)?;
        db.assign_material(range, material);
        debug!(batch, count, material, "triangle batch");

        self.summary.triangles += count;
        self.summary.batches += 1;
        Ok(true)
    }
}

/// Turn a texture name from the scene file into a relative path.
///
/// `terrain.tga` is kept as is. 25-byte names get a separator inserted after
/// the 8-byte directory part. Any other name carries an exporter prefix: the
/// path is the 36 bytes starting at offset 12, with trailing NUL padding
/// dropped. Bytes that are not UTF-8 are replaced, so such a name resolves to
/// a file that will not be found.
///
/// Fails only for names too short to hold the prefixed path. The loader
/// treats that like a missing texture.
pub fn normalize_texture_name(raw: &[u8]) -> Result<String> {
    if raw == TERRAIN_TEXTURE.as_bytes() {
        return Ok(TERRAIN_TEXTURE.to_string());
    }

    if raw.len() == SHORT_TEXTURE_NAME_LEN {
        let (dir, file) = raw.split_at(SHORT_TEXTURE_SEPARATOR_OFFSET);
        let mut name = Vec::with_capacity(raw.len() + 1);
        name.extend_from_slice(dir);
        name.push(b'/');
        name.extend_from_slice(file);
        return Ok(String::from_utf8_lossy(&name).into_owned());
    }

    if raw.len() <= TEXTURE_PATH_OFFSET {
        return Err(Error::invalid(format!(
            "texture name {:?} too short to hold a path",
            String::from_utf8_lossy(raw)
        )));
    }
    let end = raw.len().min(TEXTURE_PATH_OFFSET + TEXTURE_PATH_LEN);
    let path = &raw[TEXTURE_PATH_OFFSET..end];
    let used = path.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    Ok(String::from_utf8_lossy(&path[..used]).into_owned())
}

fn read_triangle<R: Read>(r: &mut WordReader<R>) -> Result<Triangle> {
    let mut vertices = [Vertex::default(); 3];
    for v in &mut vertices {
        let w = r.read_words::<VERTEX_WORDS>()?.map(fixed16::to_real);
        v.position = DVec3::new(w[0], w[1], w[2]);
        v.uv = DVec2::new(w[3], w[4]);
    }

    let axis = r.read_word()?;
    let dominant_axis =
        Axis::from_index(axis).ok_or_else(|| Error::invalid(format!("invalid dominant axis {axis}")))?;

    r.skip_words(TRIANGLE_RESERVED_WORDS)?;

    let n = r.read_words::<TRIANGLE_NORMAL_WORDS>()?.map(fixed16::to_real);
    let c = r.read_words::<TRIANGLE_COEFFICIENT_WORDS>()?.map(fixed16::to_real);

    let [a, b, c_vertex] = vertices;
    Ok(Triangle {
        a,
        b,
        c: c_vertex,
        dominant_axis,
        normal: DVec3::new(n[0], n[1], n[2]),
        coefficients: IntersectCoefficients::from_array(c),
        material: 0,
    })
}

// ============================================================================
// Writer
// ============================================================================

/// Streaming scene writer. Sections must be written in file order.
pub struct SceneWriter<W: Write> {
    w: WordWriter<W>,
}

impl<W: Write> SceneWriter<W> {
    pub fn new(out: W) -> Self {
        Self { w: WordWriter::new(out) }
    }

    pub fn header(&mut self, materials: usize, textures: usize) -> Result<()> {
        self.w.write_count(materials)?;
        self.w.write_count(textures)
    }

    /// Write a texture name exactly as given.
    pub fn texture_name(&mut self, name: &[u8]) -> Result<()> {
        self.w.write_count(name.len())?;
        self.w.write_bytes(name)
    }

    /// Write a section terminator. Anything but [`SENTINEL`] makes a
    /// corrupt file.
    pub fn terminator(&mut self, value: i32) -> Result<()> {
        self.w.write_word(value)
    }

    pub fn material(&mut self, index: i32, texture: Option<usize>) -> Result<()> {
        self.w.write_word(index)?;
        match texture {
            Some(t) => self.w.write_count(t),
            None => self.w.write_word(-1),
        }
    }

    /// Write a batch (count, records, material) without its terminator.
    pub fn batch(&mut self, triangles: &[Triangle], material: usize) -> Result<()> {
        self.w.write_count(triangles.len())?;
        for t in triangles {
            self.triangle(t)?;
        }
        self.w.write_count(material)
    }

    fn triangle(&mut self, t: &Triangle) -> Result<()> {
        for v in t.vertices() {
            for x in [v.position.x, v.position.y, v.position.z, v.uv.x, v.uv.y] {
                self.w.write_real(x)?;
            }
        }
        self.w.write_word(t.dominant_axis.index() as i32)?;
        self.w.write_words(&[0; TRIANGLE_RESERVED_WORDS])?;
        for x in t.normal.to_array() {
            self.w.write_real(x)?;
        }
        for x in t.coefficients.to_array() {
            self.w.write_real(x)?;
        }
        Ok(())
    }

    pub fn end_of_stream(&mut self) -> Result<()> {
        self.w.write_word(END_OF_STREAM)
    }

    pub fn finish(mut self) -> Result<W> {
        self.w.flush()?;
        Ok(self.w.into_inner())
    }
}

/// A triangle batch sharing one material.
#[derive(Debug, Clone, PartialEq)]
pub struct TriangleBatch {
    pub triangles: Vec<Triangle>,
    pub material: usize,
}

/// Whole scene description for writing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneFile {
    /// Texture names as stored in the file (before normalization).
    pub textures: Vec<String>,
    /// (material index, texture slot) pairs.
    pub materials: Vec<(i32, Option<usize>)>,
    pub batches: Vec<TriangleBatch>,
}

impl SceneFile {
    /// Write with well-formed terminators and the explicit end marker.
    pub fn write_to<W: Write>(&self, out: W) -> Result<W> {
        let mut w = SceneWriter::new(out);
        w.header(self.materials.len(), self.textures.len())?;
        for name in &self.textures {
            w.texture_name(name.as_bytes())?;
        }
        w.terminator(SENTINEL)?;
        for &(index, texture) in &self.materials {
            w.material(index, texture)?;
        }
        w.terminator(SENTINEL)?;
        for batch in &self.batches {
            w.batch(&batch.triangles, batch.material)?;
            w.terminator(SENTINEL)?;
        }
        w.end_of_stream()?;
        w.finish()
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))?;
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Capacities;
    use std::io::Cursor;

    fn triangle(x: f64) -> Triangle {
        Triangle {
            a: Vertex { position: DVec3::new(x, 0.0, 0.0), uv: DVec2::new(0.0, 0.0) },
            b: Vertex { position: DVec3::new(x + 1.0, 0.0, 0.0), uv: DVec2::new(1.0, 0.0) },
            c: Vertex { position: DVec3::new(x, 1.0, 0.0), uv: DVec2::new(0.0, 1.0) },
            dominant_axis: Axis::Z,
            normal: DVec3::new(0.0, 0.0, 1.0),
            coefficients: IntersectCoefficients::from_array([0.5, -0.25, 1.0, 2.0, 0.0, -1.5, 3.0]),
            material: 0,
        }
    }

    fn db() -> GeometryDatabase {
        GeometryDatabase::new(Capacities { triangles: 100, materials: 8, textures: 8 })
    }

    fn load(bytes: Vec<u8>, db: &mut GeometryDatabase) -> Result<SceneSummary> {
        read_scene(Cursor::new(bytes), Path::new("scene.bin"), db, Path::new("/nonexistent"), false)
    }

    #[test]
    fn test_normalize_terrain() {
        assert_eq!(normalize_texture_name(b"terrain.tga").unwrap(), "terrain.tga");
    }

    #[test]
    fn test_normalize_short_name() {
        let name = b"texturesbrick_wall_01.tga";
        assert_eq!(name.len(), 25);
        assert_eq!(normalize_texture_name(name).unwrap(), "textures/brick_wall_01.tga");
    }

    #[test]
    fn test_normalize_prefixed_name() {
        let mut raw = b"C:\\exporter\\".to_vec();
        assert_eq!(raw.len(), 12);
        raw.extend_from_slice(b"models/wood.tga");
        raw.resize(12 + 36, 0);
        raw.extend_from_slice(b"trailing junk");
        assert_eq!(normalize_texture_name(&raw).unwrap(), "models/wood.tga");
    }

    #[test]
    fn test_normalize_too_short() {
        assert!(normalize_texture_name(b"a.tga").is_err());
    }

    #[test]
    fn test_normalize_non_utf8() {
        let mut raw = b"C:\\exporter\\".to_vec();
        raw.extend_from_slice(b"tex\xff.tga");
        assert_eq!(normalize_texture_name(&raw).unwrap(), "tex\u{fffd}.tga");
    }

    #[test]
    fn test_unusable_texture_names_leave_empty_slots() {
        let mut prefixed = b"C:\\exporter\\".to_vec();
        prefixed.extend_from_slice(b"tex\xff.tga");

        let mut w = SceneWriter::new(Vec::new());
        w.header(1, 2).unwrap();
        w.texture_name(b"wood.tga").unwrap();
        w.texture_name(&prefixed).unwrap();
        w.terminator(0).unwrap();
        w.material(0, Some(1)).unwrap();
        w.terminator(0).unwrap();
        w.batch(&[triangle(0.0)], 0).unwrap();
        w.terminator(0).unwrap();
        w.end_of_stream().unwrap();

        let mut db = db();
        let summary = load(w.finish().unwrap(), &mut db).unwrap();
        assert_eq!(summary.texture_slots, 2);
        assert_eq!(summary.textures_loaded, 0);
        assert_eq!(db.num_textures(), 2);
        assert!(db.texture(0).is_none() && db.texture(1).is_none());
        assert_eq!(db.num_materials(), 1);
        assert_eq!(db.num_triangles(), 1);
    }

    #[test]
    fn test_roundtrip_triangles() {
        let scene = SceneFile {
            textures: vec![],
            materials: vec![(0, None), (1, None)],
            batches: vec![
                TriangleBatch { triangles: vec![triangle(0.0), triangle(2.0)], material: 1 },
                TriangleBatch { triangles: vec![triangle(-4.0)], material: 0 },
            ],
        };
        let bytes = scene.write_to(Vec::new()).unwrap();
        // header, texture terminator, material pairs, material terminator,
        // each batch as count + records + material + terminator, end marker
        let words = 2 + 1 + 2 * 2 + 1 + (3 + 2 * TRIANGLE_WORDS) + (3 + TRIANGLE_WORDS) + 1;
        assert_eq!(bytes.len(), words * WORD_SIZE);
        assert_eq!(TRIANGLE_WORDS, 35);

        let mut db = db();
        let summary = load(bytes, &mut db).unwrap();

        assert_eq!(summary.triangles, 3);
        assert_eq!(summary.batches, 2);
        assert!(summary.explicit_end);
        assert_eq!(db.num_materials(), 2);

        let mut expected = triangle(2.0);
        expected.material = 1;
        assert_eq!(db.triangle(1), Some(&expected));
        assert_eq!(db.triangle(2).map(|t| t.material), Some(0));
    }

    #[test]
    fn test_end_of_input_terminates() {
        let mut w = SceneWriter::new(Vec::new());
        w.header(1, 0).unwrap();
        w.terminator(0).unwrap();
        w.material(0, None).unwrap();
        w.terminator(0).unwrap();
        w.batch(&[triangle(0.0)], 0).unwrap();
        w.terminator(0).unwrap();
        let bytes = w.finish().unwrap();

        let mut db = db();
        let summary = load(bytes, &mut db).unwrap();
        assert_eq!(summary.triangles, 1);
        assert!(!summary.explicit_end);
    }

    #[test]
    fn test_texture_sentinel_mismatch() {
        let mut w = SceneWriter::new(Vec::new());
        w.header(0, 0).unwrap();
        w.terminator(9).unwrap();
        let mut db = db();
        let err = load(w.finish().unwrap(), &mut db).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::TextureSentinel));
        assert!(matches!(err.root_cause(), Error::SentinelMismatch { expected: 0, actual: 9 }));
    }

    #[test]
    fn test_material_pairs() {
        let mut w = SceneWriter::new(Vec::new());
        w.header(2, 0).unwrap();
        w.terminator(0).unwrap();
        w.material(0, Some(3)).unwrap();
        w.material(5, None).unwrap();
        w.terminator(0).unwrap();
        w.end_of_stream().unwrap();

        let mut db = db();
        load(w.finish().unwrap(), &mut db).unwrap();
        assert_eq!(db.num_materials(), 2);
        assert_eq!(db.material(0).unwrap().texture, Some(3));
        assert_eq!(db.material(1).unwrap().texture, None);
        assert_eq!(db.material(1).unwrap().declared_index, 5);
    }

    #[test]
    fn test_header_capacity_checked_first() {
        let mut w = SceneWriter::new(Vec::new());
        w.header(9, 0).unwrap();
        let mut db = db();
        let err = load(w.finish().unwrap(), &mut db).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::SceneHeader));
        assert!(matches!(
            err.root_cause(),
            Error::CapacityExceeded { kind: CapacityKind::Materials, requested: 9, limit: 8 }
        ));
        assert_eq!(db.num_materials(), 0);
    }

    #[test]
    fn test_invalid_dominant_axis() {
        let mut t = triangle(0.0);
        t.dominant_axis = Axis::X;
        let scene = SceneFile {
            materials: vec![(0, None)],
            batches: vec![TriangleBatch { triangles: vec![t], material: 0 }],
            ..Default::default()
        };
        let mut bytes = scene.write_to(Vec::new()).unwrap();
        // header 2 + sentinel + material pair 2 + sentinel + count + 3 vertices
        let at = (2 + 1 + 2 + 1 + 1 + 3 * VERTEX_WORDS) * WORD_SIZE;
        bytes[at..at + 4].copy_from_slice(&7i32.to_le_bytes());

        let mut db = db();
        let err = load(bytes, &mut db).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::TriangleBatch(0)));
        assert_eq!(db.num_triangles(), 0);
    }
}
