//! In-memory geometry database: triangles, materials and textures.
//!
//! Tables only grow. Every insert is checked against the configured
//! [`Capacities`] and a rejected insert leaves the tables untouched. Mutation
//! is crate-internal; once a load returns, consumers only get read access.

mod material;
mod texture;
mod triangle;

pub use material::*;
pub use texture::*;
pub use triangle::*;

use std::ops::Range;

use crate::util::{Capacities, CapacityKind, Error, Result};

/// Table lengths captured before a scene load, for rollback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint {
    triangles: usize,
    materials: usize,
    textures: usize,
}

/// Triangle, material and texture tables of a loaded scene.
#[derive(Debug, Clone, Default)]
pub struct GeometryDatabase {
    capacities: Capacities,
    triangles: Vec<Triangle>,
    materials: Vec<Material>,
    /// Slots stay allocated for textures that failed to load.
    textures: Vec<Option<Texture>>,
}

impl GeometryDatabase {
    pub fn new(capacities: Capacities) -> Self {
        Self {
            capacities,
            ..Self::default()
        }
    }

    #[inline]
    pub fn capacities(&self) -> Capacities {
        self.capacities
    }

    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    #[inline]
    pub fn triangle(&self, index: usize) -> Option<&Triangle> {
        self.triangles.get(index)
    }

    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    #[inline]
    pub fn material(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }

    #[inline]
    pub fn num_materials(&self) -> usize {
        self.materials.len()
    }

    /// All texture slots, including empty ones.
    #[inline]
    pub fn textures(&self) -> &[Option<Texture>] {
        &self.textures
    }

    /// Texture in slot `index`, if it loaded.
    #[inline]
    pub fn texture(&self, index: usize) -> Option<&Texture> {
        self.textures.get(index).and_then(Option::as_ref)
    }

    /// Number of texture slots, including empty ones.
    #[inline]
    pub fn num_textures(&self) -> usize {
        self.textures.len()
    }

    /// Number of texture slots holding a decoded texture.
    pub fn num_loaded_textures(&self) -> usize {
        self.textures.iter().filter(|t| t.is_some()).count()
    }

    fn len_and_limit(&self, kind: CapacityKind) -> (usize, usize) {
        match kind {
            CapacityKind::Triangles => (self.triangles.len(), self.capacities.triangles),
            CapacityKind::Materials => (self.materials.len(), self.capacities.materials),
            CapacityKind::Textures => (self.textures.len(), self.capacities.textures),
        }
    }

    /// Check that `additional` more entries fit in a table.
    ///
    /// Exactly filling the table succeeds; one more fails with the total
    /// that would have been reached.
    pub fn check_capacity(&self, kind: CapacityKind, additional: usize) -> Result<()> {
        let (len, limit) = self.len_and_limit(kind);
        let requested = len.saturating_add(additional);
        if requested > limit {
            return Err(Error::CapacityExceeded { kind, requested, limit });
        }
        Ok(())
    }

    /// Sample offset the next decoded texture will start at.
    pub(crate) fn next_texture_offset(&self) -> usize {
        self.textures
            .iter()
            .flatten()
            .map(Texture::num_samples)
            .sum()
    }

    /// Append a texture slot, empty if the texture failed to load.
    pub(crate) fn push_texture(&mut self, texture: Option<Texture>) -> Result<usize> {
        self.check_capacity(CapacityKind::Textures, 1)?;
        self.textures.push(texture);
        Ok(self.textures.len() - 1)
    }

    pub(crate) fn push_material(&mut self, material: Material) -> Result<usize> {
        self.check_capacity(CapacityKind::Materials, 1)?;
        self.materials.push(material);
        Ok(self.materials.len() - 1)
    }

    /// Append a whole batch, or nothing if it does not fit.
    pub(crate) fn push_triangles(&mut self, batch: Vec<Triangle>) -> Result<Range<usize>> {
        self.check_capacity(CapacityKind::Triangles, batch.len())?;
        let start = self.triangles.len();
        self.triangles.extend(batch);
        Ok(start..self.triangles.len())
    }

    pub(crate) fn assign_material(&mut self, range: Range<usize>, material: usize) {
        for tri in &mut self.triangles[range] {
            tri.material = material;
        }
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            triangles: self.triangles.len(),
            materials: self.materials.len(),
            textures: self.textures.len(),
        }
    }

    pub(crate) fn rollback(&mut self, cp: Checkpoint) {
        self.triangles.truncate(cp.triangles);
        self.materials.truncate(cp.materials);
        self.textures.truncate(cp.textures);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Axis;

    fn tri() -> Triangle {
        Triangle {
            a: Vertex::default(),
            b: Vertex::default(),
            c: Vertex::default(),
            dominant_axis: Axis::Z,
            normal: Default::default(),
            coefficients: Default::default(),
            material: 0,
        }
    }

    fn small() -> GeometryDatabase {
        GeometryDatabase::new(Capacities { triangles: 4, materials: 2, textures: 2 })
    }

    #[test]
    fn test_capacity_boundary() {
        let mut db = small();
        db.push_triangles(vec![tri(); 1]).unwrap();

        // Exactly filling succeeds
        assert!(db.check_capacity(CapacityKind::Triangles, 3).is_ok());
        // One more fails
        let err = db.check_capacity(CapacityKind::Triangles, 4).unwrap_err();
        assert!(matches!(
            err,
            Error::CapacityExceeded { kind: CapacityKind::Triangles, requested: 5, limit: 4 }
        ));
    }

    #[test]
    fn test_rejected_batch_not_applied() {
        let mut db = small();
        db.push_triangles(vec![tri(); 3]).unwrap();
        assert!(db.push_triangles(vec![tri(); 2]).is_err());
        assert_eq!(db.num_triangles(), 3);

        let range = db.push_triangles(vec![tri(); 1]).unwrap();
        assert_eq!(range, 3..4);
    }

    #[test]
    fn test_assign_material() {
        let mut db = small();
        db.push_triangles(vec![tri(); 2]).unwrap();
        let range = db.push_triangles(vec![tri(); 2]).unwrap();
        db.assign_material(range, 7);
        let mats: Vec<usize> = db.triangles().iter().map(|t| t.material).collect();
        assert_eq!(mats, vec![0, 0, 7, 7]);
    }

    #[test]
    fn test_texture_holes() {
        let mut db = small();
        db.push_texture(None).unwrap();
        let tex = Texture { width: 1, height: 1, alpha: false, mem_start: 0, pixels: vec![0; 3] };
        let idx = db.push_texture(Some(tex)).unwrap();
        assert_eq!(idx, 1);
        assert_eq!(db.num_textures(), 2);
        assert_eq!(db.num_loaded_textures(), 1);
        assert!(db.texture(0).is_none());
        assert_eq!(db.next_texture_offset(), 3);
        assert!(db.push_texture(None).is_err());
    }

    #[test]
    fn test_rollback() {
        let mut db = small();
        db.push_material(Material::default()).unwrap();
        let cp = db.checkpoint();
        db.push_material(Material::default()).unwrap();
        db.push_triangles(vec![tri(); 2]).unwrap();
        db.rollback(cp);
        assert_eq!(db.num_materials(), 1);
        assert_eq!(db.num_triangles(), 0);
    }
}
