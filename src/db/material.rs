//! Material records.

use serde::Serialize;

use crate::util::DVec3;

/// Surface appearance of a batch of triangles.
///
/// Scene files only carry a texture binding per material; every other field
/// starts from the ray tracer's defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Material {
    /// Index the scene file declared for this material.
    pub declared_index: i32,
    pub colour: DVec3,
    pub reflectivity: f64,
    pub opacity: f64,
    pub refractivity: f64,
    pub inverse_refractivity: f64,
    pub square_inverse_refractivity: f64,
    pub ambiance: f64,
    pub diffusive: f64,
    pub specular: f64,
    pub shininess: f64,
    pub light_colour: DVec3,
    /// `colour * ambiance * light_colour`, cached for shading.
    pub ambient_colour: DVec3,
    pub texture: Option<usize>,
}

impl Default for Material {
    fn default() -> Self {
        let colour = DVec3::splat(0.75);
        let light_colour = DVec3::ONE;
        let ambiance = 0.2;
        let refractivity = 1.0;
        Self {
            declared_index: 0,
            colour,
            reflectivity: 0.0,
            opacity: 1.0,
            refractivity,
            inverse_refractivity: 1.0 / refractivity,
            square_inverse_refractivity: 1.0 / (refractivity * refractivity),
            ambiance,
            diffusive: 0.7,
            specular: 0.3,
            shininess: 20.0,
            light_colour,
            ambient_colour: colour * ambiance * light_colour,
            texture: None,
        }
    }
}

impl Material {
    /// Default material bound to a texture slot.
    pub fn with_texture(declared_index: i32, texture: Option<usize>) -> Self {
        Self {
            declared_index,
            texture,
            ..Self::default()
        }
    }

    /// Change the refractive index and refresh the derived terms.
    pub fn set_refractivity(&mut self, refractivity: f64) {
        self.refractivity = refractivity;
        self.inverse_refractivity = 1.0 / refractivity;
        self.square_inverse_refractivity = self.inverse_refractivity * self.inverse_refractivity;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let m = Material::default();
        assert_eq!(m.reflectivity, 0.0);
        assert_eq!(m.texture, None);
        assert!((m.ambient_colour - DVec3::splat(0.15)).length() < 1e-12);
    }

    #[test]
    fn test_refractivity_terms() {
        let mut m = Material::with_texture(3, Some(1));
        m.set_refractivity(2.0);
        assert_eq!(m.inverse_refractivity, 0.5);
        assert_eq!(m.square_inverse_refractivity, 0.25);
        assert_eq!(m.declared_index, 3);
        assert_eq!(m.texture, Some(1));
    }
}
