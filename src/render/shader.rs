//! Pure shading functions over fragments.
//!
//! A [`Shader`] captures the parameters of one render call and evaluates
//! fragments without any internal state. The modality functions
//! ([`Shader::depth_value`], [`Shader::normal_value`], [`Shader::albedo_value`],
//! [`Shader::illumination_value`]) are independent alternatives to the full
//! [`Shader::shade`]; they share the [`Fragment`] input and nothing else.
//!
//! Full shading is
//!
//! ```text
//! c = albedo ⊙ (E_sh(n) + diffuse · max(0, n·l)) + specular · max(0, r·v)^shininess
//! out = gain ⊙ c^gamma + offset
//! ```
//!
//! with `n` the unit normal in the illumination frame, `l` the unit direction
//! towards the directional light, `v` the unit direction towards the eye and
//! `r` the reflection of `l` about `n`.

use nalgebra::Vector3;

use super::correspondence::Fragment;
use super::parameter::{Illumination, RenderParameter, RenderTransform};
use crate::color::{Rgb, Rgba};
use crate::error::Result;

/// Per-channel sensor response `gain · c^gamma + offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorTransform {
    /// Per-channel gain.
    pub gain: Rgb,
    /// Exponent applied before the gain.
    pub gamma: f64,
    /// Per-channel offset added last.
    pub offset: Rgb,
}

impl Default for ColorTransform {
    fn default() -> Self {
        Self {
            gain: Rgb::WHITE,
            gamma: 1.0,
            offset: Rgb::BLACK,
        }
    }
}

impl ColorTransform {
    /// Apply to a linear color. Negative inputs are clipped to zero first.
    pub fn apply(&self, c: Rgb) -> Rgb {
        let g = self.gamma;
        Rgb::new(
            self.gain.r * c.r.max(0.0).powf(g) + self.offset.r,
            self.gain.g * c.g.max(0.0).powf(g) + self.offset.g,
            self.gain.b * c.b.max(0.0).powf(g) + self.offset.b,
        )
    }

    /// Undo [`apply`](Self::apply) on an observed color.
    ///
    /// Channels with zero gain map to zero.
    pub fn invert(&self, c: Rgb) -> Rgb {
        let inv_g = 1.0 / self.gamma;
        let channel = |v: f64, gain: f64, offset: f64| {
            if gain == 0.0 {
                0.0
            } else {
                ((v - offset) / gain).max(0.0).powf(inv_g)
            }
        };
        Rgb::new(
            channel(c.r, self.gain.r, self.offset.r),
            channel(c.g, self.gain.g, self.offset.g),
            channel(c.b, self.gain.b, self.offset.b),
        )
    }
}

/// A single directional light with a Phong specular lobe.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionalLight {
    /// Diffuse (Lambert) intensity.
    pub diffuse: Rgb,
    /// Specular intensity.
    pub specular: Rgb,
    /// Direction towards the light, in the illumination frame.
    pub direction: Vector3<f64>,
    /// Phong exponent.
    pub shininess: f64,
}

impl DirectionalLight {
    /// A light contributing nothing.
    pub fn off() -> Self {
        Self {
            diffuse: Rgb::BLACK,
            specular: Rgb::BLACK,
            direction: Vector3::z(),
            shininess: 20.0,
        }
    }

    /// A white diffuse light from `direction`.
    pub fn diffuse(direction: Vector3<f64>, intensity: f64) -> Self {
        Self {
            diffuse: Rgb::gray(intensity),
            direction,
            ..Self::off()
        }
    }

    /// Whether the light has any effect.
    pub fn is_off(&self) -> bool {
        self.diffuse == Rgb::BLACK && self.specular == Rgb::BLACK
    }
}

/// Frame in which normals are handed to the illumination model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IlluminationFrame {
    /// World coordinates: light is fixed to the scene.
    World,
    /// Eye coordinates: light moves with the camera.
    #[default]
    Eye,
}

/// Shading functions bound to one set of render parameters.
#[derive(Debug, Clone)]
pub struct Shader {
    transform: RenderTransform,
    illumination: Illumination,
    color_transform: ColorTransform,
}

impl Shader {
    /// Bind shading to `parameter`; fails for an invalid camera.
    pub fn new(parameter: &RenderParameter) -> Result<Self> {
        Ok(Self {
            transform: parameter.transform()?,
            illumination: parameter.illumination.clone(),
            color_transform: parameter.color_transform.clone(),
        })
    }

    /// The transform chain used for normals and depth.
    pub fn transform(&self) -> &RenderTransform {
        &self.transform
    }

    /// Unit surface normal in the illumination frame.
    pub fn illumination_normal(&self, fragment: &Fragment) -> Vector3<f64> {
        let n = fragment.mesh.normal_at(fragment.triangle, &fragment.bcc);
        let n = match self.illumination.frame {
            IlluminationFrame::World => self.transform.normal_to_world(&n),
            IlluminationFrame::Eye => self.transform.normal_to_eye(&n),
        };
        n.normalize()
    }

    /// Unit direction from the surface point towards the eye, in the illumination frame.
    fn view_direction(&self, fragment: &Fragment) -> Vector3<f64> {
        let eye = self.transform.world_to_eye(&fragment.world_position);
        let to_eye = -eye.coords;
        let v = match self.illumination.frame {
            IlluminationFrame::Eye => to_eye,
            IlluminationFrame::World => self.transform.eye_to_world_direction(&to_eye),
        };
        v.try_normalize(0.0).unwrap_or_else(Vector3::z)
    }

    /// Light reaching the surface, as seen by a white surface.
    fn light(&self, fragment: &Fragment, albedo: Rgb) -> Rgb {
        let n = self.illumination_normal(fragment);
        let mut diffuse = self.illumination.environment.irradiance(&n);
        let dir = &self.illumination.directional;
        let mut specular = Rgb::BLACK;
        if !dir.is_off() {
            let l = dir.direction.normalize();
            let n_dot_l = n.dot(&l);
            if n_dot_l > 0.0 {
                diffuse += dir.diffuse * n_dot_l;
                if dir.specular != Rgb::BLACK {
                    let r = n * (2.0 * n_dot_l) - l;
                    let r_dot_v = r.dot(&self.view_direction(fragment)).max(0.0);
                    specular = dir.specular * r_dot_v.powf(dir.shininess);
                }
            }
        }
        albedo.modulate(diffuse) + specular
    }

    /// Final color of a fragment.
    pub fn shade(&self, fragment: &Fragment) -> Rgba {
        let albedo = self.albedo_value(fragment);
        self.color_transform
            .apply(self.light(fragment, albedo))
            .with_alpha(1.0)
    }

    /// Distance in front of the eye along the viewing axis.
    pub fn depth_value(&self, fragment: &Fragment) -> f64 {
        -self.transform.world_to_eye(&fragment.world_position).z
    }

    /// Unit normal in the eye frame.
    pub fn normal_value(&self, fragment: &Fragment) -> Vector3<f64> {
        let n = fragment.mesh.normal_at(fragment.triangle, &fragment.bcc);
        self.transform.normal_to_eye(&n).normalize()
    }

    /// Surface albedo.
    pub fn albedo_value(&self, fragment: &Fragment) -> Rgb {
        fragment.mesh.color_at(fragment.triangle, &fragment.bcc)
    }

    /// Shading of a white surface, before the color transform.
    pub fn illumination_value(&self, fragment: &Fragment) -> Rgb {
        self.light(fragment, Rgb::WHITE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::illumination::SphericalHarmonicsLight;
    use crate::mesh::{BarycentricCoordinates, ColorNormalMesh, TriangleId, TriangleMesh};
    use crate::render::parameter::{Camera, ViewParameter};
    use std::sync::Arc;

    fn fragment(param: &RenderParameter) -> Fragment {
        let shape = TriangleMesh::grid(1, 1.0).unwrap();
        let mesh = ColorNormalMesh::with_vertex_colors(shape, vec![Rgb::new(0.5, 0.4, 0.2); 4])
            .unwrap();
        let bcc = BarycentricCoordinates::CENTER;
        let t = TriangleId::new(0);
        let world_position = param.transform().unwrap().to_world(&mesh.position_at(t, &bcc));
        Fragment {
            triangle: t,
            bcc,
            world_position,
            mesh: Arc::new(mesh),
        }
    }

    fn parameter() -> RenderParameter {
        RenderParameter::default()
            .with_view(ViewParameter::at(Vector3::new(0.0, 0.0, 5.0)))
            .with_camera(Camera::default().with_clipping(0.1, 100.0))
    }

    #[test]
    fn test_ambient_white_returns_albedo() {
        let param = parameter();
        let shader = Shader::new(&param).unwrap();
        let c = shader.shade(&fragment(&param));
        assert!((c.rgb() - Rgb::new(0.5, 0.4, 0.2)).norm_squared() < 1e-20);
        assert_eq!(c.a, 1.0);
    }

    #[test]
    fn test_directional_light_adds_lambert_term() {
        let mut illumination = Illumination::default();
        illumination.environment = SphericalHarmonicsLight::zero(1).unwrap();
        illumination.directional = DirectionalLight::diffuse(Vector3::new(0.0, 1.0, 1.0), 1.0);
        let param = parameter().with_illumination(illumination);
        let shader = Shader::new(&param).unwrap();
        let light = shader.illumination_value(&fragment(&param));
        let expected = std::f64::consts::FRAC_1_SQRT_2;
        assert!((light.g - expected).abs() < 1e-12, "got {:?}", light);
    }

    #[test]
    fn test_light_from_behind_contributes_nothing() {
        let mut illumination = Illumination::default();
        illumination.environment = SphericalHarmonicsLight::zero(1).unwrap();
        illumination.directional = DirectionalLight {
            specular: Rgb::WHITE,
            ..DirectionalLight::diffuse(-Vector3::z(), 1.0)
        };
        let param = parameter().with_illumination(illumination);
        let shader = Shader::new(&param).unwrap();
        assert_eq!(shader.illumination_value(&fragment(&param)), Rgb::BLACK);
    }

    #[test]
    fn test_specular_peak_towards_eye() {
        let mut illumination = Illumination::default();
        illumination.environment = SphericalHarmonicsLight::zero(1).unwrap();
        illumination.directional = DirectionalLight {
            diffuse: Rgb::BLACK,
            specular: Rgb::WHITE,
            direction: Vector3::z(),
            shininess: 10.0,
        };
        let param = parameter().with_illumination(illumination);
        let shader = Shader::new(&param).unwrap();
        let light = shader.illumination_value(&fragment(&param));
        // The fragment sits slightly off the optical axis
        assert!(light.r > 0.9 && light.r <= 1.0 + 1e-12, "got {:?}", light);
    }

    #[test]
    fn test_color_transform_round_trip() {
        let t = ColorTransform {
            gain: Rgb::new(1.2, 0.9, 1.1),
            gamma: 1.0 / 2.2,
            offset: Rgb::gray(0.05),
        };
        let c = Rgb::new(0.2, 0.5, 0.7);
        let back = t.invert(t.apply(c));
        assert!((back - c).norm_squared() < 1e-20);
    }

    #[test]
    fn test_modalities() {
        let param = parameter();
        let shader = Shader::new(&param).unwrap();
        let f = fragment(&param);
        assert!((shader.depth_value(&f) - 5.0).abs() < 1e-12);
        assert!((shader.normal_value(&f) - Vector3::z()).norm() < 1e-12);
        assert_eq!(shader.albedo_value(&f), Rgb::new(0.5, 0.4, 0.2));
    }
}
