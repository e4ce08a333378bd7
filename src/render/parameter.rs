//! Scene description: pose, view, camera, illumination and image size.
//!
//! [`RenderParameter`] is the parameter vector inverse problems search over.
//! It is immutable in use; every change goes through a `with_*` method that
//! returns an updated copy.
//!
//! # Coordinate frames
//!
//! 1. **Model**: coordinates of the morphable model instance.
//! 2. **World**: model transformed by the [`Pose`] (scale, rotation, translation).
//! 3. **Eye**: world seen from the [`ViewParameter`]; the camera looks down -z.
//! 4. **NDC**: projected by the [`Camera`], visible region `[-1, 1]³`.
//! 5. **Screen**: pixels, x to the right, y downwards; pixel `(i, j)` has its
//!    center at `(i + 0.5, j + 0.5)`.

use nalgebra::{Point2, Point3, Similarity3, Translation3, UnitQuaternion, Vector2, Vector3};

use super::shader::{ColorTransform, DirectionalLight, IlluminationFrame};
use crate::error::{Error, Result};
use crate::illumination::SphericalHarmonicsLight;
use crate::model::ModelCoefficients;

/// Rotation from Euler angles: yaw about y, then pitch about x, then roll about z.
fn euler_rotation(yaw: f64, pitch: f64, roll: f64) -> UnitQuaternion<f64> {
    UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw)
        * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), pitch)
        * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), roll)
}

/// Placement of the model in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    /// Uniform scale factor.
    pub scaling: f64,
    /// Translation applied after rotation.
    pub translation: Vector3<f64>,
    /// Rotation about the vertical (y) axis, radians.
    pub yaw: f64,
    /// Rotation about the horizontal (x) axis, radians.
    pub pitch: f64,
    /// Rotation about the viewing (z) axis, radians.
    pub roll: f64,
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            scaling: 1.0,
            translation: Vector3::zeros(),
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
        }
    }
}

impl Pose {
    /// Set the yaw angle.
    pub fn with_yaw(mut self, yaw: f64) -> Self {
        self.yaw = yaw;
        self
    }

    /// Set the pitch angle.
    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = pitch;
        self
    }

    /// Set the roll angle.
    pub fn with_roll(mut self, roll: f64) -> Self {
        self.roll = roll;
        self
    }

    /// Set the translation.
    pub fn with_translation(mut self, translation: Vector3<f64>) -> Self {
        self.translation = translation;
        self
    }

    /// Set the scale.
    pub fn with_scaling(mut self, scaling: f64) -> Self {
        self.scaling = scaling;
        self
    }

    /// Rotation part.
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        euler_rotation(self.yaw, self.pitch, self.roll)
    }

    /// Model-to-world transform; fails for a zero or non-finite scaling.
    pub fn transform(&self) -> Result<Similarity3<f64>> {
        if !(self.scaling.is_finite() && self.scaling != 0.0) {
            return Err(Error::invalid_param(
                "pose scaling",
                self.scaling,
                "must be finite and non-zero",
            ));
        }
        Ok(Similarity3::from_parts(
            Translation3::from(self.translation),
            self.rotation(),
            self.scaling,
        ))
    }
}

/// Position and orientation of the eye (camera) in the world.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewParameter {
    /// Eye position in world coordinates.
    pub translation: Vector3<f64>,
    /// Eye yaw, radians.
    pub yaw: f64,
    /// Eye pitch, radians.
    pub pitch: f64,
    /// Eye roll, radians.
    pub roll: f64,
}

impl Default for ViewParameter {
    fn default() -> Self {
        Self {
            translation: Vector3::new(0.0, 0.0, 1000.0),
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
        }
    }
}

impl ViewParameter {
    /// Eye placed at `position`, looking down the world -z axis.
    pub fn at(position: Vector3<f64>) -> Self {
        Self {
            translation: position,
            ..Self::default()
        }
    }

    /// Rotation of the eye frame in the world.
    pub fn rotation(&self) -> UnitQuaternion<f64> {
        euler_rotation(self.yaw, self.pitch, self.roll)
    }

    /// World-to-eye transform.
    pub fn eye_transform(&self) -> Similarity3<f64> {
        Similarity3::from_parts(Translation3::from(self.translation), self.rotation(), 1.0)
            .inverse()
    }
}

/// A pinhole (or orthographic) camera.
///
/// Lengths are in world units; a focal length of 50 with a 36 × 36 sensor
/// gives a field of view of about 40 degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Distance from the pinhole to the sensor.
    pub focal_length: f64,
    /// Principal point offset in NDC.
    pub principal_point: Point2<f64>,
    /// Sensor width and height.
    pub sensor_size: Vector2<f64>,
    /// Near clipping distance (positive).
    pub near: f64,
    /// Far clipping distance (positive, larger than `near`).
    pub far: f64,
    /// Orthographic instead of perspective projection.
    pub orthographic: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            focal_length: 50.0,
            principal_point: Point2::origin(),
            sensor_size: Vector2::new(36.0, 36.0),
            near: 10.0,
            far: 1.0e5,
            orthographic: false,
        }
    }
}

impl Camera {
    /// Set near and far clipping distances.
    pub fn with_clipping(mut self, near: f64, far: f64) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Check that the camera describes a valid projection.
    pub fn validate(&self) -> Result<()> {
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(Error::invalid_param(
                "camera clipping",
                format!("near={}, far={}", self.near, self.far),
                "require 0 < near < far",
            ));
        }
        if self.focal_length <= 0.0 || self.sensor_size.x <= 0.0 || self.sensor_size.y <= 0.0 {
            return Err(Error::invalid_param(
                "camera",
                format!("f={}, sensor={:?}", self.focal_length, self.sensor_size),
                "focal length and sensor size must be positive",
            ));
        }
        Ok(())
    }
}

/// Output image size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    /// Width in pixels.
    pub width: usize,
    /// Height in pixels.
    pub height: usize,
}

impl ImageSize {
    /// Create a size.
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Size scaled by an integer factor (for supersampling).
    pub fn scaled(&self, factor: usize) -> Self {
        Self::new(self.width * factor, self.height * factor)
    }
}

impl Default for ImageSize {
    fn default() -> Self {
        Self::new(256, 256)
    }
}

/// Illumination of the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Illumination {
    /// Environment light in the spherical harmonics basis.
    pub environment: SphericalHarmonicsLight,
    /// Additional directional light.
    pub directional: DirectionalLight,
    /// Frame in which normals are expressed when evaluating the light.
    pub frame: IlluminationFrame,
}

impl Default for Illumination {
    fn default() -> Self {
        Self {
            environment: SphericalHarmonicsLight::ambient_white(),
            directional: DirectionalLight::off(),
            frame: IlluminationFrame::Eye,
        }
    }
}

/// Complete scene description for rendering one image.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderParameter {
    /// Model pose.
    pub pose: Pose,
    /// Eye placement.
    pub view: ViewParameter,
    /// Projection.
    pub camera: Camera,
    /// Lights.
    pub illumination: Illumination,
    /// Sensor response.
    pub color_transform: ColorTransform,
    /// Output size.
    pub image_size: ImageSize,
    /// Model instance coefficients.
    pub coefficients: ModelCoefficients,
}

impl RenderParameter {
    /// Copy with a new pose.
    pub fn with_pose(&self, pose: Pose) -> Self {
        Self {
            pose,
            ..self.clone()
        }
    }

    /// Copy with a new view.
    pub fn with_view(&self, view: ViewParameter) -> Self {
        Self {
            view,
            ..self.clone()
        }
    }

    /// Copy with a new camera.
    pub fn with_camera(&self, camera: Camera) -> Self {
        Self {
            camera,
            ..self.clone()
        }
    }

    /// Copy with new illumination.
    pub fn with_illumination(&self, illumination: Illumination) -> Self {
        Self {
            illumination,
            ..self.clone()
        }
    }

    /// Copy with a new environment light.
    pub fn with_environment(&self, environment: SphericalHarmonicsLight) -> Self {
        let mut illumination = self.illumination.clone();
        illumination.environment = environment;
        self.with_illumination(illumination)
    }

    /// Copy with a new color transform.
    pub fn with_color_transform(&self, color_transform: ColorTransform) -> Self {
        Self {
            color_transform,
            ..self.clone()
        }
    }

    /// Copy with a new image size.
    pub fn with_image_size(&self, image_size: ImageSize) -> Self {
        Self {
            image_size,
            ..self.clone()
        }
    }

    /// Copy with new model coefficients.
    pub fn with_coefficients(&self, coefficients: ModelCoefficients) -> Self {
        Self {
            coefficients,
            ..self.clone()
        }
    }

    /// The point transform chain for these parameters.
    pub fn transform(&self) -> Result<RenderTransform> {
        RenderTransform::new(self)
    }
}

/// A projected vertex ready for rasterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenVertex {
    /// Screen x, screen y and NDC depth.
    pub position: Point3<f64>,
    /// Clip-space w (eye distance for perspective, 1 for orthographic).
    pub w: f64,
}

/// Precomputed model → world → eye → screen transform.
#[derive(Debug, Clone)]
pub struct RenderTransform {
    model_to_world: Similarity3<f64>,
    world_to_eye: Similarity3<f64>,
    camera: Camera,
    width: f64,
    height: f64,
}

impl RenderTransform {
    /// Build the transform chain; fails for an invalid camera or pose.
    pub fn new(parameter: &RenderParameter) -> Result<Self> {
        parameter.camera.validate()?;
        Ok(Self {
            model_to_world: parameter.pose.transform()?,
            world_to_eye: parameter.view.eye_transform(),
            camera: parameter.camera.clone(),
            width: parameter.image_size.width as f64,
            height: parameter.image_size.height as f64,
        })
    }

    /// Same transform rendering into a grid scaled by `factor`.
    pub fn scaled(&self, factor: usize) -> Self {
        Self {
            width: self.width * factor as f64,
            height: self.height * factor as f64,
            ..self.clone()
        }
    }

    /// Model point to world coordinates.
    #[inline]
    pub fn to_world(&self, p: &Point3<f64>) -> Point3<f64> {
        self.model_to_world.transform_point(p)
    }

    /// World point to eye coordinates.
    #[inline]
    pub fn world_to_eye(&self, p: &Point3<f64>) -> Point3<f64> {
        self.world_to_eye.transform_point(p)
    }

    /// Model point to eye coordinates.
    #[inline]
    pub fn to_eye(&self, p: &Point3<f64>) -> Point3<f64> {
        self.world_to_eye(&self.to_world(p))
    }

    /// Rotate a model-space normal into the world frame.
    #[inline]
    pub fn normal_to_world(&self, n: &Vector3<f64>) -> Vector3<f64> {
        self.model_to_world.isometry.rotation * n
    }

    /// Rotate a model-space normal into the eye frame.
    #[inline]
    pub fn normal_to_eye(&self, n: &Vector3<f64>) -> Vector3<f64> {
        self.world_to_eye.isometry.rotation * self.normal_to_world(n)
    }

    /// Rotate an eye-space direction back into the world frame.
    #[inline]
    pub fn eye_to_world_direction(&self, d: &Vector3<f64>) -> Vector3<f64> {
        self.world_to_eye.isometry.rotation.inverse() * d
    }

    /// Project an eye-space point to the screen.
    pub fn project_eye(&self, pe: &Point3<f64>) -> ScreenVertex {
        let cam = &self.camera;
        let half_w = 0.5 * cam.sensor_size.x;
        let half_h = 0.5 * cam.sensor_size.y;
        let (xn, yn, zn, w) = if cam.orthographic {
            let zn = 2.0 * (-pe.z - cam.near) / (cam.far - cam.near) - 1.0;
            (pe.x / half_w, pe.y / half_h, zn, 1.0)
        } else {
            let d = -pe.z;
            let zn = (cam.far + cam.near) / (cam.far - cam.near)
                + 2.0 * cam.far * cam.near / ((cam.far - cam.near) * pe.z);
            (
                cam.focal_length * pe.x / d / half_w,
                cam.focal_length * pe.y / d / half_h,
                zn,
                d,
            )
        };
        let xn = xn + cam.principal_point.x;
        let yn = yn + cam.principal_point.y;
        ScreenVertex {
            position: Point3::new(
                0.5 * (xn + 1.0) * self.width,
                0.5 * (1.0 - yn) * self.height,
                zn,
            ),
            w,
        }
    }

    /// Project a model point to the screen.
    #[inline]
    pub fn project(&self, p: &Point3<f64>) -> ScreenVertex {
        self.project_eye(&self.to_eye(p))
    }

    /// Eye-space point seen at screen position `(x, y)` at eye depth `z` (negative).
    pub fn unproject(&self, x: f64, y: f64, z: f64) -> Point3<f64> {
        let cam = &self.camera;
        let xn = 2.0 * x / self.width - 1.0 - cam.principal_point.x;
        let yn = 1.0 - 2.0 * y / self.height - cam.principal_point.y;
        let half_w = 0.5 * cam.sensor_size.x;
        let half_h = 0.5 * cam.sensor_size.y;
        if cam.orthographic {
            Point3::new(xn * half_w, yn * half_h, z)
        } else {
            let d = -z;
            Point3::new(
                xn * half_w * d / cam.focal_length,
                yn * half_h * d / cam.focal_length,
                z,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn test_parameter() -> RenderParameter {
        RenderParameter::default()
            .with_view(ViewParameter::at(Vector3::new(0.0, 0.0, 5.0)))
            .with_camera(Camera::default().with_clipping(0.1, 100.0))
            .with_image_size(ImageSize::new(100, 80))
    }

    #[test]
    fn test_origin_projects_to_image_center() {
        let t = test_parameter().transform().unwrap();
        let v = t.project(&Point3::origin());
        assert!((v.position.x - 50.0).abs() < 1e-9);
        assert!((v.position.y - 40.0).abs() < 1e-9);
        assert!((v.w - 5.0).abs() < 1e-12);
        assert!(v.position.z > -1.0 && v.position.z < 1.0);
    }

    #[test]
    fn test_screen_y_points_down() {
        let t = test_parameter().transform().unwrap();
        let up = t.project(&Point3::new(0.0, 1.0, 0.0));
        assert!(up.position.y < 40.0);
        let right = t.project(&Point3::new(1.0, 0.0, 0.0));
        assert!(right.position.x > 50.0);
    }

    #[test]
    fn test_depth_increases_with_distance() {
        let t = test_parameter().transform().unwrap();
        let near = t.project(&Point3::new(0.0, 0.0, 1.0));
        let far = t.project(&Point3::new(0.0, 0.0, -1.0));
        assert!(near.position.z < far.position.z);
    }

    #[test]
    fn test_unproject_inverts_projection() {
        let t = test_parameter().transform().unwrap();
        let p = Point3::new(0.3, -0.7, 0.2);
        let pe = t.to_eye(&p);
        let s = t.project_eye(&pe);
        let back = t.unproject(s.position.x, s.position.y, pe.z);
        assert!((back - pe).norm() < 1e-12);
    }

    #[test]
    fn test_pose_yaw_rotates_about_vertical_axis() {
        let pose = Pose::default().with_yaw(FRAC_PI_2);
        let p = pose.transform().unwrap().transform_point(&Point3::new(0.0, 0.0, 1.0));
        assert!((p - Point3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_functional_update_leaves_original() {
        let a = test_parameter();
        let b = a.with_pose(Pose::default().with_scaling(2.0));
        assert_eq!(a.pose.scaling, 1.0);
        assert_eq!(b.pose.scaling, 2.0);
        assert_eq!(a.view, b.view);
    }

    #[test]
    fn test_invalid_camera_rejected() {
        let p = test_parameter().with_camera(Camera::default().with_clipping(1.0, 0.5));
        assert!(p.transform().is_err());
    }

    #[test]
    fn test_degenerate_pose_scaling_rejected() {
        for scaling in [0.0, f64::NAN, f64::INFINITY] {
            let p = test_parameter().with_pose(Pose::default().with_scaling(scaling));
            assert!(
                matches!(p.transform(), Err(Error::InvalidParameter { name: "pose scaling", .. })),
                "scaling {} accepted",
                scaling
            );
        }
        let mirrored = test_parameter().with_pose(Pose::default().with_scaling(-1.0));
        assert!(mirrored.transform().is_ok());
    }
}
