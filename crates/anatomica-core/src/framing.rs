//! Camera framing derived from a model's bounding geometry
//!
//! Models arrive in wildly different units (a tooth scan in millimetres, a
//! heart in metres), so after every load the model is normalized to a
//! common size and the camera, clip planes, and orbit limits are derived
//! from the normalized bounds.

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::scene::SceneGraph;

/// Eye distance as a multiple of the bounding radius
pub const DISTANCE_FACTOR: f32 = 2.8;

/// Button zoom step as a fraction of the bounding radius
pub const ZOOM_STEP_FACTOR: f32 = 0.2;

/// Orbit distance limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitLimits {
    pub min_distance: f32,
    pub max_distance: f32,
}

impl OrbitLimits {
    /// Limits before any model has loaded
    pub const INITIAL: OrbitLimits = OrbitLimits {
        min_distance: 0.3,
        max_distance: 20.0,
    };

    pub fn clamp(&self, distance: f32) -> f32 {
        distance.clamp(self.min_distance, self.max_distance)
    }
}

impl Default for OrbitLimits {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// Orbit control tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitSettings {
    /// Fraction of the remaining motion applied per frame
    pub damping: f32,
    pub rotate_speed: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            damping: 0.05,
            rotate_speed: 0.8,
            pan_speed: 0.8,
            zoom_speed: 1.0,
        }
    }
}

/// Everything the renderer needs after framing a model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraParams {
    pub radius: f32,
    pub distance: f32,
    pub eye: Vec3,
    pub target: Vec3,
    pub near: f32,
    pub far: f32,
    pub limits: OrbitLimits,
    /// Transform applied to the model root
    pub model_scale: f32,
    pub model_translation: Vec3,
    pub model_rotation: Quat,
}

impl CameraParams {
    /// Camera state before any model has loaded
    pub fn initial() -> Self {
        Self {
            radius: 1.0,
            distance: 4.0,
            eye: Vec3::new(0.0, 0.0, 4.0),
            target: Vec3::ZERO,
            near: 0.1,
            far: 1000.0,
            limits: OrbitLimits::INITIAL,
            model_scale: 1.0,
            model_translation: Vec3::ZERO,
            model_rotation: Quat::IDENTITY,
        }
    }

    /// Distance moved by one press of a zoom button
    pub fn zoom_step(&self) -> f32 {
        self.radius * ZOOM_STEP_FACTOR
    }
}

impl Default for CameraParams {
    fn default() -> Self {
        Self::initial()
    }
}

/// Camera pose and lens used for projection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraView {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl CameraView {
    /// 75 degrees
    pub const DEFAULT_FOV_Y: f32 = 75.0 * std::f32::consts::PI / 180.0;

    pub fn from_params(params: &CameraParams) -> Self {
        Self {
            eye: params.eye,
            target: params.target,
            up: Vec3::Y,
            fov_y: Self::DEFAULT_FOV_Y,
            near: params.near,
            far: params.far,
        }
    }

    /// Right-handed view matrix; a zero `up` falls back to +Y
    pub fn view_matrix(&self) -> Mat4 {
        let up = self.up.try_normalize().unwrap_or(Vec3::Y);
        Mat4::look_at_rh(self.eye, self.target, up)
    }
}

/// Normalize the model root and derive camera parameters
///
/// Replaces the root's transform: the existing root scale is multiplied by
/// `2 / maxDim`, the root is translated so the scaled bounds are centered
/// on the origin, and a fixed +90° X rotation is applied. Geometry-free or
/// zero-extent models keep scale 1 and radius 1.
pub fn frame(graph: &mut SceneGraph) -> CameraParams {
    let base = *graph.root_transform();

    // Measure without the previous root translation and rotation
    {
        let root = graph.root_transform_mut();
        root.translation = Vec3::ZERO;
        root.rotation = Quat::IDENTITY;
    }

    let max_dim = graph.world_bounds().map(|b| b.max_dimension()).unwrap_or(0.0);
    let scale = if max_dim > 0.0 && max_dim.is_finite() {
        2.0 / max_dim
    } else {
        tracing::debug!(max_dim, "Degenerate model bounds, keeping unit scale");
        1.0
    };
    graph.root_transform_mut().scale = base.scale * scale;

    let scaled = graph.world_bounds();
    let center = scaled.map(|b| b.center()).unwrap_or(Vec3::ZERO);
    let radius = scaled
        .map(|b| b.bounding_sphere_radius())
        .filter(|r| *r > 0.0 && r.is_finite())
        .or_else(|| {
            scaled
                .map(|b| b.max_dimension() * 0.5)
                .filter(|r| *r > 0.0 && r.is_finite())
        })
        .unwrap_or(1.0);

    let rotation = Quat::from_rotation_x(std::f32::consts::FRAC_PI_2);
    {
        let root = graph.root_transform_mut();
        // Centering happens before the fixed rotation is applied
        root.translation = rotation * -center;
        root.rotation = rotation;
    }

    let distance = radius * DISTANCE_FACTOR;
    let params = CameraParams {
        radius,
        distance,
        eye: Vec3::new(0.0, 0.0, distance),
        target: Vec3::ZERO,
        near: (radius * 0.001).max(0.001),
        far: (distance * 10.0).max(1000.0),
        limits: OrbitLimits {
            min_distance: (radius * 0.25).max(0.05),
            max_distance: (distance * 3.0).max(radius * 20.0),
        },
        model_scale: scale,
        model_translation: graph.root_transform().translation,
        model_rotation: rotation,
    };

    tracing::debug!(
        radius = params.radius,
        distance = params.distance,
        near = params.near,
        far = params.far,
        "Framed model"
    );
    params
}

/// Move the eye toward (positive `amount`) or away from the target
///
/// The resulting eye-target distance is clamped into `limits`. An eye
/// sitting on the target is pushed out along +Z.
pub fn zoom_step(eye: Vec3, target: Vec3, amount: f32, limits: &OrbitLimits) -> Vec3 {
    let offset = eye - target;
    let direction = offset.try_normalize().unwrap_or(Vec3::Z);
    let distance = limits.clamp(offset.length() - amount);
    target + direction * distance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Aabb, NodeTransform};

    fn graph_with_box(min: Vec3, max: Vec3) -> SceneGraph {
        let mut graph = SceneGraph::new("Scene");
        graph.add_node(graph.root(), "Body", NodeTransform::IDENTITY, Some(Aabb::new(min, max)));
        graph
    }

    #[test]
    fn test_frame_normalizes_to_two_units() {
        let mut graph = graph_with_box(Vec3::new(10.0, 0.0, 0.0), Vec3::new(110.0, 50.0, 20.0));
        let params = frame(&mut graph);

        assert!((params.model_scale - 0.02).abs() < 1e-6);
        let bounds = graph.world_bounds().unwrap();
        assert!(bounds.center().length() < 1e-4);
        assert!((bounds.max_dimension() - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_frame_rotates_model_about_x() {
        let mut graph = graph_with_box(Vec3::ZERO, Vec3::new(2.0, 2.0, 0.5));
        frame(&mut graph);

        // The thin Z extent becomes the Y extent after the +90° X rotation
        let size = graph.world_bounds().unwrap().size();
        assert!((size.y - 0.5).abs() < 1e-4);
        assert!((size.z - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_frame_camera_relations() {
        let mut graph = graph_with_box(Vec3::splat(-1.0), Vec3::splat(1.0));
        let params = frame(&mut graph);

        let radius = 3.0_f32.sqrt();
        assert!((params.radius - radius).abs() < 1e-5);
        assert!((params.distance - radius * 2.8).abs() < 1e-5);
        assert_eq!(params.eye, Vec3::new(0.0, 0.0, params.distance));
        assert!(params.near < params.far);
        assert!(params.limits.min_distance <= params.limits.max_distance);
        assert_eq!(params.far, 1000.0);
        assert!((params.limits.max_distance - radius * 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_frame_zero_extent_keeps_unit_scale() {
        let point = Vec3::new(3.0, 3.0, 3.0);
        let mut graph = graph_with_box(point, point);
        let params = frame(&mut graph);

        assert_eq!(params.model_scale, 1.0);
        assert_eq!(params.radius, 1.0);
        assert!(params.distance.is_finite());
    }

    #[test]
    fn test_frame_without_geometry() {
        let mut graph = SceneGraph::new("Empty");
        let params = frame(&mut graph);
        assert_eq!(params.model_scale, 1.0);
        assert_eq!(params.radius, 1.0);
        assert!(params.near < params.far);
    }

    #[test]
    fn test_reframing_is_stable() {
        let mut graph = graph_with_box(Vec3::ZERO, Vec3::new(4.0, 1.0, 1.0));
        let first = frame(&mut graph);
        let second = frame(&mut graph);
        assert!((second.model_scale - 1.0).abs() < 1e-5);
        assert!((first.radius - second.radius).abs() < 1e-5);
    }

    #[test]
    fn test_zoom_step_clamps_into_limits() {
        let limits = OrbitLimits { min_distance: 1.0, max_distance: 10.0 };
        let eye = Vec3::new(0.0, 0.0, 5.0);

        let closer = zoom_step(eye, Vec3::ZERO, 2.0, &limits);
        assert!((closer.z - 3.0).abs() < 1e-6);

        let clamped_in = zoom_step(eye, Vec3::ZERO, 100.0, &limits);
        assert!((clamped_in.length() - 1.0).abs() < 1e-6);

        let clamped_out = zoom_step(eye, Vec3::ZERO, -100.0, &limits);
        assert!((clamped_out.length() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_step_keeps_direction() {
        let limits = OrbitLimits::INITIAL;
        let target = Vec3::new(1.0, 1.0, 1.0);
        let eye = target + Vec3::new(3.0, 0.0, 4.0);
        let moved = zoom_step(eye, target, 1.0, &limits);
        let dir = (moved - target).normalize();
        assert!((dir - Vec3::new(0.6, 0.0, 0.8)).length() < 1e-5);
        assert!(((moved - target).length() - 4.0).abs() < 1e-5);
    }
}
