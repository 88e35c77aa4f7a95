//! Bevy application setup

use anatomica_core::{catalog, CameraParams, CameraView, OrbitLimits, OrbitSettings, OrganInfo, OrganKey, ViewerSession};
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;

use crate::file_picker::FilePickerPlugin;
use crate::markers::MarkersPlugin;
use crate::models::ModelsPlugin;
use crate::network::NetworkPlugin;
use crate::scene::ScenePlugin;
use crate::ui::UiPlugin;

/// The viewer session shared by every system
#[derive(Resource, Default, Deref, DerefMut)]
pub struct Session(pub ViewerSession);

/// Request to load an organ model, from the dropdown or a classification
#[derive(Message, Debug, Clone, Copy)]
pub struct LoadOrgan(pub OrganKey);

/// Zoom button press
#[derive(Message, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomStep {
    In,
    Out,
}

/// A model finished loading and was framed
#[derive(Message, Debug, Clone, Copy)]
pub struct ModelFramed(pub CameraParams);

/// Camera controller settings
#[derive(Debug, Clone, Resource)]
pub struct CameraSettings {
    pub distance: f32,
    pub target_distance: f32, // For smooth zoom
    pub azimuth: f32,
    pub elevation: f32,
    pub target: Vec3,
    pub target_focus: Vec3, // For smooth re-centering
    pub sensitivity: f32,
    pub pan_speed: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
    pub limits: OrbitLimits,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        let mut settings = Self::from_orbit(&OrbitSettings::default());
        settings.apply_framing(&CameraParams::initial());
        settings
    }
}

impl CameraSettings {
    /// Controller tuned from the shared orbit settings
    pub fn from_orbit(orbit: &OrbitSettings) -> Self {
        Self {
            distance: 4.0,
            target_distance: 4.0,
            azimuth: 0.0,
            elevation: 0.0,
            target: Vec3::ZERO,
            target_focus: Vec3::ZERO,
            sensitivity: 0.005 * orbit.rotate_speed,
            pan_speed: 0.002 * orbit.pan_speed,
            zoom_speed: 0.1 * orbit.zoom_speed,
            smooth_factor: orbit.damping,
            limits: OrbitLimits::INITIAL,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Jump to the pose, clip planes, and limits produced by framing
    pub fn apply_framing(&mut self, params: &CameraParams) {
        let target = bevy_vec3(params.target);
        let offset = bevy_vec3(params.eye) - target;
        let distance = offset.length();

        if distance > 0.0 && distance.is_finite() {
            self.azimuth = offset.x.atan2(offset.z);
            self.elevation = (offset.y / distance).clamp(-1.0, 1.0).asin();
        } else {
            self.azimuth = 0.0;
            self.elevation = 0.0;
        }

        self.limits = params.limits;
        self.distance = self.limits.clamp(distance);
        self.target_distance = self.distance;
        self.target = target;
        self.target_focus = target;
        self.near = params.near;
        self.far = params.far;
    }

    /// Eye position on the orbit sphere (Y up)
    pub fn eye(&self) -> Vec3 {
        let x = self.distance * self.azimuth.sin() * self.elevation.cos();
        let y = self.distance * self.elevation.sin();
        let z = self.distance * self.azimuth.cos() * self.elevation.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Camera description used for label projection
    pub fn view(&self) -> CameraView {
        CameraView {
            eye: core_vec3(self.eye()),
            target: core_vec3(self.target),
            up: anatomica_core::glam::Vec3::Y,
            fov_y: CameraView::DEFAULT_FOV_Y,
            near: self.near,
            far: self.far,
        }
    }
}

/// Organ picker and upload state for the UI
#[derive(Debug, Clone, Resource)]
pub struct ViewerUi {
    pub catalog: Vec<OrganInfo>,
    pub chosen: OrganKey,
    /// Name of the last uploaded image
    pub upload_name: Option<String>,
    /// Organ reported for the last upload
    pub predicted: Option<OrganKey>,
}

impl Default for ViewerUi {
    fn default() -> Self {
        Self {
            catalog: catalog(),
            chosen: OrganKey::Liver,
            upload_name: None,
            predicted: None,
        }
    }
}

pub fn bevy_vec3(v: anatomica_core::glam::Vec3) -> Vec3 {
    Vec3::from_array(v.to_array())
}

pub fn core_vec3(v: Vec3) -> anatomica_core::glam::Vec3 {
    anatomica_core::glam::Vec3::from_array(v.to_array())
}

pub fn bevy_quat(q: anatomica_core::glam::Quat) -> Quat {
    Quat::from_array(q.to_array())
}

pub fn core_quat(q: Quat) -> anatomica_core::glam::Quat {
    anatomica_core::glam::Quat::from_array(q.to_array())
}

/// Run the Bevy application
pub fn run() {
    App::new()
        .insert_resource(ClearColor(Color::srgb_u8(0x1a, 0x1a, 0x1a)))
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Anatomica - Anatomical Viewer".to_string(),
                    canvas: Some("#anatomica-canvas".to_string()),
                    fit_canvas_to_parent: true,
                    prevent_default_event_handling: false,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                // Load assets from root (server serves /models directly)
                file_path: "".to_string(),
                // Don't look for .meta files - server doesn't have them
                meta_check: bevy::asset::AssetMetaCheck::Never,
                ..default()
            })
        )
        // Picking must be added BEFORE EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(EguiPlugin::default())
        .init_resource::<Session>()
        .init_resource::<CameraSettings>()
        .init_resource::<ViewerUi>()
        .add_message::<LoadOrgan>()
        .add_message::<ZoomStep>()
        .add_message::<ModelFramed>()
        .add_plugins(NetworkPlugin)
        .add_plugins(FilePickerPlugin)
        .add_plugins(ScenePlugin)
        .add_plugins(ModelsPlugin)
        .add_plugins(MarkersPlugin)
        .add_plugins(UiPlugin)
        .run();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_camera_looks_down_negative_z() {
        let settings = CameraSettings::default();
        assert!((settings.eye() - Vec3::new(0.0, 0.0, 4.0)).length() < 1e-5);
        assert_eq!(settings.limits, OrbitLimits::INITIAL);
    }

    #[test]
    fn test_apply_framing_matches_params() {
        let params = CameraParams {
            radius: 1.5,
            distance: 4.2,
            eye: anatomica_core::glam::Vec3::new(0.0, 0.0, 4.2),
            limits: OrbitLimits {
                min_distance: 0.375,
                max_distance: 30.0,
            },
            ..CameraParams::initial()
        };
        let mut settings = CameraSettings::default();
        settings.azimuth = 1.0;
        settings.apply_framing(&params);

        assert!((settings.eye() - Vec3::new(0.0, 0.0, 4.2)).length() < 1e-4);
        assert_eq!(settings.target_distance, settings.distance);
        assert_eq!(settings.limits, params.limits);

        let view = settings.view();
        assert_eq!(view.near, params.near);
        assert_eq!(view.far, params.far);
    }

    #[test]
    fn test_vector_conversion_preserves_components() {
        let v = Vec3::new(1.0, -2.0, 3.5);
        assert_eq!(bevy_vec3(core_vec3(v)), v);
        let q = Quat::from_rotation_x(0.7);
        assert_eq!(bevy_quat(core_quat(q)), q);
    }
}
