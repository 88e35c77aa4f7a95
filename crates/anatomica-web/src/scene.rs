//! Camera, lights, and orbit controls

use anatomica_core::zoom_step;
use bevy::input::mouse::{MouseMotion, MouseScrollUnit, MouseWheel};
use bevy::prelude::*;

use crate::app::{bevy_vec3, core_vec3, CameraSettings, ModelFramed, Session, ZoomStep};

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_scene)
            .add_systems(Update, (
                apply_model_framing,
                handle_zoom_steps,
                update_camera,
            ).chain());
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Maximum elevation in radians, just short of the poles
const MAX_ELEVATION: f32 = 1.5;

/// Pixels per wheel "line" when the browser reports pixel deltas
const PIXELS_PER_LINE: f32 = 100.0;

fn setup_scene(mut commands: Commands, settings: Res<CameraSettings>) {
    let view = settings.view();

    // Camera - Y up, looking down -Z at the origin
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            fov: view.fov_y,
            near: settings.near,
            far: settings.far,
            ..default()
        }),
        Transform::from_translation(settings.eye()).looking_at(settings.target, Vec3::Y),
        AmbientLight {
            color: Color::WHITE,
            brightness: 400.0,
            ..default()
        },
        MainCamera,
    ));

    // Key light from the front-top-right
    commands.spawn((
        DirectionalLight {
            illuminance: 5000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(2.0, 4.0, 5.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // Weaker back light so the far side of the model is never black
    commands.spawn((
        DirectionalLight {
            illuminance: 1500.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(-2.0, -4.0, -5.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

/// Reset the orbit and clip planes after a model is framed
fn apply_model_framing(
    mut framed: MessageReader<ModelFramed>,
    mut settings: ResMut<CameraSettings>,
    mut projection_query: Query<&mut Projection, With<MainCamera>>,
) {
    let Some(ModelFramed(params)) = framed.read().last().copied() else {
        return;
    };

    settings.apply_framing(&params);

    if let Ok(mut projection) = projection_query.single_mut() {
        if let Projection::Perspective(perspective) = &mut *projection {
            perspective.near = settings.near;
            perspective.far = settings.far;
        }
    }
}

/// Zoom buttons move the eye by a fixed fraction of the model radius
fn handle_zoom_steps(
    mut steps: MessageReader<ZoomStep>,
    mut settings: ResMut<CameraSettings>,
    session: Res<Session>,
) {
    let step = session.camera().zoom_step();
    for zoom in steps.read() {
        let amount = match zoom {
            ZoomStep::In => step,
            ZoomStep::Out => -step,
        };

        // Step from where the damped zoom is heading, not where it is now
        let direction = (settings.eye() - settings.target).normalize_or(Vec3::Z);
        let target = core_vec3(settings.target);
        let eye = core_vec3(settings.target + direction * settings.target_distance);
        let new_eye = zoom_step(eye, target, amount, &settings.limits);
        settings.target_distance = bevy_vec3(new_eye - target).length();
    }
}

pub fn update_camera(
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
    mut settings: ResMut<CameraSettings>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    time: Res<Time>,
    mut contexts: bevy_egui::EguiContexts,
) {
    // Check if egui wants the mouse - if so, don't process camera controls
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);

    // Collect mouse motion delta
    let mut total_motion = Vec2::ZERO;
    for motion in mouse_motion.read() {
        total_motion += motion.delta;
    }

    // Orbit with left mouse drag
    if mouse_button.pressed(MouseButton::Left) && !egui_wants_pointer {
        settings.azimuth -= total_motion.x * settings.sensitivity;
        settings.elevation = (settings.elevation + total_motion.y * settings.sensitivity)
            .clamp(-MAX_ELEVATION, MAX_ELEVATION);
    }

    // Pan in the view plane with right mouse drag
    if mouse_button.pressed(MouseButton::Right) && !egui_wants_pointer {
        if let Ok(transform) = camera_query.single() {
            let pan = settings.distance * settings.pan_speed;
            settings.target_focus -= pan_offset(transform, total_motion, pan);
        }
    }

    // Zoom with scroll, clamped to the orbit limits
    if !egui_wants_pointer {
        for scroll in mouse_wheel.read() {
            let lines = match scroll.unit {
                MouseScrollUnit::Line => scroll.y,
                MouseScrollUnit::Pixel => scroll.y / PIXELS_PER_LINE,
            };
            let zoom_factor = (1.0 - lines * settings.zoom_speed).max(0.1);
            settings.target_distance = settings.limits.clamp(settings.target_distance * zoom_factor);
        }
    } else {
        // Drain the scroll events even if we're not using them
        for _ in mouse_wheel.read() {}
    }

    // Touch support for mobile
    if touch_input.iter().count() == 1 && !egui_wants_pointer {
        for touch in touch_input.iter() {
            let delta = touch.delta();
            if delta != Vec2::ZERO {
                settings.azimuth -= delta.x * settings.sensitivity;
                settings.elevation = (settings.elevation + delta.y * settings.sensitivity)
                    .clamp(-MAX_ELEVATION, MAX_ELEVATION);
            }
        }
    }

    // Pinch to zoom
    if touch_input.iter().count() == 2 {
        let touches: Vec<_> = touch_input.iter().collect();
        if let (Some(t1), Some(t2)) = (touches.first(), touches.get(1)) {
            let curr_dist = t1.position().distance(t2.position());
            let prev_dist = (t1.position() - t1.delta())
                .distance(t2.position() - t2.delta());
            let zoom_factor = prev_dist / curr_dist.max(1.0);
            settings.target_distance = settings.limits.clamp(settings.target_distance * zoom_factor);
        }
    }

    // Damped interpolation for zoom and target
    let dt = time.delta_secs();
    let lerp_factor = 1.0 - (-settings.smooth_factor * 60.0 * dt).exp();
    settings.distance = settings.distance + (settings.target_distance - settings.distance) * lerp_factor;
    settings.target = settings.target + (settings.target_focus - settings.target) * lerp_factor;

    if let Ok(mut transform) = camera_query.single_mut() {
        transform.translation = settings.eye();
        transform.look_at(settings.target, Vec3::Y);
    }
}

/// World-space shift for a drag of `motion` pixels, along the camera's own axes
fn pan_offset(camera: &Transform, motion: Vec2, scale: f32) -> Vec3 {
    (*camera.right() * motion.x - *camera.up() * motion.y) * scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pan_stays_in_view_plane_from_above() {
        // Nearly top-down view
        let camera = Transform::from_xyz(0.0, 4.0, 0.05).looking_at(Vec3::ZERO, Vec3::Y);
        let forward = *camera.forward();

        let vertical = pan_offset(&camera, Vec2::new(0.0, 10.0), 0.01);
        let horizontal = pan_offset(&camera, Vec2::new(10.0, 0.0), 0.01);
        assert!(vertical.dot(forward).abs() < 1e-4);
        assert!(horizontal.dot(forward).abs() < 1e-4);
        assert!((vertical.length() - 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_pan_follows_screen_axes() {
        let camera = Transform::from_xyz(0.0, 0.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y);
        let offset = pan_offset(&camera, Vec2::new(10.0, -5.0), 0.1);
        assert!((offset - Vec3::new(1.0, 0.5, 0.0)).length() < 1e-4);
    }
}
