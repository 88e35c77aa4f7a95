//! 3D label markers: a sphere on each anchor with a short stem above it

use anatomica_core::{HighlightStyle, SelectionState};
use bevy::prelude::*;

use crate::app::{bevy_vec3, Session};

pub struct MarkersPlugin;

impl Plugin for MarkersPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_marker_meshes)
            .add_systems(Update, (sync_markers, ApplyDeferred, style_markers).chain());
    }
}

/// Marker sizes in normalized model units (the framed model spans 2 units)
const SPHERE_RADIUS: f32 = 0.03;
const STEM_LENGTH: f32 = 0.25;
const STEM_RADIUS: f32 = 0.004;

const MARKER_COLOR: Color = Color::srgb(0.95, 0.35, 0.3);
const HIGHLIGHT_COLOR: Color = Color::srgb(1.0, 0.85, 0.2);

/// Which part of a label's marker an entity is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerPart {
    Sphere,
    Stem,
}

/// Marker entity for the label at `index`
#[derive(Component, Debug)]
pub struct LabelMarker {
    pub index: usize,
    pub part: MarkerPart,
}

#[derive(Resource)]
struct MarkerMeshes {
    sphere: Handle<Mesh>,
    stem: Handle<Mesh>,
}

fn setup_marker_meshes(mut commands: Commands, mut meshes: ResMut<Assets<Mesh>>) {
    commands.insert_resource(MarkerMeshes {
        sphere: meshes.add(Sphere::new(SPHERE_RADIUS)),
        stem: meshes.add(Cylinder::new(STEM_RADIUS, STEM_LENGTH)),
    });
}

/// Rebuild markers whenever the session's anchors change
fn sync_markers(
    mut commands: Commands,
    session: Res<Session>,
    marker_meshes: Option<Res<MarkerMeshes>>,
    markers: Query<Entity, With<LabelMarker>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut built_revision: Local<Option<u64>>,
) {
    let revision = session.anchor_revision();
    if *built_revision == Some(revision) {
        return;
    }
    let Some(marker_meshes) = marker_meshes else {
        return;
    };
    *built_revision = Some(revision);

    for entity in markers.iter() {
        commands.entity(entity).despawn();
    }

    for (index, anchor) in session.anchors().iter().enumerate() {
        let position = bevy_vec3(anchor.position);
        if !position.is_finite() {
            continue;
        }

        // Each marker gets its own material so highlighting one leaves the rest alone
        let material = materials.add(marker_material(&HighlightStyle::DEFAULT));

        commands.spawn((
            Mesh3d(marker_meshes.sphere.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_translation(position),
            LabelMarker {
                index,
                part: MarkerPart::Sphere,
            },
        ));

        commands.spawn((
            Mesh3d(marker_meshes.stem.clone()),
            MeshMaterial3d(material),
            Transform::from_translation(position + Vec3::Y * (STEM_LENGTH * 0.5)),
            LabelMarker {
                index,
                part: MarkerPart::Stem,
            },
        ));
    }

    tracing::debug!("Built {} label markers", session.anchors().len());
}

/// Apply the session's highlight styles when the selection changes
fn style_markers(
    session: Res<Session>,
    mut markers: Query<(&LabelMarker, &MeshMaterial3d<StandardMaterial>, &mut Transform)>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut styled: Local<Option<(u64, SelectionState)>>,
) {
    let key = (session.anchor_revision(), session.selection());
    if *styled == Some(key) || markers.is_empty() {
        return;
    }
    *styled = Some(key);

    for (marker, material_handle, mut transform) in markers.iter_mut() {
        let style = session.highlight(marker.index);

        if marker.part == MarkerPart::Sphere {
            transform.scale = Vec3::splat(style.marker_scale);
        }
        if let Some(material) = materials.get_mut(&material_handle.0) {
            *material = marker_material(&style);
        }
    }
}

fn marker_color(style: &HighlightStyle) -> Color {
    let color = if style.color_shift {
        HIGHLIGHT_COLOR
    } else {
        MARKER_COLOR
    };
    color.with_alpha(style.opacity)
}

fn marker_material(style: &HighlightStyle) -> StandardMaterial {
    let color = marker_color(style);
    StandardMaterial {
        base_color: color,
        emissive: color.to_linear() * style.emissive_intensity,
        alpha_mode: if style.opacity < 1.0 {
            AlphaMode::Blend
        } else {
            AlphaMode::Opaque
        },
        unlit: false,
        ..default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emphasized_marker_is_opaque_and_brighter() {
        let plain = marker_material(&HighlightStyle::DEFAULT);
        let lit = marker_material(&HighlightStyle::EMPHASIZED);

        assert!(matches!(plain.alpha_mode, AlphaMode::Blend));
        assert!(matches!(lit.alpha_mode, AlphaMode::Opaque));
        assert!(lit.emissive.red > plain.emissive.red);
        assert_ne!(marker_color(&HighlightStyle::DEFAULT).with_alpha(1.0), HIGHLIGHT_COLOR);
    }
}
