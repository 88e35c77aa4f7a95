//! Organ model loading
//!
//! A load goes through two phases. First the glTF asset loads. Then its
//! scene is instantiated under a [`ModelRoot`] entity. Once the scene's
//! entities exist, the hierarchy is copied into an engine-independent
//! `SceneGraph` and handed to the session. The session frames it, and the
//! resulting root transform is written back to the model root.

use anatomica_core::{Aabb, LoadToken, NodeId, NodeTransform, OrganKey, SceneGraph};
use bevy::asset::LoadState;
use bevy::gltf::Gltf;
use bevy::prelude::*;

use crate::app::{bevy_quat, bevy_vec3, core_quat, core_vec3, LoadOrgan, ModelFramed, Session};
use crate::network::{fetch_labels, PendingLabels, ServerConfig};

pub struct ModelsPlugin;

impl Plugin for ModelsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ModelLoad>()
            .add_systems(Update, (
                start_model_load,
                poll_model_load,
                snapshot_model,
            ).chain());
    }
}

/// Marker for the entity the organ scene is spawned under
#[derive(Component)]
pub struct ModelRoot;

enum LoadPhase {
    /// Waiting for the glTF asset
    Loading(Handle<Gltf>),
    /// Scene spawned under this entity, waiting for its children
    Spawned(Entity),
}

struct ActiveLoad {
    token: LoadToken,
    organ: OrganKey,
    phase: LoadPhase,
    /// Frames spent waiting on the asset
    polls: u32,
}

/// Frames between progress reports while a model loads
const PROGRESS_INTERVAL: u32 = 30;

/// The model load in flight, if any
#[derive(Resource, Default)]
pub struct ModelLoad {
    current: Option<ActiveLoad>,
}

/// Start loading the requested organ, replacing whatever is displayed
fn start_model_load(
    mut commands: Commands,
    mut requests: MessageReader<LoadOrgan>,
    mut session: ResMut<Session>,
    mut model_load: ResMut<ModelLoad>,
    asset_server: Res<AssetServer>,
    server_config: Res<ServerConfig>,
    pending_labels: Res<PendingLabels>,
    roots: Query<Entity, With<ModelRoot>>,
) {
    // Only the latest request in a frame matters
    let Some(LoadOrgan(organ)) = requests.read().last().copied() else {
        return;
    };

    for entity in roots.iter() {
        commands.entity(entity).despawn();
    }

    let token = session.begin_load(organ);
    let asset_path = server_config.model_asset_path(organ.model_path());
    tracing::info!("Starting to load model: {}", asset_path);

    let handle: Handle<Gltf> = asset_server.load(asset_path);
    model_load.current = Some(ActiveLoad {
        token,
        organ,
        phase: LoadPhase::Loading(handle),
        polls: 0,
    });

    fetch_labels(organ, token, &server_config, &pending_labels);
}

/// Check loading state and spawn the scene once the glTF is ready
fn poll_model_load(
    mut commands: Commands,
    mut model_load: ResMut<ModelLoad>,
    mut session: ResMut<Session>,
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
) {
    let Some(active) = model_load.current.as_mut() else {
        return;
    };
    let LoadPhase::Loading(handle) = &active.phase else {
        return;
    };

    let failure = match asset_server.get_load_state(handle.id()) {
        Some(LoadState::Loaded) => {
            let scene = gltf_assets.get(handle).and_then(|gltf| {
                // Use first scene if no default
                gltf.default_scene.clone().or_else(|| gltf.scenes.first().cloned())
            });
            match scene {
                Some(scene) => {
                    let entity = commands
                        .spawn((SceneRoot(scene), Transform::default(), ModelRoot))
                        .id();
                    tracing::info!("Model loaded: {}", active.organ);
                    active.phase = LoadPhase::Spawned(entity);
                    None
                }
                None => Some("glTF file has no scenes".to_string()),
            }
        }
        Some(LoadState::Failed(err)) => Some(err.to_string()),
        state => {
            // Still loading
            active.polls += 1;
            if reports_progress(active.polls) {
                tracing::debug!(
                    organ = %active.organ,
                    ?state,
                    dependencies = ?asset_server.get_recursive_dependency_load_state(handle.id()),
                    "Model loading..."
                );
            }
            None
        }
    };

    if let Some(reason) = failure {
        let token = active.token;
        model_load.current = None;
        // A stale token only means a newer load already took over
        let _ = session.model_failed(token, &reason);
    }
}

fn reports_progress(polls: u32) -> bool {
    polls % PROGRESS_INTERVAL == 1
}

/// Once the scene is instantiated, hand its hierarchy to the session
fn snapshot_model(
    mut model_load: ResMut<ModelLoad>,
    mut session: ResMut<Session>,
    mut framed: MessageWriter<ModelFramed>,
    mut roots: Query<(&mut Transform, Option<&Children>), With<ModelRoot>>,
    nodes: Query<(Option<&Name>, &Transform, Option<&Mesh3d>, Option<&Children>), Without<ModelRoot>>,
    material_handles: Query<&MeshMaterial3d<StandardMaterial>>,
    meshes: Res<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let Some(active) = model_load.current.as_ref() else {
        return;
    };
    let LoadPhase::Spawned(root) = active.phase else {
        return;
    };
    let Ok((mut root_transform, Some(children))) = roots.get_mut(root) else {
        // Scene not instantiated yet
        return;
    };

    let mut graph = SceneGraph::new(active.organ.as_str());
    let mut mesh_entities = Vec::new();
    let graph_root = graph.root();
    for child in children.iter() {
        add_subtree(&mut graph, graph_root, child, None, &nodes, &meshes, &mut mesh_entities);
    }

    let token = active.token;
    model_load.current = None;

    match session.model_loaded(token, graph) {
        Ok(params) => {
            if let Some(model) = session.model_transform() {
                *root_transform = Transform {
                    translation: bevy_vec3(model.translation),
                    rotation: bevy_quat(model.rotation),
                    scale: bevy_vec3(model.scale),
                };
            }
            prepare_materials(&mesh_entities, &material_handles, &mut materials);
            framed.write(ModelFramed(params));
        }
        Err(err) => {
            tracing::debug!("Discarding spawned model: {}", err);
        }
    }
}

/// Copy `entity` and its descendants into `graph` under `parent`
fn add_subtree(
    graph: &mut SceneGraph,
    parent: NodeId,
    entity: Entity,
    inherited_name: Option<&str>,
    nodes: &Query<(Option<&Name>, &Transform, Option<&Mesh3d>, Option<&Children>), Without<ModelRoot>>,
    meshes: &Assets<Mesh>,
    mesh_entities: &mut Vec<Entity>,
) {
    let Ok((name, transform, mesh, children)) = nodes.get(entity) else {
        return;
    };

    let own_name = name.map(|n| n.as_str());
    let geometry = mesh.and_then(|m| meshes.get(&m.0)).and_then(mesh_bounds);
    if geometry.is_some() {
        mesh_entities.push(entity);
    }

    let node_name = node_label(own_name, inherited_name, geometry.is_some());
    let id = graph.add_node(
        parent,
        node_name,
        NodeTransform {
            translation: core_vec3(transform.translation),
            rotation: core_quat(transform.rotation),
            scale: core_vec3(transform.scale),
        },
        geometry,
    );

    if let Some(children) = children {
        let passed_name = own_name.or(inherited_name);
        for child in children.iter() {
            add_subtree(graph, id, child, passed_name, nodes, meshes, mesh_entities);
        }
    }
}

/// Name a snapshot node is matched by
///
/// Primitive entities carry the glTF mesh name, while labels refer to the
/// node that owns the mesh, so drawables take their ancestor's name first.
fn node_label(own: Option<&str>, inherited: Option<&str>, is_mesh: bool) -> String {
    let name = if is_mesh {
        inherited.or(own)
    } else {
        own.or(inherited)
    };
    name.unwrap_or_default().to_string()
}

/// Local-space bounds from the position attribute
fn mesh_bounds(mesh: &Mesh) -> Option<Aabb> {
    let positions = mesh.attribute(Mesh::ATTRIBUTE_POSITION)?.as_float3()?;
    Aabb::from_points(
        positions
            .iter()
            .map(|p| anatomica_core::glam::Vec3::from_array(*p)),
    )
}

/// Render both faces, and blend materials that are not fully opaque
fn prepare_materials(
    mesh_entities: &[Entity],
    material_handles: &Query<&MeshMaterial3d<StandardMaterial>>,
    materials: &mut Assets<StandardMaterial>,
) {
    for entity in mesh_entities {
        let Ok(handle) = material_handles.get(*entity) else {
            continue;
        };
        if let Some(material) = materials.get_mut(&handle.0) {
            material.double_sided = true;
            material.cull_mode = None;
            if material.base_color.alpha() < 1.0 && matches!(material.alpha_mode, AlphaMode::Opaque) {
                material.alpha_mode = AlphaMode::Blend;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_bounds_from_cuboid() {
        let mesh = Mesh::from(Cuboid::new(2.0, 4.0, 6.0));
        let bounds = mesh_bounds(&mesh).unwrap();
        assert_eq!(bounds.min.to_array(), [-1.0, -2.0, -3.0]);
        assert_eq!(bounds.max.to_array(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_progress_reported_on_first_poll_then_periodically() {
        let reported: Vec<u32> = (1..=70).filter(|polls| reports_progress(*polls)).collect();
        assert_eq!(reported, vec![1, 31, 61]);
    }

    #[test]
    fn test_primitives_take_owning_node_name() {
        assert_eq!(node_label(Some("Mesh.001"), Some("LeftAtrium"), true), "LeftAtrium");
        assert_eq!(node_label(Some("Ureter"), None, true), "Ureter");
        assert_eq!(node_label(Some("Kidney"), Some("Scene"), false), "Kidney");
        assert_eq!(node_label(None, Some("Scene"), false), "Scene");
        assert_eq!(node_label(None, None, true), "");
    }
}
