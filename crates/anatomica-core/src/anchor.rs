//! World-space anchor points for labels

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::label::LabelEntry;
use crate::mesh_index::MeshIndex;
use crate::resolver::{resolve, Resolution};
use crate::scene::SceneGraph;

/// How an anchor's position was obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnchorSource {
    /// Center of a resolved mesh's bounding box
    Mesh { name: String },
    /// The label's authored coordinate
    Fallback,
}

/// A label's resolved world-space position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub position: Vec3,
    pub source: AnchorSource,
}

/// Compute the anchor for one resolution result
///
/// A found mesh anchors at the center of its local bounding box carried
/// through the node's world transform. Degenerate boxes still have a
/// center. A miss anchors at `fallback`, which is authored in the same
/// normalized space as the framed model and used as-is.
pub fn locate(graph: &SceneGraph, resolution: &Resolution, fallback: [f32; 3]) -> Anchor {
    let found = resolution.mesh().and_then(|mesh| {
        let node = graph.node(mesh.node)?;
        let local = node.geometry?;
        let world = graph.world_matrix(mesh.node).transform_point3(local.center());
        Some(Anchor {
            position: world,
            source: AnchorSource::Mesh {
                name: mesh.name.clone(),
            },
        })
    });

    found.unwrap_or_else(|| Anchor {
        position: Vec3::from_array(fallback),
        source: AnchorSource::Fallback,
    })
}

/// Resolve and anchor every label, index-aligned with `labels`
pub fn locate_all(graph: &SceneGraph, index: &MeshIndex, labels: &[LabelEntry]) -> Vec<Anchor> {
    labels
        .iter()
        .map(|label| {
            let resolution = resolve(index, &label.name);
            let anchor = locate(graph, &resolution, label.position);
            if anchor.source == AnchorSource::Fallback {
                tracing::debug!(label = %label.name, "No mesh matched, using fallback coordinate");
            }
            anchor
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Aabb, NodeTransform};

    fn label(name: &str, position: [f32; 3]) -> LabelEntry {
        LabelEntry {
            name: name.to_string(),
            description: String::new(),
            position,
        }
    }

    #[test]
    fn test_mesh_anchor_uses_world_box_center() {
        let mut graph = SceneGraph::new("Scene");
        *graph.root_transform_mut() = NodeTransform::IDENTITY.with_scale(Vec3::splat(0.5));
        let group = graph.add_node(
            graph.root(),
            "Group",
            NodeTransform::from_translation(Vec3::new(0.0, 4.0, 0.0)),
            None,
        );
        graph.add_node(
            group,
            "Cortex",
            NodeTransform::IDENTITY,
            Some(Aabb::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(3.0, 3.0, 3.0))),
        );
        let index = MeshIndex::build(&graph);

        let anchors = locate_all(&graph, &index, &[label("Cortex", [9.0, 9.0, 9.0])]);
        // local center (2,2,2) -> +(0,4,0) -> *0.5
        assert!((anchors[0].position - Vec3::new(1.0, 3.0, 1.0)).length() < 1e-5);
        assert_eq!(anchors[0].source, AnchorSource::Mesh { name: "Cortex".to_string() });
    }

    #[test]
    fn test_miss_uses_fallback_untransformed() {
        let mut graph = SceneGraph::new("Scene");
        *graph.root_transform_mut() = NodeTransform::IDENTITY.with_scale(Vec3::splat(10.0));
        let index = MeshIndex::build(&graph);

        let anchor = locate(&graph, &resolve(&index, "Ureter"), [0.1, -0.2, 0.3]);
        assert_eq!(anchor.position, Vec3::new(0.1, -0.2, 0.3));
        assert_eq!(anchor.source, AnchorSource::Fallback);
    }

    #[test]
    fn test_degenerate_geometry_still_anchors() {
        let mut graph = SceneGraph::new("Scene");
        let point = Vec3::new(0.25, 0.5, -1.0);
        graph.add_node(graph.root(), "Hilum", NodeTransform::IDENTITY, Some(Aabb::new(point, point)));
        let index = MeshIndex::build(&graph);

        let anchor = locate(&graph, &resolve(&index, "Hilum"), [0.0; 3]);
        assert_eq!(anchor.position, point);
    }

    #[test]
    fn test_anchors_are_index_aligned() {
        let mut graph = SceneGraph::new("Scene");
        graph.add_node(graph.root(), "Aorta", NodeTransform::IDENTITY, Some(Aabb::new(Vec3::ZERO, Vec3::ONE)));
        let index = MeshIndex::build(&graph);
        let labels = [label("Unknown", [1.0, 0.0, 0.0]), label("Aorta", [0.0; 3]), label("Other", [0.0, 1.0, 0.0])];

        let anchors = locate_all(&graph, &index, &labels);
        assert_eq!(anchors.len(), labels.len());
        assert_eq!(anchors[0].source, AnchorSource::Fallback);
        assert!(matches!(anchors[1].source, AnchorSource::Mesh { .. }));
        assert_eq!(anchors[2].position, Vec3::new(0.0, 1.0, 0.0));
    }
}
