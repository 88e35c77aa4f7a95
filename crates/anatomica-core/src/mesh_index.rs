//! Flat, ordered lookup of drawable nodes in a model

use crate::scene::{NodeId, SceneGraph};

/// Reference to a drawable node, carrying its name for matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshRef {
    pub node: NodeId,
    pub name: String,
    /// Lowercased name, precomputed for case-insensitive matching
    pub(crate) key: String,
}

/// Drawable nodes of one model in traversal order
///
/// Purely a derived view of a [`SceneGraph`]: rebuild it whenever the
/// graph is replaced.
#[derive(Debug, Clone, Default)]
pub struct MeshIndex {
    meshes: Vec<MeshRef>,
}

impl MeshIndex {
    /// Collect every drawable node in depth-first pre-order
    pub fn build(graph: &SceneGraph) -> Self {
        let meshes = graph
            .pre_order()
            .into_iter()
            .filter_map(|id| {
                let node = graph.node(id)?;
                node.is_mesh().then(|| MeshRef {
                    node: id,
                    name: node.name.clone(),
                    key: node.name.to_lowercase(),
                })
            })
            .collect();
        Self { meshes }
    }

    pub fn iter(&self) -> impl Iterator<Item = &MeshRef> {
        self.meshes.iter()
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&MeshRef> {
        self.meshes.get(position)
    }
}
