//! Engine-independent snapshot of a loaded model hierarchy
//!
//! The frontend walks the spawned glTF entity tree once after a model
//! finishes loading and records every node here: its name, its local
//! transform, and (for drawable primitives) the local-space bounding box
//! of its geometry. Everything downstream of the load (mesh index, name
//! resolution, anchoring, framing) works on this graph instead of on
//! rendering-engine entities.

use glam::{Mat4, Quat, Vec3};

/// Index of a node within a [`SceneGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// An inverted box that any point will expand
    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, or `None` for no points
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut aabb = Self::EMPTY;
        for point in points {
            aabb.extend(point);
        }
        (!aabb.is_empty()).then_some(aabb)
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    /// Largest of width, height and depth
    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }

    /// Radius of the sphere through the box corners (half the diagonal)
    pub fn bounding_sphere_radius(&self) -> f32 {
        self.size().length() * 0.5
    }

    /// Box enclosing the eight transformed corners
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let (lo, hi) = (self.min, self.max);
        let corners = [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ];
        let mut out = Aabb::EMPTY;
        for corner in corners {
            out.extend(matrix.transform_point3(corner));
        }
        out
    }
}

/// Local transform of a node (translation, rotation, scale)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl NodeTransform {
    pub const IDENTITY: NodeTransform = NodeTransform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A single node in the hierarchy
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: NodeTransform,
    /// Local-space bounds of the node's geometry; `Some` marks a drawable primitive
    pub geometry: Option<Aabb>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl SceneNode {
    pub fn is_mesh(&self) -> bool {
        self.geometry.is_some()
    }
}

/// Arena-backed model hierarchy with a single root
#[derive(Debug, Clone)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
}

impl SceneGraph {
    /// Create a graph holding only a root node
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![SceneNode {
                name: root_name.into(),
                transform: NodeTransform::IDENTITY,
                geometry: None,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a child node under `parent`
    ///
    /// Panics if `parent` does not belong to this graph.
    pub fn add_node(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        transform: NodeTransform,
        geometry: Option<Aabb>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            name: name.into(),
            transform,
            geometry,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root_transform(&self) -> &NodeTransform {
        &self.nodes[0].transform
    }

    pub fn root_transform_mut(&mut self) -> &mut NodeTransform {
        &mut self.nodes[0].transform
    }

    /// Node ids in depth-first pre-order starting at the root
    pub fn pre_order(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            // Push in reverse so the first child is visited first
            for &child in self.nodes[id.0].children.iter().rev() {
                stack.push(child);
            }
        }
        order
    }

    /// Accumulated transform from node-local space to world space
    pub fn world_matrix(&self, id: NodeId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node_id) = current {
            let Some(node) = self.node(node_id) else {
                break;
            };
            matrix = node.transform.to_matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    /// World-space bounds of every drawable node, `None` if there is no geometry
    pub fn world_bounds(&self) -> Option<Aabb> {
        let mut bounds: Option<Aabb> = None;
        for id in self.pre_order() {
            let node = &self.nodes[id.0];
            if let Some(local) = node.geometry {
                let world = local.transformed(&self.world_matrix(id));
                bounds = Some(match bounds {
                    Some(b) => b.union(&world),
                    None => world,
                });
            }
        }
        bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5))
    }

    #[test]
    fn test_pre_order_visits_first_child_first() {
        let mut graph = SceneGraph::new("root");
        let a = graph.add_node(graph.root(), "a", NodeTransform::IDENTITY, None);
        let b = graph.add_node(graph.root(), "b", NodeTransform::IDENTITY, None);
        let a1 = graph.add_node(a, "a1", NodeTransform::IDENTITY, None);

        assert_eq!(graph.pre_order(), vec![graph.root(), a, a1, b]);
    }

    #[test]
    fn test_world_matrix_composes_ancestors() {
        let mut graph = SceneGraph::new("root");
        *graph.root_transform_mut() = NodeTransform::IDENTITY.with_scale(Vec3::splat(2.0));
        let child = graph.add_node(
            graph.root(),
            "child",
            NodeTransform::from_translation(Vec3::new(1.0, 0.0, 0.0)),
            None,
        );

        let world = graph.world_matrix(child).transform_point3(Vec3::ZERO);
        assert!((world - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_world_bounds_unions_meshes() {
        let mut graph = SceneGraph::new("root");
        graph.add_node(graph.root(), "left", NodeTransform::from_translation(Vec3::new(-2.0, 0.0, 0.0)), Some(unit_box()));
        graph.add_node(graph.root(), "right", NodeTransform::from_translation(Vec3::new(2.0, 0.0, 0.0)), Some(unit_box()));

        let bounds = graph.world_bounds().unwrap();
        assert_eq!(bounds.size(), Vec3::new(5.0, 1.0, 1.0));
        assert_eq!(bounds.center(), Vec3::ZERO);
    }

    #[test]
    fn test_world_bounds_none_without_geometry() {
        let graph = SceneGraph::new("root");
        assert!(graph.world_bounds().is_none());
        assert_eq!(Aabb::EMPTY.size(), Vec3::ZERO);
    }
}
