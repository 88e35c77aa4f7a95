//! Anatomica Core - Label anchoring, camera framing, and viewer session
//!
//! This crate holds the engine-independent logic of the Anatomica viewer:
//! - Scene graph snapshot and mesh index of a loaded model
//! - Label-to-mesh name resolution and world-space anchoring
//! - Camera framing and orbit limits derived from model bounds
//! - Per-frame label projection and single-selection highlighting
//! - Organ catalog, fallback label tables, and label generation with timeout

pub mod anchor;
pub mod classifier;
pub mod framing;
pub mod generation;
pub mod label;
pub mod mesh_index;
pub mod organ;
pub mod projector;
pub mod resolver;
pub mod scene;
pub mod selection;
pub mod session;

pub use anchor::{locate, locate_all, Anchor, AnchorSource};
pub use classifier::{Classifier, MockClassifier};
pub use framing::{frame, zoom_step, CameraParams, CameraView, OrbitLimits, OrbitSettings};
pub use generation::{generate_organ_labels, race_generation, GenerationOutcome, LabelGenerator};
pub use label::{extract_label_array, fallback_labels, generation_prompt, LabelEntry, LabelError, LabelSet, LabelSource};
pub use mesh_index::{MeshIndex, MeshRef};
pub use organ::{catalog, OrganInfo, OrganKey, UnknownOrgan};
pub use projector::{LabelProjector, OverlayPlacement, Viewport};
pub use resolver::{resolve, MatchRule, Resolution};
pub use scene::{Aabb, NodeId, NodeTransform, SceneGraph, SceneNode};
pub use selection::{HighlightStyle, Highlighter, SelectionError, SelectionState};
pub use session::{DetectionToken, LoadToken, SessionError, SessionStatus, ViewerSession};

pub use glam;
