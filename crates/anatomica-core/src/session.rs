//! Viewer session: owns everything derived from the current model load
//!
//! A session moves through `Idle -> (Detecting) -> Loading -> Ready` or
//! `Failed`. Each call to [`ViewerSession::begin_load`] hands out a fresh
//! [`LoadToken`] and discards the previous model, index, anchors, and
//! selection. Completions carrying an older token are rejected, so a slow
//! load can never overwrite the state of a newer one. Image classification
//! is guarded the same way by a [`DetectionToken`]: any later upload or
//! load supersedes it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::anchor::{locate_all, Anchor};
use crate::framing::{frame, CameraParams, CameraView};
use crate::label::{LabelEntry, LabelSet, LabelSource};
use crate::mesh_index::MeshIndex;
use crate::organ::OrganKey;
use crate::projector::{LabelProjector, OverlayPlacement, Viewport};
use crate::scene::{NodeTransform, SceneGraph};
use crate::selection::{HighlightStyle, Highlighter, SelectionError, SelectionState};

/// Status message shown when a model fails to load
pub const LOAD_ERROR_MESSAGE: &str = "Error loading 3D model";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("Stale load {received:?}, current load is {current:?}")]
    StaleLoad {
        received: LoadToken,
        current: Option<LoadToken>,
    },
    #[error("Stale detection {received:?}, current detection is {current:?}")]
    StaleDetection {
        received: DetectionToken,
        current: Option<DetectionToken>,
    },
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Identifies one model load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoadToken(u64);

impl LoadToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Identifies one image classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DetectionToken(u64);

impl DetectionToken {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionStatus {
    #[default]
    Idle,
    Detecting,
    Loading(OrganKey),
    Ready(OrganKey),
    Failed(String),
}

impl SessionStatus {
    pub fn message(&self) -> String {
        match self {
            SessionStatus::Idle => "Select an organ or upload an image".to_string(),
            SessionStatus::Detecting => "Detecting organ...".to_string(),
            SessionStatus::Loading(organ) => format!("Loading {} model...", organ.display_name()),
            SessionStatus::Ready(organ) => format!("{} model loaded", organ.display_name()),
            SessionStatus::Failed(message) => message.clone(),
        }
    }
}

/// State for the currently displayed organ
#[derive(Debug, Default)]
pub struct ViewerSession {
    status: SessionStatus,
    next_token: u64,
    current: Option<LoadToken>,
    next_detection: u64,
    detection: Option<DetectionToken>,
    organ: Option<OrganKey>,
    graph: Option<SceneGraph>,
    index: Option<MeshIndex>,
    camera: CameraParams,
    label_source: Option<LabelSource>,
    labels: Vec<LabelEntry>,
    anchors: Vec<Anchor>,
    /// Bumped whenever `anchors` is rebuilt or cleared
    anchor_revision: u64,
    placements: Vec<OverlayPlacement>,
    highlighter: Highlighter,
    projector: LabelProjector,
}

impl ViewerSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn organ(&self) -> Option<OrganKey> {
        self.organ
    }

    pub fn current_load(&self) -> Option<LoadToken> {
        self.current
    }

    pub fn camera(&self) -> &CameraParams {
        &self.camera
    }

    pub fn graph(&self) -> Option<&SceneGraph> {
        self.graph.as_ref()
    }

    /// Root transform the renderer should apply to the loaded model
    pub fn model_transform(&self) -> Option<NodeTransform> {
        self.graph.as_ref().map(|g| *g.root_transform())
    }

    pub fn labels(&self) -> &[LabelEntry] {
        &self.labels
    }

    pub fn label_source(&self) -> Option<LabelSource> {
        self.label_source
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    pub fn anchor_revision(&self) -> u64 {
        self.anchor_revision
    }

    pub fn placements(&self) -> &[OverlayPlacement] {
        &self.placements
    }

    pub fn selection(&self) -> SelectionState {
        self.highlighter.state()
    }

    pub fn selected_label(&self) -> Option<&LabelEntry> {
        self.selection().selected().and_then(|i| self.labels.get(i))
    }

    pub fn highlight(&self, index: usize) -> HighlightStyle {
        self.highlighter.style(index).unwrap_or_default()
    }

    pub fn current_detection(&self) -> Option<DetectionToken> {
        self.detection
    }

    /// Mark that an uploaded image is being classified
    pub fn begin_detection(&mut self) -> DetectionToken {
        self.next_detection += 1;
        let token = DetectionToken(self.next_detection);
        self.detection = Some(token);
        self.status = SessionStatus::Detecting;
        tracing::debug!(detection = token.0, "Classifying upload");
        token
    }

    /// Accept a classification result, returning the organ to load
    ///
    /// Only the latest detection is honored, and only while no load has
    /// been started since it began.
    pub fn detection_finished(&mut self, token: DetectionToken, organ: OrganKey) -> Result<OrganKey, SessionError> {
        if self.detection != Some(token) {
            let err = SessionError::StaleDetection {
                received: token,
                current: self.detection,
            };
            tracing::debug!(error = %err, %organ, "Dropping stale classification");
            return Err(err);
        }
        self.detection = None;
        Ok(organ)
    }

    /// Start loading `organ`, discarding everything derived from the previous model
    pub fn begin_load(&mut self, organ: OrganKey) -> LoadToken {
        self.next_token += 1;
        let token = LoadToken(self.next_token);
        self.clear_derived();
        self.detection = None;
        self.current = Some(token);
        self.organ = Some(organ);
        self.status = SessionStatus::Loading(organ);
        tracing::info!(%organ, load = token.0, "Loading model");
        token
    }

    /// Accept a finished model: frame it, index it, and anchor any labels
    pub fn model_loaded(&mut self, token: LoadToken, mut graph: SceneGraph) -> Result<CameraParams, SessionError> {
        self.check_token(token)?;

        let camera = frame(&mut graph);
        self.index = Some(MeshIndex::build(&graph));
        self.graph = Some(graph);
        self.camera = camera;
        self.rebuild_anchors();

        if let Some(organ) = self.organ {
            self.status = SessionStatus::Ready(organ);
        }
        tracing::info!(
            load = token.0,
            meshes = self.index.as_ref().map_or(0, |i| i.len()),
            "Model ready"
        );
        Ok(camera)
    }

    pub fn model_failed(&mut self, token: LoadToken, reason: &str) -> Result<(), SessionError> {
        self.check_token(token)?;
        tracing::error!(load = token.0, error = %reason, "Failed to load model");
        self.graph = None;
        self.index = None;
        self.anchors.clear();
        self.anchor_revision += 1;
        self.placements.clear();
        self.status = SessionStatus::Failed(LOAD_ERROR_MESSAGE.to_string());
        Ok(())
    }

    /// Install the label set for the current load
    ///
    /// Labels may arrive before or after the model. Anchors are built as
    /// soon as both are present.
    pub fn labels_ready(&mut self, token: LoadToken, set: LabelSet) -> Result<(), SessionError> {
        self.check_token(token)?;
        tracing::debug!(organ = %set.organ, source = ?set.source, count = set.labels.len(), "Labels ready");
        self.label_source = Some(set.source);
        self.labels = set.labels;
        self.highlighter = Highlighter::new(self.labels.len());
        self.rebuild_anchors();
        Ok(())
    }

    /// Select a label by index; marker, overlay, and list share the result
    pub fn select(&mut self, index: usize) -> Result<(), SessionError> {
        self.highlighter.select(index)?;
        Ok(())
    }

    /// Project every anchor for this frame
    pub fn project_frame(&mut self, camera: &CameraView, viewport: Viewport) -> &[OverlayPlacement] {
        self.placements = self.projector.project_all(&self.anchors, camera, viewport);
        &self.placements
    }

    /// Return to the idle state, dropping the model and any pending load
    pub fn reset(&mut self) {
        self.clear_derived();
        self.current = None;
        self.detection = None;
        self.organ = None;
        self.status = SessionStatus::Idle;
    }

    fn check_token(&self, token: LoadToken) -> Result<(), SessionError> {
        if self.current == Some(token) {
            return Ok(());
        }
        let err = SessionError::StaleLoad {
            received: token,
            current: self.current,
        };
        tracing::debug!(error = %err, "Dropping stale load result");
        Err(err)
    }

    fn rebuild_anchors(&mut self) {
        let (Some(graph), Some(index)) = (&self.graph, &self.index) else {
            return;
        };
        self.anchors = locate_all(graph, index, &self.labels);
        self.placements = vec![OverlayPlacement::Hidden; self.anchors.len()];
        self.anchor_revision += 1;
    }

    fn clear_derived(&mut self) {
        self.graph = None;
        self.index = None;
        self.camera = CameraParams::initial();
        self.label_source = None;
        self.labels.clear();
        self.anchors.clear();
        self.anchor_revision += 1;
        self.placements.clear();
        self.highlighter = Highlighter::default();
    }
}
