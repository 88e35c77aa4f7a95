//! Per-frame projection of anchors into viewport pixels

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::anchor::Anchor;
use crate::framing::CameraView;

/// Size of the drawing surface in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_usable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }
}

/// Where to draw one overlay this frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OverlayPlacement {
    Visible { x: f32, y: f32 },
    Hidden,
}

impl OverlayPlacement {
    pub fn is_visible(&self) -> bool {
        matches!(self, OverlayPlacement::Visible { .. })
    }
}

/// Projects world points to top-left-origin pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelProjector {
    /// Pixels the overlay is raised above its anchor
    pub vertical_offset: f32,
}

impl Default for LabelProjector {
    fn default() -> Self {
        Self {
            vertical_offset: 10.0,
        }
    }
}

impl LabelProjector {
    pub fn new(vertical_offset: f32) -> Self {
        Self { vertical_offset }
    }

    /// Combined view-projection matrix, `None` when the camera is degenerate
    fn view_projection(camera: &CameraView, viewport: Viewport) -> Option<Mat4> {
        if !viewport.is_usable() {
            return None;
        }
        if (camera.target - camera.eye).length_squared() <= f32::EPSILON {
            return None;
        }
        let view = camera.view_matrix();
        let near = camera.near.max(1e-4);
        let projection = Mat4::perspective_rh(
            camera.fov_y,
            viewport.aspect_ratio(),
            near,
            camera.far.max(near * 2.0),
        );
        let view_projection = projection * view;
        view_projection.is_finite().then_some(view_projection)
    }

    fn place(&self, view_projection: &Mat4, viewport: Viewport, position: Vec3) -> OverlayPlacement {
        let clip = *view_projection * Vec4::new(position.x, position.y, position.z, 1.0);
        if !clip.is_finite() || clip.w <= 0.0 {
            return OverlayPlacement::Hidden;
        }
        let ndc = clip.truncate() / clip.w;
        if !ndc.is_finite() || ndc.z < 0.0 || ndc.z > 1.0 {
            return OverlayPlacement::Hidden;
        }

        let x = (ndc.x + 1.0) * 0.5 * viewport.width;
        let y = (1.0 - ndc.y) * 0.5 * viewport.height - self.vertical_offset;
        OverlayPlacement::Visible { x, y }
    }

    /// Project a single anchor
    pub fn project(&self, anchor: &Anchor, camera: &CameraView, viewport: Viewport) -> OverlayPlacement {
        match Self::view_projection(camera, viewport) {
            Some(vp) => self.place(&vp, viewport, anchor.position),
            None => OverlayPlacement::Hidden,
        }
    }

    /// Project every anchor, index-aligned with the input
    pub fn project_all(
        &self,
        anchors: &[Anchor],
        camera: &CameraView,
        viewport: Viewport,
    ) -> Vec<OverlayPlacement> {
        let Some(vp) = Self::view_projection(camera, viewport) else {
            return vec![OverlayPlacement::Hidden; anchors.len()];
        };
        anchors
            .iter()
            .map(|anchor| self.place(&vp, viewport, anchor.position))
            .collect()
    }
}
