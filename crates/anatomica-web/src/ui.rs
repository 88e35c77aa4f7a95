//! UI overlays using bevy_egui

use anatomica_core::selection::Border;
use anatomica_core::{HighlightStyle, LabelSource, OverlayPlacement, SessionStatus, Viewport};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};

use crate::app::{CameraSettings, LoadOrgan, Session, ViewerUi, ZoomStep};
use crate::file_picker::{trigger_image_upload, PendingUploads};
use crate::scene::update_camera;

const PANEL_WIDTH: f32 = 280.0;
const GLOW_COLOR: egui::Color32 = egui::Color32::from_rgb(255, 217, 51);

/// Grouped system parameters for the main UI system
#[derive(SystemParam)]
pub struct UiParams<'w, 's> {
    pub contexts: EguiContexts<'w, 's>,
    pub session: ResMut<'w, Session>,
    pub viewer_ui: ResMut<'w, ViewerUi>,
    pub uploads: Res<'w, PendingUploads>,
    pub load_requests: MessageWriter<'w, LoadOrgan>,
    pub zoom_steps: MessageWriter<'w, ZoomStep>,
}

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        // Overlay positions follow the camera of this frame
        app.add_systems(Update, project_overlays.after(update_camera))
            // Main UI system runs in EguiPrimaryContextPass for proper input handling (bevy_egui 0.38+)
            .add_systems(EguiPrimaryContextPass, ui_system);
    }
}

/// Project every label anchor to screen space for this frame
fn project_overlays(
    windows: Query<&Window>,
    settings: Res<CameraSettings>,
    mut session: ResMut<Session>,
) {
    // A missing window projects everything as hidden
    let viewport = windows
        .single()
        .map(|window| Viewport::new(window.width(), window.height()))
        .unwrap_or(Viewport::new(0.0, 0.0));
    session.project_frame(&settings.view(), viewport);
}

/// One overlay to draw this frame
struct Overlay {
    index: usize,
    pos: egui::Pos2,
    name: String,
    style: HighlightStyle,
}

fn ui_system(mut params: UiParams) {
    let Ok(ctx) = params.contexts.ctx_mut() else { return };
    let session = &mut params.session;
    let viewer_ui = &mut params.viewer_ui;

    let mut clicked_label: Option<usize> = None;

    egui::SidePanel::left("organ_panel")
        .default_width(PANEL_WIDTH)
        .resizable(true)
        .show(ctx, |ui| {
            ui.heading("Anatomica");
            ui.separator();

            // Status line
            let status = session.status();
            let status_text = status.message();
            if matches!(status, SessionStatus::Failed(_)) {
                ui.colored_label(egui::Color32::from_rgb(230, 80, 80), status_text);
            } else {
                ui.label(status_text);
            }
            if let Some(organ) = viewer_ui.predicted {
                ui.label(format!("Predicted organ: {}", organ));
            }

            ui.add_space(8.0);

            // Image upload
            ui.horizontal(|ui| {
                if ui.button("Upload image").clicked() {
                    trigger_image_upload(&params.uploads);
                }
                if let Some(name) = &viewer_ui.upload_name {
                    ui.label(egui::RichText::new(name).small().weak());
                }
            });

            ui.add_space(8.0);

            // Organ picker
            let chosen_name = viewer_ui
                .catalog
                .iter()
                .find(|info| info.key == viewer_ui.chosen)
                .map(|info| info.name.clone())
                .unwrap_or_else(|| viewer_ui.chosen.display_name().to_string());
            let organs: Vec<_> = viewer_ui
                .catalog
                .iter()
                .map(|info| (info.key, info.name.clone()))
                .collect();

            let mut chosen = viewer_ui.chosen;
            ui.horizontal(|ui| {
                egui::ComboBox::from_id_salt("organ_select")
                    .selected_text(chosen_name)
                    .show_ui(ui, |ui| {
                        for (key, name) in &organs {
                            ui.selectable_value(&mut chosen, *key, name.as_str());
                        }
                    });
                if ui.button("Load").clicked() {
                    params.load_requests.write(LoadOrgan(chosen));
                }
            });
            viewer_ui.chosen = chosen;

            // Zoom buttons
            ui.horizontal(|ui| {
                ui.label("Zoom");
                if ui.button(" + ").clicked() {
                    params.zoom_steps.write(ZoomStep::In);
                }
                if ui.button(" − ").clicked() {
                    params.zoom_steps.write(ZoomStep::Out);
                }
            });

            ui.separator();

            // Label list
            ui.horizontal(|ui| {
                ui.strong("Labels");
                match session.label_source() {
                    Some(LabelSource::Generated) => ui.label(egui::RichText::new("generated").small().weak()),
                    Some(LabelSource::Fallback) => ui.label(egui::RichText::new("built-in").small().weak()),
                    None => ui.label(""),
                };
            });

            let selected = session.selection().selected();
            egui::ScrollArea::vertical()
                .id_salt("label_list")
                .max_height(ui.available_height() * 0.55)
                .show(ui, |ui| {
                    if session.labels().is_empty() {
                        ui.label(egui::RichText::new("No labels").weak());
                    }
                    for (index, label) in session.labels().iter().enumerate() {
                        let text = if session.highlight(index).is_emphasized() {
                            egui::RichText::new(&label.name).strong()
                        } else {
                            egui::RichText::new(&label.name)
                        };
                        if ui.selectable_label(selected == Some(index), text).clicked() {
                            clicked_label = Some(index);
                        }
                    }
                });

            ui.separator();

            // Description panel
            match session.selected_label() {
                Some(label) => {
                    ui.heading(label.name.as_str());
                    if label.description.is_empty() {
                        ui.label(egui::RichText::new("No description available").weak());
                    } else {
                        ui.label(label.description.as_str());
                    }
                }
                None => {
                    ui.label(egui::RichText::new("Select a label to see its description").weak());
                }
            }
        });

    // Per-label overlays at their projected positions
    let overlays: Vec<Overlay> = session
        .placements()
        .iter()
        .zip(session.labels())
        .enumerate()
        .filter_map(|(index, (placement, label))| match placement {
            OverlayPlacement::Visible { x, y } => Some(Overlay {
                index,
                pos: egui::pos2(*x, *y),
                name: label.name.clone(),
                style: session.highlight(index),
            }),
            OverlayPlacement::Hidden => None,
        })
        .collect();

    for overlay in overlays {
        if show_overlay(ctx, &overlay) {
            clicked_label = Some(overlay.index);
        }
    }

    if let Some(index) = clicked_label {
        if let Err(e) = session.select(index) {
            tracing::warn!("Selection failed: {}", e);
        }
    }
}

/// Draw one overlay; returns whether it was clicked
fn show_overlay(ctx: &egui::Context, overlay: &Overlay) -> bool {
    let alpha = (overlay.style.opacity.clamp(0.0, 1.0) * 255.0) as u8;
    let stroke = match overlay.style.border {
        Border::Glow => egui::Stroke::new(2.0, GLOW_COLOR),
        Border::Plain => egui::Stroke::new(1.0, egui::Color32::from_gray(120)),
    };

    egui::Area::new(egui::Id::new(("label_overlay", overlay.index)))
        .fixed_pos(overlay.pos)
        .pivot(egui::Align2::CENTER_BOTTOM)
        .order(egui::Order::Middle)
        .show(ctx, |ui| {
            egui::Frame::default()
                .fill(egui::Color32::from_rgba_unmultiplied(20, 20, 20, alpha))
                .stroke(stroke)
                .inner_margin(egui::Margin::symmetric(6, 3))
                .show(ui, |ui| {
                    let text = egui::RichText::new(&overlay.name)
                        .color(egui::Color32::from_rgba_unmultiplied(240, 240, 240, alpha));
                    ui.add(egui::Label::new(text).sense(egui::Sense::click()))
                        .on_hover_cursor(egui::CursorIcon::PointingHand)
                        .clicked()
                })
                .inner
        })
        .inner
}
