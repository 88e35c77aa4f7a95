//! Image upload through the browser's native file dialog
//!
//! Uses JavaScript interop: a hidden `<input type="file">` is clicked and
//! the chosen file is read with a `FileReader`. Results land in a shared
//! queue that a Bevy system drains into classification requests.

use bevy::prelude::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::app::{Session, ViewerUi};
use crate::network::{classify_upload, PendingClassification, ServerConfig};

/// Accepted image types for the upload dialog
pub const IMAGE_ACCEPT: &str = "image/*";

pub struct FilePickerPlugin;

impl Plugin for FilePickerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingUploads>()
            .add_systems(Update, process_uploads);
    }
}

/// A file read from the dialog
#[derive(Debug, Clone)]
pub struct PickedFile {
    /// Filename (without path)
    pub filename: String,
    pub content: Vec<u8>,
}

/// Files picked by the user, filled from JavaScript callbacks
#[derive(Resource, Default)]
pub struct PendingUploads(pub Arc<Mutex<VecDeque<PickedFile>>>);

/// Hand picked images to the classifier
fn process_uploads(
    pending: Res<PendingUploads>,
    server_config: Res<ServerConfig>,
    classification: Res<PendingClassification>,
    mut session: ResMut<Session>,
    mut ui: ResMut<ViewerUi>,
) {
    let Ok(mut uploads) = pending.0.try_lock() else {
        return;
    };
    // Only the most recent pick matters
    let Some(file) = uploads.drain(..).last() else {
        return;
    };

    tracing::info!("Image selected: {} ({} bytes)", file.filename, file.content.len());
    let detection = session.begin_detection();
    ui.upload_name = Some(file.filename);
    ui.predicted = None;
    classify_upload(file.content, detection, &server_config, &classification);
}

// ============================================================================
// JavaScript Interop (WASM only)
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod js_interop {
    use super::*;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::HtmlInputElement;

    /// Open a file picker dialog using HTML input element
    pub fn open_file_picker(accept: &str, pending: Arc<Mutex<VecDeque<PickedFile>>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            tracing::error!("open_file_picker: no document object");
            return;
        };

        // Create a hidden file input element
        let input: HtmlInputElement = match document
            .create_element("input")
            .map(|el| el.dyn_into::<HtmlInputElement>())
        {
            Ok(Ok(input)) => input,
            _ => {
                tracing::error!("open_file_picker: failed to create input element");
                return;
            }
        };

        input.set_type("file");
        input.set_accept(accept);
        input.style().set_property("display", "none").ok();

        // Append to body temporarily
        let Some(body) = document.body() else {
            tracing::error!("open_file_picker: no document body");
            return;
        };
        if let Err(e) = body.append_child(&input) {
            tracing::error!("open_file_picker: failed to append input to body: {:?}", e);
            return;
        }

        let input_clone = input.clone();
        let closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            if let Some(file) = input_clone.files().and_then(|files| files.get(0)) {
                read_file(file, pending.clone());
            }

            // Remove the input element
            if let Some(parent) = input_clone.parent_node() {
                parent.remove_child(&input_clone).ok();
            }
        }) as Box<dyn FnMut(_)>);

        input.set_onchange(Some(closure.as_ref().unchecked_ref()));
        closure.forget();

        input.click();
    }

    fn read_file(file: web_sys::File, pending: Arc<Mutex<VecDeque<PickedFile>>>) {
        let filename = file.name();
        let reader = match web_sys::FileReader::new() {
            Ok(reader) => reader,
            Err(e) => {
                tracing::error!("read_file: failed to create FileReader: {:?}", e);
                return;
            }
        };
        let reader_clone = reader.clone();

        let onload = Closure::wrap(Box::new(move |_: web_sys::Event| {
            let buffer = reader_clone
                .result()
                .ok()
                .and_then(|result| result.dyn_into::<js_sys::ArrayBuffer>().ok());
            let Some(buffer) = buffer else {
                tracing::error!("read_file: could not read {}", filename);
                return;
            };
            let content = js_sys::Uint8Array::new(&buffer).to_vec();

            if let Ok(mut files) = pending.lock() {
                files.push_back(PickedFile {
                    filename: filename.clone(),
                    content,
                });
            }
        }) as Box<dyn FnMut(_)>);

        reader.set_onload(Some(onload.as_ref().unchecked_ref()));
        onload.forget();

        reader.read_as_array_buffer(&file).ok();
    }
}

// Non-WASM stub
#[cfg(not(target_arch = "wasm32"))]
mod js_interop {
    use super::*;

    pub fn open_file_picker(accept: &str, _pending: Arc<Mutex<VecDeque<PickedFile>>>) {
        tracing::warn!("File picker ({}) not supported on this platform", accept);
    }
}

pub use js_interop::open_file_picker;

/// Helper to open the image dialog from UI
pub fn trigger_image_upload(pending: &PendingUploads) {
    open_file_picker(IMAGE_ACCEPT, pending.0.clone());
}
