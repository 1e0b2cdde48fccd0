//! Scoped file previews.
//!
//! A [`PreviewHandle`] exists exactly as long as the file it previews is
//! selected. Replacing or clearing the file drops the handle, and the
//! [`PreviewTracker`] that issued it counts how many are still alive.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hirepipe_shared::UploadedFile;

/// Maximum characters of inline text shown for a text upload.
const PREVIEW_CHARS: usize = 600;

/// Issues preview handles and counts the live ones.
#[derive(Debug, Clone, Default)]
pub struct PreviewTracker {
    live: Arc<AtomicUsize>,
}

impl PreviewTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a preview for `file`. Released when the handle is dropped.
    pub fn acquire(&self, file: &UploadedFile) -> PreviewHandle {
        self.live.fetch_add(1, Ordering::SeqCst);
        PreviewHandle {
            text: render_preview(file),
            live: Arc::clone(&self.live),
        }
    }

    /// Number of handles not yet released.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// A short textual preview of a selected file.
#[derive(Debug)]
pub struct PreviewHandle {
    text: String,
    live: Arc<AtomicUsize>,
}

impl PreviewHandle {
    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

fn render_preview(file: &UploadedFile) -> String {
    if file.is_text() {
        let text = String::from_utf8_lossy(&file.bytes);
        let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
        if text.chars().count() > PREVIEW_CHARS {
            preview.push('…');
        }
        preview
    } else {
        format!(
            "{} ({}, {} bytes)",
            file.file_name,
            file.content_type,
            file.bytes.len()
        )
    }
}

/// A selected file together with its live preview.
#[derive(Debug)]
pub struct SelectedFile {
    pub file: UploadedFile,
    preview: PreviewHandle,
}

impl SelectedFile {
    pub fn new(file: UploadedFile, tracker: &PreviewTracker) -> Self {
        let preview = tracker.acquire(&file);
        Self { file, preview }
    }

    pub fn preview(&self) -> &str {
        self.preview.text()
    }
}
