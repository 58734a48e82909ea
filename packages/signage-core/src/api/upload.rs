//! Multipart media uploads.
//!
//! The file part is streamed to `<uploads_dir>/<name>.part` and renamed to
//! its final name once complete. Until the handler calls
//! [`PendingMedia::keep`], the file is owned by a drop guard: an early
//! return, a failed insert or a dropped request future all remove it, so an
//! aborted upload never leaves an orphaned file or a half-registered item.

use std::path::{Path, PathBuf};

use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use tokio::io::AsyncWriteExt;

use crate::content::MediaKind;
use crate::error::{SignageError, SignageResult};
use crate::protocol_constants::TEMP_FILE_SUFFIX;
use crate::utils::{coerce_integer, now_millis};

/// Slack on top of the file limit for multipart framing and text fields.
const FORM_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Longest file extension carried over from the client's file name.
const MAX_EXTENSION_LEN: usize = 16;

/// Writes uploaded media to disk and maps stored names to public URLs.
#[derive(Debug, Clone)]
pub struct MediaUploader {
    dir: PathBuf,
    url_prefix: String,
    max_bytes: u64,
}

impl MediaUploader {
    /// Creates an uploader, creating `dir` if needed.
    pub fn new(dir: PathBuf, url_prefix: &str, max_bytes: u64) -> std::io::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
            max_bytes,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Request body limit for the upload route.
    pub fn body_limit(&self) -> usize {
        usize::try_from(self.max_bytes.saturating_add(FORM_OVERHEAD_BYTES)).unwrap_or(usize::MAX)
    }

    /// Public URL of a stored file.
    pub fn public_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.url_prefix, file_name)
    }

    /// Reads the whole form, storing the `file` part on disk.
    ///
    /// # Errors
    ///
    /// [`SignageError::PayloadTooLarge`] if the file or the body exceeds the
    /// configured limit, [`SignageError::Validation`] for malformed forms.
    pub async fn receive(&self, mut multipart: Multipart) -> SignageResult<UploadForm> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| self.form_error(e))? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    if form.file.is_some() {
                        return Err(SignageError::Validation(
                            "Only one file may be uploaded per request".to_string(),
                        ));
                    }
                    form.file = Some(self.store_field(field).await?);
                }
                "title" => form.title = Some(self.text(field).await?),
                "duration" => form.duration = Some(self.text(field).await?),
                "playlistName" => form.playlist_name = Some(self.text(field).await?),
                "order" => form.order = Some(self.text(field).await?),
                "tenantId" => form.tenant_id = Some(self.text(field).await?),
                other => log::debug!("[Upload] Ignoring form field '{}'", other),
            }
        }

        Ok(form)
    }

    async fn text(&self, field: Field<'_>) -> SignageResult<String> {
        field.text().await.map_err(|e| self.form_error(e))
    }

    async fn store_field(&self, mut field: Field<'_>) -> SignageResult<PendingMedia> {
        let content_type = field.content_type().map(str::to_string);
        let file_name = stored_file_name(field.file_name());
        let final_path = self.dir.join(&file_name);
        let temp_path = self.dir.join(format!("{file_name}{TEMP_FILE_SUFFIX}"));

        // Guard first, so the temp file is removed on every error path below.
        let mut pending = PendingMedia {
            path: temp_path.clone(),
            file_name,
            content_type,
            size: 0,
            kept: false,
        };

        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| SignageError::Internal(format!("Failed to create upload file: {e}")))?;

        while let Some(chunk) = field.chunk().await.map_err(|e| self.form_error(e))? {
            pending.size += chunk.len() as u64;
            if pending.size > self.max_bytes {
                return Err(self.too_large());
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| SignageError::Internal(format!("Failed to write upload: {e}")))?;
        }
        file.flush()
            .await
            .map_err(|e| SignageError::Internal(format!("Failed to write upload: {e}")))?;
        drop(file);

        tokio::fs::rename(&temp_path, &final_path)
            .await
            .map_err(|e| SignageError::Internal(format!("Failed to finalize upload: {e}")))?;
        pending.path = final_path;
        Ok(pending)
    }

    fn form_error(&self, err: MultipartError) -> SignageError {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            self.too_large()
        } else {
            SignageError::Validation(err.body_text())
        }
    }

    fn too_large(&self) -> SignageError {
        SignageError::PayloadTooLarge(format!(
            "File exceeds the maximum upload size of {}",
            format_size(self.max_bytes)
        ))
    }
}

/// Fields of an upload form, as received.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<PendingMedia>,
    pub title: Option<String>,
    pub duration: Option<String>,
    pub playlist_name: Option<String>,
    pub order: Option<String>,
    pub tenant_id: Option<String>,
}

impl UploadForm {
    /// Item duration. Blank or `0` fall back to the default.
    pub fn duration_seconds(&self) -> SignageResult<Option<u32>> {
        match optional_integer(self.duration.as_deref(), "duration")? {
            None | Some(0) => Ok(None),
            Some(n) => u32::try_from(n).map(Some).map_err(|_| {
                SignageError::Validation("duration must be a positive integer".to_string())
            }),
        }
    }

    pub fn playlist_order(&self) -> SignageResult<Option<i64>> {
        optional_integer(self.order.as_deref(), "order")
    }
}

fn optional_integer(raw: Option<&str>, field: &str) -> SignageResult<Option<i64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => coerce_integer(&serde_json::Value::String(s.to_string()))
            .map(Some)
            .ok_or_else(|| SignageError::Validation(format!("{field} must be an integer"))),
    }
}

/// A stored upload not yet registered as a content item.
///
/// Removed from disk on drop unless [`PendingMedia::keep`] was called.
#[derive(Debug)]
pub struct PendingMedia {
    path: PathBuf,
    file_name: String,
    content_type: Option<String>,
    size: u64,
    kept: bool,
}

impl PendingMedia {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn kind(&self) -> MediaKind {
        MediaKind::from_content_type(self.content_type.as_deref())
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Commits the file: it stays on disk after the guard is dropped.
    pub fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for PendingMedia {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("[Upload] Discarded {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("[Upload] Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// Builds `<millis>-<uuid><ext>` from the client's file name.
///
/// Only a short alphanumeric extension is kept; the client name never
/// reaches the filesystem otherwise.
fn stored_file_name(original: Option<&str>) -> String {
    let ext = original
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();
    format!("{}-{}{}", now_millis(), uuid::Uuid::new_v4().simple(), ext)
}

fn format_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MiB", bytes / MIB)
    } else {
        format!("{bytes} bytes")
    }
}
