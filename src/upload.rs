//! Image upload pipeline: validate locally, store under a collision-resistant
//! name, resolve the public URL.
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::path::Path;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{ContentError, Result, ValidationError};
use crate::model::EntityKind;
use crate::supabase::RemoteStore;

static SAFE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]{1,8}$").expect("valid extension pattern"));

/// A locally selected file, fully read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, inferring its MIME type from the extension.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self {
            content_type: content_type_for(path).to_string(),
            file_name,
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_ascii_lowercase())
    {
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "svg" => "image/svg+xml",
        Some(ext) if ext == "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}

/// Client-side checks that run before any network call.
pub fn validate(file: &ImageFile, max_bytes: u64) -> Result<(), ValidationError> {
    if !file.content_type.starts_with("image/") {
        return Err(ValidationError::InvalidFileType(file.content_type.clone()));
    }
    if file.size() > max_bytes {
        return Err(ValidationError::FileTooLarge {
            size: file.size(),
            limit: max_bytes,
        });
    }
    Ok(())
}

/// `<folder>/<unix-millis>-<random>.<ext>`; the local file name only lends
/// its extension.
pub fn object_path(folder: &str, file_name: &str, millis: i64, suffix: &str) -> String {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| SAFE_EXTENSION.is_match(e))
        .unwrap_or_else(|| "bin".to_string());
    format!("{}/{}-{}.{}", folder, millis, suffix, ext)
}

fn random_suffix() -> String {
    let mut s = Uuid::new_v4().simple().to_string();
    s.truncate(12);
    s
}

pub struct Uploader<'a> {
    store: &'a dyn RemoteStore,
    bucket: String,
    max_bytes: u64,
}

impl<'a> Uploader<'a> {
    pub fn new(store: &'a dyn RemoteStore, bucket: impl Into<String>, max_bytes: u64) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            max_bytes,
        }
    }

    pub fn from_config(store: &'a dyn RemoteStore, cfg: &Config) -> Self {
        Self::new(store, cfg.storage.bucket.clone(), cfg.storage.max_upload_bytes)
    }

    /// Upload an image for `kind` and return its public URL.
    #[instrument(skip_all, fields(kind = %kind, file = %file.file_name, size = file.size()))]
    pub async fn upload(&self, file: &ImageFile, kind: EntityKind) -> Result<Url> {
        let folder = kind
            .image_folder()
            .ok_or(ValidationError::NoImageField(kind))?;
        validate(file, self.max_bytes)?;

        let path = object_path(
            folder,
            &file.file_name,
            Utc::now().timestamp_millis(),
            &random_suffix(),
        );
        let stored = self
            .store
            .upload_blob(&self.bucket, &path, file.bytes.clone(), &file.content_type)
            .await?;
        let url = self
            .store
            .public_url(&self.bucket, &path)
            .map_err(|_| ContentError::UrlResolutionFailed(path.clone()))?;
        info!(key = %stored.key, %url, "uploaded image");
        Ok(url)
    }
}
