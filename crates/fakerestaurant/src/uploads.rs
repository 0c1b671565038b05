//! Storage for uploaded restaurant images.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// URL prefix under which stored images are served.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Writes images into a directory and hands out their public paths.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Open the store, creating `dir` if needed.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryCreate` if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| Error::DirectoryCreate {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Directory the images live in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store an image and return its public path, e.g.
    /// `/uploads/image-1718000000000-3f9a0c1d2b4e5f60.png`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` unless the content type is JPEG or PNG and
    /// the body is non-empty, or an I/O error if the write fails.
    pub async fn save(&self, content_type: Option<&str>, bytes: &[u8]) -> Result<String> {
        let extension = image_extension(content_type).ok_or_else(|| {
            Error::invalid_argument("image must be a JPEG or PNG file")
        })?;
        if bytes.is_empty() {
            return Err(Error::invalid_argument("image is empty"));
        }

        let hash = blake3::hash(bytes).to_hex();
        let file_name = format!(
            "image-{}-{}.{extension}",
            Utc::now().timestamp_millis(),
            &hash.as_str()[..16]
        );

        tokio::fs::write(self.dir.join(&file_name), bytes).await?;
        debug!("Stored image {} ({} bytes)", file_name, bytes.len());
        Ok(format!("{PUBLIC_PREFIX}/{file_name}"))
    }

    /// Delete the file behind a public path. Failures are logged only.
    pub async fn remove(&self, public_path: &str) {
        let Some(file_name) = public_path
            .strip_prefix(PUBLIC_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\']) && *name != "..")
        else {
            warn!("Refusing to remove image outside the store: {}", public_path);
            return;
        };

        match tokio::fs::remove_file(self.dir.join(file_name)).await {
            Ok(()) => debug!("Removed image {}", file_name),
            Err(e) => warn!("Failed to remove image {}: {}", file_name, e),
        }
    }
}

/// File extension for an accepted image content type.
fn image_extension(content_type: Option<&str>) -> Option<&'static str> {
    let essence = content_type?.split(';').next()?.trim();
    if essence.eq_ignore_ascii_case("image/jpeg") || essence.eq_ignore_ascii_case("image/jpg") {
        Some("jpg")
    } else if essence.eq_ignore_ascii_case("image/png") {
        Some("png")
    } else {
        None
    }
}
