//! services/api/src/adapters/photos.rs
//!
//! This module contains the photo storage adapter. Uploaded photos are written
//! to a local directory that the HTTP layer serves under `/uploads`.

use std::path::PathBuf;

use async_trait::async_trait;
use incident_core::ports::{PhotoStorage, PortError, PortResult};
use tracing::debug;
use uuid::Uuid;

/// Public URL prefix under which stored photos are served.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// An adapter that implements the `PhotoStorage` port on the local filesystem.
#[derive(Clone)]
pub struct LocalPhotoStorage {
    root: PathBuf,
}

impl LocalPhotoStorage {
    /// Creates a new `LocalPhotoStorage`, creating the directory if needed.
    pub async fn new(root: PathBuf) -> std::io::Result<Self> {
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }
}

/// Picks a file extension from the MIME type, falling back to the
/// uploaded file name.
fn extension_for(content_type: &str, file_name: Option<&str>) -> String {
    let from_mime = match content_type.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    };
    if let Some(ext) = from_mime {
        return ext.to_string();
    }
    file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "img".to_string())
}

#[async_trait]
impl PhotoStorage for LocalPhotoStorage {
    async fn store_photo(
        &self,
        bytes: &[u8],
        content_type: &str,
        file_name: Option<&str>,
    ) -> PortResult<String> {
        // Client file names never reach the filesystem.
        let stored_name = format!(
            "{}.{}",
            Uuid::new_v4(),
            extension_for(content_type, file_name)
        );
        let path = self.root.join(&stored_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| PortError::Unexpected(format!("failed to write photo: {e}")))?;
        debug!("Stored {} byte photo at {:?}", bytes.len(), path);
        Ok(format!("{UPLOADS_ROUTE}/{stored_name}"))
    }
}
