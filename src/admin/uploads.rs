//! Image uploads for articles and the facilitator profile

use uuid::Uuid;

use crate::backend::ObjectStorage;
use crate::config::UploadConfig;
use crate::content::object_name;
use crate::error::{Result, SiteError};

/// Accepted content types and the extension stored for each
pub const ALLOWED_TYPES: [(&str, &str); 3] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
];

/// What an image is uploaded for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Article,
    Facilitator,
}

impl ImageKind {
    pub fn bucket<'c>(&self, config: &'c UploadConfig) -> &'c str {
        match self {
            ImageKind::Article => &config.article_bucket,
            ImageKind::Facilitator => &config.facilitator_bucket,
        }
    }

    /// A fresh, collision-free object name
    pub fn object_name(&self, extension: &str) -> String {
        let id = Uuid::new_v4();
        match self {
            ImageKind::Article => format!("{}.{}", id, extension),
            ImageKind::Facilitator => format!("facilitator_{}.{}", id, extension),
        }
    }
}

/// An uploaded file as received from the admin form
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    /// Check type and size, returning the extension to store under
    pub fn validate(&self, max_bytes: usize) -> Result<&'static str> {
        let content_type = self.content_type.trim().to_ascii_lowercase();
        let extension = ALLOWED_TYPES
            .iter()
            .find(|(allowed, _)| *allowed == content_type)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| {
                SiteError::validation("image", "Please upload a JPEG, PNG or WebP image")
            })?;

        if self.bytes.is_empty() {
            return Err(SiteError::validation("image", "The image file is empty"));
        }
        if self.bytes.len() > max_bytes {
            return Err(SiteError::validation(
                "image",
                format!("Image must be smaller than {}MB", max_bytes / (1024 * 1024)),
            ));
        }
        Ok(extension)
    }
}

/// Validates and stores images, removing the ones they replace
pub struct ImageUploader<'a> {
    storage: &'a dyn ObjectStorage,
    config: &'a UploadConfig,
}

impl<'a> ImageUploader<'a> {
    pub fn new(storage: &'a dyn ObjectStorage, config: &'a UploadConfig) -> Self {
        Self { storage, config }
    }

    /// Upload an image and return its public URL
    ///
    /// When `replacing` is the URL of an earlier image, that object is removed
    /// once the new one is stored. Removal failures are only logged.
    pub async fn upload(
        &self,
        kind: ImageKind,
        upload: ImageUpload,
        replacing: Option<&str>,
    ) -> Result<String> {
        let extension = upload.validate(self.config.max_bytes)?;
        let bucket = kind.bucket(self.config);
        let name = kind.object_name(extension);

        let size = upload.bytes.len();
        let url = self
            .storage
            .upload(bucket, &name, upload.bytes, &upload.content_type)
            .await?;
        tracing::info!(
            "Uploaded {} ({} bytes) as {}/{}",
            upload.file_name,
            size,
            bucket,
            name
        );

        if let Some(old) = replacing.and_then(object_name) {
            if old != name {
                if let Err(e) = self.storage.remove(bucket, &[old.to_string()]).await {
                    tracing::warn!("Failed to remove replaced image {}: {}", old, e);
                }
            }
        }
        Ok(url)
    }
}
