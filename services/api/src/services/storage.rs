//! Object storage adapter (S3)
//!
//! Uploads product and profile images under fixed key prefixes and serves
//! public URLs for them. The S3 client is built once at startup and shared.

use anyhow::Result;
use aws_sdk_s3::{Client, primitives::ByteStream};
use tracing::info;
use uuid::Uuid;

use crate::config::StorageConfig;

/// Content types accepted for image uploads
pub const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Where an upload lands and how large it may be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPreset {
    Product,
    Profile,
}

impl UploadPreset {
    pub fn prefix(&self) -> &'static str {
        match self {
            UploadPreset::Product => "health-ecommerce/products/",
            UploadPreset::Profile => "health-ecommerce/profiles/",
        }
    }

    pub fn max_bytes(&self) -> usize {
        match self {
            UploadPreset::Product => 5 * 1024 * 1024,
            UploadPreset::Profile => 2 * 1024 * 1024,
        }
    }
}

/// Check an incoming content type against the image allow-list
pub fn is_allowed_content_type(content_type: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&content_type)
}

/// A stored object with its public URL and bucket key
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub url: String,
    pub key: String,
}

#[derive(Clone)]
pub struct StorageService {
    client: Client,
    bucket: String,
    public_base_url: Option<String>,
}

impl StorageService {
    pub fn new(client: Client, config: &StorageConfig) -> Self {
        Self {
            client,
            bucket: config.bucket.clone(),
            public_base_url: config.public_base_url.clone(),
        }
    }

    /// Upload image bytes under the preset's prefix
    ///
    /// The key embeds a fresh UUID so repeated uploads of the same filename
    /// never collide.
    pub async fn upload(
        &self,
        preset: UploadPreset,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject> {
        let key = format!(
            "{}{}-{}",
            preset.prefix(),
            Uuid::new_v4(),
            sanitize_filename(filename)
        );

        info!("Uploading {} bytes to s3://{}/{}", bytes.len(), self.bucket, key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {}", e))?;

        let url = build_object_url(self.public_base_url.as_deref(), &self.bucket, &key);

        Ok(StoredObject { url, key })
    }

    /// Delete an object by key
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 delete failed: {}", e))?;

        info!("Deleted s3://{}/{}", self.bucket, key);
        Ok(())
    }

    /// Recover the bucket key from a URL this service produced
    ///
    /// Returns `None` for URLs that do not belong to this bucket, so stale
    /// references from other sources are left alone.
    pub fn key_from_url(&self, url: &str) -> Option<String> {
        let base = build_object_url(self.public_base_url.as_deref(), &self.bucket, "");
        url.strip_prefix(&base)
            .filter(|key| !key.is_empty())
            .map(|key| key.to_string())
    }
}

fn build_object_url(public_base_url: Option<&str>, bucket: &str, key: &str) -> String {
    match public_base_url {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), key),
        None => format!("https://{}.s3.amazonaws.com/{}", bucket, key),
    }
}

/// Keep only characters that are safe inside an S3 key segment
fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
