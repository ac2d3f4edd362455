//! Storage provider selection.

use std::path::PathBuf;

use compta_shared::config::StorageConfig;

use super::error::StorageError;

/// Backend holding attachment files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// S3-compatible storage: AWS S3, Cloudflare R2, MinIO
    S3 {
        /// S3 endpoint URL.
        endpoint: Option<String>,
        /// Bucket name.
        bucket: String,
        /// Key prefix inside the bucket.
        root: String,
        /// Access key ID.
        access_key_id: Option<String>,
        /// Secret access key.
        secret_access_key: Option<String>,
        /// Region.
        region: Option<String>,
    },
    /// Azure Blob Storage
    AzureBlob {
        /// Custom endpoint.
        endpoint: Option<String>,
        /// Storage account name.
        account: Option<String>,
        /// Storage account key.
        access_key: Option<String>,
        /// Container name.
        container: String,
        /// Key prefix inside the container.
        root: String,
    },
    /// Local filesystem
    LocalFs {
        /// Root directory path.
        root: PathBuf,
    },
}

impl StorageProvider {
    /// Local filesystem provider rooted at `root`.
    #[must_use]
    pub fn local_fs(root: impl Into<PathBuf>) -> Self {
        Self::LocalFs { root: root.into() }
    }

    /// Builds the provider described by the `storage` settings section.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown provider name or a
    /// missing bucket/container.
    pub fn from_settings(settings: &StorageConfig) -> Result<Self, StorageError> {
        match settings.provider.as_str() {
            "fs" | "local" => Ok(Self::local_fs(&settings.root)),
            "s3" => Ok(Self::S3 {
                endpoint: settings.endpoint.clone(),
                bucket: settings
                    .bucket
                    .clone()
                    .ok_or_else(|| StorageError::configuration("s3 storage needs a bucket"))?,
                root: settings.root.clone(),
                access_key_id: settings.access_key.clone(),
                secret_access_key: settings.secret_key.clone(),
                region: settings.region.clone(),
            }),
            "azblob" | "azure" => Ok(Self::AzureBlob {
                endpoint: settings.endpoint.clone(),
                account: settings.access_key.clone(),
                access_key: settings.secret_key.clone(),
                container: settings.bucket.clone().ok_or_else(|| {
                    StorageError::configuration("azure storage needs a container")
                })?,
                root: settings.root.clone(),
            }),
            other => Err(StorageError::configuration(format!(
                "unknown storage provider: {other}"
            ))),
        }
    }

    /// Provider name, as used in settings.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::S3 { .. } => "s3",
            Self::AzureBlob { .. } => "azblob",
            Self::LocalFs { .. } => "fs",
        }
    }
}
