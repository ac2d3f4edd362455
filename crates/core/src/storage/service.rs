//! Attachment files on an OpenDAL backend.

use opendal::{EntryMode, ErrorKind, Operator, services};
use serde::Serialize;
use tracing::debug;

use super::config::StorageProvider;
use super::error::StorageError;

/// A file found under an attachment directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    /// Full storage path.
    pub path: String,
    /// File name.
    pub name: String,
}

/// Attachment storage.
pub struct StorageService {
    operator: Operator,
    provider: &'static str,
}

impl StorageService {
    /// Create a storage service for a provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage provider cannot be initialized.
    pub fn from_provider(provider: &StorageProvider) -> Result<Self, StorageError> {
        let operator = Self::create_operator(provider)?;
        Ok(Self {
            operator,
            provider: provider.name(),
        })
    }

    /// Create OpenDAL operator from provider config.
    fn create_operator(provider: &StorageProvider) -> Result<Operator, StorageError> {
        let operator = match provider {
            StorageProvider::S3 {
                endpoint,
                bucket,
                root,
                access_key_id,
                secret_access_key,
                region,
            } => {
                let mut builder = services::S3::default().bucket(bucket).root(root);
                if let Some(endpoint) = endpoint {
                    builder = builder.endpoint(endpoint);
                }
                if let Some(key) = access_key_id {
                    builder = builder.access_key_id(key);
                }
                if let Some(secret) = secret_access_key {
                    builder = builder.secret_access_key(secret);
                }
                if let Some(region) = region {
                    builder = builder.region(region);
                }
                Operator::new(builder)
                    .map_err(|e| StorageError::provider(&e))?
                    .finish()
            }
            StorageProvider::AzureBlob {
                endpoint,
                account,
                access_key,
                container,
                root,
            } => {
                let mut builder = services::Azblob::default().container(container).root(root);
                if let Some(endpoint) = endpoint {
                    builder = builder.endpoint(endpoint);
                }
                if let Some(account) = account {
                    builder = builder.account_name(account);
                }
                if let Some(key) = access_key {
                    builder = builder.account_key(key);
                }
                Operator::new(builder)
                    .map_err(|e| StorageError::provider(&e))?
                    .finish()
            }
            StorageProvider::LocalFs { root } => {
                let root = root
                    .to_str()
                    .ok_or_else(|| StorageError::configuration("local attachment root is not valid UTF-8"))?;
                Operator::new(services::Fs::default().root(root))
                    .map_err(|e| StorageError::provider(&e))?
                    .finish()
            }
        };

        Ok(operator)
    }

    /// Writes a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write(&self, path: &str, data: Vec<u8>) -> Result<(), StorageError> {
        self.operator
            .write(path, data)
            .await
            .map_err(|e| StorageError::at(path, &e))?;
        Ok(())
    }

    /// Files under the directory `dir` (ending in `/`), recursively.
    ///
    /// A directory that does not exist has no files.
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails.
    pub async fn list(&self, dir: &str) -> Result<Vec<StoredFile>, StorageError> {
        let entries = match self.operator.list_with(dir).recursive(true).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::at(dir, &e)),
        };

        let mut files: Vec<StoredFile> = entries
            .into_iter()
            .filter(|e| e.metadata().mode() == EntryMode::FILE)
            .map(|e| StoredFile {
                path: e.path().to_string(),
                name: e.name().to_string(),
            })
            .collect();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Deletes every file under `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if a deletion fails.
    pub async fn delete_all(&self, dir: &str) -> Result<(), StorageError> {
        let files = self.list(dir).await?;

        for file in &files {
            self.operator
                .delete(&file.path)
                .await
                .map_err(|e| StorageError::at(&file.path, &e))?;
        }

        debug!(dir, count = files.len(), "Deleted attachments");
        Ok(())
    }

    /// Check if a file exists in storage.
    pub async fn exists(&self, path: &str) -> bool {
        self.operator.exists(path).await.unwrap_or(false)
    }

    /// Get the storage provider name.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider
    }
}
