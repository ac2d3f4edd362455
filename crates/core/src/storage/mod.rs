//! Attachment storage using Apache OpenDAL.
//!
//! Files attached to a transaction live under `transaction/{id}/` in one of:
//! - S3-compatible storage: AWS S3, Cloudflare R2, MinIO
//! - Azure Blob Storage
//! - Local filesystem
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               Apache OpenDAL                  │
//! ├──────────────────────────────────────────────┤
//! │ op.write("key", data)  │ op.list_with(dir)    │
//! │ op.exists("key")       │ op.delete("key")     │
//! └──────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod service;

pub use config::StorageProvider;
pub use error::StorageError;
pub use service::{StorageService, StoredFile};
