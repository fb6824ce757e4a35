//! Object storage for memo attachments

pub mod supabase;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use std::fmt;
use thiserror::Error;

use crate::access::ResourceKey;

pub use supabase::SupabaseStorage;

/// Fallback content type when storage does not report one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum StorageError {
    /// No object at that key
    #[error("object not found: {0}")]
    NotFound(String),

    /// Storage unreachable or answered with an error
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        StorageError::Unavailable(err.to_string())
    }
}

/// Stream of object body chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes, StorageError>>;

/// An object ready to be streamed back to the client.
pub struct StoredObject {
    pub content_type: String,
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

impl fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredObject")
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// Read access to stored files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Starts downloading `key`. Errors surface before any byte is streamed.
    async fn fetch(&self, key: &ResourceKey) -> Result<StoredObject, StorageError>;
}
