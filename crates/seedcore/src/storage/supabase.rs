//! Supabase Storage client streaming objects out of one bucket.

use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

use super::{ObjectStore, StorageError, StoredObject, DEFAULT_CONTENT_TYPE};
use crate::access::ResourceKey;
use crate::config::ConfigError;
use crate::metadata::supabase::{build_client, endpoint};

/// [`ObjectStore`] over `{supabase_url}/storage/v1/object/{bucket}`.
#[derive(Clone)]
pub struct SupabaseStorage {
    http: reqwest::Client,
    bucket_url: Url,
}

impl SupabaseStorage {
    pub fn new(
        supabase_url: &Url,
        service_key: &SecretString,
        bucket: &str,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            http: build_client(service_key, timeout)?,
            bucket_url: endpoint(supabase_url, &["storage", "v1", "object", bucket])?,
        })
    }

    /// Object URL; each key segment is percent-encoded on its own.
    fn object_url(&self, key: &ResourceKey) -> Url {
        let mut url = self.bucket_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(key.segments());
        }
        url
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn fetch(&self, key: &ResourceKey) -> Result<StoredObject, StorageError> {
        let response = self.http.get(self.object_url(key)).send().await?;

        match response.status() {
            status if status.is_success() => {}
            // Supabase reports a missing object as 400 on some versions
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => {
                log::debug!("Storage has no object {}", key);
                return Err(StorageError::NotFound(key.to_string()));
            }
            status => {
                log::warn!("Storage returned {} for {}", status, key);
                return Err(StorageError::Unavailable(format!("storage returned status {}", status)));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let content_length = response.content_length();

        Ok(StoredObject {
            content_type,
            content_length,
            body: response.bytes_stream().map_err(StorageError::from).boxed(),
        })
    }
}
