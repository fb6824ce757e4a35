//! In-memory collaborators for unit and router tests
//!
//! Enabled for this crate's own tests and, through the `testing` feature,
//! for dependent crates' test builds.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::access::ResourceKey;
use crate::messaging::{MessagingError, Messenger, OutgoingDocument, OutgoingMessage, SentMessage};
use crate::metadata::{AccessGrant, DeliveryRecord, MetadataError, MetadataStore, RecordId, UserRef};
use crate::storage::{ObjectStore, StorageError, StoredObject};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn store_offline() -> MetadataError {
    MetadataError::Status {
        status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
        body: "store offline".to_string(),
    }
}

/// Metadata store over a files map and a grants list.
#[derive(Default)]
pub struct InMemoryMetadata {
    files: HashMap<String, RecordId>,
    owners: HashMap<RecordId, UserRef>,
    grants: Vec<AccessGrant>,
    deliveries: Mutex<Vec<DeliveryRecord>>,
    calls: AtomicUsize,
    failing: bool,
    failing_writes: bool,
    delay: Option<Duration>,
}

impl InMemoryMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` as owned by `record_id`.
    pub fn with_file(mut self, key: &str, record_id: &str) -> Self {
        self.files.insert(key.to_string(), RecordId::new(record_id));
        self
    }

    /// Registers `owner` as the author of `record_id`.
    pub fn with_record_owner(mut self, record_id: &str, owner: UserRef) -> Self {
        self.owners.insert(RecordId::new(record_id), owner);
        self
    }

    pub fn with_grant(mut self, record_id: &str, grantee: UserRef) -> Self {
        self.grants.push(AccessGrant {
            record_id: RecordId::new(record_id),
            grantee,
        });
        self
    }

    /// Every call errors as if the store were down.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Lookups answer normally; `record_delivery` errors.
    pub fn failing_writes(mut self) -> Self {
        self.failing_writes = true;
        self
    }

    /// Every call sleeps before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of lookups and writes served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn deliveries(&self) -> Vec<DeliveryRecord> {
        lock(&self.deliveries).clone()
    }

    async fn enter(&self) -> Result<(), MetadataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing {
            return Err(store_offline());
        }
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadata {
    async fn find_owning_record(&self, key: &ResourceKey) -> Result<Option<RecordId>, MetadataError> {
        self.enter().await?;
        Ok(self.files.get(key.as_str()).cloned())
    }

    async fn find_record_owner(&self, record: &RecordId) -> Result<Option<UserRef>, MetadataError> {
        self.enter().await?;
        Ok(self.owners.get(record).cloned())
    }

    async fn find_grant(&self, record: &RecordId, user_id: i64) -> Result<Option<AccessGrant>, MetadataError> {
        self.enter().await?;
        Ok(self
            .grants
            .iter()
            .find(|grant| &grant.record_id == record && grant.grantee.matches(user_id))
            .cloned())
    }

    async fn record_delivery(&self, record: &DeliveryRecord) -> Result<(), MetadataError> {
        self.enter().await?;
        if self.failing_writes {
            return Err(store_offline());
        }
        lock(&self.deliveries).push(record.clone());
        Ok(())
    }
}

/// Object store over an in-memory map.
#[derive(Default)]
pub struct InMemoryStorage {
    objects: HashMap<String, (Bytes, String)>,
    fetches: AtomicUsize,
    failing: bool,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, key: &str, data: impl Into<Bytes>, content_type: &str) -> Self {
        self.objects.insert(key.to_string(), (data.into(), content_type.to_string()));
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for InMemoryStorage {
    async fn fetch(&self, key: &ResourceKey) -> Result<StoredObject, StorageError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(StorageError::Unavailable("storage offline".to_string()));
        }

        let (data, content_type) = self
            .objects
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        Ok(StoredObject {
            content_type,
            content_length: Some(data.len() as u64),
            body: stream::once(async move { Ok(data) }).boxed(),
        })
    }
}

/// Messenger that remembers what it was asked to send.
#[derive(Default)]
pub struct RecordingMessenger {
    messages: Mutex<Vec<OutgoingMessage>>,
    documents: Mutex<Vec<OutgoingDocument>>,
    next_id: AtomicI32,
    failing: bool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send fails as if the chat did not exist.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn messages(&self) -> Vec<OutgoingMessage> {
        lock(&self.messages).clone()
    }

    pub fn documents(&self) -> Vec<OutgoingDocument> {
        lock(&self.documents).clone()
    }

    fn deliver(&self, chat_id: i64) -> Result<SentMessage, MessagingError> {
        if self.failing {
            return Err(MessagingError::Telegram(teloxide::RequestError::Api(
                teloxide::ApiError::ChatNotFound,
            )));
        }
        Ok(SentMessage {
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            chat_id,
        })
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(&self, message: &OutgoingMessage) -> Result<SentMessage, MessagingError> {
        let sent = self.deliver(message.chat_id)?;
        lock(&self.messages).push(message.clone());
        Ok(sent)
    }

    async fn send_document(&self, document: &OutgoingDocument) -> Result<SentMessage, MessagingError> {
        let sent = self.deliver(document.chat_id)?;
        lock(&self.documents).push(document.clone());
        Ok(sent)
    }
}
