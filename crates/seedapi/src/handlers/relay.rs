use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use seedcore::messaging::{DocumentSource, OutgoingDocument, OutgoingMessage, SentMessage};
use seedcore::metadata::{DeliveryRecord, RecordId, UserRef};
use seedcore::Principal;

use super::{authenticate, InitDataQuery};
use crate::error::ApiError;
use crate::server::AppState;

/// Body of `POST /api/telegram`.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayRequest {
    /// Recipient chat; numeric, sent as number or string
    pub chat_id: UserRef,
    pub text: Option<String>,
    pub document: Option<DocumentPayload>,
    #[serde(default)]
    pub disable_web_page_preview: bool,
    /// Sender's local time as RFC 3339
    pub local_time: Option<String>,
    pub timezone: Option<String>,
    /// When present, a share row is written after delivery; the sender must own the memo
    pub share: Option<SharePayload>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DocumentPayload {
    Url { url: String },
    Upload { file_name: String, data: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SharePayload {
    pub memo_id: RecordId,
    pub memo_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelayResponse {
    pub ok: bool,
    pub result: SentMessage,
    pub sent_at: DateTime<Utc>,
    pub timezone: Option<String>,
    /// Whether the share row was written
    pub recorded: bool,
}

/// POST /api/telegram - deliver a memo through the bot
pub async fn handle_relay(
    State(state): State<Arc<AppState>>,
    Query(query): Query<InitDataQuery>,
    headers: HeaderMap,
    payload: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Json<RelayResponse>, ApiError> {
    let principal = authenticate(&state, &headers, query.init_data.as_deref())?;

    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let chat_id = parse_chat_id(&request.chat_id)?;
    let sent_at = parse_sent_at(request.local_time.as_deref())?;
    let text = request.text.clone().filter(|t| !t.trim().is_empty());

    // Only the memo's author may grant access to it
    if let Some(share) = &request.share {
        ensure_share_owner(&state, &principal, &share.memo_id).await?;
    }

    let sent = match &request.document {
        Some(document) => {
            let outgoing = OutgoingDocument {
                chat_id,
                source: document_source(document)?,
                caption: text,
            };
            state.messenger.send_document(&outgoing).await
        }
        None => {
            let text = text.ok_or_else(|| ApiError::BadRequest("text or document is required".to_string()))?;
            let outgoing = OutgoingMessage {
                chat_id,
                text,
                disable_web_page_preview: request.disable_web_page_preview,
            };
            state.messenger.send_message(&outgoing).await
        }
    }
    .map_err(|e| {
        log::error!("Relay from {} to chat {} failed: {}", principal, chat_id, e);
        ApiError::from(e)
    })?;

    log::info!("✉️  Memo relayed from {} to chat {}", principal, chat_id);

    let recorded = match &request.share {
        Some(share) => {
            let record = DeliveryRecord {
                record_id: share.memo_id.clone(),
                from_user_id: principal.id(),
                to_user_id: chat_id,
                memo_text: share.memo_text.clone(),
                sent_at,
                timezone: request.timezone.clone(),
            };
            record_share(&state, &record).await
        }
        None => false,
    };

    Ok(Json(RelayResponse {
        ok: true,
        result: sent,
        sent_at,
        timezone: request.timezone,
        recorded,
    }))
}

/// Refuses a share of a memo the principal did not write, or that does not exist.
async fn ensure_share_owner(state: &AppState, principal: &Principal, memo_id: &RecordId) -> Result<(), ApiError> {
    let owner = tokio::time::timeout(state.lookup_timeout, state.metadata.find_record_owner(memo_id))
        .await
        .map_err(|_| ApiError::Unavailable("memo lookup timed out".to_string()))?
        .map_err(|e| ApiError::Unavailable(format!("metadata store unavailable: {}", e)))?;

    match owner {
        Some(owner) if owner.matches(principal.id()) => Ok(()),
        _ => {
            log::warn!("🚫 {} tried to share memo {} they do not own", principal, memo_id);
            Err(ApiError::Forbidden(format!("memo {} cannot be shared by you", memo_id)))
        }
    }
}

/// Writes the share row; the message is already delivered, so failures only log.
async fn record_share(state: &AppState, record: &DeliveryRecord) -> bool {
    match tokio::time::timeout(state.lookup_timeout, state.metadata.record_delivery(record)).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            log::warn!("Failed to record share of memo {}: {}", record.record_id, e);
            false
        }
        Err(_) => {
            log::warn!("Recording share of memo {} timed out", record.record_id);
            false
        }
    }
}

fn parse_chat_id(chat_id: &UserRef) -> Result<i64, ApiError> {
    match chat_id {
        UserRef::Number(id) => Ok(*id),
        UserRef::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| ApiError::BadRequest(format!("chat_id must be numeric, got {:?}", text))),
    }
}

/// `local_time` converted to UTC, or now when absent.
fn parse_sent_at(local_time: Option<&str>) -> Result<DateTime<Utc>, ApiError> {
    match local_time {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| ApiError::BadRequest(format!("local_time is not RFC 3339: {}", e))),
        None => Ok(Utc::now()),
    }
}

fn document_source(document: &DocumentPayload) -> Result<DocumentSource, ApiError> {
    match document {
        DocumentPayload::Url { url } => Url::parse(url)
            .map(DocumentSource::Url)
            .map_err(|e| ApiError::BadRequest(format!("document url is invalid: {}", e))),
        DocumentPayload::Upload { file_name, data } => {
            let data = base64::engine::general_purpose::STANDARD
                .decode(data)
                .map_err(|e| ApiError::BadRequest(format!("document data is not base64: {}", e)))?;
            if file_name.trim().is_empty() {
                return Err(ApiError::BadRequest("document file_name is empty".to_string()));
            }
            Ok(DocumentSource::Bytes {
                file_name: file_name.clone(),
                data: Bytes::from(data),
            })
        }
    }
}
