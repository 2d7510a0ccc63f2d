//! Upload choreography shared by contractor photos and carrier-estimate PDFs
//!
//! Both call sites use exactly the same three calls, in this order:
//!
//! ```text
//! request {file_name, file_size, mime_type[, document_type]} -> {upload_url, id}
//! PUT raw bytes to upload_url (Content-Type = mime_type)
//! confirm(id)
//! ```
//!
//! A later call only fires once the earlier one succeeded. Nothing is rolled
//! back when a later call fails, so a failed PUT or confirm can leave an
//! unconfirmed record behind on the server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::ports::PortError;

/// First call of the choreography
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
    /// Only set for claim documents (e.g. `carrier_estimate`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
}

impl UploadRequest {
    /// Describes a file about to be uploaded
    pub fn new(file_name: impl Into<String>, file_size: u64, mime_type: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            file_size,
            mime_type: mime_type.into(),
            document_type: None,
        }
    }

    /// Tags the upload with a document type
    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = Some(document_type.into());
        self
    }
}

/// Response to the first call: where to PUT the bytes and the record to confirm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadTicket {
    pub upload_url: String,
    pub id: Uuid,
}

/// The three remote calls an upload needs
#[async_trait]
pub trait UploadPort: Send + Sync {
    /// Asks the collaborator for a signed upload URL and record id
    async fn request_upload(&self, request: &UploadRequest) -> Result<UploadTicket, PortError>;

    /// PUTs the raw bytes to the signed URL
    async fn put_bytes(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), PortError>;

    /// Confirms the upload so the record becomes visible
    async fn confirm_upload(&self, id: Uuid) -> Result<(), PortError>;
}

/// Runs request -> PUT -> confirm and returns the confirmed record id
pub async fn run_upload<P>(port: &P, request: UploadRequest, bytes: Vec<u8>) -> Result<Uuid, PortError>
where
    P: UploadPort + ?Sized,
{
    if bytes.len() as u64 != request.file_size {
        return Err(PortError::validation(format!(
            "file_size {} does not match {} bytes of content",
            request.file_size,
            bytes.len()
        )));
    }

    let ticket = port.request_upload(&request).await?;
    debug!(upload_id = %ticket.id, file_name = %request.file_name, "Upload URL issued");

    if let Err(e) = port.put_bytes(&ticket.upload_url, &request.mime_type, bytes).await {
        warn!(upload_id = %ticket.id, error = %e, "Upload PUT failed; record left unconfirmed");
        return Err(e);
    }

    if let Err(e) = port.confirm_upload(ticket.id).await {
        warn!(upload_id = %ticket.id, error = %e, "Upload confirm failed; record left unconfirmed");
        return Err(e);
    }

    debug!(upload_id = %ticket.id, "Upload confirmed");
    Ok(ticket.id)
}
