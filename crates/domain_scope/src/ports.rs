//! Scope Sheet Ports
//!
//! Remote calls made by the contractor wizard. Every call is scoped by the
//! contractor's access token.

use async_trait::async_trait;
use uuid::Uuid;

use core_kernel::{
    DomainPort, HealthCheckable, PhotoId, PortError, UploadPort, UploadRequest, UploadTicket,
};

use crate::draft::{ScopeSheetSubmission, WizardDraft};
use crate::token::{AccessToken, TokenValidation};

#[async_trait]
pub trait ScopeSheetPort: DomainPort + HealthCheckable {
    async fn validate_token(&self, token: &AccessToken) -> Result<TokenValidation, PortError>;

    /// `Ok(None)` when no draft has been saved yet
    async fn load_draft(&self, token: &AccessToken) -> Result<Option<WizardDraft>, PortError>;

    /// Stores the full draft; a write whose revision is not newer than the
    /// last stored one is refused with `Conflict`
    async fn save_draft(&self, token: &AccessToken, draft: &WizardDraft) -> Result<(), PortError>;

    /// Final submission to the non-draft endpoint
    async fn submit_scope_sheet(
        &self,
        token: &AccessToken,
        submission: &ScopeSheetSubmission,
    ) -> Result<(), PortError>;

    async fn request_photo_upload(
        &self,
        token: &AccessToken,
        request: &UploadRequest,
    ) -> Result<UploadTicket, PortError>;

    async fn put_upload_bytes(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), PortError>;

    async fn confirm_photo_upload(&self, token: &AccessToken, photo_id: PhotoId) -> Result<(), PortError>;
}

/// Photo uploads for one token, expressed as the shared upload choreography
pub struct PhotoUploads<'a, P: ?Sized> {
    port: &'a P,
    token: &'a AccessToken,
}

impl<'a, P: ScopeSheetPort + ?Sized> PhotoUploads<'a, P> {
    pub fn new(port: &'a P, token: &'a AccessToken) -> Self {
        Self { port, token }
    }
}

#[async_trait]
impl<'a, P: ScopeSheetPort + ?Sized> UploadPort for PhotoUploads<'a, P> {
    async fn request_upload(&self, request: &UploadRequest) -> Result<UploadTicket, PortError> {
        self.port.request_photo_upload(self.token, request).await
    }

    async fn put_bytes(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), PortError> {
        self.port.put_upload_bytes(upload_url, content_type, bytes).await
    }

    async fn confirm_upload(&self, id: Uuid) -> Result<(), PortError> {
        self.port.confirm_photo_upload(self.token, PhotoId::from(id)).await
    }
}

/// In-memory implementation of ScopeSheetPort for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::time::Duration;
    use tokio::sync::RwLock;

    use crate::token::{ContractorToken, TokenRejection};

    pub mod op {
        pub const VALIDATE_TOKEN: &str = "validate_token";
        pub const LOAD_DRAFT: &str = "load_draft";
        pub const SAVE_DRAFT: &str = "save_draft";
        pub const SUBMIT: &str = "submit_scope_sheet";
        pub const REQUEST_UPLOAD: &str = "request_photo_upload";
        pub const PUT_BYTES: &str = "put_upload_bytes";
        pub const CONFIRM_UPLOAD: &str = "confirm_photo_upload";
    }

    #[derive(Debug, Default)]
    struct MockState {
        tokens: HashMap<AccessToken, ContractorToken>,
        completed: HashSet<AccessToken>,
        drafts: HashMap<AccessToken, WizardDraft>,
        /// Revisions as they arrived, accepted or not
        save_log: Vec<(u64, bool)>,
        save_delays: VecDeque<Duration>,
        submissions: Vec<ScopeSheetSubmission>,
        pending_photos: HashMap<PhotoId, String>,
        photos: Vec<PhotoId>,
        failing_files: HashSet<String>,
        failures: HashMap<String, Option<String>>,
        calls: Vec<String>,
    }

    /// In-memory mock implementation of ScopeSheetPort
    #[derive(Debug, Default)]
    pub struct MockScopeSheetPort {
        state: RwLock<MockState>,
    }

    impl MockScopeSheetPort {
        pub fn new() -> Self {
            Self::default()
        }

        /// Registers a token and returns it
        pub async fn issue_token(&self) -> AccessToken {
            let issued = ContractorToken::issue(Utc::now());
            let token = issued.token.clone();
            self.state.write().await.tokens.insert(token.clone(), issued);
            token
        }

        /// Registers an already expired token
        pub async fn issue_expired_token(&self) -> AccessToken {
            let mut issued = ContractorToken::issue(Utc::now() - chrono::Duration::days(8));
            issued.expires_at = Utc::now() - chrono::Duration::days(1);
            let token = issued.token.clone();
            self.state.write().await.tokens.insert(token.clone(), issued);
            token
        }

        pub async fn with_draft(&self, token: &AccessToken, draft: WizardDraft) {
            self.state.write().await.drafts.insert(token.clone(), draft);
        }

        /// The next call to `operation` fails with the given server message
        pub async fn fail(&self, operation: &str, server_message: Option<&str>) {
            self.state
                .write()
                .await
                .failures
                .insert(operation.to_string(), server_message.map(str::to_string));
        }

        /// Every confirm of a photo with this file name fails
        pub async fn fail_photo(&self, file_name: &str) {
            self.state.write().await.failing_files.insert(file_name.to_string());
        }

        /// Delays applied to successive `save_draft` calls, in call order
        pub async fn delay_saves(&self, delays: Vec<Duration>) {
            self.state.write().await.save_delays = delays.into();
        }

        pub async fn draft(&self, token: &AccessToken) -> Option<WizardDraft> {
            self.state.read().await.drafts.get(token).cloned()
        }

        /// `(revision, accepted)` for every save, in arrival order
        pub async fn save_log(&self) -> Vec<(u64, bool)> {
            self.state.read().await.save_log.clone()
        }

        pub async fn submissions(&self) -> Vec<ScopeSheetSubmission> {
            self.state.read().await.submissions.clone()
        }

        pub async fn photo_count(&self) -> usize {
            self.state.read().await.photos.len()
        }

        pub async fn calls(&self) -> Vec<String> {
            self.state.read().await.calls.clone()
        }

        async fn enter(&self, operation: &str) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            state.calls.push(operation.to_string());
            match state.failures.remove(operation) {
                Some(message) => Err(PortError::Rejected { status: 500, message }),
                None => Ok(()),
            }
        }

        async fn check_token(&self, token: &AccessToken) -> Result<(), PortError> {
            let state = self.state.read().await;
            match state.tokens.get(token) {
                Some(issued) if !issued.is_expired(Utc::now()) && !state.completed.contains(token) => Ok(()),
                _ => Err(PortError::Unauthorized { message: Some("Invalid or expired link".to_string()) }),
            }
        }
    }

    impl DomainPort for MockScopeSheetPort {}

    #[async_trait]
    impl HealthCheckable for MockScopeSheetPort {
        async fn health_check(&self) -> core_kernel::HealthCheckResult {
            core_kernel::HealthCheckResult {
                adapter_id: "mock-scope-sheet-port".to_string(),
                status: core_kernel::AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl ScopeSheetPort for MockScopeSheetPort {
        async fn validate_token(&self, token: &AccessToken) -> Result<TokenValidation, PortError> {
            self.enter(op::VALIDATE_TOKEN).await?;
            let state = self.state.read().await;
            let validation = match state.tokens.get(token) {
                None => TokenValidation::rejected(TokenRejection::NotFound),
                Some(_) if state.completed.contains(token) => {
                    TokenValidation::rejected(TokenRejection::Completed)
                }
                Some(issued) if issued.is_expired(Utc::now()) => {
                    TokenValidation::rejected(TokenRejection::Expired)
                }
                Some(_) => TokenValidation::valid(),
            };
            Ok(validation)
        }

        async fn load_draft(&self, token: &AccessToken) -> Result<Option<WizardDraft>, PortError> {
            self.enter(op::LOAD_DRAFT).await?;
            self.check_token(token).await?;
            Ok(self.state.read().await.drafts.get(token).cloned())
        }

        async fn save_draft(&self, token: &AccessToken, draft: &WizardDraft) -> Result<(), PortError> {
            self.enter(op::SAVE_DRAFT).await?;
            let delay = self.state.write().await.save_delays.pop_front();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.check_token(token).await?;

            let mut state = self.state.write().await;
            let last = state.drafts.get(token).map(|d| d.revision);
            let accepted = last.map_or(true, |last| draft.revision > last);
            state.save_log.push((draft.revision, accepted));
            if !accepted {
                return Err(PortError::conflict(format!(
                    "Draft revision {} is older than {}",
                    draft.revision,
                    last.unwrap_or_default()
                )));
            }
            state.drafts.insert(token.clone(), draft.clone());
            Ok(())
        }

        async fn submit_scope_sheet(
            &self,
            token: &AccessToken,
            submission: &ScopeSheetSubmission,
        ) -> Result<(), PortError> {
            self.enter(op::SUBMIT).await?;
            self.check_token(token).await?;
            let mut state = self.state.write().await;
            state.submissions.push(submission.clone());
            state.completed.insert(token.clone());
            Ok(())
        }

        async fn request_photo_upload(
            &self,
            token: &AccessToken,
            request: &UploadRequest,
        ) -> Result<UploadTicket, PortError> {
            self.enter(op::REQUEST_UPLOAD).await?;
            self.check_token(token).await?;
            let id = PhotoId::new_v7();
            self.state
                .write()
                .await
                .pending_photos
                .insert(id, request.file_name.clone());
            Ok(UploadTicket {
                upload_url: format!("https://storage.test/photos/{}", id),
                id: *id.as_uuid(),
            })
        }

        async fn put_upload_bytes(
            &self,
            _upload_url: &str,
            _content_type: &str,
            _bytes: Vec<u8>,
        ) -> Result<(), PortError> {
            self.enter(op::PUT_BYTES).await
        }

        async fn confirm_photo_upload(&self, token: &AccessToken, photo_id: PhotoId) -> Result<(), PortError> {
            self.enter(op::CONFIRM_UPLOAD).await?;
            self.check_token(token).await?;
            let mut state = self.state.write().await;
            let file_name = state
                .pending_photos
                .remove(&photo_id)
                .ok_or_else(|| PortError::not_found("Photo", photo_id))?;
            if state.failing_files.contains(&file_name) {
                return Err(PortError::rejected(422, format!("{} could not be processed", file_name)));
            }
            state.photos.push(photo_id);
            Ok(())
        }
    }
}
