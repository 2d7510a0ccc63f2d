//! HTTP adapter for the contractor wizard
//!
//! Every route is scoped by the access token from the invite link:
//! `/api/contractor/{token}/...`. Draft reads treat 404 as "nothing saved
//! yet". The final submission goes to its own endpoint, separate from the
//! draft.

use async_trait::async_trait;
use reqwest::Method;

use core_kernel::{
    DomainPort, HealthCheckResult, HealthCheckable, PhotoId, PortError, UploadRequest, UploadTicket,
};
use domain_scope::{AccessToken, ScopeSheetPort, ScopeSheetSubmission, TokenValidation, WizardDraft};

use crate::client::HttpClient;
use crate::config::{ConfigError, HttpAdapterConfig};

fn route(token: &AccessToken, tail: &str) -> String {
    format!("/api/contractor/{}{}", token.as_str(), tail)
}

/// [`ScopeSheetPort`] over the REST collaborator
#[derive(Debug, Clone)]
pub struct HttpScopeSheetAdapter {
    http: HttpClient,
}

impl HttpScopeSheetAdapter {
    pub fn new(config: HttpAdapterConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            http: HttpClient::new(config)?,
        })
    }

    pub fn from_client(http: HttpClient) -> Self {
        Self { http }
    }
}

impl DomainPort for HttpScopeSheetAdapter {}

#[async_trait]
impl HealthCheckable for HttpScopeSheetAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        self.http.health("http-scope-sheet-adapter").await
    }
}

#[async_trait]
impl ScopeSheetPort for HttpScopeSheetAdapter {
    async fn validate_token(&self, token: &AccessToken) -> Result<TokenValidation, PortError> {
        self.http.get_json(&route(token, "/validate")).await
    }

    async fn load_draft(&self, token: &AccessToken) -> Result<Option<WizardDraft>, PortError> {
        self.http.get_optional(&route(token, "/draft")).await
    }

    async fn save_draft(&self, token: &AccessToken, draft: &WizardDraft) -> Result<(), PortError> {
        self.http
            .send_unit(Method::POST, &route(token, "/draft"), Some(draft))
            .await
    }

    async fn submit_scope_sheet(
        &self,
        token: &AccessToken,
        submission: &ScopeSheetSubmission,
    ) -> Result<(), PortError> {
        self.http
            .send_unit(Method::POST, &route(token, "/scope-sheet"), Some(submission))
            .await
    }

    async fn request_photo_upload(
        &self,
        token: &AccessToken,
        request: &UploadRequest,
    ) -> Result<UploadTicket, PortError> {
        self.http
            .send_json(Method::POST, &route(token, "/photos/upload-url"), request)
            .await
    }

    async fn put_upload_bytes(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), PortError> {
        self.http.put_bytes(upload_url, content_type, bytes).await
    }

    async fn confirm_photo_upload(&self, token: &AccessToken, photo_id: PhotoId) -> Result<(), PortError> {
        self.http
            .send_unit::<()>(
                Method::POST,
                &route(token, &format!("/photos/{}/confirm", photo_id)),
                None,
            )
            .await
    }
}
