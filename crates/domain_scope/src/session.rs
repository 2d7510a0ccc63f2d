//! Contractor wizard session
//!
//! Owns the local [`WizardState`] for one access token. Local state is
//! authoritative: a transition is applied immediately and then a draft write
//! carrying the complete new state is spawned in the background. Failed or
//! refused writes are logged and never revert the transition.
//!
//! The area being inspected is edited on a working copy and merged back into
//! the state when the area is completed.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use core_kernel::{run_upload, PhotoId, PortError, UploadRequest};

use crate::area::ScopeArea;
use crate::draft::{ScopeSheetSubmission, WizardDraft};
use crate::error::WizardError;
use crate::ports::{PhotoUploads, ScopeSheetPort};
use crate::token::AccessToken;
use crate::wizard::{RebuildConfirmation, WizardPhase, WizardState};

const PHOTO_FALLBACK: &str = "Photo upload failed";

/// Per-file upload status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoUploadStatus {
    Uploading,
    Uploaded(PhotoId),
    Failed(String),
}

/// Final submission guard; the submit endpoint is not idempotent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    InFlight,
    Submitted,
}

/// A photo picked for the current area; its file name is the upload key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl PhotoFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

pub struct WizardSession<P: ScopeSheetPort + ?Sized> {
    port: Arc<P>,
    token: AccessToken,
    state: WizardState,
    editing: Option<ScopeArea>,
    revision: u64,
    persists: Vec<JoinHandle<()>>,
    photo_uploads: BTreeMap<String, PhotoUploadStatus>,
    submission: SubmissionState,
}

impl<P: ScopeSheetPort + ?Sized> WizardSession<P> {
    /// Validates the token and restores the saved draft, if any
    pub async fn resume(port: Arc<P>, token: AccessToken) -> Result<Self, WizardError> {
        port.validate_token(&token)
            .await
            .map_err(|e| WizardError::remote("validate_token", "Could not check your link", e))?
            .into_result()?;

        let draft = port
            .load_draft(&token)
            .await
            .map_err(|e| WizardError::remote("load_draft", "Could not load your saved progress", e))?;

        let (state, revision) = match draft {
            Some(draft) => {
                let revision = draft.revision;
                (draft.into_state(), revision)
            }
            None => (WizardState::new(), 0),
        };
        info!(token = %token, phase = %state.phase, revision, "Wizard session resumed");

        let editing = state.current_area().cloned();
        Ok(Self {
            port,
            token,
            state,
            editing,
            revision,
            persists: Vec::new(),
            photo_uploads: BTreeMap::new(),
            submission: SubmissionState::Idle,
        })
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn phase(&self) -> WizardPhase {
        self.state.phase
    }

    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    /// Revision of the last draft write issued
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Working copy of the area being inspected
    pub fn editing(&self) -> Option<&ScopeArea> {
        self.editing.as_ref()
    }

    pub fn submission_state(&self) -> SubmissionState {
        self.submission
    }

    pub fn photo_status(&self, file_name: &str) -> Option<&PhotoUploadStatus> {
        self.photo_uploads.get(file_name)
    }

    pub fn photo_statuses(&self) -> &BTreeMap<String, PhotoUploadStatus> {
        &self.photo_uploads
    }

    // ------------------------------------------------------------------
    // Transitions
    // ------------------------------------------------------------------

    pub fn begin(&mut self) -> Result<(), WizardError> {
        self.ensure_open()?;
        let next = self.state.begin()?;
        self.apply(next);
        Ok(())
    }

    pub fn toggle_category(&mut self, key: &str) -> Result<(), WizardError> {
        self.ensure_open()?;
        let next = self.state.toggle_category(key)?;
        self.apply(next);
        Ok(())
    }

    pub fn start_tour(&mut self, confirmation: RebuildConfirmation) -> Result<(), WizardError> {
        self.ensure_open()?;
        let next = self.state.start_tour(confirmation)?;
        self.apply(next);
        Ok(())
    }

    /// Merges the working copy back and moves on
    pub fn complete_area(&mut self) -> Result<(), WizardError> {
        self.ensure_open()?;
        let edited = self.editing.clone().ok_or(WizardError::InvalidTransition {
            action: "complete an area",
            phase: self.state.phase,
        })?;
        let next = self.state.complete_area(edited)?;
        self.apply(next);
        Ok(())
    }

    /// Steps back; unsaved edits on the working copy are dropped
    ///
    /// Confirmed photos already exist on the server, so their ids are kept
    /// on the area even though the rest of the working copy is discarded.
    pub fn back(&mut self) -> Result<(), WizardError> {
        self.ensure_open()?;
        let mut next = self.state.back()?;
        if let Some(editing) = &self.editing {
            if let Some(area) = next.areas.iter_mut().find(|a| a.id == editing.id) {
                for photo_id in &editing.photo_ids {
                    area.add_photo(*photo_id);
                }
            }
        }
        self.apply(next);
        Ok(())
    }

    pub fn set_general_notes(&mut self, notes: impl Into<String>) -> Result<(), WizardError> {
        self.ensure_open()?;
        let next = self.state.with_general_notes(notes);
        self.apply(next);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Area edits (working copy only)
    // ------------------------------------------------------------------

    pub fn toggle_tag(&mut self, tag: &str) -> Result<bool, WizardError> {
        self.editing_mut("tag an area")?.toggle_tag(tag)
    }

    pub fn set_dimension(&mut self, key: &str, value: f64) -> Result<(), WizardError> {
        self.editing_mut("measure an area")?.set_dimension(key, value)
    }

    pub fn set_area_notes(&mut self, notes: impl Into<String>) -> Result<(), WizardError> {
        self.editing_mut("add notes")?.set_notes(notes);
        Ok(())
    }

    /// Uploads photos for the current area concurrently
    ///
    /// Each file carries its own status; one failure leaves the others alone.
    /// Uploaded photo ids are appended to the working copy. The outer error
    /// means no upload was attempted.
    pub async fn upload_photos(
        &mut self,
        files: Vec<PhotoFile>,
    ) -> Result<Vec<(String, Result<PhotoId, WizardError>)>, WizardError> {
        self.editing_mut("upload photos")?;
        let mut results = Vec::with_capacity(files.len());

        let mut in_flight = Vec::new();
        for file in files {
            let key = file.file_name.clone();
            if !file.mime_type.starts_with("image/") {
                let message = format!("{} is not an image", file.file_name);
                self.photo_uploads.insert(key.clone(), PhotoUploadStatus::Failed(message.clone()));
                results.push((key, Err(WizardError::validation(message))));
                continue;
            }
            self.photo_uploads.insert(key.clone(), PhotoUploadStatus::Uploading);

            let port = Arc::clone(&self.port);
            let token = self.token.clone();
            let handle = tokio::spawn(async move {
                let uploads = PhotoUploads::new(port.as_ref(), &token);
                let request = UploadRequest::new(file.file_name, file.bytes.len() as u64, file.mime_type);
                run_upload(&uploads, request, file.bytes).await
            });
            in_flight.push((key, handle));
        }

        for (key, handle) in in_flight {
            let outcome = match handle.await {
                Ok(Ok(id)) => Ok(PhotoId::from(id)),
                Ok(Err(e)) => Err(WizardError::remote("upload_photo", PHOTO_FALLBACK, e)),
                Err(join_error) => Err(WizardError::remote(
                    "upload_photo",
                    PHOTO_FALLBACK,
                    PortError::internal(join_error.to_string()),
                )),
            };
            match &outcome {
                Ok(photo_id) => {
                    debug!(file = %key, photo_id = %photo_id, "Photo uploaded");
                    if let Some(area) = self.editing.as_mut() {
                        area.add_photo(*photo_id);
                    }
                    self.photo_uploads.insert(key.clone(), PhotoUploadStatus::Uploaded(*photo_id));
                }
                Err(e) => {
                    warn!(file = %key, error = %e, "Photo upload failed");
                    self.photo_uploads.insert(key.clone(), PhotoUploadStatus::Failed(e.to_string()));
                }
            }
            results.push((key, outcome));
        }
        Ok(results)
    }

    // ------------------------------------------------------------------
    // Submission and persistence
    // ------------------------------------------------------------------

    /// Posts the final scope sheet; refused while in flight or once submitted
    pub async fn submit(&mut self) -> Result<(), WizardError> {
        self.ensure_open()?;
        if self.submission == SubmissionState::InFlight {
            return Err(WizardError::SubmissionInFlight);
        }
        let submission = ScopeSheetSubmission::from_state(&self.state)?;

        self.flush().await;
        // Left in flight if this future is dropped: the outcome is unknown
        self.submission = SubmissionState::InFlight;
        match self.port.submit_scope_sheet(&self.token, &submission).await {
            Ok(()) => {
                self.submission = SubmissionState::Submitted;
                info!(token = %self.token, areas = submission.areas.len(), "Scope sheet submitted");
                Ok(())
            }
            Err(e) => {
                self.submission = SubmissionState::Idle;
                Err(WizardError::remote("submit_scope_sheet", "Failed to submit scope sheet", e))
            }
        }
    }

    /// Waits for every draft write issued so far
    pub async fn flush(&mut self) {
        for handle in self.persists.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "Draft write task did not finish");
            }
        }
    }

    fn apply(&mut self, next: WizardState) {
        let phase_changed = next.phase != self.state.phase;
        debug!(from = %self.state.phase, to = %next.phase, "Wizard transition");
        self.state = next;
        if phase_changed {
            self.editing = self.state.current_area().cloned();
        }
        self.persist();
    }

    fn persist(&mut self) {
        self.revision += 1;
        let revision = self.revision;
        let draft = match WizardDraft::from_state(&self.state, revision) {
            Ok(draft) => draft,
            Err(e) => {
                warn!(revision, error = %e, "Draft not saved");
                return;
            }
        };

        self.persists.retain(|handle| !handle.is_finished());
        let port = Arc::clone(&self.port);
        let token = self.token.clone();
        self.persists.push(tokio::spawn(async move {
            match port.save_draft(&token, &draft).await {
                Ok(()) => debug!(revision, "Draft saved"),
                Err(PortError::Conflict { .. }) => {
                    debug!(revision, "Draft write superseded by a newer revision")
                }
                Err(e) => warn!(revision, error = %e, "Draft save failed"),
            }
        }));
    }

    fn ensure_open(&self) -> Result<(), WizardError> {
        match self.submission {
            SubmissionState::Submitted => Err(WizardError::AlreadySubmitted),
            _ => Ok(()),
        }
    }

    fn editing_mut(&mut self, action: &'static str) -> Result<&mut ScopeArea, WizardError> {
        self.ensure_open()?;
        let phase = self.state.phase;
        self.editing
            .as_mut()
            .ok_or(WizardError::InvalidTransition { action, phase })
    }
}
