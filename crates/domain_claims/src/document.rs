//! Carrier-estimate document pipeline (step 6)
//!
//! ```text
//! None -> Uploading -> Parsing -> Parsed
//!                  \          \-> Failed
//!                   \-> Failed
//! ```
//!
//! After the upload is confirmed the parse job is triggered and the newest
//! carrier-estimate record is polled every [`PARSE_POLL_INTERVAL`]. The
//! polling flag drops in the same tick the record reaches `completed` or
//! `failed` and nothing but a new upload raises it again.
//!
//! Every poll result is tagged with the pipeline generation it was started
//! under. Resetting or tearing the pipeline down bumps the generation, so a
//! fetch that lands afterwards is discarded instead of applied to stale
//! state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use core_kernel::{run_upload, ClaimId, DocumentId, UploadRequest};

use crate::error::FilingError;
use crate::ports::{ClaimFilingPort, EstimateUploads};

/// Fixed interval between parse-status polls
pub const PARSE_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// `document_type` sent with carrier-estimate uploads
pub const CARRIER_ESTIMATE_DOCUMENT_TYPE: &str = "carrier_estimate";

const PARSE_FAILED_FALLBACK: &str = "We couldn't read this estimate. Try uploading it again.";
const UPLOAD_FAILED_FALLBACK: &str = "Failed to upload carrier estimate";

/// Server-side parse job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ParseStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ParseStatus::Completed | ParseStatus::Failed)
    }
}

/// A carrier-estimate document as the collaborator reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierEstimateDocument {
    pub id: DocumentId,
    pub file_name: String,
    pub file_size: u64,
    pub mime_type: String,
    pub parse_status: ParseStatus,
    #[serde(default)]
    pub parse_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A file picked by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    fn upload_request(&self) -> UploadRequest {
        UploadRequest::new(self.file_name.clone(), self.bytes.len() as u64, self.mime_type.clone())
    }
}

/// Where the pipeline stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    None,
    Uploading,
    Parsing { document_id: DocumentId },
    Parsed(CarrierEstimateDocument),
    Failed { message: String },
}

/// The polling flag and its terminability rules, separated from any timer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParsePoller {
    polling: bool,
    ticks: u32,
}

impl ParsePoller {
    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// Number of statuses observed since the last start
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Raised once, right after the parse job is triggered
    pub fn start(&mut self) {
        self.polling = true;
        self.ticks = 0;
    }

    pub fn stop(&mut self) {
        self.polling = false;
    }

    /// Feeds one poll result; returns the flag after this tick
    ///
    /// A stopped poller ignores further statuses, so it never restarts itself.
    pub fn observe(&mut self, status: ParseStatus) -> bool {
        if !self.polling {
            return false;
        }
        self.ticks += 1;
        if status.is_terminal() {
            self.polling = false;
        }
        self.polling
    }
}

/// Result of applying one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Still pending/processing; keep polling
    Waiting(ParseStatus),
    Parsed,
    Failed,
    /// The pipeline was not polling
    Idle,
    /// The result belonged to an earlier generation and was dropped
    Discarded,
}

/// Snapshot published by a [`ParsePollTask`] after every tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSnapshot {
    pub generation: u64,
    pub polling: bool,
    pub document: Option<CarrierEstimateDocument>,
}

/// Upload, parse-trigger, and poll state for the carrier estimate
#[derive(Debug, Clone)]
pub struct DocumentPipeline {
    state: PipelineState,
    poller: ParsePoller,
    generation: u64,
    cached: Option<CarrierEstimateDocument>,
}

impl Default for DocumentPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentPipeline {
    pub fn new() -> Self {
        Self {
            state: PipelineState::None,
            poller: ParsePoller::default(),
            generation: 0,
            cached: None,
        }
    }

    /// Restores the pipeline from the newest record on the claim
    pub fn hydrate(&mut self, newest: Option<CarrierEstimateDocument>) {
        self.generation += 1;
        self.poller.stop();
        self.state = match &newest {
            None => PipelineState::None,
            Some(doc) => match doc.parse_status {
                ParseStatus::Completed => PipelineState::Parsed(doc.clone()),
                ParseStatus::Failed => PipelineState::Failed {
                    message: failure_message(doc),
                },
                ParseStatus::Pending | ParseStatus::Processing => {
                    self.poller.start();
                    PipelineState::Parsing { document_id: doc.id }
                }
            },
        };
        self.cached = newest;
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_polling()
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self.state, PipelineState::Parsed(_))
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The client-side copy of the newest record
    pub fn cached_document(&self) -> Option<&CarrierEstimateDocument> {
        self.cached.as_ref()
    }

    /// Runs the upload choreography, then triggers the parse job and starts polling
    pub async fn upload<P>(
        &mut self,
        port: &P,
        claim_id: ClaimId,
        file: SelectedFile,
    ) -> Result<DocumentId, FilingError>
    where
        P: ClaimFilingPort + ?Sized,
    {
        if !matches!(self.state, PipelineState::None) {
            return Err(FilingError::invalid_state(
                "A carrier estimate is already on file; clear it before uploading another",
            ));
        }
        if file.bytes.is_empty() {
            return Err(FilingError::validation("The selected file is empty"));
        }
        if file.mime_type != "application/pdf" {
            return Err(FilingError::validation("Carrier estimates must be PDF files"));
        }

        self.state = PipelineState::Uploading;
        let request = file
            .upload_request()
            .with_document_type(CARRIER_ESTIMATE_DOCUMENT_TYPE);

        let uploads = EstimateUploads::new(port, claim_id);
        let document_id = match run_upload(&uploads, request, file.bytes).await {
            Ok(id) => DocumentId::from(id),
            Err(e) => {
                let error = FilingError::remote("upload_carrier_estimate", UPLOAD_FAILED_FALLBACK, e);
                self.state = PipelineState::Failed {
                    message: error.to_string(),
                };
                return Err(error);
            }
        };

        // The poll is authoritative; a lost trigger shows up as a stuck status
        if let Err(e) = port.trigger_parse(document_id).await {
            warn!(claim_id = %claim_id, document_id = %document_id, error = %e, "Parse trigger failed");
        }

        info!(claim_id = %claim_id, document_id = %document_id, "Carrier estimate uploaded; parsing");
        self.state = PipelineState::Parsing { document_id };
        self.poller.start();
        Ok(document_id)
    }

    /// Applies the newest record fetched under `generation`
    pub fn apply_poll(
        &mut self,
        generation: u64,
        newest: Option<CarrierEstimateDocument>,
    ) -> PollOutcome {
        if generation != self.generation {
            debug!(generation, current = self.generation, "Discarding stale parse poll");
            return PollOutcome::Discarded;
        }
        if !self.poller.is_polling() {
            return PollOutcome::Idle;
        }
        let Some(document) = newest else {
            return PollOutcome::Waiting(ParseStatus::Pending);
        };

        let status = document.parse_status;
        self.poller.observe(status);
        self.cached = Some(document.clone());

        match status {
            ParseStatus::Completed => {
                info!(document_id = %document.id, "Carrier estimate parsed");
                self.state = PipelineState::Parsed(document);
                PollOutcome::Parsed
            }
            ParseStatus::Failed => {
                warn!(document_id = %document.id, parse_error = ?document.parse_error, "Carrier estimate parse failed");
                self.state = PipelineState::Failed {
                    message: failure_message(&document),
                };
                PollOutcome::Failed
            }
            waiting => PollOutcome::Waiting(waiting),
        }
    }

    /// Applies a snapshot from a background poll task
    pub fn apply_snapshot(&mut self, snapshot: &ParseSnapshot) -> PollOutcome {
        self.apply_poll(snapshot.generation, snapshot.document.clone())
    }

    /// One poll tick: fetch newest-first and apply the first record
    pub async fn poll_once<P>(&mut self, port: &P, claim_id: ClaimId) -> Result<PollOutcome, FilingError>
    where
        P: ClaimFilingPort + ?Sized,
    {
        if !self.poller.is_polling() {
            return Ok(PollOutcome::Idle);
        }
        let generation = self.generation;
        let documents = port
            .list_carrier_estimates(claim_id)
            .await
            .map_err(|e| FilingError::remote("poll_parse_status", "Failed to check parse status", e))?;
        Ok(self.apply_poll(generation, documents.into_iter().next()))
    }

    /// Starts a background poll loop bound to the current generation
    pub fn watch<P>(&self, port: Arc<P>, claim_id: ClaimId, interval: Duration) -> Option<ParsePollTask>
    where
        P: ClaimFilingPort + ?Sized,
    {
        self.poller
            .is_polling()
            .then(|| ParsePollTask::spawn(port, claim_id, self.generation, interval))
    }

    /// Clears the client-side record after a failure so the user can upload again
    ///
    /// The failed record stays on the server; only the cached copy is dropped.
    pub fn retry(&mut self) -> Result<(), FilingError> {
        if !matches!(self.state, PipelineState::Failed { .. }) {
            return Err(FilingError::invalid_state("Only a failed estimate can be cleared"));
        }
        if let Some(doc) = &self.cached {
            info!(document_id = %doc.id, "Clearing failed carrier estimate locally; server record retained");
        }
        self.reset();
        Ok(())
    }

    /// Stops polling and drops any in-flight results (view teardown)
    pub fn teardown(&mut self) {
        self.generation += 1;
        self.poller.stop();
    }

    fn reset(&mut self) {
        self.generation += 1;
        self.poller.stop();
        self.cached = None;
        self.state = PipelineState::None;
    }
}

fn failure_message(document: &CarrierEstimateDocument) -> String {
    document
        .parse_error
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| PARSE_FAILED_FALLBACK.to_string())
}

/// Background parse-status poll loop
///
/// Ticks every `interval`, publishes a [`ParseSnapshot`] per tick, and exits
/// by itself once the status is terminal. Dropping the task aborts it.
#[derive(Debug)]
pub struct ParsePollTask {
    handle: JoinHandle<()>,
    snapshots: watch::Receiver<ParseSnapshot>,
}

impl ParsePollTask {
    pub fn spawn<P>(port: Arc<P>, claim_id: ClaimId, generation: u64, interval: Duration) -> Self
    where
        P: ClaimFilingPort + ?Sized,
    {
        let (tx, snapshots) = watch::channel(ParseSnapshot {
            generation,
            polling: true,
            document: None,
        });

        let handle = tokio::spawn(async move {
            let mut poller = ParsePoller::default();
            poller.start();
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);

            while poller.is_polling() {
                ticker.tick().await;
                let documents = match port.list_carrier_estimates(claim_id).await {
                    Ok(documents) => documents,
                    Err(e) => {
                        warn!(claim_id = %claim_id, error = %e, "Parse status poll failed; retrying next tick");
                        continue;
                    }
                };
                let newest = documents.into_iter().next();
                if let Some(doc) = &newest {
                    poller.observe(doc.parse_status);
                }
                let snapshot = ParseSnapshot {
                    generation,
                    polling: poller.is_polling(),
                    document: newest,
                };
                if tx.send(snapshot).is_err() {
                    break;
                }
            }
            debug!(claim_id = %claim_id, ticks = poller.ticks(), "Parse poll loop finished");
        });

        Self { handle, snapshots }
    }

    /// Latest published snapshot
    pub fn latest(&self) -> ParseSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver for every snapshot as it is published
    pub fn subscribe(&self) -> watch::Receiver<ParseSnapshot> {
        self.snapshots.clone()
    }

    /// Waits until polling stops; `None` if the loop ended without a terminal status
    pub async fn wait_terminal(&mut self) -> Option<ParseSnapshot> {
        loop {
            if !self.snapshots.borrow().polling {
                return Some(self.snapshots.borrow().clone());
            }
            if self.snapshots.changed().await.is_err() {
                let last = self.snapshots.borrow().clone();
                return (!last.polling).then_some(last);
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancels the loop (view teardown)
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for ParsePollTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poller_flag_sequence() {
        let mut poller = ParsePoller::default();
        poller.start();

        let flags: Vec<bool> = [ParseStatus::Pending, ParseStatus::Processing, ParseStatus::Completed]
            .into_iter()
            .map(|s| poller.observe(s))
            .collect();

        assert_eq!(flags, vec![true, true, false]);
    }

    #[test]
    fn test_poller_never_restarts_itself() {
        let mut poller = ParsePoller::default();
        poller.start();
        assert!(!poller.observe(ParseStatus::Failed));

        for status in [ParseStatus::Pending, ParseStatus::Processing, ParseStatus::Completed] {
            assert!(!poller.observe(status));
        }
        assert_eq!(poller.ticks(), 1);
    }

    #[test]
    fn test_stale_generation_is_discarded() {
        let mut pipeline = DocumentPipeline::new();
        pipeline.hydrate(Some(document(ParseStatus::Processing)));
        let generation = pipeline.generation();

        pipeline.teardown();

        let outcome = pipeline.apply_poll(generation, Some(document(ParseStatus::Completed)));
        assert_eq!(outcome, PollOutcome::Discarded);
        assert!(!pipeline.is_parsed());
    }

    #[test]
    fn test_hydrate_maps_status_to_state() {
        let mut pipeline = DocumentPipeline::new();

        pipeline.hydrate(Some(document(ParseStatus::Completed)));
        assert!(pipeline.is_parsed());
        assert!(!pipeline.is_polling());

        pipeline.hydrate(Some(document(ParseStatus::Pending)));
        assert!(matches!(pipeline.state(), PipelineState::Parsing { .. }));
        assert!(pipeline.is_polling());

        pipeline.hydrate(None);
        assert_eq!(pipeline.state(), &PipelineState::None);
    }

    #[test]
    fn test_failed_record_uses_parse_error_or_fallback() {
        let mut pipeline = DocumentPipeline::new();
        let mut failed = document(ParseStatus::Failed);
        failed.parse_error = Some("Scanned image has no text layer".to_string());
        pipeline.hydrate(Some(failed));
        assert_eq!(
            pipeline.state(),
            &PipelineState::Failed { message: "Scanned image has no text layer".to_string() }
        );

        pipeline.hydrate(Some(document(ParseStatus::Failed)));
        assert_eq!(
            pipeline.state(),
            &PipelineState::Failed { message: PARSE_FAILED_FALLBACK.to_string() }
        );
    }

    #[test]
    fn test_retry_only_from_failed() {
        let mut pipeline = DocumentPipeline::new();
        assert!(pipeline.retry().is_err());

        pipeline.hydrate(Some(document(ParseStatus::Failed)));
        pipeline.retry().unwrap();
        assert_eq!(pipeline.state(), &PipelineState::None);
        assert!(pipeline.cached_document().is_none());
    }

    fn document(status: ParseStatus) -> CarrierEstimateDocument {
        CarrierEstimateDocument {
            id: DocumentId::new_v7(),
            file_name: "estimate.pdf".to_string(),
            file_size: 1024,
            mime_type: "application/pdf".to_string(),
            parse_status: status,
            parse_error: None,
            created_at: Utc::now(),
        }
    }
}
