use thiserror::Error;

use crate::models::Service;

/// Errors surfaced by the transcription pipeline core.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The vendor transcript does not match its documented shape, or
    /// violates an ordering/diarization invariant the normalizer relies on.
    /// Fatal for that single job; other jobs in the batch keep going.
    #[error("malformed {service} transcript: {reason}")]
    MalformedTranscript { service: Service, reason: String },

    /// Rejected at the boundary, before any job is planned or dispatched.
    #[error("unknown speaker type: {0}")]
    UnknownSpeakerType(String),

    /// Rejected at the boundary, before any job is planned or dispatched.
    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("invalid timeframe: {0}")]
    InvalidTimeframe(String),

    /// The durable catalog could not be queried or refreshed. Aborts the
    /// current batch without marking anything complete.
    #[error("catalog unavailable: {0}")]
    CatalogUnavailable(String),

    /// A job was planned for parsing but its transcript artifact is gone
    /// (e.g. cancelled between reconciliation and the parse pass).
    #[error("transcript not found for job {0}")]
    TranscriptMissing(String),

    #[error("dispatch failed for job {job}: {reason}")]
    DispatchFailed { job: String, reason: String },
}

impl PipelineError {
    /// Helper for normalizer code paths.
    pub fn malformed(service: Service, reason: impl Into<String>) -> Self {
        Self::MalformedTranscript {
            service,
            reason: reason.into(),
        }
    }
}
