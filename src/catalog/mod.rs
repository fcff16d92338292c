//! Query contract against the durable completion catalog.
//!
//! The catalog is the only shared resource in the pipeline. Writes are
//! append-only and commutative, but its query index may lag behind the
//! objects: `list_*` read the index, the `*_exists` probes read the
//! objects directly, and `refresh_index` reconciles the two. Callers
//! are responsible for refreshing once per batch of writes, never
//! concurrently.

mod fs;
mod memory;

pub use fs::FsCatalog;
pub use memory::MemoryCatalog;

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::models::{JobKey, RecordingId, Service, Timeframe, Word};

/// One completion row from the catalog index: some artifact exists for
/// this (service, timeframe, section) of a recording.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Completion {
    pub service: Service,
    pub timeframe: Timeframe,
    pub section: u32,
}

impl From<&JobKey> for Completion {
    fn from(job: &JobKey) -> Self {
        Completion {
            service: job.service,
            timeframe: job.timeframe,
            section: job.section,
        }
    }
}

/// Durable catalog recording which jobs have produced a transcript
/// and/or parsed words.
#[async_trait]
pub trait CompletionStore: Send + Sync {
    /// All transcript completions recorded for one recording, at any
    /// timeframe. Bulk query against the index; the reconciliation
    /// planner subtracts in memory rather than probing per job.
    async fn list_transcripts(
        &self,
        recording: &RecordingId,
    ) -> Result<HashSet<Completion>, PipelineError>;

    /// All word (parse) completions recorded for one recording, at any
    /// timeframe. A job counts as parsed when at least one protagonist
    /// partition exists.
    async fn list_words(
        &self,
        recording: &RecordingId,
    ) -> Result<HashSet<Completion>, PipelineError>;

    /// Direct object check, bypassing the index.
    async fn transcript_exists(&self, job: &JobKey) -> Result<bool, PipelineError>;

    /// Direct object check, bypassing the index. True when either
    /// protagonist partition exists.
    async fn words_exist(&self, job: &JobKey) -> Result<bool, PipelineError>;

    /// Fetch the raw vendor transcript for a job.
    async fn read_transcript(&self, job: &JobKey) -> Result<serde_json::Value, PipelineError>;

    /// Persist one canonical-word partition. The index is stale until
    /// the next `refresh_index`.
    async fn write_words(
        &self,
        job: &JobKey,
        protagonist: u8,
        words: &[Word],
    ) -> Result<(), PipelineError>;

    /// Delete every transcript and word partition of a recording at the
    /// given timeframe. Used when the recording is re-chunked: derived
    /// timestamps are not comparable across timeframe values.
    async fn delete_timeframe(
        &self,
        recording: &RecordingId,
        timeframe: Timeframe,
    ) -> Result<(), PipelineError>;

    /// Rebuild the query index from the stored objects. Must run after
    /// bulk writes or deletes before the next `list_*` call.
    async fn refresh_index(&self) -> Result<(), PipelineError>;
}
