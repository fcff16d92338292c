use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::models::{JobKey, RecordingId, Timeframe, Word};

use super::{Completion, CompletionStore};

/// In-memory catalog used by tests and dry runs.
///
/// Models the durable catalog faithfully: objects land immediately, but
/// the query index only sees them after `refresh_index`, so listing
/// behavior matches the real store's staleness semantics.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    transcripts: HashMap<JobKey, serde_json::Value>,
    words: HashMap<(JobKey, u8), Vec<Word>>,
    transcript_index: HashSet<JobKey>,
    word_index: HashSet<(JobKey, u8)>,
    refresh_calls: usize,
    unavailable: bool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw transcript, as an external vendor worker would.
    /// Invisible to `list_transcripts` until the next refresh.
    pub fn insert_transcript(&self, job: &JobKey, raw: serde_json::Value) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.transcripts.insert(job.clone(), raw);
        }
    }

    /// Stored words for one partition, if any.
    pub fn stored_words(&self, job: &JobKey, protagonist: u8) -> Option<Vec<Word>> {
        self.inner
            .lock()
            .ok()
            .and_then(|inner| inner.words.get(&(job.clone(), protagonist)).cloned())
    }

    pub fn refresh_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.refresh_calls).unwrap_or(0)
    }

    /// Make every subsequent operation fail with `CatalogUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.unavailable = unavailable;
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, PipelineError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| PipelineError::CatalogUnavailable("catalog lock poisoned".to_string()))?;
        if inner.unavailable {
            return Err(PipelineError::CatalogUnavailable(
                "catalog marked unavailable".to_string(),
            ));
        }
        Ok(inner)
    }
}

#[async_trait]
impl CompletionStore for MemoryCatalog {
    async fn list_transcripts(
        &self,
        recording: &RecordingId,
    ) -> Result<HashSet<Completion>, PipelineError> {
        let inner = self.lock()?;
        Ok(inner
            .transcript_index
            .iter()
            .filter(|job| &job.recording == recording)
            .map(Completion::from)
            .collect())
    }

    async fn list_words(
        &self,
        recording: &RecordingId,
    ) -> Result<HashSet<Completion>, PipelineError> {
        let inner = self.lock()?;
        Ok(inner
            .word_index
            .iter()
            .filter(|(job, _)| &job.recording == recording)
            .map(|(job, _)| Completion::from(job))
            .collect())
    }

    async fn transcript_exists(&self, job: &JobKey) -> Result<bool, PipelineError> {
        let inner = self.lock()?;
        Ok(inner.transcripts.contains_key(job))
    }

    async fn words_exist(&self, job: &JobKey) -> Result<bool, PipelineError> {
        let inner = self.lock()?;
        Ok(inner.words.contains_key(&(job.clone(), 1))
            || inner.words.contains_key(&(job.clone(), 0)))
    }

    async fn read_transcript(&self, job: &JobKey) -> Result<serde_json::Value, PipelineError> {
        let inner = self.lock()?;
        inner
            .transcripts
            .get(job)
            .cloned()
            .ok_or_else(|| PipelineError::TranscriptMissing(job.describe()))
    }

    async fn write_words(
        &self,
        job: &JobKey,
        protagonist: u8,
        words: &[Word],
    ) -> Result<(), PipelineError> {
        let mut inner = self.lock()?;
        inner
            .words
            .insert((job.clone(), protagonist), words.to_vec());
        Ok(())
    }

    async fn delete_timeframe(
        &self,
        recording: &RecordingId,
        timeframe: Timeframe,
    ) -> Result<(), PipelineError> {
        let mut inner = self.lock()?;
        inner
            .transcripts
            .retain(|job, _| !(&job.recording == recording && job.timeframe == timeframe));
        inner
            .words
            .retain(|(job, _), _| !(&job.recording == recording && job.timeframe == timeframe));
        Ok(())
    }

    async fn refresh_index(&self) -> Result<(), PipelineError> {
        let mut inner = self.lock()?;
        inner.refresh_calls += 1;
        let transcript_index = inner.transcripts.keys().cloned().collect();
        let word_index = inner.words.keys().cloned().collect();
        inner.transcript_index = transcript_index;
        inner.word_index = word_index;
        Ok(())
    }
}
