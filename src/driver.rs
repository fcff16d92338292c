use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::catalog::CompletionStore;
use crate::error::PipelineError;
use crate::models::{split_by_protagonist, JobKey, RecordingId, Service, SpeakerType, Timeframe};
use crate::normalize::{normalize, NormalizeOptions};
use crate::planner::{plan_chunks, reconcile, ChunkPlan, ComputeTier, ReconciliationPlan};

/// External vendor-submission collaborator. Implementations upload the
/// chunk audio and start the vendor job on a worker of the given tier;
/// the core never polls or retries on their behalf.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, job: &JobKey, tier: ComputeTier) -> Result<(), PipelineError>;
}

/// Inputs for one driver pass over a recording.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub services: Vec<Service>,
    /// Total decoded audio length
    pub duration_secs: u64,
    pub timeframe: Timeframe,
}

/// One job that failed during a pass, with enough context to retry it
/// by simply re-running the driver after the cause is fixed.
#[derive(Debug, Clone)]
pub struct JobFailure {
    pub job: JobKey,
    pub error: String,
}

/// What one driver pass did.
#[derive(Debug)]
pub struct RunSummary {
    pub tier: ComputeTier,
    pub chunk_count: usize,
    /// Timeframes whose stale artifacts were invalidated
    pub invalidated: Vec<Timeframe>,
    pub submitted: usize,
    pub parsed: usize,
    pub failures: Vec<JobFailure>,
}

impl RunSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sequences one pass of the pipeline: chunk planning, reconciliation,
/// dispatch of outstanding submissions, then normalize-and-persist for
/// every transcribed-but-unparsed job.
pub struct Driver<'a, S: CompletionStore, D: Dispatcher> {
    store: &'a S,
    dispatcher: &'a D,
    normalize_options: NormalizeOptions,
}

impl<'a, S: CompletionStore, D: Dispatcher> Driver<'a, S, D> {
    pub fn new(store: &'a S, dispatcher: &'a D) -> Self {
        Self {
            store,
            dispatcher,
            normalize_options: NormalizeOptions::default(),
        }
    }

    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.normalize_options = options;
        self
    }

    /// Compute the outstanding work for a recording without touching
    /// anything.
    pub async fn plan(
        &self,
        recording: &RecordingId,
        speaker_type: SpeakerType,
        options: &RunOptions,
    ) -> Result<(ChunkPlan, ReconciliationPlan), PipelineError> {
        let chunk_plan = plan_chunks(options.duration_secs, options.timeframe);
        let plan = reconcile(
            self.store,
            recording,
            speaker_type,
            &options.services,
            options.timeframe,
            &chunk_plan.chunks,
        )
        .await?;
        Ok((chunk_plan, plan))
    }

    pub async fn run(
        &self,
        recording: &RecordingId,
        speaker_type: SpeakerType,
        options: &RunOptions,
    ) -> Result<RunSummary, PipelineError> {
        let chunk_plan = plan_chunks(options.duration_secs, options.timeframe);
        info!(
            "planned {} chunks of {}s on the {:?} tier for {}/{}",
            chunk_plan.chunks.len(),
            options.timeframe.as_secs(),
            chunk_plan.tier,
            recording.project,
            recording.speaker,
        );

        let mut plan = reconcile(
            self.store,
            recording,
            speaker_type,
            &options.services,
            options.timeframe,
            &chunk_plan.chunks,
        )
        .await?;

        // Artifacts chunked at another timeframe are not comparable with
        // this run's output; invalidate them before doing anything else.
        let invalidated = plan.stale_timeframes.clone();
        if !invalidated.is_empty() {
            for stale in &invalidated {
                warn!(
                    "invalidating artifacts at stale timeframe {}s for {}/{}",
                    stale.as_secs(),
                    recording.project,
                    recording.speaker,
                );
                self.store.delete_timeframe(recording, *stale).await?;
            }
            self.store.refresh_index().await?;
            plan = reconcile(
                self.store,
                recording,
                speaker_type,
                &options.services,
                options.timeframe,
                &chunk_plan.chunks,
            )
            .await?;
        }

        info!(
            "{} jobs to submit, {} to parse",
            plan.to_submit.len(),
            plan.to_parse.len()
        );

        let mut failures = Vec::new();

        let mut submitted = 0;
        for job in &plan.to_submit {
            match self.dispatcher.dispatch(job, chunk_plan.tier).await {
                Ok(()) => submitted += 1,
                Err(e) => {
                    // Jobs are independent; one failed handoff must not
                    // starve the rest of the batch.
                    error!("dispatch failed for {}: {}", job.describe(), e);
                    failures.push(JobFailure {
                        job: job.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let mut parsed = 0;
        let mut index_dirty = false;
        for job in &plan.to_parse {
            match self.parse_job(job).await {
                Ok(wrote) => {
                    parsed += 1;
                    index_dirty |= wrote;
                }
                // A dead catalog means no further progress can be
                // recorded; abort the batch rather than churn.
                Err(e @ PipelineError::CatalogUnavailable(_)) => return Err(e),
                Err(e) => {
                    error!("parsing failed for {}: {}", job.describe(), e);
                    failures.push(JobFailure {
                        job: job.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        // One refresh for the whole batch, never one per job.
        if index_dirty {
            self.store.refresh_index().await?;
        }

        Ok(RunSummary {
            tier: chunk_plan.tier,
            chunk_count: chunk_plan.chunks.len(),
            invalidated,
            submitted,
            parsed,
            failures,
        })
    }

    /// Normalize one transcribed job and persist its non-empty word
    /// partitions. Returns whether anything was written.
    async fn parse_job(&self, job: &JobKey) -> Result<bool, PipelineError> {
        let raw = self.store.read_transcript(job).await?;
        let words = normalize(job.service, raw, job.speaker_type, &self.normalize_options)?;
        let (protagonist_words, other_words) = split_by_protagonist(words);

        let mut wrote = false;
        if !protagonist_words.is_empty() {
            self.store.write_words(job, 1, &protagonist_words).await?;
            wrote = true;
        }
        if !other_words.is_empty() {
            self.store.write_words(job, 0, &other_words).await?;
            wrote = true;
        }
        info!(
            "parsed {}: {} protagonist words, {} other",
            job.describe(),
            protagonist_words.len(),
            other_words.len()
        );
        Ok(wrote)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::NaiveDate;
    use serde_json::json;

    use crate::catalog::MemoryCatalog;
    use crate::models::Word;

    use super::*;

    /// Records dispatched jobs instead of calling a vendor.
    #[derive(Default)]
    struct RecordingDispatcher {
        dispatched: Mutex<Vec<(JobKey, ComputeTier)>>,
        fail: bool,
    }

    #[async_trait]
    impl Dispatcher for RecordingDispatcher {
        async fn dispatch(&self, job: &JobKey, tier: ComputeTier) -> Result<(), PipelineError> {
            if self.fail {
                return Err(PipelineError::DispatchFailed {
                    job: job.describe(),
                    reason: "worker quota exhausted".to_string(),
                });
            }
            if let Ok(mut dispatched) = self.dispatched.lock() {
                dispatched.push((job.clone(), tier));
            }
            Ok(())
        }
    }

    fn recording() -> RecordingId {
        RecordingId {
            project: "oralhistory".to_string(),
            speaker: "maria".to_string(),
            performance_date: NaiveDate::from_ymd_opt(2021, 5, 14).unwrap(),
            part: 1,
        }
    }

    fn job(service: Service, section: u32, timeframe: Timeframe) -> JobKey {
        JobKey {
            service,
            recording: recording(),
            speaker_type: SpeakerType::Single,
            timeframe,
            section,
        }
    }

    fn aws_raw() -> serde_json::Value {
        json!({
            "results": {
                "items": [
                    {
                        "type": "pronunciation",
                        "alternatives": [{"content": "hi"}],
                        "start_time": "0.0",
                        "end_time": "0.5"
                    },
                    {"type": "punctuation", "alternatives": [{"content": "!"}]}
                ]
            }
        })
    }

    fn options(timeframe: Timeframe, duration_secs: u64) -> RunOptions {
        RunOptions {
            services: vec![Service::Aws],
            duration_secs,
            timeframe,
        }
    }

    #[tokio::test]
    async fn test_run_dispatches_missing_and_parses_transcribed() {
        let catalog = MemoryCatalog::new();
        let dispatcher = RecordingDispatcher::default();
        let timeframe = Timeframe::DEFAULT;

        // Two chunks; the first already has a transcript.
        let transcribed = job(Service::Aws, 1, timeframe);
        catalog.insert_transcript(&transcribed, aws_raw());
        catalog.refresh_index().await.unwrap();
        let refreshes_before = catalog.refresh_count();

        let driver = Driver::new(&catalog, &dispatcher);
        let summary = driver
            .run(&recording(), SpeakerType::Single, &options(timeframe, 2 * 10_800))
            .await
            .unwrap();

        assert_eq!(summary.submitted, 1);
        assert_eq!(summary.parsed, 1);
        assert!(summary.all_succeeded());

        let dispatched = dispatcher.dispatched.lock().unwrap();
        assert_eq!(dispatched.len(), 1);
        assert_eq!(dispatched[0].0.section, 2);
        assert_eq!(dispatched[0].1, ComputeTier::Standard);

        let words = catalog.stored_words(&transcribed, 1).unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].word, "hi!");
        // No non-protagonist partition for a single-speaker chunk
        assert!(catalog.stored_words(&transcribed, 0).is_none());

        // Exactly one refresh for the whole parse batch
        assert_eq!(catalog.refresh_count(), refreshes_before + 1);
    }

    #[tokio::test]
    async fn test_settled_recording_is_a_no_op() {
        let catalog = MemoryCatalog::new();
        let dispatcher = RecordingDispatcher::default();
        let timeframe = Timeframe::DEFAULT;

        let done = job(Service::Aws, 1, timeframe);
        catalog.insert_transcript(&done, aws_raw());
        catalog
            .write_words(
                &done,
                1,
                &[Word {
                    seq_num: 1,
                    word: "hi!".to_string(),
                    start_time: 0,
                    end_time: 500,
                    protagonist: 1,
                }],
            )
            .await
            .unwrap();
        catalog.refresh_index().await.unwrap();
        let refreshes_before = catalog.refresh_count();

        let driver = Driver::new(&catalog, &dispatcher);
        let summary = driver
            .run(&recording(), SpeakerType::Single, &options(timeframe, 10_800))
            .await
            .unwrap();

        assert_eq!(summary.submitted, 0);
        assert_eq!(summary.parsed, 0);
        assert!(dispatcher.dispatched.lock().unwrap().is_empty());
        // Nothing written, so no refresh either
        assert_eq!(catalog.refresh_count(), refreshes_before);
    }

    #[tokio::test]
    async fn test_malformed_transcript_does_not_abort_batch() {
        let catalog = MemoryCatalog::new();
        let dispatcher = RecordingDispatcher::default();
        let timeframe = Timeframe::DEFAULT;

        let broken = job(Service::Aws, 1, timeframe);
        let healthy = job(Service::Aws, 2, timeframe);
        // Leading punctuation: malformed
        catalog.insert_transcript(
            &broken,
            json!({
                "results": {
                    "items": [
                        {"type": "punctuation", "alternatives": [{"content": ","}]}
                    ]
                }
            }),
        );
        catalog.insert_transcript(&healthy, aws_raw());
        catalog.refresh_index().await.unwrap();

        let driver = Driver::new(&catalog, &dispatcher);
        let summary = driver
            .run(&recording(), SpeakerType::Single, &options(timeframe, 2 * 10_800))
            .await
            .unwrap();

        assert_eq!(summary.parsed, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].job, broken);
        assert!(summary.failures[0].error.contains("malformed"));
        assert!(catalog.stored_words(&healthy, 1).is_some());
    }

    #[tokio::test]
    async fn test_timeframe_change_invalidates_old_artifacts() {
        let catalog = MemoryCatalog::new();
        let dispatcher = RecordingDispatcher::default();
        let old_timeframe = Timeframe::from_secs(10_800);
        let new_timeframe = Timeframe::from_secs(14_400);

        let old_job = job(Service::Aws, 1, old_timeframe);
        catalog.insert_transcript(&old_job, aws_raw());
        catalog
            .write_words(
                &old_job,
                1,
                &[Word {
                    seq_num: 1,
                    word: "hi!".to_string(),
                    start_time: 0,
                    end_time: 500,
                    protagonist: 1,
                }],
            )
            .await
            .unwrap();
        catalog.refresh_index().await.unwrap();

        let driver = Driver::new(&catalog, &dispatcher);
        let summary = driver
            .run(
                &recording(),
                SpeakerType::Single,
                &options(new_timeframe, 2 * 14_400),
            )
            .await
            .unwrap();

        assert_eq!(summary.invalidated, vec![old_timeframe]);
        assert!(!catalog.transcript_exists(&old_job).await.unwrap());
        assert!(!catalog.words_exist(&old_job).await.unwrap());
        // Both new-timeframe chunks go back to submission
        assert_eq!(summary.submitted, 2);
        assert_eq!(summary.tier, ComputeTier::Extended);
    }

    #[tokio::test]
    async fn test_dispatch_failure_is_recorded_not_fatal() {
        let catalog = MemoryCatalog::new();
        let dispatcher = RecordingDispatcher {
            fail: true,
            ..Default::default()
        };
        let timeframe = Timeframe::DEFAULT;

        let driver = Driver::new(&catalog, &dispatcher);
        let summary = driver
            .run(&recording(), SpeakerType::Single, &options(timeframe, 10_800))
            .await
            .unwrap();

        assert_eq!(summary.submitted, 0);
        assert_eq!(summary.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_unavailable_catalog_aborts_run() {
        let catalog = MemoryCatalog::new();
        let dispatcher = RecordingDispatcher::default();
        catalog.set_unavailable(true);

        let driver = Driver::new(&catalog, &dispatcher);
        let err = driver
            .run(
                &recording(),
                SpeakerType::Single,
                &options(Timeframe::DEFAULT, 10_800),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::CatalogUnavailable(_)));
    }

    #[tokio::test]
    async fn test_plan_is_side_effect_free_and_idempotent() {
        let catalog = MemoryCatalog::new();
        let dispatcher = RecordingDispatcher::default();
        let timeframe = Timeframe::DEFAULT;
        catalog.insert_transcript(&job(Service::Aws, 1, timeframe), aws_raw());
        catalog.refresh_index().await.unwrap();
        let refreshes_before = catalog.refresh_count();

        let driver = Driver::new(&catalog, &dispatcher);
        let run_options = options(timeframe, 3 * 10_800);
        let (_, first) = driver
            .plan(&recording(), SpeakerType::Single, &run_options)
            .await
            .unwrap();
        let (_, second) = driver
            .plan(&recording(), SpeakerType::Single, &run_options)
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first.to_submit.len(), 2);
        assert_eq!(first.to_parse.len(), 1);
        assert_eq!(catalog.refresh_count(), refreshes_before);
        assert!(dispatcher.dispatched.lock().unwrap().is_empty());
    }
}
