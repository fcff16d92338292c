use std::collections::HashSet;

use tracing::debug;

use crate::catalog::{Completion, CompletionStore};
use crate::error::PipelineError;
use crate::models::{JobKey, RecordingId, Service, SpeakerType, Timeframe};

use super::ChunkSpec;

/// Outcome of reconciling the desired job set against the catalog.
///
/// Purely a function of the catalog state: re-running with no
/// intervening writes yields an identical plan, which is what lets the
/// pipeline survive crashes and reruns without double-submitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    /// Jobs with no transcript yet: submit to the vendor
    pub to_submit: Vec<JobKey>,
    /// Jobs with a transcript but no parsed words yet: normalize
    pub to_parse: Vec<JobKey>,
    /// Timeframes other than the requested one that still have
    /// completions recorded; their artifacts must be invalidated before
    /// this plan's jobs run
    pub stale_timeframes: Vec<Timeframe>,
}

impl ReconciliationPlan {
    pub fn is_settled(&self) -> bool {
        self.to_submit.is_empty() && self.to_parse.is_empty() && self.stale_timeframes.is_empty()
    }
}

/// Every (service, chunk) job requested for one recording.
pub fn desired_jobs(
    recording: &RecordingId,
    speaker_type: SpeakerType,
    services: &[Service],
    chunks: &[ChunkSpec],
) -> Vec<JobKey> {
    let mut jobs = Vec::with_capacity(services.len() * chunks.len());
    for &service in services {
        for chunk in chunks {
            jobs.push(JobKey {
                service,
                recording: recording.clone(),
                speaker_type,
                timeframe: chunk.timeframe,
                section: chunk.section,
            });
        }
    }
    jobs
}

/// Anti-join of the desired set against the recorded completions.
///
/// `to_submit` = desired minus transcribed; `to_parse` = transcribed
/// minus parsed. Both outputs are sorted so a rerun against unchanged
/// state is byte-identical.
pub fn plan_outstanding(
    desired: &[JobKey],
    timeframe: Timeframe,
    transcribed: &HashSet<Completion>,
    parsed: &HashSet<Completion>,
) -> ReconciliationPlan {
    let mut to_submit = Vec::new();
    let mut to_parse = Vec::new();

    for job in desired {
        let completion = Completion::from(job);
        if !transcribed.contains(&completion) {
            to_submit.push(job.clone());
        } else if !parsed.contains(&completion) {
            to_parse.push(job.clone());
        }
    }
    to_submit.sort();
    to_parse.sort();

    let mut stale_timeframes: Vec<Timeframe> = transcribed
        .iter()
        .chain(parsed.iter())
        .map(|c| c.timeframe)
        .filter(|tf| *tf != timeframe)
        .collect();
    stale_timeframes.sort();
    stale_timeframes.dedup();

    ReconciliationPlan {
        to_submit,
        to_parse,
        stale_timeframes,
    }
}

/// Reconcile one recording's desired job set against the catalog with
/// two bulk listings and in-memory set subtraction.
pub async fn reconcile<S: CompletionStore + ?Sized>(
    store: &S,
    recording: &RecordingId,
    speaker_type: SpeakerType,
    services: &[Service],
    timeframe: Timeframe,
    chunks: &[ChunkSpec],
) -> Result<ReconciliationPlan, PipelineError> {
    let transcribed = store.list_transcripts(recording).await?;
    let parsed = store.list_words(recording).await?;
    debug!(
        "catalog lists {} transcript and {} word completions for {}/{}",
        transcribed.len(),
        parsed.len(),
        recording.project,
        recording.speaker,
    );

    let desired = desired_jobs(recording, speaker_type, services, chunks);
    Ok(plan_outstanding(&desired, timeframe, &transcribed, &parsed))
}
