use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::models::{Service, SpeakerType};

/// Identity of one registered audio asset: a single interview or
/// performance part. Immutable once registered.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RecordingId {
    pub project: String,
    pub speaker: String,
    pub performance_date: NaiveDate,
    /// 1-based part number when one performance spans several files
    pub part: u32,
}

/// Chunk length, stored in whole seconds so job keys stay hashable.
///
/// Chunk boundaries (and all derived timestamps) are only comparable
/// between artifacts produced at the same timeframe value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timeframe(u32);

impl Timeframe {
    /// Default chunk length: 3 hours.
    pub const DEFAULT: Timeframe = Timeframe(3 * 3600);

    pub const fn from_secs(secs: u32) -> Timeframe {
        Timeframe(secs)
    }

    pub fn from_hours(hours: f64) -> Result<Timeframe, PipelineError> {
        if !hours.is_finite() || hours <= 0.0 {
            return Err(PipelineError::InvalidTimeframe(format!(
                "timeframe must be a positive number of hours, got {}",
                hours
            )));
        }
        let secs = (hours * 3600.0).round();
        if secs < 1.0 || secs > u32::MAX as f64 {
            return Err(PipelineError::InvalidTimeframe(format!(
                "timeframe of {} hours is out of range",
                hours
            )));
        }
        Ok(Timeframe(secs as u32))
    }

    pub fn as_secs(&self) -> u32 {
        self.0
    }

    pub fn as_hours(&self) -> f64 {
        self.0 as f64 / 3600.0
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The atomic unit of work: one (service, recording, chunk) combination.
///
/// Jobs are never materialized in a ledger; only their two completion
/// facets (transcript persisted, words persisted) exist in the catalog,
/// which keeps the planner a pure function of external state.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct JobKey {
    pub service: Service,
    pub recording: RecordingId,
    pub speaker_type: SpeakerType,
    pub timeframe: Timeframe,
    /// 1-based chunk ordinal; the chunk starts at `(section - 1) * timeframe`
    pub section: u32,
}

impl JobKey {
    /// Partition path of the raw transcript artifact, relative to the
    /// catalog root.
    pub fn transcript_path(&self) -> String {
        format!(
            "transcript/service={}/project={}/speaker={}/performance_date={}/part={}/speaker_type={}/timeframe={}/section={}/transcript.json",
            self.service,
            self.recording.project,
            self.recording.speaker,
            self.recording.performance_date,
            self.recording.part,
            self.speaker_type,
            self.timeframe,
            self.section,
        )
    }

    /// Partition path of one canonical-word artifact, relative to the
    /// catalog root.
    pub fn words_path(&self, protagonist: u8) -> String {
        format!(
            "word/project={}/speaker={}/performance_date={}/part={}/service={}/protagonist={}/timeframe={}/section={}/word.json",
            self.recording.project,
            self.recording.speaker,
            self.recording.performance_date,
            self.recording.part,
            self.service,
            protagonist,
            self.timeframe,
            self.section,
        )
    }

    /// Short human-readable form for logs and error context.
    pub fn describe(&self) -> String {
        format!(
            "{}/{}/{}/{}/part{}/tf{}/s{}",
            self.service,
            self.recording.project,
            self.recording.speaker,
            self.recording.performance_date,
            self.recording.part,
            self.timeframe,
            self.section,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> RecordingId {
        RecordingId {
            project: "oralhistory".to_string(),
            speaker: "maria".to_string(),
            performance_date: NaiveDate::from_ymd_opt(2021, 5, 14).unwrap(),
            part: 1,
        }
    }

    #[test]
    fn test_timeframe_from_hours() {
        assert_eq!(Timeframe::from_hours(3.0).unwrap().as_secs(), 10_800);
        assert_eq!(Timeframe::from_hours(0.5).unwrap().as_secs(), 1_800);
        assert!(Timeframe::from_hours(0.0).is_err());
        assert!(Timeframe::from_hours(-1.0).is_err());
        assert!(Timeframe::from_hours(f64::NAN).is_err());
    }

    #[test]
    fn test_timeframe_default() {
        assert_eq!(Timeframe::DEFAULT.as_secs(), 10_800);
        assert!((Timeframe::DEFAULT.as_hours() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_partition_paths() {
        let job = JobKey {
            service: Service::Aws,
            recording: recording(),
            speaker_type: SpeakerType::Both,
            timeframe: Timeframe::DEFAULT,
            section: 2,
        };

        assert_eq!(
            job.transcript_path(),
            "transcript/service=aws/project=oralhistory/speaker=maria/\
             performance_date=2021-05-14/part=1/speaker_type=both/\
             timeframe=10800/section=2/transcript.json"
        );
        assert_eq!(
            job.words_path(1),
            "word/project=oralhistory/speaker=maria/\
             performance_date=2021-05-14/part=1/service=aws/protagonist=1/\
             timeframe=10800/section=2/word.json"
        );
    }
}
