use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Canonical word record that every vendor normalizer converges to.
///
/// One `Word` per pronunciation token; punctuation is always merged into
/// the preceding token and never appears on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    /// 1-based order of appearance within a chunk, strictly increasing
    pub seq_num: u32,
    /// Word text, with any trailing punctuation already attached
    pub word: String,
    /// Start timestamp in milliseconds, relative to the chunk start
    pub start_time: u64,
    /// End timestamp in milliseconds, always >= start_time
    pub end_time: u64,
    /// 1 for the primary subject's speech, 0 for the other party
    pub protagonist: u8,
}

/// Split a normalized word list into the two persisted partitions:
/// protagonist words first, non-protagonist words second.
///
/// A chunk with only one active speaker yields one empty partition, which
/// callers must not persist.
pub fn split_by_protagonist(words: Vec<Word>) -> (Vec<Word>, Vec<Word>) {
    let mut protagonist = Vec::new();
    let mut other = Vec::new();
    for word in words {
        if word.protagonist == 1 {
            protagonist.push(word);
        } else {
            other.push(word);
        }
    }
    (protagonist, other)
}

/// How the recording's speakers map onto the `protagonist` flag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerType {
    /// One speaker, the subject
    Single,
    /// Two speakers on one track; requires vendor diarization
    Both,
    /// One speaker, the subject, recorded on a separate track
    Interviewee,
    /// One speaker, the other party, recorded on a separate track
    Interviewer,
}

impl SpeakerType {
    /// The protagonist value every word gets, or `None` when it must come
    /// from vendor diarization (`Both`).
    pub fn fixed_protagonist(&self) -> Option<u8> {
        match self {
            SpeakerType::Single | SpeakerType::Interviewee => Some(1),
            SpeakerType::Interviewer => Some(0),
            SpeakerType::Both => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SpeakerType::Single => "single",
            SpeakerType::Both => "both",
            SpeakerType::Interviewee => "interviewee",
            SpeakerType::Interviewer => "interviewer",
        }
    }
}

impl fmt::Display for SpeakerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpeakerType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(SpeakerType::Single),
            "both" => Ok(SpeakerType::Both),
            "interviewee" => Ok(SpeakerType::Interviewee),
            "interviewer" => Ok(SpeakerType::Interviewer),
            other => Err(PipelineError::UnknownSpeakerType(other.to_string())),
        }
    }
}

/// The closed set of supported transcription vendors.
///
/// Unknown service tags are rejected here, at the boundary, never deeper
/// in the call chain.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Aws,
    Microsoft,
    Google,
    Ibm,
}

impl Service {
    pub const ALL: [Service; 4] = [
        Service::Aws,
        Service::Microsoft,
        Service::Google,
        Service::Ibm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Aws => "aws",
            Service::Microsoft => "microsoft",
            Service::Google => "google",
            Service::Ibm => "ibm",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aws" => Ok(Service::Aws),
            "microsoft" => Ok(Service::Microsoft),
            "google" => Ok(Service::Google),
            "ibm" => Ok(Service::Ibm),
            other => Err(PipelineError::UnknownService(other.to_string())),
        }
    }
}
