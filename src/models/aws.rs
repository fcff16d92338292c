use serde::{Deserialize, Serialize};

/// Root of an AWS Transcribe job result.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AwsTranscript {
    pub results: AwsResults,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AwsResults {
    /// Word-level items in time order, mixing pronunciation and
    /// punctuation entries
    pub items: Vec<AwsItem>,
    /// Present only when the job ran with speaker labels enabled
    #[serde(default)]
    pub speaker_labels: Option<AwsSpeakerLabels>,
}

/// One token. Punctuation items carry no timestamps; their text belongs
/// to the preceding pronunciation item.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AwsItem {
    #[serde(rename = "type")]
    pub kind: AwsItemKind,
    pub alternatives: Vec<AwsAlternative>,
    /// Fractional seconds as a decimal string, e.g. "12.34"
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AwsItemKind {
    Pronunciation,
    Punctuation,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AwsAlternative {
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AwsSpeakerLabels {
    pub segments: Vec<AwsSpeakerSegment>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AwsSpeakerSegment {
    pub items: Vec<AwsSpeakerItem>,
}

/// Diarization entry keyed by the same start/end time strings the
/// pronunciation items carry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AwsSpeakerItem {
    pub start_time: String,
    pub end_time: String,
    /// "spk_0", "spk_1", ...
    pub speaker_label: String,
}
