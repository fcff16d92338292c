use serde::{Deserialize, Serialize};

/// Root of a Microsoft batch transcription result.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MicrosoftTranscript {
    #[serde(rename = "recognizedPhrases", default)]
    pub recognized_phrases: Vec<MicrosoftPhrase>,
}

/// One recognized phrase. The service reports timing at phrase
/// granularity only: a total offset and duration in 100ns ticks, plus a
/// pre-tokenized punctuated display string.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MicrosoftPhrase {
    /// 1-based speaker index, present when diarization was requested
    #[serde(default)]
    pub speaker: Option<u32>,
    #[serde(rename = "offsetInTicks")]
    pub offset_in_ticks: f64,
    #[serde(rename = "durationInTicks")]
    pub duration_in_ticks: f64,
    #[serde(rename = "nBest", default)]
    pub n_best: Vec<MicrosoftCandidate>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MicrosoftCandidate {
    /// Punctuated, capitalized rendering of the phrase
    #[serde(default)]
    pub display: Option<String>,
}

impl MicrosoftPhrase {
    /// Display text of the best candidate, empty when the service
    /// produced none.
    pub fn display(&self) -> &str {
        self.n_best
            .first()
            .and_then(|c| c.display.as_deref())
            .unwrap_or("")
    }
}
