use serde::{Deserialize, Serialize};

/// Root of an IBM Watson Speech to Text result as persisted by the
/// pipeline: one outer group per recognition call, each wrapping the
/// service's own result list.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IbmTranscript {
    #[serde(default)]
    pub results: Vec<IbmResultGroup>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IbmResultGroup {
    #[serde(default)]
    pub results: Vec<IbmResult>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IbmResult {
    pub alternatives: Vec<IbmAlternative>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IbmAlternative {
    /// `[word, start_seconds, end_seconds]` triples in time order. The
    /// feed carries no punctuation tokens.
    #[serde(default)]
    pub timestamps: Vec<IbmTimestamp>,
}

/// A timed word triple, serialized as a JSON array.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IbmTimestamp(pub String, pub f64, pub f64);

impl IbmTimestamp {
    pub fn word(&self) -> &str {
        &self.0
    }

    pub fn start_secs(&self) -> f64 {
        self.1
    }

    pub fn end_secs(&self) -> f64 {
        self.2
    }
}
