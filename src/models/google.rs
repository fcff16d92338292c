use serde::{Deserialize, Serialize};

/// Root of a Google Speech-to-Text long-running recognition result.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleTranscript {
    #[serde(default)]
    pub results: Vec<GoogleResult>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleResult {
    pub alternatives: Vec<GoogleAlternative>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleAlternative {
    #[serde(default)]
    pub words: Vec<GoogleWord>,
}

/// One timed word. Timestamps are duration strings with a trailing
/// second-unit suffix, e.g. "1.300s".
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleWord {
    pub word: String,
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    /// 1-based speaker tag, only populated in the diarized final result
    #[serde(rename = "speakerTag", default)]
    pub speaker_tag: Option<u32>,
}

impl GoogleTranscript {
    /// Words of the final result group. In the diarized feed, earlier
    /// groups repeat partial output and only the last group carries the
    /// complete tagged word list.
    pub fn final_words(&self) -> &[GoogleWord] {
        self.results
            .last()
            .and_then(|r| r.alternatives.first())
            .map(|a| a.words.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_google_transcript() {
        let json = r#"{
            "results": [
                {
                    "alternatives": [{
                        "transcript": "hello world",
                        "words": [
                            {"word": "hello", "startTime": "0s", "endTime": "0.700s"},
                            {"word": "world", "startTime": "0.700s", "endTime": "1.300s", "speakerTag": 2}
                        ]
                    }]
                }
            ]
        }"#;

        let transcript: GoogleTranscript = serde_json::from_str(json).unwrap();
        let words = transcript.final_words();

        assert_eq!(words.len(), 2);
        assert_eq!(words[0].word, "hello");
        assert_eq!(words[0].start_time, "0s");
        assert_eq!(words[0].speaker_tag, None);
        assert_eq!(words[1].speaker_tag, Some(2));
    }

    #[test]
    fn test_final_words_picks_last_group() {
        let json = r#"{
            "results": [
                {"alternatives": [{"words": [{"word": "partial", "startTime": "0s", "endTime": "1s"}]}]},
                {"alternatives": [{"words": [
                    {"word": "full", "startTime": "0s", "endTime": "1s", "speakerTag": 1}
                ]}]}
            ]
        }"#;

        let transcript: GoogleTranscript = serde_json::from_str(json).unwrap();
        let words = transcript.final_words();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].word, "full");
    }
}
