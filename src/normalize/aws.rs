use std::collections::HashMap;

use crate::error::PipelineError;
use crate::models::{AwsItemKind, AwsTranscript, Service, SpeakerType, Word};

use super::seconds_str_to_ms;

const SERVICE: Service = Service::Aws;

/// AWS Transcribe: word-level items with discrete pronunciation and
/// punctuation markers, plus a separate diarization segment list keyed
/// by the items' own start/end time strings.
pub(super) fn normalize(
    transcript: AwsTranscript,
    speaker_type: SpeakerType,
) -> Result<Vec<Word>, PipelineError> {
    let fixed = speaker_type.fixed_protagonist();
    let diarization = match fixed {
        Some(_) => None,
        None => Some(build_diarization(&transcript)?),
    };

    let mut words: Vec<Word> = Vec::new();
    for item in &transcript.results.items {
        match item.kind {
            AwsItemKind::Pronunciation => {
                let content = item
                    .alternatives
                    .first()
                    .map(|a| a.content.clone())
                    .ok_or_else(|| {
                        PipelineError::malformed(SERVICE, "pronunciation item with no alternatives")
                    })?;
                let (start_raw, end_raw) = match (&item.start_time, &item.end_time) {
                    (Some(s), Some(e)) => (s, e),
                    _ => {
                        return Err(PipelineError::malformed(
                            SERVICE,
                            "pronunciation item without timestamps",
                        ));
                    }
                };
                let protagonist = match (fixed, &diarization) {
                    (Some(value), _) => value,
                    (None, Some(map)) => *map
                        .get(&(start_raw.clone(), end_raw.clone()))
                        .ok_or_else(|| {
                            PipelineError::malformed(
                                SERVICE,
                                format!(
                                    "no diarization entry for token at {}..{}",
                                    start_raw, end_raw
                                ),
                            )
                        })?,
                    // fixed_protagonist is None only under `both`, and
                    // `both` always builds the map above
                    (None, None) => unreachable!(),
                };
                words.push(Word {
                    seq_num: words.len() as u32 + 1,
                    word: content,
                    start_time: seconds_str_to_ms(SERVICE, start_raw)?,
                    end_time: seconds_str_to_ms(SERVICE, end_raw)?,
                    protagonist,
                });
            }
            AwsItemKind::Punctuation => {
                let content = item
                    .alternatives
                    .first()
                    .map(|a| a.content.as_str())
                    .unwrap_or("");
                let previous = words.last_mut().ok_or_else(|| {
                    PipelineError::malformed(SERVICE, "punctuation token with no preceding word")
                })?;
                previous.word.push_str(content);
            }
        }
    }
    Ok(words)
}

/// Map each diarized (start, end) time pair to a protagonist value. The
/// raw time strings are used as keys so the lookup is exact, never a
/// float comparison.
fn build_diarization(
    transcript: &AwsTranscript,
) -> Result<HashMap<(String, String), u8>, PipelineError> {
    let labels = transcript.results.speaker_labels.as_ref().ok_or_else(|| {
        PipelineError::malformed(SERVICE, "speaker_type=both but transcript has no speaker_labels")
    })?;

    let mut map = HashMap::new();
    for segment in &labels.segments {
        for item in &segment.items {
            // spk_0 is the service's first enrolled speaker
            let protagonist = if item.speaker_label == "spk_0" { 0 } else { 1 };
            map.insert(
                (item.start_time.clone(), item.end_time.clone()),
                protagonist,
            );
        }
    }
    Ok(map)
}
