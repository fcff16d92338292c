use crate::error::PipelineError;
use crate::models::{MicrosoftTranscript, Service, SpeakerType, Word};

use super::NormalizeOptions;

const SERVICE: Service = Service::Microsoft;
const TICKS_PER_MS: f64 = 10_000.0;

/// Microsoft batch transcription: phrase-level timing only, so each
/// phrase's duration is distributed evenly across its display words.
/// The last word of a phrase absorbs the integer-division remainder by
/// ending at the phrase's true end offset.
pub(super) fn normalize(
    transcript: MicrosoftTranscript,
    speaker_type: SpeakerType,
    options: &NormalizeOptions,
) -> Result<Vec<Word>, PipelineError> {
    let fixed = speaker_type.fixed_protagonist();

    let mut words: Vec<Word> = Vec::new();
    for phrase in &transcript.recognized_phrases {
        let protagonist = match fixed {
            Some(value) => value,
            // Diarization is phrase-level: the whole phrase flips on the
            // speaker index.
            None => {
                let speaker = phrase.speaker.ok_or_else(|| {
                    PipelineError::malformed(
                        SERVICE,
                        "speaker_type=both but phrase carries no speaker index",
                    )
                })?;
                if speaker == options.microsoft_speaker_zero {
                    0
                } else {
                    1
                }
            }
        };

        let tokens: Vec<&str> = phrase.display().split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        let phrase_duration_ms = (phrase.duration_in_ticks / TICKS_PER_MS) as u64;
        let per_word_ms = phrase_duration_ms / tokens.len() as u64;
        let mut offset_ms = (phrase.offset_in_ticks / TICKS_PER_MS) as u64;
        let phrase_end_ms = offset_ms + phrase_duration_ms;

        for token in &tokens {
            words.push(Word {
                seq_num: words.len() as u32 + 1,
                word: (*token).to_string(),
                start_time: offset_ms,
                end_time: offset_ms + per_word_ms.max(1) - 1,
                protagonist,
            });
            offset_ms += per_word_ms;
        }
        if let Some(last) = words.last_mut() {
            last.end_time = phrase_end_ms;
        }
    }
    Ok(words)
}
