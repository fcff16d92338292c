use crate::error::PipelineError;
use crate::models::{GoogleTranscript, GoogleWord, Service, SpeakerType, Word};

use super::NormalizeOptions;

const SERVICE: Service = Service::Google;

/// Google Speech-to-Text: timed words carrying duration strings with a
/// trailing unit suffix ("1.300s") and, in the diarized feed, a
/// per-word speaker tag.
pub(super) fn normalize(
    transcript: GoogleTranscript,
    speaker_type: SpeakerType,
    options: &NormalizeOptions,
) -> Result<Vec<Word>, PipelineError> {
    let mut words: Vec<Word> = Vec::new();
    match speaker_type.fixed_protagonist() {
        None => {
            // Only the final result group carries the complete tagged
            // word list; earlier groups repeat partial output.
            for raw in transcript.final_words() {
                let tag = raw.speaker_tag.ok_or_else(|| {
                    PipelineError::malformed(
                        SERVICE,
                        format!("speaker_type=both but word {:?} has no speakerTag", raw.word),
                    )
                })?;
                let protagonist = if tag == options.google_speaker_zero {
                    0
                } else {
                    1
                };
                push_word(&mut words, raw, protagonist)?;
            }
        }
        Some(protagonist) => {
            for group in &transcript.results {
                let group_words = group
                    .alternatives
                    .first()
                    .map(|a| a.words.as_slice())
                    .unwrap_or(&[]);
                for raw in group_words {
                    push_word(&mut words, raw, protagonist)?;
                }
            }
        }
    }
    Ok(words)
}

fn push_word(words: &mut Vec<Word>, raw: &GoogleWord, protagonist: u8) -> Result<(), PipelineError> {
    words.push(Word {
        seq_num: words.len() as u32 + 1,
        word: raw.word.clone(),
        start_time: duration_str_to_ms(&raw.start_time)?,
        end_time: duration_str_to_ms(&raw.end_time)?,
        protagonist,
    });
    Ok(())
}

/// Strip the trailing unit character from a "1.300s"-style duration and
/// convert to truncated milliseconds.
fn duration_str_to_ms(value: &str) -> Result<u64, PipelineError> {
    let seconds = value.strip_suffix('s').ok_or_else(|| {
        PipelineError::malformed(SERVICE, format!("duration without unit suffix: {:?}", value))
    })?;
    super::seconds_str_to_ms(SERVICE, seconds)
}
