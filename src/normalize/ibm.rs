use crate::error::PipelineError;
use crate::models::{IbmTranscript, Service, SpeakerType, Word};

const SERVICE: Service = Service::Ibm;

/// IBM Watson: nested result groups of `[word, start, end]` triples in
/// fractional seconds. The feed is already punctuation-free and carries
/// no diarization, so `both` cannot be satisfied here.
pub(super) fn normalize(
    transcript: IbmTranscript,
    speaker_type: SpeakerType,
) -> Result<Vec<Word>, PipelineError> {
    let protagonist = speaker_type.fixed_protagonist().ok_or_else(|| {
        PipelineError::malformed(
            SERVICE,
            "feed carries no diarization; speaker_type=both is not supported",
        )
    })?;

    let mut words: Vec<Word> = Vec::new();
    for group in &transcript.results {
        for result in &group.results {
            let timestamps = result
                .alternatives
                .first()
                .map(|a| a.timestamps.as_slice())
                .unwrap_or(&[]);
            for stamp in timestamps {
                words.push(Word {
                    seq_num: words.len() as u32 + 1,
                    word: stamp.word().to_string(),
                    start_time: secs_to_ms(stamp.start_secs())?,
                    end_time: secs_to_ms(stamp.end_secs())?,
                    protagonist,
                });
            }
        }
    }
    Ok(words)
}

fn secs_to_ms(secs: f64) -> Result<u64, PipelineError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(PipelineError::malformed(
            SERVICE,
            format!("timestamp out of range: {}", secs),
        ));
    }
    Ok((secs * 1000.0) as u64)
}
