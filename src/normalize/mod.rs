//! Vendor transcript normalizers.
//!
//! Each vendor has its own raw schema; the normalizer's only job is to
//! extract pronunciation tokens in time order, merge punctuation into
//! the preceding token, and assign the `protagonist` flag.

mod aws;
mod google;
mod ibm;
mod microsoft;

use crate::error::PipelineError;
use crate::models::{Service, SpeakerType, Word};

/// Vendor-specific diarization mappings that are inferred from observed
/// service behavior rather than documented semantics, kept as
/// configuration instead of hardcoded assumptions.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Microsoft phrase-level speaker index treated as the
    /// non-protagonist under `both`
    pub microsoft_speaker_zero: u32,
    /// Google per-word speaker tag treated as the non-protagonist under
    /// `both`
    pub google_speaker_zero: u32,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            microsoft_speaker_zero: 1,
            google_speaker_zero: 1,
        }
    }
}

/// Normalize a raw vendor transcript into the canonical word timeline.
///
/// Returns words ordered by appearance with `seq_num` starting at 1.
pub fn normalize(
    service: Service,
    raw: serde_json::Value,
    speaker_type: SpeakerType,
    options: &NormalizeOptions,
) -> Result<Vec<Word>, PipelineError> {
    match service {
        Service::Aws => aws::normalize(decode(service, raw)?, speaker_type),
        Service::Microsoft => {
            microsoft::normalize(decode(service, raw)?, speaker_type, options)
        }
        Service::Google => google::normalize(decode(service, raw)?, speaker_type, options),
        Service::Ibm => ibm::normalize(decode(service, raw)?, speaker_type),
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    service: Service,
    raw: serde_json::Value,
) -> Result<T, PipelineError> {
    serde_json::from_value(raw).map_err(|e| PipelineError::malformed(service, e.to_string()))
}

/// Parse a decimal-seconds string ("12.34") into truncated milliseconds.
fn seconds_str_to_ms(service: Service, value: &str) -> Result<u64, PipelineError> {
    let secs: f64 = value.parse().map_err(|_| {
        PipelineError::malformed(service, format!("unparseable timestamp: {:?}", value))
    })?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(PipelineError::malformed(
            service,
            format!("timestamp out of range: {:?}", value),
        ));
    }
    Ok((secs * 1000.0) as u64)
}
