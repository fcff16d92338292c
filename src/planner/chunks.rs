use serde::{Deserialize, Serialize};

use crate::models::Timeframe;

/// Timeframes above 3h40m of audio need the bigger worker tier: larger
/// chunks take proportionally longer to transcribe and must not be
/// evicted before the vendor job completes.
pub const EXTENDED_TIER_THRESHOLD_SECS: u32 = 13_200;

/// Compute sizing for the external vendor-submission workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeTier {
    Standard,
    Extended,
}

impl ComputeTier {
    pub fn for_timeframe(timeframe: Timeframe) -> ComputeTier {
        if timeframe.as_secs() > EXTENDED_TIER_THRESHOLD_SECS {
            ComputeTier::Extended
        } else {
            ComputeTier::Standard
        }
    }
}

/// One contiguous slice of a recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSpec {
    /// 1-based ordinal; the chunk starts at `(section - 1) * timeframe`
    pub section: u32,
    pub timeframe: Timeframe,
    /// Actual chunk length; equals the timeframe except for a truncated
    /// final chunk
    pub length_secs: u32,
}

impl ChunkSpec {
    pub fn start_offset_secs(&self) -> u64 {
        (self.section as u64 - 1) * self.timeframe.as_secs() as u64
    }

    pub fn timeframe_hours(&self) -> f64 {
        self.timeframe.as_hours()
    }
}

/// Chunk boundaries plus the compute tier the whole recording's jobs
/// should run on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub chunks: Vec<ChunkSpec>,
    pub tier: ComputeTier,
}

/// Slice a recording of the given duration into contiguous,
/// non-overlapping chunks covering it exactly; only the last chunk may
/// be shorter than the timeframe.
pub fn plan_chunks(duration_secs: u64, timeframe: Timeframe) -> ChunkPlan {
    let tier = ComputeTier::for_timeframe(timeframe);
    let step = timeframe.as_secs() as u64;

    let mut chunks = Vec::new();
    let mut remaining = duration_secs;
    let mut section = 1u32;
    while remaining > 0 {
        let length = remaining.min(step);
        chunks.push(ChunkSpec {
            section,
            timeframe,
            length_secs: length as u32,
        });
        remaining -= length;
        section += 1;
    }

    ChunkPlan { chunks, tier }
}
