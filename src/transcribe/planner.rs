/// Default segment length: ten minutes of audio stays well below the upload limit at 128 kbit/s
pub const DEFAULT_CHUNK_SECONDS: f64 = 600.0;

/// One time-bounded slice of the source audio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// 0-based position in the plan
    pub index: usize,
    pub start_seconds: f64,
    pub length_seconds: f64,
}

impl Segment {
    pub fn end_seconds(&self) -> f64 {
        self.start_seconds + self.length_seconds
    }
}

/// Ordered, contiguous segments covering `[0, total)`
pub type ChunkPlan = Vec<Segment>;

/// Split `total_seconds` of audio into consecutive segments of `chunk_seconds`.
///
/// Only the last segment may be shorter. A non-positive or non-finite total yields an empty plan,
/// which callers treat as "send the whole file".
pub fn plan(total_seconds: f64, chunk_seconds: f64) -> ChunkPlan {
    if !total_seconds.is_finite() || total_seconds <= 0.0 || !chunk_seconds.is_finite() || chunk_seconds <= 0.0 {
        return Vec::new();
    }

    let count = (total_seconds / chunk_seconds).ceil() as usize;

    (0..count)
        .map(|index| {
            let start_seconds = index as f64 * chunk_seconds;
            Segment {
                index,
                start_seconds,
                length_seconds: chunk_seconds.min(total_seconds - start_seconds),
            }
        })
        .filter(|segment| segment.length_seconds > 0.0)
        .collect()
}
