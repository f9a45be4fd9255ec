use thiserror::Error;

/// Malformed trial input, raised before a trial starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("valid-response set is empty")]
    EmptyChoiceSet,

    #[error("image_positions length ({positions}) must match images length ({items})")]
    PlacementMismatch { positions: usize, items: usize },

    #[error("target_index {index} is out of bounds for {len} items")]
    TargetOutOfBounds { index: usize, len: usize },

    #[error("item size and search area must be positive and finite (size {size}, area {width}x{height})")]
    InvalidArea { size: f64, width: f64, height: f64 },

    #[error("video stimulus needs at least one source file")]
    MissingSources,

    #[error("invalid playback window: {0}")]
    InvalidPlayback(String),

    #[error("invalid response count range {min}..={max}")]
    InvalidResponseRange { min: u32, max: u32 },

    #[error("invalid latency distribution: {0}")]
    InvalidLatency(String),
}
