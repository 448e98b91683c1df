use thiserror::Error;

/// Configuration and misuse errors raised by the visualization engine.
///
/// Transient conditions (no new window yet, history miss, discontinuity)
/// are never errors; they surface as a skipped tick instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VisualizerError {
    #[error("FFT size must be a power of two with matching buffers (got {0})")]
    InvalidFftSize(usize),

    #[error("unsupported screen size {width}x{height} (need 640-1920 x 560-1080)")]
    UnsupportedScreen { width: u32, height: u32 },

    #[error("unsupported stream format: {sample_rate} Hz, {channels} channels")]
    UnsupportedFormat { sample_rate: u32, channels: u16 },

    #[error("stream format was never configured")]
    NotConfigured,

    #[error("projection construction found no intersection for {0}")]
    DegenerateProjection(&'static str),
}

pub type Result<T> = std::result::Result<T, VisualizerError>;
