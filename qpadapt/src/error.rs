use crate::cache::SourceId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid dimensions {width}x{height}: each side must be 1..={max}", max = crate::config::MAX_DIMENSION)]
    InvalidDimensions { width: u32, height: u32 },
    #[error("fps must be > 0")]
    ZeroFps,
    #[error("sample window must be longer than zero")]
    ZeroSampleWindow,
    #[error("watermark `{name}` must be > 0")]
    ZeroWatermark { name: &'static str },
    #[error("watermark `{upper}` ({upper_bits}) must be above `{lower}` ({lower_bits})")]
    WatermarkOrder {
        lower: &'static str,
        lower_bits: u64,
        upper: &'static str,
        upper_bits: u64,
    },
    #[error("min threshold {min} is above max threshold {max}")]
    ThresholdOrder { min: i32, max: i32 },
    #[error("{band} baseline {value} outside [{min}, {max}]")]
    BaselineOutOfRange {
        band: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },
    #[error("spatial offset must be >= 0, got {0}")]
    NegativeOffset(i32),
    #[error("initial bitrate must be > 0")]
    ZeroBitrate,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to register source buffer {id}: {reason}")]
    Registration { id: SourceId, reason: String },
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("bitrate reconfigure failed: {0}")]
    Reconfigure(String),
}
