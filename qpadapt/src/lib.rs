#![forbid(unsafe_code)]

//! Adaptive QP-delta control for hardware H.264 encode sessions.
//!
//! A [`QpController`] watches how many bits the encoder actually produced
//! over one-second windows and nudges a per-band QP-delta baseline up or
//! down, painting it into a macroblock ROI map that alternates between a
//! central and a surrounding emphasis. [`EncodeSession`] wires the
//! controller to a [`HwEncoder`] implementation.

pub mod adaptive;
pub mod band;
pub mod cache;
pub mod clock;
pub mod config;
pub mod controller;
pub mod error;
pub mod packet;
pub mod preset;
pub mod roi;
pub mod session;
pub mod warmup;

pub use adaptive::{QpDeltaMode, WindowDecision};
pub use band::Band;
pub use cache::SourceId;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ControllerConfig, SessionConfig};
pub use controller::{ControllerStats, QpController};
pub use error::{ConfigError, EncodeError};
pub use packet::{FrameType, Packet};
pub use preset::{Baselines, Deployment, Preset, ResolutionTier, Watermarks};
pub use roi::{RoiMap, RoiPattern};
pub use session::{EncodeSession, EncodedPicture, HwEncoder, PictureParams};
pub use warmup::ArmReason;
