use std::time::Duration;

use crate::error::ConfigError;
use crate::preset::{Baselines, Deployment, Preset, ResolutionTier};

pub const DEFAULT_SAMPLE_WINDOW: Duration = Duration::from_millis(1000);
pub const DEFAULT_FPS: u32 = 30;
/// Largest frame side any H.264 level allows.
pub const MAX_DIMENSION: u32 = 8192;

/// Session parameters the controller is built from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// `None` picks the tier from `width` x `height`.
    pub tier: Option<ResolutionTier>,
    pub deployment: Deployment,
    /// `None`, or all-zero baselines, fall back to the preset defaults.
    pub baselines: Option<Baselines>,
    /// Replaces the tier preset entirely.
    pub preset: Option<Preset>,
    pub sample_window: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: DEFAULT_FPS,
            tier: None,
            deployment: Deployment::Desktop,
            baselines: None,
            preset: None,
            sample_window: DEFAULT_SAMPLE_WINDOW,
        }
    }
}

impl ControllerConfig {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps,
            ..Default::default()
        }
    }

    pub fn tier(&self) -> ResolutionTier {
        self.tier
            .unwrap_or_else(|| ResolutionTier::for_dimensions(self.width, self.height))
    }

    /// The effective preset with caller baselines folded in.
    pub fn resolved_preset(&self) -> Preset {
        let mut preset = self.preset.unwrap_or_else(|| self.tier().preset());
        if let Some(baselines) = self.baselines.filter(|b| !b.is_unset()) {
            preset.baselines = baselines;
        }
        preset
    }

    pub fn validate(&self) -> Result<Preset, ConfigError> {
        if !(1..=MAX_DIMENSION).contains(&self.width)
            || !(1..=MAX_DIMENSION).contains(&self.height)
        {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.fps == 0 {
            return Err(ConfigError::ZeroFps);
        }
        if self.sample_window.is_zero() {
            return Err(ConfigError::ZeroSampleWindow);
        }
        let preset = self.resolved_preset();
        preset.validate()?;
        Ok(preset)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    pub controller: ControllerConfig,
    pub initial_bitrate: u32,
    pub adaptive_qp: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            initial_bitrate: 3_000_000,
            adaptive_qp: true,
        }
    }
}

impl SessionConfig {
    /// Requests below this are raised to it before classification.
    pub fn min_bitrate(&self) -> u32 {
        (f64::from(self.initial_bitrate) / 2.5) as u32
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_bitrate == 0 {
            return Err(ConfigError::ZeroBitrate);
        }
        self.controller.validate().map(|_| ())
    }
}
