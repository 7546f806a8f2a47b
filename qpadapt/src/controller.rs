use std::time::Instant;

use tracing::{debug, info, warn};

use crate::adaptive::{AdaptiveState, QpDeltaMode, WindowDecision};
use crate::band::{self, Band};
use crate::config::ControllerConfig;
use crate::error::ConfigError;
use crate::preset::{Baselines, Deployment, Preset, ResolutionTier};
use crate::roi::{self, RoiMap};
use crate::warmup::{ArmReason, WarmupGate};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ControllerStats {
    pub armed: bool,
    pub paused: bool,
    pub mode: QpDeltaMode,
    pub band: Band,
    pub baselines: Baselines,
    pub last_window_bits: Option<u64>,
    pub windows_evaluated: u64,
    pub adjustments_applied: u64,
}

/// Per-session adaptive QP-delta controller.
///
/// Call [`prepare_frame`](Self::prepare_frame) before submitting a picture
/// and attach the returned map, then [`frame_encoded`](Self::frame_encoded)
/// with the size the encoder produced.
#[derive(Debug)]
pub struct QpController {
    tier: ResolutionTier,
    deployment: Deployment,
    preset: Preset,
    baselines: Baselines,
    gate: WarmupGate,
    adaptive: AdaptiveState,
    roi: RoiMap,
    prev_band: Band,
    suitable_samples: u32,
    paused: bool,
    last_window_bits: Option<u64>,
    windows_evaluated: u64,
    adjustments_applied: u64,
}

impl QpController {
    pub fn new(config: &ControllerConfig, now: Instant) -> Result<Self, ConfigError> {
        let preset = config.validate()?;
        let tier = config.tier();

        info!(
            width = config.width,
            height = config.height,
            fps = config.fps,
            ?tier,
            deployment = ?config.deployment,
            min_threshold = preset.min_threshold,
            max_threshold = preset.max_threshold,
            spatial_offset = preset.spatial_offset,
            "qp controller created"
        );

        Ok(Self {
            tier,
            deployment: config.deployment,
            preset,
            baselines: preset.baselines,
            gate: WarmupGate::new(
                now,
                config.sample_window,
                config.deployment.warmup_ceiling_minutes(),
                config.fps,
            ),
            adaptive: AdaptiveState::new(
                now,
                config.sample_window,
                preset.watermarks,
                preset.min_threshold,
                preset.max_threshold,
            ),
            roi: RoiMap::new(config.width, config.height),
            prev_band: Band::Low,
            suitable_samples: 0,
            paused: false,
            last_window_bits: None,
            windows_evaluated: 0,
            adjustments_applied: 0,
        })
    }

    pub fn tier(&self) -> ResolutionTier {
        self.tier
    }

    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    pub fn baselines(&self) -> Baselines {
        self.baselines
    }

    pub fn is_armed(&self) -> bool {
        self.gate.is_open()
    }

    pub fn arm_reason(&self) -> Option<ArmReason> {
        self.gate.reason()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn mode(&self) -> QpDeltaMode {
        self.adaptive.mode()
    }

    pub fn ready_to_adjust(&self) -> bool {
        self.adaptive.ready()
    }

    pub fn roi(&self) -> &RoiMap {
        &self.roi
    }

    /// Classifies `bitrate`, applies a pending window decision to that
    /// band's baseline and repaints the ROI map.
    pub fn prepare_frame(&mut self, bitrate: u32) -> &RoiMap {
        let band = band::classify(bitrate);
        let band_unchanged = band == self.prev_band;

        if self.adaptive.ready() {
            let current = self.baselines.get(band);
            let next = self.adaptive.apply_mode(band_unchanged, current);
            if next != current {
                *self.baselines.get_mut(band) = next;
                self.adjustments_applied += 1;
                debug!(%band, from = current, to = next, "qp baseline adjusted");
            } else if !band_unchanged {
                debug!(from = %self.prev_band, to = %band, "band changed, adjustment skipped");
            }
        }
        self.prev_band = band;

        let (main, other) =
            roi::region_values(band, self.baselines.get(band), self.preset.spatial_offset);
        self.roi.paint(main, other);
        &self.roi
    }

    /// Feeds back the size of the picture just encoded at `bitrate`.
    pub fn frame_encoded(
        &mut self,
        bitrate: u32,
        encoded_bytes: u64,
        now: Instant,
    ) -> Option<WindowDecision> {
        if self.paused {
            return None;
        }

        if u64::from(bitrate) > self.preset.watermarks.low {
            self.suitable_samples += 1;
        }

        if !self.gate.is_open() && self.gate.check_allowed(&mut self.suitable_samples, now) {
            self.adaptive.restart(now);
            info!(reason = ?self.gate.reason(), "adaptive qp armed");
        }

        if !self.gate.is_open() {
            return None;
        }

        let decision = self.adaptive.select_mode(encoded_bytes, now)?;
        self.suitable_samples = 0;
        self.windows_evaluated += 1;
        self.last_window_bits = Some(decision.bits);
        debug!(
            bits = decision.bits,
            mode = %decision.mode,
            motionless = decision.motionless,
            "window evaluated"
        );
        Some(decision)
    }

    /// Pauses or resumes adaptation for a stalled source. Only live-stream
    /// deployments honour this.
    pub fn set_paused(&mut self, paused: bool, now: Instant) {
        if !self.deployment.honours_pause() {
            warn!(deployment = ?self.deployment, "pause override ignored");
            return;
        }
        if self.paused == paused {
            return;
        }
        self.paused = paused;
        self.suitable_samples = 0;
        self.adaptive.restart(now);
        debug!(paused, "source pause state changed");
    }

    pub fn stats(&self) -> ControllerStats {
        ControllerStats {
            armed: self.gate.is_open(),
            paused: self.paused,
            mode: self.adaptive.mode(),
            band: self.prev_band,
            baselines: self.baselines,
            last_window_bits: self.last_window_bits,
            windows_evaluated: self.windows_evaluated,
            adjustments_applied: self.adjustments_applied,
        }
    }
}
