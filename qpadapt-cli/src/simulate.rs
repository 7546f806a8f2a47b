use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use qpadapt::{
    Band, Baselines, EncodeError, EncodeSession, EncodedPicture, HwEncoder, ManualClock,
    PictureParams, QpDeltaMode, SessionConfig, SourceId,
};
use serde::Serialize;
use tracing::info;

use crate::profile::Profile;

/// Stands in for the hardware encoder: every picture is exactly
/// `frame_bytes` long.
#[derive(Debug, Default)]
pub struct SyntheticEncoder {
    pub frame_bytes: usize,
    pub bitrate_changes: u32,
}

impl HwEncoder for SyntheticEncoder {
    type Resource = SourceId;

    fn register(&mut self, source: SourceId) -> Result<SourceId, EncodeError> {
        Ok(source)
    }

    fn unregister(&mut self, _resource: SourceId) {}

    fn set_bitrate(&mut self, _bitrate: u32) -> Result<(), EncodeError> {
        self.bitrate_changes += 1;
        Ok(())
    }

    fn encode(
        &mut self,
        _resource: &mut SourceId,
        params: &PictureParams<'_>,
    ) -> Result<EncodedPicture, EncodeError> {
        Ok(EncodedPicture {
            data: vec![0; self.frame_bytes],
            is_keyframe: params.force_keyframe,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct WindowReport {
    pub time_s: f64,
    pub bits: u64,
    pub mode: QpDeltaMode,
    pub band: Band,
    pub baselines: Baselines,
    pub armed: bool,
}

impl WindowReport {
    fn line(&self) -> String {
        format!(
            "t={:>8.3}s bits={:>9} mode={:<17} band={:<6} baselines={}/{}/{}",
            self.time_s,
            self.bits,
            self.mode.to_string(),
            self.band.name(),
            self.baselines.low,
            self.baselines.medium,
            self.baselines.high,
        )
    }
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub frames: u64,
    pub windows: u64,
    pub adjustments: u64,
    pub armed: bool,
    pub baselines: Baselines,
}

/// Drives one session frame by frame on a manual clock.
pub fn run(
    config: &SessionConfig,
    requested_bitrate: u32,
    profile: &Profile,
    json: bool,
) -> Result<Summary> {
    let fps = config.controller.fps;
    let interval = Duration::from_secs(1) / fps;
    let total_frames = (profile.duration().as_secs_f64() * f64::from(fps)).round() as u64;

    let mut session =
        EncodeSession::with_clock(SyntheticEncoder::default(), config, ManualClock::default())?;
    let start = session.now();
    let source = SourceId(0);
    let mut stdout = io::stdout().lock();
    let mut windows_seen = 0;

    for frame in 0..total_frames {
        let elapsed = interval * frame as u32;
        let bits = profile.bits_at(elapsed);
        session.encoder_mut().frame_bytes = (bits / 8 / u64::from(fps)) as usize;

        session.clock().advance(interval);
        session.encode(source, requested_bitrate, frame == 0);

        let Some(stats) = session.controller().map(|c| c.stats()) else {
            continue;
        };
        if stats.windows_evaluated == windows_seen {
            continue;
        }
        windows_seen = stats.windows_evaluated;

        let report = WindowReport {
            time_s: session.now().duration_since(start).as_secs_f64(),
            bits: stats.last_window_bits.unwrap_or_default(),
            mode: stats.mode,
            band: stats.band,
            baselines: stats.baselines,
            armed: stats.armed,
        };
        if json {
            writeln!(stdout, "{}", serde_json::to_string(&report)?)?;
        } else {
            writeln!(stdout, "{}", report.line())?;
        }
    }

    let stats = session.controller().map(|c| c.stats());
    let summary = Summary {
        frames: total_frames,
        windows: stats.as_ref().map_or(0, |s| s.windows_evaluated),
        adjustments: stats.as_ref().map_or(0, |s| s.adjustments_applied),
        armed: stats.as_ref().is_some_and(|s| s.armed),
        baselines: stats.map_or(config.controller.resolved_preset().baselines, |s| s.baselines),
    };
    info!(
        frames = summary.frames,
        windows = summary.windows,
        adjustments = summary.adjustments,
        bitrate_changes = session.encoder().bitrate_changes,
        "simulation finished"
    );
    Ok(summary)
}
