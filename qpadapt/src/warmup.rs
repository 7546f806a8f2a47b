use std::time::{Duration, Instant};

/// Qualifying windows needed in a row before the gate opens (strictly more
/// than this many).
pub const REQUIRED_CONSECUTIVE_WINDOWS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmReason {
    StableWindows,
    Ceiling,
}

/// Holds the adaptive controller back until the requested bitrate has been
/// steady for long enough, or until the ceiling expires. Latches open.
#[derive(Debug, Clone)]
pub struct WarmupGate {
    created: Instant,
    last_checked: Instant,
    window: Duration,
    ceiling: Duration,
    min_samples: u32,
    consecutive: u32,
    opened: Option<ArmReason>,
}

impl WarmupGate {
    pub fn new(now: Instant, window: Duration, ceiling_minutes: u32, fps: u32) -> Self {
        Self {
            created: now,
            last_checked: now,
            window,
            ceiling: window * 60 * ceiling_minutes,
            min_samples: fps / 2,
            consecutive: 0,
            opened: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.opened.is_some()
    }

    pub fn reason(&self) -> Option<ArmReason> {
        self.opened
    }

    pub fn consecutive_windows(&self) -> u32 {
        self.consecutive
    }

    pub fn min_samples(&self) -> u32 {
        self.min_samples
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }

    /// `suitable_samples` counts frames in the current window whose bitrate
    /// cleared the low watermark; it is zeroed whenever a window closes.
    pub fn check_allowed(&mut self, suitable_samples: &mut u32, now: Instant) -> bool {
        if self.opened.is_some() {
            return true;
        }

        if now.saturating_duration_since(self.created) > self.ceiling {
            *suitable_samples = 0;
            self.consecutive = 0;
            self.opened = Some(ArmReason::Ceiling);
            return true;
        }

        if now.saturating_duration_since(self.last_checked) > self.window {
            self.last_checked = now;
            if *suitable_samples > self.min_samples {
                self.consecutive += 1;
                if self.consecutive > REQUIRED_CONSECUTIVE_WINDOWS {
                    *suitable_samples = 0;
                    self.consecutive = 0;
                    self.opened = Some(ArmReason::StableWindows);
                    return true;
                }
            } else {
                self.consecutive = 0;
            }
            *suitable_samples = 0;
        }

        false
    }
}
