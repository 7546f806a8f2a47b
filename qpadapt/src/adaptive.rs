use std::time::{Duration, Instant};

use crate::preset::Watermarks;

/// Windows of low output in a row after which the picture counts as still.
const MOTIONLESS_WINDOWS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum QpDeltaMode {
    #[default]
    Remain,
    IncreaseSteadily,
    IncreaseRapidly,
    DecreaseSteadily,
    DecreaseRapidly,
}

impl QpDeltaMode {
    pub fn step(self) -> i32 {
        match self {
            QpDeltaMode::Remain => 0,
            QpDeltaMode::IncreaseSteadily => 1,
            QpDeltaMode::IncreaseRapidly => 2,
            QpDeltaMode::DecreaseSteadily => -1,
            QpDeltaMode::DecreaseRapidly => -2,
        }
    }

    pub fn classify(bits: u64, watermarks: &Watermarks, motionless: bool) -> Self {
        if bits > watermarks.high {
            if bits < watermarks.ex_high {
                QpDeltaMode::IncreaseSteadily
            } else {
                QpDeltaMode::IncreaseRapidly
            }
        } else if bits >= watermarks.rated || motionless {
            QpDeltaMode::Remain
        } else if bits >= watermarks.medium {
            QpDeltaMode::DecreaseSteadily
        } else {
            QpDeltaMode::DecreaseRapidly
        }
    }
}

impl std::fmt::Display for QpDeltaMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            QpDeltaMode::Remain => "remain",
            QpDeltaMode::IncreaseSteadily => "increase_steadily",
            QpDeltaMode::IncreaseRapidly => "increase_rapidly",
            QpDeltaMode::DecreaseSteadily => "decrease_steadily",
            QpDeltaMode::DecreaseRapidly => "decrease_rapidly",
        })
    }
}

/// Tracks how long window output has stayed at or below the low watermark.
#[derive(Debug, Clone, Default)]
struct MotionlessDetector {
    low_since: Option<Instant>,
}

impl MotionlessDetector {
    fn observe(&mut self, bits: u64, low_watermark: u64, window: Duration, now: Instant) -> bool {
        if bits > low_watermark {
            self.low_since = None;
            return false;
        }
        let since = *self.low_since.get_or_insert(now);
        now.saturating_duration_since(since) > window * MOTIONLESS_WINDOWS
    }

    fn reset(&mut self) {
        self.low_since = None;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowDecision {
    pub bits: u64,
    pub mode: QpDeltaMode,
    pub motionless: bool,
}

/// Windowed output accounting and the discrete step machine.
#[derive(Debug, Clone)]
pub struct AdaptiveState {
    window: Duration,
    window_start: Instant,
    accumulated_bytes: u64,
    watermarks: Watermarks,
    min_threshold: i32,
    max_threshold: i32,
    mode: QpDeltaMode,
    ready: bool,
    motion: MotionlessDetector,
}

impl AdaptiveState {
    pub fn new(
        now: Instant,
        window: Duration,
        watermarks: Watermarks,
        min_threshold: i32,
        max_threshold: i32,
    ) -> Self {
        Self {
            window,
            window_start: now,
            accumulated_bytes: 0,
            watermarks,
            min_threshold,
            max_threshold,
            mode: QpDeltaMode::Remain,
            ready: false,
            motion: MotionlessDetector::default(),
        }
    }

    pub fn mode(&self) -> QpDeltaMode {
        self.mode
    }

    pub fn ready(&self) -> bool {
        self.ready
    }

    pub fn accumulated_bytes(&self) -> u64 {
        self.accumulated_bytes
    }

    pub fn thresholds(&self) -> (i32, i32) {
        (self.min_threshold, self.max_threshold)
    }

    /// Starts a fresh window at `now`, discarding what was accumulated.
    pub fn restart(&mut self, now: Instant) {
        self.window_start = now;
        self.accumulated_bytes = 0;
        self.ready = false;
        self.mode = QpDeltaMode::Remain;
        self.motion.reset();
    }

    /// Adds one frame's output. Returns the decision when this frame closed
    /// the window.
    pub fn select_mode(&mut self, encoded_bytes: u64, now: Instant) -> Option<WindowDecision> {
        self.accumulated_bytes = self.accumulated_bytes.saturating_add(encoded_bytes);

        if now.saturating_duration_since(self.window_start) < self.window {
            self.ready = false;
            self.mode = QpDeltaMode::Remain;
            return None;
        }

        let bits = self.accumulated_bytes.saturating_mul(8);
        let motionless = self
            .motion
            .observe(bits, self.watermarks.low, self.window, now);
        self.mode = QpDeltaMode::classify(bits, &self.watermarks, motionless);
        self.accumulated_bytes = 0;
        self.window_start = now;
        self.ready = true;

        Some(WindowDecision {
            bits,
            mode: self.mode,
            motionless,
        })
    }

    /// Steps `value` by the pending mode. Steps that would leave
    /// `[min_threshold, max_threshold]` are dropped, not pinned. A pending
    /// decision is consumed even when the band changed.
    pub fn apply_mode(&mut self, band_unchanged: bool, value: i32) -> i32 {
        if !self.ready {
            return value;
        }
        self.ready = false;
        if !band_unchanged {
            return value;
        }

        let next = value + self.mode.step();
        if (self.min_threshold..=self.max_threshold).contains(&next) {
            next
        } else {
            value
        }
    }
}
