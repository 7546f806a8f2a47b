use std::time::Duration;

use anyhow::{Context, Result, bail};

/// Parses `3000000`, `3000k`, `3M` or `2.6M` into bits.
pub fn parse_bitrate(s: &str) -> Result<u64> {
    let (num, mult) = if let Some(n) = s.strip_suffix('k').or_else(|| s.strip_suffix('K')) {
        (n, 1_000.0)
    } else if let Some(n) = s.strip_suffix('m').or_else(|| s.strip_suffix('M')) {
        (n, 1_000_000.0)
    } else {
        (s, 1.0)
    };
    let value: f64 = num
        .parse()
        .with_context(|| format!("invalid bitrate: {s}"))?;
    if !value.is_finite() || value < 0.0 {
        bail!("invalid bitrate: {s}");
    }
    Ok((value * mult).round() as u64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub duration: Duration,
    pub bits_per_window: u64,
}

/// Encoder output over time, as bits per one-second window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    segments: Vec<Segment>,
}

impl Profile {
    pub fn constant(duration: Duration, bits_per_window: u64) -> Self {
        Self {
            segments: vec![Segment {
                duration,
                bits_per_window,
            }],
        }
    }

    /// `SECS:BITS[,SECS:BITS...]`, e.g. `10:2.6M,5:14.5M`.
    pub fn parse(s: &str) -> Result<Self> {
        let mut segments = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (secs, bits) = part
                .split_once(':')
                .with_context(|| format!("profile segment `{part}` is not SECS:BITS"))?;
            let secs: f64 = secs
                .parse()
                .with_context(|| format!("invalid duration in profile segment `{part}`"))?;
            if !secs.is_finite() || secs <= 0.0 {
                bail!("profile segment `{part}` must last longer than zero seconds");
            }
            segments.push(Segment {
                duration: Duration::from_secs_f64(secs),
                bits_per_window: parse_bitrate(bits)?,
            });
        }
        if segments.is_empty() {
            bail!("profile is empty");
        }
        Ok(Self { segments })
    }

    pub fn duration(&self) -> Duration {
        self.segments.iter().map(|s| s.duration).sum()
    }

    /// Output rate in effect at `elapsed`. The last segment holds past the end.
    pub fn bits_at(&self, elapsed: Duration) -> u64 {
        let mut end = Duration::ZERO;
        for segment in &self.segments {
            end += segment.duration;
            if elapsed < end {
                return segment.bits_per_window;
            }
        }
        self.segments
            .last()
            .map_or(0, |segment| segment.bits_per_window)
    }
}
