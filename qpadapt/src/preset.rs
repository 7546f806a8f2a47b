use crate::band::Band;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ResolutionTier {
    Sub1080,
    Hd1080,
}

impl ResolutionTier {
    pub fn for_dimensions(width: u32, height: u32) -> Self {
        if u64::from(width) * u64::from(height) >= 1920 * 1080 {
            Self::Hd1080
        } else {
            Self::Sub1080
        }
    }

    pub fn preset(self) -> Preset {
        match self {
            Self::Sub1080 => Preset {
                watermarks: Watermarks {
                    low: 600_000,
                    medium: 1_200_000,
                    rated: 1_500_000,
                    high: 2_100_000,
                    ex_high: 3_000_000,
                },
                min_threshold: 0,
                max_threshold: 10,
                spatial_offset: 0,
                baselines: Baselines {
                    low: 5,
                    medium: 3,
                    high: 1,
                },
            },
            Self::Hd1080 => Preset {
                watermarks: Watermarks {
                    low: 1_000_000,
                    medium: 2_000_000,
                    rated: 2_500_000,
                    high: 3_500_000,
                    ex_high: 5_000_000,
                },
                min_threshold: 0,
                max_threshold: 12,
                spatial_offset: 2,
                baselines: Baselines {
                    low: 6,
                    medium: 4,
                    high: 2,
                },
            },
        }
    }
}

/// Bits-per-window boundaries, strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Watermarks {
    pub low: u64,
    pub medium: u64,
    pub rated: u64,
    pub high: u64,
    pub ex_high: u64,
}

impl Watermarks {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("low", self.low),
            ("medium", self.medium),
            ("rated", self.rated),
            ("high", self.high),
            ("ex_high", self.ex_high),
        ];
        for (name, bits) in named {
            if bits == 0 {
                return Err(ConfigError::ZeroWatermark { name });
            }
        }
        for pair in named.windows(2) {
            let (lower, lower_bits) = pair[0];
            let (upper, upper_bits) = pair[1];
            if upper_bits <= lower_bits {
                return Err(ConfigError::WatermarkOrder {
                    lower,
                    lower_bits,
                    upper,
                    upper_bits,
                });
            }
        }
        Ok(())
    }
}

/// Per-band QP-delta baselines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Baselines {
    pub low: i32,
    pub medium: i32,
    pub high: i32,
}

impl Baselines {
    pub fn get(&self, band: Band) -> i32 {
        match band {
            Band::Low => self.low,
            Band::Medium => self.medium,
            Band::High => self.high,
        }
    }

    pub fn get_mut(&mut self, band: Band) -> &mut i32 {
        match band {
            Band::Low => &mut self.low,
            Band::Medium => &mut self.medium,
            Band::High => &mut self.high,
        }
    }

    pub fn is_unset(&self) -> bool {
        self.low == 0 && self.medium == 0 && self.high == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Preset {
    pub watermarks: Watermarks,
    pub min_threshold: i32,
    pub max_threshold: i32,
    pub spatial_offset: i32,
    pub baselines: Baselines,
}

impl Preset {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.watermarks.validate()?;
        if self.min_threshold > self.max_threshold {
            return Err(ConfigError::ThresholdOrder {
                min: self.min_threshold,
                max: self.max_threshold,
            });
        }
        if self.spatial_offset < 0 {
            return Err(ConfigError::NegativeOffset(self.spatial_offset));
        }
        self.check_baselines(&self.baselines)
    }

    pub fn check_baselines(&self, baselines: &Baselines) -> Result<(), ConfigError> {
        for band in Band::ALL {
            let value = baselines.get(band);
            if !(self.min_threshold..=self.max_threshold).contains(&value) {
                return Err(ConfigError::BaselineOutOfRange {
                    band: band.name(),
                    value,
                    min: self.min_threshold,
                    max: self.max_threshold,
                });
            }
        }
        Ok(())
    }
}

/// Deployment variant. Decides the warm-up ceiling and whether the
/// paused-source override is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Deployment {
    #[default]
    Desktop,
    LiveStream,
}

impl Deployment {
    pub fn warmup_ceiling_minutes(self) -> u32 {
        match self {
            Deployment::Desktop => 5,
            Deployment::LiveStream => 2,
        }
    }

    pub fn honours_pause(self) -> bool {
        matches!(self, Deployment::LiveStream)
    }
}
