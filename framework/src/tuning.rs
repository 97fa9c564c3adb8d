//! Speed-aware detection tuning
//!
//! Slow vehicles linger over small surface features and idle vibration is
//! continuous, so low speeds get a long cooldown and a low threshold. At
//! speed, anomalies come in quick succession and general vibration rises, so
//! the cooldown shortens and the threshold climbs.

use serde::{Deserialize, Serialize};

/// Errors from manually supplied tuning values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TuningError {
    #[error("cooldown must be positive")]
    ZeroCooldown,
    #[error("sensitivity must be positive and finite, got {0}")]
    InvalidSensitivity(f32),
}

/// Cooldown and sensitivity pair; both always positive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTuningParams")]
pub struct TuningParams {
    cooldown_ms: u32,
    sensitivity: f32,
}

#[derive(Deserialize)]
struct RawTuningParams {
    cooldown_ms: u32,
    sensitivity: f32,
}

impl TryFrom<RawTuningParams> for TuningParams {
    type Error = TuningError;

    fn try_from(raw: RawTuningParams) -> Result<Self, Self::Error> {
        TuningParams::new(raw.cooldown_ms, raw.sensitivity)
    }
}

impl TuningParams {
    pub fn new(cooldown_ms: u32, sensitivity: f32) -> Result<Self, TuningError> {
        if cooldown_ms == 0 {
            return Err(TuningError::ZeroCooldown);
        }
        if !(sensitivity.is_finite() && sensitivity > 0.0) {
            return Err(TuningError::InvalidSensitivity(sensitivity));
        }
        Ok(Self {
            cooldown_ms,
            sensitivity,
        })
    }

    pub fn cooldown_ms(&self) -> u32 {
        self.cooldown_ms
    }

    /// Firing threshold, in the units of the classifier's metric
    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }
}

// Speed brackets (km/h lower bounds)
const CRAWL: TuningParams = TuningParams {
    cooldown_ms: 2500,
    sensitivity: 10.0,
};
const CITY: TuningParams = TuningParams {
    cooldown_ms: 1800,
    sensitivity: 12.0,
};
const ARTERIAL: TuningParams = TuningParams {
    cooldown_ms: 1200,
    sensitivity: 14.0,
};
const HIGHWAY: TuningParams = TuningParams {
    cooldown_ms: 800,
    sensitivity: 16.0,
};

const CITY_MIN_KMH: f32 = 5.0;
const ARTERIAL_MIN_KMH: f32 = 25.0;
const HIGHWAY_MIN_KMH: f32 = 60.0;

/// Auto-tuned parameters for a speed
///
/// Non-finite speeds fall into the lowest bracket.
pub fn params_for(speed_kmh: f32) -> TuningParams {
    if speed_kmh >= HIGHWAY_MIN_KMH {
        HIGHWAY
    } else if speed_kmh >= ARTERIAL_MIN_KMH {
        ARTERIAL
    } else if speed_kmh >= CITY_MIN_KMH {
        CITY
    } else {
        CRAWL
    }
}

/// Where the detector takes its parameters from
///
/// A single switch: both values always come from the same source.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TuningMode {
    #[default]
    Auto,
    Manual(TuningParams),
}

impl TuningMode {
    pub fn resolve(&self, speed_kmh: f32) -> TuningParams {
        match self {
            TuningMode::Auto => params_for(speed_kmh),
            TuningMode::Manual(params) => *params,
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, TuningMode::Auto)
    }
}
