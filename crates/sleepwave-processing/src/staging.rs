//! Heuristic sleep stage decision from relative band power

use crate::spectral::BandPowers;
use serde::{Deserialize, Serialize};
use sleepwave_core::{config_error, WaveResult};
use std::fmt;

/// Sleep stage assigned to one analysis window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageLabel {
    Awake,
    N1,
    N2,
    N3,
    #[serde(rename = "REM")]
    Rem,
}

impl StageLabel {
    /// Conventional hypnogram ordinal: W=0, N1=1, N2=2, N3=3, REM=4
    pub fn ordinal(self) -> u8 {
        match self {
            StageLabel::Awake => 0,
            StageLabel::N1 => 1,
            StageLabel::N2 => 2,
            StageLabel::N3 => 3,
            StageLabel::Rem => 4,
        }
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(StageLabel::Awake),
            1 => Some(StageLabel::N1),
            2 => Some(StageLabel::N2),
            3 => Some(StageLabel::N3),
            4 => Some(StageLabel::Rem),
            _ => None,
        }
    }

    pub fn all() -> [StageLabel; 5] {
        [
            StageLabel::Awake,
            StageLabel::N1,
            StageLabel::N2,
            StageLabel::N3,
            StageLabel::Rem,
        ]
    }

    /// Every stage except wake
    pub fn is_sleep(self) -> bool {
        self != StageLabel::Awake
    }
}

impl fmt::Display for StageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StageLabel::Awake => "Awake",
            StageLabel::N1 => "N1",
            StageLabel::N2 => "N2",
            StageLabel::N3 => "N3",
            StageLabel::Rem => "REM",
        };
        f.write_str(name)
    }
}

/// Relative-power thresholds; every comparison is strict
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageThresholds {
    /// Delta fraction above which the window is N3
    pub deep_delta: f64,
    /// Alpha fraction above which the window is Awake
    pub awake_alpha: f64,
    /// Theta fraction required for REM
    pub rem_theta: f64,
    /// Beta fraction required for REM
    pub rem_beta: f64,
    /// Delta fraction above which the window is N2
    pub light_delta: f64,
}

impl Default for StageThresholds {
    fn default() -> Self {
        Self {
            deep_delta: 0.5,
            awake_alpha: 0.3,
            rem_theta: 0.35,
            rem_beta: 0.2,
            light_delta: 0.3,
        }
    }
}

impl StageThresholds {
    pub fn validate(&self) -> WaveResult<()> {
        let all = [
            ("deep_delta", self.deep_delta),
            ("awake_alpha", self.awake_alpha),
            ("rem_theta", self.rem_theta),
            ("rem_beta", self.rem_beta),
            ("light_delta", self.light_delta),
        ];
        for (name, value) in all {
            if !(0.0..=1.0).contains(&value) {
                return Err(config_error!("threshold {} must lie in [0, 1], got {}", name, value));
            }
        }
        Ok(())
    }
}

/// Ordered rule set over relative band power
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageClassifier {
    thresholds: StageThresholds,
}

impl StageClassifier {
    pub fn new(thresholds: StageThresholds) -> Self {
        StageClassifier { thresholds }
    }

    pub fn thresholds(&self) -> &StageThresholds {
        &self.thresholds
    }

    /// First matching rule wins; N1 when nothing matches
    pub fn classify(&self, powers: &BandPowers) -> StageLabel {
        let rel = powers.relative();
        let t = &self.thresholds;

        if rel.delta > t.deep_delta {
            StageLabel::N3
        } else if rel.alpha > t.awake_alpha {
            StageLabel::Awake
        } else if rel.theta > t.rem_theta && rel.beta > t.rem_beta {
            StageLabel::Rem
        } else if rel.delta > t.light_delta {
            StageLabel::N2
        } else {
            StageLabel::N1
        }
    }
}

/// Classify with the default thresholds
pub fn classify_stage(powers: &BandPowers) -> StageLabel {
    StageClassifier::default().classify(powers)
}
