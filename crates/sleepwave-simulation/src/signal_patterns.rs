//! Stage-flavoured EEG patterns built from sinusoid mixtures

use serde::{Deserialize, Serialize};
use sleepwave_processing::StageLabel;
use std::f64::consts::PI;

/// Single sinusoidal component
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub frequency_hz: f64,
    /// Peak amplitude in physical units (µV)
    pub amplitude: f64,
}

impl Tone {
    pub const fn new(frequency_hz: f64, amplitude: f64) -> Self {
        Tone {
            frequency_hz,
            amplitude,
        }
    }

    #[inline]
    pub fn value_at(&self, time: f64) -> f64 {
        self.amplitude * (2.0 * PI * self.frequency_hz * time).sin()
    }
}

const AWAKE_TONES: [Tone; 3] = [Tone::new(10.0, 30.0), Tone::new(20.0, 10.0), Tone::new(6.0, 10.0)];
const N1_TONES: [Tone; 4] = [
    Tone::new(6.0, 20.0),
    Tone::new(10.0, 15.0),
    Tone::new(2.0, 15.0),
    Tone::new(20.0, 10.0),
];
// 12 Hz carries the spindle component
const N2_TONES: [Tone; 4] = [
    Tone::new(2.0, 20.0),
    Tone::new(6.0, 15.0),
    Tone::new(12.0, 12.0),
    Tone::new(20.0, 10.0),
];
const N3_TONES: [Tone; 2] = [Tone::new(1.0, 60.0), Tone::new(6.0, 15.0)];
const REM_TONES: [Tone; 4] = [
    Tone::new(6.0, 20.0),
    Tone::new(20.0, 15.0),
    Tone::new(2.0, 10.0),
    Tone::new(10.0, 10.0),
];

/// Components whose band power mix lands on `stage` under the default thresholds
pub fn stage_tones(stage: StageLabel) -> &'static [Tone] {
    match stage {
        StageLabel::Awake => &AWAKE_TONES,
        StageLabel::N1 => &N1_TONES,
        StageLabel::N2 => &N2_TONES,
        StageLabel::N3 => &N3_TONES,
        StageLabel::Rem => &REM_TONES,
    }
}

/// Noise-free waveform generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalPattern {
    /// Constant level
    Flat { level: f64 },
    /// Arbitrary sum of tones
    Tones { tones: Vec<Tone> },
    /// Mixture typical for one stage
    Stage { stage: StageLabel },
    /// Stages in sequence, each lasting `epoch_seconds`; the last repeats
    Night {
        stages: Vec<StageLabel>,
        epoch_seconds: f64,
    },
}

impl SignalPattern {
    /// Value at recording time `time` seconds
    pub fn value_at(&self, time: f64) -> f64 {
        match self {
            SignalPattern::Flat { level } => *level,
            SignalPattern::Tones { tones } => tones.iter().map(|t| t.value_at(time)).sum(),
            SignalPattern::Stage { stage } => {
                stage_tones(*stage).iter().map(|t| t.value_at(time)).sum()
            }
            SignalPattern::Night { .. } => match self.stage_at(time) {
                Some(stage) => stage_tones(stage).iter().map(|t| t.value_at(time)).sum(),
                None => 0.0,
            },
        }
    }

    /// Stage the pattern is shaped after at `time`, if any
    pub fn stage_at(&self, time: f64) -> Option<StageLabel> {
        match self {
            SignalPattern::Stage { stage } => Some(*stage),
            SignalPattern::Night {
                stages,
                epoch_seconds,
            } => {
                if stages.is_empty() || *epoch_seconds <= 0.0 {
                    return None;
                }
                let epoch = (time.max(0.0) / epoch_seconds) as usize;
                stages.get(epoch.min(stages.len() - 1)).copied()
            }
            _ => None,
        }
    }

    /// Largest absolute value the pattern can reach
    pub fn peak_amplitude(&self) -> f64 {
        let tone_sum = |tones: &[Tone]| tones.iter().map(|t| t.amplitude.abs()).sum::<f64>();
        match self {
            SignalPattern::Flat { level } => level.abs(),
            SignalPattern::Tones { tones } => tone_sum(tones),
            SignalPattern::Stage { stage } => tone_sum(stage_tones(*stage)),
            SignalPattern::Night { stages, .. } => stages
                .iter()
                .map(|s| tone_sum(stage_tones(*s)))
                .fold(0.0, f64::max),
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SignalPattern::Flat { .. } => "Flat line",
            SignalPattern::Tones { .. } => "Tone mixture",
            SignalPattern::Stage { .. } => "Single sleep stage",
            SignalPattern::Night { .. } => "Stage sequence",
        }
    }

    /// Common named patterns
    pub fn presets() -> Vec<(&'static str, SignalPattern)> {
        vec![
            ("awake", SignalPattern::Stage { stage: StageLabel::Awake }),
            ("n1", SignalPattern::Stage { stage: StageLabel::N1 }),
            ("n2", SignalPattern::Stage { stage: StageLabel::N2 }),
            ("n3", SignalPattern::Stage { stage: StageLabel::N3 }),
            ("rem", SignalPattern::Stage { stage: StageLabel::Rem }),
            ("night", SignalPattern::sleep_cycle(30.0)),
            ("flat", SignalPattern::Flat { level: 0.0 }),
        ]
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<SignalPattern> {
        Self::presets()
            .into_iter()
            .find(|(preset, _)| preset.eq_ignore_ascii_case(name))
            .map(|(_, pattern)| pattern)
    }

    /// One compressed sleep cycle: wake, descent to N3, back up, REM
    pub fn sleep_cycle(epoch_seconds: f64) -> Self {
        use StageLabel::*;
        SignalPattern::Night {
            stages: vec![Awake, N1, N2, N3, N3, N2, Rem, Rem, Awake],
            epoch_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleepwave_core::SampleWindow;
    use sleepwave_processing::{AnalysisConfig, EpochAnalyzer, StageThresholds};

    fn render(pattern: &SignalPattern, rate: f64, seconds: f64, start: f64) -> SampleWindow {
        let len = (rate * seconds) as usize;
        let samples = (0..len)
            .map(|i| pattern.value_at(start + i as f64 / rate))
            .collect();
        SampleWindow::new(samples, rate, start)
    }

    #[test]
    fn test_stage_patterns_classify_as_their_stage() {
        let mut analyzer =
            EpochAnalyzer::new(&AnalysisConfig::sleep_eeg(), StageThresholds::default()).unwrap();
        for stage in StageLabel::all() {
            let window = render(&SignalPattern::Stage { stage }, 100.0, 30.0, 0.0);
            assert_eq!(analyzer.analyze(&window, false).stage, stage, "pattern for {}", stage);
        }
    }

    #[test]
    fn test_night_walks_through_stages() {
        let night = SignalPattern::sleep_cycle(30.0);
        assert_eq!(night.stage_at(0.0), Some(StageLabel::Awake));
        assert_eq!(night.stage_at(95.0), Some(StageLabel::N3));
        assert_eq!(night.stage_at(10_000.0), Some(StageLabel::Awake));
        assert_eq!(SignalPattern::Flat { level: 1.0 }.stage_at(3.0), None);
    }

    #[test]
    fn test_peak_amplitude_bounds_values() {
        let pattern = SignalPattern::Stage { stage: StageLabel::N3 };
        assert_eq!(pattern.peak_amplitude(), 75.0);
        let window = render(&pattern, 100.0, 10.0, 0.0);
        assert!(window.samples.iter().all(|v| v.abs() <= 75.0));
    }

    #[test]
    fn test_presets_by_name() {
        assert_eq!(
            SignalPattern::preset("REM"),
            Some(SignalPattern::Stage { stage: StageLabel::Rem })
        );
        assert!(SignalPattern::preset("unknown").is_none());
        assert_eq!(
            SignalPattern::preset("night").map(|p| p.description()),
            Some("Stage sequence")
        );
    }
}
