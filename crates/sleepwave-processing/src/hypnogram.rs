//! Hypnogram: stage sequence accumulated over a session

use crate::staging::StageLabel;
use serde::{Deserialize, Serialize};
use sleepwave_core::{config_error, WaveResult};

/// Seconds (or fractions) attributed to each stage
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StageDurations {
    #[serde(rename = "Awake")]
    pub awake: f64,
    #[serde(rename = "N1")]
    pub n1: f64,
    #[serde(rename = "N2")]
    pub n2: f64,
    #[serde(rename = "N3")]
    pub n3: f64,
    #[serde(rename = "REM")]
    pub rem: f64,
}

impl StageDurations {
    pub fn get(&self, label: StageLabel) -> f64 {
        match label {
            StageLabel::Awake => self.awake,
            StageLabel::N1 => self.n1,
            StageLabel::N2 => self.n2,
            StageLabel::N3 => self.n3,
            StageLabel::Rem => self.rem,
        }
    }

    fn slot(&mut self, label: StageLabel) -> &mut f64 {
        match label {
            StageLabel::Awake => &mut self.awake,
            StageLabel::N1 => &mut self.n1,
            StageLabel::N2 => &mut self.n2,
            StageLabel::N3 => &mut self.n3,
            StageLabel::Rem => &mut self.rem,
        }
    }

    pub fn total(&self) -> f64 {
        self.awake + self.n1 + self.n2 + self.n3 + self.rem
    }
}

/// Condensed view of a hypnogram for reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypnogramSummary {
    pub epochs: usize,
    pub epoch_seconds: f64,
    pub total_seconds: f64,
    pub stage_seconds: StageDurations,
    pub stage_fractions: StageDurations,
    /// Non-wake time over total time; zero for an empty hypnogram
    pub sleep_efficiency: f64,
    /// Number of label changes between consecutive epochs
    pub transitions: usize,
}

/// One stage label per analysed tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypnogram {
    epoch_seconds: f64,
    stages: Vec<StageLabel>,
}

impl Hypnogram {
    /// Empty hypnogram where each label covers `epoch_seconds`
    pub fn new(epoch_seconds: f64) -> WaveResult<Self> {
        if !(epoch_seconds.is_finite() && epoch_seconds > 0.0) {
            return Err(config_error!("epoch length must be positive, got {}", epoch_seconds));
        }
        Ok(Hypnogram {
            epoch_seconds,
            stages: Vec::new(),
        })
    }

    pub fn push(&mut self, label: StageLabel) {
        self.stages.push(label);
    }

    pub fn stages(&self) -> &[StageLabel] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn epoch_seconds(&self) -> f64 {
        self.epoch_seconds
    }

    pub fn total_seconds(&self) -> f64 {
        self.stages.len() as f64 * self.epoch_seconds
    }

    /// Time spent in each stage
    pub fn durations(&self) -> StageDurations {
        let mut durations = StageDurations::default();
        for &label in &self.stages {
            *durations.slot(label) += self.epoch_seconds;
        }
        durations
    }

    /// Share of total time per stage
    pub fn fractions(&self) -> StageDurations {
        let n = self.stages.len();
        let mut fractions = StageDurations::default();
        if n == 0 {
            return fractions;
        }
        for &label in &self.stages {
            *fractions.slot(label) += 1.0;
        }
        for label in StageLabel::all() {
            *fractions.slot(label) /= n as f64;
        }
        fractions
    }

    /// Fraction of epochs spent asleep
    pub fn sleep_efficiency(&self) -> f64 {
        if self.stages.is_empty() {
            return 0.0;
        }
        let asleep = self.stages.iter().filter(|s| s.is_sleep()).count();
        asleep as f64 / self.stages.len() as f64
    }

    pub fn transitions(&self) -> usize {
        self.stages.windows(2).filter(|w| w[0] != w[1]).count()
    }

    /// Median-filtered labels over ordinals; edges repeat the nearest epoch.
    ///
    /// `window` must be odd so the median is always a real ordinal.
    pub fn smoothed(&self, window: usize) -> WaveResult<Vec<StageLabel>> {
        if window == 0 || window % 2 == 0 {
            return Err(config_error!("smoothing window must be odd, got {}", window));
        }
        let n = self.stages.len();
        let half = window / 2;
        let ordinals: Vec<u8> = self.stages.iter().map(|s| s.ordinal()).collect();
        let mut scratch = Vec::with_capacity(window);

        let mut smoothed = Vec::with_capacity(n);
        for i in 0..n {
            scratch.clear();
            for offset in 0..window {
                let j = (i + offset).saturating_sub(half).min(n - 1);
                scratch.push(ordinals[j]);
            }
            scratch.sort_unstable();
            // ordinals come from valid labels
            smoothed.push(StageLabel::from_ordinal(scratch[half]).unwrap_or(self.stages[i]));
        }
        Ok(smoothed)
    }

    pub fn summary(&self) -> HypnogramSummary {
        HypnogramSummary {
            epochs: self.stages.len(),
            epoch_seconds: self.epoch_seconds,
            total_seconds: self.total_seconds(),
            stage_seconds: self.durations(),
            stage_fractions: self.fractions(),
            sleep_efficiency: self.sleep_efficiency(),
            transitions: self.transitions(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use StageLabel::*;

    fn hypnogram(stages: &[StageLabel]) -> Hypnogram {
        let mut hyp = Hypnogram::new(30.0).unwrap();
        for &s in stages {
            hyp.push(s);
        }
        hyp
    }

    #[test]
    fn test_durations_and_efficiency() {
        let hyp = hypnogram(&[Awake, N1, N2, N2, N3, Rem, Awake, N2]);
        let durations = hyp.durations();
        assert_eq!(durations.n2, 90.0);
        assert_eq!(durations.awake, 60.0);
        assert_eq!(durations.total(), hyp.total_seconds());
        assert_eq!(hyp.sleep_efficiency(), 0.75);
        assert_eq!(hyp.fractions().n2, 0.375);
        assert_eq!(hyp.transitions(), 6);
    }

    #[test]
    fn test_empty_hypnogram() {
        let hyp = hypnogram(&[]);
        let summary = hyp.summary();
        assert_eq!(summary.epochs, 0);
        assert_eq!(summary.sleep_efficiency, 0.0);
        assert_eq!(summary.stage_fractions, StageDurations::default());
        assert!(hyp.smoothed(5).unwrap().is_empty());
    }

    #[test]
    fn test_smoothing_removes_glitches() {
        let hyp = hypnogram(&[N2, N2, Awake, N2, N2, N3, N3, N3, Rem, N3, N3]);
        let smooth = hyp.smoothed(3).unwrap();
        assert_eq!(smooth, vec![N2, N2, N2, N2, N2, N3, N3, N3, N3, N3, N3]);
    }

    #[test]
    fn test_smoothing_nearest_edges() {
        let hyp = hypnogram(&[Rem, N1, N1, N1, Awake]);
        // edges pad with the first and last epoch
        assert_eq!(hyp.smoothed(5).unwrap(), vec![Rem, N1, N1, N1, Awake]);
        assert_eq!(hyp.smoothed(1).unwrap(), hyp.stages().to_vec());
    }

    #[test]
    fn test_even_window_rejected() {
        assert!(hypnogram(&[N1]).smoothed(4).is_err());
        assert!(hypnogram(&[N1]).smoothed(0).is_err());
        assert!(Hypnogram::new(0.0).is_err());
    }

    #[test]
    fn test_summary_serializes_stage_names() {
        let json = serde_json::to_value(hypnogram(&[Rem]).summary()).unwrap();
        assert_eq!(json["stage_seconds"]["REM"], 30.0);
        assert_eq!(json["stage_fractions"]["Awake"], 0.0);
    }
}
