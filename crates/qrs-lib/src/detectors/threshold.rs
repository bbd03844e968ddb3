use log::trace;
use serde::{Deserialize, Serialize};

/// Outcome of feeding one peak candidate to [`AdaptiveThreshold`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// Accepted as a heartbeat.
    Beat,
    /// Below the running threshold; folded into the noise level.
    Noise,
    /// Inside the refractory interval of the previous beat; state left untouched.
    Refractory,
}

/// Signal/noise level tracker that separates beats from noise peaks.
///
/// Levels move by `level_weight` toward each classified value and the threshold sits
/// `threshold_scale` of the way from the noise level to the signal level. All levels
/// start at zero, so the first candidate outside a refractory interval is always a beat.
#[derive(Debug, Clone)]
pub struct AdaptiveThreshold {
    refractory: usize,
    level_weight: f64,
    threshold_scale: f64,
    signal_level: f64,
    noise_level: f64,
    threshold: f64,
    last_beat: Option<usize>,
}

impl AdaptiveThreshold {
    pub fn new(refractory: usize, level_weight: f64, threshold_scale: f64) -> Self {
        Self {
            refractory,
            level_weight,
            threshold_scale,
            signal_level: 0.0,
            noise_level: 0.0,
            threshold: 0.0,
            last_beat: None,
        }
    }

    /// Classify the candidate at `index` with integrated amplitude `value`.
    ///
    /// Candidates must arrive in increasing index order.
    pub fn observe(&mut self, index: usize, value: f64) -> Classification {
        if let Some(last) = self.last_beat {
            if index.saturating_sub(last) < self.refractory {
                trace!("candidate {} inside refractory interval of {}", index, last);
                return Classification::Refractory;
            }
        }
        let keep = 1.0 - self.level_weight;
        let class = if value < self.threshold {
            self.noise_level = keep * self.noise_level + self.level_weight * value;
            Classification::Noise
        } else {
            self.signal_level = keep * self.signal_level + self.level_weight * value;
            self.last_beat = Some(index);
            Classification::Beat
        };
        self.threshold =
            self.noise_level + self.threshold_scale * (self.signal_level - self.noise_level);
        trace!(
            "candidate {} value {:.4} -> {:?}, threshold now {:.4}",
            index,
            value,
            class,
            self.threshold
        );
        class
    }

    pub fn signal_level(&self) -> f64 {
        self.signal_level
    }

    pub fn noise_level(&self) -> f64 {
        self.noise_level
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn last_beat(&self) -> Option<usize> {
        self.last_beat
    }
}

/// Run the thresholding pass over `candidates` (indices into `integrated`) and return the
/// accepted beats, still in the integrated time base.
pub fn classify_candidates(
    integrated: &[f64],
    candidates: &[usize],
    state: &mut AdaptiveThreshold,
) -> Vec<usize> {
    candidates
        .iter()
        .filter(|&&index| state.observe(index, integrated[index]) == Classification::Beat)
        .copied()
        .collect()
}
