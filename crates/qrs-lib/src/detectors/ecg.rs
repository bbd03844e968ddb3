use crate::{
    detectors::{
        filters::{high_pass, low_pass, squared_derivative, window_integration, DERIVATIVE_TRIM},
        peaks::find_peaks,
        threshold::{classify_candidates, AdaptiveThreshold},
    },
    error::DetectError,
    metrics::hrv::{beat_summary, BeatSummary},
    signal::{validate_samples, Events, RRSeries, TimeSeries},
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Shortest recording the slope estimator can turn into at least one sample.
pub const MIN_SAMPLES: usize = 2 * DERIVATIVE_TRIM + 1;

/// How the cascade's delay is converted into a sample offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DelayModel {
    /// `reference_delay_samples` at `reference_rate_hz`, rescaled to the actual rate.
    #[default]
    Reference,
    /// Fixed tap delay of the filters, plus half the integration window, minus the
    /// samples trimmed by the derivative.
    GroupDelay,
}

/// What to do with a beat that would land before sample zero after compensation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NegativeIndexPolicy {
    /// Discard the beat.
    #[default]
    Drop,
    /// Move the beat to sample zero. The refractory spacing to the next beat is not
    /// guaranteed for a clipped beat.
    Clip,
    /// Fail the run with [`DetectError::NegativeIndexAfterDelay`].
    Error,
}

/// Configurable parameters for the Pan–Tompkins beat detector.
///
/// The defaults are the classic constants; a run with `DetectorConfig::default()` follows
/// the published recurrence exactly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Moving window integration length (seconds).
    pub integration_window_s: f64,
    /// Minimum physiological RR distance / refractory period (seconds).
    pub min_rr_s: f64,
    /// Absolute floor a peak candidate must exceed.
    pub peak_limit: f64,
    /// Weight of a new value in the signal and noise level updates.
    pub level_weight: f64,
    /// Position of the threshold between the noise and signal levels.
    pub threshold_scale: f64,
    /// Combined delay of the two filters, in samples at `reference_rate_hz`.
    pub reference_delay_samples: f64,
    pub reference_rate_hz: f64,
    pub delay_model: DelayModel,
    pub negative_index_policy: NegativeIndexPolicy,
    /// Subtract the first sample from the recording before filtering.
    pub remove_initial_offset: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            integration_window_s: 0.150,
            min_rr_s: 0.2,
            peak_limit: 0.35,
            level_weight: 0.125,
            threshold_scale: 0.25,
            reference_delay_samples: 22.0,
            reference_rate_hz: 200.0,
            delay_model: DelayModel::Reference,
            negative_index_policy: NegativeIndexPolicy::Drop,
            remove_initial_offset: false,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), DetectError> {
        let positive = [
            ("integration_window_s", self.integration_window_s),
            ("min_rr_s", self.min_rr_s),
            ("reference_rate_hz", self.reference_rate_hz),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(DetectError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !(self.reference_delay_samples.is_finite() && self.reference_delay_samples >= 0.0) {
            return Err(DetectError::InvalidConfig(format!(
                "reference_delay_samples must be non-negative, got {}",
                self.reference_delay_samples
            )));
        }
        if !self.peak_limit.is_finite() {
            return Err(DetectError::InvalidConfig(format!(
                "peak_limit must be finite, got {}",
                self.peak_limit
            )));
        }
        if !(self.level_weight > 0.0 && self.level_weight <= 1.0) {
            return Err(DetectError::InvalidConfig(format!(
                "level_weight must be in (0, 1], got {}",
                self.level_weight
            )));
        }
        if !(0.0..=1.0).contains(&self.threshold_scale) {
            return Err(DetectError::InvalidConfig(format!(
                "threshold_scale must be in [0, 1], got {}",
                self.threshold_scale
            )));
        }
        Ok(())
    }
}

/// Time constants of a run converted to samples at the recording's rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCounts {
    /// Integration window width.
    pub window: usize,
    /// Peak spacing and refractory interval.
    pub spacing: usize,
    /// Samples subtracted from every beat by delay compensation.
    pub offset: usize,
}

impl SampleCounts {
    /// Fails with [`DetectError::InvalidConfig`] when a count would exceed
    /// [`MAX_SPAN_SAMPLES`] at this rate.
    pub fn new(fs: f64, cfg: &DetectorConfig) -> Result<Self, DetectError> {
        let window =
            seconds_to_samples("integration_window_s", cfg.integration_window_s, fs)?.max(1);
        let spacing = seconds_to_samples("min_rr_s", cfg.min_rr_s, fs)?.max(1);
        let offset = match cfg.delay_model {
            DelayModel::Reference => seconds_to_samples(
                "reference_delay_samples",
                cfg.reference_delay_samples / cfg.reference_rate_hz,
                fs,
            )?,
            DelayModel::GroupDelay => {
                let taps = to_count(cfg.reference_delay_samples).ok_or_else(|| {
                    DetectError::InvalidConfig(format!(
                        "reference_delay_samples {} exceeds {} samples",
                        cfg.reference_delay_samples, MAX_SPAN_SAMPLES
                    ))
                })?;
                (taps + window / 2).saturating_sub(DERIVATIVE_TRIM)
            }
        };
        Ok(Self {
            window,
            spacing,
            offset,
        })
    }
}

/// Largest window, spacing or offset a run accepts.
pub const MAX_SPAN_SAMPLES: usize = 1 << 30;

/// Rounds half to even.
fn to_count(samples: f64) -> Option<usize> {
    let n = samples.round_ties_even();
    (n <= MAX_SPAN_SAMPLES as f64).then_some(n as usize)
}

fn seconds_to_samples(name: &str, seconds: f64, fs: f64) -> Result<usize, DetectError> {
    to_count(seconds * fs).ok_or_else(|| {
        DetectError::InvalidConfig(format!(
            "{} of {} s at {} Hz exceeds {} samples",
            name, seconds, fs, MAX_SPAN_SAMPLES
        ))
    })
}

/// Shifts beats from the integrated time base back to the recording's.
///
/// Keeps the output strictly increasing even when several beats clip to zero.
#[derive(Debug, Clone)]
pub struct DelayCompensator {
    offset: usize,
    policy: NegativeIndexPolicy,
    last: Option<usize>,
}

impl DelayCompensator {
    pub fn new(offset: usize, policy: NegativeIndexPolicy) -> Self {
        Self {
            offset,
            policy,
            last: None,
        }
    }

    pub fn shift(&mut self, index: usize) -> Result<Option<usize>, DetectError> {
        let shifted = match index.checked_sub(self.offset) {
            Some(beat) => beat,
            None => match self.policy {
                NegativeIndexPolicy::Drop => {
                    warn!(
                        "dropping beat at integrated sample {}: before recording start after {}-sample delay",
                        index, self.offset
                    );
                    return Ok(None);
                }
                NegativeIndexPolicy::Clip => {
                    warn!(
                        "clipping beat at integrated sample {} to sample 0 ({}-sample delay)",
                        index, self.offset
                    );
                    0
                }
                NegativeIndexPolicy::Error => {
                    return Err(DetectError::NegativeIndexAfterDelay {
                        index,
                        offset: self.offset,
                    })
                }
            },
        };
        if self.last.is_some_and(|last| shifted <= last) {
            return Ok(None);
        }
        self.last = Some(shifted);
        Ok(Some(shifted))
    }
}

/// Apply delay compensation to beats in the integrated time base.
pub fn compensate_delay(
    raw_beats: &[usize],
    offset: usize,
    policy: NegativeIndexPolicy,
) -> Result<Vec<usize>, DetectError> {
    let mut compensator = DelayCompensator::new(offset, policy);
    let mut beats = Vec::with_capacity(raw_beats.len());
    for &index in raw_beats {
        if let Some(beat) = compensator.shift(index)? {
            beats.push(beat);
        }
    }
    Ok(beats)
}

/// Every intermediate sequence of one detection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionTrace {
    pub fs: f64,
    pub counts: SampleCounts,
    pub low_passed: Vec<f64>,
    pub band_passed: Vec<f64>,
    /// Squared derivative; four samples shorter than the recording.
    pub energy: Vec<f64>,
    pub integrated: Vec<f64>,
    /// Peak candidates, indices into `integrated`.
    pub candidates: Vec<usize>,
    /// Accepted beats before delay compensation.
    pub raw_beats: Vec<usize>,
    /// Accepted beats in the recording's time base.
    pub beats: Vec<usize>,
}

impl DetectionTrace {
    pub fn events(&self) -> Events {
        Events::from_indices(self.beats.clone())
    }
}

/// Detect heartbeats in `signal` sampled at `rate` Hz with the default configuration.
///
/// Returns strictly increasing sample indices into `signal`.
pub fn detect(signal: &[f64], rate: f64) -> Result<Vec<usize>, DetectError> {
    Ok(run_pipeline(signal, rate, &DetectorConfig::default())?.beats)
}

/// Detect R-peaks using the default configuration.
pub fn detect_r_peaks(ts: &TimeSeries) -> Result<Events, DetectError> {
    detect_r_peaks_with_config(ts, &DetectorConfig::default())
}

/// Detect R-peaks using the configurable pipeline.
pub fn detect_r_peaks_with_config(
    ts: &TimeSeries,
    cfg: &DetectorConfig,
) -> Result<Events, DetectError> {
    Ok(detect_with_trace(ts, cfg)?.events())
}

/// Run the detector and keep every intermediate stage.
pub fn detect_with_trace(
    ts: &TimeSeries,
    cfg: &DetectorConfig,
) -> Result<DetectionTrace, DetectError> {
    run_pipeline(&ts.data, ts.fs, cfg)
}

fn run_pipeline(
    data: &[f64],
    fs: f64,
    cfg: &DetectorConfig,
) -> Result<DetectionTrace, DetectError> {
    validate_samples(data, fs, MIN_SAMPLES)?;
    cfg.validate()?;
    let counts = SampleCounts::new(fs, cfg)?;
    debug!(
        "detecting beats in {} samples at {} Hz: window={} spacing={} offset={}",
        data.len(),
        fs,
        counts.window,
        counts.spacing,
        counts.offset
    );

    let low_passed = if cfg.remove_initial_offset {
        let first = data[0];
        let centred: Vec<f64> = data.iter().map(|x| x - first).collect();
        low_pass(&centred)
    } else {
        low_pass(data)
    };
    let band_passed = high_pass(&low_passed);
    let energy = squared_derivative(&band_passed);
    let integrated = window_integration(&energy, counts.window);
    let candidates = find_peaks(&integrated, counts.spacing, cfg.peak_limit);
    let mut state = AdaptiveThreshold::new(counts.spacing, cfg.level_weight, cfg.threshold_scale);
    let raw_beats = classify_candidates(&integrated, &candidates, &mut state);
    let beats = compensate_delay(&raw_beats, counts.offset, cfg.negative_index_policy)?;
    debug!(
        "{} candidates, {} accepted, {} after delay compensation",
        candidates.len(),
        raw_beats.len(),
        beats.len()
    );

    Ok(DetectionTrace {
        fs,
        counts,
        low_passed,
        band_passed,
        energy,
        integrated,
        candidates,
        raw_beats,
        beats,
    })
}

/// Combined result of beat detection and the rate summary derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeatPipelineResult {
    pub fs: f64,
    pub sample_count: usize,
    pub events: Events,
    pub rr: RRSeries,
    pub summary: BeatSummary,
}

impl BeatPipelineResult {
    pub fn from_events(ts: &TimeSeries, events: Events) -> Self {
        let rr = RRSeries::from_events(&events, ts.fs);
        let summary = beat_summary(&rr);
        Self {
            fs: ts.fs,
            sample_count: ts.len(),
            events,
            rr,
            summary,
        }
    }
}

/// Convenience helper that runs detection, converts to RR intervals, and summarises rate.
pub fn run_beat_pipeline(
    ts: &TimeSeries,
    cfg: &DetectorConfig,
) -> Result<BeatPipelineResult, DetectError> {
    let events = detect_r_peaks_with_config(ts, cfg)?;
    Ok(BeatPipelineResult::from_events(ts, events))
}
