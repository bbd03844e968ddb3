use crate::{
    detectors::{
        ecg::{DelayCompensator, DetectorConfig, SampleCounts, MIN_SAMPLES},
        filters::{HighPass, Integrator, LowPass, SlopeEnergy},
        peaks::PeakTracker,
        threshold::{AdaptiveThreshold, Classification},
    },
    error::DetectError,
    signal::validate_rate,
};
use log::debug;

/// Sample-by-sample Pan–Tompkins detector.
///
/// Runs the same per-stage update rules as [`detect`](crate::detectors::ecg::detect), so
/// the beats returned by `push` followed by those from `finish` equal the batch result for
/// the same recording. A beat is reported `spacing` samples after its integrated peak,
/// once the peak can no longer be beaten by a later sample.
#[derive(Debug, Clone)]
pub struct StreamingDetector {
    counts: SampleCounts,
    remove_initial_offset: bool,
    first: Option<f64>,
    pushed: usize,
    low_pass: LowPass,
    high_pass: HighPass,
    slope: SlopeEnergy,
    integrator: Integrator,
    peaks: PeakTracker,
    threshold: AdaptiveThreshold,
    delay: DelayCompensator,
}

impl StreamingDetector {
    pub fn new(fs: f64, cfg: &DetectorConfig) -> Result<Self, DetectError> {
        validate_rate(fs)?;
        cfg.validate()?;
        let counts = SampleCounts::new(fs, cfg)?;
        debug!(
            "streaming detector at {} Hz: window={} spacing={} offset={}",
            fs, counts.window, counts.spacing, counts.offset
        );
        Ok(Self {
            counts,
            remove_initial_offset: cfg.remove_initial_offset,
            first: None,
            pushed: 0,
            low_pass: LowPass::new(),
            high_pass: HighPass::new(),
            slope: SlopeEnergy::new(),
            integrator: Integrator::new(counts.window),
            peaks: PeakTracker::new(counts.spacing, cfg.peak_limit),
            threshold: AdaptiveThreshold::new(
                counts.spacing,
                cfg.level_weight,
                cfg.threshold_scale,
            ),
            delay: DelayCompensator::new(counts.offset, cfg.negative_index_policy),
        })
    }

    pub fn counts(&self) -> SampleCounts {
        self.counts
    }

    /// Number of samples accepted so far.
    pub fn len(&self) -> usize {
        self.pushed
    }

    pub fn is_empty(&self) -> bool {
        self.pushed == 0
    }

    /// Feed one sample. Returns a beat (in the recording's time base) when one settles.
    pub fn push(&mut self, sample: f64) -> Result<Option<usize>, DetectError> {
        if !sample.is_finite() {
            return Err(DetectError::NonFiniteSample {
                index: self.pushed,
                value: sample,
            });
        }
        self.pushed += 1;
        let x = if self.remove_initial_offset {
            sample - *self.first.get_or_insert(sample)
        } else {
            sample
        };
        let band = self.high_pass.step(self.low_pass.step(x));
        let Some(energy) = self.slope.step(band) else {
            return Ok(None);
        };
        let level = self.integrator.step(energy);
        match self.peaks.push(level) {
            Some((index, value)) => self.classify(index, value),
            None => Ok(None),
        }
    }

    /// Feed a block of samples, collecting any beats that settle.
    pub fn extend(&mut self, samples: &[f64]) -> Result<Vec<usize>, DetectError> {
        let mut beats = Vec::new();
        for &sample in samples {
            if let Some(beat) = self.push(sample)? {
                beats.push(beat);
            }
        }
        Ok(beats)
    }

    /// End the stream and return the beats still held back by the peak look-ahead.
    pub fn finish(mut self) -> Result<Vec<usize>, DetectError> {
        if self.pushed < MIN_SAMPLES {
            return Err(DetectError::SignalTooShort {
                len: self.pushed,
                min: MIN_SAMPLES,
            });
        }
        let mut beats = Vec::new();
        for (index, value) in self.peaks.finish() {
            if let Some(beat) = self.classify(index, value)? {
                beats.push(beat);
            }
        }
        Ok(beats)
    }

    fn classify(&mut self, index: usize, value: f64) -> Result<Option<usize>, DetectError> {
        match self.threshold.observe(index, value) {
            Classification::Beat => self.delay.shift(index),
            Classification::Noise | Classification::Refractory => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::ecg::{detect, detect_r_peaks_with_config, NegativeIndexPolicy};
    use crate::signal::TimeSeries;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn stream_all(data: &[f64], fs: f64, cfg: &DetectorConfig) -> Vec<usize> {
        let mut detector = StreamingDetector::new(fs, cfg).expect("detector");
        let mut beats = detector.extend(data).expect("push");
        beats.extend(detector.finish().expect("finish"));
        beats
    }

    fn spiky(fs: f64, seconds: f64, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let n = (fs * seconds) as usize;
        let period = (0.8 * fs) as usize;
        (0..n)
            .map(|i| {
                let phase = i % period;
                let spike = match phase {
                    0 => 40.0,
                    1 => 90.0,
                    2 => 60.0,
                    3 => 20.0,
                    _ => 0.0,
                };
                spike + rng.gen_range(-2.0..2.0) + 10.0
            })
            .collect()
    }

    #[test]
    fn streaming_matches_batch() {
        for (fs, seed) in [(250.0, 1), (360.0, 2), (128.0, 3)] {
            let data = spiky(fs, 10.0, seed);
            let batch = detect(&data, fs).expect("batch");
            assert!(!batch.is_empty());
            assert_eq!(stream_all(&data, fs, &DetectorConfig::default()), batch);
        }
    }

    #[test]
    fn streaming_matches_batch_with_options() {
        let cfg = DetectorConfig {
            remove_initial_offset: true,
            negative_index_policy: NegativeIndexPolicy::Clip,
            ..DetectorConfig::default()
        };
        let data = spiky(250.0, 8.0, 9);
        let ts = TimeSeries::new(250.0, data.clone());
        let batch = detect_r_peaks_with_config(&ts, &cfg).expect("batch");
        assert_eq!(stream_all(&data, 250.0, &cfg), batch.indices);
    }

    #[test]
    fn beats_settle_before_the_stream_ends() {
        let data = spiky(250.0, 10.0, 4);
        let mut detector =
            StreamingDetector::new(250.0, &DetectorConfig::default()).expect("detector");
        let early = detector.extend(&data).expect("push");
        assert!(!early.is_empty());
        assert_eq!(detector.len(), data.len());
    }

    #[test]
    fn non_finite_sample_reports_position() {
        let mut detector =
            StreamingDetector::new(250.0, &DetectorConfig::default()).expect("detector");
        detector.extend(&[0.0, 1.0, 2.0]).expect("push");
        match detector.push(f64::NAN) {
            Err(DetectError::NonFiniteSample { index, .. }) => assert_eq!(index, 3),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn short_stream_fails_on_finish() {
        let mut detector =
            StreamingDetector::new(250.0, &DetectorConfig::default()).expect("detector");
        assert!(detector.is_empty());
        detector.extend(&[1.0; 4]).expect("push");
        assert_eq!(
            detector.finish(),
            Err(DetectError::SignalTooShort { len: 4, min: 5 })
        );
    }

    #[test]
    fn rejects_bad_rate() {
        assert!(matches!(
            StreamingDetector::new(-1.0, &DetectorConfig::default()),
            Err(DetectError::InvalidRate(_))
        ));
        assert!(matches!(
            StreamingDetector::new(1.0e30, &DetectorConfig::default()),
            Err(DetectError::InvalidConfig(_))
        ));
    }
}
