use crate::error::DetectError;
use serde::{Deserialize, Serialize};

/// Basic typed time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn new(fs: f64, data: Vec<f64>) -> Self {
        Self { fs, data }
    }
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }

    /// Check the rate and every sample, and that at least `min_len` samples are present.
    pub fn validate(&self, min_len: usize) -> Result<(), DetectError> {
        validate_samples(&self.data, self.fs, min_len)
    }
}

/// Entry-point validation shared by every detector: rate first, then samples, then length.
pub fn validate_samples(data: &[f64], fs: f64, min_len: usize) -> Result<(), DetectError> {
    validate_rate(fs)?;
    if let Some((index, &value)) = data.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(DetectError::NonFiniteSample { index, value });
    }
    if data.len() < min_len {
        return Err(DetectError::SignalTooShort {
            len: data.len(),
            min: min_len,
        });
    }
    Ok(())
}

pub(crate) fn validate_rate(fs: f64) -> Result<(), DetectError> {
    if fs.is_finite() && fs > 0.0 {
        Ok(())
    } else {
        Err(DetectError::InvalidRate(fs))
    }
}

/// Point events on a timeline (e.g., R-peaks indices)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }
    pub fn len(&self) -> usize {
        self.indices.len()
    }
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// RR intervals (seconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RRSeries {
    pub rr: Vec<f64>,
}

impl RRSeries {
    pub fn from_events(events: &Events, fs: f64) -> Self {
        let rr = events
            .indices
            .windows(2)
            .map(|w| (w[1] as f64 - w[0] as f64) / fs)
            .collect();
        Self { rr }
    }
}
