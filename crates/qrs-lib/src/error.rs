use thiserror::Error;

/// Reasons a detection run is rejected.
///
/// Every variant is raised at the entry point, before the filter cascade runs, except
/// `NegativeIndexAfterDelay`, which only occurs under `NegativeIndexPolicy::Error`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectError {
    #[error("sampling rate must be a positive finite number of Hz, got {0}")]
    InvalidRate(f64),
    #[error("signal has {len} samples, at least {min} are required")]
    SignalTooShort { len: usize, min: usize },
    #[error("sample {index} is not a finite number ({value})")]
    NonFiniteSample { index: usize, value: f64 },
    #[error("beat at integrated sample {index} lands before the recording start once shifted back by {offset} samples")]
    NegativeIndexAfterDelay { index: usize, offset: usize },
    #[error("invalid detector configuration: {0}")]
    InvalidConfig(String),
}
