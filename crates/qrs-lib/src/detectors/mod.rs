//! Pan–Tompkins QRS detection: filter cascade, peak candidates, adaptive thresholding.

pub mod ecg;
pub mod filters;
pub mod peaks;
pub mod stream;
pub mod threshold;

pub use ecg::{
    detect, detect_r_peaks, detect_r_peaks_with_config, detect_with_trace, run_beat_pipeline,
    BeatPipelineResult, DelayModel, DetectionTrace, DetectorConfig, NegativeIndexPolicy,
    SampleCounts,
};
pub use stream::StreamingDetector;
