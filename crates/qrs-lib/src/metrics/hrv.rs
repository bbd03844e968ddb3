use crate::signal::RRSeries;
use serde::{Deserialize, Serialize};

/// Heart rate and time-domain variability of a detected beat sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatSummary {
    pub n_beats: usize,
    pub mean_hr_bpm: f64,
    pub min_hr_bpm: f64,
    pub max_hr_bpm: f64,
    pub avnn: f64,
    pub sdnn: f64,
    pub rmssd: f64,
    pub pnn50: f64,
}

fn bpm(rr_s: f64) -> f64 {
    if rr_s > 0.0 {
        60.0 / rr_s
    } else {
        0.0
    }
}

pub fn beat_summary(rr: &RRSeries) -> BeatSummary {
    let n = rr.rr.len();
    let n_beats = if n > 0 { n + 1 } else { 0 };
    let avnn = if n > 0 {
        rr.rr.iter().sum::<f64>() / n as f64
    } else {
        0.0
    };
    let sdnn = if n > 1 {
        (rr.rr.iter().map(|x| (x - avnn).powi(2)).sum::<f64>() / (n as f64 - 1.0)).sqrt()
    } else {
        0.0
    };
    let (rmssd, pnn50) = if n > 1 {
        let diffs: Vec<f64> = rr.rr.windows(2).map(|w| w[1] - w[0]).collect();
        let rmssd = (diffs.iter().map(|d| d * d).sum::<f64>() / diffs.len() as f64).sqrt();
        let over = diffs.iter().filter(|d| d.abs() > 0.050).count();
        (rmssd, over as f64 / diffs.len() as f64)
    } else {
        (0.0, 0.0)
    };
    let shortest = rr.rr.iter().copied().fold(f64::INFINITY, f64::min);
    let longest = rr.rr.iter().copied().fold(0.0, f64::max);

    BeatSummary {
        n_beats,
        mean_hr_bpm: bpm(avnn),
        min_hr_bpm: bpm(longest),
        max_hr_bpm: if n > 0 { bpm(shortest) } else { 0.0 },
        avnn,
        sdnn,
        rmssd,
        pnn50,
    }
}
