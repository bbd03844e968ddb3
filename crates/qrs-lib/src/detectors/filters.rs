//! Fixed-coefficient stages of the QRS enhancement cascade.
//!
//! Each stage is a small state machine with a `step` method. The batch helpers drive the
//! same state machines over a whole slice, so batch and streaming runs share one set of
//! update rules and produce identical floating point results.

use std::collections::VecDeque;

/// Samples the slope estimator trims from each end of its input.
pub const DERIVATIVE_TRIM: usize = 2;

/// Past inputs of a recursive filter. Taps older than the first sample do not exist and
/// are skipped by the caller rather than read as zero.
#[derive(Debug, Clone)]
struct DelayLine {
    taps: VecDeque<f64>,
    depth: usize,
}

impl DelayLine {
    fn new(depth: usize) -> Self {
        Self {
            taps: VecDeque::with_capacity(depth),
            depth,
        }
    }

    /// Input `k` steps back, if the recording is long enough to have one.
    fn lag(&self, k: usize) -> Option<f64> {
        if k == 0 || k > self.taps.len() {
            None
        } else {
            Some(self.taps[self.taps.len() - k])
        }
    }

    fn push(&mut self, x: f64) {
        if self.taps.len() == self.depth {
            self.taps.pop_front();
        }
        self.taps.push_back(x);
    }
}

/// Recursive low-pass: `y[n] = x[n] + 2y[n-1] - y[n-2] - 2x[n-6] + x[n-12]`.
#[derive(Debug, Clone)]
pub struct LowPass {
    inputs: DelayLine,
    y1: Option<f64>,
    y2: Option<f64>,
}

impl Default for LowPass {
    fn default() -> Self {
        Self::new()
    }
}

impl LowPass {
    pub fn new() -> Self {
        Self {
            inputs: DelayLine::new(12),
            y1: None,
            y2: None,
        }
    }

    pub fn step(&mut self, x: f64) -> f64 {
        let mut y = x;
        if let Some(y1) = self.y1 {
            y += 2.0 * y1;
        }
        if let Some(y2) = self.y2 {
            y -= y2;
        }
        if let Some(x6) = self.inputs.lag(6) {
            y -= 2.0 * x6;
        }
        if let Some(x12) = self.inputs.lag(12) {
            y += x12;
        }
        self.inputs.push(x);
        self.y2 = self.y1;
        self.y1 = Some(y);
        y
    }
}

/// Recursive high-pass: `y[n] = -x[n] - y[n-1] + 32x[n-16] + x[n-32]`.
#[derive(Debug, Clone)]
pub struct HighPass {
    inputs: DelayLine,
    y1: Option<f64>,
}

impl Default for HighPass {
    fn default() -> Self {
        Self::new()
    }
}

impl HighPass {
    pub fn new() -> Self {
        Self {
            inputs: DelayLine::new(32),
            y1: None,
        }
    }

    pub fn step(&mut self, x: f64) -> f64 {
        let mut y = -x;
        if let Some(y1) = self.y1 {
            y -= y1;
        }
        if let Some(x16) = self.inputs.lag(16) {
            y += 32.0 * x16;
        }
        if let Some(x32) = self.inputs.lag(32) {
            y += x32;
        }
        self.inputs.push(x);
        self.y1 = Some(y);
        y
    }
}

/// Five-point slope estimate, squared. `w` holds samples `i-2..=i+2`.
fn slope_energy(w: &[f64]) -> f64 {
    let slope = (w[4] + 2.0 * w[3] - w[0] - 2.0 * w[1]) / 8.0;
    slope * slope
}

/// Streaming form of [`squared_derivative`]: yields nothing until five samples are in.
#[derive(Debug, Clone, Default)]
pub struct SlopeEnergy {
    window: VecDeque<f64>,
}

impl SlopeEnergy {
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(2 * DERIVATIVE_TRIM + 1),
        }
    }

    pub fn step(&mut self, x: f64) -> Option<f64> {
        self.window.push_back(x);
        if self.window.len() > 2 * DERIVATIVE_TRIM + 1 {
            self.window.pop_front();
        }
        if self.window.len() < 2 * DERIVATIVE_TRIM + 1 {
            return None;
        }
        Some(slope_energy(self.window.make_contiguous()))
    }
}

/// Causal moving average of fixed width, kept as a running sum of pre-divided terms.
#[derive(Debug, Clone)]
pub struct Integrator {
    width: usize,
    window: VecDeque<f64>,
    acc: f64,
}

impl Integrator {
    /// `width` is clamped to at least one sample. The window grows with the input.
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            window: VecDeque::new(),
            acc: 0.0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn step(&mut self, x: f64) -> f64 {
        let w = self.width as f64;
        self.acc += x / w;
        self.window.push_back(x);
        if self.window.len() > self.width {
            if let Some(old) = self.window.pop_front() {
                self.acc -= old / w;
            }
        }
        self.acc
    }
}

/// Stage 1 over a whole recording. Output length equals input length.
pub fn low_pass(data: &[f64]) -> Vec<f64> {
    let mut filter = LowPass::new();
    data.iter().map(|&x| filter.step(x)).collect()
}

/// Stage 2 over a whole recording. Output length equals input length.
pub fn high_pass(data: &[f64]) -> Vec<f64> {
    let mut filter = HighPass::new();
    data.iter().map(|&x| filter.step(x)).collect()
}

/// Stages 3 and 4 fused: squared five-point derivative.
///
/// Input sample `i + 2` maps to output sample `i`; the output is four samples shorter
/// than the input and empty when the input has fewer than five samples.
pub fn squared_derivative(data: &[f64]) -> Vec<f64> {
    data.windows(2 * DERIVATIVE_TRIM + 1)
        .map(slope_energy)
        .collect()
}

/// Stage 5: moving window integration over `width` samples.
pub fn window_integration(data: &[f64], width: usize) -> Vec<f64> {
    let mut integrator = Integrator::new(width);
    data.iter().map(|&x| integrator.step(x)).collect()
}
