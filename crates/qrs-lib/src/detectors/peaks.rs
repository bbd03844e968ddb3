use std::collections::VecDeque;

/// How far below the end samples the out-of-range neighbours sit.
pub const SENTINEL_DROP: f64 = 1.0e-6;

/// `true` when `center` beats every neighbour within `spacing` samples on both sides and
/// exceeds `limit`. `at(offset)` returns the neighbour at a signed offset from the center.
/// Offsets past `len` only reach sentinels, so at most `len` of them are compared.
fn is_peak(
    center: f64,
    spacing: usize,
    len: usize,
    limit: f64,
    at: impl Fn(isize) -> f64,
) -> bool {
    let reach = spacing.min(len) as isize;
    center > limit && (1..=reach).all(|s| center > at(-s) && center > at(s))
}

/// Indices of strict local maxima over `spacing` neighbours that exceed `limit`.
///
/// Neighbours before the first sample read as `data[0] - SENTINEL_DROP` and neighbours
/// after the last read as `data[len - 1] - SENTINEL_DROP`, so the edges can qualify.
/// Candidates closer than `spacing` are not suppressed here.
pub fn find_peaks(data: &[f64], spacing: usize, limit: f64) -> Vec<usize> {
    let (Some(&first), Some(&last)) = (data.first(), data.last()) else {
        return Vec::new();
    };
    let before = first - SENTINEL_DROP;
    let after = last - SENTINEL_DROP;
    let n = data.len() as isize;
    (0..data.len())
        .filter(|&i| {
            is_peak(data[i], spacing, data.len(), limit, |offset| {
                let j = i as isize + offset;
                if j < 0 {
                    before
                } else if j >= n {
                    after
                } else {
                    data[j as usize]
                }
            })
        })
        .collect()
}

/// Incremental [`find_peaks`]. A sample is settled once `spacing` later samples have
/// arrived; [`PeakTracker::finish`] settles the tail against the end sentinel.
#[derive(Debug, Clone)]
pub struct PeakTracker {
    spacing: usize,
    limit: f64,
    window: VecDeque<f64>,
    before: Option<f64>,
    seen: usize,
    next: usize,
}

impl PeakTracker {
    pub fn new(spacing: usize, limit: f64) -> Self {
        Self {
            spacing,
            limit,
            window: VecDeque::new(),
            before: None,
            seen: 0,
            next: 0,
        }
    }

    /// Feed the next sample; returns `(index, value)` of a newly settled candidate.
    pub fn push(&mut self, value: f64) -> Option<(usize, f64)> {
        if self.before.is_none() {
            self.before = Some(value - SENTINEL_DROP);
        }
        self.window.push_back(value);
        if self.window.len() > self.spacing.saturating_mul(2).saturating_add(1) {
            self.window.pop_front();
        }
        self.seen += 1;
        if self.seen > self.next.saturating_add(self.spacing) {
            let index = self.next;
            self.next += 1;
            self.settle(index)
        } else {
            None
        }
    }

    /// Settle every remaining sample, treating the stream as ended.
    pub fn finish(&mut self) -> Vec<(usize, f64)> {
        let mut out = Vec::new();
        while self.next < self.seen {
            let index = self.next;
            self.next += 1;
            if let Some(peak) = self.settle(index) {
                out.push(peak);
            }
        }
        out
    }

    fn settle(&self, index: usize) -> Option<(usize, f64)> {
        let before = self.before?;
        let after = self.window.back()? - SENTINEL_DROP;
        let start = self.seen - self.window.len();
        let seen = self.seen as isize;
        let value = self.window[index - start];
        let peak = is_peak(value, self.spacing, self.seen, self.limit, |offset| {
            let j = index as isize + offset;
            if j < 0 {
                before
            } else if j >= seen {
                after
            } else {
                self.window[j as usize - start]
            }
        });
        peak.then_some((index, value))
    }
}
