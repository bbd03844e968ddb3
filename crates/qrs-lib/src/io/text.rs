use anyhow::{Context, Result};
use std::path::Path;
use std::str::FromStr;

/// Parse one value per line, skipping blank lines and `#` comments.
fn parse_lines<T>(text: &str, what: &str) -> Result<Vec<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let mut out = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let value = trimmed
            .parse::<T>()
            .with_context(|| format!("line {} is not {}: {}", idx + 1, what, trimmed))?;
        out.push(value);
    }
    if out.is_empty() {
        anyhow::bail!("no {} found", what);
    }
    Ok(out)
}

/// Parse newline-delimited ECG samples.
pub fn parse_samples(text: &str) -> Result<Vec<f64>> {
    parse_lines(text, "a numeric sample")
}

/// Read newline-delimited ECG samples from disk.
pub fn read_samples(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_samples(&text).with_context(|| format!("parsing samples in {}", path.display()))
}

/// Parse newline-delimited beat annotations (sample indices).
pub fn parse_indices(text: &str) -> Result<Vec<usize>> {
    parse_lines(text, "a sample index")
}

/// Read beat annotations from disk.
pub fn read_indices(path: &Path) -> Result<Vec<usize>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_indices(&text).with_context(|| format!("parsing annotations in {}", path.display()))
}
