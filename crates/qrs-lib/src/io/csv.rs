use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::Path;

/// Load one numeric column of a delimited file with a header row.
///
/// Column names match case-insensitively. Empty cells are rejected so the sample
/// positions stay aligned with the recording's time base.
pub fn read_column(path: &Path, column: &str, delimiter: u8) -> Result<Vec<f64>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(Trim::All)
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = reader.headers().context("reading header")?.clone();
    let col = locate_column(&headers, column)?;

    let mut samples = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("reading row {}", row + 1))?;
        let cell = record
            .get(col)
            .ok_or_else(|| anyhow!("row {} has no {} column", row + 1, column))?;
        let value = cell
            .parse::<f64>()
            .with_context(|| format!("row {}: {} is not numeric ({:?})", row + 1, column, cell))?;
        samples.push(value);
    }
    if samples.is_empty() {
        anyhow::bail!("{} has no rows", path.display());
    }
    Ok(samples)
}

fn locate_column(headers: &StringRecord, requested: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(requested))
        .ok_or_else(|| anyhow!("missing column {} (have {:?})", requested, headers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    fn reads_named_column() {
        let file = write_temp("time,MLII,V5\n0.000,0.1,0.2\n0.004, -0.3 ,0.4\n");
        let samples = read_column(file.path(), "mlii", b',').unwrap();
        assert_eq!(samples, vec![0.1, -0.3]);
    }

    #[test]
    fn reads_tab_separated() {
        let file = write_temp("ecg\tresp\n1\t2\n3\t4\n");
        assert_eq!(read_column(file.path(), "resp", b'\t').unwrap(), vec![2.0, 4.0]);
    }

    #[test]
    fn missing_column_is_an_error() {
        let file = write_temp("a,b\n1,2\n");
        let err = read_column(file.path(), "ecg", b',').unwrap_err();
        assert!(err.to_string().contains("missing column ecg"));
    }

    #[test]
    fn empty_cell_is_an_error() {
        let file = write_temp("ecg\n1.0\n\"\"\n");
        assert!(read_column(file.path(), "ecg", b',').is_err());
    }
}
