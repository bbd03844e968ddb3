use assert_cmd::cargo::cargo_bin_cmd;
use qrs_lib::signal::Events;
use serde::Deserialize;
use std::{error::Error, fs, io::Write, path::PathBuf};

#[derive(Deserialize)]
struct Expected {
    #[allow(dead_code)]
    fs: f64,
    indices: Vec<usize>,
}

#[test]
fn detect_matches_golden_beats() -> Result<(), Box<dyn Error>> {
    let expected = expected("synthetic_ecg_250")?;
    let recording = sample_path("test_data/synthetic_ecg_250.txt");
    for extra in [&[][..], &["--stream"][..]] {
        let mut cmd = cargo_bin_cmd!("qrs");
        cmd.args(["detect", "--fs", "250", "--input", &recording]);
        cmd.args(extra);
        let output = cmd.assert().success().get_output().stdout.clone();
        let events: Events = serde_json::from_slice(&output)?;
        assert_eq!(events.indices, expected.indices, "args {:?}", extra);
    }
    Ok(())
}

#[test]
fn detect_reads_stdin() -> Result<(), Box<dyn Error>> {
    let mut text = String::new();
    for i in 0..1500 {
        let phase = i % 300;
        let v = match phase {
            146 => 20.0,
            147 => 60.0,
            148 => 100.0,
            149 => 90.0,
            150 => 75.0,
            151 => 60.0,
            152 => 45.0,
            153 => 30.0,
            154 => 15.0,
            155 => 5.0,
            _ => 0.0,
        };
        text.push_str(&format!("{}\n", v));
    }
    let mut cmd = cargo_bin_cmd!("qrs");
    cmd.args(["detect", "--fs", "250"]).write_stdin(text);
    let output = cmd.assert().success().get_output().stdout.clone();
    let events: Events = serde_json::from_slice(&output)?;
    assert_eq!(events.indices.len(), 5);
    for (k, beat) in events.indices.iter().enumerate() {
        assert!(beat.abs_diff(150 + 300 * k) <= 5, "beat {}", beat);
    }
    Ok(())
}

#[test]
fn detect_reads_csv_column() -> Result<(), Box<dyn Error>> {
    let samples = fs::read_to_string(sample_path("test_data/synthetic_ecg_360.txt"))?;
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "time;lead")?;
    let values = samples.lines().filter(|l| !l.starts_with('#'));
    for (i, v) in values.enumerate() {
        writeln!(file, "{};{}", i as f64 / 360.0, v)?;
    }
    file.flush()?;

    let mut cmd = cargo_bin_cmd!("qrs");
    cmd.args([
        "detect",
        "--fs",
        "360",
        "--input",
        file.path().to_str().expect("utf8 path"),
        "--column",
        "lead",
        "--delimiter",
        ";",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let events: Events = serde_json::from_slice(&output)?;
    assert_eq!(events.indices, expected("synthetic_ecg_360")?.indices);
    Ok(())
}

#[test]
fn score_against_annotations() -> Result<(), Box<dyn Error>> {
    #[derive(Deserialize)]
    struct Score {
        true_positives: usize,
        false_positives: usize,
        false_negatives: usize,
        sensitivity: f64,
    }
    let mut cmd = cargo_bin_cmd!("qrs");
    cmd.args([
        "score",
        "--fs",
        "250",
        "--input",
        &sample_path("test_data/synthetic_ecg_250.txt"),
        "--annotations",
        &sample_path("test_data/synthetic_ecg_250.ann"),
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let score: Score = serde_json::from_slice(&output)?;
    assert_eq!(score.true_positives, 24);
    assert_eq!(score.false_negatives, 0);
    assert_eq!(score.false_positives, 1);
    assert_eq!(score.sensitivity, 1.0);
    Ok(())
}

#[test]
fn summary_reports_rate() -> Result<(), Box<dyn Error>> {
    #[derive(Deserialize)]
    struct Summary {
        n_beats: usize,
        mean_hr_bpm: f64,
    }
    #[derive(Deserialize)]
    struct Output {
        fs: f64,
        sample_count: usize,
        events: Events,
        summary: Summary,
    }
    let mut cmd = cargo_bin_cmd!("qrs");
    cmd.args([
        "summary",
        "--fs",
        "360",
        "--input",
        &sample_path("test_data/synthetic_ecg_360.txt"),
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let out: Output = serde_json::from_slice(&output)?;
    assert_eq!(out.fs, 360.0);
    assert_eq!(out.sample_count, 5400);
    assert_eq!(out.summary.n_beats, out.events.indices.len());
    assert!(out.summary.mean_hr_bpm > 50.0 && out.summary.mean_hr_bpm < 100.0);
    Ok(())
}

#[test]
fn trace_honours_config_file() -> Result<(), Box<dyn Error>> {
    #[derive(Deserialize)]
    struct Counts {
        window: usize,
        spacing: usize,
        offset: usize,
    }
    #[derive(Deserialize)]
    struct Trace {
        counts: Counts,
        low_passed: Vec<f64>,
        integrated: Vec<f64>,
        beats: Vec<usize>,
    }
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("detector.toml");
    fs::write(&config, "delay_model = \"group-delay\"\nmin_rr_s = 0.25\n")?;

    let mut cmd = cargo_bin_cmd!("qrs");
    cmd.args([
        "trace",
        "--fs",
        "250",
        "--input",
        &sample_path("test_data/synthetic_ecg_250.txt"),
        "--config",
        config.to_str().expect("utf8 path"),
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let trace: Trace = serde_json::from_slice(&output)?;
    assert_eq!(trace.counts.window, 38);
    assert_eq!(trace.counts.spacing, 62);
    assert_eq!(trace.counts.offset, 39);
    assert_eq!(trace.low_passed.len(), 5000);
    assert_eq!(trace.integrated.len(), 4996);
    for pair in trace.beats.windows(2) {
        assert!(pair[1] - pair[0] >= 62);
    }
    Ok(())
}

#[test]
fn invalid_rate_fails() {
    let mut cmd = cargo_bin_cmd!("qrs");
    cmd.args([
        "detect",
        "--fs",
        "0",
        "--input",
        &sample_path("test_data/synthetic_ecg_250.txt"),
    ]);
    let output = cmd.assert().failure().get_output().stderr.clone();
    assert!(String::from_utf8_lossy(&output).contains("sampling rate"));
}

#[test]
fn short_recording_fails() {
    let mut cmd = cargo_bin_cmd!("qrs");
    cmd.args(["detect", "--fs", "250"]).write_stdin("1\n2\n3\n");
    let output = cmd.assert().failure().get_output().stderr.clone();
    assert!(String::from_utf8_lossy(&output).contains("at least 5"));
}

fn expected(name: &str) -> Result<Expected, Box<dyn Error>> {
    let path = workspace_root()
        .join("test_data")
        .join(format!("{}_expected.json", name));
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

fn workspace_root() -> PathBuf {
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .parent()
        .expect("crates dir")
        .parent()
        .expect("workspace root")
        .to_path_buf()
}

fn sample_path(relative: &str) -> String {
    workspace_root()
        .join(relative)
        .to_string_lossy()
        .to_string()
}
