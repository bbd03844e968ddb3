use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::info;
use qrs_lib::{
    detectors::{
        ecg::{
            detect_r_peaks_with_config, detect_with_trace, run_beat_pipeline, DelayModel,
            DetectorConfig, NegativeIndexPolicy,
        },
        stream::StreamingDetector,
    },
    io::{csv as csv_io, text as text_io},
    metrics::accuracy::score_detections,
    signal::{Events, TimeSeries},
};
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "qrs",
    version,
    about = "Pan–Tompkins QRS detection for single-lead ECG recordings"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum DelayArg {
    #[value(name = "reference")]
    Reference,
    #[value(name = "group-delay")]
    GroupDelay,
}

impl From<DelayArg> for DelayModel {
    fn from(arg: DelayArg) -> Self {
        match arg {
            DelayArg::Reference => DelayModel::Reference,
            DelayArg::GroupDelay => DelayModel::GroupDelay,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum NegativeArg {
    Drop,
    Clip,
    Error,
}

impl From<NegativeArg> for NegativeIndexPolicy {
    fn from(arg: NegativeArg) -> Self {
        match arg {
            NegativeArg::Drop => NegativeIndexPolicy::Drop,
            NegativeArg::Clip => NegativeIndexPolicy::Clip,
            NegativeArg::Error => NegativeIndexPolicy::Error,
        }
    }
}

/// Where the samples come from and how the detector is configured.
#[derive(Args, Debug)]
struct InputArgs {
    /// Sampling rate in Hz
    #[arg(long, default_value_t = 250.0)]
    fs: f64,
    /// Newline-delimited samples (or a delimited file with --column); stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,
    /// Column to read from a delimited --input file
    #[arg(long, requires = "input")]
    column: Option<String>,
    #[arg(long, default_value_t = ',')]
    delimiter: char,
    /// TOML file with detector settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    delay_model: Option<DelayArg>,
    #[arg(long)]
    negative_policy: Option<NegativeArg>,
    /// Subtract the first sample before filtering
    #[arg(long)]
    remove_offset: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect beats and print their sample indices as JSON
    Detect {
        #[command(flatten)]
        input: InputArgs,
        /// Feed samples through the streaming detector one at a time
        #[arg(long)]
        stream: bool,
    },
    /// Print every intermediate stage of the detector as JSON
    Trace {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Detect beats, derive RR intervals and summarise heart rate
    Summary {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Compare detected beats against reference annotations
    Score {
        #[command(flatten)]
        input: InputArgs,
        /// Newline-delimited reference beat indices
        #[arg(long)]
        annotations: PathBuf,
        /// Largest distance (seconds) at which a detection still matches a reference beat
        #[arg(long, default_value_t = 0.1)]
        tolerance_s: f64,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Detect { input, stream } => cmd_detect(&input, stream)?,
        Commands::Trace { input } => cmd_trace(&input)?,
        Commands::Summary { input } => cmd_summary(&input)?,
        Commands::Score {
            input,
            annotations,
            tolerance_s,
        } => cmd_score(&input, &annotations, tolerance_s)?,
    }
    Ok(())
}

fn read_samples(args: &InputArgs) -> Result<Vec<f64>> {
    match (&args.input, &args.column) {
        (Some(path), Some(column)) => {
            let delimiter = u8::try_from(args.delimiter)
                .context("delimiter must be a single-byte character")?;
            csv_io::read_column(path, column, delimiter)
        }
        (Some(path), None) => text_io::read_samples(path),
        (None, _) => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_samples(&buf)
        }
    }
}

fn load_config(args: &InputArgs) -> Result<DetectorConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&text)
                .with_context(|| format!("parsing detector config {}", path.display()))?
        }
        None => DetectorConfig::default(),
    };
    if let Some(model) = args.delay_model {
        cfg.delay_model = model.into();
    }
    if let Some(policy) = args.negative_policy {
        cfg.negative_index_policy = policy.into();
    }
    if args.remove_offset {
        cfg.remove_initial_offset = true;
    }
    Ok(cfg)
}

fn load_time_series(args: &InputArgs) -> Result<TimeSeries> {
    let data = read_samples(args)?;
    info!(
        "loaded {} samples at {} Hz from {}",
        data.len(),
        args.fs,
        args.input
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdin".into())
    );
    Ok(TimeSeries::new(args.fs, data))
}

fn detect_events(ts: &TimeSeries, cfg: &DetectorConfig, stream: bool) -> Result<Events> {
    let indices = if stream {
        let mut detector = StreamingDetector::new(ts.fs, cfg)?;
        let mut beats = detector.extend(&ts.data)?;
        beats.extend(detector.finish()?);
        beats
    } else {
        detect_r_peaks_with_config(ts, cfg)?.indices
    };
    info!("detected {} beats", indices.len());
    Ok(Events::from_indices(indices))
}

fn cmd_detect(args: &InputArgs, stream: bool) -> Result<()> {
    let ts = load_time_series(args)?;
    let cfg = load_config(args)?;
    let events = detect_events(&ts, &cfg, stream)?;
    println!("{}", serde_json::to_string(&events)?);
    Ok(())
}

fn cmd_trace(args: &InputArgs) -> Result<()> {
    let ts = load_time_series(args)?;
    let cfg = load_config(args)?;
    let trace = detect_with_trace(&ts, &cfg)?;
    println!("{}", serde_json::to_string(&trace)?);
    Ok(())
}

fn cmd_summary(args: &InputArgs) -> Result<()> {
    let ts = load_time_series(args)?;
    let cfg = load_config(args)?;
    let result = run_beat_pipeline(&ts, &cfg)?;
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

fn cmd_score(args: &InputArgs, annotations: &Path, tolerance_s: f64) -> Result<()> {
    if !(tolerance_s.is_finite() && tolerance_s >= 0.0) {
        anyhow::bail!("tolerance must be a non-negative number of seconds");
    }
    let ts = load_time_series(args)?;
    let cfg = load_config(args)?;
    let mut reference = text_io::read_indices(annotations)?;
    reference.sort_unstable();
    let events = detect_events(&ts, &cfg, false)?;
    let tolerance = (tolerance_s * ts.fs).round() as usize;
    let score = score_detections(&reference, &events.indices, tolerance);
    info!(
        "sensitivity {:.3}, positive predictivity {:.3}",
        score.sensitivity, score.positive_predictivity
    );
    println!("{}", serde_json::to_string(&score)?);
    Ok(())
}
