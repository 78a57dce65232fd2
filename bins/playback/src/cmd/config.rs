use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, ValueEnum};
use serde::Deserialize;

use playback_api::util::ms_to_duration;
use playback_api::{TimestampField, DEFAULT_TS_FORMAT};
use playback_engine::Mode;
use source_csv::CsvOptions;

use super::error::CliError;

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub mode: Option<ModeArg>,
    pub input: Option<String>,
    pub ts_column: Option<String>,
    pub ts_format: Option<String>,
    pub window_ms: Option<u64>,
    pub jitter_ms: Option<u64>,
    pub delay_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub seed: Option<u64>,
    pub sink: Option<SinkKind>,
    pub addr: Option<String>,
    #[serde(default)]
    pub csv: CsvConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct CsvConfig {
    pub delimiter: Option<String>,
    pub quoting: Option<bool>,
}

pub fn load_config(path: &str) -> Result<Config, CliError> {
    let content =
        std::fs::read_to_string(path).map_err(|e| CliError::Config(format!("cannot read config {path}: {e}")))?;
    toml::from_str(&content).map_err(|e| CliError::Config(format!("bad config {path}: {e}")))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModeArg {
    #[value(alias = "0")]
    #[serde(alias = "0")]
    Instant,
    #[value(alias = "1")]
    #[serde(alias = "1")]
    Paced,
    #[value(alias = "2")]
    #[serde(alias = "2")]
    Relative,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Stdout,
    Tcp,
}

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug)]
pub struct PlayArgs {
    /// Path to playback.toml
    #[arg(long, default_value = "playback.toml", env = "PLAYBACK_CONFIG")]
    pub config: String,

    /// Pacing: instant, paced or relative (0, 1, 2)
    #[arg(short, long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Input file (.csv, .json/.jsonl/.ndjson, .avro)
    #[arg(short, long)]
    pub input: Option<String>,

    /// Timestamp column (dot path for JSON). Required for relative mode
    #[arg(short = 'c', long)]
    pub ts_column: Option<String>,

    /// chrono format of textual timestamps
    #[arg(short = 'f', long)]
    pub ts_format: Option<String>,

    /// Lookahead window in ms (relative)
    #[arg(short, long)]
    pub window: Option<u64>,

    /// Max jitter in ms
    #[arg(short, long)]
    pub jitter: Option<u64>,

    /// Base delay between messages in ms (paced)
    #[arg(short, long)]
    pub delay: Option<u64>,

    /// Publish timeout in ms
    #[arg(short = 'o', long)]
    pub timeout: Option<u64>,

    /// Jitter PRNG seed (0 = current time)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Where to send records
    #[arg(long, value_enum)]
    pub sink: Option<SinkKind>,

    /// host:port of the tcp sink
    #[arg(long)]
    pub addr: Option<String>,
}

// ═══════════════════════════════════════════════════════════════
//  Effective: merged config
// ═══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Csv,
    Json,
    Avro,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(FileKind::Csv),
            "json" | "jsonl" | "ndjson" => Some(FileKind::Json),
            "avro" => Some(FileKind::Avro),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkTarget {
    Stdout,
    Tcp { addr: String },
}

impl fmt::Display for SinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SinkTarget::Stdout => f.write_str("stdout"),
            SinkTarget::Tcp { addr } => write!(f, "tcp://{addr}"),
        }
    }
}

/// Final configuration: playback.toml < env/CLI
#[derive(Debug)]
pub struct Effective {
    pub mode: Mode,
    pub input: PathBuf,
    pub file_kind: FileKind,
    pub ts: Option<TimestampField>,
    pub timeout: Duration,
    pub seed: u64,
    pub sink: SinkTarget,
    pub csv: CsvOptions,
}

impl Effective {
    pub fn new(args: &PlayArgs) -> Result<Self, CliError> {
        let cfg = match load_config(&args.config) {
            Ok(c) => c,
            Err(e) => {
                if Path::new(&args.config).exists() {
                    return Err(e);
                }
                Config::default()
            }
        };
        Self::merge(args, cfg)
    }

    pub fn merge(args: &PlayArgs, cfg: Config) -> Result<Self, CliError> {
        let input = args
            .input
            .clone()
            .or(cfg.input)
            .map(PathBuf::from)
            .ok_or_else(|| CliError::Config("no input file (--input)".into()))?;
        if !input.is_file() {
            return Err(CliError::Config(format!("input file {} does not exist", input.display())));
        }
        let file_kind = FileKind::from_path(&input).ok_or_else(|| {
            CliError::Config(format!(
                "unsupported input {}: expected .csv, .json, .jsonl, .ndjson or .avro",
                input.display()
            ))
        })?;

        let ts_format = args.ts_format.clone().or(cfg.ts_format).unwrap_or_else(|| DEFAULT_TS_FORMAT.into());
        let ts = args
            .ts_column
            .clone()
            .or(cfg.ts_column)
            .map(|column| TimestampField::new(column).with_format(ts_format));

        let window_ms = args.window.or(cfg.window_ms).unwrap_or(250);
        let jitter_ms = args.jitter.or(cfg.jitter_ms).unwrap_or(150);
        let delay_ms = args.delay.or(cfg.delay_ms).unwrap_or(500);

        let mode = match args.mode.or(cfg.mode).unwrap_or(ModeArg::Instant) {
            ModeArg::Instant => Mode::Instant,
            ModeArg::Paced => Mode::Paced { delay: ms_to_duration(delay_ms), max_jitter_ms: jitter_ms },
            ModeArg::Relative => {
                if ts.is_none() {
                    return Err(CliError::Config("relative mode needs a timestamp column (--ts-column)".into()));
                }
                Mode::Relative { lookahead: ms_to_duration(window_ms), max_jitter_ms: jitter_ms }
            }
        };
        mode.validate().map_err(|e| CliError::Config(e.to_string()))?;

        let addr = args.addr.clone().or(cfg.addr);
        let sink = match args.sink.or(cfg.sink).unwrap_or(SinkKind::Stdout) {
            SinkKind::Stdout => SinkTarget::Stdout,
            SinkKind::Tcp => SinkTarget::Tcp {
                addr: addr.ok_or_else(|| CliError::Config("tcp sink needs --addr".into()))?,
            },
        };

        let csv = CsvOptions::parse(
            cfg.csv.delimiter.as_deref().unwrap_or(","),
            cfg.csv.quoting.unwrap_or(true),
        )?;

        Ok(Self {
            mode,
            input,
            file_kind,
            ts,
            timeout: ms_to_duration(args.timeout.or(cfg.timeout_ms).unwrap_or(5000)),
            seed: args.seed.or(cfg.seed).unwrap_or(0),
            sink,
            csv,
        })
    }
}
