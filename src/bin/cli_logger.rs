use std::fs::File;
use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use log::{error, info};
use serde::Serialize;

use co2::pc::HidSession;
use co2::trend::{Co2Level, Co2Window};
use co2::{Co2MonitorCommunication, Reading, Watch, WatchConfig, Watcher, WatcherError};

/// About half an hour at the default interval.
const WINDOW_LEN: usize = 180;

#[derive(Parser)]
#[command(name = "co2_cli")]
#[command(about = "Log readings of a USB CO2 monitor (04d9:a052)")]
struct Args {
    /// Seconds between two readings
    #[arg(short, long, default_value = "10", value_parser = parse_seconds)]
    interval: Duration,

    /// Seconds to wait for the monitor before retrying a read
    #[arg(short, long, default_value = "10", value_parser = parse_seconds)]
    timeout: Duration,

    /// Append readings to this CSV file; `auto` picks ./airco2ntrol_<timestamp>.csv
    #[arg(short, long)]
    output: Option<String>,

    /// Print machine readable CSV lines on stdout instead of the live console line
    #[arg(long)]
    stdout_csv: bool,

    /// No console output besides logging
    #[arg(short, long)]
    quiet: bool,
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("{e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("{e}"))
}

fn output_path(output: &str) -> PathBuf {
    if output == "auto" {
        let timestamp = Local::now().format("%Y%m%dT%H%M%S");
        return PathBuf::from(format!("./airco2ntrol_{timestamp}.csv"));
    }
    PathBuf::from(output)
}

#[derive(Serialize)]
struct CsvRow {
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "CO2[ppm]")]
    co2_ppm: u16,
    #[serde(rename = "Temperature[°C]")]
    temperature: String,
}

/// Writes one row per reading and flushes right away, so the file is usable while logging.
struct CsvLog {
    writer: csv::Writer<File>,
}

impl CsvLog {
    fn create(path: &Path) -> Result<Self> {
        let file = File::options()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("could not open {}", path.display()))?;
        let has_rows = file.metadata()?.len() > 0;
        let writer = csv::WriterBuilder::new()
            .has_headers(!has_rows)
            .from_writer(file);
        Ok(Self { writer })
    }
}

impl Watcher for CsvLog {
    fn on_reading(&mut self, reading: &Reading) -> Result<(), WatcherError> {
        self.writer.serialize(CsvRow {
            time: reading.timestamp.format("%Y%m%dT%H%M%S").to_string(),
            co2_ppm: reading.co2_ppm,
            temperature: format!("{:.1}", reading.temperature_celsius),
        })?;
        self.writer.flush()?;
        Ok(())
    }
}

/// `2024-01-31T14:05:09,612,21.4` per reading.
struct StdoutCsv {
    writer: csv::Writer<Stdout>,
}

impl StdoutCsv {
    fn new() -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(io::stdout());
        Self { writer }
    }
}

impl Watcher for StdoutCsv {
    fn on_reading(&mut self, reading: &Reading) -> Result<(), WatcherError> {
        self.writer.serialize((
            reading.timestamp.format("%Y-%m-%dT%H:%M:%S").to_string(),
            reading.co2_ppm,
            format!("{:.1}", reading.temperature_celsius),
        ))?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps overwriting a single console line with the latest reading.
#[derive(Default)]
struct Console {
    window: Co2Window<WINDOW_LEN>,
}

impl Watcher for Console {
    fn on_reading(&mut self, reading: &Reading) -> Result<(), WatcherError> {
        self.window.on_reading(reading)?;
        let level = Co2Level::classify(reading.co2_ppm);
        let (min, max) = (
            self.window.min().unwrap_or(reading.co2_ppm),
            self.window.max().unwrap_or(reading.co2_ppm),
        );
        let mut stdout = io::stdout().lock();
        write!(
            stdout,
            "{}\t{} ppm\t\t{:.1} °C\t{level} (last {}: {min}-{max} ppm)   \r",
            reading.timestamp.format("%H:%M:%S"),
            reading.co2_ppm,
            reading.temperature_celsius,
            self.window.len(),
        )?;
        stdout.flush()?;
        Ok(())
    }
}

fn run(args: Args) -> Result<()> {
    let config = WatchConfig::default()
        .with_interval(args.interval)
        .with_read_timeout(args.timeout);

    let monitor = HidSession::open()?;
    let mut watch = Watch::new(monitor, config);

    let cancel = watch.cancel_token();
    ctrlc::set_handler(move || cancel.cancel()).context("could not install the Ctrl-C handler")?;

    if let Some(output) = args.output.as_deref() {
        let path = output_path(output);
        watch.register(CsvLog::create(&path)?);
        info!("logging to {}", path.display());
    }

    if args.stdout_csv {
        watch.register(StdoutCsv::new());
    } else if !args.quiet {
        println!("Time\t\tCO2\t\tTemperature");
        watch.register(Console::default());
    }

    let result = watch.run();
    eprintln!("\nExiting ...");
    Ok(result?)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
