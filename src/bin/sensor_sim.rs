//! Synthetic temperature source for running the daemon without hardware.
//!
//! Truncates and rewrites the record file on a fixed cadence with
//! `temperature,timestamp` pairs, jittering the temperature so the
//! control loop has something to chase.

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{
    builder::{styling::AnsiColor, Styles},
    Parser,
};
use color_eyre::eyre::WrapErr as _;
use rand::Rng as _;
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[clap(about, version, styles = clap_v3_styles())]
struct Args {
    /// Path of the temperature record to write.
    #[clap(
        long,
        env = "THERMOSTATD_SENSOR_PATH",
        default_value = "/tmp/temperature_data"
    )]
    sensor_path: PathBuf,
    /// Seconds between records.
    #[clap(long, default_value_t = 1)]
    interval_secs: u64,
    /// Base temperature in degrees Celsius; up to one degree of jitter is
    /// added on top.
    #[clap(long, default_value_t = 36.5)]
    base_temperature: f64,
}

fn clap_v3_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default())
        .usage(AnsiColor::Green.on_default())
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval_secs));
    loop {
        ticker.tick().await;

        let temperature = args.base_temperature + rand::thread_rng().gen_range(0.0..1.0);
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .wrap_err("system clock is before the unix epoch")?
            .as_secs();
        let record = format!("{temperature:.2},{timestamp}\n");
        tokio::fs::write(&args.sensor_path, record)
            .await
            .wrap_err_with(|| {
                format!("failed to write {}", args.sensor_path.display())
            })?;
        info!(temperature, timestamp, "wrote temperature record");
    }
}
