use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{
    builder::{styling::AnsiColor, Styles},
    Parser,
};

#[derive(Debug, Parser)]
#[clap(about, version, styles = clap_v3_styles())]
pub struct Args {
    /// Path of the temperature record to watch.
    #[clap(
        long,
        env = "THERMOSTATD_SENSOR_PATH",
        default_value = "/tmp/temperature_data"
    )]
    pub sensor_path: PathBuf,
    /// Target temperature in degrees Celsius.
    #[clap(long, env = "THERMOSTATD_SETPOINT", default_value_t = 25.0)]
    pub setpoint: f64,
    /// Address the gain tuning endpoint listens on.
    #[clap(
        long,
        env = "THERMOSTATD_LISTEN_ADDR",
        default_value = "0.0.0.0:8080"
    )]
    pub listen_addr: SocketAddr,
    /// Initial proportional gain.
    #[clap(long, default_value_t = 2.0)]
    pub kp: f64,
    /// Initial integral gain.
    #[clap(long, default_value_t = 0.5)]
    pub ki: f64,
    /// Initial derivative gain.
    #[clap(long, default_value_t = 0.1)]
    pub kd: f64,
    /// Poll the sensor file for changes instead of using inotify.
    #[clap(long)]
    pub poll: bool,
    /// Poll interval in milliseconds, used with --poll.
    #[clap(long, default_value_t = 500)]
    pub poll_interval_ms: u64,
}

fn clap_v3_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default())
        .usage(AnsiColor::Green.on_default())
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}
