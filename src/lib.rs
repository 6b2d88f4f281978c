//! Event-driven thermal control daemon: PID over a watched temperature
//! record, with live gain tuning over HTTP.

pub mod actuator;
pub mod args;
pub mod control;
pub mod http;
pub mod pid;
pub mod sensor;
pub mod watcher;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::WrapErr as _;
use color_eyre::Result;
use futures::FutureExt as _;
use tokio::net::TcpListener;
use tracing::info;

use crate::actuator::LogActuator;
use crate::args::Args;
use crate::control::ControlLoop;
use crate::pid::{Controller, Gains};
use crate::sensor::SensorReader;
use crate::watcher::{InotifyWatcher, PollWatcher};

pub async fn run(args: Args) -> Result<()> {
    let controller = Controller::new(Gains {
        kp: args.kp,
        ki: args.ki,
        kd: args.kd,
    });

    // The watch needs an existing file; sensor writers create it for
    // themselves either way.
    ensure_sensor_file(&args.sensor_path).await.wrap_err_with(|| {
        format!(
            "failed to create sensor source at {}",
            args.sensor_path.display()
        )
    })?;
    let reader = SensorReader::new(&args.sensor_path);
    let actuator = Arc::new(LogActuator);

    let app = http::router(controller.clone());
    let listener = TcpListener::bind(args.listen_addr)
        .await
        .wrap_err_with(|| format!("failed to bind {}", args.listen_addr))?;
    info!(addr = %args.listen_addr, "tuning endpoint listening");
    let server_task = tokio::spawn(async move { axum::serve(listener, app).await });

    info!(
        sensor_path = %args.sensor_path.display(),
        setpoint = args.setpoint,
        poll = args.poll,
        "starting control loop"
    );
    let loop_task = if args.poll {
        let watcher = PollWatcher::new(
            &args.sensor_path,
            Duration::from_millis(args.poll_interval_ms),
        );
        tokio::spawn(
            ControlLoop::new(args.setpoint, watcher, reader, controller, actuator).run(),
        )
    } else {
        let watcher = InotifyWatcher::new(&args.sensor_path)
            .wrap_err("failed to start the inotify sensor watch")?;
        tokio::spawn(
            ControlLoop::new(args.setpoint, watcher, reader, controller, actuator).run(),
        )
    };

    // Neither task is supposed to finish.
    let ((), ()) = tokio::try_join!(
        server_task.map(|r| r
            .wrap_err("http server task panicked")?
            .wrap_err("http server exited")),
        loop_task.map(|r| r.wrap_err("control loop task panicked")?),
    )?;
    Ok(())
}

async fn ensure_sensor_file(path: &Path) -> std::io::Result<()> {
    tokio::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(path)
        .await
        .map(drop)
}
