//! The control loop: one sequential task from sensor event to actuator
//! commands.

use std::sync::Arc;

use color_eyre::eyre::WrapErr as _;
use tracing::{debug, info, warn};

use crate::actuator::Actuator;
use crate::pid::Controller;
use crate::sensor::SensorReader;
use crate::watcher::SampleWatcher;

/// Drives one sensor/actuator pair against a fixed setpoint.
///
/// Each iteration: block on the watcher, read and parse the record,
/// acknowledge any pending gain change, run one PID step, fire the
/// actuator commands as detached tasks, repeat. Unreadable or malformed
/// records are logged and dropped; nothing retries. The loop has no stop
/// API: it runs until the process exits, and only a dead watch mechanism
/// ends it early (as an error).
pub struct ControlLoop<W, A> {
    setpoint: f64,
    watcher: W,
    reader: SensorReader,
    controller: Controller,
    actuator: Arc<A>,
}

impl<W, A> ControlLoop<W, A>
where
    W: SampleWatcher,
    A: Actuator + 'static,
{
    pub fn new(
        setpoint: f64,
        watcher: W,
        reader: SensorReader,
        controller: Controller,
        actuator: Arc<A>,
    ) -> Self {
        Self {
            setpoint,
            watcher,
            reader,
            controller,
            actuator,
        }
    }

    pub async fn run(mut self) -> color_eyre::Result<()> {
        loop {
            self.watcher
                .changed()
                .await
                .wrap_err("lost the sensor watch")?;

            let sample = match self.reader.read_sample().await {
                Ok(sample) => sample,
                Err(err) => {
                    warn!(%err, "dropping sensor sample");
                    continue;
                }
            };

            if self.controller.take_gains_changed() {
                info!("applying retuned pid gains");
            }

            let output =
                self.controller
                    .calculate(self.setpoint, sample.temperature, sample.timestamp);

            // Heating only on positive demand; there is no explicit "off"
            // command, the heater treats command absence as off.
            if output > 0.0 {
                let actuator = Arc::clone(&self.actuator);
                tokio::spawn(async move { actuator.set_heating(output).await });
            }

            // The fan is driven by raw temperature against the setpoint,
            // not by the PID output, and is commanded every iteration.
            let cooling = sample.temperature > self.setpoint;
            let actuator = Arc::clone(&self.actuator);
            tokio::spawn(async move { actuator.set_cooling(cooling).await });

            debug!(
                temperature = sample.temperature,
                timestamp = sample.timestamp,
                output,
                "control step"
            );
        }
    }
}
