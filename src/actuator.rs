//! Heating and cooling command dispatch.

use async_trait::async_trait;
use tracing::info;

/// Hardware-facing side of the control loop.
///
/// Commands are fire-and-forget: the loop spawns each call as a detached
/// task and never waits for completion, so there is no error channel back
/// to the loop. Implementations log failures where they happen.
#[async_trait]
pub trait Actuator: Send + Sync {
    /// Drive the heater with the given demand magnitude. Only called with
    /// positive magnitudes; command absence is "heater off".
    async fn set_heating(&self, magnitude: f64);

    /// Switch the cooling fan on or off. Called every control iteration.
    async fn set_cooling(&self, on: bool);
}

/// Actuator that only logs the commands it receives.
///
/// Stands in for real heater/fan drivers and, together with the
/// `sensor-sim` binary, lets the daemon run end to end on a dev machine.
pub struct LogActuator;

#[async_trait]
impl Actuator for LogActuator {
    async fn set_heating(&self, magnitude: f64) {
        info!(magnitude, "heating command");
    }

    async fn set_cooling(&self, on: bool) {
        if on {
            info!("cooling fan on");
        } else {
            info!("cooling fan off");
        }
    }
}
