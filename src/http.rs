//! The gain tuning surface.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use crate::pid::{Controller, Gains};

/// Builds the router for the tuning endpoint.
///
/// `GET /pid` reports the current gains, `POST /pid` replaces them; any
/// other method gets a 405 from the method router. Malformed POST bodies
/// are rejected by the `Json` extractor with a client error before the
/// controller is touched.
pub fn router(controller: Controller) -> Router {
    Router::new()
        .route("/pid", get(get_gains).post(set_gains))
        .with_state(controller)
}

async fn get_gains(State(controller): State<Controller>) -> impl IntoResponse {
    let gains = controller.gains();
    // Fixed two-decimal rendering, which serde_json's shortest-float
    // output does not provide.
    let body = format!(
        "{{\"kp\":{:.2},\"ki\":{:.2},\"kd\":{:.2}}}",
        gains.kp, gains.ki, gains.kd
    );
    ([(header::CONTENT_TYPE, "application/json")], body)
}

async fn set_gains(
    State(controller): State<Controller>,
    Json(gains): Json<Gains>,
) -> impl IntoResponse {
    controller.update_gains(gains);
    info!(
        kp = gains.kp,
        ki = gains.ki,
        kd = gains.kd,
        "pid gains updated"
    );
    (StatusCode::OK, "pid gains updated\n")
}
