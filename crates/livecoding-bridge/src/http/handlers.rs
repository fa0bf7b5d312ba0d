use axum::{extract::State, http::StatusCode, Json};
use livecoding_core::{coordinator::messages, CompileResult};

use super::{payload::CompilePayload, AppState};

/// `POST <route>`: admit a compile, answer at once, run it on the executor
pub async fn trigger(State(state): State<AppState>) -> (StatusCode, Json<CompilePayload>) {
    tracing::info!(route = %state.route, "Received live coding compile request");

    let ticket = match state.coordinator.try_begin_compile() {
        Ok(ticket) => ticket,
        Err(error) => {
            tracing::warn!("{error}");
            let snapshot = state.coordinator.get_snapshot();
            let body = CompilePayload::error(
                &snapshot,
                &state.route,
                CompileResult::AlreadyActive,
                error.to_string(),
            );
            return (StatusCode::CONFLICT, Json(body));
        }
    };

    // Taken before dispatch so the body shows the previous cycle
    let snapshot = state.coordinator.get_snapshot();

    let coordinator = state.coordinator.clone();
    let dispatched = state.executor.dispatch(move || {
        if let Err(error) = coordinator.execute_on_build_executor(ticket) {
            tracing::error!(%error, "Compile cycle did not complete");
        }
    });

    match dispatched {
        Ok(()) => {
            let body = CompilePayload::accepted(&snapshot, &state.route, messages::COMPILE_STARTED);
            (StatusCode::ACCEPTED, Json(body))
        }
        Err(error) => {
            // The rejected job took the ticket with it, so the busy flag is already released
            tracing::error!(%error, "Could not hand compile to the build executor");
            let body = CompilePayload::error(
                &state.coordinator.get_snapshot(),
                &state.route,
                CompileResult::NotStarted,
                error.to_string(),
            );
            (StatusCode::SERVICE_UNAVAILABLE, Json(body))
        }
    }
}

/// `GET <status route>`: current snapshot, never mutates anything
pub async fn status(State(state): State<AppState>) -> (StatusCode, Json<CompilePayload>) {
    let snapshot = state.coordinator.get_snapshot();
    (
        StatusCode::OK,
        Json(CompilePayload::from_snapshot(&snapshot, &state.route)),
    )
}
