use axum::{extract::State, Json};
use serde::Deserialize;

use crate::dispatch::{Method, RequestForm};
use crate::error::AppError;
use crate::session::{SessionState, Workbench};

/// Dispatch request body: the method button that was pressed, plus the
/// form as it stood at that moment.
#[derive(Debug, Deserialize)]
pub struct DispatchParams {
    pub method: Method,
    #[serde(flatten)]
    pub form: RequestForm,
}

pub async fn state(State(workbench): State<Workbench>) -> Json<SessionState> {
    Json(workbench.state())
}

pub async fn update_form(
    State(workbench): State<Workbench>,
    Json(form): Json<RequestForm>,
) -> Json<SessionState> {
    Json(workbench.update_form(form))
}

pub async fn dispatch(
    State(workbench): State<Workbench>,
    Json(params): Json<DispatchParams>,
) -> Json<SessionState> {
    tracing::debug!(
        method = %params.method,
        url = %params.form.url,
        "Dispatch requested"
    );
    Json(workbench.dispatch(params.method, params.form))
}

pub async fn history_back(State(workbench): State<Workbench>) -> Json<SessionState> {
    Json(workbench.go_back())
}

pub async fn history_forward(State(workbench): State<Workbench>) -> Json<SessionState> {
    Json(workbench.go_forward())
}

pub async fn save(
    State(workbench): State<Workbench>,
) -> Result<Json<SessionState>, AppError> {
    Ok(Json(workbench.save()?))
}
