use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use database::{DbError, ProbeFailure};
use serde_json::{json, Value};
use thiserror::Error;

/// What went wrong underneath a failed request.
#[derive(Error, Debug)]
pub enum Failure {
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    Probe(#[from] ProbeFailure),
    #[error("missing tables: {}", .0.join(", "))]
    MissingTables(Vec<&'static str>),
    #[error(transparent)]
    Catalog(#[from] core_types::CoreError),
    #[error("invalid request body: {0}")]
    InvalidBody(#[source] serde_json::Error),
}

/// A failed request: a human-readable message plus the underlying failure.
///
/// The raw failure text is only put in the body when `expose_details` is set,
/// which the handlers derive from the server environment.
#[derive(Error, Debug)]
#[error("{message}: {failure}")]
pub struct AppError {
    pub message: String,
    #[source]
    pub failure: Failure,
    pub expose_details: bool,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match &self.failure {
            Failure::Database(_) | Failure::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Failure::Probe(_) => StatusCode::SERVICE_UNAVAILABLE,
            Failure::MissingTables(_) | Failure::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self.failure, message = %self.message, "Request failed.");
        } else {
            tracing::warn!(error = %self.failure, message = %self.message, "Request rejected.");
        }

        let mut body = json!({
            "success": false,
            "message": self.message,
            "timestamp": crate::response::timestamp(),
        });
        if let Some(fields) = body.as_object_mut() {
            match &self.failure {
                Failure::Probe(probe) => {
                    fields.insert("target".into(), json!(probe.target()));
                    fields.insert("hints".into(), json!(probe.hints()));
                }
                Failure::MissingTables(tables) => {
                    fields.insert("missing_tables".into(), json!(tables));
                }
                _ => {}
            }
            if self.expose_details {
                fields.insert("error".into(), Value::String(self.failure.to_string()));
                if let Failure::Database(db) = &self.failure {
                    if let Some(diagnostics) = db.diagnostics() {
                        fields.insert("diagnostics".into(), json!(diagnostics));
                    }
                }
            }
        }

        (status, Json(body)).into_response()
    }
}
