//! Error taxonomy for an estimate run.
//!
//! Only two kinds of failure ever cross the crate boundary: a rejected
//! address (client error) and a fatal session failure (server error). Every
//! other condition is absorbed into the data model as a missing value.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::report::ReportError;
use crate::session::SessionError;

#[derive(Debug, Error)]
pub enum ArvError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A bounded wait on the critical path (authentication, subject lookup,
    /// search submission) expired. Aborts the run.
    #[error("{step} timed out")]
    CriticalTimeout {
        step: &'static str,
        #[source]
        source: SessionError,
    },

    #[error("session failure during {step}")]
    Session {
        step: &'static str,
        #[source]
        source: SessionError,
    },

    #[error("failed to compose report")]
    Report(#[from] ReportError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ArvError {
    fn into_response(self) -> Response {
        match &self {
            ArvError::InvalidAddress(msg) => {
                tracing::warn!(error = %self, "rejected estimate request");
                let body = ErrorBody { error: msg.clone() };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            _ => {
                // Don't leak session or filesystem details to the caller
                tracing::error!(error = ?self, "estimate run failed");
                let body = ErrorBody {
                    error: "estimate run failed".to_string(),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
