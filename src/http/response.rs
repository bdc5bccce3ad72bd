//! Response handling and error mapping.
//!
//! # Responsibilities
//! - Map dispatch failures to HTTP status codes
//! - Keep internal failure detail out of response bodies
//! - Turn a panic caught at the request boundary into a 500
//!
//! # Design Decisions
//! - Backend responses are streamed through untouched
//! - Every failure is answered with a short fixed message; detail goes to the log

use std::any::Any;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Why a request could not be forwarded.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no backend servers configured")]
    NoBackends,

    #[error("backend {0} is not healthy")]
    Unhealthy(String),

    #[error("failed to build upstream request: {0}")]
    BuildRequest(#[source] axum::http::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[source] hyper_util::client::legacy::Error),

    #[error("upstream did not answer within {0:?}")]
    UpstreamTimeout(Duration),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::NoBackends | DispatchError::Unhealthy(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            DispatchError::BuildRequest(_)
            | DispatchError::Upstream(_)
            | DispatchError::UpstreamTimeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            DispatchError::NoBackends => "No backend servers available",
            DispatchError::Unhealthy(_) => "Backend server is not healthy",
            DispatchError::BuildRequest(_) => "Error creating request",
            DispatchError::Upstream(_) | DispatchError::UpstreamTimeout(_) => {
                "Error forwarding request"
            }
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (self.status(), self.public_message()).into_response()
    }
}

/// Response for a panic caught while handling a request.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "Recovered from panic while handling request");

    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_failures_are_503() {
        assert_eq!(DispatchError::NoBackends.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            DispatchError::Unhealthy("http://a:1".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn messages_hide_backend_detail() {
        let err = DispatchError::Unhealthy("http://10.0.0.7:8080".into());
        assert!(!err.public_message().contains("10.0.0.7"));
        assert!(err.to_string().contains("10.0.0.7"));
    }

    #[test]
    fn panic_becomes_500() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
