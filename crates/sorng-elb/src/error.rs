//! ELB error type.
//!
//! Every failure surfaced by this crate is an [`ElbError`]. Errors returned by
//! the Elastic Load Balancing service itself keep Amazon's error code and
//! message verbatim; locally detected problems (bad input, transport failure,
//! malformed XML) carry a synthetic code and an [`ElbErrorKind`] describing
//! where they came from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an error originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElbErrorKind {
    /// Input rejected before any request was sent.
    Validation,
    /// Client configuration is incomplete or inconsistent.
    Config,
    /// The HTTP round trip failed or returned a non-XML error status.
    Http,
    /// The response body is not well-formed XML.
    Parse,
    /// The response root element is not the one the action expects.
    UnexpectedResponse,
    /// Amazon returned an `<Error>` element.
    Service,
}

/// Top-level error type for all ELB operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElbError {
    pub kind: ElbErrorKind,
    /// The Amazon error code (e.g. "SignatureDoesNotMatch", "LoadBalancerNotFound")
    /// or a local code such as "ValidationError".
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// HTTP status of the response, 0 when no response was received.
    pub status_code: u16,
    /// Amazon request ID, when the response carried one.
    pub request_id: Option<String>,
    /// The API action that failed.
    pub action: Option<String>,
}

impl fmt::Display for ElbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ELB error [{}]: {}", self.code, self.message)?;
        if self.status_code != 0 {
            write!(f, " (HTTP {})", self.status_code)?;
        }
        if let Some(ref req_id) = self.request_id {
            write!(f, " [RequestId: {}]", req_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ElbError {}

impl ElbError {
    fn local(kind: ElbErrorKind, code: &str, message: &str) -> Self {
        Self {
            kind,
            code: code.to_string(),
            message: message.to_string(),
            status_code: 0,
            request_id: None,
            action: None,
        }
    }

    /// Build an error reported by the ELB service.
    pub fn service(code: &str, message: &str, status_code: u16) -> Self {
        Self {
            status_code,
            ..Self::local(ElbErrorKind::Service, code, message)
        }
    }

    /// Build a validation error.
    pub fn validation(message: &str) -> Self {
        Self::local(ElbErrorKind::Validation, "ValidationError", message)
    }

    /// Build a configuration error.
    pub fn config(message: &str) -> Self {
        Self::local(ElbErrorKind::Config, "ConfigError", message)
    }

    /// Build a transport error.
    pub fn http(message: &str) -> Self {
        Self::local(ElbErrorKind::Http, "HttpError", message)
    }

    /// Build an error for a non-success HTTP status without a usable body.
    pub fn http_status(status_code: u16, body: &str) -> Self {
        let snippet = &body[..floor_char_boundary(body, 200)];
        Self {
            status_code,
            ..Self::local(
                ElbErrorKind::Http,
                "HttpError",
                &format!("HTTP {} from elasticloadbalancing: {}", status_code, snippet),
            )
        }
    }

    /// Build an XML parse error.
    pub fn parse(message: &str) -> Self {
        Self::local(ElbErrorKind::Parse, "XmlParseError", message)
    }

    /// Build an unexpected-response-type error.
    pub fn unexpected_response(expected: &str, got: &str) -> Self {
        Self::local(
            ElbErrorKind::UnexpectedResponse,
            "UnexpectedResponse",
            &format!(
                "Unexpected response type: expected '{}', got '{}'",
                expected, got
            ),
        )
    }

    /// With request ID.
    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }

    /// With action.
    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    /// With HTTP status.
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn is_validation(&self) -> bool {
        self.kind == ElbErrorKind::Validation
    }

    pub fn is_service(&self) -> bool {
        self.kind == ElbErrorKind::Service
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    if s.len() <= max {
        return s.len();
    }
    let mut idx = max;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

impl From<reqwest::Error> for ElbError {
    fn from(err: reqwest::Error) -> Self {
        let status_code = err.status().map(|s| s.as_u16()).unwrap_or(0);
        Self::http(&format!("Error in request to AWS service: {}", err)).with_status(status_code)
    }
}

impl From<quick_xml::Error> for ElbError {
    fn from(err: quick_xml::Error) -> Self {
        Self::parse(&err.to_string())
    }
}

/// Convenience result type for ELB operations.
pub type ElbResult<T> = Result<T, ElbError>;
