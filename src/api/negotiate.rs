//! Per-request wire format negotiation
//!
//! `Negotiated` reads `Content-Type` and `Accept` once per request and is
//! then used to decode the body and encode the response, errors included.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use crate::codec::{decode, encode, Negotiation, WireEntity, WireFormat};
use crate::error::{RankingError, Result};
use crate::types::ErrorBody;

/// Formats negotiated for the current exchange
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Negotiated(pub Negotiation);

impl Negotiated {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self(Negotiation::from_headers(
            header_str(headers, CONTENT_TYPE),
            header_str(headers, ACCEPT),
        ))
    }

    pub fn request_format(&self) -> WireFormat {
        self.0.request
    }

    pub fn response_format(&self) -> WireFormat {
        self.0.response
    }

    /// Decode a request body in the negotiated request format
    pub fn decode<T: WireEntity>(&self, body: &[u8]) -> Result<T> {
        decode(self.0.request, body).map_err(|e| {
            debug!("Rejecting request body: {}", e);
            RankingError::invalid_argument("Invalid request body")
        })
    }

    /// Encode `value` with the given status
    pub fn respond<T: WireEntity>(&self, status: StatusCode, value: &T) -> Response {
        match encode(self.0.response, value) {
            Ok(bytes) => self.bytes(status, bytes),
            Err(e) => {
                error!("Failed to encode response: {}", e);
                self.fail(&RankingError::internal("response encoding failed"))
            }
        }
    }

    /// Encode a handler result: the value on success, the error body otherwise
    pub fn reply<T: WireEntity>(&self, status: StatusCode, result: Result<T>) -> Response {
        match result {
            Ok(value) => self.respond(status, &value),
            Err(e) => self.fail(&e),
        }
    }

    pub fn fail(&self, err: &RankingError) -> Response {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        self.error(status, err.public_message())
    }

    /// Error payload with an explicit status, for failures raised outside the
    /// ranking service
    pub fn error(&self, status: StatusCode, message: impl Into<String>) -> Response {
        let body = ErrorBody {
            error: message.into(),
            code: status.as_u16(),
        };
        match encode(self.0.response, &body) {
            Ok(bytes) => self.bytes(status, bytes),
            Err(e) => {
                error!("Failed to encode error body: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }

    fn bytes(&self, status: StatusCode, bytes: Vec<u8>) -> Response {
        (
            status,
            [(CONTENT_TYPE, self.0.response.content_type())],
            bytes,
        )
            .into_response()
    }
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

impl<S> FromRequestParts<S> for Negotiated
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
