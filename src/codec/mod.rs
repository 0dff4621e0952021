//! Wire codec shared by every endpoint
//!
//! Each domain type has exactly one JSON representation (`json` module) and
//! one compact binary representation (`binary` module). The request format is
//! chosen from `Content-Type`, the response format from `Accept`; the two are
//! negotiated independently.

pub mod binary;
pub mod json;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::types::{
    AggregatedRating, CategoryCount, Comment, CommentRequest, Company, CriterionRating, ErrorBody,
    HealthReport, LeaderboardPage, Matchup, PlatformStats, RatingRequest, UserLeaderboardPage,
    VoteOutcome, VoteRequest,
};

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Media types accepted as the binary format
const BINARY_MEDIA_TYPES: [&str; 3] = [
    "application/x-protobuf",
    "application/x-bincode",
    "application/octet-stream",
];

/// Errors raised while encoding or decoding a payload
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed binary payload: {0}")]
    Binary(#[from] bincode::Error),

    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl CodecError {
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }
}

/// Supported wire formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    #[default]
    Json,
    Binary,
}

impl WireFormat {
    /// Format of an inbound body, from its `Content-Type`
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(value) if is_binary_media_type(value) => WireFormat::Binary,
            _ => WireFormat::Json,
        }
    }

    /// Preferred response format, from the `Accept` header
    pub fn from_accept(accept: Option<&str>) -> Self {
        match accept {
            Some(value) if value.split(',').any(is_binary_media_type) => WireFormat::Binary,
            _ => WireFormat::Json,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            WireFormat::Json => JSON_CONTENT_TYPE,
            WireFormat::Binary => BINARY_CONTENT_TYPE,
        }
    }
}

fn is_binary_media_type(value: &str) -> bool {
    let media_type = value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    BINARY_MEDIA_TYPES.contains(&media_type.as_str())
}

/// Request and response formats for one exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Negotiation {
    pub request: WireFormat,
    pub response: WireFormat,
}

impl Negotiation {
    pub fn from_headers(content_type: Option<&str>, accept: Option<&str>) -> Self {
        Self {
            request: WireFormat::from_content_type(content_type),
            response: WireFormat::from_accept(accept),
        }
    }
}

/// A domain type with one representation per wire format
pub trait WireEntity: Sized {
    type Json: Serialize + DeserializeOwned;
    type Binary: Serialize + DeserializeOwned;

    fn to_json(&self) -> Self::Json;
    fn from_json(wire: Self::Json) -> Result<Self, CodecError>;
    fn to_binary(&self) -> Self::Binary;
    fn from_binary(wire: Self::Binary) -> Result<Self, CodecError>;
}

/// Encode a value in the given format
pub fn encode<T: WireEntity>(format: WireFormat, value: &T) -> Result<Vec<u8>, CodecError> {
    match format {
        WireFormat::Json => Ok(serde_json::to_vec(&value.to_json())?),
        WireFormat::Binary => Ok(bincode::serialize(&value.to_binary())?),
    }
}

/// Decode a value from the given format
pub fn decode<T: WireEntity>(format: WireFormat, bytes: &[u8]) -> Result<T, CodecError> {
    match format {
        WireFormat::Json => T::from_json(serde_json::from_slice(bytes)?),
        WireFormat::Binary => T::from_binary(bincode::deserialize(bytes)?),
    }
}

impl<T: WireEntity> WireEntity for Vec<T> {
    type Json = Vec<T::Json>;
    type Binary = Vec<T::Binary>;

    fn to_json(&self) -> Self::Json {
        self.iter().map(WireEntity::to_json).collect()
    }

    fn from_json(wire: Self::Json) -> Result<Self, CodecError> {
        wire.into_iter().map(T::from_json).collect()
    }

    fn to_binary(&self) -> Self::Binary {
        self.iter().map(WireEntity::to_binary).collect()
    }

    fn from_binary(wire: Self::Binary) -> Result<Self, CodecError> {
        wire.into_iter().map(T::from_binary).collect()
    }
}

/// Bind a domain type to its JSON and binary representations. Each
/// representation provides `From<&Domain>` and `TryFrom<Repr, Error = CodecError>`.
macro_rules! wire_entity {
    ($($domain:ty => $json:ty, $binary:ty;)+) => {
        $(
            impl WireEntity for $domain {
                type Json = $json;
                type Binary = $binary;

                fn to_json(&self) -> Self::Json {
                    <$json>::from(self)
                }

                fn from_json(wire: Self::Json) -> Result<Self, CodecError> {
                    <$domain>::try_from(wire)
                }

                fn to_binary(&self) -> Self::Binary {
                    <$binary>::from(self)
                }

                fn from_binary(wire: Self::Binary) -> Result<Self, CodecError> {
                    <$domain>::try_from(wire)
                }
            }
        )+
    };
}

wire_entity! {
    Company => json::CompanyJson, binary::CompanyMessage;
    Matchup => json::MatchupJson, binary::MatchupMessage;
    VoteOutcome => json::VoteOutcomeJson, binary::VoteOutcomeMessage;
    LeaderboardPage => json::LeaderboardJson, binary::LeaderboardMessage;
    UserLeaderboardPage => json::UserLeaderboardJson, binary::UserLeaderboardMessage;
    CriterionRating => json::CriterionRatingJson, binary::CriterionRatingMessage;
    AggregatedRating => json::AggregatedRatingJson, binary::AggregatedRatingMessage;
    Comment => json::CommentJson, binary::CommentMessage;
    CategoryCount => json::CategoryCountJson, binary::CategoryCountMessage;
    PlatformStats => json::PlatformStatsJson, binary::PlatformStatsMessage;
    HealthReport => json::HealthJson, binary::HealthMessage;
    ErrorBody => json::ErrorJson, binary::ErrorMessage;
    VoteRequest => json::VoteRequestJson, binary::VoteRequestMessage;
    RatingRequest => json::RatingRequestJson, binary::RatingRequestMessage;
    CommentRequest => json::CommentRequestJson, binary::CommentRequestMessage;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_negotiation() {
        assert_eq!(WireFormat::from_content_type(None), WireFormat::Json);
        assert_eq!(
            WireFormat::from_content_type(Some("application/json; charset=utf-8")),
            WireFormat::Json
        );
        assert_eq!(
            WireFormat::from_content_type(Some("application/x-protobuf")),
            WireFormat::Binary
        );
        assert_eq!(
            WireFormat::from_content_type(Some("Application/Octet-Stream")),
            WireFormat::Binary
        );
        assert_eq!(
            WireFormat::from_content_type(Some("text/plain")),
            WireFormat::Json
        );
    }

    #[test]
    fn test_accept_negotiation() {
        assert_eq!(WireFormat::from_accept(None), WireFormat::Json);
        assert_eq!(WireFormat::from_accept(Some("*/*")), WireFormat::Json);
        assert_eq!(
            WireFormat::from_accept(Some("application/json, application/x-protobuf;q=0.9")),
            WireFormat::Binary
        );
        assert_eq!(
            WireFormat::from_accept(Some("application/x-bincode")),
            WireFormat::Binary
        );
    }

    #[test]
    fn test_request_and_response_are_independent() {
        let negotiation = Negotiation::from_headers(Some("application/json"), Some(BINARY_CONTENT_TYPE));
        assert_eq!(negotiation.request, WireFormat::Json);
        assert_eq!(negotiation.response, WireFormat::Binary);

        let negotiation = Negotiation::from_headers(Some(BINARY_CONTENT_TYPE), None);
        assert_eq!(negotiation.request, WireFormat::Binary);
        assert_eq!(negotiation.response, WireFormat::Json);
    }

    #[test]
    fn test_error_body_in_both_formats() {
        let body = ErrorBody {
            error: "Company not found".to_string(),
            code: 404,
        };

        let bytes = encode(WireFormat::Json, &body).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["error"], "Company not found");
        assert_eq!(value["code"], 404);

        let bytes = encode(WireFormat::Binary, &body).unwrap();
        assert_eq!(decode::<ErrorBody>(WireFormat::Binary, &bytes).unwrap(), body);
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(
            decode::<VoteRequest>(WireFormat::Json, b"{not json"),
            Err(CodecError::Json(_))
        ));
        assert!(matches!(
            decode::<VoteRequest>(WireFormat::Binary, &[1, 2]),
            Err(CodecError::Binary(_))
        ));
    }
}
