//! Voter identity verification
//!
//! A verifier turns a bearer credential into a verified subject. It is only
//! used to tag votes with a user id; voting never requires a credential.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

/// Identity established from a credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSubject {
    pub subject: String,
}

impl VerifiedSubject {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

/// Errors raised while verifying a credential
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("malformed authorization header")]
    MalformedHeader,

    #[error("invalid credential")]
    InvalidCredential,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Trait for identity verification services
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify a bearer credential and return its subject
    async fn verify(&self, credential: &str) -> Result<VerifiedSubject, AuthError>;
}

/// Extract the credential from an `Authorization` header value.
///
/// `Ok(None)` means no header was sent at all.
pub fn bearer_credential(header: Option<&str>) -> Result<Option<&str>, AuthError> {
    let Some(value) = header else {
        return Ok(None);
    };

    let (scheme, credential) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::MalformedHeader);
    }

    let credential = credential.trim();
    if credential.is_empty() {
        return Err(AuthError::MalformedHeader);
    }
    Ok(Some(credential))
}

/// Verifier backed by a static token table from configuration
#[derive(Debug, Clone, Default)]
pub struct TokenTableVerifier {
    tokens: HashMap<String, String>,
}

impl TokenTableVerifier {
    /// `tokens` maps credential to subject
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityVerifier for TokenTableVerifier {
    async fn verify(&self, credential: &str) -> Result<VerifiedSubject, AuthError> {
        match self.tokens.get(credential) {
            Some(subject) => {
                debug!("Credential verified for subject {}", subject);
                Ok(VerifiedSubject::new(subject.clone()))
            }
            None => Err(AuthError::InvalidCredential),
        }
    }
}

/// Mock identity verifier for testing
#[derive(Debug, Default)]
pub struct MockIdentityVerifier {
    always_allow: bool,
    unavailable: bool,
    valid_tokens: HashMap<String, String>,
    seen: Mutex<Vec<String>>,
}

impl MockIdentityVerifier {
    /// Every credential verifies, with the credential itself as subject
    pub fn allow_all() -> Self {
        Self {
            always_allow: true,
            ..Default::default()
        }
    }

    /// Every credential is rejected
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Every call fails as if the provider were down
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    /// Only the given credential -> subject pairs verify
    pub fn with_tokens(tokens: HashMap<String, String>) -> Self {
        Self {
            valid_tokens: tokens,
            ..Default::default()
        }
    }

    /// Credentials passed to `verify` so far
    pub fn seen_credentials(&self) -> Vec<String> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl IdentityVerifier for MockIdentityVerifier {
    async fn verify(&self, credential: &str) -> Result<VerifiedSubject, AuthError> {
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(credential.to_string());
        }

        if self.unavailable {
            return Err(AuthError::Unavailable("mock provider offline".to_string()));
        }
        if self.always_allow {
            return Ok(VerifiedSubject::new(credential));
        }
        self.valid_tokens
            .get(credential)
            .map(|subject| VerifiedSubject::new(subject.clone()))
            .ok_or(AuthError::InvalidCredential)
    }
}
