//! Voter identification
//!
//! Bearer credentials are optional; a verified subject only tags the vote.

pub mod verifier;

pub use verifier::{
    bearer_credential, AuthError, IdentityVerifier, MockIdentityVerifier, TokenTableVerifier,
    VerifiedSubject,
};
