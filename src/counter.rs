//! Metrika counter identity and API credentials shared by every pipeline.
//!
//! Tasks, conversion uploads, and webhooks all address one analytics counter
//! and carry the OAuth token used to talk to the reporting API on its behalf.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors returned while validating counter and credential values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    /// The counter identifier is zero or negative.
    #[error("counter must be a positive integer, got {0}")]
    InvalidCounter(i64),

    /// The API token is missing or blank.
    #[error("API token must not be empty")]
    EmptyToken,
}

/// Positive identifier of an analytics counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CounterId(u64);

impl CounterId {
    /// Creates a validated counter identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidCounter`] when the value is not
    /// strictly positive.
    pub const fn new(value: i64) -> Result<Self, CredentialError> {
        if value <= 0 {
            return Err(CredentialError::InvalidCounter(value));
        }
        Ok(Self(value.unsigned_abs()))
    }

    /// Returns the underlying numeric value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Returns the value in the signed form used by the record store.
    ///
    /// Construction guarantees the value fits in `i64`.
    #[must_use]
    pub fn as_i64(self) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }
}

impl fmt::Display for CounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// OAuth token granting access to the reporting API.
///
/// The token value never appears in `Debug` output so that records holding
/// it can be logged safely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiToken(String);

impl ApiToken {
    /// Creates a validated token.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::EmptyToken`] when the value is blank.
    pub fn new(value: impl Into<String>) -> Result<Self, CredentialError> {
        let raw = value.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CredentialError::EmptyToken);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the raw token for building an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0)]
    #[case(-5)]
    fn counter_rejects_non_positive_values(#[case] value: i64) {
        assert_eq!(
            CounterId::new(value),
            Err(CredentialError::InvalidCounter(value))
        );
    }

    #[test]
    fn counter_round_trips_through_signed_form() {
        let counter = CounterId::new(123_456).expect("valid counter");
        assert_eq!(counter.value(), 123_456);
        assert_eq!(counter.as_i64(), 123_456);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn token_rejects_blank_values(#[case] value: &str) {
        assert_eq!(ApiToken::new(value), Err(CredentialError::EmptyToken));
    }

    #[test]
    fn token_debug_output_is_redacted() {
        let token = ApiToken::new("y0_secret").expect("valid token");
        assert_eq!(format!("{token:?}"), "ApiToken(***)");
        assert_eq!(token.expose(), "y0_secret");
    }
}
