//! Conversion events and the visitor identities they are attributed to.

use super::ConversionDomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Visitor identity column used to match conversions to visits.
///
/// Variants are declared in matching priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClientIdType {
    /// Browser identifier assigned by the counter.
    ClientId,
    /// Site-assigned user identifier.
    UserId,
    /// Ad click identifier.
    Yclid,
    /// Purchase identifier.
    PurchaseId,
}

impl ClientIdType {
    /// Returns the value of the `client_id_type` query parameter.
    #[must_use]
    pub const fn as_param(self) -> &'static str {
        match self {
            Self::ClientId => "CLIENT_ID",
            Self::UserId => "USER_ID",
            Self::Yclid => "YCLID",
            Self::PurchaseId => "PURCHASE_ID",
        }
    }

    /// Returns the CSV column header for this identity.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::ClientId => "ClientId",
            Self::UserId => "UserId",
            Self::Yclid => "Yclid",
            Self::PurchaseId => "PurchaseId",
        }
    }
}

/// Identity fields of a conversion; at least one must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionIdentity {
    /// Browser identifier.
    pub client_id: Option<String>,
    /// Site-assigned user identifier.
    pub user_id: Option<String>,
    /// Ad click identifier.
    pub yclid: Option<String>,
    /// Purchase identifier.
    pub purchase_id: Option<String>,
}

impl ConversionIdentity {
    /// Creates an identity from a browser client identifier.
    #[must_use]
    pub fn client(client_id: impl Into<String>) -> Self {
        Self {
            client_id: Some(client_id.into()),
            ..Self::default()
        }
    }

    /// Returns the value stored for the given identity column.
    #[must_use]
    pub fn get(&self, kind: ClientIdType) -> Option<&str> {
        let value = match kind {
            ClientIdType::ClientId => &self.client_id,
            ClientIdType::UserId => &self.user_id,
            ClientIdType::Yclid => &self.yclid,
            ClientIdType::PurchaseId => &self.purchase_id,
        };
        value.as_deref().map(str::trim).filter(|trimmed| !trimmed.is_empty())
    }

    /// Returns every present identity column in priority order.
    #[must_use]
    pub fn present(&self) -> Vec<ClientIdType> {
        [
            ClientIdType::ClientId,
            ClientIdType::UserId,
            ClientIdType::Yclid,
            ClientIdType::PurchaseId,
        ]
        .into_iter()
        .filter(|kind| self.get(*kind).is_some())
        .collect()
    }

    /// Returns the highest-priority present identity column.
    #[must_use]
    pub fn primary(&self) -> Option<ClientIdType> {
        self.present().into_iter().next()
    }
}

/// Three-letter ISO 4217 currency code, stored upper case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Validates a currency code.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionDomainError::InvalidCurrency`] unless the value is
    /// exactly three ASCII letters.
    pub fn new(value: &str) -> Result<Self, ConversionDomainError> {
        let trimmed = value.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|ch| ch.is_ascii_alphabetic()) {
            return Err(ConversionDomainError::InvalidCurrency(value.to_owned()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Currency {
    type Error = ConversionDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Currency> for String {
    fn from(value: Currency) -> Self {
        value.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated conversion ready to be reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionEvent {
    identity: ConversionIdentity,
    target: String,
    date_time: DateTime<Utc>,
    price: Option<f64>,
    currency: Option<Currency>,
}

impl ConversionEvent {
    /// Validates a conversion.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionDomainError`] when no identity is present, the
    /// target is blank, the price is negative or non-finite, or the currency
    /// is malformed.
    pub fn new(
        identity: ConversionIdentity,
        target: &str,
        date_time: DateTime<Utc>,
        price: Option<f64>,
        currency: Option<&str>,
    ) -> Result<Self, ConversionDomainError> {
        if identity.primary().is_none() {
            return Err(ConversionDomainError::MissingIdentity);
        }
        let trimmed_target = target.trim();
        if trimmed_target.is_empty() {
            return Err(ConversionDomainError::EmptyTarget);
        }
        if price.is_some_and(|value| !value.is_finite() || value < 0.0) {
            return Err(ConversionDomainError::InvalidPrice);
        }
        let validated_currency = currency.map(Currency::new).transpose()?;
        Ok(Self {
            identity,
            target: trimmed_target.to_owned(),
            date_time,
            price,
            currency: validated_currency,
        })
    }

    /// Returns the visitor identity.
    #[must_use]
    pub const fn identity(&self) -> &ConversionIdentity {
        &self.identity
    }

    /// Returns the goal name.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns when the conversion happened.
    #[must_use]
    pub const fn date_time(&self) -> DateTime<Utc> {
        self.date_time
    }

    /// Returns the conversion value, if any.
    #[must_use]
    pub const fn price(&self) -> Option<f64> {
        self.price
    }

    /// Returns the currency of the price, if any.
    #[must_use]
    pub const fn currency(&self) -> Option<&Currency> {
        self.currency.as_ref()
    }
}
