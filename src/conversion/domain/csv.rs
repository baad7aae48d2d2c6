//! CSV payloads accepted by the offline conversion upload endpoint.
//!
//! The endpoint expects a header line, comma separators, LF line endings,
//! and `DateTime` as Unix seconds.

use super::{ClientIdType, ConversionDomainError, ConversionEvent};
use crate::task::domain::ScoredVisit;

/// A rendered upload file and the identity type it is keyed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionCsv {
    content: String,
    rows: usize,
    client_id_type: ClientIdType,
}

impl ConversionCsv {
    /// Renders `ClientId,Target,DateTime` rows for scored visits.
    ///
    /// Visit timestamps are interpreted as UTC.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionDomainError::EmptyTarget`] for a blank target and
    /// [`ConversionDomainError::NothingToUpload`] when `visits` is empty.
    pub fn from_visits(target: &str, visits: &[ScoredVisit]) -> Result<Self, ConversionDomainError> {
        let goal = target.trim();
        if goal.is_empty() {
            return Err(ConversionDomainError::EmptyTarget);
        }
        if visits.is_empty() {
            return Err(ConversionDomainError::NothingToUpload);
        }

        let mut content = String::from("ClientId,Target,DateTime\n");
        for visit in visits {
            push_row(
                &mut content,
                &[
                    escape(&visit.client_id),
                    escape(goal),
                    visit.date_time.and_utc().timestamp().to_string(),
                ],
            );
        }
        Ok(Self {
            content,
            rows: visits.len(),
            client_id_type: ClientIdType::ClientId,
        })
    }

    /// Renders rows for validated events.
    ///
    /// Columns are `Target,DateTime`, then every identity column present in
    /// any event, then `Price` and `Currency` when any event carries them.
    ///
    /// # Errors
    ///
    /// Returns [`ConversionDomainError::NothingToUpload`] when `events` is
    /// empty.
    pub fn from_events(events: &[ConversionEvent]) -> Result<Self, ConversionDomainError> {
        let mut identity_columns: Vec<ClientIdType> = events
            .iter()
            .flat_map(|event| event.identity().present())
            .collect();
        identity_columns.sort_unstable();
        identity_columns.dedup();
        let client_id_type = identity_columns
            .first()
            .copied()
            .ok_or(ConversionDomainError::NothingToUpload)?;
        let with_price = events.iter().any(|event| event.price().is_some());
        let with_currency = events.iter().any(|event| event.currency().is_some());

        let mut header = vec!["Target", "DateTime"];
        header.extend(identity_columns.iter().map(|kind| kind.column()));
        if with_price {
            header.push("Price");
        }
        if with_currency {
            header.push("Currency");
        }
        let mut content = header.join(",");
        content.push('\n');

        for event in events {
            let mut fields = vec![escape(event.target()), event.date_time().timestamp().to_string()];
            fields.extend(
                identity_columns
                    .iter()
                    .map(|kind| event.identity().get(*kind).map(escape).unwrap_or_default()),
            );
            if with_price {
                fields.push(event.price().map(|price| price.to_string()).unwrap_or_default());
            }
            if with_currency {
                fields.push(
                    event
                        .currency()
                        .map(|currency| currency.as_str().to_owned())
                        .unwrap_or_default(),
                );
            }
            push_row(&mut content, &fields);
        }
        Ok(Self {
            content,
            rows: events.len(),
            client_id_type,
        })
    }

    /// Returns the rendered file.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// Returns the number of data rows.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Returns the identity type the upload is keyed by.
    #[must_use]
    pub const fn client_id_type(&self) -> ClientIdType {
        self.client_id_type
    }
}

fn push_row(content: &mut String, fields: &[String]) {
    content.push_str(&fields.join(","));
    content.push('\n');
}

fn escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_owned()
    }
}
