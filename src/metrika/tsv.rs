//! Parsing of tab-separated log parts downloaded from the Logs API.
//!
//! Each part starts with a header naming the requested fields. Columns are
//! located by name, so field order in the request does not matter.

use crate::task::domain::{RawHit, RawVisit};
use chrono::NaiveDateTime;
use std::str::FromStr;
use thiserror::Error;

/// Fields requested for the visits source.
pub const VISIT_FIELDS: [&str; 8] = [
    "ym:s:visitID",
    "ym:s:clientID",
    "ym:s:watchIDs",
    "ym:s:dateTime",
    "ym:s:visitDuration",
    "ym:s:bounce",
    "ym:s:pageViews",
    "ym:s:deviceCategory",
];

/// Fields requested for the hits source.
pub const HIT_FIELDS: [&str; 3] = ["ym:pv:watchID", "ym:pv:dateTime", "ym:pv:deviceCategory"];

const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A log part that could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: {reason}")]
pub struct TsvError {
    /// One-based line number in the part.
    pub line: usize,
    /// What was wrong.
    pub reason: String,
}

struct Table<'a> {
    header: Vec<&'a str>,
    rows: Vec<(usize, Vec<&'a str>)>,
}

impl<'a> Table<'a> {
    fn parse(content: &'a str) -> Self {
        let mut lines = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty());
        let header = lines
            .next()
            .map(|(_, line)| line.split('\t').map(str::trim).collect())
            .unwrap_or_default();
        let rows = lines
            .map(|(index, line)| (index.saturating_add(1), line.split('\t').collect()))
            .collect();
        Self { header, rows }
    }

    fn column(&self, name: &str) -> Result<usize, TsvError> {
        self.header
            .iter()
            .position(|field| *field == name)
            .ok_or_else(|| TsvError {
                line: 1,
                reason: format!("missing column {name}"),
            })
    }
}

fn cell<'a>(row: &[&'a str], line: usize, column: usize) -> Result<&'a str, TsvError> {
    row.get(column).copied().ok_or_else(|| TsvError {
        line,
        reason: format!("expected at least {} columns", column.saturating_add(1)),
    })
}

fn number<T: FromStr>(value: &str, line: usize, name: &str) -> Result<T, TsvError> {
    value.trim().parse::<T>().map_err(|_| TsvError {
        line,
        reason: format!("{name} is not a number: '{value}'"),
    })
}

fn date_time(value: &str, line: usize) -> Result<NaiveDateTime, TsvError> {
    NaiveDateTime::parse_from_str(value.trim(), DATE_TIME_FORMAT).map_err(|err| TsvError {
        line,
        reason: format!("invalid date-time '{value}': {err}"),
    })
}

/// Extracts page-view identifiers from a `[id,id,...]` list.
#[must_use]
pub fn parse_watch_ids(value: &str) -> Vec<String> {
    value
        .split(|ch: char| !ch.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parses a visits log part.
///
/// # Errors
///
/// Returns [`TsvError`] when a requested column is missing or a value does
/// not parse.
pub fn parse_visits(content: &str) -> Result<Vec<RawVisit>, TsvError> {
    let table = Table::parse(content);
    if table.rows.is_empty() {
        return Ok(Vec::new());
    }
    let [visit_id, client_id, watch_ids, when, duration, bounce, page_views, device] = [
        table.column("ym:s:visitID")?,
        table.column("ym:s:clientID")?,
        table.column("ym:s:watchIDs")?,
        table.column("ym:s:dateTime")?,
        table.column("ym:s:visitDuration")?,
        table.column("ym:s:bounce")?,
        table.column("ym:s:pageViews")?,
        table.column("ym:s:deviceCategory")?,
    ];

    table
        .rows
        .iter()
        .map(|(line, row)| {
            let at = *line;
            Ok(RawVisit {
                visit_id: cell(row, at, visit_id)?.trim().to_owned(),
                client_id: cell(row, at, client_id)?.trim().to_owned(),
                watch_ids: parse_watch_ids(cell(row, at, watch_ids)?),
                date_time: date_time(cell(row, at, when)?, at)?,
                visit_duration: number(cell(row, at, duration)?, at, "visitDuration")?,
                bounce: number::<u8>(cell(row, at, bounce)?, at, "bounce")? != 0,
                page_views: number(cell(row, at, page_views)?, at, "pageViews")?,
                device_category: number(cell(row, at, device)?, at, "deviceCategory")?,
            })
        })
        .collect()
}

/// Parses a hits log part.
///
/// # Errors
///
/// Returns [`TsvError`] when a requested column is missing or a value does
/// not parse.
pub fn parse_hits(content: &str) -> Result<Vec<RawHit>, TsvError> {
    let table = Table::parse(content);
    if table.rows.is_empty() {
        return Ok(Vec::new());
    }
    let [watch_id, when, device] = [
        table.column("ym:pv:watchID")?,
        table.column("ym:pv:dateTime")?,
        table.column("ym:pv:deviceCategory")?,
    ];

    table
        .rows
        .iter()
        .map(|(line, row)| {
            let at = *line;
            Ok(RawHit {
                watch_id: cell(row, at, watch_id)?.trim().to_owned(),
                date_time: date_time(cell(row, at, when)?, at)?,
                device_category: number(cell(row, at, device)?, at, "deviceCategory")?,
            })
        })
        .collect()
}
