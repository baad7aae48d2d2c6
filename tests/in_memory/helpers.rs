//! Shared fixtures for in-memory integration tests.

use chrono::{NaiveDate, NaiveDateTime};
use metrika_score::task::domain::{RawHit, RawVisit, RawVisitLogs, ScoredVisit};

/// Counter used across integration tests.
pub const COUNTER: i64 = 123_456;

/// Token used across integration tests.
pub const TOKEN: &str = "y0_integration_token";

/// Day whose logs the fixtures describe.
pub const DAY: &str = "2025-07-01";

/// Returns a timestamp `seconds` after 10:00 on [`DAY`].
///
/// # Panics
///
/// Never for offsets within the day.
#[must_use]
pub fn at(seconds: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 7, 1)
        .and_then(|date| date.and_hms_opt(10, 0, 0))
        .map(|start| start + chrono::Duration::seconds(i64::from(seconds)))
        .expect("valid fixture timestamp")
}

/// Builds one visit with hits at the given offsets from its start.
#[must_use]
pub fn visit_with_hits(
    visit_id: &str,
    client_id: &str,
    duration: u32,
    page_views: u32,
    hit_offsets: &[u32],
) -> (RawVisit, Vec<RawHit>) {
    let hits: Vec<RawHit> = hit_offsets
        .iter()
        .enumerate()
        .map(|(index, offset)| RawHit {
            watch_id: format!("{visit_id}-{index}"),
            date_time: at(*offset),
            device_category: 1,
        })
        .collect();
    let visit = RawVisit {
        visit_id: visit_id.to_owned(),
        client_id: client_id.to_owned(),
        watch_ids: hits.iter().map(|hit| hit.watch_id.clone()).collect(),
        date_time: at(0),
        visit_duration: duration,
        bounce: false,
        page_views,
        device_category: 1,
    };
    (visit, hits)
}

/// Logs with two engaged visits around one that bounced.
#[must_use]
pub fn mixed_logs() -> RawVisitLogs {
    let mut logs = RawVisitLogs::default();
    for (visit, hits) in [
        visit_with_hits("v1", "111", 240, 6, &[0, 20, 40, 60, 80]),
        visit_with_hits("v2", "222", 5, 1, &[0]),
        visit_with_hits("v3", "333", 600, 12, &[0, 16, 31, 46, 61, 76]),
    ] {
        logs.visits.push(visit);
        logs.hits.extend(hits);
    }
    logs
}

/// Builds `count` scored visits with sequential identifiers.
#[must_use]
pub fn scored_visits(count: u32) -> Vec<ScoredVisit> {
    (0..count)
        .map(|index| ScoredVisit {
            visit_id: format!("visit-{index}"),
            client_id: format!("client-{index}"),
            date_time: at(index),
            visit_duration: 300,
        })
        .collect()
}
