//! Raw visit log records and the scored visits produced from them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One session row from the raw visits log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawVisit {
    /// Visit identifier assigned by the analytics counter.
    pub visit_id: String,
    /// Browser-level visitor identifier.
    pub client_id: String,
    /// Page-view identifiers belonging to this visit.
    pub watch_ids: Vec<String>,
    /// Visit start time as reported by the counter.
    pub date_time: NaiveDateTime,
    /// Visit length in seconds.
    pub visit_duration: u32,
    /// Whether the visit was counted as a bounce.
    pub bounce: bool,
    /// Number of page views in the visit.
    pub page_views: u32,
    /// Device category code (1 desktop, 2 mobile, 3 tablet, 0 unknown).
    pub device_category: u8,
}

/// One page-view row from the raw hits log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHit {
    /// Page-view identifier.
    pub watch_id: String,
    /// Page-view time.
    pub date_time: NaiveDateTime,
    /// Device category code.
    pub device_category: u8,
}

/// Visits and hits downloaded for one counter and day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawVisitLogs {
    /// Session rows in log order.
    pub visits: Vec<RawVisit>,
    /// Page-view rows.
    pub hits: Vec<RawHit>,
}

/// A visit that qualified as highly engaged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredVisit {
    /// Visit identifier.
    pub visit_id: String,
    /// Visitor identifier used for conversion uploads.
    pub client_id: String,
    /// Visit start time, interpreted as UTC.
    pub date_time: NaiveDateTime,
    /// Visit length in seconds.
    pub visit_duration: u32,
}

impl ScoredVisit {
    /// Projects a raw visit onto its scored form.
    #[must_use]
    pub fn from_raw(visit: &RawVisit) -> Self {
        Self {
            visit_id: visit.visit_id.clone(),
            client_id: visit.client_id.clone(),
            date_time: visit.date_time,
            visit_duration: visit.visit_duration,
        }
    }
}
