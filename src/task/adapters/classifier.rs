//! Rule-based engagement classifier.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::task::{
    domain::{RawVisit, RawVisitLogs, ScoredVisit},
    ports::{ClassifierError, VisitClassifier},
};

const SLOT_SECONDS: i64 = 15;

/// Thresholds a visit must meet to count as highly engaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngagementThresholds {
    /// Minimum visit length in seconds.
    pub min_duration_secs: u32,
    /// Minimum number of page views.
    pub min_page_views: u32,
    /// Minimum number of distinct 15-second windows containing a hit.
    pub min_active_slots: usize,
}

impl Default for EngagementThresholds {
    fn default() -> Self {
        Self {
            min_duration_secs: 180,
            min_page_views: 5,
            min_active_slots: 5,
        }
    }
}

/// Classifier that keeps visits meeting every engagement threshold.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngagementRuleClassifier {
    thresholds: EngagementThresholds,
}

impl EngagementRuleClassifier {
    /// Creates a classifier with custom thresholds.
    #[must_use]
    pub const fn new(thresholds: EngagementThresholds) -> Self {
        Self { thresholds }
    }

    fn qualifies(&self, visit: &RawVisit, hit_times: &HashMap<&str, NaiveDateTime>) -> bool {
        visit.visit_duration >= self.thresholds.min_duration_secs
            && visit.page_views >= self.thresholds.min_page_views
            && active_slots(visit, hit_times) >= self.thresholds.min_active_slots
    }
}

impl VisitClassifier for EngagementRuleClassifier {
    fn classify(&self, logs: &RawVisitLogs) -> Result<Vec<ScoredVisit>, ClassifierError> {
        let hit_times: HashMap<&str, NaiveDateTime> = logs
            .hits
            .iter()
            .map(|hit| (hit.watch_id.as_str(), hit.date_time))
            .collect();

        Ok(logs
            .visits
            .iter()
            .filter(|visit| self.qualifies(visit, &hit_times))
            .map(ScoredVisit::from_raw)
            .collect())
    }
}

/// Counts distinct 15-second windows, measured from the first hit, that
/// contain at least one of the visit's hits.
fn active_slots(visit: &RawVisit, hit_times: &HashMap<&str, NaiveDateTime>) -> usize {
    let times: Vec<NaiveDateTime> = visit
        .watch_ids
        .iter()
        .filter_map(|watch_id| hit_times.get(watch_id.as_str()).copied())
        .collect();
    let Some(first) = times.iter().min().copied() else {
        return 0;
    };
    times
        .iter()
        .map(|time| (*time - first).num_seconds().div_euclid(SLOT_SECONDS))
        .collect::<HashSet<_>>()
        .len()
}
