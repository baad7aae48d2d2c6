//! Unit tests for task parameter validation and result paging.

use crate::counter::CredentialError;
use crate::task::domain::{
    PageRequest, ScoredVisit, TaskDomainError, TaskId, TaskParams, TaskResult, parse_task_date,
};
use chrono::NaiveDate;
use rstest::{fixture, rstest};

#[rstest]
#[case("2025-07-01")]
#[case(" 2024-02-29 ")]
fn well_formed_dates_parse(#[case] raw: &str) {
    assert!(parse_task_date(raw).is_ok());
}

#[rstest]
#[case("2025-7-1")]
#[case("01-07-2025")]
#[case("2025/07/01")]
#[case("2025-02-30")]
#[case("")]
fn malformed_dates_are_rejected(#[case] raw: &str) {
    assert_eq!(
        parse_task_date(raw),
        Err(TaskDomainError::InvalidDate(raw.to_owned()))
    );
}

#[test]
fn params_reject_blank_token() {
    assert_eq!(
        TaskParams::new("2025-07-01", 123_456, "  "),
        Err(TaskDomainError::Credential(CredentialError::EmptyToken))
    );
}

#[test]
fn params_reject_non_positive_counter() {
    assert_eq!(
        TaskParams::new("2025-07-01", 0, "token"),
        Err(TaskDomainError::Credential(CredentialError::InvalidCounter(0)))
    );
}

#[rstest]
#[case(0, 0)]
#[case(1001, 0)]
#[case(-1, 0)]
fn page_limit_outside_range_is_rejected(#[case] limit: i64, #[case] offset: i64) {
    assert!(matches!(
        PageRequest::new(limit, offset),
        Err(TaskDomainError::InvalidPageLimit { .. })
    ));
}

#[test]
fn negative_offset_is_rejected() {
    assert_eq!(
        PageRequest::new(10, -5),
        Err(TaskDomainError::InvalidPageOffset(-5))
    );
}

#[test]
fn default_page_is_first_hundred_rows() {
    let page = PageRequest::default();
    assert_eq!((page.limit(), page.offset()), (100, 0));
}

#[fixture]
fn thirty_one_rows() -> TaskResult {
    let date = NaiveDate::from_ymd_opt(2025, 7, 1).expect("valid date");
    let visits = (0..31_u32)
        .map(|index| ScoredVisit {
            visit_id: format!("visit-{index}"),
            client_id: format!("client-{index}"),
            date_time: date.and_hms_opt(9, 0, index).expect("valid time"),
            visit_duration: 180 + index,
        })
        .collect();
    TaskResult::new(TaskId::new(), visits)
}

#[rstest]
#[case(10, 20, 10, true)]
#[case(10, 0, 10, true)]
#[case(10, 25, 6, false)]
#[case(100, 40, 0, false)]
#[case(31, 0, 31, false)]
fn pages_slice_deterministically(
    thirty_one_rows: TaskResult,
    #[case] limit: i64,
    #[case] offset: i64,
    #[case] expected_rows: usize,
    #[case] has_more: bool,
) {
    let request = PageRequest::new(limit, offset).expect("valid page");
    let page = thirty_one_rows.page(request);

    assert_eq!(page.data.len(), expected_rows);
    assert_eq!(page.pagination.total, 31);
    assert_eq!(page.pagination.has_more, has_more);
    assert_eq!(page, thirty_one_rows.page(request));
}

#[rstest]
fn page_starts_at_offset_row(thirty_one_rows: TaskResult) {
    let request = PageRequest::new(10, 20).expect("valid page");
    let page = thirty_one_rows.page(request);
    let first = page.data.first().map(|visit| visit.visit_id.as_str());
    let last = page.data.last().map(|visit| visit.visit_id.as_str());
    assert_eq!(first, Some("visit-20"));
    assert_eq!(last, Some("visit-29"));
}

#[test]
fn scored_visits_serialize_in_camel_case() {
    let visit = ScoredVisit {
        visit_id: "1".to_owned(),
        client_id: "2".to_owned(),
        date_time: NaiveDate::from_ymd_opt(2025, 7, 1)
            .and_then(|date| date.and_hms_opt(10, 30, 0))
            .expect("valid timestamp"),
        visit_duration: 200,
    };
    let json = serde_json::to_value(&visit).expect("visit should serialize");
    assert_eq!(
        json,
        serde_json::json!({
            "visitId": "1",
            "clientId": "2",
            "dateTime": "2025-07-01T10:30:00",
            "visitDuration": 200
        })
    );
}
