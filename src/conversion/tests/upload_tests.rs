//! Tests for upload status reconciliation.

use crate::conversion::domain::{
    ConversionDomainError, ConversionUpload, RemoteUploadState, UploadReceipt, UploadReport,
    UploadStatus,
};
use crate::counter::{ApiToken, CounterId};
use mockable::DefaultClock;
use rstest::{fixture, rstest};

#[fixture]
fn submitted() -> ConversionUpload {
    let mut upload = ConversionUpload::new(
        None,
        CounterId::new(42).expect("valid counter"),
        "engaged",
        ApiToken::new("token").expect("valid token"),
        10,
        &DefaultClock,
    );
    upload
        .mark_submitted(
            &UploadReceipt {
                external_id: 7,
                status: "UPLOADED".to_owned(),
                line_quantity: Some(10),
            },
            &DefaultClock,
        )
        .expect("pending upload accepts submission");
    upload
}

fn report(state: RemoteUploadState, processed: u32, errors: &[&str]) -> UploadReport {
    UploadReport {
        state,
        status: "PROCESSED".to_owned(),
        processed,
        errors: errors.iter().map(|error| (*error).to_owned()).collect(),
    }
}

#[rstest]
fn submission_moves_pending_to_processing(submitted: ConversionUpload) {
    assert_eq!(submitted.status(), UploadStatus::Processing);
    assert_eq!(submitted.external_id(), Some(7));
    assert_eq!(submitted.processed(), 0);
}

#[rstest]
#[case(Some(10), 10, None)]
#[case(Some(8), 10, Some(8))]
#[case(None, 10, None)]
fn receipt_line_count_is_cross_checked(
    #[case] line_quantity: Option<u32>,
    #[case] sent: u32,
    #[case] expected: Option<u32>,
) {
    let receipt = UploadReceipt {
        external_id: 7,
        status: "UPLOADED".to_owned(),
        line_quantity,
    };
    assert_eq!(receipt.line_mismatch(sent), expected);
}

#[rstest]
fn complete_report_marks_upload_processed(mut submitted: ConversionUpload) {
    submitted
        .apply_report(&report(RemoteUploadState::Completed, 10, &[]), &DefaultClock)
        .expect("report applies");
    assert_eq!(submitted.status(), UploadStatus::Processed);
    assert_eq!(submitted.processed(), 10);
    assert_eq!(submitted.errors(), None);
}

#[rstest]
fn partial_completion_is_an_error(mut submitted: ConversionUpload) {
    submitted
        .apply_report(&report(RemoteUploadState::Completed, 6, &[]), &DefaultClock)
        .expect("report applies");
    assert_eq!(submitted.status(), UploadStatus::Error);
    assert_eq!(submitted.processed(), 6);
    assert_eq!(
        submitted.errors(),
        Some(["only 6 of 10 rows were processed".to_owned()].as_slice())
    );
}

#[rstest]
fn row_errors_prevent_processed_status(mut submitted: ConversionUpload) {
    submitted
        .apply_report(
            &report(RemoteUploadState::Completed, 10, &["row 3: unknown ClientId"]),
            &DefaultClock,
        )
        .expect("report applies");
    assert_eq!(submitted.status(), UploadStatus::Error);
    assert_eq!(
        submitted.errors(),
        Some(["row 3: unknown ClientId".to_owned()].as_slice())
    );
}

#[rstest]
fn in_progress_report_keeps_processing(mut submitted: ConversionUpload) {
    submitted
        .apply_report(&report(RemoteUploadState::InProgress, 4, &[]), &DefaultClock)
        .expect("report applies");
    assert_eq!(submitted.status(), UploadStatus::Processing);
    assert_eq!(submitted.processed(), 4);
}

#[rstest]
fn processed_count_never_exceeds_total(mut submitted: ConversionUpload) {
    submitted
        .apply_report(&report(RemoteUploadState::Completed, 25, &[]), &DefaultClock)
        .expect("report applies");
    assert_eq!(submitted.processed(), 10);
    assert_eq!(submitted.status(), UploadStatus::Processed);
}

#[rstest]
fn failed_report_records_remote_status(mut submitted: ConversionUpload) {
    let mut failure = report(RemoteUploadState::Failed, 0, &[]);
    failure.status = "LINKAGE_FAILURE".to_owned();
    submitted
        .apply_report(&failure, &DefaultClock)
        .expect("report applies");
    assert_eq!(submitted.status(), UploadStatus::Error);
    assert_eq!(
        submitted.errors(),
        Some(["upload failed with status LINKAGE_FAILURE".to_owned()].as_slice())
    );
}

#[rstest]
fn terminal_upload_rejects_further_reports(mut submitted: ConversionUpload) {
    submitted
        .apply_report(&report(RemoteUploadState::Completed, 10, &[]), &DefaultClock)
        .expect("report applies");
    let result = submitted.apply_report(&report(RemoteUploadState::Failed, 0, &[]), &DefaultClock);

    assert!(matches!(
        result,
        Err(ConversionDomainError::InvalidTransition {
            status: UploadStatus::Processed,
            ..
        })
    ));
    assert_eq!(submitted.status(), UploadStatus::Processed);
}

#[rstest]
fn accepted_upload_cannot_be_marked_failed(mut submitted: ConversionUpload) {
    let result = submitted.mark_submit_failed("late failure", &DefaultClock);
    assert!(result.is_err());
    assert_eq!(submitted.status(), UploadStatus::Processing);
}

#[rstest]
#[case("pending", UploadStatus::Pending)]
#[case("PROCESSING", UploadStatus::Processing)]
#[case("processed", UploadStatus::Processed)]
#[case("error", UploadStatus::Error)]
fn statuses_parse_from_storage(#[case] raw: &str, #[case] expected: UploadStatus) {
    assert_eq!(UploadStatus::try_from(raw), Ok(expected));
}
