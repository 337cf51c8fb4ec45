//! Launch payload wire contract.

use stagegate_model::{DependencyRecord, DependencyStatus, LaunchPayload, NOT_SET};

#[test]
fn absent_fields_round_trip_as_sentinel() {
    let record = DependencyRecord::new("corr-1", "ADG-full", "", DependencyStatus::Completed);
    let payload = LaunchPayload::from(&record);

    let json = serde_json::to_value(&payload).unwrap();
    for field in ["s3_prefix", "snapshot_type", "export_date"] {
        assert_eq!(json[field], NOT_SET, "{field}");
    }
    assert_eq!(json["correlation_id"], "corr-1");

    let parsed: LaunchPayload = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, payload);
    assert_eq!(parsed.s3_prefix(), NOT_SET);
    assert_eq!(parsed.snapshot_type(), NOT_SET);
    assert_eq!(parsed.export_date(), NOT_SET);
}

#[test]
fn analytical_prefix_wins_over_snapshots() {
    let mut record =
        DependencyRecord::new("corr-1", "ADG-full", "2024-05-01", DependencyStatus::Completed);
    record.dataset_prefix = Some("analytical/".into());
    record.snapshots_prefix = Some("snapshots/".into());
    assert_eq!(LaunchPayload::from(&record).s3_prefix(), "analytical/");

    record.dataset_prefix = Some(String::new());
    assert_eq!(LaunchPayload::from(&record).s3_prefix(), "snapshots/");
}
