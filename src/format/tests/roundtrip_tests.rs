//! Load, save and reload without loss.

use std::fs;
use std::sync::atomic::AtomicBool;

use crate::format::save_record_set;
use crate::ingest::{NoProgress, load};
use crate::model::SCHEMA;

#[test]
fn test_roundtrip_preserves_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("LabelChecker_run.csv");
    fs::write(
        &path,
        "Name;Id;Uuid;AbdArea;Preprocessing;PreprocessingTrue;LabelPredicted;ProbabilityScore;LabelTrue\n\
         img_001;4;0190a1a6-1f2e-7c4d-8e9f-0a1b2c3d4e5f;12.75;object;object;algae;0.93;\n\
         img_002;5;0190a1a6-1f2e-7c4d-8e9f-0a1b2c3d4e60;0.5;bubble;;;0;\n",
    )
    .unwrap();

    let cancel = AtomicBool::new(false);
    let (first, _) = load(std::slice::from_ref(&path), &NoProgress, &cancel).unwrap();
    assert!(save_record_set(&first, &cancel).is_complete());

    let text = fs::read_to_string(&path).unwrap();
    let header = text.lines().next().unwrap();
    assert_eq!(header.split(',').count(), SCHEMA.len());

    let (second, _) = load(&[path], &NoProgress, &cancel).unwrap();
    assert_eq!(first.records(), second.records());

    let origins: Vec<i32> = second
        .records()
        .iter()
        .map(|r| second.origin(&r.uuid).unwrap().file_id)
        .collect();
    assert_eq!(origins, vec![4, 5]);
}

#[test]
fn test_roundtrip_keeps_generated_uuids() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("LabelChecker_run.csv");
    fs::write(&path, "Name,Id\na,1\nb,2\n").unwrap();

    let cancel = AtomicBool::new(false);
    let (first, report) = load(std::slice::from_ref(&path), &NoProgress, &cancel).unwrap();
    assert_eq!(report.generated_uuids, 2);
    save_record_set(&first, &cancel).into_result().unwrap();

    let (second, report) = load(&[path], &NoProgress, &cancel).unwrap();
    assert_eq!(report.generated_uuids, 0);
    let uuids = |set: &crate::store::RecordSet| -> Vec<_> {
        set.records().iter().map(|r| r.uuid).collect()
    };
    assert_eq!(uuids(&first), uuids(&second));
}
