use eab_gdd::error::AnalysisError;
use eab_gdd::records::{
    Direction, GddTable, MissingCovariatePolicy, RawDetectionMatrix, day_key, observed_summary,
    reshape, split_column,
};

fn gdd_table() -> GddTable {
    GddTable::new(vec![
        ("1".to_string(), 100.0),
        ("2".to_string(), 150.0),
        ("3".to_string(), 220.0),
    ])
    .unwrap()
}

fn two_trees() -> RawDetectionMatrix {
    RawDetectionMatrix::new(
        vec!["1N".to_string(), "2N".to_string(), "3N".to_string()],
        vec![
            ("A".to_string(), vec![Some(0), Some(1), Some(3)]),
            ("B".to_string(), vec![Some(0), None, Some(2)]),
        ],
    )
    .unwrap()
}

#[test]
fn missing_cell_yields_five_records() {
    let out = reshape(&two_trees(), &gdd_table(), MissingCovariatePolicy::Exclude).unwrap();
    assert_eq!(out.records.len(), 5);
    assert!(out.excluded.is_empty());
    assert_eq!(out.directions, vec![Direction('N')]);

    let a3 = out
        .records
        .iter()
        .find(|r| r.tree == "A" && r.day == "3")
        .unwrap();
    assert_eq!(a3.gdd, 220.0);
    assert_eq!((a3.count, a3.pos, a3.pos2), (3, 1, 1));

    let a2 = out
        .records
        .iter()
        .find(|r| r.tree == "A" && r.day == "2")
        .unwrap();
    assert_eq!(a2.gdd, 150.0);
    assert_eq!((a2.pos, a2.pos2), (1, 0));

    let b1 = out
        .records
        .iter()
        .find(|r| r.tree == "B" && r.day == "1")
        .unwrap();
    assert_eq!((b1.pos, b1.pos2), (0, 0));
    assert!(!out.records.iter().any(|r| r.tree == "B" && r.day == "2"));
}

#[test]
fn unknown_day_is_excluded_or_fails() {
    let gdd = GddTable::new(vec![("1".to_string(), 100.0), ("2".to_string(), 150.0)]).unwrap();

    let out = reshape(&two_trees(), &gdd, MissingCovariatePolicy::Exclude).unwrap();
    assert_eq!(out.records.len(), 3);
    assert_eq!(out.excluded.len(), 2);
    assert!(out.excluded.contains(&("A".to_string(), "3".to_string())));

    let err = reshape(&two_trees(), &gdd, MissingCovariatePolicy::Fail).unwrap_err();
    match err {
        AnalysisError::MissingCovariate { tree, day } => {
            assert_eq!(tree, "A");
            assert_eq!(day, "3");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn column_splits_day_and_direction() {
    assert_eq!(
        split_column("20190612S").unwrap(),
        ("20190612".to_string(), Direction('S'))
    );
    assert!(split_column("N").is_err());
    assert!(split_column("").is_err());
}

#[test]
fn more_than_two_directions_rejected() {
    let raw = RawDetectionMatrix::new(
        vec!["1N".to_string(), "1S".to_string(), "1E".to_string()],
        vec![("A".to_string(), vec![Some(0), Some(1), Some(0)])],
    )
    .unwrap();
    let err = reshape(&raw, &gdd_table(), MissingCovariatePolicy::Exclude).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidDirection(_)));
}

#[test]
fn ragged_matrix_rejected() {
    let err = RawDetectionMatrix::new(
        vec!["1N".to_string(), "2N".to_string()],
        vec![("A".to_string(), vec![Some(0)])],
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::ShapeMismatch(_)));
}

#[test]
fn observed_summary_groups_by_gdd() {
    let out = reshape(&two_trees(), &gdd_table(), MissingCovariatePolicy::Exclude).unwrap();
    let observed = observed_summary(&out.records);
    assert_eq!(observed.len(), 3);
    assert_eq!(observed[0].gdd, 100.0);
    assert_eq!(observed[0].n, 2);
    assert_eq!(observed[0].n_pos, 0);
    assert_eq!(observed[2].n, 2);
    assert_eq!(observed[2].n_pos2, 2);
    assert!((observed[2].prop_pos - 1.0).abs() < 1e-12);
    assert_eq!(observed[1].n, 1);
}

#[test]
fn integer_day_ids_join_by_value() {
    let gdd = GddTable::new(vec![("1".to_string(), 100.0), ("160".to_string(), 150.0)]).unwrap();
    let raw = RawDetectionMatrix::new(
        vec!["01N".to_string(), "160.0N".to_string(), "Jun3N".to_string()],
        vec![("A".to_string(), vec![Some(1), Some(0), Some(2)])],
    )
    .unwrap();

    let out = reshape(&raw, &gdd, MissingCovariatePolicy::Exclude).unwrap();
    assert_eq!(out.records.len(), 2);
    assert_eq!(out.records[0].day, "01");
    assert_eq!(out.records[0].gdd, 100.0);
    assert_eq!(out.records[1].gdd, 150.0);
    assert_eq!(out.excluded, vec![("A".to_string(), "Jun3".to_string())]);

    assert_eq!(day_key("007"), "7");
    assert_eq!(day_key("7.5"), "7.5");
    assert_eq!(day_key(" 2019-06-12 "), "2019-06-12");
}

#[test]
fn duplicate_day_ids_rejected_in_gdd_table() {
    let err = GddTable::new(vec![("1".to_string(), 100.0), ("01".to_string(), 120.0)]).unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidConfig(_)));
}

#[test]
fn duplicate_sampling_columns_rejected() {
    let raw = RawDetectionMatrix::new(
        vec!["1N".to_string(), "2N".to_string(), "1N".to_string()],
        vec![("A".to_string(), vec![Some(0), Some(1), Some(0)])],
    )
    .unwrap();
    let err = reshape(&raw, &gdd_table(), MissingCovariatePolicy::Exclude).unwrap_err();
    match err {
        AnalysisError::ShapeMismatch(msg) => assert!(msg.contains("duplicate sampling column '1N'")),
        other => panic!("unexpected error {other:?}"),
    }
}
