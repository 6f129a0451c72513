use std::fs;

use eab_gdd::io::tsv_writer::{write_observed, write_samples_required};
use eab_gdd::projection::{SamplesRequiredDistribution, SamplesRequiredRow};
use eab_gdd::records::{DetectionRecord, Direction, observed_summary};
use tempfile::TempDir;

#[test]
fn unbounded_samples_written_as_inf() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("samples_required.tsv");
    let dist = SamplesRequiredDistribution {
        target: 0.95,
        n_draws: 4,
        rows: vec![
            SamplesRequiredRow {
                gdd: 100.0,
                q025: 12.5,
                q10: 20.0,
                q50: 40.0,
                q90: f64::INFINITY,
                q975: f64::INFINITY,
            },
            SamplesRequiredRow {
                gdd: 200.0,
                q025: 1.0,
                q10: 1.5,
                q50: 2.0,
                q90: 3.0,
                q975: 4.0,
            },
        ],
    };
    write_samples_required(&path, &dist).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "gdd\tq2.5\tq10\tq50\tq90\tq97.5");
    assert_eq!(
        lines[1],
        "100.000000\t12.500000\t20.000000\t40.000000\tinf\tinf"
    );
    assert_eq!(lines.len(), 3);
}

#[test]
fn observed_table_has_proportions() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("observed.tsv");
    let records = vec![
        DetectionRecord::new("A".into(), "1".into(), 50.0, Direction('N'), 3),
        DetectionRecord::new("B".into(), "1".into(), 50.0, Direction('N'), 0),
        DetectionRecord::new("A".into(), "2".into(), 80.0, Direction('N'), 1),
    ];
    write_observed(&path, &observed_summary(&records)).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "gdd\tn\tn_pos\tn_pos2\tprop_pos\tprop_pos2");
    assert_eq!(lines[1], "50.000000\t2\t1\t1\t0.500000\t0.500000");
    assert_eq!(lines[2], "80.000000\t1\t1\t0\t1.000000\t0.000000");
}
