use serde::{Deserialize, Serialize};

use crate::records::DetectionRecord;

/// Raw detection proportions at one GDD value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedPoint {
    pub gdd: f64,
    pub n: usize,
    pub n_pos: usize,
    pub n_pos2: usize,
    pub prop_pos: f64,
    pub prop_pos2: f64,
}

pub fn observed_summary(records: &[DetectionRecord]) -> Vec<ObservedPoint> {
    let mut sorted: Vec<&DetectionRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.gdd.total_cmp(&b.gdd));

    let mut out: Vec<ObservedPoint> = Vec::new();
    for r in sorted {
        match out.last_mut() {
            Some(point) if point.gdd == r.gdd => {
                point.n += 1;
                point.n_pos += r.pos as usize;
                point.n_pos2 += r.pos2 as usize;
            }
            _ => out.push(ObservedPoint {
                gdd: r.gdd,
                n: 1,
                n_pos: r.pos as usize,
                n_pos2: r.pos2 as usize,
                prop_pos: 0.0,
                prop_pos2: 0.0,
            }),
        }
    }
    for point in &mut out {
        point.prop_pos = point.n_pos as f64 / point.n as f64;
        point.prop_pos2 = point.n_pos2 as f64 / point.n as f64;
    }
    out
}
