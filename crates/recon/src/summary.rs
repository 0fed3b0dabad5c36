use std::collections::BTreeMap;

use crate::model::{InconsistencyRecord, ReconSummary};

/// Compute summary statistics from the flagged records.
pub fn compute_summary(
    reference_rows: usize,
    blank_identifiers: usize,
    records: &[InconsistencyRecord],
) -> ReconSummary {
    let mut label_counts: BTreeMap<String, usize> = BTreeMap::new();

    for r in records {
        for label in &r.labels {
            *label_counts.entry(label.clone()).or_insert(0) += 1;
        }
    }

    ReconSummary {
        reference_rows,
        blank_identifiers,
        flagged: records.len(),
        label_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Row;

    fn record(id: &str, labels: &[&str]) -> InconsistencyRecord {
        InconsistencyRecord::new(
            id.into(),
            Row::new(),
            labels.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn summary_counts() {
        let records = vec![
            record("1", &["Identifier not found"]),
            record("2", &["Name mismatch", "Present in both sources"]),
            record("3", &["Name mismatch"]),
        ];
        let summary = compute_summary(10, 1, &records);
        assert_eq!(summary.reference_rows, 10);
        assert_eq!(summary.blank_identifiers, 1);
        assert_eq!(summary.flagged, 3);
        assert_eq!(summary.label_counts["Name mismatch"], 2);
        assert_eq!(summary.label_counts["Identifier not found"], 1);
        assert_eq!(summary.label_counts["Present in both sources"], 1);
    }

    #[test]
    fn empty_summary() {
        let summary = compute_summary(0, 0, &[]);
        assert_eq!(summary.flagged, 0);
        assert!(summary.label_counts.is_empty());
    }
}
