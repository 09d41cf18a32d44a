//! Removes skipped and already downloaded combinations.

use std::collections::HashSet;

use super::{expand, FieldSpec, JobCombination};
use crate::ledger::LedgerRecord;

/// Counts reported by [`filter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub defined: usize,
    pub skipped: usize,
    pub downloaded: usize,
    pub remaining: usize,
}

impl FilterReport {
    pub fn print(&self) {
        println!("\nNumber of jobs defined: {}", self.defined);
        println!("Number of skipped jobs from skip list: {}", self.skipped);
        println!("Number of already downloaded jobs: {}", self.downloaded);
        println!("Number of jobs after skipping: {}", self.remaining);
    }
}

/// Returns `combinations` minus everything matched by `skip` or `ledger`.
///
/// Each skip entry is expanded like the batch axes. Ledger records are
/// projected onto the field names of the first combination, so extra
/// ledger fields such as the output path never affect matching. Order and
/// duplicates of the surviving combinations are kept.
pub fn filter(
    combinations: Vec<JobCombination>,
    skip: &[FieldSpec],
    ledger: &[LedgerRecord],
) -> (Vec<JobCombination>, FilterReport) {
    let skipped: Vec<JobCombination> = skip.iter().flat_map(expand).collect();

    let downloaded: Vec<JobCombination> = match combinations.first() {
        Some(first) => ledger
            .iter()
            .filter_map(|record| record.project(first.field_names()))
            .collect(),
        None => vec![],
    };

    let excluded: HashSet<&JobCombination> = skipped.iter().chain(downloaded.iter()).collect();

    let defined = combinations.len();
    let remaining: Vec<JobCombination> = combinations
        .into_iter()
        .filter(|combination| !excluded.contains(combination))
        .collect();

    let report = FilterReport {
        defined,
        skipped: skipped.len(),
        downloaded: downloaded.len(),
        remaining: remaining.len(),
    };
    report.print();

    (remaining, report)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Value;

    fn axes() -> FieldSpec {
        [
            ("variable", Value::from(vec!["u_component_of_wind", "geopotential"])),
            ("year", Value::from(vec![2000i64, 2001])),
            ("pressure_level", Value::from(vec![1000i64, 800])),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn should_be_identity_without_exclusions() {
        let combinations = expand(&axes());
        let (remaining, report) = filter(combinations.clone(), &[], &[]);

        assert_eq!(remaining, combinations);
        assert_eq!(report.remaining, 8);
        assert_eq!(report.skipped, 0);
    }

    #[test]
    fn should_remove_expanded_skip_entries() {
        let skip: Vec<FieldSpec> = vec![
            [
                ("variable", Value::from("u_component_of_wind")),
                ("year", Value::from(vec![2000i64])),
                ("pressure_level", Value::from(vec![1000i64, 800])),
            ]
            .into_iter()
            .collect(),
            [
                ("variable", Value::from("geopotential")),
                ("year", Value::from(vec![2001i64])),
                ("pressure_level", Value::from(vec![800i64])),
            ]
            .into_iter()
            .collect(),
        ];

        let (remaining, report) = filter(expand(&axes()), &skip, &[]);

        assert_eq!(report.skipped, 3);
        assert_eq!(report.remaining, 5);
        assert!(remaining
            .iter()
            .all(|c| !(c.get("variable") == Some(&Value::from("u_component_of_wind"))
                && c.get("year") == Some(&Value::Int(2000)))));
    }

    #[test]
    fn should_remove_downloaded_jobs_ignoring_extra_fields() {
        let ledger = vec![LedgerRecord::from_line(
            r#"{"data_target": "reanalysis-era5-pressure-levels", "format": "netcdf",
                "output_path": "/data/[ID0]800-geopotential-2001.nc",
                "pressure_level": 800, "variable": "geopotential", "year": 2001}"#,
        )
        .unwrap()];

        let (remaining, report) = filter(expand(&axes()), &[], &ledger);

        assert_eq!(report.downloaded, 1);
        assert_eq!(report.remaining, 7);
        let done = ledger[0].project(["variable", "year", "pressure_level"]).unwrap();
        assert!(!remaining.contains(&done));
    }

    #[test]
    fn should_not_match_ledger_values_of_a_different_type() {
        let ledger = vec![LedgerRecord::from_line(
            r#"{"pressure_level": "800", "variable": "geopotential", "year": "2001"}"#,
        )
        .unwrap()];

        let (_, report) = filter(expand(&axes()), &[], &ledger);

        assert_eq!(report.remaining, 8);
    }

    #[test]
    fn should_remove_every_copy_of_an_excluded_duplicate() {
        let duplicated: FieldSpec = [("year", Value::from(vec![2000i64, 2000, 2001]))]
            .into_iter()
            .collect();
        let skip: Vec<FieldSpec> = vec![[("year", Value::Int(2000))].into_iter().collect()];

        let (remaining, _) = filter(expand(&duplicated), &skip, &[]);
        assert_eq!(remaining.len(), 1);

        let (kept, _) = filter(expand(&duplicated), &[], &[]);
        assert_eq!(kept.len(), 3);
    }
}
