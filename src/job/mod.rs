//! Splitting a templated retrieval request into sub-jobs.

pub mod combination;
pub mod field_spec;
pub mod filter;
pub mod materialize;
pub mod value;

use std::path::Path;

use anyhow::Result;
use thiserror::Error;

pub use combination::{expand, order_combinations, JobCombination};
pub use field_spec::FieldSpec;
pub use filter::{filter, FilterReport};
pub use materialize::{materialize, Job, NameTemplate, Naming};
pub use value::Value;

use crate::ledger;

/// Reserved template key holding the dataset target.
pub const DATA_TARGET_KEY: &str = "data_target";

#[derive(Error, Debug, PartialEq)]
pub enum JobError {
    #[error("Required field `{0}` is missing from the template")]
    MissingField(String),

    #[error("Field `{0}` is not defined in the request")]
    UnknownField(String),

    #[error("`data_target` must be a string, got {0}")]
    InvalidTarget(String),

    #[error("Invalid file name template `{0}`")]
    InvalidNameTemplate(String),

    #[error("File name template `{pattern}` must contain `{{id}}` or the split field `{field}`")]
    IncompleteNameTemplate { pattern: String, field: String },

    #[error("Jobs {first} and {second} would both write to {path}")]
    DuplicateOutputPath {
        first: String,
        second: String,
        path: String,
    },
}

/// Expands, filters, orders and materializes a batch.
pub fn prepare_batch_jobs(
    template: &FieldSpec,
    axes: &FieldSpec,
    skip: &[FieldSpec],
    ledger_path: &Path,
    output_dir: &Path,
    naming: &Naming,
) -> Result<(Vec<Job>, FilterReport)> {
    let downloaded = ledger::load(ledger_path)?;

    let combinations = expand(axes);
    let (remaining, report) = filter(combinations, skip, &downloaded);
    let ordered = order_combinations(remaining);
    let jobs = materialize(template, &ordered, output_dir, naming)?;

    Ok((jobs, report))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn should_prepare_remaining_jobs_in_order() {
        let dir = TempDir::new().unwrap();
        let ledger_path = dir.path().join(ledger::LEDGER_FILE_NAME);

        let template: FieldSpec = [
            ("data_target", Value::from("reanalysis-era5-single-levels")),
            ("product_type", Value::from("reanalysis")),
            ("format", Value::from("netcdf")),
            ("time", Value::from("12:00")),
        ]
        .into_iter()
        .collect();
        let axes: FieldSpec = [
            ("variable", Value::from(vec!["2m_temperature", "10m_u_component_of_wind"])),
            ("year", Value::from(vec![1980i64, 1979])),
        ]
        .into_iter()
        .collect();
        let skip: Vec<FieldSpec> = vec![[
            ("variable", Value::from("10m_u_component_of_wind")),
            ("year", Value::from(vec![1980i64])),
        ]
        .into_iter()
        .collect()];

        let (first_pass, _) = prepare_batch_jobs(
            &template,
            &axes,
            &skip,
            &ledger_path,
            dir.path(),
            &Naming::Default,
        )
        .unwrap();
        ledger::append(&ledger_path, &first_pass[0]).unwrap();

        let (jobs, report) = prepare_batch_jobs(
            &template,
            &axes,
            &skip,
            &ledger_path,
            dir.path(),
            &Naming::Default,
        )
        .unwrap();

        assert_eq!(
            report,
            FilterReport {
                defined: 4,
                skipped: 1,
                downloaded: 1,
                remaining: 2
            }
        );
        let names: Vec<PathBuf> = jobs
            .iter()
            .map(|job| PathBuf::from(job.output_path.file_name().unwrap()))
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("[ID0]2m_temperature-1979.nc"),
                PathBuf::from("[ID1]2m_temperature-1980.nc"),
            ]
        );
    }
}
