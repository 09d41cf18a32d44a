pub mod batch;
pub mod parse;
pub mod split;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use chrono::{Datelike, Local};

pub use batch::batch;
pub use parse::parse;
pub use split::split;

use crate::{
    cds::{CdsClient, Credentials},
    driver::{self, BatchOptions, BatchReport},
    job::{prepare_batch_jobs, FieldSpec, Job, NameTemplate, Naming},
    logging::{LogConfig, RunLog},
    retrieve::{DryRun, Retrieve},
};

/// Where and how a batch runs.
pub struct RunSettings {
    pub output_dir: PathBuf,
    pub ledger_path: PathBuf,
    pub pause: Duration,
    pub dry_run: bool,
    pub file_name: Option<String>,
}

/// Prepares the sub-jobs of `axes` over `template` and submits them.
pub async fn run_batch(
    template: &FieldSpec,
    axes: &FieldSpec,
    skip: &[FieldSpec],
    settings: &RunSettings,
) -> Result<BatchReport> {
    if !settings.dry_run && !settings.output_dir.exists() {
        fs::create_dir_all(&settings.output_dir).with_context(|| {
            format!("Failed to create output folder {}", settings.output_dir.display())
        })?;
        println!("Created folder at: {}", settings.output_dir.display());
    }

    let name_template = settings
        .file_name
        .as_deref()
        .map(NameTemplate::parse)
        .transpose()?;
    if let Some(pattern) = &name_template {
        pattern.validate(template, axes)?;
    }
    let render = |job: &Job| {
        name_template
            .as_ref()
            .map(|pattern| pattern.render(job))
            .unwrap_or_default()
    };
    let naming = if name_template.is_some() {
        Naming::Custom(&render)
    } else {
        Naming::Default
    };

    let (jobs, _) = prepare_batch_jobs(
        template,
        axes,
        skip,
        &settings.ledger_path,
        &settings.output_dir,
        &naming,
    )?;

    let retriever: Box<dyn Retrieve + Send + Sync> = if settings.dry_run {
        Box::new(DryRun)
    } else {
        Box::new(CdsClient::new(Credentials::load()?)?)
    };
    let log_config = if settings.dry_run {
        LogConfig::disabled()
    } else {
        LogConfig::to_file(settings.output_dir.join(make_log_file_name()))
    };
    let log = RunLog::new(&log_config)?;

    let options = BatchOptions {
        dry_run: settings.dry_run,
        pause: settings.pause,
        ledger_path: settings.ledger_path.clone(),
    };

    driver::run(jobs, retriever.as_ref(), &options, &log).await
}

pub fn make_log_file_name() -> PathBuf {
    let today = Local::now();
    let file_name = format!(
        "era5batch-{}-{:02}-{:02}.log",
        today.year(),
        today.month(),
        today.day()
    );

    PathBuf::from(file_name)
}

/// One line summary of a finished run.
pub fn summarise(report: &BatchReport, output_dir: &Path) -> String {
    format!(
        "{}/{} jobs succeeded, files in `{}`",
        report.succeeded,
        report.total,
        output_dir.display()
    )
}

// -- Tests -------------------------------------------------------------------
