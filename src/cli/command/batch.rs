use std::{path::Path, time::Duration};

use anyhow::Result;

use super::{run_batch, summarise, RunSettings};
use crate::config::BatchConfig;

pub async fn batch(job_file: &Path, dry_run: bool, pause: Option<u64>) -> Result<String> {
    let config = BatchConfig::from_file(job_file)?;

    let settings = RunSettings {
        output_dir: config.output_dir.clone(),
        ledger_path: config.ledger_path(),
        pause: pause.map(Duration::from_secs).unwrap_or_else(|| config.pause()),
        dry_run,
        file_name: config.file_name.clone(),
    };

    let report = run_batch(&config.template, &config.job, &config.skip, &settings).await?;

    Ok(summarise(&report, &settings.output_dir))
}

// -- Tests -------------------------------------------------------------------
