use std::{path::Path, time::Duration};

use anyhow::Result;

use super::{run_batch, summarise, RunSettings};
use crate::{
    config::ledger_path,
    request::{parse_request_file, split_fields},
};

/// Options of the `split` command beyond the request file.
pub struct SplitOptions<'a> {
    pub output_dir: &'a Path,
    pub fields: &'a [String],
    pub dry_run: bool,
    pub pause: u64,
    pub file_name: Option<&'a str>,
    pub ledger: Option<&'a Path>,
}

pub async fn split(request_file: &Path, options: SplitOptions<'_>) -> Result<String> {
    let template = parse_request_file(request_file)?;
    let axes = split_fields(&template, options.fields)?;

    println!("Split request by {}", options.fields.join(", "));

    let settings = RunSettings {
        output_dir: options.output_dir.to_path_buf(),
        ledger_path: ledger_path(options.output_dir, options.ledger),
        pause: Duration::from_secs(options.pause),
        dry_run: options.dry_run,
        file_name: options.file_name.map(str::to_string),
    };

    let report = run_batch(&template, &axes, &[], &settings).await?;

    Ok(summarise(&report, &settings.output_dir))
}

// -- Tests -------------------------------------------------------------------
