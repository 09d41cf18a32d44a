//! Drives sub-jobs through submission one at a time.
//!
//! Submission, ledger append and the pause between jobs are strictly
//! sequential: the archive rate-limits and queues requests per user.

use std::{fmt::Debug, path::PathBuf, time::Duration};

use anyhow::Result;
use serde::Serialize;
use tracing::{error, info};

use crate::{job::Job, ledger, logging::RunLog, retrieve::Retrieve};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Dry runs never append to the ledger and never pause.
    pub dry_run: bool,
    pub pause: Duration,
    pub ledger_path: PathBuf,
}

#[derive(Debug)]
pub struct FailedJob {
    pub job: Job,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<FailedJob>,
}

impl BatchReport {
    pub fn print(&self) {
        if self.total == 0 {
            return;
        }
        if self.failed.is_empty() {
            println!("\nAll done.");
            return;
        }

        println!("\nFailed jobs: {}/{}", self.failed.len(), self.total);
        for failed in &self.failed {
            println!("{}\n    {}", describe(&failed.job), failed.error);
        }
    }
}

/// JSON when it serializes, the debug form otherwise.
fn describe<T: Serialize + Debug>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value))
}

/// Submits `jobs` in order.
///
/// A failed submission is recorded and the batch moves on. Each success is
/// appended to the ledger straight away, so the ledger always matches the
/// files actually retrieved. Only a ledger write failure stops the run.
pub async fn run<R: Retrieve + ?Sized>(
    jobs: Vec<Job>,
    retriever: &R,
    options: &BatchOptions,
    log: &RunLog,
) -> Result<BatchReport> {
    let mut report = BatchReport {
        total: jobs.len(),
        ..Default::default()
    };

    if jobs.is_empty() {
        println!("\nNo job to run.");
        return Ok(report);
    }

    let width = jobs.len().to_string().len();
    for (index, job) in jobs.into_iter().enumerate() {
        let number = format!("{:0width$}", index + 1, width = width);
        println!("\nProcessing job {}/{}", number, report.total);

        log.in_scope(|| {
            info!("Launch job {} ({})", number, job.id);
            info!("Data target: {}", job.target);
            info!("Job info: {}", describe(&job.parameters));
            info!("Output file location: {}", job.output_path.display());
        });

        match retriever
            .retrieve(&job.target, &job.parameters, &job.output_path)
            .await
        {
            Ok(()) => {
                log.in_scope(|| info!("Job {} finished", number));
                report.succeeded += 1;

                if !options.dry_run {
                    ledger::append(&options.ledger_path, &job)?;
                    tokio::time::sleep(options.pause).await;
                }
            }
            Err(e) => {
                println!("Failed job {}: {:#}", number, e);
                log.in_scope(|| error!("Job {} failed: {:#}", number, e));
                report.failed.push(FailedJob {
                    job,
                    error: format!("{:#}", e),
                });
            }
        }
    }

    report.print();

    Ok(report)
}

// -- Tests -------------------------------------------------------------------
