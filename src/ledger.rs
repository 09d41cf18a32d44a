//! Append-only record of completed sub-jobs, one JSON object per line.

use std::{
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::Path,
};

use anyhow::Result;
use serde_json::{Map, Value as JsonValue};
use tracing::warn;

use crate::job::{Job, JobCombination, Value};

/// File name of the ledger inside an output directory.
pub const LEDGER_FILE_NAME: &str = "downloaded_list.txt";

/// One completed job as read back from the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRecord(Map<String, JsonValue>);

impl LedgerRecord {
    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line).map(LedgerRecord)
    }

    /// Projects the record onto exactly `fields`, in that order.
    ///
    /// Extra fields are dropped. Returns `None` when a field is missing or
    /// holds something that is not a request value.
    pub fn project<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> Option<JobCombination> {
        fields
            .into_iter()
            .map(|name| {
                let value = Value::from_json(self.0.get(name)?)?;
                Some((name.to_string(), value))
            })
            .collect::<Option<Vec<_>>>()
            .map(JobCombination::new)
    }
}

/// Loads all records from the ledger at `path`.
///
/// A missing file is an empty ledger. A single malformed line makes the
/// whole ledger count as empty, so jobs get downloaded again rather than
/// the run failing.
pub fn load(path: &Path) -> Result<Vec<LedgerRecord>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match LedgerRecord::from_line(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(
                    "Ignoring ledger {}: line {} is malformed: {}",
                    path.display(),
                    number + 1,
                    e
                );
                return Ok(vec![]);
            }
        }
    }

    Ok(records)
}

/// Appends `job` as one line and flushes.
pub fn append(path: &Path, job: &Job) -> Result<()> {
    let mut line = serde_json::to_string(job)?;
    line.push('\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    file.flush()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------
