//! Batch job files.
//!
//! ```toml
//! output_dir = "/data/era5"
//! pause_seconds = 3
//!
//! [template]
//! data_target = "reanalysis-era5-pressure-levels"
//! product_type = "reanalysis"
//! format = "netcdf"
//! time = ["00:00", "06:00", "12:00", "18:00"]
//!
//! [job]
//! variable = ["u_component_of_wind", "geopotential"]
//! year = { from = 2000, to = 2001 }
//!
//! [[skip]]
//! variable = "geopotential"
//! year = [2001]
//! ```

use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use thiserror::Error;

use crate::{job::FieldSpec, ledger::LEDGER_FILE_NAME};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Invalid job file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Where sub-job files, the ledger and the run log are written.
    pub output_dir: PathBuf,

    #[serde(default = "default_pause_seconds")]
    pub pause_seconds: u64,

    /// Ledger file; relative paths are under `output_dir`.
    pub ledger: Option<PathBuf>,

    /// File name template, e.g. `era5_{variable}_{year}.nc`.
    pub file_name: Option<String>,

    /// Defaults for every field a request needs, including `data_target`.
    pub template: FieldSpec,

    /// Fields to split on; list values are expanded.
    pub job: FieldSpec,

    #[serde(default)]
    pub skip: Vec<FieldSpec>,
}

const fn default_pause_seconds() -> u64 {
    3
}

impl BatchConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_secs(self.pause_seconds)
    }

    pub fn ledger_path(&self) -> PathBuf {
        ledger_path(&self.output_dir, self.ledger.as_deref())
    }
}

/// Resolves the ledger location for an output directory.
pub fn ledger_path(output_dir: &Path, ledger: Option<&Path>) -> PathBuf {
    match ledger {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => output_dir.join(path),
        None => output_dir.join(LEDGER_FILE_NAME),
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::Value;

    const JOB_FILE: &str = r#"
        output_dir = "/data/era5"

        [template]
        data_target = "reanalysis-era5-pressure-levels"
        product_type = "reanalysis"
        format = "netcdf"
        area = [10, 80, -10, 100]

        [job]
        variable = ["u_component_of_wind", "geopotential"]
        year = { from = 2000, to = 2001 }
        pressure_level = [1000, 800]

        [[skip]]
        variable = "u_component_of_wind"
        year = [2000]
        pressure_level = [1000, 800]

        [[skip]]
        variable = "geopotential"
        year = [2001]
        pressure_level = [800]
    "#;

    #[test]
    fn should_parse_job_file() {
        let config = BatchConfig::parse(JOB_FILE).unwrap();

        assert_eq!(config.pause(), Duration::from_secs(3));
        assert_eq!(config.ledger_path(), PathBuf::from("/data/era5/downloaded_list.txt"));
        assert_eq!(
            config.job.keys().collect::<Vec<_>>(),
            vec!["variable", "year", "pressure_level"]
        );
        assert_eq!(config.job.get("year"), Some(&Value::from(vec![2000i64, 2001])));
        assert_eq!(config.skip.len(), 2);
        assert_eq!(
            config.template.get("area"),
            Some(&Value::from(vec![10i64, 80, -10, 100]))
        );
    }

    #[test]
    fn should_resolve_relative_ledger() {
        assert_eq!(
            ledger_path(Path::new("/data"), Some(Path::new("done.txt"))),
            PathBuf::from("/data/done.txt")
        );
        assert_eq!(
            ledger_path(Path::new("/data"), Some(Path::new("/var/done.txt"))),
            PathBuf::from("/var/done.txt")
        );
    }

    #[test]
    fn should_reject_unknown_keys() {
        let text = "output_dir = \"/d\"\nretries = 3\n[template]\n[job]\n";
        assert!(matches!(BatchConfig::parse(text), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn should_require_template() {
        assert!(BatchConfig::parse("output_dir = \"/d\"\n[job]\n").is_err());
    }
}
