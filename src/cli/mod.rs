//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{command, Parser, Subcommand};
use indicatif::ProgressBar;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a batch described by a TOML job file
    Batch {
        /// Job file with `output_dir`, `[template]`, `[job]` and `[[skip]]`
        job_file: PathBuf,

        /// Print the requests without submitting them
        #[arg(long)]
        dry: bool,

        /// Seconds to pause between jobs, overriding the job file
        #[arg(long)]
        pause: Option<u64>,
    },
    /// Split a request copied from the web form into sub-jobs and run them
    Split {
        /// Text file holding the captured API request
        request_file: PathBuf,

        /// Folder to save the downloaded files in
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Fields to split on, e.g. `variable,year`
        #[arg(short, long, value_delimiter = ',', required = true)]
        split: Vec<String>,

        /// Print the requests without submitting them
        #[arg(long)]
        dry: bool,

        /// Seconds to pause between jobs
        #[arg(long, default_value_t = 3)]
        pause: u64,

        /// File name template, e.g. `era5_{variable}_{year}.nc`
        #[arg(long)]
        file_name: Option<String>,

        /// Ledger of finished jobs, defaults to `<output_dir>/downloaded_list.txt`
        #[arg(long)]
        ledger: Option<PathBuf>,
    },
    /// Print a captured request as JSON
    Parse {
        /// Text file holding the captured API request
        request_file: PathBuf,
    },
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

// -- Tests -------------------------------------------------------------------
