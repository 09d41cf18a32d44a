//! The submission step every sub-job goes through.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use crate::job::FieldSpec;

/// Submits one retrieval request and saves the result at `output_path`.
#[async_trait]
pub trait Retrieve {
    async fn retrieve(&self, target: &str, parameters: &FieldSpec, output_path: &Path)
        -> Result<()>;
}

/// Prints the request it would submit and touches nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRun;

#[async_trait]
impl Retrieve for DryRun {
    async fn retrieve(
        &self,
        target: &str,
        parameters: &FieldSpec,
        output_path: &Path,
    ) -> Result<()> {
        println!("\n########### DRY RUN ############\n");
        println!("data_target = {}", target);
        println!("request = {}", serde_json::to_string_pretty(parameters)?);
        println!("\nSave file to: {}", output_path.display());

        Ok(())
    }
}
