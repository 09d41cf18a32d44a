use std::path::Path;

use anyhow::Result;

use crate::request::parse_request_file;

/// Parses a captured request and returns it as pretty JSON.
pub fn parse(request_file: &Path) -> Result<String> {
    let template = parse_request_file(request_file)?;

    Ok(serde_json::to_string_pretty(&template)?)
}

// -- Tests -------------------------------------------------------------------
