//! Parses a request captured from the archive's web form back into a
//! template, so it can be resubmitted split into sub-jobs.
//!
//! Both the legacy snippet shape
//!
//! ```text
//! c.retrieve(
//!     'reanalysis-era5-pressure-levels',
//!     {
//!         'product_type': 'reanalysis',
//!         'year': ['1991', '1992'],
//!     },
//!     'download.nc')
//! ```
//!
//! and the `dataset = "..."` / `request = {...}` shape are understood.

pub mod literal;

use std::{fs, io, path::Path, sync::OnceLock};

use regex::Regex;
use thiserror::Error;
use tracing::warn;

use crate::job::{FieldSpec, JobError, DATA_TARGET_KEY};
pub use literal::{parse_literal, LiteralError};

/// Fields that are never split into sub-jobs.
const UNSPLITTABLE_FIELDS: [&str; 1] = ["area"];

#[derive(Error, Debug)]
pub enum RequestParseError {
    #[error("Failed to read request file: {0}")]
    Io(#[from] io::Error),

    #[error("Request file {0} is empty")]
    Empty(String),

    #[error("No dataset target found: expected a line like `c.retrieve('<dataset>', ...` or `dataset = \"<dataset>\"`")]
    TargetNotFound,

    #[error("No request dictionary `{{...}}` found after the dataset target")]
    DictNotFound,

    #[error("No `'key': value` entries found in the request dictionary")]
    KeyValueNotFound,

    #[error("Value of '{key}' is not a literal: {source}")]
    Literal {
        key: String,
        #[source]
        source: LiteralError,
    },
}

fn target_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r#"(?m)^[ \t]*(?:(?:\w+\.)?retrieve\(\s*|dataset[ \t]*=[ \t]*)['"]([^'"\n]+)['"]"#,
        )
        .expect("target pattern is valid")
    })
}

fn dict_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?ms)^[ \t]*(?:\w+[ \t]*=[ \t]*)?\{(.*)\}").expect("dict pattern is valid")
    })
}

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?m)^[ \t]*['"](\w+)['"][ \t]*:"#).expect("key pattern is valid")
    })
}

/// Reads and parses the request saved at `path`.
pub fn parse_request_file(path: &Path) -> Result<FieldSpec, RequestParseError> {
    let text = fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Err(RequestParseError::Empty(path.display().to_string()));
    }

    parse_request(&text)
}

/// Parses request text into a template holding the dictionary's fields
/// plus the dataset target under `data_target`.
pub fn parse_request(text: &str) -> Result<FieldSpec, RequestParseError> {
    let target = target_pattern()
        .captures(text)
        .ok_or(RequestParseError::TargetNotFound)?;
    let target_end = target.get(0).map(|m| m.end()).unwrap_or(0);
    let target = target[1].to_string();

    let body = dict_pattern()
        .captures(&text[target_end..])
        .and_then(|c| c.get(1))
        .ok_or(RequestParseError::DictNotFound)?
        .as_str();

    let keys: Vec<_> = key_pattern().captures_iter(body).collect();
    if keys.is_empty() {
        return Err(RequestParseError::KeyValueNotFound);
    }

    let mut template = FieldSpec::new();
    for (i, captures) in keys.iter().enumerate() {
        let whole = captures.get(0).expect("group 0 always matches");
        let value_end = keys
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(body.len());
        let key = captures[1].to_string();

        let value = parse_literal(&body[whole.end()..value_end]).map_err(|source| {
            RequestParseError::Literal {
                key: key.clone(),
                source,
            }
        })?;
        template.insert(key, value);
    }
    template.insert(DATA_TARGET_KEY, target);

    Ok(template)
}

/// Picks the fields of a parsed request to split into sub-jobs.
///
/// Every field must be in `template`. Unsplittable fields are skipped.
pub fn split_fields(template: &FieldSpec, fields: &[String]) -> Result<FieldSpec, JobError> {
    let mut axes = FieldSpec::new();

    for field in fields {
        let value = template
            .get(field)
            .ok_or_else(|| JobError::UnknownField(field.clone()))?;
        if UNSPLITTABLE_FIELDS.contains(&field.as_str()) {
            warn!("Field `{}` cannot be split, ignoring it", field);
            continue;
        }
        axes.insert(field.clone(), value.clone());
    }

    Ok(axes)
}

// -- Tests -------------------------------------------------------------------
