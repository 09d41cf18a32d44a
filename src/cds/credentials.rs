//! Archive API credentials, read the same way the official client does.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use thiserror::Error;

const URL_VAR: &str = "CDSAPI_URL";
const KEY_VAR: &str = "CDSAPI_KEY";
const RC_VAR: &str = "CDSAPI_RC";
const RC_FILE_NAME: &str = ".cdsapirc";

#[derive(Error, Debug, PartialEq)]
pub enum CredentialsError {
    #[error("Missing or incomplete configuration file: {0}")]
    MissingFile(String),

    #[error("Missing `{field}` in {source_name}")]
    MissingField {
        field: &'static str,
        source_name: String,
    },

    #[error("API key must look like `<uid>:<api-key>`")]
    MalformedKey,

    #[error("Cannot locate the home directory to find {0}")]
    NoHomeDir(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Credentials {
    pub url: String,
    pub key: String,
}

impl Credentials {
    /// Reads `CDSAPI_URL` and `CDSAPI_KEY`, falling back to the rc file at
    /// `CDSAPI_RC` or `~/.cdsapirc`.
    pub fn load() -> Result<Self, CredentialsError> {
        if let (Ok(url), Ok(key)) = (env::var(URL_VAR), env::var(KEY_VAR)) {
            return Ok(Credentials { url, key });
        }

        let rc_path = match env::var(RC_VAR) {
            Ok(path) => PathBuf::from(path),
            Err(_) => dirs::home_dir()
                .ok_or(CredentialsError::NoHomeDir(RC_FILE_NAME))?
                .join(RC_FILE_NAME),
        };

        Self::from_file(&rc_path)
    }

    pub fn from_file(path: &Path) -> Result<Self, CredentialsError> {
        let text = fs::read_to_string(path)
            .map_err(|_| CredentialsError::MissingFile(path.display().to_string()))?;

        Self::parse(&text, &path.display().to_string())
    }

    /// Parses `key: value` lines; unknown keys are ignored.
    pub fn parse(text: &str, source_name: &str) -> Result<Self, CredentialsError> {
        let mut url = None;
        let mut key = None;

        for line in text.lines() {
            if let Some((name, value)) = line.split_once(':') {
                match name.trim() {
                    "url" => url = Some(value.trim().to_string()),
                    "key" => key = Some(value.trim().to_string()),
                    _ => {}
                }
            }
        }

        let missing = |field| CredentialsError::MissingField {
            field,
            source_name: source_name.to_string(),
        };

        Ok(Credentials {
            url: url.filter(|u| !u.is_empty()).ok_or_else(|| missing("url"))?,
            key: key.filter(|k| !k.is_empty()).ok_or_else(|| missing("key"))?,
        })
    }

    /// Splits the key into the basic-auth user and password.
    pub fn basic_auth(&self) -> Result<(&str, &str), CredentialsError> {
        self.key
            .split_once(':')
            .filter(|(uid, secret)| !uid.is_empty() && !secret.is_empty())
            .ok_or(CredentialsError::MalformedKey)
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn should_parse_rc_file() {
        let text = "url: https://cds.climate.copernicus.eu/api/v2\nkey: 12345:abcdef-0123\nverify: 0\n";
        let credentials = Credentials::parse(text, "~/.cdsapirc").unwrap();

        assert_eq!(credentials.url, "https://cds.climate.copernicus.eu/api/v2");
        assert_eq!(credentials.key, "12345:abcdef-0123");
        assert_eq!(credentials.basic_auth(), Ok(("12345", "abcdef-0123")));
    }

    #[test]
    fn should_report_missing_key() {
        let result = Credentials::parse("url: https://example.org/api\n", "rc");

        assert_eq!(
            result,
            Err(CredentialsError::MissingField {
                field: "key",
                source_name: "rc".to_string()
            })
        );
    }

    #[test]
    fn should_reject_key_without_uid() {
        let credentials = Credentials {
            url: "https://example.org/api".to_string(),
            key: "abcdef".to_string(),
        };

        assert_eq!(credentials.basic_auth(), Err(CredentialsError::MalformedKey));
    }

    #[test]
    fn should_read_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".cdsapirc");
        std::fs::write(&path, "url: https://example.org/api\nkey: 1:secret\n").unwrap();

        let credentials = Credentials::from_file(&path).unwrap();
        assert_eq!(credentials.key, "1:secret");

        assert!(matches!(
            Credentials::from_file(&dir.path().join("missing")),
            Err(CredentialsError::MissingFile(_))
        ));
    }
}
