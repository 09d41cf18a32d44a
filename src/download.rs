//! Streams a finished retrieval result to disk.

use std::{
    fs::{self, File},
    io::Write,
    path::Path,
};

use anyhow::{Error, Result};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;

/// Downloads `url` to `file_path` with a byte progress bar.
///
/// The parent directory is created if missing. When `expected_length` is
/// known the bar is sized to it and a short download is an error.
pub async fn download_with_progress(
    client: &Client,
    url: &str,
    file_path: &Path,
    expected_length: Option<u64>,
) -> Result<u64, Error> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::msg(format!("Failed to download file: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::msg(format!(
            "Failed to download file: {}",
            response.status()
        )));
    }

    let total_size = expected_length.or(response.content_length()).unwrap_or(0);
    let progress_bar = create_byte_progress_bar(total_size, file_name(file_path));

    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(file_path)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| Error::msg(format!("Error reading chunk: {}", e)))?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress_bar.set_position(downloaded);
    }
    file.flush()?;

    if let Some(expected) = expected_length {
        if downloaded != expected {
            progress_bar.abandon_with_message("Download incomplete");
            return Err(Error::msg(format!(
                "Download incomplete: got {} of {} bytes",
                downloaded, expected
            )));
        }
    }
    progress_bar.finish_with_message(format!("Saved {}", file_name(file_path)));

    Ok(downloaded)
}

/// A bar sized in bytes, or a spinner when the size is unknown.
fn create_byte_progress_bar(total_size: u64, message: String) -> ProgressBar {
    if total_size == 0 {
        return crate::cli::create_spinner(message);
    }

    ProgressBar::new(total_size).with_message(message).with_style(
        ProgressStyle::with_template(
            "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {eta}",
        )
        .unwrap()
        .progress_chars("=> "),
    )
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn should_size_progress_bar_in_bytes() {
        let pb = create_byte_progress_bar(1000, "[ID0]u-1999.nc".to_string());
        pb.set_position(500);

        assert_eq!(pb.length(), Some(1000));
        assert_eq!(pb.position(), 500);
        pb.finish();
    }

    #[test]
    fn should_fall_back_to_spinner_without_size() {
        let pb = create_byte_progress_bar(0, "downloading".to_string());

        assert_eq!(pb.length(), None);
        pb.finish();
    }

    #[test]
    fn should_use_file_name_as_message() {
        let path = PathBuf::from("/data/era5/[ID01]u-2000.nc");
        assert_eq!(file_name(&path), "[ID01]u-2000.nc");
    }
}
