//! Raw dataset download

use crate::error::{HeartmlError, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

/// Canonical location of the raw heart disease CSV.
pub const DEFAULT_URL: &str =
    "https://raw.githubusercontent.com/sharmaroshan/Heart-UCI-Dataset/master/heart.csv";

/// Fetch `url` to `dest`, creating parent directories as needed.
pub fn fetch(url: &str, dest: impl AsRef<Path>) -> Result<PathBuf> {
    let dest = dest.as_ref();
    if let Some(parent) = dest.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let response = ureq::get(url)
        .call()
        .map_err(|e| HeartmlError::Data(format!("download failed: {e}")))?;

    let mut reader = response.into_reader();
    let mut file = File::create(dest)?;
    let bytes = io::copy(&mut reader, &mut file)?;

    tracing::info!(url = %url, dest = %dest.display(), bytes, "dataset downloaded");
    Ok(dest.to_path_buf())
}
