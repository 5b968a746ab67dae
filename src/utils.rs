use std::path::{Path, PathBuf};
use crate::errors::Result;
use log::info;

/// Sanitizes a filename by removing invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Creates a directory if it doesn't exist
pub async fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        tokio::fs::create_dir_all(path).await?;
        info!("Created directory: {:?}", path);
    }
    Ok(())
}

/// Generates a unique ID for jobs and temp files
pub fn generate_download_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// `<dir>/<stem>_<uuid>.<ext>`, so concurrent requests never share a file.
pub fn unique_output_path(dir: &Path, stem: &str, ext: &str) -> PathBuf {
    let stem = sanitize_filename(stem.trim());
    let stem = if stem.is_empty() { "media".to_string() } else { stem };
    dir.join(format!("{}_{}.{}", stem, uuid::Uuid::new_v4().simple(), ext))
}

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Renders seconds as `m:ss`.
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
