use crate::errors::{AppError, Result};
use url::Url;
use std::path::{Component, Path};

pub struct InputValidator;

impl InputValidator {
    pub fn new() -> Self {
        Self
    }

    /// Parses an http(s) URL with a host. Used to tell links from free text.
    pub fn validate_url(&self, url: &str) -> Result<Url> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::Validation("URL cannot be empty".to_string()));
        }

        let parsed = Url::parse(url)
            .map_err(|e| AppError::Validation(format!("Invalid URL: {}", e)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!("Unsupported scheme: {}", parsed.scheme())));
        }

        if parsed.host_str().is_none() {
            return Err(AppError::Validation("URL must have a host".to_string()));
        }

        Ok(parsed)
    }

    /// Output files must be named, stay below their parent and carry no NUL bytes.
    pub fn validate_output_path(&self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(AppError::Validation("Output path cannot be empty".to_string()));
        }

        if path.components().any(|component| matches!(component, Component::ParentDir)) {
            return Err(AppError::Validation("Path traversal detected".to_string()));
        }

        if path.to_string_lossy().contains('\0') {
            return Err(AppError::Validation("Null bytes not allowed in file path".to_string()));
        }

        if path.file_name().is_none() {
            return Err(AppError::Validation("Output path has no file name".to_string()));
        }

        Ok(())
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new()
    }
}
