//! Blocking HTTP GET shared by the adapters.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{Client, Response};

use crate::error::AppError;

const USER_AGENT: &str = concat!("covid-at/", env!("CARGO_PKG_VERSION"));

pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// GET `url` and return the body as text.
    pub fn get_text(&self, url: &str) -> Result<String, AppError> {
        self.get(url)?
            .text()
            .map_err(|e| AppError::fetch(format!("Failed to read response from {url}: {e}")))
    }

    /// GET `url` and store the body at `dest`, replacing any previous copy.
    pub fn download(&self, url: &str, dest: &Path) -> Result<(), AppError> {
        let bytes = self
            .get(url)?
            .bytes()
            .map_err(|e| AppError::fetch(format!("Failed to read response from {url}: {e}")))?;
        fs::write(dest, &bytes)
            .map_err(|e| AppError::io(format!("Failed to write '{}': {e}", dest.display())))?;
        log::info!("Downloaded {url} ({} bytes) to '{}'.", bytes.len(), dest.display());
        Ok(())
    }

    fn get(&self, url: &str) -> Result<Response, AppError> {
        let resp = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::fetch(format!("Request to {url} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::fetch(format!(
                "Request to {url} failed with status {}.",
                resp.status()
            )));
        }
        Ok(resp)
    }
}
