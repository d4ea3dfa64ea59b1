use crate::config::ManifestConfig;
use crate::{Error, ManifestDocument, Result};
use std::time::Duration;
use tracing::{debug, warn};

/// Fetches the launcher manifest with a bounded number of attempts
pub struct ManifestClient {
    url: String,
    client: reqwest::blocking::Client,
    max_attempts: u32,
}

impl ManifestClient {
    pub fn new(url: impl Into<String>, timeout: Duration, max_attempts: u32) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hypdl/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            url: url.into(),
            client,
            max_attempts: max_attempts.max(1),
        })
    }

    pub fn from_config(config: &ManifestConfig) -> Result<Self> {
        Self::new(config.url.clone(), config.timeout(), config.max_attempts)
    }

    /// Fetch and parse the manifest
    ///
    /// Any failure (transport, timeout, non-2xx status, unparseable body) is
    /// logged and retried immediately. Returns
    /// [`Error::ManifestUnavailable`] once every attempt has failed; deciding
    /// whether that ends the program is left to the caller.
    pub fn fetch(&self) -> Result<ManifestDocument> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            debug!(url = %self.url, attempt, "fetching manifest");

            match self.fetch_once() {
                Ok(manifest) => {
                    debug!(games = manifest.games.len(), "manifest fetched");
                    return Ok(manifest);
                }
                Err(e) => {
                    warn!(
                        "Manifest request failed (attempt {}/{}): {}",
                        attempt, self.max_attempts, e
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(Error::ManifestUnavailable {
            attempts: self.max_attempts,
            last_error,
        })
    }

    fn fetch_once(&self) -> Result<ManifestDocument> {
        let response = self.client.get(&self.url).send().map_err(|e| {
            if e.is_timeout() {
                Error::Other("Manifest request timed out".to_string())
            } else if e.is_connect() {
                Error::Other(format!("Cannot connect to {}: {}", self.url, e))
            } else {
                Error::Other(format!("Failed to fetch manifest: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Other(format!(
                "Manifest server returned HTTP {}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .map_err(|e| Error::Other(format!("Failed to read manifest body: {}", e)))?;

        ManifestDocument::from_json(&body)
    }
}
