//! Package registry access (PyPI JSON API)

use crate::{PackageConfig, PackageError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

/// Project metadata as served by `{index}/{name}/json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Summary of the latest release
    pub info: ProjectInfo,

    /// Files of every release, keyed by version text
    #[serde(default)]
    pub releases: BTreeMap<String, Vec<ReleaseFile>>,
}

/// The `info` block of the project document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Canonical project name
    #[serde(default)]
    pub name: String,

    /// Latest version
    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// One downloadable artifact of a release
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseFile {
    /// File name (`requests-2.31.0-py3-none-any.whl`)
    #[serde(default)]
    pub filename: String,

    /// Download URL
    #[serde(default)]
    pub url: String,

    /// `bdist_wheel` or `sdist`
    #[serde(default)]
    pub packagetype: String,

    /// Published digests
    #[serde(default)]
    pub digests: Digests,

    /// Yanked files are skipped when choosing a release
    #[serde(default)]
    pub yanked: bool,

    /// Size in bytes
    #[serde(default)]
    pub size: u64,
}

/// Digests published for an artifact
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Digests {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl ReleaseFile {
    pub fn is_wheel(&self) -> bool {
        self.packagetype == "bdist_wheel" || self.filename.ends_with(".whl")
    }

    /// Wheel usable on any platform (`py3-none-any`)
    pub fn is_pure_wheel(&self) -> bool {
        self.is_wheel() && self.filename.ends_with("-none-any.whl")
    }
}

/// Registry trait so the acquirer can be exercised without a network
#[cfg_attr(test, mockall::automock)]
pub trait Registry: Send + Sync {
    /// Get project metadata
    fn project(&self, name: &str) -> Result<ProjectMetadata>;

    /// Download an artifact into memory
    fn download(&self, url: &str) -> Result<Vec<u8>>;
}

/// HTTP client for a PyPI-compatible JSON API
pub struct PypiRegistry {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl PypiRegistry {
    /// Create a client for `base_url` (e.g. `https://pypi.org/pypi`)
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("pretty-mod/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PackageError::Network {
                url: base_url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self { base_url, client })
    }

    pub fn from_config(config: &PackageConfig) -> Result<Self> {
        Self::new(config.index_url.clone(), config.timeout())
    }

    fn project_url(&self, name: &str) -> String {
        format!("{}/{}/json", self.base_url, name)
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response> {
        debug!("GET {}", url);
        self.client
            .get(url)
            .send()
            .map_err(|e| network_error(url, &e))
    }
}

fn network_error(url: &str, err: &reqwest::Error) -> PackageError {
    let message = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    PackageError::Network {
        url: url.to_string(),
        message,
    }
}

impl Registry for PypiRegistry {
    fn project(&self, name: &str) -> Result<ProjectMetadata> {
        let url = self.project_url(name);
        let response = self.get(&url)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PackageError::PackageNotFound {
                name: name.to_string(),
            });
        }
        if !status.is_success() {
            return Err(PackageError::Network {
                url,
                message: format!("HTTP {}", status),
            });
        }

        let body = response.text().map_err(|e| network_error(&url, &e))?;
        serde_json::from_str(&body).map_err(|e| PackageError::InvalidResponse {
            url,
            message: e.to_string(),
        })
    }

    fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url)?;
        let status = response.status();
        if !status.is_success() {
            return Err(PackageError::Network {
                url: url.to_string(),
                message: format!("HTTP {}", status),
            });
        }
        let bytes = response.bytes().map_err(|e| network_error(url, &e))?;
        debug!("downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}
