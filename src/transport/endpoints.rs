use reqwest::Url;

use super::VersionId;
use crate::{RccError, Result, config::Conf};

const VERSION_PATH: &str = "api/v1/config/version";
const ITEMS_PATH: &str = "api/v1/config/items";

/// Builds request URLs for one project/environment binding.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: Url,
    project: String,
    env: String,
    version_name: String,
    token: String,
}

impl Endpoints {
    /// Creates the URL builder from a normalized configuration.
    ///
    /// # Errors
    /// Returns `RccError::InvalidConfig` if the server URL cannot serve as a base.
    pub fn new(conf: &Conf) -> Result<Self> {
        // A trailing slash makes `join` append instead of replacing the last segment.
        let base = Url::parse(&format!("{}/", conf.server_url.trim_end_matches('/')))
            .map_err(|e| RccError::invalid_config("server_url", e.to_string()))?;

        if base.cannot_be_a_base() {
            return Err(RccError::invalid_config(
                "server_url",
                "cannot be used as a base URL",
            ));
        }

        Ok(Self {
            base,
            project: conf.project_name.clone(),
            env: conf.env_name.clone(),
            version_name: conf.version_name.clone(),
            token: conf.api_password.clone(),
        })
    }

    /// URL answering the active version of the bound version line.
    pub fn version(&self) -> Url {
        let mut url = self.join(VERSION_PATH);
        url.query_pairs_mut()
            .append_pair("project", &self.project)
            .append_pair("env", &self.env)
            .append_pair("version", &self.version_name)
            .append_pair("token", &self.token);
        url
    }

    /// URL answering the key/value list of `version`.
    pub fn items(&self, version: VersionId) -> Url {
        let mut url = self.join(ITEMS_PATH);
        url.query_pairs_mut()
            .append_pair("project", &self.project)
            .append_pair("env", &self.env)
            .append_pair("versionId", &version.to_string())
            .append_pair("token", &self.token);
        url
    }

    fn join(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(path.split('/'));
        }
        url
    }
}

/// Renders a URL for logs and errors without its credential.
pub(crate) fn redact(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "token" { "***".into() } else { v };
            (k.into_owned(), v.into_owned())
        })
        .collect();

    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}
