use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{
    Item, Requester, VersionId, VersionInfo,
    endpoints::{Endpoints, redact},
};
use crate::{RccError, Result, config::Conf};

/// [`Requester`] speaking JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRequester {
    http: Client,
    endpoints: Endpoints,
}

impl HttpRequester {
    /// Builds a requester for a normalized configuration.
    ///
    /// # Errors
    /// * `RccError::InvalidConfig` - If the server URL cannot be used
    /// * `RccError::Transport` - If the HTTP client cannot be initialized
    pub fn new(conf: &Conf) -> Result<Self> {
        let endpoints = Endpoints::new(conf)?;
        let http = Client::builder()
            .timeout(conf.request_timeout())
            .build()
            .map_err(|e| RccError::Transport {
                url: conf.server_url.clone(),
                details: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self { http, endpoints })
    }

    /// Uses an already configured `reqwest` client.
    pub fn with_client(http: Client, endpoints: Endpoints) -> Self {
        Self { http, endpoints }
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let shown = redact(&url);
        debug!(url = %shown, "GET");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| RccError::Transport {
                url: shown.clone(),
                details: e.without_url().to_string(),
            })?;

        response.json::<T>().await.map_err(|e| RccError::Decode {
            url: shown,
            details: e.without_url().to_string(),
        })
    }
}

#[async_trait]
impl Requester for HttpRequester {
    #[instrument(skip(self))]
    async fn active_version(&self) -> Result<VersionId> {
        let info: VersionInfo = self.get(self.endpoints.version()).await?;
        Ok(info.version_id)
    }

    #[instrument(skip(self))]
    async fn items(&self, version: VersionId) -> Result<Vec<Item>> {
        self.get(self.endpoints.items(version)).await
    }
}
