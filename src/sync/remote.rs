//! Remote CRUD authority
//!
//! [`RemoteApi`] is the seam the sync engine persists through. [`HttpRemote`]
//! talks to the REST endpoints; tests substitute in-memory fakes.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::RemoteConfig;
use crate::error::SyncError;
use crate::overlay::model::Overlay;
use crate::protocol::{ApiResponse, OverlayPatch, Settings, SettingsPatch};

/// Operations the remote authority offers
#[async_trait]
pub trait RemoteApi: Send + Sync + 'static {
    async fn list_overlays(&self) -> Result<Vec<Overlay>, SyncError>;

    async fn get_overlay(&self, id: &str) -> Result<Overlay, SyncError>;

    /// Persist a new overlay; the returned record carries the authoritative id
    async fn create_overlay(&self, overlay: &Overlay) -> Result<Overlay, SyncError>;

    async fn update_overlay(&self, id: &str, patch: &OverlayPatch) -> Result<Overlay, SyncError>;

    async fn delete_overlay(&self, id: &str) -> Result<(), SyncError>;

    async fn get_settings(&self) -> Result<Settings, SyncError>;

    async fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings, SyncError>;

    async fn health(&self) -> Result<(), SyncError>;
}

/// REST client for the overlay API
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(config: &RemoteConfig) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Read the envelope whatever the status; the API reports failures in it
    async fn envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<ApiResponse<T>, SyncError> {
        let status = response.status();
        let body = response.bytes().await?;

        match serde_json::from_slice::<ApiResponse<T>>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(e) if status.is_success() => Err(SyncError::Decode(e.to_string())),
            Err(_) => Err(SyncError::Status {
                status: status.as_u16(),
                message: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }
}

#[async_trait]
impl RemoteApi for HttpRemote {
    async fn list_overlays(&self) -> Result<Vec<Overlay>, SyncError> {
        let response = self.client.get(self.url("/overlays")).send().await?;
        Self::envelope(response).await?.into_data()
    }

    async fn get_overlay(&self, id: &str) -> Result<Overlay, SyncError> {
        let response = self
            .client
            .get(self.url(&format!("/overlays/{}", id)))
            .send()
            .await?;
        Self::envelope(response).await?.into_data()
    }

    async fn create_overlay(&self, overlay: &Overlay) -> Result<Overlay, SyncError> {
        let response = self
            .client
            .post(self.url("/overlays"))
            .json(overlay)
            .send()
            .await?;
        Self::envelope(response).await?.into_data()
    }

    async fn update_overlay(&self, id: &str, patch: &OverlayPatch) -> Result<Overlay, SyncError> {
        let response = self
            .client
            .put(self.url(&format!("/overlays/{}", id)))
            .json(patch)
            .send()
            .await?;
        Self::envelope(response).await?.into_data()
    }

    async fn delete_overlay(&self, id: &str) -> Result<(), SyncError> {
        let response = self
            .client
            .delete(self.url(&format!("/overlays/{}", id)))
            .send()
            .await?;
        Self::envelope::<serde_json::Value>(response).await?.into_ack()
    }

    async fn get_settings(&self) -> Result<Settings, SyncError> {
        let response = self.client.get(self.url("/settings")).send().await?;
        Self::envelope::<Settings>(response)
            .await?
            .into_data()
            .map(Settings::normalized)
    }

    async fn update_settings(&self, patch: &SettingsPatch) -> Result<Settings, SyncError> {
        let response = self
            .client
            .put(self.url("/settings"))
            .json(patch)
            .send()
            .await?;
        Self::envelope::<Settings>(response)
            .await?
            .into_data()
            .map(Settings::normalized)
    }

    async fn health(&self) -> Result<(), SyncError> {
        let response = self.client.get(self.url("/health")).send().await?;
        Self::envelope::<serde_json::Value>(response).await?.into_ack()
    }
}
