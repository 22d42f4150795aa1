//! Headless media stack
//!
//! Without a real video surface the studio still validates sources: the
//! probe engine fetches the manifest and reports whether it parses, and the
//! headless element only records what it was asked to do.

use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::PlaybackError;
use crate::stream::engine::{
    AttachmentId, EngineEvent, EngineEventSender, EngineFactory, MediaElement, MediaEngine,
};

/// Marker every playlist manifest starts with
const MANIFEST_TAG: &str = "#EXTM3U";

pub struct ManifestProbeFactory {
    client: reqwest::Client,
}

impl ManifestProbeFactory {
    pub fn new(timeout: Duration) -> Result<Self, PlaybackError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PlaybackError::AttachFailed(e.to_string()))?;
        Ok(Self { client })
    }
}

impl EngineFactory for ManifestProbeFactory {
    fn create(&self, id: AttachmentId, events: EngineEventSender) -> Option<Box<dyn MediaEngine>> {
        Some(Box::new(ManifestProbeEngine {
            id,
            client: self.client.clone(),
            events,
            task: None,
        }))
    }
}

/// Engine that loads and checks an adaptive manifest
pub struct ManifestProbeEngine {
    id: AttachmentId,
    client: reqwest::Client,
    events: EngineEventSender,
    task: Option<JoinHandle<()>>,
}

impl MediaEngine for ManifestProbeEngine {
    fn load(&mut self, url: &str, element: &mut dyn MediaElement) -> Result<(), PlaybackError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| PlaybackError::AttachFailed("no async runtime".to_string()))?;

        element.set_source(url);

        let id = self.id;
        let client = self.client.clone();
        let events = self.events.clone();
        let url = url.to_string();
        self.task = Some(runtime.spawn(async move {
            let event = match probe_manifest(&client, &url).await {
                Ok(()) => EngineEvent::ManifestParsed,
                Err(detail) => EngineEvent::Error {
                    fatal: true,
                    detail,
                },
            };
            // Receiver gone means the session is already torn down
            let _ = events.send((id, event));
        }));
        Ok(())
    }

    fn destroy(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn probe_manifest(client: &reqwest::Client, url: &str) -> Result<(), String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| format!("networkError: {}", e))?;
    if !response.status().is_success() {
        return Err(format!("networkError: HTTP {}", response.status()));
    }
    let body = response
        .text()
        .await
        .map_err(|e| format!("networkError: {}", e))?;
    check_manifest(&body)
}

fn check_manifest(body: &str) -> Result<(), String> {
    if body.trim_start_matches('\u{feff}').trim_start().starts_with(MANIFEST_TAG) {
        Ok(())
    } else {
        Err("mediaError: not a playlist manifest".to_string())
    }
}

/// Element with no output; state changes are only logged
#[derive(Debug)]
pub struct HeadlessElement {
    source: Option<String>,
    volume: f32,
    playing: bool,
}

impl HeadlessElement {
    pub fn new() -> Self {
        Self {
            source: None,
            volume: crate::constants::DEFAULT_VOLUME,
            playing: false,
        }
    }
}

impl Default for HeadlessElement {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaElement for HeadlessElement {
    fn set_source(&mut self, url: &str) {
        self.source = Some(url.to_string());
        self.playing = false;
    }

    fn clear_source(&mut self) {
        self.source = None;
        self.playing = false;
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        if self.source.is_none() {
            return Err(PlaybackError::PlayRejected("no source".to_string()));
        }
        self.playing = true;
        tracing::info!("Playing {}", self.source.as_deref().unwrap_or_default());
        Ok(())
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        tracing::debug!("Element volume {:.2}", volume);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_manifest() {
        assert!(check_manifest("#EXTM3U\n#EXT-X-VERSION:3\n").is_ok());
        assert!(check_manifest("\u{feff}#EXTM3U\n").is_ok());
        assert!(check_manifest("<html>404</html>").is_err());
    }

    #[test]
    fn test_headless_element_refuses_play_without_source() {
        let mut element = HeadlessElement::new();
        assert!(element.play().is_err());
        element.set_source("https://a.example/clip.mp4");
        assert!(element.play().is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_manifest_reports_fatal() {
        let factory = ManifestProbeFactory::new(Duration::from_secs(2)).unwrap();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut engine = factory.create(AttachmentId(7), tx).unwrap();
        let mut element = HeadlessElement::new();

        engine
            .load("http://127.0.0.1:1/live.m3u8", &mut element)
            .unwrap();

        let (id, event) = rx.recv().await.unwrap();
        assert_eq!(id, AttachmentId(7));
        assert!(matches!(event, EngineEvent::Error { fatal: true, .. }));
        engine.destroy();
    }
}
