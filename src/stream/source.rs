//! Stream source classification

use serde::{Deserialize, Serialize};

/// How a source URL has to be played
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Adaptive-streaming manifest, needs a media engine
    Adaptive,
    /// Directly playable media resource
    Direct,
}

impl SourceKind {
    pub fn classify(url: &str) -> Self {
        if url.contains(".m3u8") {
            SourceKind::Adaptive
        } else {
            SourceKind::Direct
        }
    }
}

/// Trim a submitted URL; blank input yields `None`
pub fn normalize_url(raw: &str) -> Option<&str> {
    let url = raw.trim();
    (!url.is_empty()).then_some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            SourceKind::classify("https://test-streams.mux.dev/x36xhzz/x36xhzz.m3u8"),
            SourceKind::Adaptive
        );
        assert_eq!(
            SourceKind::classify("https://cdn.example.com/live.m3u8?token=abc"),
            SourceKind::Adaptive
        );
        assert_eq!(
            SourceKind::classify("https://cdn.example.com/clip.mp4"),
            SourceKind::Direct
        );
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("  http://a/b.mp4 \n"), Some("http://a/b.mp4"));
        assert_eq!(normalize_url("   "), None);
    }
}
