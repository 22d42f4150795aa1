//! Wire types shared by the remote client and the control API
//!
//! Every remote endpoint wraps its payload in the same envelope:
//! `{"success": bool, "data": ..., "error": "...", "message": "..."}`.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::overlay::model::{Overlay, OverlayKind, Position, Size};

/// API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
            message: None,
        }
    }

    /// Unwrap the payload of a successful response
    pub fn into_data(self) -> Result<T, SyncError> {
        if !self.success {
            return Err(self.rejection());
        }
        self.data
            .ok_or_else(|| SyncError::Decode("response carried no data".to_string()))
    }

    /// Check success without requiring a payload
    pub fn into_ack(self) -> Result<(), SyncError> {
        if self.success {
            Ok(())
        } else {
            Err(self.rejection())
        }
    }

    fn rejection(&self) -> SyncError {
        SyncError::Rejected(
            self.error
                .clone()
                .unwrap_or_else(|| "unspecified error".to_string()),
        )
    }
}

/// Partial style; only supplied keys change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
}

impl StylePatch {
    pub fn font_size(font_size: f64) -> Self {
        Self {
            font_size: Some(font_size),
            ..Self::default()
        }
    }

    pub fn opacity(opacity: f64) -> Self {
        Self {
            opacity: Some(opacity),
            ..Self::default()
        }
    }
}

/// Partial overlay update.
///
/// Top-level fields replace wholesale; `style` merges key by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<OverlayKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StylePatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    /// Revision the sender holds after applying this patch locally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<u64>,
}

impl OverlayPatch {
    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn geometry(position: Position, size: Size) -> Self {
        Self {
            position: Some(position),
            size: Some(size),
            ..Self::default()
        }
    }

    pub fn style(style: StylePatch) -> Self {
        Self {
            style: Some(style),
            ..Self::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn touches_geometry(&self) -> bool {
        self.position.is_some() || self.size.is_some()
    }

    /// Drop position and size, keeping every other field
    pub fn without_geometry(mut self) -> Self {
        self.position = None;
        self.size = None;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.content.is_none()
            && self.position.is_none()
            && self.size.is_none()
            && self.style.is_none()
            && self.visible.is_none()
            && self.z_index.is_none()
    }
}

impl From<&Overlay> for OverlayPatch {
    /// Full-state patch carrying every mutable field
    fn from(overlay: &Overlay) -> Self {
        let style = &overlay.style;
        Self {
            kind: Some(overlay.kind),
            content: Some(overlay.content.clone()),
            position: Some(overlay.position),
            size: Some(overlay.size),
            style: Some(StylePatch {
                font_size: Some(style.font_size),
                font_color: Some(style.font_color.clone()),
                background_color: Some(style.background_color.clone()),
                font_family: Some(style.font_family.clone()),
                font_weight: Some(style.font_weight.clone()),
                opacity: Some(style.opacity),
            }),
            visible: Some(overlay.visible),
            z_index: Some(overlay.z_index),
            revision: Some(overlay.revision),
        }
    }
}

/// Everything needed to create an overlay; unset fields take per-kind defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: OverlayKind,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StylePatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

impl OverlayDraft {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: OverlayKind::Text,
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self {
            kind: OverlayKind::Image,
            content: url.into(),
            ..Self::default()
        }
    }

    pub fn at(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn sized(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn styled(mut self, style: StylePatch) -> Self {
        self.style = Some(style);
        self
    }
}

/// Persisted player settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub stream_url: String,
    pub volume: f32,
    pub auto_play: bool,
    pub overlays_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stream_url: String::new(),
            volume: crate::constants::DEFAULT_VOLUME,
            auto_play: false,
            overlays_enabled: true,
        }
    }
}

impl Settings {
    /// Clamp volume into `[0, 1]`
    pub fn normalized(mut self) -> Self {
        self.volume = if self.volume.is_finite() {
            self.volume.clamp(0.0, 1.0)
        } else {
            crate::constants::DEFAULT_VOLUME
        };
        self
    }

    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(url) = patch.stream_url {
            self.stream_url = url;
        }
        if let Some(volume) = patch.volume {
            self.volume = volume;
        }
        if let Some(auto_play) = patch.auto_play {
            self.auto_play = auto_play;
        }
        if let Some(enabled) = patch.overlays_enabled {
            self.overlays_enabled = enabled;
        }
        *self = std::mem::take(self).normalized();
    }

    /// The fields named by `patch`, carrying this (normalized) settings' values
    pub fn echo(&self, patch: &SettingsPatch) -> SettingsPatch {
        SettingsPatch {
            stream_url: patch.stream_url.as_ref().map(|_| self.stream_url.clone()),
            volume: patch.volume.map(|_| self.volume),
            auto_play: patch.auto_play.map(|_| self.auto_play),
            overlays_enabled: patch.overlays_enabled.map(|_| self.overlays_enabled),
        }
    }
}

/// Partial settings update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_play: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlays_enabled: Option<bool>,
}
