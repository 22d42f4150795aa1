//! Overlay entity types
//!
//! Field names follow the remote record layout: a flat structure with a
//! nested `style` object, camelCase keys and `type` for the overlay kind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::LOCAL_ID_PREFIX;

/// What an overlay renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    #[default]
    Text,
    Image,
}

impl OverlayKind {
    /// Size a fresh overlay of this kind starts with
    pub fn default_size(self) -> Size {
        match self {
            OverlayKind::Text => Size::new(200.0, 80.0),
            OverlayKind::Image => Size::new(150.0, 150.0),
        }
    }
}

/// Pixel offset from the container's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset by a pointer delta
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Overlay or container extent in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::new(200.0, 100.0)
    }
}

/// Visual style of an overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverlayStyle {
    pub font_size: f64,
    pub font_color: String,
    pub background_color: String,
    pub font_family: String,
    pub font_weight: String,
    pub opacity: f64,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font_size: 24.0,
            font_color: "#ffffff".to_string(),
            background_color: "transparent".to_string(),
            font_family: "Arial".to_string(),
            font_weight: "normal".to_string(),
            opacity: 1.0,
        }
    }
}

/// A positioned, styled widget rendered above the video surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overlay {
    pub id: String,

    #[serde(rename = "type", default)]
    pub kind: OverlayKind,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub position: Position,

    #[serde(default)]
    pub size: Size,

    #[serde(default)]
    pub style: OverlayStyle,

    #[serde(default = "default_visible")]
    pub visible: bool,

    #[serde(default = "default_z_index")]
    pub z_index: i32,

    #[serde(default = "Utc::now", deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,

    /// Monotonic per-entity counter bumped on every local mutation
    #[serde(default)]
    pub revision: u64,
}

fn default_visible() -> bool {
    true
}

fn default_z_index() -> i32 {
    1
}

impl Overlay {
    /// Whether this overlay carries a locally generated id
    pub fn is_local(&self) -> bool {
        is_local_id(&self.id)
    }

    /// Bottom-right corner of the bounding box
    pub fn far_corner(&self) -> Position {
        Position::new(
            self.position.x + self.size.width,
            self.position.y + self.size.height,
        )
    }
}

/// Generate a fresh provisional id
pub fn local_id() -> String {
    format!("{}{}", LOCAL_ID_PREFIX, uuid::Uuid::new_v4().simple())
}

/// Whether an id was generated locally
pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

/// Lenient timestamp parsing: RFC 3339, naive ISO 8601 (assumed UTC), or null
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        let Some(raw) = raw else {
            return Ok(Utc::now());
        };

        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }

        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
