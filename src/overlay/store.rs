//! Authoritative in-memory overlay collection
//!
//! The store owns every overlay and the single selection. Mutations apply
//! synchronously under a write lock and are observable as soon as the call
//! returns; subscribers additionally receive a [`StoreEvent`] per change.

use parking_lot::RwLock;
use std::collections::HashSet;
use tokio::sync::broadcast;

use crate::constants::STORE_EVENT_CAPACITY;
use crate::error::ValidationError;
use crate::overlay::geometry::{clamp_size, clamp_style};
use crate::overlay::model::{local_id, Overlay, OverlayStyle, Position};
use crate::protocol::{OverlayDraft, OverlayPatch, StylePatch};

/// Change notification emitted after a mutation is applied
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Added { id: String },
    Updated { id: String, revision: u64 },
    Removed { id: String },
    Reassigned { from: String, to: String },
    Replaced { count: usize },
    SelectionChanged { id: Option<String> },
}

/// Mutation surface shared by the store itself and anything layered over it.
///
/// The manipulation controller only ever talks to this trait, so it works the
/// same against a bare store and against a syncing wrapper.
pub trait OverlayMutations {
    /// Snapshot of one overlay
    fn overlay(&self, id: &str) -> Option<Overlay>;

    /// Currently selected overlay id
    fn selected_id(&self) -> Option<String>;

    /// Create an overlay and select it
    fn add(&self, draft: OverlayDraft) -> Result<String, ValidationError>;

    /// Merge a patch; returns the new revision, or `None` for an unknown id
    fn update(&self, id: &str, patch: OverlayPatch) -> Option<u64>;

    /// Delete an overlay, clearing the selection if it pointed at it
    fn remove(&self, id: &str) -> Option<Overlay>;

    /// Select an overlay, or clear the selection with `None`.
    ///
    /// Returns `false` when `id` does not name a live overlay; the selection
    /// is left unchanged in that case.
    fn select(&self, id: Option<&str>) -> bool;
}

#[derive(Default)]
struct StoreInner {
    /// Insertion order doubles as the default paint and list order
    overlays: Vec<Overlay>,
    selected: Option<String>,
    /// Overlays whose image resource failed to render
    failed_resources: HashSet<String>,
}

impl StoreInner {
    fn index_of(&self, id: &str) -> Option<usize> {
        self.overlays.iter().position(|o| o.id == id)
    }

    fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }
}

/// Overlay collection plus selection
pub struct OverlayStore {
    inner: RwLock<StoreInner>,
    events: broadcast::Sender<StoreEvent>,
}

impl OverlayStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(STORE_EVENT_CAPACITY);
        Self {
            inner: RwLock::new(StoreInner::default()),
            events,
        }
    }

    /// Receive change notifications from now on
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub fn get(&self, id: &str) -> Option<Overlay> {
        let inner = self.inner.read();
        inner.index_of(id).map(|i| inner.overlays[i].clone())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.read().contains(id)
    }

    /// All overlays in insertion order
    pub fn list(&self) -> Vec<Overlay> {
        self.inner.read().overlays.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.read().overlays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().overlays.is_empty()
    }

    pub fn selected(&self) -> Option<Overlay> {
        let inner = self.inner.read();
        let id = inner.selected.as_deref()?;
        inner.index_of(id).map(|i| inner.overlays[i].clone())
    }

    /// Overlays to paint, bottom to top.
    ///
    /// Hidden overlays and overlays whose image failed to load are left out;
    /// equal `zIndex` values keep insertion order.
    pub fn render_order(&self) -> Vec<Overlay> {
        let inner = self.inner.read();
        let mut visible: Vec<Overlay> = inner
            .overlays
            .iter()
            .filter(|o| o.visible && !inner.failed_resources.contains(&o.id))
            .cloned()
            .collect();
        visible.sort_by_key(|o| o.z_index);
        visible
    }

    /// Record that an overlay's image could not be rendered.
    ///
    /// The entity itself is untouched; it only drops out of the render order
    /// until its content changes.
    pub fn mark_resource_failed(&self, id: &str) -> bool {
        let mut inner = self.inner.write();
        if !inner.contains(id) {
            return false;
        }
        let inserted = inner.failed_resources.insert(id.to_string());
        if inserted {
            tracing::debug!("Overlay {} resource failed to load; hiding in place", id);
        }
        inserted
    }

    pub fn is_resource_failed(&self, id: &str) -> bool {
        self.inner.read().failed_resources.contains(id)
    }

    /// Swap a provisional id for the authoritative one.
    ///
    /// Selection follows the overlay. Fails when `from` is gone or `to` is
    /// already taken.
    pub fn reassign_id(&self, from: &str, to: &str) -> bool {
        let mut inner = self.inner.write();
        if inner.contains(to) {
            return false;
        }
        let Some(index) = inner.index_of(from) else {
            return false;
        };

        inner.overlays[index].id = to.to_string();
        if inner.selected.as_deref() == Some(from) {
            inner.selected = Some(to.to_string());
        }
        if inner.failed_resources.remove(from) {
            inner.failed_resources.insert(to.to_string());
        }
        drop(inner);

        self.emit(StoreEvent::Reassigned {
            from: from.to_string(),
            to: to.to_string(),
        });
        true
    }

    /// Replace the whole collection, discarding anything local-only.
    ///
    /// Duplicate ids keep their first occurrence. The selection survives only
    /// if it still names a live overlay.
    pub fn replace_all(&self, overlays: Vec<Overlay>) {
        let mut seen = HashSet::new();
        let overlays: Vec<Overlay> = overlays
            .into_iter()
            .filter(|o| seen.insert(o.id.clone()))
            .map(normalize)
            .collect();
        let count = overlays.len();

        let mut inner = self.inner.write();
        inner.overlays = overlays;
        let keep_selection = inner
            .selected
            .as_deref()
            .map(|id| inner.contains(id))
            .unwrap_or(false);
        let selection_cleared = !keep_selection && inner.selected.is_some();
        if !keep_selection {
            inner.selected = None;
        }
        inner.failed_resources.clear();
        drop(inner);

        self.emit(StoreEvent::Replaced { count });
        if selection_cleared {
            self.emit(StoreEvent::SelectionChanged { id: None });
        }
    }

    /// Overwrite one overlay with a fresher remote copy.
    ///
    /// Unknown ids are ignored; a reload never resurrects a deleted overlay.
    pub fn replace_one(&self, overlay: Overlay) -> bool {
        let overlay = normalize(overlay);
        let mut inner = self.inner.write();
        let Some(index) = inner.index_of(&overlay.id) else {
            return false;
        };

        let id = overlay.id.clone();
        let revision = overlay.revision;
        if inner.overlays[index].content != overlay.content {
            inner.failed_resources.remove(&id);
        }
        inner.overlays[index] = overlay;
        drop(inner);

        self.emit(StoreEvent::Updated { id, revision });
        true
    }
}

impl Default for OverlayStore {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayMutations for OverlayStore {
    fn overlay(&self, id: &str) -> Option<Overlay> {
        self.get(id)
    }

    fn selected_id(&self) -> Option<String> {
        self.inner.read().selected.clone()
    }

    fn add(&self, draft: OverlayDraft) -> Result<String, ValidationError> {
        let content = draft.content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyContent);
        }

        let mut inner = self.inner.write();
        let id = draft.id.clone().unwrap_or_else(local_id);
        if inner.contains(&id) {
            return Err(ValidationError::DuplicateId(id));
        }

        let mut style = OverlayStyle::default();
        if let Some(patch) = &draft.style {
            merge_style(&mut style, patch);
        }

        let overlay = normalize(Overlay {
            id: id.clone(),
            kind: draft.kind,
            content: content.to_string(),
            position: draft.position.unwrap_or(Position::new(50.0, 50.0)),
            size: draft.size.unwrap_or_else(|| draft.kind.default_size()),
            style,
            visible: draft.visible.unwrap_or(true),
            z_index: draft
                .z_index
                .unwrap_or(inner.overlays.len() as i32 + 1),
            created_at: chrono::Utc::now(),
            revision: 0,
        });

        inner.overlays.push(overlay);
        inner.selected = Some(id.clone());
        drop(inner);

        tracing::debug!("Added overlay {}", id);
        self.emit(StoreEvent::Added { id: id.clone() });
        self.emit(StoreEvent::SelectionChanged {
            id: Some(id.clone()),
        });
        Ok(id)
    }

    fn update(&self, id: &str, patch: OverlayPatch) -> Option<u64> {
        let mut inner = self.inner.write();
        let index = inner.index_of(id)?;

        if patch.is_empty() {
            return Some(inner.overlays[index].revision);
        }

        let content_changed = {
            let overlay = &mut inner.overlays[index];
            let before = overlay.content.clone();
            merge(overlay, patch);
            overlay.revision += 1;
            overlay.content != before
        };
        let revision = inner.overlays[index].revision;
        if content_changed {
            inner.failed_resources.remove(id);
        }
        drop(inner);

        self.emit(StoreEvent::Updated {
            id: id.to_string(),
            revision,
        });
        Some(revision)
    }

    fn remove(&self, id: &str) -> Option<Overlay> {
        let mut inner = self.inner.write();
        let index = inner.index_of(id)?;
        let removed = inner.overlays.remove(index);
        inner.failed_resources.remove(id);
        let was_selected = inner.selected.as_deref() == Some(id);
        if was_selected {
            inner.selected = None;
        }
        drop(inner);

        self.emit(StoreEvent::Removed { id: id.to_string() });
        if was_selected {
            self.emit(StoreEvent::SelectionChanged { id: None });
        }
        Some(removed)
    }

    fn select(&self, id: Option<&str>) -> bool {
        let mut inner = self.inner.write();
        match id {
            Some(id) if !inner.contains(id) => false,
            target => {
                let next = target.map(str::to_string);
                let changed = inner.selected != next;
                inner.selected = next.clone();
                drop(inner);
                if changed {
                    self.emit(StoreEvent::SelectionChanged { id: next });
                }
                true
            }
        }
    }
}

/// Enforce size and style invariants
fn normalize(mut overlay: Overlay) -> Overlay {
    overlay.size = clamp_size(overlay.size);
    clamp_style(&mut overlay.style);
    overlay
}

/// Shallow merge for top-level fields, key-by-key for style
fn merge(overlay: &mut Overlay, patch: OverlayPatch) {
    if let Some(kind) = patch.kind {
        overlay.kind = kind;
    }
    if let Some(content) = patch.content {
        overlay.content = content;
    }
    if let Some(position) = patch.position {
        overlay.position = position;
    }
    if let Some(size) = patch.size {
        overlay.size = clamp_size(size);
    }
    if let Some(style) = &patch.style {
        merge_style(&mut overlay.style, style);
        clamp_style(&mut overlay.style);
    }
    if let Some(visible) = patch.visible {
        overlay.visible = visible;
    }
    if let Some(z_index) = patch.z_index {
        overlay.z_index = z_index;
    }
}

fn merge_style(style: &mut OverlayStyle, patch: &StylePatch) {
    if let Some(font_size) = patch.font_size {
        style.font_size = font_size;
    }
    if let Some(color) = &patch.font_color {
        style.font_color = color.clone();
    }
    if let Some(color) = &patch.background_color {
        style.background_color = color.clone();
    }
    if let Some(family) = &patch.font_family {
        style.font_family = family.clone();
    }
    if let Some(weight) = &patch.font_weight {
        style.font_weight = weight.clone();
    }
    if let Some(opacity) = patch.opacity {
        style.opacity = opacity;
    }
}
