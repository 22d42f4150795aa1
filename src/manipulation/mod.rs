//! Gesture-to-geometry manipulation
//!
//! Turns pointer press / move / release sequences into selection changes,
//! drags and resizes. Gestures are modal: while one is active the pointer is
//! captured and no second gesture can start.
//!
//! Drags only move a transient position while the pointer is down and commit
//! once on release. Resizes commit every frame.

use serde::Serialize;

use crate::error::GestureError;
use crate::overlay::geometry::{clamp_position, resize_from_corner};
use crate::overlay::model::{Position, Size};
use crate::overlay::store::OverlayMutations;
use crate::protocol::OverlayPatch;

pub use crate::overlay::geometry::Corner;

/// Intermediate result of a pointer move
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GestureFrame {
    /// Where the dragged overlay should be drawn; not yet committed
    Drag { id: String, position: Position },
    /// Geometry just committed to the store
    Resize {
        id: String,
        position: Position,
        size: Size,
    },
}

/// What a completed gesture did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GestureOutcome {
    Selected { id: String },
    Moved { id: String, position: Position },
    Resized {
        id: String,
        position: Position,
        size: Size,
    },
    /// The target disappeared mid-gesture; nothing was committed
    Abandoned { id: String },
}

#[derive(Debug, Clone)]
enum Gesture {
    /// Pointer down on the body, not moved yet
    Pressed {
        id: String,
        origin: Position,
        start: Position,
        size: Size,
    },
    Dragging {
        id: String,
        origin: Position,
        start: Position,
        size: Size,
        transient: Position,
    },
    Resizing {
        id: String,
        corner: Corner,
        origin: Position,
        start_position: Position,
        start_size: Size,
    },
}

impl Gesture {
    fn target(&self) -> &str {
        match self {
            Gesture::Pressed { id, .. }
            | Gesture::Dragging { id, .. }
            | Gesture::Resizing { id, .. } => id,
        }
    }
}

/// Pointer gesture state machine for the overlay layer
#[derive(Debug)]
pub struct ManipulationController {
    container: Size,
    active: Option<Gesture>,
}

impl ManipulationController {
    pub fn new(container: Size) -> Self {
        Self {
            container,
            active: None,
        }
    }

    /// Container bounds that drags are clamped to
    pub fn container(&self) -> Size {
        self.container
    }

    pub fn set_container(&mut self, container: Size) {
        self.container = container;
    }

    /// Overlay currently captured by a gesture
    pub fn active_target(&self) -> Option<&str> {
        self.active.as_ref().map(Gesture::target)
    }

    /// Uncommitted on-screen position of the overlay being dragged
    pub fn transient_position(&self) -> Option<(&str, Position)> {
        match &self.active {
            Some(Gesture::Dragging { id, transient, .. }) => Some((id.as_str(), *transient)),
            _ => None,
        }
    }

    /// Whether `id`'s geometry is owned by a live gesture
    pub fn is_locked(&self, id: &str) -> bool {
        self.active_target() == Some(id)
    }

    /// Strip geometry from an edit that would race a live gesture
    pub fn guard_patch(&self, id: &str, patch: OverlayPatch) -> OverlayPatch {
        if self.is_locked(id) && patch.touches_geometry() {
            tracing::debug!("Ignoring geometry edit on {} during active gesture", id);
            patch.without_geometry()
        } else {
            patch
        }
    }

    /// Resize handles exposed on `id`: all four corners when selected, none otherwise
    pub fn handles<M: OverlayMutations>(&self, overlays: &M, id: &str) -> &'static [Corner] {
        if overlays.selected_id().as_deref() == Some(id) {
            &Corner::ALL
        } else {
            &[]
        }
    }

    fn ensure_idle(&self) -> Result<(), GestureError> {
        match self.active_target() {
            Some(id) => Err(GestureError::Busy(id.to_string())),
            None => Ok(()),
        }
    }

    /// Pointer down on an overlay's body
    pub fn press<M: OverlayMutations>(
        &mut self,
        overlays: &M,
        id: &str,
        pointer: Position,
    ) -> Result<(), GestureError> {
        self.ensure_idle()?;
        let overlay = overlays
            .overlay(id)
            .ok_or_else(|| GestureError::UnknownOverlay(id.to_string()))?;

        self.active = Some(Gesture::Pressed {
            id: overlay.id,
            origin: pointer,
            start: overlay.position,
            size: overlay.size,
        });
        Ok(())
    }

    /// Pointer down on one of the selected overlay's corner handles
    pub fn press_handle<M: OverlayMutations>(
        &mut self,
        overlays: &M,
        id: &str,
        corner: Corner,
        pointer: Position,
    ) -> Result<(), GestureError> {
        self.ensure_idle()?;
        let overlay = overlays
            .overlay(id)
            .ok_or_else(|| GestureError::UnknownOverlay(id.to_string()))?;
        if overlays.selected_id().as_deref() != Some(id) {
            return Err(GestureError::HandleUnavailable(id.to_string()));
        }

        self.active = Some(Gesture::Resizing {
            id: overlay.id,
            corner,
            origin: pointer,
            start_position: overlay.position,
            start_size: overlay.size,
        });
        Ok(())
    }

    /// Pointer moved while captured. Returns `None` when no gesture is live
    /// or the pointer has not left its press point.
    pub fn pointer_move<M: OverlayMutations>(
        &mut self,
        overlays: &M,
        pointer: Position,
    ) -> Option<GestureFrame> {
        let gesture = self.active.take()?;

        match gesture {
            Gesture::Pressed {
                id,
                origin,
                start,
                size,
            } => {
                if pointer == origin {
                    self.active = Some(Gesture::Pressed {
                        id,
                        origin,
                        start,
                        size,
                    });
                    return None;
                }
                let transient = self.drag_target(start, size, origin, pointer);
                self.active = Some(Gesture::Dragging {
                    id: id.clone(),
                    origin,
                    start,
                    size,
                    transient,
                });
                Some(GestureFrame::Drag {
                    id,
                    position: transient,
                })
            }
            Gesture::Dragging {
                id,
                origin,
                start,
                size,
                ..
            } => {
                let transient = self.drag_target(start, size, origin, pointer);
                self.active = Some(Gesture::Dragging {
                    id: id.clone(),
                    origin,
                    start,
                    size,
                    transient,
                });
                Some(GestureFrame::Drag {
                    id,
                    position: transient,
                })
            }
            Gesture::Resizing {
                id,
                corner,
                origin,
                start_position,
                start_size,
            } => {
                let (position, size) = resize_from_corner(
                    start_position,
                    start_size,
                    corner,
                    pointer.x - origin.x,
                    pointer.y - origin.y,
                );
                if overlays
                    .update(&id, OverlayPatch::geometry(position, size))
                    .is_none()
                {
                    tracing::debug!("Resize target {} vanished; releasing capture", id);
                    return None;
                }
                self.active = Some(Gesture::Resizing {
                    id: id.clone(),
                    corner,
                    origin,
                    start_position,
                    start_size,
                });
                Some(GestureFrame::Resize { id, position, size })
            }
        }
    }

    /// Pointer released: commit and end the gesture
    pub fn release<M: OverlayMutations>(
        &mut self,
        overlays: &M,
        pointer: Position,
    ) -> Result<GestureOutcome, GestureError> {
        let gesture = self.active.take().ok_or(GestureError::NoActiveGesture)?;

        let outcome = match gesture {
            Gesture::Pressed { id, origin, .. } if pointer == origin => {
                if overlays.select(Some(id.as_str())) {
                    GestureOutcome::Selected { id }
                } else {
                    GestureOutcome::Abandoned { id }
                }
            }
            Gesture::Pressed {
                id,
                origin,
                start,
                size,
            }
            | Gesture::Dragging {
                id,
                origin,
                start,
                size,
                ..
            } => {
                let position = self.drag_target(start, size, origin, pointer);
                match overlays.update(&id, OverlayPatch::position(position)) {
                    Some(_) => GestureOutcome::Moved { id, position },
                    None => GestureOutcome::Abandoned { id },
                }
            }
            Gesture::Resizing {
                id,
                corner,
                origin,
                start_position,
                start_size,
            } => {
                let (position, size) = resize_from_corner(
                    start_position,
                    start_size,
                    corner,
                    pointer.x - origin.x,
                    pointer.y - origin.y,
                );
                match overlays.update(&id, OverlayPatch::geometry(position, size)) {
                    Some(_) => GestureOutcome::Resized { id, position, size },
                    None => GestureOutcome::Abandoned { id },
                }
            }
        };

        tracing::debug!("Gesture finished: {:?}", outcome);
        Ok(outcome)
    }

    /// Pointer capture lost. A drag in progress is discarded; resize frames
    /// already committed stay.
    pub fn cancel(&mut self) -> Option<String> {
        self.active.take().map(|g| g.target().to_string())
    }

    fn drag_target(&self, start: Position, size: Size, origin: Position, pointer: Position) -> Position {
        clamp_position(
            start.translated(pointer.x - origin.x, pointer.y - origin.y),
            size,
            self.container,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::store::{OverlayStore, StoreEvent};
    use crate::protocol::OverlayDraft;

    fn setup() -> (OverlayStore, String, ManipulationController) {
        let store = OverlayStore::new();
        let id = store.add(OverlayDraft::text("Hello")).unwrap();
        store.select(None);
        (store, id, ManipulationController::new(Size::new(640.0, 360.0)))
    }

    #[test]
    fn test_press_release_without_move_selects() {
        let (store, id, mut ctl) = setup();
        let at = Position::new(60.0, 60.0);

        ctl.press(&store, &id, at).unwrap();
        assert!(ctl.pointer_move(&store, at).is_none());
        let outcome = ctl.release(&store, at).unwrap();

        assert_eq!(outcome, GestureOutcome::Selected { id: id.clone() });
        assert_eq!(store.selected_id(), Some(id.clone()));
        assert_eq!(store.get(&id).unwrap().revision, 0);
    }

    #[test]
    fn test_drag_commits_once_at_release() {
        let (store, id, mut ctl) = setup();
        let mut rx = store.subscribe();

        ctl.press(&store, &id, Position::new(60.0, 60.0)).unwrap();
        for step in 1..=5 {
            let frame = ctl
                .pointer_move(&store, Position::new(60.0 + step as f64 * 10.0, 60.0))
                .unwrap();
            assert!(matches!(frame, GestureFrame::Drag { .. }));
        }
        // Nothing committed mid-drag
        assert_eq!(store.get(&id).unwrap().position, Position::new(50.0, 50.0));
        assert_eq!(
            ctl.transient_position(),
            Some((id.as_str(), Position::new(100.0, 50.0)))
        );
        assert!(rx.try_recv().is_err());

        let outcome = ctl.release(&store, Position::new(110.0, 70.0)).unwrap();
        assert_eq!(
            outcome,
            GestureOutcome::Moved {
                id: id.clone(),
                position: Position::new(100.0, 60.0)
            }
        );
        assert_eq!(store.get(&id).unwrap().revision, 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            StoreEvent::Updated { id, revision: 1 }
        );
    }

    #[test]
    fn test_drag_saturates_to_container() {
        let (store, id, mut ctl) = setup();

        ctl.press(&store, &id, Position::new(60.0, 60.0)).unwrap();
        ctl.pointer_move(&store, Position::new(2000.0, -500.0));
        ctl.release(&store, Position::new(2000.0, -500.0)).unwrap();

        // 640 - 200 wide, clamped to the top edge
        assert_eq!(store.get(&id).unwrap().position, Position::new(440.0, 0.0));
    }

    #[test]
    fn test_resize_commits_every_frame_and_clamps() {
        let (store, id, mut ctl) = setup();
        store.select(Some(id.as_str()));
        assert_eq!(ctl.handles(&store, &id).len(), 4);

        // Start at the south-east corner: (250, 130)
        ctl.press_handle(&store, &id, Corner::Se, Position::new(250.0, 130.0))
            .unwrap();

        ctl.pointer_move(&store, Position::new(260.0, 130.0));
        assert_eq!(store.get(&id).unwrap().size, Size::new(210.0, 80.0));

        ctl.pointer_move(&store, Position::new(90.0, 130.0));
        // width 200 - 160 = 40, saturated
        assert_eq!(store.get(&id).unwrap().size.width, 50.0);
        assert_eq!(store.get(&id).unwrap().revision, 2);

        let outcome = ctl.release(&store, Position::new(90.0, 130.0)).unwrap();
        assert!(matches!(outcome, GestureOutcome::Resized { size, .. } if size.width == 50.0));
    }

    #[test]
    fn test_handles_only_on_selected() {
        let (store, id, mut ctl) = setup();
        assert!(ctl.handles(&store, &id).is_empty());
        assert_eq!(
            ctl.press_handle(&store, &id, Corner::Nw, Position::new(50.0, 50.0)),
            Err(GestureError::HandleUnavailable(id.clone()))
        );
    }

    #[test]
    fn test_gestures_are_modal() {
        let (store, id, mut ctl) = setup();
        let other = store.add(OverlayDraft::text("Other")).unwrap();

        ctl.press(&store, &id, Position::new(60.0, 60.0)).unwrap();
        assert_eq!(
            ctl.press(&store, &other, Position::new(60.0, 60.0)),
            Err(GestureError::Busy(id.clone()))
        );

        let patch = ctl.guard_patch(&id, OverlayPatch::position(Position::new(0.0, 0.0)));
        assert!(!patch.touches_geometry());
        let patch = ctl.guard_patch(&other, OverlayPatch::position(Position::new(0.0, 0.0)));
        assert!(patch.touches_geometry());

        assert_eq!(ctl.cancel(), Some(id));
        assert!(ctl.active_target().is_none());
    }

    #[test]
    fn test_release_without_gesture() {
        let (store, _, mut ctl) = setup();
        assert_eq!(
            ctl.release(&store, Position::new(0.0, 0.0)),
            Err(GestureError::NoActiveGesture)
        );
    }

    #[test]
    fn test_target_removed_mid_drag() {
        let (store, id, mut ctl) = setup();
        ctl.press(&store, &id, Position::new(60.0, 60.0)).unwrap();
        ctl.pointer_move(&store, Position::new(80.0, 60.0));
        store.remove(&id);
        assert_eq!(
            ctl.release(&store, Position::new(90.0, 60.0)).unwrap(),
            GestureOutcome::Abandoned { id }
        );
    }

    #[test]
    fn test_resize_from_origin_stays_inside_container() {
        let store = OverlayStore::new();
        let id = store
            .add(
                OverlayDraft::text("Corner")
                    .at(Position::new(0.0, 0.0))
                    .sized(Size::new(200.0, 80.0)),
            )
            .unwrap();
        store.select(Some(id.as_str()));
        let mut ctl = ManipulationController::new(Size::new(640.0, 360.0));

        ctl.press_handle(&store, &id, Corner::Nw, Position::new(0.0, 0.0))
            .unwrap();
        ctl.pointer_move(&store, Position::new(-100.0, -40.0));
        ctl.release(&store, Position::new(-100.0, -40.0)).unwrap();

        let overlay = store.get(&id).unwrap();
        assert_eq!(overlay.position, Position::new(0.0, 0.0));
        assert_eq!(overlay.size, Size::new(200.0, 80.0));
        assert_eq!(overlay.far_corner(), Position::new(200.0, 80.0));
    }
}
