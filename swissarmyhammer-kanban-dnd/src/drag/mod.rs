//! Drag lifecycle state machine.
//!
//! ```text
//! Idle --pick up--> Dragging --hover--> Dragging --drop/cancel--> Idle
//! ```
//!
//! The machine only tracks the gesture. It never touches persisted data: hover events
//! update the preview, and the drop hands the finished [`DragSession`] to the planners.

mod target;

pub use target::{DropTarget, OverTarget, Placement};

use crate::types::{ContainerId, ItemId};
use crate::working_set::WorkingSet;
use serde::Serialize;
use tracing::{debug, trace};

/// What is being dragged
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DragSubject {
    /// One or more task cards. `active` is the card under the pointer.
    Items { active: ItemId, ids: Vec<ItemId> },
    /// A whole list
    Container { id: ContainerId },
}

/// State of an in-progress drag. Created on pick-up, dropped on resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DragSession {
    /// Container the subject was picked up from. Fixed for the whole session.
    pub origin_container_id: ContainerId,
    pub subject: DragSubject,
    pub hover_container_id: Option<ContainerId>,
    /// Live insertion point for rendering
    pub preview: Option<DropTarget>,
    /// Last pointer target, used to suppress redundant hover updates
    #[serde(skip)]
    last_target: Option<OverTarget>,
}

impl DragSession {
    /// Session for dragging cards out of `origin`
    pub fn for_items(origin: ContainerId, active: ItemId, ids: Vec<ItemId>) -> Self {
        let ids = if ids.is_empty() {
            vec![active.clone()]
        } else {
            ids
        };
        Self {
            hover_container_id: Some(origin.clone()),
            origin_container_id: origin,
            subject: DragSubject::Items { active, ids },
            preview: None,
            last_target: None,
        }
    }

    /// Session for dragging a list
    pub fn for_container(id: ContainerId) -> Self {
        Self {
            origin_container_id: id.clone(),
            hover_container_id: Some(id.clone()),
            subject: DragSubject::Container { id },
            preview: None,
            last_target: None,
        }
    }

    /// Ids of the dragged cards (empty for list drags)
    pub fn dragged_item_ids(&self) -> &[ItemId] {
        match &self.subject {
            DragSubject::Items { ids, .. } => ids,
            DragSubject::Container { .. } => &[],
        }
    }

    /// Whether several cards move together
    pub fn is_batch(&self) -> bool {
        self.dragged_item_ids().len() > 1
    }
}

/// Machine state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// Result of feeding a hover event to the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverChange {
    /// Hover container or preview changed
    Updated,
    /// Same target as last time; nothing recomputed
    Unchanged,
    /// Pointer left every target; preview cleared
    Cleared,
    /// Not dragging, or the target could not be resolved
    Ignored,
}

/// The drag state machine
#[derive(Debug, Clone, Default)]
pub struct DragMachine {
    state: DragState,
}

impl DragMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.state {
            DragState::Dragging(session) => Some(session),
            DragState::Idle => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Idle -> Dragging. A session still in progress is abandoned.
    pub fn pick_up(&mut self, session: DragSession) {
        if let DragState::Dragging(previous) = &self.state {
            debug!(origin = %previous.origin_container_id, "abandoning unfinished drag");
        }
        debug!(
            origin = %session.origin_container_id,
            dragged = session.dragged_item_ids().len(),
            "drag picked up"
        );
        self.state = DragState::Dragging(session);
    }

    /// Dragging -> Dragging. Recomputes the hover container and preview from the pointer
    /// target alone. Reports `Unchanged` when the target resolves to the preview already
    /// shown.
    pub fn hover(&mut self, over: Option<&OverTarget>, working_set: &WorkingSet) -> HoverChange {
        let DragState::Dragging(session) = &mut self.state else {
            return HoverChange::Ignored;
        };

        let Some(over) = over else {
            if session.last_target.is_none() && session.preview.is_none() {
                return HoverChange::Unchanged;
            }
            session.last_target = None;
            session.hover_container_id = None;
            session.preview = None;
            trace!("hover cleared");
            return HoverChange::Cleared;
        };

        let target = match DropTarget::classify(over, working_set) {
            Ok(target) => target,
            Err(e) => {
                trace!(error = %e, "hover target ignored");
                return HoverChange::Ignored;
            }
        };
        if !working_set.has_container(&session.origin_container_id) {
            trace!(origin = %session.origin_container_id, "origin container vanished");
            return HoverChange::Ignored;
        }
        // The same pointer target resolves elsewhere once a realtime update moves the card.
        if session.last_target.as_ref() == Some(over)
            && session.preview.as_ref() == Some(&target)
        {
            return HoverChange::Unchanged;
        }

        trace!(container = %target.container_id, placement = ?target.placement, "hover");
        session.hover_container_id = Some(target.container_id.clone());
        session.preview = Some(target);
        session.last_target = Some(over.clone());
        HoverChange::Updated
    }

    /// Dragging -> Idle on drop. Returns the finished session, if there was one.
    pub fn finish(&mut self) -> Option<DragSession> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging(session) => Some(session),
            DragState::Idle => None,
        }
    }

    /// Dragging -> Idle without a drop. Returns whether a drag was in progress.
    pub fn cancel(&mut self) -> bool {
        let was_dragging = self.finish().is_some();
        if was_dragging {
            debug!("drag cancelled");
        }
        was_dragging
    }
}
