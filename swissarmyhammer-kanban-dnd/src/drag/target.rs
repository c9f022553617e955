//! Drop target classification

use crate::error::{DndError, Result};
use crate::types::{ContainerId, ItemId};
use crate::working_set::WorkingSet;
use serde::{Deserialize, Serialize};

/// What the pointer is over, as reported by the gesture layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum OverTarget {
    /// A list header
    ContainerHeader(ContainerId),
    /// Another task card
    Item(ItemId),
    /// Empty space inside a list
    ContainerSurface(ContainerId),
}

/// Where in the target container the dragged items land
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "at", content = "item", rename_all = "snake_case")]
pub enum Placement {
    /// Beginning of the list
    Start,
    /// Immediately before the given sibling
    Before(ItemId),
    /// End of the list
    End,
}

/// A classified drop target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropTarget {
    pub container_id: ContainerId,
    pub placement: Placement,
}

impl DropTarget {
    pub fn start(container_id: impl Into<ContainerId>) -> Self {
        Self {
            container_id: container_id.into(),
            placement: Placement::Start,
        }
    }

    pub fn before(container_id: impl Into<ContainerId>, item_id: impl Into<ItemId>) -> Self {
        Self {
            container_id: container_id.into(),
            placement: Placement::Before(item_id.into()),
        }
    }

    pub fn end(container_id: impl Into<ContainerId>) -> Self {
        Self {
            container_id: container_id.into(),
            placement: Placement::End,
        }
    }

    /// Classify a pointer target against the working set.
    ///
    /// Header drops land at the start, item drops before that item, surface drops at the
    /// end. Targets whose container or item is unknown are `InvalidDropTarget`.
    pub fn classify(over: &OverTarget, working_set: &WorkingSet) -> Result<Self> {
        let target = match over {
            OverTarget::ContainerHeader(id) => Self::start(id.clone()),
            OverTarget::ContainerSurface(id) => Self::end(id.clone()),
            OverTarget::Item(id) => {
                let item = working_set.item(id).ok_or_else(|| {
                    DndError::invalid_drop_target(format!("unknown item '{id}'"))
                })?;
                Self::before(item.container_id.clone(), id.clone())
            }
        };

        if !working_set.has_container(&target.container_id) {
            return Err(DndError::invalid_drop_target(format!(
                "unknown container '{}'",
                target.container_id
            )));
        }
        Ok(target)
    }
}
