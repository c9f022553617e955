//! List (column) reordering

use crate::error::{DndError, Result};
use crate::types::{Container, ContainerId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// New position for one container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub container_id: ContainerId,
    pub new_position: usize,
}

/// Dense position reassignment for every container on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerReorderPlan {
    /// The container that was dragged
    pub moved: ContainerId,
    pub updates: Vec<PositionUpdate>,
}

impl ContainerReorderPlan {
    pub fn container_ids(&self) -> impl Iterator<Item = &ContainerId> {
        self.updates.iter().map(|u| &u.container_id)
    }
}

/// Assign positions `0..n-1` to `ordered_ids` in the given order
pub fn plan_container_reorder(ordered_ids: &[ContainerId]) -> Result<Vec<PositionUpdate>> {
    let mut seen = HashSet::with_capacity(ordered_ids.len());
    ordered_ids
        .iter()
        .enumerate()
        .map(|(new_position, id)| {
            if !seen.insert(id) {
                return Err(DndError::duplicate_id("container", id));
            }
            Ok(PositionUpdate {
                container_id: id.clone(),
                new_position,
            })
        })
        .collect()
}

/// Container order after dropping `moved` onto `over`.
///
/// `sorted` must be in board order. The moved container takes the index of `over`, clamped
/// into the run of containers sharing its status class, so the new positions agree with the
/// status-first sort. Returns `None` when the order would not change.
pub fn reorder_container_ids(
    sorted: &[Container],
    moved: &ContainerId,
    over: &ContainerId,
) -> Result<Option<Vec<ContainerId>>> {
    let from = sorted
        .iter()
        .position(|c| &c.id == moved)
        .ok_or_else(|| DndError::stale("container", moved))?;
    let to = sorted.iter().position(|c| &c.id == over).ok_or_else(|| {
        DndError::invalid_drop_target(format!("unknown container '{over}'"))
    })?;
    if from == to {
        return Ok(None);
    }

    let mut ids: Vec<ContainerId> = sorted.iter().map(|c| c.id.clone()).collect();
    let dragged = ids.remove(from);

    let rank = sorted[from].status.rank();
    let band_start = sorted.iter().filter(|c| c.status.rank() < rank).count();
    let band_len = sorted
        .iter()
        .filter(|c| c.status.rank() == rank && &c.id != moved)
        .count();
    let index = to.clamp(band_start, band_start + band_len);

    if index == from {
        debug!(container = %moved, "container drop clamped to its own index");
        return Ok(None);
    }
    ids.insert(index, dragged);
    Ok(Some(ids))
}

/// Plan dropping the `moved` container onto `over`
pub fn plan_container_move(
    sorted: &[Container],
    moved: &ContainerId,
    over: &ContainerId,
) -> Result<Option<ContainerReorderPlan>> {
    let Some(ordered) = reorder_container_ids(sorted, moved, over)? else {
        return Ok(None);
    };
    let updates = plan_container_reorder(&ordered)?;
    debug!(
        container = %moved,
        over = %over,
        count = updates.len(),
        "planned container reorder"
    );
    Ok(Some(ContainerReorderPlan {
        moved: moved.clone(),
        updates,
    }))
}
