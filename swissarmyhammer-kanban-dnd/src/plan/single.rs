//! Single-card moves

use super::{assign_keys, ItemMove, ItemMovePlan, Slot};
use crate::allocator::KeyAllocator;
use crate::drag::{DropTarget, Placement};
use crate::error::Result;
use crate::types::{ContainerId, Item};
use tracing::debug;

/// Plan moving one card to `target`.
///
/// `siblings` are the target container's items in display order; they may include the
/// dragged card itself when it is reordered within its own container. `origin` is the
/// container the card was picked up from.
///
/// Returns `None` when the drop would leave the card where it already is.
pub fn plan_single_move(
    allocator: &KeyAllocator,
    dragged: &Item,
    origin: &ContainerId,
    target: &DropTarget,
    siblings: &[Item],
) -> Result<Option<ItemMovePlan>> {
    let current_index = siblings.iter().position(|s| s.id == dragged.id);
    let same_container = origin == &target.container_id && current_index.is_some();
    let others: Vec<&Item> = siblings.iter().filter(|s| s.id != dragged.id).collect();

    let insert_at = match &target.placement {
        Placement::Start => 0,
        Placement::End => others.len(),
        Placement::Before(over) if over == &dragged.id => {
            debug!(item = %dragged.id, "dropped onto itself");
            return Ok(None);
        }
        Placement::Before(over) if same_container => {
            // Same-list reorder takes the target's index, matching the live preview:
            // moving down lands after the target, moving up lands before it.
            siblings
                .iter()
                .position(|s| &s.id == over)
                .unwrap_or(others.len())
        }
        Placement::Before(over) => others
            .iter()
            .position(|s| &s.id == over)
            .unwrap_or(others.len()),
    };

    if same_container && current_index == Some(insert_at) {
        debug!(item = %dragged.id, index = insert_at, "drop leaves card in place");
        return Ok(None);
    }

    let mut sequence: Vec<Slot<'_>> = others.iter().map(|s| Slot::stationary(s)).collect();
    sequence.insert(insert_at.min(sequence.len()), Slot::moving(dragged));

    let assignment = assign_keys(allocator, &target.container_id, siblings, &sequence)?;
    let new_key = assignment
        .key_for(&dragged.id)
        .ok_or_else(|| crate::error::DndError::stale("item", &dragged.id))?;

    debug!(
        item = %dragged.id,
        from = %origin,
        to = %target.container_id,
        index = insert_at,
        key = %new_key,
        "planned single move"
    );

    Ok(Some(ItemMovePlan {
        target_container: target.container_id.clone(),
        moves: vec![ItemMove {
            item_id: dragged.id.clone(),
            from_container: origin.clone(),
            to_container: target.container_id.clone(),
            old_key: dragged.order_key,
            new_key,
        }],
        rebalanced: assignment.rebalanced,
    }))
}
