//! Multi-card moves

use super::{assign_keys, ItemMove, ItemMovePlan, Slot};
use crate::allocator::KeyAllocator;
use crate::drag::{DropTarget, Placement};
use crate::error::{DndError, Result};
use crate::types::{Item, ItemId};
use std::collections::HashSet;
use tracing::debug;

/// Plan moving several cards together to `target`, preserving their relative order.
///
/// `dragged` may come from any containers; each move records the container its item was in.
/// `siblings` are the target container's items in display order and may include dragged
/// cards that already live there.
///
/// The dragged cards are placed as one contiguous run. Each card gets its key from the
/// nearest stationary siblings around the run, so no key is ever derived from another card
/// that is still moving.
///
/// Returns `None` when the target container would end up in the order it already has.
pub fn plan_batch_move(
    allocator: &KeyAllocator,
    dragged: &[Item],
    target: &DropTarget,
    siblings: &[Item],
) -> Result<Option<ItemMovePlan>> {
    let mut moving: Vec<&Item> = dragged.iter().collect();
    moving.sort_by(|a, b| a.sort_cmp(b));

    let mut moving_ids: HashSet<&ItemId> = HashSet::with_capacity(moving.len());
    for item in &moving {
        if !moving_ids.insert(&item.id) {
            return Err(DndError::duplicate_id("item", &item.id));
        }
    }

    let stationary: Vec<&Item> = siblings
        .iter()
        .filter(|s| !moving_ids.contains(&s.id))
        .collect();

    let insert_at = match &target.placement {
        Placement::Start => 0,
        Placement::End => stationary.len(),
        // Dropping onto one of the moving cards appends the run.
        Placement::Before(over) => stationary
            .iter()
            .position(|s| &s.id == over)
            .unwrap_or(stationary.len()),
    };

    let mut sequence: Vec<Slot<'_>> = Vec::with_capacity(stationary.len() + moving.len());
    sequence.extend(stationary[..insert_at].iter().map(|s| Slot::stationary(s)));
    sequence.extend(moving.iter().map(|m| Slot::moving(m)));
    sequence.extend(stationary[insert_at..].iter().map(|s| Slot::stationary(s)));

    let all_in_target = moving
        .iter()
        .all(|m| m.container_id == target.container_id);
    let unchanged = sequence.len() == siblings.len()
        && sequence
            .iter()
            .zip(siblings)
            .all(|(slot, sibling)| slot.item.id == sibling.id);
    if all_in_target && unchanged {
        debug!(
            container = %target.container_id,
            count = moving.len(),
            "batch drop leaves order unchanged"
        );
        return Ok(None);
    }

    let assignment = assign_keys(allocator, &target.container_id, siblings, &sequence)?;
    let moves = moving
        .iter()
        .map(|item| -> Result<ItemMove> {
            let new_key = assignment
                .key_for(&item.id)
                .ok_or_else(|| DndError::stale("item", &item.id))?;
            Ok(ItemMove {
                item_id: item.id.clone(),
                from_container: item.container_id.clone(),
                to_container: target.container_id.clone(),
                old_key: item.order_key,
                new_key,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        container = %target.container_id,
        count = moves.len(),
        index = insert_at,
        rebalanced = assignment.rebalanced.len(),
        "planned batch move"
    );

    Ok(Some(ItemMovePlan {
        target_container: target.container_id.clone(),
        moves,
        rebalanced: assignment.rebalanced,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderKey;

    fn item(id: &str, container: &str, key: i64) -> Item {
        Item::new(id, container, Some(OrderKey::new(key)))
    }

    fn keys(plan: &ItemMovePlan) -> Vec<(String, i64)> {
        plan.moves
            .iter()
            .map(|m| (m.item_id.to_string(), m.new_key.value()))
            .collect()
    }

    #[test]
    fn test_selection_to_end_of_other_container() {
        let dragged = vec![item("thirty", "a", 30), item("ten", "a", 10)];
        let siblings = vec![item("five", "b", 5)];

        let plan = plan_batch_move(
            &KeyAllocator::default(),
            &dragged,
            &DropTarget::end("b"),
            &siblings,
        )
        .unwrap()
        .unwrap();

        let keys = keys(&plan);
        assert_eq!(keys[0].0, "ten");
        assert_eq!(keys[1].0, "thirty");
        assert!(keys[0].1 > 5);
        assert!(keys[0].1 < keys[1].1);
        assert!(plan.moves.iter().all(|m| m.from_container.as_str() == "a"));
    }

    #[test]
    fn test_run_between_stationary_neighbors() {
        let dragged = vec![item("m1", "a", 1), item("m2", "a", 2)];
        let siblings = vec![item("x", "b", 100), item("y", "b", 200)];

        let plan = plan_batch_move(
            &KeyAllocator::default(),
            &dragged,
            &DropTarget::before("b", "y"),
            &siblings,
        )
        .unwrap()
        .unwrap();

        assert_eq!(
            keys(&plan),
            vec![("m1".to_string(), 133), ("m2".to_string(), 166)]
        );
    }

    #[test]
    fn test_drop_onto_moving_card_appends() {
        let siblings = vec![item("p", "a", 10), item("q", "a", 20), item("r", "a", 30)];
        let dragged = vec![siblings[0].clone(), siblings[1].clone()];

        let plan = plan_batch_move(
            &KeyAllocator::default(),
            &dragged,
            &DropTarget::before("a", "q"),
            &siblings,
        )
        .unwrap()
        .unwrap();

        // [r, p, q]
        assert_eq!(
            keys(&plan),
            vec![("p".to_string(), 1_030), ("q".to_string(), 2_030)]
        );
    }

    #[test]
    fn test_unchanged_order_is_noop() {
        let siblings = vec![item("p", "a", 10), item("q", "a", 20), item("r", "a", 30)];
        let dragged = vec![siblings[1].clone(), siblings[2].clone()];

        let plan = plan_batch_move(
            &KeyAllocator::default(),
            &dragged,
            &DropTarget::end("a"),
            &siblings,
        )
        .unwrap();
        assert!(plan.is_none());
    }

    #[test]
    fn test_gathering_scattered_cards_is_not_noop() {
        let siblings = vec![item("p", "a", 10), item("q", "a", 20), item("r", "a", 30)];
        let dragged = vec![siblings[0].clone(), siblings[2].clone()];

        let plan = plan_batch_move(
            &KeyAllocator::default(),
            &dragged,
            &DropTarget::start("a"),
            &siblings,
        )
        .unwrap()
        .unwrap();

        // [p, r, q]: both keys land below q.
        assert!(plan.moves.iter().all(|m| m.new_key < OrderKey::new(20)));
        assert!(plan.moves[0].new_key < plan.moves[1].new_key);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let dragged = vec![item("p", "a", 10), item("p", "a", 10)];
        let err = plan_batch_move(&KeyAllocator::default(), &dragged, &DropTarget::end("b"), &[])
            .unwrap_err();
        assert!(matches!(err, DndError::DuplicateId { .. }));
    }

    #[test]
    fn test_run_too_large_for_gap_rebalances() {
        let dragged = vec![item("m1", "a", 1), item("m2", "a", 2), item("m3", "a", 3)];
        let siblings = vec![item("x", "b", 10), item("y", "b", 12)];

        let plan = plan_batch_move(
            &KeyAllocator::default(),
            &dragged,
            &DropTarget::before("b", "y"),
            &siblings,
        )
        .unwrap()
        .unwrap();

        assert_eq!(plan.rebalanced.len(), 2);
        assert_eq!(
            keys(&plan),
            vec![
                ("m1".to_string(), 1_250),
                ("m2".to_string(), 1_500),
                ("m3".to_string(), 1_750)
            ]
        );
    }

    #[test]
    fn test_rebalance_covers_dragged_cards_in_target() {
        let siblings = vec![item("p", "a", 10), item("q", "a", 11), item("r", "a", 12)];
        let dragged = vec![siblings[2].clone(), item("s", "b", 5)];

        let plan = plan_batch_move(
            &KeyAllocator::default(),
            &dragged,
            &DropTarget::before("a", "q"),
            &siblings,
        )
        .unwrap()
        .unwrap();

        let rewritten: Vec<&str> = plan.rebalanced.iter().map(|w| w.item_id.as_str()).collect();
        assert_eq!(rewritten, vec!["p", "q", "r"]);
        // [p, s, r, q]
        assert_eq!(
            keys(&plan),
            vec![("s".to_string(), 1_333), ("r".to_string(), 1_666)]
        );
    }
}
