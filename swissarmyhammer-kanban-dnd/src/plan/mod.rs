//! Move planning.
//!
//! Planners are pure: they read a snapshot of the siblings involved and return the
//! ordering fields to write. Nothing is mutated until the plan reaches the
//! [`coordinator`](crate::coordinator).
//!
//! Every item planner reduces a drop to a *simulated sequence*: the final order of the
//! target container, with each slot marked as stationary (keeps its key) or moving (needs a
//! new key). [`assign_keys`] then allocates keys for the moving slots between their nearest
//! stationary neighbors, rebalancing the container once if the key space runs out.

mod batch;
mod column;
mod single;

pub use batch::plan_batch_move;
pub use column::{
    plan_container_move, plan_container_reorder, reorder_container_ids, ContainerReorderPlan,
    PositionUpdate,
};
pub use single::plan_single_move;

use crate::allocator::KeyAllocator;
use crate::error::{DndError, Result};
use crate::types::{ContainerId, Item, ItemId, OrderKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

/// New ordering fields for one moved item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMove {
    pub item_id: ItemId,
    pub from_container: ContainerId,
    pub to_container: ContainerId,
    pub old_key: Option<OrderKey>,
    pub new_key: OrderKey,
}

/// Key rewrite of a container member produced by a rebalance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyWrite {
    pub item_id: ItemId,
    pub container_id: ContainerId,
    pub old_key: Option<OrderKey>,
    pub new_key: OrderKey,
}

/// Everything needed to move one or more items into a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMovePlan {
    pub target_container: ContainerId,
    pub moves: Vec<ItemMove>,
    /// Rebalanced siblings; empty unless the key space ran out
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rebalanced: Vec<KeyWrite>,
}

impl ItemMovePlan {
    /// Ids of every item the plan writes
    pub fn touched_items(&self) -> impl Iterator<Item = &ItemId> {
        self.rebalanced
            .iter()
            .map(|w| &w.item_id)
            .chain(self.moves.iter().map(|m| &m.item_id))
    }
}

/// A computed drop, ready for optimistic apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "plan", rename_all = "snake_case")]
pub enum MovePlan {
    /// One card moved; any persistence failure rolls the whole plan back
    Single(ItemMovePlan),
    /// Several cards moved together; failures roll back per card
    Batch(ItemMovePlan),
    /// Lists reordered; positions are written as one batch
    Containers(ContainerReorderPlan),
}

impl MovePlan {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Single(_) => "single",
            Self::Batch(_) => "batch",
            Self::Containers(_) => "containers",
        }
    }
}

/// One entry of a simulated sequence
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot<'a> {
    pub item: &'a Item,
    pub moving: bool,
}

impl<'a> Slot<'a> {
    pub fn stationary(item: &'a Item) -> Self {
        Self {
            item,
            moving: false,
        }
    }

    pub fn moving(item: &'a Item) -> Self {
        Self { item, moving: true }
    }
}

/// Keys produced for a simulated sequence
#[derive(Debug, Default)]
pub(crate) struct KeyAssignment {
    /// New key per moving slot, in sequence order
    pub moved: Vec<(ItemId, OrderKey)>,
    pub rebalanced: Vec<KeyWrite>,
}

impl KeyAssignment {
    pub fn key_for(&self, id: &ItemId) -> Option<OrderKey> {
        self.moved.iter().find(|(i, _)| i == id).map(|(_, k)| *k)
    }
}

/// Allocate keys for every moving slot of `sequence`.
///
/// `current` is the container's order before the drop, including any moving items that
/// already live there. On key-space exhaustion every item of `current` is respaced evenly
/// in that order, and allocation is retried exactly once against the respaced keys. A
/// second exhaustion is `RebalanceExhausted`.
///
/// Moving items that live in the container are respaced with the rest, so the rebalance
/// writes on their own never change the container's order.
pub(crate) fn assign_keys(
    allocator: &KeyAllocator,
    container_id: &ContainerId,
    current: &[Item],
    sequence: &[Slot<'_>],
) -> Result<KeyAssignment> {
    let keys: Vec<Option<OrderKey>> = sequence
        .iter()
        .map(|s| if s.moving { None } else { s.item.order_key })
        .collect();

    let err = match allocate_moving(allocator, sequence, &keys) {
        Ok(moved) => {
            return Ok(KeyAssignment {
                moved,
                rebalanced: Vec::new(),
            })
        }
        Err(e) if e.is_retryable() => e,
        Err(e) => return Err(e),
    };

    debug!(container = %container_id, error = %err, "rebalancing container");
    let fresh = allocator.rebalanced(current.len())?;
    let mut respaced: HashMap<&ItemId, OrderKey> = HashMap::with_capacity(current.len());
    let mut rebalanced = Vec::new();
    for (item, &new_key) in current.iter().zip(&fresh) {
        respaced.insert(&item.id, new_key);
        if item.order_key != Some(new_key) {
            rebalanced.push(KeyWrite {
                item_id: item.id.clone(),
                container_id: container_id.clone(),
                old_key: item.order_key,
                new_key,
            });
        }
    }

    let keys = sequence
        .iter()
        .map(|s| {
            if s.moving {
                return Ok(None);
            }
            respaced
                .get(&s.item.id)
                .map(|k| Some(*k))
                .ok_or_else(|| DndError::stale("item", &s.item.id))
        })
        .collect::<Result<Vec<_>>>()?;

    let moved = allocate_moving(allocator, sequence, &keys).map_err(|e| {
        if e.is_retryable() {
            DndError::RebalanceExhausted {
                container: container_id.clone(),
            }
        } else {
            e
        }
    })?;
    debug!(
        container = %container_id,
        rewritten = rebalanced.len(),
        "rebalance succeeded"
    );
    Ok(KeyAssignment { moved, rebalanced })
}

/// One allocation per moving slot, bounded by the nearest stationary slot on each side.
///
/// Moving neighbors have no final key yet, so the walk skips past them. A run of moving
/// slots that shares the same boundaries is spread evenly between them by rank.
fn allocate_moving(
    allocator: &KeyAllocator,
    sequence: &[Slot<'_>],
    keys: &[Option<OrderKey>],
) -> Result<Vec<(ItemId, OrderKey)>> {
    let mut moved = Vec::new();
    for (index, slot) in sequence.iter().enumerate() {
        if !slot.moving {
            continue;
        }
        let prev = (0..index).rev().find(|&i| !sequence[i].moving);
        let next = (index + 1..sequence.len()).find(|&i| !sequence[i].moving);

        let run_start = prev.map_or(0, |p| p + 1);
        let run_end = next.unwrap_or(sequence.len());
        let rank = index - run_start + 1;
        let run_len = run_end - run_start;

        let upper = next.and_then(|n| keys[n]);
        let lower = match prev {
            None => None,
            Some(p) => match keys[p] {
                Some(key) => Some(key),
                // Unkeyed items sort last, so nothing fits above an unkeyed neighbor
                // until the container has been given keys.
                None => return Err(DndError::KeySpaceExhausted { lower: None, upper }),
            },
        };

        let key = allocator.allocate_nth(lower, upper, rank, run_len)?;
        trace!(
            item = %slot.item.id,
            ?lower,
            ?upper,
            rank,
            run_len,
            key = %key,
            "allocated key"
        );
        moved.push((slot.item.id.clone(), key));
    }
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, key: Option<i64>) -> Item {
        Item::new(id, "todo", key.map(OrderKey::new))
    }

    #[test]
    fn test_assign_between_stationary() {
        let a = item("a", Some(10));
        let m = item("m", Some(99));
        let b = item("b", Some(20));
        let seq = [Slot::stationary(&a), Slot::moving(&m), Slot::stationary(&b)];

        let current = [a.clone(), b.clone()];
        let assignment =
            assign_keys(&KeyAllocator::default(), &"todo".into(), &current, &seq).unwrap();
        assert_eq!(assignment.key_for(&"m".into()), Some(OrderKey::new(15)));
        assert!(assignment.rebalanced.is_empty());
    }

    #[test]
    fn test_moving_run_never_uses_moving_keys() {
        let a = item("a", Some(10));
        let m1 = item("m1", Some(1_000));
        let m2 = item("m2", Some(2_000));
        let m3 = item("m3", Some(3_000));
        let b = item("b", Some(20));
        let seq = [
            Slot::stationary(&a),
            Slot::moving(&m1),
            Slot::moving(&m2),
            Slot::moving(&m3),
            Slot::stationary(&b),
        ];

        let current = [a.clone(), b.clone()];
        let assignment =
            assign_keys(&KeyAllocator::default(), &"todo".into(), &current, &seq).unwrap();
        let keys: Vec<i64> = assignment.moved.iter().map(|(_, k)| k.value()).collect();
        assert_eq!(keys, vec![12, 15, 17]);
    }

    #[test]
    fn test_exhaustion_rebalances_once() {
        let a = item("a", Some(10));
        let m = item("m", None);
        let b = item("b", Some(11));
        let seq = [Slot::stationary(&a), Slot::moving(&m), Slot::stationary(&b)];

        let current = [a.clone(), b.clone()];
        let assignment =
            assign_keys(&KeyAllocator::default(), &"todo".into(), &current, &seq).unwrap();
        assert_eq!(assignment.rebalanced.len(), 2);
        assert_eq!(assignment.rebalanced[0].new_key, OrderKey::new(1_000));
        assert_eq!(assignment.rebalanced[1].new_key, OrderKey::new(2_000));
        assert_eq!(assignment.key_for(&"m".into()), Some(OrderKey::new(1_500)));
    }

    #[test]
    fn test_unkeyed_lower_neighbor_materializes_keys() {
        let a = item("a", Some(10));
        let u = item("u", None);
        let m = item("m", Some(5));
        let seq = [Slot::stationary(&a), Slot::stationary(&u), Slot::moving(&m)];

        let current = [a.clone(), u.clone()];
        let assignment =
            assign_keys(&KeyAllocator::default(), &"todo".into(), &current, &seq).unwrap();
        let rewritten: Vec<&str> = assignment
            .rebalanced
            .iter()
            .map(|w| w.item_id.as_str())
            .collect();
        assert_eq!(rewritten, vec!["a", "u"]);
        assert_eq!(assignment.key_for(&"m".into()), Some(OrderKey::new(3_000)));
    }

    #[test]
    fn test_unkeyed_upper_neighbor_is_open() {
        let m = item("m", Some(5));
        let u = item("u", None);
        let seq = [Slot::moving(&m), Slot::stationary(&u)];

        let current = [u.clone()];
        let assignment =
            assign_keys(&KeyAllocator::default(), &"todo".into(), &current, &seq).unwrap();
        assert_eq!(assignment.key_for(&"m".into()), Some(OrderKey::new(1_000_000)));
        assert!(assignment.rebalanced.is_empty());
    }

    #[test]
    fn test_second_exhaustion_is_fatal() {
        // Spacing 2 leaves room for one key between rebalanced neighbors, not three.
        let allocator = KeyAllocator::new(
            &crate::config::OrderingConfig::default().with_rebalance_spacing(2),
        )
        .unwrap();
        let a = item("a", Some(10));
        let m1 = item("m1", None);
        let m2 = item("m2", None);
        let m3 = item("m3", None);
        let b = item("b", Some(11));
        let seq = [
            Slot::stationary(&a),
            Slot::moving(&m1),
            Slot::moving(&m2),
            Slot::moving(&m3),
            Slot::stationary(&b),
        ];

        let current = [a.clone(), b.clone()];
        let err = assign_keys(&allocator, &"todo".into(), &current, &seq).unwrap_err();
        assert!(matches!(err, DndError::RebalanceExhausted { .. }));
    }

    #[test]
    fn test_rebalance_respaces_moving_items_in_current_order() {
        let x = item("x", Some(10));
        let y = item("y", Some(11));
        let z = item("z", Some(30));
        let current = [x.clone(), y.clone(), z.clone()];
        let seq = [Slot::stationary(&x), Slot::moving(&z), Slot::stationary(&y)];

        let assignment =
            assign_keys(&KeyAllocator::default(), &"todo".into(), &current, &seq).unwrap();
        let rewritten: Vec<(&str, i64)> = assignment
            .rebalanced
            .iter()
            .map(|w| (w.item_id.as_str(), w.new_key.value()))
            .collect();
        assert_eq!(rewritten, vec![("x", 1_000), ("y", 2_000), ("z", 3_000)]);
        assert_eq!(assignment.key_for(&"z".into()), Some(OrderKey::new(1_500)));
    }
}
