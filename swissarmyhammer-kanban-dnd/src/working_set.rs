//! WorkingSet - the in-memory copy of a board's ordering fields
//!
//! The working set is what the UI renders. Moves mutate it optimistically and a
//! [`MoveSnapshot`] remembers the previous ordering fields until the store answers.
//! No planning logic lives here, just data access primitives.

use crate::error::{DndError, Result};
use crate::types::{BoardId, BoardSnapshot, Container, ContainerId, Item, ItemId, OrderKey};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Mutable board state owned by the UI thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingSet {
    board_id: BoardId,
    containers: IndexMap<ContainerId, Container>,
    items: IndexMap<ItemId, Item>,
}

impl WorkingSet {
    /// Seed from a store snapshot
    pub fn from_snapshot(snapshot: BoardSnapshot) -> Self {
        Self {
            board_id: snapshot.board_id,
            containers: snapshot
                .containers
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
            items: snapshot
                .items
                .into_iter()
                .map(|i| (i.id.clone(), i))
                .collect(),
        }
    }

    /// Copy the current state back out as a snapshot
    pub fn to_snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            board_id: self.board_id.clone(),
            containers: self.containers.values().cloned().collect(),
            items: self.items.values().cloned().collect(),
        }
    }

    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn container(&self, id: &ContainerId) -> Option<&Container> {
        self.containers.get(id)
    }

    pub fn has_container(&self, id: &ContainerId) -> bool {
        self.containers.contains_key(id)
    }

    /// Look up an item a plan depends on
    pub fn require_item(&self, id: &ItemId) -> Result<&Item> {
        self.items.get(id).ok_or_else(|| DndError::stale("item", id))
    }

    /// Look up a container a plan depends on
    pub fn require_container(&self, id: &ContainerId) -> Result<&Container> {
        self.containers
            .get(id)
            .ok_or_else(|| DndError::stale("container", id))
    }

    /// Items of a container in display order
    pub fn items_in(&self, container_id: &ContainerId) -> Vec<Item> {
        let mut items: Vec<Item> = self
            .items
            .values()
            .filter(|i| &i.container_id == container_id)
            .cloned()
            .collect();
        items.sort_by(Item::sort_cmp);
        items
    }

    /// All containers in board order
    pub fn sorted_containers(&self) -> Vec<Container> {
        let mut containers: Vec<Container> = self.containers.values().cloned().collect();
        containers.sort_by(Container::sort_cmp);
        containers
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Insert or replace an item (external CRUD and realtime updates)
    pub fn upsert_item(&mut self, item: Item) {
        self.items.insert(item.id.clone(), item);
    }

    pub fn remove_item(&mut self, id: &ItemId) -> Option<Item> {
        self.items.shift_remove(id)
    }

    /// Insert or replace a container (external CRUD and realtime updates)
    pub fn upsert_container(&mut self, container: Container) {
        self.containers.insert(container.id.clone(), container);
    }

    pub fn remove_container(&mut self, id: &ContainerId) -> Option<Container> {
        self.containers.shift_remove(id)
    }

    /// Write an item's ordering fields
    pub fn set_item_order(
        &mut self,
        id: &ItemId,
        container_id: &ContainerId,
        order_key: Option<OrderKey>,
    ) -> Result<()> {
        let item = self
            .items
            .get_mut(id)
            .ok_or_else(|| DndError::ItemNotFound { id: id.clone() })?;
        item.container_id = container_id.clone();
        item.order_key = order_key;
        Ok(())
    }

    /// Write a container's position
    pub fn set_container_position(&mut self, id: &ContainerId, position: usize) -> Result<()> {
        let container = self
            .containers
            .get_mut(id)
            .ok_or_else(|| DndError::ContainerNotFound { id: id.clone() })?;
        container.position = position;
        Ok(())
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    /// Capture the ordering fields of the given entities.
    ///
    /// Fails with `StaleReference` if any of them is missing.
    pub fn capture<'a>(
        &self,
        item_ids: impl IntoIterator<Item = &'a ItemId>,
        container_ids: impl IntoIterator<Item = &'a ContainerId>,
    ) -> Result<MoveSnapshot> {
        let mut snapshot = MoveSnapshot::default();
        let mut seen = HashSet::new();
        for id in item_ids {
            if !seen.insert(id) {
                continue;
            }
            let item = self.require_item(id)?;
            snapshot.items.push(ItemOrdering {
                id: item.id.clone(),
                container_id: item.container_id.clone(),
                order_key: item.order_key,
            });
        }
        for id in container_ids {
            let container = self.require_container(id)?;
            snapshot.containers.push(ContainerOrdering {
                id: container.id.clone(),
                position: container.position,
            });
        }
        Ok(snapshot)
    }

    /// Restore every entity in the snapshot.
    ///
    /// Entities removed from the working set since the capture are skipped.
    pub fn restore(&mut self, snapshot: &MoveSnapshot) {
        for ordering in &snapshot.items {
            self.restore_item(ordering);
        }
        for ordering in &snapshot.containers {
            if let Some(container) = self.containers.get_mut(&ordering.id) {
                container.position = ordering.position;
            }
        }
    }

    /// Restore only the listed items from the snapshot
    pub fn restore_items(&mut self, snapshot: &MoveSnapshot, ids: &HashSet<ItemId>) {
        for ordering in snapshot.items.iter().filter(|o| ids.contains(&o.id)) {
            self.restore_item(ordering);
        }
    }

    fn restore_item(&mut self, ordering: &ItemOrdering) {
        if let Some(item) = self.items.get_mut(&ordering.id) {
            item.container_id = ordering.container_id.clone();
            item.order_key = ordering.order_key;
        }
    }
}

/// Ordering fields of one item before a move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOrdering {
    pub id: ItemId,
    pub container_id: ContainerId,
    pub order_key: Option<OrderKey>,
}

/// Position of one container before a reorder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerOrdering {
    pub id: ContainerId,
    pub position: usize,
}

/// Pre-mutation copy of everything a plan touches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSnapshot {
    pub items: Vec<ItemOrdering>,
    pub containers: Vec<ContainerOrdering>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> WorkingSet {
        WorkingSet::from_snapshot(
            BoardSnapshot::new("board")
                .with_container(Container::new("todo", 0))
                .with_container(Container::new("done", 1))
                .with_item(Item::new("b", "todo", Some(OrderKey::new(20))))
                .with_item(Item::new("a", "todo", Some(OrderKey::new(10))))
                .with_item(Item::new("c", "done", None)),
        )
    }

    #[test]
    fn test_items_in_display_order() {
        let ws = board();
        let ids: Vec<String> = ws
            .items_in(&ContainerId::from("todo"))
            .into_iter()
            .map(|i| i.id.to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_capture_and_restore() {
        let mut ws = board();
        let before = ws.clone();
        let a = ItemId::from("a");
        let todo = ContainerId::from("todo");

        let snapshot = ws.capture([&a], [&todo]).unwrap();
        ws.set_item_order(&a, &ContainerId::from("done"), Some(OrderKey::new(1)))
            .unwrap();
        ws.set_container_position(&todo, 7).unwrap();
        assert_ne!(ws, before);

        ws.restore(&snapshot);
        assert_eq!(ws, before);
    }

    #[test]
    fn test_restore_items_is_selective() {
        let mut ws = board();
        let a = ItemId::from("a");
        let b = ItemId::from("b");
        let snapshot = ws.capture([&a, &b], []).unwrap();

        ws.set_item_order(&a, &ContainerId::from("done"), None).unwrap();
        ws.set_item_order(&b, &ContainerId::from("done"), None).unwrap();
        ws.restore_items(&snapshot, &HashSet::from([a.clone()]));

        assert_eq!(ws.item(&a).unwrap().container_id.as_str(), "todo");
        assert_eq!(ws.item(&b).unwrap().container_id.as_str(), "done");
    }

    #[test]
    fn test_capture_missing_is_stale() {
        let ws = board();
        let err = ws.capture([&ItemId::from("ghost")], []).unwrap_err();
        assert!(matches!(err, DndError::StaleReference { .. }));
    }

    #[test]
    fn test_external_updates() {
        let mut ws = board();
        ws.upsert_item(Item::new("d", "done", Some(OrderKey::new(5))));
        ws.upsert_container(Container::new("later", 2));
        assert!(ws.remove_container(&"todo".into()).is_some());

        let snapshot = ws.to_snapshot();
        assert!(snapshot.has_item(&"d".into()));
        assert!(snapshot.has_container(&"later".into()));
        assert!(!snapshot.has_container(&"todo".into()));
        assert_eq!(WorkingSet::from_snapshot(snapshot), ws);
    }

    #[test]
    fn test_restore_skips_removed_entities() {
        let mut ws = board();
        let a = ItemId::from("a");
        let snapshot = ws.capture([&a], []).unwrap();
        ws.remove_item(&a);
        ws.restore(&snapshot);
        assert!(ws.item(&a).is_none());
    }
}
