//! Item (task card) ordering fields

use super::ids::{ContainerId, ItemId};
use super::key::{cmp_keys, OrderKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A task card, reduced to the fields that decide where it sits on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub container_id: ContainerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_key: Option<OrderKey>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Create an item created now
    pub fn new(
        id: impl Into<ItemId>,
        container_id: impl Into<ContainerId>,
        order_key: Option<OrderKey>,
    ) -> Self {
        Self {
            id: id.into(),
            container_id: container_id.into(),
            order_key,
            created_at: Utc::now(),
        }
    }

    /// Set the creation timestamp
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Total order of items within a container: key (missing last), then creation time,
    /// then id.
    pub fn sort_cmp(&self, other: &Item) -> Ordering {
        cmp_keys(self.order_key, other.order_key)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Sort items into display order
pub fn sort_items(items: &mut [Item]) {
    items.sort_by(Item::sort_cmp);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn test_sort_by_key_then_created_at_then_id() {
        let mut items = vec![
            Item::new("c", "todo", None).with_created_at(at(1)),
            Item::new("b", "todo", Some(OrderKey::new(5))).with_created_at(at(2)),
            Item::new("a", "todo", Some(OrderKey::new(5))).with_created_at(at(2)),
            Item::new("d", "todo", Some(OrderKey::new(5))).with_created_at(at(1)),
            Item::new("e", "todo", Some(OrderKey::new(1))).with_created_at(at(9)),
        ];
        sort_items(&mut items);
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["e", "d", "a", "b", "c"]);
    }

    #[test]
    fn test_unkeyed_items_sort_by_created_at() {
        let mut items = vec![
            Item::new("late", "todo", None).with_created_at(at(20)),
            Item::new("early", "todo", None).with_created_at(at(10)),
        ];
        sort_items(&mut items);
        assert_eq!(items[0].id.as_str(), "early");
    }
}
