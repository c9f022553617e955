//! Board snapshot as read from the store

use super::container::Container;
use super::ids::{BoardId, ContainerId, ItemId};
use super::item::Item;
use serde::{Deserialize, Serialize};

/// Everything the ordering engine needs to know about one board
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub board_id: BoardId,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl BoardSnapshot {
    pub fn new(board_id: impl Into<BoardId>) -> Self {
        Self {
            board_id: board_id.into(),
            containers: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn with_container(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }

    pub fn with_item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }

    pub fn has_container(&self, id: &ContainerId) -> bool {
        self.containers.iter().any(|c| &c.id == id)
    }

    pub fn has_item(&self, id: &ItemId) -> bool {
        self.items.iter().any(|i| &i.id == id)
    }
}
