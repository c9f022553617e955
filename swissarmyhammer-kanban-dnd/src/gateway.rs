//! Persistence gateway seam.
//!
//! The ordering engine never talks to a store directly. Everything it writes goes through
//! [`PersistenceGateway`], and everything it seeds itself from comes back through
//! [`PersistenceGateway::read_current_snapshot`].

use crate::error::PersistenceError;
use crate::plan::PositionUpdate;
use crate::types::{BoardId, BoardSnapshot, ContainerId, ItemId, OrderKey};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Result type for gateway calls
pub type GatewayResult<T> = std::result::Result<T, PersistenceError>;

/// Store for board ordering fields
#[async_trait]
pub trait PersistenceGateway: Send + Sync {
    /// Write an item's container and key. Idempotent.
    async fn move_item(
        &self,
        item_id: &ItemId,
        container_id: &ContainerId,
        order_key: OrderKey,
    ) -> GatewayResult<()>;

    /// Write container positions as one all-or-nothing batch
    async fn update_container_positions(&self, updates: &[PositionUpdate]) -> GatewayResult<()>;

    /// Read the board as the store currently has it
    async fn read_current_snapshot(&self, board_id: &BoardId) -> GatewayResult<BoardSnapshot>;
}

/// A call received by [`InMemoryGateway`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    MoveItem {
        item_id: ItemId,
        container_id: ContainerId,
        order_key: OrderKey,
    },
    UpdateContainerPositions(Vec<PositionUpdate>),
    ReadSnapshot(BoardId),
}

#[derive(Debug, Default)]
struct InMemoryState {
    boards: HashMap<BoardId, BoardSnapshot>,
    failing_items: HashSet<ItemId>,
    fail_positions: bool,
    unavailable: bool,
    calls: Vec<GatewayCall>,
}

impl InMemoryState {
    fn check_available(&self) -> GatewayResult<()> {
        if self.unavailable {
            return Err(PersistenceError::Unavailable {
                message: "in-memory store marked unavailable".to_string(),
            });
        }
        Ok(())
    }
}

/// Gateway backed by in-process board snapshots, with failure injection
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    state: Mutex<InMemoryState>,
}

impl InMemoryGateway {
    /// Create a gateway holding one board
    pub fn new(snapshot: BoardSnapshot) -> Self {
        let mut state = InMemoryState::default();
        state.boards.insert(snapshot.board_id.clone(), snapshot);
        Self {
            state: Mutex::new(state),
        }
    }

    /// Add or replace a board
    pub async fn insert_board(&self, snapshot: BoardSnapshot) {
        let mut state = self.state.lock().await;
        state.boards.insert(snapshot.board_id.clone(), snapshot);
    }

    /// Reject every future `move_item` for this item
    pub async fn fail_item(&self, item_id: impl Into<ItemId>) {
        self.state.lock().await.failing_items.insert(item_id.into());
    }

    /// Reject every future `update_container_positions`
    pub async fn fail_positions(&self, fail: bool) {
        self.state.lock().await.fail_positions = fail;
    }

    /// Make every call fail with `Unavailable`
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    /// Delete an item from the store, as a concurrent client would
    pub async fn delete_item(&self, item_id: &ItemId) -> bool {
        let mut state = self.state.lock().await;
        state.boards.values_mut().any(|board| {
            let before = board.items.len();
            board.items.retain(|i| &i.id != item_id);
            board.items.len() != before
        })
    }

    /// Delete a container and its items from the store, as a concurrent client would
    pub async fn delete_container(&self, container_id: &ContainerId) -> bool {
        let mut state = self.state.lock().await;
        state.boards.values_mut().any(|board| {
            let before = board.containers.len();
            board.containers.retain(|c| &c.id != container_id);
            board.items.retain(|i| &i.container_id != container_id);
            board.containers.len() != before
        })
    }

    /// The stored board
    pub async fn board(&self, board_id: &BoardId) -> Option<BoardSnapshot> {
        self.state.lock().await.boards.get(board_id).cloned()
    }

    /// Every call received so far, in order
    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().await.calls.clone()
    }
}

#[async_trait]
impl PersistenceGateway for InMemoryGateway {
    async fn move_item(
        &self,
        item_id: &ItemId,
        container_id: &ContainerId,
        order_key: OrderKey,
    ) -> GatewayResult<()> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::MoveItem {
            item_id: item_id.clone(),
            container_id: container_id.clone(),
            order_key,
        });
        state.check_available()?;
        if state.failing_items.contains(item_id) {
            warn!(item = %item_id, "injected move failure");
            return Err(PersistenceError::rejected(item_id, "injected failure"));
        }

        let board = state
            .boards
            .values_mut()
            .find(|b| b.has_item(item_id))
            .ok_or_else(|| PersistenceError::rejected(item_id, "item does not exist"))?;
        if !board.has_container(container_id) {
            return Err(PersistenceError::rejected(
                container_id,
                "container does not exist",
            ));
        }
        if let Some(item) = board.items.iter_mut().find(|i| &i.id == item_id) {
            item.container_id = container_id.clone();
            item.order_key = Some(order_key);
        }
        debug!(item = %item_id, container = %container_id, key = %order_key, "stored move");
        Ok(())
    }

    async fn update_container_positions(&self, updates: &[PositionUpdate]) -> GatewayResult<()> {
        let mut state = self.state.lock().await;
        state
            .calls
            .push(GatewayCall::UpdateContainerPositions(updates.to_vec()));
        state.check_available()?;
        if state.fail_positions {
            warn!(count = updates.len(), "injected position failure");
            return Err(PersistenceError::rejected("containers", "injected failure"));
        }

        // All-or-nothing: validate every id before writing any position.
        let board_id = updates
            .first()
            .and_then(|first| {
                state
                    .boards
                    .values()
                    .find(|b| b.has_container(&first.container_id))
                    .map(|b| b.board_id.clone())
            })
            .ok_or_else(|| PersistenceError::rejected("containers", "unknown container"))?;
        let Some(board) = state.boards.get_mut(&board_id) else {
            return Err(PersistenceError::BoardNotFound {
                id: board_id.to_string(),
            });
        };
        if let Some(missing) = updates.iter().find(|u| !board.has_container(&u.container_id)) {
            return Err(PersistenceError::rejected(
                &missing.container_id,
                "container does not exist",
            ));
        }
        for update in updates {
            if let Some(container) = board
                .containers
                .iter_mut()
                .find(|c| c.id == update.container_id)
            {
                container.position = update.new_position;
            }
        }
        debug!(count = updates.len(), "stored container positions");
        Ok(())
    }

    async fn read_current_snapshot(&self, board_id: &BoardId) -> GatewayResult<BoardSnapshot> {
        let mut state = self.state.lock().await;
        state.calls.push(GatewayCall::ReadSnapshot(board_id.clone()));
        state.check_available()?;
        state
            .boards
            .get(board_id)
            .cloned()
            .ok_or_else(|| PersistenceError::BoardNotFound {
                id: board_id.to_string(),
            })
    }
}
