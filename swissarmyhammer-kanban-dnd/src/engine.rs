//! OrderingEngine - the surface the UI layer drives
//!
//! The engine owns the working set, the drag machine and the selection, and routes each
//! gesture event through them:
//!
//! - [`on_drag_start`](OrderingEngine::on_drag_start) picks up a card, the selection, or a list
//! - [`on_drag_over`](OrderingEngine::on_drag_over) updates the preview
//! - [`on_drag_end`](OrderingEngine::on_drag_end) plans the drop and applies it optimistically
//! - [`settle`](OrderingEngine::settle) persists an applied drop and confirms or rolls it back

use crate::allocator::KeyAllocator;
use crate::config::OrderingConfig;
use crate::coordinator::{self, CommitReport, PendingCommit, PersistOutcome};
use crate::drag::{DragMachine, DragSession, DragSubject, DropTarget, HoverChange, OverTarget};
use crate::error::{DndError, Result};
use crate::gateway::PersistenceGateway;
use crate::plan::{plan_batch_move, plan_container_move, plan_single_move, MovePlan};
use crate::selection::Selection;
use crate::types::{BoardId, ContainerId, Item, ItemId};
use crate::working_set::WorkingSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What was picked up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragStart {
    Item(ItemId),
    Container(ContainerId),
}

/// Result of a drop
#[derive(Debug)]
pub enum DropOutcome {
    /// Nothing was dragged, there was no target, or the target could not be resolved
    Cancelled,
    /// The drop would not change any order
    NoOp,
    /// The working set was updated; the commit still has to be settled
    Applied(PendingCommit),
}

impl DropOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// Drag-and-drop ordering for one board
pub struct OrderingEngine {
    config: OrderingConfig,
    allocator: KeyAllocator,
    working_set: WorkingSet,
    machine: DragMachine,
    selection: Selection,
    gateway: Arc<dyn PersistenceGateway>,
}

impl std::fmt::Debug for OrderingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderingEngine")
            .field("config", &self.config)
            .field("board_id", self.working_set.board_id())
            .field("state", self.machine.state())
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl OrderingEngine {
    /// Seed an engine from the store
    pub async fn load(
        gateway: Arc<dyn PersistenceGateway>,
        board_id: &BoardId,
        config: OrderingConfig,
    ) -> Result<Self> {
        let allocator = KeyAllocator::new(&config)?;
        let snapshot = gateway.read_current_snapshot(board_id).await?;
        info!(
            board = %board_id,
            containers = snapshot.containers.len(),
            items = snapshot.items.len(),
            "loaded board"
        );
        Ok(Self {
            allocator,
            config,
            working_set: WorkingSet::from_snapshot(snapshot),
            machine: DragMachine::new(),
            selection: Selection::new(),
            gateway,
        })
    }

    /// Replace the working set with the store's current board.
    ///
    /// An in-progress drag keeps its session.
    pub async fn refresh(&mut self) -> Result<()> {
        let board_id = self.working_set.board_id().clone();
        let snapshot = self.gateway.read_current_snapshot(&board_id).await?;
        self.working_set = WorkingSet::from_snapshot(snapshot);
        debug!(board = %board_id, "refreshed working set");
        Ok(())
    }

    pub fn config(&self) -> &OrderingConfig {
        &self.config
    }

    pub fn working_set(&self) -> &WorkingSet {
        &self.working_set
    }

    /// Mutable access for external CRUD and realtime updates
    pub fn working_set_mut(&mut self) -> &mut WorkingSet {
        &mut self.working_set
    }

    /// Items of a container in display order
    pub fn items_in(&self, container_id: &ContainerId) -> Vec<Item> {
        self.working_set.items_in(container_id)
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_multi_select(&mut self, enabled: bool) {
        self.selection.set_multi_select(enabled);
    }

    pub fn select(&mut self, id: impl Into<ItemId>) {
        self.selection.select(id);
    }

    pub fn toggle_selection(&mut self, id: impl Into<ItemId>) -> bool {
        self.selection.toggle(id)
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // =========================================================================
    // Drag lifecycle
    // =========================================================================

    /// Current drag session, for rendering the preview
    pub fn preview_state(&self) -> Option<&DragSession> {
        self.machine.session()
    }

    /// Abandon any drag in progress. Returns whether one was in progress.
    pub fn reset_drag_state(&mut self) -> bool {
        self.machine.cancel()
    }

    /// Pick something up. Returns `false` if it is not on the board.
    pub fn on_drag_start(&mut self, start: DragStart) -> bool {
        let session = match start {
            DragStart::Item(active) => {
                let Some(item) = self.working_set.item(&active) else {
                    warn!(item = %active, "pick-up of unknown item ignored");
                    return false;
                };
                let origin = item.container_id.clone();
                let ids = if self.selection.drags_with(&active) {
                    self.selection
                        .ids()
                        .filter(|id| self.working_set.item(id).is_some())
                        .cloned()
                        .collect()
                } else {
                    vec![active.clone()]
                };
                DragSession::for_items(origin, active, ids)
            }
            DragStart::Container(id) => {
                if !self.working_set.has_container(&id) {
                    warn!(container = %id, "pick-up of unknown container ignored");
                    return false;
                }
                DragSession::for_container(id)
            }
        };
        self.machine.pick_up(session);
        true
    }

    /// Pointer moved over `over`, or off every target when `None`
    pub fn on_drag_over(&mut self, over: Option<&OverTarget>) -> HoverChange {
        self.machine.hover(over, &self.working_set)
    }

    /// Drop on `over`.
    ///
    /// The drag state is back to idle afterwards whatever the result. Targets that cannot
    /// be resolved cancel the drop. Planning errors are returned before anything is
    /// mutated.
    pub fn on_drag_end(&mut self, over: Option<&OverTarget>) -> Result<DropOutcome> {
        let Some(session) = self.machine.finish() else {
            return Ok(DropOutcome::Cancelled);
        };
        let Some(over) = over else {
            debug!("dropped outside any target");
            return Ok(DropOutcome::Cancelled);
        };

        let plan = match self.plan_drop(&session, over) {
            Ok(Some(plan)) => plan,
            Ok(None) => return Ok(DropOutcome::NoOp),
            Err(e) if e.is_cancel() => {
                debug!(error = %e, "drop treated as cancel");
                return Ok(DropOutcome::Cancelled);
            }
            Err(e) => {
                warn!(error = %e, "drop aborted");
                return Err(e);
            }
        };

        let is_batch = matches!(plan, MovePlan::Batch(_));
        let pending = coordinator::apply(&mut self.working_set, plan)?;
        if is_batch {
            self.selection.clear();
        }
        Ok(DropOutcome::Applied(pending))
    }

    fn plan_drop(&self, session: &DragSession, over: &OverTarget) -> Result<Option<MovePlan>> {
        let target = DropTarget::classify(over, &self.working_set)?;
        if !self.working_set.has_container(&session.origin_container_id) {
            return Err(DndError::invalid_drop_target(format!(
                "origin container '{}' no longer exists",
                session.origin_container_id
            )));
        }

        match &session.subject {
            DragSubject::Container { id } => {
                let sorted = self.working_set.sorted_containers();
                Ok(plan_container_move(&sorted, id, &target.container_id)?
                    .map(MovePlan::Containers))
            }
            DragSubject::Items { active, ids } if ids.len() <= 1 => {
                let dragged = self.working_set.require_item(active)?;
                let siblings = self.working_set.items_in(&target.container_id);
                Ok(plan_single_move(
                    &self.allocator,
                    dragged,
                    &session.origin_container_id,
                    &target,
                    &siblings,
                )?
                .map(MovePlan::Single))
            }
            DragSubject::Items { ids, .. } => {
                let dragged = ids
                    .iter()
                    .map(|id| self.working_set.require_item(id).cloned())
                    .collect::<Result<Vec<_>>>()?;
                let siblings = self.working_set.items_in(&target.container_id);
                Ok(
                    plan_batch_move(&self.allocator, &dragged, &target, &siblings)?
                        .map(MovePlan::Batch),
                )
            }
        }
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Persist an applied drop and confirm or roll it back
    pub async fn settle(&mut self, pending: PendingCommit) -> CommitReport {
        let outcome = pending.persist(self.gateway.as_ref()).await;
        self.resolve(pending, outcome)
    }

    /// Fold an outcome obtained from [`PendingCommit::persist`] back into the working set
    pub fn resolve(&mut self, pending: PendingCommit, outcome: PersistOutcome) -> CommitReport {
        coordinator::resolve(&mut self.working_set, pending, outcome)
    }

    /// The gateway, for persisting a [`PendingCommit`] off the input path
    pub fn gateway(&self) -> Arc<dyn PersistenceGateway> {
        Arc::clone(&self.gateway)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::InMemoryGateway;
    use crate::types::{BoardSnapshot, Container, OrderKey};

    async fn engine() -> OrderingEngine {
        let gateway = InMemoryGateway::new(
            BoardSnapshot::new("board")
                .with_container(Container::new("todo", 0))
                .with_container(Container::new("done", 1))
                .with_item(Item::new("a", "todo", Some(OrderKey::new(10))))
                .with_item(Item::new("b", "todo", Some(OrderKey::new(20))))
                .with_item(Item::new("c", "todo", Some(OrderKey::new(30)))),
        );
        OrderingEngine::load(Arc::new(gateway), &"board".into(), OrderingConfig::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_config() {
        let gateway = Arc::new(InMemoryGateway::new(BoardSnapshot::new("board")));
        let config = OrderingConfig::default().with_key_step(0);
        let err = OrderingEngine::load(gateway, &"board".into(), config)
            .await
            .unwrap_err();
        assert!(matches!(err, DndError::InvalidConfig { .. }));
    }

    #[tokio::test]
    async fn test_pick_up_unknown_item() {
        let mut engine = engine().await;
        assert!(!engine.on_drag_start(DragStart::Item("ghost".into())));
        assert!(engine.preview_state().is_none());
    }

    #[tokio::test]
    async fn test_selection_drags_together() {
        let mut engine = engine().await;
        engine.set_multi_select(true);
        engine.select("a");
        engine.select("c");

        assert!(engine.on_drag_start(DragStart::Item("c".into())));
        assert!(engine.preview_state().unwrap().is_batch());
    }

    #[tokio::test]
    async fn test_drop_without_target_cancels() {
        let mut engine = engine().await;
        let before = engine.working_set().clone();
        engine.on_drag_start(DragStart::Item("a".into()));

        let outcome = engine.on_drag_end(None).unwrap();
        assert!(matches!(outcome, DropOutcome::Cancelled));
        assert_eq!(engine.working_set(), &before);
        assert!(engine.preview_state().is_none());
    }

    #[tokio::test]
    async fn test_drop_without_drag_cancels() {
        let mut engine = engine().await;
        let outcome = engine
            .on_drag_end(Some(&OverTarget::ContainerSurface("done".into())))
            .unwrap();
        assert!(matches!(outcome, DropOutcome::Cancelled));
    }

    #[tokio::test]
    async fn test_reset_drag_state() {
        let mut engine = engine().await;
        engine.on_drag_start(DragStart::Container("todo".into()));
        assert!(engine.reset_drag_state());
        assert!(!engine.reset_drag_state());
    }

    #[tokio::test]
    async fn test_drop_and_settle() {
        let mut engine = engine().await;
        engine.on_drag_start(DragStart::Item("a".into()));
        let outcome = engine
            .on_drag_end(Some(&OverTarget::ContainerSurface("done".into())))
            .unwrap();
        let DropOutcome::Applied(pending) = outcome else {
            panic!("expected an applied drop");
        };

        let report = engine.settle(pending).await;
        assert!(report.is_confirmed());
        let done: Vec<ItemId> = engine
            .items_in(&"done".into())
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(done, vec![ItemId::from("a")]);
    }
}
