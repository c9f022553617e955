//! Optimistic apply and rollback.
//!
//! A drop is committed in two phases:
//!
//! 1. [`apply`] runs synchronously on the working set: it checks that every entity the plan
//!    touches still exists, snapshots their ordering fields, and writes the new ones. The
//!    result is a [`PendingCommit`].
//! 2. [`PendingCommit::persist`] talks to the [`PersistenceGateway`] without borrowing the
//!    working set, and [`resolve`] folds its [`PersistOutcome`] back in: confirm, or restore
//!    from the snapshot.
//!
//! Single-card and list plans roll back completely on any failure. Batch plans issue one
//! independent write per card, so only the cards whose write failed are rolled back; the
//! rest stay moved and the report says which ones were reverted.
//!
//! A failed rebalance write rolls back the whole plan, and the rebalance writes that
//! already landed are reverted in the store. Once the whole rebalance has landed, a failed
//! move keeps it: rolled-back items take their rebalanced keys so the working set matches
//! the store.

use crate::error::{DndError, PersistenceError, Result};
use crate::gateway::PersistenceGateway;
use crate::plan::{ItemMovePlan, KeyWrite, MovePlan};
use crate::types::{BoardId, BoardSnapshot, ItemId};
use crate::working_set::{MoveSnapshot, WorkingSet};
use futures::future::join_all;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// An applied plan whose persistence outcome is not known yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommit {
    board_id: BoardId,
    plan: MovePlan,
    snapshot: MoveSnapshot,
}

/// Which write failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteTarget {
    /// Reading the current board before writing
    Snapshot,
    /// A rebalanced sibling's key
    Rebalance(ItemId),
    /// A moved card
    Item(ItemId),
    /// The container position batch
    Containers,
}

/// One failed gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub target: WriteTarget,
    pub error: PersistenceError,
}

/// What the gateway made of a [`PendingCommit`]
#[derive(Debug)]
pub enum PersistOutcome {
    /// Every write succeeded
    Persisted,
    /// The store no longer has an entity the plan references; nothing was written
    Stale(DndError),
    /// At least one write failed
    Failed(Vec<WriteFailure>),
}

/// Final state of a drop after persistence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitStatus {
    /// The optimistic state is now persisted
    Confirmed,
    /// Every touched entity was restored
    RolledBack,
    /// Some cards of a batch stayed moved; these were restored
    PartiallyApplied { rolled_back: Vec<ItemId> },
    /// The plan was stale and was discarded entirely
    Discarded,
}

/// Resolution of a drop, for surfacing to the user
#[derive(Debug)]
pub struct CommitReport {
    pub status: CommitStatus,
    pub errors: Vec<DndError>,
}

impl CommitReport {
    pub fn is_confirmed(&self) -> bool {
        self.status == CommitStatus::Confirmed
    }
}

/// Check, snapshot and optimistically apply `plan` to the working set.
///
/// Fails with `StaleReference` before touching anything if the plan references an entity
/// the working set no longer has.
pub fn apply(working_set: &mut WorkingSet, plan: MovePlan) -> Result<PendingCommit> {
    let snapshot = match &plan {
        MovePlan::Single(items) | MovePlan::Batch(items) => {
            working_set.require_container(&items.target_container)?;
            working_set.capture(items.touched_items(), [])?
        }
        MovePlan::Containers(reorder) => working_set.capture([], reorder.container_ids())?,
    };

    match &plan {
        MovePlan::Single(items) | MovePlan::Batch(items) => {
            for write in &items.rebalanced {
                working_set.set_item_order(
                    &write.item_id,
                    &write.container_id,
                    Some(write.new_key),
                )?;
            }
            for mv in &items.moves {
                working_set.set_item_order(&mv.item_id, &mv.to_container, Some(mv.new_key))?;
            }
        }
        MovePlan::Containers(reorder) => {
            for update in &reorder.updates {
                working_set.set_container_position(&update.container_id, update.new_position)?;
            }
        }
    }

    debug!(kind = plan.kind(), "applied plan optimistically");
    Ok(PendingCommit {
        board_id: working_set.board_id().clone(),
        plan,
        snapshot,
    })
}

impl PendingCommit {
    pub fn plan(&self) -> &MovePlan {
        &self.plan
    }

    pub fn snapshot(&self) -> &MoveSnapshot {
        &self.snapshot
    }

    pub fn board_id(&self) -> &BoardId {
        &self.board_id
    }

    /// Validate the plan against the store and issue its writes
    pub async fn persist(&self, gateway: &dyn PersistenceGateway) -> PersistOutcome {
        let current = match gateway.read_current_snapshot(&self.board_id).await {
            Ok(current) => current,
            Err(error) => {
                return PersistOutcome::Failed(vec![WriteFailure {
                    target: WriteTarget::Snapshot,
                    error,
                }])
            }
        };
        if let Err(e) = self.check_current(&current) {
            warn!(board = %self.board_id, error = %e, "discarding stale plan");
            return PersistOutcome::Stale(e);
        }

        match &self.plan {
            MovePlan::Single(items) => persist_items(gateway, items, false).await,
            MovePlan::Batch(items) => persist_items(gateway, items, true).await,
            MovePlan::Containers(reorder) => {
                match gateway.update_container_positions(&reorder.updates).await {
                    Ok(()) => PersistOutcome::Persisted,
                    Err(error) => PersistOutcome::Failed(vec![WriteFailure {
                        target: WriteTarget::Containers,
                        error,
                    }]),
                }
            }
        }
    }

    fn check_current(&self, current: &BoardSnapshot) -> Result<()> {
        match &self.plan {
            MovePlan::Single(items) | MovePlan::Batch(items) => {
                if !current.has_container(&items.target_container) {
                    return Err(DndError::stale("container", &items.target_container));
                }
                if let Some(id) = items.touched_items().find(|id| !current.has_item(id)) {
                    return Err(DndError::stale("item", id));
                }
            }
            MovePlan::Containers(reorder) => {
                if let Some(id) = reorder.container_ids().find(|id| !current.has_container(id)) {
                    return Err(DndError::stale("container", id));
                }
            }
        }
        Ok(())
    }
}

async fn persist_items(
    gateway: &dyn PersistenceGateway,
    plan: &ItemMovePlan,
    independent: bool,
) -> PersistOutcome {
    // Rebalanced keys must land before any move is placed between them.
    for (landed, write) in plan.rebalanced.iter().enumerate() {
        if let Err(error) = gateway
            .move_item(&write.item_id, &write.container_id, write.new_key)
            .await
        {
            warn!(item = %write.item_id, error = %error, "rebalance write failed");
            let mut failures = vec![WriteFailure {
                target: WriteTarget::Rebalance(write.item_id.clone()),
                error,
            }];
            failures.extend(revert_rebalance(gateway, &plan.rebalanced[..landed]).await);
            return PersistOutcome::Failed(failures);
        }
    }

    let mut failures = Vec::new();
    if independent {
        let results = join_all(
            plan.moves
                .iter()
                .map(|mv| gateway.move_item(&mv.item_id, &mv.to_container, mv.new_key)),
        )
        .await;
        for (mv, result) in plan.moves.iter().zip(results) {
            if let Err(error) = result {
                failures.push(WriteFailure {
                    target: WriteTarget::Item(mv.item_id.clone()),
                    error,
                });
            }
        }
    } else {
        for mv in &plan.moves {
            if let Err(error) = gateway
                .move_item(&mv.item_id, &mv.to_container, mv.new_key)
                .await
            {
                failures.push(WriteFailure {
                    target: WriteTarget::Item(mv.item_id.clone()),
                    error,
                });
                break;
            }
        }
    }

    if failures.is_empty() {
        PersistOutcome::Persisted
    } else {
        PersistOutcome::Failed(failures)
    }
}

/// Write back the previous keys of rebalance writes that already landed.
///
/// Items that had no key keep their rebalanced one; the gateway cannot clear a key.
async fn revert_rebalance(
    gateway: &dyn PersistenceGateway,
    landed: &[KeyWrite],
) -> Vec<WriteFailure> {
    let mut failures = Vec::new();
    for write in landed.iter().rev() {
        let Some(old_key) = write.old_key else {
            continue;
        };
        if let Err(error) = gateway
            .move_item(&write.item_id, &write.container_id, old_key)
            .await
        {
            warn!(item = %write.item_id, error = %error, "rebalance revert failed");
            failures.push(WriteFailure {
                target: WriteTarget::Rebalance(write.item_id.clone()),
                error,
            });
        }
    }
    failures
}

/// Fold a persistence outcome back into the working set
pub fn resolve(
    working_set: &mut WorkingSet,
    pending: PendingCommit,
    outcome: PersistOutcome,
) -> CommitReport {
    let kind = pending.plan.kind();
    match outcome {
        PersistOutcome::Persisted => {
            info!(kind, "drop persisted");
            CommitReport {
                status: CommitStatus::Confirmed,
                errors: Vec::new(),
            }
        }
        PersistOutcome::Stale(error) => {
            working_set.restore(&pending.snapshot);
            CommitReport {
                status: CommitStatus::Discarded,
                errors: vec![error],
            }
        }
        PersistOutcome::Failed(failures) => {
            let rebalance_landed = failures
                .iter()
                .all(|f| matches!(f.target, WriteTarget::Item(_)));
            let (partial, items) = match &pending.plan {
                MovePlan::Batch(items) => (partial_rollback_ids(items, &failures), Some(items)),
                MovePlan::Single(items) => (None, Some(items)),
                MovePlan::Containers(_) => (None, None),
            };
            let landed = items.filter(|_| rebalance_landed);
            let status = match partial {
                Some(ids) => {
                    working_set.restore_items(&pending.snapshot, &ids);
                    if let Some(items) = landed {
                        keep_rebalanced(working_set, items, |id| ids.contains(id));
                    }
                    let mut rolled_back: Vec<ItemId> = ids.into_iter().collect();
                    rolled_back.sort();
                    warn!(kind, rolled_back = rolled_back.len(), "batch partially persisted");
                    CommitStatus::PartiallyApplied { rolled_back }
                }
                None => {
                    working_set.restore(&pending.snapshot);
                    if let Some(items) = landed {
                        keep_rebalanced(working_set, items, |_| true);
                    }
                    warn!(kind, failures = failures.len(), "drop rolled back");
                    CommitStatus::RolledBack
                }
            };
            CommitReport {
                status,
                errors: failures
                    .into_iter()
                    .map(|f| DndError::PersistenceFailure(f.error))
                    .collect(),
            }
        }
    }
}

/// Put back the rebalanced keys of restored items once the store holds them
fn keep_rebalanced(
    working_set: &mut WorkingSet,
    plan: &ItemMovePlan,
    restored: impl Fn(&ItemId) -> bool,
) {
    for write in plan.rebalanced.iter().filter(|w| restored(&w.item_id)) {
        if let Err(e) =
            working_set.set_item_order(&write.item_id, &write.container_id, Some(write.new_key))
        {
            debug!(item = %write.item_id, error = %e, "rebalanced item no longer present");
        }
    }
}

/// Ids to restore when only some moves of a batch failed, or `None` for a full rollback
fn partial_rollback_ids(plan: &ItemMovePlan, failures: &[WriteFailure]) -> Option<HashSet<ItemId>> {
    let mut ids = HashSet::new();
    for failure in failures {
        match &failure.target {
            WriteTarget::Item(id) => {
                ids.insert(id.clone());
            }
            WriteTarget::Snapshot | WriteTarget::Rebalance(_) | WriteTarget::Containers => {
                return None
            }
        }
    }
    if ids.len() >= plan.moves.len() {
        return None;
    }
    Some(ids)
}
