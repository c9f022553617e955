//! Drag-and-drop ordering engine for kanban boards
//!
//! This crate decides where cards and lists land when they are dragged, which order keys
//! they get, and how those changes are applied optimistically and rolled back when the
//! store refuses them.
//!
//! ## Overview
//!
//! - **Gap-based keys** - A moved card gets a key between its new neighbors; the rest of
//!   the list is left alone unless the gap runs out, which triggers one rebalance
//! - **Pure planning** - Planners read the working set and return the fields to write
//! - **Optimistic commits** - Plans are applied at once and reverted on persistence failure
//! - **Pluggable store** - All I/O goes through the [`PersistenceGateway`] trait
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use swissarmyhammer_kanban_dnd::{
//!     DragStart, DropOutcome, InMemoryGateway, OrderingConfig, OrderingEngine, OverTarget,
//! };
//! # use swissarmyhammer_kanban_dnd::BoardSnapshot;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let snapshot = BoardSnapshot::new("board");
//! let gateway = Arc::new(InMemoryGateway::new(snapshot));
//! let mut engine =
//!     OrderingEngine::load(gateway, &"board".into(), OrderingConfig::default()).await?;
//!
//! engine.on_drag_start(DragStart::Item("task-1".into()));
//! engine.on_drag_over(Some(&OverTarget::ContainerSurface("done".into())));
//!
//! if let DropOutcome::Applied(pending) =
//!     engine.on_drag_end(Some(&OverTarget::ContainerSurface("done".into())))?
//! {
//!     let report = engine.settle(pending).await;
//!     println!("drop resolved: {:?}", report.status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Ordering
//!
//! ```text
//! items:      (order_key, None last) -> created_at -> id
//! containers: status class rank      -> position   -> id
//! ```

pub mod allocator;
pub mod config;
pub mod coordinator;
pub mod drag;
pub mod engine;
mod error;
pub mod gateway;
pub mod plan;
pub mod selection;
pub mod types;
pub mod working_set;

pub use allocator::KeyAllocator;
pub use config::OrderingConfig;
pub use coordinator::{
    apply, resolve, CommitReport, CommitStatus, PendingCommit, PersistOutcome, WriteFailure,
    WriteTarget,
};
pub use drag::{
    DragMachine, DragSession, DragState, DragSubject, DropTarget, HoverChange, OverTarget,
    Placement,
};
pub use engine::{DragStart, DropOutcome, OrderingEngine};
pub use error::{DndError, PersistenceError, Result};
pub use gateway::{GatewayCall, InMemoryGateway, PersistenceGateway};
pub use plan::{
    plan_batch_move, plan_container_move, plan_container_reorder, plan_single_move,
    ContainerReorderPlan, ItemMove, ItemMovePlan, KeyWrite, MovePlan, PositionUpdate,
};
pub use selection::Selection;
pub use types::{
    BoardId, BoardSnapshot, Container, ContainerId, Item, ItemId, OrderKey, StatusClass,
};
pub use working_set::{MoveSnapshot, WorkingSet};
