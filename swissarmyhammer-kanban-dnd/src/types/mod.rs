//! Core types for the ordering engine

mod board;
mod container;
mod ids;
mod item;
mod key;

// Re-export all types
pub use board::BoardSnapshot;
pub use container::{Container, StatusClass};
pub use ids::{BoardId, ContainerId, ItemId};
pub use item::{sort_items, Item};
pub use key::{cmp_keys, OrderKey};
