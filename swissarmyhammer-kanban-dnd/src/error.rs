//! Error types for the drag-and-drop ordering engine

use crate::types::{ContainerId, ItemId, OrderKey};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for ordering operations
pub type Result<T> = std::result::Result<T, DndError>;

/// Errors that can occur while planning or committing a move
#[derive(Debug, Error)]
pub enum DndError {
    /// Neighbor keys leave no representable key between them.
    ///
    /// Recovered locally by one rebalance of the container.
    #[error("no key space left between {lower:?} and {upper:?}")]
    KeySpaceExhausted {
        lower: Option<OrderKey>,
        upper: Option<OrderKey>,
    },

    /// Allocation failed again after the container was rebalanced
    #[error("key space still exhausted in container '{container}' after rebalancing")]
    RebalanceExhausted { container: ContainerId },

    /// The drop target cannot be classified or its container is gone
    #[error("invalid drop target: {reason}")]
    InvalidDropTarget { reason: String },

    /// A plan references an entity that no longer exists
    #[error("stale reference to {resource} '{id}'")]
    StaleReference { resource: String, id: String },

    /// The persistence gateway rejected a write
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] PersistenceError),

    /// Item not found in the working set
    #[error("item not found: {id}")]
    ItemNotFound { id: ItemId },

    /// Container not found in the working set
    #[error("container not found: {id}")]
    ContainerNotFound { id: ContainerId },

    /// Duplicate ID in an input that must be a set
    #[error("duplicate {item_type} ID: {id}")]
    DuplicateId { item_type: String, id: String },

    /// Invalid configuration value
    #[error("invalid value for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    /// Configuration file could not be read
    #[error("failed to read config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// Errors reported by a [`PersistenceGateway`](crate::gateway::PersistenceGateway)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// The store rejected the write
    #[error("write rejected for {target}: {message}")]
    Rejected { target: String, message: String },

    /// The store could not be reached
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// The board does not exist in the store
    #[error("board not found: {id}")]
    BoardNotFound { id: String },
}

impl DndError {
    /// Create an invalid drop target error
    pub fn invalid_drop_target(reason: impl Into<String>) -> Self {
        Self::InvalidDropTarget {
            reason: reason.into(),
        }
    }

    /// Create a stale reference error
    pub fn stale(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::StaleReference {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate ID error
    pub fn duplicate_id(item_type: impl Into<String>, id: impl ToString) -> Self {
        Self::DuplicateId {
            item_type: item_type.into(),
            id: id.to_string(),
        }
    }

    /// Check if this error is recovered by rebalancing and retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::KeySpaceExhausted { .. })
    }

    /// Whether the drop should be handled exactly like a cancel
    pub fn is_cancel(&self) -> bool {
        matches!(self, Self::InvalidDropTarget { .. })
    }
}

impl PersistenceError {
    /// Create a rejected-write error
    pub fn rejected(target: impl ToString, message: impl Into<String>) -> Self {
        Self::Rejected {
            target: target.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DndError::ItemNotFound {
            id: ItemId::from_string("abc123"),
        };
        assert_eq!(err.to_string(), "item not found: abc123");
    }

    #[test]
    fn test_exhausted_display() {
        let err = DndError::KeySpaceExhausted {
            lower: Some(OrderKey::new(10)),
            upper: Some(OrderKey::new(11)),
        };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("11"));
    }

    #[test]
    fn test_retryable() {
        let exhausted = DndError::KeySpaceExhausted {
            lower: None,
            upper: None,
        };
        assert!(exhausted.is_retryable());
        assert!(!DndError::RebalanceExhausted {
            container: ContainerId::from_string("todo")
        }
        .is_retryable());
    }

    #[test]
    fn test_persistence_conversion() {
        let err: DndError = PersistenceError::rejected("task-1", "conflict").into();
        assert!(matches!(err, DndError::PersistenceFailure(_)));
        assert!(err.to_string().contains("task-1"));
    }

    #[test]
    fn test_invalid_drop_target_is_cancel() {
        assert!(DndError::invalid_drop_target("no container").is_cancel());
        assert!(!DndError::stale("item", "x").is_cancel());
    }
}
