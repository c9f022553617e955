//! Container (list/column) types

use super::ids::ContainerId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Workflow category of a container. Primary sort key for containers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    Documents,
    #[default]
    NotStarted,
    Active,
    Done,
    Closed,
    /// Unknown status from the store; sorts after every known class
    #[serde(untagged)]
    Other(String),
}

impl StatusClass {
    /// Rank used when sorting containers
    pub fn rank(&self) -> u32 {
        match self {
            Self::Documents => 0,
            Self::NotStarted => 1,
            Self::Active => 2,
            Self::Done => 3,
            Self::Closed => 4,
            Self::Other(_) => 999,
        }
    }
}

/// A list on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub position: usize,
    #[serde(default)]
    pub status: StatusClass,
}

impl Container {
    pub fn new(id: impl Into<ContainerId>, position: usize) -> Self {
        Self {
            id: id.into(),
            position,
            status: StatusClass::default(),
        }
    }

    pub fn with_status(mut self, status: StatusClass) -> Self {
        self.status = status;
        self
    }

    /// Total order of containers: status rank, then position, then id
    pub fn sort_cmp(&self, other: &Container) -> Ordering {
        self.status
            .rank()
            .cmp(&other.status.rank())
            .then_with(|| self.position.cmp(&other.position))
            .then_with(|| self.id.cmp(&other.id))
    }
}
