//! Order keys for positioning items within a container.
//!
//! Keys are integers with gaps between them so that an item can be placed between two
//! neighbors without renumbering the rest of the container. An item without a key sorts
//! after every keyed item.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Ordering key of an item within its container
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderKey(i64);

impl OrderKey {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i64 {
        self.0
    }
}

impl From<i64> for OrderKey {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compare optional keys with `None` sorting last.
pub fn cmp_keys(a: Option<OrderKey>, b: Option<OrderKey>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_sorts_last() {
        let big = Some(OrderKey::new(i64::MAX));
        assert_eq!(cmp_keys(big, None), Ordering::Less);
        assert_eq!(cmp_keys(None, big), Ordering::Greater);
        assert_eq!(cmp_keys(None, None), Ordering::Equal);
    }

    #[test]
    fn test_keyed_ordering() {
        let a = Some(OrderKey::new(-5));
        let b = Some(OrderKey::new(10));
        assert_eq!(cmp_keys(a, b), Ordering::Less);
        assert_eq!(cmp_keys(b, b), Ordering::Equal);
    }
}
