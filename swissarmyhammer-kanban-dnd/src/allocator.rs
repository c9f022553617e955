//! Order key allocation.
//!
//! Keys are gap-based: a new key is placed between its neighbors instead of renumbering
//! the container. When two neighbors are adjacent there is no key between them and
//! allocation fails with [`DndError::KeySpaceExhausted`]; the caller rebalances the
//! container with [`KeyAllocator::rebalanced`] and retries once.

use crate::config::OrderingConfig;
use crate::error::{DndError, Result};
use crate::types::OrderKey;

/// Allocates keys between optional neighbors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyAllocator {
    default_key: i64,
    step: i64,
    spacing: i64,
}

impl Default for KeyAllocator {
    fn default() -> Self {
        Self::from_valid(&OrderingConfig::default())
    }
}

impl KeyAllocator {
    /// Build an allocator, rejecting settings that would produce unordered keys
    pub fn new(config: &OrderingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    fn from_valid(config: &OrderingConfig) -> Self {
        Self {
            default_key: config.default_key,
            step: config.key_step,
            spacing: config.rebalance_spacing,
        }
    }

    /// Key for the first item of an empty container
    pub fn default_key(&self) -> OrderKey {
        OrderKey::new(self.default_key)
    }

    /// Allocate one key strictly between `lower` and `upper`.
    ///
    /// - no bounds: the default key
    /// - only `lower`: `lower + step`
    /// - only `upper`: `upper - step`
    /// - both: the midpoint, or `KeySpaceExhausted` if there is none
    pub fn allocate(&self, lower: Option<OrderKey>, upper: Option<OrderKey>) -> Result<OrderKey> {
        self.allocate_nth(lower, upper, 1, 1)
    }

    /// Allocate the `rank`-th (1-based) of `of` evenly spaced keys between the bounds.
    ///
    /// Used when a run of `of` moved items shares the same pair of stationary
    /// boundaries. Keys for increasing ranks are strictly increasing, and `of == 1`
    /// behaves exactly like [`allocate`](Self::allocate).
    pub fn allocate_nth(
        &self,
        lower: Option<OrderKey>,
        upper: Option<OrderKey>,
        rank: usize,
        of: usize,
    ) -> Result<OrderKey> {
        debug_assert!(rank >= 1 && rank <= of, "rank {rank} out of 1..={of}");
        let of = of.max(1) as i128;
        let rank = (rank as i128).clamp(1, of);
        let step = self.step as i128;
        let exhausted = || DndError::KeySpaceExhausted { lower, upper };

        let value = match (lower, upper) {
            (None, None) => self.default_key as i128 + step * (rank - 1),
            (Some(lower), None) => lower.value() as i128 + step * rank,
            (None, Some(upper)) => upper.value() as i128 - step * (of - rank + 1),
            (Some(lower), Some(upper)) => {
                let gap = upper.value() as i128 - lower.value() as i128;
                let slots = of + 1;
                if gap < slots {
                    return Err(exhausted());
                }
                lower.value() as i128 + gap * rank / slots
            }
        };

        let value = i64::try_from(value).map_err(|_| exhausted())?;
        Ok(OrderKey::new(value))
    }

    /// Evenly spaced keys for `count` items, preserving their order
    pub fn rebalanced(&self, count: usize) -> Result<Vec<OrderKey>> {
        (1..=count as i64)
            .map(|n| {
                n.checked_mul(self.spacing)
                    .map(OrderKey::new)
                    .ok_or(DndError::KeySpaceExhausted {
                        lower: None,
                        upper: None,
                    })
            })
            .collect()
    }
}
