//! Native-asset quantity maps.
//!
//! The representation invariant is that no entry ever holds quantity zero:
//! every constructor and mutator normalises zeros away, so emptiness checks
//! and asset-set views never need to filter.

use crate::value::{AssetId, TokenQuantity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A zero-free mapping from asset id to quantity.
///
/// Iteration order is ascending by `AssetId`, which keeps every consumer of
/// this type deterministic without further sorting.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<AssetId, TokenQuantity>")]
#[serde(into = "BTreeMap<AssetId, TokenQuantity>")]
pub struct TokenMap {
    entries: BTreeMap<AssetId, TokenQuantity>,
}

impl TokenMap {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Build a map from entries, adding duplicates and dropping zeros.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (AssetId, TokenQuantity)>,
    {
        let mut map = Self::empty();
        for (asset, quantity) in entries {
            map.insert_add(asset, quantity);
        }
        map
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct assets present.
    #[must_use]
    pub fn asset_count(&self) -> usize {
        self.entries.len()
    }

    /// Quantity held for `asset`; missing entries read as zero.
    #[must_use]
    pub fn quantity(&self, asset: &AssetId) -> TokenQuantity {
        self.entries.get(asset).copied().unwrap_or(TokenQuantity::ZERO)
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetId> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, TokenQuantity)> {
        self.entries.iter().map(|(asset, quantity)| (asset, *quantity))
    }

    /// Add `quantity` to the entry for `asset`, preserving the zero-free
    /// invariant.
    pub fn insert_add(&mut self, asset: AssetId, quantity: TokenQuantity) {
        if quantity.is_zero() {
            return;
        }
        let slot = self.entries.entry(asset).or_insert(TokenQuantity::ZERO);
        *slot = *slot + quantity;
    }

    /// Component-wise sum of two maps.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        let mut total = self.clone();
        for (asset, quantity) in other.iter() {
            total.insert_add(asset.clone(), quantity);
        }
        total
    }

    /// Component-wise difference, defined only when `other` is bounded by
    /// `self`.
    #[must_use]
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        let mut rest = self.entries.clone();
        for (asset, quantity) in other.iter() {
            let held = rest.get(asset).copied()?;
            let remaining = held.checked_sub(quantity)?;
            if remaining.is_zero() {
                rest.remove(asset);
            } else {
                rest.insert(asset.clone(), remaining);
            }
        }
        Some(Self { entries: rest })
    }

    /// Partial order: true iff every quantity in `self` is covered by
    /// `other`.
    #[must_use]
    pub fn is_bounded_by(&self, other: &Self) -> bool {
        self.iter()
            .all(|(asset, quantity)| quantity <= other.quantity(asset))
    }
}

impl From<BTreeMap<AssetId, TokenQuantity>> for TokenMap {
    fn from(entries: BTreeMap<AssetId, TokenQuantity>) -> Self {
        Self::from_entries(entries)
    }
}

impl From<TokenMap> for BTreeMap<AssetId, TokenQuantity> {
    fn from(map: TokenMap) -> Self {
        map.entries
    }
}
