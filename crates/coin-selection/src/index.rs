//! Keyed multi-index over spendable UTxO entries.
//!
//! The index keeps one sampling bucket per filter dimension (coin-only
//! entries, entries per asset, and the whole universe) in sync on every
//! insert and remove, so a uniform random draw over any filter is O(1) once
//! the bucket is located.
//!
//! # Determinism
//!
//! Sampling consults only the caller's random source and the bucket's
//! insertion history, both of which are deterministic for a fixed seed and
//! a fixed operation sequence. Entry iteration is ordered by `UtxoRef`.

use crate::tx::UtxoRef;
use crate::value::{AssetId, TokenBundle};
use rand::Rng;
use std::collections::{BTreeMap, HashMap};

/// Restricts a random draw to a subset of the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionFilter<'a> {
    /// Entries whose bundle carries no native assets.
    CoinOnly,
    /// Entries whose bundle contains the given asset.
    WithAsset(&'a AssetId),
    /// Any entry.
    Any,
}

/// A set of entry references supporting O(1) uniform sampling and removal.
#[derive(Debug, Default, Clone)]
struct SampleBucket {
    members: Vec<UtxoRef>,
    positions: HashMap<UtxoRef, usize>,
}

impl SampleBucket {
    fn insert(&mut self, entry: UtxoRef) {
        if self.positions.contains_key(&entry) {
            return;
        }
        self.positions.insert(entry, self.members.len());
        self.members.push(entry);
    }

    fn remove(&mut self, entry: &UtxoRef) {
        let Some(position) = self.positions.remove(entry) else {
            return;
        };
        self.members.swap_remove(position);
        if let Some(moved) = self.members.get(position) {
            self.positions.insert(*moved, position);
        }
    }

    fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<UtxoRef> {
        if self.members.is_empty() {
            return None;
        }
        Some(self.members[rng.gen_range(0..self.members.len())])
    }
}

/// The set of available UTxO entries with filter-aware random selection.
#[derive(Debug, Default, Clone)]
pub struct UtxoIndex {
    entries: BTreeMap<UtxoRef, TokenBundle>,
    universe: SampleBucket,
    coin_only: SampleBucket,
    by_asset: HashMap<AssetId, SampleBucket>,
    balance: TokenBundle,
}

impl UtxoIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (UtxoRef, TokenBundle)>,
    {
        let mut index = Self::new();
        for (entry, bundle) in entries {
            index.insert(entry, bundle);
        }
        index
    }

    /// Insert an entry, replacing any previous bundle held under the same
    /// reference.
    pub fn insert(&mut self, entry: UtxoRef, bundle: TokenBundle) {
        self.remove(&entry);

        self.universe.insert(entry);
        if bundle.is_coin_only() {
            self.coin_only.insert(entry);
        }
        for asset in bundle.tokens().assets() {
            self.by_asset.entry(asset.clone()).or_default().insert(entry);
        }
        self.balance = self.balance.add(&bundle);
        self.entries.insert(entry, bundle);
    }

    /// Remove an entry, returning the bundle it held.
    pub fn remove(&mut self, entry: &UtxoRef) -> Option<TokenBundle> {
        let bundle = self.entries.remove(entry)?;

        self.universe.remove(entry);
        self.coin_only.remove(entry);
        for asset in bundle.tokens().assets() {
            if let Some(bucket) = self.by_asset.get_mut(asset) {
                bucket.remove(entry);
                if bucket.is_empty() {
                    self.by_asset.remove(asset);
                }
            }
        }
        self.balance = self.balance.sub_unchecked(&bundle);
        Some(bundle)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn contains(&self, entry: &UtxoRef) -> bool {
        self.entries.contains_key(entry)
    }

    #[must_use]
    pub fn get(&self, entry: &UtxoRef) -> Option<&TokenBundle> {
        self.entries.get(entry)
    }

    /// Aggregated balance across all entries, maintained incrementally.
    #[must_use]
    pub const fn balance(&self) -> &TokenBundle {
        &self.balance
    }

    pub fn iter(&self) -> impl Iterator<Item = (&UtxoRef, &TokenBundle)> {
        self.entries.iter()
    }

    /// Consume the index into its entries, ordered by reference.
    #[must_use]
    pub fn into_entries(self) -> Vec<(UtxoRef, TokenBundle)> {
        self.entries.into_iter().collect()
    }

    fn bucket(&self, filter: SelectionFilter<'_>) -> Option<&SampleBucket> {
        match filter {
            SelectionFilter::CoinOnly => Some(&self.coin_only),
            SelectionFilter::WithAsset(asset) => self.by_asset.get(asset),
            SelectionFilter::Any => Some(&self.universe),
        }
    }

    /// Draw one entry uniformly at random among those matching `filter`,
    /// removing it from the index.
    pub fn select_random<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        filter: SelectionFilter<'_>,
    ) -> Option<(UtxoRef, TokenBundle)> {
        let entry = self.bucket(filter)?.sample(rng)?;
        let bundle = self
            .remove(&entry)
            .expect("sampled entry is present in the index");
        Some((entry, bundle))
    }

    /// Try each filter in order and draw from the first one with a match.
    pub fn select_random_with_priority<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        filters: &[SelectionFilter<'_>],
    ) -> Option<(UtxoRef, TokenBundle)> {
        filters
            .iter()
            .find_map(|filter| self.select_random(rng, *filter))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::{AssetName, Coin, PolicyId, TokenMap, TokenQuantity};
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn entry(marker: u8) -> UtxoRef {
        UtxoRef::new([marker; 32], 0)
    }

    fn asset(marker: u8) -> AssetId {
        AssetId::new(PolicyId([marker; 28]), AssetName(vec![marker]))
    }

    fn asset_bundle(coin: u64, marker: u8, quantity: u64) -> TokenBundle {
        TokenBundle::new(
            Coin(coin),
            TokenMap::from_entries([(asset(marker), TokenQuantity(quantity))]),
        )
    }

    fn fixture() -> UtxoIndex {
        UtxoIndex::from_entries([
            (entry(1), TokenBundle::from_coin(Coin(10))),
            (entry(2), asset_bundle(5, 7, 3)),
            (entry(3), asset_bundle(2, 8, 1)),
        ])
    }

    #[test]
    fn balance_tracks_inserts_and_removes() {
        let mut index = fixture();
        assert_eq!(index.balance().coin(), Coin(17));

        index.remove(&entry(2));
        assert_eq!(index.balance().coin(), Coin(12));
        assert_eq!(
            index.balance().tokens().quantity(&asset(7)),
            TokenQuantity::ZERO
        );
    }

    #[test]
    fn insert_replaces_existing_entry() {
        let mut index = fixture();
        index.insert(entry(1), TokenBundle::from_coin(Coin(1)));
        assert_eq!(index.len(), 3);
        assert_eq!(index.balance().coin(), Coin(8));
    }

    #[test]
    fn coin_only_filter_excludes_asset_entries() {
        let mut index = fixture();
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let (drawn, bundle) = index
            .select_random(&mut rng, SelectionFilter::CoinOnly)
            .expect("one coin-only entry");
        assert_eq!(drawn, entry(1));
        assert!(bundle.is_coin_only());
        assert!(index
            .select_random(&mut rng, SelectionFilter::CoinOnly)
            .is_none());
    }

    #[test]
    fn asset_filter_matches_holders_only() {
        let mut index = fixture();
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let target = asset(7);
        let (drawn, _) = index
            .select_random(&mut rng, SelectionFilter::WithAsset(&target))
            .expect("one holder");
        assert_eq!(drawn, entry(2));
        assert!(index
            .select_random(&mut rng, SelectionFilter::WithAsset(&target))
            .is_none());
    }

    #[test]
    fn priority_list_falls_through_empty_buckets() {
        let mut index = UtxoIndex::from_entries([(entry(2), asset_bundle(5, 7, 3))]);
        let mut rng = ChaCha20Rng::seed_from_u64(0);
        let (drawn, _) = index
            .select_random_with_priority(
                &mut rng,
                &[SelectionFilter::CoinOnly, SelectionFilter::Any],
            )
            .expect("falls through to the universe");
        assert_eq!(drawn, entry(2));
    }

    #[test]
    fn draws_are_exhaustive_and_unique() {
        let mut index = fixture();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let mut seen = Vec::new();
        while let Some((drawn, _)) = index.select_random(&mut rng, SelectionFilter::Any) {
            seen.push(drawn);
        }
        seen.sort();
        assert_eq!(seen, vec![entry(1), entry(2), entry(3)]);
        assert!(index.is_empty());
        assert_eq!(index.balance(), &TokenBundle::empty());
    }
}
