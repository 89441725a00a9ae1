//! Wallet migration planning.
//!
//! With no explicit payment targets, migration converts an entire wallet
//! into a minimal sequence of valid self-paying transactions. The flow has
//! two stages:
//!
//! 1. Categorise every entry by whether it can pay its own way: an entry
//!    funds a standalone selection (supporter), carries value but cannot
//!    cover its costs alone (freerider), or is worth no more than the
//!    marginal fee of spending it (ignorable).
//! 2. Seed one selection per supporter and greedily pack freeriders into
//!    it, pulling in further supporters whenever the coin runs short,
//!    until the selection is full or nothing more fits.
//!
//! The planner never fails: entries that cannot be packed are returned in
//! the unselected categorisation, and any per-attempt selection error ends
//! planning with the selections accumulated so far.
//!
//! # Determinism
//!
//! Categorisation preserves the input order and the plan loop consumes
//! entries front-first, so plans are fully deterministic.

pub mod selection;

pub use selection::{Selection, SelectionCorrectness};

use crate::constraints::TxConstraints;
use crate::error::SelectionError;
use crate::tx::UtxoRef;
use crate::value::{Coin, TokenBundle};
use std::collections::VecDeque;
use tracing::debug;

/// Migration role of one UTxO entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtxoCategory {
    /// Can pay for its own input cost plus the base transaction cost.
    Supporter,
    /// Carries value but must be bundled with a supporter.
    Freerider,
    /// Worth no more than the marginal fee of spending it.
    Ignorable,
}

/// The wallet UTxO partitioned by migration role, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorizedUtxos {
    pub supporters: Vec<(UtxoRef, TokenBundle)>,
    pub freeriders: Vec<(UtxoRef, TokenBundle)>,
    pub ignorables: Vec<(UtxoRef, TokenBundle)>,
}

impl CategorizedUtxos {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.supporters.is_empty() && self.freeriders.is_empty() && self.ignorables.is_empty()
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.supporters.len() + self.freeriders.len() + self.ignorables.len()
    }

    /// Flatten back into one entry list (supporters, then freeriders, then
    /// ignorables). Equal to the source UTxO as a multiset.
    #[must_use]
    pub fn uncategorize(self) -> Vec<(UtxoRef, TokenBundle)> {
        let mut entries = self.supporters;
        entries.extend(self.freeriders);
        entries.extend(self.ignorables);
        entries
    }
}

/// Decide the migration role of one bundle.
pub fn categorize_entry<C: TxConstraints>(constraints: &C, bundle: &TokenBundle) -> UtxoCategory {
    if bundle.is_coin_only() && bundle.coin() <= constraints.input_cost() {
        return UtxoCategory::Ignorable;
    }

    let probe = UtxoRef::new([0; 32], 0);
    match Selection::create(constraints, Coin::ZERO, vec![(probe, bundle.clone())]) {
        Ok(_) => UtxoCategory::Supporter,
        Err(_) => UtxoCategory::Freerider,
    }
}

/// Categorise a wallet snapshot, preserving entry order within each
/// category.
pub fn categorize_utxos<C, I>(constraints: &C, entries: I) -> CategorizedUtxos
where
    C: TxConstraints,
    I: IntoIterator<Item = (UtxoRef, TokenBundle)>,
{
    let mut categorized = CategorizedUtxos::default();
    for (entry, bundle) in entries {
        match categorize_entry(constraints, &bundle) {
            UtxoCategory::Supporter => categorized.supporters.push((entry, bundle)),
            UtxoCategory::Freerider => categorized.freeriders.push((entry, bundle)),
            UtxoCategory::Ignorable => categorized.ignorables.push((entry, bundle)),
        }
    }
    categorized
}

/// An ordered list of selections that together drain a wallet, plus
/// whatever could not be packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    pub selections: Vec<Selection>,
    pub unselected: CategorizedUtxos,
    pub total_fee: Coin,
}

/// Build a migration plan over a categorised wallet.
///
/// `reward_withdrawal` is consumed by the first selection created; every
/// later selection carries a zero withdrawal.
pub fn create_plan<C: TxConstraints>(
    constraints: &C,
    categorized: CategorizedUtxos,
    reward_withdrawal: Coin,
) -> MigrationPlan {
    let CategorizedUtxos {
        supporters,
        freeriders,
        ignorables,
    } = categorized;
    let mut supporters = VecDeque::from(supporters);
    let mut freeriders = VecDeque::from(freeriders);
    let mut selections: Vec<Selection> = Vec::new();
    let mut pending_withdrawal = reward_withdrawal;

    while let Some(seed) = supporters.pop_front() {
        let withdrawal = std::mem::take(&mut pending_withdrawal);
        let mut selection =
            match Selection::create(constraints, withdrawal, vec![seed.clone()]) {
                Ok(selection) => selection,
                Err(error) => {
                    debug!(%error, "seed selection failed; ending the plan");
                    pending_withdrawal = withdrawal;
                    supporters.push_front(seed);
                    break;
                }
            };

        extend_selection(constraints, &mut selection, &mut supporters, &mut freeriders);
        debug!(
            inputs = selection.inputs.len(),
            fee = %selection.fee,
            "selection added to the plan"
        );
        selections.push(selection);
    }

    let total_fee = selections.iter().map(|selection| selection.fee).sum();
    MigrationPlan {
        selections,
        unselected: CategorizedUtxos {
            supporters: supporters.into(),
            freeriders: freeriders.into(),
            ignorables,
        },
        total_fee,
    }
}

/// Pack freeriders into `selection` until nothing more fits. A freerider
/// that fails for lack of coin (or an empty freerider queue) pulls in the
/// next supporter; packing resumes while that succeeds and stops once the
/// selection is full or both queues stall.
fn extend_selection<C: TxConstraints>(
    constraints: &C,
    selection: &mut Selection,
    supporters: &mut VecDeque<(UtxoRef, TokenBundle)>,
    freeriders: &mut VecDeque<(UtxoRef, TokenBundle)>,
) {
    loop {
        let Some(freerider) = freeriders.front().cloned() else {
            if extend_with_supporter(constraints, selection, supporters) {
                continue;
            }
            return;
        };

        match Selection::extend(constraints, selection, freerider) {
            Ok(extended) => {
                *selection = extended;
                freeriders.pop_front();
            }
            Err(SelectionError::SelectionFull { .. }) => return,
            Err(_) => {
                if !extend_with_supporter(constraints, selection, supporters) {
                    return;
                }
            }
        }
    }
}

fn extend_with_supporter<C: TxConstraints>(
    constraints: &C,
    selection: &mut Selection,
    supporters: &mut VecDeque<(UtxoRef, TokenBundle)>,
) -> bool {
    let Some(supporter) = supporters.front().cloned() else {
        return false;
    };
    match Selection::extend(constraints, selection, supporter) {
        Ok(extended) => {
            *selection = extended;
            supporters.pop_front();
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_setup::{coin_bundle, entry, single_asset_bundle, LinearConstraints};

    fn categorize_fixture(constraints: &LinearConstraints) -> CategorizedUtxos {
        categorize_utxos(
            constraints,
            vec![
                (entry(1), coin_bundle(1)),
                (entry(2), coin_bundle(2)),
                (entry(3), coin_bundle(10)),
                (entry(4), single_asset_bundle(1, 7, 5)),
            ],
        )
    }

    fn s5_constraints() -> LinearConstraints {
        LinearConstraints {
            min_coin_base: 2,
            ..LinearConstraints::default()
        }
    }

    #[test]
    fn entries_fall_into_the_expected_categories() {
        let constraints = s5_constraints();
        assert_eq!(
            categorize_entry(&constraints, &coin_bundle(1)),
            UtxoCategory::Ignorable
        );
        assert_eq!(
            categorize_entry(&constraints, &coin_bundle(2)),
            UtxoCategory::Freerider
        );
        assert_eq!(
            categorize_entry(&constraints, &coin_bundle(10)),
            UtxoCategory::Supporter
        );
    }

    #[test]
    fn asset_entries_are_never_ignorable() {
        let constraints = s5_constraints();
        assert_eq!(
            categorize_entry(&constraints, &single_asset_bundle(1, 7, 5)),
            UtxoCategory::Freerider
        );
    }

    #[test]
    fn categorisation_partitions_the_source() {
        let constraints = s5_constraints();
        let categorized = categorize_fixture(&constraints);
        assert_eq!(categorized.supporters, vec![(entry(3), coin_bundle(10))]);
        assert_eq!(categorized.ignorables, vec![(entry(1), coin_bundle(1))]);
        assert_eq!(categorized.entry_count(), 4);

        let mut entries = categorized.uncategorize();
        entries.sort_by_key(|(reference, _)| *reference);
        assert_eq!(entries.len(), 4);
        assert!(entries.iter().any(|(reference, _)| *reference == entry(4)));
    }

    #[test]
    fn two_supporters_share_one_selection() {
        let constraints = LinearConstraints::default();
        let categorized = categorize_utxos(
            &constraints,
            vec![
                (entry(1), coin_bundle(10)),
                (entry(2), coin_bundle(10)),
            ],
        );
        let plan = create_plan(&constraints, categorized, Coin::ZERO);

        assert_eq!(plan.selections.len(), 1);
        let selection = &plan.selections[0];
        assert_eq!(selection.inputs.len(), 2);
        assert_eq!(selection.outputs.len(), 1);
        let paid_out: Coin = selection.outputs.iter().map(TokenBundle::coin).sum();
        assert_eq!(paid_out + selection.fee, Coin(20));
        assert_eq!(plan.total_fee, selection.fee);
        assert!(plan.unselected.is_empty());
    }

    #[test]
    fn freeriders_ride_along_with_a_supporter() {
        let constraints = s5_constraints();
        let plan = create_plan(&constraints, categorize_fixture(&constraints), Coin::ZERO);

        assert_eq!(plan.selections.len(), 1);
        let selection = &plan.selections[0];
        // The supporter, the small coin entry and the asset entry all fit.
        assert_eq!(selection.inputs.len(), 3);
        assert!(plan.unselected.supporters.is_empty());
        assert!(plan.unselected.freeriders.is_empty());
        assert_eq!(plan.unselected.ignorables.len(), 1);
    }

    #[test]
    fn freeriders_without_a_supporter_stay_unselected() {
        let constraints = s5_constraints();
        let categorized = categorize_utxos(&constraints, vec![(entry(1), coin_bundle(2))]);
        let plan = create_plan(&constraints, categorized, Coin::ZERO);

        assert!(plan.selections.is_empty());
        assert_eq!(plan.total_fee, Coin::ZERO);
        assert_eq!(plan.unselected.freeriders.len(), 1);
    }

    #[test]
    fn withdrawal_reaches_only_the_first_selection() {
        let constraints = LinearConstraints {
            base_size: 10,
            input_size: 40,
            max_tx_size: 60,
            ..LinearConstraints::default()
        };
        // The size cap admits one input per selection, forcing two
        // selections.
        let categorized = categorize_utxos(
            &constraints,
            vec![
                (entry(1), coin_bundle(10)),
                (entry(2), coin_bundle(10)),
            ],
        );
        let plan = create_plan(&constraints, categorized, Coin(5));

        assert_eq!(plan.selections.len(), 2);
        assert_eq!(plan.selections[0].reward_withdrawal, Coin(5));
        assert_eq!(plan.selections[1].reward_withdrawal, Coin::ZERO);
        assert_eq!(
            plan.total_fee,
            plan.selections[0].fee + plan.selections[1].fee
        );
    }
}
