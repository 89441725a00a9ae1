//! Random round-robin coin selection.
//!
//! This module funds a non-empty list of payment targets from an owned
//! UTxO index in four phases:
//!
//! 1. Balance checks: reject requests the available balance cannot cover
//!    and targets below their minimum coin values.
//! 2. Random round-robin: one selection lens per required asset plus one
//!    for the coin dimension, each drawing uniformly from the entries that
//!    can still improve it. Past its minimum, a lens only keeps draws that
//!    move it strictly closer to twice the minimum, which keeps selected
//!    totals close to (but never below) what is required and limits change
//!    fragmentation.
//! 3. Change-shape prediction with zero cost and zero minimum coin, which
//!    pins down the change position count and per-position asset sets.
//! 4. Fee settlement: price the skeleton through the caller's cost
//!    function and construct the real change; on a shortfall, draw one
//!    more coin-only entry and repeat until success or exhaustion.
//!
//! # Determinism
//!
//! The caller's random source is the only source of nondeterminism: two
//! runs with the same seed, inputs and constraints produce identical
//! selections. Lens rotation order is fixed (assets ascending, coin last).

pub mod change;

pub use change::make_change;

use crate::error::{MinCoinViolation, SelectionError};
use crate::index::{SelectionFilter, UtxoIndex};
use crate::tx::{TxOut, UtxoRef};
use crate::value::{AssetId, Coin, TokenBundle, TokenMap};
use rand::RngCore;
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Cap on the number of inputs one selection may consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionLimit {
    NoLimit,
    MaxInputs(usize),
}

impl SelectionLimit {
    fn is_reached(self, selected_count: usize) -> bool {
        match self {
            Self::NoLimit => false,
            Self::MaxInputs(limit) => selected_count >= limit,
        }
    }
}

/// Everything a selection run needs from its caller.
#[derive(Debug, Clone)]
pub struct SelectionCriteria {
    /// Payment targets to fund; must be non-empty with a positive total
    /// coin.
    pub outputs_to_cover: Vec<TxOut>,
    /// Entries available for spending; consumed by the run and returned
    /// inside the result as the remaining index.
    pub utxo_available: UtxoIndex,
    pub selection_limit: SelectionLimit,
    /// Coin available without consuming an entry, e.g. a reward
    /// withdrawal.
    pub extra_coin_source: Option<Coin>,
}

/// The shape of a selection before change quantities are settled: enough
/// for a caller to price it, nothing more.
#[derive(Debug)]
pub struct SelectionSkeleton<'a> {
    pub input_count: usize,
    pub outputs: &'a [TxOut],
    pub change: &'a [BTreeSet<AssetId>],
}

/// A funded transaction in the abstract, plus the entries left unspent.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    pub inputs: Vec<(UtxoRef, TokenBundle)>,
    pub outputs: Vec<TxOut>,
    pub change: Vec<TokenBundle>,
    pub fee: Coin,
    pub reward_withdrawal: Coin,
    pub utxo_remaining: UtxoIndex,
}

/// Working state of one selection run: entries move from `leftover` to
/// `selected` and never anywhere else.
struct SelectionState {
    selected: Vec<(UtxoRef, TokenBundle)>,
    selected_balance: TokenBundle,
    leftover: UtxoIndex,
    limit: SelectionLimit,
}

impl SelectionState {
    fn try_draw(&mut self, rng: &mut dyn RngCore, filters: &[SelectionFilter<'_>]) -> bool {
        if self.limit.is_reached(self.selected.len()) {
            return false;
        }
        match self.leftover.select_random_with_priority(rng, filters) {
            Some((entry, bundle)) => {
                self.selected_balance = self.selected_balance.add(&bundle);
                self.selected.push((entry, bundle));
                true
            }
            None => false,
        }
    }

    fn undo_last_draw(&mut self) {
        let (entry, bundle) = self.selected.pop().expect("a draw to undo");
        self.selected_balance = self.selected_balance.sub_unchecked(&bundle);
        self.leftover.insert(entry, bundle);
    }
}

/// One dimension of the round-robin: the quantity it tracks, the quantity
/// it must reach, and a way to draw one more matching entry.
trait SelectionLens {
    fn current(&self, state: &SelectionState) -> u64;
    fn minimum(&self) -> u64;
    fn try_select_more(&self, state: &mut SelectionState, rng: &mut dyn RngCore) -> bool;
}

struct AssetLens {
    asset: AssetId,
    minimum: u64,
}

impl SelectionLens for AssetLens {
    fn current(&self, state: &SelectionState) -> u64 {
        state.selected_balance.tokens().quantity(&self.asset).0
    }

    fn minimum(&self) -> u64 {
        self.minimum
    }

    fn try_select_more(&self, state: &mut SelectionState, rng: &mut dyn RngCore) -> bool {
        state.try_draw(rng, &[SelectionFilter::WithAsset(&self.asset)])
    }
}

struct CoinLens {
    minimum: u64,
    extra: Coin,
}

impl SelectionLens for CoinLens {
    fn current(&self, state: &SelectionState) -> u64 {
        (state.selected_balance.coin() + self.extra).0
    }

    fn minimum(&self) -> u64 {
        self.minimum
    }

    fn try_select_more(&self, state: &mut SelectionState, rng: &mut dyn RngCore) -> bool {
        state.try_draw(rng, &[SelectionFilter::CoinOnly, SelectionFilter::Any])
    }
}

/// One lens step. Below the minimum every successful draw is accepted;
/// past it, a draw survives only when it moves the tracked quantity
/// strictly closer to twice the minimum. A rejected draw is returned to
/// the leftover index and the lens reports itself exhausted.
fn run_selection_step(
    lens: &dyn SelectionLens,
    state: &mut SelectionState,
    rng: &mut dyn RngCore,
) -> bool {
    let minimum = lens.minimum();
    let current = lens.current(state);
    if current < minimum {
        return lens.try_select_more(state, rng);
    }

    let target = minimum.saturating_mul(2);
    if !lens.try_select_more(state, rng) {
        return false;
    }
    let improved = lens.current(state);
    if improved.abs_diff(target) < current.abs_diff(target) {
        true
    } else {
        state.undo_last_draw();
        false
    }
}

/// Run every lens once per round, dropping lenses as their steps fail,
/// until none remain.
fn run_round_robin(
    state: &mut SelectionState,
    mut lenses: Vec<Box<dyn SelectionLens>>,
    rng: &mut dyn RngCore,
) {
    while !lenses.is_empty() {
        let mut survivors = Vec::with_capacity(lenses.len());
        for lens in lenses {
            if run_selection_step(lens.as_ref(), state, rng) {
                trace!(
                    current = lens.current(state),
                    minimum = lens.minimum(),
                    "lens step accepted"
                );
                survivors.push(lens);
            }
        }
        lenses = survivors;
    }
}

/// Fund `criteria.outputs_to_cover` from `criteria.utxo_available`.
///
/// `min_coin_for` prices the minimum coin an output with a given asset set
/// must hold; `cost_for` prices a selection skeleton. Both are supplied by
/// the caller so the same algorithm drives any target protocol.
///
/// # Panics
///
/// Panics when `outputs_to_cover` is empty or its total coin is zero;
/// both are caller contract violations.
pub fn perform_selection<MinCoin, CostFor, R>(
    min_coin_for: MinCoin,
    cost_for: CostFor,
    criteria: SelectionCriteria,
    rng: &mut R,
) -> Result<SelectionResult, SelectionError>
where
    MinCoin: Fn(&TokenMap) -> Coin,
    CostFor: Fn(&SelectionSkeleton<'_>) -> Coin,
    R: RngCore,
{
    let SelectionCriteria {
        outputs_to_cover,
        utxo_available,
        selection_limit,
        extra_coin_source,
    } = criteria;
    assert!(
        !outputs_to_cover.is_empty(),
        "selection requires at least one output to cover"
    );

    let required = TokenBundle::sum(outputs_to_cover.iter().map(|output| &output.bundle));
    assert!(
        !required.coin().is_zero(),
        "outputs to cover must hold a positive total coin"
    );

    let extra = extra_coin_source.unwrap_or(Coin::ZERO);
    let available = utxo_available
        .balance()
        .add(&TokenBundle::from_coin(extra));
    if !required.is_bounded_by(&available) {
        return Err(SelectionError::BalanceInsufficient {
            available,
            required,
        });
    }

    let violations: Vec<MinCoinViolation> = outputs_to_cover
        .iter()
        .filter_map(|output| {
            let expected_minimum = min_coin_for(output.bundle.tokens());
            (output.bundle.coin() < expected_minimum).then(|| MinCoinViolation {
                output: output.clone(),
                expected_minimum,
            })
        })
        .collect();
    if !violations.is_empty() {
        return Err(SelectionError::InsufficientMinCoinValues { violations });
    }
    debug!(%required, %available, "balance checks passed");

    let rng: &mut dyn RngCore = rng;
    let mut state = SelectionState {
        selected: Vec::new(),
        selected_balance: TokenBundle::empty(),
        leftover: utxo_available,
        limit: selection_limit,
    };
    let mut lenses: Vec<Box<dyn SelectionLens>> = required
        .tokens()
        .iter()
        .map(|(asset, quantity)| {
            Box::new(AssetLens {
                asset: asset.clone(),
                minimum: quantity.0,
            }) as Box<dyn SelectionLens>
        })
        .collect();
    lenses.push(Box::new(CoinLens {
        minimum: required.coin().0,
        extra,
    }));
    run_round_robin(&mut state, lenses, rng);

    // A valid transaction spends at least one input, even when the extra
    // coin source alone covers the required balance.
    if state.selected.is_empty()
        && !state.try_draw(rng, &[SelectionFilter::CoinOnly, SelectionFilter::Any])
    {
        return Err(SelectionError::SelectionInsufficient {
            inputs_selected: Vec::new(),
            required,
        });
    }

    let achieved = state
        .selected_balance
        .add(&TokenBundle::from_coin(extra));
    if !required.is_bounded_by(&achieved) {
        return Err(SelectionError::SelectionInsufficient {
            inputs_selected: state.selected,
            required,
        });
    }
    debug!(inputs = state.selected.len(), "round-robin complete");

    let output_bundles: Vec<TokenBundle> = outputs_to_cover
        .iter()
        .map(|output| output.bundle.clone())
        .collect();
    loop {
        let input_bundles: Vec<TokenBundle> = state
            .selected
            .iter()
            .map(|(_, bundle)| bundle.clone())
            .collect();
        let predicted = make_change(
            |_| Coin::ZERO,
            Coin::ZERO,
            extra_coin_source,
            &input_bundles,
            &output_bundles,
        )
        .expect("change prediction with zero cost and zero minimum always succeeds");
        let change_sets: Vec<BTreeSet<AssetId>> = predicted
            .iter()
            .map(|bundle| bundle.tokens().assets().cloned().collect())
            .collect();

        let cost = cost_for(&SelectionSkeleton {
            input_count: state.selected.len(),
            outputs: &outputs_to_cover,
            change: &change_sets,
        });
        trace!(inputs = state.selected.len(), %cost, "constructing change");

        match make_change(
            &min_coin_for,
            cost,
            extra_coin_source,
            &input_bundles,
            &output_bundles,
        ) {
            Ok(change) => {
                debug_assert_eq!(
                    TokenBundle::sum(input_bundles.iter())
                        .add(&TokenBundle::from_coin(extra)),
                    TokenBundle::sum(output_bundles.iter())
                        .add(&TokenBundle::sum(change.iter()))
                        .add(&TokenBundle::from_coin(cost)),
                    "selection must preserve value"
                );
                debug_assert!(
                    change
                        .iter()
                        .zip(&change_sets)
                        .all(|(bundle, predicted_assets)| {
                            bundle.tokens().assets().cloned().collect::<BTreeSet<_>>()
                                == *predicted_assets
                        }),
                    "change asset sets must match the prediction"
                );
                return Ok(SelectionResult {
                    inputs: state.selected,
                    outputs: outputs_to_cover,
                    change,
                    fee: cost,
                    reward_withdrawal: extra,
                    utxo_remaining: state.leftover,
                });
            }
            Err(SelectionError::UnableToConstructChange { missing }) => {
                // One more coin-only entry may close the gap.
                if state.try_draw(rng, &[SelectionFilter::CoinOnly]) {
                    continue;
                }
                return Err(SelectionError::UnableToConstructChange { missing });
            }
            Err(other) => return Err(other),
        }
    }
}
