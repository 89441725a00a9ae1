//! One migration transaction under construction.
//!
//! A migration selection owns a set of inputs and pays their whole balance
//! back out, so its outputs are computed rather than requested: the
//! combined balance is split into token maps that respect the per-output
//! quantity and size bounds, every map is given its minimum coin, and the
//! coin left over after costs is pushed back into the outputs by the fee
//! minimisation pass. Rebalancing from scratch on every extension keeps
//! the arithmetic simple and the result independent of extension order
//! history.
//!
//! # Cost model assumption
//!
//! Fee minimisation grows only the coin component of outputs, so it prices
//! increments through `output_coin_cost`. Constraint implementations must
//! keep the coin contribution of `output_cost` consistent with
//! `output_coin_cost` increments.

use crate::constraints::TxConstraints;
use crate::error::SelectionError;
use crate::numeric::partition_natural;
use crate::tx::UtxoRef;
use crate::value::{Coin, TokenBundle, TokenMap, TokenQuantity};

/// A self-paying transaction in the abstract: inputs consumed, their value
/// re-emitted as outputs, fee paid out of the difference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Entries consumed, in the order they were added.
    pub inputs: Vec<(UtxoRef, TokenBundle)>,
    /// Combined balance of `inputs` (excluding the reward withdrawal).
    pub input_balance: TokenBundle,
    /// Value paid back out; always non-empty.
    pub outputs: Vec<TokenBundle>,
    /// Coin paid as fee; covers the computed cost plus `fee_excess`.
    pub fee: Coin,
    /// Overpayment above the computed cost that fee minimisation could not
    /// push back into the outputs.
    pub fee_excess: Coin,
    /// Encoded size of the whole selection.
    pub size: u64,
    pub reward_withdrawal: Coin,
}

impl Selection {
    /// Build a selection around `inputs`, paying their combined balance
    /// (plus `reward_withdrawal`) back out.
    ///
    /// Fails with `BalanceInsufficient` when the coin cannot cover the
    /// transaction cost plus every output's minimum coin, and with
    /// `SelectionFull` when the result would not fit the maximum
    /// transaction size.
    ///
    /// # Panics
    ///
    /// Panics when `inputs` is empty.
    pub fn create<C: TxConstraints>(
        constraints: &C,
        reward_withdrawal: Coin,
        inputs: Vec<(UtxoRef, TokenBundle)>,
    ) -> Result<Self, SelectionError> {
        assert!(!inputs.is_empty(), "a selection requires at least one input");

        let input_balance = TokenBundle::sum(inputs.iter().map(|(_, bundle)| bundle));
        let available = input_balance.add(&TokenBundle::from_coin(reward_withdrawal));

        let output_maps = make_output_maps(constraints, &available);
        let minimums: Vec<Coin> = output_maps
            .iter()
            .map(|map| constraints.min_coin_value(map))
            .collect();
        let mut outputs: Vec<TokenBundle> = output_maps
            .into_iter()
            .zip(&minimums)
            .map(|(map, minimum)| TokenBundle::new(*minimum, map))
            .collect();

        let cost = compute_cost(constraints, inputs.len(), reward_withdrawal, &outputs);
        let required = minimums.iter().copied().sum::<Coin>() + cost;
        let Some(fee_excess) = available.coin().checked_sub(required) else {
            return Err(SelectionError::BalanceInsufficient {
                required: TokenBundle::new(required, available.tokens().clone()),
                available,
            });
        };

        let fee_excess = minimize_fee(constraints, fee_excess, &mut outputs);
        let paid_out: Coin = outputs.iter().map(TokenBundle::coin).sum();
        let fee = available
            .coin()
            .checked_sub(paid_out)
            .expect("outputs never exceed the available coin");
        debug_assert_eq!(
            fee,
            compute_cost(constraints, inputs.len(), reward_withdrawal, &outputs) + fee_excess,
            "fee must equal the computed cost plus the fee excess"
        );

        let size = compute_size(constraints, inputs.len(), reward_withdrawal, &outputs);
        if size > constraints.max_tx_size() {
            return Err(SelectionError::SelectionFull {
                required_size: size,
                maximum_size: constraints.max_tx_size(),
            });
        }

        Ok(Self {
            inputs,
            input_balance,
            outputs,
            fee,
            fee_excess,
            size,
            reward_withdrawal,
        })
    }

    /// Rebuild the selection with one more input.
    pub fn extend<C: TxConstraints>(
        constraints: &C,
        selection: &Self,
        input: (UtxoRef, TokenBundle),
    ) -> Result<Self, SelectionError> {
        let mut inputs = selection.inputs.clone();
        inputs.push(input);
        Self::create(constraints, selection.reward_withdrawal, inputs)
    }

    /// Verify every invariant a finalised selection must satisfy,
    /// reporting the first violation found.
    pub fn check<C: TxConstraints>(constraints: &C, selection: &Self) -> SelectionCorrectness {
        let output_tokens = selection
            .outputs
            .iter()
            .fold(TokenMap::empty(), |total, output| total.add(output.tokens()));
        if &output_tokens != selection.input_balance.tokens() {
            return SelectionCorrectness::AssetBalanceIncorrect;
        }

        let paid_out: Coin = selection.outputs.iter().map(TokenBundle::coin).sum();
        if selection.input_balance.coin() + selection.reward_withdrawal
            != paid_out + selection.fee
        {
            return SelectionCorrectness::CoinBalanceIncorrect;
        }

        let cost = compute_cost(
            constraints,
            selection.inputs.len(),
            selection.reward_withdrawal,
            &selection.outputs,
        );
        if selection.fee < cost {
            return SelectionCorrectness::FeeBelowCost {
                fee: selection.fee,
                cost,
            };
        }

        for (position, output) in selection.outputs.iter().enumerate() {
            let minimum = constraints.min_coin_value(output.tokens());
            if output.coin() < minimum {
                return SelectionCorrectness::OutputBelowMinimumCoin {
                    position,
                    coin: output.coin(),
                    minimum,
                };
            }
            if !constraints.output_has_valid_size(output) {
                return SelectionCorrectness::OutputSizeExceedsLimit {
                    position,
                    size: constraints.output_size(output),
                    limit: constraints.max_output_size(),
                };
            }
            if !constraints.output_has_valid_token_quantities(output.tokens()) {
                return SelectionCorrectness::OutputTokenQuantityExceedsLimit { position };
            }
        }

        let size = compute_size(
            constraints,
            selection.inputs.len(),
            selection.reward_withdrawal,
            &selection.outputs,
        );
        if size > constraints.max_tx_size() {
            return SelectionCorrectness::SizeExceedsLimit {
                size,
                limit: constraints.max_tx_size(),
            };
        }

        SelectionCorrectness::Correct
    }
}

/// Outcome of [`Selection::check`]: either every invariant holds, or the
/// first violation found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionCorrectness {
    Correct,
    /// Output token quantities do not add up to the input token balance.
    AssetBalanceIncorrect,
    /// Input coin plus withdrawal does not equal outputs plus fee.
    CoinBalanceIncorrect,
    FeeBelowCost {
        fee: Coin,
        cost: Coin,
    },
    OutputBelowMinimumCoin {
        position: usize,
        coin: Coin,
        minimum: Coin,
    },
    OutputSizeExceedsLimit {
        position: usize,
        size: u64,
        limit: u64,
    },
    OutputTokenQuantityExceedsLimit {
        position: usize,
    },
    SizeExceedsLimit {
        size: u64,
        limit: u64,
    },
}

/// Split the available balance into token maps that each fit one output.
///
/// Quantities above the per-output bound are equipartitioned first; maps
/// whose probe bundle (carrying the whole available coin, the worst case
/// after fee minimisation) would exceed the output size bound are then
/// bisected by asset count. A coin-only balance yields a single empty map.
fn make_output_maps<C: TxConstraints>(constraints: &C, available: &TokenBundle) -> Vec<TokenMap> {
    let mut maps = Vec::new();
    for map in split_map_with_quantity_bound(available.tokens(), constraints.max_asset_quantity()) {
        split_map_to_fit_size(constraints, available.coin(), map, &mut maps);
    }
    maps
}

fn split_map_with_quantity_bound(tokens: &TokenMap, bound: TokenQuantity) -> Vec<TokenMap> {
    if tokens.is_empty() {
        return vec![TokenMap::empty()];
    }
    assert!(
        !bound.is_zero(),
        "a zero asset quantity bound admits no outputs at all"
    );

    let parts = tokens
        .iter()
        .map(|(_, quantity)| quantity.0.div_ceil(bound.0))
        .max()
        .unwrap_or(1)
        .max(1);
    if parts <= 1 {
        return vec![tokens.clone()];
    }

    let weights = vec![1u64; usize::try_from(parts).expect("part count fits a usize")];
    let mut maps = vec![TokenMap::empty(); weights.len()];
    for (asset, quantity) in tokens.iter() {
        let shares = partition_natural(quantity.0, &weights).expect("equal positive weights");
        for (map, share) in maps.iter_mut().zip(shares) {
            map.insert_add(asset.clone(), TokenQuantity(share));
        }
    }
    maps
}

fn split_map_to_fit_size<C: TxConstraints>(
    constraints: &C,
    coin_ceiling: Coin,
    map: TokenMap,
    out: &mut Vec<TokenMap>,
) {
    let probe = TokenBundle::new(coin_ceiling, map.clone());
    if constraints.output_has_valid_size(&probe) || map.asset_count() <= 1 {
        out.push(map);
        return;
    }

    let half = map.asset_count() / 2;
    let mut first = TokenMap::empty();
    let mut second = TokenMap::empty();
    for (index, (asset, quantity)) in map.iter().enumerate() {
        if index < half {
            first.insert_add(asset.clone(), quantity);
        } else {
            second.insert_add(asset.clone(), quantity);
        }
    }
    split_map_to_fit_size(constraints, coin_ceiling, first, out);
    split_map_to_fit_size(constraints, coin_ceiling, second, out);
}

fn compute_cost<C: TxConstraints>(
    constraints: &C,
    input_count: usize,
    reward_withdrawal: Coin,
    outputs: &[TokenBundle],
) -> Coin {
    let input_cost = Coin(
        constraints
            .input_cost()
            .0
            .checked_mul(input_count as u64)
            .expect("input cost overflow"),
    );
    outputs.iter().fold(
        constraints.base_cost()
            + input_cost
            + constraints.reward_withdrawal_cost(reward_withdrawal),
        |cost, output| cost + constraints.output_cost(output),
    )
}

fn compute_size<C: TxConstraints>(
    constraints: &C,
    input_count: usize,
    reward_withdrawal: Coin,
    outputs: &[TokenBundle],
) -> u64 {
    let input_size = constraints
        .input_size()
        .checked_mul(input_count as u64)
        .expect("input size overflow");
    outputs.iter().fold(
        constraints.base_size()
            + input_size
            + constraints.reward_withdrawal_size(reward_withdrawal),
        |size, output| size + constraints.output_size(output),
    )
}

/// Push as much of the fee excess as possible back into the output coins,
/// walking outputs in order. Each step either strictly reduces the excess
/// or halts, so the pass terminates.
fn minimize_fee<C: TxConstraints>(
    constraints: &C,
    mut fee_excess: Coin,
    outputs: &mut [TokenBundle],
) -> Coin {
    for output in outputs.iter_mut() {
        fee_excess = minimize_fee_step(constraints, fee_excess, output);
        if fee_excess.is_zero() {
            break;
        }
    }
    fee_excess
}

fn minimize_fee_step<C: TxConstraints>(
    constraints: &C,
    mut fee_excess: Coin,
    output: &mut TokenBundle,
) -> Coin {
    loop {
        if fee_excess.is_zero() {
            return fee_excess;
        }

        let coin = output.coin();
        let cost_now = constraints.output_coin_cost(coin);
        let cost_increase_bound = constraints
            .output_coin_cost(coin + fee_excess)
            .checked_sub(cost_now)
            .expect("output coin cost is monotone");
        // The increment the excess can fund after paying for its own cost
        // increase.
        let Some(addition) = fee_excess.checked_sub(cost_increase_bound) else {
            return fee_excess;
        };
        if addition.is_zero() {
            return fee_excess;
        }

        let raised = coin + addition;
        let actual_increase = constraints
            .output_coin_cost(raised)
            .checked_sub(cost_now)
            .expect("output coin cost is monotone");
        output.set_coin(raised);
        fee_excess = fee_excess
            .checked_sub(addition + actual_increase)
            .expect("the funded increment never exceeds the excess");
    }
}
