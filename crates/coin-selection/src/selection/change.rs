//! Change construction from a pre-balance excess.
//!
//! Given inputs that already cover the requested outputs, this module
//! decides the full content of every change output in four moves:
//!
//! 1. Compute the excess (inputs plus any extra coin, minus outputs).
//! 2. Distribute excess asset quantities over one change position per
//!    output: assets also present in the outputs are split proportionally
//!    to each output's holding; assets only present in the inputs keep
//!    their per-input concentrations via pad-coalesce.
//! 3. Charge the required cost against the excess coin, then give every
//!    change position the minimum coin its asset set demands.
//! 4. Distribute whatever coin is left proportionally to the target
//!    output coin values.
//!
//! # Determinism
//!
//! All distribution is driven by [`partition_natural`] and
//! [`pad_coalesce`], whose tie-breaks are fixed; no randomness enters here.
//!
//! # Failure modes
//!
//! Precondition breaks (outputs not covered by inputs, zero total output
//! coin, empty input or output lists) are programming errors and panic.
//! The only expected failure is `UnableToConstructChange`, carrying the
//! smallest additional coin that would have let construction succeed.

use crate::error::SelectionError;
use crate::numeric::{pad_coalesce, partition_natural};
use crate::value::{Coin, TokenBundle, TokenMap, TokenQuantity};

/// Construct one change bundle per target output.
///
/// On success the change list has the same length as `output_bundles`,
/// every bundle holds at least the minimum coin for its asset set, the
/// change total equals the excess minus `required_cost`, and change asset
/// identities are a subset of the input asset identities.
pub fn make_change<MinCoin>(
    min_coin_for: MinCoin,
    required_cost: Coin,
    extra_coin_source: Option<Coin>,
    input_bundles: &[TokenBundle],
    output_bundles: &[TokenBundle],
) -> Result<Vec<TokenBundle>, SelectionError>
where
    MinCoin: Fn(&TokenMap) -> Coin,
{
    assert!(
        !input_bundles.is_empty(),
        "change construction requires at least one input"
    );
    assert!(
        !output_bundles.is_empty(),
        "change construction requires at least one output"
    );

    let extra = TokenBundle::from_coin(extra_coin_source.unwrap_or(Coin::ZERO));
    let total_input = TokenBundle::sum(input_bundles).add(&extra);
    let total_output = TokenBundle::sum(output_bundles);
    assert!(
        total_output.is_bounded_by(&total_input),
        "change construction requires outputs ({total_output}) covered by inputs ({total_input})"
    );
    assert!(
        !total_output.coin().is_zero(),
        "change construction requires a positive total output coin"
    );

    let excess = total_input.sub_unchecked(&total_output);
    let change_maps = distribute_excess_assets(&excess, input_bundles, output_bundles);

    let Some(mut remaining) = excess.coin().checked_sub(required_cost) else {
        return Err(SelectionError::UnableToConstructChange {
            missing: required_cost
                .checked_sub(excess.coin())
                .expect("required cost exceeds the excess coin"),
        });
    };

    let minimums: Vec<Coin> = change_maps.iter().map(&min_coin_for).collect();
    for (position, minimum) in minimums.iter().enumerate() {
        match remaining.checked_sub(*minimum) {
            Some(rest) => remaining = rest,
            None => {
                let mut missing = minimum
                    .checked_sub(remaining)
                    .expect("minimum exceeds the remaining coin");
                for later in &minimums[position + 1..] {
                    missing += *later;
                }
                return Err(SelectionError::UnableToConstructChange { missing });
            }
        }
    }

    let weights: Vec<u64> = output_bundles
        .iter()
        .map(|bundle| bundle.coin().0)
        .collect();
    let leftover_shares = partition_natural(remaining.0, &weights)
        .expect("total output coin is positive by precondition");

    Ok(change_maps
        .into_iter()
        .zip(minimums)
        .zip(leftover_shares)
        .map(|((map, minimum), share)| TokenBundle::new(minimum + Coin(share), map))
        .collect())
}

/// Split the excess asset quantities into one token map per change
/// position.
///
/// An asset held by any output is distributed proportionally to the
/// outputs' holdings of it; an asset held only by inputs keeps the list of
/// its per-input quantities, pad-coalesced to the position count so the
/// largest concentrations land in the fewest positions.
fn distribute_excess_assets(
    excess: &TokenBundle,
    input_bundles: &[TokenBundle],
    output_bundles: &[TokenBundle],
) -> Vec<TokenMap> {
    let position_count = output_bundles.len();
    let mut change_maps = vec![TokenMap::empty(); position_count];

    for (asset, quantity) in excess.tokens().iter() {
        let weights: Vec<u64> = output_bundles
            .iter()
            .map(|bundle| bundle.tokens().quantity(asset).0)
            .collect();

        let shares = match partition_natural(quantity.0, &weights) {
            Some(shares) => shares,
            None => {
                // Absent from every output: preserve per-input quantities.
                let concentrations: Vec<u64> = input_bundles
                    .iter()
                    .map(|bundle| bundle.tokens().quantity(asset).0)
                    .filter(|held| *held > 0)
                    .collect();
                pad_coalesce(&concentrations, position_count)
            }
        };

        for (map, share) in change_maps.iter_mut().zip(shares) {
            map.insert_add(asset.clone(), TokenQuantity(share));
        }
    }

    change_maps
}
