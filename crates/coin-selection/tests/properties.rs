//! Property-based laws over selection, migration and the numeric helpers.

use coin_selection::test_setup::{address, asset, coin_bundle, entry, LinearConstraints};
use coin_selection::{
    categorize_entry, categorize_utxos, create_plan, numeric::partition_natural,
    perform_selection, Coin, Selection, SelectionCorrectness, SelectionCriteria, SelectionError,
    SelectionLimit, SelectionResult, TokenBundle, TokenMap, TokenQuantity, TxConstraints, TxOut,
    UtxoCategory, UtxoIndex, UtxoRef,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

fn arb_token_map() -> impl Strategy<Value = TokenMap> {
    prop::collection::vec((0u8..4, 1u64..=50), 0..=2).prop_map(|entries| {
        TokenMap::from_entries(
            entries
                .into_iter()
                .map(|(marker, quantity)| (asset(marker), TokenQuantity(quantity))),
        )
    })
}

/// A payment target that always satisfies its own minimum coin value under
/// the default linear constraints.
fn arb_output() -> impl Strategy<Value = TxOut> {
    (arb_token_map(), 0u64..=20).prop_map(|(map, padding)| {
        let minimum = LinearConstraints::default().min_coin_value(&map);
        TxOut::new(address(0), TokenBundle::new(minimum + Coin(padding), map))
    })
}

fn arb_wallet_bundle() -> impl Strategy<Value = TokenBundle> {
    (0u64..=30, arb_token_map())
        .prop_map(|(coin, map)| TokenBundle::new(Coin(coin), map))
}

/// Entries guaranteed to cover `outputs`, plus unrelated extras.
fn covering_entries(
    outputs: &[TxOut],
    extras: Vec<TokenBundle>,
    cover: u64,
) -> Vec<(UtxoRef, TokenBundle)> {
    let mut entries: Vec<(UtxoRef, TokenBundle)> = outputs
        .iter()
        .enumerate()
        .map(|(index, output)| {
            (
                entry(index as u8),
                output.bundle.add(&coin_bundle(cover)),
            )
        })
        .collect();
    entries.extend(
        extras
            .into_iter()
            .enumerate()
            .map(|(index, bundle)| (entry(100 + index as u8), bundle)),
    );
    entries
}

fn run_engine(
    constraints: &LinearConstraints,
    outputs: Vec<TxOut>,
    entries: Vec<(UtxoRef, TokenBundle)>,
    seed: u64,
) -> Result<SelectionResult, SelectionError> {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    perform_selection(
        constraints.min_coin_fn(),
        constraints.skeleton_cost_fn(),
        SelectionCriteria {
            outputs_to_cover: outputs,
            utxo_available: UtxoIndex::from_entries(entries),
            selection_limit: SelectionLimit::NoLimit,
            extra_coin_source: None,
        },
        &mut rng,
    )
}

proptest! {
    // Balance preservation, change validity, change shape and the change
    // asset-subset law, over every successful selection.
    #[test]
    fn successful_selections_balance_and_emit_valid_change(
        outputs in prop::collection::vec(arb_output(), 1..=3),
        extras in prop::collection::vec(arb_wallet_bundle(), 0..=3),
        cover in 5u64..=60,
        seed in any::<u64>(),
    ) {
        let constraints = LinearConstraints::default();
        let entries = covering_entries(&outputs, extras, cover);
        match run_engine(&constraints, outputs.clone(), entries, seed) {
            Ok(result) => {
                let inputs_total =
                    TokenBundle::sum(result.inputs.iter().map(|(_, bundle)| bundle))
                        .add(&TokenBundle::from_coin(result.reward_withdrawal));
                let spent_total =
                    TokenBundle::sum(result.outputs.iter().map(|output| &output.bundle))
                        .add(&TokenBundle::sum(result.change.iter()))
                        .add(&TokenBundle::from_coin(result.fee));
                prop_assert_eq!(inputs_total.clone(), spent_total);

                prop_assert_eq!(result.change.len(), outputs.len());
                for change in &result.change {
                    prop_assert!(change.coin() >= constraints.min_coin_value(change.tokens()));
                    prop_assert!(constraints.output_has_valid_size(change));
                    prop_assert!(
                        constraints.output_has_valid_token_quantities(change.tokens())
                    );
                    prop_assert!(
                        change.tokens().is_bounded_by(inputs_total.tokens()),
                        "change assets must come from the inputs"
                    );
                }
            }
            Err(SelectionError::UnableToConstructChange { .. }) => {}
            Err(error) => prop_assert!(false, "unexpected selection error: {error}"),
        }
    }

    // Identical seeds produce identical selections.
    #[test]
    fn selection_is_deterministic_for_a_fixed_seed(
        outputs in prop::collection::vec(arb_output(), 1..=3),
        extras in prop::collection::vec(arb_wallet_bundle(), 0..=3),
        cover in 5u64..=60,
        seed in any::<u64>(),
    ) {
        let constraints = LinearConstraints::default();
        let entries = covering_entries(&outputs, extras, cover);
        let first = run_engine(&constraints, outputs.clone(), entries.clone(), seed);
        let second = run_engine(&constraints, outputs, entries, seed);
        match (first, second) {
            (Ok(a), Ok(b)) => {
                prop_assert_eq!(a.inputs, b.inputs);
                prop_assert_eq!(a.change, b.change);
                prop_assert_eq!(a.fee, b.fee);
            }
            (Err(a), Err(b)) => prop_assert_eq!(a, b),
            (a, b) => prop_assert!(false, "diverging outcomes: {a:?} vs {b:?}"),
        }
    }

    // Raising an output coin amount tenfold strictly raises its cost under
    // a magnitude-sensitive cost model.
    #[test]
    fn output_coin_cost_strictly_grows_with_magnitude(coin in 1u64..=u64::MAX / 10) {
        let constraints = LinearConstraints {
            coin_cost_per_digit: 1,
            ..LinearConstraints::default()
        };
        prop_assert!(
            constraints.output_coin_cost(Coin(coin * 10))
                > constraints.output_coin_cost(Coin(coin))
        );
    }

    // A bundle is a supporter exactly when it funds a standalone selection,
    // and ignorable bundles are coin-only dust.
    #[test]
    fn categorisation_matches_standalone_selection(bundle in arb_wallet_bundle()) {
        let constraints = LinearConstraints::default();
        let standalone =
            Selection::create(&constraints, Coin::ZERO, vec![(entry(0), bundle.clone())]);
        match categorize_entry(&constraints, &bundle) {
            UtxoCategory::Supporter => prop_assert!(standalone.is_ok()),
            UtxoCategory::Freerider => prop_assert!(standalone.is_err()),
            UtxoCategory::Ignorable => {
                prop_assert!(standalone.is_err());
                prop_assert!(bundle.is_coin_only());
                prop_assert!(bundle.coin() <= constraints.input_cost());
            }
        }
    }

    // Categorisation loses nothing and invents nothing.
    #[test]
    fn categorisation_round_trips_the_wallet(
        bundles in prop::collection::vec(arb_wallet_bundle(), 0..=8),
    ) {
        let constraints = LinearConstraints::default();
        let entries: Vec<(UtxoRef, TokenBundle)> = bundles
            .into_iter()
            .enumerate()
            .map(|(index, bundle)| (entry(index as u8), bundle))
            .collect();

        let mut recovered =
            categorize_utxos(&constraints, entries.clone()).uncategorize();
        recovered.sort_by_key(|(reference, _)| *reference);
        let mut expected = entries;
        expected.sort_by_key(|(reference, _)| *reference);
        prop_assert_eq!(recovered, expected);
    }

    // Plans partition the wallet, leave no supporter behind, total their
    // fees, confine the withdrawal to the first selection, and every
    // selection they emit verifies as correct.
    #[test]
    fn plans_partition_the_wallet(
        bundles in prop::collection::vec(arb_wallet_bundle(), 0..=8),
        reward in 0u64..=10,
    ) {
        let constraints = LinearConstraints::default();
        let entries: Vec<(UtxoRef, TokenBundle)> = bundles
            .into_iter()
            .enumerate()
            .map(|(index, bundle)| (entry(index as u8), bundle))
            .collect();
        let categorized = categorize_utxos(&constraints, entries.clone());
        let plan = create_plan(&constraints, categorized, Coin(reward));

        prop_assert!(plan.unselected.supporters.is_empty());

        let expected_fee: Coin = plan.selections.iter().map(|selection| selection.fee).sum();
        prop_assert_eq!(plan.total_fee, expected_fee);

        for selection in plan.selections.iter().skip(1) {
            prop_assert_eq!(selection.reward_withdrawal, Coin::ZERO);
        }
        for selection in &plan.selections {
            prop_assert_eq!(
                Selection::check(&constraints, selection),
                SelectionCorrectness::Correct
            );
        }

        let mut recovered: Vec<(UtxoRef, TokenBundle)> = plan
            .selections
            .iter()
            .flat_map(|selection| selection.inputs.clone())
            .collect();
        recovered.extend(plan.unselected.uncategorize());
        recovered.sort_by_key(|(reference, _)| *reference);
        let mut expected = entries;
        expected.sort_by_key(|(reference, _)| *reference);
        prop_assert_eq!(recovered, expected);
    }

    // Proportional partitioning is exact and fair.
    #[test]
    fn partition_is_exact_and_fair(
        value in 0u64..=10_000,
        weights in prop::collection::vec(0u64..=100, 1..=8),
    ) {
        match partition_natural(value, &weights) {
            None => prop_assert!(weights.iter().all(|weight| *weight == 0)),
            Some(shares) => {
                prop_assert_eq!(shares.len(), weights.len());
                prop_assert_eq!(shares.iter().sum::<u64>(), value);

                let total: u128 = weights.iter().map(|weight| u128::from(*weight)).sum();
                for (share, weight) in shares.iter().zip(&weights) {
                    let exact = u128::from(value) * u128::from(*weight) / total;
                    prop_assert!(u128::from(*share) >= exact);
                    prop_assert!(u128::from(*share) <= exact + 1);
                }
            }
        }
    }
}
