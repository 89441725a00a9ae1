//! Per-protocol transaction constraints.
//!
//! Every size and cost decision made by selection and migration goes
//! through this trait, so the same algorithms drive any target protocol.
//! All queries are pure.

use crate::value::{Coin, TokenBundle, TokenMap, TokenQuantity};

pub trait TxConstraints {
    /// Constant cost charged once per transaction.
    fn base_cost(&self) -> Coin;

    /// Constant encoded size of an empty transaction.
    fn base_size(&self) -> u64;

    /// Marginal cost of one selected input.
    fn input_cost(&self) -> Coin;

    /// Marginal encoded size of one selected input.
    fn input_size(&self) -> u64;

    /// Marginal cost of an output carrying `bundle`.
    fn output_cost(&self, bundle: &TokenBundle) -> Coin;

    /// Encoded size of an output carrying `bundle`.
    fn output_size(&self, bundle: &TokenBundle) -> u64;

    /// Marginal cost of a coin-only output holding `coin`.
    fn output_coin_cost(&self, coin: Coin) -> Coin;

    /// Encoded size of a coin-only output holding `coin`.
    fn output_coin_size(&self, coin: Coin) -> u64;

    /// Minimum coin an output carrying these assets must hold.
    ///
    /// Depends only on the asset set of `assets`, never on its quantities.
    fn min_coin_value(&self, assets: &TokenMap) -> Coin;

    /// Upper bound on the encoded size of a single output.
    fn max_output_size(&self) -> u64;

    /// Upper bound on the encoded size of a whole transaction.
    fn max_tx_size(&self) -> u64;

    /// Upper bound on any single token quantity within one output.
    fn max_asset_quantity(&self) -> TokenQuantity;

    /// Marginal cost of withdrawing `coin` of rewards; zero when `coin` is
    /// zero.
    fn reward_withdrawal_cost(&self, coin: Coin) -> Coin;

    /// Marginal encoded size of withdrawing `coin` of rewards; zero when
    /// `coin` is zero.
    fn reward_withdrawal_size(&self, coin: Coin) -> u64;

    fn output_has_valid_size(&self, bundle: &TokenBundle) -> bool {
        self.output_size(bundle) <= self.max_output_size()
    }

    fn output_has_valid_token_quantities(&self, assets: &TokenMap) -> bool {
        assets
            .iter()
            .all(|(_, quantity)| quantity <= self.max_asset_quantity())
    }

    /// An output is valid when it satisfies the minimum coin value for its
    /// asset set, the output size bound, and the per-asset quantity bound.
    fn output_is_valid(&self, bundle: &TokenBundle) -> bool {
        bundle.coin() >= self.min_coin_value(bundle.tokens())
            && self.output_has_valid_size(bundle)
            && self.output_has_valid_token_quantities(bundle.tokens())
    }
}
