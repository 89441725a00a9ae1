//! Shared fixtures for unit, integration and property tests.
//!
//! [`LinearConstraints`] is a deliberately simple constraint model: flat
//! per-transaction, per-input and per-output costs, a minimum coin that
//! grows with the asset count, sizes that grow with the asset count, and
//! an optional cost component proportional to the decimal length of the
//! coin amount (so fee minimisation has a gradient to work against).

use crate::constraints::TxConstraints;
use crate::selection::SelectionSkeleton;
use crate::tx::{Address, TxOut, UtxoRef};
use crate::value::{AssetId, AssetName, Coin, PolicyId, TokenBundle, TokenMap, TokenQuantity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearConstraints {
    pub base_cost: u64,
    pub input_cost: u64,
    pub output_cost: u64,
    /// Extra cost per decimal digit of an output's coin amount.
    pub coin_cost_per_digit: u64,
    pub min_coin_base: u64,
    pub min_coin_per_asset: u64,
    pub base_size: u64,
    pub input_size: u64,
    pub output_base_size: u64,
    pub output_size_per_asset: u64,
    pub max_output_size: u64,
    pub max_tx_size: u64,
    pub max_asset_quantity: u64,
    pub reward_withdrawal_cost: u64,
    pub reward_withdrawal_size: u64,
}

impl Default for LinearConstraints {
    fn default() -> Self {
        Self {
            base_cost: 1,
            input_cost: 1,
            output_cost: 1,
            coin_cost_per_digit: 0,
            min_coin_base: 1,
            min_coin_per_asset: 1,
            base_size: 8,
            input_size: 4,
            output_base_size: 4,
            output_size_per_asset: 2,
            max_output_size: 1_000,
            max_tx_size: 10_000,
            max_asset_quantity: u64::MAX,
            reward_withdrawal_cost: 1,
            reward_withdrawal_size: 4,
        }
    }
}

/// Number of decimal digits in `value`; at least one.
fn digit_length(value: u64) -> u64 {
    let mut digits = 1;
    let mut rest = value / 10;
    while rest > 0 {
        digits += 1;
        rest /= 10;
    }
    digits
}

impl TxConstraints for LinearConstraints {
    fn base_cost(&self) -> Coin {
        Coin(self.base_cost)
    }

    fn base_size(&self) -> u64 {
        self.base_size
    }

    fn input_cost(&self) -> Coin {
        Coin(self.input_cost)
    }

    fn input_size(&self) -> u64 {
        self.input_size
    }

    fn output_cost(&self, bundle: &TokenBundle) -> Coin {
        self.output_coin_cost(bundle.coin())
    }

    fn output_size(&self, bundle: &TokenBundle) -> u64 {
        self.output_base_size
            + self.output_size_per_asset * bundle.tokens().asset_count() as u64
    }

    fn output_coin_cost(&self, coin: Coin) -> Coin {
        Coin(self.output_cost + self.coin_cost_per_digit * digit_length(coin.0))
    }

    fn output_coin_size(&self, _coin: Coin) -> u64 {
        self.output_base_size
    }

    fn min_coin_value(&self, assets: &TokenMap) -> Coin {
        Coin(self.min_coin_base + self.min_coin_per_asset * assets.asset_count() as u64)
    }

    fn max_output_size(&self) -> u64 {
        self.max_output_size
    }

    fn max_tx_size(&self) -> u64 {
        self.max_tx_size
    }

    fn max_asset_quantity(&self) -> TokenQuantity {
        TokenQuantity(self.max_asset_quantity)
    }

    fn reward_withdrawal_cost(&self, coin: Coin) -> Coin {
        if coin.is_zero() {
            Coin::ZERO
        } else {
            Coin(self.reward_withdrawal_cost)
        }
    }

    fn reward_withdrawal_size(&self, coin: Coin) -> u64 {
        if coin.is_zero() {
            0
        } else {
            self.reward_withdrawal_size
        }
    }
}

impl LinearConstraints {
    /// Minimum-coin closure for driving [`crate::selection::perform_selection`].
    pub fn min_coin_fn(&self) -> impl Fn(&TokenMap) -> Coin + '_ {
        move |assets: &TokenMap| self.min_coin_value(assets)
    }

    /// Skeleton pricing closure: base cost plus the per-input cost, the
    /// shape used throughout this repository's selection fixtures.
    pub fn skeleton_cost_fn(&self) -> impl Fn(&SelectionSkeleton<'_>) -> Coin + '_ {
        move |skeleton: &SelectionSkeleton<'_>| {
            Coin(self.base_cost + self.input_cost * skeleton.input_count as u64)
        }
    }
}

#[must_use]
pub fn asset(marker: u8) -> AssetId {
    AssetId::new(PolicyId([marker; 28]), AssetName(vec![marker]))
}

#[must_use]
pub fn entry(marker: u8) -> UtxoRef {
    UtxoRef::new([marker; 32], 0)
}

#[must_use]
pub fn coin_bundle(coin: u64) -> TokenBundle {
    TokenBundle::from_coin(Coin(coin))
}

#[must_use]
pub fn single_asset_bundle(coin: u64, marker: u8, quantity: u64) -> TokenBundle {
    TokenBundle::new(
        Coin(coin),
        TokenMap::from_entries([(asset(marker), TokenQuantity(quantity))]),
    )
}

#[must_use]
pub fn address(marker: u8) -> Address {
    Address(vec![marker; 4])
}

/// One coin-only payment target per requested amount, each to a distinct
/// address.
#[must_use]
pub fn outputs_to(coins: &[u64]) -> Vec<TxOut> {
    coins
        .iter()
        .enumerate()
        .map(|(index, coin)| TxOut::new(address(index as u8), coin_bundle(*coin)))
        .collect()
}

/// A payment target carrying one native asset.
#[must_use]
pub fn asset_output(coin: u64, marker: u8, quantity: u64) -> TxOut {
    TxOut::new(address(marker), single_asset_bundle(coin, marker, quantity))
}
