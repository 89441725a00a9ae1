//! Token bundles: a coin quantity paired with a native-asset map.

use crate::value::{Coin, TokenMap};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The full value carried by one transaction output or UTxO entry.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBundle {
    coin: Coin,
    tokens: TokenMap,
}

impl TokenBundle {
    #[must_use]
    pub const fn new(coin: Coin, tokens: TokenMap) -> Self {
        Self { coin, tokens }
    }

    #[must_use]
    pub const fn from_coin(coin: Coin) -> Self {
        Self {
            coin,
            tokens: TokenMap::empty(),
        }
    }

    #[must_use]
    pub const fn empty() -> Self {
        Self::from_coin(Coin::ZERO)
    }

    #[must_use]
    pub const fn coin(&self) -> Coin {
        self.coin
    }

    pub fn set_coin(&mut self, coin: Coin) {
        self.coin = coin;
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenMap {
        &self.tokens
    }

    /// True when the bundle carries no native assets.
    #[must_use]
    pub fn is_coin_only(&self) -> bool {
        self.tokens.is_empty()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coin.is_zero() && self.tokens.is_empty()
    }

    /// Component-wise sum.
    #[must_use]
    pub fn add(&self, other: &Self) -> Self {
        Self {
            coin: self.coin + other.coin,
            tokens: self.tokens.add(&other.tokens),
        }
    }

    /// Component-wise difference, defined only when `other` is bounded by
    /// `self`.
    #[must_use]
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        Some(Self {
            coin: self.coin.checked_sub(other.coin)?,
            tokens: self.tokens.checked_sub(&other.tokens)?,
        })
    }

    /// Difference where coverage has already been proved by the caller.
    ///
    /// # Panics
    ///
    /// Panics when `other` is not bounded by `self`; reaching that panic is
    /// a programming error at the call site.
    #[must_use]
    pub fn sub_unchecked(&self, other: &Self) -> Self {
        self.checked_sub(other)
            .unwrap_or_else(|| panic!("bundle subtraction without cover: {self} - {other}"))
    }

    /// Partial order: true iff both components of `self` are covered by
    /// `other`.
    #[must_use]
    pub fn is_bounded_by(&self, other: &Self) -> bool {
        self.coin <= other.coin && self.tokens.is_bounded_by(&other.tokens)
    }

    /// Component-wise sum of a sequence of bundles.
    pub fn sum<'a, I>(bundles: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
    {
        bundles
            .into_iter()
            .fold(Self::empty(), |total, bundle| total.add(bundle))
    }
}

impl fmt::Display for TokenBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tokens.is_empty() {
            write!(f, "{} coin", self.coin)
        } else {
            write!(
                f,
                "{} coin and {} asset kind(s)",
                self.coin,
                self.tokens.asset_count()
            )
        }
    }
}
