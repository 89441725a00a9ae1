//! Error surface of the selection core.
//!
//! Every expected failure is a value of [`SelectionError`]; nothing else is
//! produced by selection or migration. Precondition violations inside change
//! construction are programming errors and panic instead.

use crate::tx::{TxOut, UtxoRef};
use crate::value::{Coin, TokenBundle};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// The aggregated available balance cannot cover the aggregated
    /// required balance. Fatal for the current call: the caller must widen
    /// the inputs or shrink the outputs.
    #[error("available balance ({available}) cannot cover required balance ({required})")]
    BalanceInsufficient {
        available: TokenBundle,
        required: TokenBundle,
    },

    /// The input limit stopped selection before the required balance was
    /// reached. The caller may relax the limit and retry.
    #[error(
        "input limit stopped selection at {} input(s), short of required balance ({required})",
        inputs_selected.len()
    )]
    SelectionInsufficient {
        inputs_selected: Vec<(UtxoRef, TokenBundle)>,
        required: TokenBundle,
    },

    /// One or more requested outputs hold less coin than the minimum their
    /// asset set demands. The targets themselves are invalid.
    #[error("{} output(s) are below their minimum coin values", violations.len())]
    InsufficientMinCoinValues { violations: Vec<MinCoinViolation> },

    /// Change could not be funded even after draining coin-only candidates.
    /// `missing` is the smallest additional coin that would have succeeded,
    /// usable as a lower bound in user-facing hints.
    #[error("unable to construct change: at least {missing} more coin is required")]
    UnableToConstructChange { missing: Coin },

    /// Extending the selection would overflow the maximum transaction size.
    #[error("transaction size {required_size} exceeds the maximum of {maximum_size}")]
    SelectionFull {
        required_size: u64,
        maximum_size: u64,
    },
}

/// One output whose coin is below the minimum for its asset set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinCoinViolation {
    pub output: TxOut,
    pub expected_minimum: Coin,
}
