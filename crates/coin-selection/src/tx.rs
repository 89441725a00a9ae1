//! Transaction-facing references: spendable entry identifiers and payment
//! targets.

use crate::value::TokenBundle;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one spendable entry in the UTxO set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtxoRef {
    pub tx_hash: [u8; 32],
    pub output_index: u32,
}

impl UtxoRef {
    #[must_use]
    pub const fn new(tx_hash: [u8; 32], output_index: u32) -> Self {
        Self {
            tx_hash,
            output_index,
        }
    }
}

impl fmt::Display for UtxoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", hex::encode(self.tx_hash), self.output_index)
    }
}

/// Opaque recipient address bytes; never interpreted by the selection core.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub Vec<u8>);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// A payment target: who receives, and what value they receive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub address: Address,
    pub bundle: TokenBundle,
}

impl TxOut {
    #[must_use]
    pub const fn new(address: Address, bundle: TokenBundle) -> Self {
        Self { address, bundle }
    }
}
