#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation
)]

//! Multi-asset coin selection and migration planning for a UTxO wallet.
//!
//! The crate is a pure, synchronous library: it consumes a UTxO snapshot,
//! payment targets, a [`TxConstraints`] implementation and a random
//! source, and emits selection results. Networking, signing, persistence
//! and wire formats live with the callers.

pub mod constraints;
pub mod error;
pub mod index;
pub mod migration;
pub mod numeric;
pub mod selection;
pub mod test_setup;
pub mod tx;
pub mod value;

pub use constraints::TxConstraints;
pub use error::{MinCoinViolation, SelectionError};
pub use index::{SelectionFilter, UtxoIndex};
pub use migration::{
    categorize_entry, categorize_utxos, create_plan, CategorizedUtxos, MigrationPlan, Selection,
    SelectionCorrectness, UtxoCategory,
};
pub use selection::{
    make_change, perform_selection, SelectionCriteria, SelectionLimit, SelectionResult,
    SelectionSkeleton,
};
pub use tx::{Address, TxOut, UtxoRef};
pub use value::{AssetId, AssetName, Coin, PolicyId, TokenBundle, TokenMap, TokenQuantity};
