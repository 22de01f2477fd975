//!
//! UTXO processing subsystem. Monitors a set of addresses against
//! the node's UTXO index, tracks entry maturity and emits balance
//! and transaction lifecycle events.
//!

pub mod balance;
pub mod binding;
pub mod context;
pub mod entry;
pub mod iterator;
pub mod outgoing;
pub mod pending;
pub mod processor;
pub mod settings;
pub mod stream;

#[cfg(test)]
pub mod test;

pub use balance::{Balance, BalanceStrings};
pub use binding::{UtxoContextBinding, UtxoContextId};
pub use context::{UtxoContext, UtxoEntryVariant};
pub use entry::{UtxoEntry, UtxoEntryId, UtxoEntryReference};
pub use iterator::UtxoIterator;
pub use outgoing::OutgoingTransaction;
pub use pending::PendingUtxoEntryReference;
pub use processor::UtxoProcessor;
pub use settings::NetworkParams;
pub use stream::UtxoStream;

use std::fmt;

/// Maturity state of a UTXO entry relative to the current DAA score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Maturity {
    /// Coinbase UTXO that has not reached the stasis period.
    /// UTXOs in stasis are not visible to the client.
    Stasis,
    /// UTXO that has not reached its maturity period.
    Pending,
    /// Mature (spendable) UTXO.
    Confirmed,
}

impl fmt::Display for Maturity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Maturity::Stasis => write!(f, "stasis"),
            Maturity::Pending => write!(f, "pending"),
            Maturity::Confirmed => write!(f, "confirmed"),
        }
    }
}
