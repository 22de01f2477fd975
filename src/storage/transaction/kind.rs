//!
//! Transaction record kinds.
//!

use crate::imports::*;

// Do not change the order of the variants in this enum.
#[derive(Debug, Clone, Serialize, Deserialize, BorshSerialize, BorshDeserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum TransactionKind {
    /// Reorg transaction (caused by UTXO reorg).
    /// NOTE: These transactions should be ignored by clients
    /// if the transaction has not reached Pending maturity.
    Reorg,
    /// Stasis transaction (caused by a reorg during coinbase UTXO stasis).
    /// NOTE: These types of transactions should be ignored by clients.
    Stasis,
    /// Internal batch (sweep) transaction. Generated as a part of an
    /// Outgoing transaction if the number of UTXOs needed for the
    /// transaction is greater than the transaction mass limit.
    Batch,
    /// Change transaction. Generated as a part of an Outgoing
    /// transaction.
    /// NOTE: These types of transactions should be ignored by clients.
    Change,
    /// A regular incoming transaction comprised of one or more UTXOs.
    Incoming,
    /// An outgoing transaction created by the transaction [`Generator`](crate::tx::generator::Generator).
    /// If transaction creation results in multiple sweep transactions,
    /// this is the final transaction in the transaction tree.
    Outgoing,
    /// Externally triggered *Outgoing* transaction observed against
    /// the monitored address set. This only occurs when another wallet
    /// issues an outgoing transaction from addresses monitored by this
    /// instance (for example a copy of the wallet).
    External,
}

impl TransactionKind {
    pub fn sign(&self) -> String {
        match self {
            TransactionKind::Incoming => "+",
            TransactionKind::Outgoing => "-",
            TransactionKind::External => "-",
            TransactionKind::Batch => "",
            TransactionKind::Reorg => "-",
            TransactionKind::Stasis => "",
            TransactionKind::Change => "",
        }
        .to_string()
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionKind::Incoming => "incoming",
            TransactionKind::Outgoing => "outgoing",
            TransactionKind::External => "external",
            TransactionKind::Batch => "batch",
            TransactionKind::Reorg => "reorg",
            TransactionKind::Stasis => "stasis",
            TransactionKind::Change => "change",
        };
        write!(f, "{s}")
    }
}
