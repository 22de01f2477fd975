//!
//! # UTXO processing and transaction generation engine
//!
//! This crate provides the core primitives needed to track a set of
//! addresses against the Kaspa UTXO set and to generate signed
//! transactions from it. The two main subsystems are:
//!
//! - [`utxo::UtxoProcessor`] and [`utxo::UtxoContext`] which maintain
//!   the live UTXO set, track entry maturity against the DAA score and
//!   emit balance and transaction lifecycle events.
//! - [`tx::generator::Generator`] which produces a lazy sequence of
//!   transactions from a set of UTXO entries, compounding inputs into
//!   chained batch transactions whenever the desired payment does not
//!   fit within the standard transaction mass limit.
//!
//! All amounts are expressed in Sompi (1 KAS = 100,000,000 Sompi) and
//! all amount arithmetic is integer-only.
//!

pub mod address;
pub mod error;
pub mod events;
pub mod imports;
pub mod network;
pub mod result;
pub mod rpc;
pub mod storage;
pub mod tx;
pub mod utils;
pub mod utxo;

#[cfg(test)]
pub mod tests;

pub mod prelude {
    //! A prelude containing commonly used types and traits.
    pub use crate::address::{Address, Prefix, Version};
    pub use crate::error::Error;
    pub use crate::events::{EventKind, Events};
    pub use crate::network::{NetworkId, NetworkType};
    pub use crate::result::Result;
    pub use crate::rpc::{DynRpcApi, Rpc, RpcApi, RpcCtl, RpcState};
    pub use crate::storage::{TransactionData, TransactionKind, TransactionRecord};
    pub use crate::tx::generator::{
        Generator, GeneratorSettings, GeneratorSummary, PendingTransaction, PendingTransactionStream, SignerT,
    };
    pub use crate::tx::{Fees, PaymentDestination, PaymentOutput, PaymentOutputs};
    pub use crate::utils::{kaspa_suffix, sompi_to_kaspa_string, sompi_to_kaspa_string_with_suffix, try_kaspa_str_to_sompi};
    pub use crate::utxo::{
        Balance, BalanceStrings, Maturity, NetworkParams, OutgoingTransaction, UtxoContext, UtxoContextBinding, UtxoContextId,
        UtxoEntry, UtxoEntryId, UtxoEntryReference, UtxoProcessor,
    };
}
