//!
//! Transaction record subsystem.
//!

pub mod data;
pub mod kind;
pub mod record;
pub mod utxo;

pub use data::TransactionData;
pub use kind::TransactionKind;
pub use record::TransactionRecord;
pub use utxo::UtxoRecord;

pub use crate::tx::TransactionId;
