//!
//! Transaction record types delivered within wallet events.
//!

pub mod transaction;

pub use transaction::{TransactionData, TransactionId, TransactionKind, TransactionRecord, UtxoRecord};
