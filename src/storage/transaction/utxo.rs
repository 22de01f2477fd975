//!
//! UTXO record representation stored within transaction records.
//!

use crate::imports::*;
use crate::utxo::UtxoEntryReference;

/// [`UtxoRecord`] represents an incoming transaction UTXO entry
/// stored within [`TransactionRecord`](super::TransactionRecord).
#[derive(Clone, Debug, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct UtxoRecord {
    pub address: Option<Address>,
    pub index: TransactionIndexType,
    pub amount: u64,
    #[serde(rename = "scriptPubKey")]
    pub script_public_key: ScriptPublicKey,
    #[serde(rename = "isCoinbase")]
    pub is_coinbase: bool,
}

impl From<&UtxoEntryReference> for UtxoRecord {
    fn from(utxo: &UtxoEntryReference) -> Self {
        let entry = utxo.as_ref();
        UtxoRecord {
            index: entry.outpoint.index(),
            address: entry.address.clone(),
            amount: entry.amount,
            script_public_key: entry.script_public_key.clone(),
            is_coinbase: entry.is_coinbase,
        }
    }
}
