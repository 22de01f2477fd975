//!
//! Implements the [`UtxoEntry`] and [`UtxoEntryReference`] types
//! used by the UTXO processing subsystem.
//!

use crate::imports::*;
use crate::rpc::RpcUtxosByAddressesEntry;
use crate::tx as cctx;
use crate::tx::TransactionOutpoint;
use std::cmp::Ordering as CmpOrdering;

pub type UtxoEntryId = TransactionOutpoint;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoEntry {
    pub address: Option<Address>,
    pub outpoint: TransactionOutpoint,
    pub amount: u64,
    pub script_public_key: ScriptPublicKey,
    pub block_daa_score: u64,
    pub is_coinbase: bool,
}

impl UtxoEntry {
    #[inline(always)]
    pub fn amount(&self) -> u64 {
        self.amount
    }

    #[inline(always)]
    pub fn block_daa_score(&self) -> u64 {
        self.block_daa_score
    }
}

impl From<RpcUtxosByAddressesEntry> for UtxoEntry {
    fn from(entry: RpcUtxosByAddressesEntry) -> UtxoEntry {
        UtxoEntry {
            address: entry.address,
            outpoint: entry.outpoint,
            amount: entry.utxo_entry.amount,
            script_public_key: entry.utxo_entry.script_public_key,
            block_daa_score: entry.utxo_entry.block_daa_score,
            is_coinbase: entry.utxo_entry.is_coinbase,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UtxoEntryReference {
    pub utxo: Arc<UtxoEntry>,
}

impl UtxoEntryReference {
    pub fn id(&self) -> UtxoEntryId {
        self.utxo.outpoint
    }

    pub fn id_as_ref(&self) -> &UtxoEntryId {
        &self.utxo.outpoint
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.utxo.outpoint.transaction_id()
    }

    pub fn amount(&self) -> u64 {
        self.utxo.amount()
    }

    pub fn is_coinbase(&self) -> bool {
        self.utxo.is_coinbase
    }

    pub fn block_daa_score(&self) -> u64 {
        self.utxo.block_daa_score()
    }

    pub fn address(&self) -> Option<&Address> {
        self.utxo.address.as_ref()
    }

    pub fn maturity(&self, params: &NetworkParams, current_daa_score: u64) -> Maturity {
        if self.is_coinbase() {
            if self.block_daa_score() + params.coinbase_transaction_stasis_period_daa() > current_daa_score {
                Maturity::Stasis
            } else if self.block_daa_score() + params.coinbase_transaction_maturity_period_daa() > current_daa_score {
                Maturity::Pending
            } else {
                Maturity::Confirmed
            }
        } else if self.block_daa_score() + params.user_transaction_maturity_period_daa() > current_daa_score {
            Maturity::Pending
        } else {
            Maturity::Confirmed
        }
    }

    pub fn is_mature(&self, params: &NetworkParams, current_daa_score: u64) -> bool {
        matches!(self.maturity(params, current_daa_score), Maturity::Confirmed)
    }
}

impl AsRef<UtxoEntry> for UtxoEntryReference {
    fn as_ref(&self) -> &UtxoEntry {
        &self.utxo
    }
}

impl From<UtxoEntryReference> for UtxoEntry {
    fn from(value: UtxoEntryReference) -> Self {
        (*value.utxo).clone()
    }
}

impl From<UtxoEntry> for UtxoEntryReference {
    fn from(entry: UtxoEntry) -> Self {
        Self { utxo: Arc::new(entry) }
    }
}

impl From<RpcUtxosByAddressesEntry> for UtxoEntryReference {
    fn from(entry: RpcUtxosByAddressesEntry) -> Self {
        Self { utxo: Arc::new(entry.into()) }
    }
}

impl From<&UtxoEntryReference> for cctx::UtxoEntry {
    fn from(entry: &UtxoEntryReference) -> Self {
        cctx::UtxoEntry {
            amount: entry.amount(),
            script_public_key: entry.utxo.script_public_key.clone(),
            block_daa_score: entry.block_daa_score(),
            is_coinbase: entry.is_coinbase(),
        }
    }
}

impl Eq for UtxoEntryReference {}

impl PartialEq for UtxoEntryReference {
    fn eq(&self, other: &Self) -> bool {
        self.amount() == other.amount()
    }
}

impl PartialOrd for UtxoEntryReference {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.amount().cmp(&other.amount()))
    }
}

impl Ord for UtxoEntryReference {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.amount().cmp(&other.amount())
    }
}

#[cfg(test)]
impl UtxoEntryReference {
    pub fn simulated(amount: u64) -> Self {
        use crate::address::{Prefix, Version};
        let address = Address::new(Prefix::Testnet, Version::PubKey, &rand::random::<[u8; 32]>());
        Self::simulated_with_address(amount, &address)
    }

    pub fn simulated_with_address(amount: u64, address: &Address) -> Self {
        Self::simulated_with_args(amount, address, 0, false)
    }

    pub fn simulated_with_args(amount: u64, address: &Address, block_daa_score: u64, is_coinbase: bool) -> Self {
        use crate::address::pay_to_address_script;

        let outpoint = TransactionOutpoint::new(TransactionId::from_bytes(rand::random::<[u8; 32]>()), 0);
        let script_public_key = pay_to_address_script(address);
        let entry = UtxoEntry {
            address: Some(address.clone()),
            outpoint,
            amount,
            script_public_key,
            block_daa_score,
            is_coinbase,
        };
        UtxoEntryReference { utxo: Arc::new(entry) }
    }
}
