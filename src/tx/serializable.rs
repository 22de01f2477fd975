//!
//! Serializable transaction schema for external transaction signing.
//!
//! Two encodings are provided: [`numeric`] ("fast") carries all amounts
//! as native 64-bit integers, while [`string`] ("safe") carries them as
//! decimal strings for transports that cannot represent the full 64-bit
//! integer range (such as JSON consumed by JavaScript). Both encodings
//! round-trip losslessly.
//!

use crate::imports::*;
use crate::tx::primitives::hex_bytes;
use crate::tx::{SignableTransaction, SubnetworkId, Transaction, TransactionInput, TransactionOutpoint, UtxoEntry};

pub type SerializableTransactionVersion = u32;

/// Version tag carried by the serialized forms.
pub const SERIALIZABLE_TRANSACTION_VERSION: SerializableTransactionVersion = 2;

fn populated_entries(tx: &SignableTransaction) -> Result<Vec<&UtxoEntry>> {
    tx.entries
        .iter()
        .map(|entry| entry.as_ref().ok_or_else(|| Error::custom("transaction inputs are not fully populated")))
        .collect()
}

pub mod numeric {
    //! The "fast" serializable schema; amounts are native 64-bit integers.

    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SerializableUtxoEntry {
        pub address: Option<Address>,
        pub amount: u64,
        pub script_public_key: ScriptPublicKey,
        pub block_daa_score: u64,
        pub is_coinbase: bool,
    }

    impl From<&UtxoEntry> for SerializableUtxoEntry {
        fn from(utxo: &UtxoEntry) -> Self {
            Self {
                address: None,
                amount: utxo.amount,
                script_public_key: utxo.script_public_key.clone(),
                block_daa_score: utxo.block_daa_score,
                is_coinbase: utxo.is_coinbase,
            }
        }
    }

    impl From<&SerializableUtxoEntry> for UtxoEntry {
        fn from(utxo: &SerializableUtxoEntry) -> Self {
            Self {
                amount: utxo.amount,
                script_public_key: utxo.script_public_key.clone(),
                block_daa_score: utxo.block_daa_score,
                is_coinbase: utxo.is_coinbase,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SerializableTransactionInput {
        pub transaction_id: TransactionId,
        pub index: TransactionIndexType,
        pub sequence: u64,
        pub sig_op_count: u8,
        #[serde(with = "hex_bytes")]
        pub signature_script: Vec<u8>,
        pub utxo: SerializableUtxoEntry,
    }

    impl SerializableTransactionInput {
        pub fn new(input: &TransactionInput, utxo: &UtxoEntry) -> Self {
            Self {
                transaction_id: input.previous_outpoint.transaction_id,
                index: input.previous_outpoint.index,
                sequence: input.sequence,
                sig_op_count: input.sig_op_count,
                signature_script: input.signature_script.clone(),
                utxo: SerializableUtxoEntry::from(utxo),
            }
        }
    }

    impl From<&SerializableTransactionInput> for TransactionInput {
        fn from(input: &SerializableTransactionInput) -> Self {
            Self {
                previous_outpoint: TransactionOutpoint::new(input.transaction_id, input.index),
                signature_script: input.signature_script.clone(),
                sequence: input.sequence,
                sig_op_count: input.sig_op_count,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SerializableTransactionOutput {
        pub value: u64,
        pub script_public_key: ScriptPublicKey,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SerializableTransaction {
        pub version: SerializableTransactionVersion,
        pub id: TransactionId,
        pub tx_version: u16,
        pub inputs: Vec<SerializableTransactionInput>,
        pub outputs: Vec<SerializableTransactionOutput>,
        pub lock_time: u64,
        pub subnetwork_id: SubnetworkId,
        pub gas: u64,
        #[serde(with = "hex_bytes")]
        pub payload: Vec<u8>,
    }

    impl SerializableTransaction {
        pub fn from_signable_transaction(tx: &SignableTransaction) -> Result<Self> {
            let entries = populated_entries(tx)?;
            let inputs = tx
                .tx
                .inputs
                .iter()
                .zip(entries)
                .map(|(input, utxo)| SerializableTransactionInput::new(input, utxo))
                .collect();

            Ok(Self {
                version: SERIALIZABLE_TRANSACTION_VERSION,
                id: tx.id(),
                tx_version: tx.tx.version,
                inputs,
                outputs: tx
                    .tx
                    .outputs
                    .iter()
                    .map(|output| SerializableTransactionOutput {
                        value: output.value,
                        script_public_key: output.script_public_key.clone(),
                    })
                    .collect(),
                lock_time: tx.tx.lock_time,
                subnetwork_id: tx.tx.subnetwork_id.clone(),
                gas: tx.tx.gas,
                payload: tx.tx.payload.clone(),
            })
        }

        pub fn serialize_to_json(&self) -> Result<String> {
            Ok(serde_json::to_string(self)?)
        }

        pub fn deserialize_from_json(json: &str) -> Result<Self> {
            Ok(serde_json::from_str(json)?)
        }
    }

    impl TryFrom<SerializableTransaction> for SignableTransaction {
        type Error = Error;
        fn try_from(serializable: SerializableTransaction) -> Result<Self> {
            let mut entries = vec![];
            let mut inputs = vec![];
            for input in serializable.inputs.iter() {
                entries.push(Some(UtxoEntry::from(&input.utxo)));
                inputs.push(TransactionInput::from(input));
            }

            let outputs = serializable
                .outputs
                .into_iter()
                .map(|output| crate::tx::TransactionOutput::new(output.value, output.script_public_key))
                .collect();

            let tx = Transaction::new(
                serializable.tx_version,
                inputs,
                outputs,
                serializable.lock_time,
                serializable.subnetwork_id,
                serializable.gas,
                serializable.payload,
            );

            Ok(SignableTransaction::new(tx, entries))
        }
    }
}

pub mod string {
    //! The "safe" serializable schema; amounts are decimal strings.

    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SerializableUtxoEntry {
        pub address: Option<Address>,
        pub amount: String,
        pub script_public_key: ScriptPublicKey,
        pub block_daa_score: String,
        pub is_coinbase: bool,
    }

    impl From<&UtxoEntry> for SerializableUtxoEntry {
        fn from(utxo: &UtxoEntry) -> Self {
            Self {
                address: None,
                amount: utxo.amount.to_string(),
                script_public_key: utxo.script_public_key.clone(),
                block_daa_score: utxo.block_daa_score.to_string(),
                is_coinbase: utxo.is_coinbase,
            }
        }
    }

    impl TryFrom<&SerializableUtxoEntry> for UtxoEntry {
        type Error = Error;
        fn try_from(utxo: &SerializableUtxoEntry) -> Result<Self> {
            Ok(Self {
                amount: utxo.amount.parse()?,
                script_public_key: utxo.script_public_key.clone(),
                block_daa_score: utxo.block_daa_score.parse()?,
                is_coinbase: utxo.is_coinbase,
            })
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SerializableTransactionInput {
        pub transaction_id: TransactionId,
        pub index: TransactionIndexType,
        pub sequence: String,
        pub sig_op_count: u8,
        #[serde(with = "hex_bytes")]
        pub signature_script: Vec<u8>,
        pub utxo: SerializableUtxoEntry,
    }

    impl SerializableTransactionInput {
        pub fn new(input: &TransactionInput, utxo: &UtxoEntry) -> Self {
            Self {
                transaction_id: input.previous_outpoint.transaction_id,
                index: input.previous_outpoint.index,
                sequence: input.sequence.to_string(),
                sig_op_count: input.sig_op_count,
                signature_script: input.signature_script.clone(),
                utxo: SerializableUtxoEntry::from(utxo),
            }
        }
    }

    impl TryFrom<&SerializableTransactionInput> for TransactionInput {
        type Error = Error;
        fn try_from(input: &SerializableTransactionInput) -> Result<Self> {
            Ok(Self {
                previous_outpoint: TransactionOutpoint::new(input.transaction_id, input.index),
                signature_script: input.signature_script.clone(),
                sequence: input.sequence.parse()?,
                sig_op_count: input.sig_op_count,
            })
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SerializableTransactionOutput {
        pub value: String,
        pub script_public_key: ScriptPublicKey,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct SerializableTransaction {
        pub version: SerializableTransactionVersion,
        pub id: TransactionId,
        pub tx_version: u16,
        pub inputs: Vec<SerializableTransactionInput>,
        pub outputs: Vec<SerializableTransactionOutput>,
        pub lock_time: String,
        pub subnetwork_id: SubnetworkId,
        pub gas: String,
        #[serde(with = "hex_bytes")]
        pub payload: Vec<u8>,
    }

    impl SerializableTransaction {
        pub fn from_signable_transaction(tx: &SignableTransaction) -> Result<Self> {
            let entries = populated_entries(tx)?;
            let inputs = tx
                .tx
                .inputs
                .iter()
                .zip(entries)
                .map(|(input, utxo)| SerializableTransactionInput::new(input, utxo))
                .collect();

            Ok(Self {
                version: SERIALIZABLE_TRANSACTION_VERSION,
                id: tx.id(),
                tx_version: tx.tx.version,
                inputs,
                outputs: tx
                    .tx
                    .outputs
                    .iter()
                    .map(|output| SerializableTransactionOutput {
                        value: output.value.to_string(),
                        script_public_key: output.script_public_key.clone(),
                    })
                    .collect(),
                lock_time: tx.tx.lock_time.to_string(),
                subnetwork_id: tx.tx.subnetwork_id.clone(),
                gas: tx.tx.gas.to_string(),
                payload: tx.tx.payload.clone(),
            })
        }

        pub fn serialize_to_json(&self) -> Result<String> {
            Ok(serde_json::to_string(self)?)
        }

        pub fn deserialize_from_json(json: &str) -> Result<Self> {
            Ok(serde_json::from_str(json)?)
        }
    }

    impl TryFrom<SerializableTransaction> for SignableTransaction {
        type Error = Error;
        fn try_from(serializable: SerializableTransaction) -> Result<Self> {
            let mut entries = vec![];
            let mut inputs = vec![];
            for input in serializable.inputs.iter() {
                entries.push(Some(UtxoEntry::try_from(&input.utxo)?));
                inputs.push(TransactionInput::try_from(input)?);
            }

            let outputs = serializable
                .outputs
                .into_iter()
                .map(|output| Ok(crate::tx::TransactionOutput::new(output.value.parse()?, output.script_public_key)))
                .collect::<Result<Vec<_>>>()?;

            let tx = Transaction::new(
                serializable.tx_version,
                inputs,
                outputs,
                serializable.lock_time.parse()?,
                serializable.subnetwork_id,
                serializable.gas.parse()?,
                serializable.payload,
            );

            Ok(SignableTransaction::new(tx, entries))
        }
    }
}
