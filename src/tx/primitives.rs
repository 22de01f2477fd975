//!
//! Consensus-level transaction primitives used by the engine.
//!

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::error::Error;

/// Index of a transaction output within a transaction.
pub type TransactionIndexType = u32;

/// 32-byte transaction identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize)]
pub struct TransactionId([u8; 32]);

impl TransactionId {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl AsRef<[u8]> for TransactionId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for TransactionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&faster_hex::hex_string(&self.0))
    }
}

impl FromStr for TransactionId {
    type Err = Error;
    fn from_str(hex: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 32];
        if hex.len() != 64 {
            return Err(Error::custom(format!("invalid transaction id: '{hex}'")));
        }
        faster_hex::hex_decode(hex.as_bytes(), &mut bytes)
            .map_err(|_| Error::custom(format!("invalid transaction id: '{hex}'")))?;
        Ok(Self(bytes))
    }
}

impl Serialize for TransactionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

struct TransactionIdVisitor;

impl de::Visitor<'_> for TransactionIdVisitor {
    type Value = TransactionId;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a hex string encoding a 32-byte transaction id")
    }

    fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        TransactionId::from_str(value).map_err(|err| de::Error::custom(err.to_string()))
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D>(deserializer: D) -> Result<TransactionId, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(TransactionIdVisitor)
    }
}

/// 20-byte subnetwork identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct SubnetworkId([u8; 20]);

/// The native (transfer-only) subnetwork.
pub const SUBNETWORK_ID_NATIVE: SubnetworkId = SubnetworkId([0u8; 20]);

impl SubnetworkId {
    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for SubnetworkId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Script paying to an output, prefixed with its version.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptPublicKey {
    version: u16,
    script: Vec<u8>,
}

impl ScriptPublicKey {
    pub fn new(version: u16, script: Vec<u8>) -> Self {
        Self { version, script }
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn script(&self) -> &[u8] {
        &self.script
    }
}

/// Reference to an output of a previous transaction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutpoint {
    pub transaction_id: TransactionId,
    pub index: TransactionIndexType,
}

impl TransactionOutpoint {
    pub fn new(transaction_id: TransactionId, index: TransactionIndexType) -> Self {
        Self { transaction_id, index }
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    pub fn index(&self) -> TransactionIndexType {
        self.index
    }

    pub fn id_string(&self) -> String {
        format!("{}-{}", self.transaction_id, self.index)
    }
}

impl Display for TransactionOutpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.transaction_id, self.index)
    }
}

/// Transaction input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    pub previous_outpoint: TransactionOutpoint,
    #[serde(with = "hex_bytes")]
    pub signature_script: Vec<u8>,
    pub sequence: u64,
    pub sig_op_count: u8,
}

impl TransactionInput {
    pub fn new(previous_outpoint: TransactionOutpoint, signature_script: Vec<u8>, sequence: u64, sig_op_count: u8) -> Self {
        Self { previous_outpoint, signature_script, sequence, sig_op_count }
    }
}

/// Transaction output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutput {
    pub value: u64,
    pub script_public_key: ScriptPublicKey,
}

impl TransactionOutput {
    pub fn new(value: u64, script_public_key: ScriptPublicKey) -> Self {
        Self { value, script_public_key }
    }
}

/// Kaspa transaction.
///
/// The transaction id is computed on construction and memoized. It is
/// derived from all transaction data except for signature scripts, so
/// signing inputs does not change the id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    id: TransactionId,
    pub version: u16,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u64,
    pub subnetwork_id: SubnetworkId,
    pub gas: u64,
    #[serde(with = "hex_bytes")]
    pub payload: Vec<u8>,
}

impl Transaction {
    pub fn new(
        version: u16,
        inputs: Vec<TransactionInput>,
        outputs: Vec<TransactionOutput>,
        lock_time: u64,
        subnetwork_id: SubnetworkId,
        gas: u64,
        payload: Vec<u8>,
    ) -> Self {
        let mut tx = Self { id: TransactionId::default(), version, inputs, outputs, lock_time, subnetwork_id, gas, payload };
        tx.finalize();
        tx
    }

    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Recomputes the memoized transaction id. Must be called if
    /// any field other than a signature script is mutated.
    pub fn finalize(&mut self) {
        self.id = self.compute_id();
    }

    fn compute_id(&self) -> TransactionId {
        let mut hasher = blake2b_simd::Params::new().hash_length(32).key(b"TransactionID").to_state();
        hasher.update(&self.version.to_le_bytes());
        hasher.update(&(self.inputs.len() as u64).to_le_bytes());
        for input in self.inputs.iter() {
            hasher.update(input.previous_outpoint.transaction_id.as_ref());
            hasher.update(&input.previous_outpoint.index.to_le_bytes());
            hasher.update(&input.sequence.to_le_bytes());
            hasher.update(&[input.sig_op_count]);
        }
        hasher.update(&(self.outputs.len() as u64).to_le_bytes());
        for output in self.outputs.iter() {
            hasher.update(&output.value.to_le_bytes());
            hasher.update(&output.script_public_key.version.to_le_bytes());
            hasher.update(&(output.script_public_key.script.len() as u64).to_le_bytes());
            hasher.update(&output.script_public_key.script);
        }
        hasher.update(&self.lock_time.to_le_bytes());
        hasher.update(self.subnetwork_id.as_ref());
        hasher.update(&self.gas.to_le_bytes());
        hasher.update(&(self.payload.len() as u64).to_le_bytes());
        hasher.update(&self.payload);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(hasher.finalize().as_bytes());
        TransactionId::from_bytes(bytes)
    }
}

/// Consensus-level UTXO entry attached to a transaction input
/// for signing and mass calculation purposes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoEntry {
    pub amount: u64,
    pub script_public_key: ScriptPublicKey,
    pub block_daa_score: u64,
    pub is_coinbase: bool,
}

/// A transaction bundled with the UTXO entries its inputs spend,
/// in input order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignableTransaction {
    pub tx: Transaction,
    pub entries: Vec<Option<UtxoEntry>>,
}

impl SignableTransaction {
    pub fn new(tx: Transaction, entries: Vec<Option<UtxoEntry>>) -> Self {
        Self { tx, entries }
    }

    pub fn id(&self) -> TransactionId {
        self.tx.id()
    }

    /// True if a UTXO entry is present for every input.
    pub fn is_fully_populated(&self) -> bool {
        self.entries.iter().all(Option::is_some)
    }
}

pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&faster_hex::hex_string(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let hex = String::deserialize(deserializer)?;
        let mut bytes = vec![0u8; hex.len() / 2];
        faster_hex::hex_decode(hex.as_bytes(), &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transaction_with_payload(payload: Vec<u8>) -> Transaction {
        let input = TransactionInput::new(TransactionOutpoint::new(TransactionId::default(), 0), vec![], 0, 1);
        let output = TransactionOutput::new(1000, ScriptPublicKey::new(0, vec![0x20; 34]));
        Transaction::new(0, vec![input], vec![output], 0, SUBNETWORK_ID_NATIVE, 0, payload)
    }

    #[test]
    fn test_transaction_id_is_stable_under_signing() {
        let mut tx = transaction_with_payload(vec![]);
        let id = tx.id();
        tx.inputs[0].signature_script = vec![0xab; 66];
        tx.finalize();
        assert_eq!(tx.id(), id);
    }

    #[test]
    fn test_transaction_id_tracks_content() {
        let a = transaction_with_payload(vec![]);
        let b = transaction_with_payload(vec![1, 2, 3]);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_transaction_id_text_roundtrip() {
        let id = transaction_with_payload(vec![]).id();
        assert_eq!(TransactionId::from_str(&id.to_string()).unwrap(), id);
        assert!(TransactionId::from_str("deadbeef").is_err());
    }
}
