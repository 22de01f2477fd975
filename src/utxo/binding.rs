//!
//! Implements the [`UtxoContextBinding`] which associates a
//! [`UtxoContext`](crate::utxo::UtxoContext) with a client-supplied id.
//!

use crate::imports::*;

static CONTEXT_ID_SEQUENCER: AtomicU64 = AtomicU64::new(0);
fn next_context_id() -> u64 {
    CONTEXT_ID_SEQUENCER.fetch_add(1, Ordering::SeqCst)
}

/// Identifier of a [`UtxoContext`](crate::utxo::UtxoContext). Carried in
/// [`TransactionRecord`](crate::storage::TransactionRecord) events so
/// that clients can associate records with the originating context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, BorshSerialize, BorshDeserialize)]
pub struct UtxoContextId(pub(crate) u64);

impl Default for UtxoContextId {
    fn default() -> Self {
        UtxoContextId(next_context_id())
    }
}

impl UtxoContextId {
    pub fn new(id: u64) -> Self {
        UtxoContextId(id)
    }

    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }

    pub fn short(&self) -> String {
        let hex = self.to_hex();
        format!("[{}]", &hex[0..4])
    }
}

impl From<u64> for UtxoContextId {
    fn from(id: u64) -> Self {
        UtxoContextId(id)
    }
}

impl std::fmt::Display for UtxoContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Binding of a [`UtxoContext`](crate::utxo::UtxoContext) to an id.
/// An internal id is assigned automatically when the client does not
/// supply one.
#[derive(Clone, Debug)]
pub enum UtxoContextBinding {
    Internal(UtxoContextId),
    Id(UtxoContextId),
}

impl Default for UtxoContextBinding {
    fn default() -> Self {
        UtxoContextBinding::Internal(UtxoContextId::default())
    }
}

impl UtxoContextBinding {
    pub fn id(&self) -> UtxoContextId {
        match self {
            UtxoContextBinding::Internal(id) => *id,
            UtxoContextBinding::Id(id) => *id,
        }
    }
}
