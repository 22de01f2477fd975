//!
//! Events emitted by the UTXO processing subsystem. This includes
//! connection and transaction lifecycle events as well as balance
//! updates produced by the node monitoring task.
//!

use crate::imports::*;
use crate::storage::TransactionRecord;
use crate::utxo::UtxoContextId;

/// Events emitted by [`UtxoProcessor`]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
#[serde(tag = "event", content = "data")]
pub enum Events {
    /// Successful RPC connection
    Connect {
        #[serde(rename = "networkId")]
        network_id: NetworkId,
        /// Kaspa node RPC url on which connection
        /// has been established
        url: Option<String>,
    },
    /// RPC disconnection
    Disconnect {
        #[serde(rename = "networkId")]
        network_id: NetworkId,
        url: Option<String>,
    },
    /// A special event emitted if the connected node
    /// does not have UTXO index enabled
    UtxoIndexNotEnabled {
        /// Kaspa node RPC url on which connection
        /// has been established
        url: Option<String>,
    },
    /// Emitted after successful RPC connection
    /// after the initial state negotiation.
    ServerStatus {
        #[serde(rename = "networkId")]
        network_id: NetworkId,
        #[serde(rename = "serverVersion")]
        server_version: String,
        #[serde(rename = "isSynced")]
        is_synced: bool,
        /// Kaspa node RPC url on which connection
        /// has been established
        url: Option<String>,
    },
    /// Successful start of [`UtxoProcessor`].
    /// This event signifies that the application can
    /// start interfacing with the UTXO processor.
    UtxoProcStart,
    /// [`UtxoProcessor`] has shut down.
    UtxoProcStop,
    /// Occurs when the UTXO processor encounters a general unexpected
    /// processing error, such as node disconnection while submitting
    /// an outgoing transaction. This is a general error trap for
    /// logging purposes and is safe to ignore.
    UtxoProcError {
        message: String,
    },
    /// DAA score change
    DaaScoreChange {
        current_daa_score: u64,
    },
    /// New incoming pending UTXO/transaction
    Pending {
        record: TransactionRecord,
    },
    /// Pending UTXO has been removed (reorg)
    Reorg {
        record: TransactionRecord,
    },
    /// Coinbase stasis UTXO has been removed (reorg)
    /// NOTE: These transactions should be ignored by clients.
    Stasis {
        record: TransactionRecord,
    },
    /// Transaction has been confirmed
    Maturity {
        record: TransactionRecord,
    },
    /// Mature UTXO has been removed without being consumed by this
    /// instance, i.e. spent by an external wallet using the same
    /// addresses.
    External {
        record: TransactionRecord,
    },
    /// Emitted when a transaction has been discovered during address
    /// registration, i.e. when UTXOs already present in the node's
    /// UTXO index are registered with a [`UtxoContext`].
    Discovery {
        record: TransactionRecord,
    },
    /// [`UtxoContext`] balance update. Emitted for each
    /// balance change within the context.
    Balance {
        balance: Option<Balance>,
        /// Developer-assigned internal id of the originating
        /// [`UtxoContext`].
        id: UtxoContextId,
    },
    /// A general error emitted when an unexpected condition
    /// occurs within the UTXO processing subsystem.
    Error {
        message: String,
    },
}

impl Events {
    pub fn kind(&self) -> EventKind {
        EventKind::from(self)
    }
}

/// Discriminant of an [`Events`] variant, useful for event filtering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Disconnect,
    UtxoIndexNotEnabled,
    ServerStatus,
    UtxoProcStart,
    UtxoProcStop,
    UtxoProcError,
    DaaScoreChange,
    Pending,
    Reorg,
    Stasis,
    Maturity,
    External,
    Discovery,
    Balance,
    Error,
}

impl From<&Events> for EventKind {
    fn from(event: &Events) -> Self {
        match event {
            Events::Connect { .. } => EventKind::Connect,
            Events::Disconnect { .. } => EventKind::Disconnect,
            Events::UtxoIndexNotEnabled { .. } => EventKind::UtxoIndexNotEnabled,
            Events::ServerStatus { .. } => EventKind::ServerStatus,
            Events::UtxoProcStart => EventKind::UtxoProcStart,
            Events::UtxoProcStop => EventKind::UtxoProcStop,
            Events::UtxoProcError { .. } => EventKind::UtxoProcError,
            Events::DaaScoreChange { .. } => EventKind::DaaScoreChange,
            Events::Pending { .. } => EventKind::Pending,
            Events::Reorg { .. } => EventKind::Reorg,
            Events::Stasis { .. } => EventKind::Stasis,
            Events::Maturity { .. } => EventKind::Maturity,
            Events::External { .. } => EventKind::External,
            Events::Discovery { .. } => EventKind::Discovery,
            Events::Balance { .. } => EventKind::Balance,
            Events::Error { .. } => EventKind::Error,
        }
    }
}
