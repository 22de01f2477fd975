//!
//! RPC abstraction used by the UTXO processing subsystem. Provides the
//! [`RpcApi`] trait representing the subset of node RPC operations the
//! engine relies on, notification types delivered by the node and the
//! [`RpcCtl`] signaling helper for connection open/close events.
//!

use crate::address::Address;
use crate::error::Error;
use crate::network::NetworkId;
use crate::result::Result;
use crate::tx::{ScriptPublicKey, Transaction, TransactionId, TransactionOutpoint};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use workflow_core::channel::{Channel, Multiplexer};

/// Id of a notification listener registered with [`RpcApi::register_new_listener`].
pub type ListenerId = u64;

/// Type alias for [`dyn RpcApi`](RpcApi).
pub type DynRpcApi = dyn RpcApi;

/// Type alias for a concrete [`Channel`] used for handling
/// RPC [`Notification`] events.
pub type NotificationChannel = Channel<Notification>;

/// Node-side UTXO entry data as carried by RPC responses
/// and notifications.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcUtxoEntry {
    pub amount: u64,
    #[serde(rename = "scriptPublicKey")]
    pub script_public_key: ScriptPublicKey,
    #[serde(rename = "blockDaaScore")]
    pub block_daa_score: u64,
    #[serde(rename = "isCoinbase")]
    pub is_coinbase: bool,
}

/// A UTXO entry returned by [`RpcApi::get_utxos_by_addresses`] or
/// carried by a [`Notification::UtxosChanged`] notification.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcUtxosByAddressesEntry {
    pub address: Option<Address>,
    pub outpoint: TransactionOutpoint,
    #[serde(rename = "utxoEntry")]
    pub utxo_entry: RpcUtxoEntry,
}

/// Response to [`RpcApi::get_server_info`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetServerInfoResponse {
    #[serde(rename = "serverVersion")]
    pub server_version: String,
    #[serde(rename = "networkId")]
    pub network_id: NetworkId,
    #[serde(rename = "hasUtxoIndex")]
    pub has_utxo_index: bool,
    #[serde(rename = "isSynced")]
    pub is_synced: bool,
    #[serde(rename = "virtualDaaScore")]
    pub virtual_daa_score: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UtxosChangedNotification {
    pub added: Arc<Vec<RpcUtxosByAddressesEntry>>,
    pub removed: Arc<Vec<RpcUtxosByAddressesEntry>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VirtualDaaScoreChangedNotification {
    #[serde(rename = "virtualDaaScore")]
    pub virtual_daa_score: u64,
}

/// Notification carrying the transaction ids accepted by the
/// virtual chain since the last notification.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VirtualChainChangedNotification {
    #[serde(rename = "acceptedTransactionIds")]
    pub accepted_transaction_ids: Arc<Vec<TransactionId>>,
}

/// Notifications delivered by the node to registered listeners.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
#[serde(rename_all = "kebab-case")]
pub enum Notification {
    UtxosChanged(UtxosChangedNotification),
    VirtualChainChanged(VirtualChainChangedNotification),
    VirtualDaaScoreChanged(VirtualDaaScoreChangedNotification),
}

/// Subscription scope for [`Notification::UtxosChanged`] events.
#[derive(Clone, Debug, Default)]
pub struct UtxosChangedScope {
    pub addresses: Vec<Address>,
}

impl UtxosChangedScope {
    pub fn new(addresses: Vec<Address>) -> Self {
        Self { addresses }
    }
}

/// Subscription scope passed to [`RpcApi::start_notify`].
#[derive(Clone, Debug)]
pub enum Scope {
    UtxosChanged(UtxosChangedScope),
    VirtualChainChanged,
    VirtualDaaScoreChanged,
}

impl From<UtxosChangedScope> for Scope {
    fn from(scope: UtxosChangedScope) -> Self {
        Scope::UtxosChanged(scope)
    }
}

/// Notification delivery endpoint handed to the node when
/// registering a listener.
#[derive(Clone, Debug)]
pub struct ChannelConnection {
    name: &'static str,
    sender: workflow_core::channel::Sender<Notification>,
}

impl ChannelConnection {
    pub fn new(name: &'static str, sender: workflow_core::channel::Sender<Notification>) -> Self {
        Self { name, sender }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn send(&self, notification: Notification) -> Result<()> {
        match !self.sender.is_closed() {
            true => Ok(self.sender.try_send(notification)?),
            false => Err(Error::custom("notification channel is closed")),
        }
    }

    pub fn close(&self) -> bool {
        self.sender.close()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// The subset of node RPC operations used by the UTXO
/// processing subsystem.
#[async_trait]
pub trait RpcApi: Send + Sync + 'static {
    async fn get_server_info(&self) -> Result<GetServerInfoResponse>;

    async fn get_utxos_by_addresses(&self, addresses: Vec<Address>) -> Result<Vec<RpcUtxosByAddressesEntry>>;

    async fn submit_transaction(&self, transaction: Transaction, allow_orphan: bool) -> Result<TransactionId>;

    fn register_new_listener(&self, connection: ChannelConnection) -> ListenerId;

    async fn unregister_listener(&self, id: ListenerId) -> Result<()>;

    async fn start_notify(&self, id: ListenerId, scope: Scope) -> Result<()>;

    async fn stop_notify(&self, id: ListenerId, scope: Scope) -> Result<()>;
}

/// RPC channel control operations
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcState {
    /// RpcApi channel open (connected)
    Connected,
    /// RpcApi channel close (disconnected)
    #[default]
    Disconnected,
}

#[derive(Default)]
struct Inner {
    // Current channel state
    state: Mutex<RpcState>,
    // MPMC channel for [`RpcState`] operations.
    multiplexer: Multiplexer<RpcState>,
    // Optional connection descriptor such as a connection URL.
    descriptor: Mutex<Option<String>>,
}

/// RPC channel control helper. This is a companion struct to
/// [`RpcApi`] that provides signaling for RPC open/close events
/// as well as an optional connection descriptor (URL).
#[derive(Default, Clone)]
pub struct RpcCtl {
    inner: Arc<Inner>,
}

impl RpcCtl {
    pub fn new() -> Self {
        Self { inner: Arc::new(Inner::default()) }
    }

    pub fn with_descriptor<Str: ToString>(descriptor: Option<Str>) -> Self {
        if let Some(descriptor) = descriptor {
            Self { inner: Arc::new(Inner { descriptor: Mutex::new(Some(descriptor.to_string())), ..Inner::default() }) }
        } else {
            Self::default()
        }
    }

    /// Obtain internal multiplexer (MPMC channel for [`RpcState`] operations)
    pub fn multiplexer(&self) -> &Multiplexer<RpcState> {
        &self.inner.multiplexer
    }

    pub fn is_connected(&self) -> bool {
        *self.inner.state.lock().unwrap() == RpcState::Connected
    }

    pub fn state(&self) -> RpcState {
        *self.inner.state.lock().unwrap()
    }

    /// Signal open to all listeners (async)
    pub async fn signal_open(&self) -> Result<()> {
        *self.inner.state.lock().unwrap() = RpcState::Connected;
        Ok(self.inner.multiplexer.broadcast(RpcState::Connected).await?)
    }

    /// Signal close to all listeners (async)
    pub async fn signal_close(&self) -> Result<()> {
        *self.inner.state.lock().unwrap() = RpcState::Disconnected;
        Ok(self.inner.multiplexer.broadcast(RpcState::Disconnected).await?)
    }

    /// Try signal open to all listeners (sync)
    pub fn try_signal_open(&self) -> Result<()> {
        *self.inner.state.lock().unwrap() = RpcState::Connected;
        Ok(self.inner.multiplexer.try_broadcast(RpcState::Connected)?)
    }

    /// Try signal close to all listeners (sync)
    pub fn try_signal_close(&self) -> Result<()> {
        *self.inner.state.lock().unwrap() = RpcState::Disconnected;
        Ok(self.inner.multiplexer.try_broadcast(RpcState::Disconnected)?)
    }

    /// Set the connection descriptor (URL, peer address, etc.)
    pub fn set_descriptor(&self, descriptor: Option<String>) {
        *self.inner.descriptor.lock().unwrap() = descriptor;
    }

    /// Get the connection descriptor (URL, peer address, etc.)
    pub fn descriptor(&self) -> Option<String> {
        self.inner.descriptor.lock().unwrap().clone()
    }
}

/// RPC adaptor struct that holds the [`RpcApi`]
/// and [`RpcCtl`] instances.
#[derive(Clone)]
pub struct Rpc {
    pub rpc_api: Arc<DynRpcApi>,
    pub rpc_ctl: RpcCtl,
}

impl Rpc {
    pub fn new(rpc_api: Arc<DynRpcApi>, rpc_ctl: RpcCtl) -> Self {
        Rpc { rpc_api, rpc_ctl }
    }

    pub fn rpc_api(&self) -> &Arc<DynRpcApi> {
        &self.rpc_api
    }

    pub fn rpc_ctl(&self) -> &RpcCtl {
        &self.rpc_ctl
    }
}
