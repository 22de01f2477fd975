//!
//! An in-process [`RpcApi`] implementation used by the integration
//! tests to drive the UTXO processor without a running node.
//!

use crate::imports::*;
use crate::rpc::{
    ChannelConnection, GetServerInfoResponse, ListenerId, Notification, RpcApi, Scope, UtxosChangedNotification,
    VirtualChainChangedNotification, VirtualDaaScoreChangedNotification,
};
use crate::tx::Transaction;

impl From<Arc<RpcCoreMock>> for Rpc {
    fn from(rpc_mock: Arc<RpcCoreMock>) -> Self {
        Self::new(rpc_mock.clone(), rpc_mock.ctl())
    }
}

pub struct RpcCoreMock {
    ctl: RpcCtl,
    network_id: NetworkId,
    virtual_daa_score: AtomicU64,
    /// Entries served by `get_utxos_by_addresses` during address
    /// registration scans.
    utxo_index: Mutex<Vec<crate::rpc::RpcUtxosByAddressesEntry>>,
    listeners: DashMap<ListenerId, ChannelConnection>,
    listener_sequence: AtomicU64,
    submitted: Mutex<Vec<TransactionId>>,
    fail_next_submission: AtomicBool,
}

impl RpcCoreMock {
    pub fn new(network_id: NetworkId, virtual_daa_score: u64) -> Self {
        Self {
            ctl: RpcCtl::with_descriptor(Some("mock")),
            network_id,
            virtual_daa_score: AtomicU64::new(virtual_daa_score),
            utxo_index: Mutex::new(vec![]),
            listeners: DashMap::new(),
            listener_sequence: AtomicU64::new(1),
            submitted: Mutex::new(vec![]),
            fail_next_submission: AtomicBool::new(false),
        }
    }

    pub fn ctl(&self) -> RpcCtl {
        self.ctl.clone()
    }

    pub fn add_utxo_index_entry(&self, entry: crate::rpc::RpcUtxosByAddressesEntry) {
        self.utxo_index.lock().unwrap().push(entry);
    }

    pub fn submitted_transactions(&self) -> Vec<TransactionId> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn fail_next_submission(&self) {
        self.fail_next_submission.store(true, Ordering::SeqCst);
    }

    fn notify(&self, notification: Notification) -> Result<()> {
        for listener in self.listeners.iter() {
            listener.value().send(notification.clone())?;
        }
        Ok(())
    }

    pub fn notify_daa_score_change(&self, virtual_daa_score: u64) -> Result<()> {
        self.virtual_daa_score.store(virtual_daa_score, Ordering::SeqCst);
        self.notify(Notification::VirtualDaaScoreChanged(VirtualDaaScoreChangedNotification { virtual_daa_score }))
    }

    pub fn notify_utxos_changed(
        &self,
        added: Vec<crate::rpc::RpcUtxosByAddressesEntry>,
        removed: Vec<crate::rpc::RpcUtxosByAddressesEntry>,
    ) -> Result<()> {
        self.notify(Notification::UtxosChanged(UtxosChangedNotification { added: Arc::new(added), removed: Arc::new(removed) }))
    }

    pub fn notify_virtual_chain_changed(&self, accepted_transaction_ids: Vec<TransactionId>) -> Result<()> {
        self.notify(Notification::VirtualChainChanged(VirtualChainChangedNotification {
            accepted_transaction_ids: Arc::new(accepted_transaction_ids),
        }))
    }
}

#[async_trait]
impl RpcApi for RpcCoreMock {
    async fn get_server_info(&self) -> Result<GetServerInfoResponse> {
        Ok(GetServerInfoResponse {
            server_version: "mock".to_string(),
            network_id: self.network_id,
            has_utxo_index: true,
            is_synced: true,
            virtual_daa_score: self.virtual_daa_score.load(Ordering::SeqCst),
        })
    }

    async fn get_utxos_by_addresses(&self, addresses: Vec<Address>) -> Result<Vec<crate::rpc::RpcUtxosByAddressesEntry>> {
        let entries = self
            .utxo_index
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.address.as_ref().map(|address| addresses.contains(address)).unwrap_or(false))
            .cloned()
            .collect();
        Ok(entries)
    }

    async fn submit_transaction(&self, transaction: Transaction, _allow_orphan: bool) -> Result<TransactionId> {
        if self.fail_next_submission.swap(false, Ordering::SeqCst) {
            return Err(Error::Rpc("transaction rejected by the mock node".to_string()));
        }
        let txid = transaction.id();
        self.submitted.lock().unwrap().push(txid);
        Ok(txid)
    }

    fn register_new_listener(&self, connection: ChannelConnection) -> ListenerId {
        let id = self.listener_sequence.fetch_add(1, Ordering::SeqCst);
        self.listeners.insert(id, connection);
        id
    }

    async fn unregister_listener(&self, id: ListenerId) -> Result<()> {
        self.listeners.remove(&id);
        Ok(())
    }

    async fn start_notify(&self, _id: ListenerId, _scope: Scope) -> Result<()> {
        Ok(())
    }

    async fn stop_notify(&self, _id: ListenerId, _scope: Scope) -> Result<()> {
        Ok(())
    }
}
