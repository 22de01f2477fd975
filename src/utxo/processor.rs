//!
//! Implements the [`UtxoProcessor`], which coordinates the RPC
//! connection lifecycle, receives node notifications and relays
//! them to the [`UtxoContext`] instances registered with it.
//!

use crate::imports::*;
use crate::rpc::{
    ChannelConnection, GetServerInfoResponse, ListenerId, Notification, NotificationChannel, Rpc, RpcState, Scope,
    UtxosChangedNotification, UtxosChangedScope, VirtualChainChangedNotification,
};
use crate::utxo::{PendingUtxoEntryReference, UtxoContext, UtxoContextId, UtxoEntryId, UtxoEntryReference};
use workflow_core::channel::{Channel, DuplexChannel, Multiplexer};
use workflow_core::task::spawn;

/// Recovery period for UTXOs consumed by an outgoing transaction
/// but never removed by a UtxosChanged notification.
pub(crate) const UTXO_RECOVERY_PERIOD_SECONDS: u64 = 180;

pub struct Inner {
    /// Pending (and stasis) entries across all contexts, checked for
    /// maturity on each DAA score change.
    pending: DashMap<UtxoEntryId, PendingUtxoEntryReference>,
    address_to_utxo_context_map: DashMap<Arc<Address>, UtxoContext>,
    current_daa_score: Arc<AtomicU64>,
    network_id: Arc<Mutex<Option<NetworkId>>>,
    network_params: Arc<Mutex<Option<NetworkParams>>>,

    rpc: Mutex<Rpc>,
    is_connected: AtomicBool,
    listener_id: Mutex<Option<ListenerId>>,
    task_ctl: DuplexChannel,
    task_is_running: AtomicBool,
    notification_channel: NotificationChannel,
    multiplexer: Multiplexer<Box<Events>>,
}

impl Inner {
    pub fn new(rpc: &Rpc, network_id: Option<NetworkId>, multiplexer: &Multiplexer<Box<Events>>) -> Self {
        Self {
            pending: DashMap::new(),
            address_to_utxo_context_map: DashMap::new(),
            current_daa_score: Arc::new(AtomicU64::new(0)),
            network_id: Arc::new(Mutex::new(network_id)),
            network_params: Arc::new(Mutex::new(network_id.map(NetworkParams::from))),

            rpc: Mutex::new(rpc.clone()),
            is_connected: AtomicBool::new(false),
            listener_id: Mutex::new(None),
            task_ctl: DuplexChannel::oneshot(),
            task_is_running: AtomicBool::new(false),
            notification_channel: Channel::<Notification>::unbounded(),
            multiplexer: multiplexer.clone(),
        }
    }
}

#[derive(Clone)]
pub struct UtxoProcessor {
    inner: Arc<Inner>,
}

impl UtxoProcessor {
    pub fn new(rpc: &Rpc, network_id: Option<NetworkId>, multiplexer: Option<Multiplexer<Box<Events>>>) -> Self {
        let multiplexer = multiplexer.unwrap_or_default();
        UtxoProcessor { inner: Arc::new(Inner::new(rpc, network_id, &multiplexer)) }
    }

    pub fn rpc_api(&self) -> Arc<DynRpcApi> {
        self.inner.rpc.lock().unwrap().rpc_api().clone()
    }

    pub fn rpc_ctl(&self) -> RpcCtl {
        self.inner.rpc.lock().unwrap().rpc_ctl().clone()
    }

    pub fn rpc_url(&self) -> Option<String> {
        self.rpc_ctl().descriptor()
    }

    pub fn multiplexer(&self) -> &Multiplexer<Box<Events>> {
        &self.inner.multiplexer
    }

    pub fn listener_id(&self) -> Result<ListenerId> {
        self.inner.listener_id.lock().unwrap().ok_or(Error::custom("missing notification listener"))
    }

    pub fn set_network_id(&self, network_id: NetworkId) {
        self.inner.network_id.lock().unwrap().replace(network_id);
        self.inner.network_params.lock().unwrap().replace(NetworkParams::from(network_id));
    }

    pub fn network_id(&self) -> Result<NetworkId> {
        (*self.inner.network_id.lock().unwrap()).ok_or(Error::MissingNetworkId)
    }

    /// Maturity thresholds and mass combination settings for the
    /// current network. Replaceable for simulation purposes.
    pub fn network_params(&self) -> Result<NetworkParams> {
        (*self.inner.network_params.lock().unwrap()).ok_or(Error::MissingNetworkId)
    }

    pub fn set_network_params(&self, network_params: NetworkParams) {
        self.inner.network_params.lock().unwrap().replace(network_params);
    }

    pub fn pending(&self) -> &DashMap<UtxoEntryId, PendingUtxoEntryReference> {
        &self.inner.pending
    }

    pub fn current_daa_score(&self) -> Option<u64> {
        self.is_connected().then_some(self.inner.current_daa_score.load(Ordering::SeqCst))
    }

    pub fn address_to_utxo_context(&self, address: &Address) -> Option<UtxoContext> {
        self.inner.address_to_utxo_context_map.get(address).map(|v| v.clone())
    }

    pub async fn register_addresses(&self, addresses: Vec<Arc<Address>>, utxo_context: &UtxoContext) -> Result<()> {
        addresses.iter().for_each(|address| {
            self.inner.address_to_utxo_context_map.insert(address.clone(), utxo_context.clone());
        });

        if self.is_connected() {
            if !addresses.is_empty() {
                let addresses = addresses.into_iter().map(|address| (*address).clone()).collect::<Vec<_>>();
                let utxos_changed_scope = UtxosChangedScope::new(addresses);
                self.rpc_api().start_notify(self.listener_id()?, utxos_changed_scope.into()).await?;
            } else {
                log_warn!("registering empty address list!");
            }
        }
        Ok(())
    }

    pub async fn unregister_addresses(&self, addresses: Vec<Arc<Address>>) -> Result<()> {
        addresses.iter().for_each(|address| {
            self.inner.address_to_utxo_context_map.remove(address);
        });

        if self.is_connected() {
            if !addresses.is_empty() {
                let addresses = addresses.into_iter().map(|address| (*address).clone()).collect::<Vec<_>>();
                let utxos_changed_scope = UtxosChangedScope::new(addresses);
                self.rpc_api().stop_notify(self.listener_id()?, utxos_changed_scope.into()).await?;
            } else {
                log_warn!("unregistering empty address list!");
            }
        }
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.inner.is_connected.load(Ordering::SeqCst)
    }

    pub async fn notify(&self, event: Events) -> Result<()> {
        self.multiplexer()
            .broadcast(Box::new(event))
            .await
            .map_err(|_| Error::custom("multiplexer channel error during notify"))?;
        Ok(())
    }

    pub fn try_notify(&self, event: Events) -> Result<()> {
        self.multiplexer()
            .try_broadcast(Box::new(event))
            .map_err(|_| Error::custom("multiplexer channel error during try_notify"))?;
        Ok(())
    }

    pub async fn handle_daa_score_change(&self, current_daa_score: u64) -> Result<()> {
        self.inner.current_daa_score.store(current_daa_score, Ordering::SeqCst);
        self.notify(Events::DaaScoreChange { current_daa_score }).await?;
        self.handle_pending(current_daa_score).await?;
        Ok(())
    }

    pub async fn handle_pending(&self, current_daa_score: u64) -> Result<()> {
        let params = self.network_params()?;

        let (mature_entries, revived_entries) = {
            let mut mature_entries = vec![];
            let mut revived_entries = vec![];
            self.inner.pending.retain(|_, pending| match pending.maturity(&params, current_daa_score) {
                Maturity::Confirmed => {
                    mature_entries.push(pending.clone());
                    false
                }
                Maturity::Pending => {
                    revived_entries.push(pending.clone());
                    true
                }
                Maturity::Stasis => true,
            });
            (mature_entries, revived_entries)
        };

        for (context, utxos) in group_by_context(mature_entries).into_iter() {
            context.promote(utxos).await?;
        }

        // coinbase entries leaving the stasis period surface as pending
        for (context, utxos) in group_by_context(revived_entries).into_iter() {
            context.revive_stasis(utxos).await?;
        }

        Ok(())
    }

    pub async fn handle_utxo_changed(&self, utxos: UtxosChangedNotification) -> Result<()> {
        let current_daa_score =
            self.current_daa_score().ok_or(Error::MissingDaaScore("UtxoProcessor::handle_utxo_changed()"))?;

        let added = (*utxos.added).clone().into_iter().filter_map(|entry| entry.address.clone().map(|address| (address, entry)));
        for (address, entries) in group_by_address(added).into_iter() {
            if let Some(utxo_context) = self.address_to_utxo_context(&address) {
                let entries = entries.into_iter().map(UtxoEntryReference::from).collect::<Vec<_>>();
                utxo_context.handle_utxo_added(entries, current_daa_score).await?;
            } else {
                log_error!("receiving UTXO Changed 'added' notification for an unknown address: {}", address);
            }
        }

        let removed = (*utxos.removed).clone().into_iter().filter_map(|entry| entry.address.clone().map(|address| (address, entry)));
        for (address, entries) in group_by_address(removed).into_iter() {
            if let Some(utxo_context) = self.address_to_utxo_context(&address) {
                let entries = entries.into_iter().map(UtxoEntryReference::from).collect::<Vec<_>>();
                utxo_context.handle_utxo_removed(entries, current_daa_score).await?;
            } else {
                log_error!("receiving UTXO Changed 'removed' notification for an unknown address: {}", address);
            }
        }

        Ok(())
    }

    pub async fn handle_virtual_chain_changed(&self, notification: VirtualChainChangedNotification) -> Result<()> {
        let current_daa_score =
            self.current_daa_score().ok_or(Error::MissingDaaScore("UtxoProcessor::handle_virtual_chain_changed()"))?;

        // contexts are registered through their addresses; visit each
        // distinct context once
        let mut contexts = AHashMap::<UtxoContextId, UtxoContext>::new();
        for entry in self.inner.address_to_utxo_context_map.iter() {
            let context = entry.value();
            contexts.entry(context.id()).or_insert_with(|| context.clone());
        }

        for context in contexts.into_values() {
            context.handle_acceptance(&notification.accepted_transaction_ids, current_daa_score).await?;
        }

        Ok(())
    }

    pub async fn init_state_from_server(&self) -> Result<()> {
        let GetServerInfoResponse { server_version, network_id: server_network_id, has_utxo_index, is_synced, virtual_daa_score } =
            self.rpc_api().get_server_info().await?;

        if !has_utxo_index {
            self.notify(Events::UtxoIndexNotEnabled { url: self.rpc_url() }).await?;
            return Err(Error::MissingUtxoIndex);
        }

        let network_id = self.network_id()?;
        if network_id != server_network_id {
            return Err(Error::NetworkTypeConnectionMismatch(network_id.to_string(), server_network_id.to_string()));
        }

        self.inner.current_daa_score.store(virtual_daa_score, Ordering::SeqCst);

        log_info!("Connected to kaspad: '{server_version}' on '{server_network_id}';  SYNC: {is_synced}  DAA: {virtual_daa_score}");
        self.notify(Events::ServerStatus { server_version, is_synced, network_id, url: self.rpc_url() }).await?;

        Ok(())
    }

    pub async fn handle_connect_impl(&self) -> Result<()> {
        self.init_state_from_server().await?;

        self.inner.is_connected.store(true, Ordering::SeqCst);
        self.register_notification_listener().await?;
        self.notify(Events::UtxoProcStart).await?;
        Ok(())
    }

    pub async fn handle_connect(&self) -> Result<()> {
        if let Err(err) = self.handle_connect_impl().await {
            log_error!("UtxoProcessor: error while connecting to node: {err}");
            self.notify(Events::UtxoProcError { message: err.to_string() }).await?;
        }
        Ok(())
    }

    pub async fn handle_disconnect(&self) -> Result<()> {
        self.inner.is_connected.store(false, Ordering::SeqCst);
        self.notify(Events::UtxoProcStop).await?;
        self.unregister_notification_listener().await?;
        Ok(())
    }

    async fn register_notification_listener(&self) -> Result<()> {
        let listener_id = self
            .rpc_api()
            .register_new_listener(ChannelConnection::new("utxo-processor", self.inner.notification_channel.sender.clone()));
        *self.inner.listener_id.lock().unwrap() = Some(listener_id);

        self.rpc_api().start_notify(listener_id, Scope::VirtualDaaScoreChanged).await?;
        self.rpc_api().start_notify(listener_id, Scope::VirtualChainChanged).await?;

        Ok(())
    }

    async fn unregister_notification_listener(&self) -> Result<()> {
        let listener_id = self.inner.listener_id.lock().unwrap().take();
        if let Some(id) = listener_id {
            // scoped subscriptions are dropped with the listener
            self.rpc_api().unregister_listener(id).await?;
        }
        Ok(())
    }

    async fn handle_notification(&self, notification: Notification) -> Result<()> {
        match notification {
            Notification::VirtualDaaScoreChanged(virtual_daa_score_changed_notification) => {
                self.handle_daa_score_change(virtual_daa_score_changed_notification.virtual_daa_score).await?;
            }

            Notification::UtxosChanged(utxos_changed_notification) => {
                self.handle_utxo_changed(utxos_changed_notification).await?;
            }

            Notification::VirtualChainChanged(virtual_chain_changed_notification) => {
                self.handle_virtual_chain_changed(virtual_chain_changed_notification).await?;
            }
        }

        Ok(())
    }

    pub async fn start(&self) -> Result<()> {
        let this = self.clone();
        let rpc_ctl_channel = self.rpc_ctl().multiplexer().channel();

        let task_ctl_receiver = self.inner.task_ctl.request.receiver.clone();
        let task_ctl_sender = self.inner.task_ctl.response.sender.clone();
        let notification_receiver = self.inner.notification_channel.receiver.clone();

        self.inner.task_is_running.store(true, Ordering::SeqCst);

        spawn(async move {
            loop {
                select_biased! {
                    msg = rpc_ctl_channel.receiver.recv().fuse() => {
                        match msg {
                            Ok(msg) => {
                                match msg {
                                    RpcState::Connected => {
                                        if let Ok(network_id) = this.network_id() {
                                            this.notify(Events::Connect {
                                                network_id,
                                                url: this.rpc_url(),
                                            }).await.unwrap_or_else(|err| log_error!("{err}"));
                                        }
                                        this.handle_connect().await.unwrap_or_else(|err| log_error!("{err}"));
                                    },
                                    RpcState::Disconnected => {
                                        if let Ok(network_id) = this.network_id() {
                                            this.notify(Events::Disconnect {
                                                network_id,
                                                url: this.rpc_url(),
                                            }).await.unwrap_or_else(|err| log_error!("{err}"));
                                        }
                                        this.handle_disconnect().await.unwrap_or_else(|err| log_error!("{err}"));
                                    }
                                }
                            }
                            Err(err) => {
                                log_error!("UtxoProcessor: error while receiving rpc_ctl_channel message: {err}");
                                log_error!("Suspending UTXO processor...");
                                break;
                            }
                        }
                    },
                    notification = notification_receiver.recv().fuse() => {
                        match notification {
                            Ok(notification) => {
                                this.handle_notification(notification).await.unwrap_or_else(|err| {
                                    log_error!("error while handling notification: {err}");
                                });
                            }
                            Err(err) => {
                                log_error!("RPC notification channel error: {err}");
                                log_error!("Suspending UTXO processor...");
                                break;
                            }
                        }
                    },
                    _ = task_ctl_receiver.recv().fuse() => {
                        break;
                    },
                }
            }

            this.inner.task_is_running.store(false, Ordering::SeqCst);
            task_ctl_sender.send(()).await.unwrap_or_else(|err| log_error!("UtxoProcessor task shutdown signal error: {err}"));
        });
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        if self.inner.task_is_running.load(Ordering::SeqCst) {
            self.inner.task_ctl.signal(()).await?;
        }
        Ok(())
    }
}

fn group_by_context(entries: Vec<PendingUtxoEntryReference>) -> Vec<(UtxoContext, Vec<UtxoEntryReference>)> {
    let mut contexts = AHashMap::<UtxoContextId, (UtxoContext, Vec<UtxoEntryReference>)>::new();
    for pending in entries.into_iter() {
        let context = pending.utxo_context().clone();
        contexts.entry(context.id()).or_insert_with(|| (context, vec![])).1.push(pending.entry().clone());
    }
    contexts.into_values().collect()
}

fn group_by_address<T>(entries: impl Iterator<Item = (Address, T)>) -> AHashMap<Address, Vec<T>> {
    let mut map = AHashMap::<Address, Vec<T>>::new();
    for (address, entry) in entries {
        map.entry(address).or_default().push(entry);
    }
    map
}
