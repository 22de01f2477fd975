//!
//! Implements the [`UtxoContext`] type, which monitors the UTXO set
//! of a client-supplied address set, tracks entry maturity and
//! maintains the context balance.
//!

use crate::imports::*;
use crate::tx::generator::PendingTransaction;
use crate::utxo::{
    PendingUtxoEntryReference, UtxoContextBinding, UtxoContextId, UtxoEntryId, UtxoEntryReference, UtxoProcessor,
};
use sorted_insert::SortedInsertBinary;
use std::collections::hash_map::Entry;
use workflow_core::time::{Duration, Instant};

pub struct Consumed {
    entry: UtxoEntryReference,
    instant: Instant,
}

impl Consumed {
    pub fn entry(&self) -> &UtxoEntryReference {
        &self.entry
    }
}

impl From<(UtxoEntryReference, &Instant)> for Consumed {
    fn from((entry, instant): (UtxoEntryReference, &Instant)) -> Self {
        Self { entry, instant: *instant }
    }
}

impl From<(&UtxoEntryReference, &Instant)> for Consumed {
    fn from((entry, instant): (&UtxoEntryReference, &Instant)) -> Self {
        Self { entry: entry.clone(), instant: *instant }
    }
}

pub enum UtxoEntryVariant {
    Mature(UtxoEntryReference),
    Pending(UtxoEntryReference),
    Stasis(UtxoEntryReference),
    Consumed(UtxoEntryReference),
}

#[derive(Default)]
pub struct Context {
    /// Mature (spendable) UTXOs, sorted by amount ascending.
    pub(crate) mature: Vec<UtxoEntryReference>,
    /// UTXOs that have not reached their maturity period.
    pub(crate) pending: AHashMap<UtxoEntryId, UtxoEntryReference>,
    /// Coinbase UTXOs in stasis.
    pub(crate) stasis: AHashMap<UtxoEntryId, UtxoEntryReference>,
    /// UTXOs consumed by an outgoing transaction, pending
    /// removal by the UtxosChanged notification.
    pub(crate) consumed: AHashMap<UtxoEntryId, Consumed>,
    /// All UTXOs known to this context.
    pub(crate) map: AHashMap<UtxoEntryId, UtxoEntryReference>,
    /// Outgoing transactions that have not yet been accepted.
    pub(crate) outgoing: AHashMap<TransactionId, OutgoingTransaction>,
    /// Addresses monitored by this context.
    pub(crate) addresses: Arc<DashSet<Arc<Address>>>,
    balance: Option<Balance>,
    // Running totals, updated on each set mutation so that balance
    // generation is independent of the UTXO set size.
    mature_total: u64,
    pending_total: u64,
}

impl Context {
    pub fn clear(&mut self) {
        self.map.clear();
        self.mature.clear();
        self.consumed.clear();
        self.pending.clear();
        self.stasis.clear();
        self.outgoing.clear();
        self.addresses.clear();
        self.balance = None;
        self.mature_total = 0;
        self.pending_total = 0;
    }
}

struct Inner {
    context: Mutex<Context>,
    processor: UtxoProcessor,
    binding: Mutex<UtxoContextBinding>,
}

impl Inner {
    pub fn new(processor: &UtxoProcessor, binding: UtxoContextBinding) -> Self {
        Self { context: Mutex::new(Context::default()), processor: processor.clone(), binding: Mutex::new(binding) }
    }
}

/// Monitors the UTXO set of a client-supplied address set. A single
/// [`UtxoProcessor`] can host multiple contexts, each receiving its
/// own balance and transaction lifecycle events.
#[derive(Clone)]
pub struct UtxoContext {
    inner: Arc<Inner>,
}

impl UtxoContext {
    pub fn new(processor: &UtxoProcessor) -> Self {
        Self { inner: Arc::new(Inner::new(processor, UtxoContextBinding::default())) }
    }

    pub fn new_with_id(processor: &UtxoProcessor, id: UtxoContextId) -> Self {
        Self { inner: Arc::new(Inner::new(processor, UtxoContextBinding::Id(id))) }
    }

    pub fn context(&self) -> MutexGuard<Context> {
        self.inner.context.lock().unwrap()
    }

    pub fn processor(&self) -> &UtxoProcessor {
        &self.inner.processor
    }

    pub fn binding(&self) -> UtxoContextBinding {
        self.inner.binding.lock().unwrap().clone()
    }

    pub fn id(&self) -> UtxoContextId {
        self.inner.binding.lock().unwrap().id()
    }

    pub fn mature_utxo_size(&self) -> usize {
        self.context().mature.len()
    }

    pub fn pending_utxo_size(&self) -> usize {
        self.context().pending.len()
    }

    pub fn balance(&self) -> Option<Balance> {
        self.context().balance.clone()
    }

    pub fn addresses(&self) -> Arc<DashSet<Arc<Address>>> {
        self.context().addresses.clone()
    }

    /// Produce the current balance from the running totals and
    /// post a balance update event.
    pub async fn update_balance(&self) -> Result<Balance> {
        let (balance, changed) = {
            let previous_balance = self.balance();
            let mut balance = self.generate_balance();
            balance.delta(&previous_balance);
            let changed = previous_balance.map(|previous| !balance.eq_totals(&previous)).unwrap_or(true);
            self.context().balance.replace(balance.clone());
            (balance, changed)
        };

        // balance events fire only when the totals change
        if changed {
            self.processor().notify(Events::Balance { balance: Some(balance.clone()), id: self.id() }).await?;
        }

        Ok(balance)
    }

    /// Balance generation relies on the running totals and is
    /// independent of the UTXO set size.
    fn generate_balance(&self) -> Balance {
        let context = self.context();
        // final payments of outgoing transactions that have not been
        // accepted yet remain reflected as in-flight value
        let outgoing =
            context.outgoing.values().filter_map(|tx| if !tx.is_accepted() { tx.payment_value() } else { None }).sum::<u64>();
        Balance::new(
            context.mature_total,
            context.pending_total,
            outgoing,
            context.mature.len(),
            context.pending.len(),
            context.stasis.len(),
        )
    }

    /// Removes entries from the mature utxo set and adds them
    /// to the consumed utxo set.
    pub(crate) fn consume(&self, entries: &[UtxoEntryReference]) -> Result<()> {
        let mut context = self.context();

        let ids = entries.iter().map(|entry| entry.id()).collect::<AHashSet<_>>();
        let mut consumed_total = 0;
        context.mature.retain(|entry| {
            if ids.contains(&entry.id()) {
                consumed_total += entry.amount();
                false
            } else {
                true
            }
        });
        context.mature_total -= consumed_total;

        let now = Instant::now();
        entries.iter().for_each(|entry| {
            context.consumed.insert(entry.id(), (entry, &now).into());
        });

        Ok(())
    }

    /// Insert `utxo_entry` into this context. Entries arriving from
    /// our own outgoing transactions (change) are inserted with
    /// `force_maturity` and skip the maturity period.
    /// NOTE: The insert will be ignored if the entry is already
    /// present in the inner map.
    pub fn insert(&self, utxo_entry: UtxoEntryReference, current_daa_score: u64, force_maturity: bool) -> Result<()> {
        let params = self.processor().network_params()?;
        let mut context = self.context();

        if let Entry::Vacant(e) = context.map.entry(utxo_entry.id()) {
            e.insert(utxo_entry.clone());
            if force_maturity {
                context.mature_total += utxo_entry.amount();
                context.mature.sorted_insert_asc_binary(utxo_entry);
            } else {
                match utxo_entry.maturity(&params, current_daa_score) {
                    Maturity::Stasis => {
                        context.stasis.insert(utxo_entry.id(), utxo_entry.clone());
                        self.processor()
                            .pending()
                            .insert(utxo_entry.id(), PendingUtxoEntryReference::new(utxo_entry, self.clone()));
                    }
                    Maturity::Pending => {
                        context.pending_total += utxo_entry.amount();
                        context.pending.insert(utxo_entry.id(), utxo_entry.clone());
                        self.processor()
                            .pending()
                            .insert(utxo_entry.id(), PendingUtxoEntryReference::new(utxo_entry, self.clone()));
                    }
                    Maturity::Confirmed => {
                        context.mature_total += utxo_entry.amount();
                        context.mature.sorted_insert_asc_binary(utxo_entry);
                    }
                }
            }
            Ok(())
        } else {
            log_warn!("ignoring duplicate utxo entry");
            Ok(())
        }
    }

    pub fn remove(&self, ids: Vec<UtxoEntryId>) -> Result<Vec<UtxoEntryVariant>> {
        let mut context = self.context();

        let mut removed = vec![];
        let mut remove_mature_ids = vec![];

        for id in ids.into_iter() {
            if context.map.remove(&id).is_some() {
                if let Some(pending) = context.pending.remove(&id) {
                    context.pending_total -= pending.amount();
                    removed.push(UtxoEntryVariant::Pending(pending));
                    if self.processor().pending().remove(&id).is_none() {
                        log_error!("unable to remove utxo entry from global pending (with context)");
                    }
                } else if let Some(stasis) = context.stasis.remove(&id) {
                    removed.push(UtxoEntryVariant::Stasis(stasis));
                    if self.processor().pending().remove(&id).is_none() {
                        log_error!("unable to remove utxo entry from global pending (with context)");
                    }
                } else {
                    remove_mature_ids.push(id);
                }
            } else {
                log_error!("unable to remove utxo entry from local map (with context)");
            }
        }

        let remove_mature_ids = remove_mature_ids
            .into_iter()
            .filter(|id| {
                if let Some(consumed) = context.consumed.remove(id) {
                    removed.push(UtxoEntryVariant::Consumed(consumed.entry));
                    false
                } else {
                    true
                }
            })
            .collect::<Vec<_>>();

        let mut removed_total = 0;
        context.mature.retain(|entry| {
            if remove_mature_ids.contains(&entry.id()) {
                removed_total += entry.amount();
                removed.push(UtxoEntryVariant::Mature(entry.clone()));
                false
            } else {
                true
            }
        });
        context.mature_total -= removed_total;

        Ok(removed)
    }

    /// Promote pending UTXOs to the mature state and notify
    /// a [`Maturity`](Events::Maturity) record per transaction.
    pub(crate) async fn promote(&self, utxos: Vec<UtxoEntryReference>) -> Result<()> {
        let transactions = group_by_transaction(&utxos);

        {
            let mut context = self.context();
            for utxo_entry in utxos.into_iter() {
                let id = utxo_entry.id();
                if context.pending.remove(&id).is_some() {
                    context.pending_total -= utxo_entry.amount();
                    context.mature_total += utxo_entry.amount();
                    context.mature.sorted_insert_asc_binary(utxo_entry);
                } else if context.stasis.remove(&id).is_some() {
                    // a DAA score jump can carry a coinbase entry past
                    // both the stasis and maturity thresholds at once
                    context.mature_total += utxo_entry.amount();
                    context.mature.sorted_insert_asc_binary(utxo_entry);
                } else {
                    log_error!("non-pending utxo promotion!");
                }
            }
        }

        for (txid, utxos) in transactions.into_iter() {
            let record = TransactionRecord::new_incoming(self, txid, &utxos);
            self.processor().notify(Events::Maturity { record }).await?;
        }

        self.update_balance().await?;
        Ok(())
    }

    /// Move coinbase UTXOs that have left the stasis period into the
    /// pending state and notify a [`Pending`](Events::Pending) record
    /// per transaction.
    pub(crate) async fn revive_stasis(&self, utxos: Vec<UtxoEntryReference>) -> Result<()> {
        let revived = {
            let mut context = self.context();
            let mut revived = vec![];
            for utxo_entry in utxos.into_iter() {
                let id = utxo_entry.id();
                // entries already in the pending state pass through
                // this check on every DAA tick
                if context.stasis.remove(&id).is_some() {
                    context.pending_total += utxo_entry.amount();
                    context.pending.insert(id, utxo_entry.clone());
                    revived.push(utxo_entry);
                }
            }
            revived
        };

        if revived.is_empty() {
            return Ok(());
        }

        for (txid, utxos) in group_by_transaction(&revived).into_iter() {
            let record = TransactionRecord::new_incoming(self, txid, &utxos);
            self.processor().notify(Events::Pending { record }).await?;
        }

        self.update_balance().await?;
        Ok(())
    }

    /// Ingest UTXO entries discovered during address registration,
    /// notifying a [`Discovery`](Events::Discovery) record per
    /// transaction.
    pub async fn extend_from_scan(&self, utxo_entries: Vec<UtxoEntryReference>, current_daa_score: u64) -> Result<()> {
        let transactions = group_by_transaction(&utxo_entries);

        for utxo_entry in utxo_entries.into_iter() {
            self.insert(utxo_entry, current_daa_score, false)?;
        }

        for (txid, utxos) in transactions.into_iter() {
            let record = TransactionRecord::new_incoming(self, txid, &utxos);
            self.processor().notify(Events::Discovery { record }).await?;
        }

        self.update_balance().await?;
        Ok(())
    }

    // recover UTXOs that went into `consumed` state but were never
    // removed from the set by the UtxosChanged notification.
    pub(crate) async fn recover(&self, duration: Option<Duration>) -> Result<bool> {
        let mut context = self.context();
        if context.consumed.is_empty() {
            return Ok(false);
        }

        let checkpoint = Instant::now()
            .checked_sub(duration.unwrap_or(Duration::from_secs(crate::utxo::processor::UTXO_RECOVERY_PERIOD_SECONDS)))
            .ok_or(Error::custom("UtxoContext::recover() invalid recovery period"))?;
        let mut recovered = vec![];
        context.consumed.retain(|_, consumed| {
            if consumed.instant < checkpoint {
                recovered.push(consumed.entry.clone());
                false
            } else {
                true
            }
        });

        let recovered_any = !recovered.is_empty();
        let mut recovered_total = 0;
        recovered.into_iter().for_each(|entry| {
            recovered_total += entry.amount();
            context.mature.sorted_insert_asc_binary(entry);
        });
        context.mature_total += recovered_total;

        Ok(recovered_any)
    }

    /// Register an outgoing transaction with this context, consuming
    /// the UTXO entries it spends.
    pub(crate) async fn register_outgoing_transaction(&self, pending_tx: &PendingTransaction) -> Result<()> {
        let current_daa_score =
            self.processor().current_daa_score().ok_or(Error::MissingDaaScore("register_outgoing_transaction()"))?;
        let outgoing_transaction = OutgoingTransaction::new(current_daa_score, self.clone(), pending_tx.clone());
        let entries = outgoing_transaction.utxo_entries().values().cloned().collect::<Vec<_>>();
        self.consume(&entries)?;
        self.context().outgoing.insert(outgoing_transaction.id(), outgoing_transaction);

        Ok(())
    }

    /// Post the balance update reflecting an outgoing transaction that
    /// has been successfully submitted. Final transactions are also
    /// announced with a [`Pending`](Events::Pending) record.
    pub(crate) async fn notify_outgoing_transaction(&self, pending_tx: &PendingTransaction) -> Result<()> {
        let outgoing = self
            .context()
            .outgoing
            .get(&pending_tx.id())
            .cloned()
            .ok_or(Error::custom("notify_outgoing_transaction(): transaction is not registered"))?;

        if !outgoing.is_batch() {
            let record = TransactionRecord::new_outgoing(self, &outgoing, None)?;
            self.processor().notify(Events::Pending { record }).await?;
        }

        self.update_balance().await?;
        Ok(())
    }

    /// Cancel an outgoing transaction that failed to submit, returning
    /// its consumed UTXO entries to the mature set.
    pub(crate) async fn cancel_outgoing_transaction(&self, pending_tx: &PendingTransaction) -> Result<()> {
        let mut context = self.context();

        let outgoing = context
            .outgoing
            .remove(&pending_tx.id())
            .ok_or(Error::custom("cancel_outgoing_transaction(): transaction is not registered"))?;

        let mut restored_total = 0;
        for entry in outgoing.utxo_entries().values() {
            if context.consumed.remove(&entry.id()).is_some() {
                restored_total += entry.amount();
                context.mature.sorted_insert_asc_binary(entry.clone());
            }
        }
        context.mature_total += restored_total;

        Ok(())
    }

    fn outgoing_transaction(&self, txid: &TransactionId) -> Option<OutgoingTransaction> {
        self.context().outgoing.get(txid).cloned()
    }

    // Drop accepted outgoing transactions that have no remaining
    // consumed entries in this context.
    fn purge_finalized_outgoing_transactions(&self) {
        let mut context = self.context();
        let Context { outgoing, consumed, .. } = &mut *context;
        outgoing.retain(|_, tx| {
            !tx.is_accepted() || tx.utxo_entries().keys().any(|id| consumed.contains_key(id))
        });
    }

    /// Tag outgoing transactions accepted by the virtual chain and
    /// drop those that are fully settled.
    pub(crate) async fn handle_acceptance(&self, accepted_transaction_ids: &[TransactionId], current_daa_score: u64) -> Result<()> {
        let mut accepted_any = false;
        {
            let context = self.context();
            for txid in accepted_transaction_ids.iter() {
                if let Some(outgoing_transaction) = context.outgoing.get(txid) {
                    if !outgoing_transaction.is_accepted() {
                        outgoing_transaction.tag_as_accepted_at_daa_score(current_daa_score);
                        accepted_any = true;
                    }
                }
            }
        }

        if accepted_any {
            self.purge_finalized_outgoing_transactions();
            self.update_balance().await?;
        }

        Ok(())
    }

    pub(crate) async fn handle_utxo_added(&self, utxos: Vec<UtxoEntryReference>, current_daa_score: u64) -> Result<()> {
        let params = self.processor().network_params()?;
        let added = group_by_transaction(&utxos);

        for (txid, utxos) in added.into_iter() {
            // change arriving from our own outgoing transaction matures
            // immediately
            let outgoing_transaction = self.outgoing_transaction(&txid);
            let force_maturity = outgoing_transaction.is_some();
            let is_stasis =
                utxos.first().map(|utxo| matches!(utxo.maturity(&params, current_daa_score), Maturity::Stasis)).unwrap_or(false);

            for utxo in utxos.iter() {
                if let Err(err) = self.insert(utxo.clone(), current_daa_score, force_maturity) {
                    log_error!("{}", err);
                }
            }

            if let Some(outgoing_transaction) = outgoing_transaction {
                outgoing_transaction.tag_as_accepted_at_daa_score(current_daa_score);

                let record = if outgoing_transaction.is_batch() {
                    TransactionRecord::new_batch(self, &outgoing_transaction, Some(current_daa_score))?
                } else {
                    TransactionRecord::new_change(self, &outgoing_transaction, Some(current_daa_score), &utxos)?
                };
                self.processor().notify(Events::Pending { record }).await?;
            } else if is_stasis {
                let record = TransactionRecord::new_stasis(self, txid, &utxos);
                self.processor().notify(Events::Stasis { record }).await?;
            } else {
                let record = TransactionRecord::new_incoming(self, txid, &utxos);
                self.processor().notify(Events::Pending { record }).await?;
            }
        }

        self.update_balance().await?;
        Ok(())
    }

    pub(crate) async fn handle_utxo_removed(&self, utxos: Vec<UtxoEntryReference>, _current_daa_score: u64) -> Result<()> {
        let utxo_ids: Vec<UtxoEntryId> = utxos.iter().map(|utxo| utxo.id()).collect();
        let removed = self.remove(utxo_ids)?;

        let mut mature = vec![];
        let mut pending = vec![];
        let mut stasis = vec![];
        let mut consumed = false;

        removed.into_iter().for_each(|entry| match entry {
            UtxoEntryVariant::Mature(utxo) => {
                mature.push(utxo);
            }
            UtxoEntryVariant::Pending(utxo) => {
                pending.push(utxo);
            }
            UtxoEntryVariant::Stasis(utxo) => {
                stasis.push(utxo);
            }
            UtxoEntryVariant::Consumed(_) => {
                // expected removal following our own outgoing transaction
                consumed = true;
            }
        });

        // mature UTXOs removed without being consumed by this instance
        // were spent externally
        for (txid, utxos) in group_by_transaction(&mature).into_iter() {
            let record = TransactionRecord::new_external(self, txid, &utxos);
            self.processor().notify(Events::External { record }).await?;
        }

        for (txid, utxos) in group_by_transaction(&pending).into_iter() {
            let record = TransactionRecord::new_reorg(self, txid, &utxos);
            self.processor().notify(Events::Reorg { record }).await?;
        }

        for (txid, utxos) in group_by_transaction(&stasis).into_iter() {
            let record = TransactionRecord::new_stasis(self, txid, &utxos);
            self.processor().notify(Events::Stasis { record }).await?;
        }

        if consumed {
            self.purge_finalized_outgoing_transactions();
        }

        self.update_balance().await?;
        Ok(())
    }

    pub async fn register_addresses(&self, addresses: &[Address]) -> Result<()> {
        let local = self.addresses();

        let addresses = addresses
            .iter()
            .filter_map(|address| {
                let address = Arc::new(address.clone());
                if local.insert(address.clone()) {
                    Some(address)
                } else {
                    None
                }
            })
            .collect::<Vec<_>>();

        self.processor().register_addresses(addresses.clone(), self).await?;

        // pick up UTXOs already present in the node's UTXO index
        if self.processor().is_connected() && !addresses.is_empty() {
            let current_daa_score =
                self.processor().current_daa_score().ok_or(Error::MissingDaaScore("UtxoContext::register_addresses()"))?;
            let addresses = addresses.iter().map(|address| (**address).clone()).collect::<Vec<_>>();
            let entries = self.processor().rpc_api().get_utxos_by_addresses(addresses).await?;
            let utxos = entries.into_iter().map(UtxoEntryReference::from).collect::<Vec<_>>();
            if !utxos.is_empty() {
                self.extend_from_scan(utxos, current_daa_score).await?;
            }
        }

        Ok(())
    }

    pub async fn unregister_addresses(&self, addresses: Vec<Address>) -> Result<()> {
        if !addresses.is_empty() {
            let local = self.addresses();
            let addresses = addresses.into_iter().map(Arc::new).collect::<Vec<_>>();
            self.processor().unregister_addresses(addresses.clone()).await?;
            addresses.iter().for_each(|address| {
                local.remove(address);
            });
        } else {
            log_warn!("utxo context: unregistering empty address set");
        }

        Ok(())
    }

    /// Drop all state held by this context, unregistering its
    /// addresses from the processor.
    pub async fn clear(&self) -> Result<()> {
        let local = self.addresses();
        let addresses = local.iter().map(|v| v.clone()).collect::<Vec<_>>();
        if !addresses.is_empty() {
            self.processor().unregister_addresses(addresses).await?;
            local.clear();
        }

        self.context().clear();

        Ok(())
    }
}

fn group_by_transaction(utxos: &[UtxoEntryReference]) -> AHashMap<TransactionId, Vec<UtxoEntryReference>> {
    let mut transactions = AHashMap::<TransactionId, Vec<UtxoEntryReference>>::new();
    for utxo in utxos.iter() {
        transactions.entry(utxo.transaction_id()).or_default().push(utxo.clone());
    }
    transactions
}
