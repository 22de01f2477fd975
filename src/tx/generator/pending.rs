//!
//! [`PendingTransaction`] encapsulates a transaction generated by the
//! [`Generator`], retaining references to the UTXO entries it consumes.
//! It provides signing helpers and a submit operation that reconciles
//! the originating [`UtxoContext`](crate::utxo::UtxoContext) on
//! success or failure.
//!

use crate::imports::*;
use crate::tx::generator::{Generator, SignerT};
use crate::tx::{SignableTransaction, Transaction};
use crate::utxo::{UtxoContext, UtxoEntryId, UtxoEntryReference};

/// Role of a generated transaction within a generation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// No transaction was generated (sweep with nothing to sweep).
    NoOp,
    /// Chained batch transaction carrying value forward to the
    /// next transaction via its change output.
    Node,
    /// Final transaction carrying the requested payment outputs.
    Final,
}

impl DataKind {
    pub fn is_final(&self) -> bool {
        matches!(self, DataKind::Final)
    }
    pub fn is_batch(&self) -> bool {
        matches!(self, DataKind::Node)
    }
}

pub struct PendingTransactionInner {
    /// Generator that produced the transaction
    pub(crate) generator: Generator,
    /// UtxoEntryReferences of the pending transaction
    pub(crate) utxo_entries: AHashMap<UtxoEntryId, UtxoEntryReference>,
    pub(crate) id: TransactionId,
    /// Transaction containing UTXO entries for signing
    pub signable_tx: Mutex<SignableTransaction>,
    /// Unique addresses of the UTXOs consumed by the transaction
    pub(crate) addresses: Vec<Address>,
    /// Whether the transaction has been committed to the network
    pub(crate) is_submitted: AtomicBool,
    /// Payment value of the transaction (`None` for sweeps)
    pub payment_value: Option<u64>,
    /// Change value of the transaction
    pub change_output_value: u64,
    /// Total input value
    pub aggregate_input_value: u64,
    /// Total output value
    pub aggregate_output_value: u64,
    /// Minimum number of signatures required for the transaction
    pub(crate) minimum_signatures: u16,
    /// Transaction mass
    pub(crate) mass: u64,
    /// Fees of the transaction
    pub fees: u64,
    /// Transaction role within the generation cycle
    pub(crate) kind: DataKind,
}

impl std::fmt::Debug for PendingTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let transaction = self.transaction();
        f.debug_struct("PendingTransaction")
            .field("id", &self.inner.id)
            .field("payment_value", &self.inner.payment_value)
            .field("change_output_value", &self.inner.change_output_value)
            .field("aggregate_input_value", &self.inner.aggregate_input_value)
            .field("mass", &self.inner.mass)
            .field("fees", &self.inner.fees)
            .field("kind", &self.inner.kind)
            .field("transaction", &transaction)
            .finish()
    }
}

/// Meta transaction encapsulating a transaction generated by the
/// [`Generator`]. Contains auxiliary information about the
/// transaction such as aggregate input/output amounts, fees, etc.
#[derive(Clone)]
pub struct PendingTransaction {
    pub inner: Arc<PendingTransactionInner>,
}

impl PendingTransaction {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn try_new(
        generator: &Generator,
        transaction: Transaction,
        utxo_entries: Vec<UtxoEntryReference>,
        addresses: Vec<Address>,
        payment_value: Option<u64>,
        change_output_value: u64,
        aggregate_input_value: u64,
        aggregate_output_value: u64,
        minimum_signatures: u16,
        mass: u64,
        fees: u64,
        kind: DataKind,
    ) -> Result<Self> {
        let entries = utxo_entries.iter().map(|entry| Some(crate::tx::UtxoEntry::from(entry))).collect::<Vec<_>>();
        let signable_tx = Mutex::new(SignableTransaction::new(transaction, entries));
        let id = signable_tx.lock().unwrap().id();
        let utxo_entries = utxo_entries.into_iter().map(|entry| (entry.id(), entry)).collect::<AHashMap<_, _>>();

        Ok(Self {
            inner: Arc::new(PendingTransactionInner {
                generator: generator.clone(),
                utxo_entries,
                id,
                signable_tx,
                addresses,
                is_submitted: AtomicBool::new(false),
                payment_value,
                change_output_value,
                aggregate_input_value,
                aggregate_output_value,
                minimum_signatures,
                mass,
                fees,
                kind,
            }),
        })
    }

    pub fn id(&self) -> TransactionId {
        self.inner.id
    }

    pub fn generator(&self) -> &Generator {
        &self.inner.generator
    }

    pub fn source_utxo_context(&self) -> &Option<UtxoContext> {
        self.inner.generator.source_utxo_context()
    }

    pub fn destination_utxo_context(&self) -> &Option<UtxoContext> {
        self.inner.generator.destination_utxo_context()
    }

    /// Addresses used by the transaction inputs.
    pub fn addresses(&self) -> &Vec<Address> {
        &self.inner.addresses
    }

    /// UTXO entries consumed by the transaction.
    pub fn utxo_entries(&self) -> &AHashMap<UtxoEntryId, UtxoEntryReference> {
        &self.inner.utxo_entries
    }

    pub fn fees(&self) -> u64 {
        self.inner.fees
    }

    pub fn mass(&self) -> u64 {
        self.inner.mass
    }

    pub fn minimum_signatures(&self) -> u16 {
        self.inner.minimum_signatures
    }

    pub fn aggregate_input_value(&self) -> u64 {
        self.inner.aggregate_input_value
    }

    pub fn aggregate_output_value(&self) -> u64 {
        self.inner.aggregate_output_value
    }

    pub fn payment_value(&self) -> Option<u64> {
        self.inner.payment_value
    }

    pub fn change_value(&self) -> u64 {
        self.inner.change_output_value
    }

    pub fn is_final(&self) -> bool {
        self.inner.kind.is_final()
    }

    pub fn is_batch(&self) -> bool {
        self.inner.kind.is_batch()
    }

    pub fn is_submitted(&self) -> bool {
        self.inner.is_submitted.load(Ordering::SeqCst)
    }

    /// A clone of the encapsulated network transaction.
    pub fn transaction(&self) -> Transaction {
        self.inner.signable_tx.lock().unwrap().tx.clone()
    }

    /// Submit the transaction on the supplied [`RpcApi`](crate::rpc::RpcApi).
    ///
    /// The transaction's UTXO entries are removed from the originating
    /// [`UtxoContext`](crate::utxo::UtxoContext) before the network round
    /// trip, preventing double-spend attempts from the same context while
    /// the submission is in flight. If the submission is rejected, the
    /// entries are restored to the context's mature pool.
    pub async fn try_submit(&self, rpc: &Arc<DynRpcApi>) -> Result<TransactionId> {
        if self.inner.is_submitted.swap(true, Ordering::SeqCst) {
            return Err(Error::custom("transaction has already been submitted"));
        }

        if let Some(utxo_context) = self.source_utxo_context() {
            utxo_context.register_outgoing_transaction(self).await?;
        }

        match rpc.submit_transaction(self.transaction(), false).await {
            Ok(txid) => {
                if let Some(utxo_context) = self.source_utxo_context() {
                    utxo_context.notify_outgoing_transaction(self).await?;
                }
                Ok(txid)
            }
            Err(err) => {
                self.inner.is_submitted.store(false, Ordering::SeqCst);
                if let Some(utxo_context) = self.source_utxo_context() {
                    utxo_context.cancel_outgoing_transaction(self).await?;
                }
                Err(err)
            }
        }
    }

    /// Sign all transaction inputs using the signer supplied
    /// to the [`Generator`].
    pub fn try_sign(&self) -> Result<()> {
        let signer = self.inner.generator.signer().as_ref().cloned().ok_or(Error::custom("no signer present"))?;
        let signable_tx = self.inner.signable_tx.lock().unwrap().clone();
        let signed = signer.try_sign(signable_tx, &self.inner.addresses)?;
        *self.inner.signable_tx.lock().unwrap() = signed;
        Ok(())
    }

    /// Create a signature script for a single input without
    /// applying it to the transaction.
    pub fn create_input_signature(&self, input_index: usize, address: &Address) -> Result<Vec<u8>> {
        let signer = self.inner.generator.signer().as_ref().cloned().ok_or(Error::custom("no signer present"))?;
        let signable_tx = self.inner.signable_tx.lock().unwrap();
        signer.try_create_input_signature(&signable_tx, input_index, address)
    }

    /// Inject a previously created signature script into an input.
    pub fn fill_input(&self, input_index: usize, signature_script: Vec<u8>) -> Result<()> {
        let mut signable_tx = self.inner.signable_tx.lock().unwrap();
        let input = signable_tx
            .tx
            .inputs
            .get_mut(input_index)
            .ok_or_else(|| Error::custom(format!("input index {input_index} is out of bounds")))?;
        input.signature_script = signature_script;
        Ok(())
    }
}

// required by trait bounds, equality is by transaction id
impl PartialEq for PendingTransaction {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}
impl Eq for PendingTransaction {}
