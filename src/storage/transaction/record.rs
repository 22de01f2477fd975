//!
//! Transaction record implementation.
//!

use super::*;
use crate::imports::*;
use crate::tx::generator::PendingTransactionInner;
use crate::utxo::{UtxoContext, UtxoContextId, UtxoEntryReference};
use workflow_core::time::{unixtime_as_millis_u64, unixtime_to_locale_string};

/// Transaction record delivered within [`UtxoProcessor`] notification
/// events. Contains the transaction lifecycle data for the originating
/// [`UtxoContext`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    /// Unix time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(rename = "unixtimeMsec")]
    pub unixtime_msec: Option<u64>,
    pub value: u64,
    pub binding: UtxoContextId,
    #[serde(rename = "blockDaaScore")]
    pub block_daa_score: u64,
    #[serde(rename = "network")]
    pub network_id: NetworkId,
    #[serde(rename = "data")]
    pub transaction_data: TransactionData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl TransactionRecord {
    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn unixtime_msec(&self) -> Option<u64> {
        self.unixtime_msec
    }

    pub fn unixtime_as_locale_string(&self) -> Option<String> {
        self.unixtime_msec.map(unixtime_to_locale_string)
    }

    pub fn unixtime_or_daa_as_string(&self) -> String {
        if let Some(unixtime) = self.unixtime_msec {
            unixtime_to_locale_string(unixtime)
        } else {
            self.block_daa_score.separated_string()
        }
    }

    pub fn set_unixtime(&mut self, unixtime: u64) {
        self.unixtime_msec = Some(unixtime);
    }

    pub fn binding(&self) -> &UtxoContextId {
        &self.binding
    }

    pub fn block_daa_score(&self) -> u64 {
        self.block_daa_score
    }

    pub fn maturity(&self, current_daa_score: u64) -> Maturity {
        let params = NetworkParams::from(self.network_id);

        if self.is_coinbase() && current_daa_score < self.block_daa_score + params.coinbase_transaction_stasis_period_daa() {
            return Maturity::Stasis;
        }

        let maturity = if self.is_coinbase() {
            params.coinbase_transaction_maturity_period_daa()
        } else {
            params.user_transaction_maturity_period_daa()
        };

        if current_daa_score < self.block_daa_score + maturity {
            Maturity::Pending
        } else {
            Maturity::Confirmed
        }
    }

    pub fn kind(&self) -> TransactionKind {
        self.transaction_data.kind()
    }

    pub fn network_id(&self) -> &NetworkId {
        &self.network_id
    }

    pub fn is_coinbase(&self) -> bool {
        match &self.transaction_data {
            TransactionData::Incoming { utxo_entries, .. } | TransactionData::Stasis { utxo_entries, .. } => {
                utxo_entries.iter().any(|entry| entry.is_coinbase)
            }
            _ => false,
        }
    }

    pub fn is_outgoing(&self) -> bool {
        matches!(&self.transaction_data, TransactionData::Outgoing { .. })
    }

    pub fn is_change(&self) -> bool {
        matches!(&self.transaction_data, TransactionData::Change { .. })
    }

    pub fn is_batch(&self) -> bool {
        matches!(&self.transaction_data, TransactionData::Batch { .. })
    }

    pub fn transaction_data(&self) -> &TransactionData {
        &self.transaction_data
    }

    // Transaction maturity ignores the stasis period and provides
    // a progress value based on the pending period. It is assumed
    // that transactions in stasis are not visible to the user.
    pub fn maturity_progress(&self, current_daa_score: u64) -> Option<f64> {
        let params = NetworkParams::from(self.network_id);
        let maturity = if self.is_coinbase() {
            params.coinbase_transaction_maturity_period_daa()
        } else {
            params.user_transaction_maturity_period_daa()
        };

        match self.block_daa_score.checked_add(maturity) {
            Some(mature_at) if current_daa_score < mature_at => {
                Some(current_daa_score.saturating_sub(self.block_daa_score) as f64 / maturity as f64)
            }
            // block_daa_score of u64::MAX marks a transaction that
            // has not been accepted into a block yet
            None => Some(0.0),
            _ => None,
        }
    }

    pub fn aggregate_input_value(&self) -> u64 {
        match &self.transaction_data {
            TransactionData::Reorg { aggregate_input_value, .. }
            | TransactionData::Stasis { aggregate_input_value, .. }
            | TransactionData::Incoming { aggregate_input_value, .. }
            | TransactionData::External { aggregate_input_value, .. }
            | TransactionData::Outgoing { aggregate_input_value, .. }
            | TransactionData::Batch { aggregate_input_value, .. }
            | TransactionData::Change { aggregate_input_value, .. } => *aggregate_input_value,
        }
    }

    pub fn value(&self) -> u64 {
        self.value
    }
}

impl TransactionRecord {
    pub fn new_incoming(utxo_context: &UtxoContext, id: TransactionId, utxos: &[UtxoEntryReference]) -> Self {
        Self::new_incoming_impl(utxo_context, TransactionKind::Incoming, id, utxos)
    }

    pub fn new_reorg(utxo_context: &UtxoContext, id: TransactionId, utxos: &[UtxoEntryReference]) -> Self {
        Self::new_incoming_impl(utxo_context, TransactionKind::Reorg, id, utxos)
    }

    pub fn new_stasis(utxo_context: &UtxoContext, id: TransactionId, utxos: &[UtxoEntryReference]) -> Self {
        Self::new_incoming_impl(utxo_context, TransactionKind::Stasis, id, utxos)
    }

    fn new_incoming_impl(
        utxo_context: &UtxoContext,
        transaction_type: TransactionKind,
        id: TransactionId,
        utxos: &[UtxoEntryReference],
    ) -> Self {
        let binding = utxo_context.id();
        let block_daa_score = utxos[0].as_ref().block_daa_score;
        let utxo_entries = utxos.iter().map(UtxoRecord::from).collect::<Vec<_>>();
        let aggregate_input_value = utxo_entries.iter().map(|utxo| utxo.amount).sum::<u64>();

        let unixtime = unixtime_as_millis_u64();

        let transaction_data = match transaction_type {
            TransactionKind::Incoming => TransactionData::Incoming { utxo_entries, aggregate_input_value },
            TransactionKind::Reorg => TransactionData::Reorg { utxo_entries, aggregate_input_value },
            TransactionKind::Stasis => TransactionData::Stasis { utxo_entries, aggregate_input_value },
            kind => panic!("TransactionRecord::new_incoming() - invalid transaction type: {kind:?}"),
        };

        TransactionRecord {
            id,
            unixtime_msec: Some(unixtime),
            value: aggregate_input_value,
            binding,
            transaction_data,
            block_daa_score,
            network_id: utxo_context.processor().network_id().expect("network expected for transaction record generation"),
            metadata: None,
            note: None,
        }
    }

    /// Transaction that was not issued by this instance of the engine
    /// but belongs to the monitored address set. This is an "external"
    /// transaction that occurs during the lifetime of this instance.
    pub fn new_external(utxo_context: &UtxoContext, id: TransactionId, utxos: &[UtxoEntryReference]) -> Self {
        let binding = utxo_context.id();
        let block_daa_score = utxos[0].as_ref().block_daa_score;
        let utxo_entries = utxos.iter().map(UtxoRecord::from).collect::<Vec<_>>();
        let aggregate_input_value = utxo_entries.iter().map(|utxo| utxo.amount).sum::<u64>();

        let transaction_data = TransactionData::External { utxo_entries, aggregate_input_value };
        let unixtime = unixtime_as_millis_u64();

        TransactionRecord {
            id,
            unixtime_msec: Some(unixtime),
            value: aggregate_input_value,
            binding,
            transaction_data,
            block_daa_score,
            network_id: utxo_context.processor().network_id().expect("network expected for transaction record generation"),
            metadata: None,
            note: None,
        }
    }

    pub fn new_outgoing(
        utxo_context: &UtxoContext,
        outgoing_tx: &OutgoingTransaction,
        accepted_daa_score: Option<u64>,
    ) -> Result<Self> {
        let binding = utxo_context.id();
        let block_daa_score =
            utxo_context.processor().current_daa_score().ok_or(Error::MissingDaaScore("TransactionRecord::new_outgoing()"))?;

        let utxo_entries = outgoing_tx.utxo_entries().values().map(UtxoRecord::from).collect::<Vec<_>>();

        let unixtime = unixtime_as_millis_u64();

        let PendingTransactionInner {
            signable_tx,
            fees,
            aggregate_input_value,
            aggregate_output_value,
            payment_value,
            change_output_value,
            ..
        } = &*outgoing_tx.pending_transaction().inner;

        let transaction = signable_tx.lock().unwrap().tx.clone();
        let id = transaction.id();

        let transaction_data = TransactionData::Outgoing {
            fees: *fees,
            aggregate_input_value: *aggregate_input_value,
            aggregate_output_value: *aggregate_output_value,
            transaction,
            payment_value: *payment_value,
            change_value: *change_output_value,
            accepted_daa_score,
            utxo_entries,
        };

        Ok(TransactionRecord {
            id,
            unixtime_msec: Some(unixtime),
            value: payment_value.unwrap_or(*aggregate_input_value),
            binding,
            transaction_data,
            block_daa_score,
            network_id: utxo_context.processor().network_id()?,
            metadata: None,
            note: None,
        })
    }

    pub fn new_batch(utxo_context: &UtxoContext, outgoing_tx: &OutgoingTransaction, accepted_daa_score: Option<u64>) -> Result<Self> {
        let binding = utxo_context.id();
        let block_daa_score =
            utxo_context.processor().current_daa_score().ok_or(Error::MissingDaaScore("TransactionRecord::new_batch()"))?;

        let utxo_entries = outgoing_tx.utxo_entries().values().map(UtxoRecord::from).collect::<Vec<_>>();

        let unixtime = unixtime_as_millis_u64();

        let PendingTransactionInner {
            signable_tx,
            fees,
            aggregate_input_value,
            aggregate_output_value,
            payment_value,
            change_output_value,
            ..
        } = &*outgoing_tx.pending_transaction().inner;

        let transaction = signable_tx.lock().unwrap().tx.clone();
        let id = transaction.id();

        let transaction_data = TransactionData::Batch {
            fees: *fees,
            aggregate_input_value: *aggregate_input_value,
            aggregate_output_value: *aggregate_output_value,
            transaction,
            payment_value: *payment_value,
            change_value: *change_output_value,
            accepted_daa_score,
            utxo_entries,
        };

        Ok(TransactionRecord {
            id,
            unixtime_msec: Some(unixtime),
            value: payment_value.unwrap_or(*aggregate_input_value),
            binding,
            transaction_data,
            block_daa_score,
            network_id: utxo_context.processor().network_id()?,
            metadata: None,
            note: None,
        })
    }

    pub fn new_change(
        utxo_context: &UtxoContext,
        outgoing_tx: &OutgoingTransaction,
        accepted_daa_score: Option<u64>,
        utxos: &[UtxoEntryReference],
    ) -> Result<Self> {
        let binding = utxo_context.id();
        let block_daa_score =
            utxo_context.processor().current_daa_score().ok_or(Error::MissingDaaScore("TransactionRecord::new_change()"))?;
        let utxo_entries = utxos.iter().map(UtxoRecord::from).collect::<Vec<_>>();

        let unixtime = unixtime_as_millis_u64();

        let PendingTransactionInner {
            signable_tx,
            aggregate_input_value,
            aggregate_output_value,
            payment_value,
            change_output_value,
            ..
        } = &*outgoing_tx.pending_transaction().inner;

        let transaction = signable_tx.lock().unwrap().tx.clone();
        let id = transaction.id();

        let transaction_data = TransactionData::Change {
            aggregate_input_value: *aggregate_input_value,
            aggregate_output_value: *aggregate_output_value,
            transaction,
            payment_value: *payment_value,
            change_value: *change_output_value,
            accepted_daa_score,
            utxo_entries,
        };

        Ok(TransactionRecord {
            id,
            unixtime_msec: Some(unixtime),
            value: *change_output_value,
            binding,
            transaction_data,
            block_daa_score,
            network_id: utxo_context.processor().network_id()?,
            metadata: None,
            note: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::consensus::UNACCEPTED_DAA_SCORE;

    fn incoming_record(block_daa_score: u64) -> TransactionRecord {
        TransactionRecord {
            id: TransactionId::from_bytes([0u8; 32]),
            unixtime_msec: None,
            value: 0,
            binding: UtxoContextId::new(1),
            block_daa_score,
            network_id: NetworkId::new(NetworkType::Mainnet),
            transaction_data: TransactionData::Incoming { utxo_entries: vec![], aggregate_input_value: 0 },
            note: None,
            metadata: None,
        }
    }

    #[test]
    fn test_maturity_progress() {
        // mainnet user transaction maturity is 10 DAA
        let record = incoming_record(1000);
        assert_eq!(record.maturity_progress(1005), Some(0.5));
        assert_eq!(record.maturity_progress(1010), None);
        assert_eq!(record.maturity_progress(2000), None);

        // not yet accepted into a block
        let record = incoming_record(UNACCEPTED_DAA_SCORE);
        assert_eq!(record.maturity_progress(1000), Some(0.0));
        assert_eq!(record.maturity_progress(u64::MAX), Some(0.0));

        // record ahead of the local virtual tip clamps to zero
        let record = incoming_record(2000);
        assert_eq!(record.maturity_progress(1990), Some(0.0));
    }
}
