//!
//! Transaction [`Generator`] implementing a lazy, mass-bounded
//! transaction generation cycle.
//!
//! The generator drains a UTXO source (an iterator or a live
//! [`UtxoContext`]) and produces a sequence of transactions that
//! satisfy the requested payment outputs. When the accumulated inputs
//! exceed what a single standard transaction may carry, intermediate
//! batch transactions are emitted, each compounding its inputs into a
//! single change output that funds the next transaction in the chain.
//! The last transaction of the cycle is final and carries the payment
//! outputs themselves.
//!

use crate::address::pay_to_address_script;
use crate::imports::*;
use crate::tx::consensus::{get_consensus_params_by_network, MAXIMUM_STANDARD_TRANSACTION_MASS, UNACCEPTED_DAA_SCORE};
use crate::tx::generator::{
    DataKind, GeneratorSettings, GeneratorSummary, PendingTransaction, PendingTransactionIterator, PendingTransactionStream,
    SignerT,
};
use crate::tx::mass::MassCalculator;
use crate::tx::{Fees, PaymentDestination, Transaction, TransactionInput, TransactionOutput, SUBNETWORK_ID_NATIVE};
use crate::utxo::{NetworkParams, UtxoContext, UtxoEntry, UtxoEntryReference};
use std::collections::VecDeque;

struct Context {
    utxo_iterator: Box<dyn Iterator<Item = UtxoEntryReference> + Send + Sync + 'static>,

    /// total number of UTXOs consumed by the generation cycle
    aggregated_utxos: usize,
    /// total fees of all transactions issued by the single generator instance
    aggregated_fees: u64,
    /// total mass of all transactions issued by the single generator instance
    aggregated_mass: u64,
    /// number of generated transactions
    number_of_generated_transactions: usize,
    /// UTXO entries carried forward between transactions. A batch
    /// transaction's change entry is pushed to the front so that it
    /// funds the next transaction in the chain; an entry rejected by
    /// the mass boundary is pushed to the back.
    utxo_stash: VecDeque<UtxoEntryReference>,
    /// final transaction id
    final_transaction_id: Option<TransactionId>,
    /// signifies that the generator is finished; no more items will
    /// be produced by the iterator or stream
    is_done: bool,
}

struct Inner {
    abortable: Option<Abortable>,
    signer: Option<Arc<dyn SignerT>>,
    mass_calculator: MassCalculator,
    network_id: NetworkId,

    // source (funding) UtxoContext
    source_utxo_context: Option<UtxoContext>,
    // destination UtxoContext in the case of a transfer between contexts
    destination_utxo_context: Option<UtxoContext>,
    // typically a number of keys required to sign the transaction
    sig_op_count: u8,
    // number of minimum signatures required to sign the transaction
    minimum_signatures: u16,
    // change address
    change_address: Address,
    // compute mass of the standard change output
    standard_change_output_compute_mass: u64,
    // signature mass per input
    signature_mass_per_input: u64,
    // additional mass charged per compound (batch) transaction
    additional_compound_transaction_mass: u64,
    // transaction amount; `None` results in consumption of all
    // available UTXOs (sweep transaction)
    final_transaction_amount: Option<u64>,
    // applies only to the final transaction
    final_transaction_priority_fee: Fees,
    // issued only in the final transaction
    final_transaction_outputs: Vec<TransactionOutput>,
    // compute mass of the final transaction outputs
    final_transaction_outputs_compute_mass: u64,
    // final transaction payload
    final_transaction_payload: Vec<u8>,
    // compute mass of the final transaction payload
    final_transaction_payload_mass: u64,
    // execution context
    context: Mutex<Context>,
}

#[derive(Clone)]
pub struct Generator {
    inner: Arc<Inner>,
}

impl Generator {
    pub fn try_new(settings: GeneratorSettings, signer: Option<Arc<dyn SignerT>>, abortable: Option<&Abortable>) -> Result<Self> {
        let GeneratorSettings {
            network_id,
            utxo_iterator,
            source_utxo_context,
            destination_utxo_context,
            sig_op_count,
            minimum_signatures,
            change_address,
            final_transaction_priority_fee,
            final_transaction_destination,
            final_transaction_payload,
        } = settings;

        let network_type = network_id.network_type();
        let network_params = NetworkParams::from(network_id);
        let mass_calculator = MassCalculator::new(&get_consensus_params_by_network(&network_type), &network_params);

        if change_address.network_type() != network_type {
            return Err(Error::GeneratorChangeAddressNetworkTypeMismatch);
        }

        let (final_transaction_outputs, final_transaction_amount) = match final_transaction_destination {
            PaymentDestination::Change => {
                if !final_transaction_priority_fee.is_none() {
                    return Err(Error::GeneratorFeesInSweepTransaction);
                }
                (vec![], None)
            }
            PaymentDestination::PaymentOutputs(outputs) => {
                for output in outputs.iter() {
                    if output.amount == 0 {
                        return Err(Error::GeneratorZeroValuePaymentOutput);
                    }
                    if output.address.network_type() != network_type {
                        return Err(Error::GeneratorPaymentOutputNetworkTypeMismatch);
                    }
                }
                (
                    outputs
                        .iter()
                        .map(|output| TransactionOutput::new(output.amount, pay_to_address_script(&output.address)))
                        .collect::<Vec<_>>(),
                    Some(outputs.iter().map(|output| output.amount).sum()),
                )
            }
        };

        let standard_change_output_compute_mass =
            mass_calculator.calc_mass_for_output(&TransactionOutput::new(0, pay_to_address_script(&change_address)));
        let signature_mass_per_input = mass_calculator.calc_signature_mass(minimum_signatures);
        let final_transaction_outputs_compute_mass = mass_calculator.calc_mass_for_outputs(&final_transaction_outputs);
        let final_transaction_payload = final_transaction_payload.unwrap_or_default();
        let final_transaction_payload_mass = mass_calculator.calc_mass_for_payload(final_transaction_payload.len());

        // a final transaction carrying the requested outputs must fit
        // under the mass limit with at least one input and a change output
        let minimum_final_transaction_mass = mass_calculator.blank_transaction_serialized_mass()
            + mass_calculator.calc_signature_mass(minimum_signatures)
            + standard_change_output_compute_mass
            + final_transaction_outputs_compute_mass
            + final_transaction_payload_mass;
        if minimum_final_transaction_mass > MAXIMUM_STANDARD_TRANSACTION_MASS {
            return Err(Error::GeneratorTransactionOutputsAreTooHeavy { mass: minimum_final_transaction_mass, kind: "payment outputs" });
        }

        let context = Mutex::new(Context {
            utxo_iterator,
            aggregated_utxos: 0,
            aggregated_fees: 0,
            aggregated_mass: 0,
            number_of_generated_transactions: 0,
            utxo_stash: VecDeque::default(),
            final_transaction_id: None,
            is_done: false,
        });

        let inner = Inner {
            abortable: abortable.cloned(),
            signer,
            mass_calculator,
            network_id,
            source_utxo_context,
            destination_utxo_context,
            sig_op_count,
            minimum_signatures,
            change_address,
            standard_change_output_compute_mass,
            signature_mass_per_input,
            additional_compound_transaction_mass: network_params.additional_compound_transaction_mass(),
            final_transaction_amount,
            final_transaction_priority_fee,
            final_transaction_outputs,
            final_transaction_outputs_compute_mass,
            final_transaction_payload,
            final_transaction_payload_mass,
            context,
        };

        Ok(Self { inner: Arc::new(inner) })
    }

    pub fn network_id(&self) -> NetworkId {
        self.inner.network_id
    }

    pub fn network_type(&self) -> NetworkType {
        self.inner.network_id.network_type()
    }

    /// The underlying [`UtxoContext`] (if available).
    pub fn source_utxo_context(&self) -> &Option<UtxoContext> {
        &self.inner.source_utxo_context
    }

    /// Destination [`UtxoContext`] of a transfer between contexts.
    pub fn destination_utxo_context(&self) -> &Option<UtxoContext> {
        &self.inner.destination_utxo_context
    }

    /// Returns the underlying instance of the [`Signer`](SignerT)
    pub(crate) fn signer(&self) -> &Option<Arc<dyn SignerT>> {
        &self.inner.signer
    }

    /// Mutable context used by the generator to track state
    fn context(&self) -> MutexGuard<Context> {
        self.inner.context.lock().unwrap()
    }

    /// The total amount of fees in Sompi consumed during the generation cycle.
    pub fn aggregate_fees(&self) -> u64 {
        self.context().aggregated_fees
    }

    /// The total number of UTXOs consumed during the generation cycle.
    pub fn aggregate_utxos(&self) -> usize {
        self.context().aggregated_utxos
    }

    /// Returns the final transaction id if the generator has finished successfully.
    pub fn final_transaction_id(&self) -> Option<TransactionId> {
        self.context().final_transaction_id
    }

    /// Returns an async [`Stream`] that causes the [`Generator`] to produce a
    /// transaction for each stream item request. NOTE: transactions are
    /// generated only when each stream item is polled.
    pub fn stream(&self) -> impl Stream<Item = Result<PendingTransaction>> {
        Box::pin(PendingTransactionStream::new(self))
    }

    /// Returns an iterator that causes the [`Generator`] to produce a
    /// transaction for each iterator poll request. NOTE: transactions are
    /// generated only when the returned iterator is iterated.
    pub fn iter(&self) -> impl Iterator<Item = Result<PendingTransaction>> {
        PendingTransactionIterator::new(self)
    }

    /// Run the generation cycle to completion without submitting any of
    /// the produced transactions, returning the resulting summary. Used
    /// for fee previews.
    pub fn estimate(&self) -> Result<GeneratorSummary> {
        let mut iter = self.iter();
        while iter.next().transpose()?.is_some() {}
        Ok(self.summary())
    }

    /// Generates a single transaction by draining the supplied UTXO
    /// iterator. Returns `None` once the generation cycle is complete.
    ///
    /// The function ingests inputs from the UTXO source while tracking
    /// the projected transaction mass, and either produces an
    /// intermediate batch transaction compounding the accumulated funds
    /// to the change address, or a final transaction carrying the
    /// requested payment outputs and payload.
    pub fn generate_transaction(&self) -> Result<Option<PendingTransaction>> {
        let mut context = self.context();

        if context.is_done {
            return Ok(None);
        }

        let calc = &self.inner.mass_calculator;
        let final_transaction_amount = self.inner.final_transaction_amount;
        let change_output_mass = self.inner.standard_change_output_compute_mass;
        let final_outputs_mass = self.inner.final_transaction_outputs_compute_mass;
        let payload_mass = self.inner.final_transaction_payload_mass;

        let mut transaction_amount_accumulator: u64 = 0;
        let mut mass_accumulator = calc.blank_transaction_serialized_mass();

        let mut addresses = AHashSet::<Address>::new();
        let mut utxo_entry_references = vec![];
        let mut inputs = vec![];

        let mut sequence: u64 = 0;
        let mut is_final = false;
        let mut change_amount: u64 = 0;
        let mut transaction_fees: u64 = 0;
        // ReceiverPays deduction applied to the payment outputs
        let mut output_value_deduction: u64 = 0;

        loop {
            if let Some(abortable) = self.inner.abortable.as_ref() {
                abortable.check()?;
            }

            // take the next UTXO from the stash or from the iterator
            let utxo_entry_reference = if let Some(utxo_entry_reference) = context.utxo_stash.pop_front() {
                utxo_entry_reference
            } else if let Some(entry) = context.utxo_iterator.next() {
                entry
            } else if let Some(final_transaction_amount) = final_transaction_amount {
                let additional_needed = match self.inner.final_transaction_priority_fee {
                    Fees::ReceiverPays(_) => final_transaction_amount
                        .saturating_sub(transaction_amount_accumulator)
                        .saturating_sub(context.aggregated_fees),
                    _ => (final_transaction_amount + self.inner.final_transaction_priority_fee.additional())
                        .saturating_sub(transaction_amount_accumulator),
                }
                .max(1);
                return Err(Error::InsufficientFunds { additional_needed, origin: "the funding source is depleted" });
            } else {
                // the UTXO source is exhausted and no payment amount is
                // requested; this is a sweep transaction
                if inputs.is_empty() {
                    context.is_done = true;
                    return Ok(None);
                }
                let sweep_mass = mass_accumulator + change_output_mass + payload_mass;
                transaction_fees = calc.calc_minimum_transaction_fee_from_mass(sweep_mass);
                change_amount = match transaction_amount_accumulator.checked_sub(transaction_fees) {
                    Some(change_amount) if !calc.is_dust(change_amount) => change_amount,
                    // nothing left to sweep once fees are paid
                    _ => {
                        context.is_done = true;
                        return Ok(None);
                    }
                };
                is_final = true;
                break;
            };

            let input =
                TransactionInput::new(utxo_entry_reference.id(), vec![], sequence, self.inner.sig_op_count);
            let input_amount = utxo_entry_reference.amount();
            let input_mass = calc.calc_mass_for_input(&input) + self.inner.signature_mass_per_input;

            // maximum standard mass reached; the remaining inputs require
            // an additional transaction in the chain
            if mass_accumulator + input_mass + change_output_mass + self.inner.additional_compound_transaction_mass
                > MAXIMUM_STANDARD_TRANSACTION_MASS
            {
                context.utxo_stash.push_back(utxo_entry_reference);
                break;
            }
            mass_accumulator += input_mass;
            transaction_amount_accumulator = transaction_amount_accumulator
                .checked_add(input_amount)
                .ok_or_else(|| Error::custom("transaction amount accumulator overflow"))?;
            if let Some(address) = utxo_entry_reference.address() {
                addresses.insert((*address).clone());
            }
            utxo_entry_references.push(utxo_entry_reference);
            inputs.push(input);
            context.aggregated_utxos += 1;
            sequence += 1;

            // check whether the accumulated amount can satisfy the
            // requested payment outputs plus fees
            let Some(final_transaction_amount) = final_transaction_amount else {
                continue;
            };

            let final_tx_mass = mass_accumulator + final_outputs_mass + payload_mass;
            let relay_fees = calc.calc_minimum_transaction_fee_from_mass(final_tx_mass);

            match self.inner.final_transaction_priority_fee {
                Fees::ReceiverPays(priority_fees) => {
                    // the receiver absorbs all fees accumulated across the
                    // chain, so the inputs only need to cover the payment
                    // amount net of previously paid batch fees
                    if transaction_amount_accumulator + context.aggregated_fees < final_transaction_amount {
                        continue;
                    }

                    change_amount = transaction_amount_accumulator + context.aggregated_fees - final_transaction_amount;
                    let relay_fees = if calc.is_dust(change_amount) {
                        change_amount = 0;
                        relay_fees
                    } else {
                        calc.calc_minimum_transaction_fee_from_mass(final_tx_mass + change_output_mass)
                    };

                    output_value_deduction = context
                        .aggregated_fees
                        .checked_add(relay_fees)
                        .and_then(|deduction| deduction.checked_add(priority_fees))
                        .ok_or_else(|| Error::custom("fee deduction overflow"))?;
                    if output_value_deduction >= final_transaction_amount {
                        return Err(Error::InsufficientFunds {
                            additional_needed: output_value_deduction - final_transaction_amount + 1,
                            origin: "payment amount is not sufficient to cover the fees",
                        });
                    }

                    let output_value = final_transaction_amount - output_value_deduction;
                    transaction_fees = transaction_amount_accumulator - output_value - change_amount;
                    let occupied_mass = if change_amount > 0 { final_tx_mass + change_output_mass } else { final_tx_mass };
                    is_final = occupied_mass <= MAXIMUM_STANDARD_TRANSACTION_MASS;
                    break;
                }
                _ => {
                    // SenderPays or sweep-style None; fees are paid on top
                    // of the payment amount and reduce the change
                    let priority_fees = self.inner.final_transaction_priority_fee.additional();
                    if transaction_amount_accumulator
                        < final_transaction_amount.saturating_add(relay_fees).saturating_add(priority_fees)
                    {
                        continue;
                    }

                    change_amount = transaction_amount_accumulator - final_transaction_amount - relay_fees - priority_fees;
                    let mut occupied_mass = final_tx_mass;
                    if calc.is_dust(change_amount) {
                        // suppressed dust change is absorbed into the fees
                        change_amount = 0;
                        transaction_fees = transaction_amount_accumulator - final_transaction_amount;
                    } else {
                        let relay_fees_with_change =
                            calc.calc_minimum_transaction_fee_from_mass(final_tx_mass + change_output_mass);
                        if transaction_amount_accumulator
                            < final_transaction_amount.saturating_add(relay_fees_with_change).saturating_add(priority_fees)
                        {
                            change_amount = 0;
                            transaction_fees = transaction_amount_accumulator - final_transaction_amount;
                        } else {
                            change_amount =
                                transaction_amount_accumulator - final_transaction_amount - relay_fees_with_change - priority_fees;
                            if calc.is_dust(change_amount) {
                                change_amount = 0;
                                transaction_fees = transaction_amount_accumulator - final_transaction_amount;
                            } else {
                                transaction_fees = relay_fees_with_change + priority_fees;
                                occupied_mass = final_tx_mass + change_output_mass;
                            }
                        }
                    }
                    is_final = occupied_mass <= MAXIMUM_STANDARD_TRANSACTION_MASS;
                    break;
                }
            }
        }

        // generate a transaction from the inputs aggregated so far

        if is_final {
            let mut final_outputs = self.inner.final_transaction_outputs.clone();

            if output_value_deduction > 0 {
                self.deduct_fees_from_outputs(&mut final_outputs, output_value_deduction)?;
            }

            if change_amount > 0 {
                final_outputs.push(TransactionOutput::new(change_amount, pay_to_address_script(&self.inner.change_address)));
            }

            let aggregate_output_value = final_outputs.iter().map(|output| output.value).sum::<u64>();
            // sweep transactions carry no payment value; everything
            // compounds to the change address
            let payment_value =
                if self.inner.final_transaction_outputs.is_empty() { None } else { Some(aggregate_output_value - change_amount) };
            let tx = Transaction::new(
                0,
                inputs,
                final_outputs,
                0,
                SUBNETWORK_ID_NATIVE,
                0,
                self.inner.final_transaction_payload.clone(),
            );

            let mass = self.checked_transaction_mass(&tx, &utxo_entry_references)?;

            context.aggregated_fees += transaction_fees;
            context.aggregated_mass += mass;
            context.final_transaction_id = Some(tx.id());
            context.number_of_generated_transactions += 1;
            context.is_done = true;

            Ok(Some(PendingTransaction::try_new(
                self,
                tx,
                utxo_entry_references,
                addresses.into_iter().collect(),
                payment_value,
                change_amount,
                transaction_amount_accumulator,
                aggregate_output_value,
                self.inner.minimum_signatures,
                mass,
                transaction_fees,
                DataKind::Final,
            )?))
        } else {
            // intermediate batch transaction compounding the accumulated
            // inputs into a single change output
            let batch_mass = mass_accumulator + change_output_mass + self.inner.additional_compound_transaction_mass;
            let transaction_fees = calc.calc_minimum_transaction_fee_from_mass(batch_mass);
            let amount = transaction_amount_accumulator.checked_sub(transaction_fees).filter(|amount| !calc.is_dust(*amount)).ok_or(
                Error::InsufficientFunds { additional_needed: transaction_fees, origin: "batch transaction fees exceed its value" },
            )?;

            let script_public_key = pay_to_address_script(&self.inner.change_address);
            let output = TransactionOutput::new(amount, script_public_key.clone());
            let tx = Transaction::new(0, inputs, vec![output], 0, SUBNETWORK_ID_NATIVE, 0, vec![]);

            let mass = self.checked_transaction_mass(&tx, &utxo_entry_references)?;

            // the change entry funds the next transaction in the chain
            let utxo_entry_reference =
                Self::create_batch_utxo_entry_reference(tx.id(), amount, script_public_key, &self.inner.change_address);
            context.utxo_stash.push_front(utxo_entry_reference);

            context.aggregated_fees += transaction_fees;
            context.aggregated_mass += mass;
            context.number_of_generated_transactions += 1;

            Ok(Some(PendingTransaction::try_new(
                self,
                tx,
                utxo_entry_references,
                addresses.into_iter().collect(),
                None,
                amount,
                transaction_amount_accumulator,
                amount,
                self.inner.minimum_signatures,
                mass,
                transaction_fees,
                DataKind::Node,
            )?))
        }
    }

    /// Deduct receiver-pays fees from the payment outputs, charging the
    /// last output first.
    fn deduct_fees_from_outputs(&self, outputs: &mut [TransactionOutput], deduction: u64) -> Result<()> {
        let calc = &self.inner.mass_calculator;
        let mut remaining = deduction;
        for output in outputs.iter_mut().rev() {
            if remaining == 0 {
                break;
            }
            // an output may not be consumed entirely or reduced into dust
            if output.value > remaining && !calc.is_dust(output.value - remaining) {
                output.value -= remaining;
                remaining = 0;
            } else {
                return Err(Error::InsufficientFunds {
                    additional_needed: remaining,
                    origin: "payment output is not sufficient to cover the fees",
                });
            }
        }
        Ok(())
    }

    /// Overall mass of a constructed transaction, checked against the
    /// network standard transaction mass limit.
    fn checked_transaction_mass(&self, tx: &Transaction, utxo_entry_references: &[UtxoEntryReference]) -> Result<u64> {
        let mass = self
            .inner
            .mass_calculator
            .calc_overall_mass_for_unsigned_transaction(tx, utxo_entry_references, self.inner.minimum_signatures)
            .ok_or(Error::GeneratorTransactionIsTooHeavy)?;
        if mass > MAXIMUM_STANDARD_TRANSACTION_MASS {
            Err(Error::GeneratorTransactionIsTooHeavy)
        } else {
            Ok(mass)
        }
    }

    fn create_batch_utxo_entry_reference(
        txid: TransactionId,
        amount: u64,
        script_public_key: ScriptPublicKey,
        address: &Address,
    ) -> UtxoEntryReference {
        let entry = UtxoEntry {
            address: Some(address.clone()),
            outpoint: TransactionOutpoint::new(txid, 0),
            amount,
            script_public_key,
            block_daa_score: UNACCEPTED_DAA_SCORE,
            is_coinbase: false,
        };
        UtxoEntryReference { utxo: Arc::new(entry) }
    }

    /// Produces a [`GeneratorSummary`] for the current state of
    /// the generator.
    pub fn summary(&self) -> GeneratorSummary {
        let context = self.context();

        GeneratorSummary {
            network_id: self.inner.network_id,
            aggregated_utxos: context.aggregated_utxos,
            aggregated_fees: context.aggregated_fees,
            aggregated_mass: context.aggregated_mass,
            number_of_generated_transactions: context.number_of_generated_transactions,
            final_transaction_amount: self.inner.final_transaction_amount,
            final_transaction_id: context.final_transaction_id,
        }
    }
}
