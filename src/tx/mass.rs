//!
//! Transaction mass calculator.
//!
//! Mass limits what a single standard transaction may contain. It is
//! the maximum of (or, depending on the network, the sum of) the
//! compute mass, derived from the serialized transaction size, script
//! public key sizes and signature operations, and the storage mass,
//! derived from the UTXO plurality and amounts per KIP-0009.
//!

use crate::imports::*;
use crate::tx::consensus::{Params, MAXIMUM_STANDARD_TRANSACTION_MASS, MAX_SOMPI, MINIMUM_RELAY_TRANSACTION_FEE};
use crate::tx::{Transaction, TransactionInput, TransactionOutput};
use crate::utxo::NetworkParams;

/// How compute mass and storage mass combine into the
/// overall transaction mass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MassCombinationStrategy {
    /// `mass = compute_mass + storage_mass`
    Add,
    /// `mass = max(compute_mass, storage_mass)`
    Max,
}

// Serialized sizes of transaction elements:
//
// blank transaction:
//   version (2) + input count (8) + output count (8) + lock time (8)
//   + subnetwork id (20) + gas (8) + payload hash (32) + payload len (8)
const BLANK_TRANSACTION_SERIALIZED_SIZE: u64 = 2 + 8 + 8 + 8 + 20 + 8 + 32 + 8;
// input: outpoint (32 + 4) + signature script len (8) + sequence (8)
// (the signature script itself is added separately)
const TRANSACTION_INPUT_SERIALIZED_SIZE: u64 = 32 + 4 + 8 + 8;
// output: value (8) + script version (2) + script len (8)
// (the script itself is added separately)
const TRANSACTION_OUTPUT_SERIALIZED_SIZE: u64 = 8 + 2 + 8;
// schnorr signature script: push opcode (1) + signature (64) + sighash type (1)
const SIGNATURE_SCRIPT_SIZE: u64 = 1 + 64 + 1;

/// Minimum relay fee for a transaction of the given mass,
/// `MINIMUM_RELAY_TRANSACTION_FEE` Sompi per 1000 grams.
pub fn calc_minimum_required_transaction_relay_fee(mass: u64) -> u64 {
    let mut minimum_fee = (mass * MINIMUM_RELAY_TRANSACTION_FEE) / 1000;
    if minimum_fee == 0 {
        minimum_fee = MINIMUM_RELAY_TRANSACTION_FEE;
    }
    minimum_fee.min(MAX_SOMPI)
}

/// A transaction output is considered dust if the cost of spending it
/// exceeds a third of its value at the minimum relay fee rate. Spending
/// an output costs 148 bytes of input data on top of the output's own
/// serialized size.
pub fn is_transaction_output_dust(output: &TransactionOutput) -> bool {
    if output.script_public_key.script().first() == Some(&0x6a) {
        // OP_RETURN outputs are provably unspendable
        return true;
    }

    let total_serialized_size = TRANSACTION_OUTPUT_SERIALIZED_SIZE + output.script_public_key.script().len() as u64;
    let value = output.value.min(u64::MAX / 1000);
    value * 1000 / (3 * (total_serialized_size + 148)) < MINIMUM_RELAY_TRANSACTION_FEE
}

/// Dust check against a plain value, assuming a standard 34 byte
/// pay-to-pubkey script public key.
pub fn is_standard_output_amount_dust(value: u64) -> bool {
    let total_serialized_size = TRANSACTION_OUTPUT_SERIALIZED_SIZE + 34;
    let value = value.min(u64::MAX / 1000);
    value * 1000 / (3 * (total_serialized_size + 148)) < MINIMUM_RELAY_TRANSACTION_FEE
}

#[derive(Clone)]
pub struct MassCalculator {
    mass_per_tx_byte: u64,
    mass_per_script_pub_key_byte: u64,
    mass_per_sig_op: u64,
    storage_mass_parameter: u64,
    mass_combination_strategy: MassCombinationStrategy,
}

impl MassCalculator {
    pub fn new(consensus_params: &Params, network_params: &NetworkParams) -> Self {
        Self {
            mass_per_tx_byte: consensus_params.mass_per_tx_byte,
            mass_per_script_pub_key_byte: consensus_params.mass_per_script_pub_key_byte,
            mass_per_sig_op: consensus_params.mass_per_sig_op,
            storage_mass_parameter: consensus_params.storage_mass_parameter,
            mass_combination_strategy: network_params.mass_combination_strategy(),
        }
    }

    pub fn is_dust(&self, value: u64) -> bool {
        is_standard_output_amount_dust(value)
    }

    pub fn blank_transaction_serialized_mass(&self) -> u64 {
        BLANK_TRANSACTION_SERIALIZED_SIZE * self.mass_per_tx_byte
    }

    pub fn calc_mass_for_payload(&self, payload_byte_size: usize) -> u64 {
        payload_byte_size as u64 * self.mass_per_tx_byte
    }

    pub fn calc_mass_for_outputs(&self, outputs: &[TransactionOutput]) -> u64 {
        outputs.iter().map(|output| self.calc_mass_for_output(output)).sum()
    }

    pub fn calc_mass_for_inputs(&self, inputs: &[TransactionInput]) -> u64 {
        inputs.iter().map(|input| self.calc_mass_for_input(input)).sum()
    }

    pub fn calc_mass_for_output(&self, output: &TransactionOutput) -> u64 {
        self.mass_per_script_pub_key_byte * (2 + output.script_public_key.script().len() as u64)
            + (TRANSACTION_OUTPUT_SERIALIZED_SIZE + output.script_public_key.script().len() as u64) * self.mass_per_tx_byte
    }

    pub fn calc_mass_for_input(&self, input: &TransactionInput) -> u64 {
        (TRANSACTION_INPUT_SERIALIZED_SIZE + input.signature_script.len() as u64) * self.mass_per_tx_byte
            + input.sig_op_count as u64 * self.mass_per_sig_op
    }

    /// Mass of the estimated signature scripts for a single input
    /// requiring `minimum_signatures` schnorr signatures.
    pub fn calc_signature_mass(&self, minimum_signatures: u16) -> u64 {
        let minimum_signatures = std::cmp::max(1, minimum_signatures);
        SIGNATURE_SCRIPT_SIZE * self.mass_per_tx_byte * minimum_signatures as u64
    }

    pub fn calc_signature_mass_for_inputs(&self, number_of_inputs: usize, minimum_signatures: u16) -> u64 {
        self.calc_signature_mass(minimum_signatures) * number_of_inputs as u64
    }

    pub fn calc_minimum_transaction_fee_from_mass(&self, mass: u64) -> u64 {
        calc_minimum_required_transaction_relay_fee(mass)
    }

    /// Compute mass of a fully constructed transaction. Inputs with an
    /// empty signature script are accounted for using the estimated
    /// signature size for `minimum_signatures`.
    pub fn calc_mass_for_signed_transaction(&self, tx: &Transaction, minimum_signatures: u16) -> u64 {
        self.blank_transaction_serialized_mass()
            + self.calc_mass_for_payload(tx.payload.len())
            + self.calc_mass_for_outputs(&tx.outputs)
            + tx.inputs
                .iter()
                .map(|input| {
                    if input.signature_script.is_empty() {
                        self.calc_mass_for_input(input) + self.calc_signature_mass(minimum_signatures)
                    } else {
                        self.calc_mass_for_input(input)
                    }
                })
                .sum::<u64>()
    }

    /// Combines compute mass and storage mass per the network's
    /// mass combination strategy.
    pub fn combine_mass(&self, compute_mass: u64, storage_mass: u64) -> u64 {
        match self.mass_combination_strategy {
            MassCombinationStrategy::Add => compute_mass + storage_mass,
            MassCombinationStrategy::Max => std::cmp::max(compute_mass, storage_mass),
        }
    }

    /// Storage mass of a transaction spending `utxo_entries` and
    /// producing `outputs`, per KIP-0009. Returns `None` on overflow
    /// (in which case the transaction is rejected as too heavy).
    pub fn calc_storage_mass_for_transaction(
        &self,
        utxo_entries: &[UtxoEntryReference],
        outputs: &[TransactionOutput],
    ) -> Option<u64> {
        self.calc_storage_mass(utxo_entries.iter().map(|entry| entry.amount()), outputs.iter().map(|output| output.value))
    }

    /// KIP-0009 storage mass: `max(0, C·(|O|/H(O) − |I|/A(I)))` where
    /// `H` is the harmonic mean, `A` the arithmetic mean and `C` the
    /// storage mass parameter. When `|O| = 1`, `|I| = 1` or
    /// `|O| = |I| = 2` the relaxed formula applies, substituting the
    /// harmonic mean of the inputs for the arithmetic mean.
    pub fn calc_storage_mass(
        &self,
        input_values: impl ExactSizeIterator<Item = u64> + Clone,
        output_values: impl ExactSizeIterator<Item = u64> + Clone,
    ) -> Option<u64> {
        let ins_len = input_values.len() as u64;
        let outs_len = output_values.len() as u64;

        if ins_len == 0 || outs_len == 0 {
            return Some(0);
        }

        // C·|O|/H(O) == Σ C/o for o in O. A zero-value output would
        // divide by zero, however such outputs are rejected upstream
        // of mass calculation.
        let harmonic_outs = output_values
            .map(|out| self.storage_mass_parameter.checked_div(out))
            .try_fold(0u64, |total, current| current.and_then(|current| total.checked_add(current)))?;

        if outs_len == 1 || ins_len == 1 || (outs_len == 2 && ins_len == 2) {
            let harmonic_ins =
                input_values.map(|value| self.storage_mass_parameter / value).fold(0u64, |total, current| total.saturating_add(current));
            return Some(harmonic_outs.saturating_sub(harmonic_ins));
        }

        let sum_ins = input_values.sum::<u64>();
        let mean_ins = sum_ins / ins_len;
        // C·|I|/A(I)
        let arithmetic_ins = ins_len.saturating_mul(self.storage_mass_parameter / mean_ins);
        Some(harmonic_outs.saturating_sub(arithmetic_ins))
    }

    /// Overall mass of a fully constructed transaction, or `None`
    /// if the storage mass calculation overflows.
    pub fn calc_overall_mass_for_unsigned_transaction(
        &self,
        tx: &Transaction,
        utxo_entries: &[UtxoEntryReference],
        minimum_signatures: u16,
    ) -> Option<u64> {
        let compute_mass = self.calc_mass_for_signed_transaction(tx, minimum_signatures);
        let storage_mass = self.calc_storage_mass_for_transaction(utxo_entries, &tx.outputs)?;
        Some(self.combine_mass(compute_mass, storage_mass))
    }
}

/// True if the supplied mass exceeds what a standard transaction
/// may carry.
pub fn is_standard_transaction_mass_exceeded(mass: u64) -> bool {
    mass > MAXIMUM_STANDARD_TRANSACTION_MASS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{pay_to_address_script, Address, Prefix, Version};
    use crate::network::NetworkId;
    use crate::network::NetworkType;
    use crate::tx::consensus::{get_consensus_params_by_network, SOMPI_PER_KASPA};
    use crate::tx::ScriptPublicKey;

    fn calculator() -> MassCalculator {
        let network_id = NetworkId::new(NetworkType::Mainnet);
        MassCalculator::new(&get_consensus_params_by_network(&network_id.network_type()), &NetworkParams::from(network_id))
    }

    fn standard_output(value: u64) -> TransactionOutput {
        let address = Address::new(Prefix::Mainnet, Version::PubKey, &[0x77u8; 32]);
        TransactionOutput::new(value, pay_to_address_script(&address))
    }

    #[test]
    fn test_compute_mass_components() {
        let calc = calculator();
        assert_eq!(calc.blank_transaction_serialized_mass(), 94);
        assert_eq!(calc.calc_mass_for_output(&standard_output(SOMPI_PER_KASPA)), 412);
        let input = TransactionInput::new(Default::default(), vec![], 0, 1);
        assert_eq!(calc.calc_mass_for_input(&input) + calc.calc_signature_mass(1), 1118);
    }

    #[test]
    fn test_minimum_relay_fee() {
        assert_eq!(calc_minimum_required_transaction_relay_fee(0), MINIMUM_RELAY_TRANSACTION_FEE);
        assert_eq!(calc_minimum_required_transaction_relay_fee(999), MINIMUM_RELAY_TRANSACTION_FEE);
        assert_eq!(calc_minimum_required_transaction_relay_fee(2000), 2000);
        assert_eq!(calc_minimum_required_transaction_relay_fee(100_000), 100_000);
    }

    #[test]
    fn test_dust_threshold() {
        // standard 34-byte p2pk script: dust boundary at 600 Sompi
        assert!(is_transaction_output_dust(&standard_output(599)));
        assert!(!is_transaction_output_dust(&standard_output(600)));

        // provably unspendable output
        let op_return = TransactionOutput::new(SOMPI_PER_KASPA, ScriptPublicKey::new(0, vec![0x6a]));
        assert!(is_transaction_output_dust(&op_return));
    }

    #[test]
    fn test_storage_mass() {
        let calc = calculator();
        let c = 10u64.pow(12);

        // |I| = 1, |O| = 1, equal values: relaxed formula, zero mass
        assert_eq!(calc.calc_storage_mass([100u64].into_iter(), [100u64].into_iter()), Some(0));

        // |I| = 1, |O| = 2: relaxed formula
        let mass = calc.calc_storage_mass([200u64].into_iter(), [100u64, 100].into_iter());
        assert_eq!(mass, Some(2 * (c / 100) - c / 200));

        // splitting into many small outputs is charged the general formula
        let mass = calc.calc_storage_mass([1000u64, 1000, 1000].into_iter(), [100u64, 100, 100].into_iter());
        assert_eq!(mass, Some(3 * (c / 100) - 3 * (c / 1000)));

        // zero-value output overflows the harmonic sum
        assert_eq!(calc.calc_storage_mass([100u64].into_iter(), [0u64].into_iter()), None);

        // empty side yields zero mass
        assert_eq!(calc.calc_storage_mass([100u64].into_iter(), std::iter::empty::<u64>()), Some(0));
    }

    #[test]
    fn test_combine_mass() {
        let calc = calculator();
        assert_eq!(calc.combine_mass(100, 200), 200);
        assert_eq!(calc.combine_mass(200, 100), 200);
    }
}
