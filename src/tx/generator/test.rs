#![allow(clippy::inconsistent_digit_grouping)]

use crate::address::{Address, Prefix, Version};
use crate::error::Error;
use crate::network::{NetworkId, NetworkType};
use crate::result::Result;
use crate::tx::consensus::{get_consensus_params_by_network, SOMPI_PER_KASPA};
use crate::tx::mass::MassCalculator;
use crate::tx::{Fees, PaymentDestination, PaymentOutputs, Transaction};
use crate::utxo::{NetworkParams, UtxoEntryReference};
use std::cell::RefCell;
use std::rc::Rc;
use workflow_core::abortable::Abortable;

use super::*;

const KAS: u64 = SOMPI_PER_KASPA;

trait PendingTransactionExtension {
    fn tuple(self) -> (PendingTransaction, Transaction);
    fn expect(self, expected: &Expected) -> Self;
    fn accumulate(self, accumulator: &mut Accumulator) -> Self;
}

impl PendingTransactionExtension for PendingTransaction {
    fn tuple(self) -> (PendingTransaction, Transaction) {
        let tx = self.transaction();
        (self, tx)
    }
    fn expect(self, expected: &Expected) -> Self {
        expect(&self, expected);
        self
    }
    fn accumulate(self, accumulator: &mut Accumulator) -> Self {
        accumulator.list.push(self.clone());
        self
    }
}

trait GeneratorSummaryExtension {
    fn check(self, accumulator: &Accumulator) -> Self;
}

impl GeneratorSummaryExtension for GeneratorSummary {
    fn check(self, accumulator: &Accumulator) -> Self {
        assert_eq!(self.number_of_generated_transactions(), accumulator.list.len(), "number of generated transactions");
        assert_eq!(
            self.aggregated_utxos(),
            accumulator.list.iter().map(|pt| pt.utxo_entries().len()).sum::<usize>(),
            "number of utxo entries"
        );
        let aggregated_fees = accumulator.list.iter().map(|pt| pt.fees()).sum::<u64>();
        assert_eq!(self.aggregated_fees(), aggregated_fees, "aggregated fees");
        let aggregated_mass = accumulator.list.iter().map(|pt| pt.mass()).sum::<u64>();
        assert_eq!(self.aggregated_mass(), aggregated_mass, "aggregated mass");
        self
    }
}

trait GeneratorExtension {
    fn harness(self) -> Rc<Harness>;
}

impl GeneratorExtension for Generator {
    fn harness(self) -> Rc<Harness> {
        Harness::new(self)
    }
}

fn test_network_id() -> NetworkId {
    NetworkId::new(NetworkType::Mainnet)
}

#[derive(Default)]
struct Accumulator {
    list: Vec<PendingTransaction>,
}

#[derive(Debug)]
struct Expected {
    is_final: bool,
    input_count: usize,
    aggregate_input_value: u64,
    output_count: usize,
    fees: u64,
}

fn expect(pt: &PendingTransaction, expected: &Expected) {
    let tx = pt.transaction();

    let aggregate_input_value = pt.utxo_entries().values().map(|entry| entry.amount()).sum::<u64>();
    let aggregate_output_value = tx.outputs.iter().map(|output| output.value).sum::<u64>();

    assert_eq!(pt.is_final(), expected.is_final, "expected final transaction");
    assert_eq!(tx.inputs.len(), expected.input_count, "expected input count");
    assert_eq!(aggregate_input_value, expected.aggregate_input_value, "expected aggregate input value");
    assert_eq!(pt.aggregate_input_value(), aggregate_input_value, "pending transaction aggregate input value");
    assert_eq!(tx.outputs.len(), expected.output_count, "expected output count");
    assert_eq!(pt.fees(), expected.fees, "expected fees");

    // every generated transaction conserves value: the consumed inputs
    // are split between the outputs and the fees
    assert_eq!(aggregate_input_value, aggregate_output_value + pt.fees(), "aggregate input value vs output value with fees");
    assert_eq!(pt.aggregate_output_value(), aggregate_output_value, "pending transaction aggregate output value");

    let network_id = pt.generator().network_id();
    let calc = MassCalculator::new(&get_consensus_params_by_network(&pt.generator().network_type()), &NetworkParams::from(network_id));
    let utxo_entries = pt.utxo_entries().values().cloned().collect::<Vec<_>>();
    let calculated_mass =
        calc.calc_overall_mass_for_unsigned_transaction(&tx, &utxo_entries, pt.minimum_signatures()).unwrap();
    assert_eq!(pt.mass(), calculated_mass, "pending transaction mass does not match calculated mass");
}

struct Harness {
    generator: Generator,
    accumulator: RefCell<Accumulator>,
}

impl Harness {
    pub fn new(generator: Generator) -> Rc<Self> {
        Rc::new(Harness { generator, accumulator: RefCell::new(Accumulator::default()) })
    }

    pub fn fetch(self: &Rc<Self>, expected: &Expected) -> Rc<Self> {
        self.generator.generate_transaction().unwrap().unwrap().accumulate(&mut self.accumulator.borrow_mut()).expect(expected);
        self.clone()
    }

    pub fn drain(self: &Rc<Self>, count: usize, expected: &Expected) -> Rc<Self> {
        for _ in 0..count {
            self.generator.generate_transaction().unwrap().unwrap().accumulate(&mut self.accumulator.borrow_mut()).expect(expected);
        }
        self.clone()
    }

    pub fn finalize(self: Rc<Self>) {
        let pt = self.generator.generate_transaction().unwrap();
        assert!(pt.is_none(), "expected no more transactions");
        self.generator.summary().check(&self.accumulator.borrow());
    }

    pub fn insufficient_funds(self: Rc<Self>) {
        match &self.generator.generate_transaction() {
            Ok(_) => panic!("expected insufficient funds, instead received a transaction"),
            Err(err) => {
                assert!(matches!(&err, Error::InsufficientFunds { .. }), "expecting insufficient funds error, received: {err:?}");
            }
        }
    }
}

fn make_generator(
    network_id: NetworkId,
    utxo_amounts: &[u64],
    fees: Fees,
    final_transaction_destination: PaymentDestination,
) -> Result<Generator> {
    let utxo_entries: Vec<UtxoEntryReference> = utxo_amounts.iter().copied().map(UtxoEntryReference::simulated).collect();
    let utxo_iterator: Box<dyn Iterator<Item = UtxoEntryReference> + Send + Sync + 'static> = Box::new(utxo_entries.into_iter());

    let settings = GeneratorSettings::try_new_with_iterator(
        network_id,
        utxo_iterator,
        change_address(network_id.network_type()),
        1,
        1,
        final_transaction_destination,
        fees,
        None,
    )?;

    Generator::try_new(settings, None, None)
}

fn generator(network_id: NetworkId, utxo_amounts: &[u64], fees: Fees, outputs: &[u64]) -> Result<Generator> {
    let address = output_address(network_id.network_type());
    let outputs = outputs.iter().map(|amount| (address.clone(), *amount)).collect::<Vec<_>>();
    make_generator(network_id, utxo_amounts, fees, PaymentOutputs::from(outputs.as_slice()).into())
}

fn change_address(network_type: NetworkType) -> Address {
    Address::new(Prefix::from(network_type), Version::PubKey, &[0x5au8; 32])
}

fn output_address(network_type: NetworkType) -> Address {
    Address::new(Prefix::from(network_type), Version::PubKey, &[0xa5u8; 32])
}

#[test]
fn test_generator_empty_utxo_noop() -> Result<()> {
    let generator = make_generator(test_network_id(), &[], Fees::None, PaymentDestination::Change)?;
    let tx = generator.generate_transaction().unwrap();
    assert!(tx.is_none());
    Ok(())
}

#[test]
fn test_generator_sweep_three_utxos() -> Result<()> {
    let harness =
        make_generator(test_network_id(), &[10 * KAS, 10 * KAS, 10 * KAS], Fees::None, PaymentDestination::Change)?.harness();
    let pt = harness.generator.generate_transaction().unwrap().unwrap();
    pt.clone().accumulate(&mut harness.accumulator.borrow_mut()).expect(&Expected {
        is_final: true,
        input_count: 3,
        aggregate_input_value: 30 * KAS,
        output_count: 1,
        // mass 94 + 3 * 1118 + 412
        fees: 3860,
    });
    // a sweep carries no payment value; everything compounds to change
    assert_eq!(pt.payment_value(), None);
    assert_eq!(pt.change_value(), 30 * KAS - 3860);
    harness.finalize();
    Ok(())
}

#[test]
fn test_generator_sweep_with_priority_fees_rejection() -> Result<()> {
    let generator = make_generator(test_network_id(), &[10 * KAS, 10 * KAS], Fees::SenderPays(KAS), PaymentDestination::Change);
    match generator {
        Err(Error::GeneratorFeesInSweepTransaction) => {}
        _ => panic!("sweep with priority fees must fail generator creation"),
    }
    Ok(())
}

#[test]
fn test_generator_zero_value_payment_output_rejection() -> Result<()> {
    let generator = generator(test_network_id(), &[10 * KAS], Fees::SenderPays(0), &[0]);
    match generator {
        Err(Error::GeneratorZeroValuePaymentOutput) => {}
        _ => panic!("zero value payment output must fail generator creation"),
    }
    Ok(())
}

#[test]
fn test_generator_change_address_network_mismatch_rejection() -> Result<()> {
    let network_id = test_network_id();
    let utxo_iterator: Box<dyn Iterator<Item = UtxoEntryReference> + Send + Sync + 'static> =
        Box::new(vec![UtxoEntryReference::simulated(10 * KAS)].into_iter());
    let settings = GeneratorSettings::try_new_with_iterator(
        network_id,
        utxo_iterator,
        change_address(NetworkType::Testnet),
        1,
        1,
        PaymentOutputs::from((output_address(network_id.network_type()), KAS)).into(),
        Fees::SenderPays(0),
        None,
    )?;
    match Generator::try_new(settings, None, None) {
        Err(Error::GeneratorChangeAddressNetworkTypeMismatch) => {}
        _ => panic!("change address network mismatch must fail generator creation"),
    }
    Ok(())
}

#[test]
fn test_generator_payment_output_network_mismatch_rejection() -> Result<()> {
    let network_id = test_network_id();
    let destination: PaymentDestination = PaymentOutputs::from((output_address(NetworkType::Testnet), KAS)).into();
    match make_generator(network_id, &[10 * KAS], Fees::SenderPays(0), destination) {
        Err(Error::GeneratorPaymentOutputNetworkTypeMismatch) => {}
        _ => panic!("payment output network mismatch must fail generator creation"),
    }
    Ok(())
}

#[test]
fn test_generator_inputs_2_outputs_1_fees_exclude() -> Result<()> {
    let harness = generator(test_network_id(), &[50 * KAS, 30 * KAS], Fees::SenderPays(0), &[70 * KAS])?.harness();
    let (pt, tx) = harness.generator.generate_transaction().unwrap().unwrap().tuple();
    pt.clone().accumulate(&mut harness.accumulator.borrow_mut()).expect(&Expected {
        is_final: true,
        input_count: 2,
        aggregate_input_value: 80 * KAS,
        output_count: 2,
        // mass 94 + 2 * 1118 + 2 * 412
        fees: 3154,
    });
    assert_eq!(pt.payment_value(), Some(70 * KAS));
    assert_eq!(tx.outputs[0].value, 70 * KAS);
    assert_eq!(tx.outputs[1].value, 9_99996846);
    assert_eq!(pt.change_value(), 9_99996846);
    harness.finalize();
    Ok(())
}

#[test]
fn test_generator_inputs_2_outputs_1_fees_include() -> Result<()> {
    let harness = generator(test_network_id(), &[50 * KAS, 30 * KAS], Fees::ReceiverPays(0), &[70 * KAS])?.harness();
    let (pt, tx) = harness.generator.generate_transaction().unwrap().unwrap().tuple();
    pt.clone().accumulate(&mut harness.accumulator.borrow_mut()).expect(&Expected {
        is_final: true,
        input_count: 2,
        aggregate_input_value: 80 * KAS,
        output_count: 2,
        fees: 3154,
    });
    // the receiver absorbs the fees
    assert_eq!(tx.outputs[0].value, 69_99996846);
    assert_eq!(tx.outputs[1].value, 10 * KAS);
    assert_eq!(pt.change_value(), 10 * KAS);
    harness.finalize();
    Ok(())
}

#[test]
fn test_generator_insufficient_funds() -> Result<()> {
    generator(test_network_id(), &[50 * KAS, 30 * KAS], Fees::SenderPays(0), &[100 * KAS])?.harness().insufficient_funds();
    Ok(())
}

#[test]
fn test_generator_insufficient_funds_reports_shortfall() -> Result<()> {
    let generator = generator(test_network_id(), &[50 * KAS, 30 * KAS], Fees::SenderPays(0), &[100 * KAS])?;
    match generator.generate_transaction() {
        Err(Error::InsufficientFunds { additional_needed, .. }) => {
            assert!(additional_needed >= 20 * KAS, "shortfall must cover at least the missing payment amount");
        }
        _ => panic!("expected insufficient funds"),
    }
    Ok(())
}

#[test]
fn test_generator_chained_batch_transactions() -> Result<()> {
    let harness = generator(test_network_id(), &[10 * KAS; 180], Fees::SenderPays(0), &[1750 * KAS])?.harness();

    harness
        .fetch(&Expected {
            is_final: false,
            input_count: 88,
            aggregate_input_value: 880 * KAS,
            output_count: 1,
            // batch mass 94 + 88 * 1118 + 412
            fees: 98890,
        })
        .fetch(&Expected {
            is_final: false,
            input_count: 88,
            // previous batch change (880 KAS - 98890) + 87 iterator entries
            aggregate_input_value: 879_99901110 + 870 * KAS,
            output_count: 1,
            fees: 98890,
        })
        .fetch(&Expected {
            is_final: true,
            input_count: 2,
            // previous batch change (1749.99901110 KAS - 98890) + 1 iterator entry
            aggregate_input_value: 1749_99802220 + 10 * KAS,
            output_count: 2,
            fees: 3154,
        });

    let accumulator = harness.accumulator.borrow();
    let [batch1, batch2, fin] = accumulator.list.as_slice() else {
        panic!("expected three generated transactions");
    };

    // each non-final transaction compounds into a single change output
    // that funds the first input of the next transaction in the chain
    assert!(batch1.is_batch() && batch2.is_batch() && fin.is_final());
    assert_eq!(batch2.transaction().inputs[0].previous_outpoint.transaction_id(), batch1.id());
    assert_eq!(fin.transaction().inputs[0].previous_outpoint.transaction_id(), batch2.id());
    assert_eq!(batch1.transaction().outputs[0].value, 879_99901110);
    assert_eq!(batch2.transaction().outputs[0].value, 1749_99802220);
    assert_eq!(fin.transaction().outputs[0].value, 1750 * KAS);
    assert_eq!(fin.transaction().outputs[1].value, 9_99799066);
    assert_eq!(fin.id(), harness.generator.final_transaction_id().unwrap());

    let summary = harness.generator.summary();
    assert_eq!(summary.aggregated_utxos(), 178);
    assert_eq!(summary.aggregated_fees(), 200934);
    drop(accumulator);
    harness.finalize();
    Ok(())
}

#[test]
fn test_generator_chained_batch_fees_include() -> Result<()> {
    let harness = generator(test_network_id(), &[KAS; 100], Fees::ReceiverPays(5 * KAS), &[100 * KAS])?.harness();

    harness
        .fetch(&Expected {
            is_final: false,
            input_count: 88,
            aggregate_input_value: 88 * KAS,
            output_count: 1,
            fees: 98890,
        })
        .fetch(&Expected {
            is_final: true,
            input_count: 13,
            // previous batch change (88 KAS - 98890) + 12 iterator entries
            aggregate_input_value: 87_99901110 + 12 * KAS,
            output_count: 1,
            // relay fees for mass 94 + 13 * 1118 + 412 plus 5 KAS priority
            fees: 5_00015040,
        });

    let accumulator = harness.accumulator.borrow();
    let fin = accumulator.list.last().unwrap().clone();
    // the payment output absorbs the accumulated batch fees, the final
    // transaction relay fees and the priority fees
    assert_eq!(fin.transaction().outputs[0].value, 100 * KAS - 98890 - 15040 - 5 * KAS);
    assert_eq!(fin.change_value(), 0);
    drop(accumulator);
    harness.finalize();
    Ok(())
}

#[test]
fn test_generator_estimate_matches_generation() -> Result<()> {
    let amounts = (1..=40u64).map(|n| n * KAS).collect::<Vec<_>>();
    let estimate = generator(test_network_id(), &amounts, Fees::SenderPays(KAS), &[500 * KAS])?.estimate()?;

    let generator = generator(test_network_id(), &amounts, Fees::SenderPays(KAS), &[500 * KAS])?;
    let mut count = 0;
    for pt in generator.iter() {
        let _ = pt?;
        count += 1;
    }
    let summary = generator.summary();

    assert_eq!(estimate.number_of_generated_transactions(), count);
    assert_eq!(estimate.number_of_generated_transactions(), summary.number_of_generated_transactions());
    assert_eq!(estimate.aggregated_utxos(), summary.aggregated_utxos());
    assert_eq!(estimate.aggregated_fees(), summary.aggregated_fees());
    assert_eq!(estimate.aggregated_mass(), summary.aggregated_mass());
    assert_eq!(estimate.final_transaction_amount(), Some(500 * KAS));
    Ok(())
}

#[test]
fn test_generator_payload_is_carried_by_final_transaction() -> Result<()> {
    let network_id = test_network_id();
    let payload = vec![0xde, 0xad, 0xbe, 0xef];
    let utxo_iterator: Box<dyn Iterator<Item = UtxoEntryReference> + Send + Sync + 'static> =
        Box::new(vec![UtxoEntryReference::simulated(10 * KAS)].into_iter());
    let settings = GeneratorSettings::try_new_with_iterator(
        network_id,
        utxo_iterator,
        change_address(network_id.network_type()),
        1,
        1,
        PaymentOutputs::from((output_address(network_id.network_type()), KAS)).into(),
        Fees::SenderPays(0),
        Some(payload.clone()),
    )?;
    let generator = Generator::try_new(settings, None, None)?;
    let pt = generator.generate_transaction().unwrap().unwrap();
    assert!(pt.is_final());
    assert_eq!(pt.transaction().payload, payload);
    Ok(())
}

#[test]
fn test_generator_abort() -> Result<()> {
    let network_id = test_network_id();
    let abortable = Abortable::new();
    let utxo_iterator: Box<dyn Iterator<Item = UtxoEntryReference> + Send + Sync + 'static> =
        Box::new((0..4).map(|_| UtxoEntryReference::simulated(10 * KAS)).collect::<Vec<_>>().into_iter());
    let settings = GeneratorSettings::try_new_with_iterator(
        network_id,
        utxo_iterator,
        change_address(network_id.network_type()),
        1,
        1,
        PaymentOutputs::from((output_address(network_id.network_type()), 15 * KAS)).into(),
        Fees::SenderPays(0),
        None,
    )?;
    let generator = Generator::try_new(settings, None, Some(&abortable))?;
    abortable.abort();
    assert!(matches!(generator.generate_transaction(), Err(Error::Aborted(_))));
    Ok(())
}
