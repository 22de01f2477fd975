//!
//! Integration tests driving the [`UtxoProcessor`] notification cycle
//! through the mock RPC endpoint.
//!

use crate::imports::*;
use crate::rpc::{RpcUtxoEntry, RpcUtxosByAddressesEntry};
use crate::tests::RpcCoreMock;
use crate::tx::consensus::SOMPI_PER_KASPA;
use crate::tx::generator::{Generator, GeneratorSettings};
use crate::tx::{Fees, PaymentOutputs};
use crate::utxo::UtxoContextId;
use crate::address::{pay_to_address_script, Version};
use workflow_core::channel::MultiplexerChannel;

const KAS: u64 = SOMPI_PER_KASPA;

fn test_address(byte: u8) -> Address {
    Address::new(Prefix::Mainnet, Version::PubKey, &[byte; 32])
}

fn utxo_index_entry(address: &Address, amount: u64, block_daa_score: u64, is_coinbase: bool) -> RpcUtxosByAddressesEntry {
    RpcUtxosByAddressesEntry {
        address: Some(address.clone()),
        outpoint: TransactionOutpoint::new(TransactionId::from_bytes(rand::random::<[u8; 32]>()), 0),
        utxo_entry: RpcUtxoEntry {
            amount,
            script_public_key: pay_to_address_script(address),
            block_daa_score,
            is_coinbase,
        },
    }
}

async fn expect_event(events: &MultiplexerChannel<Box<Events>>, kind: EventKind) -> Events {
    loop {
        let event = tokio::time::timeout(std::time::Duration::from_secs(5), events.receiver.recv())
            .await
            .unwrap_or_else(|_| panic!("timeout waiting for {kind:?} event"))
            .expect("event channel closed");
        if event.kind() == kind {
            return *event;
        }
    }
}

async fn expect_balance(events: &MultiplexerChannel<Box<Events>>) -> Balance {
    match expect_event(events, EventKind::Balance).await {
        Events::Balance { balance, .. } => balance.expect("balance event without balance"),
        _ => unreachable!(),
    }
}

struct Setup {
    rpc_mock: Arc<RpcCoreMock>,
    processor: UtxoProcessor,
    events: MultiplexerChannel<Box<Events>>,
}

async fn connect(network_id: NetworkId, virtual_daa_score: u64) -> Result<Setup> {
    let rpc_mock = Arc::new(RpcCoreMock::new(network_id, virtual_daa_score));
    let rpc: Rpc = rpc_mock.clone().into();
    let processor = UtxoProcessor::new(&rpc, Some(network_id), None);
    let events = processor.multiplexer().channel();
    processor.start().await?;

    rpc_mock.ctl().signal_open().await?;
    expect_event(&events, EventKind::UtxoProcStart).await;

    Ok(Setup { rpc_mock, processor, events })
}

#[tokio::test]
async fn test_utxo_processor_maturity_cycle() -> Result<()> {
    let network_id = NetworkId::new(NetworkType::Mainnet);
    let Setup { rpc_mock, processor, events } = connect(network_id, 1000).await?;

    assert!(processor.is_connected());
    assert_eq!(processor.current_daa_score(), Some(1000));

    let address = test_address(0x01);
    let context = UtxoContext::new_with_id(&processor, UtxoContextId::new(1));
    context.register_addresses(std::slice::from_ref(&address)).await?;

    // an incoming UTXO minted at the current DAA score starts out pending
    rpc_mock.notify_utxos_changed(vec![utxo_index_entry(&address, 100 * KAS, 1000, false)], vec![])?;
    expect_event(&events, EventKind::Pending).await;
    let balance = expect_balance(&events).await;
    assert_eq!(balance.pending, 100 * KAS);
    assert_eq!(balance.mature, 0);
    assert_eq!(balance.pending_utxo_count, 1);

    // crossing the maturity period promotes it to the mature set
    rpc_mock.notify_daa_score_change(1010)?;
    expect_event(&events, EventKind::Maturity).await;
    let balance = expect_balance(&events).await;
    assert_eq!(balance.mature, 100 * KAS);
    assert_eq!(balance.pending, 0);
    assert_eq!(balance.mature_utxo_count, 1);
    assert_eq!(context.mature_utxo_size(), 1);
    assert_eq!(processor.current_daa_score(), Some(1010));

    rpc_mock.ctl().signal_close().await?;
    expect_event(&events, EventKind::UtxoProcStop).await;
    assert!(!processor.is_connected());

    processor.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_utxo_processor_coinbase_stasis_cycle() -> Result<()> {
    let network_id = NetworkId::new(NetworkType::Mainnet);
    let Setup { rpc_mock, processor, events } = connect(network_id, 1000).await?;

    let address = test_address(0x02);
    let context = UtxoContext::new_with_id(&processor, UtxoContextId::new(2));
    context.register_addresses(std::slice::from_ref(&address)).await?;

    // a freshly minted coinbase UTXO enters stasis and is not reflected
    // in the pending or mature balance
    rpc_mock.notify_utxos_changed(vec![utxo_index_entry(&address, 500 * KAS, 1000, true)], vec![])?;
    expect_event(&events, EventKind::Stasis).await;
    let balance = expect_balance(&events).await;
    assert_eq!(balance.mature, 0);
    assert_eq!(balance.pending, 0);
    assert_eq!(balance.stasis_utxo_count, 1);

    // leaving the stasis period surfaces the entry as pending
    rpc_mock.notify_daa_score_change(1050)?;
    expect_event(&events, EventKind::Pending).await;
    let balance = expect_balance(&events).await;
    assert_eq!(balance.pending, 500 * KAS);
    assert_eq!(balance.stasis_utxo_count, 0);

    // and the coinbase maturity period promotes it to the mature set
    rpc_mock.notify_daa_score_change(1100)?;
    expect_event(&events, EventKind::Maturity).await;
    let balance = expect_balance(&events).await;
    assert_eq!(balance.mature, 500 * KAS);
    assert_eq!(balance.pending, 0);

    processor.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_utxo_context_discovery_and_resync() -> Result<()> {
    let network_id = NetworkId::new(NetworkType::Mainnet);
    let Setup { rpc_mock, processor, events } = connect(network_id, 1000).await?;

    let address = test_address(0x03);
    rpc_mock.add_utxo_index_entry(utxo_index_entry(&address, 50 * KAS, 0, false));

    // registration scans the node's UTXO index
    let context = UtxoContext::new_with_id(&processor, UtxoContextId::new(3));
    context.register_addresses(std::slice::from_ref(&address)).await?;
    expect_event(&events, EventKind::Discovery).await;
    let balance = expect_balance(&events).await;
    assert_eq!(balance.mature, 50 * KAS);
    assert_eq!(context.mature_utxo_size(), 1);

    // a client resync drops all local state and repeats the scan
    context.clear().await?;
    assert!(context.balance().is_none());
    assert_eq!(context.mature_utxo_size(), 0);

    rpc_mock.add_utxo_index_entry(utxo_index_entry(&address, 25 * KAS, 0, false));
    context.register_addresses(std::slice::from_ref(&address)).await?;
    expect_event(&events, EventKind::Discovery).await;
    let balance = expect_balance(&events).await;
    assert_eq!(balance.mature, 75 * KAS);
    assert_eq!(context.mature_utxo_size(), 2);

    processor.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_outgoing_transaction_submission() -> Result<()> {
    let network_id = NetworkId::new(NetworkType::Mainnet);
    let Setup { rpc_mock, processor, events } = connect(network_id, 1000).await?;

    let address = test_address(0x04);
    let destination = test_address(0x05);
    rpc_mock.add_utxo_index_entry(utxo_index_entry(&address, 50 * KAS, 0, false));
    rpc_mock.add_utxo_index_entry(utxo_index_entry(&address, 30 * KAS, 0, false));

    let context = UtxoContext::new_with_id(&processor, UtxoContextId::new(4));
    context.register_addresses(std::slice::from_ref(&address)).await?;
    expect_event(&events, EventKind::Discovery).await;
    let balance = expect_balance(&events).await;
    assert_eq!(balance.mature, 80 * KAS);

    let settings = GeneratorSettings::try_new_with_context(
        context.clone(),
        address.clone(),
        1,
        1,
        PaymentOutputs::from((destination, 30 * KAS)).into(),
        Fees::SenderPays(0),
        None,
    )?;
    let generator = Generator::try_new(settings, None, None)?;
    let pending_tx = generator.generate_transaction()?.expect("expected a final transaction");
    assert!(pending_tx.is_final());

    // a rejected submission restores the consumed entries
    rpc_mock.fail_next_submission();
    assert!(pending_tx.try_submit(&processor.rpc_api()).await.is_err());
    assert_eq!(context.mature_utxo_size(), 2);
    assert!(rpc_mock.submitted_transactions().is_empty());

    // a successful submission consumes the entries and reflects the
    // payment as in-flight value until acceptance
    let txid = pending_tx.try_submit(&processor.rpc_api()).await?;
    assert_eq!(txid, pending_tx.id());
    assert_eq!(rpc_mock.submitted_transactions(), vec![txid]);
    expect_event(&events, EventKind::Pending).await;
    let balance = expect_balance(&events).await;
    assert_eq!(balance.mature, 0);
    assert_eq!(balance.outgoing, 30 * KAS);

    // the node settles the transaction: change arrives at our address
    // and the spent outpoints are removed
    let change_value = pending_tx.change_value();
    let change_entry = RpcUtxosByAddressesEntry {
        address: Some(address.clone()),
        outpoint: TransactionOutpoint::new(txid, 1),
        utxo_entry: RpcUtxoEntry {
            amount: change_value,
            script_public_key: pay_to_address_script(&address),
            block_daa_score: 1000,
            is_coinbase: false,
        },
    };
    let spent = pending_tx
        .utxo_entries()
        .values()
        .map(|entry| RpcUtxosByAddressesEntry {
            address: Some(address.clone()),
            outpoint: entry.id(),
            utxo_entry: RpcUtxoEntry {
                amount: entry.amount(),
                script_public_key: pay_to_address_script(&address),
                block_daa_score: 0,
                is_coinbase: false,
            },
        })
        .collect::<Vec<_>>();
    rpc_mock.notify_utxos_changed(vec![change_entry], spent)?;
    rpc_mock.notify_virtual_chain_changed(vec![txid])?;

    expect_event(&events, EventKind::Pending).await;
    let balance = expect_balance(&events).await;
    assert_eq!(balance.mature, change_value);
    assert_eq!(balance.outgoing, 0);
    assert_eq!(balance.mature_utxo_count, 1);

    processor.stop().await?;
    Ok(())
}
