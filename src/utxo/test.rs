use crate::imports::*;
use crate::tests::RpcCoreMock;
use crate::tx::consensus::SOMPI_PER_KASPA;
use crate::utxo::{UtxoEntryVariant, UtxoIterator};
use workflow_core::time::Duration;

const KAS: u64 = SOMPI_PER_KASPA;

async fn processor_at(current_daa_score: u64) -> Result<UtxoProcessor> {
    let network_id = NetworkId::new(NetworkType::Mainnet);
    let rpc_mock = Arc::new(RpcCoreMock::new(network_id, current_daa_score));
    let rpc: Rpc = rpc_mock.into();
    let processor = UtxoProcessor::new(&rpc, Some(network_id), None);
    processor.handle_daa_score_change(current_daa_score).await?;
    Ok(processor)
}

#[tokio::test]
async fn test_utxo_context_insert_maturity_classification() -> Result<()> {
    let processor = processor_at(1000).await?;
    let context = UtxoContext::new(&processor);
    let address = Address::new(Prefix::Mainnet, crate::address::Version::PubKey, &[0x11; 32]);

    let mature = UtxoEntryReference::simulated_with_args(10 * KAS, &address, 900, false);
    let pending_user = UtxoEntryReference::simulated_with_args(20 * KAS, &address, 995, false);
    let stasis_coinbase = UtxoEntryReference::simulated_with_args(500 * KAS, &address, 990, true);
    let pending_coinbase = UtxoEntryReference::simulated_with_args(400 * KAS, &address, 920, true);

    for entry in [&mature, &pending_user, &stasis_coinbase, &pending_coinbase] {
        context.insert(entry.clone(), 1000, false)?;
    }

    let balance = context.update_balance().await?;
    assert_eq!(balance.mature, 10 * KAS);
    assert_eq!(balance.pending, 420 * KAS);
    assert_eq!(balance.mature_utxo_count, 1);
    assert_eq!(balance.pending_utxo_count, 2);
    assert_eq!(balance.stasis_utxo_count, 1);
    assert_eq!(context.mature_utxo_size(), 1);

    Ok(())
}

#[tokio::test]
async fn test_utxo_context_duplicate_insert_is_ignored() -> Result<()> {
    let processor = processor_at(1000).await?;
    let context = UtxoContext::new(&processor);

    let entry = UtxoEntryReference::simulated(10 * KAS);
    context.insert(entry.clone(), 1000, false)?;
    context.insert(entry, 1000, false)?;

    let balance = context.update_balance().await?;
    assert_eq!(balance.mature, 10 * KAS);
    assert_eq!(context.mature_utxo_size(), 1);

    Ok(())
}

#[tokio::test]
async fn test_mature_utxo_set_is_ordered_by_amount() -> Result<()> {
    let processor = processor_at(1000).await?;
    let context = UtxoContext::new(&processor);

    for amount in [5, 1, 3, 2, 4] {
        context.insert(UtxoEntryReference::simulated(amount * KAS), 1000, false)?;
    }

    let amounts = UtxoIterator::new(&context).map(|entry| entry.amount()).collect::<Vec<_>>();
    assert_eq!(amounts, vec![KAS, 2 * KAS, 3 * KAS, 4 * KAS, 5 * KAS]);

    Ok(())
}

#[tokio::test]
async fn test_utxo_context_remove_variants() -> Result<()> {
    let processor = processor_at(1000).await?;
    let context = UtxoContext::new(&processor);

    let address = Address::new(Prefix::Mainnet, crate::address::Version::PubKey, &[0x33; 32]);
    let mature = UtxoEntryReference::simulated(10 * KAS);
    let pending = UtxoEntryReference::simulated_with_args(20 * KAS, &address, 995, false);
    let consumed = UtxoEntryReference::simulated(30 * KAS);

    context.insert(mature.clone(), 1000, false)?;
    context.insert(pending.clone(), 1000, false)?;
    context.insert(consumed.clone(), 1000, false)?;
    context.consume(std::slice::from_ref(&consumed))?;

    let removed = context.remove(vec![mature.id(), pending.id(), consumed.id()])?;
    assert_eq!(removed.len(), 3);
    assert!(removed.iter().any(|variant| matches!(variant, UtxoEntryVariant::Mature(entry) if entry.id() == mature.id())));
    assert!(removed.iter().any(|variant| matches!(variant, UtxoEntryVariant::Pending(entry) if entry.id() == pending.id())));
    assert!(removed.iter().any(|variant| matches!(variant, UtxoEntryVariant::Consumed(entry) if entry.id() == consumed.id())));

    let balance = context.update_balance().await?;
    assert_eq!(balance.mature, 0);
    assert_eq!(balance.pending, 0);
    assert_eq!(context.mature_utxo_size(), 0);

    Ok(())
}

#[tokio::test]
async fn test_utxo_context_consume_and_recover() -> Result<()> {
    let processor = processor_at(1000).await?;
    let context = UtxoContext::new(&processor);

    let first = UtxoEntryReference::simulated(10 * KAS);
    let second = UtxoEntryReference::simulated(20 * KAS);
    context.insert(first.clone(), 1000, false)?;
    context.insert(second.clone(), 1000, false)?;
    context.consume(std::slice::from_ref(&first))?;
    assert_eq!(context.mature_utxo_size(), 1);

    // nothing to recover within the recovery period
    assert!(!context.recover(Some(Duration::from_secs(60))).await?);
    assert_eq!(context.mature_utxo_size(), 1);

    // once the recovery period lapses the entry returns to the mature set
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(context.recover(Some(Duration::from_millis(1))).await?);
    assert_eq!(context.mature_utxo_size(), 2);

    let balance = context.update_balance().await?;
    assert_eq!(balance.mature, 30 * KAS);

    Ok(())
}

#[tokio::test]
async fn test_pending_promotion_on_daa_advance() -> Result<()> {
    let processor = processor_at(1000).await?;
    let context = UtxoContext::new(&processor);

    let address = Address::new(Prefix::Mainnet, crate::address::Version::PubKey, &[0x44; 32]);
    let entry = UtxoEntryReference::simulated_with_args(10 * KAS, &address, 1000, false);
    context.insert(entry, 1000, false)?;
    let balance = context.update_balance().await?;
    assert_eq!(balance.pending, 10 * KAS);
    assert_eq!(balance.mature, 0);

    processor.handle_daa_score_change(1010).await?;
    let balance = context.update_balance().await?;
    assert_eq!(balance.pending, 0);
    assert_eq!(balance.mature, 10 * KAS);
    assert_eq!(context.mature_utxo_size(), 1);

    Ok(())
}

#[tokio::test]
async fn test_coinbase_stasis_transitions() -> Result<()> {
    let processor = processor_at(1000).await?;
    let context = UtxoContext::new(&processor);
    let address = Address::new(Prefix::Mainnet, crate::address::Version::PubKey, &[0x22; 32]);

    let entry = UtxoEntryReference::simulated_with_args(500 * KAS, &address, 1000, true);
    context.insert(entry, 1000, false)?;
    let balance = context.update_balance().await?;
    assert_eq!(balance.stasis_utxo_count, 1);
    assert_eq!(balance.pending, 0);
    assert_eq!(balance.mature, 0);

    processor.handle_daa_score_change(1050).await?;
    let balance = context.update_balance().await?;
    assert_eq!(balance.stasis_utxo_count, 0);
    assert_eq!(balance.pending, 500 * KAS);

    processor.handle_daa_score_change(1100).await?;
    let balance = context.update_balance().await?;
    assert_eq!(balance.pending, 0);
    assert_eq!(balance.mature, 500 * KAS);

    Ok(())
}

#[tokio::test]
async fn test_balance_events_fire_only_on_change() -> Result<()> {
    let processor = processor_at(1000).await?;
    let events = processor.multiplexer().channel();
    let context = UtxoContext::new(&processor);

    context.insert(UtxoEntryReference::simulated(10 * KAS), 1000, false)?;
    context.update_balance().await?;
    let event = events.receiver.try_recv().map_err(|_| Error::custom("expected a balance event"))?;
    assert_eq!(event.kind(), EventKind::Balance);

    // totals are unchanged, no event is posted
    context.update_balance().await?;
    assert!(events.receiver.try_recv().is_err());

    Ok(())
}
