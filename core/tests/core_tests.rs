use minichain_core::chain::Chain;
use minichain_core::config::Config;
use minichain_core::crypto;
use minichain_core::miner;
use minichain_core::pow;
use minichain_core::transaction::Transaction;
use p256::ecdsa::SigningKey;
use rand_core::OsRng;

fn easy_config() -> Config {
    Config { target: [0xFF; 32], ..Config::default() }
}

/// Mining only runs when the mempool has something to include (S1), so
/// tests that just want a coinbase-funded address seed a throwaway pending
/// transaction first.
async fn seed_pending_transaction(chain: &Chain) {
    let tx = Transaction::new("filler-sender", "filler-recipient", 0.01);
    chain.mempool().add(tx.id().unwrap(), tx).await;
}

#[tokio::test]
async fn mining_a_block_credits_the_miner_and_advances_the_chain() {
    let chain = Chain::new(easy_config());
    seed_pending_transaction(&chain).await;
    let outcome = miner::mine_once(&chain, "miner-addr").await.unwrap();
    assert!(matches!(outcome, miner::MineOutcome::Mined(_)));
    assert_eq!(chain.height().await, 2);
    assert_eq!(chain.balance("miner-addr").await, 1.0);
}

#[tokio::test]
async fn mining_with_an_empty_mempool_leaves_the_chain_at_height_one() {
    let chain = Chain::new(easy_config());
    let outcome = miner::mine_once(&chain, "miner-addr").await.unwrap();
    assert!(matches!(outcome, miner::MineOutcome::Nothing));
    assert_eq!(chain.height().await, 1);
}

#[tokio::test]
async fn signed_transfer_is_admitted_then_mined_and_settles_balances() {
    let chain = Chain::new(easy_config());

    // Seed the sender with a mined coinbase reward first.
    let sender_key = SigningKey::random(&mut OsRng);
    let sender_address = crypto::address_from_pubkey(sender_key.verifying_key());
    seed_pending_transaction(&chain).await;
    miner::mine_once(&chain, &sender_address).await.unwrap();
    assert_eq!(chain.balance(&sender_address).await, 1.0);

    // Submit a signed transfer from the sender to a new recipient.
    let pubkey_hex = crypto::pubkey_to_hex(sender_key.verifying_key());
    let unsigned = Transaction::new(sender_address.clone(), "recipient-addr", 0.4);
    let digest = unsigned.id().unwrap();
    let signature = crypto::sign(&sender_key, &digest).unwrap();
    let signature_hex = crypto::signature_to_hex(&signature);

    chain
        .create_transaction(&sender_address, "recipient-addr", 0.4, &pubkey_hex, &signature_hex)
        .await
        .expect("valid signed transfer is admitted");
    assert_eq!(chain.mempool().size().await, 1);

    // Mine again; the pending transfer should be drained into the next block.
    miner::mine_once(&chain, &sender_address).await.unwrap();
    assert_eq!(chain.mempool().size().await, 0);
    assert_eq!(chain.balance("recipient-addr").await, 0.4);
    // Sender: +1.0 (first coinbase) -0.4 (transfer) +1.0 (second coinbase) = 1.6
    assert_eq!(chain.balance(&sender_address).await, 1.6);
}

#[tokio::test]
async fn forged_signature_is_rejected_before_entering_the_mempool() {
    let chain = Chain::new(easy_config());
    let sender_key = SigningKey::random(&mut OsRng);
    let sender_address = crypto::address_from_pubkey(sender_key.verifying_key());
    let pubkey_hex = crypto::pubkey_to_hex(sender_key.verifying_key());

    // Sign a different amount than the one submitted.
    let signed_digest = Transaction::new(sender_address.clone(), "recipient-addr", 0.1).id().unwrap();
    let signature = crypto::sign(&sender_key, &signed_digest).unwrap();
    let signature_hex = crypto::signature_to_hex(&signature);

    let result = chain
        .create_transaction(&sender_address, "recipient-addr", 999.0, &pubkey_hex, &signature_hex)
        .await;
    assert!(result.is_err());
    assert_eq!(chain.mempool().size().await, 0);
}

#[test]
fn a_solved_block_satisfies_its_own_target_and_nothing_else_does() {
    let mut target = [0u8; 32];
    target[0] = 0x00;
    target[1] = 0xFF;
    let mut block = minichain_core::block::Block::new([0u8; 32], Vec::new(), target).unwrap();
    let outcome = pow::solve(&mut block, None).unwrap();
    assert_eq!(outcome, pow::SolveOutcome::Solved);
    assert!(pow::verify(&block).unwrap());
}
