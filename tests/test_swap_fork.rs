mod anvil_common;

use alloy::primitives::{Address, U256, address};

use rebalance_flow::executor::evm::{EvmRouter, from_token_units};
use rebalance_flow::executor::outcome::{ActionOutcome, ActionState};
use rebalance_flow::executor::{ExecutorSettings, SwapExecutor, SwapRouter};
use rebalance_flow::model::{ActionKind, RebalanceAction, RebalancePlan};
use rebalance_flow::wallet::{LocalWallet, WalletProvider};

use anvil_common::*;

// ── Constants: Uniswap V2 on Ethereum ────────────────────────────────

const ETH_RPC: &str = "https://eth.llamarpc.com";
const ETH_CHAIN_ID: u64 = 1;

const USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");

fn plan(actions: Vec<RebalanceAction>) -> RebalancePlan {
    RebalancePlan {
        actions,
        ..Default::default()
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore] // Requires Anvil + network access
async fn test_local_wallet_reads_fork_chain_id() {
    let ctx = spawn_fork(ETH_RPC, ETH_CHAIN_ID);
    let wallet = LocalWallet::from_private_key(&ctx.private_key, fork_network(&ctx)).unwrap();
    assert_eq!(wallet.chain_id().await.unwrap(), ETH_CHAIN_ID);
}

#[tokio::test]
#[ignore] // Requires Anvil + network access
async fn test_buy_then_sell_through_router() {
    // 1. Fork mainnet and fund the wallet
    let ctx = spawn_fork(ETH_RPC, ETH_CHAIN_ID);
    fund_eth(&ctx.rpc_url, ctx.wallet_address, U256::from(10u128 * 10u128.pow(18))).await;

    let signer = ctx.private_key.parse().unwrap();
    let network = fork_network(&ctx);
    let router = EvmRouter::new(&network, signer).unwrap();
    assert_eq!(router.account(), ctx.wallet_address);
    let executor = SwapExecutor::new(&router, ExecutorSettings::default());

    // 2. Buy USDC with 0.1 ETH
    let snapshot = snapshot_with("USDC", USDC, 6, 0.0);
    let report = executor
        .execute(&plan(vec![RebalanceAction::new("USDC", ActionKind::Buy, 0.1)]), &snapshot)
        .await;
    assert_eq!(report.records[0].outcome.state(), ActionState::Confirmed);

    let usdc_units = balance_of(&ctx.rpc_url, USDC, ctx.wallet_address).await;
    assert!(usdc_units > U256::ZERO, "no USDC received");
    let usdc = from_token_units(usdc_units, 6);
    println!("Bought {usdc} USDC");

    // 3. Sell half: needs an approval first
    let snapshot = snapshot_with("USDC", USDC, 6, usdc);
    let report = executor
        .execute(
            &plan(vec![RebalanceAction::new("USDC", ActionKind::Sell, usdc / 2.0)]),
            &snapshot,
        )
        .await;
    assert!(matches!(
        report.records[0].outcome,
        ActionOutcome::Confirmed {
            approval: Some(_),
            ..
        }
    ));

    // Exact-amount approval is fully consumed by the swap.
    let left = allowance_of(&ctx.rpc_url, USDC, ctx.wallet_address, router.router_address()).await;
    assert_eq!(left, U256::ZERO);
    let remaining = balance_of(&ctx.rpc_url, USDC, ctx.wallet_address).await;
    assert!(remaining < usdc_units);
}

#[tokio::test]
#[ignore] // Requires Anvil + network access
async fn test_dry_run_reads_allowance_only() {
    let ctx = spawn_fork(ETH_RPC, ETH_CHAIN_ID);
    let signer = ctx.private_key.parse().unwrap();
    let router = EvmRouter::new(&fork_network(&ctx), signer).unwrap();
    let settings = ExecutorSettings {
        dry_run: true,
        ..Default::default()
    };
    let executor = SwapExecutor::new(&router, settings);

    let snapshot = snapshot_with("USDC", USDC, 6, 100.0);
    let report = executor
        .execute(&plan(vec![RebalanceAction::new("USDC", ActionKind::Sell, 50.0)]), &snapshot)
        .await;

    assert!(matches!(
        report.records[0].outcome,
        ActionOutcome::Simulated {
            needs_approval: true
        }
    ));
    assert_eq!(balance_of(&ctx.rpc_url, USDC, ctx.wallet_address).await, U256::ZERO);
}
