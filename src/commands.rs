use alloy::primitives::Address;
use anyhow::{Context, Result, anyhow, bail};

use rebalance_flow::app::render::print_portfolio;
use rebalance_flow::app::{ConsoleRenderer, Controller, SessionStore};
use rebalance_flow::backend::BackendClient;
use rebalance_flow::cli::Command;
use rebalance_flow::config::RuntimeConfig;
use rebalance_flow::error::{RebalanceError, WalletError};
use rebalance_flow::executor::evm::EvmRouter;
use rebalance_flow::model::AllocationRequest;
use rebalance_flow::wallet::LocalWallet;

/// Entry point for every subcommand.
pub async fn run(command: Command, config: RuntimeConfig) -> Result<()> {
    let store = SessionStore::load_or_new(&config.session_file)?;
    let signer = config.signer()?;

    let mut wallet = LocalWallet::new(signer.clone(), config.network.clone());
    // The wallet remembers an account approved in an earlier run.
    if let (Some(signer), Some(last)) = (&signer, store.last_account) {
        if signer.address() == last {
            wallet = wallet.pre_authorised();
        }
    }
    let backend = BackendClient::new(&config.backend_url, config.settings.http_timeout)?;

    println!("=== rebalance-flow ===");
    println!("Network:  {}", config.network);
    println!("Backend:  {}", backend.base_url());
    println!();

    let mut controller = Controller::new(
        Box::new(wallet),
        Box::new(backend),
        config.network.clone(),
        config.settings.clone(),
    )
    .with_renderer(Box::new(ConsoleRenderer));
    controller.load_session(&store);

    match command {
        Command::Status => {
            match controller.restore().await {
                Ok(Some(_)) => {}
                Ok(None) => println!("Not connected."),
                Err(RebalanceError::Wallet(WalletError::WrongNetwork { .. })) => {
                    println!("Run `rebalance-flow switch-network` to fix the network.");
                }
                Err(e) => return Err(e.into()),
            }
            print_tracked(&controller);
            return Ok(());
        }
        Command::Connect => {
            controller.connect().await?;
            controller.detect().await?;
        }
        Command::Disconnect => {
            controller.disconnect();
        }
        Command::SwitchNetwork => {
            controller.switch_network().await?;
            controller.restore().await?;
        }
        Command::Detect => {
            require_session(&mut controller).await?;
            controller.detect().await?;
        }
        Command::AddToken { address } => {
            let address: Address = address
                .trim()
                .parse()
                .map_err(|e| anyhow!("Invalid token address '{address}': {e}"))?;
            if controller.restore().await?.is_none() {
                println!("Not connected; the token will be detected after `connect`.");
            }
            controller.add_custom_token(address).await?;
        }
        Command::Plan { targets } => {
            require_session(&mut controller).await?;
            controller.detect().await?;
            apply_targets(&mut controller, targets.as_deref())?;
            controller.fetch_plan().await?;
        }
        Command::Execute { targets, dry_run } => {
            require_session(&mut controller).await?;
            let signer = signer.context("REBALANCE_PRIVATE_KEY is required to sign swaps")?;
            let router = EvmRouter::new(controller.network(), signer)?;

            controller.detect().await?;
            apply_targets(&mut controller, targets.as_deref())?;
            controller.fetch_plan().await?;
            let report = controller.execute_plan(&router, dry_run).await?;

            if dry_run {
                println!("[DRY RUN] no transactions were sent.");
            }
            if report.failed() > 0 {
                println!("Some actions failed; re-run `plan` to see what is left.");
            }
        }
        Command::Query { text, plan } => {
            require_session(&mut controller).await?;
            controller.detect().await?;
            controller.apply_query(&text).await?;
            if plan {
                controller.fetch_plan().await?;
            } else {
                print_portfolio(controller.state());
            }
        }
        Command::Ask { message } => {
            require_session(&mut controller).await?;
            controller.ask_agent(&message).await?;
        }
    }

    controller
        .session_store()
        .save(&config.session_file)
        .with_context(|| format!("saving {}", config.session_file.display()))?;
    Ok(())
}

async fn require_session(controller: &mut Controller) -> Result<()> {
    if controller.restore().await?.is_none() {
        bail!("No connected account. Run `rebalance-flow connect` first.");
    }
    Ok(())
}

fn apply_targets(controller: &mut Controller, targets: Option<&str>) -> Result<()> {
    if let Some(targets) = targets {
        let targets: AllocationRequest = targets.parse()?;
        controller.set_targets(targets);
    }
    Ok(())
}

fn print_tracked(controller: &Controller) {
    let state = controller.state();
    if state.custom_tokens.is_empty() {
        println!("Custom tokens: none");
    } else {
        println!("Custom tokens:");
        for token in &state.custom_tokens {
            println!("  {token}");
        }
    }
    if state.allocation.is_empty() {
        println!("Targets: none");
    } else {
        let targets: Vec<String> = state
            .allocation
            .targets()
            .iter()
            .map(|(symbol, pct)| format!("{symbol}={pct}"))
            .collect();
        println!("Targets: {}", targets.join(","));
    }
}
