use crate::executor::evm::short_addr;
use crate::executor::outcome::{ActionOutcome, ExecutionReport};
use crate::model::RebalancePlan;

use super::state::{AgentReply, AppState, Event, Notice, NoticeLevel};

/// Presentation layer. Notified after every state transition.
pub trait Renderer: Send {
    fn render(&mut self, event: &Event, state: &AppState);
}

/// Prints tables and notices to stdout.
#[derive(Debug, Default)]
pub struct ConsoleRenderer;

impl Renderer for ConsoleRenderer {
    fn render(&mut self, event: &Event, state: &AppState) {
        match event {
            Event::Detected(_) => print_portfolio(state),
            Event::PlanReceived(plan) => print_plan(plan),
            Event::ExecutionFinished(report) => print_report(report),
            Event::AgentReplied(reply) => print_agent_reply(reply),
            Event::Connected(session) => {
                println!("Wallet:   {}", session.address);
                println!("Chain:    {:#x}", session.chain_id);
            }
            _ => {}
        }

        if let Some(notice) = fresh_notice(event, state) {
            match notice.level {
                NoticeLevel::Info => println!("{}", notice.message),
                NoticeLevel::Warning => println!("WARNING: {}", notice.message),
                NoticeLevel::Error => eprintln!("ERROR: {}", notice.message),
            }
        }
    }
}

/// The notice `event` just set, if any. A notice left over from an earlier
/// event is not returned again.
pub fn fresh_notice<'a>(event: &Event, state: &'a AppState) -> Option<&'a Notice> {
    if event.sets_notice() {
        state.notice.as_ref()
    } else {
        None
    }
}

pub fn print_portfolio(state: &AppState) {
    if state.snapshot.is_empty() {
        println!("No tokens detected.");
        return;
    }
    let current = state.current_allocation();

    println!();
    println!(
        "{:<10} {:>18} {:>12} {:>14} {:>9} {:>9}",
        "Token", "Balance", "Price", "Value", "Current", "Target"
    );
    for (symbol, entry) in state.snapshot.iter() {
        let price = state.prices.get(symbol).copied().unwrap_or(0.0);
        let target = state
            .allocation
            .get(symbol)
            .map(|t| format!("{t:.2}%"))
            .unwrap_or_else(|| "-".into());
        println!(
            "{:<10} {:>18.6} {:>12.4} {:>14.2} {:>8.2}% {:>9}",
            symbol,
            entry.balance,
            price,
            state.snapshot.value_of(symbol, &state.prices),
            current.get(symbol).copied().unwrap_or(0.0),
            target,
        );
    }
    println!("Total value: ${:.2}", state.total_value());
    if !state.live_prices {
        println!("(placeholder prices)");
    }
    if !state.custom_tokens.is_empty() {
        let custom: Vec<String> = state.custom_tokens.iter().map(short_addr).collect();
        println!("Custom tokens: {}", custom.join(", "));
    }
    println!();
}

pub fn print_plan(plan: &RebalancePlan) {
    println!();
    println!("── Rebalance plan (total value ${:.2}) ──", plan.total_value);
    println!("{:<10} {:>9} {:>9}", "Token", "Current", "Target");
    for (symbol, target) in &plan.target_allocation {
        let current = plan.current_allocation.get(symbol).copied().unwrap_or(0.0);
        println!("{:<10} {:>8.2}% {:>8.2}%", symbol, current, target);
    }

    if plan.is_balanced() {
        println!("No actions: portfolio already balanced.");
        return;
    }
    println!();
    for (i, action) in plan.actions.iter().enumerate() {
        let amount = action
            .parsed_amount()
            .map(|a| format!("{a:.6}"))
            .unwrap_or_else(|| action.amount.to_string());
        let change = action
            .percentage_change
            .map(|c| format!(" ({c:+.2}%)"))
            .unwrap_or_default();
        println!("  {}. {:<4} {:<10} {}{}", i + 1, action.action, action.token, amount, change);
    }
    println!();
}

pub fn print_report(report: &ExecutionReport) {
    println!();
    for record in &report.records {
        let amount = record
            .amount
            .map(|a| format!("{a:.6}"))
            .unwrap_or_else(|| "?".into());
        let detail = match &record.outcome {
            ActionOutcome::Skipped(reason) => reason.to_string(),
            ActionOutcome::Simulated { needs_approval } => {
                if *needs_approval {
                    "[DRY RUN] would approve router, then swap".into()
                } else {
                    "[DRY RUN] would swap".into()
                }
            }
            ActionOutcome::Confirmed { swap, .. } => format!("tx {swap}"),
            ActionOutcome::Failed { error, .. } => error.to_string(),
        };
        println!(
            "  {}. {:<4} {:<10} {:>14}  {:<10} {}",
            record.index + 1,
            record.kind,
            record.token,
            amount,
            record.outcome.state(),
            detail
        );
    }
    for (token, tx) in report.dangling_approvals() {
        println!("  note: approval {tx} for {token} left unused");
    }
    println!();
}

fn print_agent_reply(reply: &AgentReply) {
    println!();
    println!("{}", reply.response);
    if reply.trending.is_empty() {
        return;
    }
    println!();
    println!("{:<6} {:<10} {:<24} {:>14}", "Rank", "Symbol", "Name", "Price (USD)");
    for token in &reply.trending {
        let rank = token
            .market_cap_rank
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".into());
        let price = token
            .price_usd
            .map(|p| format!("{p:.4}"))
            .unwrap_or_else(|| "-".into());
        println!("{:<6} {:<10} {:<24} {:>14}", rank, token.symbol, token.name, price);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;

    use super::*;
    use crate::app::state::reduce;
    use crate::wallet::WalletSession;

    #[test]
    fn test_provider_error_shown_once() {
        let disabled = Event::WalletDisabled("No wallet provider available".into());
        let state = reduce(AppState::default(), disabled.clone());
        assert_eq!(
            fresh_notice(&disabled, &state).map(|n| n.level),
            Some(NoticeLevel::Error)
        );

        let added = Event::CustomTokenAdded(Address::repeat_byte(9));
        let state = reduce(state, added.clone());
        assert!(state.notice.is_some());
        assert!(fresh_notice(&added, &state).is_none());
    }

    #[test]
    fn test_connected_notice_not_repeated_on_network_check() {
        let connected = Event::Connected(WalletSession {
            address: Address::repeat_byte(1),
            chain_id: 11_155_111,
        });
        let state = reduce(AppState::default(), connected.clone());
        assert!(fresh_notice(&connected, &state).is_some());

        let confirmed = Event::NetworkConfirmed(11_155_111);
        let state = reduce(state, confirmed.clone());
        assert!(fresh_notice(&confirmed, &state).is_none());
    }
}
