use crate::domain::{DepositHistory, TradeRecord, WithdrawHistory};
use crate::summary::OrderSummary;
use colored::Colorize;
use log::{error, info, warn};
use rust_decimal::Decimal;
use std::path::Path;

pub fn log_fetched(symbol: &str, records: &[TradeRecord]) {
    let first = records.iter().filter_map(|r| r.executed_at()).min();
    let last = records.iter().filter_map(|r| r.executed_at()).max();

    match (first, last) {
        (Some(first), Some(last)) => info!(
            "📥 {} — {} fills from {} to {}",
            symbol,
            records.len(),
            first.format("%Y-%m-%d %H:%M:%S"),
            last.format("%Y-%m-%d %H:%M:%S")
        ),
        _ => info!("📥 {} — {} fills", symbol, records.len()),
    }
}

pub fn log_failure(symbol: &str, err: &anyhow::Error) {
    error!("❌ {} skipped: {:#}", symbol, err);
}

pub fn log_no_report(symbol: &str) {
    warn!("⚠️ {} has no fills, report not written", symbol);
}

pub fn log_report(symbol: &str, path: &Path) {
    info!("✅ {} report written to {}", symbol, path.display());
}

pub fn log_transfers(symbol: &str, deposits: &[DepositHistory], withdrawals: &[WithdrawHistory]) {
    let deposited: Decimal = deposits.iter().map(|d| d.amount).sum();
    let withdrawn: Decimal = withdrawals.iter().map(|w| w.amount).sum();
    let fees: Decimal = withdrawals.iter().map(|w| w.fee).sum();

    info!(
        "🔁 {} deposits: {} ({}) | withdrawals: {} ({}, fees {})",
        symbol,
        deposits.len(),
        deposited.normalize(),
        withdrawals.len(),
        withdrawn.normalize(),
        fees.normalize()
    );
}

/// Console summary for one token
pub fn print_summary(symbol: &str, summary: &OrderSummary) {
    println!("{}", "====================================================".dimmed());
    println!(
        "Token {} remaining amount: {}",
        symbol.bold(),
        summary.remaining_token_amount.round_dp(8).normalize()
    );
    println!(
        "Total investment in fiat: {}",
        summary.total_invested_fiat.round_dp(2)
    );

    let average = summary.average_cost().round_dp(2);
    if average.is_zero() {
        println!("Average price per token: {}", "0".yellow());
    } else {
        println!("Average price per token: {}", average.to_string().green());
    }
}
