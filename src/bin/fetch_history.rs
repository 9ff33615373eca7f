use bitkub_port_avg::*;

use anyhow::{Context, Result};
use client::BitkubClient;
use domain::TradeRecord;

#[tokio::main]
async fn main() -> Result<()> {
    let symbol = std::env::args()
        .nth(1)
        .context("Usage: cargo run --bin fetch_history <SYMBOL> [START_TIMESTAMP]")?;
    let start = std::env::args()
        .nth(2)
        .map(|s| s.parse::<u64>())
        .transpose()
        .context("START_TIMESTAMP must be an integer")?;

    config::load_env()?;
    let bitkub = config::BitkubConfig::from_env()?;

    let api = BitkubClient::new(&bitkub.base_url, bitkub.api_key, bitkub.api_secret)?;

    println!("\n=== ORDER HISTORY ===");
    println!("Pair: {}\n", client::trading_pair(&symbol));

    let mut pages = api.order_history_pages(&symbol, start);
    let mut page_no = 0;
    let mut total = 0;

    while let Some(page) = pages.next_page().await? {
        page_no += 1;
        println!("📍 Page {} ({} fills)", page_no, page.len());

        for order in &page {
            let when = match TradeRecord::try_from(order) {
                Ok(record) => record
                    .executed_at()
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| order.ts.to_string()),
                Err(e) => format!("❌ {}", e),
            };

            println!(
                "   {:<4} rate={} amount={} fee={} credit={} {} [{}]",
                order.side, order.rate, order.amount, order.fee, order.credit, when, order.txn_id
            );
        }
        total += page.len();
    }

    println!("\n✅ {} fills across {} page(s)", total, page_no);
    Ok(())
}
