use crate::client::BitkubClient;
use crate::config::Config;
use crate::logging;
use crate::report::{build_report_rows, write_report};
use crate::summary::aggregate;
use anyhow::{bail, Result};
use log::info;
use std::path::PathBuf;

/// Process every configured token in order.
///
/// A failing token is logged and skipped; the run still errors at the end.
pub async fn run(client: &BitkubClient, config: &Config) -> Result<()> {
    let mut failed = Vec::new();
    for symbol in &config.tokens {
        if let Err(e) = process_token(client, config, symbol).await {
            logging::log_failure(symbol, &e);
            failed.push(symbol.clone());
        }
    }

    if !failed.is_empty() {
        bail!("{} token(s) failed: {}", failed.len(), failed.join(", "));
    }

    info!("🏁 Done");
    Ok(())
}

/// Fetch, fold, print and report one token. Returns the CSV path when one
/// was written.
pub async fn process_token(
    client: &BitkubClient,
    config: &Config,
    symbol: &str,
) -> Result<Option<PathBuf>> {
    let records = client.trade_records(symbol, config.start_timestamp).await?;
    logging::log_fetched(symbol, &records);

    let summary = aggregate(&records)?;
    logging::print_summary(symbol, &summary);

    let mut written = None;
    if config.write_reports {
        let rows = build_report_rows(&summary, config.layout);
        if rows.is_empty() {
            logging::log_no_report(symbol);
        } else {
            let path = write_report(&config.reports_dir, symbol, &rows, config.layout)?;
            logging::log_report(symbol, &path);
            written = Some(path);
        }
    }

    if config.fetch_transfers {
        let deposits = client.deposit_histories(symbol).await?;
        let withdrawals = client.withdraw_histories(symbol).await?;
        logging::log_transfers(symbol, &deposits, &withdrawals);
    }

    Ok(written)
}
