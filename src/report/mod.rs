use crate::summary::OrderSummary;
use anyhow::{Context, Result};
use csv::{Terminator, WriterBuilder};
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const AMOUNT_DP: u32 = 6;

/* =======================
LAYOUT
======================= */

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportLayout {
    /// Separate buy and sell rows per rate
    #[default]
    Split,
    /// One signed row per rate, buys minus sells
    Combined,
}

impl ReportLayout {
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            ReportLayout::Split => &["rate", "type", "fiat_amount", "token_amount"],
            ReportLayout::Combined => &["rate", "fiat_amount", "token_amount"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RowKind {
    Buy,
    Sell,
    Combined,
}

impl RowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowKind::Buy => "buy",
            RowKind::Sell => "sell",
            RowKind::Combined => "combined",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub rate: Decimal,
    pub kind: RowKind,
    pub fiat_amount: Decimal,
    pub token_amount: Decimal,
}

/* =======================
ROW BUILDING
======================= */

/// Flatten the rate buckets into rows ordered by ascending rate.
///
/// At equal rates a buy row comes before the sell row.
pub fn build_report_rows(summary: &OrderSummary, layout: ReportLayout) -> Vec<ReportRow> {
    let mut rows: Vec<ReportRow> = match layout {
        ReportLayout::Split => {
            let buys = summary.buys.iter().map(|(rate, bucket)| ReportRow {
                rate,
                kind: RowKind::Buy,
                fiat_amount: bucket.fiat,
                token_amount: bucket.tokens,
            });
            let sells = summary.sells.iter().map(|(rate, bucket)| ReportRow {
                rate,
                kind: RowKind::Sell,
                fiat_amount: bucket.fiat,
                token_amount: bucket.tokens,
            });
            buys.chain(sells).collect()
        }
        ReportLayout::Combined => {
            let rates: BTreeSet<Decimal> =
                summary.buys.rates().chain(summary.sells.rates()).collect();

            rates
                .into_iter()
                .map(|rate| ReportRow {
                    rate,
                    kind: RowKind::Combined,
                    fiat_amount: summary.buys.fiat_at(rate) - summary.sells.fiat_at(rate),
                    token_amount: summary.buys.tokens_at(rate) - summary.sells.tokens_at(rate),
                })
                .collect()
        }
    };

    rows.sort_by(|a, b| a.rate.cmp(&b.rate).then(a.kind.cmp(&b.kind)));
    rows
}

/* =======================
CSV OUTPUT
======================= */

pub fn report_path(dir: &Path, symbol: &str) -> PathBuf {
    dir.join(format!("{}_order_summary.csv", symbol.to_uppercase()))
}

/// Write rows to `<dir>/<SYMBOL>_order_summary.csv`, replacing any previous
/// report for that symbol. Amounts carry six places; rates are printed exactly.
pub fn write_report(
    dir: &Path,
    symbol: &str,
    rows: &[ReportRow],
    layout: ReportLayout,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating reports dir {}", dir.display()))?;

    let path = report_path(dir, symbol);
    let mut wtr = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_path(&path)
        .with_context(|| format!("opening {}", path.display()))?;

    wtr.write_record(layout.header())?;
    for row in rows {
        let rate = format_rate(row.rate);
        let fiat = format_amount(row.fiat_amount);
        let tokens = format_amount(row.token_amount);
        match layout {
            ReportLayout::Split => wtr.write_record([
                rate.as_str(),
                row.kind.as_str(),
                fiat.as_str(),
                tokens.as_str(),
            ])?,
            ReportLayout::Combined => {
                wtr.write_record([rate.as_str(), fiat.as_str(), tokens.as_str()])?
            }
        }
    }
    wtr.flush()?;

    Ok(path)
}

/// Exact rate, trailing zeros dropped, so distinct buckets never print alike
pub fn format_rate(rate: Decimal) -> String {
    rate.normalize().to_string()
}

pub fn format_amount(value: Decimal) -> String {
    let mut v = value.round_dp(AMOUNT_DP);
    v.rescale(AMOUNT_DP);
    v.to_string()
}
