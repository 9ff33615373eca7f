use crate::domain::OrderHistory;
use crate::summary::errors::SummaryError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl FromStr for Side {
    type Err = SummaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            _ => Err(SummaryError::InvalidSide(s.to_string())),
        }
    }
}

/// One executed fill, decoded from the exchange.
///
/// `amount` is THB spent on a buy but the token quantity on a sell.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    pub side: Side,
    pub rate: Decimal,
    pub amount: Decimal,
    pub fee: Decimal,
    pub credit: Decimal,
    pub timestamp: u64, // ms
}

impl TradeRecord {
    pub fn executed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(i64::try_from(self.timestamp).ok()?)
    }
}

impl TryFrom<&OrderHistory> for TradeRecord {
    type Error = SummaryError;

    fn try_from(order: &OrderHistory) -> Result<Self, Self::Error> {
        Ok(Self {
            side: order.side.parse()?,
            rate: parse_decimal("rate", &order.rate)?,
            amount: parse_decimal("amount", &order.amount)?,
            fee: parse_decimal("fee", &order.fee)?,
            credit: parse_decimal("credit", &order.credit)?,
            timestamp: order.ts,
        })
    }
}

/// Strict decimal parse; blanks are rejected rather than read as zero
pub fn parse_decimal(field: &'static str, raw: &str) -> Result<Decimal, SummaryError> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| SummaryError::ParseFailure {
            field,
            value: raw.to_string(),
        })
}
