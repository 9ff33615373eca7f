//! Cost-basis aggregation over a token's fills.
//!
//! Folding is strictly sequential in input order and does no I/O; printing
//! and report files are left to the caller.

pub mod errors;

use crate::domain::{Side, TradeRecord};
use errors::SummaryError;
use rust_decimal::Decimal;
use std::borrow::Borrow;
use std::collections::HashMap;

// ==================================================
// RATE BUCKETS
// ==================================================

/// Volume traded at one exact rate
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bucket {
    pub fiat: Decimal,
    pub tokens: Decimal,
}

/// THB and token volume accumulated per exact rate. Key order is arbitrary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateBuckets {
    by_rate: HashMap<Decimal, Bucket>,
}

impl RateBuckets {
    /// `None` leaves the bucket untouched
    fn add(&mut self, rate: Decimal, fiat: Decimal, tokens: Decimal) -> Option<()> {
        let current = self.get(rate);
        let next = Bucket {
            fiat: current.fiat.checked_add(fiat)?,
            tokens: current.tokens.checked_add(tokens)?,
        };
        self.by_rate.insert(rate, next);
        Some(())
    }

    pub fn is_empty(&self) -> bool {
        self.by_rate.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_rate.len()
    }

    pub fn get(&self, rate: Decimal) -> Bucket {
        self.by_rate.get(&rate).copied().unwrap_or_default()
    }

    pub fn rates(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.by_rate.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Decimal, Bucket)> + '_ {
        self.by_rate.iter().map(|(rate, bucket)| (*rate, *bucket))
    }

    pub fn fiat_at(&self, rate: Decimal) -> Decimal {
        self.get(rate).fiat
    }

    pub fn tokens_at(&self, rate: Decimal) -> Decimal {
        self.get(rate).tokens
    }

    pub fn total_fiat(&self) -> Decimal {
        self.by_rate.values().map(|b| b.fiat).sum()
    }

    pub fn total_tokens(&self) -> Decimal {
        self.by_rate.values().map(|b| b.tokens).sum()
    }
}

// ==================================================
// SUMMARY
// ==================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderSummary {
    /// Signed token balance implied by the fills
    pub remaining_token_amount: Decimal,
    /// Net THB outlay: gross buys minus net sell proceeds
    pub total_invested_fiat: Decimal,
    pub buys: RateBuckets,
    pub sells: RateBuckets,
    pub fill_count: usize,
}

impl OrderSummary {
    /// Average THB paid per token still held.
    ///
    /// Zero when the position is flat or net short, since there is no
    /// meaningful entry price.
    pub fn average_cost(&self) -> Decimal {
        if self.remaining_token_amount > Decimal::ZERO {
            // out of range only for dust balances against huge outlays
            self.total_invested_fiat
                .checked_div(self.remaining_token_amount)
                .unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        }
    }

    pub fn has_activity(&self) -> bool {
        !self.buys.is_empty() || !self.sells.is_empty()
    }
}

// ==================================================
// AGGREGATION
// ==================================================

#[derive(Debug, Default)]
struct AggregationState {
    remaining_token_amount: Decimal,
    total_invested_fiat: Decimal,
    buys: RateBuckets,
    sells: RateBuckets,
    fill_count: usize,
}

impl AggregationState {
    fn apply(&mut self, index: usize, record: &TradeRecord) -> Result<(), SummaryError> {
        if record.rate <= Decimal::ZERO {
            return Err(SummaryError::InvalidRate {
                index,
                rate: record.rate,
            });
        }

        let overflow = || SummaryError::Overflow { index };

        match record.side {
            // amount is THB spent
            Side::Buy => {
                let net_fiat = record
                    .amount
                    .checked_sub(record.fee)
                    .and_then(|v| v.checked_add(record.credit))
                    .ok_or_else(overflow)?;
                let tokens = net_fiat.checked_div(record.rate).ok_or_else(overflow)?;

                let remaining = self
                    .remaining_token_amount
                    .checked_add(tokens)
                    .ok_or_else(overflow)?;
                let invested = self
                    .total_invested_fiat
                    .checked_add(record.amount)
                    .ok_or_else(overflow)?;
                self.buys
                    .add(record.rate, net_fiat, tokens)
                    .ok_or_else(overflow)?;

                self.remaining_token_amount = remaining;
                self.total_invested_fiat = invested;
            }
            // amount is tokens sold
            Side::Sell => {
                let net_fiat = record
                    .amount
                    .checked_mul(record.rate)
                    .and_then(|v| v.checked_sub(record.fee))
                    .and_then(|v| v.checked_add(record.credit))
                    .ok_or_else(overflow)?;

                let invested = self
                    .total_invested_fiat
                    .checked_sub(net_fiat)
                    .ok_or_else(overflow)?;
                let remaining = self
                    .remaining_token_amount
                    .checked_sub(record.amount)
                    .ok_or_else(overflow)?;
                self.sells
                    .add(record.rate, net_fiat, record.amount)
                    .ok_or_else(overflow)?;

                self.total_invested_fiat = invested;
                self.remaining_token_amount = remaining;
            }
        }

        self.fill_count += 1;
        Ok(())
    }

    fn finish(self) -> OrderSummary {
        OrderSummary {
            remaining_token_amount: self.remaining_token_amount,
            total_invested_fiat: self.total_invested_fiat,
            buys: self.buys,
            sells: self.sells,
            fill_count: self.fill_count,
        }
    }
}

/// Fold fills, in the order given, into an [`OrderSummary`].
///
/// Stops at the first fill with a non-positive rate or whose amounts leave
/// the decimal range.
pub fn aggregate<I>(records: I) -> Result<OrderSummary, SummaryError>
where
    I: IntoIterator,
    I::Item: Borrow<TradeRecord>,
{
    let mut state = AggregationState::default();
    for (index, record) in records.into_iter().enumerate() {
        state.apply(index, record.borrow())?;
    }
    Ok(state.finish())
}
