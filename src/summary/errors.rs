use rust_decimal::Decimal;
use thiserror::Error;

/// Failures raised while decoding fills or folding them into a summary
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SummaryError {
    /// A fill carried a zero or negative rate, so unit price is undefined
    #[error("invalid rate {rate} on fill #{index}")]
    InvalidRate { index: usize, rate: Decimal },

    /// Side tag was neither "buy" nor "sell"
    #[error("invalid side: {0:?}")]
    InvalidSide(String),

    /// A numeric field could not be decoded
    #[error("parse error: {field} = {value:?}")]
    ParseFailure { field: &'static str, value: String },

    /// Arithmetic on a fill left the representable decimal range
    #[error("arithmetic overflow on fill #{index}")]
    Overflow { index: usize },
}
