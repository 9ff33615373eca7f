use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

pub mod order;
pub use order::{Side, TradeRecord};

// ==================================================
// PAGINATION
// ==================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderPagination {
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub last: u64,
    #[serde(default)]
    pub next: u64,
    #[serde(default)]
    pub prev: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferPagination {
    #[serde(default)]
    pub page: u64,
    #[serde(default)]
    pub last: u64,
}

// ==================================================
// ORDER HISTORY
// ==================================================

/// Raw fill from `my-order-history`. Numeric fields stay as text until
/// they are decoded into a [`TradeRecord`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderHistory {
    #[serde(default)]
    pub txn_id: String,
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub parent_order_id: String,
    #[serde(default)]
    pub parent_order_hash: String,
    #[serde(default)]
    pub super_order_id: String,
    #[serde(default)]
    pub super_order_hash: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub taken_by_me: bool,
    #[serde(default)]
    pub is_maker: bool,
    pub side: String,
    #[serde(default, rename = "type")]
    pub order_type: String,
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub rate: String,
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub fee: String,
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub credit: String,
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub amount: String,
    #[serde(default)]
    pub ts: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderHistoryResponse {
    pub error: i64,
    #[serde(default)]
    pub result: Vec<OrderHistory>,
    #[serde(default)]
    pub pagination: OrderPagination,
}

// ==================================================
// DEPOSITS + WITHDRAWALS
// ==================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositHistory {
    #[serde(default)]
    pub txn_id: String,
    pub currency: String,
    pub amount: Decimal,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub time: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositHistoryResponse {
    pub error: i64,
    #[serde(default)]
    pub result: Vec<DepositHistory>,
    #[serde(default)]
    pub pagination: TransferPagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawHistory {
    #[serde(default)]
    pub txn_id: String,
    #[serde(default)]
    pub ext_ref: String,
    #[serde(default)]
    pub hash: String,
    pub currency: String,
    pub amount: Decimal,
    #[serde(default)]
    pub fee: Decimal,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub memo: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub time: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WithdrawHistoryResponse {
    pub error: i64,
    #[serde(default)]
    pub result: Vec<WithdrawHistory>,
    #[serde(default)]
    pub pagination: TransferPagination,
}

/// Exchange envelopes share an `error` code; zero means success
pub trait Envelope {
    fn error_code(&self) -> i64;
}

impl Envelope for OrderHistoryResponse {
    fn error_code(&self) -> i64 {
        self.error
    }
}

impl Envelope for DepositHistoryResponse {
    fn error_code(&self) -> i64 {
        self.error
    }
}

impl Envelope for WithdrawHistoryResponse {
    fn error_code(&self) -> i64 {
        self.error
    }
}

// Bitkub sends decimals as strings, but older payloads used bare numbers
fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => Ok(s),
        StringOrNumber::Number(n) => Ok(n.to_string()),
    }
}
