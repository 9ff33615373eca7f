use crate::domain::*;
use anyhow::{bail, Context, Result};
use hmac::{Hmac, Mac};
use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use url::form_urlencoded;
type HmacSha256 = Hmac<Sha256>;

// ==================================================
// ENDPOINTS
// ==================================================

pub const ORDER_HISTORY_PATH: &str = "/api/v3/market/my-order-history";
pub const DEPOSIT_HISTORY_PATH: &str = "/api/v3/crypto/deposit-history";
pub const WITHDRAW_HISTORY_PATH: &str = "/api/v3/crypto/withdraw-history";

const PAGE_LIMIT: u32 = 100;
const QUOTE_CURRENCY: &str = "thb";

#[derive(Clone)]
pub struct BitkubClient {
    client: Client,

    pub base_url: String,
    pub api_key: String,
    api_secret: String,
}

// ==================================================
// CONSTRUCTOR
// ==================================================
impl BitkubClient {
    pub fn new(base_url: &str, api_key: String, api_secret: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            api_secret,
        })
    }

    // ==================================================
    // REQUEST SIGNING (HMAC)
    // ==================================================
    pub fn sign(&self, payload: &str) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .context("initialising HMAC")?;
        mac.update(payload.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    async fn get<T>(&self, path: &str, query: &str) -> Result<T>
    where
        T: DeserializeOwned + Envelope,
    {
        let timestamp = now_ms()?;
        let signature = self.sign(&signature_payload(timestamp, "GET", path, query))?;
        let url = format!("{}{}{}", self.base_url, path, query);

        debug!("GET {}{}", path, query);

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .header("X-BTK-TIMESTAMP", timestamp.to_string())
            .header("X-BTK-APIKEY", &self.api_key)
            .header("X-BTK-SIGN", signature)
            .send()
            .await
            .with_context(|| format!("GET {}", path))?;

        if !response.status().is_success() {
            let status = response.status();
            let err = response.text().await.unwrap_or_default();
            bail!("GET {} failed ({}): {}", path, status, err);
        }

        let body: T = response
            .json()
            .await
            .with_context(|| format!("decoding {} response", path))?;

        if body.error_code() != 0 {
            bail!("Bitkub error {} on {}", body.error_code(), path);
        }

        Ok(body)
    }

    // ==================================================
    // ORDER HISTORY
    // ==================================================

    /// Lazy page cursor over a symbol's fills, oldest page first
    pub fn order_history_pages(&self, symbol: &str, start: Option<u64>) -> OrderHistoryPages<'_> {
        OrderHistoryPages {
            client: self,
            pair: trading_pair(symbol),
            start,
            next_page: Some(1),
        }
    }

    pub async fn order_histories(&self, symbol: &str, start: Option<u64>) -> Result<Vec<OrderHistory>> {
        let mut pages = self.order_history_pages(symbol, start);
        let mut orders = Vec::new();

        while let Some(page) = pages.next_page().await? {
            orders.extend(page);
        }

        Ok(orders)
    }

    /// Fetch every page and decode into typed fills
    pub async fn trade_records(&self, symbol: &str, start: Option<u64>) -> Result<Vec<TradeRecord>> {
        let orders = self.order_histories(symbol, start).await?;

        let records = orders
            .iter()
            .map(TradeRecord::try_from)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("decoding {} fills", symbol.to_uppercase()))?;

        Ok(records)
    }

    // ==================================================
    // DEPOSITS + WITHDRAWALS
    // ==================================================

    pub async fn deposit_histories(&self, symbol: &str) -> Result<Vec<DepositHistory>> {
        let mut page = 1;
        let mut deposits = Vec::new();

        loop {
            let response: DepositHistoryResponse =
                self.get(DEPOSIT_HISTORY_PATH, &transfer_query(page)).await?;

            deposits.extend(
                response
                    .result
                    .into_iter()
                    .filter(|d| d.currency.eq_ignore_ascii_case(symbol)),
            );

            match next_transfer_page(&response.pagination, page) {
                Some(next) => page = next,
                None => break,
            }
        }

        Ok(deposits)
    }

    pub async fn withdraw_histories(&self, symbol: &str) -> Result<Vec<WithdrawHistory>> {
        let mut page = 1;
        let mut withdrawals = Vec::new();

        loop {
            let response: WithdrawHistoryResponse =
                self.get(WITHDRAW_HISTORY_PATH, &transfer_query(page)).await?;

            withdrawals.extend(
                response
                    .result
                    .into_iter()
                    .filter(|w| w.currency.eq_ignore_ascii_case(symbol)),
            );

            match next_transfer_page(&response.pagination, page) {
                Some(next) => page = next,
                None => break,
            }
        }

        Ok(withdrawals)
    }
}

// ==================================================
// PAGINATION
// ==================================================

/// Finite, non-restartable sequence of order-history pages.
pub struct OrderHistoryPages<'a> {
    client: &'a BitkubClient,
    pair: String,
    start: Option<u64>,
    next_page: Option<u64>,
}

impl OrderHistoryPages<'_> {
    pub async fn next_page(&mut self) -> Result<Option<Vec<OrderHistory>>> {
        let Some(page) = self.next_page else {
            return Ok(None);
        };

        let query = order_history_query(&self.pair, page, self.start);
        let response: OrderHistoryResponse = self.client.get(ORDER_HISTORY_PATH, &query).await?;

        self.next_page = next_order_page(&response.pagination, page, response.result.len());
        Ok(Some(response.result))
    }
}

/// Order history ends when `next` is 0. An empty page or a cursor that does
/// not move forward also ends it.
pub fn next_order_page(pagination: &OrderPagination, current: u64, fetched: usize) -> Option<u64> {
    if fetched == 0 || pagination.next == 0 || pagination.next <= current {
        None
    } else {
        Some(pagination.next)
    }
}

pub fn next_transfer_page(pagination: &TransferPagination, current: u64) -> Option<u64> {
    if pagination.last <= current {
        None
    } else {
        Some(current + 1)
    }
}

// ==================================================
// HELPERS
// ==================================================

pub fn trading_pair(symbol: &str) -> String {
    format!("{}_{}", symbol.trim().to_lowercase(), QUOTE_CURRENCY)
}

fn order_history_query(pair: &str, page: u64, start: Option<u64>) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query
        .append_pair("sym", pair)
        .append_pair("p", &page.to_string())
        .append_pair("lmt", &PAGE_LIMIT.to_string());
    if let Some(start) = start {
        query.append_pair("start", &start.to_string());
    }
    format!("?{}", query.finish())
}

fn transfer_query(page: u64) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("p", &page.to_string())
        .append_pair("lmt", &PAGE_LIMIT.to_string())
        .finish();
    format!("?{}", query)
}

pub fn signature_payload(timestamp: u64, method: &str, path: &str, query: &str) -> String {
    format!("{}{}{}{}", timestamp, method, path, query)
}

fn now_ms() -> Result<u64> {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH)?;
    Ok(u64::try_from(elapsed.as_millis())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::errors::SummaryError;
    use serde_json::json;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> BitkubClient {
        BitkubClient::new(base_url, "test-key".into(), "test-secret".into()).unwrap()
    }

    fn order(side: &str, rate: &str, amount: &str) -> serde_json::Value {
        json!({
            "txn_id": format!("BTC{}", rate),
            "order_id": "1",
            "side": side,
            "type": "limit",
            "rate": rate,
            "fee": "0",
            "credit": "0",
            "amount": amount,
            "ts": 1707889717000u64
        })
    }

    // ========== signing ==========

    #[test]
    fn test_signature_is_hex_hmac_sha256() {
        let payload = signature_payload(
            1699381086593,
            "GET",
            ORDER_HISTORY_PATH,
            "?sym=btc_thb&p=1&lmt=100",
        );
        assert_eq!(
            payload,
            "1699381086593GET/api/v3/market/my-order-history?sym=btc_thb&p=1&lmt=100"
        );

        let signature = client("http://localhost").sign(&payload).unwrap();
        assert_eq!(
            signature,
            "39751f0f2d48d5d2a410160f957861b26a4856d0d0ef754b28b8642611635d2b"
        );
    }

    #[test]
    fn test_queries() {
        assert_eq!(trading_pair(" BTC "), "btc_thb");
        assert_eq!(
            order_history_query("btc_thb", 2, None),
            "?sym=btc_thb&p=2&lmt=100"
        );
        assert_eq!(
            order_history_query("eth_thb", 1, Some(1700000000)),
            "?sym=eth_thb&p=1&lmt=100&start=1700000000"
        );
        assert_eq!(transfer_query(3), "?p=3&lmt=100");
    }

    // ========== pagination ==========

    #[test]
    fn test_next_order_page() {
        let p = |next| OrderPagination {
            page: 1,
            last: 3,
            next,
            prev: 0,
        };
        assert_eq!(next_order_page(&p(2), 1, 100), Some(2));
        assert_eq!(next_order_page(&p(0), 1, 100), None);
        assert_eq!(next_order_page(&p(2), 1, 0), None);
        assert_eq!(next_order_page(&p(1), 1, 100), None);
    }

    #[test]
    fn test_next_transfer_page() {
        let p = |last| TransferPagination { page: 1, last };
        assert_eq!(next_transfer_page(&p(3), 1), Some(2));
        assert_eq!(next_transfer_page(&p(3), 3), None);
        assert_eq!(next_transfer_page(&p(0), 1), None);
    }

    // ========== HTTP ==========

    #[tokio::test]
    async fn test_order_histories_follow_next_cursor() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(ORDER_HISTORY_PATH))
            .and(query_param("sym", "btc_thb"))
            .and(query_param("p", "1"))
            .and(header("X-BTK-APIKEY", "test-key"))
            .and(header_exists("X-BTK-SIGN"))
            .and(header_exists("X-BTK-TIMESTAMP"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": 0,
                "result": [order("buy", "100", "1000"), order("buy", "110", "550")],
                "pagination": {"page": 1, "last": 2, "next": 2, "prev": 0}
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(ORDER_HISTORY_PATH))
            .and(query_param("p", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": 0,
                "result": [order("sell", "120", "2")],
                "pagination": {"page": 2, "last": 2, "next": 0, "prev": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let records = client(&server.uri())
            .trade_records("BTC", None)
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].side, Side::Buy);
        assert_eq!(records[2].side, Side::Sell);
        assert_eq!(records[2].amount.to_string(), "2");
    }

    #[tokio::test]
    async fn test_start_timestamp_is_forwarded() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(ORDER_HISTORY_PATH))
            .and(query_param("start", "1700000000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": 0,
                "result": [],
                "pagination": {"page": 1, "last": 1, "next": 0, "prev": 0}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let orders = client(&server.uri())
            .order_histories("eth", Some(1700000000))
            .await
            .unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn test_error_envelope_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(ORDER_HISTORY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": 5})))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .order_histories("btc", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Bitkub error 5"));
    }

    #[tokio::test]
    async fn test_http_failure_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(ORDER_HISTORY_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad signature"))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .order_histories("btc", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("bad signature"));
    }

    #[tokio::test]
    async fn test_undecodable_fill_is_typed_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(ORDER_HISTORY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": 0,
                "result": [order("buy", "abc", "100")],
                "pagination": {"page": 1, "last": 1, "next": 0, "prev": 0}
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .trade_records("btc", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SummaryError>(),
            Some(SummaryError::ParseFailure { field: "rate", .. })
        ));
    }

    #[tokio::test]
    async fn test_deposits_filtered_by_currency_across_pages() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(DEPOSIT_HISTORY_PATH))
            .and(query_param("p", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": 0,
                "result": [
                    {"txn_id": "a", "currency": "BTC", "amount": 0.5, "status": "complete", "time": 1},
                    {"txn_id": "b", "currency": "ETH", "amount": 2, "status": "complete", "time": 2}
                ],
                "pagination": {"page": 1, "last": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path(DEPOSIT_HISTORY_PATH))
            .and(query_param("p", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": 0,
                "result": [
                    {"txn_id": "c", "currency": "BTC", "amount": "0.25", "status": "complete", "time": 3}
                ],
                "pagination": {"page": 2, "last": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let deposits = client(&server.uri()).deposit_histories("btc").await.unwrap();

        let ids: Vec<&str> = deposits.iter().map(|d| d.txn_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_withdrawals_single_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(WITHDRAW_HISTORY_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "error": 0,
                "result": [
                    {"txn_id": "w1", "currency": "KUB", "amount": "10", "fee": 0.1, "time": 1}
                ],
                "pagination": {"page": 1, "last": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let withdrawals = client(&server.uri()).withdraw_histories("kub").await.unwrap();
        assert_eq!(withdrawals.len(), 1);
        assert_eq!(withdrawals[0].txn_id, "w1");
    }
}
