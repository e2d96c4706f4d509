//! Subgraph client for borrower discovery.

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::positions::{BorrowPosition, Borrower, PageOutcome, PositionSource};

/// Borrowers page query. Only positions with outstanding debt are requested.
pub const USERS_QUERY: &str = r#"
query UserPage($offset: Int, $limit: Int) {
  users(skip: $offset, first: $limit) {
    id
    borrowPositions(where: { borrowBalance_gt: 0.0 }) {
      id
      borrowable {
        id
        lendingPool {
          collateral {
            id
          }
        }
        underlying {
          id
          symbol
        }
      }
      borrowIndex
      borrowBalance
    }
  }
}
"#;

/// Errors raised while querying the subgraph.
///
/// All of these are query failures. Exhaustion is reported through
/// [`PageOutcome::Exhausted`] instead.
#[derive(Debug, Error)]
pub enum SubgraphError {
    #[error("subgraph request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("subgraph returned HTTP {status}")]
    Status { status: u16 },

    #[error("subgraph query error: {0}")]
    Graphql(String),

    #[error("malformed subgraph response: {0}")]
    Malformed(String),
}

/// GraphQL client for the lending protocol subgraph.
#[derive(Debug, Clone)]
pub struct SubgraphClient {
    client: reqwest::Client,
    endpoint: String,
    page_size: u64,
}

impl SubgraphClient {
    /// Borrowers per page when not configured otherwise.
    pub const DEFAULT_PAGE_SIZE: u64 = 25;

    /// Create a new client for the given subgraph endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the number of borrowers requested per page.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn offset_for(&self, page: u64) -> u64 {
        page.saturating_mul(self.page_size)
    }

    fn request_body(&self, offset: u64) -> serde_json::Value {
        serde_json::json!({
            "query": USERS_QUERY,
            "variables": {
                "offset": offset,
                "limit": self.page_size,
            },
        })
    }
}

#[async_trait]
impl PositionSource for SubgraphClient {
    fn page_size(&self) -> u64 {
        self.page_size
    }

    #[instrument(skip(self))]
    async fn fetch_page(&self, page: u64) -> Result<PageOutcome, SubgraphError> {
        let offset = self.offset_for(page);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.request_body(offset))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubgraphError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let outcome = parse_users_response(&body)?;

        debug!(
            page = page,
            offset = offset,
            positions = outcome.position_count(),
            exhausted = matches!(outcome, PageOutcome::Exhausted),
            "Fetched subgraph page"
        );

        Ok(outcome)
    }
}

/// Parse a raw `users` query response into a page outcome.
///
/// An empty `users` list means exhaustion, decided before borrowers without
/// positions are filtered out.
pub fn parse_users_response(body: &[u8]) -> Result<PageOutcome, SubgraphError> {
    let response: GraphqlResponse = serde_json::from_slice(body)
        .map_err(|e| SubgraphError::Malformed(e.to_string()))?;

    if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
        let message = errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(SubgraphError::Graphql(message));
    }

    let data = response
        .data
        .ok_or_else(|| SubgraphError::Malformed("response has no data".to_string()))?;

    if data.users.is_empty() {
        return Ok(PageOutcome::Exhausted);
    }

    let borrowers = data
        .users
        .into_iter()
        .map(UserRecord::into_borrower)
        .filter(Borrower::has_positions)
        .collect();

    Ok(PageOutcome::Page(borrowers))
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<UsersData>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct UsersData {
    users: Vec<UserRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    #[serde(deserialize_with = "deserialize_address")]
    id: Address,
    #[serde(default)]
    borrow_positions: Vec<BorrowPositionRecord>,
}

impl UserRecord {
    fn into_borrower(self) -> Borrower {
        let borrower = self.id;
        Borrower {
            address: borrower,
            positions: self
                .borrow_positions
                .into_iter()
                .map(|record| record.into_position(borrower))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BorrowPositionRecord {
    id: String,
    borrowable: BorrowableRecord,
    #[serde(deserialize_with = "deserialize_f64_from_string")]
    borrow_index: f64,
    #[serde(deserialize_with = "deserialize_f64_from_string")]
    borrow_balance: f64,
}

impl BorrowPositionRecord {
    fn into_position(self, borrower: Address) -> BorrowPosition {
        BorrowPosition {
            id: self.id,
            borrower,
            borrowable: self.borrowable.id,
            collateral: self.borrowable.lending_pool.collateral.id,
            underlying: self.borrowable.underlying.id,
            underlying_symbol: self.borrowable.underlying.symbol,
            borrow_index: self.borrow_index,
            borrow_balance: self.borrow_balance,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BorrowableRecord {
    #[serde(deserialize_with = "deserialize_address")]
    id: Address,
    lending_pool: LendingPoolRecord,
    underlying: TokenRecord,
}

#[derive(Debug, Deserialize)]
struct LendingPoolRecord {
    collateral: EntityRef,
}

#[derive(Debug, Deserialize)]
struct EntityRef {
    #[serde(deserialize_with = "deserialize_address")]
    id: Address,
}

#[derive(Debug, Deserialize)]
struct TokenRecord {
    #[serde(deserialize_with = "deserialize_address")]
    id: Address,
    #[serde(default)]
    symbol: Option<String>,
}

// Custom deserializers

fn deserialize_address<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

fn deserialize_f64_from_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(f64),
    }

    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s.parse().map_err(serde::de::Error::custom),
        StringOrNumber::Number(n) => Ok(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "0x68a04b06cebf9c925a3c1128c23b56a8d074489a";
    const BOB: &str = "0x10604cc77bc4fe3ef8e3220a8656c6903e7b6d1b";

    fn position_json(borrowable: &str, user: &str) -> String {
        format!(
            r#"{{
                "id": "{borrowable}-{user}",
                "borrowable": {{
                    "id": "{borrowable}",
                    "lendingPool": {{
                        "collateral": {{ "id": "0x9fdbda0a5e284c32744d2f17ee5c74b284993463" }}
                    }},
                    "underlying": {{
                        "id": "0x5555555555555555555555555555555555555555",
                        "symbol": "WETH"
                    }}
                }},
                "borrowIndex": "1.002311",
                "borrowBalance": "12.5"
            }}"#
        )
    }

    #[test]
    fn test_parse_page_with_positions() {
        let borrowable = "0x5e8a25147e840c4f410ee33feec4ef96db1a9063";
        let body = format!(
            r#"{{"data": {{"users": [
                {{ "id": "{ALICE}", "borrowPositions": [{}] }},
                {{ "id": "{BOB}", "borrowPositions": [] }}
            ]}}}}"#,
            position_json(borrowable, ALICE)
        );

        let outcome = parse_users_response(body.as_bytes()).unwrap();
        let PageOutcome::Page(borrowers) = outcome else {
            panic!("expected a page");
        };

        // Bob has no active positions and is filtered out
        assert_eq!(borrowers.len(), 1);
        let alice = &borrowers[0];
        assert_eq!(alice.address, ALICE.parse::<Address>().unwrap());
        assert_eq!(alice.positions.len(), 1);

        let position = &alice.positions[0];
        assert_eq!(position.borrower, alice.address);
        assert_eq!(position.borrowable, borrowable.parse::<Address>().unwrap());
        assert_eq!(
            position.collateral,
            "0x9fdbda0a5e284c32744d2f17ee5c74b284993463".parse::<Address>().unwrap()
        );
        assert_eq!(position.underlying_symbol.as_deref(), Some("WETH"));
        assert!((position.borrow_balance - 12.5).abs() < f64::EPSILON);
        assert!((position.borrow_index - 1.002311).abs() < 1e-9);
    }

    #[test]
    fn test_empty_users_is_exhausted() {
        let outcome = parse_users_response(br#"{"data": {"users": []}}"#).unwrap();
        assert!(matches!(outcome, PageOutcome::Exhausted));
    }

    #[test]
    fn test_page_without_debt_is_not_exhausted() {
        let body = format!(
            r#"{{"data": {{"users": [
                {{ "id": "{ALICE}", "borrowPositions": [] }},
                {{ "id": "{BOB}" }}
            ]}}}}"#
        );

        let outcome = parse_users_response(body.as_bytes()).unwrap();
        match outcome {
            PageOutcome::Page(borrowers) => assert!(borrowers.is_empty()),
            PageOutcome::Exhausted => panic!("filtered page must not signal exhaustion"),
        }
    }

    #[test]
    fn test_graphql_errors_are_query_failures() {
        let body = br#"{"data": null, "errors": [{"message": "indexer unavailable"}]}"#;
        let err = parse_users_response(body).unwrap_err();
        assert!(matches!(err, SubgraphError::Graphql(ref m) if m == "indexer unavailable"));
    }

    #[test]
    fn test_malformed_responses() {
        assert!(matches!(
            parse_users_response(b"<html>bad gateway</html>"),
            Err(SubgraphError::Malformed(_))
        ));
        assert!(matches!(
            parse_users_response(br#"{"data": null}"#),
            Err(SubgraphError::Malformed(_))
        ));

        let bad_address = br#"{"data": {"users": [{"id": "not-an-address", "borrowPositions": []}]}}"#;
        assert!(matches!(
            parse_users_response(bad_address),
            Err(SubgraphError::Malformed(_))
        ));
    }

    #[test]
    fn test_request_paging() {
        let client = SubgraphClient::new("http://localhost:8000/subgraphs/name/eleos").with_page_size(25);
        assert_eq!(client.page_size(), 25);
        assert_eq!(client.offset_for(0), 0);
        assert_eq!(client.offset_for(3), 75);

        let body = client.request_body(client.offset_for(2));
        assert_eq!(body["variables"]["offset"], 50);
        assert_eq!(body["variables"]["limit"], 25);
        assert!(body["query"].as_str().unwrap().contains("borrowBalance_gt"));
    }

    #[test]
    fn test_zero_page_size_is_clamped() {
        let client = SubgraphClient::new("http://localhost").with_page_size(0);
        assert_eq!(client.page_size(), 1);
    }

    #[tokio::test]
    #[ignore] // Requires network
    async fn test_fetch_first_page() {
        let url = std::env::var("SUBGRAPH_URL").unwrap();
        let client = SubgraphClient::new(url);
        let outcome = client.fetch_page(0).await;
        assert!(outcome.is_ok());
    }
}
