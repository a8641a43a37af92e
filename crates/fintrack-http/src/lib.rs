//! HTTP implementation of the transaction service
//!
//! Talks to the REST API that stores transactions. Every response is wrapped
//! in a `{ success, data, pagination?, error? }` envelope; failures are
//! classified into the core error taxonomy with the service's own message
//! passed through.

use async_trait::async_trait;
use fintrack_config::ApiConfig;
use fintrack_core::{
    AnalyticsBreakdown, CoreError, CoreResult, FilterCriteria, NewTransaction, Pagination, Summary, Transaction,
    TransactionPage, TransactionPatch, TransactionService, TransactionType,
};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// Response envelope used by every endpoint
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    pagination: Option<Pagination>,
}

/// Pull the human-readable message out of an error body.
///
/// Accepts `{ error: { message } }`, `{ error: "..." }` and `{ message }`.
pub fn error_message(body: &serde_json::Value) -> Option<String> {
    let from_error = match body.get("error") {
        Some(serde_json::Value::String(message)) => Some(message.clone()),
        Some(error) => error.get("message").and_then(|m| m.as_str()).map(str::to_string),
        None => None,
    };
    from_error
        .or_else(|| body.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .filter(|m| !m.trim().is_empty())
}

/// Map a failed response onto the error taxonomy
pub fn classify_failure(status: Option<u16>, resource: &str, message: Option<String>) -> CoreError {
    match status {
        Some(400) | Some(422) => CoreError::Validation {
            message: message.unwrap_or_default(),
        },
        Some(404) => CoreError::NotFound {
            resource: resource.to_string(),
            message,
        },
        _ => CoreError::Server { status, message },
    }
}

fn transport(error: impl std::fmt::Display) -> CoreError {
    CoreError::Transport {
        message: error.to_string(),
    }
}

/// Transaction service reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpTransactionService {
    client: Client,
    base_url: String,
}

impl HttpTransactionService {
    pub fn new(base_url: &str, timeout: Duration) -> CoreResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Config {
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ApiConfig) -> CoreResult<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join an endpoint path onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> (RequestBuilder, String) {
        let url = self.url(path);
        log::debug!("Making {} request to {}", method, url);
        (self.client.request(method, &url), url)
    }

    /// Send a request and unwrap its envelope
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, resource: &str) -> CoreResult<Envelope<T>> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|value| error_message(&value));
            log::debug!("{} answered {}: {:?}", resource, status, message);
            return Err(classify_failure(Some(status.as_u16()), resource, message));
        }

        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| transport(format!("invalid response from {}: {}", resource, e)))?;
        if value.get("success").and_then(|s| s.as_bool()) == Some(false) {
            return Err(classify_failure(Some(status.as_u16()), resource, error_message(&value)));
        }

        serde_json::from_value(value)
            .map_err(|e| transport(format!("invalid response from {}: {}", resource, e)))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder, resource: &str) -> CoreResult<T> {
        self.send::<T>(request, resource)
            .await?
            .data
            .ok_or_else(|| transport(format!("response from {} carried no data", resource)))
    }
}

#[async_trait]
impl TransactionService for HttpTransactionService {
    async fn list(&self, criteria: &FilterCriteria) -> CoreResult<TransactionPage> {
        let (request, url) = self.request(Method::GET, "transactions");
        let request = request.query(&criteria.query_pairs());
        let envelope = self.send::<Vec<Transaction>>(request, &url).await?;

        let items = envelope.data.unwrap_or_default();
        let pagination = envelope.pagination.unwrap_or_else(|| Pagination {
            total: items.len() as u64,
            limit: criteria.limit.unwrap_or(items.len() as u32),
            offset: criteria.offset.unwrap_or(0),
            has_more: false,
        });
        Ok(TransactionPage { items, pagination })
    }

    async fn get(&self, id: &str) -> CoreResult<Transaction> {
        let (request, url) = self.request(Method::GET, &format!("transactions/{}", id));
        self.fetch(request, &url).await
    }

    async fn create(&self, data: &NewTransaction) -> CoreResult<Transaction> {
        let (request, url) = self.request(Method::POST, "transactions");
        self.fetch(request.json(data), &url).await
    }

    async fn update(&self, id: &str, patch: &TransactionPatch) -> CoreResult<Transaction> {
        let (request, url) = self.request(Method::PUT, &format!("transactions/{}", id));
        self.fetch(request.json(patch), &url).await
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        let (request, url) = self.request(Method::DELETE, &format!("transactions/{}", id));
        self.send::<serde_json::Value>(request, &url).await?;
        Ok(())
    }

    async fn summary(&self) -> CoreResult<Summary> {
        let (request, url) = self.request(Method::GET, "analytics/summary");
        self.fetch(request, &url).await
    }

    async fn analytics(&self) -> CoreResult<AnalyticsBreakdown> {
        let (request, url) = self.request(Method::GET, "analytics/analytics");
        self.fetch(request, &url).await
    }

    async fn categories(&self, kind: Option<TransactionType>) -> CoreResult<Vec<String>> {
        let (mut request, url) = self.request(Method::GET, "analytics/categories");
        if let Some(kind) = kind {
            request = request.query(&[("type", kind.to_string())]);
        }
        self.fetch(request, &url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_joining() {
        let service = HttpTransactionService::new("http://localhost:5000/api/", Duration::from_secs(5)).unwrap();
        assert_eq!(service.base_url(), "http://localhost:5000/api");
        assert_eq!(service.url("transactions"), "http://localhost:5000/api/transactions");
        assert_eq!(service.url("/analytics/summary"), "http://localhost:5000/api/analytics/summary");
    }

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(
            error_message(&json!({ "success": false, "error": { "message": "Amount must be positive" } })),
            Some("Amount must be positive".to_string())
        );
        assert_eq!(error_message(&json!({ "error": "Not found" })), Some("Not found".to_string()));
        assert_eq!(error_message(&json!({ "message": "Server down" })), Some("Server down".to_string()));
        assert_eq!(error_message(&json!({ "error": { "message": "  " } })), None);
        assert_eq!(error_message(&json!({})), None);
    }

    #[test]
    fn test_classify_failure() {
        let err = classify_failure(Some(400), "transactions", Some("bad amount".to_string()));
        assert_eq!(err, CoreError::Validation { message: "bad amount".to_string() });

        let err = classify_failure(Some(422), "transactions", None);
        assert_eq!(err.user_message("Failed to create transaction"), "Failed to create transaction");

        let err = classify_failure(Some(404), "transactions/abc", None);
        assert!(matches!(err, CoreError::NotFound { .. }));

        let err = classify_failure(Some(503), "analytics/summary", Some("maintenance".to_string()));
        assert_eq!(err, CoreError::Server { status: Some(503), message: Some("maintenance".to_string()) });
    }

    #[test]
    fn test_envelope_decoding() {
        let envelope: Envelope<Vec<Transaction>> = serde_json::from_value(json!({
            "success": true,
            "data": [{
                "_id": "65a1", "type": "income", "amount": 2500,
                "description": "Pay", "category": "Salary", "date": "2024-03-01T00:00:00.000Z"
            }],
            "pagination": { "total": 1, "limit": 50, "offset": 0, "hasMore": false }
        }))
        .unwrap();
        assert_eq!(envelope.data.unwrap()[0].id, "65a1");
        assert_eq!(envelope.pagination.unwrap().total, 1);

        let envelope: Envelope<serde_json::Value> =
            serde_json::from_value(json!({ "success": true, "message": "Transaction deleted" })).unwrap();
        assert!(envelope.data.is_none());
    }
}
