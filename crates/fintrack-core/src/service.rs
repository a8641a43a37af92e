//! Remote transaction service contract

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::CoreResult;
use crate::filters::FilterCriteria;
use crate::models::{NewTransaction, Transaction, TransactionPage, TransactionPatch};
use crate::reports::{AnalyticsBreakdown, Summary};
use crate::types::TransactionType;

/// Service reference type
pub type ServiceRef = Arc<dyn TransactionService>;

/// Durable store of transactions.
///
/// Implementations classify every failure into a [`crate::CoreError`]
/// variant and pass through the message the service supplied.
#[async_trait]
pub trait TransactionService: Send + Sync {
    /// List transactions matching the criteria, newest first
    async fn list(&self, criteria: &FilterCriteria) -> CoreResult<TransactionPage>;

    /// Fetch one transaction
    async fn get(&self, id: &str) -> CoreResult<Transaction>;

    /// Create a transaction; the service assigns the id
    async fn create(&self, data: &NewTransaction) -> CoreResult<Transaction>;

    /// Apply a partial update
    async fn update(&self, id: &str, patch: &TransactionPatch) -> CoreResult<Transaction>;

    /// Delete a transaction
    async fn delete(&self, id: &str) -> CoreResult<()>;

    /// Totals over the full dataset
    async fn summary(&self) -> CoreResult<Summary>;

    /// Breakdowns over the full dataset
    async fn analytics(&self) -> CoreResult<AnalyticsBreakdown>;

    /// Distinct category names, optionally for one type
    async fn categories(&self, kind: Option<TransactionType>) -> CoreResult<Vec<String>>;
}
