//! In-memory transaction service
//!
//! Behaves like the remote service (filtering, newest-first ordering,
//! pagination, validation, not-found) and lets callers script latency and
//! failures so that overlapping requests can be exercised deterministically.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{CoreError, CoreResult};
use crate::filters::FilterCriteria;
use crate::models::{NewTransaction, Pagination, Transaction, TransactionPage, TransactionPatch};
use crate::reports::{AnalyticsBreakdown, Summary};
use crate::service::TransactionService;
use crate::types::TransactionType;

const DEFAULT_LIMIT: u32 = 50;

#[derive(Debug, Default)]
struct MemoryState {
    /// Insertion order; newest last
    records: Vec<Transaction>,
    next_id: u64,
    latencies: VecDeque<Duration>,
    failures: VecDeque<Option<CoreError>>,
    requests: usize,
}

/// Transaction service backed by a vector
#[derive(Debug, Default)]
pub struct InMemoryTransactionService {
    state: Mutex<MemoryState>,
}

fn not_found(id: &str) -> CoreError {
    CoreError::NotFound {
        resource: format!("transaction {}", id),
        message: Some("Transaction not found".to_string()),
    }
}

impl InMemoryTransactionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing records; ids are kept as given
    pub fn with_transactions(transactions: Vec<Transaction>) -> Self {
        let next_id = transactions.len() as u64;
        Self {
            state: Mutex::new(MemoryState {
                records: transactions,
                next_id,
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delay the next not-yet-issued request by `latency`.
    ///
    /// Latencies are consumed in the order requests are issued.
    pub fn push_latency(&self, latency: Duration) {
        self.lock().latencies.push_back(latency);
    }

    /// Make the next issued request fail with `error`.
    ///
    /// Scripted outcomes queue up, so this can follow [`Self::succeed_next`].
    pub fn fail_next(&self, error: CoreError) {
        self.lock().failures.push_back(Some(error));
    }

    /// Let the next issued request through, ahead of any queued failure
    pub fn succeed_next(&self) {
        self.lock().failures.push_back(None);
    }

    /// Number of requests answered or in flight so far
    pub fn request_count(&self) -> usize {
        self.lock().requests
    }

    /// Everything stored, newest first
    pub fn records(&self) -> Vec<Transaction> {
        sorted_newest_first(&self.lock().records)
    }

    /// Take the scripted latency and failure for a request being issued
    async fn begin(&self) -> CoreResult<()> {
        let (latency, failure) = {
            let mut state = self.lock();
            state.requests += 1;
            (state.latencies.pop_front(), state.failures.pop_front().flatten())
        };
        if let Some(latency) = latency.filter(|l| !l.is_zero()) {
            tokio::time::sleep(latency).await;
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn sorted_newest_first(records: &[Transaction]) -> Vec<Transaction> {
    let mut sorted: Vec<Transaction> = records.iter().rev().cloned().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

#[async_trait]
impl TransactionService for InMemoryTransactionService {
    async fn list(&self, criteria: &FilterCriteria) -> CoreResult<TransactionPage> {
        self.begin().await?;
        criteria.validate()?;

        let state = self.lock();
        let matching: Vec<Transaction> = sorted_newest_first(&state.records)
            .into_iter()
            .filter(|tx| criteria.matches(tx))
            .collect();

        let limit = criteria.limit.unwrap_or(DEFAULT_LIMIT);
        let offset = criteria.offset.unwrap_or(0);
        let total = matching.len() as u64;
        let items: Vec<Transaction> = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        let has_more = (offset as u64 + items.len() as u64) < total;

        Ok(TransactionPage {
            items,
            pagination: Pagination { total, limit, offset, has_more },
        })
    }

    async fn get(&self, id: &str) -> CoreResult<Transaction> {
        self.begin().await?;
        let state = self.lock();
        state
            .records
            .iter()
            .find(|tx| tx.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn create(&self, data: &NewTransaction) -> CoreResult<Transaction> {
        self.begin().await?;
        data.validate()?;

        let mut state = self.lock();
        state.next_id += 1;
        let mut created = data.clone().into_transaction(format!("txn-{}", state.next_id));
        let now = Utc::now();
        created.created_at = Some(now);
        created.updated_at = Some(now);
        state.records.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, patch: &TransactionPatch) -> CoreResult<Transaction> {
        self.begin().await?;
        patch.validate()?;

        let mut state = self.lock();
        let slot = state
            .records
            .iter_mut()
            .find(|tx| tx.id == id)
            .ok_or_else(|| not_found(id))?;
        let mut updated = patch.apply_to(slot);
        updated.updated_at = Some(Utc::now());
        *slot = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.begin().await?;
        let mut state = self.lock();
        let position = state
            .records
            .iter()
            .position(|tx| tx.id == id)
            .ok_or_else(|| not_found(id))?;
        state.records.remove(position);
        Ok(())
    }

    async fn summary(&self) -> CoreResult<Summary> {
        self.begin().await?;
        let state = self.lock();
        let (income, expenses) = state.records.iter().fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(income, expenses), tx| match tx.kind {
                TransactionType::Income => (income + tx.amount, expenses),
                TransactionType::Expense => (income, expenses + tx.amount),
            },
        );
        Ok(Summary::new(income, expenses, state.records.len() as u64))
    }

    async fn analytics(&self) -> CoreResult<AnalyticsBreakdown> {
        self.begin().await?;
        Ok(AnalyticsBreakdown::from_transactions(&self.lock().records))
    }

    async fn categories(&self, kind: Option<TransactionType>) -> CoreResult<Vec<String>> {
        self.begin().await?;
        let state = self.lock();
        let names: BTreeSet<String> = state
            .records
            .iter()
            .filter(|tx| kind.map_or(true, |k| tx.kind == k))
            .map(|tx| tx.category.clone())
            .collect();
        Ok(names.into_iter().collect())
    }
}
