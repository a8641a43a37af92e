//! Transaction cache: the held list, its pagination and categories

use std::collections::HashSet;

use crate::error::CoreError;
use crate::filters::FilterCriteria;
use crate::models::{Pagination, Transaction, TransactionPage};
use crate::status::{OperationStatus, RequestSequence, RequestToken, StatusBoard};
use crate::types::OperationKind;

/// Result of settling a sequenced request
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement<T> {
    /// The response belonged to the latest request and was applied
    Applied(T),
    /// The request failed and was the latest of its kind
    Failed(CoreError),
    /// A newer request was issued; the response was discarded
    Stale,
}

/// Read-only copy of the cache contents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    pub items: Vec<Transaction>,
    pub pagination: Pagination,
    pub categories: Vec<String>,
}

#[derive(Debug, Default)]
pub struct TransactionCache {
    items: Vec<Transaction>,
    pagination: Pagination,
    categories: Vec<String>,
    /// Every id ever returned by the service
    observed: HashSet<String>,
    list_sequence: RequestSequence,
    categories_sequence: RequestSequence,
    status: StatusBoard,
}

/// Drop records that violate the entity invariants or repeat an id
fn sanitize(items: Vec<Transaction>) -> Vec<Transaction> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|tx| {
            if !tx.is_well_formed() {
                log::warn!("Dropping malformed transaction '{}' (amount {})", tx.id, tx.amount);
                return false;
            }
            if !seen.insert(tx.id.clone()) {
                log::warn!("Dropping duplicate transaction '{}'", tx.id);
                return false;
            }
            true
        })
        .collect()
}

impl TransactionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[Transaction] {
        &self.items
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn has_observed(&self, id: &str) -> bool {
        self.observed.contains(id)
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            items: self.items.clone(),
            pagination: self.pagination.clone(),
            categories: self.categories.clone(),
        }
    }

    // ==================== Status ====================

    pub fn status(&self, kind: OperationKind) -> OperationStatus {
        self.status.status(kind)
    }

    pub fn clear_error(&mut self, kind: OperationKind) {
        self.status.clear_error(kind);
    }

    /// Mark an unsequenced request as started
    pub fn start(&mut self, kind: OperationKind) {
        self.status.start(kind);
    }

    /// Mark an unsequenced request as settled
    pub fn settle(&mut self, kind: OperationKind, error: Option<CoreError>) {
        self.status.settle(kind, error);
    }

    // ==================== List ====================

    pub fn start_list(&mut self) -> RequestToken {
        self.status.start(OperationKind::List);
        self.list_sequence.issue()
    }

    /// Apply a list response if it answers the latest list request.
    ///
    /// A fresh page replaces the held items and pagination wholesale.
    pub fn settle_list(
        &mut self,
        token: RequestToken,
        result: Result<TransactionPage, CoreError>,
    ) -> Settlement<TransactionPage> {
        if !self.list_sequence.is_latest(token) {
            self.status.settle(OperationKind::List, None);
            return Settlement::Stale;
        }
        match result {
            Ok(page) => {
                self.status.settle(OperationKind::List, None);
                let items = sanitize(page.items);
                let pagination = page.pagination.reconcile(items.len());
                self.observed.extend(items.iter().map(|tx| tx.id.clone()));
                self.items = items;
                self.pagination = pagination;
                Settlement::Applied(TransactionPage {
                    items: self.items.clone(),
                    pagination: self.pagination.clone(),
                })
            }
            Err(error) => {
                self.status.settle(OperationKind::List, Some(error.clone()));
                Settlement::Failed(error)
            }
        }
    }

    // ==================== Categories ====================

    pub fn start_categories(&mut self) -> RequestToken {
        self.status.start(OperationKind::Categories);
        self.categories_sequence.issue()
    }

    pub fn settle_categories(
        &mut self,
        token: RequestToken,
        result: Result<Vec<String>, CoreError>,
    ) -> Settlement<Vec<String>> {
        if !self.categories_sequence.is_latest(token) {
            self.status.settle(OperationKind::Categories, None);
            return Settlement::Stale;
        }
        match result {
            Ok(categories) => {
                self.status.settle(OperationKind::Categories, None);
                self.categories = categories;
                Settlement::Applied(self.categories.clone())
            }
            Err(error) => {
                self.status.settle(OperationKind::Categories, Some(error.clone()));
                Settlement::Failed(error)
            }
        }
    }

    // ==================== Mutations ====================

    /// Record a transaction the service returned outside of a list
    pub fn observe(&mut self, transaction: &Transaction) {
        self.observed.insert(transaction.id.clone());
    }

    /// Refresh a held copy in place; records not held are left out
    pub fn refresh_held(&mut self, transaction: &Transaction) {
        self.observe(transaction);
        if let Some(slot) = self.items.iter_mut().find(|tx| tx.id == transaction.id) {
            *slot = transaction.clone();
        }
    }

    /// Insert a created record at the front when it belongs to the list.
    ///
    /// With `filter` set, only records matching it are inserted.
    pub fn insert_created(&mut self, transaction: Transaction, filter: Option<&FilterCriteria>) -> bool {
        self.observe(&transaction);
        if !transaction.is_well_formed() || !filter.map_or(true, |f| f.matches(&transaction)) {
            return false;
        }
        if let Some(position) = self.items.iter().position(|tx| tx.id == transaction.id) {
            self.items.remove(position);
        } else {
            self.pagination.total += 1;
        }
        self.items.insert(0, transaction);
        true
    }

    /// Replace a held record in place.
    ///
    /// Records not held are a no-op. With `filter` set, a record that no
    /// longer matches is removed instead.
    pub fn replace_updated(&mut self, transaction: Transaction, filter: Option<&FilterCriteria>) {
        self.observe(&transaction);
        let Some(position) = self.items.iter().position(|tx| tx.id == transaction.id) else {
            return;
        };
        if filter.map_or(true, |f| f.matches(&transaction)) && transaction.is_well_formed() {
            self.items[position] = transaction;
        } else {
            self.items.remove(position);
            self.pagination.total = self.pagination.total.saturating_sub(1);
        }
    }

    /// Remove a deleted record if held
    pub fn remove_deleted(&mut self, id: &str) -> bool {
        match self.items.iter().position(|tx| tx.id == id) {
            Some(position) => {
                self.items.remove(position);
                self.pagination.total = self.pagination.total.saturating_sub(1);
                true
            }
            None => false,
        }
    }
}
