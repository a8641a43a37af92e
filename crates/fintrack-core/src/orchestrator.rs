//! Orchestration layer
//!
//! `Tracker` issues requests to the remote service, applies the results to
//! the transaction cache and the aggregate store, and raises notifications.
//! Each store sits behind its own mutex and no guard is ever held across an
//! `.await`, so a store is only ever touched through its own operations.

use chrono::{Local, NaiveDate};
use fintrack_config::{Config, ExportConfig, MutationPolicy, Theme};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::aggregate::{AggregateSnapshot, AggregateStore};
use crate::cache::{CacheSnapshot, Settlement, TransactionCache};
use crate::error::{CoreError, CoreResult, DefaultErrorLogger, ErrorContext, ErrorLogger};
use crate::export::{self, ExportFormat};
use crate::filters::{FilterCriteria, FilterPatch, FilterState, QuickRange};
use crate::models::{NewTransaction, Pagination, Transaction, TransactionPage, TransactionPatch};
use crate::notifications::{Notification, NotificationCenter, NotifyOptions, DEFAULT_EXPIRY};
use crate::reports::{AnalyticsBreakdown, Summary, TransactionStats};
use crate::service::ServiceRef;
use crate::status::{OperationStatus, RequestToken};
use crate::types::{NotificationKind, OperationKind, TransactionType};
use crate::ui::{FormSurface, TransactionDraft, UiState};

/// Result of a sequenced refresh
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The response was the latest of its kind and was applied
    Applied(T),
    /// A newer request of the same kind was issued; nothing was applied
    Superseded,
}

impl<T> Outcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Outcome::Superseded)
    }
}

/// Behaviour switches for [`Tracker`]
#[derive(Debug, Clone)]
pub struct TrackerOptions {
    pub mutation_policy: MutationPolicy,
    /// Refresh summary and analytics after every successful mutation
    pub refresh_aggregates: bool,
    pub page_size: u32,
    pub notification_expiry: Duration,
    pub export: ExportConfig,
    pub theme: Theme,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            mutation_policy: MutationPolicy::default(),
            refresh_aggregates: true,
            page_size: 50,
            notification_expiry: DEFAULT_EXPIRY,
            export: ExportConfig::default(),
            theme: Theme::default(),
        }
    }
}

impl TrackerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            mutation_policy: config.cache.mutation_policy,
            refresh_aggregates: config.cache.refresh_aggregates,
            page_size: config.pagination.records_per_page,
            notification_expiry: config.notification_expiry(),
            export: config.export.clone(),
            theme: config.ui.theme,
        }
    }
}

/// A mutation the service confirmed
enum Confirmed {
    Created(Transaction),
    Updated(Transaction),
    Deleted(String),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Client-side state synchronisation over a [`crate::TransactionService`]
pub struct Tracker {
    service: ServiceRef,
    options: TrackerOptions,
    cache: Mutex<TransactionCache>,
    aggregates: Mutex<AggregateStore>,
    filters: Mutex<FilterState>,
    ui: Mutex<UiState>,
    notifications: NotificationCenter,
    error_logger: Arc<dyn ErrorLogger>,
}

impl Tracker {
    pub fn new(service: ServiceRef, options: TrackerOptions) -> Self {
        Self {
            service,
            cache: Mutex::new(TransactionCache::new()),
            aggregates: Mutex::new(AggregateStore::new()),
            filters: Mutex::new(FilterState::new(options.page_size)),
            ui: Mutex::new(UiState::new(options.theme)),
            notifications: NotificationCenter::new(options.notification_expiry),
            error_logger: Arc::new(DefaultErrorLogger),
            options,
        }
    }

    pub fn from_config(service: ServiceRef, config: &Config) -> Self {
        Self::new(service, TrackerOptions::from_config(config))
    }

    pub fn options(&self) -> &TrackerOptions {
        &self.options
    }

    // ==================== Failure handling ====================

    /// Log a failure and queue the matching error notification
    fn report_failure(&self, kind: OperationKind, error: &CoreError, token: Option<RequestToken>) {
        let mut context = ErrorContext::new(kind.to_string());
        if let Some(token) = token {
            context = context.with_request_token(token.value());
        }
        self.error_logger.log_error(error, &context);

        // Category lookups only mark their status
        if kind != OperationKind::Categories {
            self.notifications.error(error.user_message(kind.failure_message()));
        }
    }

    /// Fail an operation before anything is sent
    fn reject(&self, kind: OperationKind, error: CoreError) -> CoreError {
        {
            let mut cache = lock(&self.cache);
            cache.start(kind);
            cache.settle(kind, Some(error.clone()));
        }
        self.report_failure(kind, &error, None);
        error
    }

    fn discard_stale(&self, kind: OperationKind, token: RequestToken) {
        self.error_logger.log_warning(
            "Discarding response to a superseded request",
            &ErrorContext::new(kind.to_string()).with_request_token(token.value()),
        );
    }

    fn settled<T>(&self, kind: OperationKind, token: RequestToken, settlement: Settlement<T>) -> CoreResult<Outcome<T>> {
        match settlement {
            Settlement::Applied(value) => Ok(Outcome::Applied(value)),
            Settlement::Failed(error) => {
                self.report_failure(kind, &error, Some(token));
                Err(error)
            }
            Settlement::Stale => {
                self.discard_stale(kind, token);
                Ok(Outcome::Superseded)
            }
        }
    }

    // ==================== Transaction cache ====================

    async fn fetch_list(&self, criteria: FilterCriteria) -> CoreResult<Outcome<TransactionPage>> {
        let token = lock(&self.cache).start_list();
        log::debug!("List request {} with {:?}", token, criteria);
        let result = self.service.list(&criteria).await;
        let settlement = lock(&self.cache).settle_list(token, result);
        self.settled(OperationKind::List, token, settlement)
    }

    /// Replace the held criteria and list with them.
    ///
    /// Only the most recently issued list may update the cache; an earlier
    /// one that completes later resolves to [`Outcome::Superseded`].
    pub async fn list(&self, criteria: FilterCriteria) -> CoreResult<Outcome<TransactionPage>> {
        let replaced = lock(&self.filters).replace(criteria);
        match replaced {
            Ok(criteria) => self.fetch_list(criteria).await,
            Err(error) => Err(self.reject(OperationKind::List, error)),
        }
    }

    /// List again with the held criteria
    pub async fn refresh(&self) -> CoreResult<Outcome<TransactionPage>> {
        let criteria = lock(&self.filters).criteria();
        self.fetch_list(criteria).await
    }

    /// Fetch one transaction; a held copy is refreshed in place
    pub async fn get(&self, id: &str) -> CoreResult<Transaction> {
        lock(&self.cache).start(OperationKind::Get);
        let result = self.service.get(id).await;
        let mut cache = lock(&self.cache);
        match result {
            Ok(transaction) => {
                cache.settle(OperationKind::Get, None);
                cache.refresh_held(&transaction);
                Ok(transaction)
            }
            Err(error) => {
                cache.settle(OperationKind::Get, Some(error.clone()));
                drop(cache);
                self.report_failure(OperationKind::Get, &error, None);
                Err(error)
            }
        }
    }

    pub async fn create(&self, data: NewTransaction) -> CoreResult<Transaction> {
        if let Err(error) = data.validate() {
            return Err(self.reject(OperationKind::Create, error));
        }
        lock(&self.cache).start(OperationKind::Create);
        let created = self.finish_mutation(OperationKind::Create, self.service.create(&data).await)?;
        self.confirm(OperationKind::Create, Confirmed::Created(created.clone())).await;
        Ok(created)
    }

    /// Apply a partial update to a transaction the cache has seen
    pub async fn update(&self, id: &str, patch: TransactionPatch) -> CoreResult<Transaction> {
        if !lock(&self.cache).has_observed(id) {
            let error = CoreError::NotFound {
                resource: format!("transaction {}", id),
                message: None,
            };
            return Err(self.reject(OperationKind::Update, error));
        }
        if let Err(error) = patch.validate() {
            return Err(self.reject(OperationKind::Update, error));
        }
        lock(&self.cache).start(OperationKind::Update);
        let updated = self.finish_mutation(OperationKind::Update, self.service.update(id, &patch).await)?;
        self.confirm(OperationKind::Update, Confirmed::Updated(updated.clone())).await;
        Ok(updated)
    }

    pub async fn delete(&self, id: &str) -> CoreResult<()> {
        lock(&self.cache).start(OperationKind::Delete);
        self.finish_mutation(OperationKind::Delete, self.service.delete(id).await)?;
        self.confirm(OperationKind::Delete, Confirmed::Deleted(id.to_string())).await;
        Ok(())
    }

    /// Settle a mutation's status; a failure leaves the cache untouched
    fn finish_mutation<T>(&self, kind: OperationKind, result: CoreResult<T>) -> CoreResult<T> {
        match result {
            Ok(value) => {
                lock(&self.cache).settle(kind, None);
                Ok(value)
            }
            Err(error) => {
                lock(&self.cache).settle(kind, Some(error.clone()));
                self.report_failure(kind, &error, None);
                Err(error)
            }
        }
    }

    /// Apply a confirmed mutation, announce it and bring the aggregates along
    async fn confirm(&self, kind: OperationKind, confirmed: Confirmed) {
        let filter = lock(&self.filters).criteria();
        // The local effect always lands; a re-list only refines it
        {
            let mut cache = lock(&self.cache);
            match confirmed {
                Confirmed::Created(tx) => {
                    cache.insert_created(tx, Some(&filter));
                }
                Confirmed::Updated(tx) => {
                    let scope = match self.options.mutation_policy {
                        MutationPolicy::FilterLocally => Some(&filter),
                        MutationPolicy::Refetch => None,
                    };
                    cache.replace_updated(tx, scope);
                }
                Confirmed::Deleted(id) => {
                    cache.remove_deleted(&id);
                }
            }
        }

        if let Some(message) = kind.success_message() {
            self.notifications.success(message);
        }

        lock(&self.aggregates).invalidate();
        if self.options.mutation_policy == MutationPolicy::Refetch {
            if let Err(error) = self.refresh().await {
                log::warn!("Re-list after {} failed, keeping the local result: {}", kind, error);
            }
        }
        if self.options.refresh_aggregates {
            let (summary, analytics) = tokio::join!(self.refresh_summary(), self.refresh_analytics());
            if summary.is_err() || analytics.is_err() {
                log::debug!("Aggregate refresh after {} did not complete", kind);
            }
        }
    }

    /// Replace the held category names.
    ///
    /// Failures mark the categories status without a notification.
    pub async fn load_categories(&self, kind: Option<TransactionType>) -> CoreResult<Outcome<Vec<String>>> {
        let token = lock(&self.cache).start_categories();
        let result = self.service.categories(kind).await;
        let settlement = lock(&self.cache).settle_categories(token, result);
        self.settled(OperationKind::Categories, token, settlement)
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        lock(&self.cache).items().to_vec()
    }

    pub fn pagination(&self) -> Pagination {
        lock(&self.cache).pagination().clone()
    }

    pub fn categories(&self) -> Vec<String> {
        lock(&self.cache).categories().to_vec()
    }

    pub fn cache_snapshot(&self) -> CacheSnapshot {
        lock(&self.cache).snapshot()
    }

    /// Statistics over the held collection
    pub fn stats(&self) -> TransactionStats {
        TransactionStats::from_transactions(lock(&self.cache).items())
    }

    // ==================== Aggregate store ====================

    pub async fn refresh_summary(&self) -> CoreResult<Outcome<Summary>> {
        let token = lock(&self.aggregates).start_summary();
        let result = self.service.summary().await;
        let settlement = lock(&self.aggregates).settle_summary(token, result);
        self.settled(OperationKind::Summary, token, settlement)
    }

    pub async fn refresh_analytics(&self) -> CoreResult<Outcome<AnalyticsBreakdown>> {
        let token = lock(&self.aggregates).start_analytics();
        let result = self.service.analytics().await;
        let settlement = lock(&self.aggregates).settle_analytics(token, result);
        self.settled(OperationKind::Analytics, token, settlement)
    }

    /// Refresh summary and analytics together
    pub async fn refresh_aggregates(&self) -> (CoreResult<Outcome<Summary>>, CoreResult<Outcome<AnalyticsBreakdown>>) {
        tokio::join!(self.refresh_summary(), self.refresh_analytics())
    }

    pub fn summary(&self) -> Summary {
        lock(&self.aggregates).summary().clone()
    }

    pub fn analytics(&self) -> AnalyticsBreakdown {
        lock(&self.aggregates).analytics().clone()
    }

    pub fn aggregates(&self) -> AggregateSnapshot {
        lock(&self.aggregates).snapshot()
    }

    // ==================== Status ====================

    pub fn status(&self, kind: OperationKind) -> OperationStatus {
        match kind {
            OperationKind::Summary | OperationKind::Analytics => lock(&self.aggregates).status(kind),
            _ => lock(&self.cache).status(kind),
        }
    }

    pub fn is_busy(&self, kind: OperationKind) -> bool {
        self.status(kind).is_busy()
    }

    pub fn last_error(&self, kind: OperationKind) -> Option<CoreError> {
        self.status(kind).last_error
    }

    pub fn clear_error(&self, kind: OperationKind) {
        match kind {
            OperationKind::Summary | OperationKind::Analytics => lock(&self.aggregates).clear_error(kind),
            _ => lock(&self.cache).clear_error(kind),
        }
    }

    // ==================== Filters ====================

    pub fn filters(&self) -> FilterCriteria {
        lock(&self.filters).criteria()
    }

    /// Merge `patch` into the held criteria and list with the result
    pub async fn set_filters(&self, patch: FilterPatch) -> CoreResult<Outcome<TransactionPage>> {
        let merged = lock(&self.filters).merge(&patch);
        match merged {
            Ok(criteria) => self.fetch_list(criteria).await,
            Err(error) => Err(self.reject(OperationKind::List, error)),
        }
    }

    pub async fn clear_filters(&self) -> CoreResult<Outcome<TransactionPage>> {
        let criteria = lock(&self.filters).clear();
        self.fetch_list(criteria).await
    }

    pub async fn apply_quick_range(&self, range: QuickRange) -> CoreResult<Outcome<TransactionPage>> {
        self.apply_quick_range_on(range, Local::now().date_naive()).await
    }

    /// Quick range relative to a given day
    pub async fn apply_quick_range_on(&self, range: QuickRange, today: NaiveDate) -> CoreResult<Outcome<TransactionPage>> {
        let criteria = lock(&self.filters).apply_quick_range(range, today);
        self.fetch_list(criteria).await
    }

    /// Move to a 1-based page and list it
    pub async fn go_to_page(&self, page: u32) -> CoreResult<Outcome<TransactionPage>> {
        let moved = lock(&self.filters).go_to_page(page);
        match moved {
            Ok(criteria) => self.fetch_list(criteria).await,
            Err(error) => Err(self.reject(OperationKind::List, error)),
        }
    }

    pub fn has_active_filters(&self) -> bool {
        lock(&self.filters).has_active_filters()
    }

    pub fn total_pages(&self) -> u64 {
        lock(&self.cache).pagination().total_pages()
    }

    // ==================== UI state ====================

    pub fn ui(&self) -> UiState {
        lock(&self.ui).clone()
    }

    pub fn begin_edit(&self, transaction: Transaction) {
        lock(&self.ui).begin_edit(transaction);
    }

    pub fn begin_create(&self) {
        lock(&self.ui).begin_create(Local::now().date_naive());
    }

    pub fn end_edit(&self) {
        lock(&self.ui).end_edit();
    }

    pub fn set_editing(&self, transaction: Option<Transaction>) {
        lock(&self.ui).set_editing(transaction);
    }

    pub fn update_draft<F: FnOnce(&mut TransactionDraft)>(&self, change: F) -> bool {
        lock(&self.ui).update_draft(change)
    }

    pub fn set_sidebar_open(&self, open: bool) {
        lock(&self.ui).set_sidebar_open(open);
    }

    pub fn toggle_sidebar(&self) -> bool {
        lock(&self.ui).toggle_sidebar()
    }

    pub fn set_theme(&self, theme: Theme) {
        lock(&self.ui).set_theme(theme);
    }

    /// Submit the open form.
    ///
    /// Creates or updates depending on the surface. On success the surface
    /// closes, unless it was switched to something else meanwhile; on failure
    /// it stays open with the draft intact.
    pub async fn submit_form(&self) -> CoreResult<Transaction> {
        let (surface, draft) = {
            let ui = lock(&self.ui);
            (ui.surface().clone(), ui.draft().cloned())
        };

        let kind = match surface {
            FormSurface::Hidden => {
                return Err(CoreError::Validation {
                    message: "No transaction form is open".to_string(),
                })
            }
            FormSurface::Create => OperationKind::Create,
            FormSurface::Edit(_) => OperationKind::Update,
        };
        let parsed = match draft.unwrap_or_default().parse() {
            Ok(parsed) => parsed,
            Err(error) => return Err(self.reject(kind, error)),
        };

        let saved = match surface {
            FormSurface::Edit(ref target) => {
                self.update(&target.id, TransactionPatch::from(&parsed)).await?
            }
            _ => self.create(parsed).await?,
        };

        let mut ui = lock(&self.ui);
        if ui.surface() == &surface {
            ui.end_edit();
        }
        Ok(saved)
    }

    // ==================== Notifications ====================

    pub fn notify(&self, kind: NotificationKind, message: impl Into<String>, options: NotifyOptions) -> u64 {
        self.notifications.notify(kind, message, options)
    }

    pub fn dismiss(&self, id: u64) -> bool {
        self.notifications.dismiss(id)
    }

    pub fn clear_notifications(&self) {
        self.notifications.clear();
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.notifications()
    }

    /// Shared handle to the notification queue
    pub fn notification_center(&self) -> NotificationCenter {
        self.notifications.clone()
    }

    // ==================== Export ====================

    /// Export the held collection
    pub fn export(&self, format: ExportFormat) -> CoreResult<String> {
        let items = self.transactions();
        export::export(&items, format, &self.options.export).map_err(|error| {
            self.notifications.error(error.user_message("Failed to export transactions"));
            error
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryTransactionService;
    use rust_decimal::Decimal;

    fn coffee() -> NewTransaction {
        NewTransaction {
            kind: TransactionType::Expense,
            amount: Decimal::new(1250, 2),
            description: "Coffee".to_string(),
            category: "Food".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
        }
    }

    fn tracker_with(options: TrackerOptions) -> (Arc<InMemoryTransactionService>, Tracker) {
        let service = Arc::new(InMemoryTransactionService::new());
        let tracker = Tracker::new(service.clone(), options);
        (service, tracker)
    }

    #[tokio::test]
    async fn test_create_notifies_and_refreshes_aggregates() {
        let (_, tracker) = tracker_with(TrackerOptions::default());
        let created = tracker.create(coffee()).await.unwrap();

        assert_eq!(tracker.transactions(), vec![created]);
        let messages: Vec<String> = tracker.notifications().into_iter().map(|n| n.message).collect();
        assert_eq!(messages, vec!["Transaction created successfully!".to_string()]);
        assert_eq!(tracker.summary().total_expenses, Decimal::new(1250, 2));
        assert!(tracker.aggregates().summary_fresh);
        assert!(tracker.aggregates().analytics_fresh);
    }

    #[tokio::test]
    async fn test_without_aggregate_refresh_figures_go_stale() {
        let options = TrackerOptions { refresh_aggregates: false, ..Default::default() };
        let (_, tracker) = tracker_with(options);
        tracker.refresh_aggregates().await.0.unwrap();
        tracker.create(coffee()).await.unwrap();

        let aggregates = tracker.aggregates();
        assert!(!aggregates.summary_fresh);
        assert_eq!(aggregates.summary.total_expenses, Decimal::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_overtaken_by_mutation_is_discarded() {
        let options = TrackerOptions { refresh_aggregates: false, ..Default::default() };
        let (service, tracker) = tracker_with(options);
        service.push_latency(Duration::from_millis(100));

        let (summary, created) = tokio::join!(tracker.refresh_summary(), tracker.create(coffee()));

        assert!(created.is_ok());
        assert!(summary.unwrap().is_superseded());
        assert!(!tracker.aggregates().summary_fresh);
        assert!(!tracker.is_busy(OperationKind::Summary));
    }

    #[tokio::test]
    async fn test_client_side_validation_failure() {
        let (service, tracker) = tracker_with(TrackerOptions::default());
        let mut bad = coffee();
        bad.amount = Decimal::ZERO;

        let err = tracker.create(bad).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
        assert_eq!(service.request_count(), 0);
        assert!(tracker.last_error(OperationKind::Create).is_some());
        assert!(!tracker.is_busy(OperationKind::Create));
        assert_eq!(tracker.notifications()[0].kind, NotificationKind::Error);
        assert_eq!(tracker.notifications()[0].message, "Amount must be greater than 0");
    }

    #[tokio::test]
    async fn test_update_of_unobserved_id_is_not_found() {
        let (service, tracker) = tracker_with(TrackerOptions::default());
        let err = tracker.update("ghost", TransactionPatch::default()).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert_eq!(service.request_count(), 0);
        assert_eq!(tracker.notifications()[0].message, "Failed to update transaction");
    }

    #[tokio::test]
    async fn test_transport_failure_uses_operation_message() {
        let (service, tracker) = tracker_with(TrackerOptions::default());
        service.fail_next(CoreError::Transport { message: "connection refused".to_string() });

        assert!(tracker.refresh().await.is_err());
        assert_eq!(tracker.notifications()[0].message, "Failed to fetch transactions");
        assert!(matches!(tracker.last_error(OperationKind::List), Some(CoreError::Transport { .. })));

        tracker.clear_error(OperationKind::List);
        assert!(tracker.last_error(OperationKind::List).is_none());
    }

    #[tokio::test]
    async fn test_category_failure_is_silent() {
        let (service, tracker) = tracker_with(TrackerOptions::default());
        service.fail_next(CoreError::Server { status: Some(500), message: None });

        assert!(tracker.load_categories(None).await.is_err());
        assert!(tracker.notifications().is_empty());
        assert!(tracker.last_error(OperationKind::Categories).is_some());
    }

    #[tokio::test]
    async fn test_refetch_policy_relists() {
        let options = TrackerOptions {
            mutation_policy: MutationPolicy::Refetch,
            refresh_aggregates: false,
            ..Default::default()
        };
        let (service, tracker) = tracker_with(options);
        tracker
            .list(FilterCriteria { kind: Some(TransactionType::Income), ..Default::default() })
            .await
            .unwrap();

        tracker.create(coffee()).await.unwrap();
        assert!(tracker.transactions().is_empty());
        // list, create, re-list
        assert_eq!(service.request_count(), 3);
    }

    #[tokio::test]
    async fn test_refetch_delete_survives_failed_relist() {
        let options = TrackerOptions {
            mutation_policy: MutationPolicy::Refetch,
            refresh_aggregates: false,
            ..Default::default()
        };
        let (service, tracker) = tracker_with(options);
        let kept = tracker.create(coffee()).await.unwrap();
        let doomed = tracker.create(coffee()).await.unwrap();
        tracker.refresh().await.unwrap();
        tracker.clear_notifications();

        service.succeed_next();
        service.fail_next(CoreError::Transport { message: "reset".to_string() });
        tracker.delete(&doomed.id).await.unwrap();

        let held: Vec<String> = tracker.transactions().into_iter().map(|tx| tx.id).collect();
        assert_eq!(held, vec![kept.id]);
        assert!(tracker.last_error(OperationKind::List).is_some());
        let messages: Vec<String> = tracker.notifications().into_iter().map(|n| n.message).collect();
        assert_eq!(
            messages,
            vec!["Transaction deleted successfully!".to_string(), "Failed to fetch transactions".to_string()]
        );
    }

    #[tokio::test]
    async fn test_refetch_update_applies_before_relist() {
        let options = TrackerOptions {
            mutation_policy: MutationPolicy::Refetch,
            refresh_aggregates: false,
            ..Default::default()
        };
        let (service, tracker) = tracker_with(options);
        let created = tracker.create(coffee()).await.unwrap();
        tracker.refresh().await.unwrap();

        service.succeed_next();
        service.fail_next(CoreError::Transport { message: "reset".to_string() });
        let patch = TransactionPatch { description: Some("Espresso".to_string()), ..Default::default() };
        tracker.update(&created.id, patch).await.unwrap();

        assert_eq!(tracker.transactions()[0].description, "Espresso");
    }

    #[tokio::test]
    async fn test_set_filters_clears_one_constraint() {
        let (_, tracker) = tracker_with(TrackerOptions { page_size: 1, ..Default::default() });
        tracker.create(coffee()).await.unwrap();
        let mut pay = coffee();
        pay.kind = TransactionType::Income;
        tracker.create(pay).await.unwrap();

        tracker
            .set_filters(FilterPatch::new().kind(Some(TransactionType::Income)).category(Some("Food")))
            .await
            .unwrap();
        assert_eq!(tracker.transactions().len(), 1);

        tracker.set_filters(FilterPatch::new().kind(None)).await.unwrap();
        tracker.go_to_page(2).await.unwrap();
        let filters = tracker.filters();
        assert_eq!(filters.kind, None);
        assert_eq!(filters.category.as_deref(), Some("Food"));
        assert_eq!(tracker.pagination().total, 2);

        tracker.set_filters(FilterPatch::new().search(Some("coffee"))).await.unwrap();
        assert_eq!(tracker.filters().offset, None);
    }

    #[tokio::test]
    async fn test_filters_and_paging() {
        let (_, tracker) = tracker_with(TrackerOptions { page_size: 2, ..Default::default() });
        for _ in 0..5 {
            tracker.create(coffee()).await.unwrap();
        }
        tracker.refresh().await.unwrap();
        assert_eq!(tracker.transactions().len(), 2);
        assert_eq!(tracker.total_pages(), 3);

        tracker.go_to_page(3).await.unwrap();
        assert_eq!(tracker.transactions().len(), 1);
        assert_eq!(tracker.pagination().offset, 4);

        tracker
            .set_filters(FilterPatch::new().kind(Some(TransactionType::Income)))
            .await
            .unwrap();
        assert!(tracker.has_active_filters());
        assert!(tracker.transactions().is_empty());

        tracker.clear_filters().await.unwrap();
        assert!(!tracker.has_active_filters());
        assert_eq!(tracker.transactions().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_filter_is_rejected() {
        let (service, tracker) = tracker_with(TrackerOptions::default());
        let criteria = FilterCriteria {
            start_date: NaiveDate::from_ymd_opt(2024, 5, 2),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..Default::default()
        };
        let err = tracker.list(criteria).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidFilter { .. }));
        assert_eq!(service.request_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_form_creates_and_closes() {
        let (_, tracker) = tracker_with(TrackerOptions::default());
        tracker.begin_create();
        tracker.update_draft(|draft| {
            draft.kind = Some(TransactionType::Income);
            draft.amount = "1500".to_string();
            draft.description = "Salary".to_string();
            draft.category = "Salary".to_string();
        });

        let saved = tracker.submit_form().await.unwrap();
        assert_eq!(saved.amount, Decimal::new(1500, 0));
        assert!(!tracker.ui().is_form_visible());
        assert!(tracker.ui().draft().is_none());
    }

    #[tokio::test]
    async fn test_submit_form_failure_keeps_surface_open() {
        let (service, tracker) = tracker_with(TrackerOptions::default());
        let created = tracker.create(coffee()).await.unwrap();
        tracker.begin_edit(created);
        tracker.update_draft(|draft| draft.description = "Latte".to_string());

        service.fail_next(CoreError::Validation { message: "Description too fancy".to_string() });
        assert!(tracker.submit_form().await.is_err());
        assert!(tracker.ui().is_form_visible());
        assert_eq!(tracker.ui().draft().unwrap().description, "Latte");
        let last = tracker.notifications().pop().unwrap();
        assert_eq!(last.message, "Description too fancy");

        let saved = tracker.submit_form().await.unwrap();
        assert_eq!(saved.description, "Latte");
        assert_eq!(tracker.transactions()[0].description, "Latte");
        assert!(!tracker.ui().is_form_visible());
    }

    #[tokio::test]
    async fn test_submit_without_open_form() {
        let (_, tracker) = tracker_with(TrackerOptions::default());
        assert!(tracker.submit_form().await.is_err());
    }

    #[tokio::test]
    async fn test_export_and_stats() {
        let (_, tracker) = tracker_with(TrackerOptions::default());
        assert!(tracker.export(ExportFormat::Csv).is_err());
        assert_eq!(tracker.notifications()[0].message, "No transactions to export");

        tracker.create(coffee()).await.unwrap();
        let csv = tracker.export(ExportFormat::Csv).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert_eq!(tracker.stats().expense_count, 1);
    }
}
