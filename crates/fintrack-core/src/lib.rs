//! Client-side transaction state synchronisation
//!
//! Keeps a local cache of transaction records, derived aggregate figures and
//! transient UI signals consistent with a remote transaction service under
//! overlapping asynchronous operations.

pub mod aggregate;
pub mod cache;
pub mod error;
pub mod export;
pub mod filters;
pub mod memory;
pub mod models;
pub mod notifications;
pub mod orchestrator;
pub mod reports;
pub mod service;
pub mod status;
pub mod types;
pub mod ui;

pub use aggregate::{AggregateSnapshot, AggregateStore};
pub use cache::{CacheSnapshot, Settlement, TransactionCache};
pub use error::{CoreError, CoreResult, ErrorCode, ErrorSeverity};
pub use export::ExportFormat;
pub use filters::{FilterChange, FilterCriteria, FilterPatch, FilterState, QuickRange};
pub use memory::InMemoryTransactionService;
pub use models::{NewTransaction, Pagination, Transaction, TransactionPage, TransactionPatch};
pub use notifications::{Notification, NotificationCenter, NotifyOptions};
pub use orchestrator::{Outcome, Tracker, TrackerOptions};
pub use reports::{AnalyticsBreakdown, CategoryBreakdown, Summary, TransactionStats, TrendBucket};
pub use service::{ServiceRef, TransactionService};
pub use status::{OperationStatus, RequestToken};
pub use types::{NotificationKind, OperationKind, TransactionType};
pub use ui::{FormSurface, TransactionDraft, UiState};
