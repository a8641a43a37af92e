//! Aggregate store: summary totals and analytics, refreshed from the service

use serde::Serialize;

use crate::cache::Settlement;
use crate::error::CoreError;
use crate::reports::{AnalyticsBreakdown, Summary};
use crate::status::{OperationStatus, RequestSequence, RequestToken, StatusBoard};
use crate::types::OperationKind;

/// Read-only copy of the aggregate figures
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateSnapshot {
    pub summary: Summary,
    pub analytics: AnalyticsBreakdown,
    /// False between a mutation and the next successful summary refresh
    pub summary_fresh: bool,
    /// False between a mutation and the next successful analytics refresh
    pub analytics_fresh: bool,
}

#[derive(Debug, Default)]
pub struct AggregateStore {
    summary: Summary,
    analytics: AnalyticsBreakdown,
    summary_fresh: bool,
    analytics_fresh: bool,
    summary_sequence: RequestSequence,
    analytics_sequence: RequestSequence,
    status: StatusBoard,
}

impl AggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn analytics(&self) -> &AnalyticsBreakdown {
        &self.analytics
    }

    pub fn snapshot(&self) -> AggregateSnapshot {
        AggregateSnapshot {
            summary: self.summary.clone(),
            analytics: self.analytics.clone(),
            summary_fresh: self.summary_fresh,
            analytics_fresh: self.analytics_fresh,
        }
    }

    pub fn status(&self, kind: OperationKind) -> OperationStatus {
        self.status.status(kind)
    }

    pub fn clear_error(&mut self, kind: OperationKind) {
        self.status.clear_error(kind);
    }

    /// Mark both figures stale after the dataset changed.
    ///
    /// Refreshes already in flight were answered from the old dataset and
    /// are discarded when they settle.
    pub fn invalidate(&mut self) {
        self.summary_fresh = false;
        self.analytics_fresh = false;
        self.summary_sequence.supersede();
        self.analytics_sequence.supersede();
    }

    pub fn start_summary(&mut self) -> RequestToken {
        self.status.start(OperationKind::Summary);
        self.summary_sequence.issue()
    }

    pub fn settle_summary(
        &mut self,
        token: RequestToken,
        result: Result<Summary, CoreError>,
    ) -> Settlement<Summary> {
        if !self.summary_sequence.is_latest(token) {
            self.status.settle(OperationKind::Summary, None);
            return Settlement::Stale;
        }
        match result {
            Ok(summary) => {
                self.status.settle(OperationKind::Summary, None);
                self.summary = summary.reconciled();
                self.summary_fresh = true;
                Settlement::Applied(self.summary.clone())
            }
            Err(error) => {
                self.status.settle(OperationKind::Summary, Some(error.clone()));
                Settlement::Failed(error)
            }
        }
    }

    pub fn start_analytics(&mut self) -> RequestToken {
        self.status.start(OperationKind::Analytics);
        self.analytics_sequence.issue()
    }

    pub fn settle_analytics(
        &mut self,
        token: RequestToken,
        result: Result<AnalyticsBreakdown, CoreError>,
    ) -> Settlement<AnalyticsBreakdown> {
        if !self.analytics_sequence.is_latest(token) {
            self.status.settle(OperationKind::Analytics, None);
            return Settlement::Stale;
        }
        match result {
            Ok(analytics) => {
                self.status.settle(OperationKind::Analytics, None);
                self.analytics = analytics;
                self.analytics_fresh = true;
                Settlement::Applied(self.analytics.clone())
            }
            Err(error) => {
                self.status.settle(OperationKind::Analytics, Some(error.clone()));
                Settlement::Failed(error)
            }
        }
    }
}
