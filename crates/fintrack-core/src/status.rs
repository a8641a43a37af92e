//! Request tokens and per-operation status records

use serde::Serialize;
use std::collections::HashMap;

use crate::error::CoreError;
use crate::types::OperationKind;

/// Identity of one issued request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues monotonically increasing tokens for one kind of request.
///
/// Only the most recently issued token may apply its response.
#[derive(Debug, Default)]
pub struct RequestSequence {
    last_issued: u64,
}

impl RequestSequence {
    pub fn issue(&mut self) -> RequestToken {
        self.last_issued += 1;
        RequestToken(self.last_issued)
    }

    pub fn is_latest(&self, token: RequestToken) -> bool {
        token.0 == self.last_issued
    }

    /// Make every token issued so far stale
    pub fn supersede(&mut self) {
        self.last_issued += 1;
    }
}

/// Busy/error surface of one operation kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationStatus {
    /// Requests of this kind currently in flight
    pub in_flight: usize,
    /// Failure of the most recent settled request, if it failed
    pub last_error: Option<CoreError>,
}

impl OperationStatus {
    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }
}

/// One [`OperationStatus`] per operation kind
#[derive(Debug, Default)]
pub struct StatusBoard {
    statuses: HashMap<OperationKind, OperationStatus>,
}

impl StatusBoard {
    /// Mark a request as started; clears the previous error of that kind
    pub fn start(&mut self, kind: OperationKind) {
        let status = self.statuses.entry(kind).or_default();
        status.in_flight += 1;
        status.last_error = None;
    }

    /// Mark a request as settled; `error` is recorded when present
    pub fn settle(&mut self, kind: OperationKind, error: Option<CoreError>) {
        let status = self.statuses.entry(kind).or_default();
        status.in_flight = status.in_flight.saturating_sub(1);
        if error.is_some() {
            status.last_error = error;
        }
    }

    pub fn status(&self, kind: OperationKind) -> OperationStatus {
        self.statuses.get(&kind).cloned().unwrap_or_default()
    }

    pub fn is_busy(&self, kind: OperationKind) -> bool {
        self.statuses.get(&kind).map_or(false, OperationStatus::is_busy)
    }

    pub fn clear_error(&mut self, kind: OperationKind) {
        if let Some(status) = self.statuses.get_mut(&kind) {
            status.last_error = None;
        }
    }
}
