//! Basic enumerations shared across the core

use serde::{Deserialize, Serialize};

/// Transaction type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money coming in (salary, gifts)
    Income,
    /// Money going out (food, transport)
    Expense,
}

impl std::str::FromStr for TransactionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" | "expenses" => Ok(TransactionType::Expense),
            _ => Err(format!("Invalid transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::Income => write!(f, "income"),
            TransactionType::Expense => write!(f, "expense"),
        }
    }
}

/// Notification type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

impl Default for NotificationKind {
    fn default() -> Self {
        NotificationKind::Info
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" => Ok(NotificationKind::Success),
            "error" => Ok(NotificationKind::Error),
            "warning" => Ok(NotificationKind::Warning),
            "info" => Ok(NotificationKind::Info),
            _ => Err(format!("Invalid notification type: {}", s)),
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Success => write!(f, "success"),
            NotificationKind::Error => write!(f, "error"),
            NotificationKind::Warning => write!(f, "warning"),
            NotificationKind::Info => write!(f, "info"),
        }
    }
}

/// Every kind of request the client issues to the remote service.
///
/// Each kind owns its own status record, so concurrent operations of
/// different kinds never overwrite each other's busy flag or error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    List,
    Get,
    Create,
    Update,
    Delete,
    Categories,
    Summary,
    Analytics,
}

impl OperationKind {
    /// Message shown when the service gives no reason for a failure
    pub fn failure_message(&self) -> &'static str {
        match self {
            OperationKind::List => "Failed to fetch transactions",
            OperationKind::Get => "Failed to fetch transaction",
            OperationKind::Create => "Failed to create transaction",
            OperationKind::Update => "Failed to update transaction",
            OperationKind::Delete => "Failed to delete transaction",
            OperationKind::Categories => "Failed to fetch categories",
            OperationKind::Summary => "Failed to fetch summary",
            OperationKind::Analytics => "Failed to fetch analytics",
        }
    }

    /// Message queued after a successful mutation
    pub fn success_message(&self) -> Option<&'static str> {
        match self {
            OperationKind::Create => Some("Transaction created successfully!"),
            OperationKind::Update => Some("Transaction updated successfully!"),
            OperationKind::Delete => Some("Transaction deleted successfully!"),
            _ => None,
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OperationKind::List => "list",
            OperationKind::Get => "get",
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Categories => "categories",
            OperationKind::Summary => "summary",
            OperationKind::Analytics => "analytics",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_type_from_str() {
        assert_eq!("income".parse::<TransactionType>().unwrap(), TransactionType::Income);
        assert_eq!("Expense".parse::<TransactionType>().unwrap(), TransactionType::Expense);
        assert!("transfer".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_transaction_type_serde() {
        let json = serde_json::to_string(&TransactionType::Expense).unwrap();
        assert_eq!(json, "\"expense\"");
        let parsed: TransactionType = serde_json::from_str("\"income\"").unwrap();
        assert_eq!(parsed, TransactionType::Income);
    }

    #[test]
    fn test_notification_kind_default() {
        assert_eq!(NotificationKind::default(), NotificationKind::Info);
        assert_eq!(NotificationKind::Warning.to_string(), "warning");
    }

    #[test]
    fn test_operation_messages() {
        assert_eq!(OperationKind::List.failure_message(), "Failed to fetch transactions");
        assert_eq!(
            OperationKind::Delete.success_message(),
            Some("Transaction deleted successfully!")
        );
        assert_eq!(OperationKind::Summary.success_message(), None);
    }
}
