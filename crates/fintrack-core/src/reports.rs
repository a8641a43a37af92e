//! Aggregate figures: summary totals, analytics breakdowns and local stats

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::Transaction;
use crate::types::TransactionType;

/// Number of entries kept in the recent-activity list
pub const RECENT_LIMIT: usize = 5;

/// Totals over the full remote dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_income: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_expenses: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub balance: Decimal,
    #[serde(default)]
    pub transaction_count: u64,
}

impl Summary {
    pub fn new(total_income: Decimal, total_expenses: Decimal, transaction_count: u64) -> Self {
        Self {
            total_income,
            total_expenses,
            balance: total_income - total_expenses,
            transaction_count,
        }
    }

    /// Recompute the balance from the totals.
    ///
    /// The service sends the balance as a float; deriving it here keeps
    /// `balance == total_income - total_expenses` exact.
    pub fn reconciled(mut self) -> Self {
        if !self.is_consistent() {
            let expected = self.total_income - self.total_expenses;
            log::warn!(
                "Summary balance {} differs from income - expenses ({}); using the derived value",
                self.balance,
                expected
            );
            self.balance = expected;
        }
        self
    }

    pub fn is_consistent(&self) -> bool {
        self.balance == self.total_income - self.total_expenses
            && self.total_income >= Decimal::ZERO
            && self.total_expenses >= Decimal::ZERO
    }
}

/// Amount and count for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default)]
    pub count: u64,
}

/// Income and expense totals for one time bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendBucket {
    #[serde(default, with = "rust_decimal::serde::float")]
    pub income: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub expense: Decimal,
}

/// Analytics over the full remote dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsBreakdown {
    #[serde(default)]
    pub expense_breakdown: Vec<CategoryBreakdown>,
    #[serde(default)]
    pub income_breakdown: Vec<CategoryBreakdown>,
    /// Keyed by `YYYY-MM`
    #[serde(default)]
    pub monthly_trends: BTreeMap<String, TrendBucket>,
    #[serde(default)]
    pub recent_transactions: Vec<Transaction>,
}

fn breakdown_for<'a, I>(transactions: I, kind: TransactionType) -> Vec<CategoryBreakdown>
where
    I: Iterator<Item = &'a Transaction>,
{
    let mut by_category: BTreeMap<&str, (Decimal, u64)> = BTreeMap::new();
    for tx in transactions.filter(|t| t.kind == kind) {
        let entry = by_category.entry(tx.category.as_str()).or_insert((Decimal::ZERO, 0));
        entry.0 += tx.amount;
        entry.1 += 1;
    }
    let mut rows: Vec<CategoryBreakdown> = by_category
        .into_iter()
        .map(|(category, (amount, count))| CategoryBreakdown {
            category: category.to_string(),
            amount,
            count,
        })
        .collect();
    rows.sort_by(|a, b| b.amount.cmp(&a.amount));
    rows
}

impl AnalyticsBreakdown {
    /// Build the breakdown the way the service computes it
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut monthly_trends: BTreeMap<String, TrendBucket> = BTreeMap::new();
        for tx in transactions {
            let bucket = monthly_trends.entry(tx.date.format("%Y-%m").to_string()).or_default();
            match tx.kind {
                TransactionType::Income => bucket.income += tx.amount,
                TransactionType::Expense => bucket.expense += tx.amount,
            }
        }

        let mut recent: Vec<Transaction> = transactions.to_vec();
        recent.sort_by(|a, b| b.date.cmp(&a.date));
        recent.truncate(RECENT_LIMIT);

        Self {
            expense_breakdown: breakdown_for(transactions.iter(), TransactionType::Expense),
            income_breakdown: breakdown_for(transactions.iter(), TransactionType::Income),
            monthly_trends,
            recent_transactions: recent,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.expense_breakdown.is_empty()
            && self.income_breakdown.is_empty()
            && self.monthly_trends.is_empty()
            && self.recent_transactions.is_empty()
    }
}

/// Statistics over the currently held collection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionStats {
    pub income_count: usize,
    pub expense_count: usize,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    /// (income + expenses) / held count; zero when nothing is held
    pub average_amount: Decimal,
}

impl TransactionStats {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut stats = TransactionStats::default();
        for tx in transactions {
            match tx.kind {
                TransactionType::Income => {
                    stats.income_count += 1;
                    stats.total_income += tx.amount;
                }
                TransactionType::Expense => {
                    stats.expense_count += 1;
                    stats.total_expenses += tx.amount;
                }
            }
        }
        if !transactions.is_empty() {
            stats.average_amount =
                (stats.total_income + stats.total_expenses) / Decimal::from(transactions.len() as u64);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(id: &str, kind: TransactionType, cents: i64, category: &str, day: u32) -> Transaction {
        Transaction {
            id: id.to_string(),
            kind,
            amount: Decimal::new(cents, 2),
            description: format!("{} entry", category),
            category: category.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            created_at: None,
            updated_at: None,
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx("1", TransactionType::Income, 300000, "Salary", 1),
            tx("2", TransactionType::Expense, 1250, "Food", 2),
            tx("3", TransactionType::Expense, 4550, "Food", 3),
            tx("4", TransactionType::Expense, 120000, "Rent", 4),
        ]
    }

    #[test]
    fn test_summary_new_balances() {
        let summary = Summary::new(Decimal::new(10, 1), Decimal::new(3, 1), 2);
        assert_eq!(summary.balance, Decimal::new(7, 1));
        assert!(summary.is_consistent());
    }

    #[test]
    fn test_summary_reconciles_float_drift() {
        let json = r#"{"totalIncome":0.3,"totalExpenses":0.1,"balance":0.19999999999999998,"transactionCount":2}"#;
        let summary: Summary = serde_json::from_str(json).unwrap();
        let summary = summary.reconciled();
        assert_eq!(summary.balance, Decimal::new(2, 1));
        assert!(summary.is_consistent());
    }

    #[test]
    fn test_analytics_breakdown() {
        let analytics = AnalyticsBreakdown::from_transactions(&sample());
        assert_eq!(analytics.expense_breakdown.len(), 2);
        assert_eq!(analytics.expense_breakdown[0].category, "Rent");
        assert_eq!(analytics.expense_breakdown[1].amount, Decimal::new(5800, 2));
        assert_eq!(analytics.expense_breakdown[1].count, 2);
        assert_eq!(analytics.income_breakdown.len(), 1);

        let march = &analytics.monthly_trends["2024-03"];
        assert_eq!(march.income, Decimal::new(300000, 2));
        assert_eq!(march.expense, Decimal::new(125800, 2));
        assert_eq!(analytics.recent_transactions[0].id, "4");
    }

    #[test]
    fn test_analytics_decodes_empty_payload() {
        let analytics: AnalyticsBreakdown = serde_json::from_str(
            r#"{"expenseBreakdown":[],"incomeBreakdown":[],"monthlyTrends":{},"recentTransactions":[]}"#,
        )
        .unwrap();
        assert!(analytics.is_empty());
    }

    #[test]
    fn test_transaction_stats() {
        let stats = TransactionStats::from_transactions(&sample());
        assert_eq!(stats.income_count, 1);
        assert_eq!(stats.expense_count, 3);
        assert_eq!(stats.average_amount, Decimal::new(426800, 2) / Decimal::from(4u64));
        assert_eq!(TransactionStats::from_transactions(&[]).average_amount, Decimal::ZERO);
    }
}
