//! Core data models for transactions

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::TransactionType;

/// Longest accepted description, in characters
pub const MAX_DESCRIPTION_LEN: usize = 255;
/// Longest accepted category name, in characters
pub const MAX_CATEGORY_LEN: usize = 50;

/// Date format used on the wire
pub const WIRE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a date as sent by the service.
///
/// Accepts a plain `YYYY-MM-DD` date or a full RFC 3339 timestamp, in which
/// case the calendar date in the timestamp's own offset is used.
pub fn parse_wire_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, WIRE_DATE_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

pub(crate) mod wire_date {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(super::WIRE_DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_wire_date(&raw).ok_or_else(|| de::Error::custom(format!("invalid date: {}", raw)))
    }
}

pub(crate) mod wire_date_option {
    use chrono::NaiveDate;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => super::wire_date::serialize(date, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDate>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => super::parse_wire_date(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid date: {}", raw))),
            None => Ok(None),
        }
    }
}

/// A transaction record as held by the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Server-assigned identifier
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Income or expense
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Always positive; the type carries the sign
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
    pub category: String,
    #[serde(with = "wire_date")]
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Whether the record satisfies the entity invariants
    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty() && self.amount > Decimal::ZERO
    }

    /// Amount with the sign implied by the type
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionType::Income
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionType::Expense
    }
}

fn check_text(field: &str, value: &str, max: usize) -> CoreResult<()> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation {
            message: format!("{} is required", field),
        });
    }
    if value.chars().count() > max {
        return Err(CoreError::Validation {
            message: format!("{} must be less than {} characters", field, max),
        });
    }
    Ok(())
}

fn check_amount(amount: Decimal) -> CoreResult<()> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::Validation {
            message: "Amount must be greater than 0".to_string(),
        });
    }
    Ok(())
}

/// Fields needed to create a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub description: String,
    pub category: String,
    #[serde(with = "wire_date")]
    pub date: NaiveDate,
}

impl NewTransaction {
    /// Check the entity invariants before anything is sent
    pub fn validate(&self) -> CoreResult<()> {
        check_amount(self.amount)?;
        check_text("Description", &self.description, MAX_DESCRIPTION_LEN)?;
        check_text("Category", &self.category, MAX_CATEGORY_LEN)?;
        Ok(())
    }

    /// Materialize as a stored record with the given id
    pub fn into_transaction(self, id: String) -> Transaction {
        Transaction {
            id,
            kind: self.kind,
            amount: self.amount,
            description: self.description,
            category: self.category,
            date: self.date,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub amount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "wire_date_option"
    )]
    pub date: Option<NaiveDate>,
}

impl TransactionPatch {
    /// Validate the fields that are present
    pub fn validate(&self) -> CoreResult<()> {
        if let Some(amount) = self.amount {
            check_amount(amount)?;
        }
        if let Some(ref description) = self.description {
            check_text("Description", description, MAX_DESCRIPTION_LEN)?;
        }
        if let Some(ref category) = self.category {
            check_text("Category", category, MAX_CATEGORY_LEN)?;
        }
        Ok(())
    }

    /// Produce the record that results from applying this patch
    pub fn apply_to(&self, transaction: &Transaction) -> Transaction {
        let mut updated = transaction.clone();
        if let Some(kind) = self.kind {
            updated.kind = kind;
        }
        if let Some(amount) = self.amount {
            updated.amount = amount;
        }
        if let Some(ref description) = self.description {
            updated.description = description.clone();
        }
        if let Some(ref category) = self.category {
            updated.category = category.clone();
        }
        if let Some(date) = self.date {
            updated.date = date;
        }
        updated
    }
}

impl From<&NewTransaction> for TransactionPatch {
    fn from(full: &NewTransaction) -> Self {
        Self {
            kind: Some(full.kind),
            amount: Some(full.amount),
            description: Some(full.description.clone()),
            category: Some(full.category.clone()),
            date: Some(full.date),
        }
    }
}

/// Pagination metadata for the current list result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Records matching the filter on the server
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub has_more: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            total: 0,
            limit: 50,
            offset: 0,
            has_more: false,
        }
    }
}

impl Pagination {
    /// Fill in `has_more` when the server left it out
    pub fn reconcile(mut self, held: usize) -> Self {
        if !self.has_more {
            self.has_more = (self.offset as u64 + held as u64) < self.total;
        }
        self
    }

    /// Number of pages at the current page size
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return if self.total > 0 { 1 } else { 0 };
        }
        self.total.div_ceil(self.limit as u64)
    }

    /// 1-based page the current offset falls on
    pub fn current_page(&self) -> u64 {
        if self.limit == 0 {
            return 1;
        }
        self.offset as u64 / self.limit as u64 + 1
    }
}

/// One page of transactions with its pagination metadata
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionPage {
    pub items: Vec<Transaction>,
    pub pagination: Pagination,
}
