//! Export of the held transaction collection
//!
//! Exports are point-in-time snapshots of what the cache currently holds
//! (the filtered page), not of the full remote dataset.

use chrono::NaiveDate;
use csv::{QuoteStyle, WriterBuilder};
use fintrack_config::ExportConfig;
use fintrack_utils::fixed_decimals;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::error::{CoreError, CoreResult};
use crate::models::Transaction;

/// Column headers of the CSV export
pub const CSV_HEADERS: [&str; 5] = ["Date", "Type", "Description", "Category", "Amount"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    /// Suggested file name, e.g. `transactions_2024-05-16.csv`
    pub fn file_name(&self, today: NaiveDate) -> String {
        format!("transactions_{}.{}", today.format("%Y-%m-%d"), self.extension())
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(format!("Invalid export format: {}", s)),
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

fn export_error(message: impl Into<String>) -> CoreError {
    CoreError::Export {
        message: message.into(),
    }
}

fn format_date(date: NaiveDate, format: &str) -> CoreResult<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(format))
        .map_err(|_| export_error(format!("invalid date format '{}'", format)))?;
    Ok(out)
}

/// Render the collection as CSV.
///
/// The header row is plain; in data rows every textual field is quoted.
pub fn to_csv(transactions: &[Transaction], config: &ExportConfig) -> CoreResult<String> {
    if transactions.is_empty() {
        return Err(export_error("No transactions to export"));
    }

    let mut header = WriterBuilder::new().from_writer(Vec::new());
    header
        .write_record(CSV_HEADERS)
        .map_err(|e| export_error(e.to_string()))?;
    let buffer = header.into_inner().map_err(|e| export_error(e.to_string()))?;

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::NonNumeric)
        .from_writer(buffer);
    for tx in transactions {
        let date = format_date(tx.date, &config.date_format)?;
        let kind = tx.kind.to_string();
        let amount = fixed_decimals(tx.amount, config.decimal_places);
        writer
            .write_record([
                date.as_str(),
                kind.as_str(),
                tx.description.as_str(),
                tx.category.as_str(),
                amount.as_str(),
            ])
            .map_err(|e| export_error(e.to_string()))?;
    }
    let bytes = writer.into_inner().map_err(|e| export_error(e.to_string()))?;

    String::from_utf8(bytes).map_err(|e| export_error(e.to_string()))
}

/// Render the collection as a pretty-printed JSON array
pub fn to_json(transactions: &[Transaction]) -> CoreResult<String> {
    if transactions.is_empty() {
        return Err(export_error("No transactions to export"));
    }
    serde_json::to_string_pretty(transactions).map_err(|e| export_error(e.to_string()))
}

pub fn export(transactions: &[Transaction], format: ExportFormat, config: &ExportConfig) -> CoreResult<String> {
    log::debug!("Exporting {} transactions as {}", transactions.len(), format);
    match format {
        ExportFormat::Csv => to_csv(transactions, config),
        ExportFormat::Json => to_json(transactions),
    }
}
