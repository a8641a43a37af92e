//! Filter criteria and the filter state that drives every list query

use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::models::{wire_date_option, Transaction, WIRE_DATE_FORMAT};
use crate::types::TransactionType;

/// Constraints narrowing which transactions a list query returns.
///
/// Absent fields are unconstrained. Blank strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "wire_date_option")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "wire_date_option")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl FilterCriteria {
    /// Check the criteria are well-formed
    pub fn validate(&self) -> CoreResult<()> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(CoreError::InvalidFilter {
                    field: "dates",
                    message: format!("start date {} is after end date {}", start, end),
                });
            }
        }
        if self.limit == Some(0) {
            return Err(CoreError::InvalidFilter {
                field: "limit",
                message: "limit must be greater than 0".to_string(),
            });
        }
        Ok(())
    }

    /// Copy with blank strings collapsed to `None` and text trimmed
    pub fn normalized(&self) -> Self {
        Self {
            kind: self.kind,
            category: non_blank(&self.category).map(str::to_string),
            start_date: self.start_date,
            end_date: self.end_date,
            search: non_blank(&self.search).map(str::to_string),
            limit: self.limit,
            offset: self.offset,
        }
    }

    /// Whether any non-paging constraint is set
    pub fn has_constraints(&self) -> bool {
        self.kind.is_some()
            || non_blank(&self.category).is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
            || non_blank(&self.search).is_some()
    }

    /// Client-side predicate equivalent to the service's filtering.
    ///
    /// Paging fields are ignored. Category is an exact match; search is a
    /// case-insensitive substring of the description or the category.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        if let Some(kind) = self.kind {
            if transaction.kind != kind {
                return false;
            }
        }
        if let Some(category) = non_blank(&self.category) {
            if transaction.category != category {
                return false;
            }
        }
        match (self.start_date, self.end_date) {
            (Some(s), _) if transaction.date < s => return false,
            (_, Some(e)) if transaction.date > e => return false,
            _ => {}
        }
        if let Some(search) = non_blank(&self.search) {
            let needle = search.to_lowercase();
            if !transaction.description.to_lowercase().contains(&needle)
                && !transaction.category.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }

    /// Query-string pairs for the list endpoint; unset fields are omitted
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(kind) = self.kind {
            pairs.push(("type", kind.to_string()));
        }
        if let Some(category) = non_blank(&self.category) {
            pairs.push(("category", category.to_string()));
        }
        if let Some(start) = self.start_date {
            pairs.push(("startDate", start.format(WIRE_DATE_FORMAT).to_string()));
        }
        if let Some(end) = self.end_date {
            pairs.push(("endDate", end.format(WIRE_DATE_FORMAT).to_string()));
        }
        if let Some(search) = non_blank(&self.search) {
            pairs.push(("search", search.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        pairs
    }
}

/// How a partial filter update treats one field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange<T> {
    /// Leave the held value alone
    Keep,
    Set(T),
    /// Remove the constraint
    Clear,
}

impl<T> Default for FilterChange<T> {
    fn default() -> Self {
        FilterChange::Keep
    }
}

impl<T: Clone> FilterChange<T> {
    /// `Some` sets the value, `None` clears it
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(value) => FilterChange::Set(value),
            None => FilterChange::Clear,
        }
    }

    pub fn is_keep(&self) -> bool {
        matches!(self, FilterChange::Keep)
    }

    fn resolve(&self, held: &Option<T>) -> Option<T> {
        match self {
            FilterChange::Keep => held.clone(),
            FilterChange::Set(value) => Some(value.clone()),
            FilterChange::Clear => None,
        }
    }
}

/// A partial update to the held filter criteria.
///
/// Every field defaults to [`FilterChange::Keep`]. Setting a text field to a
/// blank string clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    pub kind: FilterChange<TransactionType>,
    pub category: FilterChange<String>,
    pub start_date: FilterChange<NaiveDate>,
    pub end_date: FilterChange<NaiveDate>,
    pub search: FilterChange<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl FilterPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kind(mut self, kind: Option<TransactionType>) -> Self {
        self.kind = FilterChange::from_option(kind);
        self
    }

    pub fn category(mut self, category: Option<&str>) -> Self {
        self.category = FilterChange::from_option(category.map(str::to_string));
        self
    }

    pub fn dates(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = FilterChange::from_option(start);
        self.end_date = FilterChange::from_option(end);
        self
    }

    pub fn search(mut self, search: Option<&str>) -> Self {
        self.search = FilterChange::from_option(search.map(str::to_string));
        self
    }

    /// Whether any non-paging field is set or cleared
    pub fn touches_constraints(&self) -> bool {
        !(self.kind.is_keep()
            && self.category.is_keep()
            && self.start_date.is_keep()
            && self.end_date.is_keep()
            && self.search.is_keep())
    }

    /// The held criteria with this patch overlaid
    pub fn apply_to(&self, held: &FilterCriteria) -> FilterCriteria {
        FilterCriteria {
            kind: self.kind.resolve(&held.kind),
            category: self.category.resolve(&held.category),
            start_date: self.start_date.resolve(&held.start_date),
            end_date: self.end_date.resolve(&held.end_date),
            search: self.search.resolve(&held.search),
            limit: self.limit.or(held.limit),
            offset: self.offset.or(held.offset),
        }
        .normalized()
    }
}

/// Preset date windows, each ending today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickRange {
    Today,
    /// From the most recent Sunday
    Week,
    /// From the first of the current month
    Month,
    /// From the first of the month three months back
    ThreeMonths,
    /// From January 1st
    Year,
}

impl QuickRange {
    /// Start of the window for the given day
    pub fn start_date(&self, today: NaiveDate) -> NaiveDate {
        let first_of_month = today.with_day(1).unwrap_or(today);
        match self {
            QuickRange::Today => today,
            QuickRange::Week => {
                today - Duration::days(today.weekday().num_days_from_sunday() as i64)
            }
            QuickRange::Month => first_of_month,
            QuickRange::ThreeMonths => first_of_month
                .checked_sub_months(Months::new(3))
                .unwrap_or(first_of_month),
            QuickRange::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
        }
    }

    /// `(start, end)` bounds for the given day
    pub fn bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (self.start_date(today), today)
    }

    pub fn description(&self) -> &'static str {
        match self {
            QuickRange::Today => "Today",
            QuickRange::Week => "This Week",
            QuickRange::Month => "This Month",
            QuickRange::ThreeMonths => "Last 3 Months",
            QuickRange::Year => "This Year",
        }
    }
}

impl std::str::FromStr for QuickRange {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "today" => Ok(QuickRange::Today),
            "week" => Ok(QuickRange::Week),
            "month" => Ok(QuickRange::Month),
            "3months" | "three_months" => Ok(QuickRange::ThreeMonths),
            "year" => Ok(QuickRange::Year),
            _ => Err(format!("Invalid date range: {}", s)),
        }
    }
}

/// The held filter criteria; the single source of truth for list queries
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    criteria: FilterCriteria,
    page_size: u32,
}

impl FilterState {
    pub fn new(page_size: u32) -> Self {
        Self {
            criteria: FilterCriteria::default(),
            page_size: page_size.max(1),
        }
    }

    /// Criteria as sent to the service, with the page size filled in
    pub fn criteria(&self) -> FilterCriteria {
        let mut criteria = self.criteria.clone();
        criteria.limit = Some(criteria.limit.unwrap_or(self.page_size));
        criteria
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Replace the held criteria wholesale
    pub fn replace(&mut self, criteria: FilterCriteria) -> CoreResult<FilterCriteria> {
        let criteria = criteria.normalized();
        criteria.validate()?;
        self.criteria = criteria;
        Ok(self.criteria())
    }

    /// Merge a partial update.
    ///
    /// Setting or clearing any constraint without an explicit offset returns
    /// to the first page.
    pub fn merge(&mut self, patch: &FilterPatch) -> CoreResult<FilterCriteria> {
        let mut merged = patch.apply_to(&self.criteria);
        if patch.touches_constraints() && patch.offset.is_none() {
            merged.offset = None;
        }
        merged.validate()?;
        self.criteria = merged;
        Ok(self.criteria())
    }

    pub fn clear(&mut self) -> FilterCriteria {
        self.criteria = FilterCriteria::default();
        self.criteria()
    }

    pub fn apply_quick_range(&mut self, range: QuickRange, today: NaiveDate) -> FilterCriteria {
        let (start, end) = range.bounds(today);
        self.criteria.start_date = Some(start);
        self.criteria.end_date = Some(end);
        self.criteria.offset = None;
        self.criteria()
    }

    /// Move to a 1-based page
    pub fn go_to_page(&mut self, page: u32) -> CoreResult<FilterCriteria> {
        if page == 0 {
            return Err(CoreError::InvalidFilter {
                field: "page",
                message: "page numbers start at 1".to_string(),
            });
        }
        let limit = self.criteria.limit.unwrap_or(self.page_size);
        self.criteria.offset = Some((page - 1).saturating_mul(limit));
        Ok(self.criteria())
    }

    pub fn has_active_filters(&self) -> bool {
        self.criteria.has_constraints()
    }
}

impl Default for FilterState {
    fn default() -> Self {
        Self::new(50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn coffee() -> Transaction {
        Transaction {
            id: "t1".to_string(),
            kind: TransactionType::Expense,
            amount: Decimal::new(1250, 2),
            description: "Morning Coffee".to_string(),
            category: "Food".to_string(),
            date: date(2024, 3, 9),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_empty_criteria_match_everything() {
        assert!(FilterCriteria::default().matches(&coffee()));
        assert!(!FilterCriteria::default().has_constraints());
    }

    #[test]
    fn test_matches_each_constraint() {
        let tx = coffee();
        let by_kind = FilterCriteria { kind: Some(TransactionType::Income), ..Default::default() };
        assert!(!by_kind.matches(&tx));

        let by_category = FilterCriteria { category: Some("Food".to_string()), ..Default::default() };
        assert!(by_category.matches(&tx));

        let by_range = FilterCriteria {
            start_date: Some(date(2024, 3, 9)),
            end_date: Some(date(2024, 3, 9)),
            ..Default::default()
        };
        assert!(by_range.matches(&tx));

        let after = FilterCriteria { start_date: Some(date(2024, 3, 10)), ..Default::default() };
        assert!(!after.matches(&tx));

        let search = FilterCriteria { search: Some("coffee".to_string()), ..Default::default() };
        assert!(search.matches(&tx));
        let search = FilterCriteria { search: Some("rent".to_string()), ..Default::default() };
        assert!(!search.matches(&tx));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let criteria = FilterCriteria {
            start_date: Some(date(2024, 5, 1)),
            end_date: Some(date(2024, 4, 1)),
            ..Default::default()
        };
        assert!(matches!(criteria.validate(), Err(CoreError::InvalidFilter { field: "dates", .. })));
        let zero = FilterCriteria { limit: Some(0), ..Default::default() };
        let err = zero.validate().unwrap_err();
        assert!(matches!(err, CoreError::InvalidFilter { field: "limit", .. }));
        assert_eq!(err.hint().as_deref(), Some("use a page size of at least 1"));
    }

    #[test]
    fn test_query_pairs_omit_blank_fields() {
        let criteria = FilterCriteria {
            kind: Some(TransactionType::Expense),
            category: Some("  ".to_string()),
            start_date: Some(date(2024, 1, 1)),
            search: Some("coffee".to_string()),
            limit: Some(50),
            offset: Some(0),
            ..Default::default()
        };
        let pairs = criteria.query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("type", "expense".to_string()),
                ("startDate", "2024-01-01".to_string()),
                ("search", "coffee".to_string()),
                ("limit", "50".to_string()),
                ("offset", "0".to_string()),
            ]
        );
    }

    #[test]
    fn test_patch_overlays_and_clears() {
        let held = FilterCriteria {
            kind: Some(TransactionType::Expense),
            search: Some("coffee".to_string()),
            start_date: Some(date(2024, 5, 1)),
            ..Default::default()
        };
        let merged = FilterPatch::new().category(Some("Food")).search(Some("")).apply_to(&held);
        assert_eq!(merged.kind, Some(TransactionType::Expense));
        assert_eq!(merged.category.as_deref(), Some("Food"));
        assert_eq!(merged.search, None);
        assert_eq!(merged.start_date, Some(date(2024, 5, 1)));

        let merged = FilterPatch::new().kind(None).dates(None, None).apply_to(&merged);
        assert_eq!(merged.kind, None);
        assert_eq!(merged.start_date, None);
        assert_eq!(merged.category.as_deref(), Some("Food"));
    }

    #[test]
    fn test_clearing_a_constraint_returns_to_first_page() {
        let mut state = FilterState::new(10);
        state.merge(&FilterPatch::new().kind(Some(TransactionType::Income))).unwrap();
        state.go_to_page(2).unwrap();

        let criteria = state.merge(&FilterPatch::new().kind(None)).unwrap();
        assert_eq!(criteria.kind, None);
        assert_eq!(criteria.offset, None);

        state.go_to_page(3).unwrap();
        let criteria = state.merge(&FilterPatch { limit: Some(5), ..Default::default() }).unwrap();
        assert_eq!(criteria.offset, Some(20));
    }

    #[test]
    fn test_quick_ranges() {
        // Thursday
        let today = date(2024, 5, 16);
        assert_eq!(QuickRange::Today.bounds(today), (today, today));
        assert_eq!(QuickRange::Week.start_date(today), date(2024, 5, 12));
        assert_eq!(QuickRange::Month.start_date(today), date(2024, 5, 1));
        assert_eq!(QuickRange::ThreeMonths.start_date(today), date(2024, 2, 1));
        assert_eq!(QuickRange::Year.start_date(today), date(2024, 1, 1));
        assert_eq!(QuickRange::ThreeMonths.start_date(date(2024, 2, 29)), date(2023, 11, 1));
        assert_eq!("3months".parse::<QuickRange>().unwrap(), QuickRange::ThreeMonths);
    }

    #[test]
    fn test_filter_state_paging() {
        let mut state = FilterState::new(25);
        assert_eq!(state.criteria().limit, Some(25));

        let criteria = state.go_to_page(3).unwrap();
        assert_eq!(criteria.offset, Some(50));
        assert!(state.go_to_page(0).is_err());

        // a new constraint returns to the first page
        let criteria = state
            .merge(&FilterPatch::new().kind(Some(TransactionType::Income)))
            .unwrap();
        assert_eq!(criteria.offset, None);
        assert!(state.has_active_filters());

        let criteria = state.clear();
        assert_eq!(criteria, FilterCriteria { limit: Some(25), ..Default::default() });
        assert!(!state.has_active_filters());
    }

    #[test]
    fn test_filter_state_replace() {
        let mut state = FilterState::new(10);
        let criteria = state
            .replace(FilterCriteria { search: Some(" tea ".to_string()), limit: Some(5), ..Default::default() })
            .unwrap();
        assert_eq!(criteria.search.as_deref(), Some("tea"));
        assert_eq!(criteria.limit, Some(5));
        assert!(state.replace(FilterCriteria { limit: Some(0), ..Default::default() }).is_err());
        assert_eq!(state.criteria().limit, Some(5));
    }

    #[test]
    fn test_filter_state_rejects_invalid_merge() {
        let mut state = FilterState::default();
        let result = state.merge(&FilterPatch::new().dates(Some(date(2024, 5, 2)), Some(date(2024, 5, 1))));
        assert!(result.is_err());
        assert!(!state.has_active_filters());
    }

    #[test]
    fn test_quick_range_sets_bounds() {
        let mut state = FilterState::default();
        let criteria = state.apply_quick_range(QuickRange::Month, date(2024, 5, 16));
        assert_eq!(criteria.start_date, Some(date(2024, 5, 1)));
        assert_eq!(criteria.end_date, Some(date(2024, 5, 16)));
    }
}
