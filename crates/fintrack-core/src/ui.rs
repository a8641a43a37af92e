//! Transient UI state: edit surface, form draft, sidebar and theme

use chrono::NaiveDate;
use fintrack_config::Theme;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};
use crate::models::{NewTransaction, Transaction, MAX_CATEGORY_LEN, MAX_DESCRIPTION_LEN};
use crate::types::TransactionType;

/// Category names offered for expenses
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Food & Dining",
    "Transportation",
    "Shopping",
    "Entertainment",
    "Bills & Utilities",
    "Healthcare",
    "Education",
    "Travel",
    "Other",
];

/// Category names offered for income
pub const INCOME_CATEGORIES: &[&str] = &["Salary", "Freelance", "Business", "Investment", "Gift", "Other"];

pub fn suggested_categories(kind: TransactionType) -> &'static [&'static str] {
    match kind {
        TransactionType::Income => INCOME_CATEGORIES,
        TransactionType::Expense => EXPENSE_CATEGORIES,
    }
}

/// What the edit surface is showing.
///
/// The edit target and the surface's visibility live in one value, so they
/// can never disagree.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FormSurface {
    #[default]
    Hidden,
    /// Visible with no target
    Create,
    /// Visible and targeting a transaction
    Edit(Transaction),
}

impl FormSurface {
    pub fn is_visible(&self) -> bool {
        !matches!(self, FormSurface::Hidden)
    }

    pub fn editing(&self) -> Option<&Transaction> {
        match self {
            FormSurface::Edit(transaction) => Some(transaction),
            _ => None,
        }
    }
}

fn validation(message: &str) -> CoreError {
    CoreError::Validation {
        message: message.to_string(),
    }
}

/// In-progress form input, kept as entered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionDraft {
    pub kind: Option<TransactionType>,
    pub amount: String,
    pub description: String,
    pub category: String,
    pub date: Option<NaiveDate>,
}

impl TransactionDraft {
    /// Empty draft dated `today`
    pub fn blank(today: NaiveDate) -> Self {
        Self {
            date: Some(today),
            ..Default::default()
        }
    }

    pub fn from_transaction(transaction: &Transaction) -> Self {
        Self {
            kind: Some(transaction.kind),
            amount: transaction.amount.normalize().to_string(),
            description: transaction.description.clone(),
            category: transaction.category.clone(),
            date: Some(transaction.date),
        }
    }

    /// Parse and check the draft as the form would before submitting
    pub fn parse(&self) -> CoreResult<NewTransaction> {
        let kind = self.kind.ok_or_else(|| validation("Transaction type is required"))?;

        let amount_text = self.amount.trim();
        if amount_text.is_empty() {
            return Err(validation("Amount is required"));
        }
        let amount = Decimal::from_str(amount_text).map_err(|_| validation("Amount must be a number"))?;
        if amount < Decimal::new(1, 2) {
            return Err(validation("Amount must be greater than 0"));
        }

        let description = self.description.trim();
        if description.is_empty() {
            return Err(validation("Description is required"));
        }
        if description.chars().count() > MAX_DESCRIPTION_LEN {
            return Err(validation("Description must be less than 255 characters"));
        }

        let category = self.category.trim();
        if category.is_empty() {
            return Err(validation("Category is required"));
        }
        if category.chars().count() > MAX_CATEGORY_LEN {
            return Err(validation("Category must be less than 50 characters"));
        }

        let date = self.date.ok_or_else(|| validation("Date is required"))?;

        let parsed = NewTransaction {
            kind,
            amount,
            description: description.to_string(),
            category: category.to_string(),
            date,
        };
        parsed.validate()?;
        Ok(parsed)
    }
}

/// Transient UI state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiState {
    surface: FormSurface,
    draft: Option<TransactionDraft>,
    sidebar_open: bool,
    theme: Theme,
}

impl UiState {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            ..Default::default()
        }
    }

    pub fn surface(&self) -> &FormSurface {
        &self.surface
    }

    pub fn editing(&self) -> Option<&Transaction> {
        self.surface.editing()
    }

    pub fn is_form_visible(&self) -> bool {
        self.surface.is_visible()
    }

    pub fn draft(&self) -> Option<&TransactionDraft> {
        self.draft.as_ref()
    }

    /// Target a transaction and show the surface with its values
    pub fn begin_edit(&mut self, transaction: Transaction) {
        self.draft = Some(TransactionDraft::from_transaction(&transaction));
        self.surface = FormSurface::Edit(transaction);
    }

    /// Show the surface for a new transaction
    pub fn begin_create(&mut self, today: NaiveDate) {
        self.draft = Some(TransactionDraft::blank(today));
        self.surface = FormSurface::Create;
    }

    /// Hide the surface, dropping the target and the draft
    pub fn end_edit(&mut self) {
        self.surface = FormSurface::Hidden;
        self.draft = None;
    }

    /// `Some` begins an edit, `None` ends it
    pub fn set_editing(&mut self, transaction: Option<Transaction>) {
        match transaction {
            Some(transaction) => self.begin_edit(transaction),
            None => self.end_edit(),
        }
    }

    /// Change the draft in place; ignored while the surface is hidden
    pub fn update_draft<F: FnOnce(&mut TransactionDraft)>(&mut self, change: F) -> bool {
        match self.draft.as_mut() {
            Some(draft) => {
                change(draft);
                true
            }
            None => false,
        }
    }

    pub fn sidebar_open(&self) -> bool {
        self.sidebar_open
    }

    pub fn set_sidebar_open(&mut self, open: bool) {
        self.sidebar_open = open;
    }

    pub fn toggle_sidebar(&mut self) -> bool {
        self.sidebar_open = !self.sidebar_open;
        self.sidebar_open
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }
}
