//! fintrack command-line entry point

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use fintrack_config::{Config, ConfigError};
use fintrack_core::{
    CoreError, ExportFormat, FilterCriteria, NotificationKind, Outcome, QuickRange, Tracker, Transaction, TransactionType,
};
use fintrack_http::HttpTransactionService;
use fintrack_utils::format_amount;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "fintrack")]
#[command(version = "0.1.0")]
#[command(about = "Track income and expenses against a transaction service", long_about = None)]
struct Cli {
    /// Configuration file path; built-in defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List transactions matching the given filters
    List(ListArgs),
    /// Show a single transaction
    Show { id: String },
    /// Record a new transaction
    Add(DraftArgs),
    /// Change fields of an existing transaction
    Edit {
        id: String,
        #[command(flatten)]
        fields: DraftArgs,
    },
    /// Delete a transaction
    Delete { id: String },
    /// Income, expense and balance totals
    Summary,
    /// Category breakdowns and monthly trends
    Analytics,
    /// Known category names
    Categories {
        #[arg(long = "type")]
        kind: Option<TransactionType>,
    },
    /// Export the listed transactions as CSV or JSON
    Export {
        #[command(flatten)]
        filters: ListArgs,
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
        /// Output file; `-` writes to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a default configuration file
    InitConfig,
}

#[derive(Args, Debug, Clone)]
struct ListArgs {
    #[arg(long = "type")]
    kind: Option<TransactionType>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Case-insensitive text matched against description and category
    #[arg(long)]
    search: Option<String>,
    /// today, week, month, 3months or year; overrides --from/--to
    #[arg(long)]
    range: Option<QuickRange>,
    /// 1-based page number
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    limit: Option<u32>,
}

impl ListArgs {
    /// Criteria for one list request; `page_size` applies when no limit is given
    fn criteria(&self, today: NaiveDate, page_size: u32) -> FilterCriteria {
        let (start_date, end_date) = match self.range {
            Some(range) => {
                let (start, end) = range.bounds(today);
                (Some(start), Some(end))
            }
            None => (self.from, self.to),
        };
        let limit = self.limit.unwrap_or(page_size);
        FilterCriteria {
            kind: self.kind,
            category: self.category.clone(),
            start_date,
            end_date,
            search: self.search.clone(),
            limit: Some(limit),
            offset: self.page.map(|page| page.saturating_sub(1).saturating_mul(limit)),
        }
    }
}

#[derive(Args, Debug, Clone)]
struct DraftArgs {
    #[arg(long = "type")]
    kind: Option<TransactionType>,
    #[arg(long)]
    amount: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    date: Option<NaiveDate>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Command::InitConfig = cli.command {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let config = match load_config(cli.config.clone()) {
        Ok(config) => config,
        Err(error) => {
            if let Some(hint) = error.hint() {
                eprintln!("hint: {}", hint);
            }
            return Err(error.into());
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.level.as_str()))
        .init();
    log::debug!("Using transaction service at {}", config.api.base_url);

    let rt = Runtime::new()?;
    rt.block_on(async {
        let service = Arc::new(HttpTransactionService::from_config(&config.api)?);
        let tracker = Tracker::from_config(service, &config);
        let result = run(&tracker, cli.command).await;
        print_notifications(&tracker);
        if let Some(hint) = result.as_ref().err().and_then(|e| e.downcast_ref::<CoreError>()).and_then(CoreError::hint) {
            eprintln!("hint: {}", hint);
        }
        result
    })
}

/// Built-in defaults or the given file, then environment overrides
fn load_config(path: Option<PathBuf>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

async fn run(tracker: &Tracker, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List(args) => {
            load_list(tracker, &args).await?;
            print_transactions(&tracker.transactions());
            let pagination = tracker.pagination();
            println!(
                "Page {} of {} ({} transactions)",
                pagination.current_page(),
                tracker.total_pages().max(1),
                pagination.total
            );
            let stats = tracker.stats();
            println!(
                "Listed income {} / expenses {}",
                format_amount(stats.total_income, 2),
                format_amount(stats.total_expenses, 2)
            );
        }
        Command::Show { id } => {
            let transaction = tracker.get(&id).await?;
            print_transactions(std::slice::from_ref(&transaction));
        }
        Command::Add(fields) => {
            tracker.begin_create();
            tracker.update_draft(|draft| fields.apply(draft));
            let created = tracker.submit_form().await?;
            println!("Created {}", created.id);
        }
        Command::Edit { id, fields } => {
            let current = tracker.get(&id).await?;
            tracker.begin_edit(current);
            tracker.update_draft(|draft| fields.apply(draft));
            let updated = tracker.submit_form().await?;
            print_transactions(std::slice::from_ref(&updated));
        }
        Command::Delete { id } => {
            tracker.delete(&id).await?;
        }
        Command::Summary => {
            if let Outcome::Applied(summary) = tracker.refresh_summary().await? {
                println!("Income:       {:>14}", format_amount(summary.total_income, 2));
                println!("Expenses:     {:>14}", format_amount(summary.total_expenses, 2));
                println!("Balance:      {:>14}", format_amount(summary.balance, 2));
                println!("Transactions: {:>14}", summary.transaction_count);
            }
        }
        Command::Analytics => {
            if let Outcome::Applied(analytics) = tracker.refresh_analytics().await? {
                if analytics.is_empty() {
                    println!("No analytics available");
                    return Ok(());
                }
                println!("Expenses by category");
                for entry in &analytics.expense_breakdown {
                    println!("  {:<20} {:>12} ({})", entry.category, format_amount(entry.amount, 2), entry.count);
                }
                println!("Income by category");
                for entry in &analytics.income_breakdown {
                    println!("  {:<20} {:>12} ({})", entry.category, format_amount(entry.amount, 2), entry.count);
                }
                println!("Monthly trends");
                for (month, bucket) in &analytics.monthly_trends {
                    println!(
                        "  {}  +{:>12}  -{:>12}",
                        month,
                        format_amount(bucket.income, 2),
                        format_amount(bucket.expense, 2)
                    );
                }
            }
        }
        Command::Categories { kind } => {
            match tracker.load_categories(kind).await {
                Ok(_) => {
                    for category in tracker.categories() {
                        println!("{}", category);
                    }
                }
                Err(error) => bail!(error.user_message("Failed to fetch categories")),
            }
        }
        Command::Export { filters, format, output } => {
            load_list(tracker, &filters).await?;
            let content = tracker.export(format)?;
            match output {
                Some(path) if path.as_os_str() == "-" => print!("{}", content),
                output => {
                    let path = output.unwrap_or_else(|| PathBuf::from(format.file_name(Local::now().date_naive())));
                    std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
                    println!("Exported {} transactions to {}", tracker.transactions().len(), path.display());
                }
            }
        }
        Command::InitConfig => print!("{}", Config::generate_default()),
    }
    Ok(())
}

/// Load the list named by the arguments into the tracker
async fn load_list(tracker: &Tracker, args: &ListArgs) -> anyhow::Result<()> {
    if args.page == Some(0) {
        bail!("Pages are numbered from 1");
    }
    let criteria = args.criteria(Local::now().date_naive(), tracker.options().page_size);
    if let Some(range) = args.range {
        log::debug!("Listing {}", range.description());
    }
    tracker.list(criteria).await?;
    Ok(())
}

impl DraftArgs {
    fn apply(&self, draft: &mut fintrack_core::TransactionDraft) {
        if let Some(kind) = self.kind {
            draft.kind = Some(kind);
        }
        if let Some(amount) = &self.amount {
            draft.amount = amount.clone();
        }
        if let Some(description) = &self.description {
            draft.description = description.clone();
        }
        if let Some(category) = &self.category {
            draft.category = category.clone();
        }
        if let Some(date) = self.date {
            draft.date = Some(date);
        }
    }
}

fn print_transactions(transactions: &[Transaction]) {
    if transactions.is_empty() {
        println!("No transactions found");
        return;
    }
    for tx in transactions {
        println!(
            "{:<26} {}  {:>12}  {:<16} {}",
            tx.id,
            tx.date,
            format_amount(tx.signed_amount(), 2),
            tx.category,
            tx.description
        );
    }
}

fn print_notifications(tracker: &Tracker) {
    for notification in tracker.notifications() {
        let label = match notification.kind {
            NotificationKind::Success => "ok",
            NotificationKind::Error => "error",
            NotificationKind::Warning => "warning",
            NotificationKind::Info => "info",
        };
        eprintln!("[{}] {}", label, notification.message);
    }
    tracker.clear_notifications();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list_args() -> ListArgs {
        ListArgs {
            kind: None,
            category: None,
            from: None,
            to: None,
            search: None,
            range: None,
            page: None,
            limit: None,
        }
    }

    #[test]
    fn test_criteria_paging() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 16).unwrap();
        let args = ListArgs { page: Some(3), ..list_args() };
        let criteria = args.criteria(today, 20);
        assert_eq!(criteria.limit, Some(20));
        assert_eq!(criteria.offset, Some(40));

        let args = ListArgs { page: Some(u32::MAX), limit: Some(u32::MAX), ..list_args() };
        assert_eq!(args.criteria(today, 20).offset, Some(u32::MAX));
    }

    #[test]
    fn test_criteria_range_overrides_dates() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 16).unwrap();
        let args = ListArgs {
            from: NaiveDate::from_ymd_opt(2020, 1, 1),
            range: Some(QuickRange::Month),
            ..list_args()
        };
        let criteria = args.criteria(today, 50);
        assert_eq!(criteria.start_date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(criteria.end_date, Some(today));
        assert_eq!(criteria.offset, None);
    }
}
