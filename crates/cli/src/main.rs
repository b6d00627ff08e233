use std::error::Error;

use api_types::{
    Money,
    account::{AccountType, AccountUpsert},
    analytics::DateRange,
    expense::{Category, ExpenseFilters, ExpenseNew},
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use financex_core::{Core, config::Settings, ledger::analytics};

mod prompt;
mod report;

type Result<T> = std::result::Result<T, Box<dyn Error + Send + Sync>>;

#[derive(Parser, Debug)]
#[command(name = "financex")]
#[command(about = "Track expenses and vaults on a FinanceX server")]
struct Cli {
    /// Settings file, TOML (also read from `FINANCEX_CONFIG`).
    #[arg(long, env = "FINANCEX_CONFIG")]
    config: Option<String>,
    #[arg(long)]
    base_url: Option<String>,
    /// Where the bearer credential is persisted.
    #[arg(long)]
    session_path: Option<String>,
    /// IANA timezone used for "today".
    #[arg(long)]
    timezone: Option<String>,
    /// Log level: error, warn, info, debug or trace.
    #[arg(long)]
    level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(base_url) = &self.base_url {
            settings.base_url = base_url.clone();
        }
        if let Some(session_path) = &self.session_path {
            settings.session_path = session_path.clone();
        }
        if let Some(timezone) = &self.timezone {
            settings.timezone = timezone.clone();
        }
        if let Some(level) = &self.level {
            settings.level = level.clone();
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in; the password comes from `FINANCEX_PASSWORD` or stdin.
    Login {
        #[arg(long)]
        email: String,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    Logout,
    Whoami,
    Expenses(Expenses),
    Vaults(Vaults),
    /// Category breakdown for a date range (default: this month).
    Analytics(AnalyticsArgs),
    /// Daily spending for the most recent days.
    Trend {
        #[arg(long)]
        days: Option<usize>,
    },
}

#[derive(Args, Debug)]
struct Expenses {
    #[command(subcommand)]
    command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
enum ExpenseCommand {
    List(ExpenseListArgs),
    Add(ExpenseAddArgs),
    Delete { id: String },
}

#[derive(Args, Debug)]
struct ExpenseListArgs {
    #[arg(long)]
    category: Option<String>,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    limit: Option<u32>,
}

#[derive(Args, Debug)]
struct ExpenseAddArgs {
    #[arg(long)]
    description: String,
    /// Major units, e.g. `12.50`.
    #[arg(long, allow_hyphen_values = true)]
    amount: Money,
    #[arg(long, default_value = Category::OTHER)]
    category: String,
    /// Vault id the expense is charged to.
    #[arg(long)]
    vault: String,
    /// Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct Vaults {
    #[command(subcommand)]
    command: VaultCommand,
}

#[derive(Subcommand, Debug)]
enum VaultCommand {
    List,
    Add(VaultArgs),
    Update {
        id: String,
        #[command(flatten)]
        vault: VaultArgs,
    },
    Delete {
        id: String,
    },
    /// Total and average balance across vaults.
    Summary,
}

#[derive(Args, Debug)]
struct VaultArgs {
    #[arg(long)]
    name: String,
    /// checking, savings, credit or cash.
    #[arg(long = "type", default_value = "checking")]
    kind: String,
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    balance: Money,
    #[arg(long, default_value = "USD")]
    currency: String,
}

impl From<VaultArgs> for AccountUpsert {
    fn from(args: VaultArgs) -> Self {
        AccountUpsert {
            name: args.name,
            kind: AccountType::from(args.kind),
            balance: args.balance,
            currency: args.currency,
        }
    }
}

#[derive(Args, Debug)]
struct AnalyticsArgs {
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Project from the downloaded expenses instead of asking the server.
    #[arg(long)]
    local: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref())?;
    cli.apply(&mut settings);

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "financex={level},financex_core={level}",
            level = settings.level
        ))
        .with_writer(std::io::stderr)
        .init();

    let core = Core::builder().settings(&settings)?.build()?;

    if let Err(err) = run(&core, cli.command, &settings).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run(core: &Core, command: Command, settings: &Settings) -> Result<()> {
    match command {
        Command::Login { email } => {
            let password = prompt::password()?;
            let user = core.session.login(&email, &password).await?;
            println!("signed in as {} <{}>", user.name, user.email);
        }
        Command::Register { name, email } => {
            let password = prompt::password()?;
            let user = core.session.register(&name, &email, &password).await?;
            println!("registered and signed in as {} <{}>", user.name, user.email);
        }
        Command::Logout => {
            core.session.logout();
            println!("signed out");
        }
        Command::Whoami => match core.session.bootstrap().await? {
            Some(user) => println!("{} <{}>", user.name, user.email),
            None => println!("not signed in"),
        },
        Command::Expenses(Expenses { command }) => {
            require_session(core).await?;
            expenses(core, command).await?;
        }
        Command::Vaults(Vaults { command }) => {
            require_session(core).await?;
            vaults(core, command).await?;
        }
        Command::Analytics(args) => {
            require_session(core).await?;
            let today = core.ledger.today();
            let range = match (args.from, args.to) {
                (None, None) => analytics::month_to_date(today),
                (from, to) => DateRange {
                    start_date: from,
                    end_date: to,
                },
            };
            let snapshot = if args.local {
                core.ledger.refresh_all().await?;
                core.ledger.refresh_local_analytics(range)
            } else {
                core.ledger.compute_analytics(range).await?
            };
            report::snapshot(&snapshot, today);
        }
        Command::Trend { days } => {
            require_session(core).await?;
            core.ledger.list_expenses(&ExpenseFilters::default()).await?;
            let days = days.unwrap_or(settings.trend_days);
            report::trend(&core.ledger.trend(days), core.ledger.today());
        }
    }
    Ok(())
}

async fn require_session(core: &Core) -> Result<()> {
    match core.session.bootstrap().await? {
        Some(_) => Ok(()),
        None => Err("not signed in, run `financex login` first".into()),
    }
}

async fn expenses(core: &Core, command: ExpenseCommand) -> Result<()> {
    match command {
        ExpenseCommand::List(args) => {
            let filters = ExpenseFilters {
                category: args.category.map(Category::new),
                start_date: args.from,
                end_date: args.to,
                limit: args.limit,
            };
            core.ledger.list_vaults().await?;
            core.ledger.list_expenses(&filters).await?;
            report::expenses(&core.ledger.snapshot());
        }
        ExpenseCommand::Add(args) => {
            let expense = core
                .ledger
                .add_expense(ExpenseNew {
                    description: args.description,
                    amount: args.amount,
                    category: Category::new(args.category),
                    account: args.vault,
                    date: args.date.unwrap_or_else(|| core.ledger.today()),
                })
                .await?;
            println!("added expense {} ({})", expense.id, expense.amount);
        }
        ExpenseCommand::Delete { id } => {
            core.ledger.delete_expense(&id).await?;
            println!("deleted expense {id}");
        }
    }
    Ok(())
}

async fn vaults(core: &Core, command: VaultCommand) -> Result<()> {
    match command {
        VaultCommand::List => {
            core.ledger.list_vaults().await?;
            report::vaults(&core.ledger.snapshot().vaults);
        }
        VaultCommand::Add(args) => {
            let vault = core.ledger.create_vault(args.into()).await?;
            println!("created vault {} ({})", vault.name, vault.id);
        }
        VaultCommand::Update { id, vault } => {
            let vault = core.ledger.update_vault(&id, vault.into()).await?;
            println!("updated vault {} ({})", vault.name, vault.id);
        }
        VaultCommand::Delete { id } => {
            core.ledger.delete_vault(&id).await?;
            println!("deleted vault {id}");
        }
        VaultCommand::Summary => {
            core.ledger.refresh_all().await?;
            report::summary(&core.ledger.snapshot(), core.ledger.month_total());
        }
    }
    Ok(())
}
