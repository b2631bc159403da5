//! erpchat CLI Entry Point
//!
//! Subcommands:
//! - `ask` - Answer one question for a company
//! - `chat` - Interactive question loop
//! - `run` - Run a named operation (e.g. `get_sales_summary`)
//! - `report` - CSV summary export
//! - `companies` - Companies available for selection
//! - `check` - Verify the database is reachable
//! - `tables` - Company-scoped tables, or one table's columns
//!
//! Answers go to stdout (plain text, or JSON envelopes with `--json`). Logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use dialoguer::{Input, Select};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use erpchat::company;
use erpchat::config::AppConfig;
use erpchat::llm::LlmClient;
use erpchat::output::{ErrorEnvelope, ErrorInfo, Metadata, SuccessEnvelope};
use erpchat::{report, schema};
use erpchat::{AppError, Answer, Assistant, CompanyId, ConnectionManager, Connector, DatabaseType};

const CONNECTION_CHECK_SQL: &str = "SELECT 1 AS test";
const EXIT_WORDS: [&str; 4] = ["exit", "quit", "bye", "q"];

/// erpchat - Natural-language ERP reporting assistant
#[derive(Parser)]
#[command(name = "erpchat")]
#[command(about = "Ask read-only business questions about an ERP database")]
#[command(version)]
struct Cli {
    /// Print JSON envelopes instead of plain text
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true, env = "ERPCHAT_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer a single question
    Ask {
        /// Company ID (prompted for when omitted)
        #[arg(short, long, env = "ERPCHAT_COMPANY")]
        company: Option<String>,

        /// The question, e.g. "show me sales summary"
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Interactive question loop
    Chat {
        #[arg(short, long, env = "ERPCHAT_COMPANY")]
        company: Option<String>,
    },

    /// Run a named operation
    Run {
        #[arg(short, long, env = "ERPCHAT_COMPANY")]
        company: Option<String>,

        /// Operation name, e.g. get_inventory_summary
        operation: String,
    },

    /// Export the sales, cash flow and inventory summary as CSV
    Report {
        #[arg(short, long, env = "ERPCHAT_COMPANY")]
        company: Option<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List companies available for selection
    Companies,

    /// Check that the database answers
    Check,

    /// List company-scoped tables
    Tables {
        /// Describe this table's columns instead
        #[arg(long)]
        table: Option<String>,
    },
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Ask { .. } => "ask",
            Self::Chat { .. } => "chat",
            Self::Run { .. } => "run",
            Self::Report { .. } => "report",
            Self::Companies => "companies",
            Self::Check => "check",
            Self::Tables { .. } => "tables",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.name();

    let outcome = match AppConfig::load() {
        Ok(config) => {
            init_tracing(config.log_level.as_deref(), cli.log_json);
            execute(&cli, &config).await
        }
        Err(e) => Err(e.into()),
    };

    match outcome {
        Ok(()) => Ok(()),
        Err(err) if cli.json => {
            let envelope = match err.downcast_ref::<AppError>() {
                Some(app) => ErrorEnvelope::from_error(command, app),
                None => ErrorEnvelope::new(
                    command,
                    ErrorInfo::new("INTERNAL_ERROR", format!("{err:#}")),
                ),
            };
            println!("{}", serde_json::to_string_pretty(&envelope)?);
            std::process::exit(1);
        }
        Err(err) => Err(err),
    }
}

fn init_tracing(level: Option<&str>, json: bool) {
    let filter =
        EnvFilter::try_new(level.unwrap_or("warn")).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

async fn execute(cli: &Cli, config: &AppConfig) -> anyhow::Result<()> {
    let db_config = config.connection_config()?;
    info!(engine = %db_config.engine, "starting");

    match db_config.engine {
        #[cfg(feature = "mysql")]
        DatabaseType::MySQL => {
            let connector = erpchat::engine::mysql::MySqlConnector::new(db_config)?;
            execute_with(connector, cli, config).await
        }
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => {
            let connector = erpchat::engine::sqlite::SqliteConnector::new(&db_config)?;
            execute_with(connector, cli, config).await
        }
        #[allow(unreachable_patterns)]
        other => Err(AppError::configuration(format!("{other} support is not compiled in")).into()),
    }
}

async fn execute_with<C: Connector>(
    connector: C,
    cli: &Cli,
    config: &AppConfig,
) -> anyhow::Result<()> {
    let db = ConnectionManager::with_policy(connector, config.retry.policy());
    let llm = LlmClient::from_config(&config.llm)?;
    let mut assistant = Assistant::new(db).with_llm(llm);
    let out = Printer {
        json: cli.json,
        command: cli.command.name(),
        started: Instant::now(),
    };

    let result = match &cli.command {
        Commands::Ask { company, question } => {
            let company = pick_company(&mut assistant, company.as_deref()).await?;
            let answer = assistant.ask(&company, &question.join(" ")).await;
            out.answer(&answer)
        }
        Commands::Chat { company } => {
            let company = pick_company(&mut assistant, company.as_deref()).await?;
            chat(&mut assistant, &company, &out).await
        }
        Commands::Run { company, operation } => {
            let company = pick_company(&mut assistant, company.as_deref()).await?;
            let answer = assistant.run(&company, operation).await;
            out.answer(&answer)
        }
        Commands::Report { company, output } => {
            let raw = pick_company(&mut assistant, company.as_deref()).await?;
            let company: CompanyId = raw.parse()?;
            let csv = report::generate(&mut assistant, company).await;
            match output {
                Some(path) => {
                    std::fs::write(path, &csv)
                        .with_context(|| format!("writing report to {}", path.display()))?;
                    let text =
                        format!("Report for company {company} written to {}", path.display());
                    out.data(Some(company), &serde_json::json!({ "path": path }), &text)
                }
                None => out.data(Some(company), &serde_json::json!({ "csv": csv }), csv.trim_end()),
            }
        }
        Commands::Companies => {
            let companies = company::list_companies(assistant.connection()).await;
            let text = companies.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n");
            out.data(None, &companies, &text)
        }
        Commands::Check => {
            let engine = assistant.connection().engine();
            assistant.connection().execute(CONNECTION_CHECK_SQL, &[]).await?;
            let text = format!("Connected to {engine} database");
            out.data(None, &serde_json::json!({ "connected": true, "engine": engine }), &text)
        }
        Commands::Tables { table: Some(table) } => {
            let columns = schema::describe_table(assistant.connection(), table).await?;
            let text = columns
                .iter()
                .map(|c| {
                    let key = if c.primary_key { " PRIMARY KEY" } else { "" };
                    let null = if c.nullable { "" } else { " NOT NULL" };
                    format!("{} {}{null}{key}", c.name, c.data_type)
                })
                .collect::<Vec<_>>()
                .join("\n");
            out.data(None, &columns, &text)
        }
        Commands::Tables { table: None } => {
            let tables = schema::company_tables(assistant.connection()).await?;
            out.data(None, &tables, &tables.join("\n"))
        }
    };

    assistant.connection().invalidate().await;
    result
}

/// Company from the flag, or picked from the companies list
async fn pick_company<C: Connector>(
    assistant: &mut Assistant<C>,
    given: Option<&str>,
) -> anyhow::Result<String> {
    if let Some(company) = given {
        return Ok(company.to_string());
    }

    let companies = company::list_companies(assistant.connection()).await;
    let labels: Vec<String> = companies.iter().map(|c| format!("Company {c}")).collect();
    let index = Select::new()
        .with_prompt("Select a company")
        .items(&labels)
        .default(0)
        .interact()
        .context("company selection")?;

    companies
        .get(index)
        .map(ToString::to_string)
        .ok_or_else(|| anyhow::anyhow!("no company selected"))
}

async fn chat<C: Connector>(
    assistant: &mut Assistant<C>,
    company: &str,
    out: &Printer,
) -> anyhow::Result<()> {
    if !out.json {
        println!("ERP assistant for company {company}. Type 'help' for ideas, 'exit' to leave.\n");
    }

    loop {
        let question: String = Input::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()
            .context("reading question")?;
        let question = question.trim();

        if question.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&question.to_lowercase().as_str()) {
            return Ok(());
        }

        let answer = assistant.ask(company, question).await;
        if let Err(e) = out.answer(&answer) {
            warn!(error = %e, "could not print answer");
        }
        if !out.json {
            println!();
        }
    }
}

/// Plain-text or envelope output for one command
struct Printer {
    json: bool,
    command: &'static str,
    started: Instant,
}

impl Printer {
    fn answer(&self, answer: &Answer) -> anyhow::Result<()> {
        self.data(answer.company_id, answer, &answer.text)
    }

    fn data<T: Serialize>(
        &self,
        company: Option<CompanyId>,
        data: &T,
        text: &str,
    ) -> anyhow::Result<()> {
        if !self.json {
            println!("{text}");
            return Ok(());
        }

        let elapsed = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let mut envelope = SuccessEnvelope::new(self.command, data, Metadata::new(elapsed));
        if let Some(company) = company {
            envelope = envelope.for_company(company);
        }
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        Ok(())
    }
}
