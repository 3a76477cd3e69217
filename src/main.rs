//! mysql-handler CLI - run cleaned, typed CRUD statements against MySQL.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use mysql_handler::{
    init_logging, ConfigLoader, Database, FetchMode, Operator, Record, TypeHint,
};
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "mysql-handler")]
#[command(about = "Typed, escaped CRUD helpers for MySQL")]
#[command(version)]
struct Cli {
    /// Path to a TOML/YAML/JSON configuration file
    #[arg(short, long, env = "MYSQL_HANDLER_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, overrides the configured level (e.g. debug, mysql_handler=trace)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RecordArgs {
    /// Target table
    #[arg(long)]
    table: String,

    /// Type hints separated by '|', e.g. "str|int|email"
    #[arg(long)]
    types: Option<String>,

    /// Column values as COLUMN=VALUE
    #[arg(value_name = "COLUMN=VALUE")]
    columns: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Select rows matching every given column
    Select {
        #[command(flatten)]
        record: RecordArgs,

        /// Join conditions with OR instead of AND
        #[arg(long)]
        or: bool,

        /// Maximum number of rows to print
        #[arg(long)]
        limit: Option<usize>,

        /// Row shape: assoc, num or both
        #[arg(long, default_value = "both")]
        mode: String,
    },

    /// Report whether a matching row exists
    Exists {
        #[command(flatten)]
        record: RecordArgs,

        /// Join conditions with OR instead of AND
        #[arg(long)]
        or: bool,
    },

    /// Insert one row
    Insert {
        #[command(flatten)]
        record: RecordArgs,
    },

    /// Update rows matching the --where conditions
    Update {
        #[command(flatten)]
        record: RecordArgs,

        /// Condition as COLUMN=VALUE, joined with AND
        #[arg(long = "where", value_name = "COLUMN=VALUE", required = true)]
        conditions: Vec<String>,
    },

    /// Delete rows matching every given column
    Delete {
        #[command(flatten)]
        record: RecordArgs,
    },

    /// Print the cleaned and escaped values without running a statement
    Escape {
        #[command(flatten)]
        record: RecordArgs,
    },
}

fn parse_pair(pair: &str) -> Result<(String, String)> {
    match pair.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), value.to_string()))
        }
        _ => bail!("Expected COLUMN=VALUE, got {:?}", pair),
    }
}

fn pairs_to_record(record: Record, pairs: &[String]) -> Result<Record> {
    pairs.iter().try_fold(record, |record, pair| {
        let (column, value) = parse_pair(pair)?;
        Ok(record.field(column, value))
    })
}

impl RecordArgs {
    fn into_record(self) -> Result<Record> {
        let mut record = pairs_to_record(Record::table(self.table), &self.columns)?;
        if let Some(types) = &self.types {
            record = record.with_hints(TypeHint::parse_list(types)?);
        }
        Ok(record)
    }
}

fn operator(or: bool) -> Operator {
    if or {
        Operator::Or
    } else {
        Operator::And
    }
}

async fn run_command(db: &mut Database, command: Commands) -> Result<serde_json::Value> {
    let output = match command {
        Commands::Select {
            record,
            or,
            limit,
            mode,
        } => {
            let rows = db.select(record.into_record()?, operator(or)).await?;
            let rows = rows.fetch(limit.unwrap_or(usize::MAX), FetchMode::parse(&mode));
            json!(rows.iter().map(|row| row.to_json()).collect::<Vec<_>>())
        }
        Commands::Exists { record, or } => {
            json!({ "exists": db.exists(record.into_record()?, operator(or)).await? })
        }
        Commands::Insert { record } => json!(db.insert(record.into_record()?).await?),
        Commands::Update { record, conditions } => {
            let conditions = pairs_to_record(Record::new(), &conditions)?;
            json!(db.update(record.into_record()?, conditions).await?)
        }
        Commands::Delete { record } => json!(db.delete(record.into_record()?).await?),
        Commands::Escape { record } => {
            let escaped = db.escape(record.into_record()?)?;
            let columns: serde_json::Map<String, serde_json::Value> = escaped
                .columns()
                .iter()
                .map(|(name, value)| (name.clone(), json!(value)))
                .collect();
            json!({ "table": escaped.table(), "columns": columns })
        }
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.as_ref().map(|p| p.to_string_lossy().into_owned());
    let mut config = ConfigLoader::new()
        .load_from_file(config_path.as_deref())
        .load_from_env()
        .build()
        .context("Failed to load configuration")?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    let _guard = init_logging(&config.logging)?;

    let mut db = Database::connect(&config.database)
        .await
        .context("Failed to connect to MySQL")?;
    info!(database = %config.database.database, "Connected");

    let result = run_command(&mut db, cli.command).await;
    db.close().await.context("Failed to close connection")?;

    let output = result?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
