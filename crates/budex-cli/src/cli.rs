//! `budex` - read budget-execution data from the command line
//!
//! Every subcommand goes through the same pipeline the application uses
//! (`DataBuilder` over `Query`), but on the `try_*` surface so failures are
//! printed instead of swallowed.

mod logging;
mod output;

use anyhow::{Context, Result};
use budex_data::{
    CommandType, ConnectionBuilder, DataBuilder, DataConfig, DataContext, FilterArgs, Provider,
    Query, Source, SqlStatement, Value,
};
use clap::{Parser, Subcommand};
use output::Format;
use std::path::PathBuf;
use strum::IntoEnumIterator;

#[derive(Parser, Debug)]
#[command(name = "budex", version)]
#[command(about = "Query budget-execution data across SQLite, SQL Server and flat files", long_about = None)]
struct Cli {
    /// Connection configuration file (TOML)
    #[arg(long, global = true, env = "BUDEX_CONFIG")]
    config: Option<PathBuf>,

    /// Override the data directory from the configuration
    #[arg(long, global = true, env = "BUDEX_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Log more (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Also write JSON logs to the log directory
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read a registered source
    Query {
        /// Source name, e.g. Accounts
        source: Source,
        /// Provider the source is stored in
        #[arg(short, long)]
        provider: Provider,
        /// Equality filter pushed down as WHERE criteria (repeatable)
        #[arg(short = 'w', long = "where", value_name = "COL=VALUE", value_parser = parse_assignment)]
        criteria: Vec<(String, String)>,
        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,
        /// Show at most this many rows
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Read a CSV, Excel or database file directly
    File {
        path: PathBuf,
        /// Provider, inferred from the extension when omitted
        #[arg(short, long)]
        provider: Option<Provider>,
        /// Table or sheet to read instead of the file stem
        #[arg(long)]
        table: Option<String>,
        #[arg(short = 'w', long = "where", value_name = "COL=VALUE", value_parser = parse_assignment)]
        criteria: Vec<(String, String)>,
        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// List the distinct values of every text column of a source
    Elements {
        source: Source,
        #[arg(short, long)]
        provider: Provider,
        #[arg(short = 'w', long = "where", value_name = "COL=VALUE", value_parser = parse_assignment)]
        criteria: Vec<(String, String)>,
        #[arg(short, long, value_enum, default_value_t = Format::Table)]
        format: Format,
    },
    /// Print the statement a command would run, without running it
    Sql {
        source: Source,
        #[arg(short, long)]
        provider: Provider,
        /// SELECT, INSERT, UPDATE or DELETE
        #[arg(short, long, default_value = "SELECT")]
        command: CommandType,
        #[arg(short = 'w', long = "where", value_name = "COL=VALUE", value_parser = parse_assignment)]
        criteria: Vec<(String, String)>,
        /// Column value for INSERT and UPDATE (repeatable)
        #[arg(short, long, value_name = "COL=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },
    /// List providers with their engine, driver and connection string template
    Providers,
    /// List the registered sources
    Sources {
        /// Also show where each source lives for this provider
        #[arg(short, long)]
        provider: Option<Provider>,
    },
}

/// Parse `COL=VALUE`; the value may itself contain `=`
fn parse_assignment(input: &str) -> std::result::Result<(String, String), String> {
    let (column, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected COL=VALUE, got `{}`", input))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("missing column name in `{}`", input));
    }
    Ok((column.to_string(), value.to_string()))
}

/// `NULL` (unquoted, any case) is the null value, everything else is text
fn filter_args(pairs: Vec<(String, String)>) -> FilterArgs {
    pairs
        .into_iter()
        .map(|(column, value)| {
            let value = if value.eq_ignore_ascii_case("null") {
                Value::Null
            } else {
                Value::String(value)
            };
            (column, value)
        })
        .collect()
}

fn load_context(cli: &Cli) -> Result<DataContext> {
    let mut config = DataConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load the data configuration")?;
    if let Some(dir) = &cli.data_dir {
        config = config.set_data_dir(dir);
    }
    tracing::debug!(data_dir = %config.data_dir().display(), "using data directory");
    Ok(DataContext::new(config))
}

fn print_rows(builder: &DataBuilder, format: Format, limit: Option<usize>) -> Result<()> {
    match format {
        Format::Table => {
            println!("{}", output::render_table(builder.get_table(), limit));
            let shown = limit.map_or(builder.get_data().len(), |l| l.min(builder.get_data().len()));
            println!("{} of {} row(s)", shown, builder.get_data().len());
        }
        Format::Json => {
            let json = output::rows_to_json(builder.get_data(), limit);
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let ctx = load_context(&cli)?;

    match cli.command {
        Commands::Query {
            source,
            provider,
            criteria,
            format,
            limit,
        } => {
            let builder = DataBuilder::try_new(&ctx, source, provider, filter_args(criteria))
                .with_context(|| format!("Failed to read {} from {}", source, provider))?;
            print_rows(&builder, format, limit)?;
        }
        Commands::File {
            path,
            provider,
            table,
            criteria,
            format,
            limit,
        } => {
            let args = filter_args(criteria);
            let builder = match table {
                Some(table) => {
                    let connection = ConnectionBuilder::try_from_path(ctx.config(), &path, provider)?
                        .with_table(table);
                    let statement = SqlStatement::new(&connection, CommandType::Select, args)?;
                    DataBuilder::try_from_query(Query::try_from_parts(&ctx, connection, statement)?)
                }
                None => DataBuilder::try_from_path(&ctx, &path, provider, args),
            }
            .with_context(|| format!("Failed to read {}", path.display()))?;
            print_rows(&builder, format, limit)?;
        }
        Commands::Elements {
            source,
            provider,
            criteria,
            format,
        } => {
            let builder = DataBuilder::try_new(&ctx, source, provider, filter_args(criteria))
                .with_context(|| format!("Failed to read {} from {}", source, provider))?;
            match format {
                Format::Table => {
                    println!("{}", output::render_elements(builder.program_elements()))
                }
                Format::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&output::elements_to_json(
                        builder.program_elements()
                    ))?
                ),
            }
        }
        Commands::Sql {
            source,
            provider,
            command,
            criteria,
            set,
        } => {
            let connection = ConnectionBuilder::try_from_source(ctx.config(), source, provider)?;
            let criteria = filter_args(criteria);
            let statement = match command {
                CommandType::Update => SqlStatement::update(&connection, filter_args(set), criteria)?,
                CommandType::Insert => {
                    SqlStatement::new(&connection, CommandType::Insert, filter_args(set))?
                }
                CommandType::Select | CommandType::Delete => {
                    SqlStatement::new(&connection, command, criteria)?
                }
            };

            println!("{}", statement.text());
            for (index, value) in statement.params().iter().enumerate() {
                println!(
                    "  {} = {}",
                    statement.engine().placeholder(index + 1),
                    value.to_sql_literal()
                );
            }
            println!("-- {}", statement);
        }
        Commands::Providers => {
            let rows = Provider::iter()
                .filter(|p| *p != Provider::None)
                .map(|provider| {
                    let engine = provider.engine();
                    let driver = engine.map(|e| e.driver_id()).unwrap_or("-");
                    let available = if ctx.drivers().has(driver) { "yes" } else { "no" };
                    vec![
                        provider.to_string(),
                        engine.map(|e| e.to_string()).unwrap_or_default(),
                        driver.to_string(),
                        available.to_string(),
                        ctx.config().template(provider).unwrap_or_default().to_string(),
                    ]
                })
                .collect();
            println!(
                "{}",
                output::render_listing(
                    &["Provider", "Engine", "Driver", "Available", "Template"],
                    rows
                )
            );
        }
        Commands::Sources { provider } => {
            let rows = Source::iter()
                .filter(|s| !s.is_external())
                .map(|source| {
                    let location = provider
                        .and_then(|p| ctx.config().database_path(source, p))
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    vec![
                        source.to_string(),
                        source.table_name().to_string(),
                        location,
                    ]
                })
                .collect();
            println!(
                "{}",
                output::render_listing(&["Source", "Table", "Location"], rows)
            );
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(logging::LoggingConfig::for_cli(cli.verbose, cli.json_logs))?;
    run(cli)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn assignments_split_on_the_first_equals() {
        assert_eq!(
            parse_assignment("Code=6100"),
            Ok(("Code".to_string(), "6100".to_string()))
        );
        assert_eq!(
            parse_assignment("Note=a=b"),
            Ok(("Note".to_string(), "a=b".to_string()))
        );
        assert_eq!(
            parse_assignment("Name="),
            Ok(("Name".to_string(), String::new()))
        );
        assert!(parse_assignment("Code").is_err());
        assert!(parse_assignment("=6100").is_err());
    }

    #[test]
    fn null_is_the_only_special_value() {
        let args = filter_args(vec![
            ("A".into(), "NULL".into()),
            ("B".into(), "nullable".into()),
        ]);
        assert_eq!(args["A"], Value::Null);
        assert_eq!(args["B"], Value::from("nullable"));
    }

    #[test]
    fn query_arguments_parse() {
        let cli = Cli::try_parse_from([
            "budex", "query", "accounts", "-p", "sqlite", "-w", "Code=6100", "--where",
            "Name=Payroll", "--format", "json",
        ])
        .unwrap();
        match cli.command {
            Commands::Query {
                source,
                provider,
                criteria,
                format,
                limit,
            } => {
                assert_eq!(source, Source::Accounts);
                assert_eq!(provider, Provider::Sqlite);
                assert_eq!(criteria.len(), 2);
                assert_eq!(criteria[1], ("Name".to_string(), "Payroll".to_string()));
                assert_eq!(format, Format::Json);
                assert_eq!(limit, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn sql_defaults_to_select() {
        let cli = Cli::try_parse_from(["budex", "sql", "Funds", "--provider", "CSV"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Sql {
                command: CommandType::Select,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["budex", "sql", "Funds", "-p", "Oracle"]).is_err());
    }
}
