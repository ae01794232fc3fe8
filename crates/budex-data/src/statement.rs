//! Parameterized SQL statements

use budex_core::{BudexError, Engine, Result, Value};
use indexmap::IndexMap;
use strum::{Display, EnumString};

use crate::ConnectionBuilder;

/// Ordered column → value equality predicates, joined by `AND`.
///
/// Keys are not checked against the table. A wrong key surfaces as an
/// execution error or an empty result.
pub type FilterArgs = IndexMap<String, Value>;

/// Kind of statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum CommandType {
    Select,
    Insert,
    Update,
    Delete,
}

/// One statement against one table.
///
/// `text` is what the engine executes, with placeholders for every value in
/// `params`. [`Display`](std::fmt::Display) renders the same statement with
/// literals inlined, for logs and the command line only.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    command_type: CommandType,
    engine: Engine,
    table_name: String,
    criteria: FilterArgs,
    values: FilterArgs,
    text: String,
    params: Vec<Value>,
}

/// `"name"`, with embedded quotes doubled
pub(crate) fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Numbers placeholders across the whole statement
struct Placeholders {
    engine: Engine,
    next: usize,
}

impl Placeholders {
    fn new(engine: Engine) -> Self {
        Self { engine, next: 1 }
    }

    fn next(&mut self) -> String {
        let placeholder = self.engine.placeholder(self.next);
        self.next += 1;
        placeholder
    }
}

/// `WHERE "A" = ? AND "B" IS NULL`, pushing bound values onto `params`
fn where_clause(criteria: &FilterArgs, placeholders: &mut Placeholders, params: &mut Vec<Value>) -> String {
    if criteria.is_empty() {
        return String::new();
    }
    let predicates: Vec<String> = criteria
        .iter()
        .map(|(column, value)| {
            if value.is_null() {
                format!("{} IS NULL", quote_identifier(column))
            } else {
                params.push(value.clone());
                format!("{} = {}", quote_identifier(column), placeholders.next())
            }
        })
        .collect();
    format!(" WHERE {}", predicates.join(" AND "))
}

fn literal_where(criteria: &FilterArgs) -> String {
    if criteria.is_empty() {
        return String::new();
    }
    let predicates: Vec<String> = criteria
        .iter()
        .map(|(column, value)| {
            if value.is_null() {
                format!("{} IS NULL", column)
            } else {
                format!("{} = {}", column, value.to_sql_literal())
            }
        })
        .collect();
    format!(" WHERE {}", predicates.join(" AND "))
}

impl SqlStatement {
    /// SELECT, INSERT or DELETE against the descriptor's table.
    ///
    /// For SELECT and DELETE `args` are the `WHERE` criteria; for INSERT they
    /// are the column values. UPDATE needs assignments and criteria, see
    /// [`Self::update`].
    pub fn new(builder: &ConnectionBuilder, command_type: CommandType, args: FilterArgs) -> Result<Self> {
        let engine = builder.engine();
        let table = builder.table_name();
        match command_type {
            CommandType::Select | CommandType::Delete => {
                let mut placeholders = Placeholders::new(engine);
                let mut params = Vec::with_capacity(args.len());
                let verb = match command_type {
                    CommandType::Select => "SELECT * FROM",
                    _ => "DELETE FROM",
                };
                let text = format!(
                    "{} {}{}",
                    verb,
                    quote_identifier(table),
                    where_clause(&args, &mut placeholders, &mut params)
                );
                if command_type == CommandType::Delete && args.is_empty() {
                    tracing::warn!(table = %table, "DELETE without criteria removes every row");
                }
                Ok(Self {
                    command_type,
                    engine,
                    table_name: table.to_string(),
                    criteria: args,
                    values: FilterArgs::new(),
                    text,
                    params,
                })
            }
            CommandType::Insert => {
                if args.is_empty() {
                    return Err(BudexError::Query(format!(
                        "INSERT into {} needs at least one column value",
                        table
                    )));
                }
                let mut placeholders = Placeholders::new(engine);
                let columns: Vec<String> = args.keys().map(|c| quote_identifier(c)).collect();
                let markers: Vec<String> = args.keys().map(|_| placeholders.next()).collect();
                let text = format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    quote_identifier(table),
                    columns.join(", "),
                    markers.join(", ")
                );
                let params = args.values().cloned().collect();
                Ok(Self {
                    command_type,
                    engine,
                    table_name: table.to_string(),
                    criteria: FilterArgs::new(),
                    values: args,
                    text,
                    params,
                })
            }
            CommandType::Update => Err(BudexError::Query(format!(
                "UPDATE of {} needs assignments; build it with SqlStatement::update",
                table
            ))),
        }
    }

    /// `UPDATE ... SET values WHERE criteria`
    pub fn update(builder: &ConnectionBuilder, values: FilterArgs, criteria: FilterArgs) -> Result<Self> {
        let engine = builder.engine();
        let table = builder.table_name();
        if values.is_empty() {
            return Err(BudexError::Query(format!(
                "UPDATE of {} needs at least one assignment",
                table
            )));
        }

        let mut placeholders = Placeholders::new(engine);
        let mut params: Vec<Value> = Vec::with_capacity(values.len() + criteria.len());
        let assignments: Vec<String> = values
            .iter()
            .map(|(column, value)| {
                params.push(value.clone());
                format!("{} = {}", quote_identifier(column), placeholders.next())
            })
            .collect();
        let text = format!(
            "UPDATE {} SET {}{}",
            quote_identifier(table),
            assignments.join(", "),
            where_clause(&criteria, &mut placeholders, &mut params)
        );

        Ok(Self {
            command_type: CommandType::Update,
            engine,
            table_name: table.to_string(),
            criteria,
            values,
            text,
            params,
        })
    }

    pub fn command_type(&self) -> CommandType {
        self.command_type
    }

    pub fn engine(&self) -> Engine {
        self.engine
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// `WHERE` criteria
    pub fn criteria(&self) -> &FilterArgs {
        &self.criteria
    }

    /// Column values of an INSERT or assignments of an UPDATE
    pub fn values(&self) -> &FilterArgs {
        &self.values
    }

    /// SQL with placeholders, as executed
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Values bound to the placeholders, in order
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn parameter_count(&self) -> usize {
        self.params.len()
    }
}

impl std::fmt::Display for SqlStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = quote_identifier(&self.table_name);
        match self.command_type {
            CommandType::Select => {
                write!(f, "SELECT * FROM {}{}", table, literal_where(&self.criteria))
            }
            CommandType::Delete => {
                write!(f, "DELETE FROM {}{}", table, literal_where(&self.criteria))
            }
            CommandType::Insert => {
                let columns: Vec<&str> = self.values.keys().map(String::as_str).collect();
                let literals: Vec<String> =
                    self.values.values().map(Value::to_sql_literal).collect();
                write!(
                    f,
                    "INSERT INTO {} ({}) VALUES ({})",
                    table,
                    columns.join(", "),
                    literals.join(", ")
                )
            }
            CommandType::Update => {
                let assignments: Vec<String> = self
                    .values
                    .iter()
                    .map(|(column, value)| format!("{} = {}", column, value.to_sql_literal()))
                    .collect();
                write!(
                    f,
                    "UPDATE {} SET {}{}",
                    table,
                    assignments.join(", "),
                    literal_where(&self.criteria)
                )
            }
        }
    }
}
