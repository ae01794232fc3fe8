//! Integration tests for Query sessions, commands and adapters

mod common;

use budex_data::{
    AdapterBuilder, AdapterKind, BudexError, ColumnKind, CommandBehavior, CommandBuilder,
    CommandFactory, CommandType, ConnectionBuilder, ConnectionFactory, ConnectionState, DataColumn,
    DataTable, FilterArgs, MissingMappingAction, MissingSchemaAction, Provider, Query, QueryState,
    RowState, Source, SqlStatement, Value,
};
use common::{args, budget_fixture};
use pretty_assertions::assert_eq;

fn accounts_builder(fx: &common::Fixture) -> ConnectionBuilder {
    ConnectionBuilder::try_from_source(fx.ctx.config(), Source::Accounts, Provider::Sqlite)
        .unwrap()
}

#[test]
fn dispose_is_idempotent_and_closes_the_connection() {
    let fx = budget_fixture();
    let mut query =
        Query::try_new(&fx.ctx, Source::Accounts, Provider::Sqlite, FilterArgs::new()).unwrap();
    assert_eq!(query.state(), QueryState::Constructed);

    query.connection().open().unwrap();
    assert_eq!(query.connection().state(), ConnectionState::Open);

    let table = query.try_get_table().unwrap();
    assert_eq!(table.row_count(), 1);
    assert_eq!(query.state(), QueryState::Active);
    // The fill leaves an already-open connection open
    assert_eq!(query.connection().state(), ConnectionState::Open);

    let connection = query.connection().clone();
    query.dispose();
    query.dispose();
    assert_eq!(query.state(), QueryState::Disposed);
    assert_eq!(connection.state(), ConnectionState::Closed);

    assert!(matches!(
        query.try_get_table(),
        Err(BudexError::InvalidState(_))
    ));
    assert!(matches!(
        query.try_get_data_reader(None, CommandBehavior::Default),
        Err(BudexError::InvalidState(_))
    ));
    assert!(query.get_table().is_none());
    assert_eq!(fx.sink.count(), 1);
}

#[test]
fn fill_restores_a_closed_connection() {
    let fx = budget_fixture();
    let query =
        Query::try_new(&fx.ctx, Source::Accounts, Provider::Sqlite, FilterArgs::new()).unwrap();

    query.try_get_table().unwrap();
    assert_eq!(query.connection().state(), ConnectionState::Closed);
}

#[test]
fn reader_closes_its_connection_when_asked() {
    let fx = budget_fixture();
    let query = Query::try_new(
        &fx.ctx,
        Source::Obligations,
        Provider::Sqlite,
        args(&[("FundCode", "B")]),
    )
    .unwrap();

    let reader = query
        .try_get_data_reader(None, CommandBehavior::Default)
        .unwrap();
    assert_eq!(reader.get_ordinal("fundcode"), Some(1));
    assert_eq!(reader.count(), 3);
    assert_eq!(query.connection().state(), ConnectionState::Open);

    let mut reader = query
        .try_get_data_reader(None, CommandBehavior::CloseConnection)
        .unwrap();
    assert!(reader.next().is_some());
    reader.close();
    assert!(reader.is_closed());
    assert!(reader.next().is_none());
    assert_eq!(query.connection().state(), ConnectionState::Closed);

    let single: Vec<_> = query
        .try_get_data_reader(None, CommandBehavior::SingleRow)
        .unwrap()
        .collect();
    assert_eq!(single.len(), 1);
}

#[test]
fn failed_read_closes_the_connection() {
    let fx = budget_fixture();
    let query = Query::try_new(
        &fx.ctx,
        Source::Accounts,
        Provider::Sqlite,
        args(&[("Missing", "x")]),
    )
    .unwrap();

    let err = query
        .try_get_data_reader(None, CommandBehavior::Default)
        .unwrap_err();
    assert!(matches!(err, BudexError::Query(_)));
    assert_eq!(query.connection().state(), ConnectionState::Closed);
}

#[test]
fn writes_run_through_their_own_commands() {
    let fx = budget_fixture();
    let builder = accounts_builder(&fx);

    let insert = SqlStatement::new(
        &builder,
        CommandType::Insert,
        args(&[("Code", "6400"), ("Name", "O'Brien Services")]),
    )
    .unwrap();
    let query = Query::try_from_parts(&fx.ctx, builder.clone(), insert).unwrap();
    assert_eq!(query.try_execute().unwrap(), 1);
    assert!(query.adapter().is_err());

    let mut values = FilterArgs::new();
    values.insert("Amount".into(), Value::Float64(0.0));
    let update = SqlStatement::update(&builder, values, args(&[("ProgramAreaCode", "OA")])).unwrap();
    let query = Query::try_from_parts(&fx.ctx, builder.clone(), update).unwrap();
    assert_eq!(query.try_execute().unwrap(), 1);

    let delete = SqlStatement::new(&builder, CommandType::Delete, args(&[("Code", "6400")])).unwrap();
    let query = Query::try_from_parts(&fx.ctx, builder.clone(), delete).unwrap();
    assert_eq!(query.try_execute().unwrap(), 1);

    let select = SqlStatement::new(&builder, CommandType::Select, FilterArgs::new()).unwrap();
    let query = Query::try_from_parts(&fx.ctx, builder, select).unwrap();
    assert!(matches!(query.try_execute(), Err(BudexError::Query(_))));
    let table = query.try_get_table().unwrap();
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.row(0).unwrap().get_by_name("Amount"), Some(&Value::Float64(0.0)));
}

#[test]
fn command_factory_checks_statement_kind() {
    let fx = budget_fixture();
    let builder = accounts_builder(&fx);
    let connection = ConnectionFactory::new(&fx.ctx, &builder)
        .unwrap()
        .get_connection();
    assert_eq!(connection.state(), ConnectionState::Closed);

    let delete = SqlStatement::new(&builder, CommandType::Delete, args(&[("Code", "x")])).unwrap();
    let factory = CommandFactory::new(connection.clone());
    assert!(factory.delete_command(&delete).is_ok());
    assert!(matches!(
        factory.select_command(&delete),
        Err(BudexError::Query(_))
    ));

    let insert = SqlStatement::new(&builder, CommandType::Insert, args(&[("Code", "x")])).unwrap();
    let command = CommandBuilder::new(connection, insert).get_command().unwrap();
    assert_eq!(command.command_type(), CommandType::Insert);
    assert!(matches!(
        command.execute_reader(CommandBehavior::Default),
        Err(BudexError::Query(_))
    ));
}

#[test]
fn refill_replaces_rows_with_equal_keys() {
    let fx = budget_fixture();
    let builder = accounts_builder(&fx);
    let select = SqlStatement::new(&builder, CommandType::Select, FilterArgs::new()).unwrap();
    let query = Query::try_from_parts(&fx.ctx, builder, select).unwrap();
    let adapter = query.adapter().unwrap();

    assert_eq!(adapter.kind(), AdapterKind::Sqlite);
    assert_eq!(adapter.options().missing_schema_action, MissingSchemaAction::AddWithKey);
    assert!(adapter.options().continue_on_error);

    let mut table = DataTable::new("Accounts");
    assert_eq!(adapter.fill(&mut table).unwrap(), 1);
    assert_eq!(adapter.fill(&mut table).unwrap(), 1);
    assert_eq!(table.row_count(), 1);
    assert_eq!(table.primary_key(), &["Code".to_string()]);
    assert_eq!(table.row(0).unwrap().state(), RowState::Unchanged);
    assert_eq!(table.column("ProgramAreaCode").unwrap().caption, "Program Area Code");
}

#[test]
fn adapter_options_shape_the_table() {
    let fx = budget_fixture();
    let builder = accounts_builder(&fx);
    let select = SqlStatement::new(&builder, CommandType::Select, FilterArgs::new()).unwrap();
    let connection = ConnectionFactory::new(&fx.ctx, &builder)
        .unwrap()
        .get_connection();

    // Only the columns the table already has
    let adapter = AdapterBuilder::new(&fx.ctx, connection.clone(), select.clone())
        .missing_schema_action(MissingSchemaAction::Ignore)
        .accept_changes_during_fill(false)
        .build()
        .unwrap();
    let mut table = DataTable::new("Accounts");
    table.add_column(DataColumn::new("Name", "TEXT", ColumnKind::String));
    adapter.fill(&mut table).unwrap();
    assert_eq!(table.column_names(), &["Name".to_string()]);
    assert_eq!(table.row(0).unwrap().state(), RowState::Added);
    assert!(table.primary_key().is_empty());

    // Mapped columns are renamed, the rest dropped
    let adapter = AdapterBuilder::new(&fx.ctx, connection.clone(), select.clone())
        .map_column("Code", "AccountCode")
        .missing_mapping_action(MissingMappingAction::Ignore)
        .build()
        .unwrap();
    let table = adapter.fill_table().unwrap();
    assert_eq!(table.column_names(), &["AccountCode".to_string()]);
    assert_eq!(table.row(0).unwrap().text("AccountCode"), Some("6100".into()));

    let adapter = AdapterBuilder::new(&fx.ctx, connection.clone(), select.clone())
        .missing_mapping_action(MissingMappingAction::Error)
        .build()
        .unwrap();
    assert!(matches!(adapter.fill_table(), Err(BudexError::Schema(_))));

    let adapter = AdapterBuilder::new(&fx.ctx, connection, select)
        .missing_schema_action(MissingSchemaAction::Error)
        .build()
        .unwrap();
    assert!(matches!(adapter.fill_table(), Err(BudexError::Schema(_))));
}

#[test]
fn adapters_only_run_selects() {
    let fx = budget_fixture();
    let builder = accounts_builder(&fx);
    let delete = SqlStatement::new(&builder, CommandType::Delete, args(&[("Code", "x")])).unwrap();
    let connection = ConnectionFactory::new(&fx.ctx, &builder)
        .unwrap()
        .get_connection();
    assert!(AdapterBuilder::new(&fx.ctx, connection, delete).build().is_err());
}
