//! Integration tests for flat-file sources

mod common;

use budex_data::{
    BudexError, ColumnKind, CommandType, ConnectionBuilder, DataBuilder, FilterArgs, Provider,
    Query, Source, SqlStatement,
};
use common::{args, budget_fixture};
use pretty_assertions::assert_eq;

const DIVISIONS: &str = "\
Code,Name,RpioCode,Employees
0100,Region 1,01,12
0200,Region 2,02,8
0300,Region 3,01
0400,Headquarters,06,40
";

#[test]
fn csv_source_by_provider() {
    let fx = budget_fixture();
    fx.write_csv("Divisions", DIVISIONS);

    let builder = DataBuilder::new(&fx.ctx, Source::Divisions, Provider::Csv, FilterArgs::new());

    assert_eq!(fx.sink.count(), 0, "{:?}", fx.sink.messages());
    // The short record is skipped, not fatal
    assert_eq!(builder.get_data().len(), 3);
    assert_eq!(builder.get_record().unwrap().text("Code"), Some("0100".into()));

    let table = builder.get_table();
    assert_eq!(table.column("Code").unwrap().kind, ColumnKind::String);
    assert_eq!(table.column("Employees").unwrap().kind, ColumnKind::Integer);
    assert_eq!(table.column("RpioCode").unwrap().caption, "Rpio Code");
    assert!(table.primary_key().is_empty());

    let keys: Vec<&String> = builder.program_elements().keys().collect();
    assert_eq!(keys, vec!["Code", "Name", "RpioCode"]);
    assert_eq!(builder.program_elements()["RpioCode"].len(), 3);
    assert_eq!(builder.filter_data("RpioCode", "01").len(), 1);
}

#[test]
fn csv_file_by_path_with_criteria() {
    let fx = budget_fixture();
    let path = fx.write_csv("Divisions", DIVISIONS);

    let builder = DataBuilder::from_path(&fx.ctx, &path, None, args(&[("RpioCode", "06")]));

    assert_eq!(fx.sink.count(), 0, "{:?}", fx.sink.messages());
    assert_eq!(builder.get_data().len(), 1);
    assert_eq!(
        builder.get_record().unwrap().text("Name"),
        Some("Headquarters".into())
    );
}

#[test]
fn unknown_csv_column_is_reported() {
    let fx = budget_fixture();
    let path = fx.write_csv("Divisions", DIVISIONS);
    let builder = DataBuilder::from_path(&fx.ctx, &path, None, args(&[("Region", "Region")]));
    assert!(builder.get_data().is_empty());
    assert_eq!(fx.sink.count(), 1);
}

#[test]
fn missing_csv_is_reported_once() {
    let fx = budget_fixture();
    let builder = DataBuilder::new(&fx.ctx, Source::Divisions, Provider::Csv, FilterArgs::new());
    assert!(builder.get_data().is_empty());
    assert_eq!(fx.sink.count(), 1);
}

#[test]
fn flat_files_are_read_only() {
    let fx = budget_fixture();
    let path = fx.write_csv("Divisions", DIVISIONS);
    let builder = ConnectionBuilder::try_from_path(fx.ctx.config(), &path, Some(Provider::Csv)).unwrap();
    assert_eq!(builder.source(), Source::External);

    let delete = SqlStatement::new(&builder, CommandType::Delete, args(&[("Code", "0100")])).unwrap();
    let query = Query::try_from_parts(&fx.ctx, builder, delete).unwrap();
    assert!(matches!(
        query.try_execute(),
        Err(BudexError::NotSupported(_))
    ));
}
