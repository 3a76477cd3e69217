//! SQL statement builder tests

use mysql_handler::handlers::database::coerce;
use mysql_handler::handlers::database::statement::quote_identifier;
use mysql_handler::{Error, Operator, Record, SqlStatement, Value};

#[test]
fn test_statement_from_cleaned_record() {
    let clean = coerce(
        Record::table("names")
            .field("lname", "Zouhir")
            .field("age", "25")
            .field("active", true),
    )
    .unwrap();

    let stmt = SqlStatement::insert(clean.require_table().unwrap(), clean.columns()).unwrap();
    assert_eq!(
        stmt.sql(),
        "INSERT INTO `names` (`lname`, `age`, `active`) VALUES (?, ?, ?)"
    );
    assert_eq!(
        stmt.params(),
        &[
            Value::Text("Zouhir".to_string()),
            Value::Integer(25),
            Value::Boolean(true),
        ]
    );
    assert!(stmt.validate_param_count().is_ok());
}

#[test]
fn test_hostile_identifiers_stay_quoted() {
    let stmt = SqlStatement::select(
        "names`; DROP TABLE names; --",
        &[("id".to_string(), Value::Integer(1))],
        Operator::And,
    )
    .unwrap();
    assert_eq!(
        stmt.sql(),
        "SELECT * FROM `names``; DROP TABLE names; --` WHERE `id` = ?"
    );
    assert!(matches!(quote_identifier(""), Err(Error::Validation(_))));
}

#[test]
fn test_values_never_enter_sql_text() {
    let conditions = vec![(
        "lname".to_string(),
        Value::Text("' OR '1'='1".to_string()),
    )];
    let stmt = SqlStatement::delete("names", &conditions).unwrap();
    assert!(!stmt.sql().contains("OR '1'"));
    assert_eq!(stmt.params().len(), 1);
}

#[test]
fn test_operator_parsing() {
    assert_eq!("or".parse::<Operator>().unwrap(), Operator::Or);
    assert_eq!(" AND ".parse::<Operator>().unwrap(), Operator::And);
    assert!("XOR".parse::<Operator>().is_err());
    assert_eq!(Operator::default(), Operator::And);
}
