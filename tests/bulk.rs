mod common;

use ocibind::*;
use chrono::NaiveDate;

#[test]
fn insert_rows_from_arrays() -> Result<()> {
    let session = match common::connect()? { Some(session) => session, None => return Ok(()) };
    common::create_table(&session, "
        CREATE TABLE ocibind_bulk_test (
            id      NUMBER(10) PRIMARY KEY,
            label   VARCHAR2(40),
            amount  NUMBER(12,2),
            created DATE
        )
    ")?;
    session.execute_immediate("DELETE FROM ocibind_bulk_test")?;

    let created = NaiveDate::from_ymd_opt(2020, 2, 29).and_then(|d| d.and_hms_opt(23, 59, 1)).expect("date");

    let mut ids = ArrayBuffer::new(ElementKind::Int, 3)?;
    let mut labels = ArrayBuffer::new(ElementKind::Text(40), 3)?;
    let mut amounts = ArrayBuffer::new(ElementKind::Float, 3)?;
    let mut dates = ArrayBuffer::new(ElementKind::Date, 3)?;
    for row in 0..3 {
        ids.set(row, &Value::Int(row as i64 + 1))?;
        amounts.set(row, &Value::Float(row as f64 * 10.25))?;
        dates.set(row, &Value::Date(created))?;
    }
    labels.set(0, &Value::from("first"))?;
    labels.set(1, &Value::Null)?;
    labels.set(2, &Value::from("third"))?;
    assert_eq!(labels.get(1)?, Value::Null);

    let mut stmt = session.prepare("
        INSERT INTO ocibind_bulk_test (id, label, amount, created)
        VALUES (:id, :label, :amount, :created)
    ")?;
    assert_eq!(stmt.statement_type(), Some(StatementType::Insert));
    stmt.bind_array(":id", ids)?;
    stmt.bind_array(":label", labels)?;
    stmt.bind_array(":amount", amounts)?;
    stmt.bind_array(":created", dates)?;
    let num_inserted = stmt.execute_many(3, false)?;
    assert_eq!(num_inserted, 3);

    // arrays are shorter than the requested number of iterations
    assert!(stmt.execute_many(4, false).is_err());

    let mut stmt = session.prepare("SELECT id, label, amount, created FROM ocibind_bulk_test ORDER BY id")?;
    stmt.query()?;
    let mut rows = Vec::new();
    while let Some(row) = stmt.fetch()? {
        rows.push(row);
    }
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].get_int(0)?, Some(1));
    assert_eq!(rows[0].get_str(1)?, Some("first"));
    assert!(rows[1].is_null(1)?);
    assert_eq!(rows[2].get_str(1)?, Some("third"));
    assert_eq!(rows[2].get_float(2)?, Some(20.5));
    assert_eq!(rows[1].get_date(3)?, Some(created));

    session.rollback()?;
    Ok(())
}

#[test]
fn numbers_in_arrays() -> Result<()> {
    let session = match common::connect()? { Some(session) => session, None => return Ok(()) };
    let mut nums = ArrayBuffer::new(ElementKind::Number, 2)?;
    nums.set(0, &Value::Number(Number::from_int(7, &session)?))?;
    nums.set(1, &Value::Number(Number::from_real(2.5, &session)?))?;

    common::create_table(&session, "CREATE TABLE ocibind_bulk_nums (val NUMBER)")?;
    session.execute_immediate("DELETE FROM ocibind_bulk_nums")?;
    let mut stmt = session.prepare("INSERT INTO ocibind_bulk_nums (val) VALUES (:val)")?;
    stmt.bind_array(0, nums)?;
    assert_eq!(stmt.execute_many(2, false)?, 2);

    let mut stmt = session.prepare("SELECT SUM(val) FROM ocibind_bulk_nums")?;
    stmt.query()?;
    let row = stmt.fetch()?.expect("one row");
    assert_eq!(row.get_float(0)?, Some(9.5));

    session.rollback()?;
    Ok(())
}
