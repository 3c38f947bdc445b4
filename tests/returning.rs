mod common;

use ocibind::*;

/// Creates (or empties) the table and adds three rows to it. Tests use separate tables as they run concurrently.
fn setup(session: &Session, table: &str) -> Result<()> {
    common::create_table(session, &format!("
        CREATE TABLE {} (
            id    NUMBER(10) PRIMARY KEY,
            grp   NUMBER(10),
            name  VARCHAR2(30),
            score NUMBER(10)
        )
    ", table))?;
    session.execute_immediate(&format!("DELETE FROM {}", table))?;
    session.execute_immediate(&format!("
        INSERT INTO {} (id, grp, name, score)
        SELECT level, 1, 'name ' || level, level * 10 FROM dual CONNECT BY level <= 3
    ", table))?;
    Ok(())
}

#[test]
fn update_returning_into() -> Result<()> {
    let session = match common::connect()? { Some(session) => session, None => return Ok(()) };
    setup(&session, "ocibind_returning_upd")?;

    let mut stmt = session.prepare("
        UPDATE ocibind_returning_upd
           SET score = score + 1
         WHERE grp = :grp
     RETURNING id, name, score INTO :ids, :names, :scores
    ")?;
    assert_eq!(stmt.statement_type(), Some(StatementType::Update));
    stmt.bind(":grp", &Value::Int(1))?;
    stmt.bind_out(":ids", OutKind::Int)?;
    stmt.bind_out(":names", OutKind::Text(30))?;
    stmt.bind_out(":scores", OutKind::Float)?;
    let num_updated = stmt.execute(false)?;
    assert_eq!(num_updated, 3);

    let mut ids : Vec<i64> = stmt.out_values(":ids")?.iter().filter_map(Value::as_int).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2, 3]);

    let mut names : Vec<String> = stmt.out_values(":names")?.iter().filter_map(|val| val.as_str().map(String::from)).collect();
    names.sort();
    assert_eq!(names, vec!["name 1", "name 2", "name 3"]);

    let mut scores : Vec<f64> = stmt.out_values(":scores")?.iter().filter_map(Value::as_float).collect();
    scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    assert_eq!(scores, vec![11.0, 21.0, 31.0]);

    assert!(stmt.out_values(":grp").is_err());

    // nothing matches the second time
    stmt.bind(":grp", &Value::Int(2))?;
    assert_eq!(stmt.execute(false)?, 0);
    assert!(stmt.out_values(":ids")?.is_empty());

    session.rollback()?;
    Ok(())
}

#[test]
fn delete_returning_dates() -> Result<()> {
    let session = match common::connect()? { Some(session) => session, None => return Ok(()) };
    setup(&session, "ocibind_returning_del")?;

    let mut stmt = session.prepare("
        DELETE FROM ocibind_returning_del
         WHERE id = :id
     RETURNING TRUNC(SYSDATE), name INTO :when, :name
    ")?;
    stmt.bind(":id", &Value::Int(2))?;
    stmt.bind_out(":when", OutKind::Date)?;
    stmt.bind_out(":name", OutKind::Text(30))?;
    assert_eq!(stmt.execute(false)?, 1);
    let when = stmt.out_values(":when")?;
    assert_eq!(when.len(), 1);
    assert!(when[0].as_datetime().is_some());
    assert_eq!(stmt.out_values(":name")?, vec![Value::from("name 2")]);

    session.rollback()?;
    Ok(())
}

#[test]
fn rebinding_returning_placeholders() -> Result<()> {
    let session = match common::connect()? { Some(session) => session, None => return Ok(()) };
    setup(&session, "ocibind_returning_rebind")?;

    let mut stmt = session.prepare("
        UPDATE ocibind_returning_rebind
           SET score = score + 5
         WHERE id = :id
     RETURNING score INTO :score
    ")?;
    stmt.bind(":id", &Value::Int(3))?;
    stmt.bind_out(":score", OutKind::Int)?;
    assert_eq!(stmt.execute(false)?, 1);
    assert_eq!(stmt.out_values(":score")?, vec![Value::Int(35)]);

    // same kind keeps the registered context, another kind replaces it
    stmt.bind_out(":score", OutKind::Int)?;
    assert_eq!(stmt.execute(false)?, 1);
    assert_eq!(stmt.out_values(":score")?, vec![Value::Int(40)]);

    stmt.bind_out(":score", OutKind::Text(10))?;
    assert_eq!(stmt.execute(false)?, 1);
    assert_eq!(stmt.out_values(":score")?, vec![Value::from("45")]);

    session.rollback()?;
    Ok(())
}
