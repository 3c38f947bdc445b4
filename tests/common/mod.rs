#![allow(dead_code)]

use ocibind::{Environment, ConnectParams, Session, Result};
use once_cell::sync::OnceCell;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Connection parameters, or `None` when the test database is not configured.
pub fn params() -> Option<ConnectParams> {
    match ConnectParams::from_env() {
        Ok(params) => Some(params),
        Err(err) => {
            eprintln!("skipping: {}", err);
            None
        }
    }
}

/// The environment shared by all tests of a test binary, or `None` when the client library is not available.
pub fn oracle() -> Option<&'static Environment> {
    static OCI_ENV: OnceCell<Option<Environment>> = OnceCell::new();
    OCI_ENV.get_or_init(|| match Environment::new() {
        Ok(env) => Some(env),
        Err(err) => {
            eprintln!("skipping: {}", err);
            None
        }
    }).as_ref()
}

/// Connects to the test database. Returns `None` when there is nothing to connect to.
pub fn connect() -> Result<Option<Session<'static>>> {
    init_logger();
    let params = match params() {
        Some(params) => params,
        None => return Ok(None),
    };
    match oracle() {
        Some(oracle) => oracle.connect_with(&params).map(Some),
        None => Ok(None),
    }
}

/// Runs DDL that may have been run by an earlier test run.
pub fn create_table(session: &Session, ddl: &str) -> Result<()> {
    let block = format!("
        DECLARE
            name_already_used EXCEPTION; PRAGMA EXCEPTION_INIT(name_already_used, -955);
        BEGIN
            EXECUTE IMMEDIATE '{}';
        EXCEPTION
          WHEN name_already_used THEN NULL;
        END;
    ", ddl.replace('\'', "''"));
    session.execute_immediate(&block)?;
    Ok(())
}
