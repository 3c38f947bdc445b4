//! SQL or PL/SQL statement

pub(crate) mod bind;
pub(crate) mod define;
pub(crate) mod out;
pub(crate) mod rows;

pub use bind::{BindKey, Position};
pub use out::OutKind;
pub use rows::Row;

use bind::Params;
use define::Define;
use out::ReturningContext;
use crate::{Result, Error, Value, ArrayBuffer, ColumnDescriptor, Session, blocking::BlockingSection, env::Env, oci::{self, *}};
use std::{collections::HashMap, rc::Rc};

/// Kind of the prepared statement as reported by OCI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementType {
    Select,
    Update,
    Delete,
    Insert,
    Create,
    Drop,
    Alter,
    Begin,
    Declare,
    Call,
    Merge,
    Unknown(u16),
}

impl From<u16> for StatementType {
    fn from(code: u16) -> Self {
        match code {
            OCI_STMT_SELECT => StatementType::Select,
            2  => StatementType::Update,
            3  => StatementType::Delete,
            4  => StatementType::Insert,
            5  => StatementType::Create,
            6  => StatementType::Drop,
            7  => StatementType::Alter,
            8  => StatementType::Begin,
            9  => StatementType::Declare,
            10 => StatementType::Call,
            16 => StatementType::Merge,
            _  => StatementType::Unknown(code),
        }
    }
}

/// Represents a statement prepared for execution.
pub struct Statement<'a> {
    stmt:      Handle<OCIStmt>,
    params:    Params,
    outs:      HashMap<BindKey, Box<ReturningContext>>,
    defines:   Vec<Define>,
    cols:      Vec<ColumnDescriptor>,
    names:     Rc<[String]>,
    stmt_type: Option<StatementType>,
    err:       Handle<OCIError>,
    session:   &'a Session<'a>,
}

impl<'a> Statement<'a> {
    pub(crate) fn new(session: &'a Session<'a>) -> Result<Self> {
        let err  = Handle::<OCIError>::new(session.env_ptr())?;
        let stmt = Handle::<OCIStmt>::new(session.env_ptr())?;
        Ok( Self {
            stmt, err, session,
            params:    Params::default(),
            outs:      HashMap::new(),
            defines:   Vec::new(),
            cols:      Vec::new(),
            names:     Rc::from(Vec::new()),
            stmt_type: None,
        } )
    }

    fn stmt_type(&self) -> Result<StatementType> {
        self.stmt_type.ok_or_else(|| Error::new("statement is not prepared"))
    }

    /// Prepares the SQL and returns its type. Arguments, output buffers and column metadata
    /// of the previously prepared SQL are discarded.
    pub fn prepare(&mut self, sql: &str) -> Result<StatementType> {
        self.params.clear();
        self.outs.clear();
        self.defines.clear();
        self.cols.clear();
        self.names = Rc::from(Vec::new());
        self.stmt_type = None;

        log::debug!("prepare {}", sql);
        oci::stmt_prepare(self.stmt.get(), self.err.get(), sql)?;
        let code : u16 = self.stmt.get_attr(OCI_ATTR_STMT_TYPE, self.err.get())?;
        let stmt_type = StatementType::from(code);
        log::debug!("statement type {:?}", stmt_type);
        self.stmt_type = Some(stmt_type);
        Ok( stmt_type )
    }

    /// Returns the type of the prepared statement.
    pub fn statement_type(&self) -> Option<StatementType> {
        self.stmt_type
    }

    /**
    Binds a copy of the value to the placeholder at the zero-based position or with the given name.

    # Example

    ```no_run
    use ocibind::Value;

    # let oracle = ocibind::env()?;
    # let session = oracle.connect_with(&ocibind::ConnectParams::from_env()?)?;
    let mut stmt = session.prepare("UPDATE hr.employees SET salary = :salary WHERE employee_id = :id")?;
    stmt.bind(":id", &Value::Int(107))?;
    stmt.bind("SALARY", &Value::Float(4500.0))?;
    let num_updated = stmt.execute(false)?;
    # session.rollback()?;
    # Ok::<(),ocibind::Error>(())
    ```
    */
    pub fn bind(&mut self, pos: impl Position, val: &Value) -> Result<()> {
        self.stmt_type()?;
        self.params.bind_value(self.stmt.get(), self.err.get(), pos.key(), val)
    }

    /// Binds a copy of the value to the placeholder at the zero-based position.
    pub fn bind_by_pos(&mut self, pos: usize, val: &Value) -> Result<()> {
        self.bind(pos, val)
    }

    /// Binds a copy of the value to the named placeholder.
    pub fn bind_by_name(&mut self, name: &str, val: &Value) -> Result<()> {
        self.bind(name, val)
    }

    /// Binds an array of values for [`execute_many`](Statement::execute_many).
    pub fn bind_array(&mut self, pos: impl Position, arr: ArrayBuffer) -> Result<()> {
        self.stmt_type()?;
        self.params.bind_array(self.stmt.get(), self.err.get(), pos.key(), arr)
    }

    /**
    Binds the placeholder of a RETURNING INTO clause. The values returned by the next execution
    are read with [`out_values`](Statement::out_values).

    # Example

    ```no_run
    use ocibind::{OutKind, Value};

    # let oracle = ocibind::env()?;
    # let session = oracle.connect_with(&ocibind::ConnectParams::from_env()?)?;
    let mut stmt = session.prepare("
        UPDATE hr.employees
           SET salary = Round(salary * 1.07, -2)
         WHERE department_id = :dept
     RETURNING salary INTO :new_salary
    ")?;
    stmt.bind(":dept", &Value::Int(60))?;
    stmt.bind_out(":new_salary", OutKind::Int)?;
    let num_updated = stmt.execute(false)?;
    let salaries = stmt.out_values(":new_salary")?;
    assert_eq!(salaries.len(), num_updated);
    # session.rollback()?;
    # Ok::<(),ocibind::Error>(())
    ```
    */
    pub fn bind_out(&mut self, pos: impl Position, kind: OutKind) -> Result<()> {
        self.stmt_type()?;
        let key = pos.key();
        let (stmt, err) = (self.stmt.get(), self.err.get());
        match self.outs.get_mut(&key) {
            Some(ctx) if ctx.kind() == kind => Self::bind_returning(stmt, err, &key, ctx),
            _ => {
                // a context being replaced stays registered with OCI until its successor is
                let mut ctx = Box::new(ReturningContext::new(kind, err));
                Self::bind_returning(stmt, err, &key, &mut ctx)?;
                self.outs.insert(key, ctx);
                Ok(())
            }
        }
    }

    fn bind_returning(stmt: *mut OCIStmt, err: *mut OCIError, key: &BindKey, ctx: &mut ReturningContext) -> Result<()> {
        let kind = ctx.kind();
        bind::bind_to(
            stmt, err, key, ctx.bind_ptr(),
            std::ptr::null_mut(), kind.buffer_size(), kind.sql_type(),
            std::ptr::null_mut(), OCI_DATA_AT_EXEC
        )?;
        out::register(ctx, err)
    }

    /// Returns the values the last execution returned into the placeholder.
    pub fn out_values(&self, pos: impl Position) -> Result<Vec<Value>> {
        let key = pos.key();
        self.outs.get(&key)
            .ok_or_else(|| Error::msg(format!("{} is not bound for output", key)))?
            .values()
    }

    /// Returns `true` if the IN argument bound to the placeholder is NULL.
    pub fn is_null(&self, pos: impl Position) -> Result<bool> {
        let key = pos.key();
        self.params.is_null(&key).ok_or_else(|| Error::msg(format!("nothing is bound to {}", key)))
    }

    fn run(&mut self, iters: u32, mode: u32) -> Result<()> {
        for ctx in self.outs.values_mut() {
            ctx.reset();
        }
        let res = {
            let _section = BlockingSection::enter(self.session.env().blocking_hook());
            oci::stmt_execute(self.session.svc_ptr(), self.stmt.get(), self.err.get(), iters, mode)
        };
        let failure = self.outs.values_mut().find_map(|ctx| ctx.take_failure());
        match failure {
            Some(err) => Err(err),
            None => res,
        }
    }

    fn commit_mode(autocommit: bool) -> u32 {
        log::debug!("autocommit {}", autocommit);
        if autocommit { OCI_COMMIT_ON_SUCCESS } else { OCI_DEFAULT }
    }

    /**
    Executes the statement once and returns the number of affected rows.

    A SELECT is executed without fetching. Its rows are read with [`fetch`](Statement::fetch) afterwards.
    */
    pub fn execute(&mut self, autocommit: bool) -> Result<usize> {
        let stmt_type = self.stmt_type()?;
        let mode = Self::commit_mode(autocommit);
        if stmt_type == StatementType::Select {
            self.run(0, mode)?;
            self.define_columns()?;
        } else {
            self.run(1, mode)?;
        }
        self.row_count()
    }

    /// Executes the statement once for every one of the first `rows` elements of the bound arrays.
    pub fn execute_many(&mut self, rows: usize, autocommit: bool) -> Result<usize> {
        let stmt_type = self.stmt_type()?;
        if rows == 0 {
            return Err( Error::new("bulk execution needs at least one row") );
        }
        if stmt_type == StatementType::Select {
            return Err( Error::new("queries cannot be executed in bulk") );
        }
        self.params.check_rows(rows)?;
        log::debug!("executing {} iterations with {} arguments", rows, self.params.len());
        self.run(rows as u32, Self::commit_mode(autocommit))?;
        self.row_count()
    }

    /// Executes the query and prepares output buffers for [`fetch`](Statement::fetch).
    pub fn query(&mut self) -> Result<&[ColumnDescriptor]> {
        if self.stmt_type()? != StatementType::Select {
            return Err( Error::new("statement is not a query") );
        }
        self.execute(false)?;
        Ok( &self.cols )
    }

    /// Describes the columns of the query without executing it.
    pub fn describe(&mut self) -> Result<&[ColumnDescriptor]> {
        if self.stmt_type()? != StatementType::Select {
            return Err( Error::new("only queries can be described") );
        }
        self.run(0, OCI_DESCRIBE_ONLY)?;
        self.load_columns()?;
        Ok( &self.cols )
    }

    fn load_columns(&mut self) -> Result<()> {
        let count : u32 = self.stmt.get_attr(OCI_ATTR_PARAM_COUNT, self.err.get())?;
        let mut cols = Vec::with_capacity(count as usize);
        for pos in 1..=count as usize {
            cols.push(ColumnDescriptor::describe(self.stmt.get(), self.err.get(), pos)?);
        }
        self.names = cols.iter().map(|col| col.name().to_string()).collect::<Vec<_>>().into();
        self.cols = cols;
        Ok(())
    }

    fn define_columns(&mut self) -> Result<()> {
        self.defines.clear();
        self.load_columns()?;
        let mut defines = Vec::with_capacity(self.cols.len());
        for (idx, col) in self.cols.iter().enumerate() {
            defines.push(Define::new(self.stmt.get(), self.err.get(), idx + 1, col)?);
        }
        self.defines = defines;
        Ok(())
    }

    /// Column metadata of the executed or described query.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.cols
    }

    /// Fetches the next row of the query result set. Returns `None` after the last row.
    pub fn fetch(&mut self) -> Result<Option<Row>> {
        if self.defines.is_empty() {
            return Err( Error::new("query has not been executed") );
        }
        if !oci::stmt_fetch(self.stmt.get(), self.err.get())? {
            return Ok( None );
        }
        let values = self.defines.iter().map(Define::value).collect::<Result<Vec<_>>>()?;
        Ok( Some(Row::new(Rc::clone(&self.names), values)) )
    }

    /// Number of rows processed so far: affected by DML or fetched by a query.
    pub fn row_count(&self) -> Result<usize> {
        let count : u32 = self.stmt.get_attr(OCI_ATTR_ROW_COUNT, self.err.get())?;
        Ok( count as usize )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_types() {
        assert_eq!(StatementType::from(1), StatementType::Select);
        assert_eq!(StatementType::from(4), StatementType::Insert);
        assert_eq!(StatementType::from(8), StatementType::Begin);
        assert_eq!(StatementType::from(16), StatementType::Merge);
        assert_eq!(StatementType::from(42), StatementType::Unknown(42));
    }
}
