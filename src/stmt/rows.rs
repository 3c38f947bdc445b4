//! Fetched rows

use crate::{Result, Error, Value};
use chrono::NaiveDateTime;
use std::rc::Rc;

/// A row of the query result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    names: Rc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn new(names: Rc<[String]>, values: Vec<Value>) -> Self {
        Self { names, values }
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value of the column at the zero-based position.
    pub fn get(&self, pos: usize) -> Option<&Value> {
        self.values.get(pos)
    }

    /// Returns the value of the named column. Names are matched case-insensitively.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.names.iter()
            .position(|col| col.eq_ignore_ascii_case(name))
            .and_then(|pos| self.values.get(pos))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    fn column(&self, pos: usize) -> Result<&Value> {
        self.values.get(pos).ok_or_else(|| Error::msg(format!("no column at position {}", pos)))
    }

    fn mismatch(&self, pos: usize, expected: &str) -> Error {
        let name = self.names.get(pos).map(String::as_str).unwrap_or_default();
        Error::msg(format!("column {} ({}) is not {}", pos, name, expected))
    }

    pub fn is_null(&self, pos: usize) -> Result<bool> {
        Ok( self.column(pos)?.is_null() )
    }

    /**
    Returns the integer value of the column.

    Numbers without a declared scale are fetched as doubles. Those are accepted as long as they have no fractional part.
    */
    pub fn get_int(&self, pos: usize) -> Result<Option<i64>> {
        match self.column(pos)? {
            Value::Null => Ok(None),
            val => val.as_int().map(Some).ok_or_else(|| self.mismatch(pos, "an integer")),
        }
    }

    pub fn get_float(&self, pos: usize) -> Result<Option<f64>> {
        match self.column(pos)? {
            Value::Null => Ok(None),
            val => val.as_float().map(Some).ok_or_else(|| self.mismatch(pos, "a number")),
        }
    }

    pub fn get_str(&self, pos: usize) -> Result<Option<&str>> {
        match self.column(pos)? {
            Value::Null => Ok(None),
            val => val.as_str().map(Some).ok_or_else(|| self.mismatch(pos, "text")),
        }
    }

    pub fn get_date(&self, pos: usize) -> Result<Option<NaiveDateTime>> {
        match self.column(pos)? {
            Value::Null => Ok(None),
            val => val.as_datetime().map(Some).ok_or_else(|| self.mismatch(pos, "a date")),
        }
    }

    pub fn get_bytes(&self, pos: usize) -> Result<Option<&[u8]>> {
        match self.column(pos)? {
            Value::Null => Ok(None),
            val => val.as_bytes().map(Some).ok_or_else(|| self.mismatch(pos, "binary")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        let names : Rc<[String]> = vec![String::from("EMPLOYEE_ID"), String::from("SALARY"), String::from("MANAGER_ID")].into();
        Row::new(names, vec![Value::Int(107), Value::Float(4200.0), Value::Null])
    }

    #[test]
    fn typed_getters() -> Result<()> {
        let row = row();
        assert_eq!(row.len(), 3);
        assert_eq!(row.get_int(0)?, Some(107));
        assert_eq!(row.get_int(1)?, Some(4200));
        assert_eq!(row.get_float(0)?, Some(107.0));
        assert_eq!(row.get_int(2)?, None);
        assert!(row.is_null(2)?);
        assert!(row.get_str(0).is_err());
        assert!(row.get_int(3).is_err());
        Ok(())
    }

    #[test]
    fn columns_by_name() {
        let row = row();
        assert_eq!(row.get_by_name("salary"), Some(&Value::Float(4200.0)));
        assert_eq!(row.get_by_name("commission_pct"), None);
    }

    #[test]
    fn fractional_numbers_are_not_integers() {
        let row = Row::new(vec![String::from("RATE")].into(), vec![Value::Float(0.15)]);
        match row.get_int(0) {
            Err(err) => assert_eq!(err.message(), "column 0 (RATE) is not an integer"),
            Ok(val) => panic!("{:?} was accepted as an integer", val),
        }
    }
}
