//! Binding of arguments to parameter placeholders

use crate::{Result, Error, Value, NativeBuffer, ArrayBuffer, buffer, types::{date, number::NUMBER_SIZE}, oci::{self, *}};
use libc::c_void;
use std::{collections::HashMap, fmt, mem, ptr};

/// Identifies a parameter placeholder either by its zero-based position or by its name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BindKey {
    Index(usize),
    Name(String),
}

impl BindKey {
    /// Placeholder names are matched case-insensitively, with or without the leading colon.
    pub(crate) fn name(name: &str) -> Self {
        let name = name.trim();
        let name = name.strip_prefix(':').unwrap_or(name);
        BindKey::Name(format!(":{}", name.to_uppercase()))
    }
}

impl fmt::Display for BindKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BindKey::Index(idx) => write!(f, "position {}", idx),
            BindKey::Name(name) => write!(f, "{}", name),
        }
    }
}

/// A trait for types that can be used to identify parameter placeholders.
pub trait Position {
    fn key(&self) -> BindKey;
}

impl Position for usize {
    fn key(&self) -> BindKey {
        BindKey::Index(*self)
    }
}

impl Position for &str {
    fn key(&self) -> BindKey {
        BindKey::name(self)
    }
}

enum BindData {
    Scalar(NativeBuffer),
    Array(ArrayBuffer),
}

/// Memory OCI reads a bound argument from at execute time.
struct BindSlot {
    bind: Ptr<OCIBind>,
    // `ind` is boxed as OCI keeps its address while the slot may move around the map
    ind: Box<i16>,
    data: BindData,
}

/// Encodes a value the way it is bound: buffer, size of the value, OCI type and NULL indicator.
fn encode(val: &Value) -> Result<(NativeBuffer, usize, u16, i16)> {
    let encoded = match val {
        Value::Null => (NativeBuffer::alloc(1)?, 1, SQLT_CHR, OCI_IND_NULL),
        Value::Int(num) => {
            let mut buf = NativeBuffer::alloc(mem::size_of::<i64>())?;
            buf.write_value(0, *num)?;
            (buf, mem::size_of::<i64>(), SQLT_INT, OCI_IND_NOTNULL)
        }
        Value::Float(num) => {
            let mut buf = NativeBuffer::alloc(buffer::size_of_float())?;
            buf.write_float(0, *num)?;
            (buf, buffer::size_of_float(), SQLT_FLT, OCI_IND_NOTNULL)
        }
        // Oracle treats empty strings as NULL
        Value::Text(text) if text.is_empty() => (NativeBuffer::alloc(1)?, 1, SQLT_CHR, OCI_IND_NULL),
        Value::Text(text) => {
            let mut buf = NativeBuffer::alloc(text.len())?;
            buf.write_bytes(0, text.as_bytes())?;
            (buf, text.len(), SQLT_CHR, OCI_IND_NOTNULL)
        }
        Value::Date(dt) => {
            let mut buf = NativeBuffer::alloc(buffer::size_of_date())?;
            buf.write_date(0, &date::from_datetime(dt)?)?;
            (buf, mem::size_of::<OCIDate>(), SQLT_ODT, OCI_IND_NOTNULL)
        }
        Value::Number(num) => {
            let mut buf = NativeBuffer::alloc(buffer::size_of_number())?;
            buf.write_number(0, num)?;
            (buf, NUMBER_SIZE, SQLT_VNU, OCI_IND_NOTNULL)
        }
        Value::Bytes(bytes) if bytes.is_empty() => (NativeBuffer::alloc(1)?, 1, SQLT_BIN, OCI_IND_NULL),
        Value::Bytes(bytes) => {
            let mut buf = NativeBuffer::alloc(bytes.len())?;
            buf.write_bytes(0, bytes)?;
            (buf, bytes.len(), SQLT_BIN, OCI_IND_NOTNULL)
        }
    };
    Ok( encoded )
}

/// Binds a buffer to the placeholder. `bindp` may point to the bind handle of an earlier bind, which OCI then reuses.
pub(crate) fn bind_to(
    stmt: *mut OCIStmt, err: *mut OCIError, key: &BindKey, bindp: *mut *mut OCIBind,
    data: *mut c_void, data_size: usize, sql_type: u16, ind: *mut c_void, mode: u32
) -> Result<()> {
    log::debug!("binding {} as type {} ({} bytes)", key, sql_type, data_size);
    match key {
        BindKey::Index(idx) => oci::bind_by_pos(stmt, bindp, err, (idx + 1) as u32, data, data_size as i64, sql_type, ind, mode),
        BindKey::Name(name) => oci::bind_by_name(stmt, bindp, err, name, data, data_size as i64, sql_type, ind, mode),
    }
}

/// IN arguments of a statement
#[derive(Default)]
pub(crate) struct Params {
    slots: HashMap<BindKey, BindSlot>,
}

impl Params {
    fn prior_bind(&self, key: &BindKey) -> *mut OCIBind {
        self.slots.get(key).map_or(ptr::null_mut(), |slot| slot.bind.get())
    }

    /// Binds a copy of the value. The copy is kept until the placeholder is rebound or the statement is re-prepared.
    pub(crate) fn bind_value(&mut self, stmt: *mut OCIStmt, err: *mut OCIError, key: BindKey, val: &Value) -> Result<()> {
        let (buf, data_size, sql_type, ind) = encode(val)?;
        let mut ind = Box::new(ind);
        let mut bind = self.prior_bind(&key);
        bind_to(
            stmt, err, &key, &mut bind,
            buf.as_ptr(), data_size, sql_type,
            ind.as_mut() as *mut i16 as *mut c_void, OCI_DEFAULT
        )?;
        self.slots.insert(key, BindSlot { bind: Ptr::new(bind), ind, data: BindData::Scalar(buf) });
        Ok(())
    }

    /// Binds an array of values for bulk execution. The array is owned by the bind.
    pub(crate) fn bind_array(&mut self, stmt: *mut OCIStmt, err: *mut OCIError, key: BindKey, mut arr: ArrayBuffer) -> Result<()> {
        let mut bind = self.prior_bind(&key);
        let kind = arr.kind();
        let inds = arr.inds_ptr();
        bind_to(
            stmt, err, &key, &mut bind,
            arr.data_ptr(), kind.stride(), kind.sql_type(),
            inds, OCI_DEFAULT
        )?;
        self.slots.insert(key, BindSlot { bind: Ptr::new(bind), ind: Box::new(OCI_IND_NOTNULL), data: BindData::Array(arr) });
        Ok(())
    }

    /// Checks that every bound argument can supply the requested number of rows.
    /// A single value only covers one iteration as OCI steps through every bind by its value size.
    pub(crate) fn check_rows(&self, rows: usize) -> Result<()> {
        for (key, slot) in &self.slots {
            match &slot.data {
                BindData::Array(arr) if arr.rows() < rows => {
                    return Err( Error::msg(format!("array bound to {} has {} rows, {} requested", key, arr.rows(), rows)) );
                }
                BindData::Scalar(_) if rows > 1 => {
                    return Err( Error::msg(format!("{} is bound to a single value, bulk execution of {} rows needs an array", key, rows)) );
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` if the argument bound to the placeholder is NULL.
    pub(crate) fn is_null(&self, key: &BindKey) -> Option<bool> {
        self.slots.get(key).map(|slot| matches!(slot.data, BindData::Scalar(_)) && *slot.ind == OCI_IND_NULL)
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn placeholder_names_are_normalized() {
        assert_eq!("id".key(), BindKey::Name(String::from(":ID")));
        assert_eq!(":New_Salary".key(), BindKey::Name(String::from(":NEW_SALARY")));
        assert_eq!(" :x ".key(), BindKey::name("X"));
        assert_eq!(3usize.key(), BindKey::Index(3));
        assert_eq!(BindKey::Index(0).to_string(), "position 0");
    }

    #[test]
    fn integers_are_bound_as_native_longs() -> Result<()> {
        let (buf, size, sql_type, ind) = encode(&Value::Int(-1234567890123))?;
        assert_eq!((size, sql_type, ind), (8, SQLT_INT, OCI_IND_NOTNULL));
        assert_eq!(buf.read_value::<i64>(0)?, -1234567890123);
        assert!(buf.is_host_owned());
        Ok(())
    }

    #[test]
    fn text_is_bound_without_terminator() -> Result<()> {
        let (buf, size, sql_type, _) = encode(&Value::from("Ernst"))?;
        assert_eq!((size, sql_type), (5, SQLT_CHR));
        assert_eq!(buf.read_bytes(0, size)?, b"Ernst");
        Ok(())
    }

    #[test]
    fn nulls_and_empty_values_set_the_indicator() -> Result<()> {
        for val in &[Value::Null, Value::from(""), Value::Bytes(Vec::new())] {
            let (_, _, _, ind) = encode(val)?;
            assert_eq!(ind, OCI_IND_NULL, "{:?}", val);
        }
        Ok(())
    }

    #[test]
    fn dates_are_bound_as_ocidate() -> Result<()> {
        let dt = NaiveDate::from_ymd_opt(2005, 9, 21).and_then(|d| d.and_hms_opt(0, 0, 0)).expect("date");
        let (buf, size, sql_type, _) = encode(&Value::Date(dt))?;
        assert_eq!((size, sql_type), (8, SQLT_ODT));
        assert_eq!(date::to_datetime(&buf.read_date(0)?)?, dt);
        Ok(())
    }

    fn slot(data: BindData) -> BindSlot {
        BindSlot { bind: Ptr::null(), ind: Box::new(OCI_IND_NOTNULL), data }
    }

    #[test]
    fn bulk_rows_need_arrays() -> Result<()> {
        let mut params = Params::default();
        params.slots.insert(BindKey::name("ids"), slot(BindData::Array(ArrayBuffer::new(crate::ElementKind::Int, 3)?)));
        assert!(params.check_rows(3).is_ok());
        assert!(params.check_rows(4).is_err());

        let (buf, _, _, _) = encode(&Value::Int(60))?;
        params.slots.insert(BindKey::name("dept"), slot(BindData::Scalar(buf)));
        assert_eq!(params.check_rows(3).map_err(|err| err.code()), Err(-1));
        assert!(params.check_rows(1).is_ok());
        Ok(())
    }

    #[test]
    fn floats_and_numbers() -> Result<()> {
        let (buf, size, sql_type, _) = encode(&Value::Float(0.07))?;
        assert_eq!((size, sql_type), (8, SQLT_FLT));
        assert_eq!(buf.read_float(0)?, 0.07);
        let (_, size, sql_type, _) = encode(&Value::Number(crate::Number::default()))?;
        assert_eq!((size, sql_type), (22, SQLT_VNU));
        Ok(())
    }
}
