//! Columns of a SELECT projection

use crate::{Result, oci::{self, *}};
use libc::c_void;
use std::ptr;

/// Widest NUMBER precision whose values always fit into an `i64`
const MAX_INT_PRECISION : i16 = 18;

/// How a column is fetched into a define buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FetchType {
    Int,
    Float,
    Date,
    Text(usize),
    Bytes(usize),
}

impl FetchType {
    pub(crate) fn sql_type(&self) -> u16 {
        match self {
            FetchType::Int      => SQLT_INT,
            FetchType::Float    => SQLT_BDOUBLE,
            FetchType::Date     => SQLT_ODT,
            FetchType::Text(_)  => SQLT_CHR,
            FetchType::Bytes(_) => SQLT_BIN,
        }
    }

    /// Size of the define buffer
    pub(crate) fn buffer_size(&self) -> usize {
        match *self {
            FetchType::Int | FetchType::Float => 8,
            FetchType::Date => std::mem::size_of::<OCIDate>(),
            FetchType::Text(size) | FetchType::Bytes(size) => size,
        }
    }
}

/// Describes a column of the statement's result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    name: String,
    data_type: u16,
    size: usize,
    precision: i16,
    scale: i8,
    nullable: bool,
}

impl ColumnDescriptor {
    /// Reads the metadata of the column at the (1-based) position from an executed or described statement.
    pub(crate) fn describe(stmt: *mut OCIStmt, err: *mut OCIError, pos: usize) -> Result<Self> {
        let mut param = ptr::null_mut::<OCIParam>();
        oci::param_get(stmt as *const c_void, OCI_HTYPE_STMT, err, &mut param as *mut *mut OCIParam as *mut *mut c_void, pos as u32)?;
        let param = Descriptor::<OCIParam>::from(param);
        Ok( Self {
            name:      param.get_attr::<String>(OCI_ATTR_NAME, err)?,
            data_type: param.get_attr::<u16>(OCI_ATTR_DATA_TYPE, err)?,
            size:      param.get_attr::<u16>(OCI_ATTR_DATA_SIZE, err)? as usize,
            precision: param.get_attr::<i16>(OCI_ATTR_PRECISION, err)?,
            scale:     param.get_attr::<i8>(OCI_ATTR_SCALE, err)?,
            nullable:  param.get_attr::<u8>(OCI_ATTR_IS_NULL, err)? != 0,
        } )
    }

    /// Column name, or the expression text for unnamed expressions.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// OCI external type code (`SQLT_*`) reported by the server.
    pub fn data_type(&self) -> u16 {
        self.data_type
    }

    /// Maximum size of the column data in bytes. 22 for NUMBER.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn precision(&self) -> i16 {
        self.precision
    }

    pub fn scale(&self) -> i8 {
        self.scale
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns `true` for NUMBER columns declared with scale 0 and a precision that fits into an `i64`, e.g. `NUMBER(6)`.
    /// `INTEGER` is `NUMBER(38)` and is not one of them.
    pub fn is_integer(&self) -> bool {
        self.data_type == SQLT_NUM && (1..=MAX_INT_PRECISION).contains(&self.precision) && self.scale == 0
    }

    pub(crate) fn fetch_type(&self) -> FetchType {
        match self.data_type {
            SQLT_NUM if self.is_integer() => FetchType::Int,
            SQLT_NUM | SQLT_FLT | SQLT_BFLOAT | SQLT_BDOUBLE | SQLT_IBFLOAT | SQLT_IBDOUBLE => FetchType::Float,
            SQLT_DAT | SQLT_ODT => FetchType::Date,
            // server sizes are in bytes of the database character set, client text may need up to 4 bytes per character
            SQLT_CHR | SQLT_AFC | SQLT_VCS | SQLT_AVC => FetchType::Text(self.size.max(1) * 4),
            SQLT_BIN => FetchType::Bytes(self.size.max(1)),
            _ => FetchType::Text(self.size.max(64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(data_type: u16, size: usize, precision: i16, scale: i8) -> ColumnDescriptor {
        ColumnDescriptor { name: String::from("C"), data_type, size, precision, scale, nullable: true }
    }

    #[test]
    fn integer_numbers_are_fetched_as_integers() {
        let id = column(SQLT_NUM, 22, 6, 0);
        assert!(id.is_integer());
        assert_eq!(id.fetch_type(), FetchType::Int);
        assert_eq!(id.fetch_type().sql_type(), SQLT_INT);
        assert_eq!(column(SQLT_NUM, 22, 18, 0).fetch_type(), FetchType::Int);
    }

    #[test]
    fn wide_integers_are_fetched_as_doubles() {
        let integer = column(SQLT_NUM, 22, 38, 0);
        assert!(!integer.is_integer());
        assert_eq!(integer.fetch_type(), FetchType::Float);
        assert_eq!(column(SQLT_NUM, 22, 19, 0).fetch_type(), FetchType::Float);
    }

    #[test]
    fn other_numbers_are_fetched_as_doubles() {
        let unconstrained = column(SQLT_NUM, 22, 0, -127);
        assert!(!unconstrained.is_integer());
        assert_eq!(unconstrained.fetch_type(), FetchType::Float);
        assert_eq!(column(SQLT_NUM, 22, 8, 2).fetch_type(), FetchType::Float);
        assert_eq!(column(SQLT_IBDOUBLE, 8, 0, 0).fetch_type().sql_type(), SQLT_BDOUBLE);
    }

    #[test]
    fn text_buffers_allow_multibyte_characters() {
        assert_eq!(column(SQLT_CHR, 30, 0, 0).fetch_type(), FetchType::Text(120));
        assert_eq!(column(SQLT_AFC, 0, 0, 0).fetch_type(), FetchType::Text(4));
        assert_eq!(column(SQLT_BIN, 16, 0, 0).fetch_type(), FetchType::Bytes(16));
        // TIMESTAMP is converted to text by the server
        assert_eq!(column(187, 11, 0, 6).fetch_type(), FetchType::Text(64));
    }

    #[test]
    fn dates() {
        let hired = column(SQLT_DAT, 7, 0, 0);
        assert_eq!(hired.fetch_type(), FetchType::Date);
        assert_eq!(hired.fetch_type().buffer_size(), 8);
        assert_eq!(hired.fetch_type().sql_type(), SQLT_ODT);
    }
}
