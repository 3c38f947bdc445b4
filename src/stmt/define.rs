//! Output buffers of a query

use crate::{Result, Value, NativeBuffer, ColumnDescriptor, column::FetchType, types::date, oci::{self, *}};
use std::ptr;

/// Indicator and returned length OCI writes with every fetched row
struct Fetched {
    ind: i16,
    len: u32,
}

/// Define buffer of one column
pub(crate) struct Define {
    fetch: FetchType,
    buf: NativeBuffer,
    // boxed as OCI keeps the address while the define is moved into the column list
    out: Box<Fetched>,
}

impl Define {
    /// Allocates the buffer and defines it for the column at the (1-based) position.
    pub(crate) fn new(stmt: *mut OCIStmt, err: *mut OCIError, pos: usize, col: &ColumnDescriptor) -> Result<Self> {
        let fetch = col.fetch_type();
        let buf = NativeBuffer::alloc(fetch.buffer_size())?;
        let mut out = Box::new(Fetched { ind: OCI_IND_NULL, len: 0 });
        let mut defn = ptr::null_mut::<OCIDefine>();
        oci::define_by_pos(
            stmt, &mut defn, err, pos as u32,
            buf.as_ptr(), buf.len() as i64, fetch.sql_type(),
            &mut out.ind, &mut out.len
        )?;
        log::debug!("defined column {} {} as {:?}", pos, col.name(), fetch);
        Ok( Self { fetch, buf, out } )
    }

    /// Decodes the value fetched into the buffer.
    pub(crate) fn value(&self) -> Result<Value> {
        match self.out.ind {
            OCI_IND_NULL => return Ok( Value::Null ),
            OCI_IND_NOTNULL => {}
            ind => log::warn!("value of {:?} column was truncated (indicator {})", self.fetch, ind),
        }
        let len = (self.out.len as usize).min(self.buf.len());
        let val = match self.fetch {
            FetchType::Int      => Value::Int(self.buf.read_value::<i64>(0)?),
            FetchType::Float    => Value::Float(self.buf.read_float(0)?),
            FetchType::Date     => Value::Date(date::to_datetime(&self.buf.read_value::<OCIDate>(0)?)?),
            FetchType::Text(_)  => Value::Text(String::from_utf8_lossy(self.buf.read_bytes(0, len)?).into_owned()),
            FetchType::Bytes(_) => Value::Bytes(self.buf.read_bytes(0, len)?.to_vec()),
        };
        Ok( val )
    }
}
