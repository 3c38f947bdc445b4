//! Dynamic OUT binds for RETURNING INTO clauses

use crate::{Result, Error, Value, NativeBuffer, types::date, oci::{self, *}};
use libc::c_void;
use std::mem;

/// Type of the values a RETURNING INTO placeholder receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutKind {
    Int,
    Float,
    /// Text of at most the given number of bytes
    Text(usize),
    Date,
}

impl OutKind {
    pub(crate) fn sql_type(&self) -> u16 {
        match self {
            OutKind::Int     => SQLT_INT,
            OutKind::Float   => SQLT_FLT,
            OutKind::Text(_) => SQLT_CHR,
            OutKind::Date    => SQLT_ODT,
        }
    }

    pub(crate) fn buffer_size(&self) -> usize {
        match *self {
            OutKind::Int | OutKind::Float => 8,
            OutKind::Text(len) => len.max(1),
            OutKind::Date => mem::size_of::<OCIDate>(),
        }
    }
}

/// Memory for one returned value
pub(crate) struct OutSlot {
    buf: NativeBuffer,
    len: u32,
    ind: i16,
    rcode: u16,
}

impl OutSlot {
    fn new(kind: OutKind) -> Result<Self> {
        Ok( Self { buf: NativeBuffer::alloc(kind.buffer_size())?, len: 0, ind: OCI_IND_NULL, rcode: 0 } )
    }

    fn value(&self, kind: OutKind) -> Result<Value> {
        if self.ind == OCI_IND_NULL {
            return Ok( Value::Null );
        }
        let val = match kind {
            OutKind::Int   => Value::Int(self.buf.read_value::<i64>(0)?),
            OutKind::Float => Value::Float(self.buf.read_float(0)?),
            OutKind::Date  => Value::Date(date::to_datetime(&self.buf.read_value::<OCIDate>(0)?)?),
            OutKind::Text(_) => {
                let len = (self.len as usize).min(self.buf.len());
                Value::Text(String::from_utf8_lossy(self.buf.read_bytes(0, len)?).into_owned())
            }
        };
        Ok( val )
    }
}

/// Values returned by one iteration of the statement
#[derive(Default)]
struct Returned {
    rows: usize,
    slots: Vec<OutSlot>,
}

/**
Receives the values OCI returns for a RETURNING INTO placeholder.

OCI reports the number of returned rows only while the statement executes. The callback
learns it when OCI asks for the first row of an iteration (`expect_rows`) and then hands
OCI one slot per row (`slot`).
*/
pub(crate) struct ReturningContext {
    kind: OutKind,
    err: *mut OCIError,
    iters: Vec<Returned>,
    in_ind: i16,
    failure: Option<Error>,
    bind: Ptr<OCIBind>,
}

impl ReturningContext {
    pub(crate) fn new(kind: OutKind, err: *mut OCIError) -> Self {
        Self { kind, err, iters: Vec::new(), in_ind: OCI_IND_NULL, failure: None, bind: Ptr::null() }
    }

    pub(crate) fn kind(&self) -> OutKind {
        self.kind
    }

    pub(crate) fn bind_ptr(&mut self) -> *mut *mut OCIBind {
        self.bind.as_mut_ptr()
    }

    /// Forgets values returned by the previous execution.
    pub(crate) fn reset(&mut self) {
        self.iters.clear();
        self.failure = None;
    }

    /// Allocates slots for the rows the iteration returned. OCI asks for a buffer even when nothing is returned,
    /// so at least one slot is allocated.
    pub(crate) fn expect_rows(&mut self, iter: usize, rows: usize) -> Result<()> {
        if self.iters.len() <= iter {
            self.iters.resize_with(iter + 1, Returned::default);
        }
        let mut slots = Vec::with_capacity(rows.max(1));
        for _ in 0..rows.max(1) {
            slots.push(OutSlot::new(self.kind)?);
        }
        self.iters[iter] = Returned { rows, slots };
        Ok(())
    }

    pub(crate) fn slot(&mut self, iter: usize, index: usize) -> Option<&mut OutSlot> {
        self.iters.get_mut(iter).and_then(|returned| returned.slots.get_mut(index))
    }

    /// Values returned by all iterations of the last execution, in row order.
    pub(crate) fn values(&self) -> Result<Vec<Value>> {
        let mut values = Vec::new();
        for returned in &self.iters {
            for slot in returned.slots.iter().take(returned.rows) {
                values.push(slot.value(self.kind)?);
            }
        }
        Ok( values )
    }

    pub(crate) fn take_failure(&mut self) -> Option<Error> {
        self.failure.take()
    }

    fn fail(&mut self, err: Error) -> i32 {
        log::debug!("returning callback failed: {}", err);
        self.failure = Some(err);
        OCI_ERROR
    }
}

/// Supplies no data for the IN phase of the OUT bind.
pub(crate) extern "C" fn no_data_in(
    ictxp: *mut c_void, _bindp: *mut OCIBind, _iter: u32, _index: u32,
    bufpp: *mut *mut c_void, alenp: *mut u32, piecep: *mut u8, indp: *mut *mut c_void
) -> i32 {
    if ictxp.is_null() {
        return OCI_ERROR;
    }
    let ctx = unsafe { &mut *(ictxp as *mut ReturningContext) };
    ctx.in_ind = OCI_IND_NULL;
    unsafe {
        *bufpp = std::ptr::null_mut();
        *alenp = 0;
        *piecep = OCI_ONE_PIECE;
        *indp = &mut ctx.in_ind as *mut i16 as *mut c_void;
    }
    OCI_CONTINUE
}

/// Points OCI at the slot for the returned row.
pub(crate) extern "C" fn returned_row_out(
    octxp: *mut c_void, bindp: *mut OCIBind, iter: u32, index: u32,
    bufpp: *mut *mut c_void, alenpp: *mut *mut u32, piecep: *mut u8, indpp: *mut *mut c_void, rcodepp: *mut *mut u16
) -> i32 {
    if octxp.is_null() {
        return OCI_ERROR;
    }
    let ctx = unsafe { &mut *(octxp as *mut ReturningContext) };
    if index == 0 {
        let rows = match attr::get::<u32>(OCI_ATTR_ROWS_RETURNED, OCI_HTYPE_BIND, bindp as *const c_void, ctx.err) {
            Ok(rows) => rows as usize,
            Err(err) => return ctx.fail(err),
        };
        log::debug!("iteration {} returned {} rows", iter, rows);
        if let Err(err) = ctx.expect_rows(iter as usize, rows) {
            return ctx.fail(err);
        }
    }
    match ctx.slot(iter as usize, index as usize) {
        Some(slot) => {
            slot.len = slot.buf.len() as u32;
            slot.ind = OCI_IND_NOTNULL;
            unsafe {
                *bufpp = slot.buf.as_ptr();
                *alenpp = &mut slot.len;
                *piecep = OCI_ONE_PIECE;
                *indpp = &mut slot.ind as *mut i16 as *mut c_void;
                *rcodepp = &mut slot.rcode;
            }
            OCI_CONTINUE
        }
        None => ctx.fail(Error::msg(format!("no slot for row {} of iteration {}", index, iter))),
    }
}

/// Registers the callbacks of a dynamic OUT bind.
pub(crate) fn register(ctx: &mut ReturningContext, err: *mut OCIError) -> Result<()> {
    let ctx_ptr = ctx as *mut ReturningContext as *mut c_void;
    oci::bind_dynamic(ctx.bind.get(), err, ctx_ptr, no_data_in, ctx_ptr, returned_row_out)
}
