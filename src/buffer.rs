//! Native memory for bind arguments, array binds and payloads

use crate::{Result, Error, Value, Number, types::{date, number::NUMBER_SIZE}, oci::*};
use libc::c_void;
use std::{mem, ptr, convert::TryFrom};

/// Who releases the memory of a [`NativeBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Allocated by this crate and released when the buffer is dropped.
    Host,
    /// Owned by OCI (object cache, type descriptors, dequeued payloads). Never released here.
    Oci,
}

const fn align_to_pointer(size: usize) -> usize {
    let word = mem::size_of::<*mut c_void>();
    (size + word - 1) / word * word
}

/// Size of the native integer `read_int` and `write_int` work with.
pub const fn size_of_int() -> usize { mem::size_of::<i32>() }

/// Size of the native double `read_float` and `write_float` work with.
pub const fn size_of_float() -> usize { mem::size_of::<f64>() }

pub const fn size_of_pointer() -> usize { mem::size_of::<*mut c_void>() }

/// Size of an `OCIDate` slot, padded to pointer alignment.
pub const fn size_of_date() -> usize { align_to_pointer(mem::size_of::<OCIDate>()) }

/// Size of an `OCINumber` slot, padded to pointer alignment.
pub const fn size_of_number() -> usize { align_to_pointer(NUMBER_SIZE) }

/**
A region of native memory tagged with its owner.

Host owned buffers are zero-initialized on allocation and freed on drop. Buffers that wrap
OCI owned pointers are never freed by this crate, and as their size is unknown they only
expose their address.

All offset accessors check that the accessed slot lies within the buffer.

# Example

```
use ocibind::{NativeBuffer, Ownership, buffer};

let mut buf = NativeBuffer::alloc(buffer::size_of_int() + buffer::size_of_float())?;
buf.write_int(0, 42)?;
buf.write_float(buffer::size_of_int(), 0.5)?;
assert_eq!(buf.read_int(0)?, 42);
assert_eq!(buf.read_float(buffer::size_of_int())?, 0.5);
assert_eq!(buf.ownership(), Ownership::Host);
assert!(buf.write_int(buffer::size_of_float() + 1, 1).is_err());
# Ok::<(),ocibind::Error>(())
```
*/
pub struct NativeBuffer {
    ptr: *mut u8,
    len: usize,
    ownership: Ownership,
}

impl Drop for NativeBuffer {
    fn drop(&mut self) {
        if self.ownership == Ownership::Host && !self.ptr.is_null() {
            unsafe {
                libc::free(self.ptr as *mut c_void);
            }
        }
    }
}

impl std::fmt::Debug for NativeBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("NativeBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("ownership", &self.ownership)
            .finish()
    }
}

impl NativeBuffer {
    /// Allocates `size` zeroed bytes owned by the host.
    pub fn alloc(size: usize) -> Result<Self> {
        if size == 0 {
            return Err( Error::new("native buffer size must be positive") );
        }
        // calloc memory is suitably aligned for any native type
        let ptr = unsafe { libc::calloc(1, size) } as *mut u8;
        if ptr.is_null() {
            Err( Error::msg(format!("cannot allocate {} bytes", size)) )
        } else {
            Ok( Self { ptr, len: size, ownership: Ownership::Host } )
        }
    }

    /// Wraps memory that OCI owns.
    pub fn from_oci(ptr: *mut c_void) -> Self {
        Self { ptr: ptr as *mut u8, len: 0, ownership: Ownership::Oci }
    }

    /// Releases host owned memory now. OCI owned memory is left alone.
    pub fn release(self) {
        drop(self);
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_host_owned(&self) -> bool {
        self.ownership == Ownership::Host
    }

    /// Size in bytes of a host owned buffer, 0 for OCI owned memory.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.ptr as *mut c_void
    }

    fn slot(&self, offset: usize, size: usize) -> Result<*mut u8> {
        if self.ownership == Ownership::Oci {
            return Err( Error::new("OCI owned memory cannot be accessed by offset") );
        }
        match offset.checked_add(size) {
            Some(end) if end <= self.len => Ok( unsafe { self.ptr.add(offset) } ),
            _ => Err( Error::msg(format!("{} bytes at offset {} are outside of the {} byte buffer", size, offset, self.len)) ),
        }
    }

    pub(crate) fn write_value<T: Copy>(&mut self, offset: usize, val: T) -> Result<()> {
        let dst = self.slot(offset, mem::size_of::<T>())?;
        unsafe {
            ptr::write_unaligned(dst as *mut T, val);
        }
        Ok(())
    }

    pub(crate) fn read_value<T: Copy>(&self, offset: usize) -> Result<T> {
        let src = self.slot(offset, mem::size_of::<T>())?;
        Ok( unsafe { ptr::read_unaligned(src as *const T) } )
    }

    pub fn write_int(&mut self, offset: usize, val: i32) -> Result<()> {
        self.write_value(offset, val)
    }

    pub fn read_int(&self, offset: usize) -> Result<i32> {
        self.read_value(offset)
    }

    pub fn write_float(&mut self, offset: usize, val: f64) -> Result<()> {
        self.write_value(offset, val)
    }

    pub fn read_float(&self, offset: usize) -> Result<f64> {
        self.read_value(offset)
    }

    pub fn write_ptr(&mut self, offset: usize, val: *mut c_void) -> Result<()> {
        self.write_value(offset, val)
    }

    pub fn read_ptr(&self, offset: usize) -> Result<*mut c_void> {
        self.read_value(offset)
    }

    pub fn write_date(&mut self, offset: usize, val: &OCIDate) -> Result<()> {
        self.slot(offset, size_of_date())?;
        self.write_value(offset, *val)
    }

    pub fn read_date(&self, offset: usize) -> Result<OCIDate> {
        self.slot(offset, size_of_date())?;
        self.read_value(offset)
    }

    pub fn write_number(&mut self, offset: usize, val: &Number) -> Result<()> {
        self.write_value(offset, *val.as_oci())
    }

    pub fn read_number(&self, offset: usize) -> Result<Number> {
        self.read_value::<OCINumber>(offset).map(Number::from_oci)
    }

    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) -> Result<()> {
        let dst = self.slot(offset, bytes.len())?;
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
        }
        Ok(())
    }

    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let src = self.slot(offset, len)?;
        Ok( unsafe { std::slice::from_raw_parts(src, len) } )
    }

    /**
    Writes a NUL-terminated string into a slot of `max_len` bytes.
    Text that does not fit is truncated at a character boundary.
    */
    pub fn write_str(&mut self, offset: usize, val: &str, max_len: usize) -> Result<()> {
        if max_len == 0 {
            return Err( Error::new("string slot must have room for the terminating NUL") );
        }
        self.slot(offset, max_len)?;
        let mut end = val.len().min(max_len - 1);
        while !val.is_char_boundary(end) {
            end -= 1;
        }
        self.write_bytes(offset, &val.as_bytes()[..end])?;
        self.write_value(offset + end, 0u8)
    }

    /// Reads a NUL-terminated string from a slot of `max_len` bytes.
    pub fn read_str(&self, offset: usize, max_len: usize) -> Result<String> {
        let bytes = self.read_bytes(offset, max_len)?;
        let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok( String::from_utf8_lossy(&bytes[..len]).into_owned() )
    }
}

/// Layout of the elements of an [`ArrayBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Native 4-byte integer
    Int,
    /// Native double
    Float,
    /// NUL-terminated text in a slot of the given width, terminator included
    Text(usize),
    /// `OCIDate`
    Date,
    /// `OCINumber`
    Number,
}

impl ElementKind {
    /// Distance in bytes between consecutive elements. OCI reads arrays with a step equal to the element size.
    pub fn stride(&self) -> usize {
        match *self {
            ElementKind::Int       => size_of_int(),
            ElementKind::Float     => size_of_float(),
            ElementKind::Text(len) => len,
            ElementKind::Date      => mem::size_of::<OCIDate>(),
            ElementKind::Number    => NUMBER_SIZE,
        }
    }

    pub(crate) fn sql_type(&self) -> u16 {
        match self {
            ElementKind::Int     => SQLT_INT,
            ElementKind::Float   => SQLT_FLT,
            ElementKind::Text(_) => SQLT_STR,
            ElementKind::Date    => SQLT_ODT,
            ElementKind::Number  => SQLT_VNU,
        }
    }
}

/**
Typed array of values for bulk (array) binding.

# Example

```
use ocibind::{ArrayBuffer, ElementKind, Value};

let mut names = ArrayBuffer::new(ElementKind::Text(16), 3)?;
names.set(0, &Value::from("Abel"))?;
names.set(2, &Value::from("Zlotkey"))?;
assert_eq!(names.get(0)?, Value::from("Abel"));
assert_eq!(names.get(1)?, Value::Null);
assert!(names.set(3, &Value::from("Ozer")).is_err());
# Ok::<(),ocibind::Error>(())
```
*/
#[derive(Debug)]
pub struct ArrayBuffer {
    kind: ElementKind,
    rows: usize,
    data: NativeBuffer,
    inds: Vec<i16>,
}

impl ArrayBuffer {
    /// Allocates room for `rows` elements, all NULL.
    pub fn new(kind: ElementKind, rows: usize) -> Result<Self> {
        if rows == 0 {
            return Err( Error::new("array buffer must have at least one row") );
        }
        if kind.stride() == 0 {
            return Err( Error::new("text elements must be at least one byte wide") );
        }
        let size = kind.stride().checked_mul(rows).ok_or_else(|| Error::new("array buffer is too large"))?;
        let data = NativeBuffer::alloc(size)?;
        Ok( Self { kind, rows, data, inds: vec![OCI_IND_NULL; rows] } )
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    fn offset(&self, row: usize) -> Result<usize> {
        if row < self.rows {
            Ok( row * self.kind.stride() )
        } else {
            Err( Error::msg(format!("row {} is outside of the {} row array", row, self.rows)) )
        }
    }

    fn mismatch(&self, val: &Value) -> Error {
        Error::msg(format!("{:?} cannot be stored in a {:?} element", val, self.kind))
    }

    /// Stores the value of the row. `Value::Null` marks the row as NULL.
    pub fn set(&mut self, row: usize, val: &Value) -> Result<()> {
        let offset = self.offset(row)?;
        if let Value::Null = val {
            self.inds[row] = OCI_IND_NULL;
            return Ok(());
        }
        match (self.kind, val) {
            (ElementKind::Int, Value::Int(num)) => {
                let num = i32::try_from(*num).map_err(|_| Error::msg(format!("{} does not fit a native integer", num)))?;
                self.data.write_int(offset, num)?;
            }
            (ElementKind::Float, Value::Float(num)) => self.data.write_float(offset, *num)?,
            (ElementKind::Float, Value::Int(num)) => self.data.write_float(offset, *num as f64)?,
            (ElementKind::Text(len), Value::Text(text)) => self.data.write_str(offset, text, len)?,
            (ElementKind::Date, Value::Date(dt)) => {
                let date = date::from_datetime(dt)?;
                self.data.write_value(offset, date)?;
            }
            (ElementKind::Number, Value::Number(num)) => self.data.write_number(offset, num)?,
            _ => return Err( self.mismatch(val) ),
        }
        self.inds[row] = OCI_IND_NOTNULL;
        Ok(())
    }

    /// Returns the value of the row.
    pub fn get(&self, row: usize) -> Result<Value> {
        let offset = self.offset(row)?;
        if self.inds[row] == OCI_IND_NULL {
            return Ok( Value::Null );
        }
        let val = match self.kind {
            ElementKind::Int       => Value::Int(self.data.read_int(offset)? as i64),
            ElementKind::Float     => Value::Float(self.data.read_float(offset)?),
            ElementKind::Text(len) => Value::Text(self.data.read_str(offset, len)?),
            ElementKind::Date      => Value::Date(date::to_datetime(&self.data.read_value::<OCIDate>(offset)?)?),
            ElementKind::Number    => Value::Number(self.data.read_number(offset)?),
        };
        Ok( val )
    }

    pub(crate) fn data_ptr(&self) -> *mut c_void {
        self.data.as_ptr()
    }

    pub(crate) fn inds_ptr(&mut self) -> *mut c_void {
        self.inds.as_mut_ptr() as *mut c_void
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn slot_sizes_are_pointer_aligned() {
        assert_eq!(size_of_int(), 4);
        assert_eq!(size_of_float(), 8);
        assert_eq!(size_of_date() % size_of_pointer(), 0);
        assert!(size_of_date() >= mem::size_of::<OCIDate>());
        assert_eq!(size_of_number() % size_of_pointer(), 0);
        assert!(size_of_number() >= 22);
    }

    #[test]
    fn allocation_is_zeroed() -> Result<()> {
        let buf = NativeBuffer::alloc(64)?;
        assert_eq!(buf.len(), 64);
        assert!(buf.read_bytes(0, 64)?.iter().all(|&b| b == 0));
        assert!(NativeBuffer::alloc(0).is_err());
        Ok(())
    }

    #[test]
    fn ownership_survives_writes() -> Result<()> {
        let mut buf = NativeBuffer::alloc(size_of_date() * 2)?;
        let date = OCIDate { year: 2021, month: 12, day: 31, hour: 23, min: 59, sec: 59 };
        buf.write_date(size_of_date(), &date)?;
        buf.write_int(0, -7)?;
        assert_eq!(buf.ownership(), Ownership::Host);
        assert_eq!(buf.read_date(size_of_date())?, date);
        assert_eq!(buf.read_int(0)?, -7);
        Ok(())
    }

    #[test]
    fn oci_owned_memory_is_never_freed_or_indexed() {
        let mut payload = [0u8; 16];
        let buf = NativeBuffer::from_oci(payload.as_mut_ptr() as *mut c_void);
        assert_eq!(buf.ownership(), Ownership::Oci);
        assert!(!buf.is_host_owned());
        assert!(buf.read_int(0).is_err());
        assert_eq!(buf.as_ptr(), payload.as_mut_ptr() as *mut c_void);
        // freeing a stack address would abort the test
        buf.release();
    }

    #[test]
    fn accesses_are_bounds_checked() -> Result<()> {
        let mut buf = NativeBuffer::alloc(10)?;
        assert!(buf.write_float(2, 1.5).is_ok());
        assert!(buf.write_float(3, 1.5).is_err());
        assert!(buf.read_int(usize::MAX).is_err());
        assert!(buf.write_str(4, "abc", 7).is_err());
        assert!(buf.write_ptr(0, ptr::null_mut()).is_ok());
        Ok(())
    }

    #[test]
    fn strings_are_truncated_to_slot() -> Result<()> {
        let mut buf = NativeBuffer::alloc(16)?;
        buf.write_str(0, "Hello, World!", 6)?;
        assert_eq!(buf.read_str(0, 6)?, "Hello");
        buf.write_str(8, "żółw", 4)?;
        assert_eq!(buf.read_str(8, 4)?, "ż");
        assert!(buf.write_str(0, "x", 0).is_err());
        Ok(())
    }

    #[test]
    fn numbers_keep_their_encoding() -> Result<()> {
        let mut buf = NativeBuffer::alloc(size_of_number())?;
        let mut num = OCINumber::zero();
        num.bytes[0] = 2;
        num.bytes[1] = 193;
        num.bytes[2] = 8;
        buf.write_number(0, &Number::from_oci(num))?;
        assert_eq!(buf.read_number(0)?, Number::from_oci(num));
        Ok(())
    }

    #[test]
    fn array_elements() -> Result<()> {
        let mut ids = ArrayBuffer::new(ElementKind::Int, 3)?;
        ids.set(0, &Value::Int(100))?;
        ids.set(2, &Value::Int(-3))?;
        assert_eq!(ids.get(0)?, Value::Int(100));
        assert_eq!(ids.get(1)?, Value::Null);
        assert_eq!(ids.get(2)?, Value::Int(-3));
        assert!(ids.set(1, &Value::Int(i64::MAX)).is_err());
        assert!(ids.set(1, &Value::from("100")).is_err());
        ids.set(0, &Value::Null)?;
        assert_eq!(ids.get(0)?, Value::Null);

        let mut rates = ArrayBuffer::new(ElementKind::Float, 2)?;
        rates.set(0, &Value::Int(2))?;
        rates.set(1, &Value::Float(0.25))?;
        assert_eq!(rates.get(0)?, Value::Float(2.0));
        assert_eq!(rates.get(1)?, Value::Float(0.25));

        let hired = NaiveDate::from_ymd_opt(2003, 6, 17).and_then(|d| d.and_hms_opt(9, 30, 0)).expect("date");
        let mut dates = ArrayBuffer::new(ElementKind::Date, 2)?;
        dates.set(1, &Value::Date(hired))?;
        assert_eq!(dates.get(1)?, Value::Date(hired));
        assert_eq!(dates.kind().stride(), mem::size_of::<OCIDate>());
        Ok(())
    }

    #[test]
    fn empty_arrays_are_rejected() {
        assert!(ArrayBuffer::new(ElementKind::Int, 0).is_err());
        assert!(ArrayBuffer::new(ElementKind::Text(0), 5).is_err());
    }
}
