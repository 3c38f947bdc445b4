use crate::{Result, oci};
use super::*;
use libc::c_void;
use std::mem;

pub(crate) trait AttrGet {
    type ValueType;
    fn new(val: Self::ValueType, len: usize) -> Self;
}

pub(crate) trait AttrSet {
    fn as_ptr(&self) -> *const c_void;
    fn len(&self) -> usize { 0 }
}

pub(crate) fn get<A>(attr_type: u32, obj_type: u32, obj: *const c_void, err: *mut OCIError) -> Result<A>
where A: AttrGet
{
    let mut attr_val  = mem::MaybeUninit::<A::ValueType>::zeroed();
    let mut attr_size = 0u32;
    oci::attr_get(obj, obj_type, attr_val.as_mut_ptr() as _, &mut attr_size, attr_type, err)?;
    Ok( AttrGet::new( unsafe { attr_val.assume_init() }, attr_size as usize) )
}

pub(crate) fn set<A>(attr_type: u32, attr_val: A, obj_type: u32, obj: *mut c_void, err: *mut OCIError) -> Result<()>
where A: AttrSet
{
    oci::attr_set(obj, obj_type, attr_val.as_ptr(), attr_val.len() as u32, attr_type, err)
}

macro_rules! impl_int_attr {
    ($($t:ty),+) => {
        $(
            impl AttrGet for $t {
                type ValueType = $t;
                fn new(val: $t, _len: usize) -> Self {
                    val
                }
            }
            impl AttrSet for $t {
                fn as_ptr(&self) -> *const c_void {
                    self as *const $t as _
                }
            }
        )+
    };
}

impl_int_attr!{ u8, i8, u16, i16, u32, i32 }

macro_rules! impl_oci_handle_attr {
    ($($t:ty),+) => {
        $(
            impl AttrSet for *mut $t {
                fn as_ptr(&self) -> *const c_void {
                    *self as *const $t as _
                }
            }
        )+
    };
}

impl_oci_handle_attr!{ OCIServer, OCISession }

/// Text attributes are returned as a pointer into OCI owned memory and are copied out right away.
impl AttrGet for String {
    type ValueType = *const u8;
    fn new(ptr: *const u8, len: usize) -> Self {
        if ptr.is_null() || len == 0 {
            String::new()
        } else {
            let bytes = unsafe { std::slice::from_raw_parts(ptr, len) };
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

impl AttrSet for &str {
    fn as_ptr(&self) -> *const c_void {
        (*self).as_ptr() as _
    }
    fn len(&self) -> usize {
        (*self).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_attributes_are_copied() {
        let name = b"EMPLOYEE_ID";
        let text = <String as AttrGet>::new(name.as_ptr(), name.len());
        assert_eq!(text, "EMPLOYEE_ID");
        let empty = <String as AttrGet>::new(std::ptr::null(), 5);
        assert!(empty.is_empty());
    }

    #[test]
    fn str_attribute_reports_its_length() {
        let module = "payroll";
        assert_eq!(AttrSet::len(&module), 7);
        assert_eq!(AttrSet::as_ptr(&module), module.as_ptr() as *const c_void);
    }
}
