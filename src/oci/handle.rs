//! OCI handles.

use crate::{Result, Error, oci};
use super::*;
use libc::c_void;
use std::ptr;

/// Maps a handle struct to its OCI handle type constant
pub(crate) trait HandleType : OCIStruct {
    fn get_type() -> u32;
}

macro_rules! impl_handle_type {
    ($($oci_handle:ty => $id:ident),+) => {
        $(
            impl HandleType for $oci_handle {
                fn get_type() -> u32 { $id }
            }
        )+
    };
}

impl_handle_type!{
    OCIEnv      => OCI_HTYPE_ENV,
    OCIError    => OCI_HTYPE_ERROR,
    OCISvcCtx   => OCI_HTYPE_SVCCTX,
    OCIStmt     => OCI_HTYPE_STMT,
    OCIServer   => OCI_HTYPE_SERVER,
    OCISession  => OCI_HTYPE_SESSION
}

/// Owns an OCI handle and frees it on drop.
pub(crate) struct Handle<T: HandleType> (Ptr<T>);

impl<T: HandleType> Drop for Handle<T> {
    fn drop(&mut self) {
        if !self.0.is_null() {
            log::trace!("freeing handle type {} at {:?}", T::get_type(), self.0);
            oci::handle_free(self.0.as_c_void(), T::get_type());
        }
    }
}

impl<T: HandleType> Handle<T> {
    fn alloc(env: *mut OCIEnv) -> Result<Ptr<T>> {
        let mut handle = ptr::null_mut::<T>();
        oci::handle_alloc(env, &mut handle as *mut *mut T as *mut *mut c_void, T::get_type())?;
        if handle.is_null() {
            Err( Error::msg(format!("OCI returned NULL for handle {}", T::get_type())) )
        } else {
            Ok( Ptr::new(handle) )
        }
    }

    pub(crate) fn new(env: *mut OCIEnv) -> Result<Self> {
        let handle_ptr = Self::alloc(env)?;
        Ok( Self(handle_ptr) )
    }

    // The environment handle is allocated by OCIEnvNlsCreate rather than OCIHandleAlloc,
    // but is disposed of like any other handle.
    pub(crate) fn from(handle_ptr: Ptr<T>) -> Self {
        Self(handle_ptr)
    }

    pub(crate) fn take(other: &mut Self) -> Self {
        let mut handle_ptr = Ptr::<T>::null();
        handle_ptr.swap(&mut other.0);
        Self(handle_ptr)
    }

    pub(crate) fn get(&self) -> *mut T {
        self.0.get()
    }

    pub(crate) fn get_ptr(&self) -> Ptr<T> {
        self.0
    }

    pub(crate) fn is_null(&self) -> bool {
        self.0.is_null()
    }

    pub(crate) fn get_attr<V: attr::AttrGet>(&self, attr_type: u32, err: *mut OCIError) -> Result<V> {
        attr::get::<V>(attr_type, T::get_type(), self.0.as_c_void(), err)
    }

    pub(crate) fn set_attr<V: attr::AttrSet>(&self, attr_type: u32, attr_val: V, err: *mut OCIError) -> Result<()> {
        attr::set::<V>(attr_type, attr_val, T::get_type(), self.0.as_c_void(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_types_match_oci_constants() {
        assert_eq!(OCIEnv::get_type(), 1);
        assert_eq!(OCIError::get_type(), 2);
        assert_eq!(OCISvcCtx::get_type(), 3);
        assert_eq!(OCIStmt::get_type(), 4);
        assert_eq!(OCIServer::get_type(), 8);
        assert_eq!(OCISession::get_type(), 9);
    }

    #[test]
    fn taken_handle_leaves_null_behind() {
        let mut byte = 0u8;
        let mut orig = Handle::from(Ptr::new(&mut byte as *mut u8 as *mut OCIError));
        let taken = Handle::take(&mut orig);
        assert!(orig.is_null());
        assert!(!taken.is_null());
        // the handle is not an OCI allocation, so it must not reach OCIHandleFree
        std::mem::forget(taken);
    }
}
