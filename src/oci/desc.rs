//! OCI descriptors

use crate::{Result, Error, oci};
use super::*;
use libc::c_void;
use std::ptr;

pub(crate) trait DescriptorType : OCIStruct {
    fn get_type() -> u32;
}

macro_rules! impl_descr_type {
    ($($oci_desc:ident => $id:ident),+) => {
        $(
            impl DescriptorType for $oci_desc {
                fn get_type() -> u32 { $id }
            }
        )+
    };
}

impl_descr_type!{
    OCIParam                => OCI_DTYPE_PARAM,
    OCIAQEnqOptions         => OCI_DTYPE_AQENQ_OPTIONS,
    OCIAQDeqOptions         => OCI_DTYPE_AQDEQ_OPTIONS,
    OCIAQMsgProperties      => OCI_DTYPE_AQMSG_PROPERTIES
}

/// Owns an OCI descriptor and frees it on drop.
pub(crate) struct Descriptor<T: DescriptorType> {
    ptr: Ptr<T>,
}

impl<T: DescriptorType> Drop for Descriptor<T> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            oci::descriptor_free(self.ptr.as_c_void(), T::get_type());
        }
    }
}

impl<T: DescriptorType> Descriptor<T> {
    fn alloc(env: *mut OCIEnv) -> Result<*mut T> {
        let mut desc = ptr::null_mut::<T>();
        oci::descriptor_alloc(env, &mut desc as *mut *mut T as *mut *mut c_void, T::get_type())?;
        if desc.is_null() {
            Err( Error::new("OCIDescriptorAlloc returned NULL") )
        } else {
            Ok( desc )
        }
    }

    pub(crate) fn new(env: *mut OCIEnv) -> Result<Self> {
        let desc = Self::alloc(env)?;
        Ok( Self { ptr: Ptr::new(desc) } )
    }

    /// Takes ownership of a descriptor that OCI allocated implicitly, such as the ones returned by `OCIParamGet`.
    pub(crate) fn from(ptr: *mut T) -> Self {
        Self { ptr: Ptr::new(ptr) }
    }

    pub(crate) fn get(&self) -> *mut T {
        self.ptr.get()
    }

    pub(crate) fn get_attr<V: attr::AttrGet>(&self, attr_type: u32, err: *mut OCIError) -> Result<V> {
        attr::get::<V>(attr_type, T::get_type(), self.get() as *const c_void, err)
    }

    pub(crate) fn set_attr<V: attr::AttrSet>(&self, attr_type: u32, attr_val: V, err: *mut OCIError) -> Result<()> {
        attr::set::<V>(attr_type, attr_val, T::get_type(), self.get() as *mut c_void, err)
    }
}
