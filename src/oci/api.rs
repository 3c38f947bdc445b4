//! Runtime resolution of the OCI client library entry points.

#![allow(non_snake_case)]

use crate::{Result, Error, config::ClientConfig};
use super::*;
use libc::{c_char, c_void, size_t};
use once_cell::sync::OnceCell;
use std::{ffi::CString, mem, path::PathBuf};

pub(crate) const LOAD_FAILURE_MSG : &str = "Cannot load the OCI client library (check ORACLE_HOME?)";

/// In-bind callback signature used by `OCIBindDynamic`
pub(crate) type OCICallbackInBind = extern "C" fn(
    ictxp:      *mut c_void,
    bindp:      *mut OCIBind,
    iter:       u32,
    index:      u32,
    bufpp:      *mut *mut c_void,
    alenp:      *mut u32,
    piecep:     *mut u8,
    indp:       *mut *mut c_void
) -> i32;

/// Out-bind callback signature used by `OCIBindDynamic`
pub(crate) type OCICallbackOutBind = extern "C" fn(
    octxp:      *mut c_void,
    bindp:      *mut OCIBind,
    iter:       u32,
    index:      u32,
    bufpp:      *mut *mut c_void,
    alenp:      *mut *mut u32,
    piecep:     *mut u8,
    indp:       *mut *mut c_void,
    rcodep:     *mut *mut u16
) -> i32;

struct Library {
    handle: *mut c_void,
    path: PathBuf,
}

unsafe impl Send for Library {}
unsafe impl Sync for Library {}

impl Drop for Library {
    fn drop(&mut self) {
        unsafe {
            libc::dlclose(self.handle);
        }
    }
}

impl Library {
    fn open(candidates: Vec<PathBuf>) -> Result<Self> {
        for path in candidates {
            let name = match CString::new(path.to_string_lossy().as_bytes()) {
                Ok(name) => name,
                Err(_) => continue,
            };
            let handle = unsafe { libc::dlopen(name.as_ptr(), libc::RTLD_NOW | libc::RTLD_GLOBAL) };
            if handle.is_null() {
                log::debug!("{} is not loadable", path.display());
            } else {
                return Ok(Self { handle, path });
            }
        }
        Err( Error::new(LOAD_FAILURE_MSG) )
    }

    unsafe fn symbol<T: Copy>(&self, name: &'static str) -> Result<T> {
        let sym = libc::dlsym(self.handle, name.as_ptr() as *const c_char);
        if sym.is_null() {
            Err( Error::msg(format!("{} does not export {}", self.path.display(), name.trim_end_matches('\0'))) )
        } else {
            debug_assert_eq!(mem::size_of::<T>(), mem::size_of::<*mut c_void>());
            Ok( mem::transmute_copy(&sym) )
        }
    }
}

macro_rules! oci_api {
    ($( fn $name:ident ( $($arg:ident : $ty:ty),* $(,)? ) $(-> $ret:ty)? ; )+) => {
        /// Entry points of the loaded OCI client library
        pub(crate) struct Api {
            $( pub(crate) $name: unsafe extern "C" fn( $($arg: $ty),* ) $(-> $ret)?, )+
            lib: Library,
        }

        impl Api {
            unsafe fn resolve(lib: Library) -> Result<Self> {
                Ok(Self {
                    $( $name: lib.symbol(concat!(stringify!($name), "\0"))?, )+
                    lib,
                })
            }
        }
    };
}

oci_api! {
    fn OCIEnvNlsCreate(
        envhpp:     *mut *mut OCIEnv,
        mode:       u32,
        ctxp:       *const c_void,
        malocfp:    *const c_void,
        ralocfp:    *const c_void,
        mfreefp:    *const c_void,
        xtramemsz:  size_t,
        usrmempp:   *const c_void,
        charset:    u16,
        ncharset:   u16
    ) -> i32;

    fn OCITerminate(mode: u32) -> i32;

    fn OCIClientVersion(
        major:          *mut i32,
        minor:          *mut i32,
        update:         *mut i32,
        patch:          *mut i32,
        port_update:    *mut i32
    );

    fn OCIHandleAlloc(
        parenth:    *const OCIEnv,
        hndlpp:     *mut *mut c_void,
        hndl_type:  u32,
        xtramem_sz: size_t,
        usrmempp:   *const c_void
    ) -> i32;

    fn OCIHandleFree(hndlp: *mut c_void, hnd_type: u32) -> i32;

    fn OCIDescriptorAlloc(
        parenth:    *const OCIEnv,
        descpp:     *mut *mut c_void,
        desc_type:  u32,
        xtramem_sz: size_t,
        usrmempp:   *const c_void
    ) -> i32;

    fn OCIDescriptorFree(descp: *mut c_void, desc_type: u32) -> i32;

    fn OCIAttrGet(
        trgthndlp:  *const c_void,
        trghndltyp: u32,
        attributep: *mut c_void,
        sizep:      *mut u32,
        attrtype:   u32,
        errhp:      *mut OCIError
    ) -> i32;

    fn OCIAttrSet(
        trgthndlp:  *mut c_void,
        trghndltyp: u32,
        attributep: *const c_void,
        size:       u32,
        attrtype:   u32,
        errhp:      *mut OCIError
    ) -> i32;

    fn OCIParamGet(
        hndlp:      *const c_void,
        htype:      u32,
        errhp:      *mut OCIError,
        descr:      *mut *mut c_void,
        pos:        u32
    ) -> i32;

    fn OCIErrorGet(
        hndlp:      *const c_void,
        recordno:   u32,
        sqlstate:   *const c_void,
        errcodep:   *mut i32,
        bufp:       *mut u8,
        bufsiz:     u32,
        hnd_type:   u32
    ) -> i32;

    fn OCIServerAttach(
        srvhp:      *mut OCIServer,
        errhp:      *mut OCIError,
        dblink:     *const u8,
        dblink_len: i32,
        mode:       u32
    ) -> i32;

    fn OCIServerDetach(srvhp: *mut OCIServer, errhp: *mut OCIError, mode: u32) -> i32;

    fn OCISessionBegin(
        svchp:      *mut OCISvcCtx,
        errhp:      *mut OCIError,
        userhp:     *mut OCISession,
        credt:      u32,
        mode:       u32
    ) -> i32;

    fn OCISessionEnd(
        svchp:      *mut OCISvcCtx,
        errhp:      *mut OCIError,
        userhp:     *mut OCISession,
        mode:       u32
    ) -> i32;

    fn OCITransCommit(svchp: *mut OCISvcCtx, errhp: *mut OCIError, flags: u32) -> i32;

    fn OCITransRollback(svchp: *mut OCISvcCtx, errhp: *mut OCIError, flags: u32) -> i32;

    fn OCIPing(svchp: *mut OCISvcCtx, errhp: *mut OCIError, mode: u32) -> i32;

    fn OCIStmtPrepare(
        stmtp:      *mut OCIStmt,
        errhp:      *mut OCIError,
        stmt:       *const u8,
        stmt_len:   u32,
        language:   u32,
        mode:       u32
    ) -> i32;

    fn OCIStmtExecute(
        svchp:      *mut OCISvcCtx,
        stmtp:      *mut OCIStmt,
        errhp:      *mut OCIError,
        iters:      u32,
        rowoff:     u32,
        snap_in:    *const c_void,
        snap_out:   *mut c_void,
        mode:       u32
    ) -> i32;

    fn OCIStmtFetch2(
        stmtp:      *mut OCIStmt,
        errhp:      *mut OCIError,
        nrows:      u32,
        orient:     u16,
        offset:     i32,
        mode:       u32
    ) -> i32;

    fn OCIBindByPos2(
        stmtp:      *mut OCIStmt,
        bindpp:     *mut *mut OCIBind,
        errhp:      *mut OCIError,
        position:   u32,
        valuep:     *mut c_void,
        value_sz:   i64,
        dty:        u16,
        indp:       *mut c_void,
        alenp:      *mut u32,
        rcodep:     *mut u16,
        maxarr_len: u32,
        curelep:    *mut u32,
        mode:       u32
    ) -> i32;

    fn OCIBindByName2(
        stmtp:      *mut OCIStmt,
        bindpp:     *mut *mut OCIBind,
        errhp:      *mut OCIError,
        namep:      *const u8,
        name_len:   i32,
        valuep:     *mut c_void,
        value_sz:   i64,
        dty:        u16,
        indp:       *mut c_void,
        alenp:      *mut u32,
        rcodep:     *mut u16,
        maxarr_len: u32,
        curelep:    *mut u32,
        mode:       u32
    ) -> i32;

    fn OCIBindDynamic(
        bindp:      *mut OCIBind,
        errhp:      *mut OCIError,
        ictxp:      *mut c_void,
        icbfp:      OCICallbackInBind,
        octxp:      *mut c_void,
        ocbfp:      OCICallbackOutBind
    ) -> i32;

    fn OCIDefineByPos2(
        stmtp:      *mut OCIStmt,
        defnpp:     *mut *mut OCIDefine,
        errhp:      *mut OCIError,
        position:   u32,
        valuep:     *mut c_void,
        value_sz:   i64,
        dty:        u16,
        indp:       *mut c_void,
        rlenp:      *mut u32,
        rcodep:     *mut u16,
        mode:       u32
    ) -> i32;

    fn OCINumberFromInt(
        err:        *mut OCIError,
        inum:       *const c_void,
        inum_len:   u32,
        sign_flag:  u32,
        number:     *mut OCINumber
    ) -> i32;

    fn OCINumberToInt(
        err:        *mut OCIError,
        number:     *const OCINumber,
        rsl_length: u32,
        rsl_flag:   u32,
        rsl:        *mut c_void
    ) -> i32;

    fn OCINumberFromReal(
        err:        *mut OCIError,
        rnum:       *const c_void,
        rnum_len:   u32,
        number:     *mut OCINumber
    ) -> i32;

    fn OCINumberToReal(
        err:        *mut OCIError,
        number:     *const OCINumber,
        rsl_length: u32,
        rsl:        *mut c_void
    ) -> i32;

    fn OCITypeByName(
        env:        *mut OCIEnv,
        err:        *mut OCIError,
        svc:        *const OCISvcCtx,
        schema:     *const u8,
        s_length:   u32,
        type_name:  *const u8,
        t_length:   u32,
        version:    *const u8,
        v_length:   u32,
        duration:   u16,
        option:     u32,
        tdo:        *mut *mut OCIType
    ) -> i32;

    fn OCIStringAssignText(
        env:        *mut OCIEnv,
        err:        *mut OCIError,
        rhs:        *const u8,
        rhs_len:    u32,
        lhs:        *mut *mut OCIString
    ) -> i32;

    fn OCIRawAssignBytes(
        env:        *mut OCIEnv,
        err:        *mut OCIError,
        rhs:        *const u8,
        rhs_len:    u32,
        lhs:        *mut *mut OCIRaw
    ) -> i32;

    fn OCIRawSize(env: *mut OCIEnv, raw: *const OCIRaw) -> u32;

    fn OCIRawPtr(env: *mut OCIEnv, raw: *const OCIRaw) -> *mut u8;

    fn OCIAQEnq(
        svchp:      *mut OCISvcCtx,
        errhp:      *mut OCIError,
        queue_name: *const u8,
        enqopt:     *mut c_void,
        msgprop:    *mut c_void,
        payload_tdo:*mut OCIType,
        payload:    *mut *mut c_void,
        payload_ind:*mut *mut c_void,
        msgid:      *mut *mut OCIRaw,
        flags:      u32
    ) -> i32;

    fn OCIAQDeq(
        svchp:      *mut OCISvcCtx,
        errhp:      *mut OCIError,
        queue_name: *const u8,
        deqopt:     *mut c_void,
        msgprop:    *mut c_void,
        payload_tdo:*mut OCIType,
        payload:    *mut *mut c_void,
        payload_ind:*mut *mut c_void,
        msgid:      *mut *mut OCIRaw,
        flags:      u32
    ) -> i32;
}

static API: OnceCell<Api> = OnceCell::new();

impl Api {
    fn load(config: &ClientConfig) -> Result<Self> {
        let lib = Library::open(config.library_candidates())?;
        log::debug!("loaded OCI client library from {}", lib.path.display());
        unsafe { Self::resolve(lib) }
    }

    /// Path the client library was loaded from
    pub(crate) fn path(&self) -> &std::path::Path {
        &self.lib.path
    }
}

/// Loads the client library using the provided configuration unless it is already loaded.
pub(crate) fn init(config: &ClientConfig) -> Result<&'static Api> {
    API.get_or_try_init(|| Api::load(config))
}

/// Returns the loaded client library, loading it as configured by the process environment if necessary.
pub(crate) fn api() -> Result<&'static Api> {
    match API.get() {
        Some(api) => Ok(api),
        None => init(&ClientConfig::from_env()),
    }
}

/// Returns the loaded client library only if it has been loaded already.
pub(crate) fn loaded() -> Option<&'static Api> {
    API.get()
}
