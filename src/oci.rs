//! Oracle OCI

#![allow(dead_code)]

use crate::{Result, Error};
use libc::c_void;
use std::ptr::{null, null_mut};

pub(crate) mod api;
pub(crate) mod ptr;
pub(crate) mod attr;
pub(crate) mod handle;
pub(crate) mod desc;

pub(crate) use self::ptr::Ptr;
pub(crate) use handle::Handle;
pub(crate) use desc::Descriptor;
pub(crate) use api::{api, OCICallbackInBind, OCICallbackOutBind};

pub(crate) const OCI_DEFAULT                : u32 = 0;

// OCI Return Codes
pub(crate) const OCI_SUCCESS                : i32 = 0;
pub(crate) const OCI_SUCCESS_WITH_INFO      : i32 = 1;
pub(crate) const OCI_NEED_DATA              : i32 = 99;
pub(crate) const OCI_NO_DATA                : i32 = 100;
pub(crate) const OCI_ERROR                  : i32 = -1;
pub(crate) const OCI_INVALID_HANDLE         : i32 = -2;
pub(crate) const OCI_CONTINUE               : i32 = -24200;

// Handle Types
pub(crate) const OCI_HTYPE_ENV              : u32 = 1;
pub(crate) const OCI_HTYPE_ERROR            : u32 = 2;
pub(crate) const OCI_HTYPE_SVCCTX           : u32 = 3;
pub(crate) const OCI_HTYPE_STMT             : u32 = 4;
pub(crate) const OCI_HTYPE_BIND             : u32 = 5;
pub(crate) const OCI_HTYPE_DEFINE           : u32 = 6;
pub(crate) const OCI_HTYPE_SERVER           : u32 = 8;
pub(crate) const OCI_HTYPE_SESSION          : u32 = 9;

// Descriptor Types
pub(crate) const OCI_DTYPE_PARAM            : u32 = 53;
pub(crate) const OCI_DTYPE_AQENQ_OPTIONS    : u32 = 57;
pub(crate) const OCI_DTYPE_AQDEQ_OPTIONS    : u32 = 58;
pub(crate) const OCI_DTYPE_AQMSG_PROPERTIES : u32 = 59;

// Handle Definitions
#[repr(C)] pub struct OCIEnv                { _private: [u8; 0] }
#[repr(C)] pub struct OCIError              { _private: [u8; 0] }
#[repr(C)] pub struct OCISvcCtx             { _private: [u8; 0] }
#[repr(C)] pub struct OCIStmt               { _private: [u8; 0] }
#[repr(C)] pub struct OCIBind               { _private: [u8; 0] }
#[repr(C)] pub struct OCIDefine             { _private: [u8; 0] }
#[repr(C)] pub struct OCIServer             { _private: [u8; 0] }
#[repr(C)] pub struct OCISession            { _private: [u8; 0] }

// Descriptor Definitions
#[repr(C)] pub struct OCIParam              { _private: [u8; 0] }
#[repr(C)] pub struct OCIAQEnqOptions       { _private: [u8; 0] }
#[repr(C)] pub struct OCIAQDeqOptions       { _private: [u8; 0] }
#[repr(C)] pub struct OCIAQMsgProperties    { _private: [u8; 0] }

// Object cache types
#[repr(C)] pub struct OCIType               { _private: [u8; 0] }
#[repr(C)] pub struct OCIString             { _private: [u8; 0] }
#[repr(C)] pub struct OCIRaw                { _private: [u8; 0] }

/// Marker trait for OCI handles and descriptors
pub trait OCIStruct {}

macro_rules! mark_as_oci {
    ($($t:ty),+) => {
        $(
            impl OCIStruct for $t {}
        )+
    };
}

mark_as_oci!(OCIEnv, OCIError, OCISvcCtx, OCIStmt, OCIBind, OCIDefine, OCIServer, OCISession);
mark_as_oci!(OCIParam, OCIAQEnqOptions, OCIAQDeqOptions, OCIAQMsgProperties);
mark_as_oci!(OCIType, OCIString, OCIRaw);

/// C mapping of the Oracle NUMBER
#[derive(Clone, Copy)]
#[repr(C)]
pub struct OCINumber {
    pub(crate) bytes: [u8; 22]
}

impl OCINumber {
    /// Returns an encoded zero, which OCI accepts as an output buffer.
    pub(crate) fn zero() -> Self {
        let mut bytes = [0u8; 22];
        bytes[0] = 1;
        bytes[1] = 128;
        Self { bytes }
    }
}

impl std::fmt::Debug for OCINumber {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let len = (self.bytes[0] as usize + 1).min(self.bytes.len());
        f.debug_tuple("OCINumber").field(&&self.bytes[..len]).finish()
    }
}

/// C mapping of the Oracle DATE type (SQLT_ODT)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct OCIDate {
    pub(crate) year: i16, // gregorian year: range is -4712 <= year <= 9999
    pub(crate) month: u8, // month: range is 1 <= month <= 12
    pub(crate) day:   u8, // day: range is 1 <= day <= 31
    pub(crate) hour:  u8, // hours: range is 0 <= hours <= 23
    pub(crate) min:   u8, // minutes: range is 0 <= minutes <= 59
    pub(crate) sec:   u8  // seconds: range is 0 <= seconds <= 59
}

// Data types
pub(crate) const SQLT_CHR               : u16 = 1;   // (ORANET TYPE) character string
pub(crate) const SQLT_NUM               : u16 = 2;   // (ORANET TYPE) oracle numeric
pub(crate) const SQLT_INT               : u16 = 3;   // (ORANET TYPE) integer
pub(crate) const SQLT_FLT               : u16 = 4;   // (ORANET TYPE) Floating point number
pub(crate) const SQLT_STR               : u16 = 5;   // zero terminated string
pub(crate) const SQLT_VNU               : u16 = 6;   // NUM with preceding length byte
pub(crate) const SQLT_VCS               : u16 = 9;   // Variable character string
pub(crate) const SQLT_DAT               : u16 = 12;  // date in oracle format
pub(crate) const SQLT_BFLOAT            : u16 = 21;  // Native Binary float
pub(crate) const SQLT_BDOUBLE           : u16 = 22;  // NAtive binary double
pub(crate) const SQLT_BIN               : u16 = 23;  // binary data(DTYBIN)
pub(crate) const SQLT_AFC               : u16 = 96;  // Ansi fixed char
pub(crate) const SQLT_AVC               : u16 = 97;  // Ansi Var char
pub(crate) const SQLT_IBFLOAT           : u16 = 100; // binary float canonical
pub(crate) const SQLT_IBDOUBLE          : u16 = 101; // binary double canonical
pub(crate) const SQLT_ODT               : u16 = 156; // OCIDate type

// Null indicator information
pub(crate) const OCI_IND_NOTNULL        : i16 = 0;
pub(crate) const OCI_IND_NULL           : i16 = -1;

// OBJECT Duration
pub(crate) const OCI_DURATION_SESSION   : u16 = 10;

// OCITypeByName options
pub(crate) const OCI_TYPEGET_ALL        : u32 = 1;

// Number conversion sign flags
pub(crate) const OCI_NUMBER_SIGNED      : u32 = 2;

// Character Sets
pub(crate) const AL32UTF8               : u16 = 873;

// Initialization Modes
pub(crate) const OCI_THREADED           : u32 = 1;
pub(crate) const OCI_OBJECT             : u32 = 2;

// Credential Types
pub(crate) const OCI_CRED_RDBMS         : u32 = 1;
pub(crate) const OCI_CRED_EXT           : u32 = 2;

// Attributes
pub(crate) const OCI_ATTR_DATA_SIZE         : u32 = 1;
pub(crate) const OCI_ATTR_DATA_TYPE         : u32 = 2;
pub(crate) const OCI_ATTR_NAME              : u32 = 4;
pub(crate) const OCI_ATTR_PRECISION         : u32 = 5;
pub(crate) const OCI_ATTR_SCALE             : u32 = 6;
pub(crate) const OCI_ATTR_IS_NULL           : u32 = 7;
pub(crate) const OCI_ATTR_SERVER            : u32 = 6;
pub(crate) const OCI_ATTR_SESSION           : u32 = 7;
pub(crate) const OCI_ATTR_ROW_COUNT         : u32 = 9;
pub(crate) const OCI_ATTR_PARAM_COUNT       : u32 = 18;
pub(crate) const OCI_ATTR_USERNAME          : u32 = 22;
pub(crate) const OCI_ATTR_PASSWORD          : u32 = 23;
pub(crate) const OCI_ATTR_STMT_TYPE         : u32 = 24;
pub(crate) const OCI_ATTR_ROWS_RETURNED     : u32 = 42;
pub(crate) const OCI_ATTR_WAIT              : u32 = 53;
pub(crate) const OCI_ATTR_SERVER_STATUS     : u32 = 143;
pub(crate) const OCI_ATTR_CLIENT_IDENTIFIER : u32 = 278;
pub(crate) const OCI_ATTR_MODULE            : u32 = 366;
pub(crate) const OCI_ATTR_ACTION            : u32 = 367;
pub(crate) const OCI_ATTR_CLIENT_INFO       : u32 = 368;
pub(crate) const OCI_ATTR_DRIVER_NAME       : u32 = 424;

// Server Handle Attribute Values
pub(crate) const OCI_SERVER_NORMAL          : u32 = 1;

pub(crate) const OCI_ERROR_MAXMSG_SIZE      : usize = 3072;

pub(crate) const OCI_FETCH_NEXT             : u16 = 2;

pub(crate) const OCI_ONE_PIECE              : u8 = 0;

// Parsing Syntax Types
pub(crate) const OCI_NTV_SYNTAX             : u32 = 1;

// Execution Modes
pub(crate) const OCI_DESCRIBE_ONLY          : u32 = 0x10;
pub(crate) const OCI_COMMIT_ON_SUCCESS      : u32 = 0x20;

// Bind Modes
pub(crate) const OCI_DATA_AT_EXEC           : u32 = 0x02;

// Statement Types
pub(crate) const OCI_STMT_SELECT            : u16 = 1;

/// Translates the return code of a call that reported its failure through an error handle.
pub(crate) fn check(res: i32, err: *mut OCIError) -> Result<()> {
    match res {
        OCI_SUCCESS => Ok(()),
        OCI_SUCCESS_WITH_INFO => {
            log::warn!("{}", Error::oci(err, res).message());
            Ok(())
        }
        _ => Err( Error::oci(err, res) ),
    }
}

/// Translates the return code of a call that reported its failure through the environment handle.
fn check_env(res: i32, env: *mut OCIEnv) -> Result<()> {
    match res {
        OCI_SUCCESS => Ok(()),
        OCI_SUCCESS_WITH_INFO => {
            log::warn!("{}", Error::env(env, res).message());
            Ok(())
        }
        _ => Err( Error::env(env, res) ),
    }
}

macro_rules! call {
    ($f:ident ( $($arg:expr),* $(,)? )) => {{
        let api = api()?;
        unsafe { (api.$f)( $($arg),* ) }
    }};
}

pub(crate) fn env_nls_create(envhpp: *mut *mut OCIEnv, mode: u32, charset: u16) -> Result<i32> {
    Ok( call!(OCIEnvNlsCreate(
        envhpp, mode,
        null(), null(), null(), null(), 0, null(),
        charset, charset
    )) )
}

pub(crate) fn terminate() -> Result<()> {
    let res = call!(OCITerminate(OCI_DEFAULT));
    if res == OCI_SUCCESS { Ok(()) } else { Err( Error::msg(format!("OCITerminate returned {}", res)) ) }
}

pub(crate) fn client_version() -> Result<(i32, i32, i32, i32, i32)> {
    let mut ver = (0, 0, 0, 0, 0);
    call!(OCIClientVersion(&mut ver.0, &mut ver.1, &mut ver.2, &mut ver.3, &mut ver.4));
    Ok(ver)
}

pub(crate) fn handle_alloc(env: *mut OCIEnv, hndlpp: *mut *mut c_void, hndl_type: u32) -> Result<()> {
    let res = call!(OCIHandleAlloc(env, hndlpp, hndl_type, 0, null()));
    check_env(res, env)
}

/// Frees a handle. Used only on teardown paths, where a library that was never loaded means nothing was allocated.
pub(crate) fn handle_free(hndlp: *mut c_void, hndl_type: u32) {
    if let Some(api) = api::loaded() {
        unsafe {
            (api.OCIHandleFree)(hndlp, hndl_type);
        }
    }
}

pub(crate) fn descriptor_alloc(env: *mut OCIEnv, descpp: *mut *mut c_void, desc_type: u32) -> Result<()> {
    let res = call!(OCIDescriptorAlloc(env, descpp, desc_type, 0, null()));
    check_env(res, env)
}

pub(crate) fn descriptor_free(descp: *mut c_void, desc_type: u32) {
    if let Some(api) = api::loaded() {
        unsafe {
            (api.OCIDescriptorFree)(descp, desc_type);
        }
    }
}

pub(crate) fn attr_get(obj: *const c_void, obj_type: u32, val: *mut c_void, size: *mut u32, attr_type: u32, err: *mut OCIError) -> Result<()> {
    let res = call!(OCIAttrGet(obj, obj_type, val, size, attr_type, err));
    check(res, err)
}

pub(crate) fn attr_set(obj: *mut c_void, obj_type: u32, val: *const c_void, size: u32, attr_type: u32, err: *mut OCIError) -> Result<()> {
    let res = call!(OCIAttrSet(obj, obj_type, val, size, attr_type, err));
    check(res, err)
}

pub(crate) fn param_get(hndl: *const c_void, htype: u32, err: *mut OCIError, descr: *mut *mut c_void, pos: u32) -> Result<()> {
    let res = call!(OCIParamGet(hndl, htype, err, descr, pos));
    check(res, err)
}

pub(crate) fn server_attach(srv: *mut OCIServer, err: *mut OCIError, dblink: &str) -> Result<()> {
    let res = call!(OCIServerAttach(srv, err, dblink.as_ptr(), dblink.len() as i32, OCI_DEFAULT));
    check(res, err)
}

pub(crate) fn server_detach(srv: *mut OCIServer, err: *mut OCIError) -> Result<()> {
    let res = call!(OCIServerDetach(srv, err, OCI_DEFAULT));
    check(res, err)
}

pub(crate) fn session_begin(svc: *mut OCISvcCtx, err: *mut OCIError, usr: *mut OCISession, cred: u32) -> Result<()> {
    let res = call!(OCISessionBegin(svc, err, usr, cred, OCI_DEFAULT));
    check(res, err)
}

pub(crate) fn session_end(svc: *mut OCISvcCtx, err: *mut OCIError, usr: *mut OCISession) -> Result<()> {
    let res = call!(OCISessionEnd(svc, err, usr, OCI_DEFAULT));
    check(res, err)
}

pub(crate) fn trans_commit(svc: *mut OCISvcCtx, err: *mut OCIError) -> Result<()> {
    let res = call!(OCITransCommit(svc, err, OCI_DEFAULT));
    check(res, err)
}

pub(crate) fn trans_rollback(svc: *mut OCISvcCtx, err: *mut OCIError) -> Result<()> {
    let res = call!(OCITransRollback(svc, err, OCI_DEFAULT));
    check(res, err)
}

pub(crate) fn ping(svc: *mut OCISvcCtx, err: *mut OCIError) -> Result<()> {
    let res = call!(OCIPing(svc, err, OCI_DEFAULT));
    check(res, err)
}

pub(crate) fn stmt_prepare(stmt: *mut OCIStmt, err: *mut OCIError, sql: &str) -> Result<()> {
    let res = call!(OCIStmtPrepare(stmt, err, sql.as_ptr(), sql.len() as u32, OCI_NTV_SYNTAX, OCI_DEFAULT));
    check(res, err)
}

pub(crate) fn stmt_execute(svc: *mut OCISvcCtx, stmt: *mut OCIStmt, err: *mut OCIError, iters: u32, mode: u32) -> Result<()> {
    let res = call!(OCIStmtExecute(svc, stmt, err, iters, 0, null(), null_mut(), mode));
    check(res, err)
}

/// Fetches the next row. Returns `false` when the result set is exhausted.
pub(crate) fn stmt_fetch(stmt: *mut OCIStmt, err: *mut OCIError) -> Result<bool> {
    let res = call!(OCIStmtFetch2(stmt, err, 1, OCI_FETCH_NEXT, 0, OCI_DEFAULT));
    if res == OCI_NO_DATA {
        Ok(false)
    } else {
        check(res, err)?;
        Ok(true)
    }
}

pub(crate) fn bind_by_pos(
    stmt: *mut OCIStmt, bindpp: *mut *mut OCIBind, err: *mut OCIError,
    pos: u32, value: *mut c_void, value_sz: i64, sql_type: u16, ind: *mut c_void, mode: u32
) -> Result<()> {
    let res = call!(OCIBindByPos2(
        stmt, bindpp, err, pos, value, value_sz, sql_type, ind,
        null_mut(), null_mut(), 0, null_mut(), mode
    ));
    check(res, err)
}

pub(crate) fn bind_by_name(
    stmt: *mut OCIStmt, bindpp: *mut *mut OCIBind, err: *mut OCIError,
    name: &str, value: *mut c_void, value_sz: i64, sql_type: u16, ind: *mut c_void, mode: u32
) -> Result<()> {
    let res = call!(OCIBindByName2(
        stmt, bindpp, err, name.as_ptr(), name.len() as i32, value, value_sz, sql_type, ind,
        null_mut(), null_mut(), 0, null_mut(), mode
    ));
    check(res, err)
}

pub(crate) fn bind_dynamic(
    bind: *mut OCIBind, err: *mut OCIError,
    ictx: *mut c_void, icbf: OCICallbackInBind,
    octx: *mut c_void, ocbf: OCICallbackOutBind
) -> Result<()> {
    let res = call!(OCIBindDynamic(bind, err, ictx, icbf, octx, ocbf));
    check(res, err)
}

pub(crate) fn define_by_pos(
    stmt: *mut OCIStmt, defnpp: *mut *mut OCIDefine, err: *mut OCIError,
    pos: u32, value: *mut c_void, value_sz: i64, sql_type: u16, ind: *mut i16, rlen: *mut u32
) -> Result<()> {
    let res = call!(OCIDefineByPos2(
        stmt, defnpp, err, pos, value, value_sz, sql_type, ind as *mut c_void, rlen, null_mut(), OCI_DEFAULT
    ));
    check(res, err)
}

pub(crate) fn number_from_int(err: *mut OCIError, val: &i64, num: *mut OCINumber) -> Result<()> {
    let res = call!(OCINumberFromInt(err, val as *const i64 as *const c_void, 8, OCI_NUMBER_SIGNED, num));
    check(res, err)
}

pub(crate) fn number_to_int(err: *mut OCIError, num: *const OCINumber, val: &mut i64) -> Result<()> {
    let res = call!(OCINumberToInt(err, num, 8, OCI_NUMBER_SIGNED, val as *mut i64 as *mut c_void));
    check(res, err)
}

pub(crate) fn number_from_real(err: *mut OCIError, val: &f64, num: *mut OCINumber) -> Result<()> {
    let res = call!(OCINumberFromReal(err, val as *const f64 as *const c_void, 8, num));
    check(res, err)
}

pub(crate) fn number_to_real(err: *mut OCIError, num: *const OCINumber, val: &mut f64) -> Result<()> {
    let res = call!(OCINumberToReal(err, num, 8, val as *mut f64 as *mut c_void));
    check(res, err)
}

pub(crate) fn type_by_name(
    env: *mut OCIEnv, err: *mut OCIError, svc: *mut OCISvcCtx,
    schema: &str, name: &str, tdo: *mut *mut OCIType
) -> Result<()> {
    let (schema_ptr, schema_len) = if schema.is_empty() { (null(), 0) } else { (schema.as_ptr(), schema.len() as u32) };
    let res = call!(OCITypeByName(
        env, err, svc,
        schema_ptr, schema_len,
        name.as_ptr(), name.len() as u32,
        null(), 0,
        OCI_DURATION_SESSION, OCI_TYPEGET_ALL, tdo
    ));
    check(res, err)
}

pub(crate) fn string_assign_text(env: *mut OCIEnv, err: *mut OCIError, text: &str, lhs: *mut *mut OCIString) -> Result<()> {
    let res = call!(OCIStringAssignText(env, err, text.as_ptr(), text.len() as u32, lhs));
    check(res, err)
}

pub(crate) fn raw_assign_bytes(env: *mut OCIEnv, err: *mut OCIError, bytes: &[u8], lhs: *mut *mut OCIRaw) -> Result<()> {
    let res = call!(OCIRawAssignBytes(env, err, bytes.as_ptr(), bytes.len() as u32, lhs));
    check(res, err)
}

/// Copies the content of an object cache RAW.
pub(crate) fn raw_to_vec(env: *mut OCIEnv, raw: *const OCIRaw) -> Result<Vec<u8>> {
    let api = api()?;
    let (data, size) = unsafe { ((api.OCIRawPtr)(env, raw), (api.OCIRawSize)(env, raw) as usize) };
    if data.is_null() || size == 0 {
        Ok( Vec::new() )
    } else {
        Ok( unsafe { std::slice::from_raw_parts(data, size) }.to_vec() )
    }
}

pub(crate) fn aq_enq(
    svc: *mut OCISvcCtx, err: *mut OCIError, queue: &std::ffi::CStr,
    tdo: *mut OCIType, payload: *mut *mut c_void, payload_ind: *mut *mut c_void
) -> Result<()> {
    let res = call!(OCIAQEnq(
        svc, err, queue.as_ptr() as *const u8,
        null_mut(), null_mut(),
        tdo, payload, payload_ind,
        null_mut(), OCI_DEFAULT
    ));
    check(res, err)
}

pub(crate) fn aq_deq(
    svc: *mut OCISvcCtx, err: *mut OCIError, queue: &std::ffi::CStr, deqopt: *mut OCIAQDeqOptions,
    tdo: *mut OCIType, payload: *mut *mut c_void, payload_ind: *mut *mut c_void
) -> Result<()> {
    let res = call!(OCIAQDeq(
        svc, err, queue.as_ptr() as *const u8,
        deqopt as *mut c_void, null_mut(),
        tdo, payload, payload_ind,
        null_mut(), OCI_DEFAULT
    ));
    check(res, err)
}
