use crate::oci::{self, *};
use libc::c_void;
use std::{ cmp, fmt, error, io };

/// Code carried by errors that the binding detects itself, before or without an OCI error handle.
pub const INTERFACE_ERROR_CODE : i32 = -1;

/// ORA-25228: timeout or end-of-fetch during message dequeue
const DEQUEUE_TIMEOUT : i32 = 25228;

/// Converts a NUL-terminated OCI message buffer into text without the trailing newline OCI appends.
pub(crate) fn trim_message(buf: &[u8]) -> String {
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..len]).trim_end().to_string()
}

fn status_message(rc: i32) -> String {
    match rc {
        OCI_NO_DATA        => String::from("No Data"),
        OCI_NEED_DATA      => String::from("Need Data"),
        OCI_INVALID_HANDLE => String::from("Invalid Handle"),
        _ => format!("Error {}", rc),
    }
}

fn get_oracle_error(rc: i32, errhp: *mut c_void, htype: u32) -> (i32, String) {
    let api = match oci::api() {
        Ok(api) => api,
        Err(_) => return (rc, status_message(rc)),
    };
    let mut errcode = 0i32;
    let mut errmsg = vec![0u8; OCI_ERROR_MAXMSG_SIZE];
    let res = if errhp.is_null() || rc == OCI_INVALID_HANDLE {
        OCI_INVALID_HANDLE
    } else {
        unsafe {
            (api.OCIErrorGet)(errhp, 1, std::ptr::null(), &mut errcode, errmsg.as_mut_ptr(), errmsg.len() as u32, htype)
        }
    };
    let msg = if res == OCI_SUCCESS { trim_message(&errmsg) } else { String::new() };
    let code = if errcode != 0 { errcode } else { rc };
    let msg = if msg.is_empty() { status_message(rc) } else { msg };
    (code, msg)
}

/// Represents possible errors returned from the binding
#[derive(Debug)]
pub enum Error {
    /// Failure detected by the binding itself. Reported with code -1.
    Interface(String),
    /// Failure reported by OCI: vendor error code and message.
    Oracle(i32,String)
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Oracle(_, errmsg) if errmsg.starts_with("ORA-") => write!(f, "{}", errmsg),
            Error::Oracle(errcode, errmsg) => write!(f, "ORA-{:05}: {}", errcode, errmsg),
            Error::Interface(errmsg) => write!(f, "{}", errmsg),
        }
    }
}

impl error::Error for Error {}

impl cmp::PartialEq for Error {
    fn eq(&self, other: &Error) -> bool {
        match (self, other) {
            (Error::Oracle(this_code, _), Error::Oracle(other_code, _)) => this_code == other_code,
            (Error::Interface(this_msg),  Error::Interface(other_msg))  => this_msg  == other_msg,
            _ => false,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        io::Error::new(io::ErrorKind::Other, err)
    }
}

impl Error {
    pub(crate) fn new(msg: &str) -> Self {
        Error::Interface( msg.to_owned() )
    }

    pub(crate) fn msg(msg: String) -> Self {
        Error::Interface( msg )
    }

    pub(crate) fn env(env: *mut OCIEnv, rc: i32) -> Self {
        let (code, msg) = get_oracle_error(rc, env as *mut c_void, OCI_HTYPE_ENV);
        Error::Oracle(code, msg)
    }

    pub(crate) fn oci(err: *mut OCIError, rc: i32) -> Self {
        let (code, msg) = get_oracle_error(rc, err as *mut c_void, OCI_HTYPE_ERROR);
        Error::Oracle(code, msg)
    }

    /// Returns the vendor error code, or -1 for errors detected by the binding.
    pub fn code(&self) -> i32 {
        match self {
            Error::Oracle(code, _) => *code,
            Error::Interface(_) => INTERFACE_ERROR_CODE,
        }
    }

    /// Returns the error text without the code prefix.
    pub fn message(&self) -> &str {
        match self {
            Error::Oracle(_, msg) => msg,
            Error::Interface(msg) => msg,
        }
    }

    /// Returns `true` when a dequeue gave up waiting for a message.
    pub fn is_timeout(&self) -> bool {
        self.code() == DEQUEUE_TIMEOUT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_newline_is_removed() {
        let mut buf = b"ORA-00942: table or view does not exist\n".to_vec();
        buf.extend_from_slice(&[0u8; 16]);
        assert_eq!(trim_message(&buf), "ORA-00942: table or view does not exist");
    }

    #[test]
    fn unterminated_buffer_is_used_whole() {
        assert_eq!(trim_message(b"ORA-01017: invalid username/password \r\n"), "ORA-01017: invalid username/password");
    }

    #[test]
    fn interface_errors_use_sentinel_code() {
        let err = Error::new("Cannot create an OCI environment (check ORACLE_HOME?)");
        assert_eq!(err.code(), -1);
        assert_eq!(err.message(), "Cannot create an OCI environment (check ORACLE_HOME?)");
        assert_eq!(err.to_string(), "Cannot create an OCI environment (check ORACLE_HOME?)");
        assert!(!err.is_timeout());
    }

    #[test]
    fn oracle_errors_are_displayed_once_prefixed() {
        let err = Error::Oracle(942, String::from("ORA-00942: table or view does not exist"));
        assert_eq!(err.to_string(), "ORA-00942: table or view does not exist");
        let err = Error::Oracle(1403, String::from("no data found"));
        assert_eq!(err.to_string(), "ORA-01403: no data found");
    }

    #[test]
    fn dequeue_timeout_is_distinguishable() {
        let err = Error::Oracle(25228, String::from("ORA-25228: timeout or end-of-fetch during message dequeue from Q"));
        assert!(err.is_timeout());
        assert_eq!(err, Error::Oracle(25228, String::new()));
    }

    #[test]
    fn status_messages_are_never_empty() {
        for rc in &[OCI_ERROR, OCI_INVALID_HANDLE, OCI_NEED_DATA, OCI_NO_DATA, -3123] {
            assert!(!status_message(*rc).is_empty());
        }
    }
}
