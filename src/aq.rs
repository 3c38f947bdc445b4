//! Advanced Queuing: enqueue and dequeue of typed and RAW messages

use crate::{Result, Error, NativeBuffer, Session, blocking::BlockingSection, env::Env, oci::{self, *}};
use libc::c_void;
use std::{ffi::CString, ptr};

/// How long a dequeue waits for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Block until a message arrives. The dequeue options keep their default wait.
    Forever,
    /// Give up after the given number of seconds. `Seconds(0)` does not wait at all.
    Seconds(u32),
}

impl Wait {
    /// Negative timeouts mean "wait forever".
    pub fn from_secs(secs: i64) -> Self {
        if secs < 0 {
            Wait::Forever
        } else {
            Wait::Seconds(secs.min(u32::MAX as i64) as u32)
        }
    }
}

/// Type descriptor object (TDO) of a queue payload type. The TDO is owned by the OCI object cache.
#[derive(Debug)]
pub struct TypeDescriptor {
    tdo: NativeBuffer,
}

impl TypeDescriptor {
    pub(crate) fn get(&self) -> *mut OCIType {
        self.tdo.as_ptr() as *mut OCIType
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.tdo.as_ptr()
    }
}

fn queue_name(queue: &str) -> Result<CString> {
    CString::new(queue).map_err(|_| Error::msg(format!("queue name {:?} contains NUL", queue)))
}

impl Session<'_> {
    /// Looks up the type descriptor of a named type. An empty `schema` means the current schema.
    pub fn type_by_name(&self, schema: &str, name: &str) -> Result<TypeDescriptor> {
        let mut tdo = ptr::null_mut::<OCIType>();
        oci::type_by_name(self.env_ptr(), self.err_ptr(), self.svc_ptr(), schema, name, &mut tdo)?;
        if tdo.is_null() {
            return Err( Error::msg(format!("type {}.{} was not found", schema, name)) );
        }
        Ok( TypeDescriptor { tdo: NativeBuffer::from_oci(tdo as *mut c_void) } )
    }

    /// Creates an object cache string with the given text, e.g. as a payload of a queue of `VARCHAR2` objects.
    pub fn string_from_text(&self, text: &str) -> Result<NativeBuffer> {
        let mut txt = ptr::null_mut::<OCIString>();
        oci::string_assign_text(self.env_ptr(), self.err_ptr(), text, &mut txt)?;
        Ok( NativeBuffer::from_oci(txt as *mut c_void) )
    }

    /**
    Enqueues a message.

    `payload` is the payload object, `ind` its optional NULL indicator structure. Both are passed to OCI as is.
    */
    pub fn enqueue(&self, queue: &str, tdo: &TypeDescriptor, payload: &NativeBuffer, ind: Option<&NativeBuffer>) -> Result<()> {
        let queue = queue_name(queue)?;
        let mut payload_ptr = payload.as_ptr();
        let mut ind_ptr = ind.map_or(ptr::null_mut(), NativeBuffer::as_ptr);
        let ind_pp = if ind_ptr.is_null() { ptr::null_mut() } else { &mut ind_ptr as *mut *mut c_void };
        log::debug!("enqueue to {:?}", queue);
        oci::aq_enq(self.svc_ptr(), self.err_ptr(), &queue, tdo.get(), &mut payload_ptr, ind_pp)
    }

    /**
    Enqueues a RAW message.

    # Example

    ```no_run
    use ocibind::Wait;

    # let oracle = ocibind::env()?;
    # let session = oracle.connect_with(&ocibind::ConnectParams::from_env()?)?;
    session.enqueue_raw("raw_msg_queue", b"Hello, World!")?;
    session.commit()?;
    let msg = session.dequeue_raw("raw_msg_queue", Wait::Seconds(5))?;
    assert_eq!(msg, b"Hello, World!");
    # Ok::<(),ocibind::Error>(())
    ```
    */
    pub fn enqueue_raw(&self, queue: &str, msg: &[u8]) -> Result<()> {
        let tdo = self.type_by_name("SYS", "RAW")?;
        let mut raw = ptr::null_mut::<OCIRaw>();
        oci::raw_assign_bytes(self.env_ptr(), self.err_ptr(), msg, &mut raw)?;
        self.enqueue(queue, &tdo, &NativeBuffer::from_oci(raw as *mut c_void), None)
    }

    fn dequeue_payload(&self, queue: &str, tdo: &TypeDescriptor, wait: Wait) -> Result<*mut c_void> {
        let queue = queue_name(queue)?;
        let opts = Descriptor::<OCIAQDeqOptions>::new(self.env_ptr())?;
        if let Wait::Seconds(secs) = wait {
            opts.set_attr(OCI_ATTR_WAIT, secs, self.err_ptr())?;
        }
        let mut payload = ptr::null_mut::<c_void>();
        let mut payload_ind = ptr::null_mut::<c_void>();
        log::debug!("dequeue from {:?} waiting {:?}", queue, wait);
        {
            let _section = BlockingSection::enter(self.env().blocking_hook());
            oci::aq_deq(self.svc_ptr(), self.err_ptr(), &queue, opts.get(), tdo.get(), &mut payload, &mut payload_ind)?;
        }
        if payload.is_null() {
            Err( Error::new("dequeue returned no payload") )
        } else {
            Ok( payload )
        }
    }

    /// Dequeues a message. The returned payload object belongs to the OCI object cache.
    pub fn dequeue(&self, queue: &str, tdo: &TypeDescriptor, wait: Wait) -> Result<NativeBuffer> {
        let payload = self.dequeue_payload(queue, tdo, wait)?;
        Ok( NativeBuffer::from_oci(payload) )
    }

    /// Dequeues a RAW message and returns a copy of its bytes.
    pub fn dequeue_raw(&self, queue: &str, wait: Wait) -> Result<Vec<u8>> {
        let tdo = self.type_by_name("SYS", "RAW")?;
        let payload = self.dequeue_payload(queue, &tdo, wait)?;
        oci::raw_to_vec(self.env_ptr(), payload as *const OCIRaw)
    }
}
