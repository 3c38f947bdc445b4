//! User session

use crate::{Result, Environment, Statement, env::Env, oci::{self, *}};
use std::cell::Cell;

/// Session attributes that can be set as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAttr {
    Username,
    Password,
    Module,
    Action,
    ClientIdentifier,
    ClientInfo,
}

impl SessionAttr {
    pub(crate) fn attr_type(self) -> u32 {
        match self {
            SessionAttr::Username         => OCI_ATTR_USERNAME,
            SessionAttr::Password         => OCI_ATTR_PASSWORD,
            SessionAttr::Module           => OCI_ATTR_MODULE,
            SessionAttr::Action           => OCI_ATTR_ACTION,
            SessionAttr::ClientIdentifier => OCI_ATTR_CLIENT_IDENTIFIER,
            SessionAttr::ClientInfo       => OCI_ATTR_CLIENT_INFO,
        }
    }
}

/**
Represents a user session: a server attachment, a service context and an authenticated session.

Handles are allocated in the order error, server, service context, session and
released in reverse order when the session is dropped.
*/
pub struct Session<'a> {
    usr: Handle<OCISession>,
    svc: Handle<OCISvcCtx>,
    srv: Handle<OCIServer>,
    err: Handle<OCIError>,
    env: &'a Environment,
    attached: Cell<bool>,
    active: Cell<bool>,
}

impl<'a> Session<'a> {
    /// Allocates session handles without attaching to a server.
    pub fn new(env: &'a Environment) -> Result<Self> {
        let err = Handle::<OCIError>::new(env.env_ptr())?;
        let srv = Handle::<OCIServer>::new(env.env_ptr())?;
        let svc = Handle::<OCISvcCtx>::new(env.env_ptr())?;
        let usr = Handle::<OCISession>::new(env.env_ptr())?;
        Ok(Self { usr, svc, srv, err, env, attached: Cell::new(false), active: Cell::new(false) })
    }

    pub(crate) fn connect(env: &'a Environment, dbname: &str, username: &str, password: &str) -> Result<Self> {
        let session = Self::new(env)?;
        session.attach(dbname)?;
        session.begin(username, password)?;
        Ok(session)
    }

    /// Attaches to the server but does not authenticate.
    pub fn attach(&self, dbname: &str) -> Result<()> {
        oci::server_attach(self.srv.get(), self.err.get(), dbname)?;
        self.attached.set(true);
        self.svc.set_attr(OCI_ATTR_SERVER, self.srv.get(), self.err.get())?;
        log::debug!("attached to {}", dbname);
        Ok(())
    }

    /// Authenticates the user and places the session in the service context.
    /// Empty credentials request external authentication.
    pub fn begin(&self, username: &str, password: &str) -> Result<()> {
        let cred = if username.is_empty() && password.is_empty() {
            OCI_CRED_EXT
        } else {
            self.set_attr(SessionAttr::Username, username)?;
            self.set_attr(SessionAttr::Password, password)?;
            OCI_CRED_RDBMS
        };
        if let Some(name) = self.env.driver_name() {
            self.usr.set_attr(OCI_ATTR_DRIVER_NAME, name, self.err.get())?;
        }
        self.svc.set_attr(OCI_ATTR_SERVER, self.srv.get(), self.err.get())?;
        oci::session_begin(self.svc.get(), self.err.get(), self.usr.get(), cred)?;
        self.active.set(true);
        self.svc.set_attr(OCI_ATTR_SESSION, self.usr.get(), self.err.get())?;
        log::debug!("session began for {}", if cred == OCI_CRED_EXT { "<external>" } else { username });
        Ok(())
    }

    /// Ends the session. The server stays attached.
    pub fn end_session(&self) -> Result<()> {
        if self.active.get() {
            self.active.set(false);
            oci::session_end(self.svc.get(), self.err.get(), self.usr.get())?;
        }
        Ok(())
    }

    /// Detaches from the server.
    pub fn detach(&self) -> Result<()> {
        if self.attached.get() {
            self.attached.set(false);
            oci::server_detach(self.srv.get(), self.err.get())?;
        }
        Ok(())
    }

    /// Logs off and detaches, reporting the first failure.
    pub fn disconnect(self) -> Result<()> {
        let ended = self.end_session();
        let detached = self.detach();
        ended.and(detached)
    }

    pub(crate) fn env(&self) -> &'a Environment {
        self.env
    }

    pub(crate) fn svc_ptr(&self) -> *mut OCISvcCtx {
        self.svc.get()
    }

    /// Sets a text attribute of the session handle.
    pub fn set_attr(&self, attr: SessionAttr, value: &str) -> Result<()> {
        self.usr.set_attr(attr.attr_type(), value, self.err.get())
    }

    /**
    Sets the module name reported in `V$SESSION.MODULE`.

    The attribute is sent to the server with the next round trip, which this method forces right away.
    */
    pub fn set_module(&self, module: &str) -> Result<()> {
        self.set_attr(SessionAttr::Module, module)?;
        self.execute_immediate("begin null; end;")?;
        Ok(())
    }

    /// Sets the action name reported in `V$SESSION.ACTION`. Sent with the next round trip.
    pub fn set_action(&self, action: &str) -> Result<()> {
        self.set_attr(SessionAttr::Action, action)
    }

    /// Sets the client identifier reported in `V$SESSION.CLIENT_IDENTIFIER`. Sent with the next round trip.
    pub fn set_client_identifier(&self, id: &str) -> Result<()> {
        self.set_attr(SessionAttr::ClientIdentifier, id)
    }

    /// Sets the client info reported in `V$SESSION.CLIENT_INFO`. Sent with the next round trip.
    pub fn set_client_info(&self, info: &str) -> Result<()> {
        self.set_attr(SessionAttr::ClientInfo, info)
    }

    pub fn commit(&self) -> Result<()> {
        oci::trans_commit(self.svc.get(), self.err.get())
    }

    pub fn rollback(&self) -> Result<()> {
        oci::trans_rollback(self.svc.get(), self.err.get())
    }

    /// Makes a round trip to the server.
    pub fn ping(&self) -> Result<()> {
        oci::ping(self.svc.get(), self.err.get())
    }

    /// Reports whether the server handle considers the connection alive. No round trip is made.
    pub fn is_connected(&self) -> Result<bool> {
        if !self.attached.get() {
            return Ok(false);
        }
        let status : u32 = self.srv.get_attr(OCI_ATTR_SERVER_STATUS, self.err.get())?;
        Ok( status == OCI_SERVER_NORMAL )
    }

    /// Allocates an unprepared statement handle.
    pub fn statement(&self) -> Result<Statement> {
        Statement::new(self)
    }

    /// Allocates a statement handle and prepares the SQL on it.
    pub fn prepare(&self, sql: &str) -> Result<Statement> {
        let mut stmt = Statement::new(self)?;
        stmt.prepare(sql)?;
        Ok(stmt)
    }

    /// Prepares and runs a statement that takes no arguments, returning the number of affected rows.
    pub fn execute_immediate(&self, sql: &str) -> Result<usize> {
        let mut stmt = self.prepare(sql)?;
        stmt.execute(false)
    }
}

impl Env for Session<'_> {
    fn env_ptr(&self) -> *mut OCIEnv {
        self.env.env_ptr()
    }

    fn err_ptr(&self) -> *mut OCIError {
        self.err.get()
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.end_session() {
            log::warn!("session end: {}", err);
        }
        if let Err(err) = self.detach() {
            log::warn!("server detach: {}", err);
        }
    }
}
