//! OCI environment

use crate::{Error, Result, oci::{self, *}, config::{ClientConfig, ConnectParams}, BlockingHook, Session};
use parking_lot::Mutex;
use std::sync::Once;

pub(crate) const ENV_CREATE_FAILURE_MSG : &str = "Cannot create an OCI environment (check ORACLE_HOME?)";

/// Environment handle of the only live environment. Also consulted by the exit-time teardown.
static LIVE_ENV: Mutex<Option<Ptr<OCIEnv>>> = parking_lot::const_mutex(None);

static AT_EXIT: Once = Once::new();

extern "C" fn teardown_at_exit() {
    let env = LIVE_ENV.lock().take();
    if let Some(env) = env {
        log::debug!("releasing OCI environment {:?} at exit", env);
        oci::handle_free(env.as_c_void(), OCI_HTYPE_ENV);
    }
    if let Err(err) = oci::terminate() {
        log::warn!("{}", err);
    }
}

/// Context that provides the handles OCI conversion functions need.
pub trait Env {
    fn env_ptr(&self) -> *mut OCIEnv;
    fn err_ptr(&self) -> *mut OCIError;
}

/// Represents an OCI environment.
///
/// At most one environment may be live in a process at a time.
pub struct Environment {
    err: Handle<OCIError>,
    env: Handle<OCIEnv>,
    driver_name: Option<String>,
    hook: Option<Box<dyn BlockingHook>>,
}

impl Environment {
    /**
    Returns a new environment handle, which is then used by the OCI functions.
    The client library is located as configured by the process environment (see [`ClientConfig::from_env`]).

    # Example

    ```no_run
    use ocibind::Environment;

    let oracle = Environment::new()?;

    # Ok::<(),ocibind::Error>(())
    ```
    */
    pub fn new() -> Result<Self> {
        Self::with_config(&ClientConfig::from_env())
    }

    /// Returns a new environment handle using the explicitly provided client configuration.
    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        let api = oci::api::init(config)?;

        let mut live_env = LIVE_ENV.lock();
        if live_env.is_some() {
            return Err( Error::new("An OCI environment is already live in this process") );
        }

        let mut env = Ptr::<OCIEnv>::null();
        let res = oci::env_nls_create(env.as_mut_ptr(), OCI_THREADED | OCI_OBJECT, AL32UTF8)?;
        if res != OCI_SUCCESS || env.is_null() {
            if !env.is_null() {
                oci::handle_free(env.as_c_void(), OCI_HTYPE_ENV);
            }
            return Err( Error::new(ENV_CREATE_FAILURE_MSG) );
        }
        let env = Handle::from(env);
        let err = Handle::<OCIError>::new(env.get())?;

        *live_env = Some(env.get_ptr());
        AT_EXIT.call_once(|| unsafe {
            libc::atexit(teardown_at_exit);
        });
        log::debug!("created OCI environment {:?} using {}", env.get_ptr(), api.path().display());

        Ok(Self { err, env, driver_name: config.driver_name().map(String::from), hook: None })
    }

    /// Installs the hook that is released around unbounded native calls made by sessions of this environment.
    pub fn set_blocking_hook(&mut self, hook: impl BlockingHook + 'static) {
        self.hook = Some(Box::new(hook));
    }

    pub(crate) fn blocking_hook(&self) -> Option<&dyn BlockingHook> {
        self.hook.as_deref()
    }

    pub(crate) fn driver_name(&self) -> Option<&str> {
        self.driver_name.as_deref()
    }

    /**
    Creates and authenticates a new session.

    # Example

    ```no_run
    let oracle = ocibind::env()?;
    let dbname = std::env::var("DBNAME")?;
    let dbuser = std::env::var("DBUSER")?;
    let dbpass = std::env::var("DBPASS")?;
    let session = oracle.connect(&dbname, &dbuser, &dbpass)?;
    assert!(session.is_connected()?);
    # Ok::<(),Box<dyn std::error::Error>>(())
    ```
    */
    pub fn connect(&self, dbname: &str, username: &str, password: &str) -> Result<Session> {
        Session::connect(self, dbname, username, password)
    }

    /// Creates a session using connection parameters, e.g. ones read with [`ConnectParams::from_env`].
    pub fn connect_with(&self, params: &ConnectParams) -> Result<Session> {
        Session::connect(self, &params.dbname, &params.username, &params.password)
    }
}

impl Env for Environment {
    fn env_ptr(&self) -> *mut OCIEnv {
        self.env.get()
    }

    fn err_ptr(&self) -> *mut OCIError {
        self.err.get()
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        let mut live_env = LIVE_ENV.lock();
        if live_env.map_or(false, |env| env == self.env.get_ptr()) {
            *live_env = None;
        }
        // the error handle belongs to the environment and goes first
        drop(Handle::take(&mut self.err));
        log::debug!("releasing OCI environment {:?}", self.env.get_ptr());
        drop(Handle::take(&mut self.env));
    }
}

/// Returns `true` while an environment is live in this process.
pub fn is_live() -> bool {
    LIVE_ENV.lock().is_some()
}
