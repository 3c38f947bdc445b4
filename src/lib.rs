#![cfg_attr(not(doctest), doc=include_str!("../README.md"))]

mod oci;
mod err;
mod env;
mod config;
mod blocking;
mod session;
mod column;
mod value;
mod stmt;
mod aq;
pub mod buffer;
pub mod types;

pub use err::{Error, INTERFACE_ERROR_CODE};
pub use env::{Environment, Env};
pub use config::{ClientConfig, ConnectParams};
pub use blocking::BlockingHook;
pub use session::{Session, SessionAttr};
pub use column::ColumnDescriptor;
pub use value::Value;
pub use stmt::{Statement, StatementType, Position, BindKey, OutKind, Row};
pub use buffer::{NativeBuffer, Ownership, ArrayBuffer, ElementKind};
pub use types::Number;
pub use aq::{TypeDescriptor, Wait};
pub use oci::{OCIDate, OCINumber};

pub type Result<T> = std::result::Result<T, Error>;

/**
Returns a new environment handle, which is then used by the OCI functions.

Only one environment can be live at a time. As nothing can outlive its environment,
it might be created either in `main` function and passed around, or it might be created statically:

```no_run
use ocibind::{Environment, Result};
use once_cell::sync::OnceCell;

fn oracle() -> Result<&'static Environment> {
    static OCI_ENV: OnceCell<Environment> = OnceCell::new();
    OCI_ENV.get_or_try_init(||
        ocibind::env()
    )
}

fn main() -> Result<()> {
    let oracle = oracle()?;
    // ...
    Ok(())
}
```
*/
pub fn env() -> Result<Environment> {
    Environment::new()
}

/// Returns the version of the OCI client library as (major, minor, update, patch, port update).
/// Loads the library as configured by the process environment if no environment has been created yet.
pub fn client_version() -> Result<(i32, i32, i32, i32, i32)> {
    oci::client_version()
}

/// Returns `true` while an environment is live in this process.
pub fn is_env_live() -> bool {
    env::is_live()
}
