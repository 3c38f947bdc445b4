//! Client library and connection settings.

use crate::{Result, Error};
use std::path::{Path, PathBuf};

#[cfg(target_os = "macos")]
const CLIENT_LIBRARY : &str = "libclntsh.dylib";
#[cfg(not(target_os = "macos"))]
const CLIENT_LIBRARY : &str = "libclntsh.so";

/// Where to find the OCI client library and how to identify this client to the server.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientConfig {
    library_path: Option<PathBuf>,
    lib_dir: Option<PathBuf>,
    oracle_home: Option<PathBuf>,
    driver_name: Option<String>,
}

impl ClientConfig {
    /// Returns a configuration that relies on the dynamic loader search path.
    pub fn new() -> Self {
        Self::default()
    }

    /**
    Builds the configuration from the process environment:

    * `OCI_LIB_DIR` - directory that contains the client library
    * `ORACLE_HOME` - client installation; the library is looked up in its `lib` directory
    * `OCIBIND_DRIVER_NAME` - client driver name reported to the server
    */
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Self
    where F: Fn(&str) -> Option<String>
    {
        let non_empty = |name: &str| var(name).filter(|val| !val.trim().is_empty());
        Self {
            library_path: None,
            lib_dir:      non_empty("OCI_LIB_DIR").map(PathBuf::from),
            oracle_home:  non_empty("ORACLE_HOME").map(PathBuf::from),
            driver_name:  non_empty("OCIBIND_DRIVER_NAME"),
        }
    }

    /// Loads the client library from exactly this file before trying any other location.
    pub fn with_library(mut self, path: impl AsRef<Path>) -> Self {
        self.library_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the driver name that sessions report in `V$SESSION_CONNECT_INFO`.
    pub fn with_driver_name(mut self, name: &str) -> Self {
        self.driver_name = Some(name.to_string());
        self
    }

    pub fn driver_name(&self) -> Option<&str> {
        self.driver_name.as_deref()
    }

    /// Returns the client library locations in the order they are tried.
    pub fn library_candidates(&self) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(4);
        if let Some(path) = &self.library_path {
            paths.push(path.clone());
        }
        if let Some(dir) = &self.lib_dir {
            paths.push(dir.join(CLIENT_LIBRARY));
        }
        if let Some(home) = &self.oracle_home {
            paths.push(home.join("lib").join(CLIENT_LIBRARY));
        }
        paths.push(PathBuf::from(CLIENT_LIBRARY));
        paths
    }
}

/// Database, user and password of a session.
#[derive(Clone, PartialEq)]
pub struct ConnectParams {
    pub dbname: String,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ConnectParams")
            .field("dbname", &self.dbname)
            .field("username", &self.username)
            .finish()
    }
}

impl ConnectParams {
    pub fn new(dbname: &str, username: &str, password: &str) -> Self {
        Self {
            dbname: dbname.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    /// Reads `DBNAME`, `DBUSER` and `DBPASS` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Reads `DBNAME`, `DBUSER` and `DBPASS` using an arbitrary variable lookup.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where F: Fn(&str) -> Option<String>
    {
        let required = |name: &str| var(name).ok_or_else(|| Error::msg(format!("{} is not set", name)));
        Ok(Self {
            dbname:   required("DBNAME")?,
            username: required("DBUSER")?,
            password: required("DBPASS")?,
        })
    }

    /// Returns `true` when the session should be authenticated externally (OS or wallet).
    pub fn is_external(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map : HashMap<String,String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn library_candidates_follow_configuration_order() {
        let cfg = ClientConfig::from_vars(vars(&[("OCI_LIB_DIR", "/opt/instantclient"), ("ORACLE_HOME", "/u01/app/oracle")]))
            .with_library("/tmp/libclntsh.so.19.1");
        let paths = cfg.library_candidates();
        assert_eq!(paths.len(), 4);
        assert_eq!(paths[0], PathBuf::from("/tmp/libclntsh.so.19.1"));
        assert_eq!(paths[1], PathBuf::from("/opt/instantclient").join(CLIENT_LIBRARY));
        assert_eq!(paths[2], PathBuf::from("/u01/app/oracle/lib").join(CLIENT_LIBRARY));
        assert_eq!(paths[3], PathBuf::from(CLIENT_LIBRARY));
    }

    #[test]
    fn blank_variables_are_ignored() {
        let cfg = ClientConfig::from_vars(vars(&[("ORACLE_HOME", "  "), ("OCIBIND_DRIVER_NAME", "")]));
        assert_eq!(cfg, ClientConfig::new());
        assert_eq!(cfg.library_candidates(), vec![PathBuf::from(CLIENT_LIBRARY)]);
    }

    #[test]
    fn driver_name() {
        let cfg = ClientConfig::from_vars(vars(&[("OCIBIND_DRIVER_NAME", "batch-loader")]));
        assert_eq!(cfg.driver_name(), Some("batch-loader"));
        assert_eq!(ClientConfig::new().with_driver_name("x").driver_name(), Some("x"));
    }

    #[test]
    fn connect_params_require_all_variables() {
        let params = ConnectParams::from_vars(vars(&[("DBNAME", "//localhost/XEPDB1"), ("DBUSER", "scott"), ("DBPASS", "tiger")]));
        assert_eq!(params, Ok(ConnectParams::new("//localhost/XEPDB1", "scott", "tiger")));

        let missing = ConnectParams::from_vars(vars(&[("DBNAME", "//localhost/XEPDB1"), ("DBUSER", "scott")]));
        match missing {
            Err(err) => assert_eq!(err.message(), "DBPASS is not set"),
            Ok(_) => panic!("missing password was accepted"),
        }
    }

    #[test]
    fn password_is_not_printed() {
        let params = ConnectParams::new("db", "scott", "tiger");
        assert!(!format!("{:?}", params).contains("tiger"));
        assert!(!params.is_external());
        assert!(ConnectParams::new("db", "", "").is_external());
    }
}
