//! ldapgate Core Library
//!
//! Configuration and error types shared by the directory connector and its hosts.

pub mod config;
pub mod error;

pub use config::{DirectoryConfig, LdapgateConfig, LoginAttribute, Protocol};
pub use error::{LdapError, LdapResult};

/// ldapgate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
