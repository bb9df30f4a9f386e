//! CLI command implementations
//!
//! Each command returns whether the outcome was accepted, which `main` turns
//! into the process exit code.

pub mod check;
pub mod login;
pub mod lookup;

use crate::OutputFormat;
use ldapgate_auth::LdapConnector;

/// Context passed to all commands
pub struct CommandContext {
    pub connector: LdapConnector,
    pub output_format: OutputFormat,
}

impl CommandContext {
    pub fn new(connector: LdapConnector, output_format: OutputFormat) -> Self {
        Self {
            connector,
            output_format,
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }
}
