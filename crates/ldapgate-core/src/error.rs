//! Error types for ldapgate

use thiserror::Error;

pub type LdapResult<T> = std::result::Result<T, LdapError>;

#[derive(Error, Debug)]
pub enum LdapError {
    // Configuration Errors
    #[error("Invalid directory configuration: {0}")]
    Configuration(String),

    // Transport Errors
    #[error("Unable to connect to LDAP. {}", describe(.code, .message))]
    Connection { code: Option<u32>, message: String },

    // Service Account Errors
    #[error("Unable to bind LDAP search user. Code {code}. Message: {message}")]
    Bind { code: u32, message: String },

    // Search Errors
    #[error("LDAP search failed. {}", describe(.code, .message))]
    Search { code: Option<u32>, message: String },

    // Identity Errors
    #[error("Directory entry cannot be mapped to an identity: {0}")]
    IdentityMapping(String),

    #[error("{0} are not supported")]
    UnsupportedOperation(&'static str),
}

fn describe(code: &Option<u32>, message: &str) -> String {
    match code {
        Some(code) => format!("Code {}. Message: {}", code, message),
        None => format!("Message: {}", message),
    }
}

impl LdapError {
    pub fn config(msg: impl Into<String>) -> Self {
        LdapError::Configuration(msg.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        LdapError::Connection {
            code: None,
            message: msg.into(),
        }
    }

    pub fn search(msg: impl Into<String>) -> Self {
        LdapError::Search {
            code: None,
            message: msg.into(),
        }
    }

    /// Server result code carried by the error, if any
    pub fn result_code(&self) -> Option<u32> {
        match self {
            LdapError::Connection { code, .. } | LdapError::Search { code, .. } => *code,
            LdapError::Bind { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(self, LdapError::Connection { .. })
    }

    /// Errors the host should treat as an operational incident rather than
    /// a caller mistake.
    pub fn is_operational(&self) -> bool {
        matches!(
            self,
            LdapError::Connection { .. }
                | LdapError::Bind { .. }
                | LdapError::Search { .. }
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            LdapError::Configuration(_) => "ConfigurationError",
            LdapError::Connection { .. } => "ConnectionError",
            LdapError::Bind { .. } => "BindError",
            LdapError::Search { .. } => "SearchError",
            LdapError::IdentityMapping(_) => "IdentityMappingError",
            LdapError::UnsupportedOperation(_) => "UnsupportedOperation",
        }
    }
}
