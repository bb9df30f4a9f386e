//! Configuration for ldapgate
//!
//! The connector is built from one immutable [`DirectoryConfig`] value. It can be
//! loaded from a TOML file or from `LDAPGATE_*` environment variables.
//!
//! Example config:
//! ```toml
//! [directory]
//! host = "ldap.example.com"
//! port = 389
//! protocol = "ldap://"
//! base_dn = "dc=example,dc=com"
//! login_attribute = "uid"
//! search_user_name = "svc"
//! search_user_password = "secret"
//!
//! [logging]
//! level = "info"
//! ```

use crate::error::{LdapError, LdapResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 389;
pub const DEFAULT_LDAP_VERSION: u32 = 3;
pub const DEFAULT_OBJECT_CLASS: &str = "person";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LdapgateConfig {
    #[serde(default)]
    pub directory: DirectoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LdapgateConfig {
    pub fn from_file(path: impl AsRef<Path>) -> LdapResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LdapError::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> LdapResult<Self> {
        toml::from_str(content)
            .map_err(|e| LdapError::config(format!("Failed to parse config: {}", e)))
    }

    /// Defaults overlaid with `LDAPGATE_*` environment variables
    pub fn from_env() -> LdapResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay `LDAPGATE_*` environment variables onto this configuration
    pub fn apply_env(&mut self) -> LdapResult<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> LdapResult<()> {
        let dir = &mut self.directory;

        if let Some(host) = var("LDAPGATE_HOST") {
            dir.host = host;
        }
        if let Some(port) = var("LDAPGATE_PORT") {
            dir.port = parse_var("LDAPGATE_PORT", &port)?;
        }
        if let Some(protocol) = var("LDAPGATE_PROTOCOL") {
            dir.protocol = protocol.parse()?;
        }
        if let Some(base_dn) = var("LDAPGATE_BASE_DN") {
            dir.base_dn = base_dn;
        }
        if let Some(attr) = var("LDAPGATE_LOGIN_ATTRIBUTE") {
            dir.login_attribute = attr.parse()?;
        }
        if let Some(domain) = var("LDAPGATE_USER_DOMAIN") {
            dir.user_domain = Some(domain).filter(|d| !d.is_empty());
        }
        if let Some(class) = var("LDAPGATE_OBJECT_CLASS") {
            dir.ldap_object_class = class;
        }
        if let Some(follow) = var("LDAPGATE_FOLLOW_REFERRALS") {
            dir.follow_referrals = parse_var("LDAPGATE_FOLLOW_REFERRALS", &follow)?;
        }
        if let Some(version) = var("LDAPGATE_LDAP_VERSION") {
            dir.ldap_version = parse_var("LDAPGATE_LDAP_VERSION", &version)?;
        }
        if let Some(secs) = var("LDAPGATE_CONNECT_TIMEOUT") {
            dir.connect_timeout = parse_var("LDAPGATE_CONNECT_TIMEOUT", &secs)?;
        }
        if let Some(secs) = var("LDAPGATE_TIMEOUT") {
            dir.timeout = parse_var("LDAPGATE_TIMEOUT", &secs)?;
        }
        if let Some(user) = var("LDAPGATE_SEARCH_USER") {
            dir.search_user_name = user;
        }
        if let Some(password) = var("LDAPGATE_SEARCH_PASSWORD") {
            dir.search_user_password = password;
        }
        if let Some(group) = var("LDAPGATE_USER_GROUP") {
            dir.user_group = Some(group).filter(|g| !g.is_empty());
        }
        if let Some(level) = var("LDAPGATE_LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(())
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> LdapResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| LdapError::config(format!("{} has an invalid value: {:?}", key, value)))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

// ============================================================================
// Directory Configuration
// ============================================================================

/// Directory server and service-account configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DirectoryConfig {
    /// Directory server host name (no scheme)
    #[serde(default)]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub protocol: Protocol,

    /// Root for searches and uid-style bind DNs
    /// Example: "dc=example,dc=com"
    #[serde(default)]
    pub base_dn: String,

    #[serde(default)]
    pub login_attribute: LoginAttribute,

    /// Suffix appended to principals for domain-style binds
    /// Example: "@example.com"
    #[serde(default)]
    pub user_domain: Option<String>,

    #[serde(default = "default_object_class")]
    pub ldap_object_class: String,

    #[serde(default)]
    pub follow_referrals: bool,

    #[serde(default = "default_ldap_version")]
    pub ldap_version: u32,

    /// Connect timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,

    /// Operation timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default)]
    pub search_user_name: String,

    #[serde(default)]
    pub search_user_password: String,

    /// Group required by the login flow when the caller names none
    #[serde(default)]
    pub user_group: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_object_class() -> String {
    DEFAULT_OBJECT_CLASS.to_string()
}

fn default_ldap_version() -> u32 {
    DEFAULT_LDAP_VERSION
}

fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_port(),
            protocol: Protocol::default(),
            base_dn: String::new(),
            login_attribute: LoginAttribute::default(),
            user_domain: None,
            ldap_object_class: default_object_class(),
            follow_referrals: false,
            ldap_version: default_ldap_version(),
            connect_timeout: default_connect_timeout(),
            timeout: default_timeout(),
            search_user_name: String::new(),
            search_user_password: String::new(),
            user_group: None,
        }
    }
}

impl fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("protocol", &self.protocol)
            .field("base_dn", &self.base_dn)
            .field("login_attribute", &self.login_attribute)
            .field("user_domain", &self.user_domain)
            .field("ldap_object_class", &self.ldap_object_class)
            .field("follow_referrals", &self.follow_referrals)
            .field("ldap_version", &self.ldap_version)
            .field("connect_timeout", &self.connect_timeout)
            .field("timeout", &self.timeout)
            .field("search_user_name", &self.search_user_name)
            .field("search_user_password", &"<redacted>")
            .field("user_group", &self.user_group)
            .finish()
    }
}

impl DirectoryConfig {
    /// Server URL in the form `ldap://host:port`
    pub fn server_url(&self) -> String {
        format!("{}://{}:{}", self.protocol.scheme(), self.host, self.port)
    }

    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    /// Validate configuration
    pub fn validate(&self) -> LdapResult<()> {
        if self.host.trim().is_empty() {
            return Err(LdapError::config("host is required"));
        }

        if self.host.contains("://") {
            return Err(LdapError::config(
                "host must not carry a scheme; set protocol instead",
            ));
        }

        if self.port == 0 {
            return Err(LdapError::config("port must be non-zero"));
        }

        if self.base_dn.trim().is_empty() {
            return Err(LdapError::config("base_dn is required"));
        }

        if self.ldap_object_class.trim().is_empty() {
            return Err(LdapError::config("ldap_object_class must not be empty"));
        }

        if self.ldap_version != 3 {
            return Err(LdapError::config(format!(
                "LDAP protocol version {} is not supported; only version 3 is",
                self.ldap_version
            )));
        }

        if self.connect_timeout == 0 || self.timeout == 0 {
            return Err(LdapError::config("timeouts must be at least one second"));
        }

        if self.search_user_name.is_empty() {
            return Err(LdapError::config("search_user_name is required"));
        }

        // An empty password turns the service bind into an anonymous bind
        if self.search_user_password.is_empty() {
            return Err(LdapError::config("search_user_password is required"));
        }

        if self.login_attribute == LoginAttribute::SamAccountName
            && self.user_domain.as_deref().map_or(true, str::is_empty)
        {
            return Err(LdapError::config(
                "login_attribute sAMAccountName requires user_domain",
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Login attribute scheme
// ============================================================================

/// Attribute scheme that selects bind construction and lookup filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LoginAttribute {
    /// `uid=<user>,<baseDn>` binds (OpenLDAP, 389 Directory Server)
    #[default]
    Uid,
    /// `<user><domain>` principal binds (Active Directory)
    SamAccountName,
}

impl LoginAttribute {
    /// Attribute name as used in filters
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginAttribute::Uid => "uid",
            LoginAttribute::SamAccountName => "sAMAccountName",
        }
    }
}

impl fmt::Display for LoginAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoginAttribute {
    type Err = LdapError;

    fn from_str(s: &str) -> LdapResult<Self> {
        if s.eq_ignore_ascii_case("uid") {
            Ok(LoginAttribute::Uid)
        } else if s.eq_ignore_ascii_case("sAMAccountName") {
            Ok(LoginAttribute::SamAccountName)
        } else {
            Err(LdapError::config(format!(
                "unknown login_attribute {:?}; expected uid or sAMAccountName",
                s
            )))
        }
    }
}

impl TryFrom<String> for LoginAttribute {
    type Error = LdapError;

    fn try_from(value: String) -> LdapResult<Self> {
        value.parse()
    }
}

impl From<LoginAttribute> for String {
    fn from(value: LoginAttribute) -> Self {
        value.as_str().to_string()
    }
}

// ============================================================================
// Transport protocol
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Protocol {
    /// Plaintext LDAP
    #[default]
    Ldap,
    /// LDAP over TLS
    Ldaps,
}

impl Protocol {
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Ldap => "ldap",
            Protocol::Ldaps => "ldaps",
        }
    }
}

impl FromStr for Protocol {
    type Err = LdapError;

    fn from_str(s: &str) -> LdapResult<Self> {
        match s.trim_end_matches("://").to_ascii_lowercase().as_str() {
            "ldap" => Ok(Protocol::Ldap),
            "ldaps" => Ok(Protocol::Ldaps),
            _ => Err(LdapError::config(format!(
                "unknown protocol {:?}; expected ldap:// or ldaps://",
                s
            ))),
        }
    }
}

impl TryFrom<String> for Protocol {
    type Error = LdapError;

    fn try_from(value: String) -> LdapResult<Self> {
        value.parse()
    }
}

impl From<Protocol> for String {
    fn from(value: Protocol) -> Self {
        format!("{}://", value.scheme())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid_config() -> DirectoryConfig {
        DirectoryConfig {
            host: "ldap.example.com".to_string(),
            base_dn: "dc=example,dc=com".to_string(),
            search_user_name: "svc".to_string(),
            search_user_password: "secret".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = DirectoryConfig::default();

        assert_eq!(config.port, 389);
        assert_eq!(config.protocol, Protocol::Ldap);
        assert_eq!(config.login_attribute, LoginAttribute::Uid);
        assert_eq!(config.ldap_object_class, "person");
        assert_eq!(config.ldap_version, 3);
        assert_eq!(config.timeout, 10);
        assert_eq!(config.connect_timeout, 10);
        assert!(!config.follow_referrals);
    }

    #[test]
    fn test_config_validation() {
        let mut config = DirectoryConfig::default();

        // Should fail - empty host
        assert!(config.validate().is_err());

        config = valid_config();
        assert!(config.validate().is_ok());

        config.base_dn.clear();
        assert!(config.validate().is_err());

        config = valid_config();
        config.ldap_version = 2;
        assert!(config.validate().is_err());

        config = valid_config();
        config.host = "ldap://ldap.example.com".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_service_password_required() {
        let mut config = valid_config();
        config.search_user_password.clear();

        let err = config.validate().unwrap_err();
        assert!(matches!(err, LdapError::Configuration(_)));
        assert!(err.to_string().contains("search_user_password"));
    }

    #[test]
    fn test_sam_account_name_requires_domain() {
        let mut config = valid_config();
        config.login_attribute = LoginAttribute::SamAccountName;
        assert!(matches!(
            config.validate(),
            Err(LdapError::Configuration(_))
        ));

        config.user_domain = Some("@example.com".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_login_attribute_parsing() {
        assert_eq!("uid".parse::<LoginAttribute>().unwrap(), LoginAttribute::Uid);
        assert_eq!(
            "samaccountname".parse::<LoginAttribute>().unwrap(),
            LoginAttribute::SamAccountName
        );
        assert!("mail".parse::<LoginAttribute>().is_err());
    }

    #[test]
    fn test_protocol_parsing() {
        assert_eq!("ldap://".parse::<Protocol>().unwrap(), Protocol::Ldap);
        assert_eq!("LDAPS".parse::<Protocol>().unwrap(), Protocol::Ldaps);
        assert!("http://".parse::<Protocol>().is_err());
    }

    #[test]
    fn test_server_url() {
        let mut config = valid_config();
        assert_eq!(config.server_url(), "ldap://ldap.example.com:389");

        config.protocol = Protocol::Ldaps;
        config.port = 636;
        assert_eq!(config.server_url(), "ldaps://ldap.example.com:636");
    }

    #[test]
    fn test_from_toml() {
        let config = LdapgateConfig::from_toml(
            r#"
            [directory]
            host = "dc.example.com"
            protocol = "ldaps://"
            port = 636
            base_dn = "dc=example,dc=com"
            login_attribute = "sAMAccountName"
            user_domain = "@example.com"
            search_user_name = "svc"
            search_user_password = "secret"
            follow_referrals = true
            "#,
        )
        .unwrap();

        let dir = &config.directory;
        assert_eq!(dir.protocol, Protocol::Ldaps);
        assert_eq!(dir.login_attribute, LoginAttribute::SamAccountName);
        assert_eq!(dir.user_domain.as_deref(), Some("@example.com"));
        assert_eq!(dir.ldap_object_class, "person");
        assert!(dir.follow_referrals);
        assert_eq!(config.logging.level, "info");
        assert!(dir.validate().is_ok());
    }

    #[test]
    fn test_unknown_login_attribute_rejected_at_load() {
        let result = LdapgateConfig::from_toml(
            r#"
            [directory]
            host = "ldap.example.com"
            login_attribute = "mail"
            "#,
        );

        assert!(matches!(result, Err(LdapError::Configuration(_))));
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("LDAPGATE_HOST", "ldap.example.com"),
            ("LDAPGATE_PORT", "1389"),
            ("LDAPGATE_BASE_DN", "dc=example,dc=com"),
            ("LDAPGATE_LOGIN_ATTRIBUTE", "sAMAccountName"),
            ("LDAPGATE_USER_DOMAIN", "@example.com"),
            ("LDAPGATE_FOLLOW_REFERRALS", "true"),
            ("LDAPGATE_SEARCH_USER", "svc"),
            ("LDAPGATE_USER_GROUP", ""),
        ]
        .into_iter()
        .collect();

        let mut config = LdapgateConfig::default();
        config
            .apply_vars(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        let dir = &config.directory;
        assert_eq!(dir.host, "ldap.example.com");
        assert_eq!(dir.port, 1389);
        assert_eq!(dir.login_attribute, LoginAttribute::SamAccountName);
        assert!(dir.follow_referrals);
        assert_eq!(dir.user_group, None);
    }

    #[test]
    fn test_env_overlay_rejects_bad_port() {
        let mut config = LdapgateConfig::default();
        let result = config.apply_vars(|key| {
            (key == "LDAPGATE_PORT").then(|| "not-a-port".to_string())
        });

        assert!(matches!(result, Err(LdapError::Configuration(_))));
    }

    #[test]
    fn test_debug_redacts_password() {
        let rendered = format!("{:?}", valid_config());
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
