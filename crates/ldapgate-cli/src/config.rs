//! Configuration loading for the ldapgate CLI
//!
//! Precedence, lowest first: built-in defaults, config file, `LDAPGATE_*`
//! environment variables, command-line flags.

use anyhow::{Context, Result};
use ldapgate_core::{DirectoryConfig, LdapgateConfig};
use std::path::Path;

pub fn load(path: Option<&Path>) -> Result<LdapgateConfig> {
    let mut config = match path {
        Some(path) => LdapgateConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => LdapgateConfig::default(),
    };

    config
        .apply_env()
        .context("Invalid LDAPGATE_* environment variable")?;

    Ok(config)
}

pub fn apply_overrides(
    directory: &mut DirectoryConfig,
    host: Option<String>,
    port: Option<u16>,
    base_dn: Option<String>,
) {
    if let Some(host) = host {
        directory.host = host;
    }
    if let Some(port) = port {
        directory.port = port;
    }
    if let Some(base_dn) = base_dn {
        directory.base_dn = base_dn;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[directory]
host = "dc01.corp.example"
base_dn = "dc=corp,dc=example"
login_attribute = "sAMAccountName"
user_domain = "@corp.example"
search_user_name = "svc"
search_user_password = "secret"
user_group = "cn=Support,dc=corp,dc=example"

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.directory.host, "dc01.corp.example");
        assert_eq!(
            config.directory.user_group.as_deref(),
            Some("cn=Support,dc=corp,dc=example")
        );
        assert_eq!(config.logging.format, "json");
        assert!(config.directory.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(load(Some(missing.as_path())).is_err());
    }

    #[test]
    fn test_flags_override_file_values() {
        let mut directory = DirectoryConfig {
            host: "from-file".to_string(),
            port: 389,
            ..Default::default()
        };

        apply_overrides(&mut directory, Some("from-flag".to_string()), Some(1389), None);

        assert_eq!(directory.host, "from-flag");
        assert_eq!(directory.port, 1389);
        assert_eq!(directory.base_dn, "");
    }
}
