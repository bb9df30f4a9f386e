//! Directory-backed user identities

use crate::ldap::{DirectoryEntry, Ldap3Connector, LdapConnector, TransportFactory};
use ldapgate_core::{DirectoryConfig, LdapError, LdapResult, LoginAttribute};
use serde::{Deserialize, Serialize};

/// User record mapped from a directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryIdentity {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub dn: String,
}

impl DirectoryIdentity {
    /// Map an entry according to the login scheme.
    ///
    /// Only the identifying attribute is mandatory.
    pub fn from_entry(entry: &DirectoryEntry, scheme: LoginAttribute) -> LdapResult<Self> {
        let id_attribute = scheme.as_str();
        let id = entry
            .get_attr(id_attribute)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                LdapError::IdentityMapping(format!(
                    "entry {} has no {} attribute",
                    entry.dn(),
                    id_attribute
                ))
            })?
            .to_string();

        let attr = |name: &str| entry.get_attr(name).map(str::to_string);

        let (full_name, display_name) = match scheme {
            LoginAttribute::SamAccountName => (attr("name"), attr("displayname")),
            LoginAttribute::Uid => (attr("cn"), attr("displayname").or_else(|| attr("cn"))),
        };

        Ok(Self {
            username: id.clone(),
            id,
            full_name,
            display_name,
            email: attr("mail"),
            dn: entry.dn().to_string(),
        })
    }
}

/// Identity lookups a host session layer relies on.
///
/// Token and auth-key operations reject by default; a directory holds neither.
pub trait IdentityProvider {
    fn find_identity(&mut self, id: &str) -> LdapResult<Option<DirectoryIdentity>>;

    fn find_identity_by_access_token(
        &mut self,
        _token: &str,
    ) -> LdapResult<Option<DirectoryIdentity>> {
        Err(LdapError::UnsupportedOperation("Access tokens"))
    }

    fn auth_key(&self, _identity: &DirectoryIdentity) -> LdapResult<String> {
        Err(LdapError::UnsupportedOperation("Auth keys"))
    }

    fn validate_auth_key(&self, _identity: &DirectoryIdentity, _key: &str) -> LdapResult<bool> {
        Err(LdapError::UnsupportedOperation("Auth keys"))
    }
}

/// [`IdentityProvider`] over an [`LdapConnector`]
pub struct LdapIdentityProvider<F: TransportFactory = Ldap3Connector> {
    connector: LdapConnector<F>,
}

impl LdapIdentityProvider<Ldap3Connector> {
    pub fn new(config: DirectoryConfig) -> LdapResult<Self> {
        Ok(Self::from_connector(LdapConnector::new(config)?))
    }
}

impl<F: TransportFactory> LdapIdentityProvider<F> {
    pub fn from_connector(connector: LdapConnector<F>) -> Self {
        Self { connector }
    }

    pub fn connector(&mut self) -> &mut LdapConnector<F> {
        &mut self.connector
    }

    /// Check a password for an identity, with optional group
    pub fn validate_password(
        &mut self,
        identity: &DirectoryIdentity,
        password: &str,
        group: Option<&str>,
    ) -> LdapResult<bool> {
        self.connector
            .authenticate(&identity.username, &identity.dn, password, group)
    }
}

impl<F: TransportFactory> IdentityProvider for LdapIdentityProvider<F> {
    fn find_identity(&mut self, id: &str) -> LdapResult<Option<DirectoryIdentity>> {
        let scheme = self.connector.config().login_attribute;
        self.connector
            .find_by_attribute(id)?
            .map(|entry| DirectoryIdentity::from_entry(&entry, scheme))
            .transpose()
    }
}
