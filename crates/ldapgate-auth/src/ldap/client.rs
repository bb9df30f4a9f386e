//! Host-facing connector
//!
//! Owns the validated configuration and the service connection, and hands out
//! short-lived [`DirectorySearch`] and [`Authenticator`] views over it.

use crate::ldap::authenticator::{AuthenticationRequest, Authenticator};
use crate::ldap::connection::{ConnectionState, DirectoryConnection, ServiceCredentials};
use crate::ldap::entry::DirectoryEntry;
use crate::ldap::search::DirectorySearch;
use crate::ldap::transport::{ConnectionSettings, Ldap3Connector, TransportFactory};
use ldapgate_core::{DirectoryConfig, LdapResult};
use std::sync::Arc;
use tracing::debug;

/// Directory connector over a [`TransportFactory`]
pub struct LdapConnector<F: TransportFactory = Ldap3Connector> {
    config: DirectoryConfig,
    conn: DirectoryConnection<F>,
}

impl LdapConnector<Ldap3Connector> {
    /// Connector over real `ldap3` connections. Nothing is opened until first use.
    pub fn new(config: DirectoryConfig) -> LdapResult<Self> {
        Self::with_factory(config, Ldap3Connector)
    }
}

impl<F: TransportFactory> LdapConnector<F> {
    pub fn with_factory(config: DirectoryConfig, factory: F) -> LdapResult<Self> {
        config.validate()?;
        let credentials = ServiceCredentials::from_config(&config)?;
        let settings = ConnectionSettings::from_config(&config);

        debug!(
            "LDAP connector configured for {} (login attribute {})",
            settings.url(),
            config.login_attribute
        );

        Ok(Self {
            conn: DirectoryConnection::new(Arc::new(factory), settings, credentials),
            config,
        })
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.conn.state()
    }

    /// Connect and bind the service account now instead of on first use
    pub fn connect(&mut self) -> LdapResult<()> {
        self.conn.ensure_connected()
    }

    pub fn find_by_attribute(&mut self, value: &str) -> LdapResult<Option<DirectoryEntry>> {
        DirectorySearch::new(&mut self.conn, &self.config).find_by_attribute(value)
    }

    pub fn has_membership(&mut self, username: &str, group: &str) -> LdapResult<bool> {
        DirectorySearch::new(&mut self.conn, &self.config).has_membership(username, group)
    }

    pub fn authenticate(
        &mut self,
        username: &str,
        dn: &str,
        password: &str,
        group: Option<&str>,
    ) -> LdapResult<bool> {
        let request = AuthenticationRequest::new(username, dn, password).with_group(group);
        self.authenticate_request(&request)
    }

    pub fn authenticate_request(&mut self, request: &AuthenticationRequest) -> LdapResult<bool> {
        Authenticator::new(&mut self.conn, &self.config).authenticate(request)
    }

    pub fn disconnect(&mut self) {
        self.conn.disconnect();
    }
}
