//! Service connection lifecycle
//!
//! A [`DirectoryConnection`] owns exactly one handle, bound as the service
//! account. It is opened lazily, reused for the request scope and never
//! rebound as another identity.

use crate::ldap::transport::{ConnectionSettings, DirectoryTransport, TransportFactory};
use ldap3::dn_escape;
use ldapgate_core::{DirectoryConfig, LdapError, LdapResult, LoginAttribute};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Bound,
    Failed,
}

/// Bind identity of the search account
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceIdentity {
    /// Composed into `uid=<user>,<base_dn>`
    Uid { user: String, base_dn: String },
    /// Composed into `<user><domain_suffix>`
    Principal { user: String, domain_suffix: String },
}

impl ServiceIdentity {
    pub fn bind_name(&self) -> String {
        match self {
            ServiceIdentity::Uid { user, base_dn } => {
                format!("uid={},{}", dn_escape(user.as_str()), base_dn)
            }
            ServiceIdentity::Principal {
                user,
                domain_suffix,
            } => format!("{}{}", user, domain_suffix),
        }
    }
}

#[derive(Clone)]
pub struct ServiceCredentials {
    identity: ServiceIdentity,
    password: String,
}

impl ServiceCredentials {
    pub fn new(identity: ServiceIdentity, password: impl Into<String>) -> Self {
        Self {
            identity,
            password: password.into(),
        }
    }

    pub fn from_config(config: &DirectoryConfig) -> LdapResult<Self> {
        let user = config.search_user_name.clone();
        let identity = match config.login_attribute {
            LoginAttribute::Uid => ServiceIdentity::Uid {
                user,
                base_dn: config.base_dn.clone(),
            },
            LoginAttribute::SamAccountName => {
                let domain_suffix = config
                    .user_domain
                    .clone()
                    .filter(|d| !d.is_empty())
                    .ok_or_else(|| {
                        LdapError::config("login_attribute sAMAccountName requires user_domain")
                    })?;
                ServiceIdentity::Principal {
                    user,
                    domain_suffix,
                }
            }
        };

        Ok(Self::new(identity, config.search_user_password.clone()))
    }

    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    pub fn bind_name(&self) -> String {
        self.identity.bind_name()
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("identity", &self.identity)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Lazily bound connection to the directory server
pub struct DirectoryConnection<F: TransportFactory> {
    factory: Arc<F>,
    settings: ConnectionSettings,
    credentials: ServiceCredentials,
    transport: Option<F::Transport>,
    state: ConnectionState,
}

impl<F: TransportFactory> DirectoryConnection<F> {
    pub fn new(
        factory: Arc<F>,
        settings: ConnectionSettings,
        credentials: ServiceCredentials,
    ) -> Self {
        Self {
            factory,
            settings,
            credentials,
            transport: None,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    pub fn credentials(&self) -> &ServiceCredentials {
        &self.credentials
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Open the handle and bind the service account unless already bound.
    ///
    /// Failures are terminal for this call; the next call starts over with a
    /// fresh handle.
    pub fn ensure_connected(&mut self) -> LdapResult<()> {
        if self.state == ConnectionState::Bound && self.transport.is_some() {
            return Ok(());
        }

        self.transport = None;

        let mut transport = match self.factory.open(&self.settings) {
            Ok(transport) => transport,
            Err(e) => {
                self.state = ConnectionState::Failed;
                error!("Unable to connect to LDAP server {}: {}", self.settings.url(), e);
                return Err(e);
            }
        };

        let bind_name = self.credentials.bind_name();
        debug!("Binding LDAP search user: {}", bind_name);

        match transport.simple_bind(&bind_name, self.credentials.password()) {
            Ok(result) if result.is_success() => {
                info!("Bound LDAP search user {} on {}", bind_name, self.settings.url());
                self.transport = Some(transport);
                self.state = ConnectionState::Bound;
                Ok(())
            }
            Ok(result) => {
                self.state = ConnectionState::Failed;
                error!(
                    "LDAP search user {} bind rejected with code {}",
                    bind_name, result.code
                );
                let _ = transport.unbind();
                Err(LdapError::Bind {
                    code: result.code,
                    message: result.message,
                })
            }
            Err(e) => {
                self.state = ConnectionState::Failed;
                error!("LDAP search user {} bind failed: {}", bind_name, e);
                Err(e)
            }
        }
    }

    /// The bound service handle, connecting first if needed
    pub fn handle(&mut self) -> LdapResult<&mut F::Transport> {
        self.ensure_connected()?;
        self.transport
            .as_mut()
            .ok_or_else(|| LdapError::connection("connection is not bound"))
    }

    /// Drop the handle after a transport failure so the next call reconnects
    pub(crate) fn mark_failed(&mut self) {
        self.transport = None;
        self.state = ConnectionState::Failed;
    }

    /// Unbind (best effort) and return to `Disconnected`
    pub fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.unbind() {
                debug!("Unbind failed: {}", e);
            }
        }
        self.state = ConnectionState::Disconnected;
    }
}

impl<F: TransportFactory> Drop for DirectoryConnection<F> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
