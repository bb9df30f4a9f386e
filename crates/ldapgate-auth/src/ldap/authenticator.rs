//! End-user authentication and group authorization
//!
//! The password check binds on a dedicated user-scope handle that is unbound
//! and dropped right after the bind. The service connection keeps its service
//! identity, so the membership search runs with service-account permissions.

use crate::ldap::connection::DirectoryConnection;
use crate::ldap::search::DirectorySearch;
use crate::ldap::transport::{DirectoryTransport, TransportFactory};
use ldapgate_core::{DirectoryConfig, LdapResult};
use std::fmt;
use tracing::{debug, info, warn};

/// One login attempt
#[derive(Clone)]
pub struct AuthenticationRequest {
    pub username: String,
    /// Distinguished name to bind as
    pub dn: String,
    password: String,
    /// Group the user must belong to, if any
    pub group: Option<String>,
}

impl AuthenticationRequest {
    pub fn new(
        username: impl Into<String>,
        dn: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            dn: dn.into(),
            password: password.into(),
            group: None,
        }
    }

    pub fn with_group(mut self, group: Option<impl Into<String>>) -> Self {
        self.group = group.map(Into::into);
        self
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for AuthenticationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationRequest")
            .field("username", &self.username)
            .field("dn", &self.dn)
            .field("password", &"<redacted>")
            .field("group", &self.group)
            .finish()
    }
}

pub struct Authenticator<'a, F: TransportFactory> {
    conn: &'a mut DirectoryConnection<F>,
    config: &'a DirectoryConfig,
}

impl<'a, F: TransportFactory> Authenticator<'a, F> {
    pub fn new(conn: &'a mut DirectoryConnection<F>, config: &'a DirectoryConfig) -> Self {
        Self { conn, config }
    }

    /// Check the password and, when a group is named, the membership.
    ///
    /// Wrong credentials and missing membership are `Ok(false)`. Errors are
    /// operational failures only.
    pub fn authenticate(&mut self, request: &AuthenticationRequest) -> LdapResult<bool> {
        if !self.verify_password(&request.dn, request.password())? {
            info!("Authentication rejected for {}", request.username);
            return Ok(false);
        }

        let Some(group) = request.group.as_deref().filter(|g| !g.is_empty()) else {
            info!("Authenticated {}", request.username);
            return Ok(true);
        };

        let member =
            DirectorySearch::new(self.conn, self.config).has_membership(&request.username, group)?;

        if member {
            info!("Authenticated {} as member of {}", request.username, group);
        } else {
            warn!("{} authenticated but is not a member of {}", request.username, group);
        }

        Ok(member)
    }

    /// Bind as `dn` on a fresh handle
    fn verify_password(&self, dn: &str, password: &str) -> LdapResult<bool> {
        // An empty password would be an unauthenticated bind, which servers accept
        if dn.is_empty() || password.is_empty() {
            debug!("Refusing bind with empty DN or password");
            return Ok(false);
        }

        let mut user_scope = self.conn.factory().open(self.conn.settings())?;
        let result = user_scope.simple_bind(dn, password);

        if let Err(e) = user_scope.unbind() {
            debug!("Unbind of user scope failed: {}", e);
        }

        let result = result?;
        if !result.is_success() {
            debug!("User bind for {} rejected with code {}", dn, result.code);
        }

        Ok(result.is_success())
    }
}
