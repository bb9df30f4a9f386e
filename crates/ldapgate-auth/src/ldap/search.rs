//! Directory search operations.
//!
//! Searches always run over the service connection and under the configured
//! base DN. An empty result is a normal "not found" outcome.

use crate::ldap::connection::DirectoryConnection;
use crate::ldap::entry::DirectoryEntry;
use crate::ldap::filter::SearchFilter;
use crate::ldap::transport::{DirectoryTransport, TransportFactory};
use ldapgate_core::{DirectoryConfig, LdapError, LdapResult};
use tracing::debug;

/// Search helper borrowing the service connection
pub struct DirectorySearch<'a, F: TransportFactory> {
    conn: &'a mut DirectoryConnection<F>,
    config: &'a DirectoryConfig,
}

impl<'a, F: TransportFactory> DirectorySearch<'a, F> {
    pub fn new(conn: &'a mut DirectoryConnection<F>, config: &'a DirectoryConfig) -> Self {
        Self { conn, config }
    }

    /// Run a subtree search under the base DN
    pub fn search(&mut self, filter: &SearchFilter) -> LdapResult<Vec<DirectoryEntry>> {
        let base_dn = self.config.base_dn.as_str();
        debug!("Searching {} with filter: {}", base_dn, filter);

        let transport = self.conn.handle()?;
        match transport.search(base_dn, filter.as_str(), &[]) {
            Ok(entries) => {
                debug!("Search returned {} entries", entries.len());
                Ok(entries)
            }
            Err(e) => {
                // No result code means the handle itself is broken
                if e.result_code().is_none() {
                    self.conn.mark_failed();
                }
                Err(into_search_error(e))
            }
        }
    }

    /// First entry whose login attribute equals `value`, in server order
    pub fn find_by_attribute(&mut self, value: &str) -> LdapResult<Option<DirectoryEntry>> {
        let filter = SearchFilter::by_attribute(
            &self.config.ldap_object_class,
            self.config.login_attribute.as_str(),
            value,
        );

        Ok(self.search(&filter)?.into_iter().next())
    }

    /// Whether `username` is a member of `group`
    pub fn has_membership(&mut self, username: &str, group: &str) -> LdapResult<bool> {
        let filter = SearchFilter::membership(username, group);
        let member = !self.search(&filter)?.is_empty();

        debug!("Membership of {} in {}: {}", username, group, member);
        Ok(member)
    }
}

fn into_search_error(err: LdapError) -> LdapError {
    match err {
        LdapError::Connection { code, message } => LdapError::Search { code, message },
        other => other,
    }
}
