//! Directory authentication for ldapgate

pub mod identity;
pub mod ldap;

pub use identity::{DirectoryIdentity, IdentityProvider, LdapIdentityProvider};
pub use ldap::{
    AuthenticationRequest, ConnectionState, DirectoryEntry, DirectoryTransport, InMemoryDirectory,
    Ldap3Connector, LdapConnector, SearchFilter, TransportFactory,
};
