//! LDAP directory connector
//!
//! Supports:
//! - uid-style binds (OpenLDAP, 389 Directory Server)
//! - principal binds against Active Directory (`user@domain`)
//! - group authorization through `memberOf`
//! - plaintext and `ldaps://` transports

mod authenticator;
mod client;
mod connection;
mod entry;
mod filter;
mod memory;
mod search;
mod transport;

pub use authenticator::{AuthenticationRequest, Authenticator};
pub use client::LdapConnector;
pub use connection::{ConnectionState, DirectoryConnection, ServiceCredentials, ServiceIdentity};
pub use entry::DirectoryEntry;
pub use filter::{
    SearchFilter, MEMBERSHIP_ACCOUNT_ATTRIBUTE, MEMBERSHIP_GROUP_ATTRIBUTE,
    MEMBERSHIP_OBJECT_CLASS,
};
pub use memory::{InMemoryDirectory, InMemoryTransport, RecordedSearch};
pub use search::DirectorySearch;
pub use transport::{
    BindResult, ConnectionSettings, DirectoryTransport, Ldap3Connector, Ldap3Transport,
    TransportFactory, RC_INVALID_CREDENTIALS, RC_REFERRAL, RC_SIZE_LIMIT_EXCEEDED, RC_SUCCESS,
};
