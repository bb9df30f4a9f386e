//! Search filter construction
//!
//! Caller-supplied values are always escaped with [`ldap3::ldap_escape`] before
//! they are placed into a filter, so `*`, `(`, `)`, `\` and NUL cannot change
//! the structure of the filter.

use ldap3::ldap_escape;
use std::fmt;

/// Object class used by membership lookups
pub const MEMBERSHIP_OBJECT_CLASS: &str = "user";
/// Account attribute used by membership lookups
pub const MEMBERSHIP_ACCOUNT_ATTRIBUTE: &str = "sAMAccountName";
/// Group attribute used by membership lookups
pub const MEMBERSHIP_GROUP_ATTRIBUTE: &str = "memberof";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter(String);

impl SearchFilter {
    /// `(&(objectClass=<object_class>)(<attribute>=<value>))`
    pub fn by_attribute(object_class: &str, attribute: &str, value: &str) -> Self {
        Self(format!(
            "(&(objectClass={})({}={}))",
            object_class,
            attribute,
            ldap_escape(value)
        ))
    }

    /// `(&(objectClass=user)(sAMAccountName=<username>)(memberof=<group>))`
    pub fn membership(username: &str, group: &str) -> Self {
        Self(format!(
            "(&(objectClass={})({}={})({}={}))",
            MEMBERSHIP_OBJECT_CLASS,
            MEMBERSHIP_ACCOUNT_ATTRIBUTE,
            ldap_escape(username),
            MEMBERSHIP_GROUP_ATTRIBUTE,
            ldap_escape(group)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SearchFilter {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
