//! Directory entry records returned by searches

use ldap3::SearchEntry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An entry read from the directory.
///
/// Attribute names are case-insensitive in LDAP, so they are stored lower-cased
/// and every lookup is lower-cased as well.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    dn: String,
    attributes: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn new<I, K>(dn: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<String>)>,
        K: AsRef<str>,
    {
        let mut entry = Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        };
        for (name, values) in attributes {
            entry.push_values(name.as_ref(), values);
        }
        entry
    }

    /// Add an attribute, appending to any values already present
    pub fn with_attr<V: Into<String>>(
        mut self,
        name: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.push_values(name, values.into_iter().map(Into::into).collect());
        self
    }

    pub(crate) fn from_search_entry(entry: SearchEntry) -> Self {
        Self::new(entry.dn, entry.attrs)
    }

    fn push_values(&mut self, name: &str, values: Vec<String>) {
        self.attributes
            .entry(name.to_ascii_lowercase())
            .or_default()
            .extend(values);
    }

    /// Distinguished name of the entry
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// First value of an attribute
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.get_attrs(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All values of an attribute
    pub fn get_attrs(&self, name: &str) -> Option<&[String]> {
        self.attributes
            .get(&name.to_ascii_lowercase())
            .map(Vec::as_slice)
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.contains_key(&name.to_ascii_lowercase())
    }

    /// Iterate over `(lower-cased name, values)` pairs
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup_ignores_case() {
        let entry = DirectoryEntry::new(
            "cn=bob,ou=users,dc=example,dc=com",
            [
                ("sAMAccountName", vec!["bob".to_string()]),
                ("memberOf", vec!["cn=Admins,dc=example,dc=com".to_string()]),
            ],
        );

        assert_eq!(entry.get_attr("samaccountname"), Some("bob"));
        assert_eq!(entry.get_attr("SAMACCOUNTNAME"), Some("bob"));
        assert!(entry.has_attr("memberof"));
        assert_eq!(entry.get_attr("mail"), None);
    }

    #[test]
    fn test_multi_valued_attributes() {
        let entry = DirectoryEntry::new("uid=alice,dc=example,dc=com", Vec::<(&str, _)>::new())
            .with_attr("mail", ["alice@example.com"])
            .with_attr("Mail", ["a.smith@example.com"]);

        assert_eq!(entry.get_attr("mail"), Some("alice@example.com"));
        assert_eq!(entry.get_attrs("mail").map(<[String]>::len), Some(2));
        assert_eq!(entry.attributes().count(), 1);
    }

    #[test]
    fn test_from_search_entry() {
        let mut attrs = HashMap::new();
        attrs.insert("displayName".to_string(), vec!["Alice".to_string()]);

        let entry = DirectoryEntry::from_search_entry(SearchEntry {
            dn: "uid=alice,dc=example,dc=com".to_string(),
            attrs,
            bin_attrs: HashMap::new(),
        });

        assert_eq!(entry.dn(), "uid=alice,dc=example,dc=com");
        assert_eq!(entry.get_attr("displayname"), Some("Alice"));
    }
}
