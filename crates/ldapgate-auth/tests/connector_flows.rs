//! End-to-end connector flows against the in-memory directory

use ldapgate_auth::ldap::{ConnectionState, DirectoryEntry, InMemoryDirectory, LdapConnector};
use ldapgate_auth::{DirectoryIdentity, IdentityProvider, LdapIdentityProvider};
use ldapgate_core::{DirectoryConfig, LdapError, LoginAttribute};

const ADMINS: &str = "cn=Admins,dc=example,dc=com";

fn uid_config() -> DirectoryConfig {
    DirectoryConfig {
        host: "ldap.example.com".to_string(),
        base_dn: "dc=example,dc=com".to_string(),
        search_user_name: "svc".to_string(),
        search_user_password: "svc-secret".to_string(),
        ..Default::default()
    }
}

fn ad_config() -> DirectoryConfig {
    DirectoryConfig {
        login_attribute: LoginAttribute::SamAccountName,
        user_domain: Some("@example.com".to_string()),
        ldap_object_class: "user".to_string(),
        ..uid_config()
    }
}

fn alice() -> DirectoryEntry {
    DirectoryEntry::new("uid=alice,dc=example,dc=com", Vec::<(&str, _)>::new())
        .with_attr("objectClass", ["top", "person"])
        .with_attr("uid", ["alice"])
        .with_attr("cn", ["Alice Jones"])
        .with_attr("mail", ["alice@example.com"])
}

fn bob() -> DirectoryEntry {
    DirectoryEntry::new("cn=bob,ou=users,dc=example,dc=com", Vec::<(&str, _)>::new())
        .with_attr("objectClass", ["top", "person", "user"])
        .with_attr("sAMAccountName", ["bob"])
        .with_attr("name", ["Bob Smith"])
        .with_attr("memberOf", [ADMINS])
}

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn test_uid_scheme_lookup() {
    let directory = InMemoryDirectory::new()
        .with_credentials("uid=svc,dc=example,dc=com", "svc-secret")
        .with_entry(alice());
    let mut connector = LdapConnector::with_factory(uid_config(), directory.clone()).unwrap();

    let entry = connector.find_by_attribute("alice").unwrap().unwrap();

    assert_eq!(entry.dn(), "uid=alice,dc=example,dc=com");
    assert_eq!(entry.get_attr("CN"), Some("Alice Jones"));
    assert_eq!(directory.bind_attempts(), vec!["uid=svc,dc=example,dc=com"]);
    assert_eq!(connector.connection_state(), ConnectionState::Bound);
}

#[test]
fn test_principal_scheme_binds_with_domain_suffix() {
    let directory = InMemoryDirectory::new()
        .with_credentials("svc@example.com", "svc-secret")
        .with_entry(bob());
    let mut connector = LdapConnector::with_factory(ad_config(), directory.clone()).unwrap();

    let entry = connector.find_by_attribute("bob").unwrap().unwrap();

    assert_eq!(entry.dn(), "cn=bob,ou=users,dc=example,dc=com");
    assert_eq!(directory.bind_attempts(), vec!["svc@example.com"]);
    assert_eq!(
        directory.searches()[0].filter,
        "(&(objectClass=user)(sAMAccountName=bob))"
    );
}

#[test]
fn test_repeated_lookups_share_one_connection() {
    let directory = InMemoryDirectory::new()
        .with_credentials("uid=svc,dc=example,dc=com", "svc-secret")
        .with_entry(alice());
    let mut connector = LdapConnector::with_factory(uid_config(), directory.clone()).unwrap();

    connector.find_by_attribute("alice").unwrap();
    connector.find_by_attribute("nobody").unwrap();
    connector.find_by_attribute("alice").unwrap();

    assert_eq!(directory.connect_count(), 1);
    assert_eq!(directory.bind_attempts().len(), 1);
    assert_eq!(directory.searches().len(), 3);
}

#[test]
fn test_lookup_with_rejected_service_bind() {
    let directory = InMemoryDirectory::new()
        .with_credentials("uid=svc,dc=example,dc=com", "rotated")
        .with_entry(alice());
    let mut connector = LdapConnector::with_factory(uid_config(), directory).unwrap();

    let err = connector.find_by_attribute("alice").unwrap_err();

    assert!(matches!(err, LdapError::Bind { code: 49, .. }));
    assert!(err.to_string().starts_with("Unable to bind LDAP search user. Code 49"));
    assert_eq!(connector.connection_state(), ConnectionState::Failed);
}

// ============================================================================
// Membership
// ============================================================================

#[test]
fn test_membership_filter_and_outcome() {
    let directory = InMemoryDirectory::new()
        .with_credentials("svc@example.com", "svc-secret")
        .with_entry(bob());
    let mut connector = LdapConnector::with_factory(ad_config(), directory.clone()).unwrap();

    assert!(connector.has_membership("bob", ADMINS).unwrap());
    assert_eq!(
        directory.searches()[0].filter,
        "(&(objectClass=user)(sAMAccountName=bob)(memberof=cn=Admins,dc=example,dc=com))"
    );

    let empty = InMemoryDirectory::new().with_credentials("svc@example.com", "svc-secret");
    let mut connector = LdapConnector::with_factory(ad_config(), empty).unwrap();
    assert!(!connector.has_membership("bob", ADMINS).unwrap());
}

#[test]
fn test_membership_metacharacters_do_not_widen_filter() {
    let directory = InMemoryDirectory::new()
        .with_credentials("svc@example.com", "svc-secret")
        .with_entry(bob());
    let mut connector = LdapConnector::with_factory(ad_config(), directory).unwrap();

    assert!(!connector.has_membership("bob", ")(memberof=*").unwrap());
    assert!(!connector.has_membership("*", ADMINS).unwrap());
    assert!(!connector
        .has_membership("bob)(|(sAMAccountName=*", ADMINS)
        .unwrap());
}

// ============================================================================
// Authentication
// ============================================================================

fn auth_directory() -> InMemoryDirectory {
    InMemoryDirectory::new()
        .with_credentials("svc@example.com", "svc-secret")
        .with_credentials("cn=bob,ou=users,dc=example,dc=com", "hunter2")
        .with_entry(bob())
}

#[test]
fn test_authenticate_matches_membership() {
    let directory = auth_directory();
    let mut connector = LdapConnector::with_factory(ad_config(), directory).unwrap();
    let dn = "cn=bob,ou=users,dc=example,dc=com";

    for group in [ADMINS, "cn=Auditors,dc=example,dc=com"] {
        let authenticated = connector
            .authenticate("bob", dn, "hunter2", Some(group))
            .unwrap();
        let member = connector.has_membership("bob", group).unwrap();
        assert_eq!(authenticated, member, "group {}", group);
    }
}

#[test]
fn test_wrong_password_never_errors() {
    let directory = auth_directory();
    let mut connector = LdapConnector::with_factory(ad_config(), directory).unwrap();
    let dn = "cn=bob,ou=users,dc=example,dc=com";

    assert!(!connector.authenticate("bob", dn, "wrong", None).unwrap());
    assert!(!connector
        .authenticate("bob", dn, "wrong", Some(ADMINS))
        .unwrap());
    assert!(!connector.authenticate("bob", dn, "", Some(ADMINS)).unwrap());
}

#[test]
fn test_authenticate_without_group_issues_no_search() {
    let directory = auth_directory();
    let mut connector = LdapConnector::with_factory(ad_config(), directory.clone()).unwrap();

    assert!(connector
        .authenticate("bob", "cn=bob,ou=users,dc=example,dc=com", "hunter2", None)
        .unwrap());
    assert!(directory.searches().is_empty());
}

#[test]
fn test_service_connection_is_never_rebound() {
    let directory = auth_directory();
    let mut connector = LdapConnector::with_factory(ad_config(), directory.clone()).unwrap();
    connector.connect().unwrap();

    assert!(connector
        .authenticate("bob", "cn=bob,ou=users,dc=example,dc=com", "hunter2", Some(ADMINS))
        .unwrap());

    // A later service-scoped lookup still runs as the service account
    connector.find_by_attribute("bob").unwrap();

    let searches = directory.searches();
    assert_eq!(searches.len(), 2);
    assert!(searches
        .iter()
        .all(|s| s.bound_as.as_deref() == Some("svc@example.com")));
    assert_eq!(
        directory.bind_attempts(),
        vec!["svc@example.com", "cn=bob,ou=users,dc=example,dc=com"]
    );
}

// ============================================================================
// Identity provider
// ============================================================================

#[test]
fn test_identity_provider_resolves_identity() {
    let connector = LdapConnector::with_factory(ad_config(), auth_directory()).unwrap();
    let mut provider = LdapIdentityProvider::from_connector(connector);

    let identity = provider.find_identity("bob").unwrap().unwrap();
    assert_eq!(identity.id, "bob");
    assert_eq!(identity.full_name.as_deref(), Some("Bob Smith"));
    assert!(provider.find_identity("carol").unwrap().is_none());

    assert!(provider
        .validate_password(&identity, "hunter2", Some(ADMINS))
        .unwrap());
    assert!(!provider.validate_password(&identity, "nope", None).unwrap());

    let json = serde_json::to_value(&identity).unwrap();
    assert_eq!(json["dn"], "cn=bob,ou=users,dc=example,dc=com");
    let back: DirectoryIdentity = serde_json::from_value(json).unwrap();
    assert_eq!(back, identity);
}

#[test]
fn test_identity_provider_rejects_tokens() {
    let connector = LdapConnector::with_factory(ad_config(), auth_directory()).unwrap();
    let mut provider = LdapIdentityProvider::from_connector(connector);

    let err = provider.find_identity_by_access_token("abc").unwrap_err();
    assert_eq!(err.to_string(), "Access tokens are not supported");
}

#[test]
fn test_unreachable_server_is_connection_error() {
    let directory = InMemoryDirectory::new().unreachable();
    let mut connector = LdapConnector::with_factory(uid_config(), directory).unwrap();

    let err = connector.find_by_attribute("alice").unwrap_err();
    assert!(err.is_connection_error());
    assert!(err.to_string().starts_with("Unable to connect to LDAP."));
}

#[test]
fn test_empty_service_password_is_rejected_before_any_bind() {
    let directory = InMemoryDirectory::new().with_entry(alice());
    let config = DirectoryConfig {
        search_user_password: String::new(),
        ..uid_config()
    };

    let err = match LdapConnector::with_factory(config, directory.clone()) {
        Ok(_) => panic!("connector accepted an empty service password"),
        Err(e) => e,
    };

    assert!(matches!(err, LdapError::Configuration(_)));
    assert!(directory.bind_attempts().is_empty());
    assert!(directory.searches().is_empty());
}
