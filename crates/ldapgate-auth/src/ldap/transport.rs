//! Wire transport seam
//!
//! [`DirectoryTransport`] is one open network handle; [`TransportFactory`] opens
//! handles. The production pair wraps the blocking `ldap3::LdapConn`, the
//! in-memory pair in [`super::memory`] backs tests.

use crate::ldap::entry::DirectoryEntry;
use ldap3::{
    parse_refs, LdapConn, LdapConnSettings, Scope, SearchEntry, SearchOptions, SearchResult,
};
use ldapgate_core::{DirectoryConfig, LdapError, LdapResult};
use percent_encoding::percent_decode_str;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// LDAP result code: success
pub const RC_SUCCESS: u32 = 0;
/// LDAP result code: sizeLimitExceeded
pub const RC_SIZE_LIMIT_EXCEEDED: u32 = 4;
/// LDAP result code: referral
pub const RC_REFERRAL: u32 = 10;
/// LDAP result code: invalidCredentials
pub const RC_INVALID_CREDENTIALS: u32 = 49;

/// Options applied to every handle a factory opens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    /// `ldap` or `ldaps`
    pub scheme: &'static str,
    pub ldap_version: u32,
    pub follow_referrals: bool,
    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
}

impl ConnectionSettings {
    pub fn from_config(config: &DirectoryConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            scheme: config.protocol.scheme(),
            ldap_version: config.ldap_version,
            follow_referrals: config.follow_referrals,
            connect_timeout: config.connect_timeout_duration(),
            operation_timeout: config.operation_timeout(),
        }
    }

    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Outcome of a simple bind that reached the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindResult {
    pub code: u32,
    pub message: String,
}

impl BindResult {
    pub fn success() -> Self {
        Self {
            code: RC_SUCCESS,
            message: String::new(),
        }
    }

    pub fn rejected(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == RC_SUCCESS
    }
}

/// One open handle to a directory server.
///
/// Errors returned here are transport or protocol failures; a bind the server
/// rejected is an `Ok` [`BindResult`] with a non-zero code.
pub trait DirectoryTransport: Send {
    fn simple_bind(&mut self, bind_dn: &str, password: &str) -> LdapResult<BindResult>;

    /// Subtree search; entries come back in server order
    fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attrs: &[&str],
    ) -> LdapResult<Vec<DirectoryEntry>>;

    fn unbind(&mut self) -> LdapResult<()>;
}

/// Opens handles to the configured directory server
pub trait TransportFactory: Send + Sync {
    type Transport: DirectoryTransport;

    fn open(&self, settings: &ConnectionSettings) -> LdapResult<Self::Transport>;
}

// ============================================================================
// ldap3 transport
// ============================================================================

/// Opens blocking `ldap3` connections
#[derive(Debug, Clone, Copy, Default)]
pub struct Ldap3Connector;

impl TransportFactory for Ldap3Connector {
    type Transport = Ldap3Transport;

    fn open(&self, settings: &ConnectionSettings) -> LdapResult<Ldap3Transport> {
        Ldap3Transport::connect(settings, &settings.url())
    }
}

pub struct Ldap3Transport {
    conn: LdapConn,
    settings: ConnectionSettings,
    /// Identity of the last successful bind, reused for referred servers
    bound_as: Option<(String, String)>,
}

impl Ldap3Transport {
    fn connect(settings: &ConnectionSettings, url: &str) -> LdapResult<Self> {
        let conn_settings = LdapConnSettings::new().set_conn_timeout(settings.connect_timeout);

        debug!(
            "Connecting to LDAP server: {} (protocol version {})",
            url, settings.ldap_version
        );

        let conn = LdapConn::with_settings(conn_settings, url).map_err(|e| {
            LdapError::Connection {
                code: ldap3_code(&e),
                message: format!("Failed to connect to {}: {}", url, e),
            }
        })?;

        Ok(Self {
            conn,
            settings: settings.clone(),
            bound_as: None,
        })
    }

    fn search_options(&self) -> SearchOptions {
        let secs = self.settings.operation_timeout.as_secs();
        SearchOptions::new().timelimit(i32::try_from(secs).unwrap_or(i32::MAX))
    }

    /// Search a server named by a referral URL, bound as the current identity
    fn chase_referral(
        &self,
        referral: &str,
        base_dn: &str,
        filter: &str,
        attrs: &[&str],
    ) -> LdapResult<Vec<DirectoryEntry>> {
        let (url, referred_base) = parse_referral(referral)?;
        let base = referred_base.as_deref().unwrap_or(base_dn);

        let mut settings = self.settings.clone();
        settings.follow_referrals = false;

        let mut referred = Ldap3Transport::connect(&settings, &url)?;
        if let Some((dn, password)) = &self.bound_as {
            let result = referred.simple_bind(dn, password)?;
            if !result.is_success() {
                return Err(LdapError::Search {
                    code: Some(result.code),
                    message: format!(
                        "Bind on referred server {} rejected: {}",
                        url, result.message
                    ),
                });
            }
        }

        let entries = referred.search(base, filter, attrs);
        let _ = referred.unbind();
        entries
    }
}

impl DirectoryTransport for Ldap3Transport {
    fn simple_bind(&mut self, bind_dn: &str, password: &str) -> LdapResult<BindResult> {
        let result = self
            .conn
            .with_timeout(self.settings.operation_timeout)
            .simple_bind(bind_dn, password)
            .map_err(|e| LdapError::Connection {
                code: ldap3_code(&e),
                message: format!("Bind request failed: {}", e),
            })?;

        if result.rc == RC_SUCCESS {
            self.bound_as = Some((bind_dn.to_string(), password.to_string()));
        }

        Ok(BindResult {
            code: result.rc,
            message: result.text,
        })
    }

    fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        attrs: &[&str],
    ) -> LdapResult<Vec<DirectoryEntry>> {
        let options = self.search_options();
        let SearchResult(rs, result) = self
            .conn
            .with_timeout(self.settings.operation_timeout)
            .with_search_options(options)
            .search(base_dn, Scope::Subtree, filter, attrs.to_vec())
            .map_err(|e| LdapError::Search {
                code: ldap3_code(&e),
                message: e.to_string(),
            })?;

        let mut references = Vec::new();
        let mut entries = Vec::new();
        for entry in rs {
            if entry.is_ref() {
                references.extend(parse_refs(entry.0));
            } else if !entry.is_intermediate() {
                entries.push(DirectoryEntry::from_search_entry(SearchEntry::construct(entry)));
            }
        }

        let outcome = classify_search(
            result.rc,
            result.text,
            entries,
            references,
            result.refs,
            self.settings.follow_referrals,
        )?;

        Ok(outcome.resolve(|referral| self.chase_referral(referral, base_dn, filter, attrs)))
    }

    fn unbind(&mut self) -> LdapResult<()> {
        self.bound_as = None;
        self.conn.unbind().map_err(|e| LdapError::Connection {
            code: ldap3_code(&e),
            message: format!("Unbind failed: {}", e),
        })
    }
}

/// Entries of a finished search plus the referrals still to be chased
#[derive(Debug, PartialEq, Eq)]
struct SearchOutcome {
    entries: Vec<DirectoryEntry>,
    referrals: Vec<String>,
}

impl SearchOutcome {
    /// Append the entries of each referral after the local ones.
    ///
    /// A referral that cannot be followed is logged and skipped.
    fn resolve<C>(self, mut chase: C) -> Vec<DirectoryEntry>
    where
        C: FnMut(&str) -> LdapResult<Vec<DirectoryEntry>>,
    {
        let mut entries = self.entries;
        for referral in self.referrals {
            debug!("Following referral: {}", referral);
            match chase(&referral) {
                Ok(referred) => entries.extend(referred),
                Err(e) => warn!("Referral {} could not be followed: {}", referral, e),
            }
        }
        entries
    }
}

/// Map the result code of a search onto entries, referrals or an error.
///
/// `references` are continuation references returned alongside entries,
/// `result_refs` the URLs of an rc 10 result.
fn classify_search(
    rc: u32,
    text: String,
    entries: Vec<DirectoryEntry>,
    mut references: Vec<String>,
    result_refs: Vec<String>,
    follow_referrals: bool,
) -> LdapResult<SearchOutcome> {
    match rc {
        RC_SUCCESS => {}
        RC_REFERRAL => references.extend(result_refs),
        RC_SIZE_LIMIT_EXCEEDED => {
            warn!("Search size limit exceeded; returning {} entries", entries.len());
        }
        rc => {
            return Err(LdapError::Search {
                code: Some(rc),
                message: text,
            })
        }
    }

    if !follow_referrals && !references.is_empty() {
        debug!("Ignoring {} referral(s)", references.len());
        references.clear();
    }

    Ok(SearchOutcome {
        entries,
        referrals: references,
    })
}

fn ldap3_code(err: &ldap3::LdapError) -> Option<u32> {
    match err {
        ldap3::LdapError::LdapResult { result } => Some(result.rc),
        _ => None,
    }
}

/// Split a referral URL into the server URL and the optional base DN it names
fn parse_referral(referral: &str) -> LdapResult<(String, Option<String>)> {
    let parsed = Url::parse(referral)
        .map_err(|e| LdapError::search(format!("Invalid referral {}: {}", referral, e)))?;

    let host = parsed
        .host_str()
        .ok_or_else(|| LdapError::search(format!("Referral {} names no host", referral)))?;

    let url = match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    };

    let base = percent_decode_str(parsed.path().trim_start_matches('/'))
        .decode_utf8_lossy()
        .into_owned();

    Ok((url, Some(base).filter(|b| !b.is_empty())))
}
