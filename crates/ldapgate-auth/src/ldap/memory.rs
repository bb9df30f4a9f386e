//! In-memory directory for tests and host development
//!
//! Holds entries in server order, a table of bind names and passwords, and a
//! record of every connect, bind and search so callers can assert on traffic.
//! Filters are evaluated for `&`, `|`, `!`, equality, presence and substring
//! items, with `\XX` escapes decoded.

use crate::ldap::entry::DirectoryEntry;
use crate::ldap::transport::{
    BindResult, ConnectionSettings, DirectoryTransport, TransportFactory, RC_INVALID_CREDENTIALS,
};
use ldapgate_core::{LdapError, LdapResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// LDAP result code: filterError
const RC_FILTER_ERROR: u32 = 87;

/// A search the directory received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSearch {
    /// Bind name the handle was bound as, `None` when anonymous
    pub bound_as: Option<String>,
    pub base_dn: String,
    pub filter: String,
}

#[derive(Default)]
struct DirectoryState {
    entries: Vec<DirectoryEntry>,
    credentials: HashMap<String, String>,
    unreachable: bool,
    failing_searches: bool,
    connects: usize,
    unbinds: usize,
    binds: Vec<String>,
    searches: Vec<RecordedSearch>,
}

/// Shared handle to an in-memory directory; clones see the same data
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(self, entry: DirectoryEntry) -> Self {
        self.add_entry(entry);
        self
    }

    pub fn with_credentials(self, bind_name: &str, password: &str) -> Self {
        self.add_credentials(bind_name, password);
        self
    }

    /// Refuse every connection attempt
    pub fn unreachable(self) -> Self {
        self.set_reachable(false);
        self
    }

    pub fn add_entry(&self, entry: DirectoryEntry) {
        self.state.lock().entries.push(entry);
    }

    pub fn add_credentials(&self, bind_name: &str, password: &str) {
        self.state
            .lock()
            .credentials
            .insert(bind_name.to_ascii_lowercase(), password.to_string());
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().unreachable = !reachable;
    }

    /// Make searches fail at the transport level
    pub fn set_failing_searches(&self, failing: bool) {
        self.state.lock().failing_searches = failing;
    }

    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }

    pub fn unbind_count(&self) -> usize {
        self.state.lock().unbinds
    }

    /// Bind names in the order binds were attempted
    pub fn bind_attempts(&self) -> Vec<String> {
        self.state.lock().binds.clone()
    }

    pub fn searches(&self) -> Vec<RecordedSearch> {
        self.state.lock().searches.clone()
    }
}

impl TransportFactory for InMemoryDirectory {
    type Transport = InMemoryTransport;

    fn open(&self, settings: &ConnectionSettings) -> LdapResult<InMemoryTransport> {
        let mut state = self.state.lock();
        state.connects += 1;

        if state.unreachable {
            return Err(LdapError::Connection {
                code: None,
                message: format!("Failed to connect to {}: connection refused", settings.url()),
            });
        }

        Ok(InMemoryTransport {
            state: Arc::clone(&self.state),
            bound_as: None,
        })
    }
}

pub struct InMemoryTransport {
    state: Arc<Mutex<DirectoryState>>,
    bound_as: Option<String>,
}

impl DirectoryTransport for InMemoryTransport {
    fn simple_bind(&mut self, bind_dn: &str, password: &str) -> LdapResult<BindResult> {
        let mut state = self.state.lock();
        state.binds.push(bind_dn.to_string());

        // Unauthenticated simple bind: servers accept it as anonymous
        if password.is_empty() {
            self.bound_as = None;
            return Ok(BindResult::success());
        }

        match state.credentials.get(&bind_dn.to_ascii_lowercase()) {
            Some(expected) if expected == password => {
                self.bound_as = Some(bind_dn.to_string());
                Ok(BindResult::success())
            }
            _ => Ok(BindResult::rejected(
                RC_INVALID_CREDENTIALS,
                "Invalid credentials",
            )),
        }
    }

    fn search(
        &mut self,
        base_dn: &str,
        filter: &str,
        _attrs: &[&str],
    ) -> LdapResult<Vec<DirectoryEntry>> {
        let mut state = self.state.lock();
        state.searches.push(RecordedSearch {
            bound_as: self.bound_as.clone(),
            base_dn: base_dn.to_string(),
            filter: filter.to_string(),
        });

        if state.failing_searches {
            return Err(LdapError::search("connection reset by peer"));
        }

        let node = FilterParser::new(filter).parse().ok_or_else(|| LdapError::Search {
            code: Some(RC_FILTER_ERROR),
            message: format!("Bad search filter: {}", filter),
        })?;

        let base = base_dn.to_ascii_lowercase();
        Ok(state
            .entries
            .iter()
            .filter(|e| e.dn().to_ascii_lowercase().ends_with(&base))
            .filter(|e| node.matches(e))
            .cloned()
            .collect())
    }

    fn unbind(&mut self) -> LdapResult<()> {
        self.bound_as = None;
        self.state.lock().unbinds += 1;
        Ok(())
    }
}

// ============================================================================
// Filter evaluation
// ============================================================================

#[derive(Debug)]
enum FilterNode {
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
    Not(Box<FilterNode>),
    /// Attribute plus value segments split on unescaped `*`
    Item(String, Vec<String>),
}

impl FilterNode {
    fn matches(&self, entry: &DirectoryEntry) -> bool {
        match self {
            FilterNode::And(children) => children.iter().all(|c| c.matches(entry)),
            FilterNode::Or(children) => children.iter().any(|c| c.matches(entry)),
            FilterNode::Not(child) => !child.matches(entry),
            FilterNode::Item(attr, segments) => entry
                .get_attrs(attr)
                .map(|values| {
                    values
                        .iter()
                        .any(|v| glob_match(&v.to_lowercase(), segments))
                })
                .unwrap_or(false),
        }
    }
}

fn glob_match(value: &str, segments: &[String]) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return value == first;
    };

    if !value.starts_with(first.as_str()) {
        return false;
    }

    let mut pos = first.len();
    for segment in middle {
        match value[pos..].find(segment.as_str()) {
            Some(i) => pos += i + segment.len(),
            None => return false,
        }
    }

    value.len() >= pos + last.len() && value[pos..].ends_with(last.as_str())
}

struct FilterParser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> FilterParser<'a> {
    fn new(filter: &'a str) -> Self {
        Self {
            input: filter.as_bytes(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Option<FilterNode> {
        let node = self.node()?;
        (self.pos == self.input.len()).then_some(node)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Option<()> {
        (self.peek()? == byte).then(|| self.pos += 1)
    }

    fn node(&mut self) -> Option<FilterNode> {
        self.expect(b'(')?;
        let node = match self.peek()? {
            b'&' => {
                self.pos += 1;
                FilterNode::And(self.children()?)
            }
            b'|' => {
                self.pos += 1;
                FilterNode::Or(self.children()?)
            }
            b'!' => {
                self.pos += 1;
                FilterNode::Not(Box::new(self.node()?))
            }
            _ => self.item()?,
        };
        self.expect(b')')?;
        Some(node)
    }

    fn children(&mut self) -> Option<Vec<FilterNode>> {
        let mut children = Vec::new();
        while self.peek()? == b'(' {
            children.push(self.node()?);
        }
        Some(children)
    }

    fn item(&mut self) -> Option<FilterNode> {
        let start = self.pos;
        while !matches!(self.peek()?, b'(' | b')') {
            self.pos += 1;
        }

        let raw = std::str::from_utf8(&self.input[start..self.pos]).ok()?;
        let (attr, value) = raw.split_once('=')?;
        if attr.is_empty() {
            return None;
        }

        let segments = value
            .split('*')
            .map(|s| unescape(s).map(|s| s.to_lowercase()))
            .collect::<Option<Vec<_>>>()?;

        Some(FilterNode::Item(attr.to_string(), segments))
    }
}

/// Decode `\XX` escapes
fn unescape(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            let hex = std::str::from_utf8(bytes.get(i + 1..i + 3)?).ok()?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}
