//! Match pattern value
//!
//! A pattern is parsed once, validated, and stored in normalized form:
//! - scheme lowercased, `*` allowed
//! - host lowercased and converted to the ASCII form `Url` uses (punycode,
//!   canonical IP literals), `*` alone or as a `*.` prefix
//! - path starting with `/` and percent-encoded like a URL path, a missing
//!   path meaning `/*`
//!
//! Equality, hashing and ordering use the normalized string only.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use url::{Host, Url};

use crate::error::PatternError;
use crate::glob::{collapse_wildcards, glob_match};
use crate::options::MatchOptions;
use crate::scheme::is_supported_scheme;
use crate::Result;

/// Normalized string of the pattern that matches every URL
pub const ALL_URLS: &str = "<all_urls>";

const WILDCARD: &str = "*";
const SUBDOMAIN_PREFIX: &str = "*.";
const ALL_PATHS: &str = "/*";

#[derive(Debug, Clone)]
struct Parts {
    scheme: String,
    host: String,
    path: String,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MatchPattern {
    /// Normalized string form
    string: String,
    /// `None` for the universal pattern
    parts: Option<Parts>,
}

impl MatchPattern {
    /// Parse a pattern string such as `https://*.example.com/*`
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.trim();

        if source == ALL_URLS {
            return Ok(Self::all_urls());
        }

        let (scheme, rest) = source
            .split_once("://")
            .ok_or_else(|| PatternError::InvalidScheme(source.to_string()))?;

        let (host, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], Some(&rest[idx..])),
            None => (rest, None),
        };

        Self::from_components(scheme, host, path)
    }

    /// Build a pattern from its three components.
    ///
    /// An empty `path` is treated as absent and matches every path.
    pub fn from_parts(scheme: &str, host: &str, path: &str) -> Result<Self> {
        let path = if path.is_empty() { None } else { Some(path) };
        Self::from_components(scheme, host, path)
    }

    /// The pattern matching every URL
    pub fn all_urls() -> Self {
        Self {
            string: ALL_URLS.to_string(),
            parts: None,
        }
    }

    /// `scheme://host/*` for the URL's origin
    pub fn for_url_origin(url: &Url) -> Result<Self> {
        let host = url.host_str().unwrap_or("");
        Self::from_components(url.scheme(), host, None)
    }

    fn from_components(scheme: &str, host: &str, path: Option<&str>) -> Result<Self> {
        let scheme = normalize_scheme(scheme)?;
        let host = normalize_host(&scheme, host)?;
        let path = normalize_path(path)?;

        if scheme == WILDCARD && host == WILDCARD && path == ALL_PATHS {
            return Ok(Self::all_urls());
        }

        Ok(Self {
            string: format!("{}://{}{}", scheme, host, path),
            parts: Some(Parts { scheme, host, path }),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.string
    }

    pub fn scheme(&self) -> Option<&str> {
        self.parts.as_ref().map(|p| p.scheme.as_str())
    }

    pub fn host(&self) -> Option<&str> {
        self.parts.as_ref().map(|p| p.host.as_str())
    }

    pub fn path(&self) -> Option<&str> {
        self.parts.as_ref().map(|p| p.path.as_str())
    }

    pub fn matches_all_urls(&self) -> bool {
        self.parts.is_none()
    }

    pub fn matches_all_hosts(&self) -> bool {
        match &self.parts {
            None => true,
            Some(parts) => parts.host == WILDCARD,
        }
    }

    /// Check whether a URL falls inside this pattern.
    ///
    /// `match_bidirectionally` has no meaning for URLs and is ignored.
    pub fn matches_url(&self, url: &Url, options: MatchOptions) -> bool {
        let parts = match &self.parts {
            None => return true,
            Some(parts) => parts,
        };

        if !options.ignore_schemes && !scheme_matches(&parts.scheme, url.scheme()) {
            return false;
        }

        let url_host = url.host_str().unwrap_or("").to_ascii_lowercase();
        if url_host.is_empty() {
            // Only host-less file patterns accept host-less URLs
            if !parts.host.is_empty() {
                return false;
            }
        } else if !host_matches(&parts.host, &url_host) {
            return false;
        }

        if options.ignore_paths {
            return true;
        }

        match url.query() {
            Some(query) => glob_match(&parts.path, &format!("{}?{}", url.path(), query)),
            None => glob_match(&parts.path, url.path()),
        }
    }

    /// Same as [`matches_url`](Self::matches_url) for an unparsed URL.
    /// Input that does not parse as an absolute URL never matches.
    pub fn matches_url_str(&self, url: &str, options: MatchOptions) -> bool {
        match Url::parse(url) {
            Ok(url) => self.matches_url(&url, options),
            Err(_) => false,
        }
    }

    /// Check whether this pattern contains `other`.
    ///
    /// With `match_bidirectionally` set, succeeds when either pattern contains
    /// the other.
    pub fn matches_pattern(&self, other: &MatchPattern, options: MatchOptions) -> bool {
        if options.match_bidirectionally {
            let one_way = options.one_way();
            return self.matches_pattern(other, one_way) || other.matches_pattern(self, one_way);
        }

        let (mine, theirs) = match (&self.parts, &other.parts) {
            (None, _) => return true,
            (Some(_), None) => return false,
            (Some(mine), Some(theirs)) => (mine, theirs),
        };

        if !options.ignore_schemes && !scheme_matches(&mine.scheme, &theirs.scheme) {
            return false;
        }

        if !host_contains(&mine.host, &theirs.host) {
            return false;
        }

        options.ignore_paths || glob_match(&mine.path, &theirs.path)
    }
}

fn normalize_scheme(scheme: &str) -> Result<String> {
    let scheme = scheme.to_ascii_lowercase();
    if scheme == WILDCARD || is_supported_scheme(&scheme) {
        Ok(scheme)
    } else {
        Err(PatternError::InvalidScheme(scheme))
    }
}

fn normalize_host(scheme: &str, host: &str) -> Result<String> {
    let host = host.to_ascii_lowercase();

    if host.is_empty() {
        return if scheme == "file" {
            Ok(host)
        } else {
            Err(PatternError::InvalidHost(host))
        };
    }

    if host == WILDCARD {
        return Ok(host);
    }

    let (literal, wildcard_prefix) = match host.strip_prefix(SUBDOMAIN_PREFIX) {
        Some(rest) => (rest, true),
        None => (host.as_str(), false),
    };

    if literal.is_empty() || literal.contains('*') {
        return Err(PatternError::InvalidHost(host));
    }

    if literal.starts_with('[') {
        return match Host::parse(literal) {
            Ok(Host::Ipv6(addr)) if !wildcard_prefix => Ok(format!("[{}]", addr)),
            _ => Err(PatternError::InvalidHost(host)),
        };
    }

    let forbidden = |c: char| c.is_whitespace() || matches!(c, ':' | '?' | '#' | '@' | '\\' | '/');
    if literal.contains(forbidden) || literal.starts_with('.') {
        return Err(PatternError::InvalidHost(host));
    }

    // Same ASCII form `Url` gives the host (IDNA, IPv4 canonicalization)
    let ascii = match Host::parse(literal) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => return Err(PatternError::InvalidHost(host)),
    };

    Ok(if wildcard_prefix {
        format!("{}{}", SUBDOMAIN_PREFIX, ascii)
    } else {
        ascii
    })
}

fn normalize_path(path: Option<&str>) -> Result<String> {
    match path {
        None => Ok(ALL_PATHS.to_string()),
        Some(path) if path.starts_with('/') => Ok(collapse_wildcards(&encode_path(path)?)),
        Some(path) => Err(PatternError::InvalidPath(path.to_string())),
    }
}

/// Percent-encode a pattern path (and `?query`) the way `Url` encodes URLs.
/// `*` is left alone by both encode sets.
fn encode_path(path: &str) -> Result<String> {
    let invalid = || PatternError::InvalidPath(path.to_string());
    let mut encoder = Url::parse("http://pattern.invalid/").map_err(|_| invalid())?;

    let (path_part, query) = match path.split_once('?') {
        Some((path_part, query)) => (path_part, Some(query)),
        None => (path, None),
    };
    encoder.set_path(path_part);
    encoder.set_query(query);

    Ok(match encoder.query() {
        Some(query) => format!("{}?{}", encoder.path(), query),
        None => encoder.path().to_string(),
    })
}

fn scheme_matches(pattern_scheme: &str, scheme: &str) -> bool {
    pattern_scheme == WILDCARD || pattern_scheme.eq_ignore_ascii_case(scheme)
}

/// `host` is a non-empty concrete host
fn host_matches(pattern_host: &str, host: &str) -> bool {
    if pattern_host == WILDCARD {
        return true;
    }

    match pattern_host.strip_prefix(SUBDOMAIN_PREFIX) {
        Some(domain) => is_same_or_subdomain(host, domain),
        None => pattern_host == host,
    }
}

/// Host containment between two pattern hosts, either of which may be a wildcard
fn host_contains(mine: &str, theirs: &str) -> bool {
    if mine == WILDCARD {
        return true;
    }
    if theirs == WILDCARD {
        return false;
    }

    match mine.strip_prefix(SUBDOMAIN_PREFIX) {
        Some(domain) => {
            let theirs = theirs.strip_prefix(SUBDOMAIN_PREFIX).unwrap_or(theirs);
            is_same_or_subdomain(theirs, domain)
        }
        None => mine == theirs,
    }
}

fn is_same_or_subdomain(host: &str, domain: &str) -> bool {
    if host == domain {
        return true;
    }

    host.len() > domain.len()
        && host.ends_with(domain)
        && host.as_bytes()[host.len() - domain.len() - 1] == b'.'
}

impl PartialEq for MatchPattern {
    fn eq(&self, other: &Self) -> bool {
        self.string == other.string
    }
}

impl Eq for MatchPattern {}

impl Hash for MatchPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.string.hash(state);
    }
}

impl PartialOrd for MatchPattern {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MatchPattern {
    fn cmp(&self, other: &Self) -> Ordering {
        self.string.cmp(&other.string)
    }
}

impl fmt::Debug for MatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MatchPattern").field(&self.string).finish()
    }
}

impl fmt::Display for MatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string)
    }
}

impl FromStr for MatchPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MatchPattern {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<MatchPattern> for String {
    fn from(pattern: MatchPattern) -> Self {
        pattern.string
    }
}
