//! SNMP URIs (RFC 4088).
//!
//! ```text
//! snmp://[community@]host[:port]/[context]/oid
//! snmp://[community@]host[:port]/[context]/(oid,oid,...)
//! ```
//!
//! A trailing `*` asks for a walk of each OID, a trailing `+` for a GETNEXT;
//! anything else is a GET.

use std::net::{SocketAddr, ToSocketAddrs};

use crate::error::{Error, Result};
use crate::oid::Oid;

/// Maximum number of OIDs a single URI may name.
pub const MAX_URI_COUNT: usize = 50;

const SCHEME: &str = "snmp://";
const DEFAULT_COMMUNITY: &str = "public";
const DEFAULT_PORT: u16 = 161;

/// Operation selected by a URI's suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UriType {
    #[default]
    Get,
    Next,
    Walk,
}

impl std::fmt::Display for UriType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UriType::Get => write!(f, "GET"),
            UriType::Next => write!(f, "NEXT"),
            UriType::Walk => write!(f, "WALK"),
        }
    }
}

/// A parsed SNMP URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnmpUri {
    pub community: String,
    /// Host name or address literal, without IPv6 brackets.
    pub host: String,
    pub port: u16,
    pub context: Option<String>,
    pub oids: Vec<Oid>,
    pub uri_type: UriType,
}

impl SnmpUri {
    /// Parse a URI.
    ///
    /// ```
    /// use snmp_sync_bridge::query::{SnmpUri, UriType};
    ///
    /// let uri = SnmpUri::parse("snmp://public@192.168.1.10//(1.3.6.1.2.1.1.1.0,1.3.6.1.2.1.1.2.0)").unwrap();
    /// assert_eq!(uri.port, 161);
    /// assert_eq!(uri.oids.len(), 2);
    /// assert_eq!(uri.uri_type, UriType::Get);
    /// ```
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = strip_scheme(uri).ok_or_else(|| Error::invalid_uri(uri, "missing snmp:// scheme"))?;

        let (authority, path) = match rest.find('/') {
            Some(pos) => (&rest[..pos], &rest[pos + 1..]),
            None => (rest, ""),
        };

        let (community, hostport) = match authority.rsplit_once('@') {
            Some((community, hostport)) => (community, hostport),
            None => (DEFAULT_COMMUNITY, authority),
        };
        // Community parameters (";...") are not used by v1/v2c.
        let community = community.split(';').next().unwrap_or_default();
        let (host, port) = split_host_port(uri, hostport)?;

        let (context, oid_path) = match path.split_once('/') {
            Some((context, oids)) => (Some(context), oids),
            None => (None, path),
        };
        let context = context
            .map(|c| c.split(';').next().unwrap_or_default())
            .filter(|c| !c.is_empty())
            .map(str::to_owned);

        let (oids, uri_type) = parse_oid_path(uri, oid_path)?;

        Ok(Self {
            community: community.to_owned(),
            host: host.to_owned(),
            port,
            context,
            oids,
            uri_type,
        })
    }

    /// Resolve the host and port to a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|source| Error::Resolve {
                host: self.host.as_str().into(),
                source,
            })?
            .next()
            .ok_or_else(|| Error::Resolve {
                host: self.host.as_str().into(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "could not resolve address",
                ),
            })
    }
}

impl std::str::FromStr for SnmpUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn strip_scheme(uri: &str) -> Option<&str> {
    let head = uri.get(..SCHEME.len())?;
    head.eq_ignore_ascii_case(SCHEME).then(|| &uri[SCHEME.len()..])
}

fn split_host_port<'a>(uri: &str, hostport: &'a str) -> Result<(&'a str, u16)> {
    let (host, port) = if let Some(bracketed) = hostport.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or_else(|| Error::invalid_uri(uri, "unterminated IPv6 address"))?;
        match after {
            "" => (host, None),
            _ => match after.strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None => return Err(Error::invalid_uri(uri, "unexpected text after IPv6 address")),
            },
        }
    } else {
        match hostport.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (hostport, None),
        }
    };

    if host.is_empty() {
        return Err(Error::invalid_uri(uri, "missing host"));
    }

    let port = match port {
        None | Some("") => DEFAULT_PORT,
        Some(port) => port
            .parse()
            .map_err(|_| Error::invalid_uri(uri, "invalid port"))?,
    };
    Ok((host, port))
}

fn parse_oid_path(uri: &str, path: &str) -> Result<(Vec<Oid>, UriType)> {
    let path = path.trim();
    if path.is_empty() {
        return Err(Error::invalid_uri(uri, "missing OID"));
    }

    let uri_type = suffix_type(path);

    let list = match path.strip_prefix('(') {
        Some(inner) => {
            let inner = inner.trim_end_matches(['*', '+']);
            inner
                .strip_suffix(')')
                .ok_or_else(|| Error::invalid_uri(uri, "unbalanced parentheses in OID list"))?
        }
        None => path,
    };

    let items: Vec<&str> = list.split(',').collect();
    if items.len() > MAX_URI_COUNT {
        return Err(Error::TooManyOids {
            count: items.len(),
            max: MAX_URI_COUNT,
        });
    }

    let oids = items
        .into_iter()
        .map(|item| {
            let item = item.trim().trim_end_matches(['*', '+']);
            if item.is_empty() {
                return Err(Error::invalid_uri(uri, "empty OID in list"));
            }
            Oid::parse(item)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((oids, uri_type))
}

/// Operation named by the last character, looking inside a closing paren.
fn suffix_type(path: &str) -> UriType {
    let mut tail = path.chars().rev();
    let last = match tail.next() {
        Some(')') => tail.next(),
        other => other,
    };
    match last {
        Some('*') => UriType::Walk,
        Some('+') => UriType::Next,
        _ => UriType::Get,
    }
}
