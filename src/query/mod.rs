//! URI-driven queries on top of the synchronous bridge.
//!
//! [`query`] takes an RFC 4088 URI, builds a session for it, runs the GET,
//! GETNEXT or walk it names and collects the answers into [`QueryResults`],
//! ordered by OID.
//!
//! # Example
//!
//! ```rust
//! use snmp_sync_bridge::engine::MockEngine;
//! use snmp_sync_bridge::pdu::Response;
//! use snmp_sync_bridge::query::{QueryParams, query};
//! use snmp_sync_bridge::{Bridge, Value, VarBind, oid};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> snmp_sync_bridge::Result<()> {
//! let engine = MockEngine::new();
//! let mock = engine.handle();
//! let bridge = Bridge::spawn(engine);
//!
//! mock.queue_response(Response::ok(vec![
//!     VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 5, 0), Value::from("core-sw1")),
//!     VarBind::new(oid!(1, 3, 6, 1, 2, 1, 1, 1, 0), Value::from("Linux")),
//! ]));
//!
//! let params = QueryParams::new("snmp://public@127.0.0.1//(1.3.6.1.2.1.1.5.0,1.3.6.1.2.1.1.1.0)");
//! let results = query(&bridge, &params).await?;
//!
//! // Ordered by OID, not by arrival.
//! let first = results.iter().next().unwrap();
//! assert_eq!(first.0, &oid!(1, 3, 6, 1, 2, 1, 1, 1, 0));
//! # Ok(())
//! # }
//! ```

mod uri;

pub use uri::{MAX_URI_COUNT, SnmpUri, UriType};

use std::collections::BTreeMap;
use std::time::Duration;

use crate::bridge::Bridge;
use crate::error::{Error, Result};
use crate::label::ErrorStatus;
use crate::oid::Oid;
use crate::session::Session;
use crate::value::Value;
use crate::varbind::{VarBind, VarBindList};
use crate::version::Version;

/// Parameters for [`query`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub uri: String,
    /// SNMP version (default: v2c)
    pub version: Version,
    /// Per-attempt timeout (default: 200ms)
    pub timeout: Duration,
    /// Retries (default: 3)
    pub retries: u32,
    /// GETBULK non-repeaters (default: 1)
    pub non_repeaters: u32,
    /// GETBULK max-repetitions (default: 100)
    pub max_repetitions: u32,
}

impl QueryParams {
    /// Parameters for `uri` with the default settings.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            version: Version::V2c,
            timeout: Duration::from_millis(200),
            retries: 3,
            non_repeaters: 1,
            max_repetitions: 100,
        }
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn non_repeaters(mut self, non_repeaters: u32) -> Self {
        self.non_repeaters = non_repeaters;
        self
    }

    pub fn max_repetitions(mut self, max_repetitions: u32) -> Self {
        self.max_repetitions = max_repetitions;
        self
    }

    /// Build a session for a parsed URI using these settings.
    pub fn session(&self, uri: &SnmpUri) -> Result<Session> {
        let peer = uri.socket_addr()?;
        Ok(Session::builder(peer)
            .version(self.version)
            .community(uri.community.as_bytes())
            .timeout(self.timeout)
            .retries(self.retries)
            .build())
    }
}

/// Query answers ordered by OID.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResults {
    entries: BTreeMap<Oid, Value>,
}

impl QueryResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, oid: &Oid) -> Option<&Value> {
        self.entries.get(oid)
    }

    /// Iterate in OID order.
    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, Oid, Value> {
        self.entries.iter()
    }

    /// Insert one answer, replacing any earlier value for the same OID.
    pub fn insert(&mut self, varbind: VarBind) -> Option<Value> {
        self.entries.insert(varbind.oid, varbind.value)
    }

    /// Move every var-bind of `list` into the results.
    pub fn absorb(&mut self, list: VarBindList) -> usize {
        let count = list.len();
        self.entries
            .extend(list.into_iter().map(|vb| (vb.oid, vb.value)));
        count
    }

    pub fn into_inner(self) -> BTreeMap<Oid, Value> {
        self.entries
    }
}

impl Extend<VarBind> for QueryResults {
    fn extend<I: IntoIterator<Item = VarBind>>(&mut self, iter: I) {
        self.entries
            .extend(iter.into_iter().map(|vb| (vb.oid, vb.value)));
    }
}

impl<'a> IntoIterator for &'a QueryResults {
    type Item = (&'a Oid, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, Oid, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl std::fmt::Display for QueryResults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (oid, value) in &self.entries {
            writeln!(f, "{} = {}", oid, value)?;
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for QueryResults {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(&self.entries)
    }
}

/// Run the query a URI describes and return its answers.
pub async fn query(bridge: &Bridge, params: &QueryParams) -> Result<QueryResults> {
    let mut results = QueryResults::new();
    query_into(bridge, params, &mut results).await?;
    Ok(results)
}

/// Run the query a URI describes, merging answers into `results`.
///
/// Responses with a non-zero error status are logged and their var-binds
/// still merged. Timeouts and send failures are returned.
pub async fn query_into(
    bridge: &Bridge,
    params: &QueryParams,
    results: &mut QueryResults,
) -> Result<()> {
    let uri = SnmpUri::parse(&params.uri)?;
    let session = params.session(&uri)?;

    tracing::debug!(
        snmp.target = %session.peer(),
        snmp.oids = uri.oids.len(),
        uri_type = %uri.uri_type,
        "starting query"
    );

    let converted = match uri.uri_type {
        UriType::Get => keep_results(results, bridge.sync_get(&session, &uri.oids).await)?,
        UriType::Next => keep_results(results, bridge.sync_get_next(&session, &uri.oids).await)?,
        UriType::Walk => {
            let mut converted = 0;
            for root in &uri.oids {
                let subtree = match params.version {
                    Version::V1 => walk(bridge, &session, root).await?,
                    _ => bulk_walk(bridge, &session, root, params.max_repetitions).await?,
                };
                converted += subtree.len();
                results.extend(subtree);
            }
            converted
        }
    };

    tracing::debug!(snmp.target = %session.peer(), converted, "query finished");
    Ok(())
}

/// Issue one GETBULK for the URI's OIDs using the params' bulk settings.
pub async fn query_bulk(bridge: &Bridge, params: &QueryParams) -> Result<QueryResults> {
    let uri = SnmpUri::parse(&params.uri)?;
    let session = params.session(&uri)?;
    let mut results = QueryResults::new();
    keep_results(
        &mut results,
        bridge
            .sync_get_bulk(
                &session,
                &uri.oids,
                params.non_repeaters,
                params.max_repetitions,
            )
            .await,
    )?;
    Ok(results)
}

/// GET any number of OIDs in batches of [`MAX_URI_COUNT`].
pub async fn get_many(bridge: &Bridge, session: &Session, oids: &[Oid]) -> Result<QueryResults> {
    let mut results = QueryResults::new();
    let mut batch = Vec::with_capacity(MAX_URI_COUNT.min(oids.len()));

    for (position, oid) in oids.iter().enumerate() {
        batch.push(oid.clone());
        if is_partition_end(position, MAX_URI_COUNT, oids.len()) {
            keep_results(&mut results, bridge.sync_get(session, &batch).await)?;
            batch.clear();
        }
    }
    Ok(results)
}

/// Whether `position` is the last index of a batch when a list of `len`
/// items is cut into batches of `size`. The final batch may be short.
///
/// ```
/// use snmp_sync_bridge::query::is_partition_end;
///
/// let ends: Vec<usize> = (0..8).filter(|&i| is_partition_end(i, 3, 8)).collect();
/// assert_eq!(ends, [2, 5, 7]);
/// ```
pub fn is_partition_end(position: usize, size: usize, len: usize) -> bool {
    if position >= len {
        return false;
    }
    size <= 1 || position % size == size - 1 || position == len - 1
}

/// Walk a subtree with GETNEXT.
///
/// Stops at `endOfMibView`, at the first OID outside `root`, or at a
/// `noSuchName` error (how SNMPv1 agents report the end of the MIB).
pub async fn walk(bridge: &Bridge, session: &Session, root: &Oid) -> Result<Vec<VarBind>> {
    let mut out: Vec<VarBind> = Vec::new();
    let mut current = root.clone();

    loop {
        let list = match next_page(bridge.sync_get_next(session, std::slice::from_ref(&current)).await)? {
            Some(list) => list,
            None => break,
        };
        let Some(vb) = list.into_iter().next() else {
            break;
        };
        match step(root, out.last().map(|last| &last.oid), vb)? {
            Some(vb) => {
                current = vb.oid.clone();
                out.push(vb);
            }
            None => break,
        }
    }

    tracing::trace!(snmp.target = %session.peer(), snmp.oid = %root, count = out.len(), "walk finished");
    Ok(out)
}

/// Walk a subtree with GETBULK.
pub async fn bulk_walk(
    bridge: &Bridge,
    session: &Session,
    root: &Oid,
    max_repetitions: u32,
) -> Result<Vec<VarBind>> {
    let mut out: Vec<VarBind> = Vec::new();
    let mut current = root.clone();

    'pages: loop {
        let page = bridge
            .sync_get_bulk(session, std::slice::from_ref(&current), 0, max_repetitions)
            .await;
        let list = match next_page(page)? {
            Some(list) if !list.is_empty() => list,
            _ => break,
        };
        for vb in list {
            match step(root, out.last().map(|last| &last.oid), vb)? {
                Some(vb) => out.push(vb),
                None => break 'pages,
            }
        }
        match out.last() {
            Some(last) => current = last.oid.clone(),
            None => break,
        }
    }

    tracing::trace!(snmp.target = %session.peer(), snmp.oid = %root, count = out.len(), "bulk walk finished");
    Ok(out)
}

/// Check one walk result; `None` ends the walk.
fn step(root: &Oid, previous: Option<&Oid>, vb: VarBind) -> Result<Option<VarBind>> {
    if matches!(vb.value, Value::EndOfMibView) || !vb.oid.starts_with(root) {
        return Ok(None);
    }
    // Non-conformant agents could otherwise loop forever.
    if let Some(previous) = previous
        && vb.oid <= *previous
    {
        return Err(Error::NonIncreasingOid {
            previous: previous.clone(),
            current: vb.oid,
        });
    }
    Ok(Some(vb))
}

/// A walk page, or `None` when an SNMPv1 agent signals the end with noSuchName.
fn next_page(outcome: Result<VarBindList>) -> Result<Option<VarBindList>> {
    match outcome {
        Ok(list) => Ok(Some(list)),
        Err(Error::Snmp {
            status: ErrorStatus::NoSuchName,
            varbinds,
            ..
        }) => {
            varbinds.release();
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Merge a GET-style outcome, keeping var-binds from error responses.
fn keep_results(results: &mut QueryResults, outcome: Result<VarBindList>) -> Result<usize> {
    match outcome {
        Ok(list) => Ok(results.absorb(list)),
        Err(Error::Snmp {
            target,
            label,
            index,
            varbinds,
            ..
        }) => {
            tracing::warn!(
                snmp.target = ?target,
                snmp.error_index = index,
                error = label,
                "response carried error status, keeping varbinds"
            );
            Ok(results.absorb(varbinds))
        }
        Err(e) => Err(e),
    }
}
