//! Sessions and their callback slots.
//!
//! A [`Session`] describes one logical peer: where requests go, which
//! community and version they carry, and how long the engine waits before
//! giving up. It also holds the two callback slots the dispatch loop fires
//! when a request resolves. The slots are filled by the bridge for the
//! duration of one call and are empty whenever the session is idle.
//!
//! # Example
//!
//! ```rust
//! use snmp_sync_bridge::{Session, Version};
//! use std::time::Duration;
//!
//! let session = Session::builder("192.0.2.10:161".parse().unwrap())
//!     .version(Version::V1)
//!     .community(b"private")
//!     .timeout(Duration::from_millis(500))
//!     .retries(2)
//!     .build();
//!
//! assert!(!session.is_busy());
//! assert_eq!(session.retries(), 2);
//! ```

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::pdu::Response;
use crate::varbind::release_varbind_list;
use crate::version::Version;

/// Completion callback: receives the decoded response.
pub type DoneCallback = Box<dyn FnOnce(Response) + Send>;

/// Timeout callback: fired when the engine gives up on the request.
pub type TimeoutCallback = Box<dyn FnOnce() + Send>;

/// Security parameters carried by every request on a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityParams {
    pub version: Version,
    pub community: Bytes,
}

impl Default for SecurityParams {
    fn default() -> Self {
        Self {
            version: Version::V2c,
            community: Bytes::from_static(b"public"),
        }
    }
}

/// Session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub security: SecurityParams,
    /// How long the engine waits for a response per attempt (default: 5s)
    pub timeout: Duration,
    /// Retransmissions before the engine reports a timeout (default: 3)
    pub retries: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            security: SecurityParams::default(),
            timeout: Duration::from_secs(5),
            retries: 3,
        }
    }
}

/// Snapshot of a session's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Synchronous calls that got as far as installing callbacks.
    pub calls: u64,
    /// Outcomes that arrived after the waiting caller had gone away.
    pub late_outcomes: u64,
    /// Engine events whose call no longer owned the callback slots.
    pub ignored_events: u64,
}

#[derive(Debug, Default)]
pub(crate) struct SessionCounters {
    calls: AtomicU64,
    late_outcomes: AtomicU64,
    ignored_events: AtomicU64,
}

impl SessionCounters {
    pub(crate) fn record_late_outcome(&self) {
        self.late_outcomes.fetch_add(1, Ordering::Relaxed);
    }
}

/// Identifies the call that installed a session's callbacks.
///
/// Requests carry the id of the call they were sent for, so an outcome only
/// fires callbacks installed by that same call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CallId(u64);

#[derive(Default)]
struct CallbackSlots {
    done: Option<DoneCallback>,
    timeout: Option<TimeoutCallback>,
    call: Option<CallId>,
}

impl CallbackSlots {
    fn is_empty(&self) -> bool {
        self.done.is_none() && self.timeout.is_none()
    }
}

struct SessionInner {
    peer: SocketAddr,
    config: SessionConfig,
    slots: Mutex<CallbackSlots>,
    counters: Arc<SessionCounters>,
}

/// One logical SNMP peer.
///
/// Cheap to clone; clones share the same callback slots.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Create a session with the given configuration.
    pub fn new(peer: SocketAddr, config: SessionConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                peer,
                config,
                slots: Mutex::new(CallbackSlots::default()),
                counters: Arc::new(SessionCounters::default()),
            }),
        }
    }

    /// Create a builder for a session to `peer`.
    pub fn builder(peer: SocketAddr) -> SessionBuilder {
        SessionBuilder::new(peer)
    }

    /// The peer address requests are sent to.
    pub fn peer(&self) -> SocketAddr {
        self.inner.peer
    }

    pub fn security(&self) -> &SecurityParams {
        &self.inner.config.security
    }

    pub fn version(&self) -> Version {
        self.inner.config.security.version
    }

    pub fn timeout(&self) -> Duration {
        self.inner.config.timeout
    }

    pub fn retries(&self) -> u32 {
        self.inner.config.retries
    }

    /// Whether a synchronous call currently owns the callback slots.
    pub fn is_busy(&self) -> bool {
        !self.slots().is_empty()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> SessionStats {
        let c = &self.inner.counters;
        SessionStats {
            calls: c.calls.load(Ordering::Relaxed),
            late_outcomes: c.late_outcomes.load(Ordering::Relaxed),
            ignored_events: c.ignored_events.load(Ordering::Relaxed),
        }
    }

    /// Fire the completion callback of `call` with `response`.
    ///
    /// Empties both slots. Returns `false` when `call` no longer owns the
    /// slots; the response's var-binds are released in that case.
    pub(crate) fn fire_done(&self, call: Option<CallId>, response: Response) -> bool {
        match self.take_for(call).and_then(|slots| slots.done) {
            Some(done) => {
                tracing::trace!(
                    snmp.target = %self.inner.peer,
                    snmp.error_status = response.error_status,
                    snmp.varbinds = response.varbinds.len(),
                    "session done callback"
                );
                done(response);
                true
            }
            None => {
                self.inner
                    .counters
                    .ignored_events
                    .fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    snmp.target = %self.inner.peer,
                    "completion for a call that no longer owns the session, releasing varbinds"
                );
                release_varbind_list(response.varbinds);
                false
            }
        }
    }

    /// Fire the timeout callback of `call`.
    ///
    /// Empties both slots. Returns `false` when `call` no longer owns the
    /// slots.
    pub(crate) fn fire_timeout(&self, call: Option<CallId>) -> bool {
        match self.take_for(call).and_then(|slots| slots.timeout) {
            Some(timeout) => {
                tracing::trace!(snmp.target = %self.inner.peer, "session timeout callback");
                timeout();
                true
            }
            None => {
                self.inner
                    .counters
                    .ignored_events
                    .fetch_add(1, Ordering::Relaxed);
                tracing::debug!(
                    snmp.target = %self.inner.peer,
                    "timeout for a call that no longer owns the session"
                );
                false
            }
        }
    }

    /// Install both callbacks for one call.
    ///
    /// Fails with [`Error::SessionBusy`] when another call still owns the slots.
    /// [`Bridge::sync_send`](crate::Bridge::sync_send) does this itself; only
    /// callers driving [`Bridge::async_send`](crate::Bridge::async_send)
    /// directly need it.
    pub fn install_callbacks(
        &self,
        done: DoneCallback,
        timeout: TimeoutCallback,
    ) -> Result<()> {
        self.install(done, timeout).map(|_| ())
    }

    pub(crate) fn install(&self, done: DoneCallback, timeout: TimeoutCallback) -> Result<CallId> {
        let mut slots = self.slots();
        if !slots.is_empty() {
            return Err(Error::SessionBusy {
                target: self.inner.peer,
            });
        }
        let call = CallId(self.inner.counters.calls.fetch_add(1, Ordering::Relaxed) + 1);
        slots.done = Some(done);
        slots.timeout = Some(timeout);
        slots.call = Some(call);
        Ok(call)
    }

    /// Return the slots to idle without firing anything.
    pub fn clear_callbacks(&self) {
        // Dropped outside the lock: dropping a callback drops its resume handle.
        let slots = std::mem::take(&mut *self.slots());
        drop(slots);
    }

    /// Like [`clear_callbacks`](Self::clear_callbacks), but only while `call`
    /// still owns the slots.
    pub(crate) fn clear_callbacks_for(&self, call: Option<CallId>) {
        drop(self.take_for(call));
    }

    /// The call that currently owns the slots, if any.
    pub(crate) fn current_call(&self) -> Option<CallId> {
        self.slots().call
    }

    pub(crate) fn counters(&self) -> Arc<SessionCounters> {
        self.inner.counters.clone()
    }

    fn take_for(&self, call: Option<CallId>) -> Option<CallbackSlots> {
        let mut slots = self.slots();
        match call {
            Some(call) if slots.call == Some(call) => Some(std::mem::take(&mut *slots)),
            _ => None,
        }
    }

    fn slots(&self) -> MutexGuard<'_, CallbackSlots> {
        self.inner
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("peer", &self.inner.peer)
            .field("version", &self.inner.config.security.version)
            .field("timeout", &self.inner.config.timeout)
            .field("retries", &self.inner.config.retries)
            .field("busy", &self.is_busy())
            .finish()
    }
}

/// Builder for [`Session`].
pub struct SessionBuilder {
    peer: SocketAddr,
    config: SessionConfig,
}

impl SessionBuilder {
    /// Create a new builder with default settings.
    pub fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            config: SessionConfig::default(),
        }
    }

    /// Set the SNMP version (default: v2c).
    pub fn version(mut self, version: Version) -> Self {
        self.config.security.version = version;
        self
    }

    /// Set the community string (default: `public`).
    pub fn community(mut self, community: impl AsRef<[u8]>) -> Self {
        self.config.security.community = Bytes::copy_from_slice(community.as_ref());
        self
    }

    /// Set the per-attempt timeout (default: 5s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the number of retries (default: 3).
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    /// Build the session.
    pub fn build(self) -> Session {
        Session::new(self.peer, self.config)
    }
}
