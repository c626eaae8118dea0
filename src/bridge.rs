//! Synchronous request bridge.
//!
//! [`Bridge::sync_send`] turns the callback-driven engine into a single call
//! that returns once exactly one outcome is known: the response var-binds, a
//! protocol error, a timeout or a send failure.
//!
//! # Example
//!
//! ```rust
//! use snmp_sync_bridge::engine::MockEngine;
//! use snmp_sync_bridge::pdu::Response;
//! use snmp_sync_bridge::{Bridge, Session, Value, VarBind, oid};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> snmp_sync_bridge::Result<()> {
//! let engine = MockEngine::new();
//! let mock = engine.handle();
//! let bridge = Bridge::spawn(engine);
//!
//! let sys_descr = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
//! mock.queue_response(Response::ok(vec![VarBind::new(
//!     sys_descr.clone(),
//!     Value::from("router"),
//! )]));
//!
//! let session = Session::builder("192.0.2.1:161".parse().unwrap()).build();
//! let varbinds = bridge.sync_get(&session, &[sys_descr]).await?;
//! assert_eq!(varbinds[0].value, Value::from("router"));
//! varbinds.release();
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::dispatch::{self, Command, resolve_ack};
use crate::engine::{DispatchArgs, Engine};
use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::pdu::{PduType, Response};
use crate::session::{CallId, Session, SessionCounters};
use crate::varbind::{VarBind, VarBindList, release_varbind_list};

const DEFAULT_THREAD_NAME: &str = "snmp-dispatch";

/// Which callback resumed the waiting call.
#[derive(Debug)]
enum Fired {
    Done(Response),
    TimedOut,
}

/// Single-use resume handle shared by a call's two callbacks.
///
/// Whichever callback runs first consumes the sender; the other becomes a
/// no-op.
#[derive(Clone)]
struct Resume {
    sender: Arc<Mutex<Option<oneshot::Sender<Fired>>>>,
    counters: Arc<SessionCounters>,
}

impl Resume {
    fn new(session: &Session) -> (Self, oneshot::Receiver<Fired>) {
        let (tx, rx) = oneshot::channel();
        let resume = Self {
            sender: Arc::new(Mutex::new(Some(tx))),
            counters: session.counters(),
        };
        (resume, rx)
    }

    fn resume(&self, fired: Fired) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        let unclaimed = match sender {
            Some(sender) => match sender.send(fired) {
                Ok(()) => return,
                Err(fired) => {
                    self.counters.record_late_outcome();
                    tracing::debug!("caller no longer waiting, dropping outcome");
                    fired
                }
            },
            None => {
                tracing::debug!("call already resumed, ignoring second outcome");
                fired
            }
        };

        if let Fired::Done(response) = unclaimed {
            release_varbind_list(response.varbinds);
        }
    }

    fn install(self, session: &Session) -> Result<CallId> {
        let on_timeout = self.clone();
        session.install(
            Box::new(move |response| self.resume(Fired::Done(response))),
            Box::new(move || on_timeout.resume(Fired::TimedOut)),
        )
    }
}

/// Handle to a running dispatch loop.
///
/// Cheap to clone. The loop stops once every clone is dropped.
#[derive(Clone)]
pub struct Bridge {
    pub(crate) commands: mpsc::UnboundedSender<Command>,
}

impl Bridge {
    /// Run the dispatch loop for `engine` on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<E: Engine>(engine: E) -> Self {
        Self::builder().spawn(engine)
    }

    /// Run the dispatch loop for `engine` on its own thread.
    ///
    /// Use this from hosts that have no tokio runtime of their own, together
    /// with [`sync_send_blocking`](Self::sync_send_blocking).
    pub fn spawn_dedicated<E: Engine>(engine: E) -> Result<Self> {
        Self::builder().spawn_dedicated(engine)
    }

    /// Create a builder for a bridge.
    pub fn builder() -> BridgeBuilder {
        BridgeBuilder::new()
    }

    /// Whether the dispatch loop has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Send one PDU and wait until exactly one outcome is known.
    ///
    /// Installs a completion and a timeout callback on `session` for the
    /// duration of the call. Returns:
    ///
    /// - `Ok(list)` when the response carries error status 0
    /// - [`Error::Snmp`] with the translated label and the response
    ///   var-binds when the status is non-zero
    /// - [`Error::Timeout`] when the engine gives up
    /// - [`Error::Send`] when the engine never queued the PDU
    /// - [`Error::SessionBusy`] when another call is in flight on `session`
    ///
    /// The session is idle again when this returns. If the returned future
    /// is dropped early, the session stays busy until the engine resolves the
    /// request; the late outcome is then discarded and counted in
    /// [`SessionStats::late_outcomes`](crate::session::SessionStats).
    pub async fn sync_send(
        &self,
        session: &Session,
        pdu_type: PduType,
        varbinds: &[VarBind],
        arg1: u32,
        arg2: u32,
    ) -> Result<VarBindList> {
        dispatch::validate(pdu_type, varbinds).map_err(|e| Error::send(Some(session.peer()), e))?;

        let (resume, outcome) = Resume::new(session);
        let call = resume.install(session)?;

        let started = tokio::time::Instant::now();
        let args = DispatchArgs::new(arg1, arg2);
        let ack = match self.submit(session, Some(call), pdu_type, varbinds, args) {
            Ok(ack) => ack,
            Err(e) => {
                session.clear_callbacks_for(Some(call));
                return Err(e);
            }
        };
        let pending = resolve_ack(session, ack.await)?;

        tracing::trace!(
            snmp.target = %pending.target(),
            snmp.handle = pending.handle().id(),
            "waiting for outcome"
        );
        finish(session, outcome.await, started.elapsed())
    }

    /// Blocking form of [`sync_send`](Self::sync_send) for plain threads.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn sync_send_blocking(
        &self,
        session: &Session,
        pdu_type: PduType,
        varbinds: &[VarBind],
        arg1: u32,
        arg2: u32,
    ) -> Result<VarBindList> {
        dispatch::validate(pdu_type, varbinds).map_err(|e| Error::send(Some(session.peer()), e))?;

        let (resume, outcome) = Resume::new(session);
        let call = resume.install(session)?;

        let started = std::time::Instant::now();
        let args = DispatchArgs::new(arg1, arg2);
        let ack = match self.submit(session, Some(call), pdu_type, varbinds, args) {
            Ok(ack) => ack,
            Err(e) => {
                session.clear_callbacks_for(Some(call));
                return Err(e);
            }
        };
        resolve_ack(session, ack.blocking_recv())?;
        finish(session, outcome.blocking_recv(), started.elapsed())
    }

    /// GET the given OIDs.
    pub async fn sync_get(&self, session: &Session, oids: &[Oid]) -> Result<VarBindList> {
        let varbinds = null_varbinds(oids);
        self.sync_send(session, PduType::GetRequest, &varbinds, 0, 0)
            .await
    }

    /// GETNEXT the given OIDs.
    pub async fn sync_get_next(&self, session: &Session, oids: &[Oid]) -> Result<VarBindList> {
        let varbinds = null_varbinds(oids);
        self.sync_send(session, PduType::GetNextRequest, &varbinds, 0, 0)
            .await
    }

    /// SET the given var-binds.
    pub async fn sync_set(&self, session: &Session, varbinds: &[VarBind]) -> Result<VarBindList> {
        self.sync_send(session, PduType::SetRequest, varbinds, 0, 0)
            .await
    }

    /// GETBULK the given OIDs.
    ///
    /// `non_repeaters` and `max_repetitions` travel as `arg1` and `arg2`.
    pub async fn sync_get_bulk(
        &self,
        session: &Session,
        oids: &[Oid],
        non_repeaters: u32,
        max_repetitions: u32,
    ) -> Result<VarBindList> {
        let varbinds = null_varbinds(oids);
        self.sync_send(
            session,
            PduType::GetBulkRequest,
            &varbinds,
            non_repeaters,
            max_repetitions,
        )
        .await
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn null_varbinds(oids: &[Oid]) -> Vec<VarBind> {
    oids.iter().cloned().map(VarBind::null).collect()
}

/// Map the resumed outcome to the call's result.
fn finish(
    session: &Session,
    fired: std::result::Result<Fired, oneshot::error::RecvError>,
    elapsed: Duration,
) -> Result<VarBindList> {
    let target = session.peer();
    match fired {
        Ok(Fired::Done(response)) if response.error_status == 0 => {
            tracing::trace!(
                snmp.target = %target,
                snmp.varbinds = response.varbinds.len(),
                "request completed"
            );
            Ok(response.varbinds)
        }
        Ok(Fired::Done(response)) => {
            tracing::debug!(
                snmp.target = %target,
                snmp.error_status = response.error_status,
                snmp.error_index = response.error_index,
                "response carried error status"
            );
            Err(Error::snmp(
                Some(target),
                response.error_status,
                response.error_index,
                response.varbinds,
            ))
        }
        Ok(Fired::TimedOut) => {
            tracing::debug!(
                snmp.target = %target,
                snmp.retries = session.retries(),
                elapsed_ms = elapsed.as_millis() as u64,
                "request timed out"
            );
            Err(Error::Timeout {
                target: Some(target),
                elapsed,
                retries: session.retries(),
            })
        }
        // Callbacks dropped unfired: the dispatch loop shut down.
        Err(_) => Err(Error::DispatcherClosed),
    }
}

/// Builder for [`Bridge`].
pub struct BridgeBuilder {
    thread_name: String,
}

impl BridgeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.into(),
        }
    }

    /// Set the name of the dedicated dispatch thread (default: `snmp-dispatch`).
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Run the dispatch loop on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<E: Engine>(self, engine: E) -> Bridge {
        let (commands, rx) = mpsc::unbounded_channel();
        tokio::spawn(dispatch::run(engine, rx));
        Bridge { commands }
    }

    /// Run the dispatch loop on a dedicated thread with its own
    /// current-thread runtime.
    pub fn spawn_dedicated<E: Engine>(self, engine: E) -> Result<Bridge> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|source| Error::Spawn { source })?;

        let (commands, rx) = mpsc::unbounded_channel();
        tracing::debug!(thread = %self.thread_name, "starting dedicated dispatch thread");
        std::thread::Builder::new()
            .name(self.thread_name)
            .spawn(move || runtime.block_on(dispatch::run(engine, rx)))
            .map_err(|source| Error::Spawn { source })?;

        Ok(Bridge { commands })
    }
}

impl Default for BridgeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::value::Value;

    fn session() -> Session {
        Session::builder("127.0.0.1:161".parse().unwrap()).build()
    }

    #[test]
    fn test_resume_is_single_use() {
        let s = session();
        let (resume, mut rx) = Resume::new(&s);
        resume.resume(Fired::TimedOut);
        resume.resume(Fired::Done(Response::ok(vec![VarBind::null(oid!(1, 3))])));

        assert!(matches!(rx.try_recv(), Ok(Fired::TimedOut)));
        assert_eq!(s.stats().late_outcomes, 0);
    }

    #[test]
    fn test_resume_after_receiver_dropped_counts_late_outcome() {
        let s = session();
        let (resume, rx) = Resume::new(&s);
        drop(rx);
        resume.resume(Fired::Done(Response::ok(vec![VarBind::new(
            oid!(1, 3, 6, 1),
            Value::Integer(1),
        )])));
        assert_eq!(s.stats().late_outcomes, 1);
    }

    #[test]
    fn test_install_wires_both_callbacks_to_one_handle() {
        let s = session();
        let (resume, mut rx) = Resume::new(&s);
        let call = resume.install(&s).unwrap();
        assert!(s.is_busy());

        assert!(s.fire_done(Some(call), Response::error(2, 1, Vec::new())));
        assert!(!s.is_busy());
        match rx.try_recv() {
            Ok(Fired::Done(response)) => assert_eq!(response.error_status, 2),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_finish_maps_outcomes() {
        let s = session();
        let ok = finish(
            &s,
            Ok(Fired::Done(Response::ok(vec![VarBind::null(oid!(1, 3))]))),
            Duration::ZERO,
        )
        .unwrap();
        assert_eq!(ok.len(), 1);

        let err = finish(&s, Ok(Fired::Done(Response::error(5, 0, Vec::new()))), Duration::ZERO)
            .unwrap_err();
        assert!(matches!(err, Error::Snmp { label: "genErr", .. }));

        let err = finish(&s, Ok(Fired::TimedOut), Duration::from_secs(1)).unwrap_err();
        assert!(err.is_timeout());
    }
}
