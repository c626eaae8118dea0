//! Async dispatch adapter and the dispatch loop.
//!
//! ```text
//! +----------+   Command::Send    +----------------+   Engine::send   +--------+
//! |  Bridge  | -----------------> | dispatch loop  | ---------------> | Engine |
//! | (clones) | <----------------- | (single owner) | <--------------- |        |
//! +----------+   ack: handle or   +----------------+   EngineEvent    +--------+
//!                SendError               |
//!                                        | fire_done / fire_timeout
//!                                        v
//!                                 Session callbacks
//! ```
//!
//! The loop is the only code that touches the engine. It keeps a map of
//! accepted requests to the session and call they were sent for, and fires
//! that call's callbacks when the engine reports an outcome. A request sent
//! with no callbacks installed never resolves a later call on the same
//! session.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::sync::{mpsc, oneshot};

use crate::bridge::Bridge;
use crate::engine::{DispatchArgs, Engine, EngineEvent, RequestHandle};
use crate::error::{Error, Result, SendError};
use crate::pdu::{PduRequest, PduType};
use crate::session::{CallId, Session};
use crate::varbind::{VarBind, release_varbind_list};

pub(crate) type Ack = oneshot::Sender<std::result::Result<RequestHandle, SendError>>;

/// Messages from bridges to the dispatch loop.
pub(crate) enum Command {
    Send {
        session: Session,
        call: Option<CallId>,
        request: PduRequest,
        args: DispatchArgs,
        ack: Ack,
    },
}

/// Where an accepted request's outcome goes.
struct Waiter {
    session: Session,
    call: Option<CallId>,
}

/// A request the engine has accepted.
///
/// Its outcome arrives through the session's callbacks, not through this
/// handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest {
    handle: RequestHandle,
    target: SocketAddr,
}

impl PendingRequest {
    pub fn handle(&self) -> RequestHandle {
        self.handle
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

/// Check that a PDU can be handed to the engine at all.
pub(crate) fn validate(
    pdu_type: PduType,
    varbinds: &[VarBind],
) -> std::result::Result<(), SendError> {
    if !pdu_type.expects_response() {
        return Err(SendError::NotARequest { pdu_type });
    }
    if pdu_type.requires_varbinds() && varbinds.is_empty() {
        return Err(SendError::EmptyVarBinds { pdu_type });
    }
    Ok(())
}

impl Bridge {
    /// Hand one PDU to the engine without waiting for its outcome.
    ///
    /// Returns once the engine has accepted or refused the request. The
    /// outcome is delivered later through the callbacks installed on
    /// `session` (see [`Session::install_callbacks`]) before this call. If
    /// none were installed the outcome is logged and its var-binds released,
    /// even when a later call has installed callbacks by then.
    ///
    /// On [`Error::Send`] nothing was queued and no callback will fire for
    /// this request. `arg1` and `arg2` are forwarded to the engine untouched.
    pub async fn async_send(
        &self,
        session: &Session,
        pdu_type: PduType,
        varbinds: &[VarBind],
        arg1: u32,
        arg2: u32,
    ) -> Result<PendingRequest> {
        validate(pdu_type, varbinds).map_err(|e| Error::send(Some(session.peer()), e))?;
        let call = session.current_call();
        let ack = self.submit(session, call, pdu_type, varbinds, DispatchArgs::new(arg1, arg2))?;
        resolve_ack(session, ack.await)
    }

    /// Queue a send command for an already validated PDU; the receiver
    /// yields the engine's verdict.
    pub(crate) fn submit(
        &self,
        session: &Session,
        call: Option<CallId>,
        pdu_type: PduType,
        varbinds: &[VarBind],
        args: DispatchArgs,
    ) -> Result<oneshot::Receiver<std::result::Result<RequestHandle, SendError>>> {
        let (ack, verdict) = oneshot::channel();
        let command = Command::Send {
            session: session.clone(),
            call,
            request: PduRequest::new(pdu_type, varbinds),
            args,
            ack,
        };
        self.commands
            .send(command)
            .map_err(|_| Error::DispatcherClosed)?;

        tracing::trace!(
            snmp.target = %session.peer(),
            snmp.pdu_type = %pdu_type,
            snmp.varbinds = varbinds.len(),
            "request submitted to dispatch loop"
        );
        Ok(verdict)
    }
}

/// Translate the dispatch loop's reply into the adapter's result.
pub(crate) fn resolve_ack(
    session: &Session,
    verdict: std::result::Result<std::result::Result<RequestHandle, SendError>, oneshot::error::RecvError>,
) -> Result<PendingRequest> {
    match verdict {
        Ok(Ok(handle)) => Ok(PendingRequest {
            handle,
            target: session.peer(),
        }),
        Ok(Err(source)) => Err(Error::send(Some(session.peer()), source)),
        Err(_) => Err(Error::DispatcherClosed),
    }
}

/// Run the dispatch loop until every bridge is dropped or the engine stops.
pub(crate) async fn run<E: Engine>(mut engine: E, mut commands: mpsc::UnboundedReceiver<Command>) {
    let mut pending: HashMap<RequestHandle, Waiter> = HashMap::new();
    tracing::debug!("dispatch loop started");

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(command) => handle_command(&mut engine, &mut pending, command),
                None => {
                    tracing::debug!("all bridges dropped");
                    break;
                }
            },
            event = engine.next_event() => match event {
                Some(event) => handle_event(&mut pending, event),
                None => {
                    tracing::debug!("engine stopped");
                    break;
                }
            },
        }
    }

    // Anything still queued never reached the engine.
    commands.close();
    while let Ok(Command::Send { session, call, .. }) = commands.try_recv() {
        session.clear_callbacks_for(call);
    }

    // Dropping the callbacks wakes their waiters.
    let abandoned = pending.len();
    for (_, waiter) in pending.drain() {
        waiter.session.clear_callbacks_for(waiter.call);
    }
    tracing::debug!(abandoned, "dispatch loop stopped");
}

fn handle_command<E: Engine>(
    engine: &mut E,
    pending: &mut HashMap<RequestHandle, Waiter>,
    command: Command,
) {
    match command {
        Command::Send {
            session,
            call,
            request,
            args,
            ack,
        } => match engine.send(&session, &request, args) {
            Ok(handle) => {
                tracing::trace!(
                    snmp.target = %session.peer(),
                    snmp.pdu_type = %request.pdu_type,
                    snmp.handle = handle.id(),
                    "engine accepted request"
                );
                pending.insert(handle, Waiter { session, call });
                let _ = ack.send(Ok(handle));
            }
            Err(e) => {
                tracing::debug!(
                    snmp.target = %session.peer(),
                    snmp.pdu_type = %request.pdu_type,
                    error = %e,
                    "engine refused request"
                );
                session.clear_callbacks_for(call);
                let _ = ack.send(Err(e));
            }
        },
    }
}

fn handle_event(pending: &mut HashMap<RequestHandle, Waiter>, event: EngineEvent) {
    let handle = event.handle();
    let Some(Waiter { session, call }) = pending.remove(&handle) else {
        tracing::debug!(
            snmp.handle = handle.id(),
            "event for request that is no longer pending, ignoring"
        );
        if let EngineEvent::Response { response, .. } = event {
            release_varbind_list(response.varbinds);
        }
        return;
    };

    match event {
        EngineEvent::Response { response, .. } => {
            session.fire_done(call, response);
        }
        EngineEvent::Timeout { .. } => {
            session.fire_timeout(call);
        }
    }
}
