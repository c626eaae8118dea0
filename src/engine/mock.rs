//! Mock engine for testing.
//!
//! Provides a programmable engine that can simulate responses, timeouts and
//! send failures without any network I/O.

use super::{DispatchArgs, Engine, EngineEvent, RequestHandle};
use crate::error::SendError;
use crate::pdu::{PduRequest, PduType, Response};
use crate::session::Session;
use crate::varbind::VarBind;
use bytes::Bytes;
use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;

/// What the mock does with the next request it is handed.
#[derive(Clone, Debug)]
pub enum MockReply {
    /// Deliver this response after `delay`.
    Response { response: Response, delay: Duration },
    /// Report a timeout once the session's full retry window has elapsed.
    Timeout,
    /// Refuse to queue the request.
    Reject(SendError),
    /// Accept the request and never report anything.
    Silent,
    /// Deliver the response, then report a timeout for the same request.
    Duplicate(Response),
}

/// A request the mock was asked to send.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub handle: RequestHandle,
    pub peer: SocketAddr,
    pub community: Bytes,
    pub pdu_type: PduType,
    pub varbinds: Vec<VarBind>,
    pub args: DispatchArgs,
}

enum Signal {
    Event(EngineEvent),
    Stop,
}

struct MockState {
    replies: VecDeque<MockReply>,
    requests: Vec<RecordedRequest>,
    default_reply: MockReply,
}

/// Mock engine for exercising the bridge.
///
/// The engine itself moves into the dispatch loop; keep a [`MockHandle`] to
/// script replies and inspect what was sent.
///
/// # Example
///
/// ```rust
/// use snmp_sync_bridge::engine::MockEngine;
/// use snmp_sync_bridge::pdu::Response;
///
/// let engine = MockEngine::new();
/// let mock = engine.handle();
///
/// mock.queue_response(Response::ok(Vec::new()));
/// mock.queue_timeout();
/// assert_eq!(mock.request_count(), 0);
/// ```
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
    tx: mpsc::UnboundedSender<Signal>,
    rx: mpsc::UnboundedReceiver<Signal>,
    next_handle: u64,
}

impl MockEngine {
    /// Create a mock whose default reply is [`MockReply::Timeout`].
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(Mutex::new(MockState {
                replies: VecDeque::new(),
                requests: Vec::new(),
                default_reply: MockReply::Timeout,
            })),
            tx,
            rx,
            next_handle: 1,
        }
    }

    /// Get a handle for scripting this engine after it has been moved.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: self.state.clone(),
            tx: self.tx.clone(),
        }
    }

    fn deliver_after(&self, delay: Duration, signal: Signal) {
        if delay.is_zero() {
            let _ = self.tx.send(signal);
            return;
        }
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(signal);
        });
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for MockEngine {
    fn send(
        &mut self,
        session: &Session,
        request: &PduRequest,
        args: DispatchArgs,
    ) -> Result<RequestHandle, SendError> {
        let handle = RequestHandle::new(self.next_handle);
        self.next_handle += 1;

        let reply = {
            let mut state = lock(&self.state);
            state.requests.push(RecordedRequest {
                handle,
                peer: session.peer(),
                community: session.security().community.clone(),
                pdu_type: request.pdu_type,
                varbinds: request.varbinds.clone(),
                args,
            });
            state
                .replies
                .pop_front()
                .unwrap_or_else(|| state.default_reply.clone())
        };

        tracing::trace!(
            snmp.target = %session.peer(),
            snmp.pdu_type = %request.pdu_type,
            snmp.handle = handle.id(),
            ?reply,
            "mock engine send"
        );

        match reply {
            MockReply::Response { response, delay } => {
                self.deliver_after(delay, Signal::Event(EngineEvent::Response { handle, response }));
            }
            MockReply::Timeout => {
                let window = session
                    .timeout()
                    .saturating_mul(session.retries().saturating_add(1));
                self.deliver_after(window, Signal::Event(EngineEvent::Timeout { handle }));
            }
            MockReply::Reject(err) => return Err(err),
            MockReply::Silent => {}
            MockReply::Duplicate(response) => {
                let _ = self
                    .tx
                    .send(Signal::Event(EngineEvent::Response { handle, response }));
                let _ = self.tx.send(Signal::Event(EngineEvent::Timeout { handle }));
            }
        }

        Ok(handle)
    }

    fn next_event(&mut self) -> impl Future<Output = Option<EngineEvent>> + Send {
        async move {
            match self.rx.recv().await {
                Some(Signal::Event(event)) => Some(event),
                Some(Signal::Stop) | None => None,
            }
        }
    }
}

/// Scripting handle for a [`MockEngine`].
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
    tx: mpsc::UnboundedSender<Signal>,
}

impl MockHandle {
    /// Queue an immediate response.
    pub fn queue_response(&self, response: Response) {
        self.queue(MockReply::Response {
            response,
            delay: Duration::ZERO,
        });
    }

    /// Queue a response delivered after `delay`.
    pub fn queue_delayed_response(&self, response: Response, delay: Duration) {
        self.queue(MockReply::Response { response, delay });
    }

    /// Queue a timeout.
    pub fn queue_timeout(&self) {
        self.queue(MockReply::Timeout);
    }

    /// Queue a send failure.
    pub fn queue_reject(&self, err: SendError) {
        self.queue(MockReply::Reject(err));
    }

    /// Queue a request that is accepted and never resolved.
    pub fn queue_silent(&self) {
        self.queue(MockReply::Silent);
    }

    /// Queue a response followed by a timeout for the same request.
    pub fn queue_duplicate(&self, response: Response) {
        self.queue(MockReply::Duplicate(response));
    }

    pub fn queue(&self, reply: MockReply) {
        lock(&self.state).replies.push_back(reply);
    }

    /// Set the reply used once the queue is empty.
    pub fn set_default_reply(&self, reply: MockReply) {
        lock(&self.state).default_reply = reply;
    }

    /// Get all recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.state).requests.len()
    }

    /// Clear recorded requests.
    pub fn clear_requests(&self) {
        lock(&self.state).requests.clear();
    }

    /// Inject an event as if the engine had produced it.
    pub fn fire(&self, event: EngineEvent) {
        let _ = self.tx.send(Signal::Event(event));
    }

    /// Make the engine report that it has stopped.
    pub fn stop(&self) {
        let _ = self.tx.send(Signal::Stop);
    }
}

impl std::fmt::Debug for MockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("MockHandle")
            .field("queued", &state.replies.len())
            .field("requests", &state.requests.len())
            .finish()
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;

    fn session() -> Session {
        Session::builder("127.0.0.1:161".parse().unwrap())
            .timeout(Duration::from_millis(100))
            .retries(1)
            .build()
    }

    fn get(oid: crate::oid::Oid) -> PduRequest {
        PduRequest::new(PduType::GetRequest, &[VarBind::null(oid)])
    }

    #[tokio::test]
    async fn test_records_and_replies_in_order() {
        let mut engine = MockEngine::new();
        let mock = engine.handle();
        mock.queue_response(Response::ok(Vec::new()));

        let s = session();
        let handle = engine
            .send(&s, &get(oid!(1, 3, 6, 1)), DispatchArgs::new(7, 9))
            .unwrap();

        match engine.next_event().await {
            Some(EngineEvent::Response { handle: h, response }) => {
                assert_eq!(h, handle);
                assert_eq!(response.error_status, 0);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].args, DispatchArgs::new(7, 9));
        assert_eq!(requests[0].pdu_type, PduType::GetRequest);
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_reply_times_out_after_retry_window() {
        let mut engine = MockEngine::new();
        let s = session();
        let start = tokio::time::Instant::now();
        let handle = engine
            .send(&s, &get(oid!(1, 3, 6, 1)), DispatchArgs::default())
            .unwrap();

        match engine.next_event().await {
            Some(EngineEvent::Timeout { handle: h }) => assert_eq!(h, handle),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_reject_and_stop() {
        let mut engine = MockEngine::new();
        let mock = engine.handle();
        mock.queue_reject(SendError::transport("down"));

        let err = engine
            .send(&session(), &get(oid!(1, 3)), DispatchArgs::default())
            .unwrap_err();
        assert_eq!(err, SendError::transport("down"));
        assert_eq!(mock.request_count(), 1);

        mock.stop();
        assert!(engine.next_event().await.is_none());
    }
}
