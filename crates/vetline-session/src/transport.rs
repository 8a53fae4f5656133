//! The RTC transport boundary.
//!
//! The real-time media transport (packetization, jitter buffering, codec
//! negotiation) is owned by the RTC provider and reached only through
//! [`ChannelTransport`]. The in-process [`LoopbackTransport`] stands in for
//! the provider in tests and demos, with scriptable join outcomes and
//! injectable participant events.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::broadcast;
use vetline_types::MediaKind;

use crate::media::TrackHandle;

/// Capacity for the per-connection participant event channel.
const PARTICIPANT_EVENT_CAPACITY: usize = 256;

/// Events the transport raises about remote participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantEvent {
    Published { uid: u32, kind: MediaKind },
    Unpublished { uid: u32, kind: MediaKind },
    Left { uid: u32 },
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// Join rejected because the token was invalid for this channel/uid.
    #[error("transport rejected join token")]
    CredentialInvalid,

    #[error("transport join failed: {0}")]
    Join(String),

    #[error("transport publish failed: {0}")]
    Publish(String),

    #[error("transport subscribe failed: {0}")]
    Subscribe(String),

    #[error("transport leave failed: {0}")]
    Leave(String),
}

/// Parameters for joining a named channel.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    pub channel_id: String,
    /// Requested uid; 0 asks the transport to assign one.
    pub uid: u32,
    pub token: String,
}

/// A provider-managed real-time channel.
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    async fn join(&self, req: JoinRequest) -> Result<Arc<dyn TransportConn>, TransportError>;
}

/// A live connection to a joined channel.
#[async_trait]
pub trait TransportConn: Send + Sync {
    /// The uid actually in effect (resolves an auto-assign request).
    fn local_uid(&self) -> u32;

    async fn publish(&self, track: &TrackHandle) -> Result<(), TransportError>;

    async fn unpublish(&self, track: &TrackHandle) -> Result<(), TransportError>;

    /// Subscribes to a remote participant's newly published stream.
    async fn subscribe(&self, uid: u32, kind: MediaKind) -> Result<(), TransportError>;

    async fn leave(&self) -> Result<(), TransportError>;

    fn events(&self) -> broadcast::Receiver<ParticipantEvent>;
}

/// How a scripted loopback join should resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinOutcome {
    #[default]
    Accept,
    RejectCredential,
    RejectOther,
}

/// In-process transport simulation.
///
/// In a production deployment this is replaced by an implementation that
/// wraps the RTC vendor SDK; the loopback mirrors its observable behavior
/// so the session state machine can be exercised without a provider.
#[derive(Clone)]
pub struct LoopbackTransport {
    join_outcome: Arc<Mutex<JoinOutcome>>,
    fail_subscribe: Arc<AtomicBool>,
    fail_leave: Arc<AtomicBool>,
    event_tx: broadcast::Sender<ParticipantEvent>,
    /// Ordered log of transport operations, for teardown-order assertions.
    op_log: Arc<Mutex<Vec<String>>>,
    /// Uid handed out when a join requests auto-assignment.
    assigned_uid: u32,
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackTransport {
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(PARTICIPANT_EVENT_CAPACITY);
        Self {
            join_outcome: Arc::new(Mutex::new(JoinOutcome::Accept)),
            fail_subscribe: Arc::new(AtomicBool::new(false)),
            fail_leave: Arc::new(AtomicBool::new(false)),
            event_tx,
            op_log: Arc::new(Mutex::new(Vec::new())),
            assigned_uid: 42,
        }
    }

    pub fn script_join(&self, outcome: JoinOutcome) {
        *self.join_outcome.lock().unwrap() = outcome;
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::SeqCst);
    }

    pub fn fail_leave(&self, fail: bool) {
        self.fail_leave.store(fail, Ordering::SeqCst);
    }

    /// Injects a remote participant event as if the provider raised it.
    pub fn inject(&self, event: ParticipantEvent) {
        // Send failures just mean nobody is listening yet.
        let _ = self.event_tx.send(event);
    }

    /// Snapshot of the operations performed on connections of this transport.
    pub fn operations(&self) -> Vec<String> {
        self.op_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChannelTransport for LoopbackTransport {
    async fn join(&self, req: JoinRequest) -> Result<Arc<dyn TransportConn>, TransportError> {
        // Simulated connection delay, as the provider SDK would incur.
        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;

        match *self.join_outcome.lock().unwrap() {
            JoinOutcome::Accept => {}
            JoinOutcome::RejectCredential => return Err(TransportError::CredentialInvalid),
            JoinOutcome::RejectOther => {
                return Err(TransportError::Join("simulated transport failure".to_string()))
            }
        }

        let uid = if req.uid == vetline_types::AUTO_ASSIGN_UID {
            self.assigned_uid
        } else {
            req.uid
        };

        self.op_log
            .lock()
            .unwrap()
            .push(format!("join {} as {}", req.channel_id, uid));

        Ok(Arc::new(LoopbackConn {
            uid,
            fail_subscribe: self.fail_subscribe.clone(),
            fail_leave: self.fail_leave.clone(),
            event_tx: self.event_tx.clone(),
            op_log: self.op_log.clone(),
            left: AtomicBool::new(false),
        }))
    }
}

struct LoopbackConn {
    uid: u32,
    fail_subscribe: Arc<AtomicBool>,
    fail_leave: Arc<AtomicBool>,
    event_tx: broadcast::Sender<ParticipantEvent>,
    op_log: Arc<Mutex<Vec<String>>>,
    left: AtomicBool,
}

#[async_trait]
impl TransportConn for LoopbackConn {
    fn local_uid(&self) -> u32 {
        self.uid
    }

    async fn publish(&self, track: &TrackHandle) -> Result<(), TransportError> {
        self.op_log
            .lock()
            .unwrap()
            .push(format!("publish {}", track.kind.as_str()));
        Ok(())
    }

    async fn unpublish(&self, track: &TrackHandle) -> Result<(), TransportError> {
        self.op_log
            .lock()
            .unwrap()
            .push(format!("unpublish {}", track.kind.as_str()));
        Ok(())
    }

    async fn subscribe(&self, uid: u32, kind: MediaKind) -> Result<(), TransportError> {
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(TransportError::Subscribe(format!(
                "simulated subscribe failure for {uid}"
            )));
        }
        self.op_log
            .lock()
            .unwrap()
            .push(format!("subscribe {} {}", uid, kind.as_str()));
        Ok(())
    }

    async fn leave(&self) -> Result<(), TransportError> {
        self.op_log.lock().unwrap().push("leave".to_string());
        if self.fail_leave.load(Ordering::SeqCst) {
            return Err(TransportError::Leave(
                "simulated leave failure".to_string(),
            ));
        }
        self.left.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<ParticipantEvent> {
        self.event_tx.subscribe()
    }
}
