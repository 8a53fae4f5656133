//! Channel session lifecycle for the Vetline platform.
//!
//! Owns the core orchestration state machine of a triage call: joining and
//! leaving the named real-time channel, tracking remote participants, and
//! publishing local media. The session state moves strictly forward (see
//! `vetline_types::SessionState`); every mutation goes through
//! [`ChannelSession::transition`], and transport callbacks arriving during
//! teardown are no-ops.
//!
//! The RTC provider itself is reached only through the [`ChannelTransport`]
//! trait; [`LoopbackTransport`] simulates it in-process for tests and demos.

pub mod error;
pub mod media;
pub mod registry;
pub mod transport;

pub use error::SessionError;
pub use media::{DeviceEvent, MediaError, MediaPublisher, MediaSource, SimulatedMedia, TrackHandle};
pub use registry::{ParticipantRegistry, RemoteParticipant};
pub use transport::{
    ChannelTransport, JoinOutcome, JoinRequest, LoopbackTransport, ParticipantEvent,
    TransportConn, TransportError,
};

use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use vetline_types::{MediaKind, Session, SessionState, SubjectProfile};

/// A live triage call session bound to one channel.
///
/// Locking convention: the inner `std::sync::Mutex`es guard brief field
/// operations only and are never held across `.await` points.
pub struct ChannelSession {
    session: Mutex<Session>,
    state_tx: watch::Sender<SessionState>,
    registry: Arc<ParticipantRegistry>,
    transport: Arc<dyn ChannelTransport>,
    media: MediaPublisher,
    conn: Mutex<Option<Arc<dyn TransportConn>>>,
    pump: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ChannelSession {
    pub fn new(
        channel_id: impl Into<String>,
        local_uid: u32,
        subject: SubjectProfile,
        transport: Arc<dyn ChannelTransport>,
        media_source: Arc<dyn MediaSource>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            session: Mutex::new(Session::new(channel_id, local_uid, subject)),
            state_tx,
            registry: Arc::new(ParticipantRegistry::new()),
            transport,
            media: MediaPublisher::new(media_source),
            conn: Mutex::new(None),
            pump: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.lock().unwrap().state
    }

    /// Watch channel observers (UI, sequencer cancellation) subscribe to.
    pub fn state_watch(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Read-only copy of the session fields.
    pub fn snapshot(&self) -> Session {
        self.session.lock().unwrap().clone()
    }

    pub fn registry(&self) -> Arc<ParticipantRegistry> {
        self.registry.clone()
    }

    pub fn media(&self) -> &MediaPublisher {
        &self.media
    }

    /// Applies a state transition and notifies watchers.
    pub fn transition(&self, to: SessionState) -> Result<(), SessionError> {
        self.session.lock().unwrap().transition(to)?;
        let _ = self.state_tx.send(to);
        Ok(())
    }

    /// Records the handle of a successfully started hosted agent.
    ///
    /// At most one handle is active at a time; overwriting a live handle is
    /// a programming error upstream (agent start conflicts are resolved by
    /// the controller before any handle is stored).
    pub fn set_agent_handle(&self, handle: impl Into<String>) {
        self.session.lock().unwrap().agent_handle = Some(handle.into());
    }

    /// Takes the active agent handle, leaving none recorded.
    pub fn take_agent_handle(&self) -> Option<String> {
        self.session.lock().unwrap().agent_handle.take()
    }

    pub fn agent_handle(&self) -> Option<String> {
        self.session.lock().unwrap().agent_handle.clone()
    }

    /// Joins the channel: `Idle → Configuring → Joining`.
    ///
    /// A token-rejected join surfaces as [`SessionError::CredentialInvalid`]
    /// so the caller can choose to re-mint; any other transport error is a
    /// generic join failure. Joining twice without an intervening leave is
    /// rejected by the transition table.
    pub async fn join(&self, token: &str) -> Result<(), SessionError> {
        self.transition(SessionState::Configuring)?;
        let req = {
            let s = self.session.lock().unwrap();
            JoinRequest {
                channel_id: s.channel_id.clone(),
                uid: s.local_uid,
                token: token.to_string(),
            }
        };
        self.transition(SessionState::Joining)?;

        let conn = self.transport.join(req).await.map_err(|e| match e {
            TransportError::CredentialInvalid => SessionError::CredentialInvalid,
            other => SessionError::JoinFailed(other.to_string()),
        })?;

        // Resolve an auto-assigned uid into the session record.
        self.session.lock().unwrap().local_uid = conn.local_uid();

        let pump = self.spawn_event_pump(conn.clone());
        *self.pump.lock().unwrap() = Some(pump);
        *self.conn.lock().unwrap() = Some(conn);

        tracing::info!(channel = %self.snapshot().channel_id, "joined channel");
        Ok(())
    }

    /// Acquires local capture devices and publishes them:
    /// `Joining → Publishing`.
    pub async fn publish(&self, want_audio: bool, want_video: bool) -> Result<(), SessionError> {
        let conn = self
            .conn
            .lock()
            .unwrap()
            .clone()
            .ok_or(SessionError::NotJoined)?;

        let tracks = self
            .media
            .acquire(want_audio, want_video)
            .await
            .map_err(|e| SessionError::MediaAccessDenied(e.to_string()))?;

        for track in &tracks {
            conn.publish(track)
                .await
                .map_err(|e| SessionError::PublishFailed(e.to_string()))?;
        }

        self.transition(SessionState::Publishing)?;
        Ok(())
    }

    /// Leaves the channel.
    ///
    /// Always transitions to `Ending` first, then releases every locally
    /// held media resource, then the transport join — this ordering prevents
    /// orphaned device handles if the transport leave fails partway.
    /// Teardown failures are logged and never propagated; calling this on an
    /// already-ended session is a no-op.
    pub async fn leave(&self) {
        self.teardown(SessionState::Ended).await;
    }

    /// Aborts a failed session: same resource teardown as [`leave`], but the
    /// session finalizes into `Failed` instead of `Ended`.
    ///
    /// [`leave`]: ChannelSession::leave
    pub async fn abort(&self, reason: &str) {
        tracing::error!(reason, "session aborting");
        self.teardown(SessionState::Failed).await;
    }

    async fn teardown(&self, terminal: SessionState) {
        {
            let s = self.session.lock().unwrap();
            if s.state.is_terminal() {
                return;
            }
        }
        if self.transition(SessionState::Ending).is_ok() {
            tracing::info!("session ending");
        }

        if let Some(pump) = self.pump.lock().unwrap().take() {
            pump.abort();
        }

        // Exactly one caller gets the connection; late callers skip straight
        // to the terminal transition.
        let conn = self.conn.lock().unwrap().take();

        // Local handles are released before any transport call completes.
        let released = self.media.release();

        if let Some(conn) = conn {
            for track in &released {
                if let Err(e) = conn.unpublish(track).await {
                    tracing::warn!(error = %e, kind = track.kind.as_str(), "unpublish failed during teardown");
                }
            }
            if let Err(e) = conn.leave().await {
                tracing::warn!(error = %e, "transport leave failed during teardown");
            }
        }

        if let Err(e) = self.transition(terminal) {
            // Another teardown path already finalized the state.
            tracing::debug!(error = %e, "session already finalized");
        }
    }

    /// Dispatches transport participant events into the registry.
    ///
    /// A newly published stream is subscribed before it becomes audible or
    /// visible; a subscription failure is logged and does not tear down the
    /// session. Events arriving while teardown is in progress are no-ops.
    fn spawn_event_pump(&self, conn: Arc<dyn TransportConn>) -> tokio::task::JoinHandle<()> {
        let registry = self.registry.clone();
        let mut state_rx = self.state_tx.subscribe();
        let mut events = conn.events();

        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "participant event stream lagged");
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };

                if state_rx.borrow_and_update().is_ending_or_terminal() {
                    continue;
                }

                match event {
                    ParticipantEvent::Published { uid, kind } => {
                        if registry.on_published(uid, kind) {
                            if let Err(e) = conn.subscribe(uid, kind).await {
                                tracing::warn!(uid, error = %e, "subscribe to remote stream failed");
                            }
                        }
                    }
                    ParticipantEvent::Unpublished { uid, kind } => {
                        registry.on_unpublished(uid, kind);
                    }
                    ParticipantEvent::Left { uid } => {
                        registry.on_left(uid);
                    }
                }
            }
        })
    }
}
