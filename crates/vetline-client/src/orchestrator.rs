//! The call orchestrator: one strict linear pass over the session states.
//!
//! Control flow: bootstrap config, mint tokens, join the channel, publish
//! media, start the hosted agent, drive the intake protocol, generate the
//! summary, finalize. Any startup failure aborts the whole session through
//! the finalizer; nothing after `Active` is fatal except the session's own
//! `Ending`/`Failed` transitions.

use crate::config::CredentialSource;
use crate::error::CallError;
use crate::finalizer::Finalizer;
use std::sync::Arc;
use vetline_agent::{AgentConfig, AgentController};
use vetline_intake::IntakeDriver;
use vetline_session::ChannelSession;
use vetline_summary::{generate_summary, TriageAnalyzer};
use vetline_types::{ParticipantRole, SessionRecord, SessionState};

pub struct CallOrchestrator {
    session: Arc<ChannelSession>,
    credentials: Arc<dyn CredentialSource>,
    agents: Arc<AgentController>,
    driver: Arc<dyn IntakeDriver>,
    analyzer: Arc<dyn TriageAnalyzer>,
    finalizer: Finalizer,
}

impl CallOrchestrator {
    pub fn new(
        session: Arc<ChannelSession>,
        credentials: Arc<dyn CredentialSource>,
        agents: Arc<AgentController>,
        driver: Arc<dyn IntakeDriver>,
        analyzer: Arc<dyn TriageAnalyzer>,
        pool: Option<vetline_store::StorePool>,
    ) -> Self {
        let finalizer = Finalizer::new(agents.clone(), pool);
        Self {
            session,
            credentials,
            agents,
            driver,
            analyzer,
            finalizer,
        }
    }

    pub fn session(&self) -> &Arc<ChannelSession> {
        &self.session
    }

    /// Runs one complete triage call and returns the finalized record.
    ///
    /// On startup failure the session is aborted (resources released, state
    /// `Failed`) and the error surfaces so the caller can offer a
    /// retry-or-exit choice. Once the call is active there is no error path:
    /// intake cancellation and analysis failure both still finalize.
    pub async fn run(&self) -> Result<SessionRecord, CallError> {
        if let Err(e) = self.start_call().await {
            tracing::error!(error = %e, "session startup failed");
            self.finalizer.abort(&self.session, &e.to_string()).await;
            return Err(e);
        }

        let cancel = self.session.state_watch();
        let turns = self.driver.drive(cancel).await;

        let subject = self.session.snapshot().subject;
        let (summary, is_fallback) =
            generate_summary(self.analyzer.as_ref(), &subject, &turns).await;

        self.finalizer
            .end(&self.session, turns, summary, is_fallback)
            .await
            .ok_or(CallError::AlreadyFinalized)
    }

    async fn start_call(&self) -> Result<(), CallError> {
        let config = self.credentials.bootstrap().await?;

        let snapshot = self.session.snapshot();
        let token = self
            .credentials
            .join_token(
                &snapshot.channel_id,
                snapshot.local_uid,
                ParticipantRole::Publisher,
            )
            .await?;

        self.session.join(&token).await?;
        self.session.publish(true, false).await?;
        self.session.transition(SessionState::StartingAgent)?;

        let agent_token = self
            .credentials
            .join_token(
                &snapshot.channel_id,
                config.agent_uid,
                ParticipantRole::Publisher,
            )
            .await?;

        // The local uid may have been auto-assigned at join time.
        let local_uid = self.session.snapshot().local_uid;
        let mut agent_config = AgentConfig::new(
            &snapshot.channel_id,
            agent_token,
            vec![local_uid],
            self.driver.greeting(&snapshot.subject),
            self.driver.system_instruction(&snapshot.subject),
        );
        agent_config.agent_uid = config.agent_uid;

        // The handle is recorded only after a fully successful start; a
        // conflicting stale agent's handle never reaches the session.
        let handle = self.agents.start(&agent_config).await?;
        self.session.set_agent_handle(handle);
        self.session.transition(SessionState::Active)?;

        tracing::info!(channel = %snapshot.channel_id, "triage call active");
        Ok(())
    }
}
