//! Session finalization: the one component allowed to end a call.
//!
//! Reverses acquisition order (stop agent, release media, leave transport)
//! regardless of how the intake ended, and runs at most once per session.
//! Every teardown step is best-effort: a failure is logged and the next
//! step still runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use vetline_agent::AgentController;
use vetline_session::ChannelSession;
use vetline_store::StorePool;
use vetline_types::{IntakeTurn, SessionRecord, TriageSummary};

pub struct Finalizer {
    agents: Arc<AgentController>,
    /// Where finalized records land; `None` skips persistence (demo mode).
    pool: Option<StorePool>,
    done: AtomicBool,
}

impl Finalizer {
    pub fn new(agents: Arc<AgentController>, pool: Option<StorePool>) -> Self {
        Self {
            agents,
            pool,
            done: AtomicBool::new(false),
        }
    }

    /// Completes a session: teardown, record assembly, persistence.
    ///
    /// Returns `None` if finalization already ran; the first caller wins and
    /// later calls do nothing.
    pub async fn end(
        &self,
        session: &ChannelSession,
        turns: Vec<IntakeTurn>,
        summary: TriageSummary,
        summary_is_fallback: bool,
    ) -> Option<SessionRecord> {
        if self.done.swap(true, Ordering::SeqCst) {
            tracing::debug!("finalizer already ran, skipping");
            return None;
        }

        self.stop_agent(session).await;
        session.leave().await;

        let snapshot = session.snapshot();
        let record = SessionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            channel_id: snapshot.channel_id,
            subject: snapshot.subject,
            started_at: snapshot.started_at,
            ended_at: snapshot.ended_at,
            duration_secs: snapshot
                .started_at
                .zip(snapshot.ended_at)
                .map(|(start, end)| (end - start).num_seconds()),
            turns,
            summary,
            summary_is_fallback,
        };

        if let Some(pool) = &self.pool {
            match pool.get() {
                Ok(conn) => {
                    if let Err(e) = vetline_store::save_record(&conn, &record) {
                        tracing::warn!(record_id = %record.id, error = %e, "record persistence failed");
                    }
                }
                Err(e) => {
                    tracing::warn!(record_id = %record.id, error = %e, "no database connection for record");
                }
            }
        }

        tracing::info!(
            record_id = %record.id,
            channel = %record.channel_id,
            urgency = record.summary.urgency.as_str(),
            fallback = record.summary_is_fallback,
            "session finalized"
        );
        Some(record)
    }

    /// Aborts a session that never became active: teardown only, no record.
    pub async fn abort(&self, session: &ChannelSession, reason: &str) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_agent(session).await;
        session.abort(reason).await;
    }

    async fn stop_agent(&self, session: &ChannelSession) {
        // Taking the handle clears it, so a retried teardown never stops
        // the same agent twice.
        if let Some(handle) = session.take_agent_handle() {
            if let Err(e) = self.agents.stop(&handle).await {
                tracing::warn!(agent_id = %handle, error = %e, "agent stop failed during teardown");
            }
        }
    }
}
