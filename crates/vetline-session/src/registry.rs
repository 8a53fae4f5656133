//! Remote-participant registry.
//!
//! Owned by the channel session while it is live; mutated only by the
//! session's transport event pump, read by UI/collaborator code through
//! snapshots. Removal is idempotent — a participant-left event for an
//! already-absent uid is a no-op.

use std::collections::HashMap;
use std::sync::RwLock;
use vetline_types::MediaKind;

/// A remote participant and what they currently publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteParticipant {
    pub uid: u32,
    pub audio: bool,
    pub video: bool,
}

/// Registry of remote participants keyed by uid.
///
/// Uses `std::sync::RwLock` intentionally: all lock acquisitions are brief
/// HashMap operations that never span `.await` points, making a synchronous
/// lock safe and more efficient than `tokio::sync::RwLock`.
#[derive(Debug, Default)]
pub struct ParticipantRegistry {
    participants: RwLock<HashMap<u32, RemoteParticipant>>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a publish; returns true when the media kind was newly added
    /// (i.e. a subscription is needed).
    pub fn on_published(&self, uid: u32, kind: MediaKind) -> bool {
        let mut map = self.participants.write().unwrap();
        let entry = map.entry(uid).or_insert(RemoteParticipant {
            uid,
            audio: false,
            video: false,
        });
        match kind {
            MediaKind::Audio => !std::mem::replace(&mut entry.audio, true),
            MediaKind::Video => !std::mem::replace(&mut entry.video, true),
        }
    }

    /// Clears a published media kind. No-op for an unknown uid.
    pub fn on_unpublished(&self, uid: u32, kind: MediaKind) {
        let mut map = self.participants.write().unwrap();
        if let Some(entry) = map.get_mut(&uid) {
            match kind {
                MediaKind::Audio => entry.audio = false,
                MediaKind::Video => entry.video = false,
            }
        }
    }

    /// Removes a participant entirely. Safe to call on an already-absent uid.
    pub fn on_left(&self, uid: u32) {
        self.participants.write().unwrap().remove(&uid);
    }

    pub fn get(&self, uid: u32) -> Option<RemoteParticipant> {
        self.participants.read().unwrap().get(&uid).copied()
    }

    pub fn len(&self) -> usize {
        self.participants.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read-only snapshot for presentation code, sorted by uid.
    pub fn snapshot(&self) -> Vec<RemoteParticipant> {
        let mut all: Vec<_> = self
            .participants
            .read()
            .unwrap()
            .values()
            .copied()
            .collect();
        all.sort_by_key(|p| p.uid);
        all
    }
}
