//! Local media capture and publication.
//!
//! The publisher owns whatever capture handles it acquired; they are
//! released exactly once, with `Option::take` guards so repeated release
//! attempts are tolerated. Device hot-swap is a subscription the publisher
//! exposes — swapping a handle never requires rejoining the channel.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::broadcast;
use vetline_types::MediaKind;

/// Capacity for the device-change broadcast channel.
const DEVICE_EVENT_CAPACITY: usize = 32;

#[derive(Debug, Error)]
pub enum MediaError {
    /// Permission denied or the device refused capture. Fatal to start.
    #[error("media access denied: {0}")]
    AccessDenied(String),

    /// No capture device of the requested kind exists.
    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),
}

/// A locally held capture handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackHandle {
    pub id: String,
    pub kind: MediaKind,
    pub device_label: String,
}

/// A capture device appearing or disappearing while a session is live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Attached { label: String, kind: MediaKind },
    Detached { label: String, kind: MediaKind },
}

/// Source of local capture devices (microphone, camera).
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Acquires capture handles for the requested kinds.
    async fn acquire(
        &self,
        want_audio: bool,
        want_video: bool,
    ) -> Result<Vec<TrackHandle>, MediaError>;

    /// Subscription for device attach/detach notifications.
    fn device_events(&self) -> broadcast::Receiver<DeviceEvent>;
}

/// Owns acquired tracks and guarantees release-exactly-once.
pub struct MediaPublisher {
    source: Arc<dyn MediaSource>,
    tracks: Mutex<Option<Vec<TrackHandle>>>,
}

impl MediaPublisher {
    pub fn new(source: Arc<dyn MediaSource>) -> Self {
        Self {
            source,
            tracks: Mutex::new(None),
        }
    }

    /// Acquires local capture devices. At most one acquisition is held at a
    /// time; acquiring again while holding tracks is rejected.
    pub async fn acquire(
        &self,
        want_audio: bool,
        want_video: bool,
    ) -> Result<Vec<TrackHandle>, MediaError> {
        let acquired = self.source.acquire(want_audio, want_video).await?;
        let mut slot = self.tracks.lock().unwrap();
        if slot.is_some() {
            return Err(MediaError::AccessDenied(
                "local tracks already acquired".to_string(),
            ));
        }
        *slot = Some(acquired.clone());
        tracing::debug!(count = acquired.len(), "acquired local media tracks");
        Ok(acquired)
    }

    /// Replaces the held track of the given kind after a device hot-swap.
    /// Returns the displaced handle so the caller can unpublish it.
    pub fn swap(&self, replacement: TrackHandle) -> Option<TrackHandle> {
        let mut slot = self.tracks.lock().unwrap();
        let tracks = slot.as_mut()?;
        let pos = tracks.iter().position(|t| t.kind == replacement.kind)?;
        Some(std::mem::replace(&mut tracks[pos], replacement))
    }

    /// Releases every held handle, returning them for unpublication.
    ///
    /// Idempotent: a second call returns an empty vec.
    pub fn release(&self) -> Vec<TrackHandle> {
        let released = self.tracks.lock().unwrap().take().unwrap_or_default();
        if !released.is_empty() {
            tracing::debug!(count = released.len(), "released local media tracks");
        }
        released
    }

    pub fn is_released(&self) -> bool {
        self.tracks.lock().unwrap().is_none()
    }

    pub fn device_events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.source.device_events()
    }
}

/// Simulated capture source.
///
/// Stands in for platform capture APIs in tests and demos, with a
/// scriptable permission denial.
#[derive(Clone)]
pub struct SimulatedMedia {
    deny: bool,
    device_tx: broadcast::Sender<DeviceEvent>,
}

impl Default for SimulatedMedia {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedMedia {
    pub fn new() -> Self {
        let (device_tx, _) = broadcast::channel(DEVICE_EVENT_CAPACITY);
        Self {
            deny: false,
            device_tx,
        }
    }

    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Self::new()
        }
    }

    /// Simulates a device attach/detach notification.
    pub fn notify(&self, event: DeviceEvent) {
        let _ = self.device_tx.send(event);
    }
}

#[async_trait]
impl MediaSource for SimulatedMedia {
    async fn acquire(
        &self,
        want_audio: bool,
        want_video: bool,
    ) -> Result<Vec<TrackHandle>, MediaError> {
        if self.deny {
            return Err(MediaError::AccessDenied(
                "simulated permission denial".to_string(),
            ));
        }
        let mut tracks = Vec::new();
        if want_audio {
            tracks.push(TrackHandle {
                id: uuid::Uuid::new_v4().to_string(),
                kind: MediaKind::Audio,
                device_label: "simulated microphone".to_string(),
            });
        }
        if want_video {
            tracks.push(TrackHandle {
                id: uuid::Uuid::new_v4().to_string(),
                kind: MediaKind::Video,
                device_label: "simulated camera".to_string(),
            });
        }
        Ok(tracks)
    }

    fn device_events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.device_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn release_is_idempotent() {
        let publisher = MediaPublisher::new(Arc::new(SimulatedMedia::new()));
        publisher.acquire(true, false).await.unwrap();

        let first = publisher.release();
        assert_eq!(first.len(), 1);
        assert!(publisher.is_released());

        let second = publisher.release();
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn denied_acquisition_is_access_denied() {
        let publisher = MediaPublisher::new(Arc::new(SimulatedMedia::denying()));
        assert!(matches!(
            publisher.acquire(true, false).await,
            Err(MediaError::AccessDenied(_))
        ));
    }

    #[tokio::test]
    async fn swap_replaces_matching_kind_without_release() {
        let publisher = MediaPublisher::new(Arc::new(SimulatedMedia::new()));
        let tracks = publisher.acquire(true, false).await.unwrap();

        let replacement = TrackHandle {
            id: "new".to_string(),
            kind: MediaKind::Audio,
            device_label: "usb microphone".to_string(),
        };
        let displaced = publisher.swap(replacement.clone()).unwrap();
        assert_eq!(displaced, tracks[0]);

        let released = publisher.release();
        assert_eq!(released, vec![replacement]);
    }

    #[tokio::test]
    async fn device_events_reach_subscribers() {
        let media = SimulatedMedia::new();
        let publisher = MediaPublisher::new(Arc::new(media.clone()));
        let mut rx = publisher.device_events();

        media.notify(DeviceEvent::Attached {
            label: "headset".to_string(),
            kind: MediaKind::Audio,
        });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, DeviceEvent::Attached { .. }));
    }
}
